use std::io;
use std::process::{ExitStatus, Stdio};

use futures_util::Stream;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Lines buffered between the pipe readers and the consumer. When full, the
/// readers stop pulling and the child blocks on its own pipe.
const LINE_BUFFER: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("{program} not found")]
    EngineNotFound { program: String },
    #[error("could not start {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

impl SpawnError {
    pub fn program(&self) -> &str {
        match self {
            SpawnError::EngineNotFound { program } | SpawnError::Io { program, .. } => program,
        }
    }
}

/// Guard that kills the child process (and its entire process group) on drop.
struct ChildGuard {
    child: Option<Child>,
    /// Process group ID saved at spawn time so we can kill the whole group.
    #[cfg(unix)]
    pgid: Option<u32>,
}

impl ChildGuard {
    fn new(child: Child) -> Self {
        #[cfg(unix)]
        let pgid = child.id();
        Self {
            child: Some(child),
            #[cfg(unix)]
            pgid,
        }
    }

    /// Wait for exit and stand down; a reaped group must not be signalled.
    async fn wait(&mut self) -> io::Result<ExitStatus> {
        let Some(child) = self.child.as_mut() else {
            return Err(io::Error::other("engine already reaped"));
        };
        let status = child.wait().await?;
        self.child = None;
        #[cfg(unix)]
        {
            self.pgid = None;
        }
        Ok(status)
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        // Kill the entire process group so engine subprocesses don't become orphans.
        #[cfg(unix)]
        if let Some(pgid) = self.pgid {
            unsafe { libc::kill(-(pgid as libc::pid_t), libc::SIGKILL) };
        }
        if let Some(ref mut child) = self.child {
            let _ = child.start_kill();
        }
    }
}

/// A running engine. Its stdout and stderr are drained concurrently into a
/// single line stream.
pub struct EngineProcess {
    guard: ChildGuard,
    lines: mpsc::Receiver<String>,
    readers: Vec<JoinHandle<()>>,
}

impl EngineProcess {
    /// Spawn `cmd` in its own process group with both output pipes captured.
    pub fn spawn(mut cmd: Command, program: &str) -> Result<Self, SpawnError> {
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.as_std_mut().process_group(0);
        }

        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => SpawnError::EngineNotFound {
                    program: program.to_string(),
                },
                _ => SpawnError::Io {
                    program: program.to_string(),
                    source,
                },
            })?;

        let (tx, lines) = mpsc::channel(LINE_BUFFER);
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(drain(stdout, tx.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(drain(stderr, tx)));
        }

        Ok(Self {
            guard: ChildGuard::new(child),
            lines,
            readers,
        })
    }

    /// Output lines in arrival order, ending once both pipes are closed.
    pub fn lines(&mut self) -> impl Stream<Item = String> + '_ {
        futures_util::stream::poll_fn(move |cx| self.lines.poll_recv(cx))
    }

    /// Block until the engine exits, whatever its exit code.
    pub async fn wait(mut self) -> io::Result<ExitStatus> {
        // Anything still queued is dropped; callers drain `lines` first.
        self.lines.close();
        for reader in self.readers.drain(..) {
            reader.await.ok();
        }
        self.guard.wait().await
    }
}

/// Forward one pipe line by line, tolerating non-UTF-8 output.
async fn drain<R>(pipe: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf).trim_end().to_string();
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "engine pipe read failed");
                break;
            }
        }
    }
}
