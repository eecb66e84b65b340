//! Persistent connection to the geometry server child process.

use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::map::protocol::{GeometryRequest, ResponseFrame, read_frame};
use crate::shutdown::ShutdownSignal;

/// Anything that can answer geometry requests.
///
/// `Ok(None)` means the server answered but had no data; `Err` means the
/// round trip itself failed.
pub trait GeometrySource: Send + Sync {
    fn fetch(&self, request: GeometryRequest) -> Result<Option<String>>;
}

#[derive(Debug, Clone)]
pub struct GeometryServerConfig {
    pub executable: PathBuf,
    pub args: Vec<String>,
    /// Game install directory, passed as the last argument.
    pub game_path: PathBuf,
    /// Consecutive restarts allowed without a successful response.
    pub restart_limit: u32,
    pub startup_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for GeometryServerConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("MAServer.exe"),
            args: Vec::new(),
            game_path: PathBuf::new(),
            restart_limit: 5,
            startup_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
        }
    }
}

fn validate_game_path(path: &Path) -> Result<()> {
    if !path.is_dir() {
        return Err(Error::CollaboratorUnavailable(format!(
            "Game path '{}' is not a directory",
            path.display()
        )));
    }
    Ok(())
}

struct ServerPipe {
    child: Child,
    stdin: Option<ChildStdin>,
    responses: Receiver<ResponseFrame>,
    reader: Option<JoinHandle<()>>,
}

impl ServerPipe {
    fn spawn(config: &GeometryServerConfig) -> Result<Self> {
        validate_game_path(&config.game_path)?;

        let mut child = Command::new(&config.executable)
            .args(&config.args)
            .arg(&config.game_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                Error::CollaboratorUnavailable(format!(
                    "Failed to start {}: {}",
                    config.executable.display(),
                    e
                ))
            })?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::CollaboratorUnavailable(
                    "Geometry server pipes unavailable".to_string(),
                ));
            }
        };

        let (tx, rx) = mpsc::channel();
        let reader = thread::Builder::new()
            .name("geometry-reader".to_string())
            .spawn(move || {
                let mut stdout = stdout;
                loop {
                    match read_frame(&mut stdout) {
                        Ok(Some(frame)) => {
                            if tx.send(frame).is_err() {
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            error!("Geometry server stream failed: {}", e);
                            break;
                        }
                    }
                }
                debug!("Geometry server output closed");
            })?;

        let mut pipe = ServerPipe {
            child,
            stdin: Some(stdin),
            responses: rx,
            reader: Some(reader),
        };

        // The server announces readiness with an empty frame.
        match pipe.responses.recv_timeout(config.startup_timeout) {
            Ok(frame) if frame.is_empty() => {
                info!("Geometry server started (pid {})", pipe.child.id());
                Ok(pipe)
            }
            Ok(frame) => {
                pipe.kill();
                Err(Error::CollaboratorUnavailable(format!(
                    "Unexpected startup frame of {} bytes",
                    frame.length
                )))
            }
            Err(_) => {
                pipe.kill();
                Err(Error::CollaboratorUnavailable(
                    "Geometry server did not complete its startup handshake".to_string(),
                ))
            }
        }
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn kill(&mut self) {
        self.stdin.take();
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

impl Drop for ServerPipe {
    fn drop(&mut self) {
        self.kill();
    }
}

/// Client for the geometry server.
///
/// One request is in flight at a time; the lock covers the write and the
/// matching read. A server that exits is restarted on the next request
/// unless shutdown has been signalled.
pub struct GeometryClient {
    config: GeometryServerConfig,
    shutdown: Arc<ShutdownSignal>,
    pipe: Mutex<Option<ServerPipe>>,
    failures: AtomicU32,
    restarts: AtomicU32,
}

impl GeometryClient {
    /// Start the server and wait for its handshake.
    pub fn start(config: GeometryServerConfig, shutdown: Arc<ShutdownSignal>) -> Result<Self> {
        let pipe = ServerPipe::spawn(&config)?;
        Ok(Self {
            config,
            shutdown,
            pipe: Mutex::new(Some(pipe)),
            failures: AtomicU32::new(0),
            restarts: AtomicU32::new(0),
        })
    }

    /// Number of times the server has been restarted.
    pub fn restarts(&self) -> u32 {
        self.restarts.load(Ordering::Relaxed)
    }

    /// Stop the server. Later requests fail if shutdown is signalled,
    /// otherwise they start it again.
    pub fn close(&self) {
        if let Ok(mut slot) = self.pipe.lock() {
            if slot.take().is_some() {
                info!("Geometry server stopped");
            }
        }
    }

    fn ensure_running(&self, slot: &mut Option<ServerPipe>) -> Result<()> {
        if let Some(pipe) = slot.as_mut() {
            if pipe.is_alive() {
                return Ok(());
            }
            warn!("Geometry server has exited");
        }
        slot.take();

        if self.shutdown.is_shutdown() {
            return Err(Error::CollaboratorUnavailable(
                "Shutting down, not restarting geometry server".to_string(),
            ));
        }

        let attempt = self.failures.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt > self.config.restart_limit {
            return Err(Error::CollaboratorUnavailable(format!(
                "Geometry server failed {} restarts in a row",
                self.config.restart_limit
            )));
        }

        info!("Restarting geometry server (attempt {})", attempt);
        *slot = Some(ServerPipe::spawn(&self.config)?);
        self.restarts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl GeometrySource for GeometryClient {
    fn fetch(&self, request: GeometryRequest) -> Result<Option<String>> {
        let mut slot = self
            .pipe
            .lock()
            .map_err(|_| Error::CollaboratorUnavailable("Request lock poisoned".to_string()))?;
        self.ensure_running(&mut slot)?;

        let Some(pipe) = slot.as_mut() else {
            return Err(Error::CollaboratorUnavailable(
                "Geometry server is not running".to_string(),
            ));
        };

        let written = match pipe.stdin.as_mut() {
            Some(stdin) => request.write_to(stdin),
            None => Err(Error::CollaboratorProtocol("stdin closed".to_string())),
        };
        if let Err(e) = written {
            slot.take();
            return Err(Error::CollaboratorProtocol(format!(
                "Failed to send request: {}",
                e
            )));
        }

        match pipe.responses.recv_timeout(self.config.request_timeout) {
            Ok(frame) => {
                self.failures.store(0, Ordering::SeqCst);
                Ok(frame.json)
            }
            Err(RecvTimeoutError::Timeout) => {
                // a late answer would be matched to the next request
                slot.take();
                Err(Error::CollaboratorProtocol(format!(
                    "No response for area {} within {:?}",
                    request.area, self.config.request_timeout
                )))
            }
            Err(RecvTimeoutError::Disconnected) => {
                slot.take();
                Err(Error::CollaboratorProtocol(format!(
                    "Geometry server exited while serving area {}",
                    request.area
                )))
            }
        }
    }
}

impl Drop for GeometryClient {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_path_must_be_directory() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = validate_game_path(file.path()).unwrap_err();
        assert!(err.is_fatal_at_startup());

        let dir = tempfile::tempdir().unwrap();
        assert!(validate_game_path(dir.path()).is_ok());
    }

    #[test]
    fn test_missing_executable_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeometryServerConfig {
            executable: dir.path().join("no-such-server"),
            game_path: dir.path().to_path_buf(),
            ..Default::default()
        };
        let result = GeometryClient::start(config, Arc::new(ShutdownSignal::new()));
        assert!(matches!(result, Err(Error::CollaboratorUnavailable(_))));
    }

    #[cfg(unix)]
    fn one_shot_server(dir: &Path, reply: &str) -> GeometryServerConfig {
        // handshake, answer one request, exit
        let script = format!(
            "printf '\\000\\000\\000\\000'; head -c 12 >/dev/null; printf '{}'",
            reply
        );
        GeometryServerConfig {
            executable: PathBuf::from("sh"),
            args: vec!["-c".to_string(), script, "geometry-server".to_string()],
            game_path: dir.to_path_buf(),
            restart_limit: 3,
            startup_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_error_reply_and_restart() {
        let dir = tempfile::tempdir().unwrap();
        // 20-byte body: {"error":"bad seed"}
        let config = one_shot_server(dir.path(), "\\024\\000\\000\\000{\"error\":\"bad seed\"}");
        let client = GeometryClient::start(config, Arc::new(ShutdownSignal::new())).unwrap();
        let request = GeometryRequest::new(1, 0, 2);

        assert_eq!(client.fetch(request).unwrap(), None);
        // the server exited after answering; the next request restarts it
        let mut answered = false;
        for _ in 0..3 {
            if let Ok(reply) = client.fetch(request) {
                assert_eq!(reply, None);
                answered = true;
                break;
            }
        }
        assert!(answered);
        assert!(client.restarts() >= 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_no_restart_after_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let shutdown = Arc::new(ShutdownSignal::new());
        let config = one_shot_server(dir.path(), "\\000\\000\\000\\000");
        let client = GeometryClient::start(config, Arc::clone(&shutdown)).unwrap();

        shutdown.trigger();
        client.close();
        let err = client.fetch(GeometryRequest::new(1, 0, 2)).unwrap_err();
        assert!(matches!(err, Error::CollaboratorUnavailable(_)));
        assert_eq!(client.restarts(), 0);
    }
}
