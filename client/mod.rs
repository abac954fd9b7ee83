// client: LED server client library - control-pipe handshake and one request batch per session
use ledsrv_core::{ClientId, Response};
use ledsrv_transport::{
    make_fifo, ConnectionPaths, Direction, Fifo, TransportError, ATOMIC_WRITE_LIMIT, DEFAULT_CONTROL_PATH,
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no LED server is listening on {path:?}: {source}")]
    ServerNotRunning {
        path: PathBuf,
        #[source]
        source: TransportError,
    },

    #[error("request must be a single line: {0:?}")]
    InvalidRequest(String),

    #[error("request batch of {size} bytes exceeds the {limit} byte atomic write limit")]
    BatchTooLarge { size: usize, limit: usize },

    #[error("malformed response line: {0:?}")]
    MalformedResponse(String),

    #[error("expected {expected} responses, got {received}")]
    MissingResponses { expected: usize, received: usize },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Where the server listens. Reads the same variables as the server:
/// LEDSRV_FIFO, LEDSRV_IN_FIFO, LEDSRV_OUT_FIFO.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub control_path: PathBuf,
    pub paths: ConnectionPaths,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            control_path: PathBuf::from(DEFAULT_CONTROL_PATH),
            paths: ConnectionPaths::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let defaults = ClientConfig::default();
        ClientConfig {
            control_path: env::var("LEDSRV_FIFO").map(PathBuf::from).unwrap_or(defaults.control_path),
            paths: ConnectionPaths::new(
                env::var("LEDSRV_IN_FIFO").unwrap_or(defaults.paths.inbound),
                env::var("LEDSRV_OUT_FIFO").unwrap_or(defaults.paths.outbound),
            ),
        }
    }

    pub fn in_dir(dir: &Path) -> Self {
        ClientConfig {
            control_path: dir.join("ledsrv"),
            paths: ConnectionPaths::in_dir(dir),
        }
    }
}

// Removes the session pipes this client created
struct SessionPipes {
    paths: Vec<PathBuf>,
}

impl Drop for SessionPipes {
    fn drop(&mut self) {
        for path in &self.paths {
            if let Err(e) = fs::remove_file(path) {
                warn!(path = ?path, error = %e, "Failed to remove session pipe");
            }
        }
    }
}

pub struct LedClient {
    config: ClientConfig,
    id: ClientId,
}

impl LedClient {
    /// Client announcing the current process id
    pub fn new(config: ClientConfig) -> Self {
        LedClient {
            config,
            id: ClientId::current(),
        }
    }

    pub fn with_id(mut self, id: ClientId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Send a single request line
    pub fn request(&self, request: &str) -> Result<Response> {
        let mut responses = self.batch(&[request])?;
        responses
            .pop()
            .ok_or_else(|| ClientError::InvalidRequest(request.to_string()))
    }

    /// Run one session: announce, send every request in one write, then
    /// collect one response per request.
    pub fn batch<S: AsRef<str>>(&self, requests: &[S]) -> Result<Vec<Response>> {
        let mut payload = String::new();
        let mut count = 0;
        for request in requests {
            let request = request.as_ref();
            if request.contains('\n') {
                return Err(ClientError::InvalidRequest(request.to_string()));
            }
            // The server drops empty lines without answering them
            if request.is_empty() {
                continue;
            }
            payload.push_str(request);
            payload.push('\n');
            count += 1;
        }
        if count == 0 {
            return Ok(Vec::new());
        }
        if payload.len() > ATOMIC_WRITE_LIMIT {
            return Err(ClientError::BatchTooLarge {
                size: payload.len(),
                limit: ATOMIC_WRITE_LIMIT,
            });
        }

        let inbound = self.config.paths.inbound_for(self.id);
        let outbound = self.config.paths.outbound_for(self.id);

        // Both pipes must exist before the server hears about us
        make_fifo(&inbound)?;
        let mut pipes = SessionPipes {
            paths: vec![inbound.clone()],
        };
        make_fifo(&outbound)?;
        pipes.paths.push(outbound.clone());

        self.announce()?;

        // Same order as the server: requests first, then responses
        let mut requests_pipe = Fifo::open(&inbound, Direction::Write)?;
        requests_pipe.write(payload.as_bytes())?;
        requests_pipe.close()?;

        let mut responses_pipe = Fifo::open(&outbound, Direction::Read)?;
        let mut raw = Vec::new();
        let mut buf = vec![0u8; ATOMIC_WRITE_LIMIT];
        loop {
            let n = responses_pipe.read(&mut buf)?;
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
        }
        responses_pipe.close()?;
        drop(pipes);

        let responses = String::from_utf8_lossy(&raw)
            .lines()
            .map(|line| Response::parse(line).ok_or_else(|| ClientError::MalformedResponse(line.to_string())))
            .collect::<Result<Vec<_>>>()?;

        if responses.len() != count {
            return Err(ClientError::MissingResponses {
                expected: count,
                received: responses.len(),
            });
        }
        debug!(client = %self.id, responses = responses.len(), "Session complete");
        Ok(responses)
    }

    fn announce(&self) -> Result<()> {
        let path = &self.config.control_path;
        let not_running = |source| ClientError::ServerNotRunning {
            path: path.clone(),
            source,
        };

        let mut control = Fifo::open_nonblocking(path, Direction::Write).map_err(not_running)?;
        control.write(format!("{}\n", self.id).as_bytes())?;
        control.close()?;
        debug!(client = %self.id, control = ?path, "Announced to server");
        Ok(())
    }
}
