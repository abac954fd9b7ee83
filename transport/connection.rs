// Per-client connection: one request pipe and one response pipe
use crate::error::{Result, TransportError};
use crate::fifo::{Direction, Fifo};
use crate::traits::Transport;
use ledsrv_core::ClientId;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ID_PLACEHOLDER: &str = "{id}";
pub const DEFAULT_CONTROL_PATH: &str = "/tmp/ledsrv";
pub const DEFAULT_INBOUND_TEMPLATE: &str = "/tmp/ledsrv.in.{id}";
pub const DEFAULT_OUTBOUND_TEMPLATE: &str = "/tmp/ledsrv.out.{id}";

/// Path templates for the per-client pipes. `{id}` is replaced by the client
/// id. Inbound carries client -> server requests, outbound the responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionPaths {
    pub inbound: String,
    pub outbound: String,
}

impl Default for ConnectionPaths {
    fn default() -> Self {
        ConnectionPaths {
            inbound: DEFAULT_INBOUND_TEMPLATE.to_string(),
            outbound: DEFAULT_OUTBOUND_TEMPLATE.to_string(),
        }
    }
}

impl ConnectionPaths {
    pub fn new(inbound: impl Into<String>, outbound: impl Into<String>) -> Self {
        ConnectionPaths {
            inbound: inbound.into(),
            outbound: outbound.into(),
        }
    }

    /// Default file names placed under `dir`
    pub fn in_dir(dir: &Path) -> Self {
        let dir = dir.display();
        ConnectionPaths {
            inbound: format!("{}/ledsrv.in.{}", dir, ID_PLACEHOLDER),
            outbound: format!("{}/ledsrv.out.{}", dir, ID_PLACEHOLDER),
        }
    }

    /// Both templates must carry the placeholder and must not expand to the
    /// same path.
    pub fn is_valid(&self) -> bool {
        self.inbound.contains(ID_PLACEHOLDER)
            && self.outbound.contains(ID_PLACEHOLDER)
            && self.inbound != self.outbound
    }

    pub fn inbound_for(&self, client: ClientId) -> PathBuf {
        expand(&self.inbound, client)
    }

    pub fn outbound_for(&self, client: ClientId) -> PathBuf {
        expand(&self.outbound, client)
    }
}

fn expand(template: &str, client: ClientId) -> PathBuf {
    PathBuf::from(template.replace(ID_PLACEHOLDER, &client.to_string()))
}

fn connection_error(client: ClientId, source: TransportError) -> TransportError {
    TransportError::Connection {
        client,
        source: Box::new(source),
    }
}

pub struct Connection {
    client: ClientId,
    inbound: Fifo,
    outbound: Fifo,
}

impl Connection {
    /// Open the client's request pipe for reading, then its response pipe
    /// for writing. Each open blocks until the client opens the matching end,
    /// so the client has to open in the same order.
    pub fn open(paths: &ConnectionPaths, client: ClientId) -> Result<Self> {
        let inbound = Fifo::open(paths.inbound_for(client), Direction::Read)
            .map_err(|e| connection_error(client, e))?;

        let outbound = match Fifo::open(paths.outbound_for(client), Direction::Write) {
            Ok(fifo) => fifo,
            Err(e) => {
                let mut inbound = inbound;
                let _ = inbound.close();
                return Err(connection_error(client, e));
            }
        };

        debug!(client = %client, "Connection established");
        Ok(Connection {
            client,
            inbound,
            outbound,
        })
    }

    pub fn client(&self) -> ClientId {
        self.client
    }

    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.inbound.read(buf)
    }

    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        self.outbound.write(data)
    }

    /// Close both pipes. Safe to call more than once.
    pub fn close(&mut self) -> Result<()> {
        let inbound = self.inbound.close();
        let outbound = self.outbound.close();
        inbound.and(outbound)
    }
}

impl Transport for Connection {
    fn send(&mut self, data: &[u8]) -> Result<usize> {
        self.write(data)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.read(buf)
    }

    fn close(&mut self) -> Result<()> {
        Connection::close(self)
    }
}
