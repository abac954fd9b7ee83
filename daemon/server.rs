// Server loop: read client ids from the control pipe, then serve each client
// over its own pipe pair (open in.<id> for read, out.<id> for write, answer
// every request, close both) before reading the next announcement.
use crate::config::{ClientFailurePolicy, ServerConfig};
use crate::signal;
use ledsrv_core::{ClientId, Dispatcher, LedState, LedView, Response};
use ledsrv_transport::{read_requests, Connection, Direction, Fifo, LineAccumulator, TransportError};
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("control channel failed: {0}")]
    Control(#[source] TransportError),

    #[error("serving client {client} failed: {source}")]
    Client {
        client: ClientId,
        #[source]
        source: TransportError,
    },
}

impl ServerError {
    pub fn is_interrupted(&self) -> bool {
        match self {
            ServerError::Control(e) => e.is_interrupted(),
            ServerError::Client { source, .. } => source.is_interrupted(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting on the control pipe
    Idle,
    /// Announcements read, not yet connected
    AwaitingClient,
    /// Exchanging requests with one client
    Serving,
    ShutDown,
}

pub struct Server {
    config: ServerConfig,
    control: Fifo,
    accumulator: LineAccumulator,
    dispatcher: Dispatcher,
    state: ServerState,
    clients_served: u64,
}

impl Server {
    /// Create the control pipe and push the initial LED state to the view
    pub fn bind(config: ServerConfig, view: Box<dyn LedView>) -> Result<Self, ServerError> {
        let control = Fifo::create(&config.control_path, Direction::Duplex).map_err(ServerError::Control)?;
        info!(path = ?config.control_path, "Listening for clients");

        let mut dispatcher = Dispatcher::new(view);
        dispatcher.refresh_view();

        Ok(Server {
            config,
            control,
            accumulator: LineAccumulator::new(),
            dispatcher,
            state: ServerState::Idle,
            clients_served: 0,
        })
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn led_state(&self) -> &LedState {
        self.dispatcher.state()
    }

    pub fn clients_served(&self) -> u64 {
        self.clients_served
    }

    /// Serve clients until a shutdown signal arrives or a fatal error occurs.
    /// The control pipe is removed either way.
    pub fn run(&mut self) -> Result<(), ServerError> {
        let result = loop {
            if signal::shutdown_requested() {
                info!("Shutdown requested");
                break Ok(());
            }

            match self.poll_once() {
                Ok(()) => {}
                // Loop back to check the shutdown flag
                Err(e) if e.is_interrupted() => continue,
                Err(e) => break Err(e),
            }
        };

        self.shutdown();
        result
    }

    /// Read one batch of announcements from the control pipe and serve every
    /// client in it, in order.
    pub fn poll_once(&mut self) -> Result<(), ServerError> {
        self.set_state(ServerState::Idle);

        let lines = match self.accumulator.read_from(&mut self.control) {
            Ok(lines) => lines,
            Err(e) if e.is_interrupted() => return Ok(()),
            Err(e) => {
                error!(error = %e, "Control pipe read failed");
                return Err(ServerError::Control(e));
            }
        };
        if lines.is_empty() {
            return Ok(());
        }
        self.set_state(ServerState::AwaitingClient);

        for (i, line) in lines.iter().enumerate() {
            if signal::shutdown_requested() {
                info!(remaining = lines.len() - i, "Shutdown requested, dropping pending announcements");
                break;
            }

            let client: ClientId = match line.trim().parse() {
                Ok(client) => client,
                Err(e) => {
                    warn!(error = %e, "Ignoring control message");
                    continue;
                }
            };

            if let Err(e) = self.serve_client(client) {
                // An interrupted session ends the batch so `run` sees the signal
                if e.is_interrupted() || signal::shutdown_requested() {
                    warn!(error = %e, "Client session interrupted");
                    self.set_state(ServerState::Idle);
                    return if e.is_interrupted() { Err(e) } else { Ok(()) };
                }
                match self.config.client_failure {
                    ClientFailurePolicy::Abort => {
                        error!(error = %e, "Client session failed, stopping");
                        return Err(e);
                    }
                    ClientFailurePolicy::Skip => {
                        warn!(error = %e, "Client session failed, dropping client");
                    }
                }
            }
        }

        self.set_state(ServerState::Idle);
        Ok(())
    }

    fn serve_client(&mut self, client: ClientId) -> Result<(), ServerError> {
        let span = info_span!("client", %client);
        let _enter = span.enter();
        self.set_state(ServerState::Serving);

        let mut conn =
            Connection::open(&self.config.paths, client).map_err(|source| ServerError::Client { client, source })?;
        let requests = read_requests(&mut conn).map_err(|source| ServerError::Client { client, source })?;

        for request in &requests {
            let result = self.dispatcher.dispatch(request);
            match &result {
                Ok(output) => debug!(request = %request, ?output, "Request succeeded"),
                Err(e) => info!(request = %request, error = %e, "Request failed"),
            }

            // One write per response keeps each line atomic
            let wire = Response::from(result).encode();
            let written = conn
                .write(wire.as_bytes())
                .map_err(|source| ServerError::Client { client, source })?;
            if written < wire.len() {
                warn!(written, expected = wire.len(), "Short response write");
            }
        }

        conn.close().map_err(|source| ServerError::Client { client, source })?;
        self.clients_served += 1;
        info!(requests = requests.len(), led = %self.dispatcher.state(), "Client served");
        Ok(())
    }

    /// Close and remove the control pipe. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.state == ServerState::ShutDown {
            return;
        }
        self.set_state(ServerState::ShutDown);

        if let Err(e) = self.control.close() {
            warn!(error = %e, "Failed to remove control pipe");
        }
        info!(clients_served = self.clients_served, "Server stopped");
    }

    fn set_state(&mut self, state: ServerState) {
        if self.state != state {
            debug!(from = ?self.state, to = ?state, "State change");
            self.state = state;
        }
    }
}
