// End-to-end sessions over real named pipes: the server runs one poll on a
// background thread while the client drives the handshake from the test.
use ledsrv_client::{ClientConfig, ClientError, LedClient};
use ledsrv_core::{ClientId, LedColor, LedState, LedView, Response};
use ledsrv_daemon::{ClientFailurePolicy, Server, ServerConfig};
use ledsrv_transport::{Direction, Fifo};
use std::sync::{Arc, Mutex};
use std::thread;
use tempfile::TempDir;

#[derive(Clone, Default)]
struct SharedView {
    updates: Arc<Mutex<Vec<LedState>>>,
}

impl LedView for SharedView {
    fn update(&mut self, state: &LedState) {
        self.updates.lock().unwrap().push(*state);
    }
}

struct Harness {
    dir: TempDir,
    server: Option<Server>,
    view: SharedView,
}

impl Harness {
    fn new() -> Self {
        Self::with_policy(ClientFailurePolicy::Abort)
    }

    fn with_policy(client_failure: ClientFailurePolicy) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            client_failure,
            ..ServerConfig::in_dir(dir.path())
        };
        let view = SharedView::default();
        let server = Server::bind(config, Box::new(view.clone())).unwrap();

        Harness {
            dir,
            server: Some(server),
            view,
        }
    }

    fn client(&self, id: u32) -> LedClient {
        LedClient::new(ClientConfig::in_dir(self.dir.path())).with_id(ClientId::new(id).unwrap())
    }

    fn server(&self) -> &Server {
        self.server.as_ref().unwrap()
    }

    fn updates(&self) -> Vec<LedState> {
        self.view.updates.lock().unwrap().clone()
    }

    /// Run one full client session against one server poll
    fn session(&mut self, client: &LedClient, requests: &[&str]) -> Vec<Response> {
        let mut server = self.server.take().unwrap();
        let handle = thread::spawn(move || {
            server.poll_once().unwrap();
            server
        });

        let responses = client.batch(requests).expect("client session failed");
        self.server = Some(handle.join().unwrap());
        responses
    }

    fn session_text(&mut self, client: &LedClient, requests: &[&str]) -> Vec<String> {
        self.session(client, requests).iter().map(|r| r.to_string()).collect()
    }
}

#[test]
fn test_set_color_then_get_color() {
    let mut h = Harness::new();
    let client = h.client(1001);

    assert_eq!(h.session_text(&client, &["set-led-color blue"]), vec!["OK"]);
    assert_eq!(h.session_text(&client, &["get-led-color"]), vec!["OK blue"]);
    assert_eq!(h.server().led_state().color, LedColor::Blue);
    assert_eq!(h.server().clients_served(), 2);
}

#[test]
fn test_out_of_range_rate_keeps_default() {
    let mut h = Harness::new();
    let client = h.client(1002);

    assert_eq!(h.session_text(&client, &["set-led-rate 7"]), vec!["FAILED"]);
    assert_eq!(h.session_text(&client, &["get-led-rate"]), vec!["OK 1"]);
    // Only the startup refresh reached the view
    assert_eq!(h.updates(), vec![LedState::default()]);
}

#[test]
fn test_batch_answers_every_request_in_order() {
    let mut h = Harness::new();
    let client = h.client(1003);

    let responses = h.session_text(
        &client,
        &[
            "set-led-state on",
            "get-led-state",
            "blink fast",
            "get-led-state extra",
            "set-led-rate   3",
            "get-led-rate",
            "set-led-rate three",
        ],
    );
    assert_eq!(
        responses,
        vec!["OK", "OK on", "FAILED", "FAILED", "OK", "OK 3", "FAILED"]
    );

    let expected = LedState {
        on: true,
        color: LedColor::Red,
        rate: 3,
    };
    assert_eq!(*h.server().led_state(), expected);
    assert_eq!(h.updates().len(), 3);
    assert_eq!(h.updates().last(), Some(&expected));
}

#[test]
fn test_repeated_command_updates_view_once() {
    let mut h = Harness::new();
    let client = h.client(1004);

    assert_eq!(h.session_text(&client, &["set-led-color green"]), vec!["OK"]);
    assert_eq!(h.session_text(&client, &["set-led-color green"]), vec!["OK"]);

    let updates = h.updates();
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[1].color, LedColor::Green);
}

#[test]
fn test_color_value_case_insensitive_verb_case_sensitive() {
    let mut h = Harness::new();
    let client = h.client(1005);

    let responses = h.session_text(
        &client,
        &[
            "set-led-color BLUE",
            "set-led-color Red",
            "set-led-color green",
            "Set-Led-Color blue",
            "get-led-color",
        ],
    );
    assert_eq!(responses, vec!["OK", "OK", "OK", "FAILED", "OK green"]);
}

#[test]
fn test_sequential_clients_are_isolated() {
    let mut h = Harness::new();
    let first = h.client(2001);
    let second = h.client(2002);
    let paths = ServerConfig::in_dir(h.dir.path()).paths;

    assert_eq!(h.session_text(&first, &["set-led-state on"]), vec!["OK"]);
    assert!(!paths.inbound_for(first.id()).exists());
    assert!(!paths.outbound_for(first.id()).exists());

    assert_eq!(h.session_text(&second, &["get-led-state"]), vec!["OK on"]);

    // Same id again after teardown gets fresh pipes
    assert_eq!(h.session_text(&first, &["set-led-state off"]), vec!["OK"]);
    assert_eq!(h.server().clients_served(), 3);
    assert!(!h.server().led_state().on);
}

#[test]
fn test_skip_policy_survives_vanished_client() {
    let mut h = Harness::with_policy(ClientFailurePolicy::Skip);
    let control_path = ServerConfig::in_dir(h.dir.path()).control_path;

    // A client that announces itself but never created its pipes
    let mut control = Fifo::open(&control_path, Direction::Write).unwrap();
    control.write(b"3001\n").unwrap();
    control.close().unwrap();
    {
        let server = h.server.as_mut().unwrap();
        server.poll_once().unwrap();
        assert_eq!(server.clients_served(), 0);
    }

    let client = h.client(3002);
    assert_eq!(h.session_text(&client, &["get-led-color"]), vec!["OK red"]);
    assert_eq!(h.server().clients_served(), 1);
}

#[test]
fn test_shutdown_removes_control_pipe() {
    let mut h = Harness::new();
    let control_path = ServerConfig::in_dir(h.dir.path()).control_path;
    assert!(control_path.exists());

    h.server.as_mut().unwrap().shutdown();
    assert!(!control_path.exists());

    let err = h.client(4001).request("get-led-state").unwrap_err();
    assert!(matches!(err, ClientError::ServerNotRunning { .. }));
}
