// A signal that interrupts one session of a multi-client batch must stop the
// server even when failed sessions are skipped. One test per binary, since
// signal state is process-wide.
use ledsrv_core::{ClientId, LedState, LedView};
use ledsrv_daemon::{signal, ClientFailurePolicy, Server, ServerConfig, ServerState};
use ledsrv_transport::{make_fifo, Direction, Fifo};
use std::os::unix::thread::JoinHandleExt;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

struct NullView;

impl LedView for NullView {
    fn update(&mut self, _state: &LedState) {}
}

#[test]
fn test_interrupt_ends_batch_under_skip_policy() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        client_failure: ClientFailurePolicy::Skip,
        ..ServerConfig::in_dir(dir.path())
    };
    let control_path = config.control_path.clone();
    signal::install(&control_path).unwrap();

    // Request pipes exist but no client ever opens them, so each session
    // blocks in its open until a signal cuts it short
    let ids: Vec<ClientId> = (10..20).map(|id| ClientId::new(id).unwrap()).collect();
    for id in &ids {
        make_fifo(&config.paths.inbound_for(*id)).unwrap();
    }

    let mut server = Server::bind(config, Box::new(NullView)).unwrap();

    let announcements: String = ids.iter().map(|id| format!("{id}\n")).collect();
    let mut control = Fifo::open(&control_path, Direction::Write).unwrap();
    control.write(announcements.as_bytes()).unwrap();
    control.close().unwrap();

    let (done_tx, done_rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let result = server.run();
        done_tx.send((result, server)).unwrap();
    });

    // A couple of retries cover a signal landing between two blocking
    // calls; far fewer than one per queued client
    let mut outcome = None;
    for _ in 0..3 {
        unsafe {
            libc::pthread_kill(handle.as_pthread_t(), libc::SIGTERM);
        }
        if let Ok(done) = done_rx.recv_timeout(Duration::from_millis(300)) {
            outcome = Some(done);
            break;
        }
    }
    let (result, server) = outcome.expect("server kept serving the batch after SIGTERM");
    handle.join().unwrap();

    assert!(result.is_ok());
    assert_eq!(server.state(), ServerState::ShutDown);
    assert_eq!(server.clients_served(), 0);
    assert!(!control_path.exists());
}
