// LED views: where committed LED state ends up
use crate::config::ViewKind;
use ledsrv_core::{LedState, LedView};
use std::io::{self, Write};
use tracing::{info, warn};

/// Writes one timestamped line per update, e.g.
/// `2026/10/16 12:00:00.123456 { on, blue, 3 }`
pub struct StreamView<W: Write + Send> {
    out: W,
}

pub type StdoutView = StreamView<io::Stdout>;

impl StdoutView {
    pub fn stdout() -> Self {
        StreamView::new(io::stdout())
    }
}

impl<W: Write + Send> StreamView<W> {
    pub fn new(out: W) -> Self {
        StreamView { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> LedView for StreamView<W> {
    fn update(&mut self, state: &LedState) {
        let now = chrono::Local::now();
        let result = writeln!(self.out, "{} {}", now.format("%Y/%m/%d %H:%M:%S%.6f"), state)
            .and_then(|_| self.out.flush());
        if let Err(e) = result {
            warn!(error = %e, "LED view write failed");
        }
    }
}

/// Reports updates as structured log events
#[derive(Debug, Default)]
pub struct LogView;

impl LedView for LogView {
    fn update(&mut self, state: &LedState) {
        info!(
            target: "ledsrv::view",
            on = state.on,
            color = %state.color,
            rate = state.rate,
            "LED updated"
        );
    }
}

/// The one view instance the server runs with
pub fn create_view(kind: ViewKind) -> Box<dyn LedView> {
    match kind {
        ViewKind::Stdout => Box::new(StdoutView::stdout()),
        ViewKind::Log => Box::new(LogView),
    }
}
