// Signal handling: SIGINT/SIGTERM request shutdown and remove the control pipe
//
// Handlers are installed without SA_RESTART, so a blocked pipe open/read
// returns EINTR and the server loop gets to observe the shutdown flag.
use nix::errno::Errno;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use once_cell::sync::OnceCell;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);
static CONTROL_PATH: OnceCell<CString> = OnceCell::new();

extern "C" fn handle_shutdown(_signal: libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
    if let Some(path) = CONTROL_PATH.get() {
        // SAFETY: unlink(2) is async-signal-safe and path is NUL-terminated
        unsafe {
            libc::unlink(path.as_ptr());
        }
    }
}

/// Install the shutdown handlers. `control_path` is unlinked from the
/// handler itself, even if the main loop is stuck in a blocking call.
pub fn install(control_path: &Path) -> nix::Result<()> {
    let path = CString::new(control_path.as_os_str().as_bytes()).map_err(|_| Errno::EINVAL)?;
    let _ = CONTROL_PATH.set(path);

    let action = SigAction::new(SigHandler::Handler(handle_shutdown), SaFlags::empty(), SigSet::empty());
    for signal in [Signal::SIGINT, Signal::SIGTERM] {
        // SAFETY: the handler only touches an atomic, a set-once cell and unlink(2)
        unsafe { sigaction(signal, &action) }?;
    }
    Ok(())
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN.load(Ordering::SeqCst)
}
