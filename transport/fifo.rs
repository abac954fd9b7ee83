// Named pipe (FIFO) wrapper with RAII close and optional delete-on-close
use crate::error::{Result, TransportError};
use crate::traits::Transport;
use nix::fcntl::{self, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::os::unix::fs::FileTypeExt;
use std::os::unix::io::{AsRawFd, FromRawFd};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Writes up to this size are never interleaved with other writers
pub const ATOMIC_WRITE_LIMIT: usize = libc::PIPE_BUF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
    /// Read and write on one descriptor. Opening never blocks and reads never
    /// see end-of-stream while the handle lives.
    Duplex,
}

impl Direction {
    fn flags(self) -> OFlag {
        match self {
            Direction::Read => OFlag::O_RDONLY,
            Direction::Write => OFlag::O_WRONLY,
            Direction::Duplex => OFlag::O_RDWR,
        }
    }
}

// rw-r--r--
fn fifo_mode() -> Mode {
    Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IROTH
}

/// Create a named pipe at `path`, replacing a stale pipe left there.
///
/// Fails with `NotAPipe` if something other than a pipe occupies the path.
pub fn make_fifo(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_fifo() => {
            debug!(path = ?path, "Removing stale pipe");
            fs::remove_file(path).map_err(|e| TransportError::io("remove", path, e))?;
        }
        Ok(_) => return Err(TransportError::NotAPipe(path.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(TransportError::io("stat", path, e)),
    }

    mkfifo(path, fifo_mode()).map_err(|e| TransportError::io("create", path, e.into()))
}

pub struct Fifo {
    path: PathBuf,
    file: Option<File>,
    direction: Direction,
    delete_on_close: bool,
}

impl Fifo {
    /// Create (or recreate) the pipe and open it. The pipe entry is removed
    /// again when this handle is closed.
    pub fn create(path: impl AsRef<Path>, direction: Direction) -> Result<Self> {
        let path = path.as_ref();
        make_fifo(path)?;

        match Self::open_with(path, direction, false, true) {
            Ok(fifo) => Ok(fifo),
            Err(e) => {
                let _ = fs::remove_file(path);
                Err(e)
            }
        }
    }

    /// Open an existing pipe. Blocks until the peer opens the other end
    /// (except for `Duplex`).
    pub fn open(path: impl AsRef<Path>, direction: Direction) -> Result<Self> {
        Self::open_with(path.as_ref(), direction, false, false)
    }

    /// Open an existing pipe without waiting for the peer.
    ///
    /// A write-side open fails right away when nobody has the pipe open for
    /// reading. Once open, the descriptor is switched back to blocking I/O.
    pub fn open_nonblocking(path: impl AsRef<Path>, direction: Direction) -> Result<Self> {
        Self::open_with(path.as_ref(), direction, true, false)
    }

    fn open_with(path: &Path, direction: Direction, nonblocking: bool, delete_on_close: bool) -> Result<Self> {
        let mut flags = direction.flags() | OFlag::O_CLOEXEC;
        if nonblocking {
            flags |= OFlag::O_NONBLOCK;
        }

        // nix::fcntl::open does not retry on EINTR, so a signal can break a
        // blocked open
        let fd = fcntl::open(path, flags, Mode::empty()).map_err(|e| TransportError::io("open", path, e.into()))?;
        // SAFETY: fd was just returned by open(2) and nothing else owns it
        let file = unsafe { File::from_raw_fd(fd) };

        if nonblocking {
            set_blocking(&file).map_err(|e| TransportError::io("configure", path, e))?;
        }

        debug!(path = ?path, ?direction, "Opened pipe");
        Ok(Fifo {
            path: path.to_path_buf(),
            file: Some(file),
            direction,
            delete_on_close,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Blocking read. Returns 0 once the peer closed its end.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let file = self.file.as_mut().ok_or_else(|| TransportError::Closed(self.path.clone()))?;
        file.read(buf).map_err(|e| TransportError::io("read", &self.path, e))
    }

    /// Blocking write issued as a single write(2). Only writes of at most
    /// `ATOMIC_WRITE_LIMIT` bytes are guaranteed to arrive in one piece.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        let file = self.file.as_mut().ok_or_else(|| TransportError::Closed(self.path.clone()))?;
        file.write(data).map_err(|e| TransportError::io("write", &self.path, e))
    }

    /// Close the descriptor and, for pipes this handle created, remove the
    /// pipe entry. Safe to call more than once.
    pub fn close(&mut self) -> Result<()> {
        if self.file.take().is_none() {
            return Ok(());
        }
        debug!(path = ?self.path, "Closed pipe");

        if self.delete_on_close {
            self.delete_on_close = false;
            match fs::remove_file(&self.path) {
                Ok(()) => {}
                // Already gone, e.g. unlinked from a signal handler
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(TransportError::io("remove", &self.path, e)),
            }
        }
        Ok(())
    }
}

fn set_blocking(file: &File) -> io::Result<()> {
    let fd = file.as_raw_fd();
    // SAFETY: fd is a valid descriptor owned by `file` for the whole call
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: as above
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

impl Transport for Fifo {
    fn send(&mut self, data: &[u8]) -> Result<usize> {
        self.write(data)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.read(buf)
    }

    fn close(&mut self) -> Result<()> {
        Fifo::close(self)
    }
}

impl Drop for Fifo {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(path = ?self.path, error = %e, "Failed to clean up pipe");
        }
    }
}
