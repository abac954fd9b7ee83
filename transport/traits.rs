// Transport abstraction - byte stream endpoints the reader and server work over
use crate::error::Result;

pub trait Transport: Send {
    fn send(&mut self, data: &[u8]) -> Result<usize>;
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize>;
    fn close(&mut self) -> Result<()>;
}
