// Transport module: named pipes, per-client connections and request framing
pub mod error;
pub mod traits;
pub mod fifo;
pub mod connection;
pub mod reader;

pub use error::*;
pub use traits::*;
pub use fifo::*;
pub use connection::*;
pub use reader::*;
