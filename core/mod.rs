// Core module: LED state, line protocol and command dispatch (NO I/O dependencies)
pub mod types;
pub mod protocol;
pub mod dispatch;
pub mod view;

pub use types::*;
pub use protocol::*;
pub use dispatch::*;
pub use view::*;
