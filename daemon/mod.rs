// daemon: LED server library - configuration, views, signal handling and the server loop
pub mod config;
pub mod server;
pub mod signal;
pub mod view;

pub use config::*;
pub use server::*;
pub use view::*;
