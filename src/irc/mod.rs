//! IRC protocol engine: connection lifecycle, frame parsing, dispatch, and
//! chat command execution.

mod actions;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod model;
pub mod parser;
pub mod session;
pub mod trigger;

pub use connection::{attach, establish};
pub use error::EngineError;
pub use executor::CommandMap;
pub use model::{CommandDef, Message, Scope, Server, Settings, User};
pub use session::{Options, Session};
