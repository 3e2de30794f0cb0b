//! crabbot: a single-connection IRC bot engine.
//!
//! [`irc::establish`] dials a server, registers, and returns a live
//! [`irc::Session`]. Inbound chat lines are matched against configured
//! [`irc::CommandDef`]s and run the handlers registered in a
//! [`irc::CommandMap`].

pub mod config;
pub mod irc;
pub mod logging;
