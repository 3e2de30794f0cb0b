//! Connection and command descriptors shared by the engine.
//!
//! These are plain values: the config layer builds them, the engine only
//! reads them.

use serde::{Deserialize, Serialize};

/// Where a server lives and how to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Server {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub password: Option<String>,
}

impl Server {
    pub fn new(host: impl Into<String>, port: u16, tls: bool) -> Self {
        Self {
            host: host.into(),
            port,
            tls,
            password: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        let password = password.into();
        self.password = if password.is_empty() { None } else { Some(password) };
        self
    }
}

/// Identity presented during registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub nick: String,
    pub username: String,
    pub realname: String,
    pub modes: Option<String>,
    pub nick_password: Option<String>,
}

impl User {
    /// Empty username or realname fall back to the nickname.
    pub fn new(nick: impl Into<String>, username: &str, realname: &str) -> Self {
        let nick = nick.into();
        let username = if username.is_empty() { nick.clone() } else { username.to_string() };
        let realname = if realname.is_empty() { nick.clone() } else { realname.to_string() };
        Self {
            nick,
            username,
            realname,
            modes: None,
            nick_password: None,
        }
    }

    pub fn with_modes(mut self, modes: impl Into<String>) -> Self {
        self.modes = Some(modes.into());
        self
    }

    pub fn with_nick_password(mut self, password: impl Into<String>) -> Self {
        self.nick_password = Some(password.into());
        self
    }
}

/// Context a command may be invoked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Messages sent to a channel.
    Channel,
    /// Private messages sent straight to the bot.
    Direct,
}

/// Per-command matching rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub case_sensitive: bool,
    pub symbol: String,
    pub scope: Vec<Scope>,
    pub admin_only: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            symbol: "!".to_string(),
            scope: vec![Scope::Channel, Scope::Direct],
            admin_only: false,
        }
    }
}

/// A chat command: what triggers it, which handler runs it, and what
/// arguments it expects (`<mandatory>` and `[optional]` markers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDef {
    pub triggers: Vec<String>,
    pub function: String,
    pub arguments: String,
    pub settings: Settings,
}

/// The chat line that fired a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub source: String,
    pub target: String,
    pub trigger: String,
    pub args: Vec<String>,
}

impl Message {
    /// Nickname part of the source.
    pub fn nick(&self) -> &str {
        get_nick(&self.source)
    }
}

/// True when the target names a channel rather than a user.
pub fn is_channel(target: &str) -> bool {
    target.starts_with('#') || target.starts_with('&')
}

/// Isolate the nickname from a `nick!user@host` source.
pub fn get_nick(source: &str) -> &str {
    match source.find('!') {
        Some(pos) => &source[..pos],
        None => source,
    }
}
