//! Configuration data model.
//!
//! All structs derive `Serialize`/`Deserialize` for TOML persistence.
//! Every field has a sensible default so the bot works out of the box.

use serde::{Deserialize, Serialize};

use super::nickname::generate_nickname;
use crate::irc::model::{CommandDef, Scope, Server, Settings, User};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub user: UserConfig,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub admins: Vec<String>,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub defaults: SettingsConfig,
    #[serde(default = "default_commands")]
    pub commands: Vec<CommandConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            user: UserConfig::default(),
            channels: vec![],
            admins: vec![],
            debug: false,
            logging: LoggingConfig::default(),
            defaults: SettingsConfig::default(),
            commands: default_commands(),
        }
    }
}

impl AppConfig {
    pub fn server(&self) -> Server {
        let server = Server::new(&self.server.host, self.server.port, self.server.tls);
        match &self.server.password {
            Some(password) => server.with_password(password),
            None => server,
        }
    }

    pub fn user(&self) -> User {
        let u = &self.user;
        let mut user = User::new(
            &u.nickname,
            u.username.as_deref().unwrap_or_default(),
            u.realname.as_deref().unwrap_or_default(),
        );
        user.modes = u.modes.clone().filter(|m| !m.is_empty());
        user.nick_password = u.nick_password.clone().filter(|p| !p.is_empty());
        user
    }

    /// Command definitions with unset settings taken from `[defaults]`.
    pub fn commands(&self) -> Vec<CommandDef> {
        self.commands
            .iter()
            .map(|c| CommandDef {
                triggers: c.triggers.clone(),
                function: c.function.clone(),
                arguments: c.arguments.clone(),
                settings: c.settings.resolve(&self.defaults),
            })
            .collect()
    }

    /// `(channel, key)` pairs from entries like `"#chan"` or `"#chan key"`.
    pub fn channel_keys(&self) -> Vec<(String, Option<String>)> {
        self.channels
            .iter()
            .filter_map(|entry| {
                let mut parts = entry.split_whitespace();
                let channel = parts.next()?.to_string();
                Some((channel, parts.next().map(|k| k.to_string())))
            })
            .collect()
    }
}

/// The IRC server to connect to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Hostname or IP address of the IRC server.
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub tls: bool,
    #[serde(default)]
    pub password: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tls: true,
            password: None,
        }
    }
}

/// Identity the bot registers with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default = "default_nickname")]
    pub nickname: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub realname: Option<String>,
    /// User modes applied once registered, e.g. `"+B"`.
    #[serde(default)]
    pub modes: Option<String>,
    #[serde(default)]
    pub nick_password: Option<String>,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            nickname: default_nickname(),
            username: None,
            realname: None,
            modes: None,
            nick_password: None,
        }
    }
}

/// Diagnostic logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write to daily files in `log_dir` instead of stderr.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: default_log_dir(),
            level: default_level(),
        }
    }
}

/// Process-wide command settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default = "default_symbol")]
    pub symbol: String,
    #[serde(default = "default_scope")]
    pub scope: Vec<Scope>,
    #[serde(default)]
    pub admin_only: bool,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            symbol: default_symbol(),
            scope: default_scope(),
            admin_only: false,
        }
    }
}

/// Per-command overrides; unset fields fall back to `[defaults]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_sensitive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Vec<Scope>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_only: Option<bool>,
}

impl CommandSettings {
    pub fn resolve(&self, defaults: &SettingsConfig) -> Settings {
        Settings {
            case_sensitive: self.case_sensitive.unwrap_or(defaults.case_sensitive),
            symbol: self.symbol.clone().unwrap_or_else(|| defaults.symbol.clone()),
            scope: self.scope.clone().unwrap_or_else(|| defaults.scope.clone()),
            admin_only: self.admin_only.unwrap_or(defaults.admin_only),
        }
    }
}

/// A chat command wired to a registered handler by `function`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    pub triggers: Vec<String>,
    pub function: String,
    #[serde(default)]
    pub arguments: String,
    #[serde(default)]
    pub settings: CommandSettings,
}

fn default_commands() -> Vec<CommandConfig> {
    vec![
        CommandConfig {
            triggers: vec!["ping".into()],
            function: "ping".into(),
            arguments: String::new(),
            settings: CommandSettings::default(),
        },
        CommandConfig {
            triggers: vec!["echo".into(), "say".into()],
            function: "echo".into(),
            arguments: "<text> [more...]".into(),
            settings: CommandSettings::default(),
        },
        CommandConfig {
            triggers: vec!["nick".into()],
            function: "nick".into(),
            arguments: "<nickname>".into(),
            settings: CommandSettings {
                admin_only: Some(true),
                ..CommandSettings::default()
            },
        },
        CommandConfig {
            triggers: vec!["admin".into()],
            function: "admin".into(),
            arguments: "<add|remove|list> [nickname]".into(),
            settings: CommandSettings {
                admin_only: Some(true),
                scope: Some(vec![Scope::Direct]),
                ..CommandSettings::default()
            },
        },
    ]
}

fn default_host() -> String {
    "irc.libera.chat".to_string()
}
fn default_nickname() -> String {
    generate_nickname()
}
fn default_port() -> u16 {
    6697
}
fn default_true() -> bool {
    true
}
fn default_symbol() -> String {
    "!".to_string()
}
fn default_scope() -> Vec<Scope> {
    vec![Scope::Channel, Scope::Direct]
}
fn default_log_dir() -> String {
    "~/.local/share/crabbot/logs".to_string()
}
fn default_level() -> String {
    "info".to_string()
}
