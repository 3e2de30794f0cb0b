//! Outbound frame builders.
//!
//! Thin wrappers over [`Session::send_raw`], one per protocol frame the bot
//! emits.

use crate::config::nickname::generate_nickname_avoiding;
use crate::irc::error::EngineError;
use crate::irc::model::{get_nick, is_channel};
use crate::irc::session::Session;

impl Session {
    /// Join a channel, with an optional key.
    pub fn send_join(&self, channel: &str, key: Option<&str>) -> Result<(), EngineError> {
        match key {
            Some(key) if !key.is_empty() => self.send_raw(&format!("JOIN {} {}", channel, key)),
            _ => self.send_raw(&format!("JOIN {}", channel)),
        }
    }

    pub fn send_mode_user(&self, modes: &str) -> Result<(), EngineError> {
        self.send_raw(&format!("MODE {} {}", self.nick(), modes))
    }

    /// Ask for a new nickname. Before registration the tracked nick follows
    /// immediately since servers do not echo NICK back yet; afterwards the
    /// request stays pending until the server confirms the rename.
    pub fn send_nick(&self, nick: &str) -> Result<(), EngineError> {
        if self.is_registered() {
            self.set_pending_nick(Some(nick));
        } else {
            self.set_nick(nick);
        }
        self.send_raw(&format!("NICK {}", nick))
    }

    /// Switch to a generated nickname different from `avoid` and from the
    /// one currently tracked. Returns the nickname sent.
    pub fn send_nick_random(&self, avoid: &str) -> Result<String, EngineError> {
        let current = self.nick();
        let nick = generate_nickname_avoiding(&[avoid, current.as_str()]);
        self.send_nick(&nick)?;
        Ok(nick)
    }

    pub fn send_nickserv_pass(&self, password: &str) -> Result<(), EngineError> {
        self.send_privmsg("NickServ", &format!("identify {}", password))
    }

    pub fn send_pass(&self, password: &str) -> Result<(), EngineError> {
        self.send_raw(&format!("PASS :{}", password))
    }

    pub fn send_ping(&self, payload: &str) -> Result<(), EngineError> {
        self.send_raw(&format!("PING :{}", payload))
    }

    pub fn send_pong(&self, payload: &str) -> Result<(), EngineError> {
        self.send_raw(&format!("PONG :{}", payload))
    }

    pub fn send_privmsg(&self, target: &str, text: &str) -> Result<(), EngineError> {
        self.send_raw(&format!("PRIVMSG {} :{}", target, text))
    }

    /// Reply where a message came from: the channel for channel messages,
    /// the sender's nick for private ones.
    pub fn send_response(&self, source: &str, target: &str, text: &str) -> Result<(), EngineError> {
        if is_channel(target) {
            self.send_privmsg(target, text)
        } else {
            self.send_privmsg(get_nick(source), text)
        }
    }

    pub fn send_user(&self, username: &str, realname: &str) -> Result<(), EngineError> {
        self.send_raw(&format!("USER {} 0 0 :{}", username, realname))
    }
}
