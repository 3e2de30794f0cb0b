//! Routing of parsed frames to built-in protocol handling.
//!
//! Numeric replies and command words each get a sparse lookup table.
//! Anything not in a table is ignored.

use crate::irc::model::get_nick;
use crate::irc::parser::{parse_line, trailing, Verb};
use crate::irc::session::Session;
use crate::irc::trigger;
use std::collections::HashMap;
use std::sync::Arc;

/// RPL_MYINFO: last mandatory reply after registration.
pub const RPL_MYINFO: u16 = 4;
/// ERR_ERRONEUSNICKNAME.
pub const ERR_ERRONEUSNICKNAME: u16 = 432;
/// ERR_NICKNAMEINUSE.
pub const ERR_NICKNAMEINUSE: u16 = 433;
/// ERR_UNAVAILRESOURCE: nick temporarily blocked.
pub const ERR_UNAVAILRESOURCE: u16 = 437;
/// ERR_RESTRICTED: connection may not change nick.
pub const ERR_RESTRICTED: u16 = 484;

type ResponseHandler = fn(&Arc<Session>, &str, &[&str]);
type CommandHandler = fn(&Arc<Session>, &str, &[&str]);

pub struct Dispatcher {
    responses: HashMap<u16, ResponseHandler>,
    commands: HashMap<&'static str, CommandHandler>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let mut responses: HashMap<u16, ResponseHandler> = HashMap::new();
        responses.insert(RPL_MYINFO, on_registered);
        responses.insert(ERR_NICKNAMEINUSE, on_nick_in_use);
        responses.insert(ERR_ERRONEUSNICKNAME, on_nick_rejected);
        responses.insert(ERR_UNAVAILRESOURCE, on_nick_rejected);
        responses.insert(ERR_RESTRICTED, on_nick_rejected);

        let mut commands: HashMap<&'static str, CommandHandler> = HashMap::new();
        commands.insert("NICK", on_nick);
        commands.insert("PING", on_ping);
        commands.insert("PRIVMSG", on_privmsg);

        Self { responses, commands }
    }

    /// Parse one raw line and route it.
    pub fn handle_line(&self, session: &Arc<Session>, line: &str) {
        if session.debug() {
            tracing::debug!(session = %session.prefix(), "<= {}", line.trim_end());
        }
        let Some(frame) = parse_line(line) else {
            return;
        };
        match frame.verb {
            Verb::Numeric(code) => {
                if let Some(handler) = self.responses.get(&code) {
                    handler(session, frame.source, &frame.params);
                }
            }
            Verb::Word(word) => {
                if let Some(handler) = self.commands.get(word) {
                    handler(session, frame.source, &frame.params);
                }
            }
        }
    }
}

fn on_registered(session: &Arc<Session>, _source: &str, _params: &[&str]) {
    let user = session.user();
    if let Some(modes) = user.modes.as_deref().filter(|m| !m.is_empty()) {
        if let Err(e) = session.send_mode_user(modes) {
            tracing::warn!(session = %session.prefix(), "MODE failed: {}", e);
        }
    }
    if let Some(password) = user.nick_password.as_deref().filter(|p| !p.is_empty()) {
        if let Err(e) = session.send_nickserv_pass(password) {
            tracing::warn!(session = %session.prefix(), "NickServ identify failed: {}", e);
        }
    }
    session.fire_ready();
}

fn on_nick_in_use(session: &Arc<Session>, _source: &str, params: &[&str]) {
    // `<client> <rejected nick> :Nickname is already in use`
    let rejected = params.get(1).copied().unwrap_or_default();
    match session.send_nick_random(rejected) {
        Ok(nick) => {
            tracing::info!(session = %session.prefix(), "Nickname {} in use, trying {}", rejected, nick)
        }
        Err(e) => tracing::warn!(session = %session.prefix(), "Nick change failed: {}", e),
    }
}

/// A requested nick was refused for a reason other than a collision.
fn on_nick_rejected(session: &Arc<Session>, source: &str, params: &[&str]) {
    let rejected = params.get(1).copied().unwrap_or_default();
    if !session.is_registered() {
        // Still unregistered; the server will not let us in without a nick.
        on_nick_in_use(session, source, params);
        return;
    }
    tracing::warn!(session = %session.prefix(), "Nickname {} refused, keeping {}", rejected, session.nick());
    session.set_pending_nick(None);
}

fn on_nick(session: &Arc<Session>, source: &str, params: &[&str]) {
    // Renames of other users reach us too; only follow our own.
    if !session.is_own_nick(get_nick(source)) {
        return;
    }
    let nick = trailing(params);
    if nick.is_empty() {
        return;
    }
    tracing::info!(session = %session.prefix(), "Nickname is now {}", nick);
    session.set_nick(&nick);
    session.set_pending_nick(None);
}

fn on_ping(session: &Arc<Session>, _source: &str, params: &[&str]) {
    if let Err(e) = session.send_pong(&trailing(params)) {
        tracing::warn!(session = %session.prefix(), "PONG failed: {}", e);
    }
}

fn on_privmsg(session: &Arc<Session>, source: &str, params: &[&str]) {
    let [target, word, args @ ..] = params else {
        return;
    };
    let word = word.strip_prefix(':').unwrap_or(*word);
    trigger::handle_message(session, source, *target, word, args);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::irc::executor::CommandMap;
    use crate::irc::model::{CommandDef, Message, Scope, Server, Settings, User};
    use crate::irc::session::Options;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn session(options: Options) -> (Arc<Session>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let server = Server::new("irc.example.com", 6667, false);
        let user = User::new("Crab", "", "");
        (Session::new(&server, &user, options, tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[tokio::test]
    async fn test_ping_gets_pong() {
        let (session, mut rx) = session(Options::new());
        let dispatcher = Dispatcher::new();
        dispatcher.handle_line(&session, "PING :irc.example.com\r\n");
        dispatcher.handle_line(&session, ":irc.example.com PING :a b c\r\n");
        assert_eq!(drain(&mut rx), vec!["PONG :irc.example.com", "PONG :a b c"]);
    }

    #[tokio::test]
    async fn test_nick_collision_sends_one_new_nick() {
        let (session, mut rx) = session(Options::new());
        let dispatcher = Dispatcher::new();
        dispatcher.handle_line(&session, ":irc.example.com 433 * Crab :Nickname is already in use");

        let sent = drain(&mut rx);
        assert_eq!(sent.len(), 1);
        let nick = sent[0].strip_prefix("NICK ").unwrap();
        assert_ne!(nick, "Crab");
        assert_eq!(session.nick(), nick);
    }

    #[tokio::test]
    async fn test_nick_only_follows_own_rename() {
        let (session, mut rx) = session(Options::new());
        let dispatcher = Dispatcher::new();

        dispatcher.handle_line(&session, ":alice!a@h NICK :alicia");
        assert_eq!(session.nick(), "Crab");

        dispatcher.handle_line(&session, ":Crab!c@h NICK :Crabby");
        assert_eq!(session.nick(), "Crabby");

        dispatcher.handle_line(&session, ":crabby!c@h NICK Crabbier");
        assert_eq!(session.nick(), "Crabbier");
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_refused_rename_keeps_following_real_nick() {
        let (session, mut rx) = session(Options::new());
        let dispatcher = Dispatcher::new();
        dispatcher.handle_line(&session, ":irc.example.com 004 Crab irc.example.com v1 i o");

        session.send_nick("bad*nick").unwrap();
        dispatcher.handle_line(&session, ":irc.example.com 432 Crab bad*nick :Erroneous nickname");
        assert_eq!(session.nick(), "Crab");
        assert_eq!(session.pending_nick(), None);

        // A rename forced by the server is still recognised as ours.
        dispatcher.handle_line(&session, ":Crab!c@h NICK :Guest42");
        assert_eq!(session.nick(), "Guest42");
        assert_eq!(drain(&mut rx), vec!["NICK bad*nick"]);
    }

    #[tokio::test]
    async fn test_confirmed_rename_after_registration() {
        let (session, _rx) = session(Options::new());
        let dispatcher = Dispatcher::new();
        dispatcher.handle_line(&session, ":irc.example.com 004 Crab irc.example.com v1 i o");

        session.send_nick("Crabby").unwrap();
        assert_eq!(session.nick(), "Crab");
        dispatcher.handle_line(&session, ":Crab!c@h NICK :Crabby");
        assert_eq!(session.nick(), "Crabby");
        assert_eq!(session.pending_nick(), None);

        for code in ["437", "484"] {
            session.send_nick("Crabbier").unwrap();
            dispatcher.handle_line(&session, &format!(":irc.example.com {} Crabby Crabbier :No", code));
            assert_eq!(session.nick(), "Crabby");
            assert_eq!(session.pending_nick(), None);
        }
    }

    #[tokio::test]
    async fn test_erroneous_nick_before_registration_picks_another() {
        let (session, mut rx) = session(Options::new());
        Dispatcher::new().handle_line(&session, ":irc.example.com 432 * Crab :Erroneous nickname");

        let sent = drain(&mut rx);
        assert_eq!(sent.len(), 1);
        let nick = sent[0].strip_prefix("NICK ").unwrap();
        assert_ne!(nick, "Crab");
        assert_eq!(session.nick(), nick);
    }

    #[tokio::test]
    async fn test_registered_fires_ready_once() {
        let (ready_tx, mut ready_rx) = mpsc::unbounded_channel();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let options = Options::new().on_ready(move |session| {
            let ready_tx = ready_tx.clone();
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = ready_tx.send(session.nick());
            }
        });
        let (session, _rx) = session(options);
        let dispatcher = Dispatcher::new();

        dispatcher.handle_line(&session, ":irc.example.com 004 Crab irc.example.com v1 i o");
        dispatcher.handle_line(&session, ":irc.example.com 004 Crab irc.example.com v1 i o");

        let nick = tokio::time::timeout(Duration::from_secs(5), ready_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(nick, "Crab");
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_registered_sends_modes_and_identify() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let server = Server::new("irc.example.com", 6667, false);
        let user = User::new("Crab", "", "")
            .with_modes("+B")
            .with_nick_password("hunter2");
        let session = Session::new(&server, &user, Options::new(), tx);

        Dispatcher::new().handle_line(&session, ":irc.example.com 004 Crab irc.example.com v1");
        assert_eq!(
            drain(&mut rx),
            vec!["MODE Crab +B", "PRIVMSG NickServ :identify hunter2"]
        );
    }

    #[tokio::test]
    async fn test_privmsg_reaches_trigger_matcher() {
        let (calls_tx, mut calls) = mpsc::unbounded_channel::<Message>();
        let mut handlers = CommandMap::new();
        handlers.add("ping", move |_session, _command, message| {
            let calls_tx = calls_tx.clone();
            async move {
                let _ = calls_tx.send(message);
                anyhow::Ok(())
            }
        });
        let command = CommandDef {
            triggers: vec!["ping".into()],
            function: "ping".into(),
            arguments: String::new(),
            settings: Settings {
                scope: vec![Scope::Channel],
                ..Settings::default()
            },
        };
        let (session, _rx) = session(Options::new().handlers(handlers).commands(vec![command]));

        let dispatcher = Dispatcher::new();
        dispatcher.handle_line(&session, ":alice!u@h PRIVMSG #chan :!ping arg1\r\n");
        dispatcher.handle_line(&session, ":alice!u@h PRIVMSG #chan\r\n");

        let message = tokio::time::timeout(Duration::from_secs(5), calls.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(message.source, "alice!u@h");
        assert_eq!(message.target, "#chan");
        assert_eq!(message.trigger, "!ping");
        assert_eq!(message.args, vec!["arg1".to_string()]);
    }

    #[tokio::test]
    async fn test_unmapped_frames_are_ignored() {
        let (session, mut rx) = session(Options::new());
        let dispatcher = Dispatcher::new();
        dispatcher.handle_line(&session, ":irc.example.com 001 Crab :Welcome");
        dispatcher.handle_line(&session, ":alice!u@h JOIN #chan");
        dispatcher.handle_line(&session, "");
        assert!(drain(&mut rx).is_empty());
        assert_eq!(session.nick(), "Crab");
    }
}
