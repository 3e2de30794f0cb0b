//! Chat command matching.
//!
//! Every PRIVMSG is checked against every trigger of every registered
//! command. All matches fire; one line can run several handlers.

use crate::irc::model::{get_nick, is_channel, Message, Scope, Settings};
use crate::irc::session::Session;
use std::sync::Arc;

/// Replaced by the session's current nickname inside a trigger.
pub const NICK_PLACEHOLDER: &str = "{nick}";

/// Check `word` against each command and run the ones that match.
pub fn handle_message(session: &Arc<Session>, source: &str, target: &str, word: &str, args: &[&str]) {
    let nick = session.nick();
    for command in session.commands() {
        let settings = &command.settings;
        for trigger in &command.triggers {
            let candidate = compose(settings, trigger, &nick);
            if !trigger_matches(settings, &candidate, word) || !scope_matches(settings, target) {
                continue;
            }
            if settings.admin_only && !session.is_admin_source(source) {
                continue;
            }

            if args.len() < required_args(&command.arguments) {
                let usage = format!("Invalid arguments. Usage: {} {}", candidate, command.arguments);
                if let Err(e) = session.send_response(source, target, usage.trim_end()) {
                    tracing::warn!(session = %session.prefix(), "Usage reply failed: {}", e);
                }
                continue;
            }

            let message = Message {
                source: source.to_string(),
                target: target.to_string(),
                trigger: candidate,
                args: args.iter().map(|a| a.to_string()).collect(),
            };
            if let Err(e) = session
                .handlers()
                .exec(&command.function, session, Arc::clone(command), message)
            {
                tracing::warn!(session = %session.prefix(), sender = get_nick(source), "{}", e);
            }
        }
    }
}

/// Symbol plus trigger, with the nick placeholder filled in.
pub fn compose(settings: &Settings, trigger: &str, nick: &str) -> String {
    format!("{}{}", settings.symbol, trigger).replace(NICK_PLACEHOLDER, nick)
}

pub fn trigger_matches(settings: &Settings, candidate: &str, word: &str) -> bool {
    candidate == word || (!settings.case_sensitive && candidate.to_lowercase() == word.to_lowercase())
}

pub fn scope_matches(settings: &Settings, target: &str) -> bool {
    settings.scope.iter().any(|scope| match scope {
        Scope::Channel => is_channel(target),
        Scope::Direct => !is_channel(target),
    })
}

/// Number of `<mandatory>` slots in an argument signature.
pub fn required_args(signature: &str) -> usize {
    signature
        .split_whitespace()
        .filter(|arg| arg.len() >= 2 && arg.starts_with('<') && arg.ends_with('>'))
        .count()
}
