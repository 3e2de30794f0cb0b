use anyhow::{Context, Result};
use crabbot::config::{self, AppConfig};
use crabbot::irc::{self, CommandMap, Options};
use crabbot::logging;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(config::config_path);
    let cfg = config::load_config(&path)?;
    logging::init(&cfg.logging, cfg.debug)?;
    tracing::info!(config = %path.display(), "Starting crabbot");

    let server = cfg.server();
    let user = cfg.user();
    let options = Options::new()
        .debug(cfg.debug)
        .handlers(builtin_handlers())
        .commands(cfg.commands())
        .admins(cfg.admins.clone())
        .on_ready(join_channels(&cfg));

    let session = irc::establish(&server, &user, options)
        .await
        .with_context(|| format!("Failed to connect to {}:{}", server.host, server.port))?;

    tokio::select! {
        _ = session.closed() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(session = %session.prefix(), "Interrupted, shutting down");
            // The server closes the link after QUIT; don't wait on it forever.
            let _ = session.send_raw("QUIT :Leaving");
            if tokio::time::timeout(Duration::from_secs(5), session.closed()).await.is_err() {
                session.cancel();
            }
        }
    }
    session.wait().await;
    Ok(())
}

/// Ready callback joining every configured channel.
fn join_channels(
    cfg: &AppConfig,
) -> impl Fn(Arc<irc::Session>) -> futures::future::Ready<()> + Send + Sync + 'static {
    let channels = cfg.channel_keys();
    move |session| {
        for (channel, key) in &channels {
            if let Err(e) = session.send_join(channel, key.as_deref()) {
                tracing::warn!(session = %session.prefix(), "Join {} failed: {}", channel, e);
            }
        }
        futures::future::ready(())
    }
}

/// Handlers the default config refers to by key.
fn builtin_handlers() -> CommandMap {
    let mut handlers = CommandMap::new();

    handlers.add("ping", |session, _command, message| async move {
        session.send_response(&message.source, &message.target, "pong")?;
        anyhow::Ok(())
    });

    handlers.add("echo", |session, _command, message| async move {
        session.send_response(&message.source, &message.target, &message.args.join(" "))?;
        anyhow::Ok(())
    });

    handlers.add("nick", |session, _command, message| async move {
        let nick = message.args.first().context("missing nickname")?;
        session.send_nick(nick)?;
        anyhow::Ok(())
    });

    handlers.add("admin", |session, command, message| async move {
        let reply = match (message.args.first().map(String::as_str), message.args.get(1)) {
            (Some("add"), Some(nick)) => {
                session.add_admin(nick);
                format!("{} is now an admin", nick)
            }
            (Some("remove"), Some(nick)) => {
                session.remove_admin(nick);
                format!("{} is no longer an admin", nick)
            }
            (Some("list"), _) => format!("Admins: {}", session.admins().join(", ")),
            _ => format!("Usage: {} {}", message.trigger, command.arguments),
        };
        session.send_response(&message.source, &message.target, &reply)?;
        anyhow::Ok(())
    });

    handlers
}
