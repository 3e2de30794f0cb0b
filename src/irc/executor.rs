//! Handler registry and detached execution.
//!
//! Command definitions name their handler by a string key, so the config
//! file can wire triggers to code without knowing anything about it.

use crate::irc::error::EngineError;
use crate::irc::model::{CommandDef, Message};
use crate::irc::session::Session;
use anyhow::Result;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// A registered command handler.
pub type CommandFn =
    Arc<dyn Fn(Arc<Session>, Arc<CommandDef>, Message) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Maps handler keys to async handler functions.
#[derive(Clone, Default)]
pub struct CommandMap {
    handlers: HashMap<String, CommandFn>,
}

impl CommandMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `f` under `key`, replacing any previous handler.
    pub fn add<F, Fut>(&mut self, key: &str, f: F)
    where
        F: Fn(Arc<Session>, Arc<CommandDef>, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let handler: CommandFn = Arc::new(
            move |session: Arc<Session>, command: Arc<CommandDef>, message: Message| -> BoxFuture<'static, Result<()>> {
                Box::pin(f(session, command, message))
            },
        );
        self.handlers.insert(key.to_string(), handler);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.handlers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Spawn the handler for `key` as its own task and return without
    /// waiting. Errors and panics stay inside that task.
    pub fn exec(
        &self,
        key: &str,
        session: &Arc<Session>,
        command: Arc<CommandDef>,
        message: Message,
    ) -> Result<(), EngineError> {
        let handler = self
            .handlers
            .get(key)
            .ok_or_else(|| EngineError::InvalidKey(key.to_string()))?;

        let fut = handler(Arc::clone(session), command, message);
        let prefix = session.prefix().to_string();
        let key = key.to_string();
        tokio::spawn(async move {
            if let Err(e) = fut.await {
                tracing::warn!(session = %prefix, command = %key, "Command failed: {:#}", e);
            }
        });
        Ok(())
    }
}

impl std::fmt::Debug for CommandMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.handlers.keys().collect();
        keys.sort();
        f.debug_struct("CommandMap").field("handlers", &keys).finish()
    }
}
