//! Runtime state of one live connection.
//!
//! A [`Session`] is shared (`Arc`) between the read loop, the heartbeat loop,
//! the writer task and every spawned command handler. The tracked nick and
//! the admin list sit behind locks; everything else is fixed once the
//! session is built.

use crate::irc::error::EngineError;
use crate::irc::executor::CommandMap;
use crate::irc::model::{get_nick, CommandDef, Server, User};
use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Callback invoked once the server reports registration complete.
pub type ReadyFn = Arc<dyn Fn(Arc<Session>) -> BoxFuture<'static, ()> + Send + Sync>;

/// Everything a caller hands to [`establish`](crate::irc::connection::establish)
/// besides the server and user descriptors.
#[derive(Default)]
pub struct Options {
    pub debug: bool,
    pub ready: Option<ReadyFn>,
    pub handlers: CommandMap,
    pub commands: Vec<CommandDef>,
    pub admins: Vec<String>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn on_ready<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Arc<Session>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.ready = Some(Arc::new(move |session: Arc<Session>| -> BoxFuture<'static, ()> {
            Box::pin(f(session))
        }));
        self
    }

    pub fn handlers(mut self, handlers: CommandMap) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn commands(mut self, commands: Vec<CommandDef>) -> Self {
        self.commands = commands;
        self
    }

    pub fn admins(mut self, admins: Vec<String>) -> Self {
        self.admins = admins;
        self
    }
}

pub struct Session {
    prefix: String,
    user: User,
    debug: bool,
    nick: RwLock<String>,
    pending_nick: RwLock<Option<String>>,
    admins: RwLock<Vec<String>>,
    commands: Vec<Arc<CommandDef>>,
    handlers: CommandMap,
    ready: Option<ReadyFn>,
    ready_fired: AtomicBool,
    done: CancellationToken,
    fired: AtomicBool,
    outbound: mpsc::UnboundedSender<String>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Session {
    pub(crate) fn new(
        server: &Server,
        user: &User,
        options: Options,
        outbound: mpsc::UnboundedSender<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            prefix: format!("[{}/{}]", server.host, user.nick),
            user: user.clone(),
            debug: options.debug,
            nick: RwLock::new(user.nick.clone()),
            pending_nick: RwLock::new(None),
            admins: RwLock::new(options.admins),
            commands: options.commands.into_iter().map(Arc::new).collect(),
            handlers: options.handlers,
            ready: options.ready,
            ready_fired: AtomicBool::new(false),
            done: CancellationToken::new(),
            fired: AtomicBool::new(false),
            outbound,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// `[host/nick]` label attached to every log line of this session.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Nickname the server currently knows us by.
    pub fn nick(&self) -> String {
        self.nick.read().clone()
    }

    pub(crate) fn set_nick(&self, nick: &str) {
        *self.nick.write() = nick.to_string();
    }

    /// Nickname requested after registration that the server has not
    /// confirmed yet.
    pub fn pending_nick(&self) -> Option<String> {
        self.pending_nick.read().clone()
    }

    pub(crate) fn set_pending_nick(&self, nick: Option<&str>) {
        *self.pending_nick.write() = nick.map(str::to_string);
    }

    /// True when `nick` is the tracked nick or the pending one.
    pub fn is_own_nick(&self, nick: &str) -> bool {
        nick.eq_ignore_ascii_case(&self.nick.read())
            || self
                .pending_nick
                .read()
                .as_deref()
                .is_some_and(|pending| nick.eq_ignore_ascii_case(pending))
    }

    /// Whether the server has confirmed registration.
    pub fn is_registered(&self) -> bool {
        self.ready_fired.load(Ordering::SeqCst)
    }

    pub fn commands(&self) -> &[Arc<CommandDef>] {
        &self.commands
    }

    pub fn handlers(&self) -> &CommandMap {
        &self.handlers
    }

    pub fn admins(&self) -> Vec<String> {
        self.admins.read().clone()
    }

    pub fn is_admin(&self, nick: &str) -> bool {
        self.admins.read().iter().any(|a| a.eq_ignore_ascii_case(nick))
    }

    /// True when the nickname part of `source` is in the admin list.
    pub fn is_admin_source(&self, source: &str) -> bool {
        self.is_admin(get_nick(source))
    }

    pub fn add_admin(&self, nick: &str) {
        let mut admins = self.admins.write();
        if !admins.iter().any(|a| a.eq_ignore_ascii_case(nick)) {
            admins.push(nick.to_string());
        }
    }

    pub fn remove_admin(&self, nick: &str) {
        self.admins.write().retain(|a| !a.eq_ignore_ascii_case(nick));
    }

    /// Queue one frame for the writer task. CR and LF are stripped so a
    /// single call can never smuggle a second frame onto the wire.
    pub fn send_raw(&self, line: &str) -> Result<(), EngineError> {
        if self.is_done() {
            return Err(EngineError::Closed);
        }
        let clean: String = line.chars().filter(|c| *c != '\r' && *c != '\n').collect();
        if self.debug {
            tracing::debug!(session = %self.prefix, ">> {}", clean);
        }
        self.outbound.send(clean).map_err(|_| EngineError::Closed)
    }

    /// Run the ready callback, at most once per session.
    pub(crate) fn fire_ready(self: &Arc<Self>) {
        if self.ready_fired.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!(session = %self.prefix, "Registration complete");
        if let Some(ready) = &self.ready {
            tokio::spawn(ready(Arc::clone(self)));
        }
    }

    /// Fire the cancellation signal. Only the first call has any effect;
    /// the session never comes back once it is done.
    pub fn cancel(&self) {
        if self.fired.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!(session = %self.prefix, "Session done");
        self.done.cancel();
    }

    pub fn is_done(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Resolves once the cancellation signal has fired.
    pub async fn closed(&self) {
        self.done.cancelled().await
    }

    pub(crate) fn token(&self) -> CancellationToken {
        self.done.clone()
    }

    pub(crate) fn track(&self, handle: JoinHandle<()>) {
        self.tasks.lock().push(handle);
    }

    /// Wait for the session to end and for its engine tasks to exit.
    pub async fn wait(&self) {
        self.closed().await;
        let handles = std::mem::take(&mut *self.tasks.lock());
        for handle in handles {
            let _ = handle.await;
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("prefix", &self.prefix)
            .field("nick", &*self.nick.read())
            .field("done", &self.is_done())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> (Arc<Session>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let server = Server::new("irc.example.com", 6667, false);
        let user = User::new("Crab", "", "");
        let options = Options::new().admins(vec!["Alice".into()]);
        (Session::new(&server, &user, options, tx), rx)
    }

    #[test]
    fn test_prefix_and_nick() {
        let (session, _rx) = session();
        assert_eq!(session.prefix(), "[irc.example.com/Crab]");
        assert_eq!(session.nick(), "Crab");
        session.set_nick("Crab2");
        assert_eq!(session.nick(), "Crab2");
    }

    #[test]
    fn test_own_nick_includes_pending() {
        let (session, _rx) = session();
        assert!(session.is_own_nick("crab"));
        assert!(!session.is_own_nick("Crabby"));
        session.set_pending_nick(Some("Crabby"));
        assert!(session.is_own_nick("CRABBY"));
        session.set_pending_nick(None);
        assert!(!session.is_own_nick("Crabby"));
    }

    #[test]
    fn test_debug_shows_prefix() {
        let (session, _rx) = session();
        let shown = format!("{:?}", session);
        assert!(shown.contains("[irc.example.com/Crab]"), "{}", shown);
    }

    #[test]
    fn test_admins() {
        let (session, _rx) = session();
        assert!(session.is_admin("alice"));
        assert!(session.is_admin_source("Alice!a@example.com"));
        assert!(!session.is_admin("bob"));
        session.add_admin("bob");
        session.add_admin("BOB");
        assert_eq!(session.admins().len(), 2);
        session.remove_admin("ALICE");
        assert!(!session.is_admin("alice"));
    }

    #[test]
    fn test_send_raw_strips_line_breaks() {
        let (session, mut rx) = session();
        session.send_raw("PRIVMSG #c :hi\r\nQUIT").unwrap();
        assert_eq!(rx.try_recv().unwrap(), "PRIVMSG #c :hiQUIT");
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let (session, mut rx) = session();
        assert!(!session.is_done());
        session.cancel();
        session.cancel();
        assert!(session.is_done());
        assert!(matches!(session.send_raw("PING :x"), Err(EngineError::Closed)));
        assert!(rx.try_recv().is_err());
    }
}
