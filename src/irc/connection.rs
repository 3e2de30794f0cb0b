//! Connection lifecycle: dial, register, and keep the link alive.
//!
//! A session runs three engine tasks:
//! - **read loop**: reads frames with a rolling idle deadline and dispatches
//!   them in arrival order.
//! - **heartbeat loop**: sends `PING` on a fixed interval.
//! - **writer**: the only owner of the socket's write half; drains the
//!   outbound queue one whole frame at a time.
//!
//! Any read or write failure fires the session's cancellation signal, which
//! stops all three. Nothing reconnects.

use crate::irc::dispatch::Dispatcher;
use crate::irc::error::EngineError;
use crate::irc::model::{Server, User};
use crate::irc::session::{Options, Session};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(60);
pub const PING_INTERVAL: Duration = Duration::from_secs(120);
/// One and a half heartbeat periods, so a silent peer is noticed within one
/// cycle of the reply it owed us.
pub const READ_TIMEOUT: Duration = Duration::from_secs(180);
/// Longest inbound frame accepted: 8191 bytes of IRCv3 tags plus the classic
/// 512-byte message.
pub const MAX_LINE_LENGTH: usize = 8191 + 512;

/// Connect to `server` as `user` and start the session.
///
/// Returns as soon as the registration frames are queued; the ready callback
/// in `options` runs later, when the server confirms registration.
pub async fn establish(server: &Server, user: &User, options: Options) -> Result<Arc<Session>, EngineError> {
    if server.host.is_empty() {
        return Err(EngineError::EmptyHost);
    }
    if server.port == 0 {
        return Err(EngineError::ZeroPort);
    }
    if user.nick.is_empty() {
        return Err(EngineError::EmptyNick);
    }

    // One budget covers the TCP dial and the TLS handshake.
    let dial = async {
        let tcp = TcpStream::connect((server.host.as_str(), server.port)).await?;
        let peer = tcp.peer_addr()?;
        tracing::info!(host = %server.host, port = server.port, %peer, tls = server.tls, "Connected to server");

        if server.tls {
            let tls = connect_tls(&server.host, tcp).await?;
            Ok::<_, EngineError>(attach(tls, server, user, options))
        } else {
            Ok(attach(tcp, server, user, options))
        }
    };
    match tokio::time::timeout(CONNECT_TIMEOUT, dial).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "connect timed out").into()),
    }
}

async fn connect_tls(
    host: &str,
    tcp: TcpStream,
) -> Result<tokio_rustls::client::TlsStream<TcpStream>, EngineError> {
    let roots = tokio::task::spawn_blocking(native_roots)
        .await
        .map_err(io::Error::other)?;
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    let connector = TlsConnector::from(Arc::new(config));
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|_| EngineError::InvalidServerName(host.to_string()))?;

    Ok(connector.connect(server_name, tcp).await?)
}

/// Platform trust anchors. Reads the filesystem, so run it off the runtime.
fn native_roots() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    let certs = rustls_native_certs::load_native_certs();
    for e in &certs.errors {
        tracing::warn!("Failed to load native cert: {}", e);
    }
    for cert in certs.certs {
        if let Err(e) = roots.add(cert) {
            tracing::warn!("Failed to add root cert: {}", e);
        }
    }
    roots
}

/// Start a session over an already-open stream: spawn the engine tasks and
/// queue `PASS` (when set), `NICK` and `USER`, in that order.
pub fn attach<S>(stream: S, server: &Server, user: &User, options: Options) -> Arc<Session>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (reader, writer) = tokio::io::split(stream);
    let (tx, rx) = mpsc::unbounded_channel();
    let session = Session::new(server, user, options, tx);

    session.track(tokio::spawn(write_loop(Arc::clone(&session), writer, rx)));
    session.track(tokio::spawn(read_loop(Arc::clone(&session), BufReader::new(reader))));
    session.track(tokio::spawn(heartbeat_loop(Arc::clone(&session))));

    if let Err(e) = register(&session, server, user) {
        tracing::warn!(session = %session.prefix(), "Registration send failed: {}", e);
    }
    session
}

fn register(session: &Session, server: &Server, user: &User) -> Result<(), EngineError> {
    if let Some(password) = server.password.as_deref().filter(|p| !p.is_empty()) {
        session.send_pass(password)?;
    }
    session.send_nick(&user.nick)?;
    session.send_user(&user.username, &user.realname)
}

async fn read_loop<R>(session: Arc<Session>, mut reader: BufReader<R>)
where
    R: AsyncRead + Unpin,
{
    let dispatcher = Dispatcher::new();
    let done = session.token();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let mut bounded = (&mut reader).take(MAX_LINE_LENGTH as u64);
        let read = tokio::select! {
            _ = done.cancelled() => return,
            read = tokio::time::timeout(READ_TIMEOUT, bounded.read_until(b'\n', &mut buf)) => read,
        };

        let err = match read {
            Ok(Ok(0)) => io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed by server"),
            Ok(Ok(n)) if n >= MAX_LINE_LENGTH && !buf.ends_with(b"\n") => io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame longer than {} bytes", MAX_LINE_LENGTH),
            ),
            Ok(Ok(_)) => {
                let line = String::from_utf8_lossy(&buf);
                dispatcher.handle_line(&session, &line);
                continue;
            }
            Ok(Err(e)) => e,
            Err(_) => io::Error::new(io::ErrorKind::TimedOut, "no data from server before read deadline"),
        };

        tracing::warn!(session = %session.prefix(), "Read failed: {}", err);
        session.cancel();
        return;
    }
}

async fn heartbeat_loop(session: Arc<Session>) {
    let done = session.token();
    let mut ticker = interval_at(Instant::now() + PING_INTERVAL, PING_INTERVAL);

    loop {
        tokio::select! {
            _ = done.cancelled() => return,
            _ = ticker.tick() => {
                let nonce = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
                if session.send_ping(&nonce.to_string()).is_err() {
                    return;
                }
            }
        }
    }
}

async fn write_loop<W>(session: Arc<Session>, mut writer: W, mut rx: mpsc::UnboundedReceiver<String>)
where
    W: AsyncWrite + Unpin,
{
    let done = session.token();

    loop {
        let line = tokio::select! {
            _ = done.cancelled() => break,
            line = rx.recv() => match line {
                Some(line) => line,
                None => break,
            },
        };

        let frame = format!("{}\r\n", line);
        let written = async {
            writer.write_all(frame.as_bytes()).await?;
            writer.flush().await
        };
        if let Err(e) = written.await {
            tracing::warn!(session = %session.prefix(), "Write failed: {}", e);
            session.cancel();
            break;
        }
    }

    let _ = writer.shutdown().await;
}
