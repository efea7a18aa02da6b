use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::dispatch::Dispatcher;
use crate::error::SessionError;
use crate::message::decode;
use crate::rate::RateLimiter;
use crate::session::{Observer, Outbound, Session};
use crate::shutdown::Shutdown;
use crate::transport::{LineReader, Transport};

#[derive(Debug, Clone, Deserialize)]
pub struct Identity {
    pub nick: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub realname: String,
}

impl Identity {
    pub fn new(nick: impl Into<String>) -> Self {
        let nick = nick.into();
        Self {
            user: nick.clone(),
            realname: nick.clone(),
            nick,
        }
    }

    fn user_or_nick(&self) -> &str {
        if self.user.is_empty() {
            &self.nick
        } else {
            &self.user
        }
    }

    fn realname_or_nick(&self) -> &str {
        if self.realname.is_empty() {
            &self.nick
        } else {
            &self.realname
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub ping_interval_secs: u64,
    pub flood_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ping_interval_secs: 30,
            flood_interval_ms: 1000,
        }
    }
}

impl EngineConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs.max(1))
    }

    pub fn flood_interval(&self) -> Duration {
        Duration::from_millis(self.flood_interval_ms)
    }
}

pub struct Engine {
    dispatcher: Arc<Dispatcher>,
    config: EngineConfig,
    observer: Option<Arc<dyn Observer>>,
}

impl Engine {
    pub fn new(dispatcher: Arc<Dispatcher>, config: EngineConfig) -> Self {
        Self {
            dispatcher,
            config,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn start(&self, transport: Transport, identity: Identity) -> SessionHandle {
        let shutdown = Shutdown::new();
        let server = transport.host().to_string();
        let (reader, writer) = transport.into_split();

        let out = Outbound::new(Arc::new(writer), self.observer.clone(), shutdown.clone());
        let (limiter, registry) = RateLimiter::spawn(out.clone(), self.config.flood_interval());
        let session = Session::new(&identity.nick, out.clone(), limiter);

        let task = tokio::spawn(run_session(
            reader,
            out,
            session,
            self.dispatcher.clone(),
            registry,
            identity,
            server,
            self.config.ping_interval(),
        ));

        SessionHandle { shutdown, task }
    }
}

pub struct SessionHandle {
    shutdown: Shutdown,
    task: JoinHandle<Result<(), SessionError>>,
}

impl SessionHandle {
    pub fn stop(&self) {
        self.shutdown.trigger(SessionError::Stopped);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the session to end. `Ok` means it was stopped on request.
    /// Must not be called again once it has returned.
    pub async fn join(&mut self) -> Result<(), SessionError> {
        match (&mut self.task).await {
            Ok(res) => res,
            Err(err) => {
                self.shutdown.trigger(SessionError::Task(err.to_string()));
                Err(SessionError::Task(err.to_string()))
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_session(
    mut reader: LineReader,
    out: Outbound,
    session: Session,
    dispatcher: Arc<Dispatcher>,
    registry: JoinHandle<()>,
    identity: Identity,
    server: String,
    ping_interval: Duration,
) -> Result<(), SessionError> {
    let shutdown = out.shutdown().clone();
    info!(nick = %identity.nick, %server, "session started");

    let keepalive = tokio::spawn(keepalive(out.clone(), server, ping_interval));

    if register(&out, &identity).await.is_ok() {
        read_loop(&mut reader, &out, &session, &dispatcher).await;
    }

    // Every writer has seen the shutdown before the write half is released.
    let _ = keepalive.await;
    let _ = registry.await;
    out.close().await;

    match shutdown.cause() {
        Some(SessionError::Stopped) => {
            info!("session stopped");
            Ok(())
        }
        Some(cause) => {
            warn!(%cause, "session ended");
            Err(cause)
        }
        None => Err(SessionError::Eof),
    }
}

async fn register(out: &Outbound, identity: &Identity) -> Result<(), SessionError> {
    out.send("NICK", &[identity.nick.as_str()]).await?;
    let args = [
        identity.user_or_nick(),
        "0",
        "*",
        identity.realname_or_nick(),
    ];
    out.send("USER", &args).await
}

async fn read_loop(
    reader: &mut LineReader,
    out: &Outbound,
    session: &Session,
    dispatcher: &Dispatcher,
) {
    let shutdown = out.shutdown();
    loop {
        let line = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return,
            line = reader.read_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                shutdown.trigger(SessionError::Eof);
                return;
            }
            Err(err) => {
                shutdown.trigger(SessionError::Read(err));
                return;
            }
        };

        if let Some(observer) = out.observer() {
            observer.on_read(&line);
        }
        let msg = decode(&line);
        trace!(command = %msg.command, "recv");
        if msg.command.is_empty() {
            debug!(%line, "line without command");
        }

        if msg.command == "PING" && out.send("PONG", &msg.args).await.is_err() {
            return;
        }
        dispatcher.dispatch(&msg, session).await;
    }
}

async fn keepalive(out: Outbound, server: String, period: Duration) {
    let shutdown = out.shutdown().clone();
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return,
            _ = ticker.tick() => {
                if out.send("PING", &[server.as_str()]).await.is_err() {
                    return;
                }
            }
        }
    }
}
