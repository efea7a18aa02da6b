use std::sync::Arc;
use tracing::trace;

use crate::error::SessionError;
use crate::message::encode;
use crate::rate::RateLimiter;
use crate::shutdown::Shutdown;
use crate::transport::LineSink;

pub trait Observer: Send + Sync {
    fn on_read(&self, _line: &str) {}
    fn on_write(&self, _line: &str) {}
}

#[derive(Clone)]
pub struct Outbound {
    sink: Arc<dyn LineSink>,
    observer: Option<Arc<dyn Observer>>,
    shutdown: Shutdown,
}

impl Outbound {
    pub fn new(
        sink: Arc<dyn LineSink>,
        observer: Option<Arc<dyn Observer>>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            sink,
            observer,
            shutdown,
        }
    }

    pub async fn send<S: AsRef<str> + Sync>(
        &self,
        command: &str,
        args: &[S],
    ) -> Result<(), SessionError> {
        let line = encode(command, args);
        trace!(%line, "send");
        let mut bytes = Vec::with_capacity(line.len() + 2);
        bytes.extend_from_slice(line.as_bytes());
        bytes.extend_from_slice(b"\r\n");

        // A peer that stops reading must not hold the session open.
        let res = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                return Err(self.shutdown.cause().unwrap_or(SessionError::Stopped));
            }
            res = self.sink.send_raw(&bytes) => res,
        };
        if let Err(err) = res {
            let cause = SessionError::Write(err);
            self.shutdown.trigger(cause.clone());
            return Err(cause);
        }
        if let Some(observer) = &self.observer {
            observer.on_write(&line);
        }
        Ok(())
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    pub(crate) fn observer(&self) -> Option<&Arc<dyn Observer>> {
        self.observer.as_ref()
    }

    pub(crate) async fn close(&self) {
        self.sink.close().await;
    }
}

#[derive(Clone)]
pub struct Session {
    nick: Arc<str>,
    out: Outbound,
    limiter: RateLimiter,
}

impl Session {
    pub fn new(nick: &str, out: Outbound, limiter: RateLimiter) -> Self {
        Self {
            nick: Arc::from(nick),
            out,
            limiter,
        }
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub async fn enqueue(&self, target: &str, text: &str) {
        self.limiter.enqueue(target, text).await
    }

    pub async fn send<S: AsRef<str> + Sync>(
        &self,
        command: &str,
        args: &[S],
    ) -> Result<(), SessionError> {
        self.out.send(command, args).await
    }

    pub fn is_closed(&self) -> bool {
        self.out.shutdown().is_triggered()
    }
}
