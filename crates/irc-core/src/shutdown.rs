use std::sync::{Arc, OnceLock};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::SessionError;

#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
    cause: Arc<OnceLock<SessionError>>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the signal. Returns `true` only for the call whose cause was
    /// recorded; later calls are no-ops.
    pub fn trigger(&self, cause: SessionError) -> bool {
        let first = self.cause.set(cause).is_ok();
        if first {
            if let Some(cause) = self.cause.get() {
                info!(%cause, "session shutting down");
            }
        }
        self.token.cancel();
        first
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn cause(&self) -> Option<SessionError> {
        self.cause.get().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_cause_wins() {
        let shutdown = Shutdown::new();
        let waiter = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.cancelled().await })
        };
        assert!(!shutdown.is_triggered());
        assert!(shutdown.trigger(SessionError::Eof));
        assert!(!shutdown.trigger(SessionError::Stopped));
        waiter.await.unwrap();
        assert!(shutdown.is_triggered());
        assert!(matches!(shutdown.cause(), Some(SessionError::Eof)));
    }
}
