use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

use crate::message::Message;
use crate::session::Session;

#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, msg: &Message, session: &Session);
}

#[derive(Default)]
pub struct Dispatcher {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: &str, handler: Arc<dyn Handler>) -> &mut Self {
        self.handlers.insert(command.to_ascii_uppercase(), handler);
        self
    }

    pub fn handles(&self, command: &str) -> bool {
        self.handlers.contains_key(&command.to_ascii_uppercase())
    }

    pub async fn dispatch(&self, msg: &Message, session: &Session) {
        match self.handlers.get(&msg.command) {
            Some(handler) => handler.handle(msg, session).await,
            None => trace!(command = %msg.command, "no handler"),
        }
    }
}
