pub mod dispatch;
pub mod engine;
pub mod error;
pub mod message;
pub mod rate;
pub mod session;
pub mod shutdown;
pub mod transport;

pub use dispatch::{Dispatcher, Handler};
pub use engine::{Engine, EngineConfig, Identity, SessionHandle};
pub use error::{ConnectError, SessionError, TransportError};
pub use message::{decode, encode, Message, Origin};
pub use rate::{OutboundItem, RateLimiter};
pub use session::{Observer, Outbound, Session};
pub use shutdown::Shutdown;
pub use transport::{LineReader, LineSink, LineWriter, Transport, MAX_LINE};
