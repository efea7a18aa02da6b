use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::error::{ConnectError, TransportError};

pub const MAX_LINE: usize = 8192;

#[async_trait]
pub trait LineSink: Send + Sync {
    async fn send_raw(&self, bytes: &[u8]) -> Result<(), TransportError>;
    async fn close(&self);
}

#[derive(Debug)]
pub struct Transport {
    host: String,
    reader: LineReader,
    writer: LineWriter,
}

impl Transport {
    pub async fn connect(addr: &str) -> Result<Self, ConnectError> {
        let stream = TcpStream::connect(addr).await.map_err(|source| ConnectError {
            addr: addr.to_string(),
            source,
        })?;
        let _ = stream.set_nodelay(true);
        let host = addr.rsplit_once(':').map(|(h, _)| h).unwrap_or(addr);
        debug!(%addr, "connected");
        Ok(Self::from_stream(stream, host))
    }

    pub fn from_stream(stream: TcpStream, host: &str) -> Self {
        let (read, write) = stream.into_split();
        Self {
            host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
            reader: LineReader {
                inner: BufReader::new(read),
                buf: Vec::new(),
            },
            writer: LineWriter {
                inner: Arc::new(Mutex::new(Some(write))),
            },
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn into_split(self) -> (LineReader, LineWriter) {
        (self.reader, self.writer)
    }
}

#[derive(Debug)]
pub struct LineReader {
    inner: BufReader<OwnedReadHalf>,
    buf: Vec<u8>,
}

impl LineReader {
    pub async fn read_line(&mut self) -> Result<Option<String>, TransportError> {
        self.buf.clear();
        let limit = (MAX_LINE + 2) as u64;
        let n = (&mut self.inner)
            .take(limit)
            .read_until(b'\n', &mut self.buf)
            .await?;
        if n == 0 {
            return Ok(None);
        }
        if self.buf.last() != Some(&b'\n') {
            if n as u64 >= limit {
                return Err(TransportError::LineTooLong);
            }
            trace!(bytes = n, "discarding partial line at eof");
            return Ok(None);
        }
        while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
            self.buf.pop();
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}

#[derive(Debug, Clone)]
pub struct LineWriter {
    inner: Arc<Mutex<Option<OwnedWriteHalf>>>,
}

#[async_trait]
impl LineSink for LineWriter {
    async fn send_raw(&self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut guard = self.inner.lock().await;
        let Some(writer) = guard.as_mut() else {
            return Err(TransportError::Closed);
        };
        writer.write_all(bytes).await?;
        Ok(())
    }

    async fn close(&self) {
        let mut guard = self.inner.lock().await;
        if let Some(mut writer) = guard.take() {
            let _ = writer.shutdown().await;
            debug!("transport closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn pair() -> anyhow::Result<(Transport, TcpStream)> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?.to_string();
        let (client, server) = tokio::join!(Transport::connect(&addr), listener.accept());
        Ok((client?, server?.0))
    }

    #[tokio::test]
    async fn frames_lines_across_reads() -> anyhow::Result<()> {
        let (transport, mut server) = pair().await?;
        assert_eq!(transport.host(), "127.0.0.1");
        let (mut reader, _writer) = transport.into_split();

        server.write_all(b"PING :a\r\nPRIV").await?;
        server.write_all(b"MSG #c :x\nNOTICE").await?;
        assert_eq!(reader.read_line().await?.as_deref(), Some("PING :a"));
        assert_eq!(reader.read_line().await?.as_deref(), Some("PRIVMSG #c :x"));

        drop(server);
        assert_eq!(reader.read_line().await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn overlong_line_is_an_error() -> anyhow::Result<()> {
        let (transport, mut server) = pair().await?;
        let (mut reader, _writer) = transport.into_split();
        server.write_all(&vec![b'a'; MAX_LINE + 10]).await?;
        assert!(matches!(
            reader.read_line().await,
            Err(TransportError::LineTooLong)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn close_is_idempotent() -> anyhow::Result<()> {
        let (transport, mut server) = pair().await?;
        let (_reader, writer) = transport.into_split();

        writer.send_raw(b"NICK :bot\r\n").await?;
        let other = writer.clone();
        tokio::join!(writer.close(), other.close());
        writer.close().await;
        assert!(matches!(
            writer.send_raw(b"QUIT\r\n").await,
            Err(TransportError::Closed)
        ));

        let mut got = String::new();
        server.read_to_string(&mut got).await?;
        assert_eq!(got, "NICK :bot\r\n");
        Ok(())
    }
}
