use std::future::Future;
use std::io;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Opens the persistent bidirectional connection a session runs over.
///
/// Called once per connection attempt; a failed attempt is retried by the
/// session after its backoff delay.
pub trait Connector: Send + 'static {
    type Reader: AsyncRead + Unpin + Send + 'static;
    type Writer: AsyncWrite + Unpin + Send + 'static;

    fn connect(&mut self) -> impl Future<Output = io::Result<(Self::Reader, Self::Writer)>> + Send;

    /// Human-readable peer description for logs.
    fn describe(&self) -> String;
}

/// Plain TCP transport.
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    /// Check the address shape up front: a malformed address is a setup
    /// error, not something to retry.
    pub fn new(addr: &str) -> Result<Self> {
        let (host, port) = addr
            .rsplit_once(':')
            .with_context(|| format!("server address {addr:?} is missing a port"))?;
        if host.is_empty() {
            bail!("server address {addr:?} is missing a host");
        }
        port.parse::<u16>()
            .with_context(|| format!("server address {addr:?} has an invalid port"))?;
        Ok(Self {
            addr: addr.to_owned(),
        })
    }
}

impl Connector for TcpConnector {
    type Reader = OwnedReadHalf;
    type Writer = OwnedWriteHalf;

    async fn connect(&mut self) -> io::Result<(OwnedReadHalf, OwnedWriteHalf)> {
        let stream = TcpStream::connect(&self.addr).await?;
        stream.set_nodelay(true)?;
        Ok(stream.into_split())
    }

    fn describe(&self) -> String {
        self.addr.clone()
    }
}
