use crate::utils::error::Result;
use async_trait::async_trait;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use tokio::net::TcpStream;

/// Serves one accepted connection. Implementations own the stream; dropping it closes it.
#[async_trait]
pub trait ConnectionHandler: Send + Sync + 'static {
    async fn handle(&self, stream: TcpStream, peer: SocketAddr) -> Result<()>;
}

pub type ActionFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

/// A zero-argument unit of work that can be launched again after a failure.
pub trait Action: Send + Sync + 'static {
    fn launch(&self) -> ActionFuture;
}

impl<F, Fut> Action for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn launch(&self) -> ActionFuture {
        Box::pin(self())
    }
}

/// Configuration surface shared by the CLI arguments and the TOML file.
pub trait ConfigProvider: Send + Sync {
    fn listen_addr(&self) -> &str;
    fn max_restarts(&self) -> Option<u64>;
    fn backoff_ms(&self) -> u64;
}
