use crate::core::guard;
use crate::core::ConfigProvider;
use crate::domain::model::Outcome;
use crate::domain::ports::ConnectionHandler;
use crate::utils::error::{RecoverError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Line that makes [`LineHandler`] panic.
pub const PANIC_COMMAND: &str = "panic";
/// Line that makes [`LineHandler`] return a typed error.
pub const FAIL_COMMAND: &str = "fail";

#[derive(Debug, Default)]
pub struct ServerStats {
    accepted: AtomicU64,
    accept_errors: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    contained: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub accepted: u64,
    pub accept_errors: u64,
    pub completed: u64,
    pub failed: u64,
    pub contained: u64,
}

impl ServerStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            accept_errors: self.accept_errors.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            contained: self.contained.load(Ordering::Relaxed),
        }
    }

    /// Connections whose handler has not finished yet.
    pub fn in_flight(&self) -> u64 {
        let s = self.snapshot();
        s.accepted
            .saturating_sub(s.completed + s.failed + s.contained)
    }
}

/// TCP acceptor that runs every connection as its own guarded task.
pub struct Server {
    listener: TcpListener,
    handler: Arc<dyn ConnectionHandler>,
    stats: Arc<ServerStats>,
}

impl Server {
    pub async fn bind<C: ConfigProvider>(config: &C, handler: impl ConnectionHandler) -> Result<Self> {
        let listener = TcpListener::bind(config.listen_addr()).await?;
        Ok(Self::from_listener(listener, handler))
    }

    pub fn from_listener(listener: TcpListener, handler: impl ConnectionHandler) -> Self {
        Self {
            listener,
            handler: Arc::new(handler),
            stats: Arc::new(ServerStats::default()),
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn stats(&self) -> Arc<ServerStats> {
        Arc::clone(&self.stats)
    }

    /// Accepts connections until the process ends.
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` resolves. Handlers already running are left alone.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr()?;
        tracing::info!("🚀 Listening on {}", addr);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(
                        in_flight = self.stats.in_flight(),
                        "🛑 Shutdown requested, no longer accepting on {}",
                        addr
                    );
                    return Ok(());
                }
                accepted = self.listener.accept() => self.on_accept(accepted),
            }
        }
    }

    fn on_accept(&self, accepted: io::Result<(TcpStream, SocketAddr)>) {
        match accepted {
            Ok((stream, peer)) => self.dispatch(stream, peer),
            Err(e) => {
                // No retry; the next iteration simply accepts again.
                self.stats.accept_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("⚠️ Accept failed: {}", e);
            }
        }
    }

    fn dispatch(&self, stream: TcpStream, peer: SocketAddr) {
        self.stats.accepted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(%peer, "Accepted connection");

        let handler = Arc::clone(&self.handler);
        let task = guard::spawn_guarded(format!("connection {}", peer), async move {
            handler.handle(stream, peer).await
        });

        let stats = Arc::clone(&self.stats);
        tokio::spawn(async move {
            match task.join().await {
                Outcome::Completed(()) => {
                    stats.completed.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(%peer, "Connection closed");
                }
                Outcome::Failed(e) => {
                    stats.failed.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!(%peer, "⚠️ Connection handler failed: {}", e);
                }
                Outcome::Panicked(fault) => {
                    stats.contained.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(
                        %peer,
                        payload = %fault.payload,
                        "❌ connection handler panicked, connection released"
                    );
                }
            }
        });
    }
}

/// Line echo handler used by the `serve` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineHandler;

#[async_trait]
impl ConnectionHandler for LineHandler {
    async fn handle(&self, stream: TcpStream, peer: SocketAddr) -> Result<()> {
        let (reader, mut writer) = stream.into_split();
        let mut lines = BufReader::new(reader).lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim_end();
            match line {
                PANIC_COMMAND => panic!("client {} asked the handler to panic", peer),
                FAIL_COMMAND => {
                    return Err(RecoverError::handler(format!(
                        "client {} asked the handler to fail",
                        peer
                    )))
                }
                _ => {
                    writer.write_all(line.as_bytes()).await?;
                    writer.write_all(b"\n").await?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;

    async fn start() -> (SocketAddr, Arc<ServerStats>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = Server::from_listener(listener, LineHandler);
        let addr = server.local_addr().unwrap();
        let stats = server.stats();
        tokio::spawn(server.run());
        (addr, stats)
    }

    async fn wait_for(stats: &ServerStats, done: impl Fn(&StatsSnapshot) -> bool) -> StatsSnapshot {
        for _ in 0..200 {
            let snapshot = stats.snapshot();
            if done(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("server stats never settled: {:?}", stats.snapshot());
    }

    #[tokio::test]
    async fn test_echo_roundtrip() {
        let (addr, stats) = start().await;
        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"hello\n").await.unwrap();
        client.shutdown().await.unwrap();

        let mut reply = String::new();
        client.read_to_string(&mut reply).await.unwrap();
        assert_eq!(reply, "hello\n");

        let snapshot = wait_for(&stats, |s| s.completed == 1).await;
        assert_eq!(snapshot.contained, 0);
    }

    #[tokio::test]
    async fn test_panic_closes_only_that_connection() {
        let (addr, stats) = start().await;

        let mut bystander = TcpStream::connect(addr).await.unwrap();
        let mut victim = TcpStream::connect(addr).await.unwrap();
        victim.write_all(b"panic\n").await.unwrap();

        // The victim sees EOF once its handler unwinds.
        let mut buf = Vec::new();
        let read = victim.read_to_end(&mut buf).await.unwrap_or(0);
        assert_eq!(read, 0);

        bystander.write_all(b"still here\n").await.unwrap();
        let mut reply = [0u8; 11];
        bystander.read_exact(&mut reply).await.unwrap();
        assert_eq!(&reply, b"still here\n");

        let snapshot = wait_for(&stats, |s| s.contained == 1).await;
        assert_eq!(snapshot.accepted, 2);
    }

    #[tokio::test]
    async fn test_accept_error_does_not_stop_the_acceptor() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = Server::from_listener(listener, LineHandler);
        let addr = server.local_addr().unwrap();
        let stats = server.stats();

        server.on_accept(Err(io::Error::new(
            io::ErrorKind::ConnectionAborted,
            "peer went away during handshake",
        )));
        server.on_accept(Err(io::Error::other("too many open files")));
        assert_eq!(stats.snapshot().accept_errors, 2);
        assert_eq!(stats.snapshot().accepted, 0);

        tokio::spawn(server.run());
        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"after errors\n").await.unwrap();
        client.shutdown().await.unwrap();
        let mut reply = String::new();
        client.read_to_string(&mut reply).await.unwrap();
        assert_eq!(reply, "after errors\n");

        let snapshot = wait_for(&stats, |s| s.completed == 1).await;
        assert_eq!(snapshot.accept_errors, 2);
    }

    #[tokio::test]
    async fn test_typed_failure_is_not_counted_as_panic() {
        let (addr, stats) = start().await;
        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"fail\n").await.unwrap();

        let snapshot = wait_for(&stats, |s| s.failed == 1).await;
        assert_eq!(snapshot.contained, 0);
    }
}
