//! Modbus/TCP server.
//!
//! One tokio task per connection, no per-connection timeouts. Shutdown is a
//! watch channel: the accept loop and every connection task stop when it
//! flips, and the listener is dropped with the loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use pp_core::RegisterBank;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::{ModbusError, ModbusResult};
use crate::frame::{MODBUS_PROTOCOL_ID, read_frame, write_frame};
use crate::handler::RequestHandler;

const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Pause after `failures` consecutive accept errors (EMFILE and friends
/// persist until some connection closes).
fn accept_backoff(failures: u32) -> Duration {
    ACCEPT_BACKOFF_MIN
        .saturating_mul(1u32 << failures.saturating_sub(1).min(7))
        .min(ACCEPT_BACKOFF_MAX)
}

/// A bound, not yet serving, Modbus/TCP server.
pub struct ProtocolServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    handler: RequestHandler,
}

impl ProtocolServer {
    /// Bind the listening socket.
    pub async fn bind(config: &ServerConfig, bank: Arc<RegisterBank>) -> ModbusResult<Self> {
        let addr = config.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ModbusError::Bind {
                addr: addr.clone(),
                reason: e.to_string(),
            })?;
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "modbus server listening");

        Ok(Self {
            listener,
            local_addr,
            handler: RequestHandler::new(bank, config.identity.clone()),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until `shutdown` becomes `true` or its sender is
    /// dropped.
    pub async fn serve(self, mut shutdown: watch::Receiver<bool>) -> ModbusResult<()> {
        let next_conn = AtomicU64::new(1);
        let mut failures = 0u32;

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        failures = 0;
                        let conn = next_conn.fetch_add(1, Ordering::Relaxed);
                        debug!(conn, peer = %peer, "accepted connection");
                        let handler = self.handler.clone();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            match serve_connection(stream, handler, shutdown).await {
                                Ok(()) => debug!(conn, peer = %peer, "connection finished"),
                                Err(e) => warn!(conn, peer = %peer, error = %e, "connection dropped"),
                            }
                        });
                    }
                    Err(e) => {
                        failures = failures.saturating_add(1);
                        let pause = accept_backoff(failures);
                        error!(error = %e, failures, pause_ms = pause.as_millis() as u64, "accept failed");
                        tokio::select! {
                            _ = tokio::time::sleep(pause) => {}
                            _ = shutdown.changed() => {}
                        }
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(addr = %self.local_addr, "modbus server stopped");
        Ok(())
    }

    /// Serve on a background task.
    pub fn spawn(self) -> ServerHandle {
        let (tx, rx) = watch::channel(false);
        let local_addr = self.local_addr;
        let task = tokio::spawn(self.serve(rx));
        ServerHandle {
            local_addr,
            shutdown: tx,
            task,
        }
    }
}

/// Handle to a server running on a background task.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<ModbusResult<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, close open connections and wait for the loop to end.
    pub async fn shutdown(self) -> ModbusResult<()> {
        // receivers may already be gone if the loop ended on its own
        let _ = self.shutdown.send(true);
        self.task.await.map_err(|e| {
            ModbusError::Io(std::io::Error::other(format!("server task failed: {e}")))
        })?
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    handler: RequestHandler,
    mut shutdown: watch::Receiver<bool>,
) -> ModbusResult<()> {
    // accepted in the same round the shutdown flipped: `changed` would
    // never fire for this receiver
    if *shutdown.borrow_and_update() {
        return Ok(());
    }
    stream.set_nodelay(true)?;
    let (mut reader, mut writer) = stream.split();

    loop {
        let frame = tokio::select! {
            frame = read_frame(&mut reader) => frame?,
            _ = shutdown.changed() => return Ok(()),
        };
        let Some(frame) = frame else {
            return Ok(());
        };

        if frame.protocol_id != MODBUS_PROTOCOL_ID {
            debug!(
                protocol_id = frame.protocol_id,
                transaction = frame.transaction_id,
                "discarding frame for another protocol"
            );
            continue;
        }

        let reply = frame.reply(handler.handle_pdu(&frame.pdu));
        write_frame(&mut writer, &reply).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceIdentity;
    use tokio::io::AsyncReadExt;

    #[test]
    fn accept_backoff_grows_and_caps() {
        assert_eq!(accept_backoff(1), Duration::from_millis(10));
        assert_eq!(accept_backoff(2), Duration::from_millis(20));
        assert_eq!(accept_backoff(4), Duration::from_millis(80));
        assert_eq!(accept_backoff(8), ACCEPT_BACKOFF_MAX);
        assert_eq!(accept_backoff(u32::MAX), ACCEPT_BACKOFF_MAX);
        assert!(accept_backoff(0) > Duration::ZERO);
    }

    #[tokio::test]
    async fn connection_accepted_after_shutdown_closes_at_once() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = TcpStream::connect(addr).await.unwrap();
        let (stream, _) = listener.accept().await.unwrap();

        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();
        // the accept loop has already observed the flip
        let _ = rx.borrow_and_update();
        let handler = RequestHandler::new(
            Arc::new(RegisterBank::new()),
            DeviceIdentity::default(),
        );

        let served = tokio::time::timeout(
            Duration::from_secs(5),
            serve_connection(stream, handler, rx.clone()),
        )
        .await
        .expect("connection outlived the shutdown");
        assert!(served.is_ok());

        let mut buf = [0u8; 1];
        let read = tokio::time::timeout(Duration::from_secs(5), client.read(&mut buf))
            .await
            .unwrap();
        assert!(matches!(read, Ok(0) | Err(_)));
        drop(tx);
    }
}
