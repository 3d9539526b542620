//! TCP client for the backend command surface.
//!
//! Provides a `call()` method for JSON-RPC invocation. One background task
//! per connection reads every frame the backend sends: replies are handed to
//! the waiting caller by request id, and `export-progress` notifications are
//! published to the [`ProgressBus`] in arrival order as soon as they land.
//!
//! # Thread Safety
//!
//! Writes are serialized behind a tokio `Mutex`; the lock is held only while
//! a request frame is written, so calls overlap freely while they wait.
//!
//! A framing error, an undecodable frame, or a request frame left half
//! written closes the connection. Every pending call then fails with
//! `ConnectionLost`, and the next call reconnects.

use super::protocol::{
    check_frame_len, decode_incoming, read_frame, write_frame, Incoming, IpcError, IpcRequest,
};
use crate::config::{IpcConfig, ProgressConfig};
use crate::progress::{ProgressBus, ProgressEvent};
use crate::{AssetMapError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

type Waiter = oneshot::Sender<std::result::Result<Value, IpcError>>;

#[derive(Default)]
struct Pending {
    closed: bool,
    waiters: HashMap<u64, Waiter>,
}

fn close(pending: &StdMutex<Pending>) {
    let mut pending = pending.lock().expect("IPC pending lock poisoned");
    pending.closed = true;
    // Dropping the senders wakes every waiter with a receive error.
    pending.waiters.clear();
}

/// One live TCP connection and its reader task.
struct Connection {
    writer: Mutex<OwnedWriteHalf>,
    pending: Arc<StdMutex<Pending>>,
    reader: JoinHandle<()>,
}

impl Connection {
    async fn open(addr: SocketAddr, bus: ProgressBus) -> Result<Self> {
        let stream = tokio::time::timeout(IpcConfig::CONNECT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| AssetMapError::Timeout(IpcConfig::CONNECT_TIMEOUT))?
            .map_err(|_| AssetMapError::ConnectionLost {
                addr: addr.to_string(),
            })?;

        let (read_half, write_half) = stream.into_split();
        let pending = Arc::new(StdMutex::new(Pending::default()));
        let reader = tokio::spawn(read_loop(read_half, Arc::clone(&pending), bus, addr));

        debug!("IPC client connected to {}", addr);
        Ok(Self {
            writer: Mutex::new(write_half),
            pending,
            reader,
        })
    }

    fn is_open(&self) -> bool {
        !self.pending.lock().expect("IPC pending lock poisoned").closed
    }

    /// Register a waiter for `id`; `None` once the connection has closed.
    fn register(&self, id: u64) -> Option<oneshot::Receiver<std::result::Result<Value, IpcError>>> {
        let mut pending = self.pending.lock().expect("IPC pending lock poisoned");
        if pending.closed {
            return None;
        }
        let (tx, rx) = oneshot::channel();
        pending.waiters.insert(id, tx);
        Some(rx)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Removes a call's waiter when the call ends, however it ends.
struct InFlight<'a> {
    pending: &'a StdMutex<Pending>,
    id: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.pending
            .lock()
            .expect("IPC pending lock poisoned")
            .waiters
            .remove(&self.id);
    }
}

/// Closes the connection unless the frame write it guards completed.
struct WriteGuard<'a> {
    pending: &'a StdMutex<Pending>,
    armed: bool,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            close(self.pending);
        }
    }
}

async fn read_loop(
    mut reader: OwnedReadHalf,
    pending: Arc<StdMutex<Pending>>,
    bus: ProgressBus,
    addr: SocketAddr,
) {
    loop {
        let frame = match read_frame(&mut reader).await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!("Backend at {} closed the connection", addr);
                break;
            }
            Err(e) => {
                warn!("Dropping connection to {}: {}", addr, e);
                break;
            }
        };

        match decode_incoming(&frame) {
            Ok(Incoming::Notification { method, params }) => {
                route_notification(&bus, &method, params);
            }
            Ok(Incoming::Reply { id: Some(id), outcome }) => {
                let waiter = pending
                    .lock()
                    .expect("IPC pending lock poisoned")
                    .waiters
                    .remove(&id);
                match waiter {
                    Some(waiter) => {
                        let _ = waiter.send(outcome);
                    }
                    None => warn!("Discarding IPC reply with unexpected id {}", id),
                }
            }
            Ok(Incoming::Reply { id: None, .. }) => {
                warn!("Discarding IPC reply without an id");
            }
            Err(e) => {
                warn!("Dropping connection to {}: {}", addr, e);
                break;
            }
        }
    }
    close(&pending);
}

fn route_notification(bus: &ProgressBus, channel: &str, params: Value) {
    if channel != ProgressConfig::EVENT_CHANNEL {
        trace!("Ignoring notification on channel {}", channel);
        return;
    }
    match serde_json::from_value::<ProgressEvent>(params) {
        Ok(event) => {
            bus.publish(&event);
        }
        Err(e) => warn!("Malformed progress event: {}", e),
    }
}

/// Client connected to a backend command server.
pub struct IpcClient {
    conn: Mutex<Arc<Connection>>,
    addr: SocketAddr,
    next_id: AtomicU64,
    bus: ProgressBus,
}

impl std::fmt::Debug for IpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpcClient")
            .field("addr", &self.addr)
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

impl IpcClient {
    /// Connect and publish progress notifications to the global bus.
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        Self::connect_with_bus(addr, ProgressBus::global().clone()).await
    }

    /// Connect and publish progress notifications to `bus`.
    ///
    /// Uses the connection timeout from `IpcConfig`.
    pub async fn connect_with_bus(addr: SocketAddr, bus: ProgressBus) -> Result<Self> {
        let conn = Connection::open(addr, bus.clone()).await?;
        Ok(Self {
            conn: Mutex::new(Arc::new(conn)),
            addr,
            next_id: AtomicU64::new(1),
            bus,
        })
    }

    fn lost(&self) -> AssetMapError {
        AssetMapError::ConnectionLost {
            addr: self.addr.to_string(),
        }
    }

    /// The current connection, reopened if the previous one closed.
    async fn connection(&self) -> Result<Arc<Connection>> {
        let mut slot = self.conn.lock().await;
        if slot.is_open() {
            return Ok(Arc::clone(&*slot));
        }
        debug!("Reconnecting to backend at {}", self.addr);
        let conn = Arc::new(Connection::open(self.addr, self.bus.clone()).await?);
        *slot = Arc::clone(&conn);
        Ok(conn)
    }

    /// Call a backend command and wait for its result.
    ///
    /// A JSON-RPC error becomes `Backend { command, message }` carrying the
    /// backend's message. A broken connection becomes `ConnectionLost`.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request_bytes = serde_json::to_vec(&IpcRequest::call(method, params, id))?;
        check_frame_len(request_bytes.len())?;

        let conn = self.connection().await?;
        let reply = conn.register(id).ok_or_else(|| self.lost())?;
        let _in_flight = InFlight {
            pending: &conn.pending,
            id,
        };

        trace!("IPC call {} (id {})", method, id);
        {
            let mut writer = conn.writer.lock().await;
            let mut guard = WriteGuard {
                pending: &conn.pending,
                armed: true,
            };
            if let Err(e) = write_frame(&mut *writer, &request_bytes).await {
                debug!("IPC write to {} failed: {}", self.addr, e);
                return Err(self.lost());
            }
            guard.armed = false;
        }

        match reply.await {
            Ok(outcome) => outcome.map_err(|err| AssetMapError::Backend {
                command: method.to_string(),
                message: err.message,
            }),
            Err(_) => Err(self.lost()),
        }
    }

    /// The bus this client publishes progress events to.
    pub fn bus(&self) -> &ProgressBus {
        &self.bus
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}
