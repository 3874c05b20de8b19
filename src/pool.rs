//! Connection pool.
//!
//! Maintains a bounded set of [`Connection`]s, handing out leases that are
//! returned automatically on drop. Idle connections above `min_connections`
//! are reaped after `idle_timeout`; checkout re-validates an idle connection
//! with a ping before handing it to the caller so a server-side idle kill
//! doesn't surface as a confusing protocol error on the caller's first query.

use std::collections::VecDeque;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::protocol::connect::ConnectParams;

const MAX_CREATE_ATTEMPTS: u32 = 3;

/// Pool sizing and lifecycle configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Connections kept ready even when idle.
    pub min_connections: u32,
    /// Hard cap on connections outstanding (idle + leased) at once.
    pub max_connections: u32,
    /// How long `Pool::get` waits for a free slot before giving up.
    pub lease_timeout: Duration,
    /// How long a connection may sit idle above `min_connections` before
    /// being closed.
    pub idle_timeout: Duration,
    /// Interval between idle-reaper sweeps.
    pub reap_interval: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 1,
            max_connections: 10,
            lease_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(5 * 60),
            reap_interval: Duration::from_secs(30),
        }
    }
}

impl PoolConfig {
    /// Build a config from `ORA_POOL_MIN` / `ORA_POOL_MAX`, falling back to
    /// [`PoolConfig::default`] values for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let min_connections = std::env::var("ORA_POOL_MIN")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.min_connections);
        let max_connections = std::env::var("ORA_POOL_MAX")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.max_connections)
            .max(min_connections.max(1));
        Self {
            min_connections,
            max_connections,
            ..defaults
        }
    }
}

struct IdleConn {
    conn: Connection,
    permit: OwnedSemaphorePermit,
    idle_since: Instant,
}

struct PoolInner {
    config: PoolConfig,
    params: ConnectParams,
    username: String,
    password: String,
    permits: Arc<Semaphore>,
    idle: Mutex<VecDeque<IdleConn>>,
    create_lock: Mutex<()>,
    closed: AtomicBool,
}

impl PoolInner {
    async fn create_connection(&self) -> Result<Connection> {
        let _guard = self.create_lock.lock().await;
        let mut attempt = 0u32;
        loop {
            match Connection::connect_with_params(&self.params, &self.username, &self.password)
                .await
            {
                Ok(conn) => return Ok(conn),
                Err(e) if attempt + 1 < MAX_CREATE_ATTEMPTS => {
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        error = %e,
                        "connection factory failed, retrying after backoff"
                    );
                    tokio::time::sleep(Duration::from_millis(100 * attempt as u64)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn check_in(&self, mut conn: Connection, permit: OwnedSemaphorePermit) {
        if self.closed.load(Ordering::Acquire) {
            let _ = conn.ping().await; // best-effort, result irrelevant
            tokio::spawn(async move {
                let _ = conn.close().await;
            });
            drop(permit);
            return;
        }
        let mut idle = self.idle.lock().await;
        idle.push_back(IdleConn {
            conn,
            permit,
            idle_since: Instant::now(),
        });
    }

    fn in_use(&self) -> u32 {
        self.config.max_connections - self.permits.available_permits() as u32
    }
}

async fn reap_idle(inner: Weak<PoolInner>) {
    loop {
        let (reap_interval, inner) = match inner.upgrade() {
            Some(inner) => (inner.config.reap_interval, inner),
            None => return,
        };
        tokio::time::sleep(reap_interval).await;
        if inner.closed.load(Ordering::Acquire) {
            return;
        }

        let leased = inner.in_use() as usize;
        let min_connections = inner.config.min_connections as usize;
        let idle_timeout = inner.config.idle_timeout;
        let now = Instant::now();

        let mut stale = Vec::new();
        {
            let mut idle = inner.idle.lock().await;
            while idle.len() + leased > min_connections {
                let expired = idle
                    .front()
                    .map(|entry| now.duration_since(entry.idle_since) >= idle_timeout)
                    .unwrap_or(false);
                if !expired {
                    break;
                }
                if let Some(entry) = idle.pop_front() {
                    stale.push(entry);
                }
            }
        }

        for entry in stale {
            tracing::debug!("closing idle connection past idle timeout");
            drop(entry.permit);
            let _ = entry.conn.close().await;
        }
    }
}

/// A bounded pool of Oracle connections.
pub struct Pool {
    inner: Arc<PoolInner>,
    reaper: tokio::task::JoinHandle<()>,
}

impl Pool {
    /// Open a pool and eagerly establish `min_connections` connections.
    ///
    /// Eager connections are best-effort: a failure is logged and the slot
    /// is left for `get` to fill in lazily.
    pub async fn connect(
        params: ConnectParams,
        username: impl Into<String>,
        password: impl Into<String>,
        config: PoolConfig,
    ) -> Result<Self> {
        let inner = Arc::new(PoolInner {
            permits: Arc::new(Semaphore::new(config.max_connections as usize)),
            idle: Mutex::new(VecDeque::with_capacity(config.max_connections as usize)),
            create_lock: Mutex::new(()),
            closed: AtomicBool::new(false),
            params,
            username: username.into(),
            password: password.into(),
            config,
        });

        for _ in 0..inner.config.min_connections {
            let permit = inner
                .permits
                .clone()
                .acquire_owned()
                .await
                .expect("semaphore never closed while pool is alive");
            match inner.create_connection().await {
                Ok(conn) => {
                    inner.idle.lock().await.push_back(IdleConn {
                        conn,
                        permit,
                        idle_since: Instant::now(),
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to eagerly open pool connection");
                    drop(permit);
                }
            }
        }

        let reaper = tokio::spawn(reap_idle(Arc::downgrade(&inner)));

        Ok(Self { inner, reaper })
    }

    /// Lease a connection, waiting up to `lease_timeout` for a free slot.
    ///
    /// An idle connection is re-validated with a ping before being handed
    /// out; a dead one is dropped and replaced transparently.
    pub async fn get(&self) -> Result<PooledConnection> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(Error::PoolClosed);
        }

        loop {
            let idle_entry = self.inner.idle.lock().await.pop_front();
            let Some(IdleConn {
                mut conn,
                permit,
                ..
            }) = idle_entry
            else {
                break;
            };

            if conn.ping().await.is_ok() {
                return Ok(PooledConnection {
                    conn: Some(conn),
                    permit: Some(permit),
                    pool: self.inner.clone(),
                });
            }
            tracing::debug!("discarding idle connection that failed keep-alive ping");
            drop(permit);
            tokio::spawn(async move {
                let _ = conn.close().await;
            });
        }

        let permit = tokio::time::timeout(
            self.inner.config.lease_timeout,
            self.inner.permits.clone().acquire_owned(),
        )
        .await
        .map_err(|_| Error::PoolTimeout {
            timeout: self.inner.config.lease_timeout,
        })?
        .expect("semaphore never closed while pool is alive");

        let conn = self.inner.create_connection().await?;
        Ok(PooledConnection {
            conn: Some(conn),
            permit: Some(permit),
            pool: self.inner.clone(),
        })
    }

    /// Lease a connection, run `f` against it, and return it to the pool
    /// regardless of whether `f` succeeded.
    pub async fn run<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut leased = self.get().await?;
        f(&mut leased).await
    }

    /// Current pool occupancy.
    pub async fn status(&self) -> PoolStatus {
        let in_use = self.inner.in_use();
        let idle = self.inner.idle.lock().await.len() as u32;
        PoolStatus {
            idle,
            in_use,
            max: self.inner.config.max_connections,
        }
    }

    /// Stop the idle reaper and close every idle connection. Leased
    /// connections are closed as they're returned.
    pub async fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.reaper.abort();

        let mut idle = self.inner.idle.lock().await;
        while let Some(entry) = idle.pop_front() {
            drop(entry.permit);
            let _ = entry.conn.close().await;
        }
        tracing::info!("connection pool closed");
    }

    /// Whether `close` has been called on this pool.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// The pool's configuration.
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }
}

/// Occupancy snapshot returned by [`Pool::status`].
#[derive(Debug, Clone, Copy)]
pub struct PoolStatus {
    /// Idle connections ready to be leased.
    pub idle: u32,
    /// Connections currently leased out.
    pub in_use: u32,
    /// Configured maximum.
    pub max: u32,
}

/// A connection leased from a [`Pool`].
///
/// Returned to the pool's idle queue when dropped, unless [`detach`] is
/// called first.
///
/// [`detach`]: PooledConnection::detach
pub struct PooledConnection {
    conn: Option<Connection>,
    permit: Option<OwnedSemaphorePermit>,
    pool: Arc<PoolInner>,
}

impl PooledConnection {
    /// Remove this connection from the pool's accounting and take ownership
    /// of it. It will not be returned to the pool when dropped.
    pub fn detach(mut self) -> Connection {
        self.permit.take();
        self.conn.take().expect("connection present until drop")
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection present until drop")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection present until drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let (Some(conn), Some(permit)) = (self.conn.take(), self.permit.take()) {
            let pool = self.pool.clone();
            tokio::spawn(async move {
                pool.check_in(conn, permit).await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_config_defaults_are_sane() {
        let config = PoolConfig::default();
        assert!(config.min_connections <= config.max_connections);
    }

    #[test]
    fn pool_config_from_env_clamps_max_to_min() {
        std::env::set_var("ORA_POOL_MIN", "5");
        std::env::set_var("ORA_POOL_MAX", "2");
        let config = PoolConfig::from_env();
        assert_eq!(config.min_connections, 5);
        assert!(config.max_connections >= config.min_connections);
        std::env::remove_var("ORA_POOL_MIN");
        std::env::remove_var("ORA_POOL_MAX");
    }
}
