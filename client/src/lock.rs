//! Named, expiring locks.
//!
//! A lock is a lease on a name. Acquirers poll until the name is free or the
//! current lease has run out, so a holder that crashed or forgot to release
//! blocks others for at most one lease. Release happens when the guard drops.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};

#[derive(Clone, Copy, Debug)]
struct Lease {
    token: u64,
    expires_at: Instant,
}

#[derive(Clone, Debug)]
pub struct NamedLocks {
    leases: Arc<DashMap<String, Lease>>,
    next_token: Arc<AtomicU64>,
    poll: Duration,
}

impl Default for NamedLocks {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}

impl NamedLocks {
    pub fn new(poll: Duration) -> Self {
        Self {
            leases: Arc::new(DashMap::new()),
            next_token: Arc::new(AtomicU64::new(1)),
            poll,
        }
    }

    /// Takes the lease on `name` if it is free or expired. Never waits.
    pub fn try_acquire(&self, name: &str, lease: Duration) -> Option<LockGuard> {
        let now = Instant::now();
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let fresh = Lease {
            token,
            expires_at: now + lease,
        };
        match self.leases.entry(name.to_owned()) {
            Entry::Vacant(slot) => {
                slot.insert(fresh);
            }
            Entry::Occupied(mut held) => {
                if held.get().expires_at > now {
                    return None;
                }
                warn!(lock = name, "taking over expired lease");
                held.insert(fresh);
            }
        }
        Some(LockGuard {
            leases: Arc::clone(&self.leases),
            name: name.to_owned(),
            token,
        })
    }

    /// Polls for `name` until it can be taken or `wait` runs out.
    pub async fn acquire(&self, name: &str, wait: Duration, lease: Duration) -> ClientResult<LockGuard> {
        let deadline = Instant::now() + wait;
        loop {
            if let Some(guard) = self.try_acquire(name, lease) {
                debug!(lock = name, "acquired");
                return Ok(guard);
            }
            if Instant::now() >= deadline {
                return Err(ClientError::LockTimeout {
                    key: name.to_owned(),
                });
            }
            tokio::time::sleep(self.poll).await;
        }
    }

    pub fn is_held(&self, name: &str) -> bool {
        self.leases
            .get(name)
            .map(|lease| lease.expires_at > Instant::now())
            .unwrap_or(false)
    }
}

/// Releases the lease on drop, unless someone already took over an
/// expired lease under the same name.
#[derive(Debug)]
pub struct LockGuard {
    leases: Arc<DashMap<String, Lease>>,
    name: String,
    token: u64,
}

impl LockGuard {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.leases
            .remove_if(&self.name, |_, lease| lease.token == self.token);
    }
}
