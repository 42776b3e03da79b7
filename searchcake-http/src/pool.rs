use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;

use crate::{Address, Clock, EsError};

#[derive(Debug, Clone)]
struct DeadServer {
    retry_after: Instant,
    addr: Address,
}

/// The set of cluster nodes requests can be sent to.
///
/// Servers are either `live`, meaning they are eligible for selection, or
/// `dead`, meaning they recently failed and are cooling down. A server is never
/// in both sets at once.
///
/// Dead servers are only re-admitted lazily when [ServerPool::select] is called
/// after their cooldown has elapsed, there is no background timer.
pub struct ServerPool {
    live: Vec<Address>,
    /// Most recently failed at the front.
    dead: VecDeque<DeadServer>,
    retry_time: Duration,
    clock: Arc<dyn Clock>,
}

impl ServerPool {
    /// Creates a new empty pool where dead servers cool down for `retry_time`.
    pub fn new(retry_time: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            live: Vec::new(),
            dead: VecDeque::new(),
            retry_time,
            clock,
        }
    }

    #[inline]
    /// The cooldown applied to servers marked as dead.
    pub fn retry_time(&self) -> Duration {
        self.retry_time
    }

    /// Adds a server to the live set.
    ///
    /// This is a no-op if the server is already known, live or dead.
    pub fn add(&mut self, addr: Address) -> bool {
        if self.contains(&addr) {
            return false;
        }

        debug!(server = %addr, "Adding server to pool.");
        self.live.push(addr);
        true
    }

    /// Selects a random live server.
    ///
    /// Any dead servers whose cooldown has elapsed are moved back into the
    /// live set before the selection is made.
    pub fn select(&mut self) -> Result<Address, EsError> {
        if self.live.is_empty() && self.dead.is_empty() {
            return Err(EsError::NoServerAvailable);
        }

        self.readmit_dead_servers();

        self.live
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(EsError::NoServerAvailable)
    }

    /// Removes a server from the live set and begins its cooldown.
    ///
    /// Returns false if the server was not live, in which case nothing changes.
    pub fn mark_dead(&mut self, addr: &Address) -> bool {
        let Some(pos) = self.live.iter().position(|live| live == addr) else {
            trace!(server = %addr, "Ignoring request to mark non-live server as dead.");
            return false;
        };

        let addr = self.live.swap_remove(pos);
        let retry_after = self.clock.now() + self.retry_time;

        warn!(
            server = %addr,
            retry_time = ?self.retry_time,
            "Marking server as dead.",
        );

        self.dead.push_front(DeadServer { retry_after, addr });
        true
    }

    /// Returns true if the server is known to the pool, live or dead.
    pub fn contains(&self, addr: &Address) -> bool {
        self.is_live(addr) || self.is_dead(addr)
    }

    pub fn is_live(&self, addr: &Address) -> bool {
        self.live.contains(addr)
    }

    pub fn is_dead(&self, addr: &Address) -> bool {
        self.dead.iter().any(|dead| &dead.addr == addr)
    }

    /// The total number of servers known to the pool.
    pub fn len(&self) -> usize {
        self.live.len() + self.dead.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A point in time copy of the pool's membership.
    pub fn snapshot(&self) -> ServerSnapshot {
        ServerSnapshot {
            live: self.live.clone(),
            dead: self.dead.iter().map(|dead| dead.addr.clone()).collect(),
        }
    }

    /// Moves every dead server whose cooldown has elapsed back into the live set.
    ///
    /// Every server shares the same cooldown and the clock only moves forward,
    /// so the back of the queue always holds the server which will become
    /// eligible first.
    fn readmit_dead_servers(&mut self) {
        let now = self.clock.now();
        while let Some(dead) = self.dead.back() {
            if dead.retry_after > now {
                break;
            }

            if let Some(dead) = self.dead.pop_back() {
                info!(server = %dead.addr, "Server cooldown elapsed, re-admitting to pool.");
                self.live.push(dead.addr);
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// The membership of a [ServerPool] at a point in time.
pub struct ServerSnapshot {
    pub live: Vec<Address>,
    pub dead: Vec<Address>,
}
