//! Monotonic acceptance of stamped snapshots
//!
//! Snapshots reach the dispatcher from the booking pipeline, the scheduled
//! refresh and direct injection, in no particular order. The gate lets a
//! snapshot through only when its completion time is strictly newer than the
//! last one accepted for the same scope. Rejected snapshots are dropped.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::debug;
use washslot_domain::{OrderingScope, ScopeKey, StampedSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Accepted { scope: ScopeKey },
    Rejected { scope: ScopeKey, last_accepted: DateTime<Utc> },
}

impl GateDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Last-writer-wins filter keyed by completion time.
pub struct OrderingGate {
    scope: OrderingScope,
    last_accepted: Mutex<HashMap<ScopeKey, DateTime<Utc>>>,
}

impl OrderingGate {
    pub fn new(scope: OrderingScope) -> Self {
        Self { scope, last_accepted: Mutex::new(HashMap::new()) }
    }

    /// Accept `stamped` iff nothing was accepted for its scope yet or its
    /// timestamp is strictly greater than the last accepted one.
    pub fn try_accept(&self, stamped: &StampedSnapshot) -> GateDecision {
        let scope = self.scope.key_for(&stamped.account);
        let mut table = self.last_accepted.lock();

        match table.get(&scope) {
            Some(last) if stamped.timestamp <= *last => {
                debug!(%scope, last = %last, incoming = %stamped.timestamp, "snapshot not newer");
                GateDecision::Rejected { scope, last_accepted: *last }
            }
            _ => {
                table.insert(scope.clone(), stamped.timestamp);
                GateDecision::Accepted { scope }
            }
        }
    }

    pub fn last_accepted(&self, scope: &ScopeKey) -> Option<DateTime<Utc>> {
        self.last_accepted.lock().get(scope).copied()
    }

    pub fn scope(&self) -> OrderingScope {
        self.scope
    }
}
