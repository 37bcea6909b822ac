use std::sync::{Arc, RwLock};

use super::Lease;

/// Holds the latest lease snapshot. The poller is the single writer; request
/// handlers read concurrently. The snapshot is one reference replaced in a
/// single step, so readers always see an entirely-old or entirely-new set,
/// never a partial one.
pub struct LeaseCache {
    snapshot: RwLock<Arc<Vec<Lease>>>,
}

impl LeaseCache {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Install a new snapshot, discarding the old one entirely. Leases are
    /// never merged across polls.
    pub fn replace(&self, leases: Vec<Lease>) {
        let mut guard = self.snapshot.write().expect("lease cache lock poisoned");
        *guard = Arc::new(leases);
    }

    /// The lease whose network address equals `ip`, if any. First match in
    /// input order wins. Returns an owned clone so callers never hold a
    /// pointer into a snapshot that may be replaced under them.
    pub fn lookup_by_ip(&self, ip: &str) -> Option<Lease> {
        self.current().iter().find(|lease| lease.ip == ip).cloned()
    }

    /// Every hardware address in the current snapshot, possibly empty.
    pub fn mac_addresses(&self) -> Vec<String> {
        self.current().iter().map(|lease| lease.mac.clone()).collect()
    }

    /// Bulk read of the current snapshot.
    pub fn leases(&self) -> Arc<Vec<Lease>> {
        self.current()
    }

    fn current(&self) -> Arc<Vec<Lease>> {
        self.snapshot.read().expect("lease cache lock poisoned").clone()
    }
}

impl Default for LeaseCache {
    fn default() -> Self {
        Self::new()
    }
}
