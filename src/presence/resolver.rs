use rusqlite::{Connection, Result};

use crate::lease::cache::LeaseCache;

use super::device::Device;
use super::entity::TrackedEntity;

/// Resolve a requester's network address to its tracked entity: lease by IP,
/// device by the lease's hardware address, then the owning entity. Any
/// missing link short-circuits to None: a requester with no known identity
/// yet is not an error.
pub fn resolve_entity(
    conn: &Connection,
    cache: &LeaseCache,
    ip: &str,
) -> Result<Option<TrackedEntity>> {
    let Some(lease) = cache.lookup_by_ip(ip) else {
        return Ok(None);
    };
    let Some(device) = Device::find_by_mac(conn, &lease.mac)? else {
        return Ok(None);
    };
    TrackedEntity::find_by_id(conn, device.entity_id)
}
