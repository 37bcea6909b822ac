use rusqlite::{Connection, Result, params_from_iter};

use crate::lease::cache::LeaseCache;

/// Names of entities owning a device whose hardware address appears in the
/// current lease snapshot, sorted by name. A pure read, recomputed in full on
/// every poll cycle and page view; lease sets are small and replaced
/// wholesale, so nothing is maintained incrementally.
pub fn present_names(conn: &Connection, cache: &LeaseCache) -> Result<Vec<String>> {
    let macs = cache.mac_addresses();
    if macs.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; macs.len()].join(", ");
    let sql = format!(
        "SELECT DISTINCT t.name
         FROM tracked_entities AS t
         JOIN devices AS d ON d.entity_id = t.id
         WHERE d.mac IN ({})
         ORDER BY t.name",
        placeholders
    );

    let mut stmt = conn.prepare(&sql)?;
    let names = stmt
        .query_map(params_from_iter(macs.iter()), |row| row.get(0))?
        .filter_map(|r| r.ok())
        .collect();
    Ok(names)
}
