mod device;
mod entity;
mod names;
mod reconciler;
mod resolver;
mod types;
mod view;

pub use device::Device;
pub use entity::TrackedEntity;
pub use names::{NAME_MAX_LENGTH, sanitize_name};
pub use types::ReconcileError;

use std::sync::Arc;

use rusqlite::Result;

use crate::db::Database;
use crate::lease::Lease;
use crate::lease::cache::LeaseCache;

/// The presence association engine. Constructed once by the composition root
/// and handed to request handlers and the poll hook; there is no process-wide
/// singleton. All methods do blocking database work, so request handlers call
/// them under `spawn_blocking`.
pub struct PresenceEngine {
    db: Database,
    cache: Arc<LeaseCache>,
}

impl PresenceEngine {
    pub fn new(db: Database, cache: Arc<LeaseCache>) -> Self {
        Self { db, cache }
    }

    pub fn cache(&self) -> &Arc<LeaseCache> {
        &self.cache
    }

    /// Requester address -> tracked entity, if the whole chain resolves.
    pub fn resolve(&self, ip: &str) -> Result<Option<TrackedEntity>> {
        let conn = self.db.connect()?;
        resolver::resolve_entity(&conn, &self.cache, ip)
    }

    /// Create-or-merge an entity for the submitted name, associating the
    /// submitter's device when a lease was resolved for it.
    pub fn reconcile(
        &self,
        submitted_name: &str,
        lease: Option<&Lease>,
    ) -> std::result::Result<TrackedEntity, ReconcileError> {
        let conn = self.db.connect()?;
        reconciler::reconcile(&conn, submitted_name, lease)
    }

    /// Explicit rename of an already-resolved entity.
    pub fn rename(
        &self,
        entity_id: i64,
        new_name: &str,
    ) -> std::result::Result<TrackedEntity, ReconcileError> {
        let conn = self.db.connect()?;
        reconciler::rename_entity(&conn, entity_id, new_name)
    }

    /// Names of all entities currently present, recomputed from scratch.
    pub fn present_names(&self) -> Result<Vec<String>> {
        let conn = self.db.connect()?;
        view::present_names(&conn, &self.cache)
    }

    pub fn list_tracked(&self) -> Result<Vec<TrackedEntity>> {
        let conn = self.db.connect()?;
        TrackedEntity::all(&conn)
    }

    pub fn get_tracked(&self, id: i64) -> Result<Option<(TrackedEntity, Vec<Device>)>> {
        let conn = self.db.connect()?;
        let Some(entity) = TrackedEntity::find_by_id(&conn, id)? else {
            return Ok(None);
        };
        let devices = Device::for_entity(&conn, entity.id)?;
        Ok(Some((entity, devices)))
    }
}
