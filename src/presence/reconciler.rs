//! Idempotent create-or-merge of tracked entities and their device
//! associations. Collapses "first time seen", "returning device under a new
//! name" and "new device for an existing name" into one operation.

use rusqlite::{Connection, ErrorCode};

use crate::lease::Lease;

use super::device::Device;
use super::entity::TrackedEntity;
use super::names::sanitize_name;
use super::types::ReconcileError;

/// Create-or-merge a tracked entity for `submitted_name` and, when the
/// submitter's address matched a known lease, associate that lease's device
/// with it. Name and hardware-address uniqueness are enforced by the schema.
pub fn reconcile(
    conn: &Connection,
    submitted_name: &str,
    lease: Option<&Lease>,
) -> Result<TrackedEntity, ReconcileError> {
    let name = sanitize_name(submitted_name);
    if name.is_empty() {
        return Err(ReconcileError::EmptyName);
    }

    let entity = match TrackedEntity::find_by_name(conn, &name)
        .map_err(ReconcileError::DatabaseError)?
    {
        Some(existing) => existing,
        None => insert_or_adopt(conn, &name)?,
    };

    if let Some(lease) = lease {
        associate_device(conn, lease, entity.id)?;
    }

    Ok(entity)
}

/// Rename an already-resolved entity. Operating on the resolved id rather
/// than a name lookup keeps a rename from silently taking over someone
/// else's record. Surfaces `NameTaken` on a uniqueness conflict, distinct
/// from validation failure.
pub fn rename_entity(
    conn: &Connection,
    entity_id: i64,
    new_name: &str,
) -> Result<TrackedEntity, ReconcileError> {
    let name = sanitize_name(new_name);
    if name.is_empty() {
        return Err(ReconcileError::EmptyName);
    }

    match TrackedEntity::set_name(conn, entity_id, &name) {
        Ok(0) => Err(ReconcileError::UnknownEntity),
        Ok(_) => TrackedEntity::find_by_id(conn, entity_id)
            .map_err(ReconcileError::DatabaseError)?
            .ok_or(ReconcileError::UnknownEntity),
        Err(err) => Err(err.into()),
    }
}

/// Insert a new entity; when a concurrent submission won the name first, the
/// insert hits the uniqueness constraint and we adopt the winner's row
/// instead of failing.
fn insert_or_adopt(conn: &Connection, name: &str) -> Result<TrackedEntity, ReconcileError> {
    match TrackedEntity::insert(conn, name) {
        Ok(entity) => Ok(entity),
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            TrackedEntity::find_by_name(conn, name)
                .map_err(ReconcileError::DatabaseError)?
                .ok_or(ReconcileError::NameTaken)
        }
        Err(err) => Err(ReconcileError::DatabaseError(err)),
    }
}

fn associate_device(
    conn: &Connection,
    lease: &Lease,
    entity_id: i64,
) -> Result<(), ReconcileError> {
    if let Some(device) =
        Device::find_by_mac(conn, &lease.mac).map_err(ReconcileError::DatabaseError)?
    {
        Device::set_entity(conn, device.id, entity_id).map_err(ReconcileError::DatabaseError)?;
        return Ok(());
    }

    match Device::insert(conn, &lease.mac, device_hostname(lease), entity_id) {
        Ok(_) => Ok(()),
        // Lost a race against another submission inserting the same hardware
        // address: repoint the winner's row instead.
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            if let Some(device) =
                Device::find_by_mac(conn, &lease.mac).map_err(ReconcileError::DatabaseError)?
            {
                Device::set_entity(conn, device.id, entity_id)
                    .map_err(ReconcileError::DatabaseError)?;
            }
            Ok(())
        }
        Err(err) => Err(ReconcileError::DatabaseError(err)),
    }
}

/// Lease listings report unknown hostnames as "*".
fn device_hostname(lease: &Lease) -> Option<&str> {
    match lease.hostname.as_str() {
        "" | "*" => None,
        name => Some(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::new_test_connection;

    fn lease(ip: &str, hostname: &str, mac: &str) -> Lease {
        Lease {
            ip: ip.to_string(),
            hostname: hostname.to_string(),
            mac: mac.to_string(),
        }
    }

    #[test]
    fn test_reconcile_sanitizes_and_creates_entity_with_device() {
        let conn = new_test_connection();
        let lease = lease("192.168.1.100", "test-hostname", "1a:2b:3c:4d:5e:6f");

        let entity = reconcile(&conn, "45spoons.", Some(&lease)).unwrap();

        assert_eq!(entity.name, "45spoons");
        let device = Device::find_by_mac(&conn, "1a:2b:3c:4d:5e:6f").unwrap().unwrap();
        assert_eq!(device.entity_id, entity.id);
        assert_eq!(device.hostname.as_deref(), Some("test-hostname"));
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let conn = new_test_connection();
        let lease = lease("192.168.1.100", "test-hostname", "1a:2b:3c:4d:5e:6f");

        let first = reconcile(&conn, "45spoons", Some(&lease)).unwrap();
        let second = reconcile(&conn, "45spoons", Some(&lease)).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(TrackedEntity::all(&conn).unwrap().len(), 1);
        assert_eq!(Device::for_entity(&conn, first.id).unwrap().len(), 1);
    }

    #[test]
    fn test_reconcile_new_name_repoints_existing_device() {
        let conn = new_test_connection();
        let lease = lease("192.168.1.100", "test-hostname", "1a:2b:3c:4d:5e:6f");

        let original = reconcile(&conn, "45spoons", Some(&lease)).unwrap();
        let renamed = reconcile(&conn, "spoons", Some(&lease)).unwrap();

        assert_ne!(original.id, renamed.id);
        let device = Device::find_by_mac(&conn, "1a:2b:3c:4d:5e:6f").unwrap().unwrap();
        assert_eq!(device.entity_id, renamed.id);
        // The old entity survives with zero devices.
        assert!(TrackedEntity::find_by_id(&conn, original.id).unwrap().is_some());
        assert!(Device::for_entity(&conn, original.id).unwrap().is_empty());
    }

    #[test]
    fn test_reconcile_existing_name_gains_new_device() {
        let conn = new_test_connection();
        let phone = lease("192.168.1.100", "phone", "1a:2b:3c:4d:5e:6f");
        let laptop = lease("192.168.1.101", "laptop", "6f:5e:4d:3c:2b:1a");

        let entity = reconcile(&conn, "alex", Some(&phone)).unwrap();
        reconcile(&conn, "alex", Some(&laptop)).unwrap();

        assert_eq!(Device::for_entity(&conn, entity.id).unwrap().len(), 2);
    }

    #[test]
    fn test_reconcile_without_lease_creates_bare_entity() {
        let conn = new_test_connection();
        let entity = reconcile(&conn, "alex", None).unwrap();

        assert_eq!(entity.name, "alex");
        assert!(Device::for_entity(&conn, entity.id).unwrap().is_empty());
    }

    #[test]
    fn test_reconcile_rejects_name_empty_after_sanitization() {
        let conn = new_test_connection();
        let err = reconcile(&conn, "!!! ???", None).unwrap_err();
        assert!(matches!(err, ReconcileError::EmptyName));
        assert!(TrackedEntity::all(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_reconcile_unknown_hostname_stored_as_null() {
        let conn = new_test_connection();
        let lease = lease("192.168.1.100", "*", "1a:2b:3c:4d:5e:6f");

        reconcile(&conn, "alex", Some(&lease)).unwrap();

        let device = Device::find_by_mac(&conn, "1a:2b:3c:4d:5e:6f").unwrap().unwrap();
        assert_eq!(device.hostname, None);
    }

    #[test]
    fn test_rename_entity_on_resolved_id() {
        let conn = new_test_connection();
        let entity = reconcile(&conn, "45spoons", None).unwrap();

        let renamed = rename_entity(&conn, entity.id, " spoons! ").unwrap();

        assert_eq!(renamed.id, entity.id);
        assert_eq!(renamed.name, "spoons");
        assert!(TrackedEntity::find_by_name(&conn, "45spoons").unwrap().is_none());
    }

    #[test]
    fn test_rename_entity_conflict_is_name_taken() {
        let conn = new_test_connection();
        reconcile(&conn, "alex", None).unwrap();
        let entity = reconcile(&conn, "sam", None).unwrap();

        let err = rename_entity(&conn, entity.id, "alex").unwrap_err();
        assert!(matches!(err, ReconcileError::NameTaken));
    }

    #[test]
    fn test_rename_entity_missing_target() {
        let conn = new_test_connection();
        let err = rename_entity(&conn, 42, "alex").unwrap_err();
        assert!(matches!(err, ReconcileError::UnknownEntity));
    }

    #[test]
    fn test_rename_entity_rejects_empty_name() {
        let conn = new_test_connection();
        let entity = reconcile(&conn, "alex", None).unwrap();
        let err = rename_entity(&conn, entity.id, "...").unwrap_err();
        assert!(matches!(err, ReconcileError::EmptyName));
    }
}
