//! API handlers for the presence routes. Handlers translate engine results
//! into JSON bodies; all persistence work runs on the blocking pool with a
//! fresh connection per call.

use std::sync::Arc;

use actix_web::web::{Data, Form, Json, Path};
use actix_web::{HttpRequest, HttpResponse, Responder, get, post, put};
use serde::{Deserialize, Serialize};
use tokio::task;

use crate::presence::{Device, PresenceEngine, ReconcileError, TrackedEntity};

#[derive(Debug, Deserialize)]
pub struct TrackedCreate {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct NameForm {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct TrackedDetail {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
    pub devices: Vec<Device>,
}

impl TrackedDetail {
    fn new(entity: TrackedEntity, devices: Vec<Device>) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            created_at: entity.created_at,
            devices,
        }
    }
}

/// The requester's network address, used to look up their lease. Presence
/// association only makes sense for direct LAN clients, so the peer address
/// is the right identity here.
fn requester_ip(req: &HttpRequest) -> Option<String> {
    req.peer_addr().map(|addr| addr.ip().to_string())
}

fn reconcile_error_response(err: ReconcileError) -> HttpResponse {
    match err {
        ReconcileError::EmptyName => HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Name must contain at least one letter or digit"
        })),
        ReconcileError::NameTaken => HttpResponse::Conflict().json(serde_json::json!({
            "error": "Name is already taken"
        })),
        ReconcileError::UnknownEntity => HttpResponse::NotFound().json(serde_json::json!({
            "error": "TrackedEntity not found"
        })),
        ReconcileError::DatabaseError(e) => {
            eprintln!("Reconciliation failed: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to update tracked entities"
            }))
        }
    }
}

fn internal_error(context: &str) -> HttpResponse {
    HttpResponse::InternalServerError().json(serde_json::json!({ "error": context }))
}

/// Present names plus the requester's own resolved entity, if any.
#[get("/")]
pub async fn index(req: HttpRequest, engine: Data<Arc<PresenceEngine>>) -> impl Responder {
    let ip = requester_ip(&req);
    let engine = engine.get_ref().clone();

    let result = task::spawn_blocking(move || {
        let present_names = engine.present_names()?;
        let tracked = match &ip {
            Some(ip) => engine.resolve(ip)?,
            None => None,
        };
        Ok::<_, rusqlite::Error>((present_names, tracked))
    })
    .await;

    match result {
        Ok(Ok((present_names, tracked))) => HttpResponse::Ok().json(serde_json::json!({
            "present_names": present_names,
            "tracked": tracked,
        })),
        Ok(Err(e)) => {
            eprintln!("Failed to build presence view: {}", e);
            internal_error("Failed to load presence state")
        }
        Err(e) => {
            eprintln!("Presence view task failed: {}", e);
            internal_error("Failed to load presence state")
        }
    }
}

/// Current lease snapshot, for inspection. May be empty after a failed poll.
#[get("/api/leases")]
pub async fn get_leases(engine: Data<Arc<PresenceEngine>>) -> impl Responder {
    let leases = engine.cache().leases();
    HttpResponse::Ok().json(serde_json::json!({ "leases": &*leases }))
}

#[get("/api/present")]
pub async fn get_present_names(engine: Data<Arc<PresenceEngine>>) -> impl Responder {
    let engine = engine.get_ref().clone();
    let result = task::spawn_blocking(move || engine.present_names()).await;

    match result {
        Ok(Ok(present_names)) => HttpResponse::Ok().json(serde_json::json!({
            "present_names": present_names,
        })),
        Ok(Err(e)) => {
            eprintln!("Failed to compute present names: {}", e);
            internal_error("Failed to load presence state")
        }
        Err(e) => {
            eprintln!("Present names task failed: {}", e);
            internal_error("Failed to load presence state")
        }
    }
}

#[get("/trackeds")]
pub async fn get_trackeds(engine: Data<Arc<PresenceEngine>>) -> impl Responder {
    let engine = engine.get_ref().clone();
    let result = task::spawn_blocking(move || engine.list_tracked()).await;

    match result {
        Ok(Ok(trackeds)) => HttpResponse::Ok().json(trackeds),
        Ok(Err(e)) => {
            eprintln!("Failed to list tracked entities: {}", e);
            internal_error("Failed to list tracked entities")
        }
        Err(e) => {
            eprintln!("Tracked listing task failed: {}", e);
            internal_error("Failed to list tracked entities")
        }
    }
}

#[get("/tracked/{id}")]
pub async fn get_tracked(path: Path<i64>, engine: Data<Arc<PresenceEngine>>) -> impl Responder {
    let id = path.into_inner();
    let engine = engine.get_ref().clone();
    let result = task::spawn_blocking(move || engine.get_tracked(id)).await;

    match result {
        Ok(Ok(Some((entity, devices)))) => {
            HttpResponse::Ok().json(TrackedDetail::new(entity, devices))
        }
        Ok(Ok(None)) => HttpResponse::NotFound().json(serde_json::json!({
            "error": "TrackedEntity not found"
        })),
        Ok(Err(e)) => {
            eprintln!("Failed to load tracked entity {}: {}", id, e);
            internal_error("Failed to load tracked entity")
        }
        Err(e) => {
            eprintln!("Tracked detail task failed: {}", e);
            internal_error("Failed to load tracked entity")
        }
    }
}

/// Submit a name for the requesting device. Creates or merges the entity and
/// associates the requester's device when their address matches a lease.
#[post("/tracked")]
pub async fn create_tracked(
    req: HttpRequest,
    payload: Json<TrackedCreate>,
    engine: Data<Arc<PresenceEngine>>,
) -> impl Responder {
    let ip = requester_ip(&req);
    let name = payload.into_inner().name;
    let engine = engine.get_ref().clone();

    let result = task::spawn_blocking(move || {
        let lease = ip.as_deref().and_then(|ip| engine.cache().lookup_by_ip(ip));
        if lease.is_none() {
            println!("Creating tracked entity with no association to any device");
        }
        let entity = engine.reconcile(&name, lease.as_ref())?;
        let devices = match engine.get_tracked(entity.id) {
            Ok(Some((_, devices))) => devices,
            _ => Vec::new(),
        };
        Ok::<_, ReconcileError>(TrackedDetail::new(entity, devices))
    })
    .await;

    match result {
        Ok(Ok(detail)) => HttpResponse::Ok().json(detail),
        Ok(Err(e)) => reconcile_error_response(e),
        Err(e) => {
            eprintln!("Tracked creation task failed: {}", e);
            internal_error("Failed to create tracked entity")
        }
    }
}

/// Explicit rename of an existing entity, addressed by id so a rename can
/// never take over another name's record.
#[put("/tracked/{id}")]
pub async fn rename_tracked(
    path: Path<i64>,
    payload: Json<TrackedCreate>,
    engine: Data<Arc<PresenceEngine>>,
) -> impl Responder {
    let id = path.into_inner();
    let name = payload.into_inner().name;
    let engine = engine.get_ref().clone();

    let result = task::spawn_blocking(move || engine.rename(id, &name)).await;

    match result {
        Ok(Ok(entity)) => HttpResponse::Ok().json(entity),
        Ok(Err(e)) => reconcile_error_response(e),
        Err(e) => {
            eprintln!("Rename task failed: {}", e);
            internal_error("Failed to rename tracked entity")
        }
    }
}

/// Browser form submission variant of `create_tracked`: redirects back to
/// the index on success.
#[post("/name-form")]
pub async fn handle_name_form(
    req: HttpRequest,
    form: Form<NameForm>,
    engine: Data<Arc<PresenceEngine>>,
) -> impl Responder {
    let ip = requester_ip(&req);
    let name = form.into_inner().username;
    let engine = engine.get_ref().clone();

    let result = task::spawn_blocking(move || {
        let lease = ip.as_deref().and_then(|ip| engine.cache().lookup_by_ip(ip));
        engine.reconcile(&name, lease.as_ref())
    })
    .await;

    match result {
        Ok(Ok(_)) => HttpResponse::Found()
            .insert_header(("Location", "/"))
            .finish(),
        Ok(Err(e)) => reconcile_error_response(e),
        Err(e) => {
            eprintln!("Name form task failed: {}", e);
            internal_error("Failed to create tracked entity")
        }
    }
}
