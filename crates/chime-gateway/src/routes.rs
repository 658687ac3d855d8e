//! API route handlers for the gateway.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chime_core::error::ChimeError;
use chime_core::event::{MessageEvent, NoticeEvent};
use chime_registry::{Entry, ItemType, ROOT_GROUP, Registry, Resource};
use chime_rules::{Rule, Trigger};
use chime_scheduler::Job;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::error::ApiError;
use super::server::AppState;

type ApiResult = Result<Json<Value>, ApiError>;

/// A leaf kind exposed under its own `/api/v1/<kind>` collection.
pub trait EntryKind: Serialize + DeserializeOwned + Send + Sync + 'static {
    const ITEM_TYPE: ItemType;

    fn into_entry(self) -> Entry;
    fn table(registry: &Registry) -> &BTreeMap<u64, Self>;
    fn parent_group(&self) -> u64;
}

impl EntryKind for Rule {
    const ITEM_TYPE: ItemType = ItemType::Rule;

    fn into_entry(self) -> Entry {
        Entry::Rule(self)
    }
    fn table(registry: &Registry) -> &BTreeMap<u64, Self> {
        registry.rules()
    }
    fn parent_group(&self) -> u64 {
        self.parent_group
    }
}

impl EntryKind for Trigger {
    const ITEM_TYPE: ItemType = ItemType::Trigger;

    fn into_entry(self) -> Entry {
        Entry::Trigger(self)
    }
    fn table(registry: &Registry) -> &BTreeMap<u64, Self> {
        registry.triggers()
    }
    fn parent_group(&self) -> u64 {
        self.parent_group
    }
}

impl EntryKind for Job {
    const ITEM_TYPE: ItemType = ItemType::Job;

    fn into_entry(self) -> Entry {
        Entry::Job(self)
    }
    fn table(registry: &Registry) -> &BTreeMap<u64, Self> {
        registry.jobs()
    }
    fn parent_group(&self) -> u64 {
        self.parent_group
    }
}

impl EntryKind for Resource {
    const ITEM_TYPE: ItemType = ItemType::Resource;

    fn into_entry(self) -> Entry {
        Entry::Resource(self)
    }
    fn table(registry: &Registry) -> &BTreeMap<u64, Self> {
        registry.resources()
    }
    fn parent_group(&self) -> u64 {
        self.parent_group
    }
}

/// Serialize a record and tag it with its id.
fn with_id<T: Serialize>(id: u64, record: &T) -> Value {
    let mut value = serde_json::to_value(record).unwrap_or_default();
    if let Value::Object(map) = &mut value {
        map.insert("id".into(), id.into());
    }
    value
}

fn ensure_kind<T: EntryKind>(registry: &Registry, id: u64) -> Result<(), ApiError> {
    if T::table(registry).contains_key(&id) {
        Ok(())
    } else {
        Err(ChimeError::not_found(format!("{} {id}", T::ITEM_TYPE)).into())
    }
}

/// Health check endpoint.
pub async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "chime",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// System information endpoint.
pub async fn system_info(State(state): State<Arc<AppState>>) -> Json<Value> {
    let registry = state.runtime.registry().await;
    Json(serde_json::json!({
        "ok": true,
        "version": env!("CARGO_PKG_VERSION"),
        "platform": format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "cursor": registry.cursor(),
        "counts": {
            "groups": registry.groups().len(),
            "rules": registry.rules().len(),
            "triggers": registry.triggers().len(),
            "jobs": registry.jobs().len(),
            "resources": registry.resources().len(),
        },
        "active": {
            "rules": state.runtime.dispatcher().active_rules(),
            "triggers": state.runtime.dispatcher().active_triggers(),
            "jobs": registry.scheduler().len(),
        }
    }))
}

// ── Groups ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateGroup {
    pub display_name: String,
    #[serde(default)]
    pub parent_group: u64,
}

/// Rename and/or move a group. Absent fields are left alone.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateGroup {
    pub display_name: Option<String>,
    pub parent_group: Option<u64>,
}

pub async fn list_groups(State(state): State<Arc<AppState>>) -> Json<Value> {
    let registry = state.runtime.registry().await;
    let groups: Vec<Value> = registry
        .groups()
        .iter()
        .map(|(id, group)| {
            let mut value = with_id(*id, group);
            if let Value::Object(map) = &mut value {
                map.insert("parent_group".into(), registry.parent_of_group(*id).into());
            }
            value
        })
        .collect();
    Json(serde_json::json!({"ok": true, "root": ROOT_GROUP, "groups": groups}))
}

pub async fn get_group(State(state): State<Arc<AppState>>, Path(id): Path<u64>) -> ApiResult {
    let registry = state.runtime.registry().await;
    let group = registry
        .group(id)
        .ok_or_else(|| ChimeError::not_found(format!("group {id}")))?;
    Ok(Json(serde_json::json!({
        "ok": true,
        "group": with_id(id, group),
        "parent_group": registry.parent_of_group(id),
    })))
}

pub async fn create_group(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateGroup>, JsonRejection>,
) -> ApiResult {
    let Json(body) = payload?;
    let mut registry = state.runtime.registry().await;
    let id = registry.create_group(body.parent_group, &body.display_name)?;
    Ok(Json(serde_json::json!({"ok": true, "id": id})))
}

pub async fn update_group(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    payload: Result<Json<UpdateGroup>, JsonRejection>,
) -> ApiResult {
    let Json(body) = payload?;
    let mut registry = state.runtime.registry().await;
    if let Some(parent) = body.parent_group {
        registry.move_group(id, parent)?;
    }
    if let Some(name) = body.display_name {
        registry.rename_group(id, &name)?;
    }
    Ok(Json(serde_json::json!({"ok": true})))
}

pub async fn delete_group(State(state): State<Arc<AppState>>, Path(id): Path<u64>) -> ApiResult {
    let mut registry = state.runtime.registry().await;
    registry.delete_group(id)?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// ── Entries ────────────────────────────────────────────

pub async fn list_entries<T: EntryKind>(State(state): State<Arc<AppState>>) -> Json<Value> {
    let registry = state.runtime.registry().await;
    let items: Vec<Value> = T::table(&registry)
        .iter()
        .map(|(id, record)| with_id(*id, record))
        .collect();
    Json(serde_json::json!({"ok": true, "items": items}))
}

pub async fn get_entry<T: EntryKind>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult {
    let registry = state.runtime.registry().await;
    let record = T::table(&registry)
        .get(&id)
        .ok_or_else(|| ChimeError::not_found(format!("{} {id}", T::ITEM_TYPE)))?;
    Ok(Json(serde_json::json!({"ok": true, "item": with_id(id, record)})))
}

/// The new entry goes under its `parent_group` (root when omitted).
pub async fn create_entry<T: EntryKind>(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<T>, JsonRejection>,
) -> ApiResult {
    let Json(record) = payload?;
    let parent = record.parent_group();
    let mut registry = state.runtime.registry().await;
    let id = registry.create_entry(parent, record.into_entry())?;
    Ok(Json(serde_json::json!({"ok": true, "id": id})))
}

pub async fn update_entry<T: EntryKind>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    payload: Result<Json<T>, JsonRejection>,
) -> ApiResult {
    let Json(record) = payload?;
    let mut registry = state.runtime.registry().await;
    ensure_kind::<T>(&registry, id)?;
    registry.modify_entry(id, record.into_entry())?;
    Ok(Json(serde_json::json!({"ok": true})))
}

pub async fn delete_entry<T: EntryKind>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult {
    let mut registry = state.runtime.registry().await;
    ensure_kind::<T>(&registry, id)?;
    registry.delete_entry(id)?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// ── Export / import ────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ImportBody {
    /// Base64 of an exported record.
    pub data: String,
}

pub async fn export_entry(State(state): State<Arc<AppState>>, Path(id): Path<u64>) -> ApiResult {
    let registry = state.runtime.registry().await;
    let bytes = registry.export(id)?;
    Ok(Json(serde_json::json!({"ok": true, "data": BASE64.encode(bytes)})))
}

pub async fn import_entry(
    State(state): State<Arc<AppState>>,
    Path(parent): Path<u64>,
    payload: Result<Json<ImportBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = payload?;
    let bytes = BASE64
        .decode(body.data.trim())
        .map_err(|e| ChimeError::Decode(format!("base64: {e}")))?;
    let mut registry = state.runtime.registry().await;
    let id = registry.import(parent, &bytes)?;
    Ok(Json(serde_json::json!({"ok": true, "id": id})))
}

// ── Event ingress ──────────────────────────────────────

pub async fn post_message(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MessageEvent>, JsonRejection>,
) -> ApiResult {
    let Json(event) = payload?;
    let fired = state.runtime.handle_message(&event).await;
    Ok(Json(serde_json::json!({"ok": true, "fired": fired})))
}

pub async fn post_notice(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NoticeEvent>, JsonRejection>,
) -> ApiResult {
    let Json(event) = payload?;
    let fired = state.runtime.handle_notice(&event).await;
    Ok(Json(serde_json::json!({"ok": true, "fired": fired})))
}
