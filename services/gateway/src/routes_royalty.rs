//! Royalty routes: contributor management, usage recording, reward queries
//! and the distribute entry point.
//!
//! Every mutation takes the dataset's session lock before the
//! load-mutate-save cycle so it can never interleave with a running
//! synchronization session.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chainsync::{SyncError, SyncReport};
use royalty::{Address, Dataset, DatasetStore};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{error_body, not_found, royalty_error, store_error, ApiError};
use crate::state::SharedState;

fn load_dataset(state: &SharedState, id: Uuid) -> Result<Dataset, ApiError> {
    state
        .sync
        .store()
        .load(id)
        .map_err(store_error)?
        .ok_or_else(|| not_found("dataset"))
}

fn busy(id: Uuid) -> ApiError {
    error_body(
        StatusCode::CONFLICT,
        format!("a synchronization session is running for dataset {id}, retry later"),
    )
}

// ---- contributor management ----

#[derive(Deserialize)]
pub struct AddContributor {
    pub address: String,
    pub percentage: u8,
    pub owner_address: String,
}

pub async fn post_contributor(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(body): Json<AddContributor>,
) -> Result<Json<Value>, ApiError> {
    let address = Address::parse(&body.address).map_err(royalty_error)?;
    let requester = Address::parse(&body.owner_address).map_err(royalty_error)?;

    let _guard = state.sync.lock().try_acquire(id).ok_or_else(|| busy(id))?;
    let mut dataset = load_dataset(&state, id)?;
    dataset
        .add_contributor(address.clone(), body.percentage, &requester)
        .map_err(royalty_error)?;
    state.sync.store().save(&dataset).map_err(store_error)?;

    Ok(Json(json!({
        "dataset_id": dataset.id,
        "added": address,
        "percentage": body.percentage,
        "remaining_percentage": dataset.remaining_percentage(),
    })))
}

#[derive(Deserialize)]
pub struct UpdateContributor {
    pub percentage: u8,
    pub owner_address: String,
}

pub async fn patch_contributor(
    State(state): State<SharedState>,
    Path((id, address)): Path<(Uuid, String)>,
    Json(body): Json<UpdateContributor>,
) -> Result<Json<Value>, ApiError> {
    let address = Address::parse(&address).map_err(royalty_error)?;
    let requester = Address::parse(&body.owner_address).map_err(royalty_error)?;

    let _guard = state.sync.lock().try_acquire(id).ok_or_else(|| busy(id))?;
    let mut dataset = load_dataset(&state, id)?;
    dataset
        .update_contributor_percentage(&address, body.percentage, &requester)
        .map_err(royalty_error)?;
    state.sync.store().save(&dataset).map_err(store_error)?;

    Ok(Json(json!({
        "dataset_id": dataset.id,
        "updated": address,
        "percentage": body.percentage,
        "remaining_percentage": dataset.remaining_percentage(),
    })))
}

#[derive(Deserialize)]
pub struct RemoveContributor {
    pub owner_address: String,
}

pub async fn delete_contributor(
    State(state): State<SharedState>,
    Path((id, address)): Path<(Uuid, String)>,
    Json(body): Json<RemoveContributor>,
) -> Result<Json<Value>, ApiError> {
    let address = Address::parse(&address).map_err(royalty_error)?;
    let requester = Address::parse(&body.owner_address).map_err(royalty_error)?;

    let _guard = state.sync.lock().try_acquire(id).ok_or_else(|| busy(id))?;
    let mut dataset = load_dataset(&state, id)?;
    dataset
        .remove_contributor(&address, &requester)
        .map_err(royalty_error)?;
    state.sync.store().save(&dataset).map_err(store_error)?;

    Ok(Json(json!({
        "dataset_id": dataset.id,
        "removed": address,
        "remaining_percentage": dataset.remaining_percentage(),
    })))
}

pub async fn get_contributors(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let dataset = load_dataset(&state, id)?;
    Ok(Json(json!({
        "dataset_id": dataset.id,
        "dataset_name": dataset.name,
        "owner": dataset.owner,
        "contributors": dataset.contributors,
        "total_percentage": dataset.allocated_percentage(),
        "remaining_percentage": dataset.remaining_percentage(),
        "total_rewarded": dataset.total_rewarded,
        "pending_pool": dataset.pending_pool,
    })))
}

// ---- usage recording and reward queries ----

#[derive(Deserialize)]
pub struct RecordUsage {
    pub trainer: String,
    pub model_type: String,
    pub accuracy: u16,
    pub reward_pool: u64,
}

pub async fn post_usage(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RecordUsage>,
) -> Result<Json<Value>, ApiError> {
    let trainer = Address::parse(&body.trainer).map_err(royalty_error)?;

    let _guard = state.sync.lock().try_acquire(id).ok_or_else(|| busy(id))?;
    let mut dataset = load_dataset(&state, id)?;
    let split = dataset
        .record_usage(trainer, body.model_type, body.accuracy, body.reward_pool)
        .map_err(royalty_error)?;
    state.sync.store().save(&dataset).map_err(store_error)?;

    Ok(Json(json!({
        "dataset_id": dataset.id,
        "usage": dataset.usage_events.last(),
        "reward_distribution": split.distribution,
        "distributed": split.distributed,
        "remainder": split.remainder,
        "pending_pool": dataset.pending_pool,
    })))
}

pub async fn get_usage(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let dataset = load_dataset(&state, id)?;
    Ok(Json(json!({
        "dataset_id": dataset.id,
        "dataset_name": dataset.name,
        "usage_history": dataset.usage_events,
        "total_usages": dataset.usage_events.len(),
    })))
}

pub async fn get_contributor_rewards(
    State(state): State<SharedState>,
    Path((id, address)): Path<(Uuid, String)>,
) -> Result<Json<Value>, ApiError> {
    let address = Address::parse(&address).map_err(royalty_error)?;
    let dataset = load_dataset(&state, id)?;
    let contributor = dataset
        .contributor(&address)
        .ok_or_else(|| not_found("contributor"))?;

    let details: Vec<Value> = dataset
        .usage_events
        .iter()
        .map(|u| {
            json!({
                "timestamp": u.timestamp,
                "model_type": u.model_type,
                "trainer": u.trainer,
                "accuracy_bps": u.accuracy_bps,
                "reward_received": u.reward_distribution.get(&address).copied().unwrap_or(0),
            })
        })
        .collect();

    Ok(Json(json!({
        "dataset_id": dataset.id,
        "contributor": address,
        "percentage": contributor.percentage,
        "cumulative_reward": contributor.cumulative_reward,
        "joined_at": contributor.joined_at,
        "reward_details": details,
    })))
}

/// Total rewards for one address across every dataset it contributes to.
pub async fn get_user_rewards(
    State(state): State<SharedState>,
    Path(address): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let address = Address::parse(&address).map_err(royalty_error)?;
    let datasets = state.sync.store().list().map_err(store_error)?;

    let mut total: u64 = 0;
    let mut contributions: Vec<Value> = Vec::new();
    for ds in &datasets {
        if let Some(c) = ds.contributor(&address) {
            total += c.cumulative_reward;
            contributions.push(json!({
                "dataset_id": ds.id,
                "dataset_name": ds.name,
                "percentage": c.percentage,
                "cumulative_reward": c.cumulative_reward,
                "joined_at": c.joined_at,
            }));
        }
    }

    Ok(Json(json!({
        "address": address,
        "total_rewards": total,
        "contribution_count": contributions.len(),
        "contributions": contributions,
    })))
}

// ---- distribution ----

#[derive(Deserialize)]
pub struct DistributeRequest {
    pub requester: String,
}

pub async fn post_distribute(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(body): Json<DistributeRequest>,
) -> Result<(StatusCode, Json<SyncReport>), ApiError> {
    let requester = Address::parse(&body.requester).map_err(royalty_error)?;

    let report = state
        .sync
        .distribute(id, &requester)
        .await
        .map_err(sync_error)?;

    // A session that started but failed still carries its step log; surface
    // it with a gateway-level status so callers can inspect and retry.
    let status = if report.is_confirmed() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    Ok((status, Json(report)))
}

fn sync_error(e: SyncError) -> ApiError {
    let status = match e {
        SyncError::SessionBusy(_) => StatusCode::CONFLICT,
        SyncError::DatasetNotFound(_) => StatusCode::NOT_FOUND,
        SyncError::Unauthorized => StatusCode::FORBIDDEN,
        SyncError::NoContributors
        | SyncError::IncompleteAllocation { .. }
        | SyncError::NothingToDistribute
        | SyncError::RewardOverflow => StatusCode::BAD_REQUEST,
        SyncError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_body(status, e)
}
