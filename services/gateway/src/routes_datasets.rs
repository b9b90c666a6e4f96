use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use royalty::{Address, Dataset, DatasetStore};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{not_found, royalty_error, store_error, ApiError};
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct CreateDataset {
    pub name: String,
    pub owner: String,
}

pub async fn post_dataset(
    State(state): State<SharedState>,
    Json(body): Json<CreateDataset>,
) -> Result<(StatusCode, Json<Dataset>), ApiError> {
    let owner = Address::parse(&body.owner).map_err(royalty_error)?;
    let dataset = Dataset::new(body.name, owner);
    state.sync.store().save(&dataset).map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(dataset)))
}

pub async fn get_datasets(
    State(state): State<SharedState>,
) -> Result<Json<Vec<Dataset>>, ApiError> {
    let datasets = state.sync.store().list().map_err(store_error)?;
    Ok(Json(datasets))
}

pub async fn get_dataset(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Dataset>, ApiError> {
    let dataset = state
        .sync
        .store()
        .load(id)
        .map_err(store_error)?
        .ok_or_else(|| not_found("dataset"))?;
    Ok(Json(dataset))
}
