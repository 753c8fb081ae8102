use axum::{Json, extract::State};
use pantry_core::matcher::search_ingredients as rank_search;
use pantry_core::store::CatalogStore;
use pantry_types::models::{Ingredient, Tag};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{Path, Query};
use crate::state::{AppState, run_blocking};

#[derive(Debug, Deserialize)]
pub struct IngredientQuery {
    #[serde(default)]
    pub name: String,
}

pub async fn search_ingredients(
    State(state): State<AppState>,
    Query(query): Query<IngredientQuery>,
) -> Result<Json<Vec<Ingredient>>, ApiError> {
    let found = run_blocking(&state, move |db| rank_search(db, &query.name)).await?;
    Ok(Json(found))
}

pub async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Ingredient>, ApiError> {
    run_blocking(&state, move |db| Ok(db.get_ingredient(id)?))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("ingredient"))
}

pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<Tag>>, ApiError> {
    let tags = run_blocking(&state, |db| Ok(db.list_tags()?)).await?;
    Ok(Json(tags))
}

pub async fn get_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Tag>, ApiError> {
    run_blocking(&state, move |db| Ok(db.get_tag(id)?))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("tag"))
}
