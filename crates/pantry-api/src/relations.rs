use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pantry_core::CoreResult;
use pantry_core::toggle::{
    ToggleAction, ToggleOutcome, list_subscriptions, toggle_cart, toggle_favorite,
    toggle_subscription,
};
use pantry_db::Database;
use pantry_types::api::Page;
use pantry_types::models::AuthorSubscription;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{Path, Query};
use crate::middleware::AuthUser;
use crate::recipes::page_window;
use crate::state::{AppState, run_blocking};

type ToggleFn = fn(&Database, Uuid, Uuid, ToggleAction) -> CoreResult<ToggleOutcome>;

/// Added relations answer 201 with the relation, removals 204. Adds are
/// routed for both POST and GET.
async fn toggle(
    state: &AppState,
    op: ToggleFn,
    user: AuthUser,
    target_id: Uuid,
    action: ToggleAction,
) -> Result<Response, ApiError> {
    let user_id = user.id();
    let outcome = run_blocking(state, move |db| op(db, user_id, target_id, action)).await?;

    Ok(match outcome {
        ToggleOutcome::Added(relation) => (StatusCode::CREATED, Json(relation)).into_response(),
        ToggleOutcome::Removed => StatusCode::NO_CONTENT.into_response(),
    })
}

pub async fn add_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(recipe_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    toggle(&state, toggle_favorite, user, recipe_id, ToggleAction::Add).await
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(recipe_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    toggle(&state, toggle_favorite, user, recipe_id, ToggleAction::Remove).await
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(recipe_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    toggle(&state, toggle_cart, user, recipe_id, ToggleAction::Add).await
}

pub async fn remove_from_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(recipe_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    toggle(&state, toggle_cart, user, recipe_id, ToggleAction::Remove).await
}

pub async fn subscribe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(author_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    toggle(&state, toggle_subscription, user, author_id, ToggleAction::Add).await
}

pub async fn unsubscribe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(author_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    toggle(&state, toggle_subscription, user, author_id, ToggleAction::Remove).await
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionsQuery {
    pub recipes_limit: Option<usize>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

pub async fn subscriptions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SubscriptionsQuery>,
) -> Result<Json<Page<AuthorSubscription>>, ApiError> {
    let user_id = user.id();
    let recipes_limit = query.recipes_limit.unwrap_or(usize::MAX);
    let window = page_window(query.limit, query.offset);
    let page = run_blocking(&state, move |db| {
        list_subscriptions(db, user_id, recipes_limit, window)
    })
    .await?;
    Ok(Json(page))
}
