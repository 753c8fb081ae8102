use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use pantry_core::filter::{RecipeOrder, RecipeQuery, list_recipes as select_recipes};
use pantry_core::recipes::{self, RecipeDraft};
use pantry_core::store::Window;
use pantry_types::api::{Page, RecipeRequest};
use pantry_types::models::RecipeCard;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{JsonBody, Path, Query};
use crate::middleware::{AuthUser, Viewer};
use crate::state::{AppState, run_blocking};

pub const DEFAULT_LIMIT: usize = 6;
pub const MAX_LIMIT: usize = 100;

/// The requested page, with the limit defaulted and capped.
pub fn page_window(limit: Option<usize>, offset: usize) -> Window {
    Window::new(offset, limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT))
}

/// Query string of the recipe listing. `tags` may repeat and each value may
/// itself be a comma separated list of slugs.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeListParams {
    pub author: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_favorited: Option<String>,
    pub is_in_shopping_cart: Option<String>,
    pub ordering: Option<String>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

impl RecipeListParams {
    pub fn to_query(&self) -> Result<RecipeQuery, ApiError> {
        let mut query = RecipeQuery::new()
            .with_tags(self.tags.iter().flat_map(|t| t.split(',')))
            .favorited(parse_flag("is_favorited", self.is_favorited.as_deref())?)
            .in_shopping_cart(parse_flag(
                "is_in_shopping_cart",
                self.is_in_shopping_cart.as_deref(),
            )?)
            .ordered(parse_ordering(self.ordering.as_deref())?);
        if let Some(author) = self.author {
            query = query.by_author(author);
        }
        Ok(query)
    }

    pub fn window(&self) -> Window {
        page_window(self.limit, self.offset)
    }
}

fn parse_flag(name: &str, raw: Option<&str>) -> Result<bool, ApiError> {
    match raw.map(str::trim) {
        None | Some("") | Some("0") | Some("false") => Ok(false),
        Some("1") | Some("true") => Ok(true),
        Some(other) => Err(ApiError::BadRequest(format!(
            "`{}` must be 0 or 1, got {:?}",
            name, other
        ))),
    }
}

fn parse_ordering(raw: Option<&str>) -> Result<RecipeOrder, ApiError> {
    match raw {
        None | Some("newest") | Some("-created") => Ok(RecipeOrder::NewestFirst),
        Some("oldest") | Some("created") => Ok(RecipeOrder::OldestFirst),
        Some(other) => Err(ApiError::BadRequest(format!("unknown ordering {:?}", other))),
    }
}

pub async fn list_recipes(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Query(params): Query<RecipeListParams>,
) -> Result<Json<Page<RecipeCard>>, ApiError> {
    let query = params.to_query()?;
    let window = params.window();
    let page = run_blocking(&state, move |db| select_recipes(db, &query, viewer, window)).await?;
    Ok(Json(page))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<Uuid>,
) -> Result<Json<RecipeCard>, ApiError> {
    let card = run_blocking(&state, move |db| recipes::get_recipe(db, viewer, id)).await?;
    Ok(Json(card))
}

pub async fn create_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(req): JsonBody<RecipeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let draft = RecipeDraft::from(req);
    let author = user.id();
    let card = run_blocking(&state, move |db| recipes::create_recipe(db, author, &draft)).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

pub async fn update_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<RecipeRequest>,
) -> Result<Json<RecipeCard>, ApiError> {
    let draft = RecipeDraft::from(req);
    let user_id = user.id();
    let card =
        run_blocking(&state, move |db| recipes::update_recipe(db, user_id, id, &draft)).await?;
    Ok(Json(card))
}

pub async fn delete_recipe(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let user_id = user.id();
    run_blocking(&state, move |db| recipes::delete_recipe(db, user_id, id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
