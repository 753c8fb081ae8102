use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
};
use pantry_core::shopping::{PURCHASE_LIST_FILENAME, build_shopping_list};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::{AppState, run_blocking};

/// GET /api/recipes/download_shopping_cart: the aggregated cart as a
/// plain-text attachment.
pub async fn download_shopping_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = user.id();
    let list = run_blocking(&state, move |db| build_shopping_list(db, user_id)).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", PURCHASE_LIST_FILENAME),
            ),
        ],
        list.render(),
    ))
}
