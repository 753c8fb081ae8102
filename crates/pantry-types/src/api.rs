use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// Claims carried by bearer tokens from the identity service. Only `sub` and
/// `username` are read; everything else about the session lives upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Recipes --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngredientAmountRequest {
    pub id: Uuid,
    pub amount: i64,
}

/// Body of both create and update. Numbers arrive signed so that zero and
/// negative inputs reach validation instead of failing deserialization.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeRequest {
    pub name: String,
    pub text: String,
    pub cooking_time: i64,
    #[serde(default)]
    pub tags: Vec<Uuid>,
    pub ingredients: Vec<IngredientAmountRequest>,
}

// -- Catalog import --

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientRecord {
    pub name: String,
    pub measurement_unit: String,
}

// -- Errors --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub detail: String,
}

// -- Listing --

/// One window of a listing plus the size of the whole selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub count: usize,
    pub results: Vec<T>,
}
