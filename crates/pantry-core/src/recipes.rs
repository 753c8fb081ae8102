//! Recipe validation and the create/update/delete lifecycle.
//!
//! Every check runs before the store is asked to write anything, and the
//! store applies a validated recipe in a single transaction.

use std::collections::HashSet;

use pantry_types::api::RecipeRequest;
use pantry_types::models::RecipeCard;
use tracing::info;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::store::{CatalogStore, RecipeStore};

pub const MAX_NAME_LEN: usize = 300;
pub const MAX_AMOUNT: u32 = 32_000;
pub const MAX_COOKING_TIME: u32 = 32_000;

/// Unvalidated recipe input as it arrives from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDraft {
    pub name: String,
    pub text: String,
    pub cooking_time: i64,
    pub tags: Vec<Uuid>,
    pub ingredients: Vec<(Uuid, i64)>,
}

impl From<RecipeRequest> for RecipeDraft {
    fn from(req: RecipeRequest) -> Self {
        Self {
            name: req.name,
            text: req.text,
            cooking_time: req.cooking_time,
            tags: req.tags,
            ingredients: req
                .ingredients
                .into_iter()
                .map(|line| (line.id, line.amount))
                .collect(),
        }
    }
}

/// A recipe that passed every check. Only [`validate`] and
/// [`RecipeDraft::check_shape`] construct one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRecipe {
    name: String,
    text: String,
    cooking_time: u32,
    tag_ids: Vec<Uuid>,
    ingredients: Vec<(Uuid, u32)>,
}

impl ValidRecipe {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cooking_time(&self) -> u32 {
        self.cooking_time
    }

    /// Tag ids in first-seen order without repeats.
    pub fn tag_ids(&self) -> &[Uuid] {
        &self.tag_ids
    }

    /// (ingredient id, amount) lines in input order.
    pub fn ingredients(&self) -> &[(Uuid, u32)] {
        &self.ingredients
    }

    fn ingredient_ids(&self) -> Vec<Uuid> {
        self.ingredients.iter().map(|(id, _)| *id).collect()
    }
}

impl RecipeDraft {
    /// Checks everything that does not need the catalog.
    pub fn check_shape(&self) -> CoreResult<ValidRecipe> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CoreError::EmptyField("name"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(CoreError::FieldTooLong {
                field: "name",
                max: MAX_NAME_LEN,
            });
        }
        let text = self.text.trim();
        if text.is_empty() {
            return Err(CoreError::EmptyField("text"));
        }

        let cooking_time = bounded(self.cooking_time, MAX_COOKING_TIME).ok_or(
            CoreError::InvalidCookingTime {
                value: self.cooking_time,
                max: MAX_COOKING_TIME,
            },
        )?;

        if self.ingredients.is_empty() {
            return Err(CoreError::EmptyIngredientList);
        }
        let mut seen = HashSet::with_capacity(self.ingredients.len());
        let mut ingredients = Vec::with_capacity(self.ingredients.len());
        for &(id, amount) in &self.ingredients {
            if !seen.insert(id) {
                return Err(CoreError::DuplicateIngredientInRecipe(id));
            }
            let amount = bounded(amount, MAX_AMOUNT).ok_or(CoreError::InvalidAmount {
                ingredient_id: id,
                amount,
                max: MAX_AMOUNT,
            })?;
            ingredients.push((id, amount));
        }

        let mut tag_ids = Vec::with_capacity(self.tags.len());
        for id in &self.tags {
            if !tag_ids.contains(id) {
                tag_ids.push(*id);
            }
        }

        Ok(ValidRecipe {
            name: name.to_string(),
            text: text.to_string(),
            cooking_time,
            tag_ids,
            ingredients,
        })
    }
}

fn bounded(value: i64, max: u32) -> Option<u32> {
    u32::try_from(value)
        .ok()
        .filter(|v| (1..=max).contains(v))
}

/// Full validation: shape first, then every referenced ingredient and tag
/// must exist in the catalog.
pub fn validate<S>(store: &S, draft: &RecipeDraft) -> CoreResult<ValidRecipe>
where
    S: CatalogStore + ?Sized,
{
    let recipe = draft.check_shape()?;

    let ingredient_ids = recipe.ingredient_ids();
    let known: HashSet<Uuid> = store
        .ingredients_by_ids(&ingredient_ids)?
        .into_iter()
        .map(|i| i.id)
        .collect();
    if let Some(missing) = ingredient_ids.iter().find(|id| !known.contains(id)) {
        return Err(CoreError::UnknownIngredient(*missing));
    }

    let known: HashSet<Uuid> = store
        .tags_by_ids(recipe.tag_ids())?
        .into_iter()
        .map(|t| t.id)
        .collect();
    if let Some(missing) = recipe.tag_ids().iter().find(|id| !known.contains(id)) {
        return Err(CoreError::UnknownTag(*missing));
    }

    Ok(recipe)
}

pub fn get_recipe<S>(store: &S, viewer: Option<Uuid>, id: Uuid) -> CoreResult<RecipeCard>
where
    S: RecipeStore + ?Sized,
{
    store
        .get_recipe(id, viewer)?
        .ok_or(CoreError::RecipeNotFound(id))
}

pub fn create_recipe<S>(store: &S, author_id: Uuid, draft: &RecipeDraft) -> CoreResult<RecipeCard>
where
    S: CatalogStore + RecipeStore + ?Sized,
{
    let recipe = validate(store, draft)?;
    let id = store.insert_recipe(author_id, &recipe)?;
    info!("Recipe {} created by {}", id, author_id);
    get_recipe(store, Some(author_id), id)
}

pub fn update_recipe<S>(
    store: &S,
    user_id: Uuid,
    id: Uuid,
    draft: &RecipeDraft,
) -> CoreResult<RecipeCard>
where
    S: CatalogStore + RecipeStore + ?Sized,
{
    ensure_author(store, user_id, id)?;
    let recipe = validate(store, draft)?;
    store.update_recipe(id, &recipe)?;
    info!("Recipe {} updated by {}", id, user_id);
    get_recipe(store, Some(user_id), id)
}

pub fn delete_recipe<S>(store: &S, user_id: Uuid, id: Uuid) -> CoreResult<()>
where
    S: RecipeStore + ?Sized,
{
    ensure_author(store, user_id, id)?;
    if !store.delete_recipe(id)? {
        return Err(CoreError::RecipeNotFound(id));
    }
    info!("Recipe {} deleted by {}", id, user_id);
    Ok(())
}

fn ensure_author<S>(store: &S, user_id: Uuid, id: Uuid) -> CoreResult<()>
where
    S: RecipeStore + ?Sized,
{
    let existing = get_recipe(store, Some(user_id), id)?;
    if existing.recipe.author.id != user_id {
        return Err(CoreError::Forbidden);
    }
    Ok(())
}
