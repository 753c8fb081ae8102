//! Persistence ports consumed by the core.
//!
//! Adapters return `anyhow::Result` for infrastructure failures. Domain
//! outcomes that the storage layer is the authority on (a uniqueness
//! constraint rejecting a duplicate relation, a delete that matched nothing)
//! are reported as data so the core can turn them into typed errors.

use anyhow::Result;
use pantry_types::models::{
    AuthorSubscription, Ingredient, RecipeCard, RecipeIngredient, Relation, RelationKind, Tag,
};
use uuid::Uuid;

use crate::filter::RecipeQuery;
use crate::recipes::ValidRecipe;

/// A slice of an ordered selection: skip `offset` rows, return at most
/// `limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: usize,
    pub limit: usize,
}

impl Window {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// The whole selection.
    pub fn all() -> Self {
        Self::new(0, usize::MAX)
    }

    /// The windowed part of `items`.
    pub fn slice<I: IntoIterator>(self, items: I) -> impl Iterator<Item = I::Item> {
        items.into_iter().skip(self.offset).take(self.limit)
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::all()
    }
}

pub trait CatalogStore {
    /// Ingredients whose lowercased name contains `needle`. The needle is
    /// already lowercased; an empty needle matches the whole catalog. Order
    /// is unspecified, ranking happens in [`crate::matcher`].
    fn find_ingredients(&self, needle: &str) -> Result<Vec<Ingredient>>;

    fn get_ingredient(&self, id: Uuid) -> Result<Option<Ingredient>>;

    /// The subset of `ids` that exist. Unknown ids are silently skipped.
    fn ingredients_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Ingredient>>;

    fn list_tags(&self) -> Result<Vec<Tag>>;

    fn get_tag(&self, id: Uuid) -> Result<Option<Tag>>;

    fn tags_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Tag>>;
}

pub trait RecipeStore {
    /// One window of the recipes selected by `query`, in the query's order,
    /// with relation flags computed for `viewer`. The query has already been
    /// resolved against the viewer, so user-relative predicates are only set
    /// when a viewer is present.
    fn find_recipes(
        &self,
        query: &RecipeQuery,
        viewer: Option<Uuid>,
        window: Window,
    ) -> Result<Vec<RecipeCard>>;

    /// Size of the whole selection `find_recipes` windows over.
    fn count_recipes(&self, query: &RecipeQuery, viewer: Option<Uuid>) -> Result<usize>;

    fn get_recipe(&self, id: Uuid, viewer: Option<Uuid>) -> Result<Option<RecipeCard>>;

    fn insert_recipe(&self, author_id: Uuid, recipe: &ValidRecipe) -> Result<Uuid>;

    /// Replaces fields, ingredient lines and tags of `id` all at once. A
    /// failure must leave the stored recipe untouched.
    fn update_recipe(&self, id: Uuid, recipe: &ValidRecipe) -> Result<()>;

    /// Returns false when nothing was deleted.
    fn delete_recipe(&self, id: Uuid) -> Result<bool>;

    /// Ingredient lines of one recipe in the order they were written.
    fn recipe_ingredients_for(&self, recipe_id: Uuid) -> Result<Vec<RecipeIngredient>>;

    /// Ingredient lines of every recipe in the user's shopping cart, in the
    /// order the lines were written.
    fn cart_ingredients(&self, user_id: Uuid) -> Result<Vec<RecipeIngredient>>;
}

pub trait RelationStore {
    /// Whether the recipe (favorite, cart) or user (subscription) exists.
    fn target_exists(&self, kind: RelationKind, target_id: Uuid) -> Result<bool>;

    fn relation_exists(&self, kind: RelationKind, user_id: Uuid, target_id: Uuid) -> Result<bool>;

    /// Inserts the pair. Returns `Ok(None)` when the store's uniqueness
    /// constraint rejected it because the pair is already present.
    fn create_relation(
        &self,
        kind: RelationKind,
        user_id: Uuid,
        target_id: Uuid,
    ) -> Result<Option<Relation>>;

    /// Returns false when the pair was absent.
    fn delete_relation(&self, kind: RelationKind, user_id: Uuid, target_id: Uuid) -> Result<bool>;

    /// One window of the authors followed by `user_id`, newest subscription
    /// first, each with up to `recipes_limit` of their newest recipes.
    fn subscriptions(
        &self,
        user_id: Uuid,
        recipes_limit: usize,
        window: Window,
    ) -> Result<Vec<AuthorSubscription>>;

    fn count_subscriptions(&self, user_id: Uuid) -> Result<usize>;
}
