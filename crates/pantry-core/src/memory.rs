//! In-process store backing the core test suites and tooling that needs the
//! full store contract without a database file.

use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use pantry_types::models::{
    Author, AuthorSubscription, Ingredient, Recipe, RecipeBrief, RecipeCard, RecipeIngredient,
    Relation, RelationKind, Tag, User,
};
use uuid::Uuid;

use crate::filter::RecipeQuery;
use crate::recipes::ValidRecipe;
use crate::store::{CatalogStore, RecipeStore, RelationStore, Window};

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    users: Vec<User>,
    ingredients: Vec<Ingredient>,
    tags: Vec<Tag>,
    recipes: Vec<StoredRecipe>,
    relations: Vec<Relation>,
    clock: Option<DateTime<Utc>>,
    next_line: u64,
}

struct StoredRecipe {
    id: Uuid,
    author_id: Uuid,
    name: String,
    text: String,
    cooking_time: u32,
    tag_ids: Vec<Uuid>,
    /// (write sequence, ingredient id, amount). Rewrites take fresh numbers.
    ingredients: Vec<(u64, Uuid, u32)>,
    created_at: DateTime<Utc>,
}

impl StoredRecipe {
    fn write(&mut self, recipe: &ValidRecipe, first_line: u64) {
        self.name = recipe.name().to_string();
        self.text = recipe.text().to_string();
        self.cooking_time = recipe.cooking_time();
        self.tag_ids = recipe.tag_ids().to_vec();
        self.ingredients = (first_line..)
            .zip(recipe.ingredients())
            .map(|(seq, &(id, amount))| (seq, id, amount))
            .collect();
    }
}

impl State {
    /// Strictly increasing timestamps so creation order is never ambiguous.
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.clock {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.clock = Some(next);
        next
    }

    /// Reserves `count` line sequence numbers and returns the first.
    fn reserve_lines(&mut self, count: usize) -> u64 {
        let first = self.next_line;
        self.next_line += count as u64;
        first
    }

    fn author(&self, id: Uuid, viewer: Option<Uuid>) -> Author {
        let username = self
            .users
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.username.clone())
            .unwrap_or_else(|| "unknown".to_string());
        Author {
            id,
            username,
            is_subscribed: viewer.is_some_and(|v| self.has(RelationKind::Subscription, v, id)),
        }
    }

    fn has(&self, kind: RelationKind, user_id: Uuid, target_id: Uuid) -> bool {
        self.relations
            .iter()
            .any(|r| r.kind == kind && r.user_id == user_id && r.target_id == target_id)
    }

    fn card(&self, stored: &StoredRecipe, viewer: Option<Uuid>) -> RecipeCard {
        let flag = |kind| viewer.is_some_and(|user| self.has(kind, user, stored.id));
        RecipeCard {
            recipe: Recipe {
                id: stored.id,
                author: self.author(stored.author_id, viewer),
                name: stored.name.clone(),
                text: stored.text.clone(),
                cooking_time: stored.cooking_time,
                tags: stored
                    .tag_ids
                    .iter()
                    .filter_map(|id| self.tags.iter().find(|t| t.id == *id).cloned())
                    .collect(),
                ingredients: self.lines(stored),
                created_at: stored.created_at,
            },
            is_favorited: flag(RelationKind::Favorite),
            is_in_shopping_cart: flag(RelationKind::ShoppingCart),
        }
    }

    fn lines(&self, stored: &StoredRecipe) -> Vec<RecipeIngredient> {
        self.sequenced_lines(stored)
            .into_iter()
            .map(|(_, line)| line)
            .collect()
    }

    fn sequenced_lines(&self, stored: &StoredRecipe) -> Vec<(u64, RecipeIngredient)> {
        stored
            .ingredients
            .iter()
            .filter_map(|(seq, id, amount)| {
                self.ingredients
                    .iter()
                    .find(|i| i.id == *id)
                    .map(|ingredient| {
                        let line = RecipeIngredient {
                            ingredient: ingredient.clone(),
                            amount: *amount,
                        };
                        (*seq, line)
                    })
            })
            .collect()
    }

    fn selected(&self, query: &RecipeQuery, viewer: Option<Uuid>) -> Vec<RecipeCard> {
        let cards: Vec<RecipeCard> = self.recipes.iter().map(|r| self.card(r, viewer)).collect();
        query.apply(viewer, cards)
    }

    /// Relations of one kind owned by `user_id`, newest first.
    fn owned(&self, kind: RelationKind, user_id: Uuid) -> Vec<&Relation> {
        let mut owned: Vec<&Relation> = self
            .relations
            .iter()
            .filter(|r| r.kind == kind && r.user_id == user_id)
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        owned
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_user(&self, username: &str) -> Uuid {
        let mut state = self.lock();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            created_at: state.tick(),
        };
        let id = user.id;
        state.users.push(user);
        id
    }

    pub fn add_ingredient(&self, name: &str, measurement_unit: &str) -> Uuid {
        let mut state = self.lock();
        if let Some(existing) = state
            .ingredients
            .iter()
            .find(|i| i.name == name && i.measurement_unit == measurement_unit)
        {
            return existing.id;
        }
        let id = Uuid::new_v4();
        state.ingredients.push(Ingredient {
            id,
            name: name.to_string(),
            measurement_unit: measurement_unit.to_string(),
        });
        id
    }

    pub fn add_tag(&self, name: &str, color: &str, slug: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().tags.push(Tag {
            id,
            name: name.to_string(),
            color: color.to_string(),
            slug: slug.to_string(),
        });
        id
    }
}

impl CatalogStore for MemoryStore {
    fn find_ingredients(&self, needle: &str) -> Result<Vec<Ingredient>> {
        Ok(self
            .lock()
            .ingredients
            .iter()
            .filter(|i| i.name.to_lowercase().contains(needle))
            .cloned()
            .collect())
    }

    fn get_ingredient(&self, id: Uuid) -> Result<Option<Ingredient>> {
        Ok(self.lock().ingredients.iter().find(|i| i.id == id).cloned())
    }

    fn ingredients_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Ingredient>> {
        Ok(self
            .lock()
            .ingredients
            .iter()
            .filter(|i| ids.contains(&i.id))
            .cloned()
            .collect())
    }

    fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut tags = self.lock().tags.clone();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    fn get_tag(&self, id: Uuid) -> Result<Option<Tag>> {
        Ok(self.lock().tags.iter().find(|t| t.id == id).cloned())
    }

    fn tags_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Tag>> {
        Ok(self
            .lock()
            .tags
            .iter()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect())
    }
}

impl RecipeStore for MemoryStore {
    fn find_recipes(
        &self,
        query: &RecipeQuery,
        viewer: Option<Uuid>,
        window: Window,
    ) -> Result<Vec<RecipeCard>> {
        let state = self.lock();
        Ok(window.slice(state.selected(query, viewer)).collect())
    }

    fn count_recipes(&self, query: &RecipeQuery, viewer: Option<Uuid>) -> Result<usize> {
        Ok(self.lock().selected(query, viewer).len())
    }

    fn get_recipe(&self, id: Uuid, viewer: Option<Uuid>) -> Result<Option<RecipeCard>> {
        let state = self.lock();
        Ok(state
            .recipes
            .iter()
            .find(|r| r.id == id)
            .map(|r| state.card(r, viewer)))
    }

    fn insert_recipe(&self, author_id: Uuid, recipe: &ValidRecipe) -> Result<Uuid> {
        let mut state = self.lock();
        let mut stored = StoredRecipe {
            id: Uuid::new_v4(),
            author_id,
            name: String::new(),
            text: String::new(),
            cooking_time: 0,
            tag_ids: vec![],
            ingredients: vec![],
            created_at: state.tick(),
        };
        stored.write(recipe, state.reserve_lines(recipe.ingredients().len()));
        let id = stored.id;
        state.recipes.push(stored);
        Ok(id)
    }

    fn update_recipe(&self, id: Uuid, recipe: &ValidRecipe) -> Result<()> {
        let mut state = self.lock();
        if !state.recipes.iter().any(|r| r.id == id) {
            anyhow::bail!("Recipe not found: {}", id);
        }
        let first_line = state.reserve_lines(recipe.ingredients().len());
        if let Some(stored) = state.recipes.iter_mut().find(|r| r.id == id) {
            stored.write(recipe, first_line);
        }
        Ok(())
    }

    fn delete_recipe(&self, id: Uuid) -> Result<bool> {
        let mut state = self.lock();
        let before = state.recipes.len();
        state.recipes.retain(|r| r.id != id);
        state
            .relations
            .retain(|r| !(r.kind.targets_recipe() && r.target_id == id));
        Ok(state.recipes.len() != before)
    }

    fn recipe_ingredients_for(&self, recipe_id: Uuid) -> Result<Vec<RecipeIngredient>> {
        let state = self.lock();
        Ok(state
            .recipes
            .iter()
            .find(|r| r.id == recipe_id)
            .map(|r| state.lines(r))
            .unwrap_or_default())
    }

    fn cart_ingredients(&self, user_id: Uuid) -> Result<Vec<RecipeIngredient>> {
        let state = self.lock();
        let mut lines: Vec<(u64, RecipeIngredient)> = state
            .recipes
            .iter()
            .filter(|r| state.has(RelationKind::ShoppingCart, user_id, r.id))
            .flat_map(|r| state.sequenced_lines(r))
            .collect();
        lines.sort_by_key(|(seq, _)| *seq);
        Ok(lines.into_iter().map(|(_, line)| line).collect())
    }
}

impl RelationStore for MemoryStore {
    fn target_exists(&self, kind: RelationKind, target_id: Uuid) -> Result<bool> {
        let state = self.lock();
        Ok(if kind.targets_recipe() {
            state.recipes.iter().any(|r| r.id == target_id)
        } else {
            state.users.iter().any(|u| u.id == target_id)
        })
    }

    fn relation_exists(&self, kind: RelationKind, user_id: Uuid, target_id: Uuid) -> Result<bool> {
        Ok(self.lock().has(kind, user_id, target_id))
    }

    fn create_relation(
        &self,
        kind: RelationKind,
        user_id: Uuid,
        target_id: Uuid,
    ) -> Result<Option<Relation>> {
        let mut state = self.lock();
        if state.has(kind, user_id, target_id) {
            return Ok(None);
        }
        let relation = Relation {
            kind,
            user_id,
            target_id,
            created_at: state.tick(),
        };
        state.relations.push(relation.clone());
        Ok(Some(relation))
    }

    fn delete_relation(&self, kind: RelationKind, user_id: Uuid, target_id: Uuid) -> Result<bool> {
        let mut state = self.lock();
        let before = state.relations.len();
        state
            .relations
            .retain(|r| !(r.kind == kind && r.user_id == user_id && r.target_id == target_id));
        Ok(state.relations.len() != before)
    }

    fn subscriptions(
        &self,
        user_id: Uuid,
        recipes_limit: usize,
        window: Window,
    ) -> Result<Vec<AuthorSubscription>> {
        let state = self.lock();
        let subscriptions = window
            .slice(state.owned(RelationKind::Subscription, user_id))
            .map(|sub| {
                let mut recipes: Vec<&StoredRecipe> = state
                    .recipes
                    .iter()
                    .filter(|r| r.author_id == sub.target_id)
                    .collect();
                recipes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                AuthorSubscription {
                    author: state.author(sub.target_id, Some(user_id)),
                    recipes_count: recipes.len() as u64,
                    recipes: recipes
                        .into_iter()
                        .take(recipes_limit)
                        .map(|r| RecipeBrief {
                            id: r.id,
                            name: r.name.clone(),
                            cooking_time: r.cooking_time,
                        })
                        .collect(),
                }
            })
            .collect();
        Ok(subscriptions)
    }

    fn count_subscriptions(&self, user_id: Uuid) -> Result<usize> {
        Ok(self.lock().owned(RelationKind::Subscription, user_id).len())
    }
}
