//! Presence toggle for favorites, shopping cart entries and subscriptions.
//!
//! Each (user, target) pair is either absent or present. `add` moves it to
//! present and `remove` back to absent; any other transition is an error.
//! The existence check before writing is only a fast path: the store's
//! uniqueness constraint decides concurrent duplicate adds, and a delete
//! that matches no row is reported the same way as an absent pair.

use pantry_types::api::Page;
use pantry_types::models::{AuthorSubscription, Relation, RelationKind};
use tracing::info;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::store::{RelationStore, Window};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToggleAction {
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added(Relation),
    Removed,
}

pub struct RelationToggle<'a, S: ?Sized> {
    store: &'a S,
    kind: RelationKind,
}

impl<'a, S> RelationToggle<'a, S>
where
    S: RelationStore + ?Sized,
{
    pub fn new(store: &'a S, kind: RelationKind) -> Self {
        Self { store, kind }
    }

    pub fn kind(&self) -> RelationKind {
        self.kind
    }

    pub fn exists(&self, user_id: Uuid, target_id: Uuid) -> CoreResult<bool> {
        Ok(self.store.relation_exists(self.kind, user_id, target_id)?)
    }

    pub fn add(&self, user_id: Uuid, target_id: Uuid) -> CoreResult<Relation> {
        if self.kind == RelationKind::Subscription && user_id == target_id {
            return Err(CoreError::SelfSubscription);
        }
        if !self.store.target_exists(self.kind, target_id)? {
            return Err(missing_target(self.kind, target_id));
        }
        if self.exists(user_id, target_id)? {
            return Err(CoreError::AlreadyExists(self.kind));
        }

        let relation = self
            .store
            .create_relation(self.kind, user_id, target_id)?
            .ok_or(CoreError::AlreadyExists(self.kind))?;

        info!("{} added: user {} -> {}", self.kind, user_id, target_id);
        Ok(relation)
    }

    pub fn remove(&self, user_id: Uuid, target_id: Uuid) -> CoreResult<()> {
        if !self.exists(user_id, target_id)? {
            return Err(CoreError::NotFound(self.kind));
        }
        if !self.store.delete_relation(self.kind, user_id, target_id)? {
            return Err(CoreError::NotFound(self.kind));
        }

        info!("{} removed: user {} -> {}", self.kind, user_id, target_id);
        Ok(())
    }

    pub fn apply(
        &self,
        user_id: Uuid,
        target_id: Uuid,
        action: ToggleAction,
    ) -> CoreResult<ToggleOutcome> {
        match action {
            ToggleAction::Add => self.add(user_id, target_id).map(ToggleOutcome::Added),
            ToggleAction::Remove => self
                .remove(user_id, target_id)
                .map(|()| ToggleOutcome::Removed),
        }
    }
}

fn missing_target(kind: RelationKind, target_id: Uuid) -> CoreError {
    if kind.targets_recipe() {
        CoreError::RecipeNotFound(target_id)
    } else {
        CoreError::UserNotFound(target_id)
    }
}

pub fn toggle_favorite<S>(
    store: &S,
    user_id: Uuid,
    recipe_id: Uuid,
    action: ToggleAction,
) -> CoreResult<ToggleOutcome>
where
    S: RelationStore + ?Sized,
{
    RelationToggle::new(store, RelationKind::Favorite).apply(user_id, recipe_id, action)
}

pub fn toggle_cart<S>(
    store: &S,
    user_id: Uuid,
    recipe_id: Uuid,
    action: ToggleAction,
) -> CoreResult<ToggleOutcome>
where
    S: RelationStore + ?Sized,
{
    RelationToggle::new(store, RelationKind::ShoppingCart).apply(user_id, recipe_id, action)
}

pub fn toggle_subscription<S>(
    store: &S,
    user_id: Uuid,
    author_id: Uuid,
    action: ToggleAction,
) -> CoreResult<ToggleOutcome>
where
    S: RelationStore + ?Sized,
{
    RelationToggle::new(store, RelationKind::Subscription).apply(user_id, author_id, action)
}

pub fn list_subscriptions<S>(
    store: &S,
    user_id: Uuid,
    recipes_limit: usize,
    window: Window,
) -> CoreResult<Page<AuthorSubscription>>
where
    S: RelationStore + ?Sized,
{
    let count = store.count_subscriptions(user_id)?;
    let results = if window.offset < count && window.limit > 0 {
        store.subscriptions(user_id, recipes_limit, window)?
    } else {
        vec![]
    };
    Ok(Page { count, results })
}
