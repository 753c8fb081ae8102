//! Recipe selection by author, tags and viewer-relative relations.
//!
//! Distinct predicate categories are ANDed, tag slugs within the tag
//! predicate are ORed. The favorited and in-cart predicates only make sense
//! for a known viewer and are dropped, not rejected, for anonymous requests.

use std::cmp::Reverse;

use pantry_types::api::Page;
use pantry_types::models::RecipeCard;
use tracing::debug;
use uuid::Uuid;

use crate::error::CoreResult;
use crate::store::{RecipeStore, Window};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecipeOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeQuery {
    pub author: Option<Uuid>,
    /// Tag slugs, deduplicated. Empty means no tag predicate.
    pub tags: Vec<String>,
    pub favorited: bool,
    pub in_shopping_cart: bool,
    pub order: RecipeOrder,
}

impl RecipeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_author(mut self, author: Uuid) -> Self {
        self.author = Some(author);
        self
    }

    pub fn with_tags<I, S>(mut self, slugs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for slug in slugs {
            let slug = slug.as_ref().trim();
            if !slug.is_empty() && !self.tags.iter().any(|t| t == slug) {
                self.tags.push(slug.to_string());
            }
        }
        self
    }

    pub fn favorited(mut self, on: bool) -> Self {
        self.favorited = on;
        self
    }

    pub fn in_shopping_cart(mut self, on: bool) -> Self {
        self.in_shopping_cart = on;
        self
    }

    pub fn ordered(mut self, order: RecipeOrder) -> Self {
        self.order = order;
        self
    }

    /// The query with user-relative predicates cleared when there is no
    /// viewer to evaluate them against.
    pub fn for_viewer(&self, viewer: Option<Uuid>) -> Self {
        let mut query = self.clone();
        if viewer.is_none() {
            query.favorited = false;
            query.in_shopping_cart = false;
        }
        query
    }

    /// Evaluates the predicates against a card whose flags were computed for
    /// the same viewer the query was resolved for.
    pub fn matches(&self, card: &RecipeCard) -> bool {
        if let Some(author) = self.author {
            if card.recipe.author.id != author {
                return false;
            }
        }
        if !self.tags.is_empty() && !card.recipe.has_any_tag(self.tags.as_slice()) {
            return false;
        }
        if self.favorited && !card.is_favorited {
            return false;
        }
        if self.in_shopping_cart && !card.is_in_shopping_cart {
            return false;
        }
        true
    }

    /// Filters `candidates` in memory and orders the survivors by creation
    /// time. Ties keep their candidate order.
    pub fn apply<I>(&self, viewer: Option<Uuid>, candidates: I) -> Vec<RecipeCard>
    where
        I: IntoIterator<Item = RecipeCard>,
    {
        let query = self.for_viewer(viewer);
        let mut selected: Vec<RecipeCard> = candidates
            .into_iter()
            .filter(|card| query.matches(card))
            .collect();

        match query.order {
            RecipeOrder::NewestFirst => selected.sort_by_key(|c| Reverse(c.recipe.created_at)),
            RecipeOrder::OldestFirst => selected.sort_by_key(|c| c.recipe.created_at),
        }
        selected
    }
}

/// One window of the selected recipes plus the size of the whole selection.
pub fn list_recipes<S>(
    store: &S,
    query: &RecipeQuery,
    viewer: Option<Uuid>,
    window: Window,
) -> CoreResult<Page<RecipeCard>>
where
    S: RecipeStore + ?Sized,
{
    let query = query.for_viewer(viewer);
    let count = store.count_recipes(&query, viewer)?;
    let results = if window.offset < count && window.limit > 0 {
        store.find_recipes(&query, viewer, window)?
    } else {
        vec![]
    };
    debug!(
        "recipe query {:?} selected {}, returning {}",
        query,
        count,
        results.len()
    );
    Ok(Page { count, results })
}
