use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Catalog reference data. The (name, measurement_unit) pair is unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub slug: String,
}

/// A recipe author as seen by one viewer. `is_subscribed` is false for
/// anonymous viewers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: Uuid,
    pub username: String,
    pub is_subscribed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeIngredient {
    #[serde(flatten)]
    pub ingredient: Ingredient,
    pub amount: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Uuid,
    pub author: Author,
    pub name: String,
    pub text: String,
    pub cooking_time: u32,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<RecipeIngredient>,
    pub created_at: DateTime<Utc>,
}

impl Recipe {
    pub fn has_any_tag<S: AsRef<str>>(&self, slugs: &[S]) -> bool {
        self.tags
            .iter()
            .any(|tag| slugs.iter().any(|slug| slug.as_ref() == tag.slug))
    }
}

/// A recipe as seen by one viewer: the relation flags are always false for
/// anonymous viewers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeCard {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeBrief {
    pub id: Uuid,
    pub name: String,
    pub cooking_time: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSubscription {
    #[serde(flatten)]
    pub author: Author,
    pub recipes_count: u64,
    pub recipes: Vec<RecipeBrief>,
}

// -- Relations --

/// The three user-owned presence relations. Favorites and cart entries target
/// recipes, subscriptions target other users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Favorite,
    ShoppingCart,
    Subscription,
}

impl RelationKind {
    pub const ALL: [RelationKind; 3] = [
        RelationKind::Favorite,
        RelationKind::ShoppingCart,
        RelationKind::Subscription,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Favorite => "favorite",
            Self::ShoppingCart => "shopping_cart",
            Self::Subscription => "subscription",
        }
    }

    /// Whether the target identifier names a recipe (otherwise a user).
    pub fn targets_recipe(self) -> bool {
        !matches!(self, Self::Subscription)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub kind: RelationKind,
    pub user_id: Uuid,
    pub target_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// -- Shopping list --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: u64,
}

impl fmt::Display for ShoppingItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) — {}", self.name, self.measurement_unit, self.amount)
    }
}
