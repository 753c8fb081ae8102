//! Recipe backend core: ingredient search ranking, recipe filtering, the
//! favorite/cart/subscription toggle engine and shopping list aggregation.
//!
//! Nothing here talks to a database directly. Persistence is reached through
//! the traits in [`store`]; `pantry-db` implements them over SQLite and
//! [`memory::MemoryStore`] implements them in process.

pub mod error;
pub mod filter;
pub mod matcher;
pub mod memory;
pub mod recipes;
pub mod shopping;
pub mod store;
pub mod toggle;

pub use error::{CoreError, CoreResult};
pub use filter::{RecipeOrder, RecipeQuery};
pub use recipes::{RecipeDraft, ValidRecipe};
pub use shopping::{PURCHASE_LIST_FILENAME, ShoppingList};
pub use store::{CatalogStore, RecipeStore, RelationStore, Window};
pub use toggle::{ToggleAction, ToggleOutcome};
