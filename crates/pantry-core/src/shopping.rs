//! Consolidated shopping list across every recipe in a user's cart.
//!
//! Amounts are summed per (name, measurement unit), not per ingredient row,
//! and entries keep the order in which each pair was first seen.

use std::collections::HashMap;

use pantry_types::models::{Ingredient, RecipeIngredient, ShoppingItem};
use tracing::debug;
use uuid::Uuid;

use crate::error::CoreResult;
use crate::store::RecipeStore;

/// Name of the downloadable plain-text rendering.
pub const PURCHASE_LIST_FILENAME: &str = "purchase_list.txt";

#[derive(Debug, Clone, Default)]
pub struct ShoppingList {
    items: Vec<ShoppingItem>,
    index: HashMap<(String, String), usize>,
}

impl ShoppingList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, ingredient: &Ingredient, amount: u32) {
        let key = (ingredient.name.clone(), ingredient.measurement_unit.clone());
        match self.index.get(&key) {
            Some(&pos) => self.items[pos].amount += u64::from(amount),
            None => {
                self.index.insert(key, self.items.len());
                self.items.push(ShoppingItem {
                    name: ingredient.name.clone(),
                    measurement_unit: ingredient.measurement_unit.clone(),
                    amount: u64::from(amount),
                });
            }
        }
    }

    pub fn items(&self) -> &[ShoppingItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<ShoppingItem> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// One `name (unit) — amount` line per entry. Empty list, empty text.
    pub fn render(&self) -> String {
        self.items
            .iter()
            .map(|item| format!("{item}\n"))
            .collect()
    }
}

impl<'a> Extend<&'a RecipeIngredient> for ShoppingList {
    fn extend<I: IntoIterator<Item = &'a RecipeIngredient>>(&mut self, lines: I) {
        for line in lines {
            self.add(&line.ingredient, line.amount);
        }
    }
}

impl<'a> FromIterator<&'a RecipeIngredient> for ShoppingList {
    fn from_iter<I: IntoIterator<Item = &'a RecipeIngredient>>(lines: I) -> Self {
        let mut list = Self::new();
        list.extend(lines);
        list
    }
}

pub fn build_shopping_list<S>(store: &S, user_id: Uuid) -> CoreResult<ShoppingList>
where
    S: RecipeStore + ?Sized,
{
    let lines = store.cart_ingredients(user_id)?;
    let list: ShoppingList = lines.iter().collect();
    debug!(
        "shopping list for {}: {} lines, {} entries",
        user_id,
        lines.len(),
        list.len()
    );
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::recipes::{RecipeDraft, create_recipe};
    use crate::toggle::{ToggleAction, toggle_cart};

    fn line(name: &str, unit: &str, amount: u32) -> RecipeIngredient {
        RecipeIngredient {
            ingredient: Ingredient {
                id: Uuid::new_v4(),
                name: name.to_string(),
                measurement_unit: unit.to_string(),
            },
            amount,
        }
    }

    #[test]
    fn same_name_and_unit_are_summed() {
        let a = [line("Flour", "g", 200)];
        let b = [line("Flour", "g", 300)];
        let list: ShoppingList = a.iter().chain(b.iter()).collect();
        assert_eq!(
            list.items(),
            &[ShoppingItem {
                name: "Flour".to_string(),
                measurement_unit: "g".to_string(),
                amount: 500,
            }]
        );
    }

    #[test]
    fn different_units_stay_apart_in_first_seen_order() {
        let lines = [
            line("Milk", "ml", 250),
            line("Eggs", "pcs", 2),
            line("Milk", "cup", 1),
            line("Eggs", "pcs", 3),
        ];
        let list: ShoppingList = lines.iter().collect();
        assert_eq!(
            list.render(),
            "Milk (ml) — 250\nEggs (pcs) — 5\nMilk (cup) — 1\n"
        );
    }

    #[test]
    fn empty_input_renders_nothing() {
        let list = ShoppingList::new();
        assert!(list.is_empty());
        assert_eq!(list.render(), "");
    }

    #[test]
    fn builds_from_cart_recipes() {
        let store = MemoryStore::new();
        let cook = store.add_user("cook");
        let flour = store.add_ingredient("Flour", "g");
        let butter = store.add_ingredient("Butter", "g");

        let recipe = |name: &str, lines: Vec<(Uuid, i64)>| {
            let draft = RecipeDraft {
                name: name.to_string(),
                text: "Bake.".to_string(),
                cooking_time: 30,
                tags: vec![],
                ingredients: lines,
            };
            create_recipe(&store, cook, &draft).unwrap().recipe.id
        };
        let a = recipe("Shortbread", vec![(butter, 100), (flour, 200)]);
        let b = recipe("Bread", vec![(flour, 300)]);
        recipe("Roux", vec![(flour, 1000)]);

        assert!(build_shopping_list(&store, cook).unwrap().is_empty());

        // Cart order does not matter, lines are scanned as they were written.
        toggle_cart(&store, cook, b, ToggleAction::Add).unwrap();
        toggle_cart(&store, cook, a, ToggleAction::Add).unwrap();

        let list = build_shopping_list(&store, cook).unwrap();
        assert_eq!(list.render(), "Butter (g) — 100\nFlour (g) — 500\n");
    }
}
