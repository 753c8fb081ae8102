//! Two-tier ranked ingredient search.
//!
//! Tier one holds names that start with the query, tier two names that only
//! contain it further in. Both comparisons ignore case, and each tier is
//! sorted alphabetically before the two are concatenated.

use pantry_types::models::Ingredient;
use tracing::debug;

use crate::error::CoreResult;
use crate::store::CatalogStore;

pub fn rank_ingredients<I>(catalog: I, query: &str) -> Vec<Ingredient>
where
    I: IntoIterator<Item = Ingredient>,
{
    let needle = query.to_lowercase();
    let mut leading = Vec::new();
    let mut inner = Vec::new();

    for ingredient in catalog {
        let name = ingredient.name.to_lowercase();
        if name.starts_with(&needle) {
            leading.push(ingredient);
        } else if name.contains(&needle) {
            inner.push(ingredient);
        }
    }

    sort_by_name(&mut leading);
    sort_by_name(&mut inner);
    leading.extend(inner);
    leading
}

fn sort_by_name(ingredients: &mut [Ingredient]) {
    ingredients.sort_by_cached_key(|i| {
        (
            i.name.to_lowercase(),
            i.name.clone(),
            i.measurement_unit.clone(),
        )
    });
}

pub fn search_ingredients<S>(store: &S, query: &str) -> CoreResult<Vec<Ingredient>>
where
    S: CatalogStore + ?Sized,
{
    let candidates = store.find_ingredients(&query.to_lowercase())?;
    let ranked = rank_ingredients(candidates, query);
    debug!("ingredient search {:?} matched {}", query, ranked.len());
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ingredient(name: &str, unit: &str) -> Ingredient {
        Ingredient {
            id: Uuid::new_v4(),
            name: name.to_string(),
            measurement_unit: unit.to_string(),
        }
    }

    fn catalog() -> Vec<Ingredient> {
        vec![
            ingredient("Sugar", "g"),
            ingredient("brown sugar", "g"),
            ingredient("Salt", "g"),
            ingredient("sugar syrup", "ml"),
            ingredient("Icing Sugar", "g"),
            ingredient("Flour", "g"),
        ]
    }

    fn names(ingredients: &[Ingredient]) -> Vec<&str> {
        ingredients.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn prefix_matches_come_before_inner_matches() {
        let ranked = rank_ingredients(catalog(), "sug");
        assert_eq!(
            names(&ranked),
            vec!["Sugar", "sugar syrup", "brown sugar", "Icing Sugar"]
        );
    }

    #[test]
    fn tiers_partition_the_matching_names() {
        let query = "Ug";
        let ranked = rank_ingredients(catalog(), query);
        let needle = query.to_lowercase();

        let split = ranked
            .iter()
            .position(|i| !i.name.to_lowercase().starts_with(&needle))
            .unwrap_or(ranked.len());
        let (leading, inner) = ranked.split_at(split);

        assert!(leading.iter().all(|i| i.name.to_lowercase().starts_with(&needle)));
        assert!(inner.iter().all(|i| !i.name.to_lowercase().starts_with(&needle)));

        let mut got: Vec<_> = names(&ranked);
        got.sort();
        let mut expected: Vec<_> = catalog()
            .into_iter()
            .filter(|i| i.name.to_lowercase().contains(&needle))
            .map(|i| i.name)
            .collect();
        expected.sort();
        assert_eq!(got, expected);
    }

    #[test]
    fn empty_query_returns_everything_alphabetically() {
        let ranked = rank_ingredients(catalog(), "");
        assert_eq!(
            names(&ranked),
            vec!["brown sugar", "Flour", "Icing Sugar", "Salt", "Sugar", "sugar syrup"]
        );
    }

    #[test]
    fn no_match_is_empty() {
        assert!(rank_ingredients(catalog(), "pepper").is_empty());
    }

    #[test]
    fn non_ascii_names_ignore_case() {
        let ranked = rank_ingredients(
            vec![ingredient("Сахар", "г"), ingredient("тростниковый сахар", "г")],
            "сах",
        );
        assert_eq!(names(&ranked), vec!["Сахар", "тростниковый сахар"]);
    }
}
