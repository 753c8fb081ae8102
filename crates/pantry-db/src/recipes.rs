use std::collections::{HashMap, HashSet};

use anyhow::Result;
use chrono::Utc;
use pantry_core::filter::{RecipeOrder, RecipeQuery};
use pantry_core::recipes::ValidRecipe;
use pantry_core::store::{RecipeStore, Window};
use pantry_types::models::{Author, Recipe, RecipeCard, RecipeIngredient, Tag};
use rusqlite::{Connection, params_from_iter};
use tracing::debug;
use uuid::Uuid;

use crate::Database;
use crate::models::{
    IN_CHUNK, RecipeRow, ingredient_at, placeholders, tag_at, timestamp, uuid_col, window_bounds,
};

const RECIPE_COLUMNS: &str =
    "r.id, r.author_id, u.username, r.name, r.text, r.cooking_time, r.created_at";

/// WHERE clause and its bound values for a recipe query, shared by the
/// listing and its count.
struct RecipeFilter {
    sql: String,
    params: Vec<String>,
}

impl RecipeFilter {
    fn new(query: &RecipeQuery, viewer: Option<Uuid>) -> Self {
        let mut clauses = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(author) = query.author {
            params.push(author.to_string());
            clauses.push(format!("r.author_id = ?{}", params.len()));
        }
        if !query.tags.is_empty() {
            let first = params.len() + 1;
            params.extend(query.tags.iter().cloned());
            clauses.push(format!(
                "EXISTS (SELECT 1 FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id
                         WHERE rt.recipe_id = r.id AND t.slug IN ({}))",
                placeholders(first, query.tags.len())
            ));
        }
        if let Some(viewer) = viewer {
            for (on, table) in [
                (query.favorited, "favorites"),
                (query.in_shopping_cart, "shopping_cart"),
            ] {
                if on {
                    params.push(viewer.to_string());
                    clauses.push(format!(
                        "EXISTS (SELECT 1 FROM {table} x WHERE x.recipe_id = r.id AND x.user_id = ?{})",
                        params.len()
                    ));
                }
            }
        }

        let sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        Self { sql, params }
    }
}

impl RecipeStore for Database {
    fn find_recipes(
        &self,
        query: &RecipeQuery,
        viewer: Option<Uuid>,
        window: Window,
    ) -> Result<Vec<RecipeCard>> {
        let filter = RecipeFilter::new(query, viewer);
        let order = match query.order {
            RecipeOrder::NewestFirst => "r.created_at DESC, r.rowid DESC",
            RecipeOrder::OldestFirst => "r.created_at ASC, r.rowid ASC",
        };
        let (limit, offset) = window_bounds(window);
        let sql = format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r LEFT JOIN users u ON u.id = r.author_id
             {} ORDER BY {order} LIMIT {limit} OFFSET {offset}",
            filter.sql
        );
        debug!("find_recipes: {}", sql);

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(filter.params.iter()), RecipeRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            load_cards(conn, rows, viewer)
        })
    }

    fn count_recipes(&self, query: &RecipeQuery, viewer: Option<Uuid>) -> Result<usize> {
        let filter = RecipeFilter::new(query, viewer);
        let sql = format!("SELECT COUNT(*) FROM recipes r {}", filter.sql);

        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row(&sql, params_from_iter(filter.params.iter()), |row| row.get(0))?;
            Ok(usize::try_from(count)?)
        })
    }

    fn get_recipe(&self, id: Uuid, viewer: Option<Uuid>) -> Result<Option<RecipeCard>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECIPE_COLUMNS} FROM recipes r LEFT JOIN users u ON u.id = r.author_id
                 WHERE r.id = ?1"
            ))?;
            let rows = stmt
                .query_map([id.to_string()], RecipeRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(load_cards(conn, rows, viewer)?.into_iter().next())
        })
    }

    fn insert_recipe(&self, author_id: Uuid, recipe: &ValidRecipe) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO recipes (id, author_id, name, text, cooking_time, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    id.to_string(),
                    author_id.to_string(),
                    recipe.name(),
                    recipe.text(),
                    recipe.cooking_time(),
                    timestamp(Utc::now()),
                ],
            )?;
            write_lines_and_tags(&tx, id, recipe)?;
            tx.commit()?;
            Ok(id)
        })
    }

    fn update_recipe(&self, id: Uuid, recipe: &ValidRecipe) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(
                "UPDATE recipes SET name = ?2, text = ?3, cooking_time = ?4 WHERE id = ?1",
                rusqlite::params![
                    id.to_string(),
                    recipe.name(),
                    recipe.text(),
                    recipe.cooking_time()
                ],
            )?;
            if changed == 0 {
                anyhow::bail!("Recipe not found: {}", id);
            }
            tx.execute(
                "DELETE FROM recipe_ingredients WHERE recipe_id = ?1",
                [id.to_string()],
            )?;
            tx.execute("DELETE FROM recipe_tags WHERE recipe_id = ?1", [id.to_string()])?;
            write_lines_and_tags(&tx, id, recipe)?;
            tx.commit()?;
            Ok(())
        })
    }

    fn delete_recipe(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM recipes WHERE id = ?1", [id.to_string()])?;
            Ok(changed > 0)
        })
    }

    fn recipe_ingredients_for(&self, recipe_id: Uuid) -> Result<Vec<RecipeIngredient>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT i.id, i.name, i.measurement_unit, ri.amount
                 FROM recipe_ingredients ri
                 JOIN ingredients i ON i.id = ri.ingredient_id
                 WHERE ri.recipe_id = ?1
                 ORDER BY ri.id",
            )?;
            let rows = stmt
                .query_map([recipe_id.to_string()], |row| {
                    Ok(RecipeIngredient {
                        ingredient: ingredient_at(row, 0)?,
                        amount: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    fn cart_ingredients(&self, user_id: Uuid) -> Result<Vec<RecipeIngredient>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT i.id, i.name, i.measurement_unit, ri.amount
                 FROM recipe_ingredients ri
                 JOIN shopping_cart sc ON sc.recipe_id = ri.recipe_id
                 JOIN ingredients i ON i.id = ri.ingredient_id
                 WHERE sc.user_id = ?1
                 ORDER BY ri.id",
            )?;
            let rows = stmt
                .query_map([user_id.to_string()], |row| {
                    Ok(RecipeIngredient {
                        ingredient: ingredient_at(row, 0)?,
                        amount: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn write_lines_and_tags(conn: &Connection, recipe_id: Uuid, recipe: &ValidRecipe) -> Result<()> {
    let rid = recipe_id.to_string();

    let mut stmt = conn.prepare(
        "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES (?1, ?2, ?3)",
    )?;
    for (ingredient_id, amount) in recipe.ingredients() {
        stmt.execute(rusqlite::params![rid, ingredient_id.to_string(), amount])?;
    }

    let mut stmt = conn.prepare("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?1, ?2)")?;
    for tag_id in recipe.tag_ids() {
        stmt.execute((rid.as_str(), tag_id.to_string()))?;
    }
    Ok(())
}

/// Attaches tags, ingredient lines and viewer flags to recipe rows with a
/// few queries per chunk of rows instead of a few per recipe.
fn load_cards(
    conn: &Connection,
    rows: Vec<RecipeRow>,
    viewer: Option<Uuid>,
) -> Result<Vec<RecipeCard>> {
    if rows.is_empty() {
        return Ok(vec![]);
    }

    let ids: Vec<String> = rows.iter().map(|r| r.id.to_string()).collect();
    let mut tags: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    let mut lines: HashMap<Uuid, Vec<RecipeIngredient>> = HashMap::new();

    for chunk in ids.chunks(IN_CHUNK) {
        let in_list = placeholders(1, chunk.len());

        let mut stmt = conn.prepare(&format!(
            "SELECT rt.recipe_id, t.id, t.name, t.color, t.slug
             FROM recipe_tags rt JOIN tags t ON t.id = rt.tag_id
             WHERE rt.recipe_id IN ({in_list})
             ORDER BY t.name"
        ))?;
        let tag_rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
            Ok((uuid_col(row, 0)?, tag_at(row, 1)?))
        })?;
        for row in tag_rows {
            let (recipe_id, tag) = row?;
            tags.entry(recipe_id).or_default().push(tag);
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT ri.recipe_id, i.id, i.name, i.measurement_unit, ri.amount
             FROM recipe_ingredients ri JOIN ingredients i ON i.id = ri.ingredient_id
             WHERE ri.recipe_id IN ({in_list})
             ORDER BY ri.id"
        ))?;
        let line_rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
            Ok((
                uuid_col(row, 0)?,
                RecipeIngredient {
                    ingredient: ingredient_at(row, 1)?,
                    amount: row.get(4)?,
                },
            ))
        })?;
        for row in line_rows {
            let (recipe_id, line) = row?;
            lines.entry(recipe_id).or_default().push(line);
        }
    }

    let (favorited, in_cart, followed) = match viewer {
        Some(user) => {
            let mut authors: Vec<String> = rows.iter().map(|r| r.author_id.to_string()).collect();
            authors.sort();
            authors.dedup();
            (
                viewer_marks(conn, "favorites", "recipe_id", user, &ids)?,
                viewer_marks(conn, "shopping_cart", "recipe_id", user, &ids)?,
                viewer_marks(conn, "subscriptions", "author_id", user, &authors)?,
            )
        }
        None => (HashSet::new(), HashSet::new(), HashSet::new()),
    };

    let cards = rows
        .into_iter()
        .map(|row| RecipeCard {
            is_favorited: favorited.contains(&row.id),
            is_in_shopping_cart: in_cart.contains(&row.id),
            recipe: Recipe {
                id: row.id,
                author: Author {
                    id: row.author_id,
                    username: row.author_username,
                    is_subscribed: followed.contains(&row.author_id),
                },
                name: row.name,
                text: row.text,
                cooking_time: row.cooking_time,
                tags: tags.remove(&row.id).unwrap_or_default(),
                ingredients: lines.remove(&row.id).unwrap_or_default(),
                created_at: row.created_at,
            },
        })
        .collect();
    Ok(cards)
}

/// The subset of `targets` that `user` has a row for in `table`.
fn viewer_marks(
    conn: &Connection,
    table: &str,
    column: &str,
    user: Uuid,
    targets: &[String],
) -> Result<HashSet<Uuid>> {
    let mut marks = HashSet::new();
    for chunk in targets.chunks(IN_CHUNK) {
        let sql = format!(
            "SELECT {column} FROM {table} WHERE user_id = ?1 AND {column} IN ({})",
            placeholders(2, chunk.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let params = std::iter::once(user.to_string()).chain(chunk.iter().cloned());
        for mark in stmt.query_map(params_from_iter(params), |row| uuid_col(row, 0))? {
            marks.insert(mark?);
        }
    }
    Ok(marks)
}
