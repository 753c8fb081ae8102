use anyhow::Result;
use chrono::Utc;
use pantry_core::store::CatalogStore;
use pantry_types::api::IngredientRecord;
use pantry_types::models::{Ingredient, Tag};
use rusqlite::{Connection, OptionalExtension, params_from_iter};
use tracing::info;
use uuid::Uuid;

use crate::Database;
use crate::models::{IN_CHUNK, ingredient_at, placeholders, tag_at, timestamp};

impl Database {
    // -- Users --

    /// Records the identity service's view of a user, refreshing the
    /// username if it changed upstream.
    pub fn ensure_user(&self, id: Uuid, username: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET username = excluded.username",
                (id.to_string(), username, timestamp(Utc::now())),
            )?;
            Ok(())
        })
    }

    // -- Catalog --

    pub fn insert_ingredient(&self, name: &str, measurement_unit: &str) -> Result<Uuid> {
        self.with_conn(|conn| {
            let existing = conn
                .query_row(
                    "SELECT id FROM ingredients WHERE name = ?1 AND measurement_unit = ?2",
                    (name, measurement_unit),
                    |row| crate::models::uuid_col(row, 0),
                )
                .optional()?;
            if let Some(id) = existing {
                return Ok(id);
            }

            let id = Uuid::new_v4();
            insert_ingredient_row(conn, id, name, measurement_unit)?;
            Ok(id)
        })
    }

    /// Bulk-loads catalog records, skipping blank entries and (name, unit)
    /// pairs that are already present. Returns how many rows were added.
    pub fn import_ingredients(&self, records: &[IngredientRecord]) -> Result<usize> {
        let inserted = self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut inserted = 0;
            for record in records {
                let name = record.name.trim();
                let unit = record.measurement_unit.trim();
                if name.is_empty() || unit.is_empty() {
                    continue;
                }
                inserted += insert_ingredient_row(&tx, Uuid::new_v4(), name, unit)?;
            }
            tx.commit()?;
            Ok(inserted)
        })?;

        info!("Imported {} of {} ingredients", inserted, records.len());
        Ok(inserted)
    }

    /// Same as [`Self::import_ingredients`] for a JSON array of
    /// `{"name", "measurement_unit"}` objects.
    pub fn import_ingredients_json(&self, json: &str) -> Result<usize> {
        let records: Vec<IngredientRecord> = serde_json::from_str(json)?;
        self.import_ingredients(&records)
    }

    pub fn insert_tag(&self, name: &str, color: &str, slug: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tags (id, name, color, slug) VALUES (?1, ?2, ?3, ?4)",
                (id.to_string(), name, color, slug),
            )?;
            Ok(id)
        })
    }
}

fn insert_ingredient_row(
    conn: &Connection,
    id: Uuid,
    name: &str,
    measurement_unit: &str,
) -> Result<usize> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO ingredients (id, name, measurement_unit, search_name)
         VALUES (?1, ?2, ?3, ?4)",
        (id.to_string(), name, measurement_unit, name.to_lowercase()),
    )?;
    Ok(changed)
}

fn id_params(ids: &[Uuid]) -> Vec<String> {
    ids.iter().map(Uuid::to_string).collect()
}

impl CatalogStore for Database {
    fn find_ingredients(&self, needle: &str) -> Result<Vec<Ingredient>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, measurement_unit FROM ingredients
                 WHERE ?1 = '' OR instr(search_name, ?1) > 0",
            )?;
            let rows = stmt
                .query_map([needle], |row| ingredient_at(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    fn get_ingredient(&self, id: Uuid) -> Result<Option<Ingredient>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, name, measurement_unit FROM ingredients WHERE id = ?1",
                    [id.to_string()],
                    |row| ingredient_at(row, 0),
                )
                .optional()?;
            Ok(row)
        })
    }

    fn ingredients_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Ingredient>> {
        self.with_conn(|conn| {
            let mut found = Vec::with_capacity(ids.len());
            for chunk in ids.chunks(IN_CHUNK) {
                let sql = format!(
                    "SELECT id, name, measurement_unit FROM ingredients WHERE id IN ({})",
                    placeholders(1, chunk.len())
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params_from_iter(id_params(chunk)), |row| ingredient_at(row, 0))?;
                for row in rows {
                    found.push(row?);
                }
            }
            Ok(found)
        })
    }

    fn list_tags(&self) -> Result<Vec<Tag>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, color, slug FROM tags ORDER BY name")?;
            let rows = stmt
                .query_map([], |row| tag_at(row, 0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    fn get_tag(&self, id: Uuid) -> Result<Option<Tag>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, name, color, slug FROM tags WHERE id = ?1",
                    [id.to_string()],
                    |row| tag_at(row, 0),
                )
                .optional()?;
            Ok(row)
        })
    }

    fn tags_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Tag>> {
        self.with_conn(|conn| {
            let mut found = Vec::with_capacity(ids.len());
            for chunk in ids.chunks(IN_CHUNK) {
                let sql = format!(
                    "SELECT id, name, color, slug FROM tags WHERE id IN ({})",
                    placeholders(1, chunk.len())
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows =
                    stmt.query_map(params_from_iter(id_params(chunk)), |row| tag_at(row, 0))?;
                for row in rows {
                    found.push(row?);
                }
            }
            Ok(found)
        })
    }
}
