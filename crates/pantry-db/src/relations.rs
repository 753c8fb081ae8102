use anyhow::Result;
use chrono::Utc;
use pantry_core::store::{RelationStore, Window};
use pantry_types::models::{Author, AuthorSubscription, RecipeBrief, Relation, RelationKind};
use rusqlite::{Connection, ErrorCode, ffi};
use tracing::warn;
use uuid::Uuid;

use crate::Database;
use crate::models::{timestamp, uuid_col, window_bounds};

/// Table and target column backing each relation kind.
fn relation_table(kind: RelationKind) -> (&'static str, &'static str) {
    match kind {
        RelationKind::Favorite => ("favorites", "recipe_id"),
        RelationKind::ShoppingCart => ("shopping_cart", "recipe_id"),
        RelationKind::Subscription => ("subscriptions", "author_id"),
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

impl RelationStore for Database {
    fn target_exists(&self, kind: RelationKind, target_id: Uuid) -> Result<bool> {
        let table = if kind.targets_recipe() { "recipes" } else { "users" };
        self.with_conn(|conn| {
            let exists = conn.query_row(
                &format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE id = ?1)"),
                [target_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    fn relation_exists(&self, kind: RelationKind, user_id: Uuid, target_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| query_relation_exists(conn, kind, user_id, target_id))
    }

    fn create_relation(
        &self,
        kind: RelationKind,
        user_id: Uuid,
        target_id: Uuid,
    ) -> Result<Option<Relation>> {
        let (table, column) = relation_table(kind);
        let created_at = Utc::now();

        self.with_conn(|conn| {
            let inserted = conn.execute(
                &format!("INSERT INTO {table} (user_id, {column}, created_at) VALUES (?1, ?2, ?3)"),
                (user_id.to_string(), target_id.to_string(), timestamp(created_at)),
            );
            match inserted {
                Ok(_) => Ok(Some(Relation {
                    kind,
                    user_id,
                    target_id,
                    created_at,
                })),
                Err(e) if is_unique_violation(&e) => {
                    warn!("Duplicate {} rejected by store: {} -> {}", kind, user_id, target_id);
                    Ok(None)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    fn delete_relation(&self, kind: RelationKind, user_id: Uuid, target_id: Uuid) -> Result<bool> {
        let (table, column) = relation_table(kind);
        self.with_conn(|conn| {
            let changed = conn.execute(
                &format!("DELETE FROM {table} WHERE user_id = ?1 AND {column} = ?2"),
                (user_id.to_string(), target_id.to_string()),
            )?;
            Ok(changed > 0)
        })
    }

    fn subscriptions(
        &self,
        user_id: Uuid,
        recipes_limit: usize,
        window: Window,
    ) -> Result<Vec<AuthorSubscription>> {
        let limit = i64::try_from(recipes_limit).unwrap_or(i64::MAX);
        let (page_limit, page_offset) = window_bounds(window);

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT s.author_id, u.username,
                        (SELECT COUNT(*) FROM recipes r WHERE r.author_id = s.author_id)
                 FROM subscriptions s
                 JOIN users u ON u.id = s.author_id
                 WHERE s.user_id = ?1
                 ORDER BY s.created_at DESC, s.rowid DESC
                 LIMIT ?2 OFFSET ?3",
            )?;
            let authors = stmt
                .query_map(
                    rusqlite::params![user_id.to_string(), page_limit, page_offset],
                    |row| {
                        Ok((
                            Author {
                                id: uuid_col(row, 0)?,
                                username: row.get(1)?,
                                is_subscribed: true,
                            },
                            row.get::<_, u64>(2)?,
                        ))
                    },
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut recipes = conn.prepare(
                "SELECT id, name, cooking_time FROM recipes WHERE author_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )?;
            let mut subscriptions = Vec::with_capacity(authors.len());
            for (author, recipes_count) in authors {
                let briefs = recipes
                    .query_map(rusqlite::params![author.id.to_string(), limit], |row| {
                        Ok(RecipeBrief {
                            id: uuid_col(row, 0)?,
                            name: row.get(1)?,
                            cooking_time: row.get(2)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                subscriptions.push(AuthorSubscription {
                    author,
                    recipes_count,
                    recipes: briefs,
                });
            }
            Ok(subscriptions)
        })
    }

    fn count_subscriptions(&self, user_id: Uuid) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM subscriptions s
                 JOIN users u ON u.id = s.author_id
                 WHERE s.user_id = ?1",
                [user_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(usize::try_from(count)?)
        })
    }
}

fn query_relation_exists(
    conn: &Connection,
    kind: RelationKind,
    user_id: Uuid,
    target_id: Uuid,
) -> Result<bool> {
    let (table, column) = relation_table(kind);
    let exists = conn.query_row(
        &format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE user_id = ?1 AND {column} = ?2)"),
        (user_id.to_string(), target_id.to_string()),
        |row| row.get(0),
    )?;
    Ok(exists)
}
