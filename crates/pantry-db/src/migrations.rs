use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE ingredients (
                id                TEXT PRIMARY KEY,
                name              TEXT NOT NULL,
                measurement_unit  TEXT NOT NULL,
                search_name       TEXT NOT NULL,
                UNIQUE(name, measurement_unit)
            );

            CREATE TABLE tags (
                id      TEXT PRIMARY KEY,
                name    TEXT NOT NULL UNIQUE,
                color   TEXT NOT NULL UNIQUE,
                slug    TEXT NOT NULL UNIQUE
            );

            CREATE TABLE recipes (
                id            TEXT PRIMARY KEY,
                author_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                name          TEXT NOT NULL,
                text          TEXT NOT NULL,
                cooking_time  INTEGER NOT NULL CHECK (cooking_time >= 1),
                created_at    TEXT NOT NULL
            );

            CREATE INDEX idx_recipes_created ON recipes(created_at);
            CREATE INDEX idx_recipes_author ON recipes(author_id, created_at);

            CREATE TABLE recipe_ingredients (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                recipe_id      TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                ingredient_id  TEXT NOT NULL REFERENCES ingredients(id) ON DELETE CASCADE,
                amount         INTEGER NOT NULL CHECK (amount >= 1),
                UNIQUE(recipe_id, ingredient_id)
            );

            CREATE TABLE recipe_tags (
                recipe_id  TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                tag_id     TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (recipe_id, tag_id)
            );

            CREATE TABLE favorites (
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                recipe_id   TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                UNIQUE(user_id, recipe_id)
            );

            CREATE TABLE shopping_cart (
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                recipe_id   TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                UNIQUE(user_id, recipe_id)
            );

            -- subscriber != author is enforced by the toggle engine, not here
            CREATE TABLE subscriptions (
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                author_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL,
                UNIQUE(user_id, author_id)
            );

            -- Default tags
            INSERT INTO tags (id, name, color, slug) VALUES
                ('00000000-0000-0000-0000-000000000001', 'Breakfast', '#E26C2D', 'breakfast'),
                ('00000000-0000-0000-0000-000000000002', 'Lunch',     '#49B64E', 'lunch'),
                ('00000000-0000-0000-0000-000000000003', 'Dinner',    '#8775D2', 'dinner');

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let tags: i64 = conn
            .query_row("SELECT COUNT(*) FROM tags", [], |r| r.get(0))
            .unwrap();
        assert_eq!(tags, 3);
    }
}
