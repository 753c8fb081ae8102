//! Database row types and column helpers. Ids and timestamps are stored as
//! TEXT; the helpers turn them back into typed values inside row mappers.
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use pantry_core::store::Window;
use pantry_types::models::{Ingredient, Tag};
use rusqlite::Row;
use rusqlite::types::Type;
use uuid::Uuid;

pub struct RecipeRow {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: String,
    pub name: String,
    pub text: String,
    pub cooking_time: u32,
    pub created_at: DateTime<Utc>,
}

impl RecipeRow {
    /// Expects `id, author_id, author_username, name, text, cooking_time, created_at`.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_col(row, 0)?,
            author_id: uuid_col(row, 1)?,
            author_username: row
                .get::<_, Option<String>>(2)?
                .unwrap_or_else(|| "unknown".to_string()),
            name: row.get(3)?,
            text: row.get(4)?,
            cooking_time: row.get(5)?,
            created_at: timestamp_col(row, 6)?,
        })
    }
}

/// Expects `id, name, measurement_unit` starting at `offset`.
pub fn ingredient_at(row: &Row<'_>, offset: usize) -> rusqlite::Result<Ingredient> {
    Ok(Ingredient {
        id: uuid_col(row, offset)?,
        name: row.get(offset + 1)?,
        measurement_unit: row.get(offset + 2)?,
    })
}

/// Expects `id, name, color, slug` starting at `offset`.
pub fn tag_at(row: &Row<'_>, offset: usize) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: uuid_col(row, offset)?,
        name: row.get(offset + 1)?,
        color: row.get(offset + 2)?,
        slug: row.get(offset + 3)?,
    })
}

pub fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub fn timestamp_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// RFC 3339 with microseconds and a `Z` suffix, so that stored values sort
/// lexically in time order.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    raw.parse::<DateTime<Utc>>().or_else(|_| {
        // SQLite's datetime('now') has no timezone: treat it as UTC.
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
    })
}

/// Ids bound into one `IN (...)` list. Longer lists are split into chunks,
/// which keeps every statement well below SQLite's bound parameter limit.
pub const IN_CHUNK: usize = 500;

/// `(LIMIT, OFFSET)` values for a window. `usize::MAX` saturates.
pub fn window_bounds(window: Window) -> (i64, i64) {
    let clamp = |v: usize| i64::try_from(v).unwrap_or(i64::MAX);
    (clamp(window.limit), clamp(window.offset))
}

/// `?start, ?start+1, ...` for `count` numbered parameters.
pub fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}
