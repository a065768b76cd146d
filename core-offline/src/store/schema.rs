//! Schema versioning for the offline database.
//!
//! The version lives in `PRAGMA user_version`. Upgrades only ever add tables
//! and indexes, and each run commits the new objects and the version bump
//! together.

use sqlx::SqlitePool;
use tracing::{debug, info};

/// Version the code writes and expects.
pub const SCHEMA_VERSION: i64 = 1;

const V1: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS audio_files (
        content_id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        artist_name TEXT,
        audio_blob BLOB NOT NULL,
        downloaded_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_audio_files_downloaded_at ON audio_files (downloaded_at)",
    r#"
    CREATE TABLE IF NOT EXISTS cover_images (
        content_id TEXT PRIMARY KEY,
        blob BLOB NOT NULL
    )
    "#,
];

/// Ordered upgrade steps; step `n` moves the database from `n - 1` to `n`.
const STEPS: &[(i64, &[&str])] = &[(1, V1)];

/// Outcome of [`upgrade`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Upgrade {
    pub from: i64,
    pub to: i64,
}

impl Upgrade {
    pub fn applied(&self) -> bool {
        self.to > self.from
    }
}

pub(crate) async fn current_version(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("PRAGMA user_version")
        .fetch_one(pool)
        .await
}

/// Bring the schema to [`SCHEMA_VERSION`].
///
/// A database already at or beyond the target is left untouched, including
/// tables this code does not know about.
pub(crate) async fn upgrade(pool: &SqlitePool) -> Result<Upgrade, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let from: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(&mut *tx)
        .await?;

    if from >= SCHEMA_VERSION {
        debug!(version = from, "Offline schema up to date");
        tx.commit().await?;
        return Ok(Upgrade { from, to: from });
    }

    for (version, statements) in STEPS.iter().filter(|(version, _)| *version > from) {
        debug!(version, "Applying offline schema step");
        for statement in statements.iter() {
            sqlx::query(statement).execute(&mut *tx).await?;
        }
    }

    // PRAGMA does not accept bound parameters.
    sqlx::query(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(from, to = SCHEMA_VERSION, "Upgraded offline schema");
    Ok(Upgrade {
        from,
        to: SCHEMA_VERSION,
    })
}
