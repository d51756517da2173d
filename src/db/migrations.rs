use anyhow::{bail, Context, Result};
use log::info;
use rusqlite::Connection;

/// One schema step per version, applied in order. `user_version` records the
/// last applied entry.
struct Migration {
    version: i32,
    creates: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        creates: "calls",
        sql: include_str!("schemas/schema_v1.sql"),
    },
    Migration {
        version: 2,
        creates: "follow_ups",
        sql: include_str!("schemas/schema_v2.sql"),
    },
];

const CURRENT_SCHEMA_VERSION: i32 = MIGRATIONS.len() as i32;

pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read call history schema version")?;

    if version > CURRENT_SCHEMA_VERSION {
        bail!(
            "call history database is at schema {version}, newer than this build supports ({CURRENT_SCHEMA_VERSION})"
        );
    }

    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > version).collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn
        .transaction()
        .context("failed to open migration transaction")?;
    for migration in pending {
        tx.execute_batch(migration.sql).with_context(|| {
            format!(
                "schema v{} failed creating `{}`",
                migration.version, migration.creates
            )
        })?;
        info!(
            "call history schema v{} applied ({})",
            migration.version, migration.creates
        );
    }
    tx.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)
        .context("failed to record call history schema version")?;
    tx.commit().context("failed to commit migrations")?;

    Ok(())
}
