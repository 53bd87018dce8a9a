use std::error::Error;

use diesel::pg::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

/// Schema for the catalog (`events`, `artists`) and analytics (`interactions`,
/// `event_metrics`) tables. Both databases run the same set.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Applies pending migrations and returns the versions that ran.
pub fn run_pending_migrations(
    conn: &mut PgConnection,
) -> Result<Vec<String>, Box<dyn Error + Send + Sync>> {
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    Ok(applied.into_iter().map(|version| version.to_string()).collect())
}
