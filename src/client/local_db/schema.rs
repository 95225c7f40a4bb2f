//! Store schema and migrations
//!
//! `schema.sql` is applied on every open and only uses `IF NOT EXISTS`.
//! Changes after that go into `MIGRATIONS`; each one runs once, in the same
//! transaction that records it in `schema_migrations`.

/// Tables and indexes of the store
pub const BASE_SCHEMA: &str = include_str!("schema.sql");

/// One forward-only schema step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub version: u32,
    pub description: &'static str,
    /// Statements to run; empty when the step is covered by `BASE_SCHEMA`
    pub sql: &'static str,
}

/// Every migration, ascending by version
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "collection-scoped store entries",
    sql: "",
}];

/// Highest version this build knows how to read
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

/// Migrations still to run on a store at `applied`
pub fn pending(applied: u32) -> &'static [Migration] {
    let start = MIGRATIONS.partition_point(|m| m.version <= applied);
    &MIGRATIONS[start..]
}
