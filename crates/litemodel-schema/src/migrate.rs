//! Database migration support.

#![allow(clippy::result_large_err)]

use litemodel_core::{Error, Result, UsageErrorKind, args, quote_ident};
use litemodel_sqlite::{Database, DatabaseQueue, TransactionCompletion, TransactionKind};
use std::collections::HashSet;
use std::fmt;

/// Name of the bookkeeping table that records applied migrations.
pub const MIGRATIONS_TABLE: &str = "litemodel_migrations";

type MigrationBlock = Box<dyn Fn(&Database) -> Result<()> + Send + Sync>;

/// A named setup block.
pub struct Migration {
    name: String,
    block: MigrationBlock,
}

impl Migration {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration").field("name", &self.name).finish()
    }
}

/// Status of a migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStatus {
    /// Migration has not been applied
    Pending,
    /// Migration has been applied
    Applied,
}

/// Applies registered migrations in order, each at most once per database.
///
/// ```
/// use litemodel_schema::Migrator;
/// use litemodel_sqlite::DatabaseQueue;
///
/// let mut migrator = Migrator::new();
/// migrator
///     .register_migration("createPersons", |db| {
///         db.execute_batch("CREATE TABLE persons (id INTEGER PRIMARY KEY, name TEXT)")
///     })
///     .unwrap();
///
/// let queue = DatabaseQueue::open_memory().unwrap();
/// assert_eq!(migrator.migrate(&queue).unwrap(), vec!["createPersons".to_string()]);
/// assert!(migrator.migrate(&queue).unwrap().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct Migrator {
    migrations: Vec<Migration>,
}

impl Migrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a migration. Names must be unique within a migrator.
    pub fn register_migration<F>(&mut self, name: impl Into<String>, block: F) -> Result<()>
    where
        F: Fn(&Database) -> Result<()> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.migrations.iter().any(|m| m.name == name) {
            return Err(Error::usage(
                UsageErrorKind::DuplicateMigration,
                format!("migration {} is already registered", name),
            ));
        }
        self.migrations.push(Migration {
            name,
            block: Box::new(block),
        });
        Ok(())
    }

    /// Registered migrations, in registration order.
    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    /// Apply pending migrations through a queue.
    ///
    /// Returns the names applied by this call.
    pub fn migrate(&self, queue: &DatabaseQueue) -> Result<Vec<String>> {
        queue.in_database(|db| self.migrate_database(db))
    }

    /// Apply pending migrations on a connection.
    ///
    /// Each migration runs in its own transaction together with its
    /// bookkeeping row. The first failure rolls back that migration only,
    /// stops the sequence and is returned.
    #[tracing::instrument(level = "debug", skip(self, database), fields(path = database.path()))]
    pub fn migrate_database(&self, database: &Database) -> Result<Vec<String>> {
        self.init(database)?;
        let applied = self.applied_set(database)?;
        let insert = format!(
            "INSERT INTO {} (name) VALUES (?)",
            quote_ident(MIGRATIONS_TABLE)
        );

        let mut newly_applied = Vec::new();
        for migration in self
            .migrations
            .iter()
            .filter(|m| !applied.contains(&m.name))
        {
            database
                .in_transaction(TransactionKind::Immediate, |db| {
                    (migration.block)(db)?;
                    db.execute(&insert, args![migration.name.as_str()])?;
                    Ok(TransactionCompletion::Commit)
                })
                .inspect_err(|error| {
                    tracing::warn!(migration = %migration.name, %error, "migration failed");
                })?;
            tracing::debug!(migration = %migration.name, "applied migration");
            newly_applied.push(migration.name.clone());
        }

        Ok(newly_applied)
    }

    /// Names recorded as applied in the database, in application order.
    pub fn applied_migrations(&self, database: &Database) -> Result<Vec<String>> {
        if !database.table_exists(MIGRATIONS_TABLE)? {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT name FROM {} ORDER BY rowid",
            quote_ident(MIGRATIONS_TABLE)
        );
        Ok(database
            .fetch_values::<String>(&sql, None)?
            .into_iter()
            .flatten()
            .collect())
    }

    /// Status of every registered migration, in registration order.
    pub fn status(&self, database: &Database) -> Result<Vec<(String, MigrationStatus)>> {
        let applied = self.applied_set(database)?;
        Ok(self
            .migrations
            .iter()
            .map(|m| {
                let status = if applied.contains(&m.name) {
                    MigrationStatus::Applied
                } else {
                    MigrationStatus::Pending
                };
                (m.name.clone(), status)
            })
            .collect())
    }

    /// Ensure the bookkeeping table exists.
    fn init(&self, database: &Database) -> Result<()> {
        if database.table_exists(MIGRATIONS_TABLE)? {
            return Ok(());
        }
        database.execute_batch(&format!(
            "CREATE TABLE {} (name TEXT NOT NULL PRIMARY KEY)",
            quote_ident(MIGRATIONS_TABLE)
        ))
    }

    fn applied_set(&self, database: &Database) -> Result<HashSet<String>> {
        Ok(self.applied_migrations(database)?.into_iter().collect())
    }
}
