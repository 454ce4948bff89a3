//! Migration support for LiteModel.
//!
//! This crate provides the [`Migrator`]: an ordered list of named setup
//! blocks, each applied once per database and recorded in a bookkeeping
//! table stored alongside the data.

pub mod migrate;

pub use migrate::{MIGRATIONS_TABLE, Migration, MigrationStatus, Migrator};
