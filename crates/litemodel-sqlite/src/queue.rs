//! Serialized access to one connection from many threads.
//!
//! A [`DatabaseQueue`] owns a [`Database`] and runs closures against it one at
//! a time. Calls from different threads wait their turn. A call made from
//! inside another call on the same thread would deadlock, so it is rejected
//! with a `ReentrantAccess` usage error instead.

#![allow(clippy::result_large_err)]

use crate::config::Configuration;
use crate::database::{Database, TransactionCompletion, TransactionKind};
use litemodel_core::{Error, Result, UsageErrorKind};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

/// A connection shared between threads with serialized access.
#[derive(Debug)]
pub struct DatabaseQueue {
    database: Mutex<Database>,
    owner: Mutex<Option<ThreadId>>,
}

impl DatabaseQueue {
    /// Open or create the database at `path` and wrap it in a queue.
    pub fn open(path: impl Into<String>, configuration: Configuration) -> Result<Self> {
        Database::open(path, configuration).map(Self::new)
    }

    pub fn open_memory() -> Result<Self> {
        Database::open_memory().map(Self::new)
    }

    pub fn new(database: Database) -> Self {
        Self {
            database: Mutex::new(database),
            owner: Mutex::new(None),
        }
    }

    /// Run `block` with exclusive access to the connection.
    pub fn in_database<T, F>(&self, block: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T>,
    {
        let (database, _owner) = self.acquire()?;
        block(&database)
    }

    /// Run `block` inside a transaction with exclusive access to the
    /// connection. See [`Database::in_transaction`].
    pub fn in_transaction<F>(&self, kind: TransactionKind, block: F) -> Result<()>
    where
        F: FnOnce(&Database) -> Result<TransactionCompletion>,
    {
        self.in_database(|db| db.in_transaction(kind, block))
    }

    /// Close the underlying connection. Later calls see a closed connection.
    pub fn close(&self) -> Result<()> {
        let (mut database, _owner) = self.acquire()?;
        database.close()
    }

    /// Take the connection back out of the queue.
    pub fn into_inner(self) -> Database {
        self.database
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn acquire(&self) -> Result<(MutexGuard<'_, Database>, OwnerGuard<'_>)> {
        let current = thread::current().id();
        if *lock(&self.owner) == Some(current) {
            tracing::warn!("re-entrant database queue access rejected");
            return Err(Error::usage(
                UsageErrorKind::ReentrantAccess,
                "the database queue is already in use by this thread",
            ));
        }

        // A panic inside a block leaves the connection itself consistent:
        // transactions roll back while unwinding.
        let database = lock(&self.database);
        *lock(&self.owner) = Some(current);
        Ok((database, OwnerGuard { owner: &self.owner }))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the owning thread when a queue call ends.
struct OwnerGuard<'q> {
    owner: &'q Mutex<Option<ThreadId>>,
}

impl Drop for OwnerGuard<'_> {
    fn drop(&mut self) {
        // Callers bind the owner guard after the connection guard, so it
        // drops first and the connection is still held here. Only clear an
        // owner this thread set.
        let mut owner = lock(self.owner);
        if *owner == Some(thread::current().id()) {
            *owner = None;
        }
    }
}
