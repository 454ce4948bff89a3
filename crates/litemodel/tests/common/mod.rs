//! Row models and fixtures shared by the integration tests.

#![allow(dead_code)]

use litemodel::prelude::*;

/// Capability table entry for an `Option<T>` field.
macro_rules! column {
    ($model:ty, $name:literal => $field:ident) => {
        ColumnMapping {
            name: $name,
            get: |record: &$model| Value::from(record.$field.clone()),
            set: |record: &mut $model, value: &Value| {
                record.$field = FromValue::from_value(value)?;
                Ok(())
            },
        }
    };
}

/// Person has a row id primary key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub age: Option<i64>,
}

impl Person {
    pub fn new(name: &str, age: Option<i64>) -> Self {
        Self {
            id: None,
            name: Some(name.to_string()),
            age,
        }
    }
}

impl RowModel for Person {
    const TABLE: Table = Table::new("persons", PrimaryKey::RowId("id"));
    const COLUMNS: &'static [ColumnMapping<Self>] = &[
        column!(Person, "id" => id),
        column!(Person, "name" => name),
        column!(Person, "age" => age),
    ];
}

/// Pet has a single, application-assigned primary key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pet {
    pub uuid: Option<String>,
    pub name: Option<String>,
}

impl Pet {
    pub fn new(uuid: Option<&str>, name: &str) -> Self {
        Self {
            uuid: uuid.map(str::to_string),
            name: Some(name.to_string()),
        }
    }
}

impl RowModel for Pet {
    const TABLE: Table = Table::new("pets", PrimaryKey::Column("UUID"));
    const COLUMNS: &'static [ColumnMapping<Self>] = &[
        column!(Pet, "UUID" => uuid),
        column!(Pet, "name" => name),
    ];
}

/// Item has no primary key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Item {
    pub name: Option<String>,
}

impl RowModel for Item {
    const TABLE: Table = Table::new("items", PrimaryKey::None);
    const COLUMNS: &'static [ColumnMapping<Self>] = &[column!(Item, "name" => name)];
}

/// Citizenship has a two-column primary key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Citizenship {
    pub person_name: Option<String>,
    pub country_name: Option<String>,
    pub native: Option<bool>,
}

impl Citizenship {
    pub fn new(person_name: Option<&str>, country_name: Option<&str>, native: bool) -> Self {
        Self {
            person_name: person_name.map(str::to_string),
            country_name: country_name.map(str::to_string),
            native: Some(native),
        }
    }
}

impl RowModel for Citizenship {
    const TABLE: Table = Table::new(
        "citizenships",
        PrimaryKey::Columns(&["personName", "countryName"]),
    );
    const COLUMNS: &'static [ColumnMapping<Self>] = &[
        column!(Citizenship, "personName" => person_name),
        column!(Citizenship, "countryName" => country_name),
        column!(Citizenship, "native" => native),
    ];
}

/// A row id key and nothing else.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MinimalRowId {
    pub id: Option<i64>,
}

impl RowModel for MinimalRowId {
    const TABLE: Table = Table::new("minimalRowIDs", PrimaryKey::RowId("id"));
    const COLUMNS: &'static [ColumnMapping<Self>] = &[column!(MinimalRowId, "id" => id)];
}

/// A single application-assigned key and nothing else.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MinimalSingle {
    pub uuid: Option<String>,
}

impl RowModel for MinimalSingle {
    const TABLE: Table = Table::new("minimalSingles", PrimaryKey::Column("UUID"));
    const COLUMNS: &'static [ColumnMapping<Self>] = &[column!(MinimalSingle, "UUID" => uuid)];
}

/// Migrations creating every fixture table.
pub fn fixtures_migrator() -> Migrator {
    let mut migrator = Migrator::new();
    let tables: [(&str, &str); 6] = [
        (
            "createPersons",
            "CREATE TABLE persons (id INTEGER PRIMARY KEY, name TEXT, age INT)",
        ),
        (
            "createPets",
            "CREATE TABLE pets (UUID TEXT NOT NULL PRIMARY KEY, name TEXT NOT NULL)",
        ),
        ("createItems", "CREATE TABLE items (name NOT NULL)"),
        (
            "createCitizenships",
            "CREATE TABLE citizenships (personName TEXT NOT NULL, countryName TEXT NOT NULL, native BOOLEAN NOT NULL, PRIMARY KEY (personName, countryName))",
        ),
        (
            "createMinimalRowIDs",
            "CREATE TABLE minimalRowIDs (id INTEGER PRIMARY KEY)",
        ),
        (
            "createMinimalSingles",
            "CREATE TABLE minimalSingles (UUID TEXT NOT NULL PRIMARY KEY)",
        ),
    ];
    for (name, sql) in tables {
        migrator
            .register_migration(name, move |db| db.execute_batch(sql))
            .unwrap();
    }
    migrator
}

/// An in-memory queue with every fixture table created.
pub fn fixtures_queue() -> DatabaseQueue {
    let queue = DatabaseQueue::open_memory().unwrap();
    fixtures_migrator().migrate(&queue).unwrap();
    queue
}

/// Assert that the stored row with the record's key holds the record's
/// column dictionary.
pub fn assert_stored<M: RowModel>(db: &Database, record: &M) {
    let key = record.primary_key_values();
    let names: Vec<&str> = key.iter().map(|(name, _)| *name).collect();
    let conditions = names
        .iter()
        .map(|name| format!("{} = ?", litemodel::quote_ident(name)))
        .collect::<Vec<_>>()
        .join(" AND ");
    let sql = format!(
        "SELECT * FROM {} WHERE {}",
        litemodel::quote_ident(M::TABLE.name),
        conditions
    );
    let arguments = QueryArguments::Positional(key.into_iter().map(|(_, v)| v).collect());
    let row = db
        .fetch_one_row(&sql, arguments)
        .unwrap()
        .expect("stored row");
    for (name, value) in record.column_values() {
        assert_eq!(
            row.get_by_name(name),
            Some(&value),
            "column {} of {}",
            name,
            M::TABLE.name
        );
    }
}

/// Number of rows in `table`.
pub fn count(db: &Database, table: &str) -> i64 {
    db.fetch_one::<i64>(
        &format!("SELECT COUNT(*) FROM {}", litemodel::quote_ident(table)),
        None,
    )
    .unwrap()
    .unwrap()
}
