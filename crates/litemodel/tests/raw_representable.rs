//! Enums stored through their integer or string raw value.

use litemodel::prelude::*;
use litemodel::{int_representable, string_representable};

int_representable! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Color {
        Red = 0,
        White = 1,
        Rose = 2,
    }
}

string_representable! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Grape {
        Chardonnay = "Chardonnay",
        Merlot = "Merlot",
        Riesling = "Riesling",
    }
}

fn wines() -> DatabaseQueue {
    let queue = DatabaseQueue::open_memory().unwrap();
    queue
        .in_database(|db| db.execute_batch("CREATE TABLE wines (grape TEXT, color INTEGER)"))
        .unwrap();
    queue
}

#[test]
fn int_raw_values() {
    let queue = wines();
    queue
        .in_transaction(TransactionKind::default(), |db| {
            for color in [Some(Color::Red), Some(Color::White), Some(Color::Rose), None] {
                db.execute("INSERT INTO wines (color) VALUES (?)", args![color])?;
            }
            db.execute("INSERT INTO wines (color) VALUES (?)", args![4])?;

            let colors = db.fetch_values::<Color>("SELECT color FROM wines ORDER BY rowid", None)?;
            assert_eq!(
                colors,
                vec![Some(Color::Red), Some(Color::White), Some(Color::Rose), None, None]
            );

            // An unknown raw value is a decoding failure, not a silent default.
            let row = db
                .fetch_one_row("SELECT color FROM wines WHERE color = 4", None)?
                .unwrap();
            assert!(matches!(row.get_as::<Color>(0), Err(Error::Type(_))));
            Ok(TransactionCompletion::Rollback)
        })
        .unwrap();
}

#[test]
fn string_raw_values() {
    let queue = wines();
    queue
        .in_transaction(TransactionKind::default(), |db| {
            for grape in [Some(Grape::Chardonnay), Some(Grape::Merlot), Some(Grape::Riesling), None]
            {
                db.execute("INSERT INTO wines (grape) VALUES (?)", args![grape])?;
            }
            db.execute("INSERT INTO wines (grape) VALUES (?)", args!["Syrah"])?;

            let grapes = db.fetch_values::<Grape>("SELECT grape FROM wines ORDER BY rowid", None)?;
            assert_eq!(
                grapes,
                vec![
                    Some(Grape::Chardonnay),
                    Some(Grape::Merlot),
                    Some(Grape::Riesling),
                    None,
                    None,
                ]
            );
            Ok(TransactionCompletion::Rollback)
        })
        .unwrap();

    let count = queue
        .in_database(|db| db.fetch_one::<i64>("SELECT COUNT(*) FROM wines", None))
        .unwrap();
    assert_eq!(count, Some(0));
}

#[test]
fn raw_values_do_not_cross_storage_classes() {
    assert_eq!(Value::Text("1".into()).decode::<Color>(), None);
    assert_eq!(Value::Integer(1).decode::<Grape>(), None);
    assert_eq!(Value::from(Color::Rose).decode::<Color>(), Some(Color::Rose));
    assert_eq!(Value::from(Grape::Riesling), Value::Text("Riesling".into()));
}
