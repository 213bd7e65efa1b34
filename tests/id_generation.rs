mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use relq::drivers::{InMemoryTestDriver, RecordedQuery};
use relq::error::{BuildError, DriverError};
use relq::{DatabaseConfig, MySqlDialect, RawQueryResult, RelqError, SqlValue};

use common::{database, postgres, rows, Person, Ticket};

/// A sequence that hands out blocks of 100 starting at 1.
fn sequence_driver() -> Arc<InMemoryTestDriver> {
    let next_block = AtomicI64::new(1);
    Arc::new(InMemoryTestDriver::new().with_handler(move |query| {
        if query.sql.starts_with("select nextval") {
            let start = next_block.fetch_add(100, Ordering::SeqCst);
            Ok(rows(&["nextval"], vec![vec![SqlValue::Int64(start)]]))
        } else {
            Ok(RawQueryResult::affected(1))
        }
    }))
}

fn sequence_calls(driver: &InMemoryTestDriver) -> usize {
    driver
        .recorded_queries()
        .iter()
        .filter(|q| q.sql.starts_with("select nextval"))
        .count()
}

#[tokio::test]
async fn test_sequence_refreshes_once_per_block() {
    let driver = sequence_driver();
    let querier = postgres(&driver).querier();

    let mut ids = Vec::new();
    for _ in 0..201 {
        let person = querier.insert::<Person>().single(&Person::named("SMITH")).await.unwrap();
        ids.push(person.person_id);
    }

    assert_eq!(ids, (1..=201).collect::<Vec<i64>>());
    assert_eq!(sequence_calls(&driver), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sequence_ids_are_unique_across_tasks() {
    let driver = sequence_driver();
    let db = postgres(&driver);

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let db = db.clone();
            tokio::spawn(async move {
                let querier = db.querier();
                let mut ids = Vec::new();
                for _ in 0..50 {
                    let person = querier.insert::<Person>().single(&Person::named("ALLEN")).await.unwrap();
                    ids.push(person.person_id);
                }
                ids
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for task in tasks {
        for id in task.await.unwrap() {
            assert!(seen.insert(id), "id {id} handed out twice");
        }
    }
    assert_eq!(seen.len(), 400);
    assert_eq!(sequence_calls(&driver), 4);
}

#[tokio::test]
async fn test_sequence_requires_dialect_support() {
    let driver = Arc::new(InMemoryTestDriver::new());
    let querier = database(&driver, MySqlDialect).querier();

    let err = querier.insert::<Person>().single(&Person::named("WARD")).await.unwrap_err();
    assert!(matches!(
        err,
        RelqError::Build(BuildError::Unsupported {
            dialect: "mysql",
            ..
        })
    ));
    driver.assert_query_count(0);
}

fn counter(value: i64) -> RawQueryResult {
    rows(&["VALUE"], vec![vec![SqlValue::Int64(value)]])
}

fn ticket(code: &str) -> Ticket {
    Ticket {
        ticket_id: 0,
        code: code.to_string(),
    }
}

#[tokio::test]
async fn test_table_generator_retries_after_concurrent_change() {
    let driver = Arc::new(InMemoryTestDriver::new().with_responses([
        counter(1),
        RawQueryResult::affected(0),
        counter(11),
        RawQueryResult::affected(1),
        RawQueryResult::affected(1),
    ]));
    let querier = postgres(&driver).querier();

    let saved = querier.insert::<Ticket>().single(&ticket("A-1")).await.unwrap();

    assert_eq!(saved.ticket_id, 11);
    driver.assert_query_count(5);
    driver.assert_last_query(
        "insert into TICKET (TICKET_ID, CODE) values (?, ?)",
        &[SqlValue::Int64(11), SqlValue::from("A-1")],
    );
}

#[tokio::test]
async fn test_table_generator_gives_up() {
    let driver = Arc::new(InMemoryTestDriver::new().with_handler(|query| {
        if query.sql.starts_with("select") {
            Ok(counter(1))
        } else {
            Err(DriverError::LockConflict("could not obtain lock".to_string()))
        }
    }));
    let db = postgres(&driver).with_config(DatabaseConfig::default().table_generator_max_attempts(2));

    let err = db.querier().insert::<Ticket>().single(&ticket("A-1")).await.unwrap_err();

    assert!(matches!(
        err,
        RelqError::IdentifierGenerationExhausted {
            ref key,
            attempts: 2
        } if key == "TICKET"
    ));
    driver.assert_query_count(4);
}

#[tokio::test]
async fn test_zero_attempts_from_config_still_tries_once() {
    let config: DatabaseConfig =
        serde_json::from_str(r#"{"table_generator_max_attempts": 0}"#).unwrap();
    assert_eq!(config.table_generator_max_attempts, 0);
    let driver = Arc::new(InMemoryTestDriver::new().with_responses([
        counter(1),
        RawQueryResult::affected(1),
        RawQueryResult::affected(1),
    ]));
    let db = postgres(&driver).with_config(config);

    let saved = db.querier().insert::<Ticket>().single(&ticket("A-1")).await.unwrap();

    assert_eq!(saved.ticket_id, 1);
    driver.assert_query_count(3);
}

/// Applies `update ... set VALUE = ? where KEY = ? and VALUE = ?` only when
/// the expected value still matches, like the real counter row.
fn compare_and_swap(state: &Mutex<i64>, query: &RecordedQuery) -> Result<RawQueryResult, DriverError> {
    let mut current = state.lock().unwrap();
    if query.sql.starts_with("select") {
        return Ok(counter(*current));
    }
    if !query.sql.starts_with("update ID_GENERATOR") {
        return Ok(RawQueryResult::affected(1));
    }
    match (&query.params[0], &query.params[2]) {
        (SqlValue::Int64(next), SqlValue::Int64(expected)) if *expected == *current => {
            *current = *next;
            Ok(RawQueryResult::affected(1))
        }
        _ => Ok(RawQueryResult::affected(0)),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_table_generator_blocks_never_overlap_between_databases() {
    let state = Arc::new(Mutex::new(1i64));
    let shared = Arc::clone(&state);
    let driver = Arc::new(
        InMemoryTestDriver::new().with_handler(move |query| compare_and_swap(&shared, query)),
    );
    // two databases keep separate generator state over one counter row
    let first = postgres(&driver).with_config(DatabaseConfig::default().table_generator_max_attempts(50));
    let second = postgres(&driver).with_config(DatabaseConfig::default().table_generator_max_attempts(50));

    let tasks: Vec<_> = [first, second]
        .into_iter()
        .flat_map(|db| std::iter::repeat(db).take(3))
        .map(|db| {
            tokio::spawn(async move {
                let querier = db.querier();
                let mut ids = Vec::new();
                for i in 0..15 {
                    let saved = querier
                        .insert::<Ticket>()
                        .single(&ticket(&format!("T-{i}")))
                        .await
                        .unwrap();
                    ids.push(saved.ticket_id);
                }
                ids
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for task in tasks {
        for id in task.await.unwrap() {
            assert!(seen.insert(id), "id {id} handed out twice");
        }
    }
    assert_eq!(seen.len(), 90);
    assert_eq!(*state.lock().unwrap() % 10, 1);
}
