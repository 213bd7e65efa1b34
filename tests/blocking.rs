mod common;

use std::sync::{Arc, Mutex};

use relq::drivers::InMemoryTestDriver;
use relq::error::DriverResult;
use relq::{
    BlockingDatabase, BlockingDriver, Entity, ExpressionOps, H2Dialect, RawQueryResult, Statement,
};

use common::{postgres, rows, Address};

/// Answers every query with the same rows and remembers the SQL it saw.
struct Recorder {
    statements: Mutex<Vec<String>>,
    response: RawQueryResult,
}

struct SharedRecorder(Arc<Recorder>);

impl BlockingDriver for SharedRecorder {
    fn execute(&self, statement: &Statement) -> DriverResult<RawQueryResult> {
        self.0.statements.lock().unwrap().push(statement.sql());
        Ok(self.0.response.clone())
    }
}

#[test]
fn test_blocking_select_and_update() {
    let recorder = Arc::new(Recorder {
        statements: Mutex::new(Vec::new()),
        response: rows(
            &["ADDRESS_ID", "STREET", "VERSION"],
            vec![Address::new(16, "STREET 16", Some(1)).values()],
        ),
    });
    let db = BlockingDatabase::new(SharedRecorder(Arc::clone(&recorder)), Arc::new(H2Dialect)).unwrap();
    let a = Address::meta();

    let address = db
        .block_on(
            db.querier()
                .select::<Address>()
                .where_(a.address_id.eq(16))
                .limit(1)
                .single(),
        )
        .unwrap();
    assert_eq!(address, Address::new(16, "STREET 16", Some(1)));

    // the recorder reports no affected rows, so the version check fails
    let err = db
        .block_on(db.querier().update::<Address>().single(&address))
        .unwrap_err();
    assert!(matches!(err, relq::RelqError::OptimisticLockConflict { .. }));

    let statements = recorder.statements.lock().unwrap();
    assert_eq!(
        statements[0],
        "select t0_.ADDRESS_ID, t0_.STREET, t0_.VERSION from ADDRESS t0_ \
         where t0_.ADDRESS_ID = ? fetch first 1 rows only"
    );
    assert!(statements[1].starts_with("update ADDRESS t0_ set STREET = ?"));
}

#[test]
fn test_wrapping_an_async_database() {
    let driver = Arc::new(InMemoryTestDriver::new().with_response(RawQueryResult::affected(2)));
    let db = BlockingDatabase::wrap(postgres(&driver)).unwrap();
    let a = Address::meta();

    let deleted = db
        .block_on(
            db.querier()
                .delete_from(&a.table)
                .where_(a.street.is_null())
                .execute(),
        )
        .unwrap();

    assert_eq!(deleted, 2);
    driver.assert_last_query("delete from ADDRESS t0_ where t0_.STREET is null", &[]);
}
