#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use relq::drivers::InMemoryTestDriver;
use relq::{
    Clock, Column, Database, DatabaseDriver, Dialect, Entity, EntityMetamodel, IdGenerator,
    PostgreSqlDialect, RawQueryResult, Result, Row, SqlValue, TableDescriptor, TableRef,
};

pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

pub fn noon() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .expect("valid timestamp")
}

/// A database over `driver` speaking `dialect`, with the clock fixed at noon.
pub fn database(driver: &Arc<InMemoryTestDriver>, dialect: impl Dialect + 'static) -> Database {
    let driver: Arc<dyn DatabaseDriver> = Arc::clone(driver) as Arc<dyn DatabaseDriver>;
    Database::new(driver, Arc::new(dialect)).with_clock(Arc::new(FixedClock(noon())))
}

pub fn postgres(driver: &Arc<InMemoryTestDriver>) -> Database {
    database(driver, PostgreSqlDialect)
}

pub fn rows(columns: &[&str], rows: Vec<Vec<SqlValue>>) -> RawQueryResult {
    RawQueryResult::new(columns.iter().map(|c| c.to_string()).collect(), rows)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    pub address_id: i32,
    pub street: String,
    pub version: Option<i32>,
}

pub struct AddressMeta {
    pub table: TableRef,
    pub address_id: Column<i32>,
    pub street: Column<String>,
    pub version: Column<Option<i32>>,
}

impl Address {
    pub fn new(address_id: i32, street: &str, version: Option<i32>) -> Self {
        Self {
            address_id,
            street: street.to_string(),
            version,
        }
    }

    pub fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Int32(self.address_id),
            SqlValue::from(self.street.as_str()),
            SqlValue::from(self.version),
        ]
    }
}

impl Entity for Address {
    type Meta = AddressMeta;

    fn meta() -> AddressMeta {
        let table = TableDescriptor::new("ADDRESS").into_ref();
        AddressMeta {
            address_id: Column::new(&table, "ADDRESS_ID"),
            street: Column::new(&table, "STREET"),
            version: Column::new(&table, "VERSION"),
            table,
        }
    }

    fn metamodel() -> EntityMetamodel {
        let m = Self::meta();
        EntityMetamodel::new(&m.table)
            .id(&m.address_id)
            .column(&m.street)
            .version(&m.version)
    }

    fn from_row(row: &Row) -> Result<Self> {
        let m = Self::meta();
        Ok(Self {
            address_id: row.value(&m.address_id)?,
            street: row.value(&m.street)?,
            version: row.value(&m.version)?,
        })
    }

    fn to_row(&self) -> Row {
        let m = Self::meta();
        Row::default()
            .with(&m.address_id, &self.address_id)
            .with(&m.street, &self.street)
            .with(&m.version, &self.version)
    }
}

/// An employee and, once associated, the address it was joined with.
#[derive(Debug, Clone, PartialEq)]
pub struct Employee {
    pub employee_id: i32,
    pub name: String,
    pub address_id: i32,
    pub address: Option<Address>,
}

pub struct EmployeeMeta {
    pub table: TableRef,
    pub employee_id: Column<i32>,
    pub name: Column<String>,
    pub address_id: Column<i32>,
}

impl Employee {
    pub fn values(employee_id: i32, name: &str, address_id: i32) -> Vec<SqlValue> {
        vec![
            SqlValue::Int32(employee_id),
            SqlValue::from(name),
            SqlValue::Int32(address_id),
        ]
    }
}

impl Entity for Employee {
    type Meta = EmployeeMeta;

    fn meta() -> EmployeeMeta {
        let table = TableDescriptor::new("EMPLOYEE").into_ref();
        EmployeeMeta {
            employee_id: Column::new(&table, "EMPLOYEE_ID"),
            name: Column::new(&table, "NAME"),
            address_id: Column::new(&table, "ADDRESS_ID"),
            table,
        }
    }

    fn metamodel() -> EntityMetamodel {
        let m = Self::meta();
        EntityMetamodel::new(&m.table)
            .id(&m.employee_id)
            .column(&m.name)
            .column(&m.address_id)
    }

    fn from_row(row: &Row) -> Result<Self> {
        let m = Self::meta();
        Ok(Self {
            employee_id: row.value(&m.employee_id)?,
            name: row.value(&m.name)?,
            address_id: row.value(&m.address_id)?,
            address: None,
        })
    }

    fn to_row(&self) -> Row {
        let m = Self::meta();
        Row::default()
            .with(&m.employee_id, &self.employee_id)
            .with(&m.name, &self.name)
            .with(&m.address_id, &self.address_id)
    }
}

/// Ids come from the `PERSON_SEQ` sequence, 100 at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub person_id: i64,
    pub name: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

pub struct PersonMeta {
    pub table: TableRef,
    pub person_id: Column<i64>,
    pub name: Column<String>,
    pub created_at: Column<Option<NaiveDateTime>>,
    pub updated_at: Column<Option<NaiveDateTime>>,
}

impl Person {
    pub fn named(name: &str) -> Self {
        Self {
            person_id: 0,
            name: name.to_string(),
            created_at: None,
            updated_at: None,
        }
    }
}

impl Entity for Person {
    type Meta = PersonMeta;

    fn meta() -> PersonMeta {
        let table = TableDescriptor::new("PERSON").into_ref();
        PersonMeta {
            person_id: Column::new(&table, "PERSON_ID"),
            name: Column::new(&table, "NAME"),
            created_at: Column::new(&table, "CREATED_AT"),
            updated_at: Column::new(&table, "UPDATED_AT"),
            table,
        }
    }

    fn metamodel() -> EntityMetamodel {
        let m = Self::meta();
        EntityMetamodel::new(&m.table)
            .id(&m.person_id)
            .column(&m.name)
            .created_at(&m.created_at)
            .updated_at(&m.updated_at)
            .id_generator(IdGenerator::sequence("PERSON_SEQ", 100))
    }

    fn from_row(row: &Row) -> Result<Self> {
        let m = Self::meta();
        Ok(Self {
            person_id: row.value(&m.person_id)?,
            name: row.value(&m.name)?,
            created_at: row.value(&m.created_at)?,
            updated_at: row.value(&m.updated_at)?,
        })
    }

    fn to_row(&self) -> Row {
        let m = Self::meta();
        Row::default()
            .with(&m.person_id, &self.person_id)
            .with(&m.name, &self.name)
            .with(&m.created_at, &self.created_at)
            .with(&m.updated_at, &self.updated_at)
    }
}

/// Ids are assigned by the database on insert.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub item_id: Option<i64>,
    pub name: String,
}

pub struct ItemMeta {
    pub table: TableRef,
    pub item_id: Column<Option<i64>>,
    pub name: Column<String>,
}

impl Entity for Item {
    type Meta = ItemMeta;

    fn meta() -> ItemMeta {
        let table = TableDescriptor::new("ITEM").into_ref();
        ItemMeta {
            item_id: Column::new(&table, "ITEM_ID"),
            name: Column::new(&table, "NAME"),
            table,
        }
    }

    fn metamodel() -> EntityMetamodel {
        let m = Self::meta();
        EntityMetamodel::new(&m.table)
            .id(&m.item_id)
            .column(&m.name)
            .id_generator(IdGenerator::Identity)
    }

    fn from_row(row: &Row) -> Result<Self> {
        let m = Self::meta();
        Ok(Self {
            item_id: row.value(&m.item_id)?,
            name: row.value(&m.name)?,
        })
    }

    fn to_row(&self) -> Row {
        let m = Self::meta();
        Row::default()
            .with(&m.item_id, &self.item_id)
            .with(&m.name, &self.name)
    }
}

/// Ids are reserved 10 at a time from the `TICKET` row of `ID_GENERATOR`.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub ticket_id: i64,
    pub code: String,
}

pub struct TicketMeta {
    pub table: TableRef,
    pub ticket_id: Column<i64>,
    pub code: Column<String>,
}

impl Entity for Ticket {
    type Meta = TicketMeta;

    fn meta() -> TicketMeta {
        let table = TableDescriptor::new("TICKET").into_ref();
        TicketMeta {
            ticket_id: Column::new(&table, "TICKET_ID"),
            code: Column::new(&table, "CODE"),
            table,
        }
    }

    fn metamodel() -> EntityMetamodel {
        let m = Self::meta();
        EntityMetamodel::new(&m.table)
            .id(&m.ticket_id)
            .column(&m.code)
            .id_generator(IdGenerator::table("ID_GENERATOR", "KEY", "VALUE", "TICKET", 10))
    }

    fn from_row(row: &Row) -> Result<Self> {
        let m = Self::meta();
        Ok(Self {
            ticket_id: row.value(&m.ticket_id)?,
            code: row.value(&m.code)?,
        })
    }

    fn to_row(&self) -> Row {
        let m = Self::meta();
        Row::default()
            .with(&m.ticket_id, &self.ticket_id)
            .with(&m.code, &self.code)
    }
}
