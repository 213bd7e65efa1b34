use std::any::{type_name, Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::dialect::Dialect;
use crate::error::{BuildError, RelqError, Result};
use crate::traits::{Entity, EntityMetamodel};
use crate::types::{Row, SqlValue};

type Erased = Arc<dyn Any + Send + Sync>;
type Fold = Arc<dyn Fn(&Erased, &Erased) -> Result<Erased> + Send + Sync>;

fn decode<J: Entity>(row: &Row) -> Result<Erased> {
    Ok(Arc::new(J::from_row(row)?))
}

fn downcast<T: Entity>(entity: &Erased) -> Result<T> {
    entity
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| RelqError::Mapping(format!("expected {}", type_name::<T>())))
}

/// One entity type of a select, occupying a run of projected columns.
#[derive(Clone)]
pub(crate) struct Slot {
    meta: EntityMetamodel,
    type_id: TypeId,
    names: Vec<String>,
    id_positions: Vec<usize>,
    decode: fn(&Row) -> Result<Erased>,
}

impl Slot {
    pub fn of<J: Entity>(meta: EntityMetamodel) -> Self {
        let names = meta.columns().iter().map(|c| c.name.clone()).collect();
        let id_positions = meta
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, c)| meta.is_id(c))
            .map(|(i, _)| i)
            .collect();
        Self {
            meta,
            type_id: TypeId::of::<J>(),
            names,
            id_positions,
            decode: decode::<J>,
        }
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    /// The slot's columns of a result row, starting at `offset`.
    pub fn row(&self, dialect: &dyn Dialect, values: &[SqlValue], offset: usize) -> Result<Row> {
        Ok(Row::new(&self.names, self.values(dialect, values, offset)?))
    }

    fn values(&self, dialect: &dyn Dialect, values: &[SqlValue], offset: usize) -> Result<Vec<SqlValue>> {
        self.meta
            .columns()
            .iter()
            .enumerate()
            .map(|(i, column)| dialect.value_of(values, offset + i, column.sql_type))
            .collect()
    }

    /// Identity key and entity, or `None` when an outer join found nothing.
    fn read(
        &self,
        dialect: &dyn Dialect,
        values: &[SqlValue],
        offset: usize,
    ) -> Result<Option<(Vec<SqlValue>, Erased)>> {
        let values = self.values(dialect, values, offset)?;
        let key: Vec<SqlValue> = if self.id_positions.is_empty() {
            values.clone()
        } else {
            self.id_positions.iter().map(|&i| values[i].clone()).collect()
        };
        if key.iter().all(SqlValue::is_null) {
            return Ok(None);
        }
        let entity = (self.decode)(&Row::new(&self.names, values))?;
        Ok(Some((key, entity)))
    }
}

/// A declared link folding a `B` into the `A` it was joined with.
pub(crate) struct Association {
    left: TypeId,
    right: TypeId,
    left_name: &'static str,
    right_name: &'static str,
    fold: Fold,
}

impl Association {
    pub fn new<A: Entity, B: Entity>(f: impl Fn(A, &B) -> A + Send + Sync + 'static) -> Self {
        let fold: Fold = Arc::new(move |a: &Erased, b: &Erased| {
            let a = downcast::<A>(a)?;
            let b = downcast::<B>(b)?;
            Ok(Arc::new(f(a, &b)) as Erased)
        });
        Self {
            left: TypeId::of::<A>(),
            right: TypeId::of::<B>(),
            left_name: type_name::<A>(),
            right_name: type_name::<B>(),
            fold,
        }
    }

    /// Slot indexes of both sides. For a self join the right side is the
    /// last matching slot other than the left one.
    fn resolve(&self, slots: &[Slot]) -> Result<(usize, usize)> {
        let left = slots
            .iter()
            .position(|s| s.type_id == self.left)
            .ok_or_else(|| BuildError::UnknownEntity(self.left_name.to_string()))?;
        let right = slots
            .iter()
            .enumerate()
            .rev()
            .find(|(i, s)| s.type_id == self.right && *i != left)
            .or_else(|| slots.iter().enumerate().find(|(_, s)| s.type_id == self.right))
            .map(|(i, _)| i)
            .ok_or_else(|| BuildError::UnknownEntity(self.right_name.to_string()))?;
        Ok((left, right))
    }
}

/// Checks every association against the slots before anything is executed.
pub(crate) fn plan(associations: &[Association], slots: &[Slot]) -> Result<Vec<(usize, usize)>> {
    associations.iter().map(|a| a.resolve(slots)).collect()
}

#[derive(Default)]
struct Entities {
    index: HashMap<Vec<SqlValue>, usize>,
    values: Vec<Erased>,
}

impl Entities {
    /// The first entity seen for a key wins.
    fn insert(&mut self, key: Vec<SqlValue>, entity: Erased) -> usize {
        if let Some(&i) = self.index.get(&key) {
            return i;
        }
        self.values.push(entity);
        self.index.insert(key, self.values.len() - 1);
        self.values.len() - 1
    }
}

/// Entities of every slot, deduplicated by id, plus which of them shared a row.
pub(crate) struct EntityStore {
    slots: Vec<Entities>,
    rows: Vec<Vec<Option<usize>>>,
}

impl EntityStore {
    pub fn load(slots: &[Slot], dialect: &dyn Dialect, rows: &[Vec<SqlValue>]) -> Result<Self> {
        let mut store = Self {
            slots: slots.iter().map(|_| Entities::default()).collect(),
            rows: Vec::with_capacity(rows.len()),
        };
        for values in rows {
            let mut offset = 0;
            let mut refs = Vec::with_capacity(slots.len());
            for (i, slot) in slots.iter().enumerate() {
                let read = slot.read(dialect, values, offset)?;
                refs.push(read.map(|(key, entity)| store.slots[i].insert(key, entity)));
                offset += slot.width();
            }
            store.rows.push(refs);
        }
        Ok(store)
    }

    /// Folds each distinct right entity into its left entity, in row order.
    pub fn apply(&mut self, association: &Association, left: usize, right: usize) -> Result<()> {
        let mut seen = HashSet::new();
        for refs in &self.rows {
            let (Some(a), Some(b)) = (refs[left], refs[right]) else {
                continue;
            };
            if !seen.insert((a, b)) {
                continue;
            }
            let folded = (association.fold)(&self.slots[left].values[a], &self.slots[right].values[b])?;
            self.slots[left].values[a] = folded;
        }
        Ok(())
    }

    /// Main entities in first-seen order.
    pub fn roots<E: Entity>(&self) -> Result<Vec<E>> {
        match self.slots.first() {
            Some(main) => main.values.iter().map(downcast::<E>).collect(),
            None => Ok(Vec::new()),
        }
    }
}
