//! An in-memory [`KvBackend`] mock: no files, no locks beyond a single
//! `std::sync::Mutex`, used to exercise the repository's logic in unit
//! tests without paying for a real embedded store (see the "Backend
//! substitution" design note).

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Mutex;
use std::sync::MutexGuard;

use super::KvBackend;
use super::KvTransaction;
use super::Row;

type Table = BTreeMap<Vec<u8>, Vec<u8>>;

#[derive(Default)]
struct Tables {
    block: Table,
    tx_index: Table,
    meta: Table,
}

impl Tables {
    fn table_mut(&mut self, name: &str) -> &mut Table {
        match name {
            crate::schema::TABLE_BLOCK => &mut self.block,
            crate::schema::TABLE_TX_INDEX => &mut self.tx_index,
            crate::schema::TABLE_META => &mut self.meta,
            other => panic!("unknown table {other}"),
        }
    }

    fn table(&self, name: &str) -> &Table {
        match name {
            crate::schema::TABLE_BLOCK => &self.block,
            crate::schema::TABLE_TX_INDEX => &self.tx_index,
            crate::schema::TABLE_META => &self.meta,
            other => panic!("unknown table {other}"),
        }
    }
}

/// A process-local, in-memory backend. Since there is nothing to persist
/// across restarts, a single global lock stands in for the real backend's
/// table-scoped locking.
#[derive(Default)]
pub struct MemoryBackend {
    tables: Mutex<Tables>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend::default()
    }
}

pub struct MemoryTxn<'a> {
    guard: MutexGuard<'a, Tables>,
    lazy: bool,
    // Buffers writes so a dropped (uncommitted) write transaction leaves no
    // trace, matching the crash-atomicity contract of a real backend.
    staged: Option<Staged>,
}

#[derive(Default)]
struct Staged {
    inserts: Vec<(&'static str, Vec<u8>, Vec<u8>)>,
    removes: Vec<(&'static str, Vec<u8>)>,
    truncates: Vec<&'static str>,
}

impl<'a> KvTransaction for MemoryTxn<'a> {
    type Error = Infallible;

    fn synchronize(&mut self, _tables: &[&'static str]) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_lazy(&mut self, lazy: bool) {
        self.lazy = lazy;
    }

    fn select(&self, table: &'static str, key: &[u8]) -> Result<Row, Self::Error> {
        match self.guard.table(table).get(key) {
            None => Ok(Row::absent()),
            Some(_) if self.lazy => Ok(Row::exists_only()),
            Some(value) => Ok(Row::with_value(value.clone())),
        }
    }

    fn insert(&mut self, table: &'static str, key: &[u8], value: &[u8]) -> Result<(), Self::Error> {
        self.staged
            .get_or_insert_with(Staged::default)
            .inserts
            .push((table, key.to_vec(), value.to_vec()));
        Ok(())
    }

    fn remove_key(&mut self, table: &'static str, key: &[u8]) -> Result<(), Self::Error> {
        self.staged
            .get_or_insert_with(Staged::default)
            .removes
            .push((table, key.to_vec()));
        Ok(())
    }

    fn remove_all(&mut self, table: &'static str) -> Result<(), Self::Error> {
        self.staged
            .get_or_insert_with(Staged::default)
            .truncates
            .push(table);
        Ok(())
    }

    fn count(&self, table: &'static str) -> Result<u64, Self::Error> {
        Ok(self.guard.table(table).len() as u64)
    }

    fn select_forward(&self, table: &'static str) -> Result<Vec<(Vec<u8>, Vec<u8>)>, Self::Error> {
        Ok(self
            .guard
            .table(table)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn commit(mut self) -> Result<(), Self::Error> {
        if let Some(staged) = self.staged.take() {
            for table in staged.truncates {
                self.guard.table_mut(table).clear();
            }
            for (table, key) in staged.removes {
                self.guard.table_mut(table).remove(&key);
            }
            for (table, key, value) in staged.inserts {
                self.guard.table_mut(table).insert(key, value);
            }
        }
        Ok(())
    }
}

impl KvBackend for MemoryBackend {
    type Error = Infallible;
    type Txn<'a>
        = MemoryTxn<'a>
    where
        Self: 'a;

    fn begin(&self, _write: bool) -> Result<Self::Txn<'_>, Self::Error> {
        Ok(MemoryTxn {
            guard: self.tables.lock().expect("memory backend lock poisoned"),
            lazy: true,
            staged: None,
        })
    }
}
