use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{TableRef, TableSummary, Warehouse};
use crate::model::attendance::AttendanceRecord;
use crate::model::schema::Column;

/// In-process stand-in for the MySQL warehouse, with failure switches.
#[derive(Default)]
pub struct MemoryWarehouse {
    rows: Mutex<Option<Vec<AttendanceRecord>>>,
    create_calls: AtomicUsize,
    replace_calls: AtomicUsize,
    fail_create: AtomicBool,
    fail_inserts: AtomicBool,
}

impl MemoryWarehouse {
    pub fn rows(&self) -> Vec<AttendanceRecord> {
        self.rows.lock().unwrap().clone().unwrap_or_default()
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Deletes, inserts and swaps.
    pub fn replace_calls(&self) -> usize {
        self.replace_calls.load(Ordering::SeqCst)
    }

    pub fn fail_create(&self) {
        self.fail_create.store(true, Ordering::SeqCst);
    }

    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    fn check_inserts(&self) -> Result<(), sqlx::Error> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(sqlx::Error::Protocol("insert rejected".into()));
        }
        Ok(())
    }
}

fn missing(table: &TableRef) -> sqlx::Error {
    sqlx::Error::Protocol(format!("table {table} doesn't exist"))
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn table_exists(&self, _table: &TableRef) -> Result<bool, sqlx::Error> {
        Ok(self.rows.lock().unwrap().is_some())
    }

    async fn create_table(&self, _table: &TableRef, _columns: &[Column]) -> Result<(), sqlx::Error> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(sqlx::Error::Protocol("access denied".into()));
        }
        self.rows.lock().unwrap().get_or_insert_with(Vec::new);
        Ok(())
    }

    async fn delete_all(&self, table: &TableRef) -> Result<u64, sqlx::Error> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.rows.lock().unwrap();
        let rows = guard.as_mut().ok_or_else(|| missing(table))?;
        let deleted = rows.len() as u64;
        rows.clear();
        Ok(deleted)
    }

    async fn insert_rows(
        &self,
        table: &TableRef,
        rows: &[AttendanceRecord],
    ) -> Result<u64, sqlx::Error> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);
        self.check_inserts()?;
        let mut guard = self.rows.lock().unwrap();
        let stored = guard.as_mut().ok_or_else(|| missing(table))?;
        stored.extend_from_slice(rows);
        Ok(rows.len() as u64)
    }

    async fn swap_in(
        &self,
        table: &TableRef,
        rows: &[AttendanceRecord],
    ) -> Result<u64, sqlx::Error> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);
        self.check_inserts()?;
        let mut guard = self.rows.lock().unwrap();
        let stored = guard.as_mut().ok_or_else(|| missing(table))?;
        *stored = rows.to_vec();
        Ok(rows.len() as u64)
    }

    async fn summarize(&self, table: &TableRef) -> Result<TableSummary, sqlx::Error> {
        let guard = self.rows.lock().unwrap();
        let rows = guard.as_ref().ok_or_else(|| missing(table))?;
        let clients: HashSet<_> = rows.iter().filter_map(|r| r.cliente_rol.as_ref()).collect();
        Ok(TableSummary {
            total_rows: rows.len() as i64,
            last_load: rows.iter().filter_map(|r| r.fecha_carga).max(),
            distinct_clients: clients.len() as i64,
        })
    }
}
