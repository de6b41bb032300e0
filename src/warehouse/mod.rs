//! Destination table access: the `Warehouse` backend seam and the `TableManager`
//! that implements the schema check and full-replace load on top of it.

use std::fmt;
use std::sync::Arc;

use anyhow::{Result as AnyResult, bail};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use strum_macros::{Display, EnumString};
use tracing::{error, info};

use crate::error::SyncError;
use crate::model::attendance::AttendanceRecord;
use crate::model::schema::{Column, DESTINATION_COLUMNS};

#[cfg(test)]
pub mod memory;
pub mod mysql;

/// `schema.table`, schema optional.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn parse(raw: &str) -> AnyResult<Self> {
        let parts: Vec<&str> = raw.trim().split('.').collect();
        let (schema, name) = match parts.as_slice() {
            [name] => (None, *name),
            [schema, name] => (Some(*schema), *name),
            _ => bail!("expected `table` or `schema.table`"),
        };
        for ident in schema.iter().chain(std::iter::once(&name)) {
            if !is_identifier(ident) {
                bail!("`{ident}` is not a valid identifier");
            }
        }
        Ok(Self {
            schema: schema.map(str::to_string),
            name: name.to_string(),
        })
    }

    /// Backtick quoted form for interpolation into SQL.
    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("`{schema}`.`{}`", self.name),
            None => format!("`{}`", self.name),
        }
    }

    /// Sibling table in the same schema.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self {
            schema: self.schema.clone(),
            name: format!("{}{suffix}", self.name),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// How `replace_all` swaps the batch in.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum LoadStrategy {
    /// Delete every row, then insert. The table is empty if the insert fails.
    #[default]
    DeleteInsert,
    /// Load a staging copy and rename it over the destination.
    StagedSwap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSummary {
    pub total_rows: i64,
    pub last_load: Option<NaiveDateTime>,
    pub distinct_clients: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableStatus {
    Missing,
    Present(TableSummary),
}

#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn table_exists(&self, table: &TableRef) -> Result<bool, sqlx::Error>;

    async fn create_table(&self, table: &TableRef, columns: &[Column]) -> Result<(), sqlx::Error>;

    /// Removes every row, returning how many were deleted.
    async fn delete_all(&self, table: &TableRef) -> Result<u64, sqlx::Error>;

    async fn insert_rows(
        &self,
        table: &TableRef,
        rows: &[AttendanceRecord],
    ) -> Result<u64, sqlx::Error>;

    /// Replaces the table contents with `rows` in one visible step.
    async fn swap_in(&self, table: &TableRef, rows: &[AttendanceRecord])
    -> Result<u64, sqlx::Error>;

    /// Row count, latest `fecha_carga` and distinct `cliente_rol` count.
    async fn summarize(&self, table: &TableRef) -> Result<TableSummary, sqlx::Error>;
}

/// Owns the destination table on behalf of the sync endpoints.
#[derive(Clone)]
pub struct TableManager {
    warehouse: Arc<dyn Warehouse>,
    table: TableRef,
    strategy: LoadStrategy,
}

impl TableManager {
    pub fn new(warehouse: Arc<dyn Warehouse>, table: TableRef, strategy: LoadStrategy) -> Self {
        Self {
            warehouse,
            table,
            strategy,
        }
    }

    pub fn table(&self) -> &TableRef {
        &self.table
    }

    /// Creates the destination table when it is missing. Returns `false` on any failure.
    pub async fn ensure_schema(&self) -> bool {
        match self.warehouse.table_exists(&self.table).await {
            Ok(true) => {
                info!(table = %self.table, "Destination table exists");
                return true;
            }
            Ok(false) => info!(table = %self.table, "Destination table missing, creating it"),
            Err(e) => {
                error!(error = %e, table = %self.table, "Failed to check destination table");
                return false;
            }
        }

        match self
            .warehouse
            .create_table(&self.table, &DESTINATION_COLUMNS)
            .await
        {
            Ok(()) => {
                info!(table = %self.table, "Destination table created");
                true
            }
            Err(e) => {
                error!(error = %e, table = %self.table, "Failed to create destination table");
                false
            }
        }
    }

    /// Replaces every row of the destination table with `rows`.
    ///
    /// With [`LoadStrategy::DeleteInsert`] the two steps are not atomic: a failed
    /// insert leaves the table empty.
    pub async fn replace_all(&self, rows: &[AttendanceRecord]) -> Result<u64, SyncError> {
        let inserted = match self.strategy {
            LoadStrategy::DeleteInsert => {
                let deleted = self.warehouse.delete_all(&self.table).await.map_err(|e| {
                    error!(error = %e, table = %self.table, "Failed to delete previous rows");
                    e
                })?;
                info!(deleted, table = %self.table, "Previous rows deleted");

                self.warehouse
                    .insert_rows(&self.table, rows)
                    .await
                    .map_err(|e| {
                        error!(error = %e, table = %self.table, "Failed to insert rows");
                        e
                    })?
            }
            LoadStrategy::StagedSwap => {
                self.warehouse
                    .swap_in(&self.table, rows)
                    .await
                    .map_err(|e| {
                        error!(error = %e, table = %self.table, "Staged swap failed");
                        e
                    })?
            }
        };

        info!(inserted, strategy = %self.strategy, table = %self.table, "Rows replaced");
        Ok(inserted)
    }

    pub async fn status(&self) -> Result<TableStatus, SyncError> {
        if !self.warehouse.table_exists(&self.table).await? {
            return Ok(TableStatus::Missing);
        }
        let summary = self.warehouse.summarize(&self.table).await?;
        Ok(TableStatus::Present(summary))
    }
}
