use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{MySql, MySqlPool, QueryBuilder};
use tracing::{debug, warn};

use super::{TableRef, TableSummary, Warehouse};
use crate::model::attendance::AttendanceRecord;
use crate::model::schema::{Column, DESTINATION_COLUMNS};

/// Rows per INSERT statement.
const INSERT_CHUNK: usize = 500;

pub struct MySqlWarehouse {
    pool: MySqlPool,
}

impl MySqlWarehouse {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

pub fn create_table_sql(table: &TableRef, columns: &[Column]) -> String {
    let definitions = columns
        .iter()
        .map(|c| format!("`{}` {}", c.name, c.kind.sql_type()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE IF NOT EXISTS {} ({definitions})", table.quoted())
}

fn insert_prefix(table: &TableRef) -> String {
    let columns = DESTINATION_COLUMNS
        .iter()
        .map(|c| format!("`{}`", c.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {} ({columns}) ", table.quoted())
}

#[async_trait]
impl Warehouse for MySqlWarehouse {
    async fn table_exists(&self, table: &TableRef) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM information_schema.tables
            WHERE table_schema = COALESCE(?, DATABASE())
            AND table_name = ?
            "#,
        )
        .bind(table.schema.as_deref())
        .bind(table.name.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn create_table(&self, table: &TableRef, columns: &[Column]) -> Result<(), sqlx::Error> {
        sqlx::query(&create_table_sql(table, columns))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_all(&self, table: &TableRef) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(&format!("DELETE FROM {}", table.quoted()))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_rows(
        &self,
        table: &TableRef,
        rows: &[AttendanceRecord],
    ) -> Result<u64, sqlx::Error> {
        let mut inserted = 0;

        for chunk in rows.chunks(INSERT_CHUNK) {
            let mut builder = QueryBuilder::<MySql>::new(insert_prefix(table));
            // Bind order follows DESTINATION_COLUMNS.
            builder.push_values(chunk, |mut b, row| {
                b.push_bind(row.rut_rol)
                    .push_bind(row.nombre_rol.as_deref())
                    .push_bind(row.instalacion_rol.as_deref())
                    .push_bind(row.hora_ingreso_oficial)
                    .push_bind(row.ult_log_marca_asistencia)
                    .push_bind(row.metodo_usuario_marcaje.as_deref())
                    .push_bind(row.cliente_rol.as_deref())
                    .push_bind(row.tipo_turno.as_deref())
                    .push_bind(row.cod_turno.as_deref())
                    .push_bind(row.hora_salida_oficial)
                    .push_bind(row.horas_totales_turno)
                    .push_bind(row.horas_totales_asistencia)
                    .push_bind(row.fecha_carga)
                    .push_bind(row.origen_datos.as_deref())
                    .push_bind(row.fecha_marca_entrada)
                    .push_bind(row.fecha_marca_salida);
            });

            let result = builder.build().execute(&self.pool).await?;
            inserted += result.rows_affected();
            debug!(chunk = chunk.len(), table = %table, "Inserted chunk");
        }

        Ok(inserted)
    }

    async fn swap_in(
        &self,
        table: &TableRef,
        rows: &[AttendanceRecord],
    ) -> Result<u64, sqlx::Error> {
        let staging = table.with_suffix("__staging");
        let retired = table.with_suffix("__old");

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", staging.quoted()))
            .execute(&self.pool)
            .await?;
        sqlx::query(&format!(
            "CREATE TABLE {} LIKE {}",
            staging.quoted(),
            table.quoted()
        ))
        .execute(&self.pool)
        .await?;

        let inserted = match self.insert_rows(&staging, rows).await {
            Ok(n) => n,
            Err(e) => {
                if let Err(drop_err) = sqlx::query(&format!("DROP TABLE IF EXISTS {}", staging.quoted()))
                    .execute(&self.pool)
                    .await
                {
                    warn!(error = %drop_err, table = %staging, "Failed to drop staging table");
                }
                return Err(e);
            }
        };

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", retired.quoted()))
            .execute(&self.pool)
            .await?;
        // Both renames happen atomically.
        sqlx::query(&format!(
            "RENAME TABLE {table} TO {retired}, {staging} TO {table}",
            table = table.quoted(),
            retired = retired.quoted(),
            staging = staging.quoted(),
        ))
        .execute(&self.pool)
        .await?;
        sqlx::query(&format!("DROP TABLE {}", retired.quoted()))
            .execute(&self.pool)
            .await?;

        Ok(inserted)
    }

    async fn summarize(&self, table: &TableRef) -> Result<TableSummary, sqlx::Error> {
        let (total_rows, last_load, distinct_clients) =
            sqlx::query_as::<_, (i64, Option<NaiveDateTime>, i64)>(&format!(
                r#"
                SELECT
                    COUNT(*),
                    MAX(fecha_carga),
                    COUNT(DISTINCT cliente_rol)
                FROM {}
                "#,
                table.quoted()
            ))
            .fetch_one(&self.pool)
            .await?;

        Ok(TableSummary {
            total_rows,
            last_load,
            distinct_clients,
        })
    }
}
