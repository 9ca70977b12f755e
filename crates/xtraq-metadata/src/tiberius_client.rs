//! `tiberius`-backed `MetadataClient` implementation.
//!
//! Connection handling follows the same shape as a plain ADO.NET-string
//! `tiberius` client: parse the connection string, open a TCP stream,
//! wrap it for tokio-util compatibility, then hand it to `Client::connect`.

use async_trait::async_trait;
use tiberius::{Client, Config, Query};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::instrument;

use xtraq_common::error::{Error, Result};

use crate::client::MetadataClient;
use crate::retry::RetryPolicy;
use crate::rows::{
    FunctionReturnRow, ParameterRow, ProcedureRow, SchemaRow, TableColumnRow, TableTypeRow, UserDefinedTypeRow,
};

type TiberiusClient = Client<Compat<TcpStream>>;

pub struct SqlServerMetadataClient {
    connection_string: String,
    retry: RetryPolicy,
    client: Mutex<Option<TiberiusClient>>,
}

impl SqlServerMetadataClient {
    pub fn new(connection_string: impl Into<String>, retry: RetryPolicy) -> Self {
        SqlServerMetadataClient {
            connection_string: connection_string.into(),
            retry,
            client: Mutex::new(None),
        }
    }

    #[instrument(skip(self), fields(attempt))]
    async fn connect(&self) -> Result<TiberiusClient> {
        let connection_string = self.connection_string.clone();
        self.retry
            .open_with_retry(move || {
                let connection_string = connection_string.clone();
                async move {
                    let config = Config::from_ado_string(&connection_string)
                        .map_err(|e| Error::Config(format!("invalid connection string: {e}")))?;

                    let tcp = TcpStream::connect(config.get_addr())
                        .await
                        .map_err(|e| Error::Connection(e.to_string()))?;
                    tcp.set_nodelay(true).map_err(|e| Error::Connection(e.to_string()))?;

                    Client::connect(config, tcp.compat_write())
                        .await
                        .map_err(|e| Error::Connection(format!("handshake/login failed: {e}")))
                }
            })
            .await
    }

    async fn with_client<F, T>(&self, f: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut TiberiusClient) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<T>> + Send + 'a>>,
    {
        let mut guard = self.client.lock().await;
        if guard.is_none() {
            *guard = Some(self.connect().await?);
        }
        let client = guard.as_mut().expect("just populated");
        f(client).await
    }

    async fn query_rows(&self, sql: String) -> Result<Vec<tiberius::Row>> {
        self.with_client(move |client| {
            Box::pin(async move {
                let stream = client
                    .query(sql.as_str(), &[])
                    .await
                    .map_err(|e| Error::Query(e.to_string()))?;
                stream
                    .into_first_result()
                    .await
                    .map_err(|e| Error::Query(e.to_string()))
            })
        })
        .await
    }

    async fn query_rows_bound(&self, sql: String, params: Vec<String>) -> Result<Vec<tiberius::Row>> {
        self.with_client(move |client| {
            Box::pin(async move {
                let mut query = Query::new(sql.as_str());
                for param in &params {
                    query.bind(param.as_str());
                }
                let stream = query
                    .query(client)
                    .await
                    .map_err(|e| Error::Query(e.to_string()))?;
                stream
                    .into_first_result()
                    .await
                    .map_err(|e| Error::Query(e.to_string()))
            })
        })
        .await
    }
}

fn col_str(row: &tiberius::Row, idx: usize) -> Option<String> {
    row.try_get::<&str, _>(idx).ok().flatten().map(|s| s.to_string())
}

fn col_i32(row: &tiberius::Row, idx: usize) -> Option<i32> {
    row.try_get::<i32, _>(idx).ok().flatten()
}

fn col_i64(row: &tiberius::Row, idx: usize) -> Option<i64> {
    row.try_get::<i64, _>(idx).ok().flatten()
}

fn col_u8(row: &tiberius::Row, idx: usize) -> Option<u8> {
    row.try_get::<u8, _>(idx).ok().flatten()
}

fn col_bool(row: &tiberius::Row, idx: usize) -> bool {
    row.try_get::<bool, _>(idx).ok().flatten().unwrap_or(false)
}

const SCHEMA_DENYLIST: &[&str] = &[
    "sys", "INFORMATION_SCHEMA", "db_owner", "db_accessadmin", "db_securityadmin",
    "db_ddladmin", "db_backupoperator", "db_datareader", "db_datawriter",
    "db_denydatareader", "db_denydatawriter", "guest",
];

#[async_trait]
impl MetadataClient for SqlServerMetadataClient {
    async fn list_schemas(&self) -> Result<Vec<SchemaRow>> {
        let rows = self
            .query_rows("SELECT name FROM sys.schemas ORDER BY name".to_string())
            .await?;
        Ok(rows
            .iter()
            .filter_map(|r| col_str(r, 0))
            .filter(|name| !SCHEMA_DENYLIST.contains(&name.as_str()))
            .map(|name| SchemaRow { name })
            .collect())
    }

    async fn list_procedures(&self, schema_filter: &[String]) -> Result<Vec<ProcedureRow>> {
        let mut sql = String::from(
            "SELECT s.name, p.name, CAST(DATEDIFF_BIG(MILLISECOND, '1970-01-01', o.modify_date) AS BIGINT) \
             FROM sys.procedures p \
             JOIN sys.schemas s ON s.schema_id = p.schema_id \
             JOIN sys.objects o ON o.object_id = p.object_id",
        );
        if !schema_filter.is_empty() {
            let list = schema_filter
                .iter()
                .map(|s| format!("'{}'", s.replace('\'', "''")))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" WHERE s.name IN ({list})"));
        }
        sql.push_str(" ORDER BY s.name, p.name");
        let rows = self.query_rows(sql).await?;
        Ok(rows
            .iter()
            .filter_map(|r| {
                Some(ProcedureRow {
                    schema: col_str(r, 0)?,
                    name: col_str(r, 1)?,
                    modified_ticks: col_i64(r, 2).unwrap_or(0),
                })
            })
            .collect())
    }

    async fn get_object_modify_ticks(&self, schema: &str, name: &str) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT CAST(DATEDIFF_BIG(MILLISECOND, '1970-01-01', o.modify_date) AS BIGINT) \
             FROM sys.objects o JOIN sys.schemas s ON s.schema_id = o.schema_id \
             WHERE s.name = @P1 AND o.name = @P2"
        );
        let rows = self.query_rows_bound(sql, vec![schema.to_string(), name.to_string()]).await?;
        Ok(rows.first().and_then(|r| col_i64(r, 0)))
    }

    async fn get_procedure_definition(&self, schema: &str, name: &str) -> Result<Option<String>> {
        let sql = "SELECT OBJECT_DEFINITION(OBJECT_ID(@P1 + '.' + @P2))".to_string();
        let rows = self.query_rows_bound(sql, vec![schema.to_string(), name.to_string()]).await?;
        Ok(rows.first().and_then(|r| col_str(r, 0)))
    }

    async fn list_procedure_inputs(&self, schema: &str, name: &str) -> Result<Vec<ParameterRow>> {
        let sql = "SELECT pa.name, t.name, pa.is_nullable, pa.max_length, pa.precision, pa.scale, \
                    pa.is_output, pa.has_default_value, t.is_table_type, \
                    ts.name, t.name \
                    FROM sys.parameters pa \
                    JOIN sys.procedures p ON p.object_id = pa.object_id \
                    JOIN sys.schemas s ON s.schema_id = p.schema_id \
                    JOIN sys.types t ON t.user_type_id = pa.user_type_id \
                    JOIN sys.schemas ts ON ts.schema_id = t.schema_id \
                    WHERE s.name = @P1 AND p.name = @P2 AND pa.name <> '' \
                    ORDER BY pa.parameter_id"
            .to_string();
        let rows = self.query_rows_bound(sql, vec![schema.to_string(), name.to_string()]).await?;
        Ok(rows
            .iter()
            .filter_map(|r| {
                Some(ParameterRow {
                    name: col_str(r, 0)?.trim_start_matches('@').to_string(),
                    sql_type_name: col_str(r, 1)?,
                    is_nullable: col_bool(r, 2),
                    max_length: col_i32(r, 3),
                    precision: col_u8(r, 4),
                    scale: col_u8(r, 5),
                    is_output: col_bool(r, 6),
                    has_default: col_bool(r, 7),
                    is_table_type: col_bool(r, 8),
                    user_type_schema: col_str(r, 9),
                    user_type_name: col_str(r, 10),
                })
            })
            .collect())
    }

    async fn list_procedure_outputs(&self, schema: &str, name: &str) -> Result<Vec<TableColumnRow>> {
        let sql = "SELECT rs.name, t.name, rs.is_nullable, rs.max_length, rs.precision, rs.scale, rs.column_ordinal \
                    FROM sys.dm_exec_describe_first_result_set_for_object(OBJECT_ID(@P1 + '.' + @P2), 0) rs \
                    LEFT JOIN sys.types t ON t.system_type_id = rs.system_type_id AND t.user_type_id = t.system_type_id \
                    ORDER BY rs.column_ordinal"
            .to_string();
        let rows = self.query_rows_bound(sql, vec![schema.to_string(), name.to_string()]).await?;
        Ok(rows
            .iter()
            .filter_map(|r| {
                Some(TableColumnRow {
                    name: col_str(r, 0)?,
                    sql_type_name: col_str(r, 1).unwrap_or_else(|| "nvarchar".to_string()),
                    is_nullable: col_bool(r, 2),
                    max_length: col_i32(r, 3),
                    precision: col_u8(r, 4),
                    scale: col_u8(r, 5),
                    ordinal_position: col_i32(r, 6).unwrap_or(0),
                })
            })
            .collect())
    }

    async fn list_table_types(&self, schemas: &[String]) -> Result<Vec<TableTypeRow>> {
        let mut sql = String::from(
            "SELECT s.name, tt.name, tt.user_type_id \
             FROM sys.table_types tt JOIN sys.schemas s ON s.schema_id = tt.schema_id",
        );
        if !schemas.is_empty() {
            let list = schemas
                .iter()
                .map(|s| format!("'{}'", s.replace('\'', "''")))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" WHERE s.name IN ({list})"));
        }
        sql.push_str(" ORDER BY s.name, tt.name");
        let rows = self.query_rows(sql).await?;
        Ok(rows
            .iter()
            .filter_map(|r| {
                Some(TableTypeRow {
                    schema: col_str(r, 0)?,
                    name: col_str(r, 1)?,
                    user_type_id: col_i32(r, 2)?,
                })
            })
            .collect())
    }

    async fn list_table_type_columns(&self, user_type_id: i32) -> Result<Vec<TableColumnRow>> {
        let sql = format!(
            "SELECT c.name, t.name, c.is_nullable, c.max_length, c.precision, c.scale, c.column_id \
             FROM sys.columns c \
             JOIN sys.table_types tt ON tt.type_table_object_id = c.object_id \
             JOIN sys.types t ON t.user_type_id = c.user_type_id \
             WHERE tt.user_type_id = {user_type_id} \
             ORDER BY c.column_id"
        );
        let rows = self.query_rows(sql).await?;
        Ok(rows
            .iter()
            .filter_map(|r| {
                Some(TableColumnRow {
                    name: col_str(r, 0)?,
                    sql_type_name: col_str(r, 1)?,
                    is_nullable: col_bool(r, 2),
                    max_length: col_i32(r, 3),
                    precision: col_u8(r, 4),
                    scale: col_u8(r, 5),
                    ordinal_position: col_i32(r, 6).unwrap_or(0),
                })
            })
            .collect())
    }

    async fn list_table_columns(&self, schema: &str, table: &str) -> Result<Vec<TableColumnRow>> {
        let sql = "SELECT c.name, t.name, c.is_nullable, c.max_length, c.precision, c.scale, c.column_id \
                    FROM sys.columns c \
                    JOIN sys.tables tb ON tb.object_id = c.object_id \
                    JOIN sys.schemas s ON s.schema_id = tb.schema_id \
                    JOIN sys.types t ON t.user_type_id = c.user_type_id \
                    WHERE s.name = @P1 AND tb.name = @P2 \
                    ORDER BY c.column_id"
            .to_string();
        let rows = self.query_rows_bound(sql, vec![schema.to_string(), table.to_string()]).await?;
        Ok(rows
            .iter()
            .filter_map(|r| {
                Some(TableColumnRow {
                    name: col_str(r, 0)?,
                    sql_type_name: col_str(r, 1)?,
                    is_nullable: col_bool(r, 2),
                    max_length: col_i32(r, 3),
                    precision: col_u8(r, 4),
                    scale: col_u8(r, 5),
                    ordinal_position: col_i32(r, 6).unwrap_or(0),
                })
            })
            .collect())
    }

    async fn list_function_returns(&self, schema: &str, function: &str) -> Result<Option<FunctionReturnRow>> {
        let sql = "SELECT s.name, o.name, CASE WHEN o.type IN ('TF','IF') THEN 1 ELSE 0 END, t.name \
                    FROM sys.objects o \
                    JOIN sys.schemas s ON s.schema_id = o.schema_id \
                    LEFT JOIN sys.types t ON t.user_type_id = (SELECT TOP 1 user_type_id FROM sys.parameters pa WHERE pa.object_id = o.object_id AND pa.parameter_id = 0) \
                    WHERE s.name = @P1 AND o.name = @P2 AND o.type IN ('FN','TF','IF')"
            .to_string();
        let rows = self.query_rows_bound(sql, vec![schema.to_string(), function.to_string()]).await?;
        Ok(rows.first().map(|r| FunctionReturnRow {
            schema: col_str(r, 0).unwrap_or_default(),
            name: col_str(r, 1).unwrap_or_default(),
            returns_table: col_i32(r, 2).unwrap_or(0) == 1,
            scalar_sql_type_name: col_str(r, 3),
        }))
    }

    async fn list_scalar_functions(&self, schemas: &[String]) -> Result<Vec<FunctionReturnRow>> {
        let mut sql = String::from(
            "SELECT s.name, o.name, 0, t.name \
             FROM sys.objects o \
             JOIN sys.schemas s ON s.schema_id = o.schema_id \
             LEFT JOIN sys.types t ON t.user_type_id = (SELECT TOP 1 user_type_id FROM sys.parameters pa WHERE pa.object_id = o.object_id AND pa.parameter_id = 0) \
             WHERE o.type = 'FN'",
        );
        if !schemas.is_empty() {
            let list = schemas
                .iter()
                .map(|s| format!("'{}'", s.replace('\'', "''")))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" AND s.name IN ({list})"));
        }
        let rows = self.query_rows(sql).await?;
        Ok(rows
            .iter()
            .filter_map(|r| {
                Some(FunctionReturnRow {
                    schema: col_str(r, 0)?,
                    name: col_str(r, 1)?,
                    returns_table: false,
                    scalar_sql_type_name: col_str(r, 3),
                })
            })
            .collect())
    }

    async fn describe_first_result_set(&self, sql_statement: &str) -> Result<Vec<TableColumnRow>> {
        let sql = "SELECT name, system_type_name, is_nullable, max_length, precision, scale, column_ordinal \
                    FROM sys.dm_exec_describe_first_result_set(@P1, NULL, 0) \
                    ORDER BY column_ordinal"
            .to_string();
        let rows = self.query_rows_bound(sql, vec![sql_statement.to_string()]).await?;
        Ok(rows
            .iter()
            .filter_map(|r| {
                Some(TableColumnRow {
                    name: col_str(r, 0)?,
                    sql_type_name: col_str(r, 1).unwrap_or_else(|| "nvarchar".to_string()),
                    is_nullable: col_bool(r, 2),
                    max_length: col_i32(r, 3),
                    precision: col_u8(r, 4),
                    scale: col_u8(r, 5),
                    ordinal_position: col_i32(r, 6).unwrap_or(0),
                })
            })
            .collect())
    }

    async fn get_user_defined_type(&self, schema: &str, name: &str) -> Result<Option<UserDefinedTypeRow>> {
        let sql = "SELECT s.name, ut.name, base.name, ut.max_length, ut.precision, ut.scale, ut.is_nullable \
                    FROM sys.types ut \
                    JOIN sys.schemas s ON s.schema_id = ut.schema_id \
                    JOIN sys.types base ON base.user_type_id = base.system_type_id AND base.system_type_id = ut.system_type_id \
                    WHERE ut.is_user_defined = 1 AND s.name = @P1 AND ut.name = @P2"
            .to_string();
        let rows = self.query_rows_bound(sql, vec![schema.to_string(), name.to_string()]).await?;
        Ok(rows.first().map(|r| UserDefinedTypeRow {
            schema: col_str(r, 0).unwrap_or_default(),
            name: col_str(r, 1).unwrap_or_default(),
            base_sql_type_name: col_str(r, 2).unwrap_or_else(|| "nvarchar".to_string()),
            max_length: col_i32(r, 3),
            precision: col_u8(r, 4),
            scale: col_u8(r, 5),
            is_nullable: Some(col_bool(r, 6)),
        }))
    }
}
