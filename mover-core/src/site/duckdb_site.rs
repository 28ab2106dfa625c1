use crate::error::{MoverError, Result};
use duckdb::{Connection, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// 导出时读取到的单元格值
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Text(String),
    Blob(Vec<u8>),
}

/// 站点在线数据库
///
/// 调用均为阻塞调用，流水线在 `spawn_blocking` 中使用。
pub trait SiteDatabase: Send + Sync {
    /// 所有用户表，按名称排序
    fn list_tables(&self) -> Result<Vec<String>>;
    /// 建表语句（不含结尾分号）
    fn create_statement(&self, table: &str) -> Result<String>;
    /// 表中全部行，列顺序与建表语句一致
    fn table_rows(&self, table: &str) -> Result<Vec<Vec<SqlValue>>>;
    /// 执行一条或多条语句
    fn execute(&self, sql: &str) -> Result<()>;
}

/// DuckDB 站点数据库
pub struct DuckDbSite {
    connection: Mutex<Connection>,
}

/// 读取列值时使用的类型
#[derive(Debug, Clone, Copy)]
enum ColumnKind {
    Integer,
    Real,
    Boolean,
    Blob,
    Text,
}

impl ColumnKind {
    fn from_data_type(data_type: &str) -> Self {
        match data_type.to_uppercase().as_str() {
            "TINYINT" | "SMALLINT" | "INTEGER" | "BIGINT" | "UTINYINT" | "USMALLINT"
            | "UINTEGER" => Self::Integer,
            "FLOAT" | "REAL" | "DOUBLE" => Self::Real,
            "BOOLEAN" => Self::Boolean,
            "BLOB" => Self::Blob,
            _ => Self::Text,
        }
    }

    fn cast_target(&self) -> &'static str {
        match self {
            Self::Integer => "BIGINT",
            Self::Real => "DOUBLE",
            Self::Boolean => "BOOLEAN",
            Self::Blob => "BLOB",
            Self::Text => "VARCHAR",
        }
    }
}

/// 双引号包裹标识符
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

impl DuckDbSite {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = Connection::open(path)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory()?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.connection
            .lock()
            .map_err(|_| MoverError::custom("站点数据库连接锁已损坏"))
    }

    fn columns(conn: &Connection, table: &str) -> Result<Vec<(String, ColumnKind)>> {
        let mut stmt = conn.prepare(
            "SELECT column_name, data_type FROM information_schema.columns
             WHERE table_schema = 'main' AND table_name = ?
             ORDER BY ordinal_position",
        )?;
        let rows = stmt.query_map(params![table], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut columns = Vec::new();
        for row in rows {
            let (name, data_type) = row?;
            columns.push((name, ColumnKind::from_data_type(&data_type)));
        }
        Ok(columns)
    }
}

impl SiteDatabase for DuckDbSite {
    fn list_tables(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT table_name FROM information_schema.tables
             WHERE table_schema = 'main' AND table_type = 'BASE TABLE'
             ORDER BY table_name",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut tables = Vec::new();
        for row in rows {
            tables.push(row?);
        }
        Ok(tables)
    }

    fn create_statement(&self, table: &str) -> Result<String> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT sql FROM duckdb_tables() WHERE schema_name = 'main' AND table_name = ?",
        )?;
        let mut rows = stmt.query(params![table])?;

        match rows.next()? {
            Some(row) => {
                let sql: String = row.get(0)?;
                Ok(sql.trim().trim_end_matches(';').trim_end().to_string())
            }
            None => Err(MoverError::database_export(format!("表不存在: {table}"))),
        }
    }

    fn table_rows(&self, table: &str) -> Result<Vec<Vec<SqlValue>>> {
        let conn = self.lock()?;
        let columns = Self::columns(&conn, table)?;
        if columns.is_empty() {
            return Ok(Vec::new());
        }

        let select_list = columns
            .iter()
            .map(|(name, kind)| format!("CAST({} AS {})", quote_ident(name), kind.cast_target()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {select_list} FROM {}", quote_ident(table));
        debug!("读取表数据: {}", sql);

        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut result = Vec::new();

        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for (index, (_, kind)) in columns.iter().enumerate() {
                let value = match kind {
                    ColumnKind::Integer => row
                        .get::<_, Option<i64>>(index)?
                        .map_or(SqlValue::Null, SqlValue::Integer),
                    ColumnKind::Real => row
                        .get::<_, Option<f64>>(index)?
                        .map_or(SqlValue::Null, SqlValue::Real),
                    ColumnKind::Boolean => row
                        .get::<_, Option<bool>>(index)?
                        .map_or(SqlValue::Null, SqlValue::Boolean),
                    ColumnKind::Blob => row
                        .get::<_, Option<Vec<u8>>>(index)?
                        .map_or(SqlValue::Null, SqlValue::Blob),
                    ColumnKind::Text => row
                        .get::<_, Option<String>>(index)?
                        .map_or(SqlValue::Null, SqlValue::Text),
                };
                values.push(value);
            }
            result.push(values);
        }

        Ok(result)
    }

    fn execute(&self, sql: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)?;
        Ok(())
    }
}
