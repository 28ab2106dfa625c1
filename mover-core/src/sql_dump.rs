//! 逻辑 SQL 导出与回放
//!
//! 每张表输出 `DROP TABLE IF EXISTS`、`CREATE TABLE` 与一条多行 `INSERT`。
//! 回放时按语句结束符切分，引号与注释内的分号不会被当作分隔符。

use crate::error::{MoverError, Result};
use crate::site::{SiteDatabase, SqlValue, quote_ident};
use chrono::Utc;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// 导出统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpStats {
    pub tables: usize,
    pub rows: usize,
}

/// 单个值转为 SQL 字面量
pub fn sql_literal(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Integer(v) => v.to_string(),
        SqlValue::Real(v) if v.is_nan() => "'NaN'".to_string(),
        SqlValue::Real(v) if v.is_infinite() => {
            if v.is_sign_positive() {
                "'Infinity'".to_string()
            } else {
                "'-Infinity'".to_string()
            }
        }
        SqlValue::Real(v) => format!("{v:?}"),
        SqlValue::Boolean(v) => if *v { "TRUE" } else { "FALSE" }.to_string(),
        SqlValue::Text(v) => format!("'{}'", v.replace('\'', "''")),
        SqlValue::Blob(bytes) => {
            let mut literal = String::with_capacity(bytes.len() * 4 + 10);
            literal.push('\'');
            for byte in bytes {
                let _ = write!(literal, "\\x{byte:02X}");
            }
            literal.push_str("'::BLOB");
            literal
        }
    }
}

/// 将整个站点数据库导出到 `output`
pub fn write_dump(database: &dyn SiteDatabase, output: &Path) -> Result<DumpStats> {
    let file = File::create(output)
        .map_err(|e| MoverError::database_export(format!("{}: {e}", output.display())))?;
    let mut writer = BufWriter::new(file);
    let mut stats = DumpStats::default();

    let tables = database
        .list_tables()
        .map_err(|e| MoverError::database_export(format!("读取表列表失败: {e}")))?;

    writeln!(writer, "-- Site Mover database dump")?;
    writeln!(writer, "-- Generated at {}", Utc::now().to_rfc3339())?;
    writeln!(writer, "-- Tables: {}", tables.len())?;
    writeln!(writer)?;

    for table in &tables {
        let create = database
            .create_statement(table)
            .map_err(|e| MoverError::database_export(format!("{table}: {e}")))?;
        let rows = database
            .table_rows(table)
            .map_err(|e| MoverError::database_export(format!("{table}: {e}")))?;

        writeln!(writer, "-- Table: {table}")?;
        writeln!(writer, "DROP TABLE IF EXISTS {};", quote_ident(table))?;
        writeln!(writer, "{create};")?;

        // 空表不生成 INSERT
        if !rows.is_empty() {
            writeln!(writer, "INSERT INTO {} VALUES", quote_ident(table))?;
            for (index, row) in rows.iter().enumerate() {
                let values = row.iter().map(sql_literal).collect::<Vec<_>>().join(", ");
                let terminator = if index + 1 == rows.len() { ";" } else { "," };
                writeln!(writer, "({values}){terminator}")?;
            }
        }
        writeln!(writer)?;

        debug!("已导出表 {} ({} 行)", table, rows.len());
        stats.tables += 1;
        stats.rows += rows.len();
    }

    writer.flush()?;
    info!("数据库导出完成: {} 张表, {} 行", stats.tables, stats.rows);
    Ok(stats)
}

/// 按语句结束符切分 SQL 文本，丢弃注释与空语句
pub fn split_statements(sql: &str) -> Vec<String> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Normal,
        SingleQuote,
        DoubleQuote,
        LineComment,
        BlockComment,
    }

    let mut statements = Vec::new();
    let mut current = String::new();
    let mut state = State::Normal;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Normal => match c {
                '\'' => {
                    state = State::SingleQuote;
                    current.push(c);
                }
                '"' => {
                    state = State::DoubleQuote;
                    current.push(c);
                }
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    state = State::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = State::BlockComment;
                }
                ';' => {
                    let statement = current.trim();
                    if !statement.is_empty() {
                        statements.push(statement.to_string());
                    }
                    current.clear();
                }
                _ => current.push(c),
            },
            State::SingleQuote => {
                current.push(c);
                if c == '\'' {
                    // '' 是转义的单引号
                    if chars.peek() == Some(&'\'') {
                        current.push('\'');
                        chars.next();
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuote => {
                current.push(c);
                if c == '"' {
                    if chars.peek() == Some(&'"') {
                        current.push('"');
                        chars.next();
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if c == '\n' {
                    current.push('\n');
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    current.push(' ');
                    state = State::Normal;
                }
            }
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        statements.push(tail.to_string());
    }
    statements
}

/// 依次执行导出文件中的语句，遇到第一条失败的语句立即中止
///
/// 不包裹事务，中途失败时已执行的语句不会回滚。
pub fn apply_dump(database: &dyn SiteDatabase, sql: &str) -> Result<usize> {
    let statements = split_statements(sql);
    for (index, statement) in statements.iter().enumerate() {
        database.execute(statement).map_err(|e| {
            let preview: String = statement.chars().take(80).collect();
            MoverError::database_import(format!("第 {} 条语句执行失败 ({preview}): {e}", index + 1))
        })?;
    }
    info!("数据库导入完成: {} 条语句", statements.len());
    Ok(statements.len())
}
