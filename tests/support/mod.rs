//! In-memory `Database` that understands the statements the builder emits.

#![allow(dead_code)]

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use wheels::{AppError, Database, Row};

struct Table {
    columns: Vec<String>,
    int_columns: Vec<String>,
    next_id: i64,
    rows: Vec<Row>,
}

/// In-memory tables. Columns declared as `name:int` convert string input the way
/// `jsonb_populate_record` does; other columns store values as given.
#[derive(Default)]
pub struct MemoryDatabase {
    tables: Mutex<HashMap<String, Table>>,
    log: Mutex<Vec<String>>,
}

fn unquote(ident: &str) -> String {
    let ident = ident.trim();
    let last = ident.rsplit('.').next().unwrap_or(ident);
    last.trim_matches('"').to_string()
}

fn unquote_list(list: &str) -> Vec<String> {
    list.split(", ").map(unquote).collect()
}

fn param(params: &[Value], placeholder: &str) -> Result<Value, AppError> {
    let n: usize = placeholder
        .trim()
        .trim_start_matches('$')
        .parse()
        .map_err(|_| encode_error(format!("bad placeholder {}", placeholder)))?;
    params
        .get(n - 1)
        .cloned()
        .ok_or_else(|| encode_error(format!("missing parameter ${}", n)))
}

fn encode_error(msg: String) -> AppError {
    AppError::Db(sqlx::Error::Encode(msg.into()))
}

fn table_mut<'a>(tables: &'a mut HashMap<String, Table>, name: &str) -> Result<&'a mut Table, AppError> {
    tables.get_mut(name).ok_or_else(|| {
        AppError::Db(sqlx::Error::Protocol(format!("relation {} does not exist", name)))
    })
}

fn check(table: &Table, col: &str) -> Result<(), AppError> {
    if table.columns.iter().any(|c| c == col) {
        Ok(())
    } else {
        Err(AppError::Db(sqlx::Error::ColumnNotFound(col.to_string())))
    }
}

/// One member of the bound record, converted to the column's type.
fn field(table: &Table, record: &Value, col: &str) -> Result<Value, AppError> {
    check(table, col)?;
    let value = record.get(col).cloned().unwrap_or(Value::Null);
    if !table.int_columns.iter().any(|c| c == col) {
        return Ok(value);
    }
    match &value {
        Value::Null => Ok(Value::Null),
        Value::Number(n) if n.is_i64() => Ok(value.clone()),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| encode_error(format!("invalid input syntax for type integer: {:?}", s))),
        other => Err(encode_error(format!("invalid input syntax for type integer: {}", other))),
    }
}

fn record_param(params: &[Value]) -> Result<Value, AppError> {
    match params.first() {
        Some(v @ Value::Object(_)) => Ok(v.clone()),
        _ => Err(encode_error("record parameter must be a JSON object".into())),
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_table(&self, name: &str, columns: &[&str]) {
        let mut names = Vec::new();
        let mut int_columns = Vec::new();
        for column in columns {
            match column.split_once(':') {
                Some((col, "int")) => {
                    names.push(col.to_string());
                    int_columns.push(col.to_string());
                }
                _ => names.push(column.to_string()),
            }
        }
        self.tables.lock().unwrap().insert(
            name.to_string(),
            Table {
                columns: names,
                int_columns,
                next_id: 1,
                rows: Vec::new(),
            },
        );
    }

    /// Statements executed so far, in order.
    pub fn statements(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables.lock().unwrap()[table].rows.len()
    }

    /// Remove a row directly, bypassing any model.
    pub fn remove_row(&self, table: &str, key: &str, id: &Value) {
        let mut tables = self.tables.lock().unwrap();
        tables
            .get_mut(table)
            .unwrap()
            .rows
            .retain(|r| r.get(key) != Some(id));
    }

    fn run(&self, sql: &str, params: &[Value]) -> Result<(Vec<Row>, u64), AppError> {
        self.log.lock().unwrap().push(sql.to_string());
        let expected = sql.matches('$').count();
        if expected != params.len() {
            return Err(encode_error(format!(
                "statement has {} placeholders but {} parameters were bound",
                expected,
                params.len()
            )));
        }

        const RECORD: &str = r#"jsonb_populate_record\(NULL::"\w+", \$1\) AS r"#;
        let insert = Regex::new(&format!(
            r#"^INSERT INTO "(\w+)" \((.*)\) SELECT .* FROM {} RETURNING to_jsonb\("(\w+)"\) AS "\w+"$"#,
            RECORD
        ))
        .unwrap();
        let update = Regex::new(&format!(
            r#"^UPDATE "(\w+)" SET (.*) FROM {} WHERE "\w+"\."(\w+)" = r\."\w+"$"#,
            RECORD
        ))
        .unwrap();
        let delete = Regex::new(&format!(
            r#"^DELETE FROM "(\w+)" USING {} WHERE "\w+"\."(\w+)" = r\."\w+"$"#,
            RECORD
        ))
        .unwrap();
        let select_record = Regex::new(&format!(
            r#"^SELECT to_jsonb\(found\) AS "(\w+)" FROM \(SELECT (.*) FROM "(\w+)", {} WHERE "\w+"\."(\w+)" = r\."\w+"\) AS found$"#,
            RECORD
        ))
        .unwrap();
        let select = Regex::new(r#"^SELECT (.*) FROM "(\w+)" WHERE "(\w+)" = (\$\d+)$"#).unwrap();

        let mut tables = self.tables.lock().unwrap();

        if let Some(c) = insert.captures(sql) {
            let table = table_mut(&mut tables, &c[1])?;
            let record = record_param(params)?;
            let pk = c[3].to_string();
            let mut row = Row::new();
            for col in &table.columns {
                row.insert(col.clone(), Value::Null);
            }
            for col in unquote_list(&c[2]) {
                let value = field(table, &record, &col)?;
                row.insert(col, value);
            }
            if row.get(&pk).map_or(true, Value::is_null) {
                row.insert(pk.clone(), Value::from(table.next_id));
                table.next_id += 1;
            }
            let mut returned = Row::new();
            returned.insert(pk.clone(), row[&pk].clone());
            table.rows.push(row);
            return Ok((vec![returned], 1));
        }

        if let Some(c) = update.captures(sql) {
            let table = table_mut(&mut tables, &c[1])?;
            let record = record_param(params)?;
            let key = c[3].to_string();
            let id = field(table, &record, &key)?;
            let mut sets = Vec::new();
            for assignment in c[2].split(", ") {
                let (col, _) = assignment
                    .split_once(" = ")
                    .ok_or_else(|| encode_error(format!("bad assignment {}", assignment)))?;
                let col = unquote(col);
                let value = field(table, &record, &col)?;
                sets.push((col, value));
            }
            let mut affected = 0;
            for row in table.rows.iter_mut().filter(|r| r.get(&key) == Some(&id)) {
                for (col, v) in &sets {
                    row.insert(col.clone(), v.clone());
                }
                affected += 1;
            }
            return Ok((Vec::new(), affected));
        }

        if let Some(c) = delete.captures(sql) {
            let table = table_mut(&mut tables, &c[1])?;
            let record = record_param(params)?;
            let key = c[2].to_string();
            let id = field(table, &record, &key)?;
            let before = table.rows.len();
            table.rows.retain(|r| r.get(&key) != Some(&id));
            return Ok((Vec::new(), (before - table.rows.len()) as u64));
        }

        if let Some(c) = select_record.captures(sql) {
            let alias = c[1].to_string();
            let cols = unquote_list(&c[2]);
            let table = table_mut(&mut tables, &c[3])?;
            let record = record_param(params)?;
            let key = c[4].to_string();
            let id = field(table, &record, &key)?;
            for col in &cols {
                check(table, col)?;
            }
            let rows = table
                .rows
                .iter()
                .filter(|r| r.get(&key) == Some(&id))
                .map(|r| {
                    let found: Row = cols
                        .iter()
                        .map(|col| (col.clone(), r.get(col).cloned().unwrap_or(Value::Null)))
                        .collect();
                    let mut out = Row::new();
                    out.insert(alias.clone(), Value::Object(found));
                    out
                })
                .collect();
            return Ok((rows, 0));
        }

        if let Some(c) = select.captures(sql) {
            let cols = unquote_list(&c[1]);
            let table = table_mut(&mut tables, &c[2])?;
            let key = c[3].to_string();
            let id = param(params, &c[4])?;
            for col in &cols {
                check(table, col)?;
            }
            let rows = table
                .rows
                .iter()
                .filter(|r| r.get(&key) == Some(&id))
                .map(|r| {
                    cols.iter()
                        .map(|col| (col.clone(), r.get(col).cloned().unwrap_or(Value::Null)))
                        .collect::<Row>()
                })
                .collect();
            return Ok((rows, 0));
        }

        Err(AppError::Db(sqlx::Error::Protocol(format!(
            "syntax error in statement: {}",
            sql
        ))))
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn fetch_all(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, AppError> {
        Ok(self.run(sql, params)?.0)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> Result<u64, AppError> {
        Ok(self.run(sql, params)?.1)
    }
}
