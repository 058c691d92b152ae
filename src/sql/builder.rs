//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from a model schema.

use crate::model::Schema;
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (safe: only from declared schemas).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }
}

/// Alias of the typed record decoded from the JSONB parameter.
const INPUT_ALIAS: &str = "r";

/// Column holding the whole row, as JSONB, in `select_by_id` results.
pub const RECORD_COLUMN: &str = "record";

/// `jsonb_populate_record(NULL::"table", $n) AS r`: the parameter object converted to the
/// table's row type, each member by its column's input function.
fn typed_record(schema: &Schema, param: u32) -> String {
    format!(
        "jsonb_populate_record(NULL::{}, ${}) AS {}",
        quoted(schema.table),
        param,
        INPUT_ALIAS
    )
}

fn key_record(schema: &Schema, id: &Value) -> Value {
    let mut record = Map::new();
    record.insert(schema.primary_key.to_string(), id.clone());
    Value::Object(record)
}

fn key_match(schema: &Schema) -> String {
    let pk = quoted(schema.primary_key);
    format!("{}.{} = {}.{}", quoted(schema.table), pk, INPUT_ALIAS, pk)
}

/// SELECT by primary key. Every declared column, key first, folded into one JSONB
/// `record` column so every column type comes back without loss.
pub fn select_by_id(schema: &Schema, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(key_record(schema, id));
    let table = quoted(schema.table);
    let columns = schema
        .all_columns()
        .map(|c| format!("{}.{}", table, quoted(c)))
        .collect::<Vec<_>>()
        .join(", ");
    q.sql = format!(
        "SELECT to_jsonb(found) AS {} FROM (SELECT {} FROM {}, {} WHERE {}) AS found",
        quoted(RECORD_COLUMN),
        columns,
        table,
        typed_record(schema, n),
        key_match(schema)
    );
    q
}

/// INSERT over exactly the given attributes, returning the generated key as JSONB.
pub fn insert<'a, I>(schema: &Schema, attributes: I) -> QueryBuf
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let mut q = QueryBuf::new();
    let mut record = Map::new();
    let mut cols = Vec::new();
    let mut values = Vec::new();
    for (name, val) in attributes {
        record.insert(name.to_string(), val.clone());
        cols.push(quoted(name));
        values.push(format!("{}.{}", INPUT_ALIAS, quoted(name)));
    }
    let n = q.push_param(Value::Object(record));
    let pk = quoted(schema.primary_key);
    q.sql = format!(
        "INSERT INTO {} ({}) SELECT {} FROM {} RETURNING to_jsonb({}) AS {}",
        quoted(schema.table),
        cols.join(", "),
        values.join(", "),
        typed_record(schema, n),
        pk,
        pk
    );
    q
}

/// UPDATE by id: SET exactly the given attributes. The key travels in the same record.
pub fn update<'a, I>(schema: &Schema, id: &Value, attributes: I) -> QueryBuf
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let mut q = QueryBuf::new();
    let mut record = Map::new();
    let mut sets = Vec::new();
    for (name, val) in attributes {
        record.insert(name.to_string(), val.clone());
        sets.push(format!("{} = {}.{}", quoted(name), INPUT_ALIAS, quoted(name)));
    }
    record.insert(schema.primary_key.to_string(), id.clone());
    let n = q.push_param(Value::Object(record));
    q.sql = format!(
        "UPDATE {} SET {} FROM {} WHERE {}",
        quoted(schema.table),
        sets.join(", "),
        typed_record(schema, n),
        key_match(schema)
    );
    q
}

/// DELETE by id.
pub fn delete(schema: &Schema, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(key_record(schema, id));
    q.sql = format!(
        "DELETE FROM {} USING {} WHERE {}",
        quoted(schema.table),
        typed_record(schema, n),
        key_match(schema)
    );
    q
}
