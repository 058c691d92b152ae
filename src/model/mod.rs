//! Active-record base for table-backed models.
//!
//! A [`Model`] holds a sparse set of fields: a column that was never assigned is
//! absent, which is different from a column assigned `null`. All persistence goes
//! through a [`Database`] handle passed in by the caller.

mod schema;

pub use schema::{Entity, Schema};

use crate::db::Database;
use crate::error::AppError;
use crate::sql;
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

pub struct Model<E: Entity> {
    fields: HashMap<String, Value>,
    entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Model<E> {
    pub fn new() -> Self {
        Model {
            fields: HashMap::new(),
            entity: PhantomData,
        }
    }

    /// New model populated with the given members.
    pub fn with<I, K, V>(members: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut model = Self::new();
        model.populate(members);
        model
    }

    pub fn schema() -> Schema {
        E::SCHEMA
    }

    /// Merge-assign members. Unknown keys are created, others are left alone. No database access.
    pub fn populate<I, K, V>(&mut self, data: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in data {
            self.fields.insert(key.into(), value.into());
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Every assigned member, declared or not.
    pub fn fields(&self) -> &HashMap<String, Value> {
        &self.fields
    }

    /// Primary key value, if set and not null.
    pub fn id(&self) -> Option<&Value> {
        self.fields
            .get(E::SCHEMA.primary_key)
            .filter(|v| !v.is_null())
    }

    /// True when the model represents a row that exists (or existed) in the table.
    pub fn has_id(&self) -> bool {
        self.id().is_some()
    }

    /// Assigned data columns, optionally restricted to `fields`. Columns never assigned are
    /// omitted; columns assigned `null` are included.
    pub fn attributes(&self, fields: Option<&[&str]>) -> Map<String, Value> {
        self.attribute_pairs(fields)
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn attribute_pairs<'a>(
        &'a self,
        fields: Option<&'a [&'a str]>,
    ) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        E::SCHEMA
            .columns
            .iter()
            .copied()
            .filter(move |c| fields.map_or(true, |f| f.contains(c)))
            .filter_map(move |c| self.fields.get(c).map(|v| (c, v)))
    }

    /// Insert when there is no primary key, update otherwise.
    pub async fn save<D>(&mut self, db: &D) -> Result<(), AppError>
    where
        D: Database + ?Sized,
    {
        if self.has_id() {
            self.update(db, None).await
        } else {
            self.insert(db).await
        }
    }

    /// Insert a new row from the assigned attributes and take the generated key.
    pub async fn insert<D>(&mut self, db: &D) -> Result<(), AppError>
    where
        D: Database + ?Sized,
    {
        let schema = &E::SCHEMA;
        if self.has_id() || self.attribute_pairs(None).next().is_none() {
            return Err(AppError::Logic(format!(
                "{}: model should have some members and no id",
                schema.table
            )));
        }
        let q = sql::insert(schema, self.attribute_pairs(None));
        let row = db.fetch_optional(&q.sql, &q.params).await?;
        let id = row
            .and_then(|mut r| r.remove(schema.primary_key))
            .filter(|v| !v.is_null())
            .ok_or_else(|| AppError::Runtime(format!("unsuccessful insert: {}", q.sql)))?;
        tracing::debug!(table = schema.table, id = %id, "inserted");
        self.fields.insert(schema.primary_key.to_string(), id);
        Ok(())
    }

    /// Write the assigned attributes (all, or only `fields`) to the row with this model's key.
    pub async fn update<D>(&mut self, db: &D, fields: Option<&[&str]>) -> Result<(), AppError>
    where
        D: Database + ?Sized,
    {
        let schema = &E::SCHEMA;
        let Some(id) = self.id() else {
            return Err(AppError::Logic(format!(
                "{}: model should have some members and an id",
                schema.table
            )));
        };
        if self.attribute_pairs(fields).next().is_none() {
            return Err(AppError::Logic(format!(
                "{}: model should have some members and an id",
                schema.table
            )));
        }
        let q = sql::update(schema, id, self.attribute_pairs(fields));
        let affected = db.execute(&q.sql, &q.params).await?;
        if affected == 0 {
            return Err(AppError::Runtime(format!("unsuccessful update: {}", q.sql)));
        }
        Ok(())
    }

    /// Delete the row, then null the key and every data column that was assigned.
    pub async fn delete<D>(&mut self, db: &D) -> Result<(), AppError>
    where
        D: Database + ?Sized,
    {
        let schema = &E::SCHEMA;
        let Some(id) = self.id() else {
            return Err(AppError::Logic(format!(
                "{}: trying to delete an uninitialised model",
                schema.table
            )));
        };
        let q = sql::delete(schema, id);
        let affected = db.execute(&q.sql, &q.params).await?;
        if affected == 0 {
            return Err(AppError::Runtime(format!("unsuccessful delete: {}", q.sql)));
        }
        self.fields.insert(schema.primary_key.to_string(), Value::Null);
        for column in schema.columns {
            if let Some(v) = self.fields.get_mut(*column) {
                *v = Value::Null;
            }
        }
        Ok(())
    }

    /// Overwrite members with the row whose key is `id`.
    pub async fn load<D>(&mut self, db: &D, id: impl Into<Value>) -> Result<(), AppError>
    where
        D: Database + ?Sized,
    {
        let schema = &E::SCHEMA;
        let id = id.into();
        let q = sql::select_by_id(schema, &id);
        match db.fetch_optional(&q.sql, &q.params).await? {
            Some(mut row) => match row.remove(sql::RECORD_COLUMN) {
                Some(Value::Object(record)) => {
                    self.populate(record);
                    Ok(())
                }
                _ => Err(AppError::Runtime(format!("unexpected row shape: {}", q.sql))),
            },
            None => Err(AppError::InvalidArgument(format!(
                "no row in {} with {} = {}",
                schema.table, schema.primary_key, id
            ))),
        }
    }
}

impl<E: Entity> Default for Model<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Clone for Model<E> {
    fn clone(&self) -> Self {
        Model {
            fields: self.fields.clone(),
            entity: PhantomData,
        }
    }
}

impl<E: Entity> fmt::Debug for Model<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("table", &E::SCHEMA.table)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Serializes the assigned members: declared columns first, in order, then any extras.
impl<E: Entity> Serialize for Model<E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let schema = &E::SCHEMA;
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for column in schema.all_columns() {
            if let Some(v) = self.fields.get(column) {
                map.serialize_entry(column, v)?;
            }
        }
        let mut extras: Vec<_> = self
            .fields
            .iter()
            .filter(|(k, _)| *k != schema.primary_key && !schema.is_column(k))
            .collect();
        extras.sort_by(|a, b| a.0.cmp(b.0));
        for (k, v) in extras {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
