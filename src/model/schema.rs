//! Table descriptor declared by each concrete model.

/// Table name plus ordered columns; the first declared column is the primary key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schema {
    pub table: &'static str,
    pub primary_key: &'static str,
    /// Data columns, primary key excluded, in declaration order.
    pub columns: &'static [&'static str],
}

impl Schema {
    /// Evaluated at compile time when used in a `const`; an empty column list fails the build.
    pub const fn new(table: &'static str, columns: &'static [&'static str]) -> Self {
        match columns {
            [primary_key, rest @ ..] => Schema {
                table,
                primary_key: *primary_key,
                columns: rest,
            },
            [] => panic!("schema must declare at least the primary key column"),
        }
    }

    pub fn is_column(&self, name: &str) -> bool {
        self.columns.contains(&name)
    }

    /// Primary key followed by the data columns.
    pub fn all_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.primary_key).chain(self.columns.iter().copied())
    }
}

/// A table-backed model type.
///
/// ```
/// use wheels::{Entity, Model, Schema};
///
/// pub struct Post;
///
/// impl Entity for Post {
///     const SCHEMA: Schema = Schema::new("posts", &["id", "title", "body"]);
/// }
///
/// let post: Model<Post> = Model::with([("title", "Hello")]);
/// assert!(!post.has_id());
/// ```
pub trait Entity: Send + Sync + 'static {
    const SCHEMA: Schema;
}
