use std::fmt;

use crate::types::value::SqlValue;

/// The kind of mutation a record describes.
///
/// [`Method`] classifies a change captured upstream. Methods the connector does
/// not know how to translate are carried as [`Method::Unsupported`] so that the
/// producer's wire format can evolve without breaking the write path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Row insertion.
    Insert,
    /// Row update.
    Update,
    /// Row deletion.
    Delete,
    /// Unknown or unsupported mutation kind.
    Unsupported,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "Insert"),
            Self::Update => write!(f, "Update"),
            Self::Delete => write!(f, "Delete"),
            Self::Unsupported => write!(f, "Unsupported"),
        }
    }
}

/// A single named value inside a record.
///
/// Field names are not guaranteed to be unique within a record; the translator
/// resolves them positionally.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Column name the value belongs to.
    pub name: String,
    /// The value itself.
    pub value: SqlValue,
}

impl Field {
    /// Creates a new field with the given name and value.
    pub fn new(name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A generic row-level change description produced upstream.
///
/// A [`Record`] is the unit of change handed to the connector: one mutation of
/// one table, with its values in producer order and an optional primary key
/// column name used to address the affected row.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// The kind of mutation.
    pub method: Method,
    /// Name of the table the mutation targets.
    pub table: String,
    /// Ordered field values of the changed row.
    pub fields: Vec<Field>,
    /// Name of the primary key column, if the table has one.
    pub primary_key: Option<String>,
}

impl Record {
    /// Creates a new record.
    pub fn new(
        method: Method,
        table: impl Into<String>,
        fields: Vec<Field>,
        primary_key: Option<String>,
    ) -> Self {
        Self {
            method,
            table: table.into(),
            fields,
            primary_key,
        }
    }
}
