//! Record-to-SQL translation.
//!
//! Derives a parametrized DML statement and its bindings from a generic
//! [`Record`]. Translation is a pure function: it either yields a single
//! [`Command`], yields nothing for mutations that cannot be expressed, or
//! fails when a declared primary key cannot be resolved against the record's
//! fields.

use std::collections::HashMap;

use tracing::debug;

use crate::bail;
use crate::error::{ErrorKind, SluiceError, SluiceResult};
use crate::types::{Command, Method, Record, SqlValue};

/// Reserved binding name under which the primary key value is always bound.
pub const PRIMARY_BINDING: &str = "primary_val";

/// Prefix of the positional binding names generated for non-primary fields.
const VALUE_BINDING_PREFIX: &str = "val_";

/// Ephemeral per-record translation state.
///
/// A [`RecordDefinition`] is derived once per record and maps every field to a
/// unique binding name: the primary key field to [`PRIMARY_BINDING`], every
/// other field to `val_<i>` where `i` counts non-primary fields in record
/// order, starting at zero. Binding names therefore depend on field order;
/// two records that carry the same fields in a different order produce
/// different parameter names. This is harmless because every record is
/// translated independently and no statement is ever cached by shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDefinition {
    /// Whether the record's primary key resolved to one of its fields.
    pub has_primary: bool,
    /// Name of the resolved primary key column.
    pub primary_column: Option<String>,
    /// Values to bind, keyed by unique binding name.
    pub values: HashMap<String, SqlValue>,
    /// Non-primary fields in record order, with their binding names.
    pub column_defs: Vec<ColumnDef>,
}

/// A non-primary column together with the binding name generated for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name as it appears in the record.
    pub column_name: String,
    /// Generated binding name for the column's value.
    pub binding_name: String,
}

/// Derives the [`RecordDefinition`] for a record.
///
/// Fails with [`ErrorKind::MissingPrimaryKey`] iff the record declares a
/// primary key but no field carries that name. A record without a declared
/// primary key never fails here; it simply yields `has_primary = false`.
pub fn record_definition(record: &Record) -> SluiceResult<RecordDefinition> {
    let primary_key = declared_primary_key(record);

    let mut definition = RecordDefinition {
        has_primary: false,
        primary_column: None,
        values: HashMap::with_capacity(record.fields.len()),
        column_defs: Vec::with_capacity(record.fields.len()),
    };

    for field in &record.fields {
        // Primary key field: bound under the reserved name, excluded from the
        // column definitions.
        if primary_key == Some(field.name.as_str()) {
            definition
                .values
                .insert(PRIMARY_BINDING.to_string(), field.value.clone());
            definition.has_primary = true;
            definition.primary_column = Some(field.name.clone());
            continue;
        }

        let binding_name = format!("{VALUE_BINDING_PREFIX}{}", definition.column_defs.len());
        definition
            .values
            .insert(binding_name.clone(), field.value.clone());
        definition.column_defs.push(ColumnDef {
            column_name: field.name.clone(),
            binding_name,
        });
    }

    if let Some(primary_key) = primary_key
        && !definition.has_primary
    {
        bail!(
            ErrorKind::MissingPrimaryKey,
            "Primary key not found among record fields",
            primary_key
        );
    }

    Ok(definition)
}

/// Translates a record into at most one [`Command`].
///
/// The outcome depends on the record's method:
/// - [`Method::Insert`] always yields a command; the primary key column, when
///   present, is listed first.
/// - [`Method::Update`] yields a command only when the primary key resolved;
///   a record without one is silently skipped.
/// - [`Method::Delete`] behaves like update: no resolved primary key, no
///   command.
/// - [`Method::Unsupported`] is silently skipped.
///
/// A declared-but-unresolved primary key is an error for every method, since
/// it means the producer and this connector disagree about the table's shape.
pub fn translate<R>(reference: R, record: Record) -> SluiceResult<Option<Command<R>>> {
    match record.method {
        Method::Insert => {
            let definition = record_definition(&record)?;
            Ok(Some(insert_command(reference, record, definition)))
        }
        Method::Update => {
            let definition = record_definition(&record)?;
            Ok(update_command(reference, record, definition))
        }
        Method::Delete => {
            let definition = record_definition(&record)?;
            Ok(delete_command(reference, record, definition))
        }
        Method::Unsupported => {
            debug!(
                method = %record.method,
                table = %record.table,
                "skipping record with unsupported method"
            );

            Ok(None)
        }
    }
}

/// Returns the primary key name a record declares, treating an empty name as
/// no declaration.
fn declared_primary_key(record: &Record) -> Option<&str> {
    record
        .primary_key
        .as_deref()
        .filter(|name| !name.is_empty())
}

fn insert_command<R>(reference: R, record: Record, definition: RecordDefinition) -> Command<R> {
    let mut columns = Vec::with_capacity(definition.column_defs.len() + 1);
    let mut bindings = Vec::with_capacity(definition.column_defs.len() + 1);

    // The primary column, when present, is listed first.
    if let Some(primary_column) = &definition.primary_column {
        columns.push(format!("\"{primary_column}\""));
        bindings.push(format!(":{PRIMARY_BINDING}"));
    }

    for def in &definition.column_defs {
        columns.push(format!("\"{}\"", def.column_name));
        bindings.push(format!(":{}", def.binding_name));
    }

    let query = format!(
        "INSERT INTO \"{}\" ({}) VALUES ({})",
        record.table,
        columns.join(","),
        bindings.join(",")
    );

    Command {
        reference,
        record,
        query,
        args: definition.values,
    }
}

fn update_command<R>(reference: R, record: Record, definition: RecordDefinition) -> Option<Command<R>> {
    let Some(primary_column) = definition.primary_column.clone() else {
        debug!(table = %record.table, "skipping update without primary key");

        return None;
    };

    let assignments = definition
        .column_defs
        .iter()
        .map(|def| format!("\"{}\" = :{}", def.column_name, def.binding_name))
        .collect::<Vec<_>>();

    let query = format!(
        "UPDATE \"{}\" SET {} WHERE \"{}\" = :{PRIMARY_BINDING}",
        record.table,
        assignments.join(","),
        primary_column
    );

    Some(Command {
        reference,
        record,
        query,
        args: definition.values,
    })
}

fn delete_command<R>(reference: R, record: Record, mut definition: RecordDefinition) -> Option<Command<R>> {
    let (Some(primary_column), Some(primary_value)) = (
        definition.primary_column.clone(),
        definition.values.remove(PRIMARY_BINDING),
    ) else {
        debug!(table = %record.table, "skipping delete without primary key");

        return None;
    };

    let query = format!(
        "DELETE FROM \"{}\" WHERE \"{}\" = :{PRIMARY_BINDING}",
        record.table, primary_column
    );

    // A delete addresses the row by primary key alone.
    let mut args = HashMap::with_capacity(1);
    args.insert(PRIMARY_BINDING.to_string(), primary_value);

    Some(Command {
        reference,
        record,
        query,
        args,
    })
}
