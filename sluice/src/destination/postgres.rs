use std::collections::HashMap;

use sluice_config::shared::{PgConnectionConfig, PgPoolConfig};
use sqlx::postgres::{PgArguments, PgPoolOptions, Postgres};
use sqlx::query::Query;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::destination::base::ChunkDestination;
use crate::error::{ErrorKind, SluiceError, SluiceResult};
use crate::sluice_error;
use crate::types::{Command, SqlValue};

/// A Postgres destination executing each chunk as a single transaction.
///
/// Statements carry named `:binding` placeholders; before execution they are
/// rewritten to the positional `$n` form Postgres understands, with values
/// bound in placeholder order. Any failure rolls the transaction back, so a
/// chunk either commits whole or leaves the database untouched.
#[derive(Debug, Clone)]
pub struct PostgresDestination {
    pool: PgPool,
}

impl PostgresDestination {
    /// Creates a destination on top of an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the configured database and builds the connection pool.
    pub async fn connect(
        connection: &PgConnectionConfig,
        pool: &PgPoolConfig,
    ) -> SluiceResult<Self> {
        info!(
            host = connection.host,
            port = connection.port,
            dbname = connection.name,
            username = connection.username,
            tls_enabled = connection.tls.enabled,
            "connecting to destination database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(pool.max_connections)
            .connect_with(connection.connect_options())
            .await?;

        Ok(Self::new(pool))
    }
}

impl<R: Send + Sync> ChunkDestination<R> for PostgresDestination {
    async fn apply_chunk(&self, chunk: &[Command<R>]) -> SluiceResult<()> {
        let mut tx = self.pool.begin().await?;

        for command in chunk {
            let (query, params) = rewrite_named_query(&command.query, &command.args)?;

            let mut prepared = sqlx::query(&query);
            for value in params {
                prepared = bind_value(prepared, value);
            }

            prepared.execute(&mut *tx).await.map_err(|err| {
                warn!(
                    table = %command.record.table,
                    query = %command.query,
                    "statement execution failed"
                );

                SluiceError::from(err)
            })?;
        }

        tx.commit().await?;

        Ok(())
    }
}

/// Rewrites a statement with named `:binding` placeholders into positional
/// `$n` form.
///
/// Returns the rewritten statement together with the values to bind, in
/// placeholder order. Repeated occurrences of the same name reuse the same
/// positional parameter. A `::` sequence is left untouched so Postgres casts
/// survive the rewrite. Fails with [`ErrorKind::UnboundParameter`] when a
/// placeholder has no value in `args`.
fn rewrite_named_query<'a>(
    query: &str,
    args: &'a HashMap<String, SqlValue>,
) -> SluiceResult<(String, Vec<&'a SqlValue>)> {
    let mut rewritten = String::with_capacity(query.len());
    let mut params: Vec<&'a SqlValue> = Vec::new();
    let mut positions: HashMap<&'a str, usize> = HashMap::new();

    let mut chars = query.char_indices().peekable();
    while let Some((index, c)) = chars.next() {
        if c != ':' {
            rewritten.push(c);
            continue;
        }

        // Leave `::` casts untouched.
        if let Some((_, ':')) = chars.peek() {
            rewritten.push_str("::");
            chars.next();
            continue;
        }

        // Consume the placeholder name.
        let name_start = index + 1;
        let mut name_end = name_start;
        while let Some(&(end, next)) = chars.peek() {
            if next.is_ascii_alphanumeric() || next == '_' {
                chars.next();
                name_end = end + next.len_utf8();
            } else {
                break;
            }
        }

        if name_end == name_start {
            // A lone colon is not a placeholder.
            rewritten.push(':');
            continue;
        }

        let name = &query[name_start..name_end];
        let (name, value) = args.get_key_value(name).ok_or_else(|| {
            sluice_error!(
                ErrorKind::UnboundParameter,
                "No value bound for statement parameter",
                name
            )
        })?;

        let position = *positions.entry(name.as_str()).or_insert_with(|| {
            params.push(value);
            params.len()
        });
        rewritten.push('$');
        rewritten.push_str(&position.to_string());
    }

    Ok((rewritten, params))
}

/// Binds a single [`SqlValue`] to the next parameter of a query.
fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &'q SqlValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        SqlValue::Null => query.bind(Option::<String>::None),
        SqlValue::Bool(value) => query.bind(*value),
        SqlValue::String(value) => query.bind(value),
        SqlValue::I16(value) => query.bind(*value),
        SqlValue::I32(value) => query.bind(*value),
        SqlValue::I64(value) => query.bind(*value),
        SqlValue::F32(value) => query.bind(*value),
        SqlValue::F64(value) => query.bind(*value),
        SqlValue::Date(value) => query.bind(*value),
        SqlValue::Time(value) => query.bind(*value),
        SqlValue::TimeStamp(value) => query.bind(*value),
        SqlValue::TimeStampTz(value) => query.bind(*value),
        SqlValue::Uuid(value) => query.bind(*value),
        SqlValue::Json(value) => query.bind(value),
        SqlValue::Bytes(value) => query.bind(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, SqlValue)]) -> HashMap<String, SqlValue> {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn rewrites_placeholders_in_occurrence_order() {
        let args = args(&[
            ("primary_val", SqlValue::I32(7)),
            ("val_0", SqlValue::String("ann".to_string())),
        ]);

        let (query, params) = rewrite_named_query(
            "INSERT INTO \"users\" (\"id\",\"name\") VALUES (:primary_val,:val_0)",
            &args,
        )
        .unwrap();

        assert_eq!(
            query,
            "INSERT INTO \"users\" (\"id\",\"name\") VALUES ($1,$2)"
        );
        assert_eq!(params, vec![&SqlValue::I32(7), &SqlValue::String("ann".to_string())]);
    }

    #[test]
    fn repeated_placeholders_reuse_the_same_position() {
        let args = args(&[("primary_val", SqlValue::I64(1))]);

        let (query, params) =
            rewrite_named_query("SELECT :primary_val, :primary_val", &args).unwrap();

        assert_eq!(query, "SELECT $1, $1");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn casts_are_left_untouched() {
        let args = args(&[("val_0", SqlValue::String("3".to_string()))]);

        let (query, _) =
            rewrite_named_query("SELECT :val_0::int, 'x'::text", &args).unwrap();

        assert_eq!(query, "SELECT $1::int, 'x'::text");
    }

    #[test]
    fn unbound_placeholder_is_an_error() {
        let args = args(&[]);

        let err = rewrite_named_query("SELECT :val_0", &args).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnboundParameter);
    }
}
