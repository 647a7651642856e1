use std::error;
use std::fmt;

/// Convenient result type for sink operations using [`SluiceError`] as the error type.
///
/// This type alias reduces boilerplate when working with fallible sink operations.
pub type SluiceResult<T> = Result<T, SluiceError>;

/// Main error type for sink operations.
///
/// [`SluiceError`] can represent a single error, an error with additional
/// dynamic detail, or multiple aggregated errors, while keeping a unified
/// interface for callers.
#[derive(Debug, Clone)]
pub struct SluiceError {
    repr: ErrorRepr,
}

/// Internal representation of error data.
///
/// Users should not interact with this type directly but use [`SluiceError`]
/// methods instead.
#[derive(Debug, Clone)]
enum ErrorRepr {
    /// Error with kind and static description.
    WithDescription(ErrorKind, &'static str),
    /// Error with kind, static description, and dynamic detail.
    WithDescriptionAndDetail(ErrorKind, &'static str, String),
    /// Multiple aggregated errors.
    Many(Vec<SluiceError>),
}

/// Specific categories of errors that can occur in the write pipeline.
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    // Translation errors
    MissingPrimaryKey,
    UnboundParameter,

    // Destination errors
    DestinationConnectionFailed,
    DestinationQueryFailed,

    // Pipeline errors
    QueueClosed,
    InvalidState,
    ConsumerPanic,

    // Configuration & data errors
    ConfigError,
    InvalidData,

    // IO & serialization errors
    IoError,
    SerializationError,
    DeserializationError,

    // Unknown / uncategorized
    Unknown,
}

impl SluiceError {
    /// Creates a [`SluiceError`] containing multiple aggregated errors.
    ///
    /// Useful when multiple operations fail and all failures should be
    /// reported rather than just the first one.
    pub fn many(errors: Vec<SluiceError>) -> SluiceError {
        SluiceError {
            repr: ErrorRepr::Many(errors),
        }
    }

    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For multiple errors, returns the kind of the first error or
    /// [`ErrorKind::Unknown`] if the error list is empty.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => kind,
            ErrorRepr::Many(ref errors) => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns all [`ErrorKind`]s present in this error.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::WithDescription(kind, _)
            | ErrorRepr::WithDescriptionAndDetail(kind, _, _) => vec![kind],
            ErrorRepr::Many(ref errors) => errors
                .iter()
                .flat_map(|err| err.kinds())
                .collect::<Vec<_>>(),
        }
    }

    /// Returns the detailed error information if available.
    ///
    /// For multiple errors, returns the detail of the first error that has one.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::WithDescriptionAndDetail(_, _, ref detail) => Some(detail.as_str()),
            ErrorRepr::Many(ref errors) => errors.iter().find_map(|e| e.detail()),
            _ => None,
        }
    }
}

impl PartialEq for SluiceError {
    fn eq(&self, other: &SluiceError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::WithDescription(kind_a, _), ErrorRepr::WithDescription(kind_b, _)) => {
                kind_a == kind_b
            }
            (
                ErrorRepr::WithDescriptionAndDetail(kind_a, _, _),
                ErrorRepr::WithDescriptionAndDetail(kind_b, _, _),
            ) => kind_a == kind_b,
            (ErrorRepr::Many(errors_a), ErrorRepr::Many(errors_b)) => {
                errors_a.len() == errors_b.len()
                    && errors_a.iter().zip(errors_b.iter()).all(|(a, b)| a == b)
            }
            _ => false,
        }
    }
}

impl fmt::Display for SluiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self.repr {
            ErrorRepr::WithDescription(kind, desc) => {
                fmt::Debug::fmt(&kind, f)?;
                f.write_str(": ")?;
                desc.fmt(f)?;

                Ok(())
            }
            ErrorRepr::WithDescriptionAndDetail(kind, desc, ref detail) => {
                fmt::Debug::fmt(&kind, f)?;
                f.write_str(": ")?;
                desc.fmt(f)?;
                f.write_str(" -> ")?;
                detail.fmt(f)?;

                Ok(())
            }
            ErrorRepr::Many(ref errors) => {
                if errors.is_empty() {
                    write!(f, "Multiple errors occurred (empty)")?;
                } else if errors.len() == 1 {
                    errors[0].fmt(f)?;
                } else {
                    write!(f, "Multiple errors occurred ({} total):", errors.len())?;
                    for (i, error) in errors.iter().enumerate() {
                        write!(f, "\n  {}: {}", i + 1, error)?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl error::Error for SluiceError {}

/// Creates a [`SluiceError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for SluiceError {
    fn from((kind, desc): (ErrorKind, &'static str)) -> SluiceError {
        SluiceError {
            repr: ErrorRepr::WithDescription(kind, desc),
        }
    }
}

/// Creates a [`SluiceError`] from an error kind, static description, and dynamic detail.
impl From<(ErrorKind, &'static str, String)> for SluiceError {
    fn from((kind, desc, detail): (ErrorKind, &'static str, String)) -> SluiceError {
        SluiceError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, desc, detail),
        }
    }
}

/// Creates a [`SluiceError`] from a vector of errors for aggregation.
impl<E> From<Vec<E>> for SluiceError
where
    E: Into<SluiceError>,
{
    fn from(errors: Vec<E>) -> SluiceError {
        SluiceError {
            repr: ErrorRepr::Many(errors.into_iter().map(Into::into).collect()),
        }
    }
}

/// Converts [`std::io::Error`] to [`SluiceError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for SluiceError {
    fn from(err: std::io::Error) -> SluiceError {
        SluiceError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                ErrorKind::IoError,
                "I/O error occurred",
                err.to_string(),
            ),
        }
    }
}

/// Converts [`serde_json::Error`] to [`SluiceError`] with appropriate error kind.
impl From<serde_json::Error> for SluiceError {
    fn from(err: serde_json::Error) -> SluiceError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            _ => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        SluiceError {
            repr: ErrorRepr::WithDescriptionAndDetail(kind, description, err.to_string()),
        }
    }
}

/// Converts [`sqlx::Error`] to [`SluiceError`] with appropriate error kind.
///
/// Maps database errors to [`ErrorKind::DestinationQueryFailed`], I/O errors to
/// [`ErrorKind::IoError`], and connection pool errors to
/// [`ErrorKind::DestinationConnectionFailed`].
impl From<sqlx::Error> for SluiceError {
    fn from(err: sqlx::Error) -> SluiceError {
        let kind = match &err {
            sqlx::Error::Database(_) => ErrorKind::DestinationQueryFailed,
            sqlx::Error::Io(_) => ErrorKind::IoError,
            sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
                ErrorKind::DestinationConnectionFailed
            }
            _ => ErrorKind::DestinationQueryFailed,
        };

        SluiceError {
            repr: ErrorRepr::WithDescriptionAndDetail(
                kind,
                "Database operation failed",
                err.to_string(),
            ),
        }
    }
}
