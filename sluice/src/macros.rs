//! Macros for sink error handling.
//!
//! Provides convenience macros for creating and returning
//! [`crate::error::SluiceError`] instances with reduced boilerplate.

/// Creates a [`crate::error::SluiceError`] from error kind and description.
///
/// Accepts either a static description or an additional dynamic detail value.
#[macro_export]
macro_rules! sluice_error {
    ($kind:expr, $desc:expr) => {
        SluiceError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        SluiceError::from(($kind, $desc, $detail.to_string()))
    };
}

/// Creates and returns a [`crate::error::SluiceError`] from the current function.
///
/// Combines error creation with early return for error conditions that should
/// immediately terminate execution.
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return Err($crate::sluice_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return Err($crate::sluice_error!($kind, $desc, $detail))
    };
}
