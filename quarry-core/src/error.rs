use thiserror::Error;

/// Failures raised by the builder and the materializer.
///
/// They travel inside [`anyhow::Error`] like every other error in the crate, use
/// [`MappingError::kind_of`] (or `downcast_ref`) to classify one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MappingError {
    /// Invalid request: unsupported dialect feature, missing key, missing filter, ...
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A column referenced by the caller is not part of the table.
    #[error("Column `{column}` does not exist on `{table}`")]
    UnknownColumn { table: String, column: String },

    /// Two argument sources produced the same parameter name.
    #[error("Parameter `{0}` is supplied by both the filter and the where clause arguments")]
    ParameterCollision(String),

    /// No usable constructor for the target type.
    #[error("Constructor error on {type_name}: {message}")]
    Constructor { type_name: String, message: String },

    /// A constructor parameter or required member has no column in the result set.
    #[error("Column `{column}` required by {type_name} is not present in the result set")]
    MissingColumn { type_name: String, column: String },

    /// A value cannot be coerced to the member type.
    #[error("Cannot convert {source_type} to {target} for `{member}`: {message}")]
    DataShape {
        member: String,
        source_type: String,
        target: String,
        message: String,
    },

    /// Zero rows where one was required.
    #[error("No rows were returned, one was expected")]
    NoRows,

    /// More rows than allowed.
    #[error("More than one row was returned, at most one was expected")]
    TooManyRows,

    /// A write affected a different number of rows than expected.
    #[error("The statement affected {actual} rows instead of the expected {expected}")]
    RowCountMismatch { expected: u64, actual: u64 },

    /// The driver did not report the value the statement depends on.
    #[error("The driver did not report {0}")]
    RowCountUnavailable(String),

    /// Dictionary materialization hit the same key twice.
    #[error("Duplicate key `{0}` in the result set")]
    DuplicateKey(String),

    /// Change tracking is active and nothing changed.
    #[error("{0} reports no changed members, there is nothing to update")]
    NoChanges(String),

    /// The operation was cancelled while waiting on the driver.
    #[error("The operation was cancelled")]
    Cancelled,
}

impl MappingError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn constructor(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Constructor {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Returns the mapping error carried by `error`, if any.
    pub fn kind_of(error: &crate::Error) -> Option<&MappingError> {
        error.downcast_ref::<MappingError>()
    }

    /// Cardinality and row count errors are data integrity signals.
    pub fn is_cardinality(&self) -> bool {
        matches!(
            self,
            Self::NoRows | Self::TooManyRows | Self::RowCountMismatch { .. }
        )
    }
}
