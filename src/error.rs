use std::path::PathBuf;

/// Errors raised while validating or loading optimizer input.
///
/// The packing engines themselves never fail; unsatisfiable demand is
/// reported through the result summaries instead.
#[derive(Debug, thiserror::Error)]
pub enum OptimizerError {
    #[error("{item}: {field} must be a positive number, got {value}")]
    NonPositive {
        item: String,
        field: &'static str,
        value: f64,
    },

    #[error("{field} must be zero or greater, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("{what} expand to {total} units, limit is {limit}")]
    TooManyUnits {
        what: &'static str,
        total: u64,
        limit: u64,
    },

    #[error("invalid search range: {0}")]
    InvalidRange(String),

    #[error("invalid {kind} '{input}': {reason}")]
    Parse {
        kind: &'static str,
        input: String,
        reason: String,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OptimizerError>;

impl OptimizerError {
    pub fn parse(kind: &'static str, input: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            kind,
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Checks that `value` is finite and strictly positive.
pub(crate) fn ensure_positive(item: impl FnOnce() -> String, field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(OptimizerError::NonPositive {
            item: item(),
            field,
            value,
        })
    }
}

pub(crate) fn ensure_non_negative(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(OptimizerError::Negative { field, value })
    }
}
