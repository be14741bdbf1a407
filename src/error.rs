//! Errors raised by the material-balance engine.

use thiserror::Error;

pub type MbalResult<T> = Result<T, MbalError>;

/// Every failure the engine can report.
///
/// Input-validity and physical-consistency errors are raised where they are
/// detected and never coerced away. Root-finding failures get their own
/// variant so a caller can tell them apart from a converged answer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MbalError {
    #[error("Invalid input: {what}")]
    InvalidInput { what: String },

    #[error("Length mismatch for {what}: {left} vs {right}")]
    LengthMismatch {
        what: &'static str,
        left: usize,
        right: usize,
    },

    #[error("Unsupported aquifer: {boundary} boundary with {flow} flow")]
    UnsupportedAquifer {
        boundary: &'static str,
        flow: &'static str,
    },

    #[error("Missing aquifer geometry: {what}")]
    MissingGeometry { what: &'static str },

    #[error("Invalid PVT table: {what}")]
    PvtTable { what: String },

    #[error(
        "Free gas withdrawal is negative ({value}) at period {period}. Adjust the solution \
         gas-oil/water ratio to reflect consistent gas production"
    )]
    NegativeFreeGas { period: usize, value: f64 },

    #[error("Cumulative {column} production decreases at period {period}")]
    DecreasingProduction { column: &'static str, period: usize },

    #[error("Well {well} has underground withdrawal values that are not increasing with time")]
    NonMonotonicWithdrawal { well: String },

    #[error("Root finding did not converge for {context}: {reason}")]
    NonConvergence { context: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl MbalError {
    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        MbalError::InvalidInput { what: what.into() }
    }

    /// Data the engine was handed breaks a physical law (gas, production or
    /// withdrawal reversal).
    pub fn is_consistency(&self) -> bool {
        matches!(
            self,
            MbalError::NegativeFreeGas { .. }
                | MbalError::DecreasingProduction { .. }
                | MbalError::NonMonotonicWithdrawal { .. }
        )
    }

    pub fn is_convergence(&self) -> bool {
        matches!(self, MbalError::NonConvergence { .. })
    }
}

/// Fails with [`MbalError::LengthMismatch`] unless `left == right`.
pub(crate) fn ensure_same_len(what: &'static str, left: usize, right: usize) -> MbalResult<()> {
    if left == right {
        Ok(())
    } else {
        Err(MbalError::LengthMismatch { what, left, right })
    }
}
