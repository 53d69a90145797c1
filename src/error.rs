//! Error types.
//!
//! - `CalibError`: typed failures of the numeric core (weights, rebinning, fit).
//! - `AppError`: what the binary reports; carries the process exit code.
//!
//! Exit codes:
//! - 2: bad input, config or I/O
//! - 3: degenerate calibration data
//! - 4: numeric failure (fit did not converge, non-finite values)

/// Failures of the calibration core.
///
/// All of these are deterministic functions of the input data, so none of
/// them is retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalibError {
    /// Wrong sequence length, too few comparators, unusable parameter, or an
    /// input file that does not follow its format.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// `integrated[0] == integrated[N-1]`: the sweep has no usable dynamic range.
    #[error(
        "degenerate normalization: first and last comparator integrals are both {value}; \
         the calibration sweep must be re-acquired"
    )]
    DegenerateNormalization { value: i64 },

    /// The Gaussian peak fit could not be performed.
    #[error("fit failed: {0}")]
    Fit(String),
}

impl CalibError {
    pub fn malformed(message: impl Into<String>) -> Self {
        CalibError::MalformedInput(message.into())
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    /// Prefix the message with context (e.g. the dataset label in batch mode).
    pub fn context(self, context: impl std::fmt::Display) -> Self {
        Self {
            exit_code: self.exit_code,
            message: format!("{context}: {}", self.message),
        }
    }
}

impl From<CalibError> for AppError {
    fn from(err: CalibError) -> Self {
        let exit_code = match err {
            CalibError::MalformedInput(_) => 2,
            CalibError::DegenerateNormalization { .. } => 3,
            CalibError::Fit(_) => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
