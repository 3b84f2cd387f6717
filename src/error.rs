use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("Dimension mismatch in {op}: {left:?} and {right:?}")]
    DimensionMismatch {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },
    #[error("Matrix is degenerate: best available pivot is {pivot:e}")]
    SingularMatrix { pivot: f64 },
    #[error("{0}")]
    Ode(#[from] OdeError),
}

impl Error {
    pub(crate) fn dimension_mismatch(
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    ) -> Self {
        Error::DimensionMismatch { op, left, right }
    }

    /// whether this error was raised while validating the configuration,
    /// before any stepping took place
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

/// Errors raised while assembling an integration request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Specify at least one tolerance")]
    MissingTolerance,
    #[error("Invalid Butcher tableau: {0}")]
    InvalidTableau(String),
    #[error("Zero time span")]
    ZeroTimeSpan,
    #[error("Initial step has wrong sign")]
    InvalidInitstep,
    #[error("Invalid option: {0}")]
    InvalidOption(String),
    #[error("Element not initialized {0}")]
    Uninitialized(String),
}

impl From<derive_builder::UninitializedFieldError> for Error {
    fn from(err: derive_builder::UninitializedFieldError) -> Self {
        Error::Config(ConfigError::Uninitialized(err.to_string()))
    }
}

/// Errors raised by the stepping loop itself.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OdeError {
    #[error("Value of h plateaued at {h} (x = {x})")]
    StepSizePlateau { h: f64, x: f64 },
    #[error("Encountered a non finite state while stepping from {x} with h = {h}")]
    NonFinite { x: f64, h: f64 },
}
