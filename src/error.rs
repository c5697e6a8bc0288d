use std::fmt;

#[derive(Debug)]
pub enum MembraneError {
    /// A parameter failed validation while building a solver.
    InvalidParameter { name: &'static str, reason: String },
    /// The field blew up (non-finite or past the divergence limit) at `step`.
    NumericalInstability { step: usize, peak: f64 },
    Config(String),
    Io(std::io::Error),
}

impl MembraneError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        MembraneError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for MembraneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MembraneError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter '{name}': {reason}")
            }
            MembraneError::NumericalInstability { step, peak } => {
                write!(f, "Numerical instability at step {step} (peak displacement {peak:e})")
            }
            MembraneError::Config(msg) => write!(f, "Config error: {msg}"),
            MembraneError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for MembraneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MembraneError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for MembraneError {
    fn from(e: serde_json::Error) -> Self {
        MembraneError::Config(e.to_string())
    }
}

impl From<std::io::Error> for MembraneError {
    fn from(e: std::io::Error) -> Self {
        MembraneError::Io(e)
    }
}
