//! Error types shared by the simulator, the planners, and the CLI

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Main error type for all solver operations
#[derive(Debug)]
pub enum SolverError {
    /// Input JSON does not match the instance schema
    MalformedInput {
        /// Path to the offending file
        path: PathBuf,
        /// Description of the schema violation
        reason: String,
    },

    /// No glue-connected blueprint or build order was found within the deadline
    UnsolvableBlueprint {
        /// Time spent before giving up
        elapsed: Duration,
    },

    /// The wall clock ran out while a planner was still searching
    SolverTimeout {
        /// Nodes expanded before the timeout fired
        nodes_expanded: usize,
    },

    /// Heuristic pre-computation did not finish within its deadline
    PreComputationTimeout {
        /// Name of the pre-computation that was aborted
        operation: &'static str,
    },

    /// The anchoring stop condition was selected for a non-concrete target
    InvalidAnchoringTarget {
        /// First target cell found to be non-concrete
        cell: (i32, i32),
    },

    /// The instance cannot produce the target shape even in principle
    InvalidInstance {
        /// Explanation of the structural impossibility
        reason: String,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedInput { path, reason } => {
                write!(f, "Malformed instance '{}': {reason}", path.display())
            }
            Self::UnsolvableBlueprint { elapsed } => {
                write!(
                    f,
                    "No usable blueprint or build order found after {:.1}s",
                    elapsed.as_secs_f64()
                )
            }
            Self::SolverTimeout { nodes_expanded } => {
                write!(f, "Solver timed out after {nodes_expanded} expanded nodes")
            }
            Self::PreComputationTimeout { operation } => {
                write!(f, "Pre-computation of {operation} timed out")
            }
            Self::InvalidAnchoringTarget { cell } => {
                write!(
                    f,
                    "Anchoring target must be concrete, but ({}, {}) is not",
                    cell.0, cell.1
                )
            }
            Self::InvalidInstance { reason } => {
                write!(f, "Invalid instance: {reason}")
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for SolverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FileSystem { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for solver results
pub type Result<T> = std::result::Result<T, SolverError>;

impl SolverError {
    /// True for the two deadline kinds that the harness reports as `timed_out`
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::SolverTimeout { .. } | Self::UnsolvableBlueprint { .. }
        )
    }
}

/// Create a malformed-input error
pub fn malformed_input(path: impl Into<PathBuf>, reason: &impl ToString) -> SolverError {
    SolverError::MalformedInput {
        path: path.into(),
        reason: reason.to_string(),
    }
}

/// Create a file system error
pub fn fs_error(
    path: impl Into<PathBuf>,
    operation: &'static str,
    source: std::io::Error,
) -> SolverError {
    SolverError::FileSystem {
        path: path.into(),
        operation,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_classification() {
        assert!(SolverError::SolverTimeout { nodes_expanded: 7 }.is_timeout());
        assert!(
            SolverError::UnsolvableBlueprint {
                elapsed: Duration::from_secs(600)
            }
            .is_timeout()
        );
        assert!(
            !SolverError::InvalidInstance {
                reason: "no blueprint".to_string()
            }
            .is_timeout()
        );
    }

    #[test]
    fn test_display_contains_context() {
        let err = SolverError::InvalidAnchoringTarget { cell: (3, 4) };
        assert!(err.to_string().contains("(3, 4)"));
    }
}
