//! CLI error types and exit codes.

use arbor_wire::ApiError;
use thiserror::Error;

/// Exit codes for the CLI
/// - 0: success
/// - 1: one or more tasks reported a failure return code
/// - 3: the directory service could not be reached
/// - 4: invalid input or task file
/// - 5: the directory service reported a fault
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Task file error: {0}")]
    TaskFile(String),

    #[error("Invalid input: {0}")]
    Input(String),

    #[error("{failed} task(s) failed")]
    TasksFailed { failed: usize },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::TasksFailed { .. } => 1,
            CliError::TaskFile(_) | CliError::Input(_) => 4,
            CliError::Output(_) => 1,
            CliError::Api(api) => match api {
                ApiError::Validation(_) | ApiError::NotFound(_) | ApiError::Ambiguous { .. } => 4,
                ApiError::Connectivity { .. } => 3,
                ApiError::RemoteFault { .. }
                | ApiError::FatalFault { .. }
                | ApiError::InvalidResponse(_)
                | ApiError::UnsupportedVersion { .. }
                | ApiError::InvalidCredentials => 5,
            },
        }
    }
}
