use std::process::ExitCode;

pub mod account;
pub mod display;
pub mod error;
pub mod state;
pub mod url_utils;
pub mod watch;

/// How a client command ended. Failures have already been reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Failed,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Done => ExitCode::SUCCESS,
            Outcome::Failed => ExitCode::FAILURE,
        }
    }
}
