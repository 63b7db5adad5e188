use thiserror::Error;

/// The only conditions a caller ever sees as errors.
///
/// Missing data, unavailable backends, and unreachable stores are all
/// recovered inside the engine and surface as defined answer strings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("question must not be empty")]
    EmptyQuestion,

    #[error("actor filter must not be empty")]
    InvalidActor,
}
