pub mod builder;
pub mod detect;
pub mod matrix;
pub mod staging;

pub use builder::{build, BuildReport};
pub use detect::{NoveltyDetector, Verdict};
pub use matrix::CorpusMatrix;
pub use staging::{stage, StageReport};

/// Errors from corpus assembly and persistence.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A row's width disagrees with the column list. This is a
    /// programming error, not a data problem: it aborts the batch
    /// instead of silently misaligning columns.
    #[error("row has {got} fields, expected {expected}")]
    SchemaMismatch { got: usize, expected: usize },

    /// Nothing to train or infer on.
    #[error("corpus matrix has no rows")]
    EmptyCorpus,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("artifact serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
