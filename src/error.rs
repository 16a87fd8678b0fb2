//! Error taxonomy for the nebula core.

/// Errors surfaced by the layout generator, graph builder, and data loader.
///
/// Two legitimate "nothing to do" states are deliberately not errors:
/// building a graph from zero points yields an empty graph, and triggering
/// a pulse with every edge already active yields `None`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input value: zero record count, negative magnitude,
    /// inverted neighbor bounds, or degenerate layout parameters.
    #[error("invalid domain value: {0}")]
    Domain(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
