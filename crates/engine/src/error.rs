use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    /// The `children` relation is no longer a forest: a node was reached as
    /// its own ancestor during traversal. Construction should make this
    /// impossible, so this is an invariant violation, not bad input.
    #[error("cyclic children relation at node: {0}")]
    CyclicHierarchy(String),
}
