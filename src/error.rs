use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the simulation core and the distribution models.
///
/// Fallible paths return this instead of panicking; `.unwrap()`/`.expect()`
/// are reserved for tests.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid user or API parameter.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// The requested particle count and size cannot fit the box without
    /// overlap at grid spacing. No partial state is produced.
    #[error("infeasible configuration: {0}")]
    Infeasible(String),

    /// Numerical degeneracy (near-coincident particle centers, zero ensemble
    /// speed, singular fit system).
    #[error("numerical error: {0}")]
    MathError(String),
}
