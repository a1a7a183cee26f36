use charge_traits::BoxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChargeError {
    /// Target charging was evaluated without a SoC estimator.
    #[error("target charging unsupported: no soc estimator configured")]
    Unsupported,
    /// The ramping collaborator rejected a current change. The collaborator's
    /// error is kept as the source.
    #[error("ramp to {amps} A failed: {source}")]
    Actuation {
        amps: u32,
        #[source]
        source: BoxError,
    },
    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing current meter")]
    MissingMeter,
    #[error("missing ramper")]
    MissingRamper,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
