use thiserror::Error;

/// An error type indicating an invalid [`Params`] value.
///
/// [`Params`]: crate::Params
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A probability field lies outside of `[0, 1]`.
    #[error("probability `{name}` must be in [0, 1], got {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },
    /// A magnitude field is negative or not a number.
    #[error("`{name}` must be a non-negative number, got {value}")]
    NegativeValue { name: &'static str, value: f64 },
    /// The population would contain no genomes.
    #[error("population size must be at least 1")]
    ZeroPopulation,
    /// Tournament selection would draw no contestants.
    #[error("tournament size must be at least 1")]
    ZeroTournament,
    /// Genomes would have no output neurons.
    #[error("genomes must have at least one output")]
    NoOutputs,
}

/// An error type indicating fitness scores
/// that cannot be fed into an epoch.
///
/// Epochs are only advanced once the scores are
/// validated, so the population is left untouched
/// when any of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EpochError {
    /// There is not exactly one score per genome.
    #[error("expected {expected} fitness scores, got {actual}")]
    FitnessCountMismatch { expected: usize, actual: usize },
    /// A score is NaN or infinite.
    #[error("fitness score of genome {index} is not finite: {score}")]
    NonFiniteFitness { index: usize, score: f64 },
    /// A score is below zero.
    #[error("fitness score of genome {index} is negative: {score}")]
    NegativeFitness { index: usize, score: f64 },
}

/// An error type indicating a network
/// was activated with malformed inputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    /// The input vector's length differs from the network's input count.
    #[error("network expects {expected} inputs, got {actual}")]
    InputCountMismatch { expected: usize, actual: usize },
}
