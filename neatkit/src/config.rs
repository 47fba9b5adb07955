use crate::errors::ConfigError;

use serde::{Deserialize, Serialize};

/// Tunable parameters of the evolutionary process.
///
/// # Note
/// All quantities expressing probabilities
/// should be in the range [0.0, 1.0]. [`GenAlg`]
/// refuses configurations that violate this, see
/// [`Params::validate`].
///
/// [`GenAlg`]: crate::GenAlg
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Params {
    /// Number of genomes in every generation.
    pub population_size: usize,
    /// Chance of a link addition mutation per offspring.
    pub chance_add_link: f64,
    /// Chance that a link addition attempts a self-recurrent link first.
    pub chance_add_recurrent_link: f64,
    /// Chance of a neuron addition mutation per offspring.
    pub chance_add_neuron: f64,
    /// Attempts at finding a neuron to make self-recurrent.
    pub max_tries_recurrent: usize,
    /// Attempts at finding an unlinked neuron pair.
    pub max_tries_link: usize,
    /// Attempts at finding an old link to split in small genomes.
    pub max_tries_old_link: usize,
    /// Per-link chance of a weight mutation.
    pub mutation_rate: f64,
    /// Chance a mutated weight is replaced instead of perturbed.
    pub probability_weight_replaced: f64,
    /// Maximum magnitude of a weight perturbation.
    pub max_weight_perturbation: f64,
    /// Per-neuron chance of an activation response mutation.
    pub activation_mutation_rate: f64,
    /// Maximum magnitude of an activation response perturbation.
    pub max_activation_perturbation: f64,
    /// Hidden neuron count above which no neurons are added.
    pub max_neurons: usize,
    /// Weight of excess genes in the compatibility score.
    pub excess_scaler: f64,
    /// Weight of disjoint genes in the compatibility score.
    pub disjoint_scaler: f64,
    /// Weight of the average matched weight difference in the compatibility score.
    pub match_scaler: f64,
    /// Compatibility score at or below which a genome joins a species.
    pub compatibility_threshold: f64,
    /// Chance an offspring is produced by crossover.
    pub crossover_chance: f64,
    /// Fraction of a species (best first) eligible for reproduction.
    pub survival_rate: f64,
    /// Number of best genomes kept as a snapshot each generation.
    pub num_best_genomes: usize,
    /// Generations a species may go without improving before being
    /// removed, unless it holds the best-ever fitness.
    pub num_gens_allowed_no_improvement: usize,
    /// Species younger than this get their fitness boosted.
    pub young_bonus_threshold: usize,
    /// Fitness multiplier for young species.
    pub young_fitness_bonus: f64,
    /// Species older than this get their fitness penalized.
    pub old_age_threshold: usize,
    /// Fitness multiplier for old species.
    pub old_age_penalty: f64,
    /// Contestants per tournament when filling a generation shortfall.
    pub tournament_size: usize,
}

impl Params {
    /// Returns a "zero-valued" configuration.
    /// All values are 0, except for the population
    /// and tournament sizes, which are 1.
    ///
    /// # Note
    /// This value is not suitable for use in most experiments.
    /// It is meant as a way to fill in unused values during
    /// configuration instantiation.
    ///
    /// # Examples
    /// ```
    /// use neatkit::Params;
    ///
    /// let params = Params {
    ///     // Specify some values here...
    ///     chance_add_neuron: 1.0,
    ///     // Default the rest...
    ///     ..Params::zero()
    /// };
    /// assert!(params.validate().is_ok());
    /// ```
    pub const fn zero() -> Params {
        Params {
            population_size: 1,
            chance_add_link: 0.0,
            chance_add_recurrent_link: 0.0,
            chance_add_neuron: 0.0,
            max_tries_recurrent: 0,
            max_tries_link: 0,
            max_tries_old_link: 0,
            mutation_rate: 0.0,
            probability_weight_replaced: 0.0,
            max_weight_perturbation: 0.0,
            activation_mutation_rate: 0.0,
            max_activation_perturbation: 0.0,
            max_neurons: 0,
            excess_scaler: 0.0,
            disjoint_scaler: 0.0,
            match_scaler: 0.0,
            compatibility_threshold: 0.0,
            crossover_chance: 0.0,
            survival_rate: 0.0,
            num_best_genomes: 0,
            num_gens_allowed_no_improvement: 0,
            young_bonus_threshold: 0,
            young_fitness_bonus: 0.0,
            old_age_threshold: 0,
            old_age_penalty: 0.0,
            tournament_size: 1,
        }
    }

    /// Checks that every probability lies in `[0, 1]`,
    /// every magnitude is non-negative, and the population
    /// and tournament sizes are non-zero.
    ///
    /// # Examples
    /// ```
    /// use neatkit::{ConfigError, Params};
    ///
    /// let params = Params {
    ///     crossover_chance: 1.5,
    ///     ..Params::default()
    /// };
    /// assert_eq!(
    ///     params.validate(),
    ///     Err(ConfigError::ProbabilityOutOfRange { name: "crossover_chance", value: 1.5 })
    /// );
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::ZeroPopulation);
        }
        if self.tournament_size == 0 {
            return Err(ConfigError::ZeroTournament);
        }
        for (name, value) in [
            ("chance_add_link", self.chance_add_link),
            ("chance_add_recurrent_link", self.chance_add_recurrent_link),
            ("chance_add_neuron", self.chance_add_neuron),
            ("mutation_rate", self.mutation_rate),
            ("probability_weight_replaced", self.probability_weight_replaced),
            ("activation_mutation_rate", self.activation_mutation_rate),
            ("crossover_chance", self.crossover_chance),
            ("survival_rate", self.survival_rate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ProbabilityOutOfRange { name, value });
            }
        }
        for (name, value) in [
            ("max_weight_perturbation", self.max_weight_perturbation),
            ("max_activation_perturbation", self.max_activation_perturbation),
            ("excess_scaler", self.excess_scaler),
            ("disjoint_scaler", self.disjoint_scaler),
            ("match_scaler", self.match_scaler),
            ("compatibility_threshold", self.compatibility_threshold),
            ("young_fitness_bonus", self.young_fitness_bonus),
            ("old_age_penalty", self.old_age_penalty),
        ] {
            // Also rejects NaN.
            if !(value >= 0.0) {
                return Err(ConfigError::NegativeValue { name, value });
            }
        }
        Ok(())
    }
}

impl Default for Params {
    /// Values suited to small problems such as XOR: a
    /// population of 150, and a compatibility threshold that
    /// groups the population into a few dozen species.
    fn default() -> Params {
        Params {
            population_size: 150,
            chance_add_link: 0.3,
            chance_add_recurrent_link: 0.05,
            chance_add_neuron: 0.05,
            max_tries_recurrent: 5,
            max_tries_link: 5,
            max_tries_old_link: 5,
            mutation_rate: 0.8,
            probability_weight_replaced: 0.1,
            max_weight_perturbation: 0.5,
            activation_mutation_rate: 0.1,
            max_activation_perturbation: 0.1,
            max_neurons: 100,
            excess_scaler: 1.0,
            disjoint_scaler: 1.0,
            match_scaler: 0.4,
            compatibility_threshold: 1.5,
            crossover_chance: 0.75,
            survival_rate: 0.5,
            num_best_genomes: 5,
            num_gens_allowed_no_improvement: 15,
            young_bonus_threshold: 5,
            young_fitness_bonus: 1.3,
            old_age_threshold: 10,
            old_age_penalty: 0.7,
            tournament_size: 5,
        }
    }
}
