//! A `GenAlg` evolves a population of genomes.
//! Genomes are grouped into species, which share
//! fitness among their members and compete for
//! offspring, with externally computed fitness scores
//! as the source of selective pressure.
pub mod logging;
mod species;

pub use species::{Species, SpeciesID};

use crate::errors::{ConfigError, EpochError};
use crate::genomics::{Genome, InnovationDB};
use crate::networks::NeuralNet;
use crate::{GenomeID, Params, RandomSource};
use logging::Stats;

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Attempts at finding a second, distinct parent for crossover.
const MAX_PARENT_TRIES: usize = 5;

/// A population of genomes, evolved one epoch at a time.
///
/// Every epoch consumes one fitness score per genome, in the
/// order of [`genomes`], and returns the phenotypes of the next
/// generation, in the same order as the new [`genomes`].
///
/// [`genomes`]: GenAlg::genomes
pub struct GenAlg<R = StdRng> {
    genomes: Vec<Genome>,
    best_genomes: Vec<Genome>,
    species: Vec<Species>,
    innovation_db: InnovationDB,
    params: Params,
    num_inputs: usize,
    num_outputs: usize,
    generation: usize,
    next_genome_id: GenomeID,
    best_ever_fitness: f64,
    fitness_stats: Option<Stats>,
    rng: R,
}

impl GenAlg<StdRng> {
    /// Creates a new population whose randomness
    /// is fully determined by `seed`.
    ///
    /// # Examples
    /// ```
    /// use neatkit::{GenAlg, Params};
    ///
    /// let first = GenAlg::from_seed(2, 1, Params::default(), 42).unwrap();
    /// let second = GenAlg::from_seed(2, 1, Params::default(), 42).unwrap();
    ///
    /// assert_eq!(first.genomes(), second.genomes());
    /// ```
    pub fn from_seed(
        num_inputs: usize,
        num_outputs: usize,
        params: Params,
        seed: u64,
    ) -> Result<GenAlg<StdRng>, ConfigError> {
        GenAlg::new(num_inputs, num_outputs, params, StdRng::seed_from_u64(seed))
    }
}

impl<R: RandomSource> GenAlg<R> {
    /// Creates a new population of `params.population_size`
    /// minimal, fully connected genomes.
    ///
    /// # Errors
    /// Fails if `params` do not [validate], or
    /// if genomes would have no outputs.
    ///
    /// [validate]: Params::validate
    ///
    /// # Examples
    /// ```
    /// use neatkit::{GenAlg, Params};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let params = Params {
    ///     population_size: 50,
    ///     ..Params::default()
    /// };
    /// let ga = GenAlg::new(3, 2, params, StdRng::seed_from_u64(0)).unwrap();
    ///
    /// assert_eq!(ga.genomes().len(), 50);
    /// assert_eq!(ga.generation(), 0);
    /// assert!(GenAlg::new(3, 0, Params::default(), StdRng::seed_from_u64(0)).is_err());
    /// ```
    pub fn new(
        num_inputs: usize,
        num_outputs: usize,
        params: Params,
        mut rng: R,
    ) -> Result<GenAlg<R>, ConfigError> {
        params.validate()?;
        if num_outputs == 0 {
            return Err(ConfigError::NoOutputs);
        }

        let genomes: Vec<Genome> = (0..params.population_size)
            .map(|id| Genome::new(id, num_inputs, num_outputs, &mut rng))
            .collect();
        let innovation_db = InnovationDB::new(genomes[0].neurons(), genomes[0].links());
        log::info!(
            "created population of {} genomes with {} inputs and {} outputs",
            genomes.len(),
            num_inputs,
            num_outputs
        );

        Ok(GenAlg {
            next_genome_id: genomes.len(),
            genomes,
            best_genomes: vec![],
            species: vec![],
            innovation_db,
            params,
            num_inputs,
            num_outputs,
            generation: 0,
            best_ever_fitness: 0.0,
            fitness_stats: None,
            rng,
        })
    }

    /// Advances the population by one generation.
    ///
    /// `fitness_scores[i]` is the fitness of `genomes()[i]`.
    /// Species are aged and culled, genomes are scored and
    /// speciated, offspring are allotted to species by their
    /// shared fitness, and the next generation is bred.
    ///
    /// Returns the phenotypes of the new generation.
    ///
    /// # Errors
    /// Fails if there is not exactly one finite, non-negative
    /// score per genome. The population is left untouched.
    ///
    /// # Examples
    /// ```
    /// use neatkit::networks::UpdateType;
    /// use neatkit::{GenAlg, Params};
    ///
    /// let mut ga = GenAlg::from_seed(2, 1, Params::default(), 0).unwrap();
    /// let mut networks = ga.create_neural_networks();
    ///
    /// for _ in 0..5 {
    ///     let scores: Vec<f64> = networks
    ///         .iter_mut()
    ///         .map(|n| n.update(&[1.0, 0.0], UpdateType::Snapshot).unwrap()[0])
    ///         .collect();
    ///     networks = ga.epoch(&scores).unwrap();
    /// }
    ///
    /// assert_eq!(ga.generation(), 5);
    /// assert_eq!(networks.len(), 150);
    /// assert!(ga.epoch(&[1.0]).is_err());
    /// ```
    pub fn epoch(&mut self, fitness_scores: &[f64]) -> Result<Vec<NeuralNet>, EpochError> {
        self.validate_scores(fitness_scores)?;

        self.purge_species();
        self.score_genomes(fitness_scores);
        self.update_best_genomes();
        self.speciate();
        self.adjust_species_fitness();
        self.allocate_spawns();
        self.breed();
        self.generation += 1;

        log::info!(
            "generation {}: {} species, best ever fitness {:.4}",
            self.generation,
            self.species.len(),
            self.best_ever_fitness
        );
        Ok(self.create_neural_networks())
    }

    fn validate_scores(&self, fitness_scores: &[f64]) -> Result<(), EpochError> {
        if fitness_scores.len() != self.genomes.len() {
            return Err(EpochError::FitnessCountMismatch {
                expected: self.genomes.len(),
                actual: fitness_scores.len(),
            });
        }
        for (index, &score) in fitness_scores.iter().enumerate() {
            if !score.is_finite() {
                return Err(EpochError::NonFiniteFitness { index, score });
            }
            if score < 0.0 {
                return Err(EpochError::NegativeFitness { index, score });
            }
        }
        Ok(())
    }

    /// Empties every species, and removes those that have
    /// stagnated without holding the best-ever genome.
    fn purge_species(&mut self) {
        let limit = self.params.num_gens_allowed_no_improvement;
        let best_ever = self.best_ever_fitness;
        for species in &mut self.species {
            species.purge();
        }
        self.species.retain(|s| {
            let stagnated = s.gens_no_improvement() > limit && s.best_fitness() < best_ever;
            if stagnated {
                log::debug!(
                    "species {:?} removed after {} generations without improvement",
                    s.id(),
                    s.gens_no_improvement()
                );
            }
            !stagnated
        });
    }

    /// Assigns scores and sorts genomes best first.
    fn score_genomes(&mut self, fitness_scores: &[f64]) {
        for (genome, &score) in self.genomes.iter_mut().zip(fitness_scores) {
            genome.set_fitness(score);
        }
        self.genomes.sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));
        self.fitness_stats = Some(Stats::from(self.genomes.iter().map(|g| g.fitness())));
    }

    fn update_best_genomes(&mut self) {
        if let Some(best) = self.genomes.first() {
            self.best_ever_fitness = self.best_ever_fitness.max(best.fitness());
        }
        self.best_genomes = self
            .genomes
            .iter()
            .take(self.params.num_best_genomes.max(1))
            .cloned()
            .collect();
    }

    /// Places each genome in the first species whose leader
    /// it is compatible with, founding a new species otherwise.
    fn speciate(&mut self) {
        let mut born = 0;
        for idx in 0..self.genomes.len() {
            let compatible = self.species.iter().position(|s| {
                s.leader().compatibility_score(&self.genomes[idx], &self.params)
                    <= self.params.compatibility_threshold
            });
            let id = match compatible {
                Some(s) => {
                    self.species[s].add_member(idx, &self.genomes);
                    self.species[s].id()
                }
                None => {
                    let id = SpeciesID(self.generation, born);
                    born += 1;
                    self.species.push(Species::new(id, idx, &self.genomes));
                    id
                }
            };
            self.genomes[idx].species_id = Some(id);
        }
        log::debug!(
            "{} species after speciation, {} new",
            self.species.len(),
            born
        );
    }

    fn adjust_species_fitness(&mut self) {
        for species in &self.species {
            species.adjust_fitness(&mut self.genomes, &self.params);
        }
    }

    /// Gives each genome a share of the next generation
    /// proportional to its adjusted fitness, and totals
    /// the shares of each species.
    fn allocate_spawns(&mut self) {
        let total: f64 = self.genomes.iter().map(|g| g.adjusted_fitness()).sum();
        let average = total / self.genomes.len() as f64;
        if average > 0.0 {
            for genome in &mut self.genomes {
                genome.amount_to_spawn = genome.adjusted_fitness() / average;
            }
        } else {
            log::warn!("no genome scored above zero, spawning evenly");
            for genome in &mut self.genomes {
                genome.amount_to_spawn = 1.0;
            }
        }
        for species in &mut self.species {
            species.calculate_spawn_amount(&self.genomes);
        }
    }

    /// Replaces the current generation with offspring bred from
    /// each species, fittest species first. A species' leader is
    /// always carried over unchanged as its first offspring. Any
    /// shortfall left by rounding is filled by tournament selection.
    fn breed(&mut self) {
        let GenAlg {
            genomes,
            species,
            innovation_db,
            params,
            next_genome_id,
            rng,
            ..
        } = self;

        let population_size = params.population_size;
        let mut offspring: Vec<Genome> = Vec::with_capacity(population_size);
        let mut order: Vec<&Species> = species.iter().collect();
        order.sort_by(|a, b| b.best_fitness().total_cmp(&a.best_fitness()));

        for species in order {
            let to_spawn = species.spawns_required().round() as usize;
            for k in 0..to_spawn {
                if offspring.len() >= population_size {
                    break;
                }
                let mut child = if k == 0 {
                    species.leader().clone()
                } else {
                    produce_offspring(species, genomes, innovation_db, params, *next_genome_id, rng)
                };
                child.species_id = Some(species.id());
                offspring.push(prepare_child(child, next_genome_id));
            }
        }

        if offspring.len() < population_size {
            log::debug!(
                "filling {} offspring slots by tournament selection",
                population_size - offspring.len()
            );
        }
        while offspring.len() < population_size {
            let mut child = tournament_selection(genomes, params.tournament_size, rng).clone();
            child.species_id = None;
            offspring.push(prepare_child(child, next_genome_id));
        }

        *genomes = offspring;
    }

    /// Returns the phenotypes of the current generation,
    /// in the same order as [`genomes`].
    ///
    /// [`genomes`]: GenAlg::genomes
    pub fn create_neural_networks(&self) -> Vec<NeuralNet> {
        self.genomes.iter().map(NeuralNet::new).collect()
    }
}

impl<R> GenAlg<R> {
    /// Returns the current generation's genomes.
    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    /// Returns the fittest genome of the last scored generation.
    pub fn best_genome(&self) -> Option<&Genome> {
        self.best_genomes.first()
    }

    /// Returns the fittest genomes of the last scored
    /// generation, best first.
    pub fn best_genomes(&self) -> &[Genome] {
        &self.best_genomes
    }

    /// Returns the highest fitness any genome has achieved.
    pub fn best_ever_fitness(&self) -> f64 {
        self.best_ever_fitness
    }

    /// Returns the number of epochs elapsed.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Returns the species, as of the last speciation.
    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn innovation_db(&self) -> &InnovationDB {
        &self.innovation_db
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    /// Returns statistics on species sizes, as of the last speciation.
    ///
    /// # Examples
    /// ```
    /// use neatkit::{GenAlg, Params};
    ///
    /// let mut ga = GenAlg::from_seed(2, 1, Params::default(), 0).unwrap();
    /// ga.epoch(&vec![1.0; 150]).unwrap();
    ///
    /// let stats = ga.species_stats();
    /// assert!(stats.maximum >= stats.mean);
    /// assert!((stats.mean * ga.species().len() as f64 - 150.0).abs() < 1e-9);
    /// ```
    pub fn species_stats(&self) -> Stats {
        Stats::from(self.species.iter().map(|s| s.size() as f64))
    }

    /// Returns statistics on the fitness of the last scored generation.
    pub fn fitness_stats(&self) -> Option<&Stats> {
        self.fitness_stats.as_ref()
    }
}

/// Breeds a single child from the members of `species`.
fn produce_offspring<R: RandomSource>(
    species: &Species,
    genomes: &[Genome],
    db: &mut InnovationDB,
    params: &Params,
    child_id: GenomeID,
    rng: &mut R,
) -> Genome {
    let mum = species.spawn(genomes, params.survival_rate, rng);
    let mut child = if rng.chance(params.crossover_chance) {
        let dad = (0..MAX_PARENT_TRIES)
            .map(|_| species.spawn(genomes, params.survival_rate, rng))
            .find(|dad| dad.id() != mum.id());
        match dad {
            Some(dad) => mum.crossover(dad, db, child_id, rng),
            None => mum.clone(),
        }
    } else {
        mum.clone()
    };

    if child.num_hidden() < params.max_neurons {
        child.add_neuron(params.chance_add_neuron, db, params.max_tries_old_link, rng);
    }
    child.add_link(
        params.chance_add_link,
        params.chance_add_recurrent_link,
        db,
        params.max_tries_recurrent,
        params.max_tries_link,
        rng,
    );
    child.mutate_weights(
        params.mutation_rate,
        params.probability_weight_replaced,
        params.max_weight_perturbation,
        rng,
    );
    child.mutate_activation_response(
        params.activation_mutation_rate,
        params.max_activation_perturbation,
        rng,
    );
    child.sort_links();
    child
}

/// Clears a child's scores and gives it a fresh id.
fn prepare_child(mut child: Genome, next_genome_id: &mut GenomeID) -> Genome {
    child.set_id(*next_genome_id);
    *next_genome_id += 1;
    child.fitness = 0.0;
    child.adjusted_fitness = 0.0;
    child.amount_to_spawn = 0.0;
    child
}

/// Returns the fittest of `contestants` randomly drawn genomes.
fn tournament_selection<'g, R: RandomSource>(
    genomes: &'g [Genome],
    contestants: usize,
    rng: &mut R,
) -> &'g Genome {
    let last = genomes.len() - 1;
    let mut best = &genomes[rng.index(0, last)];
    for _ in 1..contestants {
        let contestant = &genomes[rng.index(0, last)];
        if contestant.fitness() > best.fitness() {
            best = contestant;
        }
    }
    best
}
