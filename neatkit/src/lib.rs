//! An implementation of NeuroEvolution of Augmenting Topologies,
//! following the 2002 paper: <http://nn.cs.utexas.edu/keyword?stanley:ec02>
//!
//! Networks are evolved from minimal, fully connected genomes. Structural
//! mutations are tracked in a population-wide [`InnovationDB`] so crossover
//! can align genomes gene by gene, genomes are grouped into species that
//! share fitness among their members, and genomes are expressed as possibly
//! recurrent [`NeuralNet`]s.
//!
//! Fitness evaluation is left to the caller: [`GenAlg::epoch`] takes one
//! score per genome and returns the networks of the next generation.
//! All randomness comes from an injected [`RandomSource`], so runs can be
//! reproduced from a seed.
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade, and
//! installs no logger of its own.
//!
//! [`InnovationDB`]: genomics::InnovationDB
//! [`NeuralNet`]: networks::NeuralNet
//!
//! # Example usage: Evolution of XOR function approximator
//! ```
//! use neatkit::networks::{NeuralNet, UpdateType};
//! use neatkit::{GenAlg, Params};
//!
//! const CASES: [([f64; 2], f64); 4] = [
//!     ([0.0, 0.0], 0.0),
//!     ([0.0, 1.0], 1.0),
//!     ([1.0, 0.0], 1.0),
//!     ([1.0, 1.0], 0.0),
//! ];
//!
//! fn evaluate_xor(network: &mut NeuralNet) -> f64 {
//!     let error: f64 = CASES
//!         .iter()
//!         .map(|(input, expected)| {
//!             (network.update(input, UpdateType::Snapshot).unwrap()[0] - expected).abs()
//!         })
//!         .sum();
//!     (4.0 - error).powi(2)
//! }
//!
//! fn main() {
//!     let mut ga = GenAlg::from_seed(2, 1, Params::default(), 7).unwrap();
//!     let mut networks = ga.create_neural_networks();
//!
//!     for _ in 0..10 {
//!         let scores: Vec<f64> = networks.iter_mut().map(evaluate_xor).collect();
//!         if scores.iter().any(|s| *s > 15.95) {
//!             println!("Solution found in generation {}!", ga.generation());
//!             break;
//!         }
//!         networks = ga.epoch(&scores).unwrap();
//!     }
//!     println!("{:?}", ga.fitness_stats());
//! }
//! ```

mod config;
mod errors;
pub mod genomics;
pub mod networks;
pub mod populations;
mod rng;

pub use config::Params;
pub use errors::{ConfigError, EpochError, NetworkError};
pub use populations::logging;
pub use populations::GenAlg;
pub use rng::RandomSource;

/// Identifies a neuron across the whole population.
pub type NeuronID = usize;
/// Identifies a structural mutation across the whole population.
pub type InnovationID = usize;
/// Identifies a genome within a run.
pub type GenomeID = usize;
