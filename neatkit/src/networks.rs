//! A `NeuralNet` is the phenotype of a [`Genome`]:
//! neuron genes become neurons, and enabled link
//! genes become weighted links between them. Disabled
//! genes are ignored.
//!
//! Neurons live in a single arena ordered inputs first,
//! then bias, hidden neurons by depth, and outputs last,
//! so that a single sweep in arena order propagates
//! signals through the whole feed-forward part of the
//! network. Hidden neurons are not ordered by id: ids are
//! handed out as neurons are discovered, so a later neuron
//! may feed an earlier one, and every output id is smaller
//! than every hidden id.
//!
//! Links are stored as pairs of arena indices.
//! Recurrent links read the signal their source produced
//! on the previous sweep.
//!
//! Neurons apply a steepened sigmoid, `1 / (1 + e^(-4.9 x / r))`,
//! where `r` is the neuron's activation response.

use crate::errors::NetworkError;
use crate::genomics::{Genome, NeuronType};
use crate::NeuronID;

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// How a network is driven by [`NeuralNet::update`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateType {
    /// Sweeps the network as many times as it is deep,
    /// then clears all signals. Suited to classification,
    /// where each input is independent of the last.
    Snapshot,
    /// Sweeps the network once and keeps its signals,
    /// so state carries over between calls. Suited to
    /// control tasks running over many time steps.
    Active,
}

/// A weighted connection between two neurons,
/// identified by their arena indices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    from: usize,
    to: usize,
    weight: f64,
    recurrent: bool,
}

impl Link {
    /// Returns the arena index of the source neuron.
    pub fn from(&self) -> usize {
        self.from
    }

    /// Returns the arena index of the destination neuron.
    pub fn to(&self) -> usize {
        self.to
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn recurrent(&self) -> bool {
        self.recurrent
    }
}

/// A network neuron, holding its signal across updates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Neuron {
    id: NeuronID,
    neuron_type: NeuronType,
    activation_response: f64,
    split_x: f64,
    split_y: f64,
    sum_activation: f64,
    output_signal: f64,
    links_in: Vec<usize>,
    links_out: Vec<usize>,
}

impl Neuron {
    /// Returns the id of the gene the neuron was built from.
    pub fn id(&self) -> NeuronID {
        self.id
    }

    pub fn neuron_type(&self) -> NeuronType {
        self.neuron_type
    }

    pub fn activation_response(&self) -> f64 {
        self.activation_response
    }

    pub fn split_x(&self) -> f64 {
        self.split_x
    }

    pub fn split_y(&self) -> f64 {
        self.split_y
    }

    /// Returns the weighted input sum of the last sweep.
    pub fn sum_activation(&self) -> f64 {
        self.sum_activation
    }

    pub fn output_signal(&self) -> f64 {
        self.output_signal
    }

    /// Returns the indices of the links into this neuron.
    pub fn links_in(&self) -> &[usize] {
        &self.links_in
    }

    /// Returns the indices of the links out of this neuron.
    pub fn links_out(&self) -> &[usize] {
        &self.links_out
    }
}

/// An arbitrarily-structured, possibly recurrent, neural network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NeuralNet {
    neurons: Vec<Neuron>,
    links: Vec<Link>,
    num_inputs: usize,
    num_outputs: usize,
    first_computed: usize,
    depth: usize,
}

impl NeuralNet {
    /// Generates a new network from the passed genome.
    ///
    /// # Examples
    /// ```
    /// use neatkit::genomics::Genome;
    /// use neatkit::networks::NeuralNet;
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let genome = Genome::new(0, 3, 2, &mut StdRng::seed_from_u64(0));
    /// let network = NeuralNet::new(&genome);
    ///
    /// assert_eq!(network.neurons().len(), 6);
    /// assert_eq!(network.links().len(), 8);
    /// assert_eq!(network.depth(), 2);
    /// ```
    pub fn new(genome: &Genome) -> NeuralNet {
        let mut genes: Vec<_> = genome.neurons().iter().collect();
        genes.sort_by(|a, b| {
            arena_rank(a.neuron_type())
                .cmp(&arena_rank(b.neuron_type()))
                .then_with(|| match a.neuron_type() {
                    NeuronType::Hidden => a.split_y().total_cmp(&b.split_y()),
                    _ => Ordering::Equal,
                })
                .then_with(|| a.id().cmp(&b.id()))
        });

        let mut neurons: Vec<Neuron> = genes
            .iter()
            .map(|gene| Neuron {
                id: gene.id(),
                neuron_type: gene.neuron_type(),
                activation_response: gene.activation_response(),
                split_x: gene.split_x(),
                split_y: gene.split_y(),
                sum_activation: 0.0,
                output_signal: 0.0,
                links_in: vec![],
                links_out: vec![],
            })
            .collect();
        let index_from_id: HashMap<NeuronID, usize, RandomState> = neurons
            .iter()
            .enumerate()
            .map(|(idx, n)| (n.id, idx))
            .collect();

        let mut links = Vec::with_capacity(genome.num_links());
        for gene in genome.links().iter().filter(|l| l.enabled()) {
            let (from, to) = (index_from_id[&gene.from()], index_from_id[&gene.to()]);
            neurons[from].links_out.push(links.len());
            neurons[to].links_in.push(links.len());
            links.push(Link {
                from,
                to,
                weight: gene.weight(),
                recurrent: gene.recurrent(),
            });
        }

        let count = |neuron_type| neurons.iter().filter(|n| n.neuron_type == neuron_type).count();
        let num_inputs = count(NeuronType::Input);
        let num_outputs = count(NeuronType::Output);
        let first_computed = num_inputs + count(NeuronType::Bias);

        let mut network = NeuralNet {
            neurons,
            links,
            num_inputs,
            num_outputs,
            first_computed,
            depth: 1,
        };
        network.depth = network.get_depth().max(1);
        network
    }

    /// Feeds `inputs` through the network and returns
    /// the output neurons' signals, in output order.
    ///
    /// # Errors
    /// Fails if there is not exactly one value per input neuron.
    ///
    /// # Examples
    /// ```
    /// use neatkit::genomics::{Genome, LinkGene, NeuronGene, NeuronType};
    /// use neatkit::networks::{NeuralNet, UpdateType};
    ///
    /// let genome = Genome::from_genes(
    ///     0,
    ///     vec![
    ///         NeuronGene::new(0, NeuronType::Input, 0.66, 0.0),
    ///         NeuronGene::new(1, NeuronType::Bias, 0.33, 0.0),
    ///         NeuronGene::new(2, NeuronType::Output, 0.5, 1.0),
    ///     ],
    ///     vec![LinkGene::new(0, 2, 2.0, false, 3), LinkGene::new(1, 2, -1.0, false, 4)],
    ///     1,
    ///     1,
    /// );
    /// let mut network = NeuralNet::new(&genome);
    ///
    /// let output = network.update(&[0.5], UpdateType::Snapshot).unwrap();
    /// // 2.0 * 0.5 - 1.0 * 1.0 = 0
    /// assert_eq!(output, vec![0.5]);
    ///
    /// assert!(network.update(&[0.5, 0.5], UpdateType::Active).is_err());
    /// ```
    pub fn update(&mut self, inputs: &[f64], mode: UpdateType) -> Result<Vec<f64>, NetworkError> {
        if inputs.len() != self.num_inputs {
            return Err(NetworkError::InputCountMismatch {
                expected: self.num_inputs,
                actual: inputs.len(),
            });
        }

        let sweeps = match mode {
            UpdateType::Snapshot => self.depth,
            UpdateType::Active => 1,
        };
        for _ in 0..sweeps {
            for (neuron, input) in self.neurons.iter_mut().zip(inputs) {
                neuron.output_signal = *input;
            }
            for bias in &mut self.neurons[self.num_inputs..self.first_computed] {
                bias.output_signal = 1.0;
            }
            for idx in self.first_computed..self.neurons.len() {
                let sum: f64 = self.neurons[idx]
                    .links_in
                    .iter()
                    .map(|&l| {
                        let link = &self.links[l];
                        link.weight * self.neurons[link.from].output_signal
                    })
                    .sum();
                let neuron = &mut self.neurons[idx];
                neuron.sum_activation = sum;
                neuron.output_signal = sigmoid(sum, neuron.activation_response);
            }
        }

        let outputs = self.neurons[self.neurons.len() - self.num_outputs..]
            .iter()
            .map(|n| n.output_signal)
            .collect();
        if mode == UpdateType::Snapshot {
            self.reset();
        }
        Ok(outputs)
    }

    /// Calculates the number of neurons along the longest
    /// non-recurrent path from an input or the bias to an output.
    /// Returns 0 if no output can be reached.
    pub fn get_depth(&self) -> usize {
        let mut longest = vec![None; self.neurons.len()];
        let mut on_path = vec![false; self.neurons.len()];
        (0..self.first_computed)
            .filter_map(|root| self.longest_path_from(root, &mut longest, &mut on_path))
            .max()
            .unwrap_or(0)
    }

    /// Longest path, counted in neurons, from `idx` to an output,
    /// if one is reachable. Recurrent links are not followed, and
    /// neither are links closing a cycle.
    fn longest_path_from(
        &self,
        idx: usize,
        longest: &mut [Option<Option<usize>>],
        on_path: &mut [bool],
    ) -> Option<usize> {
        if let Some(known) = longest[idx] {
            return known;
        }
        on_path[idx] = true;
        let mut best = (self.neurons[idx].neuron_type == NeuronType::Output).then(|| 1);
        for &l in &self.neurons[idx].links_out {
            let link = &self.links[l];
            if link.recurrent || on_path[link.to] {
                continue;
            }
            if let Some(rest) = self.longest_path_from(link.to, longest, on_path) {
                best = Some(best.map_or(rest + 1, |b| b.max(rest + 1)));
            }
        }
        on_path[idx] = false;
        longest[idx] = Some(best);
        best
    }

    /// Clears every neuron's signal.
    pub fn reset(&mut self) {
        for neuron in &mut self.neurons {
            neuron.sum_activation = 0.0;
            neuron.output_signal = 0.0;
        }
    }

    /// Returns the neurons, in evaluation order.
    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Returns the number of sweeps performed by a snapshot update.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }
}

impl From<&Genome> for NeuralNet {
    fn from(genome: &Genome) -> NeuralNet {
        NeuralNet::new(genome)
    }
}

impl fmt::Display for NeuralNet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let links: Vec<String> = self
            .links
            .iter()
            .map(|l| {
                format!(
                    "{} -> {} ({:+.4}){}",
                    self.neurons[l.from].id,
                    self.neurons[l.to].id,
                    l.weight,
                    if l.recurrent { " rec" } else { "" }
                )
            })
            .collect();
        f.debug_struct("NeuralNet")
            .field("Depth", &self.depth)
            .field("Links", &links)
            .finish()
    }
}

fn arena_rank(neuron_type: NeuronType) -> u8 {
    match neuron_type {
        NeuronType::Input => 0,
        NeuronType::Bias => 1,
        NeuronType::Hidden => 2,
        NeuronType::Output => 3,
    }
}

/// Steepens the activation so that sums in `[-1, 1]`
/// span nearly all of `(0, 1)`.
const SIGMOID_STEEPNESS: f64 = 4.9;

fn sigmoid(x: f64, response: f64) -> f64 {
    let response = if response.abs() < f64::EPSILON {
        f64::EPSILON.copysign(response)
    } else {
        response
    };
    1.0 / (1.0 + (-SIGMOID_STEEPNESS * x / response).exp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{InnovationDB, LinkGene, NeuronGene};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sig(x: f64) -> f64 {
        1.0 / (1.0 + (-SIGMOID_STEEPNESS * x).exp())
    }

    /// Input 0, bias 1, output 2 and two hidden
    /// neurons whose ids run against their depth.
    fn chain() -> Genome {
        Genome::from_genes(
            0,
            vec![
                NeuronGene::new(0, NeuronType::Input, 0.66, 0.0),
                NeuronGene::new(1, NeuronType::Bias, 0.33, 0.0),
                NeuronGene::new(2, NeuronType::Output, 0.5, 1.0),
                NeuronGene::new(3, NeuronType::Hidden, 0.5, 0.75),
                NeuronGene::new(4, NeuronType::Hidden, 0.5, 0.5),
            ],
            vec![
                LinkGene::new(0, 4, 1.0, false, 5),
                LinkGene::new(4, 3, 1.0, false, 6),
                LinkGene::new(3, 2, 1.0, false, 7),
            ],
            1,
            1,
        )
    }

    #[test]
    fn arena_order() {
        let network = NeuralNet::new(&chain());
        let ids: Vec<_> = network.neurons().iter().map(|n| n.id()).collect();
        assert_eq!(ids, vec![0, 1, 4, 3, 2]);
        assert_eq!(network.neurons()[2].links_in(), &[0]);
        assert_eq!(network.neurons()[2].links_out(), &[1]);
    }

    #[test]
    fn depth_counts_neurons() {
        assert_eq!(NeuralNet::new(&chain()).get_depth(), 4);
        let genome = Genome::new(0, 2, 2, &mut ChaCha8Rng::seed_from_u64(0));
        assert_eq!(NeuralNet::new(&genome).depth(), 2);
    }

    #[test]
    fn depth_ignores_recurrent_links() {
        let mut genome = chain();
        let mut db = InnovationDB::new(genome.neurons(), genome.links());
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        // Loop the output onto itself.
        assert!(genome.add_link(1.0, 1.0, &mut db, 10, 0, &mut rng));
        assert_eq!(NeuralNet::new(&genome).get_depth(), 4);
    }

    #[test]
    fn unreachable_output_has_minimum_depth() {
        let genome = Genome::from_genes(
            0,
            vec![
                NeuronGene::new(0, NeuronType::Input, 0.66, 0.0),
                NeuronGene::new(1, NeuronType::Bias, 0.33, 0.0),
                NeuronGene::new(2, NeuronType::Output, 0.5, 1.0),
            ],
            vec![],
            1,
            1,
        );
        let mut network = NeuralNet::new(&genome);
        assert_eq!(network.get_depth(), 0);
        assert_eq!(network.depth(), 1);
        assert_eq!(network.update(&[3.0], UpdateType::Snapshot).unwrap(), vec![0.5]);
    }

    #[test]
    fn single_sweep_feeds_forward() {
        let mut network = NeuralNet::new(&chain());
        let output = network.update(&[0.3], UpdateType::Active).unwrap();
        assert_eq!(output, vec![sig(sig(sig(0.3)))]);
    }

    #[test]
    fn disabled_links_ignored() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut genome = Genome::new(0, 2, 1, &mut rng);
        let mut db = InnovationDB::new(genome.neurons(), genome.links());
        genome.add_neuron(1.0, &mut db, 5, &mut rng);
        let network = NeuralNet::new(&genome);
        assert_eq!(network.links().len(), 4);
        assert_eq!(network.neurons().len(), 5);
    }

    #[test]
    fn outputs_in_unit_interval() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let mut genome = Genome::new(0, 3, 2, &mut rng);
        let mut db = InnovationDB::new(genome.neurons(), genome.links());
        for _ in 0..10 {
            genome.add_neuron(0.5, &mut db, 5, &mut rng);
            genome.add_link(0.8, 0.2, &mut db, 5, 5, &mut rng);
        }
        let mut network = NeuralNet::new(&genome);
        for mode in [UpdateType::Snapshot, UpdateType::Active] {
            for _ in 0..5 {
                let outputs = network.update(&[0.1, -0.4, 0.9], mode).unwrap();
                assert_eq!(outputs.len(), 2);
                assert!(outputs.iter().all(|o| *o > 0.0 && *o < 1.0));
            }
        }
    }

    #[test]
    fn snapshot_is_stateless() {
        let mut genome = chain();
        let mut db = InnovationDB::new(genome.neurons(), genome.links());
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(genome.add_link(1.0, 1.0, &mut db, 10, 0, &mut rng));
        let mut network = NeuralNet::new(&genome);

        let first = network.update(&[0.7], UpdateType::Snapshot).unwrap();
        assert!(network.neurons().iter().all(|n| n.output_signal() == 0.0));
        let second = network.update(&[0.7], UpdateType::Snapshot).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn active_keeps_state() {
        let mut genome = chain();
        let mut db = InnovationDB::new(genome.neurons(), genome.links());
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(genome.add_link(1.0, 1.0, &mut db, 10, 0, &mut rng));
        let mut network = NeuralNet::new(&genome);

        let first = network.update(&[0.7], UpdateType::Active).unwrap();
        let second = network.update(&[0.7], UpdateType::Active).unwrap();
        assert_ne!(first, second);
        network.reset();
        assert_eq!(network.update(&[0.7], UpdateType::Active).unwrap(), first);
    }

    #[test]
    fn input_count_mismatch() {
        let mut network = NeuralNet::new(&chain());
        assert_eq!(
            network.update(&[], UpdateType::Active),
            Err(NetworkError::InputCountMismatch {
                expected: 1,
                actual: 0
            })
        );
    }

    #[test]
    fn activation_response_scales() {
        assert_eq!(sigmoid(2.0, 2.0), sig(1.0));
        assert!(sigmoid(1.0, 0.0) > 0.99);
        assert!(sigmoid(1.0, -0.0) < 0.01);
    }
}
