//! Genomes are the focus of evolution in NEAT.
//! They are a collection of neuron and link genes that can be
//! instantiated as a phenotype (a neural network). Genomes can be
//! progressively mutated, thus adding complexity and functionality.
//!
//! Structural mutations are registered in an [`InnovationDB`]
//! shared by the whole population, so that crossover can align
//! two genomes gene by gene.

mod genes;
mod history;

pub use genes::{LinkGene, NeuronGene, NeuronType};
pub use history::{Innovation, InnovationDB, InnovationType};

use crate::populations::SpeciesID;
use crate::{GenomeID, InnovationID, NeuronID, Params, RandomSource};

use serde::{Deserialize, Serialize};

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

/// A mutable collection of neuron and link genes.
///
/// Neuron genes are kept sorted by id, and link genes
/// by innovation id, and every link refers to neurons
/// present in the genome.
///
/// Suports Serde for convenient genome saving and loading.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Genome {
    id: GenomeID,
    neurons: Vec<NeuronGene>,
    links: Vec<LinkGene>,
    num_inputs: usize,
    num_outputs: usize,
    pub(crate) fitness: f64,
    pub(crate) adjusted_fitness: f64,
    pub(crate) amount_to_spawn: f64,
    pub(crate) species_id: Option<SpeciesID>,
}

impl Genome {
    /// Creates a minimal, fully connected genome.
    ///
    /// Inputs get neuron ids `0..num_inputs`, the bias
    /// neuron `num_inputs`, and outputs the ids following it.
    /// Every input and the bias are linked to every output,
    /// with weights drawn uniformly from `[-1, 1]`. The link
    /// from the `s`-th source to the `j`-th output is given the
    /// innovation id `n + s ⨯ num_outputs + j`, with `n` the
    /// genome's neuron count.
    ///
    /// # Examples
    /// ```
    /// use neatkit::genomics::{Genome, NeuronType};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let genome = Genome::new(0, 3, 2, &mut StdRng::seed_from_u64(0));
    ///
    /// // 3 inputs + bias + 2 outputs.
    /// assert_eq!(genome.num_neurons(), 3 + 1 + 2);
    /// assert_eq!(genome.neurons().iter().filter(|n| n.neuron_type() == NeuronType::Bias).count(), 1);
    ///
    /// // A link from every input and the bias to every output.
    /// assert_eq!(genome.num_links(), (3 + 1) * 2);
    /// assert!(genome.links().iter().all(|l| l.weight().abs() <= 1.0));
    /// ```
    pub fn new<R: RandomSource>(
        id: GenomeID,
        num_inputs: usize,
        num_outputs: usize,
        rng: &mut R,
    ) -> Genome {
        let mut neurons = Vec::with_capacity(num_inputs + num_outputs + 1);
        let input_x_step = (num_inputs + 2) as f64;
        neurons.extend((0..num_inputs).map(|k| {
            NeuronGene::new(k, NeuronType::Input, (k + 2) as f64 / input_x_step, 0.0)
        }));
        neurons.push(NeuronGene::new(
            num_inputs,
            NeuronType::Bias,
            1.0 / input_x_step,
            0.0,
        ));
        neurons.extend((0..num_outputs).map(|k| {
            NeuronGene::new(
                num_inputs + 1 + k,
                NeuronType::Output,
                (k + 1) as f64 / (num_outputs + 1) as f64,
                1.0,
            )
        }));

        let num_neurons = neurons.len();
        let links = (0..=num_inputs)
            .flat_map(|source| (0..num_outputs).map(move |output| (source, output)))
            .map(|(source, output)| {
                LinkGene::new(
                    source,
                    num_inputs + 1 + output,
                    rng.uniform(-1.0, 1.0),
                    false,
                    num_neurons + source * num_outputs + output,
                )
            })
            .collect();

        Genome::from_parts(id, neurons, links, num_inputs, num_outputs)
    }

    /// Creates a genome from arbitrary genes. Genes
    /// are sorted by id and innovation id respectively.
    ///
    /// # Panics
    /// Panics if a link refers to a neuron that is not
    /// among `neurons`, or if two neurons share an id.
    ///
    /// # Examples
    /// ```
    /// use neatkit::genomics::{Genome, LinkGene, NeuronGene, NeuronType};
    ///
    /// let genome = Genome::from_genes(
    ///     7,
    ///     vec![
    ///         NeuronGene::new(2, NeuronType::Output, 0.5, 1.0),
    ///         NeuronGene::new(0, NeuronType::Input, 0.66, 0.0),
    ///         NeuronGene::new(1, NeuronType::Bias, 0.33, 0.0),
    ///     ],
    ///     vec![
    ///         LinkGene::new(1, 2, 0.5, false, 4),
    ///         LinkGene::new(0, 2, -0.5, false, 3),
    ///     ],
    ///     1,
    ///     1,
    /// );
    /// assert_eq!(genome.neurons()[0].id(), 0);
    /// assert_eq!(genome.links()[0].innovation(), 3);
    /// ```
    pub fn from_genes(
        id: GenomeID,
        mut neurons: Vec<NeuronGene>,
        mut links: Vec<LinkGene>,
        num_inputs: usize,
        num_outputs: usize,
    ) -> Genome {
        neurons.sort_by_key(|n| n.id);
        links.sort_by_key(|l| l.innovation);
        assert!(
            neurons.windows(2).all(|w| w[0].id != w[1].id),
            "duplicate neuron id in genome {}",
            id
        );
        let genome = Genome::from_parts(id, neurons, links, num_inputs, num_outputs);
        for link in &genome.links {
            assert!(
                genome.neuron_index(link.from).is_some() && genome.neuron_index(link.to).is_some(),
                "link {} refers to an absent neuron in genome {}",
                link,
                id
            );
        }
        genome
    }

    fn from_parts(
        id: GenomeID,
        neurons: Vec<NeuronGene>,
        links: Vec<LinkGene>,
        num_inputs: usize,
        num_outputs: usize,
    ) -> Genome {
        Genome {
            id,
            neurons,
            links,
            num_inputs,
            num_outputs,
            fitness: 0.0,
            adjusted_fitness: 0.0,
            amount_to_spawn: 0.0,
            species_id: None,
        }
    }

    /// Attempts to add a new link to the genome, with
    /// probability `mutation_prob`.
    ///
    /// With probability `recurrent_prob`, up to `max_tries_recurrent`
    /// attempts are made at finding a non-input neuron to give a
    /// self-recurrent link. Failing that, up to `max_tries_link`
    /// random neuron pairs are tried, looking for a pair that is not
    /// yet linked and whose destination is neither an input nor the
    /// bias. Links pointing to a neuron at the same or a lower depth
    /// are flagged as recurrent.
    ///
    /// Returns whether a link was added.
    ///
    /// # Examples
    /// ```
    /// use neatkit::genomics::{Genome, InnovationDB};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let mut rng = StdRng::seed_from_u64(3);
    /// let mut genome = Genome::new(0, 2, 1, &mut rng);
    /// let mut db = InnovationDB::new(genome.neurons(), genome.links());
    ///
    /// // A fully connected genome with no hidden neurons
    /// // only has room for a loop on its output.
    /// assert!(!genome.add_link(1.0, 0.0, &mut db, 5, 20, &mut rng));
    /// assert!(genome.add_link(1.0, 1.0, &mut db, 5, 20, &mut rng));
    /// assert_eq!(genome.num_links(), 4);
    /// assert!(genome.links().iter().any(|l| l.recurrent() && l.from() == l.to()));
    ///
    /// // Never fires with zero probability.
    /// assert!(!genome.add_link(0.0, 0.0, &mut db, 5, 5, &mut rng));
    /// ```
    pub fn add_link<R: RandomSource>(
        &mut self,
        mutation_prob: f64,
        recurrent_prob: f64,
        db: &mut InnovationDB,
        max_tries_recurrent: usize,
        max_tries_link: usize,
        rng: &mut R,
    ) -> bool {
        if !rng.chance(mutation_prob) {
            return false;
        }

        let first_linkable = self.num_inputs + 1;
        let last = self.neurons.len() - 1;

        let mut endpoints = None;
        if rng.chance(recurrent_prob) {
            for _ in 0..max_tries_recurrent {
                let neuron = &self.neurons[rng.index(first_linkable, last)];
                if !neuron.recurrent
                    && Self::is_link_target(neuron)
                    && !self.has_link(neuron.id, neuron.id)
                {
                    endpoints = Some((neuron.id, neuron.id));
                    break;
                }
            }
        }
        if endpoints.is_none() {
            for _ in 0..max_tries_link {
                let from = &self.neurons[rng.index(0, last)];
                let to = &self.neurons[rng.index(first_linkable, last)];
                if from.id != to.id && Self::is_link_target(to) && !self.has_link(from.id, to.id) {
                    endpoints = Some((from.id, to.id));
                    break;
                }
            }
        }
        let (from, to) = match endpoints {
            Some(endpoints) => endpoints,
            None => return false,
        };

        let recurrent = from == to || self.neuron(to).split_y <= self.neuron(from).split_y;
        if from == to {
            let idx = self.expect_neuron_index(from);
            self.neurons[idx].recurrent = true;
        }

        let innovation = db
            .get_innovation_id(from, to, InnovationType::NewLink)
            .unwrap_or_else(|| db.add_link_innovation(from, to));
        self.insert_link(LinkGene::new(
            from,
            to,
            rng.uniform(-1.0, 1.0),
            recurrent,
            innovation,
        ));
        true
    }

    /// Attempts to split an existing link with a new
    /// hidden neuron, with probability `mutation_prob`.
    ///
    /// Only enabled, non-recurrent links not leaving the bias
    /// neuron are split. Small genomes prefer older links, trying
    /// up to `max_tries_old_link` times among them before picking
    /// among every eligible link.
    ///
    /// The split link is disabled, and replaced by a link into the
    /// new neuron with weight 1 and a link out of it carrying the
    /// old weight. If the same link was split before somewhere in
    /// the population, the recorded neuron and link innovations are
    /// reused, unless this genome already holds that neuron.
    ///
    /// Returns whether a neuron was added.
    ///
    /// # Examples
    /// ```
    /// use neatkit::genomics::{Genome, InnovationDB};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let mut rng = StdRng::seed_from_u64(3);
    /// let mut genome = Genome::new(0, 2, 1, &mut rng);
    /// let mut db = InnovationDB::new(genome.neurons(), genome.links());
    ///
    /// assert!(genome.add_neuron(1.0, &mut db, 5, &mut rng));
    /// assert_eq!(genome.num_neurons(), 5);
    /// assert_eq!(genome.num_links(), 5);
    /// assert_eq!(genome.links().iter().filter(|l| !l.enabled()).count(), 1);
    /// ```
    pub fn add_neuron<R: RandomSource>(
        &mut self,
        mutation_prob: f64,
        db: &mut InnovationDB,
        max_tries_old_link: usize,
        rng: &mut R,
    ) -> bool {
        if !rng.chance(mutation_prob) || self.links.is_empty() {
            return false;
        }

        let mut chosen = None;
        if self.neurons.len() < self.num_inputs + self.num_outputs + 5 {
            let oldest = (self.links.len() - 1)
                .saturating_sub((self.links.len() as f64).sqrt().floor() as usize);
            for _ in 0..max_tries_old_link {
                let idx = rng.index(0, oldest);
                if self.is_splittable(&self.links[idx]) {
                    chosen = Some(idx);
                    break;
                }
            }
        }
        let chosen = chosen.or_else(|| {
            let eligible: Vec<usize> = (0..self.links.len())
                .filter(|idx| self.is_splittable(&self.links[*idx]))
                .collect();
            if eligible.is_empty() {
                None
            } else {
                Some(eligible[rng.index(0, eligible.len() - 1)])
            }
        });
        let idx = match chosen {
            Some(idx) => idx,
            None => return false,
        };

        self.links[idx].enabled = false;
        let (from, to, weight) = {
            let link = &self.links[idx];
            (link.from, link.to, link.weight)
        };
        let (from_neuron, to_neuron) = (self.neuron(from), self.neuron(to));
        let split_x = (from_neuron.split_x + to_neuron.split_x) / 2.0;
        let split_y = (from_neuron.split_y + to_neuron.split_y) / 2.0;

        let reusable = db
            .get_innovation_id(from, to, InnovationType::NewNeuron)
            .and_then(|innovation| db.get_neuron_id(innovation))
            .filter(|neuron_id| self.neuron_index(*neuron_id).is_none());

        let (neuron, link_in, link_out) = match reusable {
            Some(neuron_id) => (
                db.clone_neuron_from_id(neuron_id),
                db.get_innovation_id(from, neuron_id, InnovationType::NewLink)
                    .unwrap_or_else(|| db.add_link_innovation(from, neuron_id)),
                db.get_innovation_id(neuron_id, to, InnovationType::NewLink)
                    .unwrap_or_else(|| db.add_link_innovation(neuron_id, to)),
            ),
            None => {
                let neuron_id =
                    db.add_neuron_innovation(from, to, NeuronType::Hidden, split_x, split_y);
                (
                    NeuronGene::new(neuron_id, NeuronType::Hidden, split_x, split_y),
                    db.add_link_innovation(from, neuron_id),
                    db.add_link_innovation(neuron_id, to),
                )
            }
        };

        let neuron_id = neuron.id;
        self.insert_neuron(neuron);
        self.insert_link(LinkGene::new(from, neuron_id, 1.0, false, link_in));
        self.insert_link(LinkGene::new(neuron_id, to, weight, false, link_out));
        true
    }

    /// Mutates each link weight with probability `mutation_prob`.
    ///
    /// A mutated weight is replaced by a value drawn from `[-1, 1]`
    /// with probability `prob_new_weight`, or otherwise nudged by up
    /// to `max_perturbation` in either direction.
    ///
    /// # Examples
    /// ```
    /// use neatkit::genomics::Genome;
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let mut rng = StdRng::seed_from_u64(0);
    /// let mut genome = Genome::new(0, 2, 1, &mut rng);
    /// let before: Vec<f64> = genome.links().iter().map(|l| l.weight()).collect();
    ///
    /// genome.mutate_weights(1.0, 0.0, 0.1, &mut rng);
    ///
    /// for (link, old) in genome.links().iter().zip(before) {
    ///     assert!((link.weight() - old).abs() <= 0.1);
    /// }
    /// ```
    pub fn mutate_weights<R: RandomSource>(
        &mut self,
        mutation_prob: f64,
        prob_new_weight: f64,
        max_perturbation: f64,
        rng: &mut R,
    ) {
        for link in &mut self.links {
            if rng.chance(mutation_prob) {
                if rng.chance(prob_new_weight) {
                    link.weight = rng.uniform(-1.0, 1.0);
                } else {
                    link.weight += rng.uniform(-1.0, 1.0) * max_perturbation;
                }
            }
        }
    }

    /// Nudges each neuron's activation response by up to
    /// `max_perturbation`, with probability `mutation_prob`.
    pub fn mutate_activation_response<R: RandomSource>(
        &mut self,
        mutation_prob: f64,
        max_perturbation: f64,
        rng: &mut R,
    ) {
        for neuron in &mut self.neurons {
            if rng.chance(mutation_prob) {
                neuron.activation_response += rng.uniform(-1.0, 1.0) * max_perturbation;
            }
        }
    }

    /// Calculates how structurally and parametrically
    /// different `self` and `other` are.
    ///
    /// Link genes are aligned by innovation id. Excess genes
    /// are counted as the difference in link counts, disjoint
    /// genes as the unmatched genes met while aligning. Both
    /// are normalized by the larger neuron count; the summed
    /// weight difference of matched genes is averaged over them.
    ///
    /// # Examples
    /// ```
    /// use neatkit::{genomics::Genome, Params};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let params = Params::default();
    /// let genome = Genome::new(0, 2, 1, &mut StdRng::seed_from_u64(0));
    ///
    /// assert_eq!(genome.compatibility_score(&genome.clone(), &params), 0.0);
    /// ```
    pub fn compatibility_score(&self, other: &Genome, params: &Params) -> f64 {
        let (mut i, mut j) = (0, 0);
        let (mut disjoint, mut matched, mut weight_difference) = (0usize, 0usize, 0.0);
        while i < self.links.len() && j < other.links.len() {
            let (a, b) = (&self.links[i], &other.links[j]);
            match a.innovation.cmp(&b.innovation) {
                Ordering::Equal => {
                    matched += 1;
                    weight_difference += (a.weight - b.weight).abs();
                    i += 1;
                    j += 1;
                }
                Ordering::Less => {
                    disjoint += 1;
                    i += 1;
                }
                Ordering::Greater => {
                    disjoint += 1;
                    j += 1;
                }
            }
        }
        let excess = self.links.len().abs_diff(other.links.len());
        let longest = self.neurons.len().max(other.neurons.len()) as f64;
        let matched = matched.max(1) as f64;

        params.excess_scaler * excess as f64 / longest
            + params.disjoint_scaler * disjoint as f64 / longest
            + params.match_scaler * weight_difference / matched
    }

    /// Produces a child genome from `self` and `other`.
    ///
    /// The fitter parent is the one with higher fitness; on
    /// a tie, the one with fewer links, and on a further tie
    /// one is picked at random. Matching link genes are copied
    /// from either parent at random, while disjoint and excess
    /// genes are only inherited from the fitter parent. The child
    /// holds exactly the neurons its links refer to, rebuilt from
    /// `db` with the default activation response. A neuron is
    /// recurrent if the child inherited its self-loop.
    ///
    /// # Panics
    /// Panics if a parent's links are unsorted.
    ///
    /// # Examples
    /// ```
    /// use neatkit::genomics::{Genome, InnovationDB};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let mut rng = StdRng::seed_from_u64(5);
    /// let mut mum = Genome::new(0, 2, 1, &mut rng);
    /// let mut db = InnovationDB::new(mum.neurons(), mum.links());
    /// let mut dad = mum.clone();
    ///
    /// dad.add_neuron(1.0, &mut db, 5, &mut rng);
    /// dad.set_fitness(10.0);
    ///
    /// let child = mum.crossover(&dad, &mut db, 2, &mut rng);
    ///
    /// // The structure comes from the fitter parent.
    /// assert_eq!(child.num_neurons(), dad.num_neurons());
    /// assert_eq!(child.num_links(), dad.num_links());
    /// assert_eq!(child.id(), 2);
    /// ```
    pub fn crossover<R: RandomSource>(
        &self,
        other: &Genome,
        db: &InnovationDB,
        child_id: GenomeID,
        rng: &mut R,
    ) -> Genome {
        assert!(
            self.links_sorted() && other.links_sorted(),
            "crossover between genomes with unsorted links"
        );
        let self_is_best = match self.fitness.partial_cmp(&other.fitness) {
            Some(Ordering::Greater) => true,
            Some(Ordering::Less) => false,
            _ => match self.links.len().cmp(&other.links.len()) {
                Ordering::Less => true,
                Ordering::Greater => false,
                Ordering::Equal => rng.coin_flip(),
            },
        };

        let mut links: Vec<LinkGene> = Vec::with_capacity(self.links.len().max(other.links.len()));
        let (mut i, mut j) = (0, 0);
        loop {
            let selected = match (self.links.get(i), other.links.get(j)) {
                (None, None) => break,
                (Some(mine), None) => {
                    i += 1;
                    self_is_best.then(|| mine)
                }
                (None, Some(theirs)) => {
                    j += 1;
                    (!self_is_best).then(|| theirs)
                }
                (Some(mine), Some(theirs)) => match mine.innovation.cmp(&theirs.innovation) {
                    Ordering::Equal => {
                        i += 1;
                        j += 1;
                        Some(if rng.coin_flip() { mine } else { theirs })
                    }
                    Ordering::Less => {
                        i += 1;
                        self_is_best.then(|| mine)
                    }
                    Ordering::Greater => {
                        j += 1;
                        (!self_is_best).then(|| theirs)
                    }
                },
            };
            if let Some(link) = selected {
                if links.last().map_or(true, |l| l.innovation != link.innovation) {
                    links.push(link.clone());
                }
            }
        }

        let neuron_ids: BTreeSet<NeuronID> = links.iter().flat_map(|l| [l.from, l.to]).collect();
        let neurons = neuron_ids
            .into_iter()
            .map(|id| {
                let mut neuron = db.clone_neuron_from_id(id);
                neuron.recurrent = links.iter().any(|l| l.from == id && l.to == id);
                neuron
            })
            .collect();

        Genome::from_parts(child_id, neurons, links, self.num_inputs, self.num_outputs)
    }

    /// Sorts the link genes by innovation id.
    pub fn sort_links(&mut self) {
        self.links.sort_by_key(|l| l.innovation);
    }

    /// Returns the genome's identifier.
    pub fn id(&self) -> GenomeID {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: GenomeID) {
        self.id = id;
    }

    /// Returns the genome's neuron genes, sorted by id.
    pub fn neurons(&self) -> &[NeuronGene] {
        &self.neurons
    }

    /// Returns the genome's link genes, sorted by innovation id.
    pub fn links(&self) -> &[LinkGene] {
        &self.links
    }

    pub fn num_neurons(&self) -> usize {
        self.neurons.len()
    }

    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    /// Returns the number of hidden neurons.
    pub fn num_hidden(&self) -> usize {
        self.neurons
            .iter()
            .filter(|n| n.neuron_type == NeuronType::Hidden)
            .count()
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    pub fn num_outputs(&self) -> usize {
        self.num_outputs
    }

    /// Returns the neuron gene with id `id`, if present.
    pub fn neuron_gene(&self, id: NeuronID) -> Option<&NeuronGene> {
        self.neuron_index(id).map(|idx| &self.neurons[idx])
    }

    /// Returns the link gene with innovation id `innovation`, if present.
    pub fn link_gene(&self, innovation: InnovationID) -> Option<&LinkGene> {
        self.links
            .binary_search_by_key(&innovation, |l| l.innovation)
            .ok()
            .map(|idx| &self.links[idx])
    }

    /// Sets the genome's fitness to the value passed.
    ///
    /// # Panics
    /// Panics if `fitness` is negative.
    ///
    /// # Examples
    /// ```
    /// use neatkit::genomics::Genome;
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let mut genome = Genome::new(0, 1, 1, &mut StdRng::seed_from_u64(0));
    /// assert_eq!(genome.fitness(), 0.0);
    ///
    /// genome.set_fitness(32.0);
    /// assert_eq!(genome.fitness(), 32.0);
    /// ```
    pub fn set_fitness(&mut self, fitness: f64) {
        assert!(fitness >= 0.0, "fitness function returned a negative value");
        self.fitness = fitness;
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    /// Returns the fitness after age scaling and sharing
    /// within the genome's species.
    pub fn adjusted_fitness(&self) -> f64 {
        self.adjusted_fitness
    }

    /// Returns the genome's share of the next generation's
    /// offspring, relative to the population average.
    pub fn amount_to_spawn(&self) -> f64 {
        self.amount_to_spawn
    }

    /// Returns the species the genome was last assigned to.
    pub fn species_id(&self) -> Option<SpeciesID> {
        self.species_id
    }

    fn neuron_index(&self, id: NeuronID) -> Option<usize> {
        self.neurons.binary_search_by_key(&id, |n| n.id).ok()
    }

    fn expect_neuron_index(&self, id: NeuronID) -> usize {
        self.neuron_index(id)
            .unwrap_or_else(|| panic!("neuron {} is absent from genome {}", id, self.id))
    }

    fn neuron(&self, id: NeuronID) -> &NeuronGene {
        &self.neurons[self.expect_neuron_index(id)]
    }

    fn has_link(&self, from: NeuronID, to: NeuronID) -> bool {
        self.links.iter().any(|l| l.from == from && l.to == to)
    }

    fn links_sorted(&self) -> bool {
        self.links.windows(2).all(|w| w[0].innovation <= w[1].innovation)
    }

    fn is_link_target(neuron: &NeuronGene) -> bool {
        !matches!(neuron.neuron_type, NeuronType::Input | NeuronType::Bias)
    }

    fn is_splittable(&self, link: &LinkGene) -> bool {
        link.enabled && !link.recurrent && self.neuron(link.from).neuron_type != NeuronType::Bias
    }

    fn insert_link(&mut self, link: LinkGene) {
        let idx = self.links.partition_point(|l| l.innovation < link.innovation);
        self.links.insert(idx, link);
    }

    fn insert_neuron(&mut self, neuron: NeuronGene) {
        let idx = self.neurons.partition_point(|n| n.id < neuron.id);
        debug_assert!(self.neurons.get(idx).map_or(true, |n| n.id != neuron.id));
        self.neurons.insert(idx, neuron);
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let links: Vec<String> = self.links.iter().map(|l| l.to_string()).collect();
        f.debug_struct("Genome")
            .field("ID", &self.id)
            .field("Links", &links)
            .field("Neurons", &self.neurons.iter().map(|n| n.id).collect::<Vec<_>>())
            .field("Fitness", &self.fitness)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn setup(inputs: usize, outputs: usize, seed: u64) -> (Genome, InnovationDB, ChaCha8Rng) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let genome = Genome::new(0, inputs, outputs, &mut rng);
        let db = InnovationDB::new(genome.neurons(), genome.links());
        (genome, db, rng)
    }

    fn assert_integrity(genome: &Genome) {
        for link in genome.links() {
            assert!(genome.neuron_gene(link.from()).is_some(), "dangling {}", link);
            assert!(genome.neuron_gene(link.to()).is_some(), "dangling {}", link);
        }
        assert!(genome.links_sorted());
        assert!(genome.neurons.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn new_fully_connected() {
        for inputs in 1..6 {
            for outputs in 1..6 {
                let genome = Genome::new(0, inputs, outputs, &mut ChaCha8Rng::seed_from_u64(0));
                let num_neurons = inputs + outputs + 1;
                assert_eq!(genome.num_neurons(), num_neurons);
                assert_eq!(genome.num_links(), (inputs + 1) * outputs);
                assert_eq!(genome.num_hidden(), 0);
                for (id, neuron) in genome.neurons().iter().enumerate() {
                    assert_eq!(neuron.id(), id);
                    let expected = match id {
                        id if id < inputs => NeuronType::Input,
                        id if id == inputs => NeuronType::Bias,
                        _ => NeuronType::Output,
                    };
                    assert_eq!(neuron.neuron_type(), expected);
                }
                for link in genome.links() {
                    assert!(link.weight().abs() <= 1.0);
                    assert!(link.enabled());
                    assert!(!link.recurrent());
                    assert_eq!(
                        link.innovation(),
                        num_neurons + link.from() * outputs + (link.to() - inputs - 1)
                    );
                }
                assert_integrity(&genome);
            }
        }
    }

    #[test]
    fn initial_layout() {
        let genome = Genome::new(0, 2, 2, &mut ChaCha8Rng::seed_from_u64(0));
        let ys: Vec<f64> = genome.neurons().iter().map(|n| n.split_y()).collect();
        assert_eq!(ys, vec![0.0, 0.0, 0.0, 1.0, 1.0]);
        assert_eq!(genome.neurons()[0].split_x(), 2.0 / 4.0);
        assert_eq!(genome.neurons()[2].split_x(), 1.0 / 4.0);
        assert_eq!(genome.neurons()[4].split_x(), 2.0 / 3.0);
    }

    #[test]
    #[should_panic]
    fn from_genes_dangling_link() {
        Genome::from_genes(
            0,
            vec![NeuronGene::new(0, NeuronType::Input, 0.0, 0.0)],
            vec![LinkGene::new(0, 5, 1.0, false, 0)],
            1,
            0,
        );
    }

    #[test]
    fn add_neuron_never_fires_at_zero() {
        let (mut genome, mut db, mut rng) = setup(2, 1, 1);
        for _ in 0..100 {
            assert!(!genome.add_neuron(0.0, &mut db, 5, &mut rng));
        }
        assert_eq!(genome.num_neurons(), 4);
        assert_eq!(genome.num_links(), 3);
    }

    #[test]
    fn add_neuron_splits_link() {
        let (mut genome, mut db, mut rng) = setup(2, 1, 1);
        let enabled_before = genome.links().iter().filter(|l| l.enabled()).count();
        assert!(genome.add_neuron(1.0, &mut db, 5, &mut rng));
        assert_eq!(genome.num_neurons(), 5);
        assert_eq!(genome.num_links(), 5);
        assert_eq!(
            genome.links().iter().filter(|l| l.enabled()).count(),
            enabled_before + 1
        );

        let hidden = genome
            .neurons()
            .iter()
            .find(|n| n.neuron_type() == NeuronType::Hidden)
            .unwrap();
        assert_eq!(hidden.split_y(), 0.5);
        let disabled = genome.links().iter().find(|l| !l.enabled()).unwrap();
        let into = genome.links().iter().find(|l| l.to() == hidden.id()).unwrap();
        let out_of = genome.links().iter().find(|l| l.from() == hidden.id()).unwrap();
        assert_eq!(into.from(), disabled.from());
        assert_eq!(out_of.to(), disabled.to());
        assert_eq!(into.weight(), 1.0);
        assert_eq!(out_of.weight(), disabled.weight());
        // Links out of the bias are never split.
        assert_ne!(disabled.from(), 2);
        assert_integrity(&genome);
    }

    #[test]
    fn add_neuron_no_eligible_link() {
        let (mut genome, mut db, mut rng) = setup(1, 1, 0);
        // Only the bias link remains enabled.
        genome.links[0].enabled = false;
        assert!(!genome.add_neuron(1.0, &mut db, 5, &mut rng));
        assert_eq!(genome.num_neurons(), 3);
    }

    #[test]
    fn identical_splits_share_innovations() {
        let (template, mut db, mut rng) = setup(1, 1, 2);
        let mut first = template.clone();
        let mut second = template.clone();
        // With a single input, only the 0 -> 2 link can be split.
        assert!(first.add_neuron(1.0, &mut db, 5, &mut rng));
        let next_neuron = db.next_neuron_id();
        let next_innovation = db.next_innovation_id();
        assert!(second.add_neuron(1.0, &mut db, 5, &mut rng));

        assert_eq!(db.next_neuron_id(), next_neuron);
        assert_eq!(db.next_innovation_id(), next_innovation);
        let ids = |g: &Genome| g.neurons().iter().map(|n| n.id()).collect::<Vec<_>>();
        let innovations = |g: &Genome| g.links().iter().map(|l| l.innovation()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(innovations(&first), innovations(&second));
        assert_eq!(first.compatibility_score(&second, &Params::default()), 0.0);
    }

    #[test]
    fn resplit_within_genome_gets_new_neuron() {
        let (mut genome, mut db, mut rng) = setup(1, 1, 2);
        assert!(genome.add_neuron(1.0, &mut db, 5, &mut rng));
        let first_hidden = db.next_neuron_id() - 1;
        // Re-enable the split link so it can be split again.
        let idx = genome.links().iter().position(|l| !l.enabled()).unwrap();
        genome.links[idx].enabled = true;
        // Disable every other link so the old one is chosen.
        for (i, link) in genome.links.iter_mut().enumerate() {
            if i != idx {
                link.enabled = false;
            }
        }
        assert!(genome.add_neuron(1.0, &mut db, 5, &mut rng));
        assert_eq!(genome.num_hidden(), 2);
        assert_eq!(db.next_neuron_id(), first_hidden + 2);
        assert_integrity(&genome);
    }

    #[test]
    fn add_link_respects_targets() {
        let (mut genome, mut db, mut rng) = setup(3, 2, 4);
        for _ in 0..5 {
            genome.add_neuron(1.0, &mut db, 5, &mut rng);
        }
        for _ in 0..200 {
            genome.add_link(1.0, 0.2, &mut db, 5, 10, &mut rng);
            assert_integrity(&genome);
        }
        let mut pairs: Vec<(NeuronID, NeuronID)> =
            genome.links().iter().map(|l| (l.from(), l.to())).collect();
        let total = pairs.len();
        pairs.sort_unstable();
        pairs.dedup();
        assert_eq!(pairs.len(), total, "duplicate link endpoints");
        for link in genome.links() {
            let to = genome.neuron_gene(link.to()).unwrap();
            assert!(!matches!(to.neuron_type(), NeuronType::Input | NeuronType::Bias));
            let from = genome.neuron_gene(link.from()).unwrap();
            assert_eq!(link.recurrent(), to.split_y() <= from.split_y());
        }
    }

    #[test]
    fn add_link_self_recurrent() {
        let (mut genome, mut db, mut rng) = setup(1, 1, 0);
        // The output is the only neuron that can loop onto itself.
        assert!(genome.add_link(1.0, 1.0, &mut db, 5, 0, &mut rng));
        let link = genome.links().iter().find(|l| l.from() == l.to()).unwrap();
        assert_eq!(link.to(), 2);
        assert!(link.recurrent());
        assert!(genome.neuron_gene(2).unwrap().recurrent());
        // A second self-loop is impossible.
        assert!(!genome.add_link(1.0, 1.0, &mut db, 5, 0, &mut rng));
    }

    #[test]
    fn add_link_reuses_innovations() {
        let (template, mut db, mut rng) = setup(1, 1, 0);
        let mut first = template.clone();
        let mut second = template;
        assert!(first.add_link(1.0, 1.0, &mut db, 5, 0, &mut rng));
        assert!(second.add_link(1.0, 1.0, &mut db, 5, 0, &mut rng));
        let innovation = |g: &Genome| {
            g.links()
                .iter()
                .find(|l| l.recurrent())
                .map(|l| l.innovation())
        };
        assert_eq!(innovation(&first), innovation(&second));
    }

    #[test]
    fn mutate_weights_replace() {
        let (mut genome, _, mut rng) = setup(3, 3, 0);
        genome.mutate_weights(1.0, 1.0, 0.0, &mut rng);
        assert!(genome.links().iter().all(|l| l.weight().abs() <= 1.0));
    }

    #[test]
    fn mutate_weights_none() {
        let (mut genome, _, mut rng) = setup(3, 3, 0);
        let before = genome.clone();
        genome.mutate_weights(0.0, 1.0, 5.0, &mut rng);
        assert_eq!(genome, before);
    }

    #[test]
    fn mutate_activation_response() {
        let (mut genome, _, mut rng) = setup(2, 2, 0);
        genome.mutate_activation_response(1.0, 0.1, &mut rng);
        assert!(genome
            .neurons()
            .iter()
            .all(|n| (n.activation_response() - 1.0).abs() <= 0.1));
        let before = genome.clone();
        genome.mutate_activation_response(0.0, 0.1, &mut rng);
        assert_eq!(genome, before);
    }

    #[test]
    fn compatibility_score_to_equal() {
        let (mut genome, mut db, mut rng) = setup(2, 1, 0);
        genome.add_neuron(1.0, &mut db, 5, &mut rng);
        genome.add_link(1.0, 0.5, &mut db, 5, 5, &mut rng);
        assert_eq!(genome.compatibility_score(&genome.clone(), &Params::default()), 0.0);
    }

    #[test]
    fn compatibility_score_terms() {
        let params = Params {
            excess_scaler: 0.4,
            disjoint_scaler: 0.6,
            match_scaler: 0.8,
            ..Params::zero()
        };
        let neurons = || {
            vec![
                NeuronGene::new(0, NeuronType::Input, 0.5, 0.0),
                NeuronGene::new(1, NeuronType::Bias, 0.3, 0.0),
                NeuronGene::new(2, NeuronType::Output, 0.5, 1.0),
                NeuronGene::new(3, NeuronType::Hidden, 0.5, 0.5),
            ]
        };
        let first = Genome::from_genes(
            0,
            neurons(),
            vec![
                LinkGene::new(0, 2, -2.0, false, 1),
                LinkGene::new(1, 2, 5.0, false, 2),
                LinkGene::new(0, 3, 3.0, false, 4),
                LinkGene::new(3, 2, 5.0, false, 5),
            ],
            1,
            1,
        );
        let second = Genome::from_genes(
            1,
            neurons(),
            vec![
                LinkGene::new(0, 2, 2.0, false, 1),
                LinkGene::new(1, 2, 5.0, false, 3),
                LinkGene::new(0, 3, 6.0, false, 4),
            ],
            1,
            1,
        );
        // Matched: 1 and 4. Disjoint: 2 and 3. Excess is the link count difference.
        let expected = 0.4 * 1.0 / 4.0 + 0.6 * 2.0 / 4.0 + 0.8 * (4.0 + 3.0) / 2.0;
        assert!((first.compatibility_score(&second, &params) - expected).abs() < 1e-12);
        assert!((second.compatibility_score(&first, &params) - expected).abs() < 1e-12);
    }

    #[test]
    fn crossover_identical_parents() {
        let (mut genome, mut db, mut rng) = setup(2, 2, 7);
        for _ in 0..3 {
            genome.add_neuron(1.0, &mut db, 5, &mut rng);
            genome.add_link(1.0, 0.3, &mut db, 5, 5, &mut rng);
        }
        genome.set_fitness(3.0);
        for _ in 0..10 {
            let child = genome.crossover(&genome.clone(), &db, 9, &mut rng);
            assert_eq!(child.links(), genome.links());
            assert_eq!(child.neurons(), genome.neurons());
            assert_eq!(child.fitness(), 0.0);
            assert_eq!(child.species_id(), None);
        }
    }

    #[test]
    fn crossover_inherits_from_fitter() {
        let (template, mut db, mut rng) = setup(2, 1, 11);
        let mut weak = template.clone();
        let mut strong = template;
        weak.add_neuron(1.0, &mut db, 5, &mut rng);
        weak.add_neuron(1.0, &mut db, 5, &mut rng);
        strong.add_link(1.0, 1.0, &mut db, 5, 5, &mut rng);
        weak.set_fitness(1.0);
        strong.set_fitness(2.0);

        for _ in 0..10 {
            let child = weak.crossover(&strong, &db, 3, &mut rng);
            let innovations: Vec<_> = child.links().iter().map(|l| l.innovation()).collect();
            let expected: Vec<_> = strong.links().iter().map(|l| l.innovation()).collect();
            assert_eq!(innovations, expected);
            assert_eq!(child.num_neurons(), strong.num_neurons());
            for link in child.links() {
                let weak_weight = weak.link_gene(link.innovation()).map(|l| l.weight());
                let strong_weight = strong.link_gene(link.innovation()).unwrap().weight();
                assert!(link.weight() == strong_weight || Some(link.weight()) == weak_weight);
            }
            assert_integrity(&child);
        }
    }

    #[test]
    fn crossover_tie_prefers_fewer_links() {
        let (template, mut db, mut rng) = setup(2, 1, 11);
        let small = template.clone();
        let mut large = template;
        large.add_neuron(1.0, &mut db, 5, &mut rng);
        for _ in 0..10 {
            let child = large.crossover(&small, &db, 3, &mut rng);
            assert_eq!(child.num_links(), small.num_links());
            assert_eq!(child.num_neurons(), small.num_neurons());
        }
    }

    #[test]
    fn crossover_rebuilds_neurons_from_history() {
        let (mut genome, mut db, mut rng) = setup(1, 1, 3);
        genome.add_neuron(1.0, &mut db, 5, &mut rng);
        genome.neurons[3].activation_response = 0.25;
        genome.set_fitness(1.0);
        let child = genome.crossover(&genome.clone(), &db, 1, &mut rng);

        let ids: Vec<_> = child.neurons().iter().map(|n| n.id()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        for neuron in child.neurons() {
            assert_eq!(neuron, &db.clone_neuron_from_id(neuron.id()));
        }
        assert_eq!(child.neurons()[3].activation_response(), 1.0);
    }

    #[test]
    fn crossover_neurons_are_those_linked() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mum = Genome::from_genes(
            0,
            vec![
                NeuronGene::new(0, NeuronType::Input, 0.66, 0.0),
                NeuronGene::new(1, NeuronType::Bias, 0.33, 0.0),
                NeuronGene::new(2, NeuronType::Output, 0.5, 1.0),
            ],
            vec![LinkGene::new(0, 2, 0.5, false, 3)],
            1,
            1,
        );
        let db = InnovationDB::new(mum.neurons(), mum.links());
        let mut looped = mum.clone();
        looped.neurons[2].recurrent = true;
        looped.insert_link(LinkGene::new(2, 2, 0.1, true, 9));
        looped.set_fitness(2.0);

        // The bias is never linked, so it is not inherited.
        let child = mum.crossover(&mum.clone(), &db, 1, &mut rng);
        let ids: Vec<_> = child.neurons().iter().map(|n| n.id()).collect();
        assert_eq!(ids, vec![0, 2]);
        assert!(!child.neurons()[1].recurrent());

        // The self-loop comes from the fitter parent, and marks its neuron.
        let child = mum.crossover(&looped, &db, 2, &mut rng);
        assert_eq!(child.num_links(), 2);
        assert!(child.neuron_gene(2).unwrap().recurrent());
    }

    #[test]
    fn serde_round_trip() {
        let (mut genome, mut db, mut rng) = setup(2, 1, 0);
        genome.add_neuron(1.0, &mut db, 5, &mut rng);
        let json = serde_json::to_string(&genome).unwrap();
        assert_eq!(serde_json::from_str::<Genome>(&json).unwrap(), genome);
    }
}
