use crate::genomics::Genome;
use crate::{Params, RandomSource};

use serde::{Deserialize, Serialize};

/// Species identifier. Specifies
/// the generation in which the species
/// was born, and the count of other species
/// generated in the _same generation_ before
/// the one identified (i.e, if it was the
/// third species born in generation 5, it
/// will be species [5, 2]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpeciesID(pub usize, pub usize);

/// Species are collections of reproductively
/// compatible genomes. Membership is determined
/// by the [compatibility score] to the species'
/// _leader_, the fittest genome the species has
/// ever held.
///
/// Members are handles into the genome slice of
/// the generation they were added in, and are only
/// meaningful until that generation is replaced.
/// The leader is an owned copy and survives purges.
///
/// [compatibility score]: Genome::compatibility_score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Species {
    id: SpeciesID,
    leader: Genome,
    members: Vec<usize>,
    age: usize,
    gens_no_improvement: usize,
    spawns_required: f64,
}

impl Species {
    /// Creates a new species with the specified ID,
    /// led by `genomes[leader]`, which also becomes
    /// its first member.
    ///
    /// # Examples
    /// ```
    /// use neatkit::genomics::Genome;
    /// use neatkit::populations::{Species, SpeciesID};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let genomes = vec![Genome::new(0, 2, 1, &mut StdRng::seed_from_u64(0))];
    /// let species = Species::new(SpeciesID(1, 0), 0, &genomes);
    ///
    /// assert_eq!(species.leader(), &genomes[0]);
    /// assert_eq!(species.size(), 1);
    /// ```
    pub fn new(id: SpeciesID, leader: usize, genomes: &[Genome]) -> Species {
        Species {
            id,
            leader: genomes[leader].clone(),
            members: vec![leader],
            age: 0,
            gens_no_improvement: 0,
            spawns_required: 0.0,
        }
    }

    /// Adds `genomes[member]` to the species. If it is
    /// fitter than the leader it replaces it, and the
    /// species counts as improved.
    ///
    /// # Examples
    /// ```
    /// use neatkit::genomics::Genome;
    /// use neatkit::populations::{Species, SpeciesID};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let mut rng = StdRng::seed_from_u64(0);
    /// let mut genomes = vec![Genome::new(0, 2, 1, &mut rng), Genome::new(1, 2, 1, &mut rng)];
    /// genomes[1].set_fitness(5.0);
    ///
    /// let mut species = Species::new(SpeciesID(0, 0), 0, &genomes);
    /// species.add_member(1, &genomes);
    ///
    /// assert_eq!(species.size(), 2);
    /// assert_eq!(species.leader().id(), 1);
    /// ```
    pub fn add_member(&mut self, member: usize, genomes: &[Genome]) {
        let genome = &genomes[member];
        if genome.fitness() > self.leader.fitness() {
            self.leader = genome.clone();
            self.gens_no_improvement = 0;
        }
        self.members.push(member);
    }

    /// Clears the species' members ahead of the next
    /// speciation, aging it by one generation.
    pub fn purge(&mut self) {
        self.members.clear();
        self.age += 1;
        self.gens_no_improvement += 1;
        self.spawns_required = 0.0;
    }

    /// Sets the adjusted fitness of every member: young
    /// species get a bonus, old ones a penalty, and the
    /// result is shared among all members.
    ///
    /// # Examples
    /// ```
    /// use neatkit::genomics::Genome;
    /// use neatkit::populations::{Species, SpeciesID};
    /// use neatkit::Params;
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let mut rng = StdRng::seed_from_u64(0);
    /// let mut genomes = vec![Genome::new(0, 2, 1, &mut rng), Genome::new(1, 2, 1, &mut rng)];
    /// genomes[0].set_fitness(10.0);
    /// genomes[1].set_fitness(4.0);
    ///
    /// let mut species = Species::new(SpeciesID(0, 0), 0, &genomes);
    /// species.add_member(1, &genomes);
    ///
    /// let params = Params {
    ///     young_bonus_threshold: 5,
    ///     young_fitness_bonus: 1.5,
    ///     ..Params::zero()
    /// };
    /// species.adjust_fitness(&mut genomes, &params);
    ///
    /// assert_eq!(genomes[0].adjusted_fitness(), 10.0 * 1.5 / 2.0);
    /// assert_eq!(genomes[1].adjusted_fitness(), 4.0 * 1.5 / 2.0);
    /// ```
    pub fn adjust_fitness(&self, genomes: &mut [Genome], params: &Params) {
        let size = self.members.len() as f64;
        for &member in &self.members {
            let mut fitness = genomes[member].fitness();
            if self.age < params.young_bonus_threshold {
                fitness *= params.young_fitness_bonus;
            }
            if self.age > params.old_age_threshold {
                fitness *= params.old_age_penalty;
            }
            genomes[member].adjusted_fitness = fitness / size;
        }
    }

    /// Totals the offspring the members are entitled to.
    pub fn calculate_spawn_amount(&mut self, genomes: &[Genome]) {
        self.spawns_required = self
            .members
            .iter()
            .map(|&member| genomes[member].amount_to_spawn())
            .sum();
    }

    /// Picks a parent among the members. Members are
    /// expected in descending fitness order, and only the
    /// best `survival_rate` fraction of them is eligible.
    ///
    /// # Panics
    /// Panics if the species has no members.
    pub fn spawn<'g, R: RandomSource>(
        &self,
        genomes: &'g [Genome],
        survival_rate: f64,
        rng: &mut R,
    ) -> &'g Genome {
        let last = self
            .members
            .len()
            .checked_sub(1)
            .unwrap_or_else(|| panic!("spawn from empty species {:?}", self.id));
        if last == 0 {
            return &genomes[self.members[0]];
        }
        let cutoff = (self.members.len() as f64 * survival_rate).floor() as usize;
        &genomes[self.members[rng.index(0, cutoff).min(last)]]
    }

    /// Returns the species' ID.
    pub fn id(&self) -> SpeciesID {
        self.id
    }

    /// Returns the fittest genome the species ever held.
    pub fn leader(&self) -> &Genome {
        &self.leader
    }

    /// Returns the leader's fitness.
    pub fn best_fitness(&self) -> f64 {
        self.leader.fitness()
    }

    /// Returns the number of members in the current generation.
    pub fn size(&self) -> usize {
        self.members.len()
    }

    /// Returns the number of generations the species has lived.
    pub fn age(&self) -> usize {
        self.age
    }

    /// Returns the number of generations since the leader last changed.
    pub fn gens_no_improvement(&self) -> usize {
        self.gens_no_improvement
    }

    /// Returns the offspring allotted to the species.
    pub fn spawns_required(&self) -> f64 {
        self.spawns_required
    }
}
