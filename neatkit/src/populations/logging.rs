use super::{GenAlg, SpeciesID};

use crate::genomics::Genome;

use serde::{Deserialize, Serialize};

use std::fmt;

/// Defines different possible reporting levels for logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportingLevel {
    /// Clones the entire population.
    AllGenomes,
    /// Clones species and their leaders.
    SpeciesLeaders,
    /// Clones only the best genome of the generation.
    PopulationChampion,
    /// Clones no genomes.
    NoGenomes,
}

/// A snapshot of a population.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Log {
    pub generation_number: usize,
    pub generation_sample: GenerationMemberRecord,
    pub species_count: usize,
    pub best_ever_fitness: f64,
    pub genome_stats: Vec<(String, Stats)>,
}

impl fmt::Display for Log {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Log {{\n\
            \tgeneration_number: {:?}\n\
            \tspecies_count: {:?}\n\
            \tbest_ever_fitness: {:?}\n\
            {}}}",
            &self.generation_number,
            &self.species_count,
            &self.best_ever_fitness,
            self.genome_stats
                .iter()
                .map(|(name, stats)| format!("\t{}: {:?}\n", name, stats))
                .collect::<Vec<_>>()
                .join("")
        )
    }
}

/// A struct for reporting basic statistical data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub maximum: f64,
    pub minimum: f64,
    pub mean: f64,
    pub median: f64,
}

impl Stats {
    /// Returns statistics about numbers in a sequence.
    /// An empty sequence yields all zeroes.
    ///
    /// # Examples
    /// ```
    /// use neatkit::logging::Stats;
    ///
    /// let stats = Stats::from([-2.0, -1.0, 0.5, 1.0, 1.5].iter().copied());
    /// assert_eq!(stats.maximum, 1.5);
    /// assert_eq!(stats.minimum, -2.0);
    /// assert_eq!(stats.mean, 0.0);
    /// assert_eq!(stats.median, 0.5);
    /// ```
    pub fn from(data: impl Iterator<Item = f64>) -> Stats {
        let mut data: Vec<f64> = data.collect();
        if data.is_empty() {
            return Stats {
                maximum: 0.0,
                minimum: 0.0,
                mean: 0.0,
                median: 0.0,
            };
        }
        let (mut max, mut min, mut sum) = (f64::MIN, f64::MAX, 0.0);
        for d in &data {
            max = d.max(max);
            min = d.min(min);
            sum += d;
        }
        let mean = sum / data.len() as f64;
        data.sort_unstable_by(f64::total_cmp);
        let mid = data.len() / 2;
        let median = if data.len() % 2 == 0 {
            (data[mid - 1] + data[mid]) / 2.0
        } else {
            data[mid]
        };
        Stats {
            maximum: max,
            minimum: min,
            mean,
            median,
        }
    }
}

/// A reporting-level dependant store
/// of genomes from a population.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum GenerationMemberRecord {
    /// Every genome, with its species if it was assigned one.
    Genomes(Vec<(Option<SpeciesID>, Genome)>),
    /// Only species IDs, species leaders, and generations without improvement.
    SpeciesLeaders(Vec<(SpeciesID, Genome, usize)>),
    /// Only the generation's best genome.
    PopulationChampion(Genome),
    /// Empty.
    None,
}

/// A log of the evolution of a population over time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvolutionLogger {
    reporting_level: ReportingLevel,
    logs: Vec<Log>,
}

impl EvolutionLogger {
    /// Returns a logger with the appropiate reporting level.
    ///
    /// # Examples
    /// ```
    /// use neatkit::logging::{EvolutionLogger, ReportingLevel};
    ///
    /// let logger = EvolutionLogger::new(ReportingLevel::NoGenomes);
    /// assert_eq!(logger.iter().count(), 0);
    /// ```
    pub fn new(reporting_level: ReportingLevel) -> EvolutionLogger {
        EvolutionLogger {
            reporting_level,
            logs: vec![],
        }
    }

    /// Store a snapshot of a population.
    ///
    /// The `genome_stat_extractor` provides a way of
    /// obtaining arbitrary statistics on the population,
    /// where each statistic is named by `stat_names`.
    ///
    /// # Examples
    /// ```
    /// use neatkit::genomics::Genome;
    /// use neatkit::logging::{EvolutionLogger, ReportingLevel};
    /// use neatkit::{GenAlg, Params};
    ///
    /// let params = Params { population_size: 10, ..Params::default() };
    /// let mut ga = GenAlg::from_seed(2, 1, params, 0).unwrap();
    /// let mut logger = EvolutionLogger::new(ReportingLevel::PopulationChampion);
    ///
    /// ga.epoch(&[1.0; 10]).unwrap();
    /// logger.log(
    ///     &ga,
    ///     &|g: &Genome| [g.fitness(), g.num_links() as f64],
    ///     ["fitness", "links"],
    /// );
    ///
    /// let log = logger.iter().next().unwrap();
    /// assert_eq!(log.generation_number, 1);
    /// assert_eq!(log.genome_stats[0].0, "fitness");
    /// ```
    pub fn log<R, GSE, const N: usize>(
        &mut self,
        ga: &GenAlg<R>,
        genome_stat_extractor: &GSE,
        stat_names: [&str; N],
    ) where
        GSE: Fn(&Genome) -> [f64; N],
    {
        let stats: Vec<[f64; N]> = ga.genomes().iter().map(genome_stat_extractor).collect();
        let genome_stats = stat_names
            .iter()
            .copied()
            .map(String::from)
            .zip(unzip_n_vecs(stats.into_iter()))
            .map(|(name, data)| (name, Stats::from(data.into_iter())))
            .collect();
        let generation_sample = match self.reporting_level {
            ReportingLevel::AllGenomes => GenerationMemberRecord::Genomes(
                ga.genomes()
                    .iter()
                    .map(|g| (g.species_id(), g.clone()))
                    .collect(),
            ),
            ReportingLevel::SpeciesLeaders => GenerationMemberRecord::SpeciesLeaders(
                ga.species()
                    .iter()
                    .map(|s| (s.id(), s.leader().clone(), s.gens_no_improvement()))
                    .collect(),
            ),
            ReportingLevel::PopulationChampion => match ga.best_genome() {
                Some(champion) => GenerationMemberRecord::PopulationChampion(champion.clone()),
                None => GenerationMemberRecord::None,
            },
            ReportingLevel::NoGenomes => GenerationMemberRecord::None,
        };
        let log = Log {
            generation_number: ga.generation(),
            generation_sample,
            species_count: ga.species().len(),
            best_ever_fitness: ga.best_ever_fitness(),
            genome_stats,
        };
        log::debug!("generation {} logged", log.generation_number);
        self.logs.push(log);
    }

    /// Iterate over all logged snapshots.
    pub fn iter(&self) -> impl Iterator<Item = &Log> {
        self.logs.iter()
    }
}

fn unzip_n_vecs<T: Clone, const N: usize>(iter: impl Iterator<Item = [T; N]>) -> Vec<Vec<T>> {
    let mut vecs = vec![Vec::default(); N];
    for items in iter {
        for (vec, item) in vecs.iter_mut().zip(items) {
            vec.push(item);
        }
    }
    vecs
}
