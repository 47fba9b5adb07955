use crate::genomics::{LinkGene, NeuronGene, NeuronType};
use crate::{InnovationID, NeuronID};

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use std::collections::{HashMap, HashSet};

/// Kind of structural mutation an [`Innovation`] records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InnovationType {
    NewNeuron,
    NewLink,
}

/// A single entry of the [`InnovationDB`].
///
/// Neuron records seeded from the template genome
/// have no endpoints. Link records carry no neuron data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Innovation {
    pub kind: InnovationType,
    pub id: InnovationID,
    pub from: Option<NeuronID>,
    pub to: Option<NeuronID>,
    pub neuron_id: Option<NeuronID>,
    pub neuron_type: Option<NeuronType>,
    pub split_x: f64,
    pub split_y: f64,
}

/// An `InnovationDB` keeps track of every structural
/// mutation that has happened in a population, so that
/// identical mutations arising independently in different
/// genomes are given the same historical identity.
///
/// Link innovations are identified by their endpoints,
/// neuron innovations by the endpoints of the link they split.
/// Records are only ever appended, and both neuron and
/// innovation ids increase monotonically and are never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<Innovation>", into = "Vec<Innovation>")]
pub struct InnovationDB {
    innovations: Vec<Innovation>,
    lookup: HashMap<(NeuronID, NeuronID, InnovationType), InnovationID, RandomState>,
    neuron_records: HashMap<NeuronID, usize, RandomState>,
    next_neuron_id: NeuronID,
    next_innovation_id: InnovationID,
}

impl InnovationDB {
    /// Creates a ledger seeded with the genes of a template genome.
    ///
    /// Every neuron is recorded first, without endpoints, taking
    /// the lowest innovation ids not already used by a template link.
    /// Template links keep their own innovation ids. Both counters
    /// continue past the largest ids seen.
    ///
    /// # Examples
    /// ```
    /// use neatkit::genomics::{Genome, InnovationDB};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let template = Genome::new(0, 2, 1, &mut StdRng::seed_from_u64(0));
    /// let db = InnovationDB::new(template.neurons(), template.links());
    ///
    /// // 4 neurons + 3 links.
    /// assert_eq!(db.len(), 7);
    /// assert_eq!(db.next_neuron_id(), 4);
    /// assert_eq!(db.next_innovation_id(), 7);
    /// ```
    pub fn new(neurons: &[NeuronGene], links: &[LinkGene]) -> InnovationDB {
        let link_ids: HashSet<InnovationID, RandomState> =
            links.iter().map(|l| l.innovation).collect();
        let mut free_ids = (0..).filter(|id| !link_ids.contains(id));

        let mut innovations: Vec<Innovation> = neurons
            .iter()
            .zip(&mut free_ids)
            .map(|(n, id)| Innovation {
                kind: InnovationType::NewNeuron,
                id,
                from: None,
                to: None,
                neuron_id: Some(n.id),
                neuron_type: Some(n.neuron_type),
                split_x: n.split_x,
                split_y: n.split_y,
            })
            .collect();
        innovations.extend(links.iter().map(|l| Innovation {
            kind: InnovationType::NewLink,
            id: l.innovation,
            from: Some(l.from),
            to: Some(l.to),
            neuron_id: None,
            neuron_type: None,
            split_x: 0.0,
            split_y: 0.0,
        }));

        InnovationDB::from(innovations)
    }

    /// Returns the id of the first recorded innovation of kind
    /// `kind` between `from` and `to`, if there is one.
    ///
    /// For neuron innovations, `from` and `to` are the
    /// endpoints of the link that was split.
    pub fn get_innovation_id(
        &self,
        from: NeuronID,
        to: NeuronID,
        kind: InnovationType,
    ) -> Option<InnovationID> {
        self.lookup.get(&(from, to, kind)).copied()
    }

    /// Records a new link innovation between `from`
    /// and `to`, and returns its innovation id.
    ///
    /// # Examples
    /// ```
    /// use neatkit::genomics::{Genome, InnovationDB, InnovationType};
    /// use rand::{rngs::StdRng, SeedableRng};
    ///
    /// let template = Genome::new(0, 2, 1, &mut StdRng::seed_from_u64(0));
    /// let mut db = InnovationDB::new(template.neurons(), template.links());
    ///
    /// let id = db.add_link_innovation(3, 0);
    /// assert_eq!(db.get_innovation_id(3, 0, InnovationType::NewLink), Some(id));
    /// assert_eq!(db.next_innovation_id(), id + 1);
    /// ```
    pub fn add_link_innovation(&mut self, from: NeuronID, to: NeuronID) -> InnovationID {
        let id = self.push(Innovation {
            kind: InnovationType::NewLink,
            id: self.next_innovation_id,
            from: Some(from),
            to: Some(to),
            neuron_id: None,
            neuron_type: None,
            split_x: 0.0,
            split_y: 0.0,
        });
        log::trace!("new link innovation {}: {} -> {}", id, from, to);
        id
    }

    /// Records a new neuron innovation splitting the link between
    /// `from` and `to`, allocating it a fresh neuron id, which is
    /// returned.
    pub fn add_neuron_innovation(
        &mut self,
        from: NeuronID,
        to: NeuronID,
        neuron_type: NeuronType,
        split_x: f64,
        split_y: f64,
    ) -> NeuronID {
        let neuron_id = self.next_neuron_id;
        self.push(Innovation {
            kind: InnovationType::NewNeuron,
            id: self.next_innovation_id,
            from: Some(from),
            to: Some(to),
            neuron_id: Some(neuron_id),
            neuron_type: Some(neuron_type),
            split_x,
            split_y,
        });
        log::trace!("new neuron innovation: neuron {} splits {} -> {}", neuron_id, from, to);
        neuron_id
    }

    /// Returns the neuron id created by the innovation
    /// `innovation_id`, if it is a neuron innovation.
    pub fn get_neuron_id(&self, innovation_id: InnovationID) -> Option<NeuronID> {
        // Records are appended in increasing id order.
        self.innovations
            .binary_search_by_key(&innovation_id, |i| i.id)
            .ok()
            .and_then(|idx| self.innovations[idx].neuron_id)
    }

    /// Rebuilds the neuron gene that was recorded
    /// for `neuron_id`, with default activation response.
    ///
    /// # Panics
    /// Panics if no neuron with id `neuron_id` was ever recorded.
    pub fn clone_neuron_from_id(&self, neuron_id: NeuronID) -> NeuronGene {
        let record = self
            .neuron_records
            .get(&neuron_id)
            .map(|idx| &self.innovations[*idx])
            .unwrap_or_else(|| panic!("neuron {} is absent from the innovation database", neuron_id));
        let neuron_type = record
            .neuron_type
            .unwrap_or_else(|| panic!("innovation {} has no neuron type", record.id));
        NeuronGene::new(neuron_id, neuron_type, record.split_x, record.split_y)
    }

    /// Returns all recorded innovations, in ascending id order.
    pub fn innovations(&self) -> &[Innovation] {
        &self.innovations
    }

    /// Returns the id that will be given to the next new neuron.
    pub fn next_neuron_id(&self) -> NeuronID {
        self.next_neuron_id
    }

    /// Returns the id that will be given to the next innovation.
    pub fn next_innovation_id(&self) -> InnovationID {
        self.next_innovation_id
    }

    /// Returns the number of recorded innovations.
    pub fn len(&self) -> usize {
        self.innovations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.innovations.is_empty()
    }

    /// Appends a record, updating lookups and counters,
    /// and returns its id.
    fn push(&mut self, innovation: Innovation) -> InnovationID {
        let id = innovation.id;
        self.index(&innovation, self.innovations.len());
        self.next_innovation_id = self.next_innovation_id.max(id + 1);
        if let Some(neuron_id) = innovation.neuron_id {
            self.next_neuron_id = self.next_neuron_id.max(neuron_id + 1);
        }
        self.innovations.push(innovation);
        id
    }

    fn index(&mut self, innovation: &Innovation, position: usize) {
        if let (Some(from), Some(to)) = (innovation.from, innovation.to) {
            self.lookup
                .entry((from, to, innovation.kind))
                .or_insert(innovation.id);
        }
        if let Some(neuron_id) = innovation.neuron_id {
            self.neuron_records.entry(neuron_id).or_insert(position);
        }
    }
}

impl From<Vec<Innovation>> for InnovationDB {
    fn from(mut innovations: Vec<Innovation>) -> InnovationDB {
        innovations.sort_by_key(|i| i.id);
        let mut db = InnovationDB {
            innovations: Vec::with_capacity(innovations.len()),
            lookup: HashMap::default(),
            neuron_records: HashMap::default(),
            next_neuron_id: 0,
            next_innovation_id: 0,
        };
        for innovation in innovations {
            db.push(innovation);
        }
        db
    }
}

impl From<InnovationDB> for Vec<Innovation> {
    fn from(db: InnovationDB) -> Vec<Innovation> {
        db.innovations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::Genome;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ledger(inputs: usize, outputs: usize) -> InnovationDB {
        let template = Genome::new(0, inputs, outputs, &mut ChaCha8Rng::seed_from_u64(0));
        InnovationDB::new(template.neurons(), template.links())
    }

    #[test]
    fn seeds_from_template() {
        let db = ledger(2, 1);
        // Neurons 0, 1 (inputs), 2 (bias), 3 (output).
        for id in 0..4 {
            assert_eq!(db.get_neuron_id(id), Some(id));
        }
        assert_eq!(db.clone_neuron_from_id(2).neuron_type(), NeuronType::Bias);
        assert_eq!(db.clone_neuron_from_id(3).neuron_type(), NeuronType::Output);
        assert_eq!(db.get_innovation_id(0, 3, InnovationType::NewLink), Some(4));
        assert_eq!(db.get_innovation_id(1, 3, InnovationType::NewLink), Some(5));
        assert_eq!(db.get_innovation_id(2, 3, InnovationType::NewLink), Some(6));
        assert_eq!(db.get_innovation_id(3, 0, InnovationType::NewLink), None);
    }

    #[test]
    fn counters_are_monotonic() {
        let mut db = ledger(2, 1);
        let n1 = db.add_neuron_innovation(0, 3, NeuronType::Hidden, 0.5, 0.5);
        let l1 = db.add_link_innovation(0, n1);
        let n2 = db.add_neuron_innovation(0, 3, NeuronType::Hidden, 0.5, 0.5);
        let l2 = db.add_link_innovation(n2, 3);
        assert_eq!((n1, n2), (4, 5));
        assert!(l1 < l2);
        assert_eq!(db.next_neuron_id(), 6);
        assert_eq!(db.next_innovation_id(), l2 + 1);
        let ids: Vec<_> = db.innovations().iter().map(|i| i.id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn first_record_wins() {
        let mut db = ledger(2, 1);
        let first = db.add_neuron_innovation(1, 3, NeuronType::Hidden, 0.5, 0.5);
        let inno = db.get_innovation_id(1, 3, InnovationType::NewNeuron).unwrap();
        db.add_neuron_innovation(1, 3, NeuronType::Hidden, 0.5, 0.5);
        assert_eq!(db.get_innovation_id(1, 3, InnovationType::NewNeuron), Some(inno));
        assert_eq!(db.get_neuron_id(inno), Some(first));
    }

    #[test]
    fn link_innovations_have_no_neuron() {
        let mut db = ledger(1, 1);
        let id = db.add_link_innovation(2, 2);
        assert_eq!(db.get_neuron_id(id), None);
        assert_eq!(db.get_neuron_id(10_000), None);
    }

    #[test]
    #[should_panic]
    fn clone_unknown_neuron() {
        ledger(2, 1).clone_neuron_from_id(42);
    }

    #[test]
    fn serde_rebuilds_lookups() {
        let mut db = ledger(2, 2);
        let neuron = db.add_neuron_innovation(0, 4, NeuronType::Hidden, 0.5, 0.5);
        let json = serde_json::to_string(&db).unwrap();
        let restored: InnovationDB = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.innovations(), db.innovations());
        assert_eq!(restored.next_neuron_id(), db.next_neuron_id());
        assert_eq!(restored.next_innovation_id(), db.next_innovation_id());
        assert_eq!(
            restored.get_innovation_id(0, 4, InnovationType::NewNeuron),
            db.get_innovation_id(0, 4, InnovationType::NewNeuron)
        );
        assert_eq!(restored.clone_neuron_from_id(neuron).split_y(), 0.5);
    }
}
