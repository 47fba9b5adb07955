use crate::{InnovationID, NeuronID};

use serde::{Deserialize, Serialize};

use std::fmt;

/// Role of a neuron within a network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeuronType {
    Input,
    Hidden,
    Output,
    /// Constant-signal neuron, always outputs 1.
    Bias,
}

/// A neuron gene. Becomes a [`Neuron`] in
/// the genome's phenotype.
///
/// `split_y` is the neuron's relative depth, with
/// 0 being the input layer and 1 the output layer,
/// and is used to detect recurrent links. `split_x`
/// is its horizontal position within that layer.
///
/// [`Neuron`]: crate::networks::Neuron
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct NeuronGene {
    pub(crate) id: NeuronID,
    pub(crate) neuron_type: NeuronType,
    pub(crate) recurrent: bool,
    pub(crate) activation_response: f64,
    pub(crate) split_x: f64,
    pub(crate) split_y: f64,
}

impl NeuronGene {
    /// Returns a new non-recurrent neuron gene
    /// with an activation response of 1.
    ///
    /// # Examples
    /// ```
    /// use neatkit::genomics::{NeuronGene, NeuronType};
    ///
    /// let neuron = NeuronGene::new(4, NeuronType::Hidden, 0.5, 0.5);
    /// assert_eq!(neuron.activation_response(), 1.0);
    /// assert!(!neuron.recurrent());
    /// ```
    pub fn new(id: NeuronID, neuron_type: NeuronType, split_x: f64, split_y: f64) -> NeuronGene {
        NeuronGene {
            id,
            neuron_type,
            recurrent: false,
            activation_response: 1.0,
            split_x,
            split_y,
        }
    }

    pub fn id(&self) -> NeuronID {
        self.id
    }

    pub fn neuron_type(&self) -> NeuronType {
        self.neuron_type
    }

    /// Returns whether the neuron has a self-recurrent link.
    pub fn recurrent(&self) -> bool {
        self.recurrent
    }

    /// Returns the sigmoid steepness divisor of the neuron.
    pub fn activation_response(&self) -> f64 {
        self.activation_response
    }

    pub fn split_x(&self) -> f64 {
        self.split_x
    }

    pub fn split_y(&self) -> f64 {
        self.split_y
    }
}

/// A link gene connects two neurons,
/// and becomes a weighted [`Link`] in the
/// genome's phenotype if enabled.
///
/// Disabled link genes are never removed,
/// as they keep the genome's history intact.
///
/// [`Link`]: crate::networks::Link
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct LinkGene {
    pub(crate) from: NeuronID,
    pub(crate) to: NeuronID,
    pub(crate) weight: f64,
    pub(crate) enabled: bool,
    pub(crate) recurrent: bool,
    pub(crate) innovation: InnovationID,
}

impl LinkGene {
    /// Returns a new _enabled_ link gene.
    ///
    /// # Examples
    /// ```
    /// use neatkit::genomics::LinkGene;
    ///
    /// let link = LinkGene::new(0, 3, 0.5, false, 7);
    /// assert!(link.enabled());
    /// assert_eq!(link.innovation(), 7);
    /// ```
    pub fn new(
        from: NeuronID,
        to: NeuronID,
        weight: f64,
        recurrent: bool,
        innovation: InnovationID,
    ) -> LinkGene {
        LinkGene {
            from,
            to,
            weight,
            enabled: true,
            recurrent,
            innovation,
        }
    }

    pub fn from(&self) -> NeuronID {
        self.from
    }

    pub fn to(&self) -> NeuronID {
        self.to
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Returns whether the link points back towards
    /// the inputs, or loops onto its source.
    pub fn recurrent(&self) -> bool {
        self.recurrent
    }

    pub fn innovation(&self) -> InnovationID {
        self.innovation
    }

    /// Sets the gene's weight.
    ///
    /// # Examples
    /// ```
    /// use neatkit::genomics::LinkGene;
    ///
    /// let mut link = LinkGene::new(0, 3, 0.5, false, 7);
    /// link.set_weight(-2.0);
    /// assert_eq!(link.weight(), -2.0);
    /// ```
    pub fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
    }

    /// Enables or disables the gene.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl fmt::Display for LinkGene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} -> {} ({:+.4}){}{}",
            self.innovation,
            self.from,
            self.to,
            self.weight,
            if self.recurrent { " rec" } else { "" },
            if self.enabled { "" } else { " off" },
        )
    }
}
