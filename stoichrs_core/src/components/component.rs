//! This module provides the Component struct representing a single component (e.g. a
//! chemical species in a waste stream)

use std::fmt::{Display, Formatter};
use std::hash::Hash;

use derive_builder::Builder;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Represents a component
#[derive(Builder, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Used to identify the component (must be unique)
    #[builder(setter(into))]
    pub id: String,
    /// Human Readable name of the component
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Conversion factors keyed by conserved quantity, e.g. `{"COD": 1.0, "N": 0.086}`
    ///
    /// Quantities missing from the map have a conversion factor of 0
    #[builder(default = "IndexMap::new()")]
    pub conversion_factors: IndexMap<String, f64>,
    /// Physical size class of the component
    #[builder(default = "ParticleSize::Soluble")]
    pub particle_size: ParticleSize,
    /// Whether the component can be degraded
    #[builder(default = "false")]
    pub degradable: bool,
    /// Whether the component is organic
    #[builder(default = "false")]
    pub organic: bool,
}

impl Component {
    /// Conversion factor of the component for a conserved `quantity` (0 if undefined)
    pub fn conversion_factor(&self, quantity: &str) -> f64 {
        self.conversion_factors
            .get(quantity)
            .copied()
            .unwrap_or_default()
    }
}

impl ComponentBuilder {
    /// Set a single conversion factor, keeping any already set
    pub fn conversion_factor(&mut self, quantity: &str, value: f64) -> &mut Self {
        self.conversion_factors
            .get_or_insert_with(IndexMap::new)
            .insert(quantity.to_string(), value);
        self
    }
}

impl Display for Component {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl Hash for Component {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state); // Hash by id
    }
}

/// Physical size class of a component
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum ParticleSize {
    Soluble,
    Colloidal,
    Particulate,
    #[serde(rename = "Dissolved gas")]
    DissolvedGas,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let component = ComponentBuilder::default().id("S_S").build().unwrap();
        assert_eq!(component.id, "S_S");
        assert_eq!(component.particle_size, ParticleSize::Soluble);
        assert!(!component.degradable);
        assert_eq!(component.conversion_factor("COD"), 0.);
    }

    #[test]
    fn conversion_factors_accumulate() {
        let component = ComponentBuilder::default()
            .id("X_BH")
            .conversion_factor("COD", 1.)
            .conversion_factor("N", 0.086)
            .particle_size(ParticleSize::Particulate)
            .build()
            .unwrap();
        assert_eq!(component.conversion_factor("COD"), 1.);
        assert_eq!(component.conversion_factor("N"), 0.086);
        assert_eq!(component.conversion_factor("P"), 0.);
    }
}
