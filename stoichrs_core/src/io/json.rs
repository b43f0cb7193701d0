//! Module providing JSON IO for component registries
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::{Component, ComponentError, Components, ParticleSize};

// region JSON Components
/// Represents a JSON serialized component registry
#[derive(Serialize, Deserialize)]
struct JsonComponents {
    components: Vec<JsonComponent>,
}

#[derive(Serialize, Deserialize)]
struct JsonComponent {
    id: String,
    name: Option<String>,
    conversion_factors: Option<IndexMap<String, f64>>,
    particle_size: Option<ParticleSize>,
    degradable: Option<bool>,
    organic: Option<bool>,
}
// endregion JSON Components

// region Conversions
impl From<JsonComponent> for Component {
    fn from(c: JsonComponent) -> Self {
        Self {
            id: c.id,
            name: c.name,
            conversion_factors: c.conversion_factors.unwrap_or_default(),
            particle_size: c.particle_size.unwrap_or(ParticleSize::Soluble),
            degradable: c.degradable.unwrap_or_default(),
            organic: c.organic.unwrap_or_default(),
        }
    }
}

impl From<Component> for JsonComponent {
    fn from(c: Component) -> Self {
        Self {
            id: c.id,
            name: c.name,
            conversion_factors: Some(c.conversion_factors),
            particle_size: Some(c.particle_size),
            degradable: Some(c.degradable),
            organic: Some(c.organic),
        }
    }
}

impl Components {
    /// Read a component registry from a JSON file
    pub fn read_json<P: AsRef<Path>>(path: P) -> Result<Components, JsonError> {
        let components_str = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) => return Err(JsonError::UnableToRead(format!("{:?}", err))),
        };
        Components::from_json_str(&components_str)
    }

    /// Parse a component registry from JSON text
    ///
    /// # Examples
    /// ```rust
    /// use stoichrs_core::components::Components;
    /// let components = Components::from_json_str(
    ///     r#"{"components": [{"id": "S_O", "conversion_factors": {"COD": -1.0}}]}"#,
    /// )
    /// .unwrap();
    /// assert_eq!(components.get("S_O").unwrap().conversion_factor("COD"), -1.);
    /// ```
    pub fn from_json_str(json: &str) -> Result<Components, JsonError> {
        let json_components = match serde_json::from_str::<JsonComponents>(json) {
            Ok(components) => components,
            Err(err) => return Err(JsonError::UnableToParse(format!("{:?}", err))),
        };
        Ok(Components::from_components(
            json_components
                .components
                .into_iter()
                .map(Component::from),
        )?)
    }

    /// Serialize the registry to JSON text
    pub fn to_json_string(&self) -> Result<String, JsonError> {
        let json_components = JsonComponents {
            components: self.iter().map(|c| c.clone().into()).collect(),
        };
        Ok(serde_json::to_string_pretty(&json_components)?)
    }

    /// Write the registry to a JSON file
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), JsonError> {
        let components_string = self.to_json_string()?;
        fs::write(path, components_string)?;
        Ok(())
    }
}
// endregion Conversions

// region Errors
#[derive(Error, Debug)]
pub enum JsonError {
    #[error("Unable to read file due to {0}")]
    UnableToRead(String),
    #[error("Unable to parse json due to {0}")]
    UnableToParse(String),
    #[error("Invalid component registry: {0}")]
    InvalidComponents(#[from] ComponentError),
    #[error("Serde json error")]
    SerdeJsonError(#[from] serde_json::Error),
    #[error("Unable to write to file")]
    UnableToWrite(#[from] std::io::Error),
}
// endregion Errors
