use std::sync::{LazyLock, RwLock};

pub static CONFIGURATION: LazyLock<RwLock<Configuration>> =
    LazyLock::new(|| RwLock::new(Configuration::default()));

/// Process wide defaults used when building and checking processes
#[derive(Clone, Debug)]
pub struct Configuration {
    /// Quantities conserved by a process when none are specified
    pub conserved_for: Vec<String>,
    /// Absolute tolerance used by conservation checks
    pub conservation_tolerance: f64,
    /// Relative tolerance below which a pivot is treated as zero when solving for
    /// unknown stoichiometric coefficients
    pub pivot_tolerance: f64,
    /// Literal marking a stoichiometric coefficient that should be solved for
    pub unknown_placeholder: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            conserved_for: ["COD", "N", "P", "charge"]
                .iter()
                .map(|q| q.to_string())
                .collect(),
            conservation_tolerance: 1e-8,
            pivot_tolerance: 1e-10,
            unknown_placeholder: "?".to_string(),
        }
    }
}

/// Read a copy of the current configuration
pub(crate) fn current() -> Configuration {
    match CONFIGURATION.read() {
        Ok(config) => config.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}
