//! Module providing processes (transformations with a stoichiometry and a rate), the mutable
//! [`Processes`] collection and the compiled, memoized [`CompiledProcesses`]
pub mod collection;
pub mod compiled;
pub mod definition;
mod solve;
pub mod stoichiometry;

pub use collection::Processes;
pub use compiled::{clear_compilation_cache, CompiledProcesses, LabeledTable, StoichiometryMatrix};
pub use definition::{Process, ProcessSpec, ProcessSpecBuilder};
pub use solve::ResolutionError;
pub use stoichiometry::{
    resolve_stoichiometry, Coefficient, ReactionSpec, Stoichiometry, StoichiometryError,
};

use thiserror::Error;

use crate::components::ComponentError;
use crate::io::expr_parse::ExpressionParseError;
use crate::io::table::TableError;

/// A conserved quantity a process does not balance
#[derive(Clone, Debug, PartialEq)]
pub struct ConservationViolation {
    pub quantity: String,
    /// Net amount created (positive) or destroyed (negative)
    pub residual: f64,
}

fn format_violations(violations: &[ConservationViolation]) -> String {
    violations
        .iter()
        .map(|v| {
            let effect = if v.residual > 0. {
                "created"
            } else {
                "destroyed"
            };
            format!("{} {} ({:.3e})", v.quantity, effect, v.residual)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ProcessError {
    #[error("Unable to resolve the stoichiometry of process {process}: {source}")]
    Stoichiometry {
        process: String,
        source: StoichiometryError,
    },
    #[error(transparent)]
    UndefinedComponent(#[from] ComponentError),
    #[error("Rate equation of process {process} references undeclared name {name}")]
    UndefinedParameter { process: String, name: String },
    #[error("Invalid rate equation for process {process}: {source}")]
    InvalidRateEquation {
        process: String,
        source: ExpressionParseError,
    },
    #[error("Reference component {component} does not take part in process {process}")]
    NonParticipatingReference { process: String, component: String },
    #[error("Process {process} does not conserve {}", format_violations(.violations))]
    Conservation {
        process: String,
        violations: Vec<ConservationViolation>,
    },
    #[error("Stoichiometry of process {0} depends on parameters, unable to check conservation")]
    SymbolicStoichiometry(String),
    #[error("Incomplete process definition: {0}")]
    Builder(String),
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum CollectionError {
    #[error("Process {0} is already in the collection")]
    DuplicateId(String),
    #[error("Undefined process {0}")]
    UndefinedProcess(String),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Component(#[from] ComponentError),
    #[error(transparent)]
    Table(#[from] TableError),
}
