//! Module providing the component registry, the set of components processes act on and
//! their conversion factors
pub mod collection;
pub mod component;

pub use collection::{CompiledComponents, Components};
pub use component::{Component, ComponentBuilder, ParticleSize};

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum ComponentError {
    #[error("Undefined component {0}")]
    UndefinedComponent(String),
    #[error("Component {0} is already defined")]
    DuplicateId(String),
}
