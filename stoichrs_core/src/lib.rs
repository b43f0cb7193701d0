//! Core rust implementation of stoichrs, a crate for compiling stoichiometric processes and
//! their rate equations into matrix form.
//!
//! Components (with conversion factors for conserved quantities such as COD or N) are
//! collected into a [`components::CompiledComponents`] set. [`process::Process`]es resolve
//! their stoichiometry against that set, solving for unknown coefficients so that every
//! conserved quantity is balanced. A [`process::Processes`] collection then compiles into a
//! [`process::CompiledProcesses`] holding the stoichiometry matrix, the rate equations and
//! the production rate of every component.

pub mod components;
pub mod configuration;
pub mod expression;
pub mod io;
pub mod process;
