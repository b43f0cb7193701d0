//! This module provides the [`Process`] struct, a single transformation with a stoichiometry
//! and a rate equation
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use derive_builder::Builder;
use indexmap::IndexMap;
use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::components::CompiledComponents;
use crate::configuration;
use crate::expression::{Expr, Symbol};
use crate::io::expr_parse::parse_expression;
use crate::process::stoichiometry::{resolve_stoichiometry, ReactionSpec, Stoichiometry};
use crate::process::{ConservationViolation, ProcessError};

/// Everything needed to build a [`Process`]
///
/// # Examples
/// ```rust
/// use stoichrs_core::components::{ComponentBuilder, Components};
/// use stoichrs_core::process::{Process, ProcessSpecBuilder};
/// let components = Components::from_components([
///     ComponentBuilder::default().id("S").conversion_factor("COD", 1.).build().unwrap(),
///     ComponentBuilder::default().id("X").conversion_factor("COD", 1.).build().unwrap(),
/// ])
/// .unwrap()
/// .compile();
/// let spec = ProcessSpecBuilder::default()
///     .id("growth")
///     .reaction("S -> X")
///     .reference_component("X")
///     .rate_equation("mu*S/(K + S)*X".to_string())
///     .components(components)
///     .conserve("COD")
///     .parameter("mu")
///     .parameter("K")
///     .build()
///     .unwrap();
/// let growth = Process::new(spec).unwrap();
/// assert_eq!(growth.parameters(), vec!["K", "mu"]);
/// assert!(growth.check_conservation(None).is_ok());
/// ```
#[derive(Builder, Clone, Debug)]
pub struct ProcessSpec {
    /// Used to identify the process (must be unique within a collection)
    #[builder(setter(into))]
    pub id: String,
    /// Reaction definition the stoichiometry is resolved from
    #[builder(setter(into))]
    pub reaction: ReactionSpec,
    /// Component whose coefficient is normalized to a magnitude of 1
    #[builder(setter(into))]
    pub reference_component: String,
    /// Rate of the process, in terms of component ids and parameters
    #[builder(default = "None", setter(into))]
    pub rate_equation: Option<String>,
    /// Components the process acts on
    pub components: Arc<CompiledComponents>,
    /// Quantities the process conserves
    #[builder(default = "configuration::current().conserved_for")]
    pub conserved_for: Vec<String>,
    /// Names of the kinetic and stoichiometric parameters
    #[builder(default = "Vec::new()")]
    pub parameters: Vec<String>,
}

impl ProcessSpecBuilder {
    /// Add a conserved quantity, replacing the configured defaults
    pub fn conserve(&mut self, quantity: &str) -> &mut Self {
        self.conserved_for
            .get_or_insert_with(Vec::new)
            .push(quantity.to_string());
        self
    }

    /// Declare a parameter
    pub fn parameter(&mut self, name: &str) -> &mut Self {
        self.parameters
            .get_or_insert_with(Vec::new)
            .push(name.to_string());
        self
    }
}

/// A transformation of components with a resolved stoichiometry and a rate equation
///
/// The stoichiometry is normalized so that the coefficient of the reference component has
/// a magnitude of 1.
#[derive(Clone, Debug)]
pub struct Process {
    id: String,
    components: Arc<CompiledComponents>,
    reference_component: String,
    conserved_for: Vec<String>,
    parameters: IndexMap<String, Symbol>,
    stoichiometry: Stoichiometry,
    rate_equation: Option<Expr>,
}

impl Process {
    /// Build a process, resolving its stoichiometry and parsing its rate equation
    ///
    /// # Parameters
    /// - spec: [`ProcessSpec`] describing the process
    ///
    /// # Returns
    /// The process, or a [`ProcessError`] when the reaction can't be resolved, the rate
    /// equation references undeclared names, or the reference component does not take part
    /// in the reaction
    pub fn new(spec: ProcessSpec) -> Result<Process, ProcessError> {
        let ProcessSpec {
            id,
            reaction,
            reference_component,
            rate_equation,
            components,
            conserved_for,
            parameters,
        } = spec;
        let parameters: IndexMap<String, Symbol> = parameters
            .iter()
            .map(|p| (p.clone(), Symbol::new(p)))
            .collect();
        let stoichiometry =
            resolve_stoichiometry(&reaction, &components, &conserved_for, &parameters)
                .map_err(|source| ProcessError::Stoichiometry {
                    process: id.clone(),
                    source,
                })?;
        let mut process = Process {
            id,
            components,
            reference_component: reference_component.clone(),
            conserved_for,
            parameters,
            stoichiometry,
            rate_equation: None,
        };
        process.rate_equation = match rate_equation {
            Some(text) if !text.trim().is_empty() => Some(process.parse_rate_equation(&text)?),
            _ => None,
        };
        process.normalize(&reference_component)?;
        debug!("Created process {}", process);
        Ok(process)
    }

    fn parse_rate_equation(&self, text: &str) -> Result<Expr, ProcessError> {
        let mut symbols: IndexMap<String, Symbol> = self
            .components
            .ids()
            .iter()
            .map(|id| (id.clone(), Symbol::new(id)))
            .collect();
        for (name, symbol) in &self.parameters {
            symbols.insert(name.clone(), symbol.clone());
        }
        parse_expression(text, &symbols).map_err(|err| match err.undefined_symbol() {
            Some(name) => ProcessError::UndefinedParameter {
                process: self.id.clone(),
                name: name.to_string(),
            },
            None => ProcessError::InvalidRateEquation {
                process: self.id.clone(),
                source: err,
            },
        })
    }

    /// Divide the stoichiometry by the magnitude of the `reference` coefficient
    ///
    /// Returns that magnitude, nothing is modified on error
    fn normalize(&mut self, reference: &str) -> Result<Expr, ProcessError> {
        let index = self.components.index(reference)?;
        let coefficient = self.stoichiometry.get(index);
        if coefficient.is_zero() {
            return Err(ProcessError::NonParticipatingReference {
                process: self.id.clone(),
                component: reference.to_string(),
            });
        }
        let magnitude = coefficient.abs();
        self.stoichiometry = self.stoichiometry.divide(&magnitude);
        Ok(magnitude)
    }

    // region Getters
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Components the stoichiometry is aligned with
    pub fn components(&self) -> &Arc<CompiledComponents> {
        &self.components
    }

    pub fn reference_component(&self) -> &str {
        &self.reference_component
    }

    pub fn conserved_for(&self) -> &[String] {
        &self.conserved_for
    }

    /// Full stoichiometric vector, one entry per component
    pub fn stoichiometry_vector(&self) -> &Stoichiometry {
        &self.stoichiometry
    }

    /// Non-zero coefficients keyed by component id, in component order
    pub fn stoichiometry(&self) -> IndexMap<String, Expr> {
        self.components
            .ids()
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), self.stoichiometry.get(i)))
            .filter(|(_, coefficient)| !coefficient.is_zero())
            .collect()
    }

    pub fn rate_equation(&self) -> Option<&Expr> {
        self.rate_equation.as_ref()
    }

    /// Declared parameter names, sorted
    pub fn parameters(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.parameters.keys().map(|n| n.as_str()).collect();
        names.sort();
        names
    }

    /// Declared parameters in declaration order
    pub fn parameter_symbols(&self) -> &IndexMap<String, Symbol> {
        &self.parameters
    }
    // endregion Getters

    /// Conversion factors of the process components, one row per conserved quantity
    pub fn conversion_factors(&self) -> DMatrix<f64> {
        self.components.conversion_matrix(&self.conserved_for)
    }

    /// [`Process::conversion_factors`] as expressions, for use with symbolic stoichiometries
    pub fn conversion_factors_symbolic(&self) -> DMatrix<Expr> {
        self.conversion_factors().map(Expr::number)
    }

    /// Replace the conserved quantities
    pub fn set_conserved_for(&mut self, conserved_for: Vec<String>) {
        self.conserved_for = conserved_for;
    }

    /// Net amount of every conserved quantity created by the process
    ///
    /// # Returns
    /// One residual per conserved quantity (positive means created, negative means
    /// destroyed), or [`ProcessError::SymbolicStoichiometry`] if a coefficient still
    /// depends on parameters
    pub fn conservation_residuals(&self) -> Result<DVector<f64>, ProcessError> {
        match &self.stoichiometry {
            Stoichiometry::Numeric(v) => Ok(self.conversion_factors() * v),
            Stoichiometry::Symbolic(_) => Err(ProcessError::SymbolicStoichiometry(self.id.clone())),
        }
    }

    /// Check that every conserved quantity is balanced
    ///
    /// # Parameters
    /// - tolerance: Largest absolute residual accepted, the configured
    ///   `conservation_tolerance` when `None`
    ///
    /// # Returns
    /// `Ok(())` if the process conserves every quantity, otherwise
    /// [`ProcessError::Conservation`] listing each unbalanced quantity
    pub fn check_conservation(&self, tolerance: Option<f64>) -> Result<(), ProcessError> {
        let tolerance =
            tolerance.unwrap_or_else(|| configuration::current().conservation_tolerance);
        let residuals = self.conservation_residuals()?;
        let violations: Vec<ConservationViolation> = self
            .conserved_for
            .iter()
            .zip(residuals.iter())
            // NaN residuals count as violations
            .filter(|(_, residual)| !(residual.abs() <= tolerance))
            .map(|(quantity, residual)| ConservationViolation {
                quantity: quantity.clone(),
                residual: *residual,
            })
            .collect();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ProcessError::Conservation {
                process: self.id.clone(),
                violations,
            })
        }
    }

    /// Reverse the direction of the process
    ///
    /// Every coefficient and the rate equation change sign, so the production rates are
    /// unchanged.
    pub fn reverse(&mut self) {
        self.stoichiometry = self.stoichiometry.negate();
        self.rate_equation = self.rate_equation.take().map(|rate| -rate);
    }

    /// Normalize the stoichiometry to a new reference component
    ///
    /// The rate equation is scaled by the magnitude of the old coefficient so the production
    /// rates are unchanged. On error the process is left as it was.
    ///
    /// # Parameters
    /// - reference: Component to use as the reference, must have a non-zero coefficient
    pub fn set_reference_component(&mut self, reference: &str) -> Result<(), ProcessError> {
        let magnitude = self.normalize(reference)?;
        self.rate_equation = self.rate_equation.take().map(|rate| rate * magnitude);
        self.reference_component = reference.to_string();
        Ok(())
    }

    /// Declare more parameters, names already declared are ignored
    pub fn append_parameters<S: AsRef<str>>(&mut self, names: &[S]) {
        for name in names {
            let name = name.as_ref();
            if !self.parameters.contains_key(name) {
                self.parameters
                    .insert(name.to_string(), Symbol::new(name));
            }
        }
    }

    /// The reaction written as an equation, e.g. `"S + 0.5 O -> X"`
    pub fn equation(&self) -> String {
        let mut reactants = Vec::new();
        let mut products = Vec::new();
        for (id, coefficient) in self.stoichiometry() {
            let (c, rest) = coefficient.split_coefficient();
            let (side, magnitude) = if c < 0. {
                (&mut reactants, Expr::scaled(-c, rest))
            } else {
                (&mut products, coefficient)
            };
            let term = match magnitude {
                Expr::Number(v) if v == 1. => id,
                Expr::Add(_) => format!("({}) {}", magnitude, id),
                other => format!("{} {}", other, id),
            };
            side.push(term);
        }
        format!("{} -> {}", reactants.join(" + "), products.join(" + "))
            .trim()
            .to_string()
    }
}

impl Display for Process {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.id, self.equation())
    }
}

impl PartialEq for Process {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.reference_component == other.reference_component
            && self.conserved_for == other.conserved_for
            && self.parameters.keys().eq(other.parameters.keys())
            && self.stoichiometry == other.stoichiometry
            && self.rate_equation == other.rate_equation
            && (Arc::ptr_eq(&self.components, &other.components)
                || self.components == other.components)
    }
}

impl Eq for Process {}

impl Hash for Process {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.reference_component.hash(state);
        self.conserved_for.hash(state);
        self.parameters.keys().for_each(|k| k.hash(state));
        self.stoichiometry.hash(state);
        self.rate_equation.hash(state);
        self.components.ids().hash(state);
    }
}
