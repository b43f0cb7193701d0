//! Resolve reaction definitions into complete stoichiometric coefficient vectors
//!
//! A reaction can be given as a mapping of component ids to coefficients, as an equation
//! string such as `"S_S + ? S_O -> X_BH"`, or as a full numeric vector. Coefficients marked
//! unknown are solved for so that every conserved quantity (COD, N, ...) is balanced.
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use log::debug;
use nalgebra::{DMatrix, DVector};
use thiserror::Error;

use crate::components::CompiledComponents;
use crate::configuration;
use crate::expression::{Expr, Symbol};
use crate::io::expr_parse::{parse_expression, ExpressionParseError};
use crate::process::solve::{solve_symbolic, ResolutionError};

// region Coefficient
/// A stoichiometric coefficient as written in a reaction definition
#[derive(Clone, Debug, PartialEq)]
pub enum Coefficient {
    /// Numeric coefficient
    Value(f64),
    /// Coefficient written in terms of declared parameters, e.g. `"-1/Y_H"`
    Expression(String),
    /// Coefficient to solve for from the conserved quantities
    Unknown,
}

impl From<f64> for Coefficient {
    fn from(value: f64) -> Self {
        Coefficient::Value(value)
    }
}

impl From<&str> for Coefficient {
    /// Numbers become [`Coefficient::Value`], the unknown placeholder becomes
    /// [`Coefficient::Unknown`] and anything else is kept as an expression
    fn from(text: &str) -> Self {
        let text = text.trim();
        if text == configuration::current().unknown_placeholder {
            return Coefficient::Unknown;
        }
        match text.parse::<f64>() {
            Ok(value) => Coefficient::Value(value),
            Err(_) => Coefficient::Expression(text.to_string()),
        }
    }
}

impl From<String> for Coefficient {
    fn from(text: String) -> Self {
        Coefficient::from(text.as_str())
    }
}
// endregion Coefficient

// region ReactionSpec
/// The ways a reaction can be defined
#[derive(Clone, Debug, PartialEq)]
pub enum ReactionSpec {
    /// Component id to coefficient, components not named have a coefficient of 0
    Mapping(IndexMap<String, Coefficient>),
    /// Equation of the form `"reactants -> products"`, terms separated by `+`
    Equation(String),
    /// Complete numeric vector aligned with the component set
    Vector(DVector<f64>),
}

impl ReactionSpec {
    /// Create a [`ReactionSpec::Mapping`] from `(component id, coefficient)` pairs
    ///
    /// # Examples
    /// ```rust
    /// use stoichrs_core::process::{Coefficient, ReactionSpec};
    /// let reaction = ReactionSpec::mapping([
    ///     ("S_S", Coefficient::from("-1/Y_H")),
    ///     ("S_O", Coefficient::Unknown),
    ///     ("X_BH", Coefficient::from(1.)),
    /// ]);
    /// assert!(matches!(reaction, ReactionSpec::Mapping(_)));
    /// ```
    pub fn mapping<I, K, C>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, C)>,
        K: Into<String>,
        C: Into<Coefficient>,
    {
        ReactionSpec::Mapping(
            entries
                .into_iter()
                .map(|(id, coefficient)| (id.into(), coefficient.into()))
                .collect(),
        )
    }
}

impl From<&str> for ReactionSpec {
    fn from(equation: &str) -> Self {
        ReactionSpec::Equation(equation.to_string())
    }
}

impl From<String> for ReactionSpec {
    fn from(equation: String) -> Self {
        ReactionSpec::Equation(equation)
    }
}

impl From<IndexMap<String, Coefficient>> for ReactionSpec {
    fn from(mapping: IndexMap<String, Coefficient>) -> Self {
        ReactionSpec::Mapping(mapping)
    }
}

impl From<DVector<f64>> for ReactionSpec {
    fn from(vector: DVector<f64>) -> Self {
        ReactionSpec::Vector(vector)
    }
}
// endregion ReactionSpec

// region Stoichiometry
/// A complete stoichiometric vector, one coefficient per component of a component set
///
/// Vectors where every coefficient is a number are stored numerically, as soon as a single
/// coefficient depends on a parameter the whole vector is symbolic.
#[derive(Clone, Debug)]
pub enum Stoichiometry {
    Numeric(DVector<f64>),
    Symbolic(Vec<Expr>),
}

/// Fold negative zero so equal vectors compare and hash equally
fn clean_zero(value: f64) -> f64 {
    if value == 0. {
        0.
    } else {
        value
    }
}

impl Stoichiometry {
    /// Build a stoichiometry from expressions, numeric if every entry is a number
    pub fn from_exprs(coefficients: Vec<Expr>) -> Self {
        let numbers: Option<Vec<f64>> = coefficients.iter().map(|c| c.as_number()).collect();
        match numbers {
            Some(values) => Stoichiometry::from_numbers(values),
            None => Stoichiometry::Symbolic(coefficients),
        }
    }

    fn from_numbers(values: Vec<f64>) -> Self {
        Stoichiometry::Numeric(DVector::from_vec(
            values.into_iter().map(clean_zero).collect(),
        ))
    }

    pub fn len(&self) -> usize {
        match self {
            Stoichiometry::Numeric(v) => v.len(),
            Stoichiometry::Symbolic(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Stoichiometry::Numeric(_))
    }

    /// The numeric vector, `None` if any coefficient is symbolic
    pub fn as_numeric(&self) -> Option<&DVector<f64>> {
        match self {
            Stoichiometry::Numeric(v) => Some(v),
            Stoichiometry::Symbolic(_) => None,
        }
    }

    /// Coefficient at position `index`
    ///
    /// # Panics
    /// If `index` is out of bounds
    pub fn get(&self, index: usize) -> Expr {
        match self {
            Stoichiometry::Numeric(v) => Expr::number(v[index]),
            Stoichiometry::Symbolic(v) => v[index].clone(),
        }
    }

    /// Every coefficient as an expression
    pub fn to_exprs(&self) -> Vec<Expr> {
        match self {
            Stoichiometry::Numeric(v) => v.iter().map(|x| Expr::number(*x)).collect(),
            Stoichiometry::Symbolic(v) => v.clone(),
        }
    }

    /// Divide every coefficient by `divisor`
    pub(crate) fn divide(&self, divisor: &Expr) -> Self {
        match (self, divisor.as_number()) {
            (Stoichiometry::Numeric(v), Some(d)) => {
                Stoichiometry::from_numbers(v.iter().map(|x| x / d).collect())
            }
            (_, Some(d)) => Stoichiometry::from_exprs(
                self.to_exprs()
                    .into_iter()
                    .map(|c| match c.as_number() {
                        Some(x) => Expr::number(x / d),
                        None => c * (1. / d),
                    })
                    .collect(),
            ),
            (_, None) => Stoichiometry::from_exprs(
                self.to_exprs()
                    .into_iter()
                    .map(|c| c / divisor.clone())
                    .collect(),
            ),
        }
    }

    /// Flip the sign of every coefficient
    pub(crate) fn negate(&self) -> Self {
        match self {
            Stoichiometry::Numeric(v) => {
                Stoichiometry::from_numbers(v.iter().map(|x| -x).collect())
            }
            Stoichiometry::Symbolic(v) => {
                Stoichiometry::Symbolic(v.iter().map(|c| -c.clone()).collect())
            }
        }
    }
}

impl PartialEq for Stoichiometry {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Stoichiometry::Numeric(a), Stoichiometry::Numeric(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (Stoichiometry::Symbolic(a), Stoichiometry::Symbolic(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Stoichiometry {}

impl Hash for Stoichiometry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Stoichiometry::Numeric(v) => {
                0u8.hash(state);
                v.iter().for_each(|x| x.to_bits().hash(state));
            }
            Stoichiometry::Symbolic(v) => {
                1u8.hash(state);
                v.hash(state);
            }
        }
    }
}
// endregion Stoichiometry

/// Errors raised while resolving a reaction definition
#[derive(Clone, Debug, Error, PartialEq)]
pub enum StoichiometryError {
    #[error("Undefined component {0} in reaction")]
    UndefinedComponent(String),
    #[error("Malformed reaction equation `{equation}`: {reason}")]
    MalformedEquation { equation: String, reason: String },
    #[error("Coefficient `{coefficient}` references undeclared parameter {name}")]
    UndefinedParameter { coefficient: String, name: String },
    #[error("Invalid coefficient `{coefficient}`: {source}")]
    InvalidCoefficient {
        coefficient: String,
        source: ExpressionParseError,
    },
    #[error("Stoichiometric vector has length {found}, but there are {expected} components")]
    LengthMismatch { expected: usize, found: usize },
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
}

/// A coefficient after parsing, before unknowns are solved for
#[derive(Clone, Debug)]
enum Entry {
    Known(Expr),
    Unknown,
}

impl Entry {
    fn merge(self, other: Entry) -> Entry {
        match (self, other) {
            (Entry::Known(a), Entry::Known(b)) => Entry::Known(a + b),
            _ => Entry::Unknown,
        }
    }
}

fn parse_coefficient(
    text: &str,
    parameters: &IndexMap<String, Symbol>,
    placeholder: &str,
) -> Result<Entry, StoichiometryError> {
    let text = text.trim();
    if text == placeholder {
        return Ok(Entry::Unknown);
    }
    match parse_expression(text, parameters) {
        Ok(expr) => Ok(Entry::Known(expr)),
        Err(err) => match err.undefined_symbol() {
            Some(name) => Err(StoichiometryError::UndefinedParameter {
                coefficient: text.to_string(),
                name: name.to_string(),
            }),
            None => Err(StoichiometryError::InvalidCoefficient {
                coefficient: text.to_string(),
                source: err,
            }),
        },
    }
}

// region Equation Parsing
/// Split one side of an equation on `+` signs outside of parentheses
fn split_terms(side: &str) -> Vec<&str> {
    let mut terms = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in side.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            '+' if depth == 0 => {
                terms.push(&side[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    terms.push(&side[start..]);
    terms
}

/// Split a term like `"2 S_S"`, `"?S_O"` or `"X_BH"` into its coefficient text and component id
fn split_term<'t>(
    term: &'t str,
    components: &CompiledComponents,
) -> Result<(Option<&'t str>, &'t str), StoichiometryError> {
    if components.contains(term) {
        return Ok((None, term));
    }
    if let Some((coefficient, id)) = term.rsplit_once(char::is_whitespace) {
        let id = id.trim();
        return if components.contains(id) {
            Ok((Some(coefficient.trim()), id))
        } else {
            Err(StoichiometryError::UndefinedComponent(id.to_string()))
        };
    }
    // No whitespace between coefficient and id, take the longest trailing component id
    for (i, _) in term.char_indices().skip(1) {
        if components.contains(&term[i..]) {
            return Ok((Some(&term[..i]), &term[i..]));
        }
    }
    Err(StoichiometryError::UndefinedComponent(term.to_string()))
}

fn parse_equation(
    equation: &str,
    components: &CompiledComponents,
    parameters: &IndexMap<String, Symbol>,
    placeholder: &str,
) -> Result<IndexMap<usize, Entry>, StoichiometryError> {
    let malformed = |reason: &str| StoichiometryError::MalformedEquation {
        equation: equation.to_string(),
        reason: reason.to_string(),
    };
    let (reactants, products) = equation
        .split_once("->")
        .ok_or_else(|| malformed("missing `->`"))?;
    if products.contains("->") {
        return Err(malformed("more than one `->`"));
    }
    if reactants.trim().is_empty() && products.trim().is_empty() {
        return Err(malformed("no reactants or products"));
    }

    let mut entries: IndexMap<usize, Entry> = IndexMap::new();
    for (side, sign) in [(reactants, -1.), (products, 1.)] {
        if side.trim().is_empty() {
            continue;
        }
        for term in split_terms(side) {
            let term = term.trim();
            if term.is_empty() {
                return Err(malformed("empty term"));
            }
            let (coefficient, id) = split_term(term, components)?;
            let entry = match coefficient {
                None => Entry::Known(Expr::number(sign)),
                Some(text) => match parse_coefficient(text, parameters, placeholder)? {
                    Entry::Known(expr) => Entry::Known(expr * sign),
                    Entry::Unknown => Entry::Unknown,
                },
            };
            let index = components.index(id).map_err(|_| {
                StoichiometryError::UndefinedComponent(id.to_string())
            })?;
            let merged = match entries.swap_remove(&index) {
                Some(existing) => existing.merge(entry),
                None => entry,
            };
            entries.insert(index, merged);
        }
    }
    Ok(entries)
}
// endregion Equation Parsing

/// Resolve a reaction definition into a complete stoichiometric vector
///
/// # Parameters
/// - `reaction`: The reaction definition
/// - `components`: Component set the vector is aligned with
/// - `conserved_for`: Quantities used to solve for unknown coefficients
/// - `parameters`: Names which may appear in symbolic coefficients
///
/// # Returns
/// The stoichiometry, or a [`StoichiometryError`] if the definition references undefined
/// components or parameters, is malformed, or its unknowns can't be solved for uniquely
///
/// # Examples
/// ```rust
/// use indexmap::IndexMap;
/// use stoichrs_core::components::{ComponentBuilder, Components};
/// use stoichrs_core::process::{resolve_stoichiometry, ReactionSpec};
/// let components = Components::from_components([
///     ComponentBuilder::default().id("A").conversion_factor("COD", 1.).build().unwrap(),
///     ComponentBuilder::default().id("B").conversion_factor("COD", 2.).build().unwrap(),
///     ComponentBuilder::default().id("C").conversion_factor("COD", 1.).build().unwrap(),
/// ])
/// .unwrap()
/// .compile();
/// let reaction = ReactionSpec::from("A + B -> ? C");
/// let stoichiometry =
///     resolve_stoichiometry(&reaction, &components, &["COD"], &IndexMap::new()).unwrap();
/// assert_eq!(stoichiometry.as_numeric().unwrap().as_slice(), &[-1., -1., 3.]);
/// ```
pub fn resolve_stoichiometry<S: AsRef<str>>(
    reaction: &ReactionSpec,
    components: &CompiledComponents,
    conserved_for: &[S],
    parameters: &IndexMap<String, Symbol>,
) -> Result<Stoichiometry, StoichiometryError> {
    let config = configuration::current();
    let entries = match reaction {
        ReactionSpec::Vector(vector) => {
            if vector.len() != components.size() {
                return Err(StoichiometryError::LengthMismatch {
                    expected: components.size(),
                    found: vector.len(),
                });
            }
            return Ok(Stoichiometry::from_numbers(vector.iter().copied().collect()));
        }
        ReactionSpec::Equation(equation) => {
            parse_equation(equation, components, parameters, &config.unknown_placeholder)?
        }
        ReactionSpec::Mapping(mapping) => {
            let mut entries: IndexMap<usize, Entry> = IndexMap::new();
            for (id, coefficient) in mapping {
                let index = components
                    .index(id)
                    .map_err(|_| StoichiometryError::UndefinedComponent(id.clone()))?;
                let entry = match coefficient {
                    Coefficient::Value(v) => Entry::Known(Expr::number(*v)),
                    Coefficient::Expression(text) => {
                        parse_coefficient(text, parameters, &config.unknown_placeholder)?
                    }
                    Coefficient::Unknown => Entry::Unknown,
                };
                entries.insert(index, entry);
            }
            entries
        }
    };

    let mut coefficients = vec![Expr::zero(); components.size()];
    let mut unknowns: Vec<usize> = Vec::new();
    for (index, entry) in entries {
        match entry {
            Entry::Known(expr) => coefficients[index] = expr,
            Entry::Unknown => unknowns.push(index),
        }
    }

    if !unknowns.is_empty() {
        let quantities: Vec<&str> = conserved_for.iter().map(|q| q.as_ref()).collect();
        debug!(
            "Solving for the coefficients of {:?} conserving {:?}",
            unknowns
                .iter()
                .map(|i| components.ids()[*i].as_str())
                .collect::<Vec<_>>(),
            quantities
        );
        let mut a = DMatrix::zeros(quantities.len(), unknowns.len());
        let mut b = Vec::with_capacity(quantities.len());
        for (row, quantity) in quantities.iter().enumerate() {
            let factors = components.conversion_factors(quantity);
            for (col, index) in unknowns.iter().enumerate() {
                a[(row, col)] = factors[*index];
            }
            let known = Expr::sum(
                coefficients
                    .iter()
                    .zip(factors.iter())
                    .map(|(c, f)| c.expand() * *f),
            );
            b.push(-known);
        }
        let solution = solve_symbolic(
            &a,
            &b,
            config.pivot_tolerance,
            config.conservation_tolerance,
        )?;
        for (index, value) in unknowns.into_iter().zip(solution) {
            coefficients[index] = value;
        }
    }

    Ok(Stoichiometry::from_exprs(coefficients))
}
