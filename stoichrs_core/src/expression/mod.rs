//! This module provides a small symbolic algebra used for stoichiometric coefficients and
//! kinetic rate equations
//!
//! Expressions are kept in a canonical form by the constructors in [`ops`], so two
//! expressions built from equivalent sums and products compare equal.
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Serialize, Serializer};
use thiserror::Error;

pub mod ops;

// region Symbol
/// A named free variable, such as a kinetic parameter or a component concentration
///
/// Symbols are identified by name, so two symbols created from the same name are the same
/// free variable.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

impl Symbol {
    /// Create a new symbol
    pub fn new(name: &str) -> Self {
        Symbol(Arc::from(name))
    }

    /// Name of the symbol
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
// endregion Symbol

// region Function
/// Elementary functions available in expressions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Function {
    Exp,
    Log,
    Sqrt,
    Sin,
    Cos,
    Tan,
    Tanh,
    Abs,
}

impl Function {
    /// Look up a function by the name used in expression text
    pub fn from_name(name: &str) -> Option<Function> {
        match name {
            "exp" => Some(Function::Exp),
            "log" | "ln" => Some(Function::Log),
            "sqrt" => Some(Function::Sqrt),
            "sin" => Some(Function::Sin),
            "cos" => Some(Function::Cos),
            "tan" => Some(Function::Tan),
            "tanh" => Some(Function::Tanh),
            "abs" => Some(Function::Abs),
            _ => None,
        }
    }

    /// Name used when writing the function
    pub fn name(&self) -> &'static str {
        match self {
            Function::Exp => "exp",
            Function::Log => "log",
            Function::Sqrt => "sqrt",
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::Tanh => "tanh",
            Function::Abs => "abs",
        }
    }

    /// Apply the function to a number
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            Function::Exp => value.exp(),
            Function::Log => value.ln(),
            Function::Sqrt => value.sqrt(),
            Function::Sin => value.sin(),
            Function::Cos => value.cos(),
            Function::Tan => value.tan(),
            Function::Tanh => value.tanh(),
            Function::Abs => value.abs(),
        }
    }
}
// endregion Function

// region Expr
/// A scalar symbolic expression
///
/// Construct expressions with [`Expr::number`], [`Expr::symbol`] and the arithmetic
/// operators (or the constructors in [`ops`]) rather than the variants directly, the
/// constructors keep the expression canonical.
#[derive(Clone, Debug)]
pub enum Expr {
    /// Numeric constant
    Number(f64),
    /// Free variable
    Symbol(Symbol),
    /// Sum of terms
    Add(Vec<Expr>),
    /// Product of factors, a numeric coefficient (if any) comes first
    Mul(Vec<Expr>),
    /// Base raised to an exponent
    Pow(Box<Expr>, Box<Expr>),
    /// Elementary function applied to an argument
    Call(Function, Box<Expr>),
}

/// Errors raised while evaluating an expression numerically
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("No value provided for symbol {0}")]
    UnboundSymbol(String),
}

impl Expr {
    /// Whether the expression is a plain number
    pub fn is_number(&self) -> bool {
        matches!(self, Expr::Number(_))
    }

    /// Value of the expression if it is a plain number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Expr::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether the expression is exactly zero
    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Number(v) if *v == 0.0)
    }

    /// Collect every symbol appearing in the expression
    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        let mut symbols = BTreeSet::new();
        self.collect_symbols(&mut symbols);
        symbols
    }

    fn collect_symbols(&self, symbols: &mut BTreeSet<Symbol>) {
        match self {
            Expr::Number(_) => {}
            Expr::Symbol(s) => {
                symbols.insert(s.clone());
            }
            Expr::Add(args) | Expr::Mul(args) => {
                args.iter().for_each(|a| a.collect_symbols(symbols));
            }
            Expr::Pow(base, exp) => {
                base.collect_symbols(symbols);
                exp.collect_symbols(symbols);
            }
            Expr::Call(_, arg) => arg.collect_symbols(symbols),
        }
    }

    /// Replace symbols by expressions, the result is rebuilt in canonical form
    pub fn substitute(&self, replacements: &HashMap<Symbol, Expr>) -> Expr {
        match self {
            Expr::Number(_) => self.clone(),
            Expr::Symbol(s) => replacements.get(s).cloned().unwrap_or_else(|| self.clone()),
            Expr::Add(terms) => Expr::sum(terms.iter().map(|t| t.substitute(replacements))),
            Expr::Mul(factors) => {
                Expr::product(factors.iter().map(|f| f.substitute(replacements)))
            }
            Expr::Pow(base, exp) => Expr::pow(
                base.substitute(replacements),
                exp.substitute(replacements),
            ),
            Expr::Call(func, arg) => Expr::call(*func, arg.substitute(replacements)),
        }
    }

    /// Evaluate the expression numerically
    ///
    /// # Parameters
    /// - `values`: map of symbol names to values, every free symbol must be present
    ///
    /// # Examples
    /// ```rust
    /// use std::collections::HashMap;
    /// use stoichrs_core::expression::Expr;
    /// let rate = Expr::symbol("k") * Expr::symbol("A");
    /// let values = HashMap::from([("k".to_string(), 0.5), ("A".to_string(), 4.0)]);
    /// assert_eq!(rate.eval(&values).unwrap(), 2.0);
    /// ```
    pub fn eval(&self, values: &HashMap<String, f64>) -> Result<f64, EvaluationError> {
        Ok(match self {
            Expr::Number(v) => *v,
            Expr::Symbol(s) => match values.get(s.name()) {
                Some(v) => *v,
                None => return Err(EvaluationError::UnboundSymbol(s.name().to_string())),
            },
            Expr::Add(terms) => {
                let mut total = 0.;
                for t in terms {
                    total += t.eval(values)?;
                }
                total
            }
            Expr::Mul(factors) => {
                let mut total = 1.;
                for f in factors {
                    total *= f.eval(values)?;
                }
                total
            }
            Expr::Pow(base, exp) => base.eval(values)?.powf(exp.eval(values)?),
            Expr::Call(func, arg) => func.apply(arg.eval(values)?),
        })
    }

    /// Position of the variant in the canonical ordering
    fn rank(&self) -> u8 {
        match self {
            Expr::Number(_) => 0,
            Expr::Symbol(_) => 1,
            Expr::Call(..) => 2,
            Expr::Pow(..) => 3,
            Expr::Mul(_) => 4,
            Expr::Add(_) => 5,
        }
    }

    /// Binding strength used when deciding on parenthesis
    fn precedence(&self) -> u8 {
        match self {
            Expr::Add(_) => 1,
            Expr::Mul(_) => 2,
            Expr::Number(v) if *v < 0. => 2,
            Expr::Pow(_, exp) if matches!(**exp, Expr::Number(e) if e < 0.) => 2,
            Expr::Pow(..) => 3,
            _ => 4,
        }
    }
}

impl Ord for Expr {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Expr::Number(a), Expr::Number(b)) => a.total_cmp(b),
            (Expr::Symbol(a), Expr::Symbol(b)) => a.cmp(b),
            (Expr::Add(a), Expr::Add(b)) | (Expr::Mul(a), Expr::Mul(b)) => a.cmp(b),
            (Expr::Pow(a_base, a_exp), Expr::Pow(b_base, b_exp)) => {
                a_base.cmp(b_base).then_with(|| a_exp.cmp(b_exp))
            }
            (Expr::Call(a_func, a_arg), Expr::Call(b_func, b_arg)) => {
                a_func.cmp(b_func).then_with(|| a_arg.cmp(b_arg))
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Expr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Expr::Number(v) => v.to_bits().hash(state),
            Expr::Symbol(s) => s.hash(state),
            Expr::Add(args) | Expr::Mul(args) => args.hash(state),
            Expr::Pow(base, exp) => {
                base.hash(state);
                exp.hash(state);
            }
            Expr::Call(func, arg) => {
                func.hash(state);
                arg.hash(state);
            }
        }
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::number(value)
    }
}

impl From<Symbol> for Expr {
    fn from(value: Symbol) -> Self {
        Expr::Symbol(value)
    }
}
// endregion Expr

// region Display
fn write_number(f: &mut Formatter<'_>, value: f64) -> std::fmt::Result {
    if value.fract() == 0. && value.abs() < 1e15 {
        write!(f, "{}", value as i64)
    } else {
        write!(f, "{}", value)
    }
}

/// Write `expr`, wrapped in parenthesis if it binds weaker than `min_precedence`
fn write_operand(f: &mut Formatter<'_>, expr: &Expr, min_precedence: u8) -> std::fmt::Result {
    if expr.precedence() < min_precedence {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

fn write_product(f: &mut Formatter<'_>, factors: &[Expr]) -> std::fmt::Result {
    let (coefficient, rest) = match factors.first() {
        Some(Expr::Number(c)) => (*c, &factors[1..]),
        _ => (1., factors),
    };
    let mut numerator = Vec::new();
    let mut denominator = Vec::new();
    for factor in rest {
        match factor {
            Expr::Pow(base, exp) if matches!(**exp, Expr::Number(e) if e < 0.) => {
                let flipped = Expr::pow((**base).clone(), -(**exp).clone());
                denominator.push(flipped);
            }
            _ => numerator.push(factor.clone()),
        }
    }

    let mut parts: Vec<String> = Vec::new();
    let mut prefix = "";
    if coefficient == -1. && !numerator.is_empty() {
        prefix = "-";
    } else if coefficient != 1. || numerator.is_empty() {
        let mut s = String::new();
        if coefficient.fract() == 0. && coefficient.abs() < 1e15 {
            s.push_str(&format!("{}", coefficient as i64));
        } else {
            s.push_str(&format!("{}", coefficient));
        }
        parts.push(s);
    }
    for factor in &numerator {
        if factor.precedence() < 2 || matches!(factor, Expr::Mul(_)) {
            parts.push(format!("({})", factor));
        } else {
            parts.push(format!("{}", factor));
        }
    }
    write!(f, "{}{}", prefix, parts.join("*"))?;
    match denominator.len() {
        0 => Ok(()),
        1 if denominator[0].precedence() > 2 => write!(f, "/{}", denominator[0]),
        _ => {
            let joined: Vec<String> = denominator
                .iter()
                .map(|d| {
                    if d.precedence() < 3 {
                        format!("({})", d)
                    } else {
                        format!("{}", d)
                    }
                })
                .collect();
            write!(f, "/({})", joined.join("*"))
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Number(v) => write_number(f, *v),
            Expr::Symbol(s) => write!(f, "{}", s),
            Expr::Add(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    let (coefficient, rest) = term.split_coefficient();
                    if i == 0 {
                        write!(f, "{}", term)?;
                    } else if coefficient < 0. {
                        write!(f, " - {}", Expr::scaled(-coefficient, rest))?;
                    } else {
                        write!(f, " + {}", term)?;
                    }
                }
                Ok(())
            }
            Expr::Mul(factors) => write_product(f, factors),
            Expr::Pow(_, exp) if matches!(**exp, Expr::Number(e) if e < 0.) => {
                write_product(f, std::slice::from_ref(self))
            }
            Expr::Pow(base, exp) => {
                write_operand(f, base, 4)?;
                write!(f, "**")?;
                write_operand(f, exp, 4)
            }
            Expr::Call(func, arg) => write!(f, "{}({})", func.name(), arg),
        }
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}
// endregion Display

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_sum_with_negative_terms() {
        let k = Expr::symbol("k");
        let k2 = Expr::symbol("k2");
        let a = Expr::symbol("A");
        let b = Expr::symbol("B");
        let expr = -(k.clone() * a.clone()) + k2.clone() * b.clone();
        assert_eq!(expr.to_string(), "-A*k + B*k2");
        let expr = Expr::number(2.) * k * a - k2 * b;
        assert_eq!(expr.to_string(), "2*A*k - B*k2");
    }

    #[test]
    fn display_division_and_powers() {
        let y = Expr::symbol("Y");
        assert_eq!((Expr::number(-1.) / y.clone()).to_string(), "-1/Y");
        let x = Expr::symbol("x");
        assert_eq!(Expr::pow(x.clone(), Expr::number(2.)).to_string(), "x**2");
        let monod = Expr::symbol("S") / (Expr::symbol("K") + Expr::symbol("S"));
        assert_eq!(monod.to_string(), "S/(K + S)");
        assert_eq!(Expr::number(0.5).to_string(), "0.5");
        assert_eq!(y.recip().to_string(), "1/Y");
    }

    #[test]
    fn free_symbols_and_eval() {
        let expr = Expr::call(Function::Exp, Expr::symbol("a")) * Expr::symbol("b");
        let symbols: Vec<String> = expr
            .free_symbols()
            .into_iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(symbols, vec!["a".to_string(), "b".to_string()]);

        let values = HashMap::from([("a".to_string(), 0.), ("b".to_string(), 3.)]);
        assert_eq!(expr.eval(&values).unwrap(), 3.);

        let missing = HashMap::from([("a".to_string(), 0.)]);
        assert_eq!(
            expr.eval(&missing),
            Err(EvaluationError::UnboundSymbol("b".to_string()))
        );
    }

    #[test]
    fn substitute_rebuilds_canonical_form() {
        let x = Expr::symbol("x");
        let expr = x.clone() * Expr::symbol("y") + x.clone();
        let replacements = HashMap::from([(Symbol::new("y"), Expr::number(-1.))]);
        assert!(expr.substitute(&replacements).is_zero());
    }

    #[test]
    fn serialize_as_text() {
        let expr = Expr::symbol("k") * Expr::symbol("A");
        assert_eq!(serde_json::to_string(&expr).unwrap(), "\"A*k\"");
    }
}
