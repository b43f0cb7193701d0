//! Canonicalizing constructors and arithmetic operators for [`Expr`]
//!
//! The canonical form is:
//! - sums are flat, like terms are collected, the constant term comes last
//! - products are flat, like bases are collected into powers, the numeric
//!   coefficient comes first
//! - a numeric coefficient multiplying a single sum is distributed over it
//! - numeric sub-expressions are folded
use std::ops::{Add, Div, Mul, Neg, Sub};

use super::{Expr, Function, Symbol};

/// Relative size below which a cancelling sum is treated as exactly zero, a few ulps of
/// the largest contributing term
const CANCELLATION_TOLERANCE: f64 = 8. * f64::EPSILON;

fn is_cancelled(value: f64, scale: f64) -> bool {
    value == 0. || value.abs() <= CANCELLATION_TOLERANCE * scale
}

/// Accumulates the terms of a sum, collecting like terms
#[derive(Default)]
struct SumBuilder {
    constant: f64,
    constant_scale: f64,
    /// (term without coefficient, coefficient, largest contributing magnitude)
    terms: Vec<(Expr, f64, f64)>,
}

impl SumBuilder {
    fn push(&mut self, term: Expr) {
        match term {
            Expr::Number(v) => {
                self.constant += v;
                self.constant_scale = self.constant_scale.max(v.abs());
            }
            Expr::Add(inner) => inner.into_iter().for_each(|t| self.push(t)),
            other => {
                let (coefficient, rest) = other.split_coefficient();
                match self.terms.iter_mut().find(|(r, _, _)| *r == rest) {
                    Some(entry) => {
                        entry.1 += coefficient;
                        entry.2 = entry.2.max(coefficient.abs());
                    }
                    None => self.terms.push((rest, coefficient, coefficient.abs())),
                }
            }
        }
    }

    fn finish(self) -> Expr {
        let mut terms: Vec<(Expr, f64)> = self
            .terms
            .into_iter()
            .filter(|(_, c, scale)| !is_cancelled(*c, *scale))
            .map(|(rest, c, _)| (rest, c))
            .collect();
        terms.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.total_cmp(&b.1)));
        let mut result: Vec<Expr> = terms
            .into_iter()
            .map(|(rest, c)| Expr::scaled(c, rest))
            .collect();
        if !is_cancelled(self.constant, self.constant_scale) {
            result.push(Expr::number(self.constant));
        }
        match result.len() {
            0 => Expr::zero(),
            1 => result.remove(0),
            _ => Expr::Add(result),
        }
    }
}

/// Accumulates the factors of a product, collecting like bases
struct ProductBuilder {
    coefficient: f64,
    /// (base, exponents to be summed)
    bases: Vec<(Expr, Vec<Expr>)>,
}

impl ProductBuilder {
    fn new() -> Self {
        ProductBuilder {
            coefficient: 1.,
            bases: Vec::new(),
        }
    }

    fn push(&mut self, factor: Expr) {
        match factor {
            Expr::Number(v) => self.coefficient *= v,
            Expr::Mul(inner) => inner.into_iter().for_each(|f| self.push(f)),
            Expr::Pow(base, exp) => self.push_base(*base, *exp),
            other => self.push_base(other, Expr::one()),
        }
    }

    fn push_base(&mut self, base: Expr, exp: Expr) {
        match self.bases.iter_mut().find(|(b, _)| *b == base) {
            Some(entry) => entry.1.push(exp),
            None => self.bases.push((base, vec![exp])),
        }
    }

    fn finish(self) -> Expr {
        let mut coefficient = self.coefficient;
        if coefficient == 0. {
            return Expr::zero();
        }
        let mut factors = Vec::new();
        for (base, exps) in self.bases {
            match Expr::pow(base, Expr::sum(exps)) {
                Expr::Number(v) => coefficient *= v,
                Expr::Mul(inner) => {
                    for f in inner {
                        match f {
                            Expr::Number(v) => coefficient *= v,
                            other => factors.push(other),
                        }
                    }
                }
                other => factors.push(other),
            }
        }
        if coefficient == 0. {
            return Expr::zero();
        }
        factors.sort();
        match factors.len() {
            0 => Expr::number(coefficient),
            1 => {
                let only = factors.remove(0);
                if coefficient == 1. {
                    return only;
                }
                match only {
                    Expr::Add(terms) => Expr::sum(
                        terms
                            .into_iter()
                            .map(|t| Expr::product([Expr::Number(coefficient), t])),
                    ),
                    other => Expr::Mul(vec![Expr::Number(coefficient), other]),
                }
            }
            _ => {
                if coefficient != 1. {
                    factors.insert(0, Expr::Number(coefficient));
                }
                Expr::Mul(factors)
            }
        }
    }
}

impl Expr {
    /// Create a numeric constant
    pub fn number(value: f64) -> Expr {
        // Fold negative zero so equal values hash equally
        if value == 0. {
            Expr::Number(0.)
        } else {
            Expr::Number(value)
        }
    }

    pub fn zero() -> Expr {
        Expr::Number(0.)
    }

    pub fn one() -> Expr {
        Expr::Number(1.)
    }

    /// Create a symbol expression from a name
    pub fn symbol(name: &str) -> Expr {
        Expr::Symbol(Symbol::new(name))
    }

    /// Sum of `terms` in canonical form
    pub fn sum<I: IntoIterator<Item = Expr>>(terms: I) -> Expr {
        let mut builder = SumBuilder::default();
        terms.into_iter().for_each(|t| builder.push(t));
        builder.finish()
    }

    /// Product of `factors` in canonical form
    pub fn product<I: IntoIterator<Item = Expr>>(factors: I) -> Expr {
        let mut builder = ProductBuilder::new();
        factors.into_iter().for_each(|f| builder.push(f));
        builder.finish()
    }

    /// `base` raised to `exp`
    pub fn pow(base: Expr, exp: Expr) -> Expr {
        let base_value = base.as_number();
        let exp_value = exp.as_number();
        match (base_value, exp_value) {
            (_, Some(e)) if e == 0. => return Expr::one(),
            (_, Some(e)) if e == 1. => return base,
            (Some(b), Some(e)) => return Expr::number(b.powf(e)),
            (Some(b), None) if b == 1. => return Expr::one(),
            _ => {}
        }
        match (base, exp_value) {
            (Expr::Pow(inner_base, inner_exp), Some(e)) if e.fract() == 0. => {
                Expr::pow(*inner_base, Expr::product([*inner_exp, exp]))
            }
            (Expr::Mul(factors), Some(e)) if e.fract() == 0. => Expr::product(
                factors
                    .into_iter()
                    .map(|f| Expr::pow(f, exp.clone())),
            ),
            (base, _) => Expr::Pow(Box::new(base), Box::new(exp)),
        }
    }

    /// Apply an elementary function
    pub fn call(func: Function, arg: Expr) -> Expr {
        match (func, arg) {
            (_, Expr::Number(v)) => Expr::number(func.apply(v)),
            (Function::Abs, arg) => {
                let (coefficient, rest) = arg.split_coefficient();
                if coefficient < 0. {
                    Expr::Call(func, Box::new(Expr::scaled(-coefficient, rest)))
                } else {
                    Expr::Call(func, Box::new(arg))
                }
            }
            (func, arg) => Expr::Call(func, Box::new(arg)),
        }
    }

    /// Absolute value of the expression
    pub fn abs(&self) -> Expr {
        Expr::call(Function::Abs, self.clone())
    }

    /// Multiplicative inverse of the expression
    pub fn recip(&self) -> Expr {
        Expr::pow(self.clone(), Expr::number(-1.))
    }

    /// Split a term into its numeric coefficient and the remaining factors
    pub(crate) fn split_coefficient(&self) -> (f64, Expr) {
        match self {
            Expr::Number(v) => (*v, Expr::one()),
            Expr::Mul(factors) => match factors.first() {
                Some(Expr::Number(c)) => {
                    let rest = &factors[1..];
                    if rest.len() == 1 {
                        (*c, rest[0].clone())
                    } else {
                        (*c, Expr::Mul(rest.to_vec()))
                    }
                }
                _ => (1., self.clone()),
            },
            _ => (1., self.clone()),
        }
    }

    /// Inverse of [`Expr::split_coefficient`]
    pub(crate) fn scaled(coefficient: f64, rest: Expr) -> Expr {
        if coefficient == 0. {
            return Expr::zero();
        }
        if coefficient == 1. {
            return rest;
        }
        match rest {
            Expr::Number(v) => Expr::number(coefficient * v),
            Expr::Mul(mut factors) => {
                factors.insert(0, Expr::Number(coefficient));
                Expr::Mul(factors)
            }
            Expr::Add(terms) => Expr::product([Expr::Number(coefficient), Expr::Add(terms)]),
            other => Expr::Mul(vec![Expr::Number(coefficient), other]),
        }
    }

    /// Distribute products (and positive integer powers) over sums
    ///
    /// # Examples
    /// ```rust
    /// use stoichrs_core::expression::Expr;
    /// let y = Expr::symbol("Y");
    /// // -(1 - Y)/Y expands to 1 - 1/Y
    /// let coefficient = -(Expr::one() - y.clone()) / y.clone();
    /// let expected = Expr::one() - y.recip();
    /// assert_eq!(coefficient.expand(), expected);
    /// ```
    pub fn expand(&self) -> Expr {
        match self {
            Expr::Number(_) | Expr::Symbol(_) => self.clone(),
            Expr::Add(terms) => Expr::sum(terms.iter().map(|t| t.expand())),
            Expr::Mul(factors) => factors
                .iter()
                .map(|f| f.expand())
                .fold(Expr::one(), |acc, f| distribute(&acc, &f)),
            Expr::Pow(base, exp) => {
                let base = base.expand();
                let exp = exp.expand();
                match (&base, exp.as_number()) {
                    (Expr::Add(_), Some(n)) if n.fract() == 0. && n > 1. && n <= 16. => {
                        let mut result = base.clone();
                        for _ in 1..(n as usize) {
                            result = distribute(&result, &base);
                        }
                        result
                    }
                    _ => Expr::pow(base, exp),
                }
            }
            Expr::Call(func, arg) => Expr::call(*func, arg.expand()),
        }
    }
}

fn terms_of(expr: &Expr) -> Vec<Expr> {
    match expr {
        Expr::Add(terms) => terms.clone(),
        other => vec![other.clone()],
    }
}

/// Multiply two expanded expressions term by term
fn distribute(left: &Expr, right: &Expr) -> Expr {
    let right_terms = terms_of(right);
    Expr::sum(terms_of(left).into_iter().flat_map(|l| {
        right_terms
            .iter()
            .map(move |r| Expr::product([l.clone(), r.clone()]))
    }))
}

// region Operators
impl Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        Expr::sum([self, rhs])
    }
}

impl Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        Expr::sum([self, -rhs])
    }
}

impl Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        Expr::product([self, rhs])
    }
}

impl Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Expr {
        Expr::product([self, rhs.recip()])
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::product([Expr::number(-1.), self])
    }
}

impl Mul<f64> for Expr {
    type Output = Expr;

    fn mul(self, rhs: f64) -> Expr {
        Expr::product([self, Expr::number(rhs)])
    }
}
// endregion Operators

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_terms_are_collected() {
        let x = Expr::symbol("x");
        let expr = x.clone() + x.clone() + Expr::number(3.) * x.clone();
        assert_eq!(expr, Expr::number(5.) * x.clone());
        assert!((x.clone() - x).is_zero());
    }

    #[test]
    fn addition_is_order_independent() {
        let a = Expr::symbol("a");
        let b = Expr::symbol("b");
        let c = Expr::symbol("c");
        let left = (a.clone() + b.clone()) + c.clone() * a.clone();
        let right = a.clone() * c + (b + a);
        assert_eq!(left, right);
    }

    #[test]
    fn floating_point_cancellation_is_zero() {
        let expr = Expr::number(0.1) + Expr::number(0.2) - Expr::number(0.3);
        assert!(expr.is_zero());
        let x = Expr::symbol("x");
        let expr = x.clone() * 0.1 + x.clone() * 0.2 - x * 0.3;
        assert!(expr.is_zero());
    }

    #[test]
    fn small_terms_survive_cancellation() {
        let expr = Expr::number(1e13) + Expr::number(1.) - Expr::number(1e13);
        assert_eq!(expr, Expr::one());
        let x = Expr::symbol("x");
        let expr = x.clone() + x.clone() * 1e-13 - x.clone();
        let (coefficient, rest) = expr.split_coefficient();
        assert_eq!(rest, x);
        assert!((coefficient - 1e-13).abs() < 1e-15);
    }

    #[test]
    fn like_bases_become_powers() {
        let x = Expr::symbol("x");
        let squared = x.clone() * x.clone();
        assert_eq!(squared, Expr::pow(x.clone(), Expr::number(2.)));
        assert_eq!(squared / x.clone(), x);
        assert_eq!(x.clone() / x, Expr::one());
    }

    #[test]
    fn numeric_coefficient_distributes_over_sum() {
        let a = Expr::symbol("a");
        let b = Expr::symbol("b");
        let expr = Expr::number(2.) * (a.clone() + b.clone());
        assert_eq!(expr, Expr::number(2.) * a.clone() + Expr::number(2.) * b.clone());
        assert_eq!(-(a.clone() - b.clone()), b - a);
    }

    #[test]
    fn numbers_fold() {
        let expr = Expr::pow(Expr::number(2.), Expr::number(3.)) * Expr::number(0.5);
        assert_eq!(expr, Expr::number(4.));
        assert_eq!(Expr::call(Function::Exp, Expr::zero()), Expr::one());
        assert_eq!(Expr::number(-0.), Expr::zero());
    }

    #[test]
    fn abs_drops_negative_coefficient() {
        let y = Expr::symbol("Y");
        assert_eq!((-y.clone()).abs(), y.abs());
        assert_eq!(Expr::number(-2.).abs(), Expr::number(2.));
    }

    #[test]
    fn expand_products_of_sums() {
        let a = Expr::symbol("a");
        let b = Expr::symbol("b");
        let squared = Expr::pow(a.clone() + b.clone(), Expr::number(2.));
        let expected = a.clone() * a.clone()
            + Expr::number(2.) * a.clone() * b.clone()
            + b.clone() * b.clone();
        assert_eq!(squared.expand(), expected);

        let y = Expr::symbol("Y");
        let expr = (Expr::one() - y.clone()) / y.clone() + Expr::one();
        assert_eq!(expr.expand(), y.recip());
    }
}
