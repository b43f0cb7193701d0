//! Solve the conservation equations for unknown stoichiometric coefficients
//!
//! The conversion factors are always numeric, so the system is `A x = b` with a numeric
//! `A` and a right hand side `b` which may contain parameters. Gauss-Jordan elimination is
//! run on `A` and every row operation is mirrored on `b`.
use log::debug;
use nalgebra::DMatrix;
use thiserror::Error;

use crate::expression::Expr;

/// Errors raised while solving for unknown coefficients
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ResolutionError {
    #[error(
        "Unable to solve for {unknowns} unknown coefficient(s), the conserved quantities only provide {rank} independent equation(s)"
    )]
    Underdetermined { unknowns: usize, rank: usize },
    #[error("The conservation equations are inconsistent, a residual of {residual} remains")]
    Inconsistent { residual: String },
}

/// Whether every term of an (expanded) expression is below `tolerance` in magnitude
fn is_negligible(expr: &Expr, tolerance: f64) -> bool {
    match expr {
        Expr::Number(v) => v.abs() <= tolerance,
        Expr::Add(terms) => terms.iter().all(|t| is_negligible(t, tolerance)),
        other => other.split_coefficient().0.abs() <= tolerance,
    }
}

/// Solve `a x = b` for `x`
///
/// # Parameters
/// - `a`: numeric coefficient matrix, one row per equation and one column per unknown
/// - `b`: right hand side, one expression per equation
/// - `pivot_tolerance`: pivots smaller than this (relative to the largest entry of `a`) are
///   treated as zero
/// - `residual_tolerance`: equations left over after elimination must reduce to within this
///   of zero
///
/// # Returns
/// The unknowns in column order, or a [`ResolutionError`] if `a` does not have full column
/// rank or the leftover equations are not satisfied
pub(crate) fn solve_symbolic(
    a: &DMatrix<f64>,
    b: &[Expr],
    pivot_tolerance: f64,
    residual_tolerance: f64,
) -> Result<Vec<Expr>, ResolutionError> {
    let (m, n) = a.shape();
    if n == 0 {
        return Ok(Vec::new());
    }
    if m == 0 {
        return Err(ResolutionError::Underdetermined {
            unknowns: n,
            rank: 0,
        });
    }
    let tolerance = pivot_tolerance * a.amax();
    let rank = a.rank(tolerance);
    if rank < n {
        return Err(ResolutionError::Underdetermined { unknowns: n, rank });
    }

    let mut a = a.clone();
    let mut b = b.to_vec();
    for col in 0..n {
        // Partial pivoting, the row with the largest entry in this column becomes the pivot
        let mut pivot_row = col;
        for r in col..m {
            if a[(r, col)].abs() > a[(pivot_row, col)].abs() {
                pivot_row = r;
            }
        }
        if a[(pivot_row, col)].abs() <= tolerance {
            return Err(ResolutionError::Underdetermined { unknowns: n, rank });
        }
        a.swap_rows(col, pivot_row);
        b.swap(col, pivot_row);

        let pivot = a[(col, col)];
        for c in 0..n {
            a[(col, c)] /= pivot;
        }
        b[col] = b[col].clone() * (1. / pivot);

        for r in 0..m {
            if r == col {
                continue;
            }
            let factor = a[(r, col)];
            if factor == 0. {
                continue;
            }
            for c in 0..n {
                let v = a[(col, c)];
                a[(r, c)] -= factor * v;
            }
            b[r] = b[r].clone() - b[col].clone() * factor;
        }
    }

    // Rows past the last pivot have no unknowns left, they must be satisfied as is
    for residual in b.iter().skip(n) {
        let residual = residual.expand();
        if !is_negligible(&residual, residual_tolerance) {
            return Err(ResolutionError::Inconsistent {
                residual: residual.to_string(),
            });
        }
    }
    debug!(
        "Solved for {} unknown coefficient(s) from {} conservation equation(s)",
        n, m
    );
    Ok(b.into_iter().take(n).map(|x| x.expand()).collect())
}
