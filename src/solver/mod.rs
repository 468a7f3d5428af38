//! The minimal contract the planning model needs from a mixed-integer linear program solver.
//!
//! A backend owns every resource of one optimization instance (environment, model, solution).
//! Those resources are released when the backend is dropped, whether or not `optimize` succeeded.

pub mod microlp;

#[cfg(feature = "gurobi")]
pub mod gurobi;

use derive_more::Display;
use std::ops::Range;

pub use self::microlp::MicroLp;

/// The sense of a linear constraint `lhs <sense> rhs`
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    #[display(fmt = "<=")]
    Le,
    #[display(fmt = "==")]
    Eq,
    #[display(fmt = ">=")]
    Ge,
}

#[derive(Debug, Display, Clone, PartialEq)]
pub enum SolverError {
    /// The model has no feasible solution
    Infeasible,
    /// The objective is unbounded below
    Unbounded,
    /// The solver proved one of the two without telling which
    #[display(fmt = "infeasible or unbounded")]
    InfeasibleOrUnbounded,
    /// The solver stopped without a proven optimum
    #[display(fmt = "numerical failure: {}", _0)]
    Numerical(String),
    /// A solved value was requested before a successful `optimize`
    NotSolved,
    /// Any other failure reported by the underlying library
    #[display(fmt = "backend error: {}", _0)]
    Backend(String),
}

impl std::error::Error for SolverError {}

pub type Result<T> = std::result::Result<T, SolverError>;

pub trait Backend: Sized {
    /// Handle to a declared variable
    type Var: Copy + std::fmt::Debug;

    /// Acquire a fresh, empty model
    fn new(name: &str) -> Result<Self>;

    /// Declare a variable with the given bounds and objective coefficient. The objective is minimised.
    fn add_var(
        &mut self,
        name: &str,
        bounds: Range<f64>,
        objective: f64,
        integral: bool,
    ) -> Result<Self::Var>;

    fn add_constr(
        &mut self,
        name: &str,
        lhs: LinExpr<Self::Var>,
        sense: Sense,
        rhs: f64,
    ) -> Result<()>;

    /// 0 silences the solver, higher levels let it log
    fn set_verbosity(&mut self, level: u8) -> Result<()>;

    fn optimize(&mut self) -> Result<()>;

    /// The solved value of `var`. Fails with `NotSolved` before a successful `optimize`.
    fn value(&self, var: Self::Var) -> Result<f64>;

    fn name(&self, var: Self::Var) -> Result<String>;
}

/// A linear expression `sum(coefficient * variable)` without constant term.
#[derive(Debug, Clone)]
pub struct LinExpr<V> {
    terms: Vec<(f64, V)>,
}

impl<V> Default for LinExpr<V> {
    fn default() -> Self {
        Self { terms: Vec::new() }
    }
}

impl<V: Copy> LinExpr<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `+1 * var` for every variable in `vars`
    pub fn plus<I: IntoIterator<Item = V>>(mut self, vars: I) -> Self {
        self.terms.extend(vars.into_iter().map(|v| (1.0, v)));
        self
    }

    /// Add `-1 * var` for every variable in `vars`
    pub fn minus<I: IntoIterator<Item = V>>(mut self, vars: I) -> Self {
        self.terms.extend(vars.into_iter().map(|v| (-1.0, v)));
        self
    }

    pub fn terms(&self) -> &[(f64, V)] {
        &self.terms
    }

    pub fn into_terms(self) -> Vec<(f64, V)> {
        self.terms
    }
}

/// Sum an iterator of variables into a linear expression with unit coefficients
pub trait LinSum<V> {
    fn lin_sum(self) -> LinExpr<V>;
}

impl<V: Copy, I: IntoIterator<Item = V>> LinSum<V> for I {
    fn lin_sum(self) -> LinExpr<V> {
        LinExpr::new().plus(self)
    }
}

/// Evaluate `lhs <sense> rhs` for given variable values, with tolerance `eps`
pub fn satisfied(lhs: f64, sense: Sense, rhs: f64, eps: f64) -> bool {
    match sense {
        Sense::Le => lhs <= rhs + eps,
        Sense::Eq => (lhs - rhs).abs() <= eps,
        Sense::Ge => lhs + eps >= rhs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lin_sum_uses_unit_coefficients() {
        let expr = vec![3usize, 4, 5].lin_sum().minus([7]);
        assert_eq!(expr.terms(), &[(1.0, 3), (1.0, 4), (1.0, 5), (-1.0, 7)]);
    }

    #[test]
    fn satisfied_respects_sense() {
        assert!(satisfied(1.0, Sense::Le, 1.0, 1e-9));
        assert!(!satisfied(1.1, Sense::Le, 1.0, 1e-9));
        assert!(satisfied(1.0 + 1e-10, Sense::Eq, 1.0, 1e-9));
        assert!(!satisfied(0.5, Sense::Ge, 1.0, 1e-9));
    }
}
