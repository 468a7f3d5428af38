use super::{Backend, LinExpr, Result, Sense, SolverError};
use good_lp::{
    default_solver, variable, Constraint, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};
use log::{debug, trace};
use std::ops::Range;

/// Pure Rust backend: `good_lp` with the `microlp` branch-and-bound solver.
///
/// `good_lp` builds a problem in stages (variables, then objective, then constraints), so
/// declarations are collected here and handed over in one go by `optimize`.
pub struct MicroLp {
    name: String,
    vars: ProblemVariables,
    handles: Vec<Variable>,
    names: Vec<String>,
    objective: Expression,
    constraints: Vec<Constraint>,
    values: Option<Vec<f64>>,
}

impl From<ResolutionError> for SolverError {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::Infeasible => SolverError::Infeasible,
            ResolutionError::Unbounded => SolverError::Unbounded,
            other => SolverError::Numerical(other.to_string()),
        }
    }
}

impl Backend for MicroLp {
    type Var = usize;

    fn new(name: &str) -> Result<Self> {
        Ok(MicroLp {
            name: name.to_string(),
            vars: ProblemVariables::new(),
            handles: Vec::new(),
            names: Vec::new(),
            objective: Expression::default(),
            constraints: Vec::new(),
            values: None,
        })
    }

    fn add_var(
        &mut self,
        name: &str,
        bounds: Range<f64>,
        objective: f64,
        integral: bool,
    ) -> Result<usize> {
        let mut def = variable().name(name).min(bounds.start);
        if bounds.end.is_finite() {
            def = def.max(bounds.end);
        }
        if integral {
            def = def.integer();
        }

        let var = self.vars.add(def);
        if objective != 0.0 {
            self.objective.add_mul(objective, var);
        }

        self.handles.push(var);
        self.names.push(name.to_string());
        Ok(self.handles.len() - 1)
    }

    fn add_constr(
        &mut self,
        name: &str,
        lhs: LinExpr<usize>,
        sense: Sense,
        rhs: f64,
    ) -> Result<()> {
        let mut expr = Expression::with_capacity(lhs.terms().len());
        for (coefficient, var) in lhs.into_terms() {
            let handle = self
                .handles
                .get(var)
                .ok_or_else(|| SolverError::Backend(format!("unknown variable {var} in {name}")))?;
            expr.add_mul(coefficient, *handle);
        }

        let constr = match sense {
            Sense::Le => expr.leq(rhs),
            Sense::Eq => expr.eq(rhs),
            Sense::Ge => expr.geq(rhs),
        };
        self.constraints.push(constr);
        Ok(())
    }

    fn set_verbosity(&mut self, level: u8) -> Result<()> {
        // microlp has no solver log of its own
        debug!("{}: verbosity {} ignored by microlp", self.name, level);
        Ok(())
    }

    fn optimize(&mut self) -> Result<()> {
        if self.values.is_some() {
            return Err(SolverError::Backend(format!(
                "{} has already been optimized",
                self.name
            )));
        }

        trace!(
            "{}: solving with {} variables and {} constraints",
            self.name,
            self.handles.len(),
            self.constraints.len()
        );

        let vars = std::mem::replace(&mut self.vars, ProblemVariables::new());
        let objective = std::mem::take(&mut self.objective);
        let constraints = std::mem::take(&mut self.constraints);

        let solution = vars
            .minimise(objective)
            .using(default_solver)
            .with_all(constraints)
            .solve()?;

        self.values = Some(self.handles.iter().map(|v| solution.value(*v)).collect());
        Ok(())
    }

    fn value(&self, var: usize) -> Result<f64> {
        let values = self.values.as_ref().ok_or(SolverError::NotSolved)?;
        values
            .get(var)
            .copied()
            .ok_or_else(|| SolverError::Backend(format!("unknown variable {var}")))
    }

    fn name(&self, var: usize) -> Result<String> {
        self.names
            .get(var)
            .cloned()
            .ok_or_else(|| SolverError::Backend(format!("unknown variable {var}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::LinSum;

    #[test]
    fn solves_small_integer_program() {
        // min x + 2y  s.t.  x + y >= 3.5, x <= 2
        let mut model = MicroLp::new("small").unwrap();
        let x = model.add_var("x", 0.0..f64::INFINITY, 1.0, true).unwrap();
        let y = model.add_var("y", 0.0..f64::INFINITY, 2.0, true).unwrap();
        model.add_constr("cover", [x, y].lin_sum(), Sense::Ge, 3.5).unwrap();
        model.add_constr("cap", [x].lin_sum(), Sense::Le, 2.0).unwrap();
        model.optimize().unwrap();

        assert!((model.value(x).unwrap() - 2.0).abs() < 1e-6);
        assert!((model.value(y).unwrap() - 2.0).abs() < 1e-6);
        assert_eq!(model.name(y).unwrap(), "y");
    }

    #[test]
    fn values_require_optimize() {
        let mut model = MicroLp::new("unsolved").unwrap();
        let x = model.add_var("x", 0.0..1.0, 1.0, false).unwrap();
        assert_eq!(model.value(x), Err(SolverError::NotSolved));
    }

    #[test]
    fn reports_infeasibility() {
        let mut model = MicroLp::new("infeasible").unwrap();
        let x = model.add_var("x", 0.0..f64::INFINITY, 1.0, true).unwrap();
        model.add_constr("low", [x].lin_sum(), Sense::Le, 1.0).unwrap();
        model.add_constr("high", [x].lin_sum(), Sense::Ge, 2.0).unwrap();
        assert_eq!(model.optimize(), Err(SolverError::Infeasible));
    }
}
