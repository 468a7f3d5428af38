use super::{Backend, LinExpr, Result, Sense, SolverError};
use grb::prelude::*;
use log::trace;
use std::ops::Range;

/// Gurobi backend. The model (and its environment) is freed when this is dropped.
pub struct Gurobi {
    model: Model,
    solved: bool,
}

impl From<grb::Error> for SolverError {
    fn from(err: grb::Error) -> Self {
        SolverError::Backend(format!("{:?}", err))
    }
}

impl Backend for Gurobi {
    type Var = Var;

    fn new(name: &str) -> Result<Self> {
        Ok(Gurobi {
            model: Model::new(name)?,
            solved: false,
        })
    }

    fn add_var(
        &mut self,
        name: &str,
        bounds: Range<f64>,
        objective: f64,
        integral: bool,
    ) -> Result<Var> {
        let vtype = if integral {
            VarType::Integer
        } else {
            VarType::Continuous
        };
        Ok(self.model.add_var(
            name,
            vtype,
            objective,
            bounds.start,
            bounds.end,
            std::iter::empty(),
        )?)
    }

    fn add_constr(&mut self, name: &str, lhs: LinExpr<Var>, sense: Sense, rhs: f64) -> Result<()> {
        let expr = lhs
            .into_terms()
            .into_iter()
            .map(|(coefficient, var)| coefficient * var)
            .grb_sum();

        let constr = match sense {
            Sense::Le => c!(expr <= rhs),
            Sense::Eq => c!(expr == rhs),
            Sense::Ge => c!(expr >= rhs),
        };
        self.model.add_constr(name, constr)?;
        Ok(())
    }

    fn set_verbosity(&mut self, level: u8) -> Result<()> {
        self.model
            .set_param(param::OutputFlag, i32::from(level.min(1)))?;
        Ok(())
    }

    fn optimize(&mut self) -> Result<()> {
        self.model.update()?;
        self.model.optimize()?;

        let status = self.model.status()?;
        trace!("gurobi finished with status {:?}", status);
        check_status(status)?;
        self.solved = true;
        Ok(())
    }

    fn value(&self, var: Var) -> Result<f64> {
        if !self.solved {
            return Err(SolverError::NotSolved);
        }
        Ok(self.model.get_obj_attr(attr::X, &var)?)
    }

    fn name(&self, var: Var) -> Result<String> {
        Ok(self.model.get_obj_attr(attr::VarName, &var)?)
    }
}

/// Anything but a proven optimum is a failure, reported as the status Gurobi gave
fn check_status(status: Status) -> Result<()> {
    match status {
        Status::Optimal => Ok(()),
        Status::Infeasible => Err(SolverError::Infeasible),
        Status::Unbounded => Err(SolverError::Unbounded),
        Status::InfOrUnbd => Err(SolverError::InfeasibleOrUnbounded),
        other => Err(SolverError::Numerical(format!("{:?}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presolve_status_is_not_reported_as_unbounded() {
        assert_eq!(
            check_status(Status::InfOrUnbd),
            Err(SolverError::InfeasibleOrUnbounded)
        );
        assert_eq!(check_status(Status::Infeasible), Err(SolverError::Infeasible));
        assert_eq!(check_status(Status::Unbounded), Err(SolverError::Unbounded));
        assert_eq!(check_status(Status::Optimal), Ok(()));
        assert!(matches!(
            check_status(Status::TimeLimit),
            Err(SolverError::Numerical(_))
        ));
    }
}
