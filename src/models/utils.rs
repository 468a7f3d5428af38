use crate::solver::{Backend, Result, SolverError};
use itertools::Itertools;
use ndarray::{Array, Dimension, IntoDimension};
use std::ops::Range;

pub trait AddVars: Backend {
    /// Create one variable per entry of `costs`, using the entry as objective coefficient.
    ///
    /// The name and bounds of each variable are given by `name` and `bounds` called with its index.
    fn vars_with<D, N, F>(
        &mut self,
        costs: &Array<f64, D>,
        integral: bool,
        mut name: N,
        mut bounds: F,
    ) -> Result<Array<Self::Var, D>>
    where
        D: Dimension,
        N: FnMut(&[usize]) -> String,
        F: FnMut(&[usize]) -> Range<f64>,
    {
        let mut vars = Vec::with_capacity(costs.len());
        for (index, &cost) in costs.indexed_iter() {
            let index = index.into_dimension();
            let index = index.slice();
            vars.push(self.add_var(&name(index), bounds(index), cost, integral)?);
        }

        Array::from_shape_vec(costs.raw_dim(), vars)
            .map_err(|err| SolverError::Backend(err.to_string()))
    }

    /// Non-negative integer variables, one per entry of `costs`, named `{base_name}_{a}_{b}_..`
    fn int_vars<D: Dimension>(
        &mut self,
        base_name: &str,
        costs: &Array<f64, D>,
    ) -> Result<Array<Self::Var, D>> {
        self.vars_with(
            costs,
            true,
            |index| format!("{}_{}", base_name, index.iter().join("_")),
            |_| 0.0..f64::INFINITY,
        )
    }
}

impl<M: Backend> AddVars for M {}

/// Converts solver variables to their solved values
pub trait ConvertVars<M: Backend> {
    type Out;
    fn convert(&self, model: &M) -> Result<Self::Out>;
}

impl<M: Backend, D: Dimension> ConvertVars<M> for Array<M::Var, D> {
    type Out = Array<f64, D>;

    fn convert(&self, model: &M) -> Result<Self::Out> {
        let values = self
            .iter()
            .map(|var| model.value(*var))
            .collect::<Result<Vec<_>>>()?;

        Array::from_shape_vec(self.raw_dim(), values)
            .map_err(|err| SolverError::Backend(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::MicroLp;
    use ndarray::array;

    #[test]
    fn vars_are_named_by_index() {
        let mut model = MicroLp::new("names").unwrap();
        let costs = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let x = model.int_vars("x", &costs).unwrap();

        assert_eq!(x.shape(), &[2, 3]);
        assert_eq!(model.name(x[[0, 0]]).unwrap(), "x_0_0");
        assert_eq!(model.name(x[[1, 2]]).unwrap(), "x_1_2");
    }

    #[test]
    fn convert_keeps_shape() {
        let mut model = MicroLp::new("convert").unwrap();
        let costs = array![[1.0], [1.0]];
        let x = model
            .vars_with(
                &costs,
                false,
                |index| format!("x{}", index[0]),
                |index| {
                    let lb = index[0] as f64 + 1.0;
                    lb..lb + 1.0
                },
            )
            .unwrap();
        model.optimize().unwrap();

        let values = x.convert(&model).unwrap();
        assert_eq!(values.shape(), &[2, 1]);
        assert_eq!(model.name(x[[1, 0]]).unwrap(), "x1");
        assert!((values[[0, 0]] - 1.0).abs() < 1e-9);
        assert!((values[[1, 0]] - 2.0).abs() < 1e-9);
    }
}
