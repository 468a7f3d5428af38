use super::sets_and_parameters::Parameters;
use derive_more::Display;
use itertools::Itertools;
use ndarray::{Array3, Array4, Array5, ArrayView, Dimension, IntoDimension, Zip};

/// There is nothing to average: the instance declares no backorder variables
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[display(fmt = "no backorder variables, the average backorder is undefined")]
pub struct DegenerateResult;

impl std::error::Error for DegenerateResult {}

/// The arithmetic mean of the solved backorder quantities
pub fn average_backorder<I>(values: I) -> Result<f64, DegenerateResult>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), x| (sum + x, count + 1));

    match count {
        0 => Err(DegenerateResult),
        n => Ok(sum / n as f64),
    }
}

/// The solved plan, with the same indexing as the model variables
#[derive(Debug, Clone)]
#[allow(non_snake_case)]
pub struct PlanningResult {
    pub Q0: Array3<f64>,
    pub Q1: Array3<f64>,
    pub q0: Array4<f64>,
    pub q1: Array5<f64>,
    pub q2: Array5<f64>,
    pub I0: Array3<f64>,
    pub I1: Array4<f64>,
    pub B: Array4<f64>,
    /// total objective cost of the plan
    pub cost: f64,
}

fn dot<D: Dimension>(costs: &ndarray::Array<f64, D>, values: &ndarray::Array<f64, D>) -> f64 {
    Zip::from(costs).and(values).fold(0.0, |acc, c, x| acc + c * x)
}

fn nonzero_of<D: Dimension>(name: &str, values: ArrayView<f64, D>) -> Vec<(String, f64)> {
    values
        .indexed_iter()
        .filter(|(_, &x)| x.abs() > 1e-9)
        .map(|(index, &x)| {
            let index = index.into_dimension();
            (format!("{}_{}", name, index.slice().iter().join("_")), x)
        })
        .collect()
}

#[allow(non_snake_case)]
impl PlanningResult {
    /// The objective value of this plan under `parameters`
    pub fn cost_of(&self, parameters: &Parameters) -> f64 {
        dot(&parameters.c_Q0, &self.Q0)
            + dot(&parameters.c_Q1, &self.Q1)
            + dot(&parameters.c_q0, &self.q0)
            + dot(&parameters.c_q1, &self.q1)
            + dot(&parameters.c_q2, &self.q2)
            + dot(&parameters.c_I0, &self.I0)
            + dot(&parameters.c_I1, &self.I1)
            + dot(&parameters.c_B, &self.B)
    }

    pub fn total_backorder(&self) -> f64 {
        self.B.sum()
    }

    /// Every non-zero quantity of the plan, named like the model variables
    pub fn nonzero(&self) -> Vec<(String, f64)> {
        let mut out = nonzero_of("Q0", self.Q0.view());
        out.extend(nonzero_of("Q1", self.Q1.view()));
        out.extend(nonzero_of("q0", self.q0.view()));
        out.extend(nonzero_of("q1", self.q1.view()));
        out.extend(nonzero_of("q2", self.q2.view()));
        out.extend(nonzero_of("I0", self.I0.view()));
        out.extend(nonzero_of("I1", self.I1.view()));
        out.extend(nonzero_of("B", self.B.view()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_of_two_backorders() {
        assert_eq!(average_backorder([3.0, 5.0]), Ok(4.0));
    }

    #[test]
    fn average_without_backorders_is_degenerate() {
        assert_eq!(average_backorder(std::iter::empty()), Err(DegenerateResult));
    }

    #[test]
    fn nonzero_names_entries_by_index() {
        let mut values = Array3::zeros((1, 2, 2));
        values[[0, 1, 0]] = 7.0;
        assert_eq!(
            nonzero_of("I0", values.view()),
            vec![("I0_0_1_0".to_string(), 7.0)]
        );
    }
}
