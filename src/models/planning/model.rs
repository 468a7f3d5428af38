use super::result::PlanningResult;
use super::sets_and_parameters::{Parameters, Sets};
use crate::config::InitialInventory;
use crate::models::utils::{AddVars, ConvertVars};
use crate::problem::{Attribution, InstanceData};
use crate::solver::{Backend, LinExpr, LinSum, Result, Sense};
use derive_more::Display;
use itertools::{iproduct, Itertools};
use log::{info, trace};
use ndarray::{Array3, Array4, Array5};

/// The variable families of the planning model
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    #[display(fmt = "Q0")]
    RegularProduction,
    #[display(fmt = "Q1")]
    OvertimeProduction,
    #[display(fmt = "q0")]
    WarehouseShipment,
    #[display(fmt = "q1")]
    CustomerShipment,
    #[display(fmt = "q2")]
    LateralTransfer,
    #[display(fmt = "I0")]
    WarehouseInventory,
    #[display(fmt = "I1")]
    DcInventory,
    #[display(fmt = "B")]
    Backorder,
}

#[allow(non_snake_case)]
pub struct Variables<V> {
    /// Q0[i, p, t]: regular production of product i by producer p in period t
    pub Q0: Array3<V>,
    /// Q1[i, p, t]: overtime production
    pub Q1: Array3<V>,
    /// q0[i, s, d, t]: shipped from the warehouse to DC d
    pub q0: Array4<V>,
    /// q1[i, s, d, h, t]: shipped from DC d to customer h
    pub q1: Array5<V>,
    /// q2[i, s, d, d', t]: transferred from DC d to DC d'
    pub q2: Array5<V>,
    /// I0[i, s, t]: warehouse inventory at the end of period t
    pub I0: Array3<V>,
    /// I1[i, s, d, t]: inventory at DC d at the end of period t
    pub I1: Array4<V>,
    /// B[i, s, h, t]: demand of customer h left unserved in period t
    pub B: Array4<V>,
    /// Every variable with the family it was created for, in creation order
    pub tagged: Vec<(Family, V)>,
}

impl<V: Copy> Variables<V> {
    /// The variables of one family, in creation order
    pub fn family(&self, family: Family) -> impl Iterator<Item = V> + '_ {
        self.tagged
            .iter()
            .filter(move |(f, _)| *f == family)
            .map(|(_, v)| *v)
    }
}

/// A built (and possibly solved) planning model
pub struct PlanningModel<M: Backend> {
    pub model: M,
    pub vars: Variables<M::Var>,
    pub sets: Sets,
    pub parameters: Parameters,
}

#[allow(non_snake_case)]
impl<M: Backend> PlanningModel<M> {
    /// Declare all variables and constraints of the planning model for the given parameters
    pub fn build(
        data: &InstanceData,
        sets: Sets,
        parameters: Parameters,
        verbosity: u8,
    ) -> Result<PlanningModel<M>> {
        info!(
            "Building {} planning model: I={}, P={}, D={}, H={}, T={}",
            sets.attribution, sets.I, sets.P, sets.D, sets.H, sets.T
        );

        let mut model = M::new(&format!("fmcg_{}", sets.attribution))?;
        model.set_verbosity(verbosity)?;

        let vars = Self::variables(&mut model, &sets, &parameters)?;
        Self::capacity_constraints(&mut model, data, &sets, &vars)?;
        Self::demand_constraints(&mut model, data, &sets, &vars)?;
        Self::balance_constraints(&mut model, &sets, &vars)?;
        if parameters.initial_inventory == InitialInventory::Empty {
            Self::initial_inventory_constraint(&mut model, &sets, &vars)?;
        }

        info!("Successfully built planning model with {} variables", vars.tagged.len());
        Ok(PlanningModel {
            model,
            vars,
            sets,
            parameters,
        })
    }

    fn variables(
        model: &mut M,
        sets: &Sets,
        parameters: &Parameters,
    ) -> Result<Variables<M::Var>> {
        let non_negative = |_: &[usize]| 0.0..f64::INFINITY;

        //*************CREATE VARIABLES*************//
        let Q0 = model.int_vars("Q0", &parameters.c_Q0)?;
        let Q1 = model.int_vars("Q1", &parameters.c_Q1)?;
        let q0 = model.vars_with(&parameters.c_q0, true, var_name(sets, "q0"), non_negative)?;
        let q1 = model.vars_with(&parameters.c_q1, true, var_name(sets, "q1"), non_negative)?;
        // a transfer from a DC to itself moves nothing
        let q2 = model.vars_with(&parameters.c_q2, true, var_name(sets, "q2"), |index| {
            if index[2] == index[3] {
                0.0..0.0
            } else {
                0.0..f64::INFINITY
            }
        })?;
        let I0 = model.vars_with(&parameters.c_I0, true, var_name(sets, "I0"), non_negative)?;
        let I1 = model.vars_with(&parameters.c_I1, true, var_name(sets, "I1"), non_negative)?;
        let B = model.vars_with(&parameters.c_B, true, var_name(sets, "B"), non_negative)?;

        let mut tagged = Vec::new();
        tagged.extend(Q0.iter().map(|v| (Family::RegularProduction, *v)));
        tagged.extend(Q1.iter().map(|v| (Family::OvertimeProduction, *v)));
        tagged.extend(q0.iter().map(|v| (Family::WarehouseShipment, *v)));
        tagged.extend(q1.iter().map(|v| (Family::CustomerShipment, *v)));
        tagged.extend(q2.iter().map(|v| (Family::LateralTransfer, *v)));
        tagged.extend(I0.iter().map(|v| (Family::WarehouseInventory, *v)));
        tagged.extend(I1.iter().map(|v| (Family::DcInventory, *v)));
        tagged.extend(B.iter().map(|v| (Family::Backorder, *v)));

        Ok(Variables {
            Q0,
            Q1,
            q0,
            q1,
            q2,
            I0,
            I1,
            B,
            tagged,
        })
    }

    /// production, warehouse and DC capacities, and the DC outflow bound
    fn capacity_constraints(
        model: &mut M,
        data: &InstanceData,
        sets: &Sets,
        vars: &Variables<M::Var>,
    ) -> Result<()> {
        let (I, P, S, D, T) = (sets.I, sets.P, sets.S, sets.D, sets.T);
        let Variables {
            Q0, Q1, q0, q2, I0, I1, ..
        } = vars;

        // regular and overtime production is limited per producer and period
        for (p, t) in iproduct!(0..P, 0..T) {
            let lhs = (0..I).map(|i| Q0[[i, p, t]]).lin_sum();
            model.add_constr(
                &format!("regular_capacity_{p}_{t}"),
                lhs,
                Sense::Le,
                data.regular_capacity(p),
            )?;

            let lhs = (0..I).map(|i| Q1[[i, p, t]]).lin_sum();
            model.add_constr(
                &format!("overtime_capacity_{p}_{t}"),
                lhs,
                Sense::Le,
                data.overtime_capacity(p),
            )?;
        }
        trace!("added {} production capacity constraints", 2 * P * T);

        // stock carried into the period plus everything produced must fit in the warehouse
        for t in 0..T {
            let mut lhs = iproduct!(0..I, 0..P)
                .flat_map(|(i, p)| [Q0[[i, p, t]], Q1[[i, p, t]]])
                .lin_sum();
            if t > 0 {
                lhs = lhs.plus(iproduct!(0..I, 0..S).map(|(i, s)| I0[[i, s, t - 1]]));
            }
            model.add_constr(
                &format!("warehouse_capacity_{t}"),
                lhs,
                Sense::Le,
                data.warehouse_capacity(),
            )?;
        }

        // stock carried into the period plus everything received must fit in the DC
        for (d, t) in iproduct!(0..D, 0..T) {
            let mut lhs = iproduct!(0..I, 0..S)
                .map(|(i, s)| q0[[i, s, d, t]])
                .lin_sum()
                .plus(iproduct!(0..I, 0..S, 0..D).map(|(i, s, e)| q2[[i, s, e, d, t]]));
            if t > 0 {
                lhs = lhs.plus(iproduct!(0..I, 0..S).map(|(i, s)| I1[[i, s, d, t - 1]]));
            }
            model.add_constr(
                &format!("dc_capacity_{d}_{t}"),
                lhs,
                Sense::Le,
                data.dc_capacity(d),
            )?;
        }

        // a DC can only pass on what it received from the warehouse or held from last period
        for (i, s, d, t) in iproduct!(0..I, 0..S, 0..D, 0..T) {
            let mut lhs = (0..D)
                .map(|e| q2[[i, s, d, e, t]])
                .lin_sum()
                .minus([q0[[i, s, d, t]]]);
            if t > 0 {
                lhs = lhs.minus([I1[[i, s, d, t - 1]]]);
            }
            let name = format!("dc_outflow_{}", index_name(sets, &[i, s, d, t]));
            model.add_constr(&name, lhs, Sense::Le, 0.0)?;
        }
        trace!("added {} DC outflow constraints", I * S * D * T);

        Ok(())
    }

    /// every unit of demand is either delivered or backordered
    fn demand_constraints(
        model: &mut M,
        data: &InstanceData,
        sets: &Sets,
        vars: &Variables<M::Var>,
    ) -> Result<()> {
        let (I, S, D, H, T) = (sets.I, sets.S, sets.D, sets.H, sets.T);
        let Variables { q1, B, .. } = vars;

        for (i, s, h, t) in iproduct!(0..I, 0..S, 0..H, 0..T) {
            let lhs = (0..D).map(|d| q1[[i, s, d, h, t]]).lin_sum().plus([B[[i, s, h, t]]]);
            let name = format!("demand_{}", index_name(sets, &[i, s, h, t]));
            model.add_constr(&name, lhs, Sense::Eq, data.demand(i, s, h, t))?;
        }
        trace!("added {} demand constraints", I * S * H * T);

        Ok(())
    }

    /// flow conservation at the warehouse and at every DC
    fn balance_constraints(model: &mut M, sets: &Sets, vars: &Variables<M::Var>) -> Result<()> {
        let (I, S, D, H, T) = (sets.I, sets.S, sets.D, sets.H, sets.T);
        let Variables {
            Q0,
            Q1,
            q0,
            q1,
            q2,
            I0,
            I1,
            ..
        } = vars;

        // production + carried stock = stock + shipments to the DCs
        for (i, s, t) in iproduct!(0..I, 0..S, 0..T) {
            let mut lhs = sets
                .producers_of(s)
                .flat_map(|p| [Q0[[i, p, t]], Q1[[i, p, t]]])
                .lin_sum();
            if t > 0 {
                lhs = lhs.plus([I0[[i, s, t - 1]]]);
            }
            let lhs = lhs
                .minus([I0[[i, s, t]]])
                .minus((0..D).map(|d| q0[[i, s, d, t]]));
            let name = format!("warehouse_balance_{}", index_name(sets, &[i, s, t]));
            model.add_constr(&name, lhs, Sense::Eq, 0.0)?;
        }

        // transfers in - transfers out + received + carried stock = stock + delivered
        for (i, s, d, t) in iproduct!(0..I, 0..S, 0..D, 0..T) {
            let mut lhs = (0..D)
                .map(|e| q2[[i, s, e, d, t]])
                .lin_sum()
                .minus((0..D).map(|e| q2[[i, s, d, e, t]]))
                .plus([q0[[i, s, d, t]]]);
            if t > 0 {
                lhs = lhs.plus([I1[[i, s, d, t - 1]]]);
            }
            let lhs = lhs
                .minus([I1[[i, s, d, t]]])
                .minus((0..H).map(|h| q1[[i, s, d, h, t]]));
            let name = format!("dc_balance_{}", index_name(sets, &[i, s, d, t]));
            model.add_constr(&name, lhs, Sense::Eq, 0.0)?;
        }
        trace!("added {} balance constraints", I * S * T * (D + 1));

        Ok(())
    }

    /// the network holds nothing at the end of the first period
    fn initial_inventory_constraint(
        model: &mut M,
        sets: &Sets,
        vars: &Variables<M::Var>,
    ) -> Result<()> {
        if sets.T == 0 {
            return Ok(());
        }
        let (I, S, D) = (sets.I, sets.S, sets.D);
        let lhs: LinExpr<M::Var> = iproduct!(0..I, 0..S)
            .map(|(i, s)| vars.I0[[i, s, 0]])
            .lin_sum()
            .plus(iproduct!(0..I, 0..S, 0..D).map(|(i, s, d)| vars.I1[[i, s, d, 0]]));
        model.add_constr("initial_inventory", lhs, Sense::Eq, 0.0)
    }

    /// Optimize the model and read back the plan
    pub fn solve(&mut self) -> Result<PlanningResult> {
        self.model.optimize()?;
        info!("Solved planning model");
        self.result()
    }

    /// The solved values of every variable family
    pub fn result(&self) -> Result<PlanningResult> {
        let model = &self.model;
        let vars = &self.vars;
        let result = PlanningResult {
            Q0: vars.Q0.convert(model)?,
            Q1: vars.Q1.convert(model)?,
            q0: vars.q0.convert(model)?,
            q1: vars.q1.convert(model)?,
            q2: vars.q2.convert(model)?,
            I0: vars.I0.convert(model)?,
            I1: vars.I1.convert(model)?,
            B: vars.B.convert(model)?,
            cost: 0.0,
        };
        let cost = result.cost_of(&self.parameters);
        Ok(PlanningResult { cost, ..result })
    }

    /// The solved values of one variable family, with the variable names
    pub fn named_values(&self, family: Family) -> Result<Vec<(String, f64)>> {
        self.vars
            .family(family)
            .map(|v| Ok((self.model.name(v)?, self.model.value(v)?)))
            .collect()
    }

    /// The solved values of all backorder variables
    pub fn backorder_values(&self) -> Result<Vec<f64>> {
        self.vars
            .family(Family::Backorder)
            .map(|v| self.model.value(v))
            .collect()
    }
}

/// Writes an `[i, s, ..]` index as `i_s_..`, leaving out the source when the model is pooled
fn index_name(sets: &Sets, index: &[usize]) -> String {
    match sets.attribution {
        Attribution::Pooled => index
            .iter()
            .enumerate()
            .filter(|&(axis, _)| axis != 1)
            .map(|(_, x)| x)
            .join("_"),
        Attribution::PerProducer => index.iter().join("_"),
    }
}

/// Names a downstream variable like the constraints over the same index
fn var_name<'a>(sets: &'a Sets, base: &'a str) -> impl FnMut(&[usize]) -> String + 'a {
    move |index| format!("{}_{}", base, index_name(sets, index))
}
