use crate::config::{BackorderPricing, InitialInventory, ModelOptions};
use crate::problem::{
    Attribution, Cost, InstanceData, ProducerIndex, ProductIndex, SourceIndex, TimeIndex,
};
use ndarray::{Array3, Array4, Array5};
use log::trace;

/// sets for the planning model
#[derive(Debug, Clone)]
#[allow(non_snake_case)]
pub struct Sets {
    /// Number of products
    pub I: usize,
    /// Number of producers
    pub P: usize,
    /// Length of the source axis of downstream flows (1 when pooled)
    pub S: usize,
    /// Number of distribution centers
    pub D: usize,
    /// Number of customers
    pub H: usize,
    /// Number of periods
    pub T: usize,
    /// The source fed by each producer
    pub source_of: Vec<SourceIndex>,
    pub attribution: Attribution,
}

impl Sets {
    pub fn new(data: &InstanceData) -> Sets {
        Sets {
            I: data.products(),
            P: data.producers(),
            S: data.sources(),
            D: data.dcs(),
            H: data.customers(),
            T: data.periods(),
            source_of: (0..data.producers()).map(|p| data.source_of(p)).collect(),
            attribution: data.attribution(),
        }
    }

    /// The producers feeding source `s`
    pub fn producers_of(&self, s: SourceIndex) -> impl Iterator<Item = ProducerIndex> + '_ {
        self.source_of
            .iter()
            .enumerate()
            .filter(move |(_, &source)| source == s)
            .map(|(p, _)| p)
    }

    /// The producer whose production cost prices backorders of source `s`
    pub fn representative(&self, s: SourceIndex) -> Option<ProducerIndex> {
        self.producers_of(s).next()
    }
}

/// objective coefficients and right hand sides of the planning model
#[allow(non_snake_case)]
#[derive(Debug, Clone)]
pub struct Parameters {
    /// cost of regular production Q0[i, p, t]: transport to the warehouse + production cost
    pub c_Q0: Array3<Cost>,
    /// cost of overtime production Q1[i, p, t]: transport to the warehouse + overtime cost
    pub c_Q1: Array3<Cost>,
    /// cost of shipping q0[i, s, d, t] from the warehouse to DC d
    pub c_q0: Array4<Cost>,
    /// cost of shipping q1[i, s, d, h, t] from DC d to customer h
    pub c_q1: Array5<Cost>,
    /// cost of a lateral transfer q2[i, s, d, d', t]
    pub c_q2: Array5<Cost>,
    /// holding cost of warehouse inventory I0[i, s, t]
    pub c_I0: Array3<Cost>,
    /// holding cost of DC inventory I1[i, s, d, t]
    pub c_I1: Array4<Cost>,
    /// cost of a unit of backorder B[i, s, h, t]
    pub c_B: Array4<Cost>,
    pub initial_inventory: InitialInventory,
}

#[allow(non_snake_case)]
impl Parameters {
    pub fn new(data: &InstanceData, sets: &Sets, options: &ModelOptions, ratio: f64) -> Parameters {
        let (I, P, T) = (sets.I, sets.P, sets.T);

        let c_Q0 = Array3::from_shape_fn((I, P, T), |(i, p, t)| {
            data.inbound_transport_cost(i, p, t) + data.production_cost(i, p, t)
        });
        let c_Q1 = Array3::from_shape_fn((I, P, T), |(i, p, t)| {
            data.inbound_transport_cost(i, p, t) + data.overtime_cost(i, p, t)
        });

        let c_B = match options.pricing {
            BackorderPricing::Tabulated => data.backorder_cost().clone(),
            BackorderPricing::ProductionRatio => {
                trace!("pricing backorders at {} x production cost", ratio);
                Array4::from_shape_fn(data.backorder_cost().raw_dim(), |(i, s, _, t)| {
                    Self::ratio_cost(data, sets, ratio, i, s, t)
                })
            }
        };

        Parameters {
            c_Q0,
            c_Q1,
            c_q0: data.outbound_transport_cost().clone(),
            c_q1: data.customer_transport_cost().clone(),
            c_q2: data.lateral_transport_cost().clone(),
            c_I0: data.warehouse_holding_cost().clone(),
            c_I1: data.dc_holding_cost().clone(),
            c_B,
            initial_inventory: options.initial_inventory(sets.attribution),
        }
    }

    fn ratio_cost(
        data: &InstanceData,
        sets: &Sets,
        ratio: f64,
        i: ProductIndex,
        s: SourceIndex,
        t: TimeIndex,
    ) -> Cost {
        sets.representative(s)
            .map(|p| ratio * data.production_cost(i, p, t))
            .unwrap_or(0.0)
    }
}
