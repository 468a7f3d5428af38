use derive_more::Display;
use ndarray::{Array1, Array3, Array4, Array5, ArrayD, Axis, Dimension, IxDyn};
use serde::{Deserialize, Serialize};

/// The type used for quantities of product
pub type Quantity = f64;
/// The type used for cost
pub type Cost = f64;

pub type ProductIndex = usize;
pub type ProducerIndex = usize;
/// Index of the producer dimension carried by downstream flows and inventories.
/// Always 0 for a pooled instance, equal to the producer index for a producer-attributed one.
pub type SourceIndex = usize;
pub type DcIndex = usize;
pub type CustomerIndex = usize;
pub type TimeIndex = usize;

/// Whether downstream flows, inventories and backorders remember which producer made the product
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribution {
    /// Every producer feeds one shared warehouse stock
    #[display(fmt = "pooled")]
    Pooled,
    /// Every table downstream of production carries a producer axis
    #[display(fmt = "per_producer")]
    PerProducer,
}

#[derive(Debug, Display, Clone, PartialEq)]
pub enum ConfigurationError {
    /// A table has the wrong number of axes
    #[display(fmt = "table `{}` has {} axes, expected {}", table, actual, expected)]
    Rank {
        table: &'static str,
        expected: usize,
        actual: usize,
    },
    /// A table disagrees with the derived dimension sizes
    #[display(fmt = "table `{}` has shape {:?}, expected {:?}", table, actual, expected)]
    Shape {
        table: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[display(fmt = "table `{}` has negative entry at {:?}", table, index)]
    Negative {
        table: &'static str,
        index: Vec<usize>,
    },
    #[display(fmt = "table `{}` has non-finite entry at {:?}", table, index)]
    NotFinite {
        table: &'static str,
        index: Vec<usize>,
    },
    /// Transport cost from a DC to itself must be zero
    #[display(fmt = "non-zero self-transfer cost at {:?}", index)]
    SelfTransferCost { index: Vec<usize> },
    /// Nested lists of unequal length
    #[display(fmt = "ragged table: {}", _0)]
    Ragged(String),
    #[display(fmt = "invalid ratio {}", _0)]
    InvalidRatio(f64),
}

impl std::error::Error for ConfigurationError {}

/// JSON representation of a table: a number or an arbitrarily nested list of numbers
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Nested {
    Scalar(f64),
    List(Vec<Nested>),
}

impl Nested {
    fn shape(&self) -> Vec<usize> {
        let mut shape = Vec::new();
        let mut current = self;
        while let Nested::List(items) = current {
            shape.push(items.len());
            match items.first() {
                Some(first) => current = first,
                None => break,
            }
        }
        shape
    }

    fn flatten_into(&self, shape: &[usize], out: &mut Vec<f64>) -> Result<(), String> {
        match (self, shape.split_first()) {
            (Nested::Scalar(x), None) => {
                out.push(*x);
                Ok(())
            }
            (Nested::List(items), Some((&len, rest))) if items.len() == len => items
                .iter()
                .try_for_each(|item| item.flatten_into(rest, out)),
            (Nested::List(items), Some((&len, _))) => Err(format!(
                "list of length {} where {} was expected",
                items.len(),
                len
            )),
            (Nested::Scalar(_), Some(_)) => Err("number where a list was expected".to_string()),
            (Nested::List(_), None) => Err("list where a number was expected".to_string()),
        }
    }
}

/// A dense table of non-negative reals, deserialized from nested JSON lists
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "Nested")]
pub struct Table(ArrayD<f64>);

impl TryFrom<Nested> for Table {
    type Error = ConfigurationError;

    fn try_from(nested: Nested) -> Result<Self, Self::Error> {
        let shape = nested.shape();
        let mut data = Vec::with_capacity(shape.iter().product());
        nested
            .flatten_into(&shape, &mut data)
            .map_err(ConfigurationError::Ragged)?;
        ArrayD::from_shape_vec(IxDyn(&shape), data)
            .map(Table)
            .map_err(|e| ConfigurationError::Ragged(e.to_string()))
    }
}

impl<D: Dimension> From<ndarray::Array<f64, D>> for Table {
    fn from(array: ndarray::Array<f64, D>) -> Self {
        Table(array.into_dyn())
    }
}

impl Table {
    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    /// Check the table against an expected shape and convert it to a fixed rank.
    ///
    /// An empty table written as nested lists stops at its first empty axis (`[[], []]` has shape
    /// `[2, 0]`), so an empty table whose shape is a prefix of `expected` is accepted as well.
    fn conform<D: Dimension>(
        self,
        table: &'static str,
        expected: &[usize],
    ) -> Result<ndarray::Array<f64, D>, ConfigurationError> {
        let actual = self.0.shape().to_vec();
        let array = if actual == expected {
            self.0
        } else if self.0.is_empty()
            && expected.iter().product::<usize>() == 0
            && expected.starts_with(&actual)
        {
            ArrayD::zeros(IxDyn(expected))
        } else if actual.len() != expected.len() && !self.0.is_empty() {
            return Err(ConfigurationError::Rank {
                table,
                expected: expected.len(),
                actual: actual.len(),
            });
        } else {
            return Err(ConfigurationError::Shape {
                table,
                expected: expected.to_vec(),
                actual,
            });
        };

        for (index, &x) in array.indexed_iter() {
            if !x.is_finite() {
                return Err(ConfigurationError::NotFinite {
                    table,
                    index: index.slice().to_vec(),
                });
            }
            if x < 0.0 {
                return Err(ConfigurationError::Negative {
                    table,
                    index: index.slice().to_vec(),
                });
            }
        }

        array
            .into_dimensionality::<D>()
            .map_err(|_| ConfigurationError::Rank {
                table,
                expected: D::NDIM.unwrap_or(0),
                actual: expected.len(),
            })
    }
}

/// The parameter tables of one planning instance, exactly as supplied.
///
/// Downstream tables (holding, DC transport, backorder cost and demand) carry a producer axis
/// right after the product axis if and only if `attribution` is `PerProducer`.
#[derive(Debug, Clone, Deserialize)]
pub struct Tables {
    pub attribution: Attribution,
    /// v[i, p, t]
    pub production_cost: Table,
    /// v1[i, p, t]
    pub overtime_cost: Table,
    /// h0[i, (p), t]
    pub warehouse_holding_cost: Table,
    /// h1[i, (p), d, t]
    pub dc_holding_cost: Table,
    /// e0[i, p, t], producer to warehouse
    pub inbound_transport_cost: Table,
    /// e1[i, (p), d, h, t], DC to customer
    pub customer_transport_cost: Table,
    /// e2[i, (p), d, d', t], DC to DC
    pub lateral_transport_cost: Table,
    /// e3[i, (p), d, t], warehouse to DC
    pub outbound_transport_cost: Table,
    /// b[i, (p), h, t]
    pub backorder_cost: Table,
    /// l[i, (p), h, t]
    pub demand: Table,
    /// k[p]
    pub regular_capacity: Table,
    /// k1[p]
    pub overtime_capacity: Table,
    /// f0
    pub warehouse_capacity: f64,
    /// f1[d]
    pub dc_capacity: Table,
}

/// Shape-validated, immutable instance data.
///
/// Downstream tables are stored with a source axis in every variant: for a pooled instance that
/// axis has length 1, so one index space `(i, s, ..)` covers both variants.
#[derive(Debug, Clone)]
pub struct InstanceData {
    attribution: Attribution,
    production_cost: Array3<Cost>,
    overtime_cost: Array3<Cost>,
    warehouse_holding_cost: Array3<Cost>,
    dc_holding_cost: Array4<Cost>,
    inbound_transport_cost: Array3<Cost>,
    customer_transport_cost: Array5<Cost>,
    lateral_transport_cost: Array5<Cost>,
    outbound_transport_cost: Array4<Cost>,
    backorder_cost: Array4<Cost>,
    demand: Array4<Quantity>,
    regular_capacity: Array1<Quantity>,
    overtime_capacity: Array1<Quantity>,
    warehouse_capacity: Quantity,
    dc_capacity: Array1<Quantity>,
}

impl TryFrom<Tables> for InstanceData {
    type Error = ConfigurationError;

    fn try_from(tables: Tables) -> Result<Self, Self::Error> {
        InstanceData::new(tables)
    }
}

#[allow(non_snake_case)]
impl InstanceData {
    pub fn new(tables: Tables) -> Result<InstanceData, ConfigurationError> {
        let attribution = tables.attribution;

        let v_shape = tables.production_cost.shape().to_vec();
        if v_shape.len() != 3 {
            return Err(ConfigurationError::Rank {
                table: "production_cost",
                expected: 3,
                actual: v_shape.len(),
            });
        }
        let (I, P, T) = (v_shape[0], v_shape[1], v_shape[2]);
        let D = match tables.dc_capacity.shape() {
            [d] => *d,
            other => {
                return Err(ConfigurationError::Rank {
                    table: "dc_capacity",
                    expected: 1,
                    actual: other.len(),
                })
            }
        };
        // demand is [I, H, T] or [I, P, H, T]; a missing axis means it is empty
        let h_axis = match attribution {
            Attribution::Pooled => 1,
            Attribution::PerProducer => 2,
        };
        let H = tables.demand.shape().get(h_axis).copied().unwrap_or(0);

        // shape of a downstream table: the producer axis is only present when attributed
        let down = |rest: &[usize]| -> Vec<usize> {
            let mut shape = vec![I];
            if attribution == Attribution::PerProducer {
                shape.push(P);
            }
            shape.extend_from_slice(rest);
            shape
        };
        // normalize a downstream table to carry the source axis
        fn lift<E: Dimension>(
            attribution: Attribution,
            table: Table,
            name: &'static str,
            expected: &[usize],
        ) -> Result<ndarray::Array<f64, E>, ConfigurationError> {
            let array: ArrayD<f64> = table.conform(name, expected)?;
            let array = match attribution {
                Attribution::Pooled => array.insert_axis(Axis(1)),
                Attribution::PerProducer => array,
            };
            array
                .into_dimensionality::<E>()
                .map_err(|_| ConfigurationError::Rank {
                    table: name,
                    expected: E::NDIM.unwrap_or(0),
                    actual: expected.len(),
                })
        }

        let lateral_transport_cost: Array5<Cost> = lift(
            attribution,
            tables.lateral_transport_cost,
            "lateral_transport_cost",
            &down(&[D, D, T]),
        )?;
        for ((i, s, d, e, t), &cost) in lateral_transport_cost.indexed_iter() {
            if d == e && cost != 0.0 {
                let index = match attribution {
                    Attribution::Pooled => vec![i, d, e, t],
                    Attribution::PerProducer => vec![i, s, d, e, t],
                };
                return Err(ConfigurationError::SelfTransferCost { index });
            }
        }

        Ok(InstanceData {
            attribution,
            production_cost: tables
                .production_cost
                .conform("production_cost", &[I, P, T])?,
            overtime_cost: tables.overtime_cost.conform("overtime_cost", &[I, P, T])?,
            warehouse_holding_cost: lift(
                attribution,
                tables.warehouse_holding_cost,
                "warehouse_holding_cost",
                &down(&[T]),
            )?,
            dc_holding_cost: lift(
                attribution,
                tables.dc_holding_cost,
                "dc_holding_cost",
                &down(&[D, T]),
            )?,
            inbound_transport_cost: tables
                .inbound_transport_cost
                .conform("inbound_transport_cost", &[I, P, T])?,
            customer_transport_cost: lift(
                attribution,
                tables.customer_transport_cost,
                "customer_transport_cost",
                &down(&[D, H, T]),
            )?,
            lateral_transport_cost,
            outbound_transport_cost: lift(
                attribution,
                tables.outbound_transport_cost,
                "outbound_transport_cost",
                &down(&[D, T]),
            )?,
            backorder_cost: lift(
                attribution,
                tables.backorder_cost,
                "backorder_cost",
                &down(&[H, T]),
            )?,
            demand: lift(attribution, tables.demand, "demand", &down(&[H, T]))?,
            regular_capacity: tables.regular_capacity.conform("regular_capacity", &[P])?,
            overtime_capacity: tables.overtime_capacity.conform("overtime_capacity", &[P])?,
            warehouse_capacity: Table::from(ndarray::arr0(tables.warehouse_capacity))
                .conform::<ndarray::Ix0>("warehouse_capacity", &[])?[()],
            dc_capacity: tables.dc_capacity.conform("dc_capacity", &[D])?,
        })
    }

    pub fn attribution(&self) -> Attribution {
        self.attribution
    }

    /// The number of products
    pub fn products(&self) -> usize {
        self.production_cost.shape()[0]
    }

    /// The number of producers
    pub fn producers(&self) -> usize {
        self.production_cost.shape()[1]
    }

    /// The length of the source axis: 1 when pooled, the number of producers when attributed
    pub fn sources(&self) -> usize {
        self.demand.shape()[1]
    }

    /// The number of distribution centers
    pub fn dcs(&self) -> usize {
        self.dc_capacity.len()
    }

    /// The number of customers
    pub fn customers(&self) -> usize {
        self.demand.shape()[2]
    }

    /// The number of periods in the planning horizon
    pub fn periods(&self) -> usize {
        self.production_cost.shape()[2]
    }

    /// The source whose stock producer `p` feeds
    pub fn source_of(&self, p: ProducerIndex) -> SourceIndex {
        match self.attribution {
            Attribution::Pooled => 0,
            Attribution::PerProducer => p,
        }
    }

    pub fn production_cost(&self, i: ProductIndex, p: ProducerIndex, t: TimeIndex) -> Cost {
        self.production_cost[[i, p, t]]
    }

    pub fn overtime_cost(&self, i: ProductIndex, p: ProducerIndex, t: TimeIndex) -> Cost {
        self.overtime_cost[[i, p, t]]
    }

    pub fn inbound_transport_cost(&self, i: ProductIndex, p: ProducerIndex, t: TimeIndex) -> Cost {
        self.inbound_transport_cost[[i, p, t]]
    }

    pub fn warehouse_holding_cost(&self) -> &Array3<Cost> {
        &self.warehouse_holding_cost
    }

    pub fn dc_holding_cost(&self) -> &Array4<Cost> {
        &self.dc_holding_cost
    }

    pub fn customer_transport_cost(&self) -> &Array5<Cost> {
        &self.customer_transport_cost
    }

    pub fn lateral_transport_cost(&self) -> &Array5<Cost> {
        &self.lateral_transport_cost
    }

    pub fn outbound_transport_cost(&self) -> &Array4<Cost> {
        &self.outbound_transport_cost
    }

    pub fn backorder_cost(&self) -> &Array4<Cost> {
        &self.backorder_cost
    }

    /// l[i, s, h, t]
    pub fn demand(&self, i: ProductIndex, s: SourceIndex, h: CustomerIndex, t: TimeIndex) -> Quantity {
        self.demand[[i, s, h, t]]
    }

    pub fn regular_capacity(&self, p: ProducerIndex) -> Quantity {
        self.regular_capacity[p]
    }

    pub fn overtime_capacity(&self, p: ProducerIndex) -> Quantity {
        self.overtime_capacity[p]
    }

    pub fn warehouse_capacity(&self) -> Quantity {
        self.warehouse_capacity
    }

    pub fn dc_capacity(&self, d: DcIndex) -> Quantity {
        self.dc_capacity[d]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, Array};

    fn pooled(i: usize, p: usize, d: usize, h: usize, t: usize) -> Tables {
        Tables {
            attribution: Attribution::Pooled,
            production_cost: Array::from_elem((i, p, t), 5.0).into(),
            overtime_cost: Array::from_elem((i, p, t), 8.0).into(),
            warehouse_holding_cost: Array::from_elem((i, t), 1.0).into(),
            dc_holding_cost: Array::from_elem((i, d, t), 1.0).into(),
            inbound_transport_cost: Array::from_elem((i, p, t), 1.0).into(),
            customer_transport_cost: Array::from_elem((i, d, h, t), 1.0).into(),
            lateral_transport_cost: Array::<f64, _>::zeros((i, d, d, t)).into(),
            outbound_transport_cost: Array::from_elem((i, d, t), 1.0).into(),
            backorder_cost: Array::from_elem((i, h, t), 100.0).into(),
            demand: Array::from_elem((i, h, t), 10.0).into(),
            regular_capacity: arr1(&vec![100.0; p]).into(),
            overtime_capacity: arr1(&vec![50.0; p]).into(),
            warehouse_capacity: 1000.0,
            dc_capacity: arr1(&vec![500.0; d]).into(),
        }
    }

    #[test]
    fn derives_dimensions_and_adds_source_axis() {
        let data = InstanceData::new(pooled(2, 3, 4, 5, 6)).unwrap();
        assert_eq!(
            (
                data.products(),
                data.producers(),
                data.sources(),
                data.dcs(),
                data.customers(),
                data.periods()
            ),
            (2, 3, 1, 4, 5, 6)
        );
        assert_eq!(data.customer_transport_cost().shape(), &[2, 1, 4, 5, 6]);
        assert!((0..3).all(|p| data.source_of(p) == 0));
    }

    #[test]
    fn rejects_mismatched_shapes() {
        let mut tables = pooled(2, 2, 2, 2, 2);
        tables.demand = Array::from_elem((2, 2, 3), 1.0).into();
        let err = InstanceData::new(tables).unwrap_err();
        assert!(matches!(err, ConfigurationError::Shape { table, .. } if table == "backorder_cost" || table == "demand"));

        let mut tables = pooled(2, 2, 2, 2, 2);
        tables.dc_holding_cost = Array::from_elem((2, 2, 2, 2), 1.0).into();
        assert_eq!(
            InstanceData::new(tables).unwrap_err(),
            ConfigurationError::Rank {
                table: "dc_holding_cost",
                expected: 3,
                actual: 4
            }
        );
    }

    #[test]
    fn rejects_negative_and_self_transfer_costs() {
        let mut tables = pooled(1, 1, 2, 1, 1);
        tables.overtime_cost = Array::from_elem((1, 1, 1), -1.0).into();
        assert!(matches!(
            InstanceData::new(tables).unwrap_err(),
            ConfigurationError::Negative { table: "overtime_cost", .. }
        ));

        let mut tables = pooled(1, 1, 2, 1, 1);
        let mut e2 = Array::<f64, _>::zeros((1, 2, 2, 1));
        e2[[0, 1, 1, 0]] = 3.0;
        tables.lateral_transport_cost = e2.into();
        assert_eq!(
            InstanceData::new(tables).unwrap_err(),
            ConfigurationError::SelfTransferCost {
                index: vec![0, 1, 1, 0]
            }
        );
    }

    #[test]
    fn parses_nested_json() {
        let table: Table = serde_json::from_str("[[1, 2], [3, 4], [5, 6]]").unwrap();
        assert_eq!(table.shape(), &[3, 2]);

        let ragged = serde_json::from_str::<Table>("[[1, 2], [3]]");
        assert!(ragged.is_err());
    }

    #[test]
    fn accepts_empty_nested_tables() {
        let mut tables = pooled(1, 1, 1, 0, 2);
        tables.demand = serde_json::from_str("[[]]").unwrap();
        tables.backorder_cost = serde_json::from_str("[[]]").unwrap();
        tables.customer_transport_cost = serde_json::from_str("[[[]]]").unwrap();
        let data = InstanceData::new(tables).unwrap();
        assert_eq!(data.customers(), 0);
        assert_eq!(data.periods(), 2);
    }

    #[test]
    fn attributed_tables_keep_producer_axis() {
        let (i, p, d, h, t) = (1, 2, 1, 1, 2);
        let tables = Tables {
            attribution: Attribution::PerProducer,
            production_cost: Array::from_elem((i, p, t), 5.0).into(),
            overtime_cost: Array::from_elem((i, p, t), 8.0).into(),
            warehouse_holding_cost: Array::from_elem((i, p, t), 1.0).into(),
            dc_holding_cost: Array::from_elem((i, p, d, t), 1.0).into(),
            inbound_transport_cost: Array::from_elem((i, p, t), 1.0).into(),
            customer_transport_cost: Array::from_elem((i, p, d, h, t), 1.0).into(),
            lateral_transport_cost: Array::<f64, _>::zeros((i, p, d, d, t)).into(),
            outbound_transport_cost: Array::from_elem((i, p, d, t), 1.0).into(),
            backorder_cost: Array::from_elem((i, p, h, t), 100.0).into(),
            demand: Array::from_elem((i, p, h, t), 10.0).into(),
            regular_capacity: arr1(&[100.0, 100.0]).into(),
            overtime_capacity: arr1(&[50.0, 50.0]).into(),
            warehouse_capacity: 1000.0,
            dc_capacity: arr1(&[500.0]).into(),
        };
        let data = InstanceData::new(tables).unwrap();
        assert_eq!(data.sources(), 2);
        assert_eq!((data.source_of(0), data.source_of(1)), (0, 1));
        assert_eq!(data.demand(0, 1, 0, 1), 10.0);
    }
}
