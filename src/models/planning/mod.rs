//! The multi-period production-distribution-inventory planning model.
//!
//! Producers feed a central warehouse, the warehouse and lateral transfers feed the
//! distribution centers, and the distribution centers serve customer demand. Demand that is
//! not delivered in its period becomes a costed backorder.

pub mod model;
pub mod result;
pub mod sets_and_parameters;

pub use model::{Family, PlanningModel, Variables};
pub use result::{average_backorder, DegenerateResult, PlanningResult};
pub use sets_and_parameters::{Parameters, Sets};
