//! Resolution planner: decides which database objects need
//! refreshing given prior snapshot state and configured filters.

pub mod exec_graph;
pub mod plan;
pub mod wildcard;

pub use exec_graph::CallerGraph;
pub use plan::{build_plan, LiveProcedure, PlanInputs};
