//! The min-cost-flow constraint: a flow network whose arcs are bound to integer variables.
//!
//! An arc can be bound to a flow variable, which gives the bounds of the flow over it, and to a
//! cost variable, which gives its unit cost. A structure variable selects among a set of arcs:
//! each arc comes with a sub-domain of the variable, and the arc carries its largest flow when
//! the variable takes a value in that sub-domain and its smallest flow otherwise.
//!
//! The [`Network`] keeps an optimal flow for the current domains and undoes its changes on
//! backtracking. The [`MinCostFlowPropagator`] raises the cost variable to the optimum and
//! tightens the other variables with what the optimal flow shows about them. Networks are
//! described with a [`NetworkBuilder`].
mod arc_companion;
mod builder;
mod context;
mod handler;
mod network;
mod options;
mod propagator;
mod pruning;
mod structure;
#[cfg(test)]
pub(crate) mod test_helper;

pub use arc_companion::ArcCompanion;
pub use arc_companion::CompanionId;
pub use builder::*;
pub use network::Network;
pub use options::*;
pub use propagator::*;
pub use structure::StructureBinding;
pub use structure::StructureId;
