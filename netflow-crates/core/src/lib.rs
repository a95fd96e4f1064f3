//! A min-cost-flow global constraint for finite-domain integer variables.
//!
//! The constraint states that a flow exists in a network whose arc bounds, unit costs and arc
//! selections are given by integer variables, and that its cost is at most a cost variable. It
//! is maintained incrementally: the flow engine in [`flow`] keeps an optimal flow which is
//! repaired after every change of the variables, and the propagator in
//! [`propagators::min_cost_flow`] tightens the domains based on it.
//!
//! The crate comes with a small propagation engine, the [`Solver`], which manages the domains
//! of the variables, decision levels and the propagation loop.
pub(crate) mod basic_types;
pub mod containers;
pub(crate) mod engine;
pub mod flow;
pub mod propagators;
pub mod statistics;

#[doc(hidden)]
pub mod asserts;

pub use crate::basic_types::EmptyDomain;
pub use crate::basic_types::Inconsistency;
pub use crate::basic_types::PropagationStatus;
pub use crate::engine::Domains;
pub use crate::engine::DomainEvents;
pub use crate::engine::DomainId;
pub use crate::engine::EnqueueDecision;
pub use crate::engine::IntDomainEvent;
pub use crate::engine::IntervalDomain;
pub use crate::engine::LocalId;
pub use crate::engine::PropagationContextMut;
pub use crate::engine::Propagator;
pub use crate::engine::PropagatorConstructor;
pub use crate::engine::PropagatorConstructorContext;
pub use crate::engine::PropagatorHandle;
pub use crate::engine::ReadDomains;
pub use crate::engine::Solver;
