//! Contains the propagators of the crate.
//!
//! See [`crate::Propagator`] for how propagators interact with the [`crate::Solver`].
pub mod min_cost_flow;
