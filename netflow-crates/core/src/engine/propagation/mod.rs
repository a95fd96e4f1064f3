//! Contains the building blocks for propagators.
//!
//! A propagator is given the current domains of its variables and removes values which cannot
//! be part of any solution. A propagator is created by a [`PropagatorConstructor`], which
//! registers it for the domain events it wants to be notified about; the [`Propagator`] itself
//! then reacts to those events, to backtracking and to being scheduled for propagation.
mod constructor;
mod contexts;
mod local_id;
mod propagator;
mod propagator_id;

pub use constructor::*;
pub use contexts::*;
pub use local_id::*;
pub use propagator::*;
pub use propagator_id::*;
