//! A small finite-domain propagation engine: integer variables with interval-list domains, a
//! trail of domain changes per decision level, and propagators which are notified of changes.
mod assignments;
mod domain_events;
mod domain_id;
mod interval_domain;
mod propagation;
mod propagator_queue;
mod solver;
mod watch_list;

pub use assignments::Assignments;
pub use domain_events::*;
pub use domain_id::*;
pub use interval_domain::*;
pub use propagation::*;
pub use solver::*;
