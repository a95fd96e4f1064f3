use super::Domains;
use super::LocalId;
use super::Propagator;
use super::PropagatorId;
use crate::engine::watch_list::WatchList;
use crate::engine::Assignments;
use crate::engine::DomainEvents;
use crate::engine::DomainId;
#[cfg(doc)]
use crate::Solver;

/// A propagator constructor creates a fully initialized instance of a [`Propagator`].
///
/// The constructor is responsible for indicating on which events the propagator should be
/// notified, and may read the current domains to set up the propagator's state.
pub trait PropagatorConstructor {
    /// The propagator that is produced by this constructor.
    type PropagatorImpl: Propagator;

    /// Create the propagator instance from `Self`.
    fn create(self, context: PropagatorConstructorContext) -> Self::PropagatorImpl;
}

/// The communication point between the [`Solver`] and a [`Propagator`] that is being created.
#[derive(Debug)]
pub struct PropagatorConstructorContext<'a> {
    watch_list: &'a mut WatchList,
    assignments: &'a Assignments,
    pub(crate) propagator_id: PropagatorId,
}

impl<'a> PropagatorConstructorContext<'a> {
    pub(crate) fn new(
        watch_list: &'a mut WatchList,
        assignments: &'a Assignments,
        propagator_id: PropagatorId,
    ) -> Self {
        PropagatorConstructorContext {
            watch_list,
            assignments,
            propagator_id,
        }
    }

    /// Get domain information.
    pub fn domains(&self) -> Domains<'_> {
        Domains::new(self.assignments)
    }

    /// Subscribes the propagator to the given [`DomainEvents`] of `var`.
    ///
    /// The [`LocalId`] is handed back in [`Propagator::notify`] to identify the variable. A
    /// variable registered twice with different local ids is notified once per registration.
    pub fn register(&mut self, var: DomainId, domain_events: DomainEvents, local_id: LocalId) {
        self.watch_list
            .watch(var, self.propagator_id, local_id, domain_events);
    }
}
