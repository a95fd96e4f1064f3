use downcast_rs::impl_downcast;
use downcast_rs::Downcast;
use enumset::EnumSet;

use super::Domains;
use super::LocalId;
use super::PropagationContextMut;
use crate::basic_types::PropagationStatus;
#[cfg(doc)]
use crate::create_statistics_struct;
use crate::engine::IntDomainEvent;
#[cfg(doc)]
use crate::engine::PropagatorConstructor;
#[cfg(doc)]
use crate::engine::PropagatorConstructorContext;
use crate::statistics::StatisticLogger;

// Allows going from `Box<dyn Propagator>` back to the concrete propagator, e.g. to inspect the
// flow network in tests.
impl_downcast!(Propagator);

/// A propagator removes values from domains which will never be in any solution, or reports an
/// [`Inconsistency`](crate::Inconsistency).
///
/// Only [`Propagator::name`] and [`Propagator::propagate`] are required; the remaining hooks let a
/// propagator react to individual domain events and to backtracking.
pub trait Propagator: Downcast {
    /// Return the name of the propagator, used for printing and statistics.
    fn name(&self) -> &str;

    /// Removes values which cannot be part of any solution given the current domains, or
    /// returns an error when the current domains admit no solution at all.
    ///
    /// Propagators are not required to reach a fixpoint. The solver calls the propagator again
    /// whenever one of its registered variables changes because of another propagator or a
    /// decision; it is *not* notified of the changes it made itself.
    fn propagate(&mut self, context: PropagationContextMut) -> PropagationStatus;

    /// Called for every change to a registered variable (as registered during creation with
    /// [`PropagatorConstructor`] using [`PropagatorConstructorContext::register`]).
    ///
    /// This should only contain cheap bookkeeping; by default the propagator is always enqueued.
    fn notify(
        &mut self,
        _domains: Domains,
        _local_id: LocalId,
        _events: EnumSet<IntDomainEvent>,
    ) -> EnqueueDecision {
        EnqueueDecision::Enqueue
    }

    /// Called after backtracking, once the domains have been restored to those of the new
    /// decision level.
    ///
    /// By default this function does nothing.
    fn synchronise(&mut self, _domains: Domains) {}

    /// Logs statistics of the propagator using the provided [`StatisticLogger`].
    ///
    /// It is recommended to create a struct through the [`create_statistics_struct!`] macro!
    fn log_statistics(&self, _statistic_logger: StatisticLogger) {}
}

/// Indicator of what to do when a propagator is notified.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnqueueDecision {
    /// The propagator should be enqueued.
    Enqueue,
    /// The propagator should not be enqueued.
    Skip,
}
