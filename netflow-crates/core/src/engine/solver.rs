use std::marker::PhantomData;

use super::propagator_queue::PropagatorQueue;
use super::watch_list::WatchList;
use super::Assignments;
use super::DomainId;
use super::Domains;
use super::EnqueueDecision;
use super::IntervalDomain;
use super::PropagationContextMut;
use super::Propagator;
use super::PropagatorConstructor;
use super::PropagatorConstructorContext;
use super::PropagatorId;
use crate::basic_types::EmptyDomain;
use crate::basic_types::Inconsistency;
use crate::basic_types::PropagationStatus;
use crate::containers::KeyedVec;
use crate::create_statistics_struct;
use crate::netflow_assert_simple;
use crate::statistics::log_statistic_postfix;
use crate::statistics::should_log_statistics;
use crate::statistics::Statistic;
use crate::statistics::StatisticLogger;

create_statistics_struct!(
    /// Counters of the propagation engine.
    SolverStatistics {
        num_propagator_calls: u64,
        num_conflicts: u64,
        num_backtracks: u64,
        num_decision_levels: u64,
    }
);

/// A typed handle to a propagator that was added to a [`Solver`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct PropagatorHandle<P> {
    id: PropagatorId,
    propagator: PhantomData<P>,
}

impl<P> Clone for PropagatorHandle<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for PropagatorHandle<P> {}

/// A finite-domain propagation engine with decision levels.
///
/// The solver owns the integer variables and the propagators posted over them. Decisions are
/// applied with the `post_*` methods, [`Solver::propagate`] runs all propagators to a fixpoint and
/// [`Solver::backtrack`] restores the state of an earlier decision level. Search itself is left
/// to the user of the solver.
///
/// # Example
/// ```rust
/// # use netflow_core::Solver;
/// let mut solver = Solver::default();
///
/// let x = solver.new_bounded_integer(0, 10);
/// solver.new_decision_level();
/// let _ = solver.post_lower_bound(x, 4);
/// assert_eq!(solver.lower_bound(x), 4);
///
/// solver.backtrack(0);
/// assert_eq!(solver.lower_bound(x), 0);
/// ```
#[derive(Default)]
pub struct Solver {
    assignments: Assignments,
    watch_list: WatchList,
    propagators: KeyedVec<PropagatorId, Box<dyn Propagator>>,
    propagator_queue: PropagatorQueue,
    statistics: SolverStatistics,
}

impl std::fmt::Debug for Solver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Solver")
            .field("assignments", &self.assignments)
            .field(
                "propagators",
                &self.propagators.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("statistics", &self.statistics)
            .finish()
    }
}

/// Methods to create and inspect variables.
impl Solver {
    /// Create a new integer variable with the domain `[lower_bound, upper_bound]`.
    pub fn new_bounded_integer(&mut self, lower_bound: i64, upper_bound: i64) -> DomainId {
        netflow_assert_simple!(lower_bound <= upper_bound);
        self.assignments
            .grow(IntervalDomain::new(lower_bound, upper_bound))
    }

    /// Create a new integer variable which has the given values as its domain.
    pub fn new_sparse_integer(&mut self, values: impl IntoIterator<Item = i64>) -> DomainId {
        self.assignments.grow(IntervalDomain::from_values(values))
    }

    pub fn num_variables(&self) -> usize {
        self.assignments.num_domains()
    }

    pub fn lower_bound(&self, var: DomainId) -> i64 {
        self.assignments.get_lower_bound(var)
    }

    pub fn upper_bound(&self, var: DomainId) -> i64 {
        self.assignments.get_upper_bound(var)
    }

    pub fn domain(&self, var: DomainId) -> &IntervalDomain {
        self.assignments.get_domain(var)
    }

    pub fn is_fixed(&self, var: DomainId) -> bool {
        self.assignments.is_fixed(var)
    }

    pub fn decision_level(&self) -> usize {
        self.assignments.get_decision_level()
    }

    /// A read-only view on all domains.
    pub fn domains(&self) -> Domains<'_> {
        Domains::new(&self.assignments)
    }
}

/// Methods which change the domains of variables.
///
/// A change made through these methods is a decision: it is not propagated until
/// [`Solver::propagate`] is called, and it is undone by backtracking to a lower decision level.
impl Solver {
    pub fn post_lower_bound(&mut self, var: DomainId, value: i64) -> Result<bool, EmptyDomain> {
        self.assignments.tighten_lower_bound(var, value)
    }

    pub fn post_upper_bound(&mut self, var: DomainId, value: i64) -> Result<bool, EmptyDomain> {
        self.assignments.tighten_upper_bound(var, value)
    }

    pub fn post_assignment(&mut self, var: DomainId, value: i64) -> Result<bool, EmptyDomain> {
        self.assignments
            .restrict_to(var, &IntervalDomain::singleton(value))
    }

    pub fn post_not_equal(&mut self, var: DomainId, value: i64) -> Result<bool, EmptyDomain> {
        self.assignments
            .remove_values(var, &IntervalDomain::singleton(value))
    }

    pub fn post_domain(
        &mut self,
        var: DomainId,
        allowed: &IntervalDomain,
    ) -> Result<bool, EmptyDomain> {
        self.assignments.restrict_to(var, allowed)
    }
}

/// Methods for propagation and backtracking.
impl Solver {
    /// Adds a propagator and propagates until a fixpoint is reached.
    ///
    /// The propagator stays in the solver even when this returns an error.
    pub fn add_propagator<Constructor: PropagatorConstructor>(
        &mut self,
        constructor: Constructor,
    ) -> Result<PropagatorHandle<Constructor::PropagatorImpl>, Inconsistency> {
        let propagator_id = self.propagators.next_key();
        let context = PropagatorConstructorContext::new(
            &mut self.watch_list,
            &self.assignments,
            propagator_id,
        );
        let propagator = constructor.create(context);

        let pushed_id = self.propagators.push(Box::new(propagator));
        netflow_assert_simple!(pushed_id == propagator_id);

        self.propagator_queue.enqueue_propagator(propagator_id);
        self.propagate()?;

        Ok(PropagatorHandle {
            id: propagator_id,
            propagator: PhantomData,
        })
    }

    /// Get the concrete propagator behind a handle.
    pub fn get_propagator<P: Propagator>(&self, handle: PropagatorHandle<P>) -> Option<&P> {
        self.propagators
            .get(handle.id)
            .and_then(|propagator| propagator.downcast_ref::<P>())
    }

    /// Runs the propagators until none of them can remove further values.
    ///
    /// After an error the solver has to be backtracked before it is used again.
    pub fn propagate(&mut self) -> PropagationStatus {
        self.notify_propagators(None);

        while let Some(propagator_id) = self.propagator_queue.pop() {
            self.statistics.num_propagator_calls += 1;

            let context = PropagationContextMut::new(&mut self.assignments);
            let status = self.propagators[propagator_id].propagate(context);

            if let Err(inconsistency) = status {
                log::debug!(
                    "{} ({propagator_id}) failed: {inconsistency}",
                    self.propagators[propagator_id].name()
                );
                self.statistics.num_conflicts += 1;
                self.propagator_queue.clear();
                return Err(inconsistency);
            }

            self.notify_propagators(Some(propagator_id));
        }

        Ok(())
    }

    /// Opens a new decision level.
    pub fn new_decision_level(&mut self) {
        self.statistics.num_decision_levels += 1;
        self.assignments.increase_decision_level();
    }

    /// Restores the state of `decision_level`.
    ///
    /// The domains are rolled back first; only then are the propagators synchronised, so they
    /// observe the restored domains.
    pub fn backtrack(&mut self, decision_level: usize) {
        if decision_level >= self.decision_level() {
            return;
        }

        self.statistics.num_backtracks += 1;
        self.assignments.synchronise(decision_level);
        self.propagator_queue.clear();

        for propagator in self.propagators.iter_mut() {
            propagator.synchronise(Domains::new(&self.assignments));
        }
    }

    /// Logs the statistics of the solver and all its propagators.
    pub fn log_statistics(&self) {
        if !should_log_statistics() {
            return;
        }

        self.statistics.log(StatisticLogger::new(["solver"]));
        for (propagator_id, propagator) in self.propagators.keys().zip(self.propagators.iter()) {
            propagator.log_statistics(StatisticLogger::new([
                propagator.name().to_owned(),
                propagator_id.0.to_string(),
            ]));
        }
        log_statistic_postfix();
    }

    /// Hands the pending domain events to the registered propagators, skipping the propagator
    /// which caused them.
    fn notify_propagators(&mut self, origin: Option<PropagatorId>) {
        let events = self.assignments.drain_events().collect::<Vec<_>>();

        for (var, events) in events {
            for watcher in self.watch_list.watchers_for(var, events) {
                if Some(watcher.propagator) == origin {
                    continue;
                }

                let decision = self.propagators[watcher.propagator].notify(
                    Domains::new(&self.assignments),
                    watcher.local_id,
                    events,
                );

                if decision == EnqueueDecision::Enqueue {
                    self.propagator_queue
                        .enqueue_propagator(watcher.propagator);
                }
            }
        }
    }
}
