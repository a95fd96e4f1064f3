use std::collections::VecDeque;

use crate::basic_types::EmptyDomain;
use crate::containers::HashSet;
use crate::engine::Assignments;
use crate::engine::DomainId;
use crate::engine::IntervalDomain;
use crate::engine::PropagationContextMut;
use crate::engine::ReadDomains;

/// The variables whose domain changed but which were not yet translated into the network, in
/// order of arrival and without duplicates.
#[derive(Clone, Debug, Default)]
pub(crate) struct VariableQueue {
    queue: VecDeque<DomainId>,
    queued: HashSet<DomainId>,
}

impl VariableQueue {
    pub(crate) fn push(&mut self, var: DomainId) {
        if self.queued.insert(var) {
            self.queue.push_back(var);
        }
    }

    pub(crate) fn pop(&mut self) -> Option<DomainId> {
        let var = self.queue.pop_front()?;
        let _ = self.queued.remove(&var);
        Some(var)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.queue.clear();
        self.queued.clear();
    }
}

/// Wraps the [`PropagationContextMut`] during a consistency pass. The solver does not notify a
/// propagator of its own changes, so every variable changed through this context is queued for
/// the propagator itself.
#[derive(Debug)]
pub(crate) struct FlowContext<'a, 'b> {
    context: &'a mut PropagationContextMut<'b>,
    queue: &'a mut VariableQueue,
}

impl<'a, 'b> FlowContext<'a, 'b> {
    pub(crate) fn new(
        context: &'a mut PropagationContextMut<'b>,
        queue: &'a mut VariableQueue,
    ) -> Self {
        FlowContext { context, queue }
    }

    pub(crate) fn next_variable(&mut self) -> Option<DomainId> {
        self.queue.pop()
    }

    pub(crate) fn has_queued_variables(&self) -> bool {
        !self.queue.is_empty()
    }

    pub(crate) fn set_lower_bound(
        &mut self,
        var: DomainId,
        value: i64,
    ) -> Result<bool, EmptyDomain> {
        let changed = self.context.set_lower_bound(var, value)?;
        Ok(self.record(var, changed))
    }

    pub(crate) fn set_upper_bound(
        &mut self,
        var: DomainId,
        value: i64,
    ) -> Result<bool, EmptyDomain> {
        let changed = self.context.set_upper_bound(var, value)?;
        Ok(self.record(var, changed))
    }

    pub(crate) fn fix(&mut self, var: DomainId, value: i64) -> Result<bool, EmptyDomain> {
        let changed = self.context.restrict_to(var, &IntervalDomain::singleton(value))?;
        Ok(self.record(var, changed))
    }

    pub(crate) fn restrict_to(
        &mut self,
        var: DomainId,
        allowed: &IntervalDomain,
    ) -> Result<bool, EmptyDomain> {
        let changed = self.context.restrict_to(var, allowed)?;
        Ok(self.record(var, changed))
    }

    pub(crate) fn remove_values(
        &mut self,
        var: DomainId,
        removed: &IntervalDomain,
    ) -> Result<bool, EmptyDomain> {
        let changed = self.context.remove_values(var, removed)?;
        Ok(self.record(var, changed))
    }

    pub(crate) fn restrict_to_shifted(
        &mut self,
        var: DomainId,
        allowed: &IntervalDomain,
        offset: i64,
    ) -> Result<bool, EmptyDomain> {
        let changed = self.context.restrict_to_shifted(var, allowed, offset)?;
        Ok(self.record(var, changed))
    }

    /// Tightens the lower bound of the cost variable. The cost variable is not queued: the bound
    /// comes from the network itself.
    pub(crate) fn set_cost_lower_bound(
        &mut self,
        var: DomainId,
        value: i64,
    ) -> Result<bool, EmptyDomain> {
        self.context.set_lower_bound(var, value)
    }

    fn record(&mut self, var: DomainId, changed: bool) -> bool {
        if changed {
            self.queue.push(var);
        }
        changed
    }
}

impl ReadDomains for FlowContext<'_, '_> {
    fn assignments(&self) -> &Assignments {
        self.context.assignments()
    }
}
