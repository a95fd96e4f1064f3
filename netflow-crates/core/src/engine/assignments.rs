use enumset::EnumSet;

use super::DomainId;
use super::IntDomainEvent;
use super::IntervalDomain;
use crate::basic_types::EmptyDomain;
use crate::basic_types::Trail;
use crate::containers::KeyedVec;
use crate::netflow_assert_simple;

/// The domains of all integer variables, with the history needed to restore the domains of an
/// earlier decision level.
#[derive(Clone, Debug, Default)]
pub struct Assignments {
    domains: KeyedVec<DomainId, IntervalDomain>,
    /// The domain a variable had before it was changed, stamped with the level of the change.
    trail: Trail<(DomainId, IntervalDomain)>,
    /// Changes which have not yet been handed to the propagators.
    events: Vec<(DomainId, EnumSet<IntDomainEvent>)>,
}

impl Assignments {
    pub(crate) fn grow(&mut self, domain: IntervalDomain) -> DomainId {
        netflow_assert_simple!(!domain.is_empty(), "variables start with a non-empty domain");
        self.domains.push(domain)
    }

    pub(crate) fn num_domains(&self) -> usize {
        self.domains.len()
    }

    pub(crate) fn get_decision_level(&self) -> usize {
        self.trail.decision_level()
    }

    pub(crate) fn increase_decision_level(&mut self) {
        self.trail.new_level();
    }

    /// Restores every domain to its state at `new_decision_level`. Pending events are dropped.
    pub(crate) fn synchronise(&mut self, new_decision_level: usize) {
        for (domain_id, previous) in self.trail.synchronise(new_decision_level) {
            self.domains[domain_id] = previous;
        }
        self.events.clear();
    }

    pub(crate) fn drain_events(
        &mut self,
    ) -> std::vec::Drain<'_, (DomainId, EnumSet<IntDomainEvent>)> {
        self.events.drain(..)
    }

    pub(crate) fn get_domain(&self, domain_id: DomainId) -> &IntervalDomain {
        &self.domains[domain_id]
    }

    pub(crate) fn get_lower_bound(&self, domain_id: DomainId) -> i64 {
        self.domains[domain_id].lower_bound()
    }

    pub(crate) fn get_upper_bound(&self, domain_id: DomainId) -> i64 {
        self.domains[domain_id].upper_bound()
    }

    pub(crate) fn is_fixed(&self, domain_id: DomainId) -> bool {
        self.domains[domain_id].is_fixed()
    }

    /// Applies `[domain_id >= value]`. Returns whether the domain changed.
    pub(crate) fn tighten_lower_bound(
        &mut self,
        domain_id: DomainId,
        value: i64,
    ) -> Result<bool, EmptyDomain> {
        if value <= self.get_lower_bound(domain_id) {
            return Ok(false);
        }
        let upper_bound = self.get_upper_bound(domain_id);
        self.restrict_to(domain_id, &IntervalDomain::new(value, upper_bound))
    }

    /// Applies `[domain_id <= value]`. Returns whether the domain changed.
    pub(crate) fn tighten_upper_bound(
        &mut self,
        domain_id: DomainId,
        value: i64,
    ) -> Result<bool, EmptyDomain> {
        if value >= self.get_upper_bound(domain_id) {
            return Ok(false);
        }
        let lower_bound = self.get_lower_bound(domain_id);
        self.restrict_to(domain_id, &IntervalDomain::new(lower_bound, value))
    }

    /// Intersects the domain with `allowed`.
    pub(crate) fn restrict_to(
        &mut self,
        domain_id: DomainId,
        allowed: &IntervalDomain,
    ) -> Result<bool, EmptyDomain> {
        let updated = self.domains[domain_id].intersect(allowed);
        self.update_domain(domain_id, updated)
    }

    /// Removes all values of `removed` from the domain.
    pub(crate) fn remove_values(
        &mut self,
        domain_id: DomainId,
        removed: &IntervalDomain,
    ) -> Result<bool, EmptyDomain> {
        let updated = self.domains[domain_id].subtract(removed);
        self.update_domain(domain_id, updated)
    }

    fn update_domain(
        &mut self,
        domain_id: DomainId,
        updated: IntervalDomain,
    ) -> Result<bool, EmptyDomain> {
        if updated.is_empty() {
            return Err(EmptyDomain);
        }

        let current = &self.domains[domain_id];
        // The update is a subset of the current domain.
        if updated == *current {
            return Ok(false);
        }

        let mut events = EnumSet::empty();
        if updated.lower_bound() != current.lower_bound() {
            let _ = events.insert(IntDomainEvent::LowerBound);
        }
        if updated.upper_bound() != current.upper_bound() {
            let _ = events.insert(IntDomainEvent::UpperBound);
        }
        if updated.is_fixed() {
            let _ = events.insert(IntDomainEvent::Assign);
        }
        if events.is_empty() {
            let _ = events.insert(IntDomainEvent::Removal);
        }

        let previous = std::mem::replace(&mut self.domains[domain_id], updated);
        self.trail.push((domain_id, previous));
        self.events.push((domain_id, events));

        Ok(true)
    }
}
