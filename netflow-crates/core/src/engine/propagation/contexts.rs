use crate::basic_types::EmptyDomain;
use crate::engine::Assignments;
use crate::engine::DomainId;
use crate::engine::IntervalDomain;

/// Read access to the current variable domains.
pub trait ReadDomains {
    #[doc(hidden)]
    fn assignments(&self) -> &Assignments;

    fn lower_bound(&self, var: DomainId) -> i64 {
        self.assignments().get_lower_bound(var)
    }

    fn upper_bound(&self, var: DomainId) -> i64 {
        self.assignments().get_upper_bound(var)
    }

    fn domain(&self, var: DomainId) -> &IntervalDomain {
        self.assignments().get_domain(var)
    }

    fn is_fixed(&self, var: DomainId) -> bool {
        self.assignments().is_fixed(var)
    }

    fn decision_level(&self) -> usize {
        self.assignments().get_decision_level()
    }
}

/// A read-only view on the domains, handed to propagators outside of propagation.
#[derive(Clone, Copy, Debug)]
pub struct Domains<'a> {
    assignments: &'a Assignments,
}

impl<'a> Domains<'a> {
    pub(crate) fn new(assignments: &'a Assignments) -> Self {
        Domains { assignments }
    }
}

impl ReadDomains for Domains<'_> {
    fn assignments(&self) -> &Assignments {
        self.assignments
    }
}

/// [`PropagationContextMut`] is passed to propagators during propagation. It is the only way in
/// which a propagator can change the domains.
///
/// Every operation fails with [`EmptyDomain`] if it would leave the variable without values, and
/// otherwise reports whether the domain changed.
#[derive(Debug)]
pub struct PropagationContextMut<'a> {
    assignments: &'a mut Assignments,
}

impl<'a> PropagationContextMut<'a> {
    pub(crate) fn new(assignments: &'a mut Assignments) -> Self {
        PropagationContextMut { assignments }
    }

    /// `var >= value`
    pub fn set_lower_bound(&mut self, var: DomainId, value: i64) -> Result<bool, EmptyDomain> {
        self.assignments.tighten_lower_bound(var, value)
    }

    /// `var <= value`
    pub fn set_upper_bound(&mut self, var: DomainId, value: i64) -> Result<bool, EmptyDomain> {
        self.assignments.tighten_upper_bound(var, value)
    }

    /// `var ∈ allowed`
    pub fn restrict_to(
        &mut self,
        var: DomainId,
        allowed: &IntervalDomain,
    ) -> Result<bool, EmptyDomain> {
        self.assignments.restrict_to(var, allowed)
    }

    /// `var ∉ removed`
    pub fn remove_values(
        &mut self,
        var: DomainId,
        removed: &IntervalDomain,
    ) -> Result<bool, EmptyDomain> {
        self.assignments.remove_values(var, removed)
    }

    /// `var ∈ {v + offset | v ∈ allowed}`
    pub fn restrict_to_shifted(
        &mut self,
        var: DomainId,
        allowed: &IntervalDomain,
        offset: i64,
    ) -> Result<bool, EmptyDomain> {
        self.assignments.restrict_to(var, &allowed.shifted(offset))
    }
}

impl ReadDomains for PropagationContextMut<'_> {
    fn assignments(&self) -> &Assignments {
        self.assignments
    }
}
