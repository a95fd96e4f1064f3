use thiserror::Error;

/// The result of invoking a propagator. The propagation either succeeds or identifies a reason
/// why the current search node has no solution.
pub type PropagationStatus = Result<(), Inconsistency>;

/// Why a propagator rejected the current domains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Inconsistency {
    /// A domain operation would have left a variable without values.
    #[error("a variable domain became empty")]
    EmptyDomain,
    /// No flow satisfies the current arc bounds and node supplies.
    #[error("the flow network has no feasible flow")]
    InfeasibleFlow,
    /// The cheapest feasible flow is more expensive than the cost variable allows.
    #[error("the optimal flow cost {optimum} exceeds the cost bound {bound}")]
    CostOverflow { optimum: i64, bound: i64 },
}

/// Returned by a domain operation that would empty the domain. The domain is left untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Error)]
#[error("the domain operation would empty the domain")]
pub struct EmptyDomain;

impl From<EmptyDomain> for Inconsistency {
    fn from(_: EmptyDomain) -> Self {
        Inconsistency::EmptyDomain
    }
}
