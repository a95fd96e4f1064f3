/// The options of the min-cost-flow propagator.
#[derive(Debug, Clone, Copy)]
pub struct MinCostFlowOptions {
    /// The fraction of the live prunable arcs which is examined by sensitivity analysis in one
    /// round.
    pub pruning_fraction: f64,
    /// The minimum number of arcs examined per round, as long as that many are live.
    pub minimum_pruned_arcs: usize,
    /// Whether nodes with one or two live arcs are used to fix or relate flow variables.
    pub degree_pruning: bool,
    /// Whether arcs are examined with sensitivity analysis at all.
    pub sensitivity_pruning: bool,
    /// Added to the score of an arc whose analysis tightened a domain.
    pub score_bump: f64,
    /// Subtracted from the score of an arc whose analysis did not tighten anything.
    pub score_penalty: f64,
}

impl Default for MinCostFlowOptions {
    fn default() -> Self {
        Self {
            pruning_fraction: 0.25,
            minimum_pruned_arcs: 16,
            degree_pruning: true,
            sensitivity_pruning: true,
            score_bump: 1.0,
            score_penalty: 0.5,
        }
    }
}

impl MinCostFlowOptions {
    /// The number of arcs to analyse when `num_present` arcs are eligible.
    pub(crate) fn num_arcs_to_analyse(&self, num_present: usize) -> usize {
        let fraction = (self.pruning_fraction * num_present as f64).ceil() as usize;
        fraction.max(self.minimum_pruned_arcs).min(num_present)
    }
}

/// Which implications between the structure variable and the flow of its arcs are enforced.
///
/// An arc of a structure binding is *active* when its flow is at its upper bound and *inactive*
/// when its flow is at its lower bound.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum StructureBehaviour {
    /// A structure value in the sub-domain of an arc forces the arc active.
    PruneActive,
    /// A structure value outside the sub-domain of an arc forces the arc inactive.
    PruneInactive,
    /// Both implications.
    #[default]
    PruneBoth,
}

impl StructureBehaviour {
    pub(crate) fn grounds_active(self) -> bool {
        matches!(
            self,
            StructureBehaviour::PruneActive | StructureBehaviour::PruneBoth
        )
    }

    pub(crate) fn grounds_inactive(self) -> bool {
        matches!(
            self,
            StructureBehaviour::PruneInactive | StructureBehaviour::PruneBoth
        )
    }
}
