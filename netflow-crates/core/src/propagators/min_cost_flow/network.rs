use super::pruning::PruningScheduler;
use super::ArcCompanion;
use super::CompanionId;
use super::MinCostFlowStatistics;
use super::StructureBehaviour;
use super::StructureBinding;
use super::StructureId;
use crate::basic_types::Trail;
use crate::containers::HashSet;
use crate::containers::KeyedVec;
use crate::engine::ReadDomains;
use crate::flow::ArcId;
use crate::flow::FlowGraph;
use crate::flow::FlowStatus;
use crate::netflow_assert_advanced;
use crate::netflow_assert_simple;

/// The flow graph together with the variables bound to its arcs and the logs needed to undo
/// changes on backtracking.
///
/// Two logs are kept per decision level: the arcs taken out of the graph and the companions
/// whose bounds or cost changed. Arcs are put back most recently removed first, after which the
/// modified companions recompute their bounds and costs from the restored domains.
///
/// The cost of the flow on removed arcs is kept in the cost offset, so that
/// [`Network::cost`] is the cost of the complete flow.
#[derive(Clone, Debug)]
pub struct Network {
    pub(crate) graph: FlowGraph,
    pub(crate) companions: KeyedVec<CompanionId, ArcCompanion>,
    pub(crate) structures: KeyedVec<StructureId, StructureBinding>,
    deleted_arcs: Trail<ArcId>,
    modified_companions: Trail<CompanionId>,
    /// The companions in the log of the current decision level.
    modified_at_level: HashSet<CompanionId>,
    pub(crate) cost_offset: i64,
    /// The cost of the lower bounds of the arcs without a companion.
    fixed_cost: i64,
    pub(crate) scheduler: PruningScheduler,
    pub(crate) statistics: MinCostFlowStatistics,
}

impl Network {
    pub(crate) fn new(
        graph: FlowGraph,
        companions: KeyedVec<CompanionId, ArcCompanion>,
        structures: KeyedVec<StructureId, StructureBinding>,
        fixed_cost: i64,
    ) -> Network {
        let scheduler = PruningScheduler::new(&companions);
        Network {
            graph,
            companions,
            structures,
            deleted_arcs: Trail::default(),
            modified_companions: Trail::default(),
            modified_at_level: HashSet::default(),
            cost_offset: fixed_cost,
            fixed_cost,
            scheduler,
            statistics: MinCostFlowStatistics::default(),
        }
    }

    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    pub fn companion(&self, companion: CompanionId) -> &ArcCompanion {
        &self.companions[companion]
    }

    pub fn companion_ids(&self) -> impl Iterator<Item = CompanionId> {
        self.companions.keys()
    }

    pub fn structure(&self, structure: StructureId) -> &StructureBinding {
        &self.structures[structure]
    }

    pub fn structure_ids(&self) -> impl Iterator<Item = StructureId> {
        self.structures.keys()
    }

    /// The cost of the flow on the arcs which are not in the graph, plus the cost of the fixed
    /// lower bounds.
    pub fn cost_offset(&self) -> i64 {
        self.cost_offset
    }

    /// The flow on the pair of `arc`. For an arc without a companion this excludes the lower
    /// bound, which is part of the cost offset.
    pub fn arc_flow(&self, arc: ArcId) -> i64 {
        match self.graph.arc(arc).companion() {
            Some(companion) => self.flow(companion),
            None => self.graph.relative_flow(arc),
        }
    }

    /// The cost of the current flow, including the flow on the removed arcs.
    pub fn cost(&self) -> i64 {
        let live_cost: i64 = self
            .graph
            .live_arcs()
            .iter()
            .map(|&arc| self.graph.arc(arc).cost() * self.arc_flow(arc))
            .sum();
        live_cost + self.cost_offset
    }

    /// Opens the log levels up to `decision_level`.
    pub(crate) fn synchronise_level(&mut self, decision_level: usize) {
        netflow_assert_simple!(
            self.deleted_arcs.decision_level() <= decision_level,
            "the network was not backtracked"
        );

        while self.deleted_arcs.decision_level() < decision_level {
            self.deleted_arcs.new_level();
            self.modified_companions.new_level();
            self.modified_at_level.clear();
        }
    }

    /// Logs `companion` for restoration, at most once per decision level.
    pub(crate) fn mark_modified(&mut self, companion: CompanionId) {
        if self.modified_at_level.insert(companion) {
            self.modified_companions.push(companion);
        }
    }

    /// Takes the pair of `arc` out of the graph. The flow on the pair has to be final: it is
    /// folded into the balances of the endpoints and its cost into the cost offset.
    pub(crate) fn remove_arc(&mut self, arc: ArcId) {
        let arc = arc.forward();
        self.cost_offset += self.graph.arc(arc).cost() * self.arc_flow(arc);
        self.graph.remove_arc(arc);
        self.deleted_arcs.push(arc);
        self.statistics.num_removed_arcs += 1;

        if let Some(companion) = self.graph.arc(arc).companion() {
            self.scheduler.remove(companion);
        }
    }

    /// The inverse of [`Network::remove_arc`]. An arc which was grounded by its structure
    /// binding becomes pending again.
    fn add_arc(&mut self, arc: ArcId) {
        self.cost_offset -= self.graph.arc(arc).cost() * self.arc_flow(arc);
        self.graph.add_arc(arc);

        if let Some(companion) = self.graph.arc(arc).companion() {
            if self.companions[companion].is_prunable() {
                self.scheduler.restore(companion);
            }
            if let Some((structure, local_id)) = self.is_grounded(companion) {
                self.unground_arc(structure, local_id);
            }
        }
    }

    /// Undoes every change made above `decision_level`. The domains have to be restored to that
    /// level already.
    pub(crate) fn backtrack(&mut self, decision_level: usize, domains: &impl ReadDomains) {
        if self.deleted_arcs.decision_level() > decision_level {
            let arcs = self
                .deleted_arcs
                .synchronise(decision_level)
                .collect::<Vec<_>>();
            for arc in arcs {
                self.add_arc(arc);
            }

            let companions = self
                .modified_companions
                .synchronise(decision_level)
                .collect::<Vec<_>>();
            for companion in companions {
                self.restore_companion(companion, domains);
            }
        }
        self.modified_at_level.clear();

        netflow_assert_advanced!(self.check_invariants());
    }

    /// Whether the flow has to be recomputed: some node is not balanced, or the flow is more
    /// expensive than `cost_bound`.
    pub(crate) fn needs_update(&mut self, cost_bound: i64) -> bool {
        self.graph.has_infeasible_nodes() || self.cost() > cost_bound
    }

    pub(crate) fn solve(&mut self) -> FlowStatus {
        let (status, augmentations) = self.graph.solve();
        self.statistics.num_solves += 1;
        self.statistics.num_augmentations += augmentations;
        status
    }

    /// Checks the invariants of the flow graph, the cost offset and the structure bindings.
    pub fn check_invariants(&self) -> bool {
        if !self.graph.check_invariants() {
            return false;
        }

        let removed_cost: i64 = self
            .graph
            .arcs
            .keys()
            .filter(|arc| arc.is_forward() && !self.graph.is_live(*arc))
            .map(|arc| self.graph.arc(arc).cost() * self.arc_flow(arc))
            .sum();
        if self.cost_offset != self.fixed_cost + removed_cost {
            return false;
        }

        self.structures.keys().all(|structure| {
            let binding = &self.structures[structure];
            binding.entries.iter().enumerate().all(|(local_id, entry)| {
                let companion = &self.companions[entry.companion];
                let linked = companion.structure.is_some_and(|link| {
                    link.structure == structure && link.local_id == local_id
                });
                let is_live = self.graph.is_live(companion.arc);
                let decided = if local_id < binding.not_grounded {
                    // Only a two-sided binding decides every arc whose flow is fixed.
                    is_live || binding.behaviour != StructureBehaviour::PruneBoth
                } else {
                    let flow = self.flow(entry.companion);
                    !is_live && (flow == entry.active_flow || flow == entry.inactive_flow)
                };
                linked && decided
            })
        })
    }

    /// Whether the balances of all nodes add up to 0, which holds after every consistency pass
    /// which found a flow.
    pub fn is_balanced(&self) -> bool {
        self.graph.total_balance() == 0
    }

    /// Checks that no pending arc of a two-sided structure binding has a flow variable which
    /// is forced to the active or the inactive flow of the arc. Holds at a fixpoint.
    pub fn check_structure_domains(&self, domains: &impl ReadDomains) -> bool {
        self.structures
            .iter()
            .filter(|binding| binding.behaviour == StructureBehaviour::PruneBoth)
            .flat_map(|binding| &binding.entries[..binding.not_grounded])
            .all(|entry| {
                let Some(var) = self.companions[entry.companion].flow_variable else {
                    return true;
                };
                domains.lower_bound(var) == entry.inactive_flow
                    && domains.upper_bound(var) == entry.active_flow
            })
    }
}
