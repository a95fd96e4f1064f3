use std::fmt::Display;
use std::fmt::Formatter;

use super::context::FlowContext;
use super::Network;
use super::StructureId;
use crate::basic_types::EmptyDomain;
use crate::containers::StorageKey;
use crate::engine::DomainId;
use crate::engine::ReadDomains;
use crate::flow::ArcId;
use crate::netflow_assert_moderate;
use crate::netflow_assert_simple;

/// Identifies an [`ArcCompanion`] within its [`Network`].
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct CompanionId(pub(crate) u32);

impl StorageKey for CompanionId {
    fn index(&self) -> usize {
        self.0 as usize
    }

    fn create_from_index(index: usize) -> Self {
        CompanionId(index as u32)
    }
}

impl Display for CompanionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// The position of an arc within a structure binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct StructureLink {
    pub(crate) structure: StructureId,
    /// Index into the entries of the binding; changes when the arc is grounded or ungrounded.
    pub(crate) local_id: usize,
}

/// Binds an arc pair to the variables which determine its flow bounds and its unit cost.
///
/// The lower bound of the flow is kept as the `flow_offset`; the flow engine only sees the flow
/// relative to it. Without a flow variable the bounds are the ones given when the network was
/// built, without a cost variable the cost is.
#[derive(Clone, Debug)]
pub struct ArcCompanion {
    pub(crate) arc: ArcId,
    pub(crate) flow_offset: i64,
    pub(crate) flow_variable: Option<DomainId>,
    pub(crate) cost_variable: Option<DomainId>,
    pub(crate) structure: Option<StructureLink>,
}

impl ArcCompanion {
    /// The forward arc of the pair.
    pub fn arc(&self) -> ArcId {
        self.arc
    }

    pub fn flow_offset(&self) -> i64 {
        self.flow_offset
    }

    pub fn flow_variable(&self) -> Option<DomainId> {
        self.flow_variable
    }

    pub fn cost_variable(&self) -> Option<DomainId> {
        self.cost_variable
    }

    pub fn structure(&self) -> Option<StructureId> {
        self.structure.map(|link| link.structure)
    }

    /// Whether sensitivity analysis of the arc can tighten a domain.
    pub(crate) fn is_prunable(&self) -> bool {
        self.flow_variable.is_some() || self.structure.is_some()
    }
}

impl Network {
    /// The absolute flow on the arc of `companion`.
    pub fn flow(&self, companion: CompanionId) -> i64 {
        let entry = &self.companions[companion];
        entry.flow_offset + self.graph.relative_flow(entry.arc)
    }

    /// The largest flow the arc of `companion` currently allows.
    pub fn flow_upper_bound(&self, companion: CompanionId) -> i64 {
        let entry = &self.companions[companion];
        entry.flow_offset + self.graph.total_capacity(entry.arc)
    }

    /// Moves the flow of the arc of `companion` to `flow`, which has to lie within its bounds.
    /// Only the excess of the endpoints changes; the graph is left as it is.
    pub(crate) fn set_flow(&mut self, companion: CompanionId, flow: i64) {
        netflow_assert_moderate!(
            flow >= self.companions[companion].flow_offset
                && flow <= self.flow_upper_bound(companion),
            "flow {flow} outside of the bounds of {companion}"
        );

        let arc = self.companions[companion].arc;
        let current = self.flow(companion);
        if flow > current {
            self.graph.push_flow(arc, flow - current);
        } else if flow < current {
            self.graph.push_flow(arc.sister(), current - flow);
        }
    }

    /// Sets the flow bounds of the arc of `companion` to `[min, max]`.
    ///
    /// The current flow is never outside of the bounds in between the two steps: a lowered
    /// minimum is applied first, otherwise the maximum is.
    pub(crate) fn change_capacity(&mut self, companion: CompanionId, min: i64, max: i64) {
        netflow_assert_simple!(min <= max, "empty flow bounds [{min}, {max}] for {companion}");

        if min < self.companions[companion].flow_offset {
            self.change_min_capacity(companion, min);
            self.change_max_capacity(companion, max);
        } else {
            self.change_max_capacity(companion, max);
            self.change_min_capacity(companion, min);
        }
    }

    fn change_min_capacity(&mut self, companion: CompanionId, min: i64) {
        if self.flow(companion) < min {
            self.set_flow(companion, min);
        }

        let entry = &mut self.companions[companion];
        let delta = min - entry.flow_offset;
        entry.flow_offset = min;
        let arc = entry.arc;
        self.graph.shift_lower_bound(arc, delta);
    }

    fn change_max_capacity(&mut self, companion: CompanionId, max: i64) {
        if self.flow(companion) > max {
            self.set_flow(companion, max);
        }

        let residual = max - self.flow(companion);
        let arc = self.companions[companion].arc;
        self.graph.set_residual_capacity(arc, residual);
    }

    /// Translates a change of `var`, which is the flow and/or the cost variable of `companion`,
    /// into the network.
    pub(crate) fn process_companion_event(
        &mut self,
        companion: CompanionId,
        var: DomainId,
        context: &mut FlowContext,
    ) -> Result<(), EmptyDomain> {
        if self.companions[companion].flow_variable == Some(var) {
            self.process_flow_event(companion, var, context)?;
        }
        if self.companions[companion].cost_variable == Some(var) {
            self.process_cost_event(companion, var, context);
        }
        Ok(())
    }

    fn process_flow_event(
        &mut self,
        companion: CompanionId,
        var: DomainId,
        context: &mut FlowContext,
    ) -> Result<(), EmptyDomain> {
        let lower_bound = context.lower_bound(var);
        let upper_bound = context.upper_bound(var);

        let _ = self.restrict_structure_by_flow(companion, lower_bound, upper_bound, context)?;

        let arc = self.companions[companion].arc;
        if !self.graph.is_live(arc) {
            // The flow of a removed arc is fixed, so later events can only confirm it.
            return Ok(());
        }

        if lower_bound != self.companions[companion].flow_offset
            || upper_bound != self.flow_upper_bound(companion)
        {
            self.mark_modified(companion);
            self.change_capacity(companion, lower_bound, upper_bound);
            self.graph.restore_optimality_conditions(arc);
        }

        if lower_bound == upper_bound {
            log::trace!("{var} = {lower_bound} takes {arc} out of the network");
            if !self.ground_by_flow(companion, lower_bound, context)? {
                self.remove_arc(arc);
            }
        }

        Ok(())
    }

    fn process_cost_event(
        &mut self,
        companion: CompanionId,
        var: DomainId,
        context: &mut FlowContext,
    ) {
        let cost = context.lower_bound(var);
        if cost != self.graph.arc(self.companions[companion].arc).cost() {
            self.mark_modified(companion);
            self.update_cost(companion, cost);
        }
    }

    /// Gives the arc of `companion` the unit cost `cost`. The cost of a removed arc is part of
    /// the cost offset, which takes the difference.
    fn update_cost(&mut self, companion: CompanionId, cost: i64) {
        let arc = self.companions[companion].arc;
        let old_cost = self.graph.arc(arc).cost();
        if self.graph.is_live(arc) {
            self.graph.set_cost(arc, cost);
            self.graph.restore_optimality_conditions(arc);
        } else {
            self.cost_offset += (cost - old_cost) * self.flow(companion);
            self.graph.set_cost(arc, cost);
        }
    }

    /// Recomputes the bounds and the cost of the arc of `companion` from the domains after
    /// backtracking.
    pub(crate) fn restore_companion(
        &mut self,
        companion: CompanionId,
        domains: &impl ReadDomains,
    ) {
        let arc = self.companions[companion].arc;

        if let Some(var) = self.companions[companion].flow_variable {
            // A removed arc had its final bounds applied before it was removed.
            if self.graph.is_live(arc) {
                self.change_capacity(companion, domains.lower_bound(var), domains.upper_bound(var));
            }
        }

        if let Some(var) = self.companions[companion].cost_variable {
            self.update_cost(companion, domains.lower_bound(var));
        }

        self.graph.restore_optimality_conditions(arc);
    }
}
