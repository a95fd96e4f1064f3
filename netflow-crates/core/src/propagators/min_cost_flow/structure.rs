use std::fmt::Display;
use std::fmt::Formatter;

use super::arc_companion::StructureLink;
use super::context::FlowContext;
use super::CompanionId;
use super::Network;
use super::StructureBehaviour;
use crate::basic_types::EmptyDomain;
use crate::containers::StorageKey;
use crate::engine::DomainId;
use crate::engine::IntervalDomain;
use crate::engine::ReadDomains;
use crate::netflow_assert_eq_simple;
use crate::netflow_assert_simple;

/// Identifies a [`StructureBinding`] within its [`Network`].
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct StructureId(pub(crate) u32);

impl StorageKey for StructureId {
    fn index(&self) -> usize {
        self.0 as usize
    }

    fn create_from_index(index: usize) -> Self {
        StructureId(index as u32)
    }
}

impl Display for StructureId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// An arc of a structure binding with the values of the structure variable which select it.
#[derive(Clone, Debug)]
pub(crate) struct StructureEntry {
    pub(crate) companion: CompanionId,
    pub(crate) sub_domain: IntervalDomain,
    /// The flow of the arc when it is not selected: its lower bound when the network was built.
    pub(crate) inactive_flow: i64,
    /// The flow of the arc when it is selected: its upper bound when the network was built.
    pub(crate) active_flow: i64,
}

/// Groups arcs under one discrete variable: the arc is selected exactly when the variable takes
/// a value in the sub-domain of the arc.
///
/// The entries `[0, not_grounded)` are pending, the entries after them are grounded, i.e. their
/// flow was forced to one of the two bounds and their arc was taken out of the network. Arcs
/// are ungrounded in the reverse order in which they were grounded.
#[derive(Clone, Debug)]
pub struct StructureBinding {
    pub(crate) variable: DomainId,
    pub(crate) behaviour: StructureBehaviour,
    pub(crate) entries: Vec<StructureEntry>,
    pub(crate) not_grounded: usize,
}

impl StructureBinding {
    pub fn variable(&self) -> DomainId {
        self.variable
    }

    pub fn behaviour(&self) -> StructureBehaviour {
        self.behaviour
    }

    pub fn num_arcs(&self) -> usize {
        self.entries.len()
    }

    pub fn num_pending(&self) -> usize {
        self.not_grounded
    }

    /// The companions of the arcs which are not grounded.
    pub fn pending(&self) -> impl Iterator<Item = CompanionId> + '_ {
        self.entries[..self.not_grounded]
            .iter()
            .map(|entry| entry.companion)
    }

    /// The companions of the grounded arcs, in the order in which they were grounded.
    pub fn grounded(&self) -> impl Iterator<Item = CompanionId> + '_ {
        self.entries[self.not_grounded..]
            .iter()
            .rev()
            .map(|entry| entry.companion)
    }

    fn is_pending(&self, local_id: usize) -> bool {
        local_id < self.not_grounded
    }
}

impl Network {
    /// Grounds the pending arcs of `structure` whose selection is decided by the domain of the
    /// structure variable.
    pub(crate) fn process_structure_event(
        &mut self,
        structure: StructureId,
        context: &mut FlowContext,
    ) -> Result<(), EmptyDomain> {
        let variable = self.structures[structure].variable;
        let behaviour = self.structures[structure].behaviour;

        // Backwards, so that swapping a grounded entry to the end of the pending entries only
        // moves entries which were already visited.
        let mut local_id = self.structures[structure].not_grounded;
        while local_id > 0 {
            local_id -= 1;

            let entry = &self.structures[structure].entries[local_id];
            // A pending arc which is out of the network carries a flow strictly between its
            // two flows, which only the one-sided behaviours allow.
            if !self.graph.is_live(self.companions[entry.companion].arc) {
                continue;
            }

            let domain = context.domain(variable);
            let overlap = domain.intersect(&entry.sub_domain);
            let excluded = overlap.is_empty();
            let selected = overlap == *domain;
            if excluded && behaviour.grounds_inactive() {
                self.ground_arc(structure, local_id, false, context)?;
            } else if selected && behaviour.grounds_active() {
                self.ground_arc(structure, local_id, true, context)?;
            }
        }

        Ok(())
    }

    /// Forces the flow of the pending entry `local_id` to its active or inactive value, takes
    /// the arc out of the network and moves the entry to the grounded part.
    pub(crate) fn ground_arc(
        &mut self,
        structure: StructureId,
        local_id: usize,
        active: bool,
        context: &mut FlowContext,
    ) -> Result<(), EmptyDomain> {
        netflow_assert_simple!(self.structures[structure].is_pending(local_id));

        let entry = &self.structures[structure].entries[local_id];
        let companion = entry.companion;
        let forced_flow = if active {
            entry.active_flow
        } else {
            entry.inactive_flow
        };

        if let Some(var) = self.companions[companion].flow_variable {
            let _ = if active {
                context.set_lower_bound(var, forced_flow)?
            } else {
                context.set_upper_bound(var, forced_flow)?
            };
        }

        log::trace!(
            "{structure} grounds {companion} {} with flow {forced_flow}",
            if active { "active" } else { "inactive" }
        );

        self.set_flow(companion, forced_flow);
        let arc = self.companions[companion].arc;
        self.remove_arc(arc);
        self.statistics.num_grounded_arcs += 1;

        let binding = &mut self.structures[structure];
        let last_pending = binding.not_grounded - 1;
        binding.entries.swap(local_id, last_pending);
        binding.not_grounded = last_pending;
        self.update_link(structure, local_id);
        self.update_link(structure, last_pending);

        Ok(())
    }

    /// Moves the first grounded entry of `structure` back to the pending entries. Only the most
    /// recently grounded arc can be ungrounded.
    pub(crate) fn unground_arc(&mut self, structure: StructureId, local_id: usize) {
        let binding = &mut self.structures[structure];
        netflow_assert_eq_simple!(
            local_id,
            binding.not_grounded,
            "arcs of {structure} are ungrounded out of order"
        );
        binding.not_grounded += 1;
    }

    /// Whether the arc of `companion` belongs to a structure binding in which it is grounded.
    pub(crate) fn is_grounded(&self, companion: CompanionId) -> Option<(StructureId, usize)> {
        let link = self.companions[companion].structure?;
        (!self.structures[link.structure].is_pending(link.local_id))
            .then_some((link.structure, link.local_id))
    }

    /// Grounds the arc of `companion` when it is pending and `flow`, the value its flow was
    /// fixed to, is its active or its inactive flow.
    ///
    /// Returns whether the arc was grounded.
    pub(crate) fn ground_by_flow(
        &mut self,
        companion: CompanionId,
        flow: i64,
        context: &mut FlowContext,
    ) -> Result<bool, EmptyDomain> {
        let Some(link) = self.companions[companion].structure else {
            return Ok(false);
        };
        let binding = &self.structures[link.structure];
        if !binding.is_pending(link.local_id) {
            return Ok(false);
        }

        let entry = &binding.entries[link.local_id];
        let active = if flow == entry.active_flow {
            true
        } else if flow == entry.inactive_flow {
            false
        } else {
            return Ok(false);
        };
        self.ground_arc(link.structure, link.local_id, active, context)?;
        Ok(true)
    }

    /// Restricts the structure variable of a pending arc given bounds on the flow of the arc: a
    /// flow above the inactive value selects the arc, a flow below the active value excludes it.
    ///
    /// Returns whether the structure variable changed.
    pub(crate) fn restrict_structure_by_flow(
        &self,
        companion: CompanionId,
        flow_lower_bound: i64,
        flow_upper_bound: i64,
        context: &mut FlowContext,
    ) -> Result<bool, EmptyDomain> {
        let Some(link) = self.companions[companion].structure else {
            return Ok(false);
        };
        let binding = &self.structures[link.structure];
        if !binding.is_pending(link.local_id) {
            return Ok(false);
        }

        let entry = &binding.entries[link.local_id];
        let mut changed = false;
        if binding.behaviour.grounds_inactive() && flow_lower_bound > entry.inactive_flow {
            changed |= context.restrict_to(binding.variable, &entry.sub_domain)?;
        }
        if binding.behaviour.grounds_active() && flow_upper_bound < entry.active_flow {
            changed |= context.remove_values(binding.variable, &entry.sub_domain)?;
        }
        Ok(changed)
    }

    fn update_link(&mut self, structure: StructureId, local_id: usize) {
        let companion = self.structures[structure].entries[local_id].companion;
        self.companions[companion].structure = Some(StructureLink {
            structure,
            local_id,
        });
    }
}
