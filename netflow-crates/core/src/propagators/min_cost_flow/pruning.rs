//! Derives bounds on the variables of the network from an optimal flow.
//!
//! Three kinds of reasoning are used:
//! - a node with a single live arc determines the flow on that arc, and a node with two live
//!   arcs relates the flows of both,
//! - a unit cost cannot grow further than the cost slack allows for the flow the arc carries
//!   at least,
//! - sensitivity analysis: starting from the optimum, as much flow as the cost slack allows is
//!   rerouted over an arc along cheapest cycles. Whatever cannot be moved in this way cannot be
//!   moved by any solution either.
use super::context::FlowContext;
use super::ArcCompanion;
use super::CompanionId;
use super::MinCostFlowOptions;
use super::Network;
use crate::basic_types::EmptyDomain;
use crate::containers::KeyValueHeap;
use crate::containers::KeyedVec;
use crate::engine::DomainId;
use crate::engine::ReadDomains;
use crate::flow::ArcId;
use crate::flow::FlowStatus;
use crate::flow::NodeId;
use crate::flow::PathTarget;
use crate::netflow_assert_moderate;
use crate::netflow_assert_simple;

/// Decides which arcs are analysed. Arcs which recently led to a tightening are tried first;
/// removed arcs and arcs without anything to prune are never analysed.
#[derive(Clone, Debug, Default)]
pub(crate) struct PruningScheduler {
    scores: KeyValueHeap<CompanionId, f64>,
}

impl PruningScheduler {
    pub(crate) fn new(companions: &KeyedVec<CompanionId, ArcCompanion>) -> Self {
        let mut scores = KeyValueHeap::default();
        for companion in companions.keys() {
            scores.grow(companion, 0.0);
            if !companions[companion].is_prunable() {
                scores.delete_key(companion);
            }
        }
        PruningScheduler { scores }
    }

    pub(crate) fn remove(&mut self, companion: CompanionId) {
        self.scores.delete_key(companion);
    }

    pub(crate) fn restore(&mut self, companion: CompanionId) {
        self.scores.restore_key(companion);
    }

    fn num_scheduled(&self) -> usize {
        self.scores.num_present_keys()
    }

    fn next(&mut self) -> Option<CompanionId> {
        self.scores.pop_max()
    }

    fn reward(&mut self, companion: CompanionId, amount: f64) {
        self.scores.increment(companion, amount);
    }

    fn penalise(&mut self, companion: CompanionId, amount: f64) {
        self.scores.decrement(companion, amount);
    }
}

impl Network {
    /// Tightens the domains of the network variables given an optimal flow and the largest
    /// allowed cost.
    pub(crate) fn prune(
        &mut self,
        context: &mut FlowContext,
        cost_bound: i64,
        options: &MinCostFlowOptions,
    ) -> Result<(), EmptyDomain> {
        // Saturates for cost bounds near `i64::MAX` and a negative optimum.
        let budget = cost_bound.saturating_sub(self.cost());
        netflow_assert_simple!(budget >= 0, "pruning a flow which is too expensive");

        if options.degree_pruning {
            self.prune_nodes_with_small_degree(context)?;
        }
        self.prune_unit_costs(budget, context)?;
        if options.sensitivity_pruning {
            self.analyse_scheduled_arcs(budget, options, context)?;
        }

        Ok(())
    }

    /// Fixes the flow over a node with one live arc and relates the flows over a node with two.
    /// Only valid for a feasible flow.
    pub(crate) fn prune_nodes_with_small_degree(
        &mut self,
        context: &mut FlowContext,
    ) -> Result<(), EmptyDomain> {
        let mut num_prunings = 0;
        for node in self.graph.node_ids() {
            let changed = match self.graph.node(node).degree() {
                1 => self.fix_single_arc(node, context)?,
                2 => self.relate_arc_pair(node, context)?,
                _ => false,
            };
            if changed {
                num_prunings += 1;
            }
        }

        self.statistics.num_degree_prunings += num_prunings;
        Ok(())
    }

    fn live_arcs_at(&self, node: NodeId) -> impl Iterator<Item = ArcId> + '_ {
        self.graph
            .node(node)
            .adjacency_list
            .iter()
            .copied()
            .filter(|&arc| self.graph.is_live(arc))
    }

    fn flow_variable_of(&self, arc: ArcId) -> Option<(CompanionId, DomainId)> {
        let companion = self.graph.arc(arc).companion()?;
        let var = self.companions[companion].flow_variable?;
        Some((companion, var))
    }

    fn fix_single_arc(&self, node: NodeId, context: &mut FlowContext) -> Result<bool, EmptyDomain> {
        let Some(arc) = self.live_arcs_at(node).next() else {
            return Ok(false);
        };
        let Some((companion, var)) = self.flow_variable_of(arc) else {
            return Ok(false);
        };

        let changed = context.fix(var, self.flow(companion))?;
        if changed {
            log::trace!("{node} has degree 1, {var} = {}", self.flow(companion));
        }
        Ok(changed)
    }

    /// With `s = 1` for an arc leaving the node and `s = -1` for an arc entering it, the flows
    /// over the two arcs satisfy `s1 * f1 + s2 * f2 = k`.
    fn relate_arc_pair(
        &self,
        node: NodeId,
        context: &mut FlowContext,
    ) -> Result<bool, EmptyDomain> {
        let mut arcs = self.live_arcs_at(node);
        let (Some(first), Some(second)) = (arcs.next(), arcs.next()) else {
            return Ok(false);
        };
        let (Some((first_companion, first_var)), Some((second_companion, second_var))) =
            (self.flow_variable_of(first), self.flow_variable_of(second))
        else {
            return Ok(false);
        };

        let first_sign = if first.is_forward() { 1 } else { -1 };
        let second_sign = if second.is_forward() { 1 } else { -1 };
        let k = first_sign * self.flow(first_companion) + second_sign * self.flow(second_companion);

        let first_domain = context.domain(first_var).clone();
        let mut changed = if first_sign == second_sign {
            context.restrict_to_shifted(second_var, &first_domain.negated(), first_sign * k)?
        } else {
            context.restrict_to_shifted(second_var, &first_domain, -first_sign * k)?
        };

        let second_domain = context.domain(second_var).clone();
        changed |= if first_sign == second_sign {
            context.restrict_to_shifted(first_var, &second_domain.negated(), second_sign * k)?
        } else {
            context.restrict_to_shifted(first_var, &second_domain, -second_sign * k)?
        };

        Ok(changed)
    }

    /// Every unit of cost above the current unit cost costs at least the lower bound of the
    /// flow, which is limited by `budget`.
    fn prune_unit_costs(
        &mut self,
        budget: i64,
        context: &mut FlowContext,
    ) -> Result<(), EmptyDomain> {
        let mut num_prunings = 0;
        for companion in self.companions.keys() {
            let Some(var) = self.companions[companion].cost_variable else {
                continue;
            };

            let arc = self.companions[companion].arc;
            let minimum_flow = if self.graph.is_live(arc) {
                self.companions[companion].flow_offset
            } else {
                self.flow(companion)
            };
            if minimum_flow <= 0 {
                continue;
            }

            let bound = self
                .graph
                .arc(arc)
                .cost()
                .saturating_add(budget / minimum_flow);
            if context.set_upper_bound(var, bound)? {
                log::trace!("unit cost {var} <= {bound}");
                num_prunings += 1;
            }
        }

        self.statistics.num_unit_cost_prunings += num_prunings;
        Ok(())
    }

    fn analyse_scheduled_arcs(
        &mut self,
        budget: i64,
        options: &MinCostFlowOptions,
        context: &mut FlowContext,
    ) -> Result<(), EmptyDomain> {
        let num_arcs = options.num_arcs_to_analyse(self.scheduler.num_scheduled());
        let mut analysed = Vec::with_capacity(num_arcs);

        let mut result = Ok(());
        while analysed.len() < num_arcs {
            let Some(companion) = self.scheduler.next() else {
                break;
            };
            analysed.push(companion);

            match self.analyse(companion, budget, context) {
                Ok(true) => self.scheduler.reward(companion, options.score_bump),
                Ok(false) => self.scheduler.penalise(companion, options.score_penalty),
                Err(empty_domain) => {
                    result = Err(empty_domain);
                    break;
                }
            }
        }

        for companion in analysed {
            self.scheduler.restore(companion);
        }
        result
    }

    /// Bounds the flow over the arc of `companion` in both directions, starting with the
    /// direction with the smallest residual capacity. Returns whether a domain was tightened.
    ///
    /// The flow is optimal again afterwards, but it may differ from the flow before.
    pub(crate) fn analyse(
        &mut self,
        companion: CompanionId,
        budget: i64,
        context: &mut FlowContext,
    ) -> Result<bool, EmptyDomain> {
        self.statistics.num_analyses += 1;

        let arc = self.companions[companion].arc;
        let mut directions = [arc, arc.sister()];
        if self.graph.arc(arc.sister()).capacity() < self.graph.arc(arc).capacity() {
            directions.swap(0, 1);
        }

        let mut pruned = false;
        for direction in directions {
            let residual = self.graph.arc(direction).capacity();
            if residual == 0 {
                continue;
            }

            let flow = self.flow(companion);
            let Some(moved) = self.reroute(direction, budget) else {
                // No cycle passes the arc at all.
                continue;
            };

            self.graph.restore_optimality_conditions(direction);
            let (status, augmentations) = self.graph.solve();
            self.statistics.num_augmentations += augmentations;
            netflow_assert_simple!(
                status == FlowStatus::Optimal,
                "rerouting over {direction} broke feasibility"
            );

            if moved < residual {
                pruned |= if direction.is_forward() {
                    self.tighten_flow(companion, i64::MIN, flow + moved, context)?
                } else {
                    self.tighten_flow(companion, flow - moved, i64::MAX, context)?
                };
            }
        }

        Ok(pruned)
    }

    /// Sends flow over `direction` and back along cheapest cycles until the residual capacity
    /// of `direction` is exhausted, no cycle is left, or the cost of the cycles exceeds
    /// `budget`. Returns the amount of flow moved, or `None` if no cycle exists.
    ///
    /// The pair of `direction` may violate the optimality conditions afterwards.
    fn reroute(&mut self, direction: ArcId, budget: i64) -> Option<i64> {
        let source = self.graph.head(direction);
        let target = PathTarget::Node(self.graph.tail(direction));

        let mut budget = budget;
        let mut moved = 0;
        let mut found_cycle = false;
        loop {
            let residual = self.graph.arc(direction).capacity();
            if residual == 0 {
                break;
            }

            let reduced_cost = self.graph.reduced_cost(direction);
            let Some(path) = self.graph.shortest_path(source, target, Some(direction)) else {
                if !found_cycle {
                    return None;
                }
                break;
            };
            found_cycle = true;

            let cycle_cost = reduced_cost + path.distance;
            netflow_assert_moderate!(cycle_cost >= 0, "negative cycle over {direction}");

            let available = path.bottleneck.min(residual);
            let amount = if cycle_cost > 0 {
                available.min(budget / cycle_cost)
            } else {
                available
            };
            if amount == 0 {
                break;
            }

            self.graph.push_flow(direction, amount);
            self.graph.augment_path(path, amount);
            moved += amount;
            budget -= amount * cycle_cost;

            if amount < available {
                break;
            }
        }

        Some(moved)
    }

    /// Restricts the flow over the arc of `companion` to `[lower_bound, upper_bound]`, through
    /// its flow variable and its structure variable.
    fn tighten_flow(
        &mut self,
        companion: CompanionId,
        lower_bound: i64,
        upper_bound: i64,
        context: &mut FlowContext,
    ) -> Result<bool, EmptyDomain> {
        let mut changed = false;
        if let Some(var) = self.companions[companion].flow_variable {
            changed |= context.set_lower_bound(var, lower_bound)?;
            changed |= context.set_upper_bound(var, upper_bound)?;
        }
        changed |= self.restrict_structure_by_flow(companion, lower_bound, upper_bound, context)?;

        if changed {
            log::trace!("flow of {companion} restricted to [{lower_bound}, {upper_bound}]");
            self.statistics.num_sensitivity_prunings += 1;
        }
        Ok(changed)
    }
}
