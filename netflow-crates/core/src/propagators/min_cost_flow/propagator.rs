use enumset::EnumSet;

use super::context::FlowContext;
use super::context::VariableQueue;
use super::handler::VarHandler;
use super::ArcRef;
use super::CompanionId;
use super::MinCostFlowOptions;
use super::Network;
use crate::basic_types::Inconsistency;
use crate::basic_types::PropagationStatus;
use crate::containers::HashMap;
use crate::containers::KeyedVec;
use crate::create_statistics_struct;
use crate::engine::DomainId;
use crate::engine::Domains;
use crate::engine::EnqueueDecision;
use crate::engine::IntDomainEvent;
use crate::engine::LocalId;
use crate::engine::PropagationContextMut;
use crate::engine::Propagator;
use crate::engine::ReadDomains;
use crate::flow::ArcId;
use crate::flow::FlowStatus;
use crate::netflow_assert_advanced;
use crate::statistics::Statistic;
use crate::statistics::StatisticLogger;

create_statistics_struct!(
    /// Counters of a [`MinCostFlowPropagator`].
    MinCostFlowStatistics {
        num_consistency_calls: u64,
        num_failures: u64,
        num_solves: u64,
        num_augmentations: u64,
        num_removed_arcs: u64,
        num_grounded_arcs: u64,
        num_analyses: u64,
        num_sensitivity_prunings: u64,
        num_unit_cost_prunings: u64,
        num_degree_prunings: u64,
    }
);

/// Propagator for the constraint that a flow exists within the bounds given by the flow
/// variables and the structure variables, whose cost with the unit costs given by the cost
/// variables is at most the cost variable.
///
/// Every call translates the queued variable changes into the network, re-optimises the flow,
/// raises the lower bound of the cost variable to the optimum and prunes. This repeats until
/// pruning does not change any variable of the network.
#[derive(Clone, Debug)]
pub struct MinCostFlowPropagator {
    network: Network,
    cost_variable: DomainId,
    /// The arcs in the order in which they were added to the builder, with the lower bound which
    /// was folded into the supplies for arcs without a companion.
    arcs: Vec<(ArcId, i64)>,
    variables: KeyedVec<LocalId, DomainId>,
    handlers: HashMap<DomainId, VarHandler>,
    queue: VariableQueue,
    /// Whether the network changed since the last time the flow was known to be optimal and
    /// pruned.
    dirty: bool,
    initialised: bool,
    options: MinCostFlowOptions,
}

impl MinCostFlowPropagator {
    pub(crate) fn new(
        network: Network,
        cost_variable: DomainId,
        arcs: Vec<(ArcId, i64)>,
        variables: KeyedVec<LocalId, DomainId>,
        handlers: HashMap<DomainId, VarHandler>,
        options: MinCostFlowOptions,
    ) -> Self {
        MinCostFlowPropagator {
            network,
            cost_variable,
            arcs,
            variables,
            handlers,
            queue: VariableQueue::default(),
            dirty: true,
            initialised: false,
            options,
        }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn cost_variable(&self) -> DomainId {
        self.cost_variable
    }

    /// The forward arc of the network which was created for `arc`.
    pub fn arc(&self, arc: ArcRef) -> ArcId {
        self.arcs[arc.index()].0
    }

    /// The companion of `arc`, if it has variables or a structure binding.
    pub fn companion(&self, arc: ArcRef) -> Option<CompanionId> {
        self.network.graph().arc(self.arc(arc)).companion()
    }

    /// The current flow over `arc`.
    pub fn flow(&self, arc: ArcRef) -> i64 {
        let (arc, folded_lower_bound) = self.arcs[arc.index()];
        folded_lower_bound + self.network.arc_flow(arc)
    }

    pub fn statistics(&self) -> &MinCostFlowStatistics {
        &self.network.statistics
    }

    /// Whether another call to [`Propagator::propagate`] would have to recompute anything.
    pub fn needs_update(&self) -> bool {
        self.dirty || !self.queue.is_empty()
    }

    /// Queues every variable and restricts the flow variables to non-negative values.
    fn initialise(&mut self, context: &mut PropagationContextMut) -> PropagationStatus {
        self.initialised = true;
        for &var in self.variables.iter() {
            self.queue.push(var);
        }

        let mut context = FlowContext::new(context, &mut self.queue);
        for companion in self.network.companion_ids() {
            if let Some(var) = self.network.companion(companion).flow_variable() {
                let _ = context.set_lower_bound(var, 0)?;
            }
        }
        Ok(())
    }

    fn consistency(&mut self, context: &mut PropagationContextMut) -> PropagationStatus {
        let mut context = FlowContext::new(context, &mut self.queue);

        loop {
            while let Some(var) = context.next_variable() {
                if var == self.cost_variable {
                    self.dirty = true;
                }
                if let Some(handler) = self.handlers.get(&var) {
                    self.dirty = true;
                    handler.process_event(var, &mut self.network, &mut context)?;
                }
            }

            if !self.dirty {
                return Ok(());
            }

            let cost_bound = context.upper_bound(self.cost_variable);
            if self.network.needs_update(cost_bound)
                && self.network.solve() == FlowStatus::Infeasible
            {
                log::debug!("no feasible flow at level {}", context.decision_level());
                return Err(Inconsistency::InfeasibleFlow);
            }

            let optimum = self.network.cost();
            if optimum > cost_bound {
                log::debug!("optimal flow costs {optimum} > {cost_bound}");
                return Err(Inconsistency::CostOverflow {
                    optimum,
                    bound: cost_bound,
                });
            }
            let _ = context.set_cost_lower_bound(self.cost_variable, optimum)?;

            self.network.prune(&mut context, cost_bound, &self.options)?;
            self.dirty = false;
            netflow_assert_advanced!(self.network.check_invariants());

            log::debug!(
                "optimal flow costs {optimum} at level {}, pruning {}",
                context.decision_level(),
                if context.has_queued_variables() {
                    "changed variables"
                } else {
                    "reached a fixpoint"
                }
            );

            if !context.has_queued_variables() {
                netflow_assert_advanced!(self.network.is_balanced());
                netflow_assert_advanced!(self.network.check_structure_domains(&context));
                return Ok(());
            }
        }
    }
}

impl Propagator for MinCostFlowPropagator {
    fn name(&self) -> &str {
        "MinCostFlow"
    }

    fn propagate(&mut self, mut context: PropagationContextMut) -> PropagationStatus {
        self.network.synchronise_level(context.decision_level());
        self.network.statistics.num_consistency_calls += 1;

        let mut result = Ok(());
        if !self.initialised {
            result = self.initialise(&mut context);
        }
        if result.is_ok() {
            result = self.consistency(&mut context);
        }

        if result.is_err() {
            self.network.statistics.num_failures += 1;
        }
        result
    }

    fn notify(
        &mut self,
        _domains: Domains,
        local_id: LocalId,
        _events: EnumSet<IntDomainEvent>,
    ) -> EnqueueDecision {
        self.queue.push(self.variables[local_id]);
        EnqueueDecision::Enqueue
    }

    fn synchronise(&mut self, domains: Domains) {
        self.network.backtrack(domains.decision_level(), &domains);
        self.queue.clear();
        self.dirty = true;
    }

    fn log_statistics(&self, statistic_logger: StatisticLogger) {
        self.network.statistics.log(statistic_logger);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::IntervalDomain;
    use crate::engine::PropagatorHandle;
    use crate::propagators::min_cost_flow::FlowBounds;
    use crate::propagators::min_cost_flow::NetworkBuilder;
    use crate::propagators::min_cost_flow::NodeRef;
    use crate::propagators::min_cost_flow::StructureBehaviour;
    use crate::propagators::min_cost_flow::StructureId;
    use crate::propagators::min_cost_flow::UnitCost;
    use crate::Solver;

    fn add_network(
        solver: &mut Solver,
        builder: NetworkBuilder,
        cost: DomainId,
        options: MinCostFlowOptions,
    ) -> Result<PropagatorHandle<MinCostFlowPropagator>, Inconsistency> {
        let constructor = builder.build(cost, options).expect("valid network");
        solver.add_propagator(constructor)
    }

    fn propagator(
        solver: &Solver,
        handle: PropagatorHandle<MinCostFlowPropagator>,
    ) -> &MinCostFlowPropagator {
        solver.get_propagator(handle).expect("propagator exists")
    }

    fn variable_arc(
        builder: &mut NetworkBuilder,
        from: NodeRef,
        to: NodeRef,
        flow: DomainId,
        cost: i64,
    ) -> ArcRef {
        builder
            .add_arc(from, to, FlowBounds::Variable(flow), UnitCost::Fixed(cost))
            .expect("valid arc")
    }

    fn fixed_arc(
        builder: &mut NetworkBuilder,
        from: NodeRef,
        to: NodeRef,
        upper: i64,
        cost: i64,
    ) -> ArcRef {
        builder
            .add_arc(from, to, FlowBounds::Fixed { lower: 0, upper }, UnitCost::Fixed(cost))
            .expect("valid arc")
    }

    /// `s -> a -> t` with unit cost 1 and `s -> b -> t` with unit cost 2, every arc with a flow
    /// variable in `[0, 2]`, and 2 units to send from `s` to `t`.
    fn diamond(solver: &mut Solver) -> (NetworkBuilder, [DomainId; 4]) {
        let flows = [(); 4].map(|_| solver.new_bounded_integer(0, 2));

        let mut builder = NetworkBuilder::default();
        let s = builder.add_node(2);
        let a = builder.add_node(0);
        let b = builder.add_node(0);
        let t = builder.add_node(-2);
        let _ = variable_arc(&mut builder, s, a, flows[0], 1);
        let _ = variable_arc(&mut builder, a, t, flows[1], 1);
        let _ = variable_arc(&mut builder, s, b, flows[2], 2);
        let _ = variable_arc(&mut builder, b, t, flows[3], 2);

        (builder, flows)
    }

    #[derive(Debug, PartialEq, Eq)]
    struct Snapshot {
        balances: Vec<i64>,
        companions: Vec<(i64, i64, bool)>,
        pending: Vec<usize>,
        cost_offset: i64,
    }

    fn snapshot(network: &Network) -> Snapshot {
        let graph = network.graph();
        Snapshot {
            balances: graph
                .node_ids()
                .map(|node| graph.node(node).balance())
                .collect(),
            companions: network
                .companion_ids()
                .map(|companion| {
                    (
                        network.companion(companion).flow_offset(),
                        network.flow_upper_bound(companion),
                        graph.is_live(network.companion(companion).arc()),
                    )
                })
                .collect(),
            pending: network
                .structure_ids()
                .map(|structure| network.structure(structure).num_pending())
                .collect(),
            cost_offset: network.cost_offset(),
        }
    }

    #[test]
    fn a_single_arc_without_supply_only_bounds_the_cost() {
        let mut solver = Solver::default();
        let flow = solver.new_bounded_integer(0, 5);
        let cost = solver.new_bounded_integer(0, 10);

        let mut builder = NetworkBuilder::default();
        let a = builder.add_node(0);
        let b = builder.add_node(0);
        let _ = variable_arc(&mut builder, a, b, flow, 1);

        let options = MinCostFlowOptions {
            degree_pruning: false,
            ..Default::default()
        };
        let handle = add_network(&mut solver, builder, cost, options).expect("feasible");

        assert_eq!(0, solver.lower_bound(cost));
        assert_eq!(0, solver.lower_bound(flow));
        assert_eq!(5, solver.upper_bound(flow));
        assert!(!propagator(&solver, handle).needs_update());
    }

    #[test]
    fn a_node_with_one_arc_fixes_its_flow() {
        let mut solver = Solver::default();
        let flow = solver.new_bounded_integer(0, 5);
        let cost = solver.new_bounded_integer(0, 10);

        let mut builder = NetworkBuilder::default();
        let a = builder.add_node(0);
        let b = builder.add_node(0);
        let _ = variable_arc(&mut builder, a, b, flow, 1);

        let handle = add_network(&mut solver, builder, cost, MinCostFlowOptions::default())
            .expect("feasible");

        assert!(solver.is_fixed(flow));
        assert_eq!(0, solver.lower_bound(flow));
        assert_eq!(1, propagator(&solver, handle).statistics().num_removed_arcs);
    }

    #[test]
    fn fixing_a_flow_moves_its_cost_into_the_offset() {
        let mut solver = Solver::default();
        let flow = solver.new_bounded_integer(0, 5);
        let cost = solver.new_bounded_integer(0, 100);

        let mut builder = NetworkBuilder::default();
        let a = builder.add_node(0);
        let b = builder.add_node(0);
        let arc = variable_arc(&mut builder, a, b, flow, 2);
        let back = fixed_arc(&mut builder, b, a, 5, 0);

        let handle = add_network(&mut solver, builder, cost, MinCostFlowOptions::default())
            .expect("feasible");
        assert_eq!(0, solver.lower_bound(cost));
        let before = snapshot(propagator(&solver, handle).network());

        solver.new_decision_level();
        let _ = solver.post_assignment(flow, 3).expect("in the domain");
        solver.propagate().expect("feasible");

        let propagator = propagator(&solver, handle);
        let network = propagator.network();
        assert!(!network.graph().is_live(propagator.arc(arc)));
        assert_eq!(6, network.cost_offset());
        assert_eq!(6, network.cost());
        assert_eq!(3, propagator.flow(arc));
        assert_eq!(3, propagator.flow(back));
        assert_eq!(6, solver.lower_bound(cost));

        solver.backtrack(0);

        let network = self::propagator(&solver, handle).network();
        assert!(network.check_invariants());
        assert_eq!(before, snapshot(network));
    }

    #[test]
    fn backtracking_restores_removed_and_modified_arcs() {
        let mut solver = Solver::default();
        let (builder, flows) = diamond(&mut solver);
        let cost = solver.new_bounded_integer(0, 100);

        let handle = add_network(&mut solver, builder, cost, MinCostFlowOptions::default())
            .expect("feasible");
        assert_eq!(4, solver.lower_bound(cost));
        let before = snapshot(propagator(&solver, handle).network());

        solver.new_decision_level();
        let _ = solver.post_upper_bound(flows[0], 1).expect("in the domain");
        solver.propagate().expect("feasible");
        solver.new_decision_level();
        let _ = solver.post_assignment(flows[2], 1).expect("in the domain");
        solver.propagate().expect("feasible");

        for flow in flows {
            assert_eq!(1, solver.lower_bound(flow));
            assert_eq!(1, solver.upper_bound(flow));
        }
        assert_eq!(6, solver.lower_bound(cost));
        assert!(propagator(&solver, handle).statistics().num_removed_arcs >= 2);

        solver.backtrack(1);
        let network = propagator(&solver, handle).network();
        assert!(network.check_invariants());
        assert_eq!(1, network.flow_upper_bound(CompanionId(0)));

        solver.backtrack(0);
        let network = propagator(&solver, handle).network();
        assert!(network.check_invariants());
        assert_eq!(before, snapshot(network));
    }

    /// A writer whose output can be read back after it was handed to the statistic sink.
    #[derive(Clone, Default)]
    struct SharedBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("not poisoned").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn statistics_are_written_to_the_configured_sink() {
        use crate::statistics::configure_statistic_logging;
        use crate::statistics::StatisticOptions;

        let buffer = SharedBuffer::default();
        assert!(configure_statistic_logging(
            StatisticOptions::new("%%")
                .with_closing_line("%% end")
                .with_writer(buffer.clone())
        ));

        let mut solver = Solver::default();
        let (builder, _) = diamond(&mut solver);
        let cost = solver.new_bounded_integer(0, 20);
        let handle = add_network(&mut solver, builder, cost, MinCostFlowOptions::default())
            .expect("feasible");
        let num_solves = propagator(&solver, handle).statistics().num_solves;
        assert!(num_solves > 0);

        solver.log_statistics();

        let output = String::from_utf8(buffer.0.lock().expect("not poisoned").clone())
            .expect("statistics are utf-8");
        let lines = output.lines().collect::<Vec<_>>();
        assert!(lines.contains(&format!("%% MinCostFlow_0_num_solves={num_solves}").as_str()));
        assert!(lines.contains(&"%% MinCostFlow_0_num_failures=0"));
        assert!(lines
            .iter()
            .any(|line| line.starts_with("%% solver_num_propagator_calls=")));
        assert_eq!(Some(&"%% end"), lines.last());
    }

    #[test]
    fn the_cost_slack_bounds_how_far_flow_can_be_rerouted() {
        let mut solver = Solver::default();
        let (builder, flows) = diamond(&mut solver);
        let cost = solver.new_bounded_integer(0, 6);

        let options = MinCostFlowOptions {
            degree_pruning: false,
            ..Default::default()
        };
        let handle = add_network(&mut solver, builder, cost, options).expect("feasible");

        // Every unit moved from the route over `a` to the route over `b` costs 2.
        assert_eq!(4, solver.lower_bound(cost));
        assert_eq!((1, 2), (solver.lower_bound(flows[0]), solver.upper_bound(flows[0])));
        assert_eq!((1, 2), (solver.lower_bound(flows[1]), solver.upper_bound(flows[1])));
        assert_eq!((0, 1), (solver.lower_bound(flows[2]), solver.upper_bound(flows[2])));
        assert_eq!((0, 1), (solver.lower_bound(flows[3]), solver.upper_bound(flows[3])));
        assert!(propagator(&solver, handle).statistics().num_sensitivity_prunings > 0);
    }

    #[test]
    fn without_cost_slack_the_optimal_flow_is_forced() {
        let mut solver = Solver::default();
        let (builder, flows) = diamond(&mut solver);
        let cost = solver.new_bounded_integer(0, 5);

        let options = MinCostFlowOptions {
            degree_pruning: false,
            ..Default::default()
        };
        let _ = add_network(&mut solver, builder, cost, options).expect("feasible");

        assert_eq!(4, solver.lower_bound(cost));
        assert_eq!(
            vec![2, 2, 0, 0],
            flows.iter().map(|&flow| solver.lower_bound(flow)).collect::<Vec<_>>()
        );
        assert!(flows.iter().all(|&flow| solver.is_fixed(flow)));
    }

    #[test]
    fn an_optimum_above_the_cost_bound_fails() {
        let mut solver = Solver::default();
        let (builder, _) = diamond(&mut solver);
        let cost = solver.new_bounded_integer(0, 3);

        let result = add_network(&mut solver, builder, cost, MinCostFlowOptions::default());

        assert_eq!(
            Some(Inconsistency::CostOverflow {
                optimum: 4,
                bound: 3
            }),
            result.err()
        );
    }

    #[test]
    fn a_supply_which_cannot_be_routed_fails() {
        let mut solver = Solver::default();
        let cost = solver.new_bounded_integer(0, 100);

        let mut builder = NetworkBuilder::default();
        let s = builder.add_node(5);
        let t = builder.add_node(-5);
        let _ = fixed_arc(&mut builder, s, t, 2, 1);
        let _ = fixed_arc(&mut builder, s, t, 2, 3);

        let result = add_network(&mut solver, builder, cost, MinCostFlowOptions::default());

        assert_eq!(Some(Inconsistency::InfeasibleFlow), result.err());
    }

    #[test]
    fn lowering_the_cost_bound_tightens_the_flows() {
        let mut solver = Solver::default();
        let (builder, flows) = diamond(&mut solver);
        let cost = solver.new_bounded_integer(0, 100);

        let options = MinCostFlowOptions {
            degree_pruning: false,
            ..Default::default()
        };
        let handle = add_network(&mut solver, builder, cost, options).expect("feasible");
        assert_eq!(2, solver.upper_bound(flows[2]));

        solver.new_decision_level();
        let _ = solver.post_upper_bound(cost, 6).expect("in the domain");
        solver.propagate().expect("feasible");

        assert_eq!(4, solver.lower_bound(cost));
        assert_eq!(1, solver.upper_bound(flows[2]));
        assert!(!propagator(&solver, handle).needs_update());
    }

    #[test]
    fn the_unit_cost_is_bounded_by_the_cost_slack() {
        let mut solver = Solver::default();
        let flow = solver.new_bounded_integer(2, 5);
        let unit_cost = solver.new_bounded_integer(1, 10);
        let cost = solver.new_bounded_integer(0, 8);

        let mut builder = NetworkBuilder::default();
        let s = builder.add_node(2);
        let t = builder.add_node(-2);
        let _ = builder
            .add_arc(s, t, FlowBounds::Variable(flow), UnitCost::Variable(unit_cost))
            .expect("valid arc");

        let handle = add_network(&mut solver, builder, cost, MinCostFlowOptions::default())
            .expect("feasible");

        // 2 units at a unit cost of at most 1 + (8 - 2) / 2.
        assert_eq!(2, solver.lower_bound(cost));
        assert!(solver.is_fixed(flow));
        assert_eq!(4, solver.upper_bound(unit_cost));

        solver.new_decision_level();
        let _ = solver.post_lower_bound(unit_cost, 3).expect("in the domain");
        solver.propagate().expect("feasible");

        assert_eq!(6, solver.lower_bound(cost));
        assert_eq!(6, propagator(&solver, handle).network().cost_offset());

        solver.backtrack(0);

        let network = propagator(&solver, handle).network();
        assert_eq!(2, network.cost_offset());
        assert_eq!(2, network.cost());
        assert!(network.check_invariants());
    }

    #[test]
    fn cost_bounds_near_the_maximum_with_a_negative_optimum() {
        for (cost_lower_bound, expected) in [(0, 0), (-100, -4)] {
            let mut solver = Solver::default();
            let flow = solver.new_bounded_integer(1, 1);
            let unit_cost = solver.new_bounded_integer(1, 4);
            let cost = solver.new_bounded_integer(cost_lower_bound, i64::MAX);

            let mut builder = NetworkBuilder::default();
            let s = builder.add_node(2);
            let t = builder.add_node(-2);
            let _ = builder
                .add_arc(
                    s,
                    t,
                    FlowBounds::Fixed { lower: 1, upper: 1 },
                    UnitCost::Fixed(-5),
                )
                .expect("valid arc");
            let _ = builder
                .add_arc(s, t, FlowBounds::Variable(flow), UnitCost::Variable(unit_cost))
                .expect("valid arc");

            let handle = add_network(&mut solver, builder, cost, MinCostFlowOptions::default())
                .expect("feasible");

            assert_eq!(expected, solver.lower_bound(cost));
            assert_eq!(i64::MAX, solver.upper_bound(cost));
            assert_eq!(4, solver.upper_bound(unit_cost));
            assert_eq!(-4, propagator(&solver, handle).network().cost());
        }
    }

    /// Three parallel arcs from `s` to `t` with unit costs 1, 2 and 3, selected by the values 1, 2
    /// and 3 of the returned structure variable.
    fn parallel_arcs(
        solver: &mut Solver,
        behaviour: StructureBehaviour,
    ) -> (NetworkBuilder, DomainId) {
        let selector = solver.new_bounded_integer(1, 3);

        let mut builder = NetworkBuilder::default();
        let s = builder.add_node(1);
        let t = builder.add_node(-1);
        let arcs = [1, 2, 3].map(|cost| fixed_arc(&mut builder, s, t, 1, cost));
        builder
            .add_structure(
                selector,
                behaviour,
                arcs.into_iter()
                    .zip(1..)
                    .map(|(arc, value)| (arc, IntervalDomain::singleton(value))),
            )
            .expect("valid structure");

        (builder, selector)
    }

    fn grounded_after_selecting_the_first_arc(behaviour: StructureBehaviour) -> Vec<CompanionId> {
        let mut solver = Solver::default();
        let (builder, selector) = parallel_arcs(&mut solver, behaviour);
        let cost = solver.new_bounded_integer(0, 10);

        let handle = add_network(&mut solver, builder, cost, MinCostFlowOptions::default())
            .expect("feasible");
        assert_eq!(1, solver.lower_bound(cost));
        assert_eq!(3, solver.domain(selector).size());

        solver.new_decision_level();
        let _ = solver.post_assignment(selector, 1).expect("in the domain");
        solver.propagate().expect("feasible");
        assert_eq!(1, solver.lower_bound(cost));

        let network = propagator(&solver, handle).network();
        assert!(network.check_invariants());
        network
            .structure(StructureId(0))
            .grounded()
            .collect::<Vec<_>>()
    }

    #[test]
    fn selecting_a_value_grounds_the_arcs_of_the_structure() {
        assert_eq!(
            vec![CompanionId(2), CompanionId(1), CompanionId(0)],
            grounded_after_selecting_the_first_arc(StructureBehaviour::PruneBoth)
        );
        assert_eq!(
            vec![CompanionId(0)],
            grounded_after_selecting_the_first_arc(StructureBehaviour::PruneActive)
        );
        assert_eq!(
            vec![CompanionId(2), CompanionId(1)],
            grounded_after_selecting_the_first_arc(StructureBehaviour::PruneInactive)
        );
    }

    #[test]
    fn a_tight_cost_bound_selects_the_cheapest_arc() {
        let mut solver = Solver::default();
        let (builder, selector) = parallel_arcs(&mut solver, StructureBehaviour::PruneBoth);
        let cost = solver.new_bounded_integer(0, 1);

        let handle = add_network(&mut solver, builder, cost, MinCostFlowOptions::default())
            .expect("feasible");

        assert!(solver.is_fixed(selector));
        assert_eq!(1, solver.lower_bound(selector));
        assert_eq!(
            0,
            propagator(&solver, handle)
                .network()
                .structure(StructureId(0))
                .num_pending()
        );
    }

    #[test]
    fn fixing_the_flow_of_a_structure_arc_grounds_it() {
        let mut solver = Solver::default();
        let selector = solver.new_bounded_integer(1, 2);
        let flows = [(); 2].map(|_| solver.new_bounded_integer(0, 1));
        let cost = solver.new_bounded_integer(0, 10);

        let mut builder = NetworkBuilder::default();
        let s = builder.add_node(0);
        let t = builder.add_node(0);
        let first = variable_arc(&mut builder, s, t, flows[0], 1);
        let second = variable_arc(&mut builder, s, t, flows[1], 2);
        let _ = fixed_arc(&mut builder, t, s, 1, 0);
        builder
            .add_structure(
                selector,
                StructureBehaviour::PruneBoth,
                [
                    (first, IntervalDomain::singleton(1)),
                    (second, IntervalDomain::singleton(2)),
                ],
            )
            .expect("valid structure");

        let handle = add_network(&mut solver, builder, cost, MinCostFlowOptions::default())
            .expect("feasible");
        assert_eq!(0, solver.lower_bound(cost));
        let before = snapshot(propagator(&solver, handle).network());
        assert_eq!(vec![2], before.pending);

        solver.new_decision_level();
        let _ = solver.post_assignment(flows[0], 1).expect("in the domain");
        solver.propagate().expect("feasible");

        assert!(solver.is_fixed(selector));
        assert_eq!(1, solver.lower_bound(selector));
        assert_eq!(0, solver.upper_bound(flows[1]));
        assert_eq!(1, solver.lower_bound(cost));

        let network = propagator(&solver, handle).network();
        let binding = network.structure(StructureId(0));
        assert_eq!(0, binding.num_pending());
        assert_eq!(
            vec![CompanionId(0), CompanionId(1)],
            binding.grounded().collect::<Vec<_>>()
        );
        assert!(network.check_invariants());
        assert!(network.is_balanced());
        assert!(network.check_structure_domains(&solver.domains()));

        solver.backtrack(0);

        let network = propagator(&solver, handle).network();
        assert!(network.check_invariants());
        assert!(network.check_structure_domains(&solver.domains()));
        assert_eq!(before, snapshot(network));
    }

    #[test]
    fn structures_are_ungrounded_in_reverse_order_across_levels() {
        let mut solver = Solver::default();
        let first = solver.new_bounded_integer(1, 2);
        let second = solver.new_bounded_integer(1, 2);
        let cost = solver.new_bounded_integer(0, 100);

        let mut builder = NetworkBuilder::default();
        let s = builder.add_node(2);
        let t = builder.add_node(-2);
        for selector in [first, second] {
            let arcs = [1, 2].map(|cost| fixed_arc(&mut builder, s, t, 1, cost));
            builder
                .add_structure(
                    selector,
                    StructureBehaviour::PruneBoth,
                    [
                        (arcs[0], IntervalDomain::singleton(1)),
                        (arcs[1], IntervalDomain::singleton(2)),
                    ],
                )
                .expect("valid structure");
        }

        let handle = add_network(&mut solver, builder, cost, MinCostFlowOptions::default())
            .expect("feasible");
        assert_eq!(2, solver.lower_bound(cost));
        let before = snapshot(propagator(&solver, handle).network());

        solver.new_decision_level();
        let _ = solver.post_assignment(first, 2).expect("in the domain");
        solver.propagate().expect("feasible");
        solver.new_decision_level();
        let _ = solver.post_assignment(second, 2).expect("in the domain");
        solver.propagate().expect("feasible");
        solver.new_decision_level();

        assert_eq!(4, solver.lower_bound(cost));
        let after_grounding = snapshot(propagator(&solver, handle).network());
        assert_eq!(vec![0, 0], after_grounding.pending);

        solver.backtrack(1);
        let network = propagator(&solver, handle).network();
        assert!(network.check_invariants());
        assert_eq!(vec![0, 2], snapshot(network).pending);

        solver.backtrack(0);
        let network = propagator(&solver, handle).network();
        assert!(network.check_invariants());
        assert_eq!(before, snapshot(network));
    }
}
