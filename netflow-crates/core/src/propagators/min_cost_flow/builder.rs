use thiserror::Error;

use super::arc_companion::StructureLink;
use super::handler::Handler;
use super::handler::VarHandler;
use super::structure::StructureEntry;
use super::ArcCompanion;
use super::CompanionId;
use super::MinCostFlowOptions;
use super::MinCostFlowPropagator;
use super::Network;
use super::StructureBehaviour;
use super::StructureBinding;
use super::StructureId;
use crate::containers::HashMap;
use crate::containers::KeyedVec;
use crate::engine::DomainEvents;
use crate::engine::DomainId;
use crate::engine::IntervalDomain;
use crate::engine::LocalId;
use crate::engine::PropagatorConstructor;
use crate::engine::PropagatorConstructorContext;
use crate::engine::ReadDomains;
use crate::flow::FlowGraph;
use crate::flow::NodeId;
use crate::netflow_assert_moderate;
use crate::netflow_assert_simple;

/// A node added to a [`NetworkBuilder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeRef(usize);

impl NodeRef {
    pub fn index(self) -> usize {
        self.0
    }
}

/// An arc added to a [`NetworkBuilder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ArcRef(usize);

impl ArcRef {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The range of flow an arc may carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowBounds {
    Fixed { lower: i64, upper: i64 },
    /// The flow is the value of the variable.
    Variable(DomainId),
}

/// The cost of one unit of flow over an arc.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitCost {
    Fixed(i64),
    /// The unit cost is the value of the variable.
    Variable(DomainId),
}

/// Reasons why a network cannot be built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum NetworkBuildError {
    #[error("node {0} does not exist")]
    UnknownNode(usize),
    #[error("arc {0} does not exist")]
    UnknownArc(usize),
    #[error("arc from node {0} to itself")]
    SelfLoop(usize),
    #[error("the flow bounds [{lower}, {upper}] are empty")]
    EmptyFlowBounds { lower: i64, upper: i64 },
    #[error("the flow bounds [{lower}, {upper}] allow a negative flow")]
    NegativeFlowBounds { lower: i64, upper: i64 },
    #[error("arc {0} is bound to more than one structure variable")]
    ArcInTwoStructures(usize),
    #[error("the cost variable {0} is also a variable of the network")]
    CostVariableInNetwork(DomainId),
}

#[derive(Clone, Debug)]
struct ArcSpecification {
    from: NodeRef,
    to: NodeRef,
    bounds: FlowBounds,
    cost: UnitCost,
    in_structure: bool,
}

#[derive(Clone, Debug)]
struct StructureSpecification {
    variable: DomainId,
    behaviour: StructureBehaviour,
    arcs: Vec<(ArcRef, IntervalDomain)>,
}

/// Describes a flow network over integer variables, from which a [`MinCostFlowConstructor`] is
/// built.
///
/// # Example
/// ```rust
/// # use netflow_core::Solver;
/// # use netflow_core::propagators::min_cost_flow::*;
/// let mut solver = Solver::default();
/// let flow = solver.new_bounded_integer(0, 5);
/// let cost = solver.new_bounded_integer(0, 100);
///
/// let mut builder = NetworkBuilder::default();
/// let source = builder.add_node(2);
/// let sink = builder.add_node(-2);
/// let _ = builder
///     .add_arc(source, sink, FlowBounds::Variable(flow), UnitCost::Fixed(3))
///     .expect("valid arc");
///
/// let constructor = builder
///     .build(cost, MinCostFlowOptions::default())
///     .expect("valid network");
/// let _ = solver
///     .add_propagator(constructor)
///     .expect("a feasible flow exists");
///
/// assert_eq!(2, solver.lower_bound(flow));
/// assert_eq!(6, solver.lower_bound(cost));
/// ```
#[derive(Clone, Debug, Default)]
pub struct NetworkBuilder {
    supplies: Vec<i64>,
    arcs: Vec<ArcSpecification>,
    structures: Vec<StructureSpecification>,
}

impl NetworkBuilder {
    /// Adds a node which has to send `supply` units more than it receives; a negative supply is
    /// a demand.
    pub fn add_node(&mut self, supply: i64) -> NodeRef {
        self.supplies.push(supply);
        NodeRef(self.supplies.len() - 1)
    }

    pub fn add_arc(
        &mut self,
        from: NodeRef,
        to: NodeRef,
        bounds: FlowBounds,
        cost: UnitCost,
    ) -> Result<ArcRef, NetworkBuildError> {
        for node in [from, to] {
            if node.0 >= self.supplies.len() {
                return Err(NetworkBuildError::UnknownNode(node.0));
            }
        }
        if from == to {
            return Err(NetworkBuildError::SelfLoop(from.0));
        }
        if let FlowBounds::Fixed { lower, upper } = bounds {
            if lower > upper {
                return Err(NetworkBuildError::EmptyFlowBounds { lower, upper });
            }
            if lower < 0 {
                return Err(NetworkBuildError::NegativeFlowBounds { lower, upper });
            }
        }

        self.arcs.push(ArcSpecification {
            from,
            to,
            bounds,
            cost,
            in_structure: false,
        });
        Ok(ArcRef(self.arcs.len() - 1))
    }

    /// Binds `arcs` to `variable`: an arc is selected, i.e. carries the upper bound of its flow,
    /// when the variable takes a value in its sub-domain, and carries the lower bound of its
    /// flow otherwise. `behaviour` decides which of the two implications are enforced.
    pub fn add_structure(
        &mut self,
        variable: DomainId,
        behaviour: StructureBehaviour,
        arcs: impl IntoIterator<Item = (ArcRef, IntervalDomain)>,
    ) -> Result<(), NetworkBuildError> {
        let arcs = arcs.into_iter().collect::<Vec<_>>();

        for (position, (arc, _)) in arcs.iter().enumerate() {
            let Some(specification) = self.arcs.get(arc.0) else {
                return Err(NetworkBuildError::UnknownArc(arc.0));
            };
            let repeated = arcs[..position].iter().any(|(other, _)| other == arc);
            if specification.in_structure || repeated {
                return Err(NetworkBuildError::ArcInTwoStructures(arc.0));
            }
        }

        for (arc, _) in &arcs {
            self.arcs[arc.0].in_structure = true;
        }
        self.structures.push(StructureSpecification {
            variable,
            behaviour,
            arcs,
        });
        Ok(())
    }

    /// Finishes the network. The flow over the network has to cost at most `cost_variable`.
    pub fn build(
        self,
        cost_variable: DomainId,
        options: MinCostFlowOptions,
    ) -> Result<MinCostFlowConstructor, NetworkBuildError> {
        let in_network = self.arcs.iter().any(|arc| {
            arc.bounds == FlowBounds::Variable(cost_variable)
                || arc.cost == UnitCost::Variable(cost_variable)
        }) || self
            .structures
            .iter()
            .any(|structure| structure.variable == cost_variable);
        if in_network {
            return Err(NetworkBuildError::CostVariableInNetwork(cost_variable));
        }

        Ok(MinCostFlowConstructor {
            builder: self,
            cost_variable,
            options,
        })
    }
}

/// Creates a [`MinCostFlowPropagator`]; has to be added to the solver at the root.
#[derive(Clone, Debug)]
pub struct MinCostFlowConstructor {
    builder: NetworkBuilder,
    cost_variable: DomainId,
    options: MinCostFlowOptions,
}

impl PropagatorConstructor for MinCostFlowConstructor {
    type PropagatorImpl = MinCostFlowPropagator;

    fn create(self, mut context: PropagatorConstructorContext) -> Self::PropagatorImpl {
        let domains = context.domains();
        netflow_assert_simple!(
            domains.decision_level() == 0,
            "a network is created below the root"
        );

        let mut graph = FlowGraph::default();
        let nodes = self
            .builder
            .supplies
            .iter()
            .map(|&supply| graph.add_node(supply))
            .collect::<Vec<NodeId>>();

        let mut companions: KeyedVec<CompanionId, ArcCompanion> = KeyedVec::default();
        let mut arcs = Vec::with_capacity(self.builder.arcs.len());
        let mut fixed_cost = 0;
        for specification in &self.builder.arcs {
            let (lower, upper, flow_variable) = match specification.bounds {
                FlowBounds::Fixed { lower, upper } => (lower, upper, None),
                FlowBounds::Variable(var) => {
                    let lower = domains.lower_bound(var).max(0);
                    (lower, domains.upper_bound(var).max(lower), Some(var))
                }
            };
            let (cost, cost_variable) = match specification.cost {
                UnitCost::Fixed(cost) => (cost, None),
                UnitCost::Variable(var) => (domains.lower_bound(var), Some(var)),
            };

            let tail = nodes[specification.from.0];
            let head = nodes[specification.to.0];
            let arc = graph.add_arc_pair(tail, head, upper - lower, cost);
            graph.shift_balance(tail, -lower);
            graph.shift_balance(head, lower);

            let mut folded_lower_bound = 0;
            if flow_variable.is_some() || cost_variable.is_some() || specification.in_structure {
                let companion = companions.push(ArcCompanion {
                    arc,
                    flow_offset: lower,
                    flow_variable,
                    cost_variable,
                    structure: None,
                });
                graph.arcs[arc].companion = Some(companion);
                graph.arcs[arc.sister()].companion = Some(companion);
            } else {
                fixed_cost += lower * cost;
                folded_lower_bound = lower;
            }

            graph.restore_optimality_conditions(arc);
            arcs.push((arc, folded_lower_bound));
        }

        let mut structures: KeyedVec<StructureId, StructureBinding> = KeyedVec::default();
        for specification in &self.builder.structures {
            let structure = structures.next_key();
            let mut entries = Vec::with_capacity(specification.arcs.len());
            for (local_id, (arc, sub_domain)) in specification.arcs.iter().enumerate() {
                let (arc, _) = arcs[arc.0];
                let companion = graph.arc(arc).companion();
                netflow_assert_moderate!(
                    companion.is_some(),
                    "arcs in a structure have a companion"
                );
                let Some(companion) = companion else {
                    continue;
                };
                companions[companion].structure = Some(StructureLink {
                    structure,
                    local_id,
                });

                let inactive_flow = companions[companion].flow_offset;
                entries.push(StructureEntry {
                    companion,
                    sub_domain: sub_domain.clone(),
                    inactive_flow,
                    active_flow: inactive_flow + graph.total_capacity(arc),
                });
            }

            let _ = structures.push(StructureBinding {
                variable: specification.variable,
                behaviour: specification.behaviour,
                not_grounded: entries.len(),
                entries,
            });
        }

        let mut handlers: HashMap<DomainId, VarHandler> = HashMap::default();
        let mut events: HashMap<DomainId, DomainEvents> = HashMap::default();
        let _ = events.insert(self.cost_variable, DomainEvents::UPPER_BOUND);
        for companion in companions.keys() {
            let entry = &companions[companion];
            for var in [entry.flow_variable, entry.cost_variable].into_iter().flatten() {
                attach(&mut handlers, var, Handler::Companion(companion));
                widen(&mut events, var, DomainEvents::BOUNDS);
            }
        }
        for structure in structures.keys() {
            let var = structures[structure].variable;
            attach(&mut handlers, var, Handler::Structure(structure));
            widen(&mut events, var, DomainEvents::ANY_INT);
        }

        let mut registered = events.into_iter().collect::<Vec<_>>();
        registered.sort_by_key(|&(var, _)| var);
        let mut variables: KeyedVec<LocalId, DomainId> = KeyedVec::default();
        for (var, domain_events) in registered {
            let local_id = variables.push(var);
            context.register(var, domain_events, local_id);
        }

        log::debug!(
            "network with {} nodes, {} arcs, {} companions and {} structures",
            nodes.len(),
            arcs.len(),
            companions.len(),
            structures.len()
        );

        MinCostFlowPropagator::new(
            Network::new(graph, companions, structures, fixed_cost),
            self.cost_variable,
            arcs,
            variables,
            handlers,
            self.options,
        )
    }
}

fn attach(handlers: &mut HashMap<DomainId, VarHandler>, var: DomainId, handler: Handler) {
    let _ = handlers
        .entry(var)
        .and_modify(|existing| existing.push(handler))
        .or_insert(VarHandler::Single(handler));
}

/// Subscribes `var` to `domain_events` on top of what it is subscribed to already.
fn widen(events: &mut HashMap<DomainId, DomainEvents>, var: DomainId, domain_events: DomainEvents) {
    let current = events.entry(var).or_insert(domain_events);
    if *current == DomainEvents::UPPER_BOUND || domain_events == DomainEvents::ANY_INT {
        *current = domain_events;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Solver;

    #[test]
    fn invalid_arcs_are_rejected() {
        let mut builder = NetworkBuilder::default();
        let a = builder.add_node(0);
        let b = builder.add_node(0);

        assert_eq!(
            Err(NetworkBuildError::SelfLoop(0)),
            builder.add_arc(a, a, FlowBounds::Fixed { lower: 0, upper: 1 }, UnitCost::Fixed(0))
        );
        assert_eq!(
            Err(NetworkBuildError::UnknownNode(7)),
            builder.add_arc(
                a,
                NodeRef(7),
                FlowBounds::Fixed { lower: 0, upper: 1 },
                UnitCost::Fixed(0)
            )
        );
        assert_eq!(
            Err(NetworkBuildError::EmptyFlowBounds { lower: 2, upper: 1 }),
            builder.add_arc(a, b, FlowBounds::Fixed { lower: 2, upper: 1 }, UnitCost::Fixed(0))
        );
        assert_eq!(
            Err(NetworkBuildError::NegativeFlowBounds { lower: -1, upper: 1 }),
            builder.add_arc(a, b, FlowBounds::Fixed { lower: -1, upper: 1 }, UnitCost::Fixed(0))
        );
    }

    #[test]
    fn an_arc_belongs_to_at_most_one_structure() {
        let mut solver = Solver::default();
        let first = solver.new_bounded_integer(0, 1);
        let second = solver.new_bounded_integer(0, 1);

        let mut builder = NetworkBuilder::default();
        let a = builder.add_node(0);
        let b = builder.add_node(0);
        let arc = builder
            .add_arc(a, b, FlowBounds::Fixed { lower: 0, upper: 1 }, UnitCost::Fixed(1))
            .expect("valid arc");

        assert_eq!(
            Ok(()),
            builder.add_structure(
                first,
                StructureBehaviour::PruneBoth,
                [(arc, IntervalDomain::singleton(1))]
            )
        );
        assert_eq!(
            Err(NetworkBuildError::ArcInTwoStructures(0)),
            builder.add_structure(
                second,
                StructureBehaviour::PruneBoth,
                [(arc, IntervalDomain::singleton(1))]
            )
        );
        assert_eq!(
            Err(NetworkBuildError::UnknownArc(3)),
            builder.add_structure(
                second,
                StructureBehaviour::PruneBoth,
                [(ArcRef(3), IntervalDomain::singleton(1))]
            )
        );
    }

    #[test]
    fn the_cost_variable_cannot_be_part_of_the_network() {
        let mut solver = Solver::default();
        let cost = solver.new_bounded_integer(0, 10);

        let mut builder = NetworkBuilder::default();
        let a = builder.add_node(0);
        let b = builder.add_node(0);
        let _ = builder
            .add_arc(a, b, FlowBounds::Fixed { lower: 0, upper: 1 }, UnitCost::Variable(cost))
            .expect("valid arc");

        assert_eq!(
            Some(NetworkBuildError::CostVariableInNetwork(cost)),
            builder.build(cost, MinCostFlowOptions::default()).err()
        );
    }

    #[test]
    fn fixed_lower_bounds_are_folded_into_the_cost() {
        let mut solver = Solver::default();
        let cost = solver.new_bounded_integer(0, 100);

        let mut builder = NetworkBuilder::default();
        let a = builder.add_node(0);
        let b = builder.add_node(0);
        let _ = builder
            .add_arc(a, b, FlowBounds::Fixed { lower: 2, upper: 2 }, UnitCost::Fixed(3))
            .expect("valid arc");
        let _ = builder
            .add_arc(b, a, FlowBounds::Fixed { lower: 0, upper: 5 }, UnitCost::Fixed(1))
            .expect("valid arc");

        let constructor = builder
            .build(cost, MinCostFlowOptions::default())
            .expect("valid network");
        let handle = solver.add_propagator(constructor).expect("feasible");
        let propagator = solver.get_propagator(handle).expect("propagator exists");

        assert_eq!(6, propagator.network().cost_offset());
        assert_eq!(2, propagator.flow(ArcRef(0)));
        assert_eq!(2, propagator.flow(ArcRef(1)));
        assert_eq!(8, solver.lower_bound(cost));
    }
}
