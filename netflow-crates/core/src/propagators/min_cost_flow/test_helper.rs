//! Networks for the unit tests of the network maintenance, built without a solver.
use super::ArcCompanion;
use super::CompanionId;
use super::Network;
use crate::containers::KeyedVec;
use crate::containers::StorageKey;
use crate::flow::FlowGraph;
use crate::flow::NodeId;

/// Two nodes without supply and one arc from the first to the second with flow bounds
/// `[lower, upper]` and unit cost `cost`, whose companion has no variables.
pub(crate) fn single_arc_network(lower: i64, upper: i64, cost: i64) -> Network {
    let mut graph = FlowGraph::default();
    let tail = graph.add_node(0);
    let head = graph.add_node(0);
    let arc = graph.add_arc_pair(tail, head, upper - lower, cost);
    graph.shift_balance(tail, -lower);
    graph.shift_balance(head, lower);

    let mut companions: KeyedVec<CompanionId, ArcCompanion> = KeyedVec::default();
    let companion = companions.push(ArcCompanion {
        arc,
        flow_offset: lower,
        flow_variable: None,
        cost_variable: None,
        structure: None,
    });
    graph.arcs[arc].companion = Some(companion);
    graph.arcs[arc.sister()].companion = Some(companion);

    Network::new(graph, companions, KeyedVec::default(), 0)
}

pub(crate) fn node(index: usize) -> NodeId {
    NodeId::create_from_index(index)
}
