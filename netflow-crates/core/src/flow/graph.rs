use std::fmt::Display;
use std::fmt::Formatter;

use crate::containers::KeyedVec;
use crate::containers::StorageKey;
use crate::netflow_assert_moderate;
use crate::netflow_assert_simple;
use crate::propagators::min_cost_flow::CompanionId;

/// A node of the flow network.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl StorageKey for NodeId {
    fn index(&self) -> usize {
        self.0 as usize
    }

    fn create_from_index(index: usize) -> Self {
        NodeId(index as u32)
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// An arc of the flow network. Arcs come in pairs: the forward arc has an even id and its sister,
/// which carries the reverse residual capacity, has the next odd id.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ArcId(pub(crate) u32);

impl ArcId {
    pub fn sister(self) -> ArcId {
        ArcId(self.0 ^ 1)
    }

    pub fn is_forward(self) -> bool {
        self.0 & 1 == 0
    }

    /// The forward arc of the pair this arc belongs to.
    pub fn forward(self) -> ArcId {
        ArcId(self.0 & !1)
    }
}

impl StorageKey for ArcId {
    fn index(&self) -> usize {
        self.0 as usize
    }

    fn create_from_index(index: usize) -> Self {
        ArcId(index as u32)
    }
}

impl Display for ArcId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_forward() {
            write!(f, "a{}", self.0 / 2)
        } else {
            write!(f, "a{}'", self.0 / 2)
        }
    }
}

/// Whether an arc pair currently takes part in the network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArcIndex {
    /// The forward arc is at this position of the list of live arcs.
    Live(usize),
    /// The arc pair was taken out of the network; its flow is folded into the node balances.
    Deleted,
}

#[derive(Clone, Debug)]
pub struct Node {
    /// The net amount this node still has to send over its live arcs, i.e. its supply corrected
    /// for the lower bounds of its arcs and for the flow on its deleted arcs.
    pub(crate) balance: i64,
    /// The part of the balance which the current flow does not yet route; non-zero means the node
    /// is infeasible.
    pub(crate) excess: i64,
    /// The number of live arc pairs incident to this node.
    pub(crate) degree: u32,
    /// Every arc (forward or sister) leaving this node, live or not.
    pub(crate) adjacency_list: Vec<ArcId>,
    pub(crate) potential: i64,
    in_infeasible_list: bool,
}

impl Node {
    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn excess(&self) -> i64 {
        self.excess
    }

    pub fn degree(&self) -> u32 {
        self.degree
    }

    pub fn potential(&self) -> i64 {
        self.potential
    }
}

#[derive(Clone, Debug)]
pub struct Arc {
    pub(crate) head: NodeId,
    /// The residual capacity: how much more flow this arc can carry.
    pub(crate) capacity: i64,
    pub(crate) cost: i64,
    pub(crate) index: ArcIndex,
    pub(crate) companion: Option<CompanionId>,
}

impl Arc {
    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn capacity(&self) -> i64 {
        self.capacity
    }

    pub fn cost(&self) -> i64 {
        self.cost
    }

    pub fn index(&self) -> ArcIndex {
        self.index
    }

    pub fn companion(&self) -> Option<CompanionId> {
        self.companion
    }
}

/// The residual graph on which optimal flows are computed.
///
/// The flow on a forward arc is kept relative to its lower bound: it equals the residual
/// capacity of the sister. Optimality is maintained through node potentials: every live arc
/// with residual capacity has a non-negative [reduced cost](FlowGraph::reduced_cost).
#[derive(Clone, Debug, Default)]
pub struct FlowGraph {
    pub(crate) nodes: KeyedVec<NodeId, Node>,
    pub(crate) arcs: KeyedVec<ArcId, Arc>,
    /// The forward arcs which currently take part in the network.
    pub(crate) live_arcs: Vec<ArcId>,
    /// Nodes which may have a non-zero excess; purged lazily.
    pub(crate) infeasible_nodes: Vec<NodeId>,
    pub(crate) search: super::shortest_path::SearchState,
}

impl FlowGraph {
    pub(crate) fn add_node(&mut self, balance: i64) -> NodeId {
        let node = self.nodes.push(Node {
            balance,
            excess: balance,
            degree: 0,
            adjacency_list: Vec::new(),
            potential: 0,
            in_infeasible_list: false,
        });
        self.search.grow();
        self.mark_if_infeasible(node);
        node
    }

    /// Adds a live arc pair `tail -> head` with the given residual capacity and cost, carrying no
    /// flow. Returns the forward arc.
    pub(crate) fn add_arc_pair(
        &mut self,
        tail: NodeId,
        head: NodeId,
        capacity: i64,
        cost: i64,
    ) -> ArcId {
        netflow_assert_simple!(tail != head, "self loops are not supported");
        netflow_assert_simple!(capacity >= 0);

        let position = self.live_arcs.len();
        let forward = self.arcs.push(Arc {
            head,
            capacity,
            cost,
            index: ArcIndex::Live(position),
            companion: None,
        });
        let sister = self.arcs.push(Arc {
            head: tail,
            capacity: 0,
            cost: -cost,
            index: ArcIndex::Live(position),
            companion: None,
        });
        netflow_assert_simple!(forward.sister() == sister);

        self.live_arcs.push(forward);
        self.nodes[tail].adjacency_list.push(forward);
        self.nodes[head].adjacency_list.push(sister);
        self.nodes[tail].degree += 1;
        self.nodes[head].degree += 1;

        forward
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, node: NodeId) -> &Node {
        &self.nodes[node]
    }

    pub fn arc(&self, arc: ArcId) -> &Arc {
        &self.arcs[arc]
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        self.nodes.keys()
    }

    pub fn live_arcs(&self) -> &[ArcId] {
        &self.live_arcs
    }

    pub fn head(&self, arc: ArcId) -> NodeId {
        self.arcs[arc].head
    }

    pub fn tail(&self, arc: ArcId) -> NodeId {
        self.arcs[arc.sister()].head
    }

    pub fn is_live(&self, arc: ArcId) -> bool {
        self.arcs[arc].index != ArcIndex::Deleted
    }

    /// The flow on the pair of `arc`, relative to the lower bound of the forward arc.
    pub fn relative_flow(&self, arc: ArcId) -> i64 {
        self.arcs[arc.forward().sister()].capacity
    }

    /// `upper bound - lower bound` of the pair of `arc`.
    pub fn total_capacity(&self, arc: ArcId) -> i64 {
        self.arcs[arc].capacity + self.arcs[arc.sister()].capacity
    }

    pub fn reduced_cost(&self, arc: ArcId) -> i64 {
        let tail = self.tail(arc);
        let head = self.head(arc);
        self.arcs[arc].cost + self.nodes[tail].potential - self.nodes[head].potential
    }

    /// Sends `amount` units over `arc`, moving residual capacity from the arc to its sister and
    /// routing `amount` of the tail's excess to the head.
    pub(crate) fn push_flow(&mut self, arc: ArcId, amount: i64) {
        netflow_assert_moderate!(amount >= 0 && amount <= self.arcs[arc].capacity);
        if amount == 0 {
            return;
        }

        self.arcs[arc].capacity -= amount;
        self.arcs[arc.sister()].capacity += amount;

        let tail = self.tail(arc);
        let head = self.head(arc);
        self.nodes[tail].excess -= amount;
        self.nodes[head].excess += amount;
        self.mark_if_infeasible(tail);
        self.mark_if_infeasible(head);
    }

    /// Sets the cost of the pair of `arc`; `cost` is the cost of the forward arc.
    pub(crate) fn set_cost(&mut self, arc: ArcId, cost: i64) {
        let forward = arc.forward();
        self.arcs[forward].cost = cost;
        self.arcs[forward.sister()].cost = -cost;
    }

    /// Saturates whichever direction of the pair of `arc` has residual capacity at a negative
    /// reduced cost, so that the pair satisfies the optimality conditions again. The moved flow
    /// shows up as excess at the endpoints.
    pub(crate) fn restore_optimality_conditions(&mut self, arc: ArcId) {
        if !self.is_live(arc) {
            return;
        }

        for direction in [arc, arc.sister()] {
            let capacity = self.arcs[direction].capacity;
            if capacity > 0 && self.reduced_cost(direction) < 0 {
                self.push_flow(direction, capacity);
            }
        }
    }

    /// Takes the pair of `arc` out of the network. Its current flow is folded into the balances
    /// of its endpoints, which leaves their excess unchanged.
    pub(crate) fn remove_arc(&mut self, arc: ArcId) {
        let forward = arc.forward();
        let index = self.arcs[forward].index;
        netflow_assert_moderate!(
            matches!(index, ArcIndex::Live(_)),
            "arc {forward} is removed twice"
        );
        let ArcIndex::Live(position) = index else {
            return;
        };

        let flow = self.relative_flow(forward);
        let tail = self.tail(forward);
        let head = self.head(forward);
        self.nodes[tail].balance -= flow;
        self.nodes[head].balance += flow;
        self.nodes[tail].degree -= 1;
        self.nodes[head].degree -= 1;

        let _ = self.live_arcs.swap_remove(position);
        if let Some(&moved) = self.live_arcs.get(position) {
            self.arcs[moved].index = ArcIndex::Live(position);
            self.arcs[moved.sister()].index = ArcIndex::Live(position);
        }
        self.arcs[forward].index = ArcIndex::Deleted;
        self.arcs[forward.sister()].index = ArcIndex::Deleted;
    }

    /// The exact inverse of [`FlowGraph::remove_arc`], followed by restoring the optimality
    /// conditions of the pair.
    pub(crate) fn add_arc(&mut self, arc: ArcId) {
        let forward = arc.forward();
        netflow_assert_simple!(
            !self.is_live(forward),
            "arc {forward} is added while it is live"
        );

        let flow = self.relative_flow(forward);
        let tail = self.tail(forward);
        let head = self.head(forward);
        self.nodes[tail].balance += flow;
        self.nodes[head].balance -= flow;
        self.nodes[tail].degree += 1;
        self.nodes[head].degree += 1;

        let position = self.live_arcs.len();
        self.live_arcs.push(forward);
        self.arcs[forward].index = ArcIndex::Live(position);
        self.arcs[forward.sister()].index = ArcIndex::Live(position);

        self.restore_optimality_conditions(forward);
    }

    /// Sets the residual capacity of `arc` itself, leaving the flow untouched.
    pub(crate) fn set_residual_capacity(&mut self, arc: ArcId, capacity: i64) {
        netflow_assert_simple!(capacity >= 0, "{arc} gets capacity {capacity}");
        self.arcs[arc].capacity = capacity;
    }

    /// Raises the lower bound of the pair of `arc` by `delta` (lowers it when negative) without
    /// changing the absolute flow: the relative flow drops by `delta` and the balances of the
    /// endpoints take over that part, so their excess stays the same.
    pub(crate) fn shift_lower_bound(&mut self, arc: ArcId, delta: i64) {
        let forward = arc.forward();
        let sister = forward.sister();
        netflow_assert_simple!(
            self.arcs[sister].capacity >= delta,
            "lower bound of {forward} moves above its flow"
        );

        self.arcs[sister].capacity -= delta;
        let tail = self.tail(forward);
        let head = self.head(forward);
        if self.is_live(forward) {
            self.nodes[tail].balance -= delta;
            self.nodes[head].balance += delta;
        }
    }

    /// Changes the supply of `node`; the difference becomes excess of the node.
    pub(crate) fn shift_balance(&mut self, node: NodeId, delta: i64) {
        self.nodes[node].balance += delta;
        self.nodes[node].excess += delta;
        self.mark_if_infeasible(node);
    }

    /// `Σ cost · relative flow` over the live forward arcs.
    pub fn relative_cost(&self) -> i64 {
        self.live_arcs
            .iter()
            .map(|&arc| self.arcs[arc].cost * self.relative_flow(arc))
            .sum()
    }

    /// Whether some node still has a non-zero excess. Nodes which became feasible are dropped
    /// from the infeasible list.
    pub(crate) fn has_infeasible_nodes(&mut self) -> bool {
        self.purge_infeasible_nodes();
        !self.infeasible_nodes.is_empty()
    }

    pub(crate) fn purge_infeasible_nodes(&mut self) {
        let nodes = &mut self.nodes;
        self.infeasible_nodes.retain(|&node| {
            let keep = nodes[node].excess != 0;
            if !keep {
                nodes[node].in_infeasible_list = false;
            }
            keep
        });
    }

    pub(crate) fn mark_if_infeasible(&mut self, node: NodeId) {
        let entry = &mut self.nodes[node];
        if entry.excess != 0 && !entry.in_infeasible_list {
            entry.in_infeasible_list = true;
            self.infeasible_nodes.push(node);
        }
    }

    /// Checks that every live residual arc has a non-negative reduced cost, that the capacities
    /// of every pair are non-negative and that the balances and excesses agree with the flow.
    /// The sum of the balances of all nodes, which is 0 whenever a feasible flow exists.
    pub fn total_balance(&self) -> i64 {
        self.nodes.iter().map(|node| node.balance).sum()
    }

    pub(crate) fn check_invariants(&self) -> bool {
        let optimal = self.live_arcs.iter().all(|&arc| {
            [arc, arc.sister()].into_iter().all(|direction| {
                self.arcs[direction].capacity >= 0
                    && (self.arcs[direction].capacity == 0 || self.reduced_cost(direction) >= 0)
            })
        });

        let consistent = self.nodes.keys().all(|node| {
            let routed: i64 = self.nodes[node]
                .adjacency_list
                .iter()
                .filter(|&&arc| self.is_live(arc))
                .map(|&arc| {
                    if arc.is_forward() {
                        self.relative_flow(arc)
                    } else {
                        -self.relative_flow(arc)
                    }
                })
                .sum();
            self.nodes[node].balance - routed == self.nodes[node].excess
        });

        let listed = self
            .nodes
            .keys()
            .all(|node| self.nodes[node].excess == 0 || self.nodes[node].in_infeasible_list);

        optimal && consistent && listed
    }
}
