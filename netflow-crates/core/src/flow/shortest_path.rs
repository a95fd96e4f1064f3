use std::cmp::Reverse;
use std::collections::BinaryHeap;

use super::ArcId;
use super::FlowGraph;
use super::NodeId;
use crate::containers::KeyedVec;
use crate::netflow_assert_moderate;

/// Where a shortest path search stops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PathTarget {
    Node(NodeId),
    /// The closest node with a negative excess.
    AnyDeficit,
}

/// A shortest path found by [`FlowGraph::shortest_path`]; the arcs are kept in the search state
/// until the next search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Path {
    pub(crate) source: NodeId,
    pub(crate) target: NodeId,
    /// Length of the path in reduced costs, measured before the potentials were updated.
    pub(crate) distance: i64,
    /// The smallest residual capacity on the path.
    pub(crate) bottleneck: i64,
}

/// Scratch space of the shortest path searches, reused between searches.
#[derive(Clone, Debug, Default)]
pub(crate) struct SearchState {
    distance: KeyedVec<NodeId, i64>,
    predecessor: KeyedVec<NodeId, Option<ArcId>>,
    settled: KeyedVec<NodeId, bool>,
    touched: Vec<NodeId>,
    queue: BinaryHeap<Reverse<(i64, NodeId)>>,
}

impl SearchState {
    pub(crate) fn grow(&mut self) {
        let _ = self.distance.push(i64::MAX);
        let _ = self.predecessor.push(None);
        let _ = self.settled.push(false);
    }

    fn reset(&mut self) {
        for node in self.touched.drain(..) {
            self.distance[node] = i64::MAX;
            self.predecessor[node] = None;
            self.settled[node] = false;
        }
        self.queue.clear();
    }

    fn relax(&mut self, node: NodeId, distance: i64, predecessor: Option<ArcId>) {
        if self.distance[node] == i64::MAX {
            self.touched.push(node);
        }
        self.distance[node] = distance;
        self.predecessor[node] = predecessor;
        self.queue.push(Reverse((distance, node)));
    }
}

impl FlowGraph {
    /// Dijkstra's algorithm over the live residual arcs, weighted by reduced cost. The pair of
    /// `excluded` is never used.
    ///
    /// When a path is found, the potentials of the nodes settled closer than the target are
    /// lowered so that the arcs on the path get a reduced cost of zero while all reduced costs
    /// stay non-negative.
    pub(crate) fn shortest_path(
        &mut self,
        source: NodeId,
        target: PathTarget,
        excluded: Option<ArcId>,
    ) -> Option<Path> {
        self.search.reset();
        self.search.relax(source, 0, None);

        let excluded = excluded.map(ArcId::forward);
        let mut found = None;

        while let Some(Reverse((distance, node))) = self.search.queue.pop() {
            if self.search.settled[node] || distance > self.search.distance[node] {
                continue;
            }
            self.search.settled[node] = true;

            let is_target = match target {
                PathTarget::Node(target_node) => node == target_node,
                PathTarget::AnyDeficit => self.nodes[node].excess < 0,
            };
            if is_target {
                found = Some((node, distance));
                break;
            }

            for &arc in &self.nodes[node].adjacency_list {
                let entry = &self.arcs[arc];
                if entry.capacity == 0
                    || !self.is_live(arc)
                    || Some(arc.forward()) == excluded
                {
                    continue;
                }

                let reduced_cost = self.reduced_cost(arc);
                netflow_assert_moderate!(
                    reduced_cost >= 0,
                    "{arc} has reduced cost {reduced_cost}"
                );

                let head = entry.head;
                let candidate = distance + reduced_cost;
                if !self.search.settled[head] && candidate < self.search.distance[head] {
                    self.search.relax(head, candidate, Some(arc));
                }
            }
        }

        let (target, target_distance) = found?;

        for &node in &self.search.touched {
            if self.search.settled[node] && self.search.distance[node] < target_distance {
                self.nodes[node].potential += self.search.distance[node] - target_distance;
            }
        }

        let bottleneck = self
            .path_arcs(target)
            .map(|arc| self.arcs[arc].capacity)
            .min()
            .unwrap_or(i64::MAX);

        Some(Path {
            source,
            target,
            distance: target_distance,
            bottleneck,
        })
    }

    /// The arcs of the last found path, walking back from `target`.
    fn path_arcs(&self, target: NodeId) -> impl Iterator<Item = ArcId> + '_ {
        let mut current = target;
        std::iter::from_fn(move || {
            let arc = self.search.predecessor[current]?;
            current = self.tail(arc);
            Some(arc)
        })
    }

    /// Sends `amount` units along the last found path.
    pub(crate) fn augment_path(&mut self, path: Path, amount: i64) {
        netflow_assert_moderate!(amount <= path.bottleneck);
        let arcs = self.path_arcs(path.target).collect::<Vec<_>>();
        for arc in arcs {
            self.push_flow(arc, amount);
        }
    }
}
