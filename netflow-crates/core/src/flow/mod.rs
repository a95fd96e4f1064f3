//! The flow engine: a residual graph of arc pairs with node potentials, on which optimal flows are
//! computed with successive shortest paths.
//!
//! Optimality is a local property here: every live residual arc has a non-negative reduced cost.
//! Changing a capacity or a cost only requires saturating the one arc that might violate it
//! ([`FlowGraph::restore_optimality_conditions`]), after which the nodes with excess are
//! repaired by [`FlowGraph::solve`].
mod graph;
mod shortest_path;

pub use graph::*;
pub(crate) use shortest_path::*;

/// The outcome of [`FlowGraph::solve`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowStatus {
    /// Every node is balanced and the flow has minimal cost.
    Optimal,
    /// Some excess cannot be routed to a deficit.
    Infeasible,
}

impl FlowGraph {
    /// Routes the excess of every node to the nodes with a deficit along shortest paths, which
    /// keeps the flow optimal.
    ///
    /// Returns the number of augmentations along with the status.
    pub(crate) fn solve(&mut self) -> (FlowStatus, u64) {
        let mut augmentations = 0;

        loop {
            self.purge_infeasible_nodes();

            let Some(&source) = self
                .infeasible_nodes
                .iter()
                .find(|&&node| self.nodes[node].excess > 0)
            else {
                let status = if self.infeasible_nodes.is_empty() {
                    FlowStatus::Optimal
                } else {
                    FlowStatus::Infeasible
                };
                return (status, augmentations);
            };

            let Some(path) = self.shortest_path(source, PathTarget::AnyDeficit, None) else {
                log::trace!("no deficit is reachable from {source}");
                return (FlowStatus::Infeasible, augmentations);
            };

            let amount = path
                .bottleneck
                .min(self.nodes[source].excess)
                .min(-self.nodes[path.target].excess);
            self.augment_path(path, amount);
            augmentations += 1;
        }
    }
}
