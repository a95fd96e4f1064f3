use std::collections::VecDeque;

use super::PropagatorId;
use crate::containers::KeyedVec;

/// First-in first-out queue of propagators waiting to be propagated; a propagator is in the
/// queue at most once.
#[derive(Debug, Clone, Default)]
pub(crate) struct PropagatorQueue {
    queue: VecDeque<PropagatorId>,
    is_enqueued: KeyedVec<PropagatorId, bool>,
}

impl PropagatorQueue {
    pub(crate) fn enqueue_propagator(&mut self, propagator_id: PropagatorId) {
        self.is_enqueued.accomodate(propagator_id, false);
        if !self.is_enqueued[propagator_id] {
            self.is_enqueued[propagator_id] = true;
            self.queue.push_back(propagator_id);
        }
    }

    pub(crate) fn pop(&mut self) -> Option<PropagatorId> {
        let propagator_id = self.queue.pop_front()?;
        self.is_enqueued[propagator_id] = false;
        Some(propagator_id)
    }

    pub(crate) fn clear(&mut self) {
        for propagator_id in self.queue.drain(..) {
            self.is_enqueued[propagator_id] = false;
        }
    }
}
