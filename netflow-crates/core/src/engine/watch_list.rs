use enumset::EnumSet;

use super::DomainEvents;
use super::DomainId;
use super::IntDomainEvent;
use super::LocalId;
use super::PropagatorId;
use crate::containers::KeyedVec;

/// A registration of a propagator for the events of one variable.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Watcher {
    pub(crate) propagator: PropagatorId,
    pub(crate) local_id: LocalId,
    events: EnumSet<IntDomainEvent>,
}

/// For each variable, the propagators which want to be notified about its changes.
#[derive(Clone, Debug, Default)]
pub(crate) struct WatchList {
    watchers: KeyedVec<DomainId, Vec<Watcher>>,
}

impl WatchList {
    pub(crate) fn watch(
        &mut self,
        var: DomainId,
        propagator: PropagatorId,
        local_id: LocalId,
        domain_events: DomainEvents,
    ) {
        self.watchers.accomodate(var, Vec::new());
        self.watchers[var].push(Watcher {
            propagator,
            local_id,
            events: domain_events.get_int_events(),
        });
    }

    /// The watchers of `var` which are interested in at least one of `events`.
    pub(crate) fn watchers_for(
        &self,
        var: DomainId,
        events: EnumSet<IntDomainEvent>,
    ) -> impl Iterator<Item = &Watcher> + '_ {
        self.watchers
            .get(var)
            .into_iter()
            .flatten()
            .filter(move |watcher| !watcher.events.is_disjoint(events))
    }
}
