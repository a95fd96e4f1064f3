use enumset::enum_set;
use enumset::EnumSet;
use enumset::EnumSetType;

/// The kinds of change a domain operation can make to an integer domain.
#[derive(Debug, EnumSetType, Hash)]
pub enum IntDomainEvent {
    /// The domain became a single value.
    Assign,
    LowerBound,
    UpperBound,
    /// A value strictly between the bounds was removed.
    Removal,
}

/// A set of [`IntDomainEvent`]s a propagator subscribes to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DomainEvents {
    int_events: EnumSet<IntDomainEvent>,
}

impl DomainEvents {
    /// Lower and upper bound tightening (but not other value removal).
    pub const BOUNDS: DomainEvents = DomainEvents {
        int_events: enum_set!(IntDomainEvent::LowerBound | IntDomainEvent::UpperBound),
    };
    /// Every change to the domain.
    pub const ANY_INT: DomainEvents = DomainEvents {
        int_events: enum_set!(
            IntDomainEvent::Assign
                | IntDomainEvent::LowerBound
                | IntDomainEvent::UpperBound
                | IntDomainEvent::Removal
        ),
    };
    /// Only the upper bound.
    pub const UPPER_BOUND: DomainEvents = DomainEvents {
        int_events: enum_set!(IntDomainEvent::UpperBound),
    };

    pub(crate) fn get_int_events(&self) -> EnumSet<IntDomainEvent> {
        self.int_events
    }
}
