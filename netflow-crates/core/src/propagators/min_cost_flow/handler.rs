use super::context::FlowContext;
use super::CompanionId;
use super::Network;
use super::StructureId;
use crate::basic_types::EmptyDomain;
use crate::engine::DomainId;

/// The part of the network which reacts to a change of a variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Handler {
    /// The variable is the flow and/or the cost variable of an arc.
    Companion(CompanionId),
    /// The variable is the structure variable of a binding.
    Structure(StructureId),
}

impl Handler {
    fn process_event(
        self,
        var: DomainId,
        network: &mut Network,
        context: &mut FlowContext,
    ) -> Result<(), EmptyDomain> {
        match self {
            Handler::Companion(companion) => {
                network.process_companion_event(companion, var, context)
            }
            Handler::Structure(structure) => network.process_structure_event(structure, context),
        }
    }
}

/// All handlers of one variable; most variables have exactly one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum VarHandler {
    Single(Handler),
    Composite(Vec<Handler>),
}

impl VarHandler {
    /// Adds `handler`, unless the variable already has it.
    pub(crate) fn push(&mut self, handler: Handler) {
        match self {
            VarHandler::Single(existing) => {
                let existing = *existing;
                if existing != handler {
                    *self = VarHandler::Composite(vec![existing, handler]);
                }
            }
            VarHandler::Composite(handlers) => {
                if !handlers.contains(&handler) {
                    handlers.push(handler);
                }
            }
        }
    }

    pub(crate) fn process_event(
        &self,
        var: DomainId,
        network: &mut Network,
        context: &mut FlowContext,
    ) -> Result<(), EmptyDomain> {
        match self {
            VarHandler::Single(handler) => handler.process_event(var, network, context),
            VarHandler::Composite(handlers) => handlers
                .iter()
                .try_for_each(|handler| handler.process_event(var, network, context)),
        }
    }
}
