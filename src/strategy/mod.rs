//! Turn selection and termination for group chats.

pub mod selection;
pub mod termination;

pub use selection::{RuleSelection, SelectionStrategy, SequentialSelection};
pub use termination::{
    AggregateCondition, AggregateTermination, NeverTermination, PredicateTermination,
    RegexTermination, ScopedTermination, TerminationStrategy,
};
