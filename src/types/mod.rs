//! Data model for a convergence run: node facts, declared units, notifications
//! and per-unit outcomes.

mod action_outcome;
mod guard;
mod node_facts;
mod notification;
#[cfg(test)]
mod notification_test;
mod outcome_record;
mod outcome_status;
mod properties;
mod unit;
mod unit_ref;

pub use action_outcome::{ActionOutcome, SkipReason};
pub use guard::{Guard, GuardKind};
pub use node_facts::{FactAttribute, NodeFacts};
pub use notification::{Notification, Timing};
pub use outcome_record::OutcomeRecord;
pub use outcome_status::OutcomeStatus;
pub use properties::Properties;
pub use unit::{ACTION_NOTHING, Unit, UnitBuilder};
pub use unit_ref::UnitRef;
