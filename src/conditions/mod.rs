//! Conditions: predicates gating holder activation.
//!
//! A holder is active for a subject only while every one of its conditions
//! holds. Concrete conditions are host-specific ("in water", "below 20%
//! health"...) and registered by the host; the engine ships only the
//! composite [`AnyOf`].

mod any_of;
mod condition;

pub use any_of::AnyOf;
pub use condition::{Condition, ConditionBlock, ConditionList};
