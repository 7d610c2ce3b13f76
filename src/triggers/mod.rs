//! Triggers: host occurrences that fire holder effects.
//!
//! ## Key Components
//!
//! - [`Trigger`]: A named occurrence declaring the [`ParameterSet`] it supplies
//! - [`TriggerRouter`]: Turns typed host events into [`Activation`]s
//! - [`TriggerDispatcher`]: Fires an activation against a subject's holders
//!
//! ## Flow
//!
//! ```text
//! host event ──► TriggerRouter ──► (trigger id, Activation)
//!                                        │
//!                    holders (current or forced) ──► TriggerDispatcher
//!                                                        │
//!                          active holder? responds to trigger? ──► Effect::on_trigger
//! ```

mod data;
mod dispatch;
mod router;
mod trigger;

pub use data::{Location, ParameterSet, TriggerData, TriggerParameter};
pub use dispatch::{DispatchReport, TriggerDispatcher};
pub use router::{Activation, TriggerRouter};
pub use trigger::{DeclaredTrigger, EnableTrigger, HolderEnableEvent, Trigger};
