//! Holders and where they come from.
//!
//! ## Key Components
//!
//! - [`Holder`]: Immutable bundle of condition and effect blocks
//! - [`HolderSet`]: A subject's holders, duplicates included
//! - [`CompileContext`]: Compiles holder configs, reporting bad blocks
//! - [`HolderProviders`]: Aggregates every registered [`HolderProvider`]

mod compile;
mod holder;
mod provider;

pub use compile::CompileContext;
pub use holder::{Holder, HolderBuilder, HolderSet};
pub use provider::{HolderProvider, HolderProviders};
