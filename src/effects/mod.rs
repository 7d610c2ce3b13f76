//! Effects: behaviors applied to subjects by active holders.
//!
//! The engine ships no concrete effects; hosts register their own
//! ("increase damage", "give potion effect"...) and reference them by id in
//! holder configs.
//!
//! ## Key Components
//!
//! - [`Effect`]: Handler contract (persistent `enable`/`disable`, `on_trigger`)
//! - [`EffectBlock`]: A handler bound to one holder's argument block
//! - [`EffectList`]: Ordered blocks of a holder

mod effect;

pub use effect::{Effect, EffectBlock, EffectList};
