//! Core types: subjects, ticks, configuration blocks, compiled data, registries.
//!
//! This module contains the host-agnostic building blocks. Hosts adapt their
//! own players, clocks and config files to these rather than the engine
//! knowing about them.

pub mod compiled;
pub mod config;
pub mod registry;
pub mod subject;

pub use compiled::CompiledData;
pub use config::{Config, ConfigBuilder, ConfigId, ConfigValue, WeakConfig};
pub use registry::{Identified, Registry};
pub use subject::{SubjectId, Tick};
