//! Argument schemas and configuration violations.
//!
//! ## Key Components
//!
//! - [`ArgumentSchema`]: Ordered validation rules a handler declares
//! - [`ArgumentRule`]: Required, optional, or inherited from another handler
//! - [`Violation`]: One offending argument and why
//! - [`ViolationSink`]: Where compile-time violations get reported
//!
//! ## Example
//!
//! ```
//! use holdfast::arguments::ArgumentSchema;
//! use holdfast::core::Config;
//!
//! let schema = ArgumentSchema::builder()
//!     .require("item", "the item to drop")
//!     .optional("chance", "chance to drop, in percent")
//!     .build();
//!
//! let violations = schema.test(&Config::empty());
//! assert_eq!(violations.len(), 1);
//! assert_eq!(violations[0].param, "item");
//! ```

mod schema;
mod violation;

pub use schema::{ArgumentDoc, ArgumentRule, ArgumentSchema, ArgumentSchemaBuilder, Compilable};
pub use violation::{
    report_lines, CollectingSink, TracingSink, Violation, ViolationContext, ViolationReport,
    ViolationSink,
};
