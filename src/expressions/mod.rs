//! Dynamic numeric expressions in config values.
//!
//! Numeric arguments may be written as arithmetic over host placeholders,
//! e.g. `multiplier: "1 + %player_level% / 100"`. The expression is compiled
//! once per config object and path, then evaluated per subject with freshly
//! resolved placeholder values.
//!
//! ## Key Components
//!
//! - [`ExpressionCache`]: Evaluates config paths, memoizing compiled trees
//! - [`ExpressionCompiler`]: Turns source into a [`CompiledExpression`]
//! - [`PlaceholderResolver`]: Host hook resolving `%token%` / `{token}` values
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use holdfast::core::{Config, SubjectId};
//! use holdfast::expressions::ExpressionCache;
//!
//! let resolver = |_: SubjectId, token: &str| (token == "%level%").then(|| "4".to_string());
//! let cache = ExpressionCache::new(Arc::new(resolver));
//!
//! let config = Config::builder().set("damage", "%level% * 1.5").build();
//! let damage = cache.get_double(&config, "damage", Some(SubjectId::new(1))).unwrap();
//! assert_eq!(damage, 6.0);
//! ```

mod cache;
mod compiler;
mod placeholder;

pub use cache::ExpressionCache;
pub use compiler::{ArithmeticCompiler, CompiledExpression, ExpressionCompiler};
pub use placeholder::{scan_placeholders, NoPlaceholders, PlaceholderResolver};
