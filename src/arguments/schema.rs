//! Argument schemas.
//!
//! Every condition and effect declares the arguments it understands as an
//! [`ArgumentSchema`]: an ordered list of rules, each checked independently.
//! Testing a block evaluates every rule and concatenates their violations, so
//! one bad block can report all of its problems at once.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::core::{Config, Identified};

use super::violation::Violation;

/// Something that declares an argument schema: conditions and effects.
pub trait Compilable: Identified + Send + Sync {
    /// The arguments this handler accepts.
    fn arguments(&self) -> &ArgumentSchema;
}

type ValueCheck = Box<dyn Fn(&Config, &str) -> bool + Send + Sync>;
type InheritSource = Box<dyn Fn(&Config) -> Option<Arc<dyn Compilable>> + Send + Sync>;

/// A single argument rule.
pub enum ArgumentRule {
    /// At least one alias must be present, and its value must pass `check`.
    Required {
        names: SmallVec<[String; 2]>,
        description: String,
        check: ValueCheck,
    },
    /// Documented, never fails.
    Optional {
        names: SmallVec<[String; 2]>,
        description: String,
    },
    /// Validate a sub-block against another handler's schema.
    Inherited {
        source: InheritSource,
        subsection: Option<String>,
    },
}

impl ArgumentRule {
    /// Check this rule against a block.
    pub fn test(&self, config: &Config) -> Vec<Violation> {
        match self {
            ArgumentRule::Required {
                names,
                description,
                check,
            } => {
                let Some(present) = names.iter().find(|name| config.has(name)) else {
                    let first = names.first().map(String::as_str).unwrap_or_default();
                    return vec![Violation::new(
                        first,
                        format!("You must specify {first}: {description}"),
                    )];
                };

                if check(config, present.as_str()) {
                    Vec::new()
                } else {
                    vec![Violation::new(
                        present.as_str(),
                        format!("Invalid value for {present}: {description}"),
                    )]
                }
            }

            ArgumentRule::Optional { .. } => Vec::new(),

            ArgumentRule::Inherited { source, subsection } => {
                let section = match subsection {
                    Some(name) => config.get_subsection(name).unwrap_or_default(),
                    None => config.clone(),
                };

                source(&section)
                    .map(|compilable| compilable.arguments().test(&section))
                    .unwrap_or_default()
            }
        }
    }
}

impl std::fmt::Debug for ArgumentRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgumentRule::Required {
                names, description, ..
            } => f
                .debug_struct("Required")
                .field("names", names)
                .field("description", description)
                .finish_non_exhaustive(),
            ArgumentRule::Optional { names, description } => f
                .debug_struct("Optional")
                .field("names", names)
                .field("description", description)
                .finish(),
            ArgumentRule::Inherited { subsection, .. } => f
                .debug_struct("Inherited")
                .field("subsection", subsection)
                .finish_non_exhaustive(),
        }
    }
}

/// Documentation entry for one argument, for tooling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArgumentDoc {
    pub names: Vec<String>,
    pub description: String,
    pub required: bool,
}

/// Ordered set of argument rules for one handler.
#[derive(Debug, Default)]
pub struct ArgumentSchema {
    rules: Vec<ArgumentRule>,
}

impl ArgumentSchema {
    /// A schema with no rules; every block is valid.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Start building a schema.
    #[must_use]
    pub fn builder() -> ArgumentSchemaBuilder {
        ArgumentSchemaBuilder::default()
    }

    /// Validate a block. An empty result means valid.
    pub fn test(&self, config: &Config) -> Vec<Violation> {
        self.rules.iter().flat_map(|rule| rule.test(config)).collect()
    }

    /// Required and optional arguments, in declaration order.
    #[must_use]
    pub fn describe(&self) -> Vec<ArgumentDoc> {
        self.rules
            .iter()
            .filter_map(|rule| match rule {
                ArgumentRule::Required {
                    names, description, ..
                } => Some(ArgumentDoc {
                    names: names.to_vec(),
                    description: description.clone(),
                    required: true,
                }),
                ArgumentRule::Optional { names, description } => Some(ArgumentDoc {
                    names: names.to_vec(),
                    description: description.clone(),
                    required: false,
                }),
                ArgumentRule::Inherited { .. } => None,
            })
            .collect()
    }

    /// Rules in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[ArgumentRule] {
        &self.rules
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the schema has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn alias_list<I, S>(names: I) -> SmallVec<[String; 2]>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into).collect()
}

/// Builder for [`ArgumentSchema`].
#[derive(Default)]
pub struct ArgumentSchemaBuilder {
    rules: Vec<ArgumentRule>,
}

impl ArgumentSchemaBuilder {
    /// Require `name` to be present.
    #[must_use]
    pub fn require(self, name: &str, description: &str) -> Self {
        self.require_any([name], description)
    }

    /// Require one of several aliases to be present.
    #[must_use]
    pub fn require_any<I, S>(self, names: I, description: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.require_any_with(names, description, |_, _| (), |_| true)
    }

    /// Require `name` and check its extracted value.
    #[must_use]
    pub fn require_with<T, G, P>(self, name: &str, description: &str, getter: G, predicate: P) -> Self
    where
        G: Fn(&Config, &str) -> T + Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.require_any_with([name], description, getter, predicate)
    }

    /// Require one of several aliases and check the first one present.
    #[must_use]
    pub fn require_any_with<I, S, T, G, P>(
        mut self,
        names: I,
        description: &str,
        getter: G,
        predicate: P,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        G: Fn(&Config, &str) -> T + Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.rules.push(ArgumentRule::Required {
            names: alias_list(names),
            description: description.to_string(),
            check: Box::new(move |config: &Config, key: &str| predicate(&getter(config, key))),
        });
        self
    }

    /// Document an optional argument.
    #[must_use]
    pub fn optional(self, name: &str, description: &str) -> Self {
        self.optional_any([name], description)
    }

    /// Document an optional argument with aliases.
    #[must_use]
    pub fn optional_any<I, S>(mut self, names: I, description: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.push(ArgumentRule::Optional {
            names: alias_list(names),
            description: description.to_string(),
        });
        self
    }

    /// Validate the whole block against the schema of whatever `source` picks.
    #[must_use]
    pub fn inherit<F>(mut self, source: F) -> Self
    where
        F: Fn(&Config) -> Option<Arc<dyn Compilable>> + Send + Sync + 'static,
    {
        self.rules.push(ArgumentRule::Inherited {
            source: Box::new(source),
            subsection: None,
        });
        self
    }

    /// Validate `subsection` against the schema of whatever `source` picks.
    ///
    /// A missing subsection is validated as an empty block.
    #[must_use]
    pub fn inherit_from<F>(mut self, subsection: &str, source: F) -> Self
    where
        F: Fn(&Config) -> Option<Arc<dyn Compilable>> + Send + Sync + 'static,
    {
        self.rules.push(ArgumentRule::Inherited {
            source: Box::new(source),
            subsection: Some(subsection.to_string()),
        });
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> ArgumentSchema {
        ArgumentSchema { rules: self.rules }
    }
}
