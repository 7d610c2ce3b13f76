//! Trigger parameters and the data carried by a trigger occurrence.
//!
//! A trigger declares which [`TriggerParameter`]s it supplies; an effect
//! declares which it requires. The two sets are compared when effects are
//! registered and when holder configs name explicit triggers.

use std::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::SubjectId;

/// A kind of data a trigger can supply to effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerParameter {
    /// The subject the trigger fired for.
    Player,
    /// Another subject affected by the occurrence.
    Victim,
    /// Where the occurrence happened.
    Location,
    /// The originating host event.
    Event,
    /// A numeric value (damage dealt, experience gained...).
    Value,
    /// Free-form text (chat message, command...).
    Text,
}

impl TriggerParameter {
    /// Every parameter, in declaration order.
    pub const ALL: [TriggerParameter; 6] = [
        TriggerParameter::Player,
        TriggerParameter::Victim,
        TriggerParameter::Location,
        TriggerParameter::Event,
        TriggerParameter::Value,
        TriggerParameter::Text,
    ];

    const fn bit(self) -> u8 {
        1 << self as u8
    }

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            TriggerParameter::Player => "player",
            TriggerParameter::Victim => "victim",
            TriggerParameter::Location => "location",
            TriggerParameter::Event => "event",
            TriggerParameter::Value => "value",
            TriggerParameter::Text => "text",
        }
    }
}

impl std::fmt::Display for TriggerParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of [`TriggerParameter`]s.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ParameterSet(u8);

impl ParameterSet {
    /// The empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Set containing exactly `parameters`.
    #[must_use]
    pub const fn of(parameters: &[TriggerParameter]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < parameters.len() {
            bits |= parameters[i].bit();
            i += 1;
        }
        Self(bits)
    }

    /// Add a parameter (builder pattern).
    #[must_use]
    pub const fn with(self, parameter: TriggerParameter) -> Self {
        Self(self.0 | parameter.bit())
    }

    /// Whether `parameter` is in the set.
    #[must_use]
    pub const fn contains(self, parameter: TriggerParameter) -> bool {
        self.0 & parameter.bit() != 0
    }

    /// Whether every parameter of `other` is in this set.
    #[must_use]
    pub const fn is_superset_of(self, other: ParameterSet) -> bool {
        other.0 & !self.0 == 0
    }

    /// Parameters in this set but not in `supplied`.
    #[must_use]
    pub const fn missing_from(self, supplied: ParameterSet) -> ParameterSet {
        Self(self.0 & !supplied.0)
    }

    /// Number of parameters.
    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Whether the set is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate members in declaration order.
    pub fn iter(self) -> impl Iterator<Item = TriggerParameter> {
        TriggerParameter::ALL
            .into_iter()
            .filter(move |parameter| self.contains(*parameter))
    }
}

impl FromIterator<TriggerParameter> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = TriggerParameter>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), ParameterSet::with)
    }
}

impl std::fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.iter().map(TriggerParameter::name).collect();
        f.write_str(&names.join(", "))
    }
}

/// A position in a named world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    /// Create a location.
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }
}

/// Data for one trigger occurrence.
///
/// Every field is optional; a trigger fills in the ones it declares.
#[derive(Clone, Default)]
pub struct TriggerData {
    /// The subject the trigger fired for.
    pub player: Option<SubjectId>,
    /// Another affected subject.
    pub victim: Option<SubjectId>,
    /// Where it happened.
    pub location: Option<Location>,
    /// The originating host event.
    pub event: Option<Arc<dyn Any + Send + Sync>>,
    /// Associated number.
    pub value: Option<f64>,
    /// Associated text.
    pub text: Option<String>,
}

impl TriggerData {
    /// Create empty trigger data.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the player (builder pattern).
    #[must_use]
    pub fn with_player(mut self, player: SubjectId) -> Self {
        self.player = Some(player);
        self
    }

    /// Set the victim (builder pattern).
    #[must_use]
    pub fn with_victim(mut self, victim: SubjectId) -> Self {
        self.victim = Some(victim);
        self
    }

    /// Set the location (builder pattern).
    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Attach the originating event (builder pattern).
    #[must_use]
    pub fn with_event<E: Any + Send + Sync>(mut self, event: E) -> Self {
        self.event = Some(Arc::new(event));
        self
    }

    /// Set the value (builder pattern).
    #[must_use]
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    /// Set the text (builder pattern).
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// The originating event, if it is an `E`.
    #[must_use]
    pub fn event_as<E: Any>(&self) -> Option<&E> {
        self.event.as_deref().and_then(|event| event.downcast_ref::<E>())
    }

    /// Parameters actually present.
    #[must_use]
    pub fn supplied(&self) -> ParameterSet {
        let mut set = ParameterSet::empty();
        if self.player.is_some() {
            set = set.with(TriggerParameter::Player);
        }
        if self.victim.is_some() {
            set = set.with(TriggerParameter::Victim);
        }
        if self.location.is_some() {
            set = set.with(TriggerParameter::Location);
        }
        if self.event.is_some() {
            set = set.with(TriggerParameter::Event);
        }
        if self.value.is_some() {
            set = set.with(TriggerParameter::Value);
        }
        if self.text.is_some() {
            set = set.with(TriggerParameter::Text);
        }
        set
    }
}

impl std::fmt::Debug for TriggerData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerData")
            .field("player", &self.player)
            .field("victim", &self.victim)
            .field("location", &self.location)
            .field("event", &self.event.is_some())
            .field("value", &self.value)
            .field("text", &self.text)
            .finish()
    }
}
