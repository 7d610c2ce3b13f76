//! Routing host events to triggers.
//!
//! The host registers, per event type, how an event becomes a trigger
//! activation. Several triggers may listen to the same event type; an
//! extractor returning `None` means "not for this trigger".
//!
//! Extractors run without the route table locked, so they may add or
//! remove routes themselves.

use std::any::{Any, TypeId};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::core::SubjectId;
use crate::holders::HolderSet;

use super::data::TriggerData;

/// A trigger occurrence ready to dispatch.
#[derive(Clone, Debug)]
pub struct Activation {
    /// Subject whose holders are considered.
    pub subject: SubjectId,
    /// Data handed to effects.
    pub data: TriggerData,
    /// If set, consider only these holders instead of the subject's current ones.
    pub force_holders: Option<HolderSet>,
}

impl Activation {
    /// Create an activation over the subject's current holders.
    pub fn new(subject: SubjectId, data: TriggerData) -> Self {
        Self {
            subject,
            data,
            force_holders: None,
        }
    }

    /// Restrict dispatch to `holders` (builder pattern).
    #[must_use]
    pub fn with_force_holders(mut self, holders: HolderSet) -> Self {
        self.force_holders = Some(holders);
        self
    }
}

type Extractor = Arc<dyn Fn(&dyn Any) -> Option<Activation> + Send + Sync>;

#[derive(Clone)]
struct Route {
    trigger: String,
    extract: Extractor,
}

/// Maps host event types to trigger activations.
#[derive(Default)]
pub struct TriggerRouter {
    routes: RwLock<FxHashMap<TypeId, Vec<Route>>>,
}

impl TriggerRouter {
    /// Create an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route events of type `E` to `trigger`.
    pub fn route<E, F>(&self, trigger: &str, extract: F)
    where
        E: Any,
        F: Fn(&E) -> Option<Activation> + Send + Sync + 'static,
    {
        let extract: Extractor = Arc::new(move |event: &dyn Any| {
            event.downcast_ref::<E>().and_then(|event| extract(event))
        });

        self.routes
            .write()
            .entry(TypeId::of::<E>())
            .or_default()
            .push(Route {
                trigger: trigger.to_lowercase(),
                extract,
            });
    }

    /// Remove every route to `trigger`. Returns how many were removed.
    pub fn unroute(&self, trigger: &str) -> usize {
        let trigger = trigger.to_lowercase();
        let mut routes = self.routes.write();
        let mut removed = 0;
        for list in routes.values_mut() {
            let before = list.len();
            list.retain(|route| route.trigger != trigger);
            removed += before - list.len();
        }
        routes.retain(|_, list| !list.is_empty());
        removed
    }

    /// Activations produced by `event`, paired with their trigger id.
    pub fn activations<E: Any>(&self, event: &E) -> Vec<(String, Activation)> {
        let Some(list) = self.routes.read().get(&TypeId::of::<E>()).cloned() else {
            return Vec::new();
        };

        list.iter()
            .filter_map(|route| {
                (route.extract)(event).map(|activation| (route.trigger.clone(), activation))
            })
            .collect()
    }

    /// Sorted, distinct ids of every routed trigger.
    #[must_use]
    pub fn routed_triggers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .routes
            .read()
            .values()
            .flatten()
            .map(|route| route.trigger.clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.read().values().map(Vec::len).sum()
    }

    /// Whether nothing is routed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for TriggerRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TriggerRouter")
            .field("triggers", &self.routed_triggers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Jump {
        player: u64,
        height: f64,
    }

    struct Chat(u64, String);

    #[test]
    fn test_routes_by_event_type() {
        let router = TriggerRouter::new();
        router.route("jump", |event: &Jump| {
            Some(Activation::new(
                SubjectId::new(event.player),
                TriggerData::new().with_value(event.height),
            ))
        });
        router.route("chat", |event: &Chat| {
            Some(Activation::new(
                SubjectId::new(event.0),
                TriggerData::new().with_text(event.1.clone()),
            ))
        });

        let fired = router.activations(&Jump { player: 3, height: 1.25 });
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].0, "jump");
        assert_eq!(fired[0].1.subject, SubjectId::new(3));
        assert_eq!(fired[0].1.data.value, Some(1.25));

        let fired = router.activations(&Chat(1, "hi".into()));
        assert_eq!(fired[0].1.data.text.as_deref(), Some("hi"));

        assert!(router.activations(&42u32).is_empty());
    }

    #[test]
    fn test_many_triggers_per_event() {
        let router = TriggerRouter::new();
        router.route("jump", |event: &Jump| {
            Some(Activation::new(SubjectId::new(event.player), TriggerData::new()))
        });
        router.route("High_Jump", |event: &Jump| {
            (event.height > 2.0).then(|| Activation::new(SubjectId::new(event.player), TriggerData::new()))
        });

        assert_eq!(router.activations(&Jump { player: 1, height: 1.0 }).len(), 1);

        let fired = router.activations(&Jump { player: 1, height: 3.0 });
        let ids: Vec<&str> = fired.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["jump", "high_jump"]);
        assert_eq!(router.routed_triggers(), vec!["high_jump", "jump"]);
    }

    #[test]
    fn test_extractor_may_change_routes() {
        let router = Arc::new(TriggerRouter::new());
        let inner = Arc::downgrade(&router);
        router.route("jump", move |event: &Jump| {
            if let Some(router) = inner.upgrade() {
                router.route("chat", |_: &Chat| None);
            }
            Some(Activation::new(SubjectId::new(event.player), TriggerData::new()))
        });

        assert_eq!(router.activations(&Jump { player: 1, height: 1.0 }).len(), 1);
        assert_eq!(router.routed_triggers(), vec!["chat", "jump"]);
    }

    #[test]
    fn test_unroute() {
        let router = TriggerRouter::new();
        router.route("jump", |_: &Jump| None);
        router.route("chat", |_: &Chat| None);
        assert_eq!(router.len(), 2);

        assert_eq!(router.unroute("JUMP"), 1);
        assert_eq!(router.routed_triggers(), vec!["chat"]);
        assert_eq!(router.unroute("jump"), 0);
    }
}
