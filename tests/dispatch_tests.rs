//! Trigger dispatch integration tests.
//!
//! Host events are routed to triggers, then dispatched to the effects of the
//! subject's active holders.

mod common;

use std::sync::Arc;

use serde_json::json;

use common::{Fixture, Recorder, Switch};
use holdfast::core::SubjectId;
use holdfast::holders::HolderSet;
use holdfast::triggers::{
    Activation, DeclaredTrigger, ParameterSet, TriggerData, TriggerParameter,
};

const ALICE: SubjectId = SubjectId::new(1);
const BOB: SubjectId = SubjectId::new(2);

/// Host event: `attacker` hit `victim` for `damage`.
struct MeleeHit {
    attacker: u64,
    victim: u64,
    damage: f64,
}

/// Host event: a projectile hit.
struct ArrowHit {
    shooter: u64,
    damage: f64,
}

fn combat_fixture() -> Fixture {
    let fx = Fixture::new();
    let engine = &fx.engine;

    engine.register_trigger(Arc::new(DeclaredTrigger::new(
        "melee_attack",
        ParameterSet::of(&[TriggerParameter::Player, TriggerParameter::Victim, TriggerParameter::Value]),
    )));
    engine.register_trigger(Arc::new(DeclaredTrigger::new(
        "bow_attack",
        ParameterSet::of(&[TriggerParameter::Player, TriggerParameter::Value]),
    )));

    engine.route("melee_attack", |hit: &MeleeHit| {
        Some(Activation::new(
            SubjectId::new(hit.attacker),
            TriggerData::new()
                .with_player(SubjectId::new(hit.attacker))
                .with_victim(SubjectId::new(hit.victim))
                .with_value(hit.damage),
        ))
    });
    engine.route("bow_attack", |hit: &ArrowHit| {
        Some(Activation::new(
            SubjectId::new(hit.shooter),
            TriggerData::new()
                .with_player(SubjectId::new(hit.shooter))
                .with_value(hit.damage),
        ))
    });
    fx
}

fn striker(fx: &Fixture) -> Arc<Recorder> {
    let striker = Arc::new(Recorder::new("strike").with_triggers(&["melee_attack", "bow_attack"]));
    fx.engine.register_effect(striker.clone());
    striker
}

#[test]
fn test_event_fires_effect_of_held_item() {
    let fx = combat_fixture();
    let strike = striker(&fx);
    fx.give(ALICE, &fx.compile("sword", json!({ "effects": [{ "id": "strike" }] })));

    let report = fx.engine.handle_event(&MeleeHit { attacker: 1, victim: 2, damage: 4.0 });

    assert_eq!(report.considered, 1);
    assert_eq!(report.fired, 1);
    assert_eq!(strike.fired(), vec![(Some(ALICE), 4.0)]);

    // Bob holds nothing.
    let report = fx.engine.handle_event(&MeleeHit { attacker: 2, victim: 1, damage: 4.0 });
    assert_eq!(report.considered, 0);
    assert_eq!(strike.fired().len(), 1);
}

#[test]
fn test_inactive_holder_does_not_fire() {
    let fx = combat_fixture();
    let strike = striker(&fx);
    let night = Arc::new(Switch::new("night", false));
    fx.engine.register_condition(night.clone());
    let dagger = fx.compile(
        "dagger",
        json!({ "conditions": [{ "id": "night" }], "effects": [{ "id": "strike" }] }),
    );
    fx.give(ALICE, &dagger);

    let report = fx.engine.handle_event(&MeleeHit { attacker: 1, victim: 2, damage: 1.0 });
    assert_eq!(report.considered, 1);
    assert_eq!(report.active, 0);
    assert!(strike.fired().is_empty());

    night.set(ALICE, true);
    fx.engine.handle_event(&MeleeHit { attacker: 1, victim: 2, damage: 1.0 });
    assert_eq!(strike.fired().len(), 1);
}

#[test]
fn test_duplicate_holders_fire_per_copy() {
    let fx = combat_fixture();
    let strike = striker(&fx);
    let ring = fx.compile("ring", json!({ "effects": [{ "id": "strike" }] }));
    fx.give(ALICE, &ring);
    fx.give(ALICE, &ring);

    let report = fx.engine.handle_event(&ArrowHit { shooter: 1, damage: 2.0 });
    assert_eq!(report.fired, 2);
    assert_eq!(strike.fired().len(), 2);
}

#[test]
fn test_configured_triggers_narrow_effect() {
    let fx = combat_fixture();
    let strike = striker(&fx);
    let bow = fx.compile(
        "bow",
        json!({ "effects": [{ "id": "strike", "triggers": ["bow_attack"] }] }),
    );
    assert!(fx.sink.is_empty());
    fx.give(ALICE, &bow);

    let melee = fx.engine.handle_event(&MeleeHit { attacker: 1, victim: 2, damage: 1.0 });
    assert_eq!(melee.active, 1);
    assert_eq!(melee.matched, 0);

    let arrow = fx.engine.handle_event(&ArrowHit { shooter: 1, damage: 3.0 });
    assert_eq!(arrow.fired, 1);
    assert_eq!(strike.fired(), vec![(Some(ALICE), 3.0)]);
}

#[test]
fn test_forced_holders_replace_current_ones() {
    let fx = combat_fixture();
    let strike = striker(&fx);
    let sword = fx.compile("sword", json!({ "effects": [{ "id": "strike" }] }));
    fx.give(ALICE, &sword);

    let forced: HolderSet = HolderSet::new();
    let report = fx.engine.dispatch(
        "melee_attack",
        Activation::new(ALICE, TriggerData::new().with_player(ALICE)).with_force_holders(forced),
    );
    assert_eq!(report.considered, 0);

    let report = fx.engine.dispatch(
        "melee_attack",
        Activation::new(BOB, TriggerData::new().with_player(BOB)).with_force_holders(im::vector![sword]),
    );
    assert_eq!(report.fired, 1);
    assert_eq!(strike.fired(), vec![(Some(BOB), 1.0)]);
}

#[test]
fn test_failing_effect_does_not_stop_others() {
    let fx = combat_fixture();
    let strike = striker(&fx);
    let flaky = Arc::new(Recorder::new("flaky").with_triggers(&["melee_attack"]));
    fx.engine.register_effect(flaky.clone());
    flaky.fail_trigger(true);

    fx.give(
        ALICE,
        &fx.compile("axe", json!({ "effects": [{ "id": "flaky" }, { "id": "strike" }] })),
    );

    let report = fx.engine.handle_event(&MeleeHit { attacker: 1, victim: 2, damage: 5.0 });
    assert_eq!(report.matched, 2);
    assert_eq!(report.failures, 1);
    assert_eq!(report.fired, 1);
    assert_eq!(strike.fired().len(), 1);
}

#[test]
fn test_dispatch_leaves_reconciliation_state_alone() {
    let fx = combat_fixture();
    let strike = striker(&fx);
    fx.give(ALICE, &fx.compile("sword", json!({ "effects": [{ "id": "strike" }] })));

    fx.engine.handle_event(&MeleeHit { attacker: 1, victim: 2, damage: 1.0 });
    assert_eq!(fx.engine.states().previous(ALICE), None);
    assert_eq!(strike.enables(), 0);

    // The first pass still sees the sword as new.
    assert_eq!(fx.engine.reconcile(ALICE).added, 1);
}

#[test]
fn test_multiplier_expression_per_subject() {
    let resolver = |subject: SubjectId, token: &str| match token {
        "%level%" => Some((subject.raw() * 10).to_string()),
        _ => None,
    };
    let fx = Fixture::with_resolver(Arc::new(resolver));
    fx.engine.register_trigger(Arc::new(DeclaredTrigger::new(
        "bow_attack",
        ParameterSet::of(&[TriggerParameter::Player, TriggerParameter::Value]),
    )));
    let scaled = Arc::new(
        Recorder::new("scaled")
            .with_triggers(&["bow_attack"])
            .with_expressions(Arc::clone(fx.engine.expressions())),
    );
    fx.engine.register_effect(scaled.clone());

    let bow = fx.compile(
        "bow",
        json!({ "effects": [{ "id": "scaled", "args": { "multiplier": "1 + %level% / 10" } }] }),
    );
    fx.give(ALICE, &bow);
    fx.give(BOB, &bow);

    for subject in [ALICE, BOB] {
        fx.engine.dispatch(
            "bow_attack",
            Activation::new(subject, TriggerData::new().with_player(subject).with_value(100.0)),
        );
    }

    assert_eq!(scaled.fired(), vec![(Some(ALICE), 200.0), (Some(BOB), 300.0)]);
    assert_eq!(fx.engine.expressions().compilations(), 1);
}
