//! Engine benchmarks: cached expression evaluation and reconciliation passes.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use holdfast::arguments::{ArgumentSchema, Compilable};
use holdfast::core::{Config, Identified, SubjectId};
use holdfast::effects::Effect;
use holdfast::engine::{Engine, EngineConfig};
use holdfast::expressions::ExpressionCache;
use holdfast::holders::Holder;

struct Noop {
    arguments: ArgumentSchema,
}

impl Identified for Noop {
    fn id(&self) -> &str {
        "noop"
    }
}

impl Compilable for Noop {
    fn arguments(&self) -> &ArgumentSchema {
        &self.arguments
    }
}

impl Effect for Noop {}

fn bench_expressions(c: &mut Criterion) {
    let cache = ExpressionCache::new(Arc::new(|subject: SubjectId, token: &str| {
        (token == "%level%").then(|| subject.raw().to_string())
    }));
    let config = Config::builder()
        .set("damage", "(%level% * 1.5 + 2) / max(1, %level% - 10)")
        .build();

    c.bench_function("expression_cached_eval", |b| {
        b.iter(|| {
            cache
                .get_double(black_box(&config), "damage", Some(SubjectId::new(25)))
                .unwrap()
        })
    });
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");

    for count in [4usize, 32, 256] {
        let engine = Engine::new(
            EngineConfig::default().with_enable_trigger(false),
            Arc::new(|_: SubjectId, _: &str| None::<String>),
        );
        engine.register_effect(Arc::new(Noop {
            arguments: ArgumentSchema::empty(),
        }));

        let holders: Vec<Holder> = (0..count)
            .map(|i| {
                let args = Config::builder().set("n", i as i64).build();
                let effect = Config::builder().set("id", "noop").set("args", args).build();
                let config = Config::builder().set("effects", vec![effect]).build();
                engine.compile_holder(&format!("holder_{i}"), &config)
            })
            .collect();
        engine.register_provider(Arc::new(move |_: SubjectId| holders.clone()));

        let subject = SubjectId::new(1);
        engine.reconcile(subject);

        group.bench_with_input(BenchmarkId::new("unchanged", count), &count, |b, _| {
            b.iter(|| engine.reconcile(black_box(subject)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_expressions, bench_reconcile);
criterion_main!(benches);
