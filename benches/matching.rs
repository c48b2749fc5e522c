//! Performance benchmarks for event-notifier
//!
//! Run with: cargo bench

use event_notifier::format::format;
use event_notifier::{
    ClusterEvent, Destination, EventMatcher, LifecycleSynchronizer, MemoryChannel,
    NoopFinalizerGate, NotifierConfig, Rule, RuleObject, RuleSpec,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;

fn rules(count: usize) -> Vec<Rule> {
    (0..count)
        .map(|i| {
            Rule::new(
                format!("rule-{}", i),
                ["Pod", "Node"],
                format!("probe failed|timeout-{}", i),
                Destination::new("alerts", "xoxb"),
            )
        })
        .collect()
}

fn bench_matcher(c: &mut Criterion) {
    let event = ClusterEvent::new(
        "Pod",
        "web-0",
        "shop",
        "Readiness probe failed: dial tcp 10.129.2.35:8080: i/o timeout",
    );

    let mut group = c.benchmark_group("match");
    for count in [1, 10, 100] {
        let rules = rules(count);
        let matcher = EventMatcher::new();
        // Warm the pattern cache
        matcher.matches(&event, &rules);

        group.bench_function(format!("{} rules (cached)", count), |b| {
            b.iter(|| matcher.matches(&event, &rules));
        });
    }
    group.finish();

    let rules = rules(10);
    c.bench_function("match 10 rules (cold cache)", |b| {
        b.iter(|| EventMatcher::new().matches(&event, &rules));
    });
}

fn bench_format(c: &mut Criterion) {
    let rule = rules(1).remove(0);
    let event = ClusterEvent::new("Pod", "web-0", "shop", "Back-off restarting failed container")
        .with_reason("BackOff")
        .with_count(7);

    c.bench_function("format", |b| {
        b.iter(|| format(&event, &rule));
    });
}

fn bench_event_fan_out(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let sync = rt.block_on(async {
        let sync = LifecycleSynchronizer::new(
            NotifierConfig::default(),
            Arc::new(MemoryChannel::new()),
            Arc::new(NoopFinalizerGate),
        )
        .unwrap();
        for i in 0..10 {
            let spec = RuleSpec {
                resources: vec!["Pod".to_string()],
                regex: "OOMKilled".to_string(),
                channel: format!("channel-{}", i),
                token: "xoxb".to_string(),
            };
            let name = format!("rule-{}", i);
            sync.reconcile_rule_object(&name, Some(RuleObject::new(name.clone(), spec)))
                .await
                .unwrap();
        }
        sync
    });

    let event = ClusterEvent::new("Pod", "worker", "jobs", "Container OOMKilled");
    c.bench_function("on_event (10 matches, memory channel)", |b| {
        b.to_async(&rt).iter(|| async { sync.on_event(&event).await });
    });
}

criterion_group!(benches, bench_matcher, bench_format, bench_event_fan_out);
criterion_main!(benches);
