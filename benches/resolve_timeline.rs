use criterion::{black_box, criterion_group, criterion_main, Criterion};

use recording_timeline::{Locale, Recording, Timeline};

const DISTRIBUTED: &str = r#"{
    "id": "rec-bench",
    "title": "Weekly site coordination",
    "status": "distributed",
    "audio_url": "https://files.example.com/rec-bench.webm",
    "transcription": "We reviewed the facade drawings and agreed on the new schedule.",
    "analysis": { "tasks": ["send drawings", "update schedule"], "decisions": ["approve facade"], "topics": ["facade"] },
    "deep_analysis": { "people_mentioned": [{ "name": "Ana" }], "projects_identified": [{ "name": "Casa Azul" }] },
    "advanced_insights": { "topics_detailed": [{}], "risks_identified": [{}, {}] },
    "distribution_log": [
        { "action": "task_created", "timestamp": "2024-05-01T10:00:00Z" },
        { "action": "email_sent", "timestamp": "2024-05-01T10:00:02Z" }
    ]
}"#;

fn bench_resolve(c: &mut Criterion) {
    let distributed = Recording::from_json(DISTRIBUTED).unwrap();
    let failed = Recording::from_json(
        r#"{ "status": "failed", "error_step": "deep_analysis", "error_message": "timeout" }"#,
    )
    .unwrap();

    c.bench_function("resolve_distributed", |b| {
        b.iter(|| Timeline::resolve(black_box(&distributed), Locale::En))
    });
    c.bench_function("resolve_failed", |b| {
        b.iter(|| Timeline::resolve(black_box(&failed), Locale::Pt))
    });
    c.bench_function("parse_snapshot", |b| {
        b.iter(|| Recording::from_json(black_box(DISTRIBUTED)))
    });
}

criterion_group!(benches, bench_resolve);
criterion_main!(benches);
