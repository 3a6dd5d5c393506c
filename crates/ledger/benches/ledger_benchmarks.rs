use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use chrono::{Duration, TimeZone, Utc};
use guestbook_core::{AccountId, LedgerId};
use guestbook_ledger::{LedgerEvent, MessageLedger};

fn seeded_ledger(count: usize) -> (MessageLedger, Vec<LedgerEvent>) {
    let start = Utc.timestamp_opt(1_622_755_101, 0).unwrap();
    let owner = AccountId::new("ben").unwrap();
    let author = AccountId::new("alice").unwrap();

    let mut ledger = MessageLedger::new(LedgerId::new(), owner, start);
    for i in 0..count {
        ledger
            .post(author.clone(), format!("message number {i}"), start + Duration::seconds(i as i64))
            .unwrap();
    }

    let mut history = vec![ledger.creation_event()];
    history.extend(ledger.messages().iter().map(|m| {
        LedgerEvent::MessagePosted(guestbook_ledger::MessagePosted {
            ledger_id: ledger.id_typed(),
            author: m.author.clone(),
            text: m.text.clone(),
            posted_at: m.posted_at,
        })
    }));

    (ledger, history)
}

fn bench_post(c: &mut Criterion) {
    let (mut ledger, _) = seeded_ledger(0);
    let author = AccountId::new("alice").unwrap();
    let now = Utc::now();

    c.bench_function("post", |b| {
        b.iter(|| {
            ledger
                .post(author.clone(), black_box("hello from the benchmark"), now)
                .unwrap();
        })
    });
}

fn bench_recent(c: &mut Criterion) {
    let mut group = c.benchmark_group("recent_10");
    for size in [10usize, 1_000, 100_000] {
        let (ledger, _) = seeded_ledger(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &ledger, |b, ledger| {
            b.iter(|| black_box(ledger.recent(black_box(10))).len())
        });
    }
    group.finish();
}

fn bench_rehydrate(c: &mut Criterion) {
    let mut group = c.benchmark_group("rehydrate");
    for size in [100usize, 10_000] {
        let (_, history) = seeded_ledger(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &history, |b, history| {
            b.iter(|| MessageLedger::rehydrate(history).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_post, bench_recent, bench_rehydrate);
criterion_main!(benches);
