use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::Utc;
use fundraising_ledger::{
    CallContext, DonationRole, Identity, InMemoryWallets, Ledger, LedgerId, MINIMUM_DONATION,
};

fn identity(n: u8) -> Identity {
    Identity::from_bytes([n; 20])
}

fn setup() -> Ledger {
    let admin = CallContext::new(identity(1), Utc::now());
    Ledger::new(LedgerId::new(), &admin, &[identity(2), identity(3)]).unwrap()
}

/// Ledger with `n` donations from a single donor spread over two fundraisers.
fn ledger_with_history(n: usize) -> Ledger {
    let mut ledger = setup();
    let donor = CallContext::new(identity(9), Utc::now()).with_value(MINIMUM_DONATION);
    for i in 0..n {
        let fundraiser = if i % 2 == 0 { identity(2) } else { identity(3) };
        ledger.donate(&donor, fundraiser, "bench").unwrap();
    }
    ledger.take_events();
    ledger
}

fn bench_donate(c: &mut Criterion) {
    let mut group = c.benchmark_group("donate");
    group.throughput(Throughput::Elements(1));

    group.bench_function("short_message", |b| {
        let mut ledger = setup();
        let donor = CallContext::new(identity(9), Utc::now()).with_value(MINIMUM_DONATION);
        b.iter(|| {
            ledger
                .donate(&donor, black_box(identity(2)), "thanks")
                .unwrap();
            ledger.take_events();
        });
    });

    group.bench_function("rejected_inactive", |b| {
        let mut ledger = setup();
        let donor = CallContext::new(identity(9), Utc::now()).with_value(MINIMUM_DONATION);
        b.iter(|| {
            let _ = black_box(ledger.donate(&donor, identity(7), "nobody home"));
        });
    });

    group.finish();
}

fn bench_withdraw(c: &mut Criterion) {
    let mut group = c.benchmark_group("withdraw");

    group.bench_function("donate_then_withdraw", |b| {
        let mut ledger = setup();
        let mut wallets = InMemoryWallets::new();
        let donor = CallContext::new(identity(9), Utc::now()).with_value(MINIMUM_DONATION);
        let fundraiser = CallContext::new(identity(2), Utc::now());
        b.iter(|| {
            ledger.donate(&donor, identity(2), "").unwrap();
            black_box(ledger.withdraw(&fundraiser, &mut wallets).unwrap());
            ledger.take_events();
        });
    });

    group.finish();
}

fn bench_history_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_queries");

    for size in [100usize, 1_000, 10_000] {
        let ledger = ledger_with_history(size);

        group.bench_with_input(BenchmarkId::new("donations_of", size), &ledger, |b, ledger| {
            b.iter(|| black_box(ledger.donations_of(identity(9), DonationRole::Donor).len()));
        });

        group.bench_with_input(BenchmarkId::new("donor_summary", size), &ledger, |b, ledger| {
            b.iter(|| black_box(ledger.donor_summary(identity(9)).unwrap()));
        });
    }

    group.finish();
}

fn bench_rehydrate(c: &mut Criterion) {
    let mut group = c.benchmark_group("rehydrate");

    for size in [100usize, 1_000] {
        let mut source = setup();
        let donor = CallContext::new(identity(9), Utc::now()).with_value(MINIMUM_DONATION);
        for _ in 0..size {
            source.donate(&donor, identity(2), "replay").unwrap();
        }
        let id = source.id_typed();
        let administrator = source.administrator();
        let events = source.take_events();

        group.throughput(Throughput::Elements(events.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &events, |b, events| {
            b.iter(|| black_box(Ledger::rehydrate(id, administrator, events.iter())));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_donate,
    bench_withdraw,
    bench_history_queries,
    bench_rehydrate
);
criterion_main!(benches);
