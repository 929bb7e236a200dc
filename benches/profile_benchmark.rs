use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use market_profile::config::ProfileConfig;
use market_profile::profile::{
    build_session_profiles, PriceBinner, SessionId, SessionProfileAssembler, SessionTicks, Tick, TpoProfileBuilder,
};
use market_profile::revisit::RevisitEngine;

fn session_start(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 7, 0, 0).unwrap() + Duration::days(i64::from(day))
}

/// Oscillating price path, one tick every `spacing_secs`
fn create_session(day: u32, ticks: usize, spacing_secs: i64) -> SessionTicks {
    let start = session_start(day);
    let ticks = (0..ticks)
        .map(|i| {
            let x = i as f64 / 50.0;
            let price = 100.0 + 5.0 * x.sin() + 2.0 * (x * 0.37).cos() + f64::from(day % 7);
            let volume = 1.0 + (i % 13) as f64;
            Tick::new(start + Duration::seconds(i as i64 * spacing_secs), price, volume, volume * 0.4, volume * 0.6)
        })
        .collect();
    SessionTicks::new(
        SessionId::new(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(i64::from(day)), "London"),
        start,
        start + Duration::hours(9),
        ticks,
    )
}

fn bench_single_session(c: &mut Criterion) {
    let config = ProfileConfig { price_step: 0.05, ..ProfileConfig::default() };
    let mut group = c.benchmark_group("single_session");

    for ticks in [1_000usize, 10_000, 30_000] {
        let session = create_session(0, ticks, 32_400 / ticks as i64);
        group.throughput(Throughput::Elements(ticks as u64));

        group.bench_with_input(BenchmarkId::new("assemble", ticks), &session, |b, session| {
            let assembler = SessionProfileAssembler::new(&config);
            b.iter(|| black_box(assembler.assemble(black_box(session))))
        });

        group.bench_with_input(BenchmarkId::new("tpo_value_area", ticks), &session, |b, session| {
            b.iter(|| {
                let mut builder = TpoProfileBuilder::new(&config, PriceBinner::new(config.price_step), session.start);
                for tick in &session.ticks {
                    builder.add_tick(tick);
                }
                black_box(builder.histogram().value_area(config.value_area_percent))
            })
        });
    }

    group.finish();
}

fn bench_batch_and_revisits(c: &mut Criterion) {
    let config = ProfileConfig { price_step: 0.05, ..ProfileConfig::default() };
    let sessions: Vec<SessionTicks> = (0..250).map(|day| create_session(day, 2_000, 15)).collect();
    let profiles = build_session_profiles(&sessions, &config).profiles;

    let mut group = c.benchmark_group("multi_session");
    group.throughput(Throughput::Elements(sessions.len() as u64));

    group.bench_function("parallel_build_250_sessions", |b| {
        b.iter(|| black_box(build_session_profiles(black_box(&sessions), &config)))
    });

    group.bench_function("revisit_engine_250_sessions", |b| {
        b.iter(|| {
            let mut engine = RevisitEngine::new(0.025, vec![1, 2, 3, 6]);
            black_box(engine.run(black_box(&profiles)))
        })
    });

    group.finish();
}

criterion_group!(benches, bench_single_session, bench_batch_and_revisits);
criterion_main!(benches);
