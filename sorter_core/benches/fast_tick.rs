use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use sorter_core::{
    ButtonClassifier, InputSampler, Pacer, PresenceDebouncer, RawInputs, SensorClassifier,
    Signals, SorterState, TimingCfg,
};

// Synthetic input trace: marbles passing, short gaps, an occasional press.
fn synth_inputs(n: usize, seed: u32) -> Vec<RawInputs> {
    let mut state = seed.max(1);
    let mut next = || {
        let mut x = state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        state = x;
        x
    };
    (0..n)
        .map(|i| {
            let r = next();
            let reading = match r % 4 {
                0 => 90,
                1 => 15,
                _ => 5,
            };
            RawInputs {
                readings: [Some(reading), Some(reading)],
                start_stop_pressed: (i / 300) % 7 == 0,
                reset_pressed: false,
            }
        })
        .collect()
}

fn group_settings(g: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>) {
    // Quick tweaking without CLI flags (Criterion 0.5):
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p sorter_core --bench fast_tick
    match std::env::var("BENCH_SAMPLE_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
    {
        Some(n) => {
            g.sample_size(n.max(10));
        }
        None => {
            g.sample_size(50);
        }
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }
}

pub fn bench_fast_tick(c: &mut Criterion) {
    let mut g = c.benchmark_group("fast_tick");
    group_settings(&mut g);

    let trace = synth_inputs(10_000, 0xC0FFEE);
    g.bench_function("input_sampler_10k", |b| {
        b.iter_batched(
            || {
                let sampler = InputSampler::from_parts(
                    SensorClassifier::new(8, 20),
                    PresenceDebouncer::new(80),
                    ButtonClassifier::new(100, 700),
                    ButtonClassifier::new(100, 700),
                );
                (sampler, Signals::new())
            },
            |(mut sampler, signals)| {
                for raw in &trace {
                    sampler.tick(black_box(*raw), &signals);
                }
                black_box(signals.more_marbles());
            },
            BatchSize::SmallInput,
        )
    });

    g.bench_function("pacer_1k", |b| {
        let signals = Signals::new();
        signals.publish_state(SorterState::Sort);
        let mut pacer = Pacer::new(&TimingCfg::default());
        b.iter(|| {
            for _ in 0..1_000 {
                pacer.tick(black_box(&signals));
            }
            black_box(signals.take_pace());
            black_box(signals.drain_time_quanta());
        })
    });
    g.finish();
}

criterion_group!(fast_tick, bench_fast_tick);
criterion_main!(fast_tick);
