use rand::rngs::StdRng;
use rand::SeedableRng;

fn main() {
    divan::main();
}

fn scope() -> common::GameScope {
    common::GameScope {
        game_id: uuid::Uuid::now_v7(),
        owner: "bench".to_owned(),
    }
}

#[divan::bench(args = [200, 2_000, 20_000])]
fn events(bencher: divan::Bencher, count: usize) {
    let scope = scope();
    let players = analysis::roster::detect_players(&scope);
    let config = analysis::Config {
        event_count: count,
        ..analysis::Config::default()
    };
    let mut rng = StdRng::seed_from_u64(0);

    bencher.bench_local(|| {
        analysis::events::generate(divan::black_box(&config), &scope, &players, 5400, &mut rng)
    });
}

#[divan::bench(args = [1800, 60])]
fn formation(bencher: divan::Bencher, interval: u32) {
    let scope = scope();
    let players = analysis::roster::detect_players(&scope);
    let config = analysis::Config {
        formation_interval: interval,
        ..analysis::Config::default()
    };
    let mut rng = StdRng::seed_from_u64(0);

    bencher.bench_local(|| {
        analysis::formation::generate(divan::black_box(&config), &scope, &players, 5400, &mut rng)
    });
}

#[divan::bench(args = [200, 20_000])]
fn aggregate(bencher: divan::Bencher, count: usize) {
    let scope = scope();
    let players = analysis::roster::detect_players(&scope);
    let config = analysis::Config {
        event_count: count,
        ..analysis::Config::default()
    };
    let mut rng = StdRng::seed_from_u64(0);
    let events = analysis::events::generate(&config, &scope, &players, 5400, &mut rng);

    bencher.bench_local(|| {
        analysis::stats::aggregate(&scope, &players, divan::black_box(&events), &mut rng)
    });
}
