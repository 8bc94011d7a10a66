use bigdecimal::BigDecimal;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pool_risk_engine::{
    models::{EngineConfig, Position},
    services::{aggregate_portfolio, generate_alerts, recommend_rebalance},
    RiskEngine,
};

fn snapshot(size: usize) -> Vec<Position> {
    (0..size)
        .map(|i| {
            let borrowed = 1_000 + (i as i64 % 17) * 900;
            let ratio = 110.0 + (i % 23) as f64 * 9.0;
            Position {
                id: format!("pool-{}", i),
                name: format!("Pool {}", i),
                asset: "USDC".to_string(),
                apy: 2.0 + (i % 13) as f64 * 1.5,
                borrowed: BigDecimal::from(borrowed),
                lent: BigDecimal::from(borrowed * 2),
                collateral_ratio: Some(ratio),
                liquidation_threshold: 120.0 + (i % 5) as f64 * 10.0,
                insurance_coverage: 70.0 + (i % 30) as f64,
            }
        })
        .collect()
}

fn benchmark_scoring_pass(c: &mut Criterion) {
    let engine = RiskEngine::default();
    let positions = snapshot(200);

    c.bench_function("score_200_positions", |b| {
        b.iter(|| engine.score(black_box(&positions)))
    });
}

fn benchmark_components(c: &mut Criterion) {
    let config = EngineConfig::default();
    let positions = snapshot(200);

    c.bench_function("aggregate_portfolio", |b| {
        b.iter(|| aggregate_portfolio(black_box(&positions), black_box(&config.risk)))
    });

    c.bench_function("generate_alerts", |b| {
        b.iter(|| generate_alerts(black_box(&positions), black_box(&config)))
    });

    c.bench_function("recommend_rebalance", |b| {
        b.iter(|| recommend_rebalance(black_box(&positions), black_box(&config)))
    });
}

criterion_group!(benches, benchmark_scoring_pass, benchmark_components);
criterion_main!(benches);
