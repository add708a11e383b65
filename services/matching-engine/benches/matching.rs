//! Match-loop benchmarks: resting inserts, level sweeps, and cancels.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use matching_engine::engine::MarketEngine;
use types::ids::{MarketId, OrderId, OwnerId};
use types::intent::{IdempotencyKey, Intent};
use types::market::Market;
use types::numeric::{Price, Quantity};
use types::operation::Operation;
use types::order::Side;

fn test_market() -> Market {
    Market::new(
        MarketId::new("BTC/USDC"),
        Price::from_u64(1),
        Quantity::from_u64(1),
    )
}

fn admit_op(owner: OwnerId, side: Side, price: u64, qty: u64, nonce: u64) -> Operation {
    Operation::Admit {
        order_id: OrderId::new(),
        intent: Intent {
            market: MarketId::new("BTC/USDC"),
            side,
            price: Price::from_u64(price),
            quantity: Quantity::from_u64(qty),
            owner,
            key: IdempotencyKey::new(owner, nonce),
            sequence_hint: None,
        },
    }
}

fn bench_resting_inserts(c: &mut Criterion) {
    c.bench_function("insert_1000_resting_bids", |b| {
        b.iter(|| {
            let mut engine = MarketEngine::new(test_market());
            let owner = OwnerId::new();
            for i in 0..1000u64 {
                let seq = engine.next_sequence();
                let op = admit_op(owner, Side::Buy, 1000 + (i % 50), 10, i + 1);
                black_box(engine.apply(&op, seq, 0));
            }
        })
    });
}

fn bench_sweep_deep_book(c: &mut Criterion) {
    c.bench_function("sweep_50_levels", |b| {
        b.iter(|| {
            let mut engine = MarketEngine::new(test_market());
            let maker = OwnerId::new();
            for i in 0..50u64 {
                let seq = engine.next_sequence();
                let op = admit_op(maker, Side::Sell, 1000 + i, 10, i + 1);
                engine.apply(&op, seq, 0);
            }
            let taker = OwnerId::new();
            let seq = engine.next_sequence();
            let op = admit_op(taker, Side::Buy, 1100, 500, 1);
            black_box(engine.apply(&op, seq, 0));
        })
    });
}

criterion_group!(benches, bench_resting_inserts, bench_sweep_deep_book);
criterion_main!(benches);
