//! DEX Core Simulation.
//!
//! Walks the exchange module through its lifecycle: market creation, block
//! auctions, IOC orders, daily cleanup, delisting and bancor pools.

use chrono::{Duration, TimeZone, Utc};
use dex_core::*;
use rust_decimal_macros::dec;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("DEX Core Engine Simulation");
    println!("Order Book Auctions and Bancor Pools\n");

    scenario_1_block_auction();
    scenario_2_ioc_and_cancel();
    scenario_3_cleanup_and_delist();
    scenario_4_bancor_pool();
    scenario_5_many_traders();

    println!("\nAll simulations completed successfully.");
}

fn genesis_block() -> BlockContext {
    BlockContext::new(1, Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()).with_data_hash(vec![1u8; 32])
}

fn next(ctx: &BlockContext, seconds: i64) -> BlockContext {
    let mut next = ctx.clone();
    next.height += 1;
    next.time = ctx.time + Duration::seconds(seconds);
    next.data_hash = next.height.to_be_bytes().to_vec();
    next
}

/// Engine with an `abc/cet` market owned by `issuer`, plus funded traders.
fn setup(traders: &[&Address]) -> (MemEngine, BlockContext) {
    let mut engine = MemEngine::in_memory(EngineConfig::default(), Environment::Development.params());
    let issuer = Address::new("coinex1issuer");
    engine.assets_mut().issue("cet", &Address::new("coinex1foundation"));
    engine.assets_mut().issue("abc", &issuer);
    engine.ledger_mut().credit(&issuer, &Coin::cet(10_000_000_000_000));
    engine.ledger_mut().credit(&issuer, &Coin::new("abc", 1_000_000_000_000));
    for trader in traders {
        engine.ledger_mut().credit(trader, &Coin::cet(1_000_000_000_000));
        engine.ledger_mut().credit(trader, &Coin::new("abc", 1_000_000_000_000));
    }

    let ctx = genesis_block();
    engine
        .create_trading_pair(
            &ctx,
            &MsgCreateTradingPair {
                creator: issuer,
                stock: "abc".to_string(),
                money: "cet".to_string(),
                price_precision: 8,
                order_precision: 0,
            },
        )
        .unwrap();
    // first block of the day only runs the cleanup
    engine.end_block(&ctx).unwrap();
    (engine, ctx)
}

fn limit(sender: &Address, side: Side, price_raw: i64, quantity: i64, tif: TimeInForce) -> MsgCreateOrder {
    MsgCreateOrder {
        sender: sender.clone(),
        identify: 0,
        trading_pair: "abc/cet".to_string(),
        side,
        price_raw,
        price_precision: 8,
        quantity,
        time_in_force: tif,
        exist_blocks: 0,
    }
}

/// Two resting orders cross and clear at a single price.
fn scenario_1_block_auction() {
    println!("Scenario 1: Block Auction\n");

    let alice = Address::new("coinex1alice");
    let bob = Address::new("coinex1bob");
    let (mut engine, ctx) = setup(&[&alice, &bob]);
    let ctx = next(&ctx, 5);

    let ask = engine
        .create_order(&ctx, 1, &limit(&alice, Side::Sell, 100_000_000, 50_000, TimeInForce::Gte))
        .unwrap();
    let bid = engine
        .create_order(&ctx, 1, &limit(&bob, Side::Buy, 110_000_000, 30_000, TimeInForce::Gte))
        .unwrap();
    println!("  Alice sells 50000 abc @ 1.0, freeze {}", ask.freeze);
    println!("  Bob buys 30000 abc @ 1.1, freeze {}", bid.freeze);

    let report = engine.end_block(&ctx).unwrap();
    for (symbol, price) in &report.executed {
        println!("  {} cleared at {}", symbol, price);
    }

    let rest = engine.get_order(&ask.order_id).unwrap().unwrap();
    println!("  Alice has {} abc left on the book", rest.left_stock);
    println!("  Bob holds {} abc", engine.ledger().available(&bob, "abc"));
    println!("  Fees collected: {} cet\n", engine.ledger().collected_fees("cet"));
}

/// IOC orders never outlive their block; manual cancel returns the freeze.
fn scenario_2_ioc_and_cancel() {
    println!("Scenario 2: IOC and Cancel\n");

    let alice = Address::new("coinex1alice");
    let bob = Address::new("coinex1bob");
    let (mut engine, ctx) = setup(&[&alice, &bob]);
    let ctx = next(&ctx, 5);

    let ioc = engine
        .create_order(&ctx, 1, &limit(&bob, Side::Buy, 300, 68_293_762, TimeInForce::Ioc))
        .unwrap();
    println!("  Bob IOC buy 68293762 abc @ 0.000003, freeze {}", ioc.freeze);
    let report = engine.end_block(&ctx).unwrap();
    println!("  No counterparty, {} order removed", report.removed_orders);

    let ctx = next(&ctx, 5);
    let gte = engine
        .create_order(&ctx, 2, &limit(&alice, Side::Sell, 100, 10_000_000, TimeInForce::Gte))
        .unwrap();
    println!("  Alice GTE sell 10000000 abc, frozen {} abc", engine.ledger().frozen(&alice, "abc"));
    engine
        .cancel_order(
            &ctx,
            &MsgCancelOrder {
                sender: alice.clone(),
                order_id: gte.order_id,
            },
        )
        .unwrap();
    println!("  Canceled, frozen {} abc\n", engine.ledger().frozen(&alice, "abc"));
}

/// Expired orders go at the next daily cleanup; delisted markets at their effective time.
fn scenario_3_cleanup_and_delist() {
    println!("Scenario 3: Cleanup and Delist\n");

    let alice = Address::new("coinex1alice");
    let (mut engine, ctx) = setup(&[&alice]);
    let ctx = next(&ctx, 5);

    let mut short = limit(&alice, Side::Sell, 100, 1_000, TimeInForce::Gte);
    short.exist_blocks = 3;
    engine.create_order(&ctx, 1, &short).unwrap();
    engine
        .create_order(&ctx, 2, &limit(&alice, Side::Sell, 200, 1_000, TimeInForce::Gte))
        .unwrap();
    engine.end_block(&ctx).unwrap();

    let notice = engine.params().market.market_min_expired_time;
    engine
        .cancel_trading_pair(
            &ctx,
            &MsgCancelTradingPair {
                sender: Address::new("coinex1issuer"),
                trading_pair: "abc/cet".to_string(),
                effective_time: ctx.unix_nanos() + notice,
            },
        )
        .unwrap();
    println!("  Delist requested for abc/cet");

    let mut tomorrow = next(&ctx, 24 * 60 * 60);
    tomorrow.height += 10;
    let report = engine.end_block(&tomorrow).unwrap();
    println!("  Next day: {} expired, {} delisted", report.expired_orders, report.delisted_markets.len());

    let later = next(&tomorrow, 7 * 24 * 60 * 60);
    let report = engine.end_block(&later).unwrap();
    println!("  After notice: delisted {:?}", report.delisted_markets);
    println!("  Orders left: {}\n", engine.orders_of(&alice).unwrap().len());
}

/// Buy along a convex curve, then sell back.
fn scenario_4_bancor_pool() {
    println!("Scenario 4: Bancor Pool\n");

    let trader = Address::new("coinex1trader");
    let (mut engine, ctx) = setup(&[&trader]);
    engine
        .bancor_init(
            &ctx,
            &MsgBancorInit {
                owner: Address::new("coinex1issuer"),
                stock: "abc".to_string(),
                money: "cet".to_string(),
                init_price: dec!(1),
                max_price: dec!(10),
                max_supply: 1_000_000,
                max_money: 4_000_000,
                stock_precision: 0,
                earliest_cancel_time: 0,
            },
        )
        .unwrap();
    let pool = engine.get_pool("abc/cet").unwrap().unwrap();
    println!("  Pool created: supply {}, ar {}", pool.max_supply, pool.ar);

    for amount in [100_000, 200_000, 200_000] {
        let trade = MsgBancorTrade {
            sender: trader.clone(),
            stock: "abc".to_string(),
            money: "cet".to_string(),
            amount,
            side: Side::Buy,
            money_limit: 0,
        };
        let result = engine.bancor_trade(&ctx, &trade).unwrap();
        println!("  Buy {} abc for {} cet, price now {}", amount, result.money, result.new_price);
    }

    let sell = MsgBancorTrade {
        sender: trader,
        stock: "abc".to_string(),
        money: "cet".to_string(),
        amount: 500_000,
        side: Side::Sell,
        money_limit: 0,
    };
    let result = engine.bancor_trade(&ctx, &sell).unwrap();
    let pool = engine.get_pool("abc/cet").unwrap().unwrap();
    println!("  Sell 500000 abc for {} cet", result.money);
    println!("  Pool back to {} stock, {} money, consistent {}\n", pool.stock_in_pool, pool.money_in_pool, pool.is_consistent());
}

/// Many traders around one price, several blocks.
fn scenario_5_many_traders() {
    println!("Scenario 5: Many Traders\n");

    let traders: Vec<Address> = (0..20).map(|i| Address::new(format!("coinex1trader{i}"))).collect();
    let refs: Vec<&Address> = traders.iter().collect();
    let (mut engine, mut ctx) = setup(&refs);

    let mut placed = 0;
    for round in 0..3u64 {
        ctx = next(&ctx, 5);
        for (i, trader) in traders.iter().enumerate() {
            let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
            let offset = (i as i64 - 10) * 1_000_000;
            let quantity = 1_000 + (i as i64 % 5) * 500;
            let msg = limit(trader, side, 100_000_000 + offset, quantity, TimeInForce::Gte);
            if engine.create_order(&ctx, round * 100 + i as u64, &msg).is_ok() {
                placed += 1;
            }
        }
        let report = engine.end_block(&ctx).unwrap();
        for (_, price) in &report.executed {
            println!("  Block {}: cleared at {}, {} orders closed", ctx.height, price, report.removed_orders);
        }
    }

    let resting: usize = traders.iter().map(|t| engine.orders_of(t).unwrap().len()).sum();
    println!("  Placed {} orders, {} still resting", placed, resting);
    println!("  Events generated: {}", engine.events().len());

    let state = engine.export_genesis().unwrap();
    println!("  Exported genesis: {} markets, {} orders\n", state.markets.len(), state.orders.len());
}
