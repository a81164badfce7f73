//! End-to-end engine scenarios.
//!
//! Each test drives the public engine API block by block, the way the chain
//! would: transactions first, then `end_block`.

use chrono::{Duration, TimeZone, Utc};
use dex_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sha2::{Digest, Sha256};

const BALANCE: i64 = 100_000_000_000_000;

fn alice() -> Address {
    Address::new("coinex1alice")
}

fn bob() -> Address {
    Address::new("coinex1bob")
}

fn carol() -> Address {
    Address::new("coinex1carol")
}

fn next(ctx: &BlockContext) -> BlockContext {
    let mut next = ctx.clone();
    next.height += 1;
    next.time = ctx.time + Duration::seconds(5);
    next.data_hash = Sha256::digest(next.height.to_be_bytes()).to_vec();
    next
}

/// `abc/cet` owned by alice, three funded traders, daily cleanup already done.
/// Returns the context of the first trading block.
fn setup() -> (MemEngine, BlockContext) {
    let mut engine = MemEngine::in_memory(EngineConfig::default(), Params::default());
    engine.assets_mut().issue("cet", &Address::new("coinex1foundation"));
    engine.assets_mut().issue("abc", &alice());
    engine.assets_mut().issue("usd", &carol());
    for user in [alice(), bob(), carol()] {
        for denom in ["cet", "abc", "usd"] {
            engine.ledger_mut().credit(&user, &Coin::new(denom, BALANCE));
        }
    }

    let ctx = BlockContext::new(1, Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap()).with_data_hash(vec![3u8; 32]);
    engine.create_trading_pair(&ctx, &pair("abc", "cet")).unwrap();
    assert!(engine.end_block(&ctx).unwrap().cleaned);
    (engine, next(&ctx))
}

fn pair(stock: &str, money: &str) -> MsgCreateTradingPair {
    MsgCreateTradingPair {
        creator: alice(),
        stock: stock.to_string(),
        money: money.to_string(),
        price_precision: 8,
        order_precision: 0,
    }
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

#[test]
fn sell_freezes_stock_until_canceled() {
    let (mut engine, ctx) = setup();
    let cet_before = engine.ledger().available(&alice(), "cet");

    let created = engine
        .create_order(&ctx, 7, &limit(&alice(), Side::Sell, 100, 10_000_000, TimeInForce::Gte))
        .unwrap();
    assert_eq!(created.order_id, "coinex1alice-7-0");
    assert_eq!(created.freeze, 10_000_000);
    assert_eq!(engine.ledger().frozen(&alice(), "abc"), 10_000_000);
    assert_eq!(engine.ledger().available(&alice(), "abc"), BALANCE - 10_000_000);

    engine
        .cancel_order(
            &ctx,
            &MsgCancelOrder {
                sender: alice(),
                order_id: created.order_id.clone(),
            },
        )
        .unwrap();
    assert!(engine.get_order(&created.order_id).unwrap().is_none());
    assert_eq!(engine.ledger().frozen(&alice(), "abc"), 0);
    assert_eq!(engine.ledger().available(&alice(), "abc"), BALANCE);
    assert_eq!(engine.ledger().frozen(&alice(), "cet"), 0);
    let fee_for_zero_deal = engine.params().market.fee_for_zero_deal;
    assert_eq!(engine.ledger().available(&alice(), "cet"), cet_before - fee_for_zero_deal);
}

#[test]
fn ioc_buy_rounds_freeze_up_and_expires_with_block() {
    let (mut engine, ctx) = setup();
    let cet_before = engine.ledger().available(&bob(), "cet");

    let created = engine
        .create_order(&ctx, 1, &limit(&bob(), Side::Buy, 300, 68_293_762, TimeInForce::Ioc))
        .unwrap();
    // 0.000003 * 68293762 = 204.881286
    assert_eq!(created.freeze, 205);

    let report = engine.end_block(&ctx).unwrap();
    assert!(report.executed.is_empty());
    assert_eq!(report.removed_orders, 1);
    assert!(engine.orders_of(&bob()).unwrap().is_empty());
    assert_eq!(engine.ledger().frozen(&bob(), "cet"), 0);
    let fee_for_zero_deal = engine.params().market.fee_for_zero_deal;
    assert_eq!(engine.ledger().available(&bob(), "cet"), cet_before - fee_for_zero_deal);
}

#[test]
fn equal_orders_ranked_by_block_hash() {
    for carol_first in [false, true] {
        let (mut engine, ctx) = setup();
        let ask = |engine: &mut MemEngine, who: &Address| {
            engine
                .create_order(&ctx, 1, &limit(who, Side::Sell, 100_000_000, 100, TimeInForce::Gte))
                .unwrap()
                .order_id
        };
        let (alice_id, carol_id) = if carol_first {
            let c = ask(&mut engine, &carol());
            (ask(&mut engine, &alice()), c)
        } else {
            let a = ask(&mut engine, &alice());
            (a, ask(&mut engine, &carol()))
        };
        engine
            .create_order(&ctx, 1, &limit(&bob(), Side::Buy, 100_000_000, 100, TimeInForce::Gte))
            .unwrap();
        engine.end_block(&ctx).unwrap();

        let rank = |id: &str| {
            let mut hasher = Sha256::new();
            hasher.update(id.as_bytes());
            hasher.update(&ctx.data_hash);
            hasher.finalize().to_vec()
        };
        let (winner, loser) = if rank(&alice_id) < rank(&carol_id) {
            (alice_id, carol_id)
        } else {
            (carol_id, alice_id)
        };
        assert!(engine.get_order(&winner).unwrap().is_none());
        assert_eq!(engine.get_order(&loser).unwrap().unwrap().left_stock, 100);
    }
}

#[test]
fn last_price_bounds_the_next_auction() {
    let (mut engine, ctx) = setup();
    engine
        .create_order(&ctx, 1, &limit(&alice(), Side::Sell, 200_000_000, 1_000, TimeInForce::Gte))
        .unwrap();
    engine
        .create_order(&ctx, 1, &limit(&bob(), Side::Buy, 200_000_000, 1_000, TimeInForce::Gte))
        .unwrap();
    let report = engine.end_block(&ctx).unwrap();
    assert_eq!(report.executed, vec![("abc/cet".to_string(), dec!(2))]);

    // 25% band around 2 excludes an ask at 3
    let ctx = next(&ctx);
    let ask = engine
        .create_order(&ctx, 2, &limit(&alice(), Side::Sell, 300_000_000, 1_000, TimeInForce::Gte))
        .unwrap();
    let bid = engine
        .create_order(&ctx, 2, &limit(&bob(), Side::Buy, 300_000_000, 1_000, TimeInForce::Gte))
        .unwrap();
    let report = engine.end_block(&ctx).unwrap();
    assert!(report.executed.is_empty());
    assert!(engine.get_order(&ask.order_id).unwrap().is_some());
    assert!(engine.get_order(&bid.order_id).unwrap().is_some());
    assert_eq!(engine.get_market("abc/cet").unwrap().unwrap().last_executed_price, dec!(2));

    // a cheaper ask inside the band clears against the resting bid
    let ctx = next(&ctx);
    engine
        .create_order(&ctx, 3, &limit(&carol(), Side::Sell, 240_000_000, 1_000, TimeInForce::Gte))
        .unwrap();
    let report = engine.end_block(&ctx).unwrap();
    let (_, price) = &report.executed[0];
    assert!(*price >= dec!(2.4) && *price <= dec!(2.5), "cleared at {}", price);
    assert!(engine.get_order(&bid.order_id).unwrap().is_none());
}

#[test]
fn fee_volume_goes_through_cet_markets() {
    let (mut engine, ctx) = setup();
    engine.create_trading_pair(&ctx, &pair("abc", "usd")).unwrap();

    // no cet price known yet
    assert_eq!(market_volume(engine.store(), "abc", "usd", 100, 500).unwrap(), Decimal::ZERO);
    assert_eq!(market_volume(engine.store(), "cet", "usd", 100, 500).unwrap(), dec!(100));
    assert_eq!(market_volume(engine.store(), "abc", "cet", 100, 500).unwrap(), dec!(500));

    engine
        .create_order(&ctx, 1, &limit(&alice(), Side::Sell, 200_000_000, 1_000, TimeInForce::Gte))
        .unwrap();
    engine
        .create_order(&ctx, 1, &limit(&bob(), Side::Buy, 200_000_000, 1_000, TimeInForce::Gte))
        .unwrap();
    engine.end_block(&ctx).unwrap();

    // abc/cet trades at 2, usd/cet unknown: value the stock leg
    assert_eq!(market_volume(engine.store(), "abc", "usd", 100, 500).unwrap(), dec!(200));
}

#[test]
fn bancor_pool_stays_on_its_curve() {
    let (mut engine, ctx) = setup();
    engine
        .bancor_init(
            &ctx,
            &MsgBancorInit {
                owner: alice(),
                stock: "abc".to_string(),
                money: "cet".to_string(),
                init_price: dec!(1),
                max_price: dec!(10),
                max_supply: 1_000,
                max_money: 4_000,
                stock_precision: 0,
                earliest_cancel_time: 0,
            },
        )
        .unwrap();
    let pool = engine.get_pool("abc/cet").unwrap().unwrap();
    assert_eq!(pool.ar, 2_000);
    assert!(pool.is_consistent());
    assert_eq!(engine.ledger().frozen(&alice(), "abc"), 1_000);

    let trade = |side, amount| MsgBancorTrade {
        sender: bob(),
        stock: "abc".to_string(),
        money: "cet".to_string(),
        amount,
        side,
        money_limit: 0,
    };
    let bob_abc = engine.ledger().available(&bob(), "abc");
    let mut held = 0;
    for (side, amount) in [(Side::Buy, 300), (Side::Buy, 200), (Side::Sell, 400), (Side::Buy, 900)] {
        let before = engine.get_pool("abc/cet").unwrap().unwrap();
        let result = engine.bancor_trade(&ctx, &trade(side, amount)).unwrap();
        let after = engine.get_pool("abc/cet").unwrap().unwrap();
        assert!(after.is_consistent());
        held += if side == Side::Buy { amount } else { -amount };
        assert_eq!(after.supplied(), held);
        assert_eq!((after.money_in_pool - before.money_in_pool).abs(), result.money);
        if side == Side::Buy {
            assert!(after.current_price() > before.current_price());
        }
    }
    assert_eq!(engine.ledger().available(&bob(), "abc"), bob_abc + held);

    // the pool cannot sell past its supply
    assert!(engine.bancor_trade(&ctx, &trade(Side::Buy, 1)).is_err());
}
