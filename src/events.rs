// 11.0: every state change the host may care about produces an event. the engine
// appends to its log and the caller drains it. nothing inside the engine reads it back.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::order::Order;
use crate::types::{Address, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub height: u64,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, height: u64, payload: EventPayload) -> Self {
        Self {
            id,
            height,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    // Order events
    OrderCreated(OrderCreatedEvent),
    Fill(FillEvent),
    OrderCanceled(OrderCanceledEvent),

    // Market events
    MarketCreated(MarketCreatedEvent),
    DelistRequested(DelistRequestedEvent),
    MarketDelisted(MarketDelistedEvent),
    PriceUpdated(PriceUpdatedEvent),

    // Pool events
    BancorCreated(BancorCreatedEvent),
    BancorTrade(BancorTradeEvent),
    BancorCanceled(BancorCanceledEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order_id: String,
    pub trading_pair: String,
    pub sender: Address,
    pub side: Side,
    pub price: Decimal,
    pub quantity: i64,
    pub freeze: i64,
    pub frozen_commission: i64,
    pub frozen_feature_fee: i64,
}

/// One side of a trade, reported once per order involved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillEvent {
    pub order_id: String,
    pub trading_pair: String,
    pub side: Side,
    pub price: Decimal,
    pub left_stock: i64,
    pub freeze: i64,
    pub deal_stock: i64,
    pub deal_money: i64,
    pub curr_stock: i64,
    pub curr_money: i64,
    pub fee: i64,
}

impl FillEvent {
    pub fn from_order(order: &Order, price: Decimal, curr_stock: i64, curr_money: i64, fee: i64) -> Self {
        Self {
            order_id: order.order_id(),
            trading_pair: order.trading_pair.clone(),
            side: order.side,
            price,
            left_stock: order.left_stock,
            freeze: order.freeze,
            deal_stock: order.deal_stock,
            deal_money: order.deal_money,
            curr_stock,
            curr_money,
            fee,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCanceledEvent {
    pub order_id: String,
    pub trading_pair: String,
    pub sender: Address,
    pub reason: CancelReason,
    pub left_stock: i64,
    pub remain_amount: i64,
    pub deal_stock: i64,
    pub deal_money: i64,
    pub used_commission: i64,
    pub used_feature_fee: i64,
    pub rebate_amount: i64,
    pub rebate_referee: Option<Address>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    IocType,
    AllFilled,
    NoEnoughMoney,
    Manual,
    GteTimeout,
    Delisted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketCreatedEvent {
    pub symbol: String,
    pub creator: Address,
    pub price_precision: u8,
    pub order_precision: u8,
    pub creation_fee: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelistRequestedEvent {
    pub symbol: String,
    pub sender: Address,
    pub effective_time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDelistedEvent {
    pub symbol: String,
    pub removed_orders: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdatedEvent {
    pub symbol: String,
    pub old_price: Decimal,
    pub new_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BancorCreatedEvent {
    pub owner: Address,
    pub symbol: String,
    pub max_supply: i64,
    pub init_price: Decimal,
    pub max_price: Decimal,
    pub max_money: i64,
    pub ar: i64,
    pub earliest_cancel_time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BancorTradeEvent {
    pub sender: Address,
    pub symbol: String,
    pub side: Side,
    pub amount: i64,
    pub money: i64,
    pub tx_price: Decimal,
    pub new_price: Decimal,
    pub stock_in_pool: i64,
    pub money_in_pool: i64,
    pub commission: i64,
    pub rebate: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BancorCanceledEvent {
    pub owner: Address,
    pub symbol: String,
    pub returned_stock: i64,
    pub returned_money: i64,
}

/// Bounded in-memory event log.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<Event>,
    next_id: u64,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Vec::new(),
            next_id: 1,
            capacity,
        }
    }

    pub fn push(&mut self, height: u64, payload: EventPayload) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.events.push(Event::new(id, height, payload));

        // oldest events fall off
        if self.events.len() > self.capacity {
            let drain_count = self.events.len() - self.capacity;
            self.events.drain(0..drain_count);
        }
        id
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price_event(n: i64) -> EventPayload {
        EventPayload::PriceUpdated(PriceUpdatedEvent {
            symbol: "abc/cet".to_string(),
            old_price: Decimal::ZERO,
            new_price: Decimal::new(n, 0),
        })
    }

    #[test]
    fn log_assigns_increasing_ids() {
        let mut log = EventLog::new(10);
        let a = log.push(1, price_event(1));
        let b = log.push(1, price_event(2));
        assert!(a < b);
        assert_eq!(log.events().len(), 2);
    }

    #[test]
    fn log_is_bounded() {
        let mut log = EventLog::new(2);
        for n in 0..5 {
            log.push(3, price_event(n));
        }
        let events = log.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, EventId(4));
        assert!(log.events().is_empty());
    }

    #[test]
    fn payload_serializes() {
        let payload = EventPayload::BancorCanceled(BancorCanceledEvent {
            owner: Address::new("coinex1owner"),
            symbol: "abc/cet".to_string(),
            returned_stock: 10,
            returned_money: 20,
        });
        let json = serde_json::to_string(&payload).unwrap();
        let back: EventPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }
}
