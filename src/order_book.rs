//! Persistent order book index for one trading pair.
//!
//! Four key spaces share the store:
//!   order table   0x11 0x00 | order_id
//!   bids          0x12 | symbol 0x00 | price | order_id
//!   asks          0x13 | symbol 0x00 | price | order_id
//!   height queue  0x14 | symbol 0x00 | height | order_id
//! plus a dirty marker 0x66 | symbol set whenever an order is added.
//! The order table is global. Everything else is scoped by symbol.

use crate::key_codec::{encode_height, encode_price, HEIGHT_KEY_LEN, PRICE_KEY_LEN};
use crate::order::Order;
use crate::store::{decode_value, encode_value, prefix_end, KvStore, StoreError};
use crate::types::Side;

const ORDER_BOOK_KEY: u8 = 0x11;
const BID_LIST_KEY: u8 = 0x12;
const ASK_LIST_KEY: u8 = 0x13;
const ORDER_QUEUE_KEY: u8 = 0x14;
const NEWLY_ADDED_KEY: u8 = 0x66;
const SEPARATOR: u8 = 0x00;

/// Orders that may cross this round. Bids best-first, asks best-first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchingCandidates {
    pub bids: Vec<Order>,
    pub asks: Vec<Order>,
}

impl MatchingCandidates {
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct OrderBook {
    symbol: String,
}

impl OrderBook {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Insert a new order and flag the market for matching.
    pub fn add<S: KvStore>(&self, store: &mut S, order: &Order) -> Result<(), StoreError> {
        store.set(&dirty_key(&self.symbol), &[]);
        self.update(store, order)
    }

    /// Upsert into the table, the height queue and the side index.
    pub fn update<S: KvStore>(&self, store: &mut S, order: &Order) -> Result<(), StoreError> {
        let id = order.order_id();
        let side_key = self.side_key(order, &id)?;
        let value = encode_value(order)?;
        store.set(&order_key(&id), &value);
        store.set(&self.queue_key(order.height, &id), &[]);
        store.set(&side_key, &[]);
        Ok(())
    }

    pub fn remove<S: KvStore>(&self, store: &mut S, order: &Order) -> Result<(), StoreError> {
        let id = order.order_id();
        if !store.has(&order_key(&id)) {
            return Err(StoreError::OrderNotFound(id));
        }
        let side_key = self.side_key(order, &id)?;
        store.delete(&order_key(&id));
        store.delete(&self.queue_key(order.height, &id));
        store.delete(&side_key);
        Ok(())
    }

    pub fn get_order<S: KvStore>(store: &S, order_id: &str) -> Result<Option<Order>, StoreError> {
        store.get(&order_key(order_id)).map(decode_value).transpose()
    }

    /// Orders created strictly before `height`, newest first.
    pub fn get_older_than<S: KvStore>(&self, store: &S, height: u64) -> Result<Vec<Order>, StoreError> {
        let start = self.queue_prefix();
        let end = self.queue_height_prefix(height);
        let ids: Vec<String> = store
            .range(&start, &end)
            .rev()
            .map(|(k, _)| id_suffix(k, start.len() + HEIGHT_KEY_LEN))
            .collect();
        load_orders(store, &ids)
    }

    /// Orders created exactly at `height`.
    pub fn get_orders_at_height<S: KvStore>(&self, store: &S, height: u64) -> Result<Vec<Order>, StoreError> {
        let start = self.queue_height_prefix(height);
        let end = match height.checked_add(1) {
            Some(next) => self.queue_height_prefix(next),
            None => prefix_end(&self.queue_prefix()).unwrap_or_default(),
        };
        let skip = self.queue_prefix().len() + HEIGHT_KEY_LEN;
        let ids: Vec<String> = store
            .range(&start, &end)
            .map(|(k, _)| id_suffix(k, skip))
            .collect();
        load_orders(store, &ids)
    }

    /// The crossing part of the book. Clears the dirty marker.
    pub fn get_matching_candidates<S: KvStore>(&self, store: &mut S) -> Result<MatchingCandidates, StoreError> {
        self.clear_dirty(store);

        let bid_prefix = self.list_prefix(BID_LIST_KEY);
        let ask_prefix = self.list_prefix(ASK_LIST_KEY);
        let skip = bid_prefix.len() + PRICE_KEY_LEN;

        let best_bid = store.prefix(&bid_prefix).next_back().map(|(k, _)| k.to_vec());
        let best_ask = store.prefix(&ask_prefix).next().map(|(k, _)| k.to_vec());
        let (best_bid, best_ask) = match (best_bid, best_ask) {
            (Some(b), Some(a)) => (b, a),
            _ => return Ok(MatchingCandidates::default()),
        };
        let best_bid_price = &best_bid[bid_prefix.len()..skip];
        let best_ask_price = &best_ask[ask_prefix.len()..skip];
        if best_ask_price > best_bid_price {
            return Ok(MatchingCandidates::default());
        }

        // bids from the top while price >= best ask
        let bid_ids: Vec<String> = store
            .prefix(&bid_prefix)
            .rev()
            .take_while(|(k, _)| &k[bid_prefix.len()..skip] >= best_ask_price)
            .map(|(k, _)| id_suffix(k, skip))
            .collect();
        // asks from the bottom while price <= best bid
        let ask_ids: Vec<String> = store
            .prefix(&ask_prefix)
            .take_while(|(k, _)| &k[ask_prefix.len()..skip] <= best_bid_price)
            .map(|(k, _)| id_suffix(k, skip))
            .collect();

        Ok(MatchingCandidates {
            bids: load_orders(store, &bid_ids)?,
            asks: load_orders(store, &ask_ids)?,
        })
    }

    pub fn clear_dirty<S: KvStore>(&self, store: &mut S) {
        store.delete(&dirty_key(&self.symbol));
    }

    /// Every order of this market, bids then asks, each in key order.
    pub fn get_all_orders<S: KvStore>(&self, store: &S) -> Result<Vec<Order>, StoreError> {
        let mut ids = Vec::new();
        for list in [BID_LIST_KEY, ASK_LIST_KEY] {
            let prefix = self.list_prefix(list);
            let skip = prefix.len() + PRICE_KEY_LEN;
            ids.extend(store.prefix(&prefix).map(|(k, _)| id_suffix(k, skip)));
        }
        load_orders(store, &ids)
    }

    fn list_prefix(&self, list: u8) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.symbol.len() + 2);
        key.push(list);
        key.extend_from_slice(self.symbol.as_bytes());
        key.push(SEPARATOR);
        key
    }

    fn side_key(&self, order: &Order, id: &str) -> Result<Vec<u8>, StoreError> {
        let list = match order.side {
            Side::Buy => BID_LIST_KEY,
            Side::Sell => ASK_LIST_KEY,
        };
        let mut key = self.list_prefix(list);
        key.extend_from_slice(&encode_price(order.price.value())?);
        key.extend_from_slice(id.as_bytes());
        Ok(key)
    }

    fn queue_prefix(&self) -> Vec<u8> {
        self.list_prefix(ORDER_QUEUE_KEY)
    }

    fn queue_height_prefix(&self, height: u64) -> Vec<u8> {
        let mut key = self.queue_prefix();
        key.extend_from_slice(&encode_height(height));
        key
    }

    fn queue_key(&self, height: u64, id: &str) -> Vec<u8> {
        let mut key = self.queue_height_prefix(height);
        key.extend_from_slice(id.as_bytes());
        key
    }
}

/// Every order in the global table whose id starts with `"{user}-"`.
pub fn orders_from_user<S: KvStore>(store: &S, user: &str) -> Result<Vec<Order>, StoreError> {
    store
        .prefix(&order_key(&format!("{user}-")))
        .map(|(_, v)| decode_value(v))
        .collect()
}

/// Every order in the global table, in order-id order.
pub fn all_orders<S: KvStore>(store: &S) -> Result<Vec<Order>, StoreError> {
    store
        .prefix(&[ORDER_BOOK_KEY, SEPARATOR])
        .map(|(_, v)| decode_value(v))
        .collect()
}

/// Symbols flagged with newly added orders, in symbol order.
pub fn dirty_markets<S: KvStore>(store: &S) -> Vec<String> {
    store
        .prefix(&[NEWLY_ADDED_KEY])
        .filter_map(|(k, _)| String::from_utf8(k[1..].to_vec()).ok())
        .collect()
}

fn order_key(order_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(order_id.len() + 2);
    key.push(ORDER_BOOK_KEY);
    key.push(SEPARATOR);
    key.extend_from_slice(order_id.as_bytes());
    key
}

fn dirty_key(symbol: &str) -> Vec<u8> {
    let mut key = vec![NEWLY_ADDED_KEY];
    key.extend_from_slice(symbol.as_bytes());
    key
}

fn id_suffix(key: &[u8], skip: usize) -> String {
    String::from_utf8_lossy(&key[skip.min(key.len())..]).into_owned()
}

fn load_orders<S: KvStore>(store: &S, ids: &[String]) -> Result<Vec<Order>, StoreError> {
    ids.iter()
        .map(|id| {
            store
                .get(&order_key(id))
                .ok_or_else(|| StoreError::OrderNotFound(id.clone()))
                .and_then(decode_value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::tests::sample_order;
    use crate::store::MemStore;
    use crate::types::Address;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn order(owner: &str, seq: u64, side: Side, price: Decimal, qty: i64, height: u64) -> Order {
        let mut o = sample_order(side, price, qty, height);
        o.sender = Address::new(owner);
        o.sequence = seq;
        o
    }

    fn ids(orders: &[Order]) -> Vec<String> {
        orders.iter().map(Order::order_id).collect()
    }

    #[test]
    fn add_then_remove_restores_store() {
        let mut store = MemStore::new();
        let book = OrderBook::new("abc/cet");
        let resting = order("bob", 1, Side::Sell, dec!(5), 10, 1);
        book.add(&mut store, &resting).unwrap();
        book.get_matching_candidates(&mut store).unwrap();
        let before = store.clone();

        let o = order("alice", 2, Side::Buy, dec!(1.5), 10, 3);
        book.add(&mut store, &o).unwrap();
        book.get_matching_candidates(&mut store).unwrap();
        book.remove(&mut store, &o).unwrap();

        assert_eq!(store, before);
        assert_eq!(book.get_all_orders(&store).unwrap(), vec![resting]);
    }

    #[test]
    fn remove_missing_fails() {
        let mut store = MemStore::new();
        let book = OrderBook::new("abc/cet");
        let o = order("alice", 1, Side::Buy, dec!(1), 10, 3);
        assert!(matches!(book.remove(&mut store, &o), Err(StoreError::OrderNotFound(_))));
    }

    #[test]
    fn update_is_idempotent() {
        let mut store = MemStore::new();
        let book = OrderBook::new("abc/cet");
        let mut o = order("alice", 1, Side::Buy, dec!(1), 10, 3);
        book.add(&mut store, &o).unwrap();
        let size = store.len();
        o.left_stock = 4;
        book.update(&mut store, &o).unwrap();
        book.update(&mut store, &o).unwrap();
        assert_eq!(store.len(), size);
        assert_eq!(OrderBook::get_order(&store, &o.order_id()).unwrap().unwrap().left_stock, 4);
    }

    #[test]
    fn height_queue_scans() {
        let mut store = MemStore::new();
        let book = OrderBook::new("abc/cet");
        for (seq, h) in [(1, 5), (2, 6), (3, 6), (4, 9)] {
            book.add(&mut store, &order("alice", seq, Side::Sell, dec!(1), 10, h)).unwrap();
        }
        let older = book.get_older_than(&store, 9).unwrap();
        assert_eq!(ids(&older), vec!["alice-3-0", "alice-2-0", "alice-1-0"]);
        let at_six = book.get_orders_at_height(&store, 6).unwrap();
        assert_eq!(ids(&at_six), vec!["alice-2-0", "alice-3-0"]);
        assert!(book.get_orders_at_height(&store, 7).unwrap().is_empty());
    }

    #[test]
    fn no_candidates_without_crossing() {
        let mut store = MemStore::new();
        let book = OrderBook::new("abc/cet");
        book.add(&mut store, &order("alice", 1, Side::Buy, dec!(9), 10, 1)).unwrap();
        book.add(&mut store, &order("bob", 1, Side::Sell, dec!(10), 10, 1)).unwrap();
        assert_eq!(dirty_markets(&store), vec!["abc/cet"]);

        let candidates = book.get_matching_candidates(&mut store).unwrap();
        assert!(candidates.is_empty());
        assert!(dirty_markets(&store).is_empty());
    }

    #[test]
    fn one_sided_book_has_no_candidates() {
        let mut store = MemStore::new();
        let book = OrderBook::new("abc/cet");
        book.add(&mut store, &order("alice", 1, Side::Buy, dec!(9), 10, 1)).unwrap();
        assert!(book.get_matching_candidates(&mut store).unwrap().is_empty());
    }

    #[test]
    fn candidates_cover_crossing_range() {
        let mut store = MemStore::new();
        let book = OrderBook::new("abc/cet");
        book.add(&mut store, &order("b", 1, Side::Buy, dec!(12), 10, 1)).unwrap();
        book.add(&mut store, &order("b", 2, Side::Buy, dec!(10), 10, 1)).unwrap();
        book.add(&mut store, &order("b", 3, Side::Buy, dec!(8), 10, 1)).unwrap();
        book.add(&mut store, &order("s", 1, Side::Sell, dec!(9.5), 10, 1)).unwrap();
        book.add(&mut store, &order("s", 2, Side::Sell, dec!(12), 10, 1)).unwrap();
        book.add(&mut store, &order("s", 3, Side::Sell, dec!(13), 10, 1)).unwrap();

        let c = book.get_matching_candidates(&mut store).unwrap();
        assert_eq!(ids(&c.bids), vec!["b-1-0", "b-2-0"]);
        assert_eq!(ids(&c.asks), vec!["s-1-0", "s-2-0"]);
    }

    #[test]
    fn user_and_global_scans() {
        let mut store = MemStore::new();
        let book = OrderBook::new("abc/cet");
        let other = OrderBook::new("xyz/cet");
        book.add(&mut store, &order("alice", 1, Side::Buy, dec!(1), 10, 1)).unwrap();
        book.add(&mut store, &order("alice", 2, Side::Sell, dec!(2), 10, 1)).unwrap();
        let mut x = order("alice2", 1, Side::Sell, dec!(2), 10, 1);
        x.trading_pair = "xyz/cet".to_string();
        other.add(&mut store, &x).unwrap();

        assert_eq!(orders_from_user(&store, "alice").unwrap().len(), 2);
        assert_eq!(all_orders(&store).unwrap().len(), 3);
        assert_eq!(book.get_all_orders(&store).unwrap().len(), 2);
        assert_eq!(dirty_markets(&store), vec!["abc/cet", "xyz/cet"]);
    }
}
