//! End-to-end tests across admission, matching and settlement.
//!
//! Orders go in through the reference ledger's `post` (which reserves
//! funds), blocks run through `ExecutionKeeper`, and balances, order state
//! and events are checked afterwards. Every test also checks that no asset
//! ends up with more in circulation plus reserved than was deposited.

use blockclear_ledger::{
    BalanceManager, EventLog, MarketDirectory, MetricsRecorder, OrderKeeper, PostOrder,
};
use blockclear_settlement::{BlockContext, BlockSummary, ExecutionKeeper, StateAccess};
use blockclear_types::*;
use chrono::{DateTime, TimeZone, Utc};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn whole(n: u64) -> Amount {
    Quantity::from_whole(n).units()
}

fn block_time(height: u64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + i64::try_from(height).unwrap() * 5, 0)
        .unwrap()
}

/// Full exchange: ledger collaborators plus the execution pipeline.
struct Exchange {
    orders: OrderKeeper,
    markets: MarketDirectory,
    bank: BalanceManager,
    keeper: ExecutionKeeper<EventLog, MetricsRecorder>,
}

impl Exchange {
    fn new(config: ExecutionConfig) -> Self {
        init_tracing();
        Self {
            orders: OrderKeeper::new(config.max_time_in_force),
            markets: MarketDirectory::new(),
            bank: BalanceManager::new(),
            keeper: ExecutionKeeper::new(config, EventLog::new(), MetricsRecorder::new()).unwrap(),
        }
    }

    fn with_market() -> (Self, MarketId) {
        let mut ex = Self::new(ExecutionConfig::default());
        let market = ex.market("tst1", "tst2");
        (ex, market)
    }

    fn market(&mut self, base: &str, quote: &str) -> MarketId {
        self.bank.register_denomination(base);
        self.bank.register_denomination(quote);
        self.markets.create_market(base, quote).unwrap()
    }

    fn funded(&mut self, asset: &str, amount: Amount) -> AccountId {
        let account = AccountId::new();
        self.bank.deposit(account, asset, amount).unwrap();
        account
    }

    #[allow(clippy::too_many_arguments)]
    fn post(
        &mut self,
        owner: AccountId,
        market_id: MarketId,
        direction: Direction,
        price: Price,
        quantity: Quantity,
        tif: u16,
        height: u64,
    ) -> OrderId {
        let request = PostOrder {
            owner,
            market_id,
            direction,
            price,
            quantity,
            time_in_force_blocks: tif,
        };
        self.orders
            .post(request, height, block_time(height), &self.markets, &mut self.bank)
            .unwrap()
            .id
    }

    fn run_block(&mut self, height: u64) -> Result<BlockSummary> {
        let mut state = StateAccess::new(&mut self.orders, &self.markets, &mut self.bank);
        self.keeper
            .execute_and_cancel_expired(&mut state, BlockContext::new(height, block_time(height)))
    }

    fn balance(&self, account: AccountId, asset: &str) -> Amount {
        self.bank.balance(account, asset)
    }

    /// Funds still held back by resting orders, per asset.
    fn reserved(&self, asset: &str) -> Amount {
        let mut total = 0;
        self.orders.iterate(&mut |order| {
            let market = self.markets.get(order.market_id).unwrap();
            if order.escrow_asset(&market) == asset {
                total += order.escrow;
            }
            true
        });
        total
    }

    fn assert_conserved(&self) {
        self.bank.verify_supply().unwrap();
        for asset in self.bank.audit().tracked_assets() {
            let held = self.bank.total_supply(asset) + self.reserved(asset);
            assert!(
                held <= self.bank.audit().total_deposits(asset),
                "{asset}: held {held} > deposited {}",
                self.bank.audit().total_deposits(asset)
            );
        }
    }
}

// =====================================================================
// Scenarios
// =====================================================================

#[test]
fn equal_prices_clear_fully() {
    let (mut ex, m) = Exchange::with_market();
    let buyer = ex.funded("tst2", whole(20));
    let seller = ex.funded("tst1", whole(10));
    ex.post(buyer, m, Direction::Bid, Price::from_whole(2), Quantity::from_whole(10), 100, 1);
    ex.post(seller, m, Direction::Ask, Price::from_whole(2), Quantity::from_whole(10), 100, 1);

    let summary = ex.run_block(2).unwrap();
    assert_eq!(summary.markets_matched, 1);
    assert_eq!(summary.fills, 2);
    assert_eq!(summary.expired, 0);

    assert_eq!(ex.balance(buyer, "tst1"), whole(10));
    assert_eq!(ex.balance(buyer, "tst2"), 0);
    assert_eq!(ex.balance(seller, "tst2"), whole(20));
    assert_eq!(ex.balance(seller, "tst1"), 0);
    assert!(ex.orders.is_empty());

    let batch = ex.keeper.events().batches().next().unwrap();
    assert_eq!(batch.clearing_price, Price::from_whole(2));
    assert_eq!(batch.block_number, 2);
    let fills: Vec<&FillEvent> = ex.keeper.events().fills().collect();
    assert_eq!(fills.len(), 2);
    assert!(fills.iter().all(|f| f.qty_unfilled.is_zero()));
    assert_eq!(fills[0].block_time, block_time(2).timestamp());
    ex.assert_conserved();
}

#[test]
fn buyer_above_clearing_price_is_refunded() {
    let (mut ex, m) = Exchange::with_market();
    let buyer = ex.funded("tst2", whole(15));
    let seller = ex.funded("tst1", whole(5));
    ex.post(buyer, m, Direction::Bid, Price::from_whole(3), Quantity::from_whole(5), 100, 1);
    ex.post(seller, m, Direction::Ask, Price::from_whole(2), Quantity::from_whole(5), 100, 1);

    ex.run_block(2).unwrap();

    let batch = ex.keeper.events().batches().next().unwrap();
    assert_eq!(batch.clearing_price, Price::from_whole(2));
    assert_eq!(ex.balance(buyer, "tst1"), whole(5));
    // Reserved 15, paid 10, refunded (3 - 2) * 5.
    assert_eq!(ex.balance(buyer, "tst2"), whole(5));
    assert_eq!(ex.balance(seller, "tst2"), whole(10));
    ex.assert_conserved();
}

#[test]
fn expired_order_is_cancelled_before_matching() {
    let (mut ex, m) = Exchange::with_market();
    let buyer = ex.funded("tst2", whole(20));
    let seller = ex.funded("tst1", whole(10));
    let bid = ex.post(buyer, m, Direction::Bid, Price::from_whole(2), Quantity::from_whole(10), 10, 5);
    assert_eq!(ex.balance(buyer, "tst2"), 0);

    // Crossing ask arrives in the block the bid expires.
    let ask = ex.post(seller, m, Direction::Ask, Price::from_whole(2), Quantity::from_whole(10), 10, 16);

    let summary = ex.run_block(16).unwrap();
    assert_eq!(summary.expired, 1);
    assert_eq!(summary.fills, 0);
    assert_eq!(ex.balance(buyer, "tst2"), whole(20));
    assert!(ex.orders.get(bid).is_err());
    assert!(ex.orders.get(ask).is_ok());
    assert!(ex.keeper.events().events().is_empty());
    ex.assert_conserved();
}

#[test]
fn not_expired_at_boundary_height() {
    let (mut ex, m) = Exchange::with_market();
    let buyer = ex.funded("tst2", whole(20));
    let bid = ex.post(buyer, m, Direction::Bid, Price::from_whole(2), Quantity::from_whole(10), 10, 5);
    let summary = ex.run_block(15).unwrap();
    assert_eq!(summary.expired, 0);
    assert!(ex.orders.get(bid).is_ok());
}

#[test]
fn resting_ask_partially_filled() {
    let (mut ex, m) = Exchange::with_market();
    let seller = ex.funded("tst1", whole(10));
    let buyer = ex.funded("tst2", whole(8));
    let ask = ex.post(seller, m, Direction::Ask, Price::from_whole(2), Quantity::from_whole(10), 100, 1);
    assert_eq!(ex.run_block(1).unwrap().fills, 0);

    let bid = ex.post(buyer, m, Direction::Bid, Price::from_whole(2), Quantity::from_whole(4), 100, 2);
    let summary = ex.run_block(2).unwrap();
    assert_eq!(summary.fills, 2);

    let resting = ex.orders.get(ask).unwrap();
    assert_eq!(resting.quantity, Quantity::from_whole(6));
    assert_eq!(resting.status, OrderStatus::PartiallyFilled);
    assert!(ex.orders.get(bid).is_err());

    let ask_fill = ex.keeper.events().fills().find(|f| f.order_id == ask).unwrap();
    assert_eq!(ask_fill.qty_filled, Quantity::from_whole(4));
    assert_eq!(ask_fill.qty_unfilled, Quantity::from_whole(6));
    assert_eq!(ask_fill.pair, "tst1/tst2");
    assert_eq!(ex.balance(seller, "tst2"), whole(8));
    assert_eq!(ex.balance(buyer, "tst1"), whole(4));
    ex.assert_conserved();

    // Cancelling the remainder returns exactly the unfilled base.
    ex.orders.cancel_as(seller, ask, &ex.markets, &mut ex.bank).unwrap();
    assert_eq!(ex.balance(seller, "tst1"), whole(6));
    ex.assert_conserved();
}

#[test]
fn no_cross_emits_nothing() {
    let (mut ex, m) = Exchange::with_market();
    let buyer = ex.funded("tst2", whole(10));
    let seller = ex.funded("tst1", whole(10));
    ex.post(buyer, m, Direction::Bid, Price::from_whole(1), Quantity::from_whole(10), 100, 1);
    ex.post(seller, m, Direction::Ask, Price::from_whole(2), Quantity::from_whole(10), 100, 1);

    let summary = ex.run_block(2).unwrap();
    assert_eq!(summary, BlockSummary::default());
    assert!(ex.keeper.events().events().is_empty());
    assert_eq!(ex.orders.len(), 2);
    assert_eq!(ex.keeper.pool().available(), 1);
}

// =====================================================================
// Rounding
// =====================================================================

#[test]
fn truncated_refund_does_not_abort_block() {
    let (mut ex, m) = Exchange::with_market();
    let buyer = ex.funded("tst2", whole(1));
    let seller = ex.funded("tst1", whole(1));
    ex.post(buyer, m, Direction::Bid, Price::from_units(250_000_000), Quantity::from_units(1), 100, 1);
    ex.post(seller, m, Direction::Ask, Price::from_units(240_000_000), Quantity::from_units(1), 100, 1);

    let summary = ex.run_block(2).unwrap();
    assert_eq!(summary.fills, 2);
    assert_eq!(ex.balance(buyer, "tst1"), 1);
    // Escrowed ceil(2.5) = 3 units, paid ceil(2.4) = 3, nothing to refund.
    assert_eq!(ex.balance(buyer, "tst2"), whole(1) - 3);
    assert_eq!(ex.balance(seller, "tst2"), 2);
    ex.assert_conserved();
}

#[test]
fn one_ask_against_many_small_bids_creates_no_quote() {
    let (mut ex, m) = Exchange::with_market();
    let price = Price::from_units(150_000_000);
    // Each bid is worth 1.5 units and escrows 2.
    let buyers: Vec<AccountId> = (0..2).map(|_| ex.funded("tst2", 2)).collect();
    let seller = ex.funded("tst1", 2);
    for &buyer in &buyers {
        ex.post(buyer, m, Direction::Bid, price, Quantity::from_units(1), 100, 1);
    }
    ex.post(seller, m, Direction::Ask, price, Quantity::from_units(2), 100, 1);

    let summary = ex.run_block(2).unwrap();
    assert_eq!(summary.fills, 3);
    assert_eq!(ex.balance(seller, "tst2"), 3);
    for &buyer in &buyers {
        assert_eq!(ex.balance(buyer, "tst1"), 1);
        assert_eq!(ex.balance(buyer, "tst2"), 0);
    }
    ex.bank.verify_supply().unwrap();
    // Four units went in and three came out. One is dust.
    assert_eq!(ex.bank.total_supply("tst2"), 3);
    assert_eq!(ex.bank.audit().total_deposits("tst2"), 4);
    ex.assert_conserved();
}

#[test]
fn bid_filled_across_blocks_pays_from_its_escrow() {
    let (mut ex, m) = Exchange::with_market();
    let price = Price::from_units(150_000_000);
    let buyer = ex.funded("tst2", 5);
    // 1.5 * 0.00000003 escrows ceil(4.5) = 5 units.
    let bid = ex.post(buyer, m, Direction::Bid, price, Quantity::from_units(3), 100, 1);
    assert_eq!(ex.balance(buyer, "tst2"), 0);

    let first = ex.funded("tst1", 1);
    ex.post(first, m, Direction::Ask, price, Quantity::from_units(1), 100, 2);
    assert_eq!(ex.run_block(2).unwrap().fills, 2);
    assert_eq!(ex.balance(first, "tst2"), 1);
    let resting = ex.orders.get(bid).unwrap();
    assert_eq!(resting.escrow, 3);
    ex.assert_conserved();

    let second = ex.funded("tst1", 2);
    ex.post(second, m, Direction::Ask, price, Quantity::from_units(2), 100, 3);
    assert_eq!(ex.run_block(3).unwrap().fills, 2);
    assert_eq!(ex.balance(second, "tst2"), 3);
    assert!(ex.orders.get(bid).is_err());
    assert_eq!(ex.balance(buyer, "tst1"), 3);
    assert_eq!(ex.balance(buyer, "tst2"), 0);
    ex.assert_conserved();
}

// =====================================================================
// Events and policy
// =====================================================================

#[test]
fn best_effort_publish_keeps_settling() {
    let (mut ex, m) = Exchange::with_market();
    let buyer = ex.funded("tst2", whole(2));
    let seller = ex.funded("tst1", whole(1));
    ex.post(buyer, m, Direction::Bid, Price::from_whole(2), Quantity::from_whole(1), 100, 1);
    ex.post(seller, m, Direction::Ask, Price::from_whole(2), Quantity::from_whole(1), 100, 1);
    ex.keeper.events_mut().set_failing(true);

    let summary = ex.run_block(2).unwrap();
    assert_eq!(summary.fills, 2);
    assert_eq!(ex.keeper.events().rejected(), 3);
    assert_eq!(ex.balance(seller, "tst2"), whole(2));
}

#[test]
fn abort_policy_fails_block_on_publish_error() {
    let mut ex = Exchange::new(ExecutionConfig::from_json_str(r#"{"publish_failure_policy":"abort"}"#).unwrap());
    let m = ex.market("tst1", "tst2");
    let buyer = ex.funded("tst2", whole(2));
    let seller = ex.funded("tst1", whole(1));
    ex.post(buyer, m, Direction::Bid, Price::from_whole(2), Quantity::from_whole(1), 100, 1);
    ex.post(seller, m, Direction::Ask, Price::from_whole(2), Quantity::from_whole(1), 100, 1);
    ex.keeper.events_mut().set_failing(true);

    let err = ex.run_block(2).unwrap_err();
    assert!(matches!(err, BlockclearError::PublishFailed { .. }));
    // The batch publish failed before any fill was settled.
    assert_eq!(ex.balance(seller, "tst2"), 0);
    assert_eq!(ex.orders.len(), 2);
}

#[test]
fn markets_settle_in_ascending_id_order() {
    let mut ex = Exchange::new(ExecutionConfig::default());
    let first = ex.market("tst1", "tst2");
    let second = ex.market("tst3", "tst2");
    let buyer = ex.funded("tst2", whole(100));
    let seller_a = ex.funded("tst1", whole(10));
    let seller_b = ex.funded("tst3", whole(10));

    // Post the second market's orders first.
    ex.post(seller_b, second, Direction::Ask, Price::from_whole(1), Quantity::from_whole(3), 100, 1);
    ex.post(buyer, second, Direction::Bid, Price::from_whole(1), Quantity::from_whole(3), 100, 1);
    ex.post(seller_a, first, Direction::Ask, Price::from_whole(2), Quantity::from_whole(2), 100, 1);
    ex.post(buyer, first, Direction::Bid, Price::from_whole(2), Quantity::from_whole(2), 100, 1);

    let summary = ex.run_block(2).unwrap();
    assert_eq!(summary.markets_matched, 2);
    assert_eq!(summary.match_roots.keys().copied().collect::<Vec<_>>(), vec![first, second]);

    let batch_markets: Vec<MarketId> = ex.keeper.events().batches().map(|b| b.market_id).collect();
    assert_eq!(batch_markets, vec![first, second]);

    let fill_markets: Vec<MarketId> = ex.keeper.events().fills().map(|f| f.market_id).collect();
    assert_eq!(fill_markets, vec![first, first, second, second]);

    // Both batches are published before any fill.
    let kinds: Vec<bool> = ex.keeper.events().events().iter().map(|e| e.as_batch().is_some()).collect();
    assert_eq!(kinds, vec![true, true, false, false, false, false]);
    ex.assert_conserved();
}

#[test]
fn summary_and_metrics_are_recorded() {
    let (mut ex, m) = Exchange::with_market();
    let buyer = ex.funded("tst2", whole(4));
    let seller = ex.funded("tst1", whole(2));
    ex.post(buyer, m, Direction::Bid, Price::from_whole(2), Quantity::from_whole(2), 100, 1);
    ex.post(seller, m, Direction::Ask, Price::from_whole(2), Quantity::from_whole(2), 100, 1);

    let summary = ex.run_block(2).unwrap();
    ex.run_block(3).unwrap();

    assert_eq!(ex.keeper.metrics().blocks(), 2);
    assert_eq!(ex.keeper.metrics().fills_processed, vec![2, 0]);
    assert_eq!(summary.match_roots[&m].len(), 64);

    let json = serde_json::to_string(&summary).unwrap();
    assert!(json.contains("\"markets_matched\":1"), "{json}");
}

// =====================================================================
// Randomized conservation
// =====================================================================

#[test]
fn randomized_blocks_conserve_supply() {
    let (mut ex, m) = Exchange::with_market();
    let mut rng = StdRng::seed_from_u64(0xb10c);

    let accounts: Vec<AccountId> = (0..8)
        .map(|_| {
            let account = ex.funded("tst1", whole(1_000));
            ex.bank.deposit(account, "tst2", whole(1_000)).unwrap();
            account
        })
        .collect();

    let mut fills = 0;
    for height in 1..=60u64 {
        for _ in 0..rng.gen_range(0..8) {
            let owner = accounts[rng.gen_range(0..accounts.len())];
            let direction = if rng.gen_bool(0.5) { Direction::Bid } else { Direction::Ask };
            // Fractional prices of at least 1.0, so one base unit is always
            // worth at least one quote unit to a seller.
            let price = Price::from_units(rng.gen_range(100_000_000..=299_999_999));
            // Mostly dust-sized quantities, where per-fill rounding matters,
            // with the occasional 0.1 lot.
            let quantity = if rng.gen_bool(0.8) {
                Quantity::from_units(rng.gen_range(1..=100))
            } else {
                Quantity::from_units(rng.gen_range(1..=50) * (SCALE / 10))
            };
            let request = PostOrder {
                owner,
                market_id: m,
                direction,
                price,
                quantity,
                time_in_force_blocks: rng.gen_range(1..=8),
            };
            // Accounts may run dry; rejected posts leave no trace.
            let _ = ex.orders.post(request, height, block_time(height), &ex.markets, &mut ex.bank);
        }
        let summary = ex.run_block(height).unwrap();
        fills += summary.fills;
        ex.assert_conserved();
    }
    assert!(fills > 0, "random book never crossed");
    assert_eq!(ex.keeper.pool().created(), 1);
}
