//! Match digests for cross-replica comparison.
//!
//! Every replica clearing the same enqueue sequence must produce the same
//! [`MatchResult`]. The match root is a SHA-256 over the result's canonical
//! fields so replicas can compare outputs without shipping full payloads.

use blockclear_types::{Direction, MatchResult, PriceLevelVolume};
use sha2::{Digest, Sha256};

/// Compute the match root of one market's result.
///
/// Covers the clearing price, matched volume, both aggregate lists and
/// every fill, in order.
#[must_use]
pub fn compute_match_root(result: &MatchResult) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"blockclear:match_root:v1:");
    hasher.update(result.clearing_price.units().to_le_bytes());
    hasher.update(result.matched_volume.units().to_le_bytes());

    for levels in [&result.bid_aggregates, &result.ask_aggregates] {
        hash_levels(&mut hasher, levels);
    }

    hasher.update((result.fills.len() as u64).to_le_bytes());
    for fill in &result.fills {
        hasher.update(fill.order_id.0.to_le_bytes());
        hasher.update([match fill.direction {
            Direction::Bid => 0u8,
            Direction::Ask => 1u8,
        }]);
        hasher.update(fill.qty_filled.units().to_le_bytes());
        hasher.update(fill.qty_unfilled.units().to_le_bytes());
    }

    let digest = hasher.finalize();
    let mut root = [0u8; 32];
    root.copy_from_slice(&digest);
    root
}

fn hash_levels(hasher: &mut Sha256, levels: &[PriceLevelVolume]) {
    hasher.update((levels.len() as u64).to_le_bytes());
    for level in levels {
        hasher.update(level.price.units().to_le_bytes());
        hasher.update(level.quantity.units().to_le_bytes());
    }
}

/// Recompute the root and compare against `expected`.
#[must_use]
pub fn verify_match_root(result: &MatchResult, expected: &[u8; 32]) -> bool {
    compute_match_root(result) == *expected
}

/// Hex rendering of a match root, for logs.
#[must_use]
pub fn match_root_hex(result: &MatchResult) -> String {
    hex::encode(compute_match_root(result))
}

#[cfg(test)]
mod tests {
    use blockclear_types::{Fill, OrderId, Price, Quantity};

    use super::*;

    fn fill(id: u64, direction: Direction, filled: u64) -> Fill {
        Fill {
            order_id: OrderId(id),
            direction,
            qty_filled: Quantity::from_whole(filled),
            qty_unfilled: Quantity::ZERO,
        }
    }

    fn result(fills: Vec<Fill>) -> MatchResult {
        MatchResult {
            clearing_price: Price::from_whole(2),
            matched_volume: Quantity::from_whole(5),
            bid_aggregates: vec![PriceLevelVolume {
                price: Price::from_whole(2),
                quantity: Quantity::from_whole(5),
            }],
            ask_aggregates: vec![],
            fills,
        }
    }

    #[test]
    fn same_result_same_root() {
        let r = result(vec![fill(1, Direction::Bid, 5), fill(2, Direction::Ask, 5)]);
        assert_eq!(compute_match_root(&r), compute_match_root(&r.clone()));
    }

    #[test]
    fn fill_order_matters() {
        let a = result(vec![fill(1, Direction::Bid, 5), fill(2, Direction::Ask, 5)]);
        let b = result(vec![fill(2, Direction::Ask, 5), fill(1, Direction::Bid, 5)]);
        assert_ne!(compute_match_root(&a), compute_match_root(&b));
    }

    #[test]
    fn clearing_price_matters() {
        let a = result(vec![]);
        let mut b = a.clone();
        b.clearing_price = Price::from_whole(3);
        assert_ne!(compute_match_root(&a), compute_match_root(&b));
    }

    #[test]
    fn aggregate_side_matters() {
        let a = result(vec![]);
        let mut b = a.clone();
        std::mem::swap(&mut b.bid_aggregates, &mut b.ask_aggregates);
        assert_ne!(compute_match_root(&a), compute_match_root(&b));
    }

    #[test]
    fn verify_correct_and_wrong_root() {
        let r = result(vec![fill(1, Direction::Bid, 5)]);
        let root = compute_match_root(&r);
        assert!(verify_match_root(&r, &root));
        assert!(!verify_match_root(&r, &[0xAB; 32]));
    }

    #[test]
    fn hex_is_64_chars() {
        assert_eq!(match_root_hex(&result(vec![])).len(), 64);
    }
}
