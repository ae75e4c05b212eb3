//! Dealer properties across deck and hand sizes.

use std::collections::HashSet;

use fairgate_core::scheduler::{Dealer, DealerError};

#[test]
fn every_hand_is_distinct_and_in_range() {
    for (deck, hand) in [(1, 1), (4, 2), (8, 3), (64, 8), (128, 6), (1000, 5)] {
        let dealer = Dealer::new(deck, hand).unwrap();
        for hash in (0..2_000u64).map(|i| i.wrapping_mul(0x9E37_79B9_7F4A_7C15)) {
            let cards = dealer.deal_into_hand(hash);
            assert_eq!(cards.len(), hand);
            assert!(cards.iter().all(|&c| c < deck), "deck {deck} hand {hand}: {cards:?}");
            let unique: HashSet<_> = cards.iter().collect();
            assert_eq!(unique.len(), hand, "repeated card in {cards:?}");
        }
    }
}

#[test]
fn small_deck_covers_every_ordered_hand() {
    // 5 * 4 = 20 ordered hands of two; hashes 0..20 hit each exactly once.
    let dealer = Dealer::new(5, 2).unwrap();
    let hands: HashSet<Vec<usize>> = (0..20).map(|h| dealer.deal_into_hand(h)).collect();
    assert_eq!(hands.len(), 20);
}

#[test]
fn dealing_is_deterministic() {
    let dealer = Dealer::new(64, 8).unwrap();
    for hash in [0u64, 1, 42, u64::MAX] {
        assert_eq!(dealer.deal_into_hand(hash), dealer.deal_into_hand(hash));
    }
}

#[test]
fn first_card_spreads_evenly() {
    let dealer = Dealer::new(16, 4).unwrap();
    let mut counts = [0usize; 16];
    for hash in 0..16_000u64 {
        let mut first = None;
        dealer.deal(hash.wrapping_mul(2_654_435_761), |card| {
            first.get_or_insert(card);
        });
        counts[first.unwrap()] += 1;
    }
    for count in counts {
        assert!((800..=1200).contains(&count), "uneven spread: {counts:?}");
    }
}

#[test]
fn entropy_limit_enforced() {
    assert!(Dealer::new(1 << 15, 4).is_ok());
    assert!(matches!(
        Dealer::new(1 << 16, 4),
        Err(DealerError::EntropyExceeded { bits: 64, max: 60, .. })
    ));
}
