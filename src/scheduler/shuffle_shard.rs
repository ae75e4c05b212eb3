//! Shuffle sharding: deal each flow a small, hash-derived hand of queues.
//!
//! Two flows collide on their whole hand only with very low probability, so a
//! heavy flow can hurt at most the handful of queues it was dealt.

use thiserror::Error;

/// Hash bits the dealer may consume. The top bits of a 64-bit hash are left
/// alone because callers commonly fold small integers into them.
pub const MAX_HASH_BITS: u32 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DealerError {
    #[error("deck size must be positive")]
    EmptyDeck,

    #[error("hand size must be positive")]
    EmptyHand,

    #[error("hand size {hand} exceeds deck size {deck}")]
    HandExceedsDeck { hand: usize, deck: usize },

    #[error("deck size {deck} and hand size {hand} need {bits} bits of entropy (max {max})")]
    EntropyExceeded {
        deck: usize,
        hand: usize,
        bits: u32,
        max: u32,
    },
}

/// Bits of hash needed to deal `hand_size` cards from `deck_size`.
pub fn required_entropy_bits(deck_size: usize, hand_size: usize) -> u32 {
    ((deck_size as f64).log2() * hand_size as f64).ceil() as u32
}

/// Deterministically maps a flow hash to `hand_size` distinct queue indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dealer {
    deck_size: usize,
    hand_size: usize,
}

impl Dealer {
    pub fn new(deck_size: usize, hand_size: usize) -> Result<Self, DealerError> {
        if deck_size == 0 {
            return Err(DealerError::EmptyDeck);
        }
        if hand_size == 0 {
            return Err(DealerError::EmptyHand);
        }
        if hand_size > deck_size {
            return Err(DealerError::HandExceedsDeck {
                hand: hand_size,
                deck: deck_size,
            });
        }
        let bits = required_entropy_bits(deck_size, hand_size);
        if bits > MAX_HASH_BITS {
            return Err(DealerError::EntropyExceeded {
                deck: deck_size,
                hand: hand_size,
                bits,
                max: MAX_HASH_BITS,
            });
        }
        Ok(Self { deck_size, hand_size })
    }

    pub fn deck_size(&self) -> usize {
        self.deck_size
    }

    pub fn hand_size(&self) -> usize {
        self.hand_size
    }

    /// Deal a hand, calling `pick` once per card in dealing order.
    ///
    /// The hash is read as a mixed-radix number: digit `i` has radix
    /// `deck_size - i` and selects among the cards not yet dealt.
    pub fn deal(&self, mut hash: u64, mut pick: impl FnMut(usize)) {
        let mut remainders = Vec::with_capacity(self.hand_size);
        for i in 0..self.hand_size {
            let radix = (self.deck_size - i) as u64;
            remainders.push((hash % radix) as usize);
            hash /= radix;
        }
        for i in 0..self.hand_size {
            let mut card = remainders[i];
            for j in (1..=i).rev() {
                if card >= remainders[j - 1] {
                    card += 1;
                }
            }
            pick(card);
        }
    }

    /// Deal a hand into a vector.
    pub fn deal_into_hand(&self, hash: u64) -> Vec<usize> {
        let mut hand = Vec::with_capacity(self.hand_size);
        self.deal(hash, |card| hand.push(card));
        hand
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_parameters() {
        assert_eq!(Dealer::new(0, 1), Err(DealerError::EmptyDeck));
        assert_eq!(Dealer::new(4, 0), Err(DealerError::EmptyHand));
        assert_eq!(
            Dealer::new(4, 5),
            Err(DealerError::HandExceedsDeck { hand: 5, deck: 4 })
        );
        assert!(matches!(
            Dealer::new(1 << 20, 4),
            Err(DealerError::EntropyExceeded { bits: 80, .. })
        ));
    }

    #[test]
    fn entropy_bits() {
        assert_eq!(required_entropy_bits(64, 8), 48);
        assert_eq!(required_entropy_bits(128, 8), 56);
        assert_eq!(required_entropy_bits(3, 2), 4);
        assert_eq!(required_entropy_bits(1, 1), 0);
    }

    #[test]
    fn hands_are_distinct_and_in_range() {
        for (deck, hand) in [(1, 1), (3, 2), (4, 3), (7, 7), (64, 8), (128, 6)] {
            let dealer = Dealer::new(deck, hand).unwrap();
            let mut hash: u64 = 0x9e37_79b9_7f4a_7c15;
            for _ in 0..500 {
                let cards = dealer.deal_into_hand(hash);
                assert_eq!(cards.len(), hand);
                let mut sorted = cards.clone();
                sorted.sort_unstable();
                sorted.dedup();
                assert_eq!(sorted.len(), hand, "duplicate card in {cards:?}");
                assert!(cards.iter().all(|&c| c < deck));
                hash = hash.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            }
        }
    }

    #[test]
    fn same_hash_same_hand() {
        let dealer = Dealer::new(64, 8).unwrap();
        assert_eq!(dealer.deal_into_hand(42), dealer.deal_into_hand(42));
    }

    #[test]
    fn small_hashes_decode_as_mixed_radix() {
        let dealer = Dealer::new(4, 2).unwrap();
        // 0 -> digits [0, 0] -> cards 0 then 1
        assert_eq!(dealer.deal_into_hand(0), vec![0, 1]);
        // 6 -> digits [2, 1] -> cards 2 then 1
        assert_eq!(dealer.deal_into_hand(6), vec![2, 1]);
        // 7 -> digits [3, 1] -> cards 3 then 1
        assert_eq!(dealer.deal_into_hand(7), vec![3, 1]);
    }

    #[test]
    fn full_hand_is_a_permutation() {
        let dealer = Dealer::new(5, 5).unwrap();
        let mut cards = dealer.deal_into_hand(12345);
        cards.sort_unstable();
        assert_eq!(cards, vec![0, 1, 2, 3, 4]);
    }
}
