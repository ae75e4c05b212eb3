//! Fuzz target for shuffle-shard dealing.
//!
//! Any deck and hand the dealer accepts must yield distinct in-range cards
//! for every hash; anything else must be refused without panicking.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use fairgate_core::scheduler::Dealer;

#[derive(Debug, Arbitrary)]
struct Input {
    deck: u16,
    hand: u8,
    hash: u64,
}

fuzz_target!(|input: Input| {
    let Ok(dealer) = Dealer::new(input.deck as usize, input.hand as usize) else {
        return;
    };
    let cards = dealer.deal_into_hand(input.hash);
    assert_eq!(cards.len(), input.hand as usize);
    for (i, card) in cards.iter().enumerate() {
        assert!(*card < input.deck as usize);
        assert!(!cards[..i].contains(card));
    }
});
