//! Property-style checks over many seeds.

use std::collections::HashSet;

use bingo_draw::{DrawSequencer, NumberSpace, generate_card};
use rand::SeedableRng;
use rand::rngs::StdRng;

#[test]
fn test_every_number_drawn_exactly_once_for_many_seeds() {
    let space = NumberSpace::default();
    for seed in 0..200 {
        let mut seq = DrawSequencer::new(&space, StdRng::seed_from_u64(seed));
        let order: Vec<_> = seq.by_ref().collect();

        assert_eq!(order.len(), space.len(), "seed {seed}");
        let unique: HashSet<_> = order.iter().copied().collect();
        assert_eq!(unique.len(), space.len(), "duplicate draw for seed {seed}");
        assert!(order.iter().all(|n| space.contains(*n)));
        assert!(seq.is_exhausted());
        assert_eq!(seq.drawn(), order.as_slice());
    }
}

#[test]
fn test_drawn_and_remaining_always_partition_the_space() {
    let space = NumberSpace::new(1, 30).unwrap();
    let mut seq = DrawSequencer::new(&space, StdRng::seed_from_u64(11));
    let full: HashSet<_> = space.iter().collect();

    while !seq.is_exhausted() {
        seq.next();
        let mut union: HashSet<_> = seq.drawn().iter().copied().collect();
        let before = union.len();
        union.extend(seq.remaining().iter().copied());
        assert_eq!(union.len(), before + seq.remaining_len(), "overlap");
        assert_eq!(union, full);
    }
}

#[test]
fn test_cards_are_subsets_of_exact_size_for_many_seeds() {
    let space = NumberSpace::default();
    for seed in 0..500 {
        let card = generate_card(&space, 20, &mut StdRng::seed_from_u64(seed)).unwrap();
        assert_eq!(card.len(), 20);
        let unique: HashSet<_> = card.numbers().iter().collect();
        assert_eq!(unique.len(), 20);
        assert!(card.numbers().iter().all(|n| space.contains(*n)));
    }
}

#[test]
fn test_first_draw_is_roughly_uniform() {
    // 6000 sequencers over 60 numbers: each number should lead ~100 times.
    let space = NumberSpace::default();
    let mut counts = vec![0u32; space.len()];
    for seed in 0..6000 {
        let mut seq = DrawSequencer::new(&space, StdRng::seed_from_u64(seed));
        let first = seq.next().unwrap();
        counts[usize::from(first - space.low())] += 1;
    }
    for (i, count) in counts.iter().enumerate() {
        assert!(
            (40..=160).contains(count),
            "number {} led {count} times",
            i + 1
        );
    }
}

#[test]
fn test_card_membership_is_roughly_uniform() {
    // 3000 cards of 20 from 60: each number appears on ~1000 cards.
    let space = NumberSpace::default();
    let mut counts = vec![0u32; space.len()];
    for seed in 0..3000 {
        let card = generate_card(&space, 20, &mut StdRng::seed_from_u64(seed)).unwrap();
        for n in card.numbers() {
            counts[usize::from(n - space.low())] += 1;
        }
    }
    for count in counts {
        assert!((850..=1150).contains(&count), "skewed count {count}");
    }
}
