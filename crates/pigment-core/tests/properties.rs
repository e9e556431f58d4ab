//! Property-based tests for pigment-core primitives.

use pigment_core::{SpscRing, TraceKind, TraceLog, Xorshift32, cents_to_ratio, ratio_to_cents};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Any interleaving of pushes and pops behaves like a bounded FIFO of
    /// capacity N - 1.
    #[test]
    fn ring_matches_bounded_fifo(ops in prop::collection::vec(any::<Option<u16>>(), 0..400)) {
        let mut ring = SpscRing::<u16, 16>::new();
        let mut model = std::collections::VecDeque::new();

        for op in ops {
            match op {
                Some(value) => {
                    let accepted = ring.push(value);
                    prop_assert_eq!(accepted, model.len() < 15);
                    if accepted {
                        model.push_back(value);
                    }
                }
                None => {
                    prop_assert_eq!(ring.pop(), model.pop_front());
                }
            }
            prop_assert_eq!(ring.len(), model.len());
            prop_assert!(ring.len() <= 15);
        }
    }

    /// The trace log retains min(written, capacity) records and counts the
    /// rest as dropped.
    #[test]
    fn trace_counts_are_consistent(capacity in 2usize..64, writes in 0u64..300) {
        let log = TraceLog::with_capacity(capacity);
        for i in 0..writes {
            log.log_event(TraceKind::PaintGesture, i, 0.0, 0.0, 0.0);
        }
        let cap = log.capacity() as u64;
        prop_assert_eq!(log.event_count() as u64, writes.min(cap));
        prop_assert_eq!(u64::from(log.dropped_event_count()), writes.saturating_sub(cap));

        if writes > 0 {
            let newest = log.read_event(log.event_count() - 1).unwrap();
            prop_assert_eq!(newest.frame, writes - 1);
        }
    }

    /// Cents conversions invert each other.
    #[test]
    fn cents_round_trip(cents in -4800.0f64..4800.0) {
        let back = ratio_to_cents(cents_to_ratio(cents));
        prop_assert!((back - cents).abs() < 1e-6);
    }

    /// Xorshift floats stay in range for any seed.
    #[test]
    fn xorshift_ranges(seed in any::<u32>()) {
        let mut rng = Xorshift32::new(seed);
        for _ in 0..256 {
            let u = rng.next_f32();
            prop_assert!((0.0..1.0).contains(&u));
        }
    }
}
