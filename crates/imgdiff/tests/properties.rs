use imgdiff::{DiffOptions, PixelArray, Shape, Tolerance};
use proptest::prelude::*;

fn pair_strategy() -> impl Strategy<Value = (PixelArray, PixelArray)> {
    (1usize..8, 1usize..8, 1usize..5).prop_flat_map(|(h, w, c)| {
        let len = h * w * c;
        (
            prop::collection::vec(0u8..=255, len),
            prop::collection::vec(0u8..=255, len),
        )
            .prop_map(move |(a, b)| {
                let shape = Shape::new(h, w, c);
                (
                    PixelArray::new(shape, a).unwrap(),
                    PixelArray::new(shape, b).unwrap(),
                )
            })
    })
}

fn tolerance(zero_threshold: f64, rel_err: f64) -> Tolerance {
    let options = DiffOptions::new()
        .with_zero_threshold(zero_threshold)
        .with_rel_err(rel_err);
    Tolerance::from_options(&options).unwrap()
}

proptest! {
    #[test]
    fn identical_arrays_never_differ(
        (a, _) in pair_strategy(),
        zero_threshold in 0.0f64..300.0,
    ) {
        prop_assert_eq!(a.difference_fraction(&a, zero_threshold), Some(0.0));
    }

    #[test]
    fn fraction_stays_in_unit_interval((test, gold) in pair_strategy(), zt in 0.0f64..300.0) {
        let f = test.difference_fraction(&gold, zt).unwrap();
        prop_assert!((0.0..=1.0).contains(&f));
    }

    #[test]
    fn raising_zero_threshold_never_raises_fraction(
        (test, gold) in pair_strategy(),
        low in 0.0f64..300.0,
        bump in 0.0f64..300.0,
    ) {
        let at_low = test.difference_fraction(&gold, low).unwrap();
        let at_high = test.difference_fraction(&gold, low + bump).unwrap();
        prop_assert!(at_high <= at_low);
    }

    #[test]
    fn raising_rel_err_never_turns_pass_into_fail(
        (test, gold) in pair_strategy(),
        zt in 0.0f64..300.0,
        rel_err in 0.0f64..=1.0,
        bump in 0.0f64..=1.0,
    ) {
        let strict = tolerance(zt, rel_err);
        let loose = tolerance(zt, (rel_err + bump).min(1.0));
        let f = test.difference_fraction(&gold, strict.zero_threshold).unwrap();
        if strict.check(f).is_none() {
            prop_assert!(loose.check(f).is_none());
        }
    }

    #[test]
    fn difference_is_symmetric((a, b) in pair_strategy(), zt in 0.0f64..300.0) {
        prop_assert_eq!(a.difference_fraction(&b, zt), b.difference_fraction(&a, zt));
    }
}
