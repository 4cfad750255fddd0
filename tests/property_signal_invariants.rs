use proptest::prelude::*;

use attention_monitor::calibration::{derive_threshold, median};
use attention_monitor::signals::hysteresis::{Crossing, HysteresisDetector};
use attention_monitor::signals::smoothing::{ema, SmoothedSignal};
use attention_monitor::signals::{BlinkDetector, HeadMotionCounter, HeadPoseLabel};
use attention_monitor::window::round3;

fn label() -> impl Strategy<Value = Option<HeadPoseLabel>> {
    prop_oneof![
        Just(None),
        Just(Some(HeadPoseLabel::Frontal)),
        Just(Some(HeadPoseLabel::Left)),
        Just(Some(HeadPoseLabel::Right)),
        Just(Some(HeadPoseLabel::Up)),
        Just(Some(HeadPoseLabel::Down)),
    ]
}

proptest! {
    #[test]
    fn pt_ema_stays_between_prev_and_value(
        prev in -10.0_f64..10.0,
        value in -10.0_f64..10.0,
        alpha in 0.01_f64..=1.0,
    ) {
        let next = ema(Some(prev), value, alpha);
        let (lo, hi) = if prev <= value { (prev, value) } else { (value, prev) };
        prop_assert!(next >= lo - 1e-12 && next <= hi + 1e-12);
    }

    #[test]
    fn pt_smoothed_channel_never_unseeds(
        inputs in prop::collection::vec(prop::option::of(0.0_f64..1.0), 1..60),
    ) {
        let mut signal = SmoothedSignal::new();
        let mut seeded = false;
        for ear in inputs {
            let update = signal.update(ear, None, 0.3, 0.3);
            prop_assert_eq!(update.ear.is_some(), ear.is_some());
            seeded |= ear.is_some();
            prop_assert_eq!(signal.ear().is_some(), seeded);
            prop_assert!(signal.mar().is_none());
        }
    }

    #[test]
    fn pt_blinks_never_exceed_recoveries(
        values in prop::collection::vec(0.0_f64..0.5, 0..200),
        threshold in 0.05_f64..0.45,
    ) {
        let mut detector = BlinkDetector::new(threshold);
        let mut completed = 0_u32;
        for v in &values {
            if detector.update(Some(*v)) {
                completed += 1;
            }
        }
        prop_assert_eq!(detector.blink_count(), completed);
        // each blink needs one frame below and one frame back above
        prop_assert!(detector.blink_count() as usize <= values.len() / 2);
        let below = values.iter().filter(|v| **v < threshold).count();
        prop_assert!(detector.blink_count() as usize <= below);
    }

    #[test]
    fn pt_absent_input_leaves_detector_untouched(
        values in prop::collection::vec(prop::option::of(0.0_f64..1.0), 0..100),
        threshold in 0.1_f64..0.9,
    ) {
        let mut with_gaps = HysteresisDetector::new(threshold, Crossing::Above);
        let mut dense = HysteresisDetector::new(threshold, Crossing::Above);
        for v in &values {
            with_gaps.update(*v);
            if let Some(v) = v {
                dense.update(Some(*v));
            }
        }
        prop_assert_eq!(with_gaps.count(), dense.count());
        prop_assert_eq!(with_gaps.phase(), dense.phase());
    }

    #[test]
    fn pt_head_movements_bounded_by_resolved_labels(
        labels in prop::collection::vec(label(), 0..100),
    ) {
        let mut counter = HeadMotionCounter::new();
        for l in &labels {
            counter.update(*l);
        }
        let resolved = labels.iter().filter(|l| l.is_some()).count();
        prop_assert!(counter.movement_count() as usize <= resolved.saturating_sub(1));
        prop_assert_eq!(counter.last_label(), labels.iter().rev().find_map(|l| *l));
    }

    #[test]
    fn pt_median_lies_within_range(values in prop::collection::vec(-5.0_f64..5.0, 1..50)) {
        let m = median(&values).expect("non-empty");
        let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(m >= lo && m <= hi);
    }

    #[test]
    fn pt_derived_threshold_respects_floor(
        center in 0.0_f64..2.0,
        factor in 0.1_f64..3.0,
        floor in 0.0_f64..1.0,
    ) {
        let t = derive_threshold(center, factor, floor);
        prop_assert!(t >= floor);
        prop_assert!(t >= center * factor);
    }

    #[test]
    fn pt_ratios_round_into_unit_interval(on in 0_u32..500, extra in 0_u32..500) {
        let total = on + extra;
        let ratio = round3(f64::from(on) / f64::from(total.max(1)));
        prop_assert!((0.0..=1.0).contains(&ratio));
    }
}
