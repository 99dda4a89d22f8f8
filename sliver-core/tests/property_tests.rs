//! Property tests for simulator invariants.
//!
//! Uses proptest to verify, over random candle series and signal patterns:
//! 1. Every closed position has entry_time < exit_time
//! 2. roi and pnl always share a sign
//! 3. Intra-trade drawdown is never positive
//! 4. Positions never overlap in time
//! 5. Only stop-closed positions carry `stopped`, and only with a stop engine

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use sliver_core::{simulate, IndicatorSeries, PositionSide, StopEngine};
use std::collections::BTreeMap;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_series() -> impl Strategy<Value = IndicatorSeries> {
    (2usize..80)
        .prop_flat_map(|n| {
            (
                prop::collection::vec(-3.0..3.0_f64, n),
                prop::collection::vec(0.0..2.0_f64, n),
                prop::collection::vec(0u8..10, n),
            )
        })
        .prop_map(|(steps, spreads, marks)| {
            let base = Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap();
            let mut price = 100.0_f64;
            let mut s = IndicatorSeries::default();
            for (i, ((step, spread), mark)) in steps.iter().zip(&spreads).zip(&marks).enumerate() {
                price = (price + step).max(1.0);
                s.time.push(base + Duration::minutes(i as i64 * 30));
                s.open.push(price);
                s.high.push(price + spread);
                s.low.push((price - spread).max(0.5));
                s.close.push(price);
                s.buys.push(if *mark == 0 { price } else { 0.0 });
                s.sells.push(if *mark == 1 { price } else { 0.0 });
            }
            s.aux = BTreeMap::new();
            s
        })
}

fn arb_side() -> impl Strategy<Value = PositionSide> {
    prop_oneof![Just(PositionSide::Long), Just(PositionSide::Short)]
}

fn arb_stop() -> impl Strategy<Value = Option<StopEngine>> {
    prop::option::of(
        (0.0..10.0_f64, 0.0..10.0_f64, any::<bool>(), any::<bool>(), 0i64..240).prop_map(
            |(stop_gain, stop_loss, trailing_gain, trailing_loss, stop_cooldown)| StopEngine {
                stop_gain,
                stop_loss,
                trailing_gain,
                trailing_loss,
                stop_cooldown,
            },
        ),
    )
}

proptest! {
    #[test]
    fn entry_precedes_exit(s in arb_series(), side in arb_side(), stop in arb_stop()) {
        for p in simulate(&s, side, stop.as_ref()) {
            prop_assert!(p.entry_time < p.exit_time);
        }
    }

    #[test]
    fn roi_sign_matches_pnl(s in arb_series(), side in arb_side(), stop in arb_stop()) {
        for p in simulate(&s, side, stop.as_ref()) {
            prop_assert_eq!(p.roi > 0.0, p.pnl > 0.0);
            prop_assert_eq!(p.roi < 0.0, p.pnl < 0.0);
        }
    }

    #[test]
    fn drawdown_never_positive(s in arb_series(), side in arb_side(), stop in arb_stop()) {
        for p in simulate(&s, side, stop.as_ref()) {
            prop_assert!(p.drawdown <= 0.0);
            prop_assert!(p.min_equity <= p.max_equity);
        }
    }

    #[test]
    fn positions_do_not_overlap(s in arb_series(), side in arb_side(), stop in arb_stop()) {
        let positions = simulate(&s, side, stop.as_ref());
        for w in positions.windows(2) {
            prop_assert!(w[0].exit_time < w[1].entry_time);
        }
    }

    #[test]
    fn stopped_requires_stop_engine(s in arb_series(), side in arb_side()) {
        for p in simulate(&s, side, None) {
            prop_assert!(!p.stopped);
        }
    }
}
