use chronoshade_core::{TimeMap, position_at, time_for_position};
use chronoshade_traits::Direction;
use proptest::prelude::*;
use std::time::Duration;

// Random valid map: strictly increasing times from 0, monotonic positions
// pinned to the direction's endpoints.
prop_compose! {
    fn map_strategy()(
        opening in any::<bool>(),
        steps in prop::collection::vec((1u32..400, 0u8..=100), 1..8),
    ) -> TimeMap {
        let direction = if opening { Direction::Opening } else { Direction::Closing };
        let mut inner: Vec<u8> = steps.iter().map(|s| s.1).collect();
        inner.pop();
        inner.sort_unstable();
        if !opening {
            inner.reverse();
        }
        let (start, end) = if opening { (0, 100) } else { (100, 0) };
        let mut positions = vec![start];
        positions.extend(inner);
        positions.push(end);

        let mut t = 0.0;
        let mut points = vec![(0.0, positions[0])];
        for (i, p) in positions.iter().enumerate().skip(1) {
            t += f64::from(steps[i - 1].0) / 20.0;
            points.push((t, *p));
        }
        TimeMap::validate(points, direction).expect("generated map is valid")
    }
}

proptest! {
    #[test]
    fn breakpoints_are_exact(map in map_strategy()) {
        for bp in map.breakpoints() {
            let at = position_at(&map, Duration::from_secs_f64(bp.elapsed_s));
            prop_assert_eq!(at, bp.position);
        }
    }

    #[test]
    fn round_trip_within_one_unit(map in map_strategy(), p in 0u8..=100) {
        let t = time_for_position(&map, p);
        let back = position_at(&map, t);
        prop_assert!(back.abs_diff(p) <= 1, "{} -> {:?} -> {}", p, t, back);
    }

    #[test]
    fn estimate_is_monotonic_in_time(map in map_strategy(), a in 0u32..5000, b in 0u32..5000) {
        let (lo, hi) = (a.min(b), a.max(b));
        let p_lo = position_at(&map, Duration::from_millis(u64::from(lo)));
        let p_hi = position_at(&map, Duration::from_millis(u64::from(hi)));
        match map.direction() {
            Direction::Opening => prop_assert!(p_lo <= p_hi),
            Direction::Closing => prop_assert!(p_lo >= p_hi),
        }
    }

    #[test]
    fn inverse_is_monotonic_in_position(map in map_strategy(), a in 0u8..=100, b in 0u8..=100) {
        let (lo, hi) = (a.min(b), a.max(b));
        let t_lo = time_for_position(&map, lo);
        let t_hi = time_for_position(&map, hi);
        match map.direction() {
            Direction::Opening => prop_assert!(t_lo <= t_hi),
            Direction::Closing => prop_assert!(t_lo >= t_hi),
        }
    }
}
