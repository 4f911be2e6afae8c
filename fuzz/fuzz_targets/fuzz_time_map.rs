#![no_main]
use chronoshade_core::{TimeMap, position_at, time_for_position};
use chronoshade_traits::Direction;
use std::time::Duration;
use libfuzzer_sys::{arbitrary::Arbitrary, fuzz_target};

#[derive(Debug, Arbitrary)]
struct Input {
    opening: bool,
    points: Vec<(f64, u8)>,
    probe_ms: u32,
    probe_pos: u8,
}

fuzz_target!(|input: Input| {
    let direction = if input.opening {
        Direction::Opening
    } else {
        Direction::Closing
    };
    let Ok(map) = TimeMap::validate(input.points.iter().copied(), direction) else {
        return;
    };
    // Any accepted map must answer every lookup inside 0..=100 and 0..=total.
    let pos = position_at(&map, Duration::from_millis(u64::from(input.probe_ms)));
    assert!(pos <= 100);
    let t = time_for_position(&map, input.probe_pos.min(100));
    assert!(t <= map.total(), "{t:?} outside map of {map:?}");
});
