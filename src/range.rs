/// Linearly maps `value` from the `source` interval onto the `target` interval.
///
/// Both source bounds are inclusive. Returns `None` when `value` falls outside
/// the source interval, when the target interval is reversed, or when the
/// source interval is empty. Callers pick their own fallback for `None`.
pub fn map_range(value: f32, source: (f32, f32), target: (f32, f32)) -> Option<f32> {
    let (source_low, source_high) = source;
    let (target_low, target_high) = target;

    if !value.is_finite() || value < source_low || value > source_high {
        return None;
    }
    if target_low > target_high {
        return None;
    }
    let source_span = source_high - source_low;
    if source_span == 0.0 {
        return None;
    }

    Some(target_low + (value - source_low) * (target_high - target_low) / source_span)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_bounds_onto_bounds() {
        assert_eq!(map_range(0.0, (0.0, 400.0), (0.5, 2.5)), Some(0.5));
        assert_eq!(map_range(400.0, (0.0, 400.0), (0.5, 2.5)), Some(2.5));
        assert_eq!(map_range(200.0, (0.0, 400.0), (0.5, 2.5)), Some(1.5));
    }

    #[test]
    fn identity_when_intervals_match() {
        for value in [-5.0_f32, -1.25, 0.0, 3.5, 10.0] {
            assert_eq!(map_range(value, (-5.0, 10.0), (-5.0, 10.0)), Some(value));
        }
    }

    #[test]
    fn stays_inside_target_and_is_monotonic() {
        let mut previous = f32::NEG_INFINITY;
        for step in 0..=100 {
            let value = -5.0 + 15.0 * step as f32 / 100.0;
            let mapped = map_range(value, (-5.0, 10.0), (10.0, 100.0)).unwrap();
            assert!((10.0..=100.0).contains(&mapped), "{mapped} out of target");
            assert!(mapped >= previous);
            previous = mapped;
        }
    }

    #[test]
    fn out_of_source_is_none() {
        assert_eq!(map_range(-0.001, (0.0, 1.0), (0.0, 1.0)), None);
        assert_eq!(map_range(1.001, (0.0, 1.0), (0.0, 1.0)), None);
        assert_eq!(map_range(f32::NAN, (0.0, 1.0), (0.0, 1.0)), None);
    }

    #[test]
    fn reversed_target_is_none_for_any_value() {
        for value in [0.0_f32, 0.5, 1.0] {
            assert_eq!(map_range(value, (0.0, 1.0), (2.5, 0.5)), None);
        }
    }

    #[test]
    fn empty_source_is_none() {
        assert_eq!(map_range(3.0, (3.0, 3.0), (0.5, 2.5)), None);
    }

    #[test]
    fn degenerate_target_collapses() {
        assert_eq!(map_range(0.7, (0.0, 1.0), (4.0, 4.0)), Some(4.0));
    }
}
