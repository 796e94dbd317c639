use std::collections::BTreeMap;

/// Frame index the playhead is on: `floor(time * fps)`.
///
/// Non-finite times count as zero. Negative times yield negative indices so
/// that [`resolve_known_frame`] falls back to the earliest analyzed frame.
pub fn target_frame_index(current_time: f64, fps: f64) -> i64 {
    if !current_time.is_finite() || !fps.is_finite() || fps <= 0.0 {
        return 0;
    }
    (current_time * fps).floor() as i64
}

/// Picks the analyzed frame to display for `target`.
///
/// Exact match wins, otherwise the latest analyzed frame at or before
/// `target`. Never looks ahead of the playhead unless `target` precedes every
/// known frame, in which case the earliest known frame is used.
pub fn resolve_known_frame<V>(known: &BTreeMap<u32, V>, target: i64) -> Option<u32> {
    let floor = match u32::try_from(target) {
        Ok(target) => known.range(..=target).next_back(),
        Err(_) if target > 0 => known.iter().next_back(),
        Err(_) => None,
    };

    floor.or_else(|| known.iter().next()).map(|(index, _)| *index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_frame_index() {
        assert_eq!(target_frame_index(0.0, 30.0), 0);
        assert_eq!(target_frame_index(2.5, 30.0), 75);
        assert_eq!(target_frame_index(1.999, 30.0), 59);
        assert_eq!(target_frame_index(-0.2, 25.0), -5);
        assert_eq!(target_frame_index(f64::NAN, 30.0), 0);
        assert_eq!(target_frame_index(3.0, 0.0), 0);
    }

    fn known(indices: &[u32]) -> BTreeMap<u32, ()> {
        indices.iter().map(|index| (*index, ())).collect()
    }

    #[test]
    fn test_resolves_largest_known_at_or_before_target() {
        assert_eq!(resolve_known_frame(&known(&[0, 30, 90]), 45), Some(30));
    }

    #[test]
    fn test_exact_match_wins() {
        assert_eq!(resolve_known_frame(&known(&[90, 0, 30]), 30), Some(30));
    }

    #[test]
    fn test_target_before_all_known_falls_back_to_earliest() {
        assert_eq!(resolve_known_frame(&known(&[30, 10]), -5), Some(10));
        assert_eq!(resolve_known_frame(&known(&[30, 10]), 0), Some(10));
    }

    #[test]
    fn test_target_after_all_known_holds_last() {
        assert_eq!(resolve_known_frame(&known(&[0, 60]), 10_000), Some(60));
        assert_eq!(resolve_known_frame(&known(&[0, 60]), i64::MAX), Some(60));
    }

    #[test]
    fn test_no_known_frames() {
        assert_eq!(resolve_known_frame(&known(&[]), 12), None);
    }
}
