use crate::detection::Detection;
use crate::frame_resolver::{resolve_known_frame, target_frame_index};
use std::collections::BTreeMap;

/// One analyzed frame of a bulk video analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameDetections {
    pub index: u32,
    pub detections: Vec<Detection>,
}

/// Detections per analyzed frame index. Immutable once loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameAnnotationMap {
    frames: BTreeMap<u32, Vec<Detection>>,
}

/// Result of looking up the playhead in a [`FrameAnnotationMap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedFrame {
    pub target: i64,
    pub frame: u32,
}

impl FrameAnnotationMap {
    /// Builds the map from a bulk analysis. Indices need not be contiguous;
    /// a repeated index keeps the last entry. Empty input gives an empty map.
    pub fn load(frames: Vec<FrameDetections>) -> Self {
        Self {
            frames: frames
                .into_iter()
                .map(|frame| (frame.index, frame.detections))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn get(&self, index: u32) -> Option<&[Detection]> {
        self.frames.get(&index).map(Vec::as_slice)
    }

    pub fn resolve(&self, target: i64) -> Option<ResolvedFrame> {
        resolve_known_frame(&self.frames, target)
            .map(|frame| ResolvedFrame { target, frame })
    }

    pub fn resolve_time(&self, current_time: f64, fps: f64) -> Option<ResolvedFrame> {
        self.resolve(target_frame_index(current_time, fps))
    }

    pub fn detections_at_time(&self, current_time: f64, fps: f64) -> &[Detection] {
        self.resolve_time(current_time, fps)
            .and_then(|resolved| self.get(resolved.frame))
            .unwrap_or(&[])
    }

    /// Builds a new map with `f` applied to every detection.
    pub fn map_detections<F>(&self, f: F) -> Self
    where
        F: Fn(&Detection) -> Detection,
    {
        Self {
            frames: self
                .frames
                .iter()
                .map(|(index, detections)| (*index, detections.iter().map(&f).collect()))
                .collect(),
        }
    }

    pub fn all_detections(&self) -> impl Iterator<Item = &Detection> {
        self.frames.values().flatten()
    }
}

/// Newest detections of a live stream. Only the latest frame is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveAnnotationSlot {
    latest: Vec<Detection>,
}

impl LiveAnnotationSlot {
    pub fn latest_for_live_stream(&mut self, detections: Vec<Detection>) {
        self.latest = detections;
    }

    pub fn latest(&self) -> &[Detection] {
        &self.latest
    }

    pub fn clear(&mut self) {
        self.latest.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: u32, labels: &[&str]) -> FrameDetections {
        FrameDetections {
            index,
            detections: labels
                .iter()
                .map(|label| Detection::new(label, 0.9, [0.1, 0.1, 0.2, 0.2]))
                .collect(),
        }
    }

    #[test]
    fn test_empty_load() {
        let map = FrameAnnotationMap::load(vec![]);

        assert!(map.is_empty());
        assert_eq!(map.resolve(10), None);
        assert!(map.detections_at_time(1.0, 30.0).is_empty());
    }

    #[test]
    fn test_sparse_unordered_frames() {
        let map = FrameAnnotationMap::load(vec![
            frame(90, &["FireAlarm"]),
            frame(0, &["OxygenTank"]),
            frame(30, &["SafetyHelmet", "FirstAidBox"]),
        ]);

        assert_eq!(map.len(), 3);
        assert_eq!(map.resolve(45), Some(ResolvedFrame { target: 45, frame: 30 }));
        assert_eq!(map.detections_at_time(1.5, 30.0).len(), 2);
        assert_eq!(map.detections_at_time(3.0, 30.0)[0].class_label, "FireAlarm");
    }

    #[test]
    fn test_seek_holds_last_analyzed_frame() {
        let map = FrameAnnotationMap::load(vec![
            frame(0, &["A", "B", "C"]),
            frame(60, &["D"]),
        ]);

        assert_eq!(map.detections_at_time(0.0, 30.0).len(), 3);
        let resolved = map.resolve_time(2.5, 30.0).unwrap();
        assert_eq!(resolved, ResolvedFrame { target: 75, frame: 60 });
        assert_eq!(map.detections_at_time(2.5, 30.0)[0].class_label, "D");
    }

    #[test]
    fn test_repeated_index_keeps_last() {
        let map = FrameAnnotationMap::load(vec![frame(5, &["First"]), frame(5, &["Second"])]);

        assert_eq!(map.get(5).unwrap()[0].class_label, "Second");
    }

    #[test]
    fn test_map_detections_leaves_source_untouched() {
        let map = FrameAnnotationMap::load(vec![frame(0, &["OxygenTank"])]);
        let boosted = map.map_detections(|d| d.boosted(0.05, 0.98));

        assert!(!map.get(0).unwrap()[0].healed);
        assert!(boosted.get(0).unwrap()[0].healed);
    }

    #[test]
    fn test_live_slot_keeps_only_newest() {
        let mut slot = LiveAnnotationSlot::default();
        slot.latest_for_live_stream(frame(0, &["A", "B"]).detections);
        slot.latest_for_live_stream(frame(1, &["C"]).detections);

        assert_eq!(slot.latest().len(), 1);
        assert_eq!(slot.latest()[0].class_label, "C");

        slot.clear();
        assert!(slot.latest().is_empty());
    }
}
