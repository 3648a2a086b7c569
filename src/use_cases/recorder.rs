// Path recording for multi-step moves.

use crate::domain::coords::split_into_submoves;
use crate::domain::{Coords, RawCoords, SyncTuning, UnitConverter};

/// Records a local preview path before it is submitted as one move.
///
/// While recording, a cursor walks toward the steering target by
/// `move_speed` per frame. One sample is kept every `frame_interval` frames
/// and recording stops by itself after `recording_frame_limit` frames.
#[derive(Debug, Clone)]
pub struct MoveRecorder {
    move_speed: f64,
    frame_interval: u32,
    frame_limit: u32,
    submove_scale: u32,
    converter: UnitConverter,
    recording: bool,
    frames: u32,
    cursor: Coords,
    target: Option<Coords>,
    samples: Vec<Coords>,
}

impl MoveRecorder {
    pub fn new(tuning: &SyncTuning) -> Self {
        Self {
            move_speed: tuning.move_speed,
            frame_interval: tuning.frame_interval.max(1),
            frame_limit: tuning.recording_frame_limit,
            submove_scale: tuning.submove_scale,
            converter: tuning.converter(),
            recording: false,
            frames: 0,
            cursor: Coords::default(),
            target: None,
            samples: Vec::new(),
        }
    }

    /// Starts a fresh recording at `origin`.
    pub fn start(&mut self, origin: Coords) {
        self.recording = true;
        self.frames = 0;
        self.cursor = origin;
        self.target = None;
        self.samples = vec![origin];
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Points the cursor at `target`; it gets there over the next frames.
    pub fn steer(&mut self, target: Coords) {
        self.target = Some(self.converter.normalize(target));
    }

    pub fn cursor(&self) -> Coords {
        self.cursor
    }

    /// Feeds one render frame. Returns false once recording has stopped.
    pub fn record_frame(&mut self) -> bool {
        if !self.recording {
            return false;
        }

        if let Some(target) = self.target {
            let remaining = self.cursor.distance(target);
            if remaining <= self.move_speed {
                self.cursor = target;
                self.target = None;
            } else {
                let t = self.move_speed / remaining;
                self.cursor = self
                    .cursor
                    .offset_by((target.x - self.cursor.x) * t, (target.y - self.cursor.y) * t);
            }
        }

        self.frames += 1;
        if self.frames % self.frame_interval == 0 && self.samples.last() != Some(&self.cursor) {
            self.samples.push(self.cursor);
        }
        if self.frames >= self.frame_limit {
            self.recording = false;
        }
        self.recording
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn samples(&self) -> &[Coords] {
        &self.samples
    }

    /// Stops recording and returns the sampled path, origin first. The final
    /// cursor position is always the last point.
    pub fn finish(&mut self) -> Vec<Coords> {
        if !self.samples.is_empty() && self.samples.last() != Some(&self.cursor) {
            self.samples.push(self.cursor);
        }
        self.recording = false;
        self.frames = 0;
        self.target = None;
        std::mem::take(&mut self.samples)
    }

    /// Chain-space waypoints for `path`, each at most one sub-move apart.
    pub fn to_submoves(&self, path: &[Coords]) -> Vec<RawCoords> {
        let raw: Vec<RawCoords> = path
            .iter()
            .map(|point| self.converter.to_chain_space(*point))
            .collect();
        raw.windows(2)
            .flat_map(|pair| split_into_submoves(pair[0], pair[1], self.submove_scale))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> MoveRecorder {
        let tuning = SyncTuning {
            move_speed: 1.0,
            ..SyncTuning::default()
        };
        MoveRecorder::new(&tuning)
    }

    #[test]
    fn cursor_walks_toward_target_at_move_speed() {
        let mut recorder = recorder();
        recorder.start(Coords::new(0.0, 0.0));
        recorder.steer(Coords::new(2.5, 0.0));

        recorder.record_frame();
        assert_eq!(recorder.cursor(), Coords::new(1.0, 0.0));
        recorder.record_frame();
        recorder.record_frame();
        assert_eq!(recorder.cursor(), Coords::new(2.5, 0.0));
    }

    #[test]
    fn samples_every_frame_interval() {
        let mut recorder = recorder();
        recorder.start(Coords::new(0.0, 0.0));
        recorder.steer(Coords::new(20.0, 0.0));

        for _ in 0..9 {
            recorder.record_frame();
        }

        let xs: Vec<f64> = recorder.samples().iter().map(|c| c.x).collect();
        assert_eq!(xs.len(), 4);
        for (x, expected) in xs.iter().zip([0.0, 3.0, 6.0, 9.0]) {
            assert!((x - expected).abs() < 1e-9, "{x} != {expected}");
        }
    }

    #[test]
    fn stops_at_frame_limit() {
        let mut recorder = recorder();
        recorder.start(Coords::new(0.0, 0.0));

        let mut frames = 0;
        while recorder.record_frame() {
            frames += 1;
        }

        assert_eq!(frames + 1, 300);
        assert!(!recorder.is_recording());
        assert!(!recorder.record_frame());
    }

    #[test]
    fn finish_ends_at_cursor() {
        let mut recorder = recorder();
        recorder.start(Coords::new(1.0, 1.0));
        recorder.steer(Coords::new(2.0, 1.0));
        recorder.record_frame();

        assert_eq!(
            recorder.finish(),
            vec![Coords::new(1.0, 1.0), Coords::new(2.0, 1.0)]
        );
        assert!(!recorder.is_recording());
        assert!(recorder.samples().is_empty());
    }

    #[test]
    fn idle_recording_yields_single_point() {
        let mut recorder = recorder();
        recorder.start(Coords::new(1.0, 1.0));
        for _ in 0..12 {
            recorder.record_frame();
        }
        assert_eq!(recorder.finish(), vec![Coords::new(1.0, 1.0)]);
    }

    #[test]
    fn path_is_split_into_submoves() {
        let recorder = MoveRecorder::new(&SyncTuning::default());
        let path = [Coords::new(0.0, 0.0), Coords::new(1.0, 0.0), Coords::new(1.0, 0.4)];

        let steps = recorder.to_submoves(&path);

        assert_eq!(
            steps,
            vec![
                RawCoords::new(50_333, 50_000),
                RawCoords::new(50_667, 50_000),
                RawCoords::new(51_000, 50_000),
                RawCoords::new(51_000, 50_400),
            ]
        );
    }
}
