//! Temporal box stabilization for a single tracked object.
//!
//! Each frame feeds either an observed box with its confidence or nothing.
//! The filter keeps a short rolling history, locks onto a held box after
//! enough confident frames, and fades its output in and out with presence.
//!
//! ```text
//!   Unstable --confident obs--> Accumulating --stability_threshold reached--> Locked
//!       ^                           |
//!       +----weak obs (counter 0)---+
//! ```
//!
//! There is no transition out of `Locked`: the first confirmed sighting holds
//! for the lifetime of the filter. Start a new filter to forget it.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::geometry::{mean_box, BoundingBox};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StabilityConfig {
    /// Rolling history capacity; oldest boxes are evicted first.
    pub max_history: usize,
    /// Minimum confidence for an observation to count toward locking.
    pub lock_threshold: f32,
    /// Confident observations needed to lock.
    pub stability_threshold: u32,
    /// Fade ceiling; also the number of absent frames until output stops.
    pub max_fade: u32,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            max_history: 5,
            lock_threshold: 0.8,
            stability_threshold: 5,
            max_fade: 10,
        }
    }
}

/// Lock progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackPhase {
    /// No confident observations banked.
    Unstable,
    /// Some confident observations banked, not yet enough to lock.
    Accumulating,
    /// Holding a confirmed box. Terminal.
    Locked,
}

/// One per-frame observation of the tracked object.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation {
    pub bbox: BoundingBox,
    pub confidence: f32,
}

impl Observation {
    pub fn new(bbox: BoundingBox, confidence: f32) -> Self {
        Self { bbox, confidence }
    }
}

/// Per-object stabilizer. Not thread-safe; feed it from one stream.
#[derive(Clone, Debug)]
pub struct BoxStabilityFilter {
    config: StabilityConfig,
    history: VecDeque<BoundingBox>,
    stable_frames: u32,
    held: Option<BoundingBox>,
    fade: u32,
}

impl BoxStabilityFilter {
    pub fn new(config: StabilityConfig) -> Self {
        Self {
            history: VecDeque::with_capacity(config.max_history.max(1)),
            config,
            stable_frames: 0,
            held: None,
            fade: 0,
        }
    }

    /// Feed one frame and return the box to display, if any.
    pub fn update(&mut self, observation: Option<Observation>) -> Option<BoundingBox> {
        match observation {
            Some(obs) => self.observe(obs),
            None => self.fade = self.fade.saturating_sub(1),
        }
        self.output()
    }

    fn observe(&mut self, obs: Observation) {
        if self.history.len() >= self.config.max_history.max(1) {
            self.history.pop_front();
        }
        self.history.push_back(obs.bbox);

        if obs.confidence >= self.config.lock_threshold {
            self.stable_frames += 1;
            if self.stable_frames >= self.config.stability_threshold {
                // Confident frames past the threshold refresh the held box.
                self.held = self.mean();
            }
        } else {
            self.stable_frames = self.stable_frames.saturating_sub(1);
        }

        self.fade = (self.fade + 1).min(self.config.max_fade);
    }

    /// Current display box without advancing state.
    pub fn output(&self) -> Option<BoundingBox> {
        if self.fade == 0 {
            return None;
        }
        match self.held {
            Some(held) => Some(held),
            None => self.mean(),
        }
    }

    /// Elementwise mean of the rolling history.
    pub fn mean(&self) -> Option<BoundingBox> {
        mean_box(&self.history)
    }

    /// Opacity hint in `[0, 1]`; locked tracks get a 0.3 boost.
    pub fn alpha(&self) -> f32 {
        let base = if self.config.max_fade == 0 {
            0.0
        } else {
            self.fade as f32 / self.config.max_fade as f32
        };
        let boost = if self.is_locked() { 0.3 } else { 0.0 };
        (base + boost).min(1.0)
    }

    pub fn phase(&self) -> TrackPhase {
        if self.held.is_some() {
            TrackPhase::Locked
        } else if self.stable_frames > 0 {
            TrackPhase::Accumulating
        } else {
            TrackPhase::Unstable
        }
    }

    pub fn is_locked(&self) -> bool {
        self.held.is_some()
    }

    pub fn held_box(&self) -> Option<BoundingBox> {
        self.held
    }

    pub fn stable_frames(&self) -> u32 {
        self.stable_frames
    }

    pub fn fade(&self) -> u32 {
        self.fade
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn config(&self) -> &StabilityConfig {
        &self.config
    }
}

impl Default for BoxStabilityFilter {
    fn default() -> Self {
        Self::new(StabilityConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(x: f32, confidence: f32) -> Option<Observation> {
        Some(Observation::new(
            BoundingBox::new(x, 0.0, x + 10.0, 10.0),
            confidence,
        ))
    }

    #[test]
    fn locks_after_five_confident_frames() {
        let mut filter = BoxStabilityFilter::default();
        for i in 0..4 {
            filter.update(obs(i as f32, 0.9));
            assert!(!filter.is_locked());
            assert_eq!(filter.phase(), TrackPhase::Accumulating);
        }
        filter.update(obs(4.0, 0.9));
        assert!(filter.is_locked());
        assert_eq!(filter.phase(), TrackPhase::Locked);
        // mean of x = 0..=4
        assert_eq!(
            filter.held_box(),
            Some(BoundingBox::new(2.0, 0.0, 12.0, 10.0))
        );
    }

    #[test]
    fn weak_observations_do_not_move_locked_box() {
        let mut filter = BoxStabilityFilter::default();
        for i in 0..5 {
            filter.update(obs(i as f32, 0.9));
        }
        let held = filter.held_box().unwrap();
        for _ in 0..10 {
            let out = filter.update(obs(200.0, 0.2));
            assert_eq!(out, Some(held));
        }
        assert!(filter.is_locked());
        assert_eq!(filter.stable_frames(), 0);
    }

    #[test]
    fn weak_frame_decrements_instead_of_resetting() {
        let mut filter = BoxStabilityFilter::default();
        for _ in 0..3 {
            filter.update(obs(0.0, 0.9));
        }
        filter.update(obs(0.0, 0.1));
        assert_eq!(filter.stable_frames(), 2);
        filter.update(obs(0.0, 0.1));
        filter.update(obs(0.0, 0.1));
        filter.update(obs(0.0, 0.1));
        assert_eq!(filter.stable_frames(), 0);
        assert_eq!(filter.phase(), TrackPhase::Unstable);
    }

    #[test]
    fn unlocked_output_is_rolling_mean() {
        let mut filter = BoxStabilityFilter::default();
        filter.update(obs(0.0, 0.5));
        let out = filter.update(obs(10.0, 0.5)).unwrap();
        assert_eq!(out, BoundingBox::new(5.0, 0.0, 15.0, 10.0));
    }

    #[test]
    fn history_evicts_oldest() {
        let config = StabilityConfig {
            max_history: 2,
            ..StabilityConfig::default()
        };
        let mut filter = BoxStabilityFilter::new(config);
        filter.update(obs(0.0, 0.1));
        filter.update(obs(10.0, 0.1));
        let out = filter.update(obs(20.0, 0.1)).unwrap();
        assert_eq!(filter.history_len(), 2);
        assert_eq!(out, BoundingBox::new(15.0, 0.0, 25.0, 10.0));
    }

    #[test]
    fn output_fades_out_after_max_fade_absences() {
        let mut filter = BoxStabilityFilter::default();
        for i in 0..12 {
            filter.update(obs(i as f32, 0.9));
        }
        assert_eq!(filter.fade(), 10);
        for _ in 0..9 {
            assert!(filter.update(None).is_some());
        }
        assert!(filter.update(None).is_none());
        // absence does not unlock
        assert!(filter.is_locked());
        // reappearance fades back in with the held box
        assert!(filter.update(obs(50.0, 0.1)).is_some());
    }

    #[test]
    fn absent_on_first_frame_emits_nothing() {
        let mut filter = BoxStabilityFilter::default();
        assert_eq!(filter.update(None), None);
        assert_eq!(filter.phase(), TrackPhase::Unstable);
    }

    #[test]
    fn alpha_tracks_fade_and_lock() {
        let mut filter = BoxStabilityFilter::default();
        filter.update(obs(0.0, 0.5));
        assert!((filter.alpha() - 0.1).abs() < 1e-6);
        for _ in 0..5 {
            filter.update(obs(0.0, 0.9));
        }
        // fade 6/10 + 0.3
        assert!((filter.alpha() - 0.9).abs() < 1e-6);
        for _ in 0..10 {
            filter.update(obs(0.0, 0.9));
        }
        assert_eq!(filter.alpha(), 1.0);
    }
}
