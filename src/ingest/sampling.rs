/// Fixed-interval frame decimation.
///
/// Every decoded frame is offered in order; one in every `floor(fps * interval)`
/// is kept (at least every frame). A kept frame's timestamp is its decoded
/// position divided by the container frame rate.
#[derive(Clone, Debug)]
pub struct FrameSampler {
    fps: f64,
    step: u64,
    decoded: u64,
    kept: usize,
}

impl FrameSampler {
    pub fn new(fps: f64, interval_secs: f64) -> Self {
        let raw = if fps.is_finite() && interval_secs.is_finite() {
            (fps * interval_secs).floor()
        } else {
            0.0
        };
        Self {
            fps,
            step: (raw as u64).max(1),
            decoded: 0,
            kept: 0,
        }
    }

    /// Offer the next decoded frame. Returns `(sample index, timestamp)` when kept.
    pub fn offer(&mut self) -> Option<(usize, f64)> {
        let position = self.decoded;
        self.decoded += 1;
        if position % self.step != 0 {
            return None;
        }
        let index = self.kept;
        self.kept += 1;
        Some((index, self.timestamp_of(position)))
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn decoded(&self) -> u64 {
        self.decoded
    }

    pub fn kept(&self) -> usize {
        self.kept
    }

    /// Video duration implied by the frames decoded so far.
    pub fn duration_seconds(&self) -> f64 {
        self.timestamp_of(self.decoded)
    }

    fn timestamp_of(&self, position: u64) -> f64 {
        if self.fps > 0.0 {
            position as f64 / self.fps
        } else {
            0.0
        }
    }
}
