use tokio::time::Instant;

/// Anchored playback clock: a known position plus the instant it was
/// observed. Uses tokio's clock so paused-time tests stay deterministic.
#[derive(Debug, PartialEq, Default)]
pub struct PlaybackTimer {
    /// Anchor position in seconds (finite, >= 0).
    anchor_position: f64,
    /// Monotonic instant corresponding to `anchor_position` while running.
    anchor_instant: Option<Instant>,
}

impl PlaybackTimer {
    /// Jump to `position` and stop the clock. Callers resume with `mark_playing`.
    pub fn reset(&mut self, position: f64) {
        self.anchor_position = sanitize_position(position);
        self.anchor_instant = None;
    }

    /// Jump to `position`, keeping the clock running if it was.
    pub fn set_position(&mut self, position: f64) {
        let running = self.anchor_instant.is_some();
        self.anchor_position = sanitize_position(position);
        self.anchor_instant = running.then(Instant::now);
    }

    pub fn mark_playing(&mut self) {
        if self.anchor_instant.is_none() {
            self.anchor_instant = Some(Instant::now());
        }
    }

    /// Freeze the clock at the current estimate so paused time is not counted.
    pub fn mark_paused(&mut self) {
        self.anchor_position = self.estimate();
        self.anchor_instant = None;
    }

    pub fn is_running(&self) -> bool {
        self.anchor_instant.is_some()
    }

    pub fn estimate(&self) -> f64 {
        let base = self.anchor_position;
        match self.anchor_instant {
            Some(inst) => {
                let val = base + inst.elapsed().as_secs_f64();
                if val.is_finite() { val } else { base }
            }
            None => base,
        }
    }
}

pub fn sanitize_position(p: f64) -> f64 {
    if !p.is_finite() || p < 0.0 { 0.0 } else { p }
}
