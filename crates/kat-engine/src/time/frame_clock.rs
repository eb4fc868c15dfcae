/// Frame timing snapshot.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameTime {
    /// Seconds between the two most recent frame timestamps.
    pub dt: f64,

    /// Monotonic timestamp of the current frame, in seconds.
    pub now: f64,

    /// Monotonic frame counter, starting at 0.
    pub frame_index: u64,
}

impl FrameTime {
    /// Instantaneous frame rate derived from `dt`.
    #[inline]
    pub fn fps(&self) -> f64 {
        if self.dt > 0.0 { 1.0 / self.dt } else { 0.0 }
    }
}

/// Frame clock producing `FrameTime` snapshots.
///
/// One clock per render loop. Timestamps come from the caller (see
/// [`Clock`](super::Clock)) so the clock itself is deterministic.
///
/// The first frame has no predecessor; its `dt` is synthesized as
/// [`FrameClock::FIRST_FRAME_DT`] so consumers never see zero.
#[derive(Debug, Clone)]
pub struct FrameClock {
    now: f64,
    dt: f64,
    frame_index: u64,
}

impl FrameClock {
    pub const FIRST_FRAME_DT: f64 = 1.0 / 60.0;

    /// Starts the clock at timestamp `now`.
    pub fn new(now: f64) -> Self {
        Self {
            now,
            dt: Self::FIRST_FRAME_DT,
            frame_index: 0,
        }
    }

    /// Timing for the frame about to be rendered.
    #[inline]
    pub fn frame_time(&self) -> FrameTime {
        FrameTime {
            dt: self.dt,
            now: self.now,
            frame_index: self.frame_index,
        }
    }

    /// Records the timestamp taken after a frame was presented.
    pub fn advance(&mut self, now: f64) {
        self.dt = now - self.now;
        self.now = now;
        self.frame_index = self.frame_index.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_uses_synthesized_dt() {
        let clock = FrameClock::new(12.5);
        let ft = clock.frame_time();
        assert!((ft.dt - 1.0 / 60.0).abs() < 1e-12);
        assert_eq!(ft.now, 12.5);
        assert_eq!(ft.frame_index, 0);
    }

    #[test]
    fn advance_measures_between_timestamps() {
        let mut clock = FrameClock::new(1.0);
        clock.advance(1.25);
        assert_eq!(clock.frame_time().dt, 0.25);
        clock.advance(1.3);
        let ft = clock.frame_time();
        assert!((ft.dt - 0.05).abs() < 1e-12);
        assert_eq!(ft.frame_index, 2);
    }

    #[test]
    fn fps_is_inverse_dt() {
        let ft = FrameTime { dt: 0.5, now: 0.0, frame_index: 0 };
        assert_eq!(ft.fps(), 2.0);
        let stalled = FrameTime { dt: 0.0, now: 0.0, frame_index: 0 };
        assert_eq!(stalled.fps(), 0.0);
    }
}
