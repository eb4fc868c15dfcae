use crate::core::{App, AppControl};
use crate::time::{Clock, FrameClock, MonotonicClock};

use super::WindowBackend;

/// Lifecycle of a [`Window`]'s render loop.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoopState {
    /// Constructed, loop never entered.
    Created,
    /// Inside [`Window::while_open`].
    Running,
    /// Loop exited. Terminal: the loop cannot be restarted.
    Closed,
}

/// Render loop driver.
///
/// Each iteration polls events, stops if a close was requested, otherwise
/// runs the app callback, presents, and records the frame timestamp.
pub struct Window<B: WindowBackend, C: Clock = MonotonicClock> {
    backend: B,
    clock: C,
    vsync_interval: u32,
    state: LoopState,
}

impl<B: WindowBackend, C: Clock> Window<B, C> {
    /// Wraps an already created backend and applies `vsync_interval` to it.
    pub fn with_backend(mut backend: B, clock: C, vsync_interval: u32) -> Self {
        backend.set_swap_interval(vsync_interval);
        Self {
            backend,
            clock,
            vsync_interval,
            state: LoopState::Created,
        }
    }

    #[inline]
    pub fn vsync_interval(&self) -> u32 {
        self.vsync_interval
    }

    /// Forwards to the backend on every call, even if the value is unchanged.
    pub fn set_vsync_interval(&mut self, interval: u32) {
        self.backend.set_swap_interval(interval);
        self.vsync_interval = interval;
        log::debug!("vsync interval set to {interval}");
    }

    #[inline]
    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != LoopState::Closed && !self.backend.should_close()
    }

    pub fn poll_events(&mut self) {
        self.backend.poll_events();
    }

    pub fn swap(&mut self) {
        self.backend.swap_buffers();
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Runs frames until the window is asked to close or `app` returns
    /// [`AppControl::Exit`].
    ///
    /// The first frame receives `dt = 1/60 s`. A frame whose event poll
    /// observes the close request is not rendered.
    pub fn while_open(&mut self, mut app: impl App) {
        if self.state == LoopState::Closed {
            log::warn!("render loop already closed; ignoring restart");
            return;
        }
        self.state = LoopState::Running;
        log::debug!("render loop started");

        let mut frames = FrameClock::new(self.clock.now());
        while self.is_open() {
            self.backend.poll_events();
            if self.backend.should_close() {
                log::debug!("close requested");
                break;
            }

            let control = app.on_frame(frames.frame_time());

            self.backend.swap_buffers();
            frames.advance(self.clock.now());

            if control == AppControl::Exit {
                log::debug!("app requested exit");
                break;
            }
        }

        self.state = LoopState::Closed;
        log::debug!("render loop closed after {} frames", frames.frame_time().frame_index);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use super::*;
    use crate::time::FrameTime;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Poll,
        Frame(f64),
        Swap,
        SwapInterval(u32),
    }

    type Log = Rc<RefCell<Vec<Event>>>;

    struct FakeBackend {
        log: Log,
        polls: usize,
        close_on_poll: Option<usize>,
    }

    impl FakeBackend {
        fn new(log: &Log, close_on_poll: Option<usize>) -> Self {
            Self {
                log: Rc::clone(log),
                polls: 0,
                close_on_poll,
            }
        }
    }

    impl WindowBackend for FakeBackend {
        fn poll_events(&mut self) {
            self.polls += 1;
            self.log.borrow_mut().push(Event::Poll);
        }

        fn should_close(&self) -> bool {
            self.close_on_poll.is_some_and(|n| self.polls >= n)
        }

        fn swap_buffers(&mut self) {
            self.log.borrow_mut().push(Event::Swap);
        }

        fn set_swap_interval(&mut self, interval: u32) {
            self.log.borrow_mut().push(Event::SwapInterval(interval));
        }
    }

    /// Returns scripted timestamps, repeating the last one.
    struct SteppingClock {
        times: RefCell<VecDeque<f64>>,
    }

    impl SteppingClock {
        fn new(times: &[f64]) -> Self {
            Self {
                times: RefCell::new(times.iter().copied().collect()),
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> f64 {
            let mut times = self.times.borrow_mut();
            if times.len() > 1 {
                times.pop_front().unwrap_or_default()
            } else {
                times.front().copied().unwrap_or_default()
            }
        }
    }

    fn window(log: &Log, close_on_poll: Option<usize>, times: &[f64]) -> Window<FakeBackend, SteppingClock> {
        let w = Window::with_backend(FakeBackend::new(log, close_on_poll), SteppingClock::new(times), 1);
        log.borrow_mut().clear();
        w
    }

    fn recording_app(log: &Log) -> impl FnMut(FrameTime) + '_ {
        move |t: FrameTime| log.borrow_mut().push(Event::Frame(t.dt))
    }

    // ── ordering ──────────────────────────────────────────────────────────

    #[test]
    fn iteration_polls_renders_then_swaps() {
        let log = Log::default();
        let mut w = window(&log, Some(3), &[0.0, 0.5, 0.75]);
        w.while_open(recording_app(&log));

        assert_eq!(
            *log.borrow(),
            vec![
                Event::Poll,
                Event::Frame(1.0 / 60.0),
                Event::Swap,
                Event::Poll,
                Event::Frame(0.5),
                Event::Swap,
                Event::Poll,
            ]
        );
    }

    #[test]
    fn close_seen_by_poll_skips_render_and_present() {
        let log = Log::default();
        let mut w = window(&log, Some(1), &[0.0]);
        w.while_open(recording_app(&log));

        assert_eq!(*log.borrow(), vec![Event::Poll]);
        assert_eq!(w.state(), LoopState::Closed);
    }

    // ── timing ────────────────────────────────────────────────────────────

    #[test]
    fn dt_tracks_post_present_timestamps() {
        let log = Log::default();
        let mut w = window(&log, Some(5), &[10.0, 10.1, 10.3, 10.35]);
        let mut dts = Vec::new();
        w.while_open(|t: FrameTime| dts.push(t.dt));

        assert_eq!(dts.len(), 4);
        assert!((dts[0] - 1.0 / 60.0).abs() < 1e-9);
        assert!((dts[1] - 0.1).abs() < 1e-9);
        assert!((dts[2] - 0.2).abs() < 1e-9);
        assert!((dts[3] - 0.05).abs() < 1e-9);
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    #[test]
    fn exit_presents_the_frame_then_closes() {
        let log = Log::default();
        let mut w = window(&log, None, &[0.0]);
        let mut frames = 0;
        w.while_open(|_t: FrameTime| {
            frames += 1;
            if frames == 2 { AppControl::Exit } else { AppControl::Continue }
        });

        let swaps = log.borrow().iter().filter(|e| **e == Event::Swap).count();
        assert_eq!(frames, 2);
        assert_eq!(swaps, 2);
        assert_eq!(w.state(), LoopState::Closed);
        assert!(!w.is_open());
    }

    #[test]
    fn closed_loop_cannot_restart() {
        let log = Log::default();
        let mut w = window(&log, None, &[0.0]);
        w.while_open(|_t: FrameTime| AppControl::Exit);
        log.borrow_mut().clear();

        w.while_open(|_t: FrameTime| AppControl::Continue);
        assert!(log.borrow().is_empty());
        assert_eq!(w.state(), LoopState::Closed);
    }

    #[test]
    fn state_starts_created() {
        let log = Log::default();
        let w = window(&log, None, &[0.0]);
        assert_eq!(w.state(), LoopState::Created);
        assert!(w.is_open());
    }

    // ── vsync ─────────────────────────────────────────────────────────────

    #[test]
    fn construction_applies_vsync() {
        let log = Log::default();
        let _w = Window::with_backend(FakeBackend::new(&log, None), SteppingClock::new(&[0.0]), 0);
        assert_eq!(*log.borrow(), vec![Event::SwapInterval(0)]);
    }

    #[test]
    fn vsync_setter_forwards_every_time() {
        let log = Log::default();
        let mut w = window(&log, None, &[0.0]);
        w.set_vsync_interval(2);
        w.set_vsync_interval(2);

        assert_eq!(*log.borrow(), vec![Event::SwapInterval(2), Event::SwapInterval(2)]);
        assert_eq!(w.vsync_interval(), 2);
    }
}
