use crate::time::FrameTime;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum AppControl {
    #[default]
    Continue,
    Exit,
}

impl From<()> for AppControl {
    #[inline]
    fn from(_: ()) -> Self {
        AppControl::Continue
    }
}

/// Application contract implemented by higher layers.
///
/// Any `FnMut(FrameTime) -> R` where `R: Into<AppControl>` is an `App`, so a
/// closure returning `()` simply keeps running.
pub trait App {
    /// Called once per rendered frame, between event polling and present.
    fn on_frame(&mut self, time: FrameTime) -> AppControl;
}

impl<F, R> App for F
where
    F: FnMut(FrameTime) -> R,
    R: Into<AppControl>,
{
    #[inline]
    fn on_frame(&mut self, time: FrameTime) -> AppControl {
        self(time).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run<A: App>(mut app: A) -> AppControl {
        app.on_frame(FrameTime { dt: 0.1, now: 0.0, frame_index: 0 })
    }

    #[test]
    fn unit_closure_continues() {
        assert_eq!(run(|_t: FrameTime| {}), AppControl::Continue);
    }

    #[test]
    fn closure_can_exit() {
        assert_eq!(run(|t: FrameTime| if t.dt > 0.0 { AppControl::Exit } else { AppControl::Continue }), AppControl::Exit);
    }
}
