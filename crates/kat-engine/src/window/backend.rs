/// Platform window the render loop drives.
///
/// All calls happen on the thread that created the window.
pub trait WindowBackend {
    /// Processes pending platform events without blocking.
    fn poll_events(&mut self);

    /// True once the user or platform asked the window to close.
    fn should_close(&self) -> bool;

    /// Presents the frame rendered since the last swap.
    fn swap_buffers(&mut self);

    /// Sets how many display refreshes each swap waits for (`0` = none).
    fn set_swap_interval(&mut self, interval: u32);
}
