//! Monotonic millisecond clock

/// Free-running millisecond counter
///
/// The counter is a `u32` and wraps after roughly 49.7 days. Callers compare
/// instants with `wrapping_sub`, never with `<`.
pub trait Clock {
    /// Milliseconds since an arbitrary, fixed origin (usually boot)
    fn now_ms(&self) -> u32;

    /// Milliseconds elapsed since `since`, wrap-safe
    fn elapsed_since(&self, since: u32) -> u32 {
        self.now_ms().wrapping_sub(since)
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}
