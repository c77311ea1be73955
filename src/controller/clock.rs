use crate::config::ClockConfig;

/// Turns monotonic timestamps (seconds) into sanitized frame deltas.
///
/// The first tick yields 0. Deltas are clamped to `[0, max_dt]`; a
/// non-finite timestamp yields 0 and does not replace the previous one.
#[derive(Debug, Clone)]
pub struct FrameClock {
    previous: Option<f64>,
    max_dt: f32,
}

impl FrameClock {
    pub fn new(config: &ClockConfig) -> Self {
        Self { previous: None, max_dt: config.max_dt }
    }

    pub fn tick(&mut self, now: f64) -> f32 {
        if !now.is_finite() {
            return 0.0;
        }
        let Some(previous) = self.previous.replace(now) else {
            return 0.0;
        };
        sanitize_dt((now - previous) as f32, self.max_dt)
    }

    /// Forget the previous timestamp; the next tick yields 0.
    pub fn reset(&mut self) {
        self.previous = None;
    }
}

/// Clamp a raw delta to `[0, max_dt]`, mapping NaN and infinities to 0.
pub fn sanitize_dt(dt: f32, max_dt: f32) -> f32 {
    if dt.is_finite() && dt > 0.0 {
        dt.min(max_dt)
    } else {
        0.0
    }
}

/// Seconds since the clock was created, from the platform's monotonic timer.
#[cfg(not(target_arch = "wasm32"))]
pub struct Stopwatch(std::time::Instant);

#[cfg(not(target_arch = "wasm32"))]
impl Stopwatch {
    pub fn start() -> Self {
        Self(std::time::Instant::now())
    }

    pub fn now(&self) -> f64 {
        self.0.elapsed().as_secs_f64()
    }
}

/// `performance.now()` in seconds.
#[cfg(target_arch = "wasm32")]
pub fn performance_now(window: &web_sys::Window) -> f64 {
    window.performance().map(|p| p.now() / 1000.0).unwrap_or(0.0)
}
