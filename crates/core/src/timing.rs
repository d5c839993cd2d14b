use std::time::Instant;

/// RAII timer that logs the elapsed time of a phase when dropped.
pub struct Timed {
    name: &'static str,
    start: Instant,
    level: log::Level,
}

impl Timed {
    /// Logs at INFO level.
    pub fn info(name: &'static str) -> Self {
        log::debug!("{}...", name);
        Self {
            name,
            start: Instant::now(),
            level: log::Level::Info,
        }
    }

    /// Logs at DEBUG level.
    pub fn debug(name: &'static str) -> Self {
        log::trace!("{}...", name);
        Self {
            name,
            start: Instant::now(),
            level: log::Level::Debug,
        }
    }
}

impl Drop for Timed {
    fn drop(&mut self) {
        log::log!(self.level, "{}: {:.3?}", self.name, self.start.elapsed());
    }
}
