/// Counters for a single run. Owned by the engine; never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunState {
    /// Size of the work list, fixed at start.
    pub total: u64,
    /// Identifiers processed so far (skipped identifiers are not counted).
    pub current: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl RunState {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub fn percent(&self) -> f64 {
        percentage(self.current, self.total)
    }

    pub(crate) fn record_success(&mut self) {
        self.succeeded += 1;
        self.current += 1;
    }

    pub(crate) fn record_failure(&mut self) {
        self.failed += 1;
        self.current += 1;
    }

    /// `succeeded + failed == current` once an identifier has been fully handled.
    pub fn is_balanced(&self) -> bool {
        self.succeeded + self.failed == self.current
    }
}

pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    100.0 * part as f64 / whole as f64
}
