use crate::virtual_machine::isa::Word;
use std::time::Instant;

/// Source of the tick value loaded into T0 before every instruction.
pub trait Clock {
    /// Current tick, in milliseconds.
    fn ticks(&self) -> Word;
}

/// Wall clock counting milliseconds since its creation.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn ticks(&self) -> Word {
        Word::try_from(self.start.elapsed().as_millis()).unwrap_or(Word::MAX)
    }
}

/// Clock frozen at a single tick, for reproducible runs.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FixedClock(pub Word);

impl Clock for FixedClock {
    fn ticks(&self) -> Word {
        self.0
    }
}
