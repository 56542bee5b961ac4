use crate::virtual_machine::errors::VMError;

/// Instructions a single run may execute unless configured otherwise.
pub const DEFAULT_STEP_LIMIT: u64 = 100_000;

/// Per-run instruction meter.
///
/// Every executed instruction costs one step. The meter is reset at the start
/// of each run; the limit itself survives resets.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StepBudget {
    limit: u64,
    used: u64,
}

impl Default for StepBudget {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_LIMIT)
    }
}

impl StepBudget {
    /// Creates a meter allowing `limit` instructions per run.
    pub fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    /// Charges one instruction.
    ///
    /// Returns [`VMError::StepLimitExceeded`] once `limit` instructions have
    /// already been charged.
    #[inline(always)]
    pub fn charge(&mut self) -> Result<(), VMError> {
        if self.used >= self.limit {
            return Err(VMError::StepLimitExceeded { limit: self.limit });
        }
        self.used += 1;
        Ok(())
    }

    /// Starts a new run.
    pub fn reset(&mut self) {
        self.used = 0;
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn remaining(&self) -> u64 {
        self.limit - self.used
    }
}
