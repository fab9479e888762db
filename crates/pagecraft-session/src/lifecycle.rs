// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session lifecycle state machine.
//
//   Idle --begin--> Processing --complete--> Completed --tick x N--> (purge) Idle
//                        |                        |
//                        +--fail--> Idle          +--reset--> Idle
//
// `generation` changes on every reset, so work started under an older
// generation can recognise that its session is gone and drop its result.

use pagecraft_core::SessionStatus;
use pagecraft_core::error::{PagecraftError, Result};
use tracing::info;

/// Outcome of one countdown second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Still counting; seconds left.
    Remaining(u32),
    /// The countdown reached zero; the session must be purged now.
    Expired,
    /// Not in `Completed`; nothing is counting.
    Inactive,
}

#[derive(Debug, Clone)]
pub struct Lifecycle {
    status: SessionStatus,
    countdown: u32,
    purge_after_secs: u32,
    generation: u64,
}

impl Lifecycle {
    pub fn new(purge_after_secs: u32) -> Self {
        Self {
            status: SessionStatus::Idle,
            countdown: 0,
            purge_after_secs,
            generation: 0,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Seconds left before the purge; zero unless `Completed`.
    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Page and document edits are only accepted while `Idle`.
    pub fn ensure_editable(&self) -> Result<()> {
        match self.status {
            SessionStatus::Idle => Ok(()),
            status => Err(PagecraftError::SessionBusy { status }),
        }
    }

    /// Idle -> Processing. Callers check the operation's preconditions first.
    pub fn begin(&mut self) -> Result<()> {
        self.ensure_editable()?;
        self.status = SessionStatus::Processing;
        info!(generation = self.generation, "session processing");
        Ok(())
    }

    /// Processing -> Completed; starts the countdown.
    pub fn complete(&mut self) -> Result<()> {
        self.expect(SessionStatus::Processing)?;
        self.status = SessionStatus::Completed;
        self.countdown = self.purge_after_secs;
        info!(purge_after_secs = self.countdown, "session completed");
        Ok(())
    }

    /// Processing -> Idle after a failed run. Inputs are kept.
    pub fn fail(&mut self) -> Result<()> {
        self.expect(SessionStatus::Processing)?;
        self.status = SessionStatus::Idle;
        info!("session back to idle after failure");
        Ok(())
    }

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> Tick {
        if self.status != SessionStatus::Completed {
            return Tick::Inactive;
        }
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown == 0 {
            Tick::Expired
        } else {
            Tick::Remaining(self.countdown)
        }
    }

    /// Any state -> Idle, opening a new generation.
    pub fn reset(&mut self) {
        self.status = SessionStatus::Idle;
        self.countdown = 0;
        self.generation += 1;
        info!(generation = self.generation, "session reset");
    }

    fn expect(&self, wanted: SessionStatus) -> Result<()> {
        if self.status != wanted {
            return Err(PagecraftError::Internal(format!(
                "lifecycle is {}, expected {}",
                self.status, wanted
            )));
        }
        Ok(())
    }
}
