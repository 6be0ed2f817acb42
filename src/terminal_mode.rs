//! Raw mode and cursor visibility for the lifetime of the dashboard.
//!
//! `TerminalModes` remembers what it changed and reverts exactly that, either
//! through `undo()` or on drop. The dashboard draws inline below the prompt,
//! so the alternate screen is never entered.

use std::io::{stdout, Write};

use crossterm::{
    cursor::{Hide, Show},
    terminal::{disable_raw_mode, enable_raw_mode},
    ExecutableCommand,
};

use crate::error::TerminalError;
use crate::signals::SignalSuspender;

#[derive(Debug, Default)]
pub struct TerminalModes {
    raw_mode: bool,
    cursor_hidden: bool,
    suspender: Option<SignalSuspender>,
}

impl TerminalModes {
    /// Switches the terminal into raw mode and hides the cursor. Resize
    /// notifications are held back while the modes change.
    ///
    /// On error, anything already switched is switched back.
    pub fn enable(suspender: SignalSuspender) -> Result<Self, TerminalError> {
        let _guard = suspender.suspend()?;
        let mut modes = Self {
            suspender: Some(suspender.clone()),
            ..Self::default()
        };

        if let Err(e) = enable_raw_mode() {
            tracing::error!("Failed to enable raw mode: {}", e);
            return Err(e.into());
        }
        modes.raw_mode = true;
        tracing::debug!("Enabled raw mode");

        if let Err(e) = stdout().execute(Hide) {
            tracing::error!("Failed to hide cursor: {}", e);
            modes.undo();
            return Err(e.into());
        }
        modes.cursor_hidden = true;

        Ok(modes)
    }

    /// Safe to call more than once.
    pub fn undo(&mut self) {
        let _guard = self
            .suspender
            .as_ref()
            .and_then(|suspender| suspender.suspend().ok());

        if self.cursor_hidden {
            let _ = stdout().execute(Show);
            self.cursor_hidden = false;
        }

        if self.raw_mode {
            let _ = disable_raw_mode();
            self.raw_mode = false;
            tracing::debug!("Disabled raw mode");
        }

        let _ = stdout().flush();
    }

    pub fn raw_mode_enabled(&self) -> bool {
        self.raw_mode
    }
}

impl Drop for TerminalModes {
    fn drop(&mut self) {
        self.undo();
    }
}

/// Restores the terminal without a `TerminalModes` at hand, for panic hooks.
pub fn emergency_cleanup() {
    let _ = stdout().execute(Show);
    let _ = disable_raw_mode();
    let _ = stdout().write_all(b"\r\n");
    let _ = stdout().flush();
}
