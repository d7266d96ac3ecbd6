/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! Console seam.
//!
//! The monitor core never talks to a UART itself; the platform registers
//! whatever sink it has during bring-up. Until then output goes to the
//! null console and is dropped.

use crate::sync::{interface::Mutex, SpinLock};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Console interfaces.
pub mod interface {
    use core::fmt;

    /// Console write functions.
    pub trait Write {
        /// Write a Rust format string.
        fn write_fmt(&self, args: fmt::Arguments) -> fmt::Result;
    }
}

/// A console that ignores all output.
pub struct NullConsole;

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------

static NULL_CONSOLE: NullConsole = NullConsole;

static CUR_CONSOLE: SpinLock<&'static (dyn interface::Write + Sync)> =
    SpinLock::new(&NULL_CONSOLE);

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl interface::Write for NullConsole {
    fn write_fmt(&self, _args: core::fmt::Arguments) -> core::fmt::Result {
        Ok(())
    }
}

/// Register a new console.
pub fn register_console(new_console: &'static (dyn interface::Write + Sync)) {
    CUR_CONSOLE.lock(|con| *con = new_console);
}

/// Return a reference to the currently registered console.
pub fn console() -> &'static (dyn interface::Write + Sync) {
    CUR_CONSOLE.lock(|con| *con)
}
