/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

/// Macro similar to [std](https://doc.rust-lang.org/src/std/macros.rs.html)
/// but for writing into the monitor's registered console.
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::macros::_print(core::format_args!($($arg)*)));
}

/// Macro similar to [std](https://doc.rust-lang.org/src/std/macros.rs.html)
/// but for writing into the monitor's registered console.
#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ({
        $crate::macros::_print(core::format_args!($($arg)*));
        $crate::print!("\n");
    })
}

/// Prints info text, with a newline.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => ({
        $crate::print!("[i] rmm: ");
        $crate::println!($($arg)*);
    })
}

/// Prints warning text, with a newline.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => ({
        $crate::print!("[W] rmm: ");
        $crate::println!($($arg)*);
    })
}

/// Per-request trace output. Compiles to nothing unless the `verbose`
/// feature is enabled.
#[macro_export]
macro_rules! verbose {
    ($($arg:tt)*) => ({
        #[cfg(feature = "verbose")]
        {
            $crate::print!("[v] rmm: ");
            $crate::println!($($arg)*);
        }
    })
}

#[doc(hidden)]
pub fn _print(args: core::fmt::Arguments) {
    use crate::console::{console, interface::Write};

    // A failed diagnostic write is not worth panicking the monitor over.
    let _ = console().write_fmt(args);
}
