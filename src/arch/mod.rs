/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! Architecture-specific code.
//!
//! Everything the portable state machine needs from the hardware funnels
//! through this module: TLB and cache maintenance, the EL2 timer, the
//! guarded NS copy and the realm world switch. On a non-aarch64 build
//! (host unit tests) the [`host`] stand-ins keep the same signatures with
//! no hardware behind them.

cfg_if::cfg_if! {
    if #[cfg(target_arch = "aarch64")] {
        pub mod aarch64;
        pub use aarch64::*;
    } else {
        pub mod host;
        pub use host::*;
    }
}
