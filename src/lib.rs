/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! Realm management monitor core.
//!
//! The monitor sits below a non-secure hypervisor and above the secure
//! firmware. The host drives it through RMI commands; every command is a
//! guarded transition on the joint state machine of granules, realms,
//! RECs and stage-2 table entries. The portable part of the crate is the
//! state machine itself; everything that touches hardware lives in
//! [`arch`] and behind the seams declared in [`platform::interface`].

#![cfg_attr(not(test), no_std)]
#![allow(clippy::upper_case_acronyms)]

#[macro_use]
pub mod macros;

pub mod arch;
pub mod console;
pub mod error;
pub mod granule;
pub mod monitor;
pub mod nsmem;
pub mod platform;
pub mod psci;
pub mod realm;
pub mod rmi;
pub mod rtt;
pub mod run;
pub mod sync;

#[cfg(test)]
pub(crate) mod testbed;

/// Version string.
pub fn version() -> &'static str {
    concat!(
        env!("CARGO_PKG_NAME"),
        " version ",
        env!("CARGO_PKG_VERSION")
    )
}
