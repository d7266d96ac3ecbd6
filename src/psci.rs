/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! PSCI constants shared between the shim and the dispatcher.
//!
//! Realms manage their vCPUs through PSCI SMCs. The monitor answers the
//! purely informational calls itself (forwarding to the firmware) and
//! brokers the state-changing ones between realm and host; see the
//! REC_ENTER handler for the split.

pub const PSCI_VERSION: u64 = 0x8400_0000;
pub const PSCI_CPU_SUSPEND_AARCH64: u64 = 0xC400_0001;
pub const PSCI_CPU_OFF: u64 = 0x8400_0002;
pub const PSCI_CPU_ON_AARCH64: u64 = 0xC400_0003;
pub const PSCI_AFFINITY_INFO_AARCH64: u64 = 0xC400_0004;
pub const PSCI_SYSTEM_OFF: u64 = 0x8400_0008;
pub const PSCI_SYSTEM_RESET: u64 = 0x8400_0009;
pub const PSCI_FEATURES: u64 = 0x8400_000A;

pub const PSCI_E_SUCCESS: u64 = 0;
pub const PSCI_E_NOT_SUPPORTED: u64 = -1i64 as u64;
pub const PSCI_E_INVALID_PARAMS: u64 = -2i64 as u64;
pub const PSCI_E_ALREADY_ON: u64 = -4i64 as u64;
pub const PSCI_E_INVALID_ADDRESS: u64 = -9i64 as u64;

/// AFFINITY_INFO results.
pub const AFF_STATE_ON: u64 = 0;
/// See [`AFF_STATE_ON`].
pub const AFF_STATE_OFF: u64 = 1;
