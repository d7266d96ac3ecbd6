/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! Seams between the monitor core and its surroundings.
//!
//! The monitor depends on three collaborators it does not implement:
//! the EL3 firmware that performs PAS transitions, the platform that
//! knows where non-secure DRAM is visible, and the world-switch
//! trampoline that actually runs a realm. All three are trait objects so
//! the state machine can be driven on a development host by test doubles.

use crate::realm::rec::Rec;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Largest number of cores the monitor allocates per-core state for.
pub const MAX_CORES: usize = 8;

/// Granule transition service fids understood by the EL3 firmware.
pub const GTSI_DELEGATE: u64 = 0xC400_01B0;
/// See [`GTSI_DELEGATE`].
pub const GTSI_UNDELEGATE: u64 = 0xC400_01B1;

/// Architectural classification of a realm exit, as delivered by the
/// world-switch trampoline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitClass {
    /// Physical IRQ while the realm was running.
    Irq = 0,
    /// Physical FIQ while the realm was running.
    Fiq = 1,
    /// SError routed to the monitor.
    El1Serror = 2,
    /// Synchronous trap out of the realm; ESR/FAR/HPFAR hold the cause.
    Trap = 3,
}

/// Platform interfaces.
pub mod interface {
    use super::{ExitClass, Rec};

    /// The lower-monitor oracle: synchronous SMCs into EL3.
    pub trait SecureMonitor {
        /// Transition a granule from non-secure to realm PAS.
        /// Returns the firmware status word, zero on success.
        fn delegate(&self, addr: u64) -> u64;

        /// Transition a granule from realm to non-secure PAS.
        /// Returns the firmware status word, zero on success.
        fn undelegate(&self, addr: u64) -> u64;

        /// Forwarded PSCI_VERSION for realm introspection.
        fn psci_version(&self) -> u64;

        /// Forwarded PSCI_FEATURES for realm introspection.
        fn psci_features(&self, fid: u64) -> u64;
    }

    /// Fixed facts about the machine the monitor runs on.
    pub trait Platform {
        /// Linear id of the calling core, `< MAX_CORES`.
        fn core_id(&self) -> usize;

        /// Translate a host physical address into the monitor-visible
        /// alias of non-secure memory. `None` means the address has no
        /// NS alias and any access would fault.
        fn ns_window(&self, addr: u64) -> Option<u64>;

        /// Physical address range of the machine, in bits.
        fn pa_range(&self) -> u64;
    }

    /// The world switch: restore a REC's register state, run the realm
    /// until it exits, capture the exit state back into the REC.
    pub trait RealmEntry {
        /// Enter the realm described by `rec`. On return the REC's pc,
        /// ESR/FAR/HPFAR copies and vGIC state reflect the exit.
        fn enter(&self, rec: &mut Rec) -> ExitClass;
    }
}
