/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! The monitor object.
//!
//! One [`Rmm`] exists per machine. All mutable monitor state — the
//! granule ledger and the VMID pool — sits behind a single lock;
//! everything else the handlers need (realm objects, RTTs) lives in
//! granule memory that the ledger governs. The lock is released across
//! realm execution so other cores can service RMI while one runs a
//! realm; the executing REC is pinned by its `state_running` flag
//! instead.

use crate::{
    granule::GranuleLedger,
    platform::interface::{Platform, RealmEntry, SecureMonitor},
    realm::vmid::VmidPool,
    sync::SpinLock,
};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// State guarded by the monitor lock.
pub struct MonitorState {
    pub ledger: GranuleLedger,
    pub vmids: VmidPool,
}

/// The realm management monitor.
pub struct Rmm<'p> {
    pub(crate) state: SpinLock<MonitorState>,
    pub(crate) smc: &'p (dyn SecureMonitor + Sync),
    pub(crate) plat: &'p (dyn Platform + Sync),
    pub(crate) entry: &'p (dyn RealmEntry + Sync),
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl<'p> Rmm<'p> {
    /// Create a monitor whose delegable window starts at `ledger_base`.
    pub fn new(
        ledger_base: u64,
        smc: &'p (dyn SecureMonitor + Sync),
        plat: &'p (dyn Platform + Sync),
        entry: &'p (dyn RealmEntry + Sync),
    ) -> Self {
        Self {
            state: SpinLock::new(MonitorState {
                ledger: GranuleLedger::new(ledger_base),
                vmids: VmidPool::new(),
            }),
            smc,
            plat,
            entry,
        }
    }
}
