/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! Realm objects.
//!
//! Realm descriptors and execution contexts live directly inside
//! delegated granules; there is no allocator. The functions here are the
//! only way handlers obtain typed views of that memory: each checks the
//! ledger first, so a view implies the granule really is in the matching
//! state. Views are only created under the monitor lock and never
//! outlive the handler that asked for them (the one exception, the REC
//! across a realm entry, is guarded by its `state_running` flag
//! instead).

pub mod rd;
pub mod rec;
pub mod sysreg;
pub mod vgic;
pub mod vmid;

use {
    self::{rd::Rd, rec::Rec},
    crate::{
        error::Error,
        granule::{GranuleLedger, GranuleState},
    },
};

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// View of the realm descriptor stored at `addr`, iff the ledger agrees
/// there is one.
///
/// The returned lifetime is the caller's choice, not the ledger
/// borrow's: the view is really guarded by the monitor lock, and tying
/// it to the ledger would forbid ledger updates mid-handler.
pub fn rd_at<'a>(ledger: &GranuleLedger, addr: u64) -> Result<&'a mut Rd, Error> {
    if !ledger.assert_state(addr, GranuleState::Rd) {
        crate::info!("not an RD granule: {:#x} is {:?}", addr, ledger.state(addr));
        return Err(Error::Input);
    }
    // SAFETY: the ledger says this granule holds an Rd, all Rd granules
    // are initialised by REALM_CREATE before being marked, and callers
    // hold the monitor lock.
    Ok(unsafe { &mut *(addr as *mut Rd) })
}

/// View of the execution context stored at `addr`, iff the ledger agrees.
pub fn rec_at<'a>(ledger: &GranuleLedger, addr: u64) -> Result<&'a mut Rec, Error> {
    if !ledger.assert_state(addr, GranuleState::Rec) {
        crate::info!("not a REC granule: {:#x} is {:?}", addr, ledger.state(addr));
        return Err(Error::Input);
    }
    // SAFETY: as for rd_at, with REC_CREATE doing the initialisation.
    Ok(unsafe { &mut *(addr as *mut Rec) })
}

/// View of a granule that is about to become a REC.
///
/// # Safety
///
/// The caller must have verified the granule is `Delegated` (hence
/// zeroed and unreferenced) and must initialise every field before the
/// ledger marks it `Rec`.
pub unsafe fn rec_at_unchecked<'a>(addr: u64) -> &'a mut Rec {
    &mut *(addr as *mut Rec)
}
