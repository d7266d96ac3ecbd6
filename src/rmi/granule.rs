/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! GRANULE_DELEGATE and GRANULE_UNDELEGATE.
//!
//! The only two operations that move a granule across the NS/realm PAS
//! boundary, and therefore the only ones that talk to the firmware's
//! granule transition service. Everything else in the RMI reshuffles
//! granules already on the realm side.

use {
    super::{HandlerResult, Outputs},
    crate::{
        error::Error,
        granule::{scrub, GranuleState},
        monitor::Rmm,
        sync::interface::Mutex,
    },
};

impl Rmm<'_> {
    pub(super) fn granule_delegate(&self, addr: u64) -> HandlerResult {
        self.state.lock(|st| {
            crate::verbose!("delegating granule {:#x}", addr);

            if !st.ledger.assert_state(addr, GranuleState::Undelegated) {
                crate::info!(
                    "delegating {:#x} with state {:?}",
                    addr,
                    st.ledger.state(addr)
                );
                return Err(Error::Input);
            }

            let status = self.smc.delegate(addr);
            if status != 0 {
                crate::warn!("NS to realm PAS transition failed: {:#x}", status);
                return Err(Error::Internal);
            }

            // The granule is realm PAS now; wipe whatever the host left.
            // SAFETY: freshly delegated, referenced by nothing.
            unsafe { scrub(addr, 1) };
            st.ledger.set(addr, GranuleState::Delegated);
            Ok(Outputs::NONE)
        })
    }

    pub(super) fn granule_undelegate(&self, addr: u64) -> HandlerResult {
        self.state.lock(|st| {
            crate::verbose!("undelegating granule {:#x}", addr);

            if !st.ledger.assert_state(addr, GranuleState::Delegated) {
                crate::info!(
                    "undelegating {:#x} with state {:?}",
                    addr,
                    st.ledger.state(addr)
                );
                return Err(Error::Input);
            }

            // Scrub before the PAS flips: once the granule is NS the host
            // can see it, so no realm data may survive past this point.
            // SAFETY: delegated and unused, referenced by nothing.
            unsafe { scrub(addr, 1) };

            let status = self.smc.undelegate(addr);
            if status != 0 {
                crate::warn!("realm to NS PAS transition failed: {:#x}", status);
                return Err(Error::Internal);
            }

            st.ledger.set(addr, GranuleState::Undelegated);
            Ok(Outputs::NONE)
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
