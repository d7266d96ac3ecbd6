/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! PSCI_COMPLETE: the host's half of a brokered realm PSCI call.
//!
//! CPU_ON and AFFINITY_INFO target another REC, which the calling realm
//! cannot touch itself; the host schedules the target and then reports
//! back through this call. The monitor, not the host, decides the
//! result the realm observes.

use {
    super::{HandlerResult, Outputs},
    crate::{
        error::Error,
        monitor::Rmm,
        psci::*,
        realm::rec_at,
        sync::interface::Mutex,
    },
};

impl Rmm<'_> {
    pub(super) fn psci_complete(&self, calling: u64, target: u64) -> HandlerResult {
        self.state.lock(|st| {
            crate::verbose!("psci complete {:#x} {:#x}", calling, target);

            if calling == target {
                return Err(Error::Input);
            }
            let callingp = rec_at(&st.ledger, calling)?;
            let targetp = rec_at(&st.ledger, target)?;

            if !callingp.psci_pending {
                return Err(Error::Input);
            }
            if callingp.owner_rd != targetp.owner_rd {
                return Err(Error::Input);
            }

            match callingp.gprs[0] {
                PSCI_AFFINITY_INFO_AARCH64 => {
                    callingp.psci_complete_result = if targetp.runnable {
                        AFF_STATE_ON
                    } else {
                        AFF_STATE_OFF
                    };
                }
                PSCI_CPU_ON_AARCH64 => {
                    if targetp.runnable {
                        callingp.psci_complete_result = PSCI_E_ALREADY_ON;
                    } else {
                        // Prime the target: context id in x0, entry point
                        // as requested, everything else scrubbed.
                        callingp.psci_complete_result = PSCI_E_SUCCESS;
                        targetp.gprs[0] = callingp.gprs[3];
                        for gpr in targetp.gprs[1..].iter_mut() {
                            *gpr = 0;
                        }
                        targetp.pc = callingp.gprs[2];
                        targetp.runnable = true;
                    }
                }
                fid => {
                    crate::warn!("psci complete with unexpected x0 {:#x}", fid);
                    return Err(Error::Input);
                }
            }

            callingp.psci_pending = false;
            callingp.gprs[1] = 0;
            callingp.gprs[2] = 0;
            callingp.gprs[3] = 0;
            Ok(Outputs::NONE)
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
