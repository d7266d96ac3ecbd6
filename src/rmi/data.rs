/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! DATA_CREATE, DATA_CREATE_UNKNOWN, DATA_DESTROY and DATA_DISPOSE.
//!
//! Population and depopulation of realm-owned memory. The `_LEVEL`
//! variants accept a 2 MiB block (level 2) as well as the single page
//! the plain variants imply.

use {
    super::{HandlerResult, Outputs},
    crate::{
        arch,
        error::Error,
        granule::{is_granule_aligned, is_level_aligned, level_size, scrub, GranuleState,
                  GRANULE_SIZE},
        monitor::Rmm,
        nsmem,
        realm::{rd::RealmState, rd_at, rec_at},
        rtt::{walk, RtteState, RTT_BLOCK_LEVEL, RTT_PAGE_LEVEL},
        sync::interface::Mutex,
    },
};

fn level_is_mappable(level: u64) -> bool {
    level == RTT_BLOCK_LEVEL as u64 || level == RTT_PAGE_LEVEL as u64
}

impl Rmm<'_> {
    /// `src == None` is the "unknown" variant: contents start zeroed
    /// instead of being copied out of NS memory.
    pub(super) fn data_create(
        &self,
        data: u64,
        rd: u64,
        ipa: u64,
        src: Option<u64>,
        level: u64,
    ) -> HandlerResult {
        self.state.lock(|st| {
            crate::verbose!(
                "create data {:#x} rd {:#x} ipa {:#x} src {:?} level {}",
                data,
                rd,
                ipa,
                src,
                level
            );

            if !level_is_mappable(level) {
                return Err(Error::Input);
            }
            let level = level as usize;
            if !st.ledger.assert_state_level(data, level, GranuleState::Delegated) {
                return Err(Error::Input);
            }
            let rdp = rd_at(&st.ledger, rd)?;
            if let Some(src) = src {
                if !st.ledger.assert_state_level(src, level, GranuleState::Undelegated) {
                    return Err(Error::Input);
                }
            }
            if !is_level_aligned(ipa, level) {
                return Err(Error::Input);
            }

            // Measured population is only allowed before activation; the
            // unknown variant may repopulate disposed ranges later.
            if src.is_some() && rdp.state != RealmState::New {
                return Err(Error::RealmState);
            }

            let data_size = level_size(level);
            if !rdp.par_contains_range(ipa, data_size) {
                return Err(Error::Input);
            }

            let mut walked = walk(rdp, ipa, level)?;
            if walked.level != level {
                return Err(Error::RttWalk);
            }
            if walked.state() != RtteState::Unassigned {
                return Err(Error::RttEntry);
            }

            match src {
                Some(src) => {
                    // The guarded copy is bounded to one granule, so a
                    // block populates granule by granule.
                    let mut offset = 0;
                    while offset < data_size {
                        // SAFETY: the whole data range was verified
                        // Delegated; nothing references it yet.
                        let dst = unsafe {
                            core::slice::from_raw_parts_mut(
                                (data + offset) as *mut u8,
                                GRANULE_SIZE,
                            )
                        };
                        if !nsmem::read_ns(self.plat, dst, src + offset) {
                            return Err(Error::Memory);
                        }
                        offset += GRANULE_SIZE as u64;
                    }
                }
                None => {
                    // SAFETY: as above.
                    unsafe { scrub(data, (data_size as usize) / GRANULE_SIZE) };
                }
            }
            arch::clean_dcache_range(data, data_size);

            st.ledger.set_level(data, level, GranuleState::Data);
            walked.set(data, false);
            Ok(Outputs::NONE)
        })
    }

    pub(super) fn data_destroy(&self, rd: u64, ipa: u64, level: u64) -> HandlerResult {
        self.state.lock(|st| {
            crate::verbose!("destroy data rd {:#x} ipa {:#x} level {}", rd, ipa, level);

            if !level_is_mappable(level) {
                return Err(Error::Input);
            }
            let level = level as usize;
            let rdp = rd_at(&st.ledger, rd)?;
            if !is_granule_aligned(ipa) {
                return Err(Error::Input);
            }
            let data_size = level_size(level);
            if !rdp.par_contains_range(ipa, data_size) {
                return Err(Error::Input);
            }

            let mut walked = walk(rdp, ipa, level)?;
            if walked.level != level {
                return Err(Error::RttWalk);
            }
            if walked.state() != RtteState::Assigned {
                return Err(Error::RttEntry);
            }

            let out_addr = walked.out_addr();
            if !st.ledger.assert_state_level(out_addr, level, GranuleState::Data) {
                crate::warn!(
                    "destroying data at {:#x} but ledger says {:?}",
                    out_addr,
                    st.ledger.state(out_addr)
                );
            }

            st.ledger.set_level(out_addr, level, GranuleState::Delegated);
            walked.set_destroyed();
            Ok(Outputs::NONE)
        })
    }

    pub(super) fn data_dispose(&self, rd: u64, rec: u64, ipa: u64, level: u64) -> HandlerResult {
        self.state.lock(|st| {
            crate::verbose!(
                "dispose data rd {:#x} rec {:#x} ipa {:#x} level {}",
                rd,
                rec,
                ipa,
                level
            );

            if !level_is_mappable(level) {
                return Err(Error::Input);
            }
            let level = level as usize;
            if !is_level_aligned(ipa, level) {
                return Err(Error::Input);
            }
            let rdp = rd_at(&st.ledger, rd)?;
            let recp = rec_at(&st.ledger, rec)?;
            if recp.state_running {
                return Err(Error::InUse);
            }
            if recp.owner_rd != rd {
                return Err(Error::Owner);
            }

            let mut walked = walk(rdp, ipa, level)?;
            if walked.level != level {
                return Err(Error::RttWalk);
            }
            if walked.state() != RtteState::Destroyed {
                return Err(Error::RttEntry);
            }

            walked.set(0, false);
            Ok(Outputs::NONE)
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
