/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! RTT_CREATE, RTT_DESTROY, the four MAP/UNMAP operations and
//! RTT_READ_ENTRY.
//!
//! Splitting and coarsening of the stage-2 tree. RTT_CREATE splays a
//! leaf entry into a child table; RTT_DESTROY folds a child table back
//! into its parent entry when all 512 entries agree.

use {
    super::{HandlerResult, Outputs},
    crate::{
        arch,
        error::Error,
        granule::{is_level_aligned, scrub, GranuleState},
        monitor::Rmm,
        realm::rd_at,
        rtt::{fold, walk, RtteState, OA_MASK, RTT_BLOCK_LEVEL, RTT_PAGE_LEVEL, RTTES_PER_RTT},
        sync::interface::Mutex,
    },
};

fn level_is_mappable(level: u64) -> bool {
    level == RTT_BLOCK_LEVEL as u64 || level == RTT_PAGE_LEVEL as u64
}

impl Rmm<'_> {
    pub(super) fn rtt_create(&self, rtt: u64, rd: u64, ipa: u64, level: u64) -> HandlerResult {
        self.state.lock(|st| {
            crate::verbose!("create rtt {:#x} rd {:#x} ipa {:#x} level {}", rtt, rd, ipa, level);

            let rdp = rd_at(&st.ledger, rd)?;
            if !st.ledger.assert_state(rtt, GranuleState::Delegated) {
                return Err(Error::Input);
            }
            if level < 1 || !is_level_aligned(ipa, level as usize - 1) {
                return Err(Error::Input);
            }
            if !rdp.ipa_in_width(ipa) {
                return Err(Error::Input);
            }
            if level <= rdp.rtt_level_start || level > RTT_PAGE_LEVEL as u64 {
                return Err(Error::Input);
            }
            let level = level as usize;

            let mut walked = walk(rdp, ipa, level - 1)?;
            if walked.level != level - 1 {
                return Err(Error::RttWalk);
            }

            match walked.state() {
                RtteState::Assigned | RtteState::Valid | RtteState::ValidNs => {
                    // Splitting a live block is only defined one level up
                    // from pages.
                    if level != RTT_PAGE_LEVEL {
                        return Err(Error::RttEntry);
                    }
                    let parent_rtte = walked.raw();
                    for i in (0..RTTES_PER_RTT).rev() {
                        // SAFETY: rtt was verified Delegated; it becomes
                        // this entry's child table below.
                        unsafe {
                            (rtt as *mut u64)
                                .add(i)
                                .write(parent_rtte + ((i as u64) << 12));
                        }
                    }
                }
                RtteState::Unassigned => {
                    // SAFETY: as above.
                    unsafe { scrub(rtt, 1) };
                }
                RtteState::Destroyed => {
                    for i in 0..RTTES_PER_RTT {
                        // SAFETY: as above.
                        unsafe { (rtt as *mut u64).add(i).write(1 << 56) };
                    }
                }
                RtteState::Table => return Err(Error::RttEntry),
            }

            st.ledger.set(rtt, GranuleState::Rtt);
            walked.set_table(rtt);
            Ok(Outputs::NONE)
        })
    }

    pub(super) fn rtt_destroy(&self, rtt: u64, rd: u64, ipa: u64, level: u64) -> HandlerResult {
        self.state.lock(|st| {
            crate::verbose!("destroy rtt {:#x} rd {:#x} ipa {:#x} level {}", rtt, rd, ipa, level);

            let rdp = rd_at(&st.ledger, rd)?;
            if !st.ledger.assert_state(rtt, GranuleState::Rtt) {
                return Err(Error::Input);
            }
            if level < 1 || !is_level_aligned(ipa, level as usize - 1) {
                return Err(Error::Input);
            }
            if !rdp.ipa_in_width(ipa) {
                return Err(Error::Input);
            }
            if level <= rdp.rtt_level_start || level > RTT_PAGE_LEVEL as u64 {
                return Err(Error::Input);
            }
            let level = level as usize;

            let mut walked = walk(rdp, ipa, level - 1)?;
            if walked.level != level - 1 {
                return Err(Error::RttWalk);
            }
            if walked.state() != RtteState::Table {
                return Err(Error::RttEntry);
            }
            if walked.out_addr() != rtt {
                return Err(Error::RttEntry);
            }

            if !fold(&mut walked) {
                return Err(Error::InUse);
            }
            st.ledger.set(rtt, GranuleState::Delegated);
            Ok(Outputs::NONE)
        })
    }

    pub(super) fn rtt_map_protected(&self, rd: u64, ipa: u64, level: u64) -> HandlerResult {
        self.map_unmap(rd, ipa, level, true, 0)
    }

    pub(super) fn rtt_map_unprotected(
        &self,
        rd: u64,
        ipa: u64,
        level: u64,
        ns_rtte: u64,
    ) -> HandlerResult {
        self.map_unmap(rd, ipa, level, true, ns_rtte)
    }

    pub(super) fn rtt_unmap_protected(&self, rd: u64, ipa: u64, level: u64) -> HandlerResult {
        self.map_unmap(rd, ipa, level, false, 0)
    }

    pub(super) fn rtt_unmap_unprotected(
        &self,
        rd: u64,
        ipa: u64,
        level: u64,
        ns_rtte: u64,
    ) -> HandlerResult {
        self.map_unmap(rd, ipa, level, false, ns_rtte)
    }

    /// Common body of the four MAP/UNMAP operations. `ns_rtte == 0`
    /// selects the protected flavour.
    fn map_unmap(&self, rd: u64, ipa: u64, level: u64, is_map: bool, ns_rtte: u64) -> HandlerResult {
        self.state.lock(|st| {
            crate::verbose!(
                "{} {} rd {:#x} ipa {:#x} level {} ns_rtte {:#x}",
                if is_map { "map" } else { "unmap" },
                if ns_rtte != 0 { "unprotected" } else { "protected" },
                rd,
                ipa,
                level,
                ns_rtte
            );

            if !level_is_mappable(level) {
                return Err(Error::Input);
            }
            let level = level as usize;
            let rdp = rd_at(&st.ledger, rd)?;
            if !is_level_aligned(ipa, level) {
                return Err(Error::Input);
            }
            if is_map && ns_rtte != 0 {
                // The host-supplied output must be a real physical page
                // outside realm ownership, aligned like the mapping.
                let out_addr = ns_rtte & OA_MASK;
                if !st.ledger.is_delegable(out_addr) {
                    return Err(Error::Input);
                }
                if !is_level_aligned(out_addr, level) {
                    return Err(Error::Input);
                }
            }
            if !rdp.ipa_in_width(ipa) {
                return Err(Error::Input);
            }

            let mut walked = walk(rdp, ipa, level)?;
            if walked.level != level {
                return Err(Error::RttWalk);
            }

            let state = walked.state();
            if is_map {
                if ns_rtte != 0 {
                    if state != RtteState::Unassigned && state != RtteState::Destroyed {
                        return Err(Error::RttEntry);
                    }
                    walked.set_ns(ns_rtte);
                } else {
                    if state != RtteState::Assigned {
                        return Err(Error::RttEntry);
                    }
                    walked.set_valid(true);
                }
            } else if ns_rtte != 0 {
                if state != RtteState::ValidNs {
                    return Err(Error::RttEntry);
                }
                if walked.out_addr() != ns_rtte & OA_MASK {
                    return Err(Error::RttEntry);
                }
                walked.set(0, false);
            } else {
                if state != RtteState::Valid {
                    return Err(Error::RttEntry);
                }
                walked.set_valid(false);
            }

            arch::tlbi_ipas2e1is(ipa);
            Ok(Outputs::NONE)
        })
    }

    pub(super) fn rtt_read_entry(&self, rd: u64, ipa: u64, level: u64) -> HandlerResult {
        self.state.lock(|st| {
            crate::verbose!("read rtt entry rd {:#x} ipa {:#x} level {}", rd, ipa, level);

            let rdp = rd_at(&st.ledger, rd)?;
            if level > RTT_PAGE_LEVEL as u64 || !is_level_aligned(ipa, level as usize) {
                return Err(Error::Input);
            }
            if !rdp.ipa_in_width(ipa) {
                return Err(Error::Input);
            }
            if level < rdp.rtt_level_start {
                return Err(Error::Input);
            }

            // An early stop is not an error here: the reply names the
            // level actually reached.
            let walked = walk(rdp, ipa, level as usize)?;

            let state = walked.state();
            // Confidentiality filter: the host learns only what it is
            // entitled to at each state.
            let desc = match state {
                RtteState::Unassigned | RtteState::Destroyed => 0,
                RtteState::Assigned | RtteState::Valid | RtteState::Table => {
                    walked.raw() & OA_MASK
                }
                RtteState::ValidNs => walked.raw() & (OA_MASK | 0x3fc),
            };

            Ok(Outputs([walked.level as u64, state as u64, desc]))
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
