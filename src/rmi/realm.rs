/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! REALM_CREATE, REALM_ACTIVATE and REALM_DESTROY.

use {
    super::{HandlerResult, Outputs},
    crate::{
        error::Error,
        granule::{scrub, GranuleState, GRANULE_SIZE},
        monitor::Rmm,
        nsmem,
        realm::{
            rd::{Rd, RealmState},
            rd_at,
        },
        rtt::{OA_MASK, RTT_PAGE_LEVEL, RTTES_PER_RTT},
        run::RealmParams,
        sync::interface::Mutex,
    },
};

/// Address bits below the starting level: how much IPA space one
/// starting-level RTT granule covers.
fn root_bits(rtt_level_start: i64) -> u64 {
    12 + (4 - rtt_level_start as u64) * 9
}

fn rtt_geometry_valid(params: &RealmParams, ipa_width: u64) -> bool {
    // No LPA2, so no level -1.
    if params.rtt_level_start < 0 || params.rtt_level_start > RTT_PAGE_LEVEL as i64 {
        crate::info!("invalid rtt_level_start {}", params.rtt_level_start);
        return false;
    }
    let root_bits = root_bits(params.rtt_level_start);
    if ipa_width + 9 < root_bits {
        crate::info!(
            "rtt_level_start {} too small for ipa_width {}",
            params.rtt_level_start,
            ipa_width
        );
        return false;
    }
    // More than one starting-level table: the count must match exactly.
    if ipa_width > root_bits && u64::from(params.rtt_num_start) != 1 << (ipa_width - root_bits) {
        crate::info!(
            "rtt_num_start {} should be {}",
            params.rtt_num_start,
            1u64 << (ipa_width - root_bits)
        );
        return false;
    }
    true
}

/// A starting-level entry blocks destruction while it references a child
/// RTT or realm-owned data; dead ranges and NS mappings do not.
fn rtte_ready_to_destroy(rtte: u64) -> bool {
    if rtte & 0b11 == 0b11 {
        // A child table (or a live page on a level-3 root).
        return false;
    }
    let out_addr = rtte & OA_MASK;
    out_addr == 0 || rtte & (1 << 55) != 0
}

impl Rmm<'_> {
    pub(super) fn realm_create(&self, rd: u64, params_ptr: u64) -> HandlerResult {
        self.state.lock(|st| {
            crate::verbose!("create realm {:#x} params {:#x}", rd, params_ptr);

            if !st.ledger.assert_state(params_ptr, GranuleState::Undelegated) {
                crate::info!(
                    "realm params {:#x} with state {:?}",
                    params_ptr,
                    st.ledger.state(params_ptr)
                );
                return Err(Error::Input);
            }
            if !st.ledger.assert_state(rd, GranuleState::Delegated) {
                crate::info!("realm rd {:#x} with state {:?}", rd, st.ledger.state(rd));
                return Err(Error::Input);
            }

            let params: RealmParams =
                nsmem::read_ns_object(self.plat, params_ptr).ok_or_else(|| {
                    crate::info!("reading realm params {:#x} faulted", params_ptr);
                    Error::Input
                })?;

            // Feature word: no LPA2; the stage-2 size must fit the
            // platform's physical range.
            if params.features_0 & 0x100 != 0 {
                return Err(Error::Memory);
            }
            let ipa_width = params.features_0 & 0xff;
            if ipa_width > self.plat.pa_range() {
                return Err(Error::Memory);
            }

            if !rtt_geometry_valid(&params, ipa_width) {
                return Err(Error::Memory);
            }

            let ipa_limit = 1u64 << ipa_width;
            if params.par_base >= ipa_limit
                || params.par_size >= ipa_limit
                || params.par_base + params.par_size >= ipa_limit
            {
                crate::info!(
                    "PAR {:#x}+{:#x} exceeds ipa_width {}",
                    params.par_base,
                    params.par_size,
                    ipa_width
                );
                return Err(Error::Memory);
            }

            let rtt_num_start = u64::from(params.rtt_num_start).max(1);
            for i in 0..rtt_num_start {
                let rtt = params.rtt_base + i * GRANULE_SIZE as u64;
                if !st.ledger.assert_state(rtt, GranuleState::Delegated) {
                    crate::info!(
                        "realm rtt_base {:#x} with state {:?}",
                        rtt,
                        st.ledger.state(rtt)
                    );
                    return Err(Error::Memory);
                }
            }

            let vmid = st.vmids.allocate().ok_or_else(|| {
                crate::info!("no VMID available");
                Error::Internal
            })?;

            // SAFETY: the granule is Delegated (zeroed, unreferenced) and
            // every field is written before the ledger marks it Rd.
            let rdp = unsafe { &mut *(rd as *mut Rd) };
            rdp.par_base = params.par_base;
            rdp.par_size = params.par_size;
            rdp.ipa_width = ipa_width;
            rdp.rec_index = 0;
            rdp.rec_count = 0;
            rdp.rtt_base = params.rtt_base;
            rdp.rtt_level_start = params.rtt_level_start as u64;
            rdp.rtt_num_start = rtt_num_start;
            rdp.vmid = u64::from(vmid);
            rdp.state = RealmState::New;

            // SAFETY: all root tables were verified Delegated above.
            unsafe { scrub(params.rtt_base, rtt_num_start as usize) };
            for i in 0..rtt_num_start {
                st.ledger
                    .set(params.rtt_base + i * GRANULE_SIZE as u64, GranuleState::Rtt);
            }
            st.ledger.set(rd, GranuleState::Rd);
            Ok(Outputs::NONE)
        })
    }

    pub(super) fn realm_activate(&self, rd: u64) -> HandlerResult {
        self.state.lock(|st| {
            crate::verbose!("activate realm {:#x}", rd);

            let rdp = rd_at(&st.ledger, rd)?;
            if rdp.state != RealmState::New {
                crate::info!("activate realm in state {:?}", rdp.state);
                return Err(Error::RealmState);
            }
            rdp.state = RealmState::Active;
            Ok(Outputs::NONE)
        })
    }

    pub(super) fn realm_destroy(&self, rd: u64) -> HandlerResult {
        self.state.lock(|st| {
            crate::verbose!("destroy realm {:#x}", rd);

            let rdp = rd_at(&st.ledger, rd)?;
            if rdp.rec_count != 0 {
                return Err(Error::InUse);
            }

            // Every starting-level entry must be dead or NS-mapped, so no
            // child RTT or DATA granule is still referenced.
            for i in 0..rdp.rtt_num_start {
                let rtt = rdp.rtt_base + i * GRANULE_SIZE as u64;
                if !st.ledger.assert_state(rtt, GranuleState::Rtt) {
                    crate::warn!(
                        "destroy realm but starting rtt {:#x} is {:?}",
                        rtt,
                        st.ledger.state(rtt)
                    );
                    return Err(Error::Internal);
                }
                for j in 0..RTTES_PER_RTT {
                    // SAFETY: the granule is a starting-level RTT of this
                    // realm, per the ledger check above.
                    let rtte = unsafe { (rtt as *const u64).add(j).read_volatile() };
                    if !rtte_ready_to_destroy(rtte) {
                        crate::info!("destroy realm but RTTE {:#x} still live", rtte);
                        return Err(Error::InUse);
                    }
                }
            }

            let (vmid, rtt_base, rtt_num_start) = (rdp.vmid, rdp.rtt_base, rdp.rtt_num_start);
            st.vmids.release(vmid as u16);
            for i in 0..rtt_num_start {
                st.ledger
                    .set(rtt_base + i * GRANULE_SIZE as u64, GranuleState::Delegated);
            }
            st.ledger.set(rd, GranuleState::Delegated);
            Ok(Outputs::NONE)
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
