/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! REC_CREATE and REC_DESTROY.

use {
    super::{HandlerResult, Outputs},
    crate::{
        error::Error,
        granule::GranuleState,
        monitor::Rmm,
        nsmem,
        realm::{
            rd::RealmState,
            rd_at,
            rec::{
                mpidr_to_rec_index, mpidr_to_vmpidr, EnterReason, SysRegs, GPR_COUNT,
                PARAM_GPR_COUNT,
            },
            rec_at, rec_at_unchecked, sysreg,
        },
        run::{RecParams, RecParamsFlags},
        sync::interface::Mutex,
    },
};

impl Rmm<'_> {
    pub(super) fn rec_create(&self, rec: u64, rd: u64, mpidr: u64, params_ptr: u64) -> HandlerResult {
        self.state.lock(|st| {
            crate::verbose!(
                "create REC {:#x} rd {:#x} mpidr {:#x} params {:#x}",
                rec,
                rd,
                mpidr,
                params_ptr
            );

            if !st.ledger.assert_state(params_ptr, GranuleState::Undelegated) {
                crate::info!(
                    "rec params {:#x} with state {:?}",
                    params_ptr,
                    st.ledger.state(params_ptr)
                );
                return Err(Error::Input);
            }
            let rdp = rd_at(&st.ledger, rd)?;
            if !st.ledger.assert_state(rec, GranuleState::Delegated) {
                crate::info!("rec granule {:#x} with state {:?}", rec, st.ledger.state(rec));
                return Err(Error::Input);
            }

            if rdp.state != RealmState::New {
                crate::info!("create rec with realm state {:?}", rdp.state);
                return Err(Error::RealmState);
            }
            // RECs are created in mpidr order; the next expected index is
            // the realm's running counter.
            if mpidr_to_rec_index(mpidr) != rdp.rec_index {
                crate::info!(
                    "rec mpidr {:#x} but next index {:#x}",
                    mpidr,
                    rdp.rec_index
                );
                return Err(Error::Input);
            }

            let params: RecParams = nsmem::read_ns_object(self.plat, params_ptr).ok_or_else(|| {
                crate::info!("reading rec params {:#x} faulted", params_ptr);
                Error::Input
            })?;

            rdp.rec_index += 1;
            rdp.rec_count += 1;
            st.ledger.set(rec, GranuleState::Rec);

            // SAFETY: verified Delegated above; fully initialised below.
            let recp = unsafe { rec_at_unchecked(rec) };
            recp.owner_rd = rd;
            recp.state_running = false;
            recp.psci_pending = false;
            recp.emulatable_abort = false;
            recp.psci_complete_result = 0;
            recp.runnable = RecParamsFlags::from_bits_truncate(params.flags)
                .contains(RecParamsFlags::RUNNABLE);
            recp.gprs[..PARAM_GPR_COUNT].copy_from_slice(&params.gprs);
            for gpr in recp.gprs[PARAM_GPR_COUNT..GPR_COUNT].iter_mut() {
                *gpr = 0;
            }
            recp.pc = params.pc;
            recp.aux = params.aux;
            recp.dispose_base = 0;
            recp.dispose_size = 0;
            recp.enter_reason = EnterReason::FirstRun;

            recp.sysregs = SysRegs::zeroed();
            recp.sysregs.el1.sctlr = sysreg::sctlr_reset();
            recp.sysregs.spsr_el2 = sysreg::spsr_reset();
            recp.sysregs.hcr_el2 = sysreg::hcr_image();
            recp.sysregs.vtcr_el2 = sysreg::vtcr_image(rdp.ipa_width, rdp.rtt_level_start);
            recp.sysregs.vttbr_el2 = sysreg::vttbr_image(rdp.rtt_base, rdp.vmid);
            recp.sysregs.vmpidr_el2 = mpidr_to_vmpidr(mpidr);

            Ok(Outputs::NONE)
        })
    }

    pub(super) fn rec_destroy(&self, rec: u64) -> HandlerResult {
        self.state.lock(|st| {
            crate::verbose!("destroy REC {:#x}", rec);

            let recp = rec_at(&st.ledger, rec)?;
            if recp.state_running {
                crate::info!("destroying a running REC");
                return Err(Error::InUse);
            }

            let rdp = rd_at(&st.ledger, recp.owner_rd).map_err(|_| Error::Internal)?;
            debug_assert!(rdp.rec_count > 0);
            rdp.rec_count -= 1;

            st.ledger.set(rec, GranuleState::Delegated);
            Ok(Outputs::NONE)
        })
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
