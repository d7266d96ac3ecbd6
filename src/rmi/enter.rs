/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! REC_ENTER: the realm entry/exit protocol.
//!
//! Entry folds the host's run buffer back into REC state (but only the
//! parts the host is entitled to influence), parks the host's EL2
//! timer, then drops the monitor lock and runs the realm. Informational
//! PSCI calls are answered in-monitor and loop straight back in; every
//! other exit is classified, sanitised and reported through the exit
//! half of the run buffer.

use {
    super::{HandlerResult, Outputs},
    crate::{
        arch,
        error::Error,
        granule::GranuleState,
        monitor::Rmm,
        nsmem,
        platform::ExitClass,
        psci::*,
        realm::{
            rd::{Rd, RealmState},
            rd_at,
            rec::{mpidr_to_rec_index, EnterReason, Rec},
            rec_at,
            vgic::{ENTRY_ICH_HCR_VALID_MASK, EXIT_ICH_HCR_VALID_MASK, ICH_HCR_EN},
        },
        run::{exit_reason, RecEntry, RecExit, REC_RUN_EXIT_OFFSET},
        sync::interface::Mutex,
    },
    bit_field::BitField,
};

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

/// ESR_EL2 dissection for exit classification.
pub(crate) mod esr {
    use bit_field::BitField;

    pub const EC_WFX: u64 = 0x01;
    pub const EC_HVC64: u64 = 0x16;
    pub const EC_SMC64: u64 = 0x17;
    pub const EC_IABORT_LOWER: u64 = 0x20;
    pub const EC_DABORT_LOWER: u64 = 0x24;

    pub const ISS_ISV: u64 = 1 << 24;
    pub const ISS_WNR: u64 = 1 << 6;

    pub fn ec(esr: u64) -> u64 {
        esr.get_bits(26..32)
    }

    /// Register number of an ISV=1 data abort's transfer register.
    pub fn srt(esr: u64) -> usize {
        esr.get_bits(16..21) as usize
    }
}

const CNTHP_CTL_ENABLE: u64 = 1 << 0;

/// Faulting IPA of a stage-2 abort.
fn hpfar_to_fipa(hpfar: u64) -> u64 {
    (hpfar & 0xfff_ffff_fff0) << 8
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl Rmm<'_> {
    pub(super) fn rec_enter(&self, rec: u64, run_ptr: u64) -> HandlerResult {
        // Phase 1: validate and stage everything under the lock.
        let (rec_ptr, saved_timer) = self.state.lock(|st| -> Result<(*mut Rec, u64), Error> {
            crate::verbose!("enter REC {:#x} run {:#x}", rec, run_ptr);

            if !st.ledger.assert_state(run_ptr, GranuleState::Undelegated) {
                return Err(Error::Input);
            }
            let recp = rec_at(&st.ledger, rec)?;
            if recp.state_running {
                return Err(Error::InUse);
            }
            if !recp.runnable {
                crate::info!("rec enter but not runnable");
                return Err(Error::Rec);
            }
            if recp.psci_pending {
                crate::info!("rec enter but psci pending");
                return Err(Error::Rec);
            }
            let rdp = rd_at(&st.ledger, recp.owner_rd).map_err(|_| Error::Internal)?;
            if rdp.state != RealmState::Active {
                crate::info!("rec enter with realm state {:?}", rdp.state);
                return Err(Error::RealmState);
            }

            let entry: RecEntry =
                nsmem::read_ns_object(self.plat, run_ptr).ok_or(Error::Memory)?;
            if entry.is_emulated_mmio != 0 && !recp.emulatable_abort {
                crate::info!("rec enter claims emulated mmio without an emulatable abort");
                return Err(Error::Rec);
            }

            apply_entry(recp, &entry)?;

            // Park the host's EL2 physical timer across realm execution.
            let timer = arch::read_cnthp_ctl_el2();
            arch::write_cnthp_ctl_el2(timer & !CNTHP_CTL_ENABLE);
            arch::isb();

            recp.state_running = true;
            Ok((recp as *mut Rec, timer))
        })?;

        // Phase 2: run without the lock so other cores can service RMI.
        // SAFETY: state_running was set under the lock, which pins this
        // REC against destruction and re-entry until cleared below.
        let recp = unsafe { &mut *rec_ptr };
        let exit_class = loop {
            let class = self.entry.enter(recp);
            if !self.handle_internal_exit(recp, class) {
                break class;
            }
        };

        // Phase 3: publish the exit under the lock.
        self.state.lock(|st| {
            let recp = unsafe { &mut *rec_ptr };
            recp.state_running = false;

            arch::write_cnthp_ctl_el2(saved_timer);
            arch::isb();

            let rdp = rd_at(&st.ledger, recp.owner_rd).map_err(|_| Error::Internal)?;
            let mut exit = RecExit::zeroed();
            build_exit(recp, rdp, &mut exit, exit_class)?;

            if !nsmem::write_ns_object(self.plat, run_ptr + REC_RUN_EXIT_OFFSET, &exit) {
                return Err(Error::Memory);
            }
            Ok(Outputs::NONE)
        })
    }

    /// Realm exits the monitor digests without involving the host.
    /// Returns true when the realm should be re-entered immediately.
    fn handle_internal_exit(&self, rec: &mut Rec, class: ExitClass) -> bool {
        if class != ExitClass::Trap || esr::ec(rec.sysregs.esr_el2) != esr::EC_SMC64 {
            return false;
        }

        // SAFETY: the owner RD was validated when this REC was staged
        // and cannot be destroyed while rec_count is nonzero.
        let rdp = unsafe { &*(rec.owner_rd as *const Rd) };

        match rec.gprs[0] {
            PSCI_CPU_OFF | PSCI_CPU_SUSPEND_AARCH64 | PSCI_SYSTEM_OFF | PSCI_SYSTEM_RESET => false,
            PSCI_VERSION => {
                rec.gprs[0] = self.smc.psci_version();
                rec.pc += 4;
                true
            }
            PSCI_FEATURES => {
                rec.gprs[0] = self.smc.psci_features(rec.gprs[1]);
                rec.pc += 4;
                true
            }
            PSCI_CPU_ON_AARCH64 => {
                // Argument validation is the monitor's job; only a
                // plausible request is worth a host round-trip.
                if mpidr_to_rec_index(rec.gprs[1]) >= rdp.rec_index {
                    rec.gprs[0] = PSCI_E_INVALID_PARAMS;
                    rec.pc += 4;
                    true
                } else if !rdp.par_contains(rec.gprs[2]) {
                    rec.gprs[0] = PSCI_E_INVALID_ADDRESS;
                    rec.pc += 4;
                    true
                } else {
                    false
                }
            }
            PSCI_AFFINITY_INFO_AARCH64 => {
                if mpidr_to_rec_index(rec.gprs[1]) >= rdp.rec_index || rec.gprs[2] != 0 {
                    rec.gprs[0] = PSCI_E_INVALID_PARAMS;
                    rec.pc += 4;
                    true
                } else {
                    false
                }
            }
            _ => {
                rec.gprs[0] = PSCI_E_NOT_SUPPORTED;
                rec.pc += 4;
                true
            }
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

/// Fold the host's entry block into REC state according to why the REC
/// last left the realm.
fn apply_entry(rec: &mut Rec, entry: &RecEntry) -> Result<(), Error> {
    match rec.enter_reason {
        EnterReason::FirstRun | EnterReason::Fiq | EnterReason::Irq => {}
        EnterReason::Trap => apply_trap_entry(rec, entry)?,
        EnterReason::El1Serror => {
            crate::warn!("re-entry after unhandled SError");
            return Err(Error::Rec);
        }
    }

    rec.sysregs.cpu_if.hcr = (entry.gicv3_hcr & ENTRY_ICH_HCR_VALID_MASK) | ICH_HCR_EN;
    rec.sysregs.cpu_if.lr = entry.gicv3_lrs;
    Ok(())
}

fn apply_trap_entry(rec: &mut Rec, entry: &RecEntry) -> Result<(), Error> {
    match esr::ec(rec.sysregs.esr_el2) {
        esr::EC_WFX => {
            rec.pc += 4;
        }
        esr::EC_HVC64 => {
            rec.gprs[..entry.gprs.len()].copy_from_slice(&entry.gprs);
        }
        esr::EC_SMC64 => {
            // Brokered calls return the completion result; everything
            // else takes the host's answer.
            rec.gprs[0] = if rec.gprs[0] == PSCI_AFFINITY_INFO_AARCH64
                || rec.gprs[0] == PSCI_CPU_ON_AARCH64
            {
                rec.psci_complete_result
            } else {
                entry.gprs[0]
            };
            rec.pc += 4;
        }
        esr::EC_IABORT_LOWER => {}
        esr::EC_DABORT_LOWER => {
            if entry.is_emulated_mmio != 0 {
                rec.pc += 4;
                if rec.sysregs.esr_el2 & esr::ISS_WNR == 0 {
                    rec.gprs[esr::srt(rec.sysregs.esr_el2)] = entry.emulated_read_value;
                }
            }
        }
        ec => {
            crate::warn!("unimplemented entry EC {:#x}", ec);
            return Err(Error::Rec);
        }
    }
    Ok(())
}

/// Assemble the sanitised exit record. Everything the host sees comes
/// through here.
fn build_exit(
    rec: &mut Rec,
    rd: &mut Rd,
    exit: &mut RecExit,
    class: ExitClass,
) -> Result<(), Error> {
    // Expose the realm's EL0 timers, then silence them so they cannot
    // fire while the host runs.
    exit.cntv_ctl = rec.sysregs.el1.cntv_ctl;
    exit.cntv_cval = rec.sysregs.el1.cntv_cval;
    exit.cntp_ctl = rec.sysregs.el1.cntp_ctl;
    exit.cntp_cval = rec.sysregs.el1.cntp_cval;
    arch::disable_el0_timers();

    exit.gicv3_hcr = rec.sysregs.cpu_if.hcr & EXIT_ICH_HCR_VALID_MASK;
    exit.gicv3_vmcr = rec.sysregs.cpu_if.vmcr;
    exit.gicv3_misr = arch::read_ich_misr_el2();
    exit.gicv3_lrs = rec.sysregs.cpu_if.lr;

    match class {
        ExitClass::Irq => {
            exit.reason = exit_reason::IRQ;
            exit.esr = 0;
            rec.enter_reason = EnterReason::Irq;
        }
        ExitClass::Fiq => {
            exit.reason = exit_reason::FIQ;
            exit.esr = 0;
            rec.enter_reason = EnterReason::Fiq;
        }
        ExitClass::Trap => {
            build_trap_exit(rec, rd, exit)?;
            rec.enter_reason = EnterReason::Trap;
        }
        ExitClass::El1Serror => {
            crate::warn!("unhandled SError exit");
            return Err(Error::Internal);
        }
    }
    Ok(())
}

fn build_trap_exit(rec: &mut Rec, rd: &mut Rd, exit: &mut RecExit) -> Result<(), Error> {
    let esr_el2 = rec.sysregs.esr_el2;
    match esr::ec(esr_el2) {
        esr::EC_WFX => {
            exit.reason = exit_reason::SYNC;
            exit.esr = esr_el2;
        }
        esr::EC_HVC64 => {
            exit.reason = exit_reason::SYNC;
            exit.esr = esr_el2;
            let gprs_len = exit.gprs.len();
            exit.gprs.copy_from_slice(&rec.gprs[..gprs_len]);
        }
        esr::EC_SMC64 => build_psci_exit(rec, rd, exit),
        esr::EC_IABORT_LOWER => {
            exit.reason = exit_reason::SYNC;
            exit.esr = esr_el2;
            exit.hpfar = rec.sysregs.hpfar_el2;
        }
        esr::EC_DABORT_LOWER => build_data_abort_exit(rec, rd, exit),
        ec => {
            crate::warn!("unimplemented exit EC {:#x} pc {:#x}", ec, rec.pc);
            return Err(Error::Rec);
        }
    }
    Ok(())
}

/// A state-changing PSCI call crosses to the host. Informational calls
/// never get here; `handle_internal_exit` answers them in-monitor.
fn build_psci_exit(rec: &mut Rec, rd: &mut Rd, exit: &mut RecExit) {
    exit.reason = exit_reason::PSCI;
    exit.gprs[0] = rec.gprs[0];
    match rec.gprs[0] {
        PSCI_AFFINITY_INFO_AARCH64 => {
            exit.gprs[1] = rec.gprs[1];
            exit.gprs[2] = rec.gprs[2];
            rec.psci_pending = true;
        }
        PSCI_CPU_ON_AARCH64 => {
            exit.gprs[1] = rec.gprs[1];
            exit.gprs[2] = rec.gprs[2];
            exit.gprs[3] = rec.gprs[3];
            rec.psci_pending = true;
        }
        PSCI_CPU_SUSPEND_AARCH64 => {
            exit.gprs[1] = rec.gprs[1];
            exit.gprs[2] = rec.gprs[2];
            exit.gprs[3] = rec.gprs[3];
        }
        PSCI_CPU_OFF => {
            rec.runnable = false;
        }
        PSCI_SYSTEM_OFF | PSCI_SYSTEM_RESET => {
            rd.state = RealmState::SystemOff;
        }
        fid => {
            crate::warn!("psci exit with unknown fid {:#x} pc {:#x}", fid, rec.pc);
        }
    }
}

fn build_data_abort_exit(rec: &mut Rec, rd: &Rd, exit: &mut RecExit) {
    let esr_el2 = rec.sysregs.esr_el2;
    exit.reason = exit_reason::SYNC;
    exit.hpfar = rec.sysregs.hpfar_el2;

    let fipa = hpfar_to_fipa(rec.sysregs.hpfar_el2);
    let fault_in_protected = rd.par_contains(fipa);

    if esr_el2 & esr::ISS_ISV != 0 && !fault_in_protected {
        // Emulatable: the host may satisfy this access. Write values
        // flow out only for actual writes.
        rec.emulatable_abort = true;
        exit.esr = esr_el2;
        exit.far = rec.sysregs.far_el2;
        if esr_el2.get_bit(6) {
            exit.emulated_write_value = rec.gprs[esr::srt(esr_el2)];
        }
    } else {
        rec.emulatable_abort = false;
        exit.esr = esr_el2;
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{rmi::fid, testbed::TestBed},
    };

    fn esr_for(ec: u64, iss: u64) -> u64 {
        (ec << 26) | iss
    }

    #[test]
    fn enter_requires_active_realm_and_runnable_rec() {
        let bed = TestBed::new();
        let (rd, _) = bed.create_default_realm();
        let rec = bed.delegated_granule(6);
        assert!(bed.create_rec(rec, rd, 0).is_success());
        let run = bed.granule(9);

        // Realm still NEW.
        let reply = bed.handle(fid::REC_ENTER, [rec, run, 0, 0, 0]);
        assert_eq!(reply.status(), Error::RealmState.code());

        assert!(bed.handle(fid::REALM_ACTIVATE, [rd, 0, 0, 0, 0]).is_success());

        // Not runnable.
        bed.set_rec_runnable(rec, false);
        let reply = bed.handle(fid::REC_ENTER, [rec, run, 0, 0, 0]);
        assert_eq!(reply.status(), Error::Rec.code());
    }

    #[test]
    fn irq_exit_reaches_the_run_buffer() {
        let bed = TestBed::new();
        let (_, rec, run) = bed.bootable_realm();

        bed.entry.push(|_rec| crate::platform::ExitClass::Irq);
        assert!(bed.handle(fid::REC_ENTER, [rec, run, 0, 0, 0]).is_success());

        let exit = bed.read_exit(run);
        assert_eq!(exit.reason, exit_reason::IRQ);
        assert_eq!(exit.esr, 0);
    }

    #[test]
    fn wfi_trap_reports_sync_and_advances_pc_on_reentry() {
        let bed = TestBed::new();
        let (_, rec, run) = bed.bootable_realm();
        let pc0 = bed.rec_boot_state(rec).1;

        bed.entry.push(|rec| {
            rec.sysregs.esr_el2 = esr_for(esr::EC_WFX, 0);
            crate::platform::ExitClass::Trap
        });
        assert!(bed.handle(fid::REC_ENTER, [rec, run, 0, 0, 0]).is_success());
        assert_eq!(bed.read_exit(run).reason, exit_reason::SYNC);

        // Re-entry skips the WFI.
        bed.entry.push(move |rec| {
            assert_eq!(rec.pc, pc0 + 4);
            crate::platform::ExitClass::Irq
        });
        assert!(bed.handle(fid::REC_ENTER, [rec, run, 0, 0, 0]).is_success());
    }

    #[test]
    fn emulated_mmio_round_trip() {
        let bed = TestBed::new();
        let (_, rec, run) = bed.bootable_realm();
        let pc0 = bed.rec_boot_state(rec).1;

        // The realm loads from an unprotected IPA with ISV set, SRT = 5.
        bed.entry.push(|rec| {
            rec.sysregs.esr_el2 = esr_for(esr::EC_DABORT_LOWER, esr::ISS_ISV | (5 << 16));
            rec.sysregs.hpfar_el2 = (0x2100_0000u64 >> 8) & 0xfff_ffff_fff0;
            rec.sysregs.far_el2 = 0x2100_0004;
            crate::platform::ExitClass::Trap
        });
        assert!(bed.handle(fid::REC_ENTER, [rec, run, 0, 0, 0]).is_success());

        let exit = bed.read_exit(run);
        assert_eq!(exit.reason, exit_reason::SYNC);
        assert_ne!(exit.esr & esr::ISS_ISV, 0);
        assert_eq!(exit.far, 0x2100_0004);
        // A read exposes no register value to the host.
        assert_eq!(exit.emulated_write_value, 0);

        // Host answers the load with 0xAA.
        bed.write_entry_mmio(run, 0xaa);
        bed.entry.push(move |rec| {
            assert_eq!(rec.gprs[5], 0xaa);
            assert_eq!(rec.pc, pc0 + 4);
            crate::platform::ExitClass::Irq
        });
        assert!(bed.handle(fid::REC_ENTER, [rec, run, 0, 0, 0]).is_success());
    }

    #[test]
    fn mmio_claim_without_emulatable_abort_is_rejected() {
        let bed = TestBed::new();
        let (_, rec, run) = bed.bootable_realm();

        bed.write_entry_mmio(run, 0xaa);
        let reply = bed.handle(fid::REC_ENTER, [rec, run, 0, 0, 0]);
        assert_eq!(reply.status(), Error::Rec.code());
    }

    #[test]
    fn emulated_write_exposes_the_written_value() {
        let bed = TestBed::new();
        let (_, rec, run) = bed.bootable_realm();

        bed.entry.push(|rec| {
            rec.gprs[3] = 0x55;
            rec.sysregs.esr_el2 =
                esr_for(esr::EC_DABORT_LOWER, esr::ISS_ISV | esr::ISS_WNR | (3 << 16));
            rec.sysregs.hpfar_el2 = (0x2100_0000u64 >> 8) & 0xfff_ffff_fff0;
            crate::platform::ExitClass::Trap
        });
        assert!(bed.handle(fid::REC_ENTER, [rec, run, 0, 0, 0]).is_success());
        assert_eq!(bed.read_exit(run).emulated_write_value, 0x55);
    }

    #[test]
    fn psci_version_is_answered_without_the_host() {
        let bed = TestBed::new();
        let (_, rec, run) = bed.bootable_realm();

        bed.entry.push(|rec| {
            rec.gprs[0] = PSCI_VERSION;
            rec.sysregs.esr_el2 = esr_for(esr::EC_SMC64, 0);
            crate::platform::ExitClass::Trap
        });
        // The shim answers and re-enters; the second script observes it.
        bed.entry.push(|rec| {
            assert_eq!(rec.gprs[0], 0x0001_0000);
            crate::platform::ExitClass::Irq
        });
        assert!(bed.handle(fid::REC_ENTER, [rec, run, 0, 0, 0]).is_success());
        assert_eq!(bed.read_exit(run).reason, exit_reason::IRQ);
    }

    #[test]
    fn unknown_psci_fid_is_refused_in_monitor() {
        let bed = TestBed::new();
        let (_, rec, run) = bed.bootable_realm();

        bed.entry.push(|rec| {
            rec.gprs[0] = 0x8400_0042;
            rec.sysregs.esr_el2 = esr_for(esr::EC_SMC64, 0);
            crate::platform::ExitClass::Trap
        });
        bed.entry.push(|rec| {
            assert_eq!(rec.gprs[0], PSCI_E_NOT_SUPPORTED);
            crate::platform::ExitClass::Irq
        });
        assert!(bed.handle(fid::REC_ENTER, [rec, run, 0, 0, 0]).is_success());
    }

    #[test]
    fn system_off_parks_the_realm() {
        let bed = TestBed::new();
        let (rd, rec, run) = bed.bootable_realm();

        bed.entry.push(|rec| {
            rec.gprs[0] = PSCI_SYSTEM_OFF;
            rec.sysregs.esr_el2 = esr_for(esr::EC_SMC64, 0);
            crate::platform::ExitClass::Trap
        });
        assert!(bed.handle(fid::REC_ENTER, [rec, run, 0, 0, 0]).is_success());
        assert_eq!(bed.read_exit(run).reason, exit_reason::PSCI);

        // The realm is SYSTEM_OFF now; re-entry is a state error.
        let reply = bed.handle(fid::REC_ENTER, [rec, run, 0, 0, 0]);
        assert_eq!(reply.status(), Error::RealmState.code());
        let _ = rd;
    }

    #[test]
    fn cpu_on_round_trip_primes_the_target() {
        let bed = TestBed::new();
        let (rd, rec0, run) = bed.bootable_realm_with_recs(2);
        let rec1 = bed.rec_of(rd, 1);

        // REC0 asks to start mpidr 1 at an address inside the PAR.
        bed.entry.push(|rec| {
            rec.gprs[0] = PSCI_CPU_ON_AARCH64;
            rec.gprs[1] = 1;
            rec.gprs[2] = 0x1000_0000;
            rec.gprs[3] = 0x1234; // context id
            rec.sysregs.esr_el2 = esr_for(esr::EC_SMC64, 0);
            crate::platform::ExitClass::Trap
        });
        assert!(bed.handle(fid::REC_ENTER, [rec0, run, 0, 0, 0]).is_success());

        let exit = bed.read_exit(run);
        assert_eq!(exit.reason, exit_reason::PSCI);
        assert_eq!(exit.gprs[0], PSCI_CPU_ON_AARCH64);
        assert_eq!(exit.gprs[1], 1);
        assert_eq!(exit.gprs[2], 0x1000_0000);
        assert_eq!(exit.gprs[3], 0x1234);

        // Entering again while the completion is pending is refused.
        let reply = bed.handle(fid::REC_ENTER, [rec0, run, 0, 0, 0]);
        assert_eq!(reply.status(), Error::Rec.code());

        assert!(bed.handle(fid::PSCI_COMPLETE, [rec0, rec1, 0, 0, 0]).is_success());

        let (gprs, pc, runnable) = bed.rec_boot_state(rec1);
        assert!(runnable);
        assert_eq!(pc, 0x1000_0000);
        assert_eq!(gprs[0], 0x1234);
        assert_eq!(gprs[1..], [0u64; 31]);

        // The caller observes PSCI_E_SUCCESS on its next entry.
        bed.entry.push(|rec| {
            assert_eq!(rec.gprs[0], PSCI_E_SUCCESS);
            crate::platform::ExitClass::Irq
        });
        assert!(bed.handle(fid::REC_ENTER, [rec0, run, 0, 0, 0]).is_success());
    }

    #[test]
    fn cpu_on_with_bad_target_is_answered_internally() {
        let bed = TestBed::new();
        let (_, rec0, run) = bed.bootable_realm();

        // Only one REC exists, so mpidr 5 is out of range.
        bed.entry.push(|rec| {
            rec.gprs[0] = PSCI_CPU_ON_AARCH64;
            rec.gprs[1] = 5;
            rec.gprs[2] = 0x1000_0000;
            rec.sysregs.esr_el2 = esr_for(esr::EC_SMC64, 0);
            crate::platform::ExitClass::Trap
        });
        bed.entry.push(|rec| {
            assert_eq!(rec.gprs[0], PSCI_E_INVALID_PARAMS);
            crate::platform::ExitClass::Irq
        });
        assert!(bed.handle(fid::REC_ENTER, [rec0, run, 0, 0, 0]).is_success());
    }

    #[test]
    fn faulting_run_buffer_is_a_memory_error() {
        let bed = TestBed::new();
        let (_, rec, run) = bed.bootable_realm();
        bed.plat.fault_at(run);

        let reply = bed.handle(fid::REC_ENTER, [rec, run, 0, 0, 0]);
        assert_eq!(reply.status(), Error::Memory.code());
    }
}
