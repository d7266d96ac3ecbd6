/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! The production world switch.
//!
//! Restores a REC's EL1 bundle and stage-2 configuration into the
//! hardware, drops into the realm through the assembly trampoline and
//! captures the exit state back into the REC. EL2 registers that the
//! monitor itself relies on are either saved around the excursion or
//! never handed to the realm.

use {
    super::{read_sysreg, write_sysreg},
    crate::{
        platform::{interface::RealmEntry, ExitClass},
        realm::{
            rec::{El1SysRegs, Rec},
            vgic::VgicCpuIf,
        },
    },
    aarch64_cpu::registers::*,
};

extern "C" {
    fn __realm_enter(rec: *mut Rec) -> u64;
}

const ICC_SRE_SRE: u64 = 1 << 0;
const ICC_SRE_DFB: u64 = 1 << 1;
const ICC_SRE_DIB: u64 = 1 << 2;

/// Enters realms on the calling core.
pub struct WorldSwitch;

impl RealmEntry for WorldSwitch {
    fn enter(&self, rec: &mut Rec) -> ExitClass {
        // The monitor does not use the GIC system-register interface
        // itself, but the realm's EL1 view of it must be constrained.
        let saved_sre = read_sysreg!(icc_sre_el1);
        write_sysreg!(icc_sre_el1, ICC_SRE_SRE | ICC_SRE_DFB | ICC_SRE_DIB);

        ELR_EL2.set(rec.pc);
        HCR_EL2.set(rec.sysregs.hcr_el2);
        SPSR_EL2.set(rec.sysregs.spsr_el2);
        VTCR_EL2.set(rec.sysregs.vtcr_el2);
        VTTBR_EL2.set(rec.sysregs.vttbr_el2);
        write_sysreg!(vmpidr_el2, rec.sysregs.vmpidr_el2);
        restore_el1_state(&rec.sysregs.el1);
        vgic_restore(&rec.sysregs.cpu_if);

        // SAFETY: vectors are installed and the REC's GPR file is the
        // first field, as the trampoline requires.
        let exit_code = unsafe { __realm_enter(rec) };

        save_el1_state(&mut rec.sysregs.el1);
        rec.pc = ELR_EL2.get();
        rec.sysregs.spsr_el2 = SPSR_EL2.get();
        rec.sysregs.esr_el2 = ESR_EL2.get();
        rec.sysregs.far_el2 = FAR_EL2.get();
        rec.sysregs.hpfar_el2 = read_sysreg!(hpfar_el2);
        vgic_save(&mut rec.sysregs.cpu_if);

        write_sysreg!(icc_sre_el1, saved_sre);

        match exit_code {
            0 => ExitClass::Irq,
            1 => ExitClass::Fiq,
            2 => ExitClass::El1Serror,
            _ => ExitClass::Trap,
        }
    }
}

fn restore_el1_state(el1: &El1SysRegs) {
    write_sysreg!(sctlr_el1, el1.sctlr);
    write_sysreg!(actlr_el1, el1.actlr);
    write_sysreg!(cpacr_el1, el1.cpacr);
    write_sysreg!(csselr_el1, el1.csselr);
    write_sysreg!(sp_el0, el1.sp_el0);
    write_sysreg!(sp_el1, el1.sp_el1);
    write_sysreg!(esr_el1, el1.esr);
    write_sysreg!(ttbr0_el1, el1.ttbr0);
    write_sysreg!(ttbr1_el1, el1.ttbr1);
    write_sysreg!(mair_el1, el1.mair);
    write_sysreg!(amair_el1, el1.amair);
    write_sysreg!(tcr_el1, el1.tcr);
    write_sysreg!(tpidr_el0, el1.tpidr_el0);
    write_sysreg!(tpidrro_el0, el1.tpidrro_el0);
    write_sysreg!(tpidr_el1, el1.tpidr_el1);
    write_sysreg!(par_el1, el1.par);
    write_sysreg!(far_el1, el1.far);
    write_sysreg!(afsr0_el1, el1.afsr0);
    write_sysreg!(afsr1_el1, el1.afsr1);
    write_sysreg!(spsr_el1, el1.spsr);
    write_sysreg!(elr_el1, el1.elr);
    write_sysreg!(vbar_el1, el1.vbar);
    write_sysreg!(contextidr_el1, el1.contextidr);
    write_sysreg!(cntkctl_el1, el1.cntkctl);
    write_sysreg!(cntv_ctl_el0, el1.cntv_ctl);
    write_sysreg!(cntv_cval_el0, el1.cntv_cval);
    write_sysreg!(cntp_ctl_el0, el1.cntp_ctl);
    write_sysreg!(cntp_cval_el0, el1.cntp_cval);
    write_sysreg!(mdscr_el1, el1.mdscr);
    write_sysreg!(mdccint_el1, el1.mdccint);
}

fn save_el1_state(el1: &mut El1SysRegs) {
    el1.sctlr = read_sysreg!(sctlr_el1);
    el1.actlr = read_sysreg!(actlr_el1);
    el1.cpacr = read_sysreg!(cpacr_el1);
    el1.csselr = read_sysreg!(csselr_el1);
    el1.sp_el0 = read_sysreg!(sp_el0);
    el1.sp_el1 = read_sysreg!(sp_el1);
    el1.esr = read_sysreg!(esr_el1);
    el1.ttbr0 = read_sysreg!(ttbr0_el1);
    el1.ttbr1 = read_sysreg!(ttbr1_el1);
    el1.mair = read_sysreg!(mair_el1);
    el1.amair = read_sysreg!(amair_el1);
    el1.tcr = read_sysreg!(tcr_el1);
    el1.tpidr_el0 = read_sysreg!(tpidr_el0);
    el1.tpidrro_el0 = read_sysreg!(tpidrro_el0);
    el1.tpidr_el1 = read_sysreg!(tpidr_el1);
    el1.par = read_sysreg!(par_el1);
    el1.far = read_sysreg!(far_el1);
    el1.afsr0 = read_sysreg!(afsr0_el1);
    el1.afsr1 = read_sysreg!(afsr1_el1);
    el1.spsr = read_sysreg!(spsr_el1);
    el1.elr = read_sysreg!(elr_el1);
    el1.vbar = read_sysreg!(vbar_el1);
    el1.contextidr = read_sysreg!(contextidr_el1);
    el1.cntkctl = read_sysreg!(cntkctl_el1);
    el1.cntv_ctl = read_sysreg!(cntv_ctl_el0);
    el1.cntv_cval = read_sysreg!(cntv_cval_el0);
    el1.cntp_ctl = read_sysreg!(cntp_ctl_el0);
    el1.cntp_cval = read_sysreg!(cntp_cval_el0);
    el1.mdscr = read_sysreg!(mdscr_el1);
    el1.mdccint = read_sysreg!(mdccint_el1);
}

fn vtr_lr_count() -> usize {
    (read_sysreg!(ich_vtr_el2) as usize & 0xf) + 1
}

fn vgic_restore(cpu_if: &VgicCpuIf) {
    write_sysreg!(ich_hcr_el2, cpu_if.hcr);
    write_sysreg!(ich_vmcr_el2, cpu_if.vmcr);
    for i in 0..vtr_lr_count() {
        write_ich_lr(i, cpu_if.lr[i]);
    }
}

fn vgic_save(cpu_if: &mut VgicCpuIf) {
    cpu_if.hcr = read_sysreg!(ich_hcr_el2);
    cpu_if.vmcr = read_sysreg!(ich_vmcr_el2);
    for i in 0..vtr_lr_count() {
        cpu_if.lr[i] = read_ich_lr(i);
    }
}

fn read_ich_lr(index: usize) -> u64 {
    match index {
        0 => read_sysreg!(ich_lr0_el2),
        1 => read_sysreg!(ich_lr1_el2),
        2 => read_sysreg!(ich_lr2_el2),
        3 => read_sysreg!(ich_lr3_el2),
        4 => read_sysreg!(ich_lr4_el2),
        5 => read_sysreg!(ich_lr5_el2),
        6 => read_sysreg!(ich_lr6_el2),
        7 => read_sysreg!(ich_lr7_el2),
        8 => read_sysreg!(ich_lr8_el2),
        9 => read_sysreg!(ich_lr9_el2),
        10 => read_sysreg!(ich_lr10_el2),
        11 => read_sysreg!(ich_lr11_el2),
        12 => read_sysreg!(ich_lr12_el2),
        13 => read_sysreg!(ich_lr13_el2),
        14 => read_sysreg!(ich_lr14_el2),
        _ => read_sysreg!(ich_lr15_el2),
    }
}

fn write_ich_lr(index: usize, value: u64) {
    match index {
        0 => write_sysreg!(ich_lr0_el2, value),
        1 => write_sysreg!(ich_lr1_el2, value),
        2 => write_sysreg!(ich_lr2_el2, value),
        3 => write_sysreg!(ich_lr3_el2, value),
        4 => write_sysreg!(ich_lr4_el2, value),
        5 => write_sysreg!(ich_lr5_el2, value),
        6 => write_sysreg!(ich_lr6_el2, value),
        7 => write_sysreg!(ich_lr7_el2, value),
        8 => write_sysreg!(ich_lr8_el2, value),
        9 => write_sysreg!(ich_lr9_el2, value),
        10 => write_sysreg!(ich_lr10_el2, value),
        11 => write_sysreg!(ich_lr11_el2, value),
        12 => write_sysreg!(ich_lr12_el2, value),
        13 => write_sysreg!(ich_lr13_el2, value),
        14 => write_sysreg!(ich_lr14_el2, value),
        _ => write_sysreg!(ich_lr15_el2, value),
    }
}
