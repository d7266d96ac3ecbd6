/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! The realm execution context.
//!
//! One REC per realm vCPU, overlaid on a granule in `Rec` state. The GPR
//! file must stay the first field: the world-switch trampoline indexes
//! the REC from its base address.

use {
    crate::{granule::GRANULE_SIZE, realm::vgic::VgicCpuIf},
    static_assertions::const_assert,
};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Number of general purpose registers kept per REC.
pub const GPR_COUNT: usize = 32;

/// Number of GPRs REC_CREATE seeds from host parameters.
pub const PARAM_GPR_COUNT: usize = 8;

/// Why the next entry into this REC happens; decides how much host
/// input is folded back into register state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum EnterReason {
    FirstRun = 0,
    Irq = 1,
    Fiq = 2,
    El1Serror = 3,
    Trap = 4,
}

/// EL1 system register bundle, saved/restored architecturally around
/// every realm excursion. Named fields rather than an opaque array so
/// the exit path can expose the timer state.
#[derive(Debug, Clone, Copy, Default)]
#[repr(C)]
pub struct El1SysRegs {
    pub sctlr: u64,
    pub actlr: u64,
    pub cpacr: u64,
    pub csselr: u64,
    pub sp_el0: u64,
    pub sp_el1: u64,
    pub esr: u64,
    pub ttbr0: u64,
    pub ttbr1: u64,
    pub mair: u64,
    pub amair: u64,
    pub tcr: u64,
    pub tpidr_el0: u64,
    pub tpidrro_el0: u64,
    pub tpidr_el1: u64,
    pub par: u64,
    pub far: u64,
    pub afsr0: u64,
    pub afsr1: u64,
    pub spsr: u64,
    pub elr: u64,
    pub vbar: u64,
    pub contextidr: u64,
    pub cntkctl: u64,
    pub cntv_ctl: u64,
    pub cntv_cval: u64,
    pub cntp_ctl: u64,
    pub cntp_cval: u64,
    pub mdscr: u64,
    pub mdccint: u64,
}

/// Everything the monitor stages into EL2 before an entry and captures
/// after an exit.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct SysRegs {
    pub el1: El1SysRegs,
    /// In on entry.
    pub hcr_el2: u64,
    /// In on entry, refreshed on exit.
    pub spsr_el2: u64,
    /// In on entry.
    pub vtcr_el2: u64,
    /// In on entry.
    pub vttbr_el2: u64,
    /// In on entry.
    pub vmpidr_el2: u64,
    /// Captured on exit.
    pub esr_el2: u64,
    /// Captured on exit.
    pub far_el2: u64,
    /// Captured on exit.
    pub hpfar_el2: u64,
    pub cpu_if: VgicCpuIf,
}

/// The per-vCPU record. GPRs first; see the module comment.
#[repr(C)]
pub struct Rec {
    pub gprs: [u64; GPR_COUNT],
    pub sysregs: SysRegs,
    /// Physical address of the owning RD granule. Re-validated through
    /// the ledger on every use; never a live reference.
    pub owner_rd: u64,
    pub dispose_base: u64,
    pub dispose_size: u64,
    pub pc: u64,
    pub aux: [u64; 16],
    pub enter_reason: EnterReason,
    pub psci_complete_result: u64,
    pub runnable: bool,
    pub emulatable_abort: bool,
    pub psci_pending: bool,
    pub state_running: bool,
}

const_assert!(core::mem::size_of::<Rec>() <= GRANULE_SIZE);

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl SysRegs {
    pub const fn zeroed() -> Self {
        Self {
            el1: El1SysRegs {
                sctlr: 0,
                actlr: 0,
                cpacr: 0,
                csselr: 0,
                sp_el0: 0,
                sp_el1: 0,
                esr: 0,
                ttbr0: 0,
                ttbr1: 0,
                mair: 0,
                amair: 0,
                tcr: 0,
                tpidr_el0: 0,
                tpidrro_el0: 0,
                tpidr_el1: 0,
                par: 0,
                far: 0,
                afsr0: 0,
                afsr1: 0,
                spsr: 0,
                elr: 0,
                vbar: 0,
                contextidr: 0,
                cntkctl: 0,
                cntv_ctl: 0,
                cntv_cval: 0,
                cntp_ctl: 0,
                cntp_cval: 0,
                mdscr: 0,
                mdccint: 0,
            },
            hcr_el2: 0,
            spsr_el2: 0,
            vtcr_el2: 0,
            vttbr_el2: 0,
            vmpidr_el2: 0,
            esr_el2: 0,
            far_el2: 0,
            hpfar_el2: 0,
            cpu_if: VgicCpuIf::zeroed(),
        }
    }
}

/// Fold an mpidr parameter into the dense REC index used for creation
/// ordering: aff3 at [27:20], aff2:aff1 at [19:4], aff0's low nibble at
/// [3:0].
pub fn mpidr_to_rec_index(mpidr: u64) -> u64 {
    let aff3 = (mpidr >> 12) & 0x0ff0_0000;
    let aff12 = (mpidr >> 4) & 0x000f_fff0;
    let aff0 = mpidr & 0xf;
    aff3 | aff12 | aff0
}

/// Compose the VMPIDR_EL2 image from a creation mpidr: single-threaded,
/// uniprocessor bit clear, RES1 bit 31.
pub fn mpidr_to_vmpidr(mpidr: u64) -> u64 {
    const RES1: u64 = 1 << 31;
    let aff3 = (mpidr >> 32) & 0xff;
    let aff012 = mpidr & 0x00ff_ffff;
    (aff3 << 32) | aff012 | RES1
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
