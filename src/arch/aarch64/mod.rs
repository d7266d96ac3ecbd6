/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! AArch64 EL2 support: maintenance operations, the firmware SMC
//! conduit and the realm world switch.

pub mod entry;
pub mod nsfault;

pub use nsfault::guarded_ns_copy;

use aarch64_cpu::{asm::barrier, registers::*};

core::arch::global_asm!(include_str!("entry.S"));

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

/// PARange field encodings of ID_AA64MMFR0_EL1, in bits.
const PA_RANGE_BITS: [u64; 7] = [32, 36, 40, 42, 44, 48, 52];

/// Read a system register by name.
macro_rules! read_sysreg {
    ($reg:tt) => {{
        let value: u64;
        unsafe {
            core::arch::asm!(
                concat!("mrs {value}, ", stringify!($reg)),
                value = out(reg) value,
                options(nomem, nostack)
            );
        }
        value
    }};
}

/// Write a system register by name.
macro_rules! write_sysreg {
    ($reg:tt, $value:expr) => {{
        let v: u64 = $value;
        unsafe {
            core::arch::asm!(
                concat!("msr ", stringify!($reg), ", {v}"),
                v = in(reg) v,
                options(nomem, nostack)
            );
        }
    }};
}

pub(crate) use {read_sysreg, write_sysreg};

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Instruction synchronization barrier.
#[inline(always)]
pub fn isb() {
    barrier::isb(barrier::SY);
}

/// Invalidate stage-2 TLB entries for `ipa`, last level only, inner
/// shareable. Follows every RTTE change that affects validity.
#[inline(always)]
pub fn tlbi_ipas2e1is(ipa: u64) {
    let arg = (ipa >> 12) & 0x0fff_ffff_ffff;
    unsafe {
        core::arch::asm!(
            "dsb ishst",
            "tlbi ipas2le1is, {arg}",
            "dsb ish",
            arg = in(reg) arg,
            options(nostack)
        );
    }
}

/// Clean the data cache over `[addr, addr + size)` to the point of
/// coherency, so freshly populated DATA granules are visible to the
/// realm's first non-cacheable fetch.
pub fn clean_dcache_range(addr: u64, size: u64) {
    const LINE: u64 = 64;
    let mut line = addr & !(LINE - 1);
    while line < addr + size {
        unsafe {
            core::arch::asm!("dc cvac, {line}", line = in(reg) line, options(nostack));
        }
        line += LINE;
    }
    unsafe {
        core::arch::asm!("dsb ish", options(nostack));
    }
}

/// EL2 physical timer control; the host's timer is parked while a realm
/// runs.
pub fn read_cnthp_ctl_el2() -> u64 {
    CNTHP_CTL_EL2.get()
}

/// See [`read_cnthp_ctl_el2`].
pub fn write_cnthp_ctl_el2(value: u64) {
    CNTHP_CTL_EL2.set(value);
}

/// Silence the EL0 virtual and physical timers after a realm exit. Their
/// state was already captured into the exit block.
pub fn disable_el0_timers() {
    CNTV_CTL_EL0.set(0);
    CNTP_CTL_EL0.set(0);
}

/// Maintenance interrupt state of the virtual GIC.
pub fn read_ich_misr_el2() -> u64 {
    read_sysreg!(ich_misr_el2)
}

/// Install the monitor's EL2 vector table. Must run on every core before
/// the first realm entry or NS copy.
///
/// # Safety
///
/// Changes the HW state of the executing core.
pub unsafe fn install_vectors() {
    extern "C" {
        static __REALM_VECTORS: core::cell::UnsafeCell<()>;
    }
    VBAR_EL2.set(__REALM_VECTORS.get() as u64);
    barrier::isb(barrier::SY);
}

/// Raw SMC into the firmware, x0..x7 in, x0 out. The firmware may
/// clobber the whole argument file.
pub fn smc_call(mut x0: u64, x1: u64, x2: u64) -> u64 {
    unsafe {
        core::arch::asm!(
            "smc #0",
            inout("x0") x0,
            inout("x1") x1 => _,
            inout("x2") x2 => _,
            inout("x3") 0u64 => _,
            inout("x4") 0u64 => _,
            inout("x5") 0u64 => _,
            inout("x6") 0u64 => _,
            inout("x7") 0u64 => _,
            options(nostack)
        );
    }
    x0
}

/// The production firmware conduit.
pub struct FirmwareConduit;

impl crate::platform::interface::SecureMonitor for FirmwareConduit {
    fn delegate(&self, addr: u64) -> u64 {
        smc_call(crate::platform::GTSI_DELEGATE, addr, 0)
    }

    fn undelegate(&self, addr: u64) -> u64 {
        smc_call(crate::platform::GTSI_UNDELEGATE, addr, 0)
    }

    fn psci_version(&self) -> u64 {
        smc_call(crate::psci::PSCI_VERSION, 0, 0)
    }

    fn psci_features(&self, fid: u64) -> u64 {
        smc_call(crate::psci::PSCI_FEATURES, fid, 0)
    }
}

/// Decode the platform PA range from ID_AA64MMFR0_EL1.
pub fn pa_range() -> u64 {
    let parange = read_sysreg!(id_aa64mmfr0_el1) & 0xf;
    PA_RANGE_BITS[(parange as usize).min(PA_RANGE_BITS.len() - 1)]
}

/// Linear id of the calling core from MPIDR affinity 0.
pub fn core_id() -> usize {
    (MPIDR_EL1.get() & 0xff) as usize
}

/// Offset at which non-secure DRAM is aliased into the monitor's
/// translation regime.
pub const NS_WINDOW_OFFSET: u64 = 0x1_0000_0000;

/// The production platform seam.
pub struct MachinePlatform;

impl crate::platform::interface::Platform for MachinePlatform {
    fn core_id(&self) -> usize {
        core_id()
    }

    fn ns_window(&self, addr: u64) -> Option<u64> {
        // Faults from a bad host address are caught by the landing pad,
        // so the translation itself is total.
        Some(addr + NS_WINDOW_OFFSET)
    }

    fn pa_range(&self) -> u64 {
        pa_range()
    }
}
