/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! Stand-ins for driving the state machine on a development host.
//!
//! TLB and cache maintenance have no observable effect on a host address
//! space and degrade to nothing; the guarded copy cannot take a real
//! cross-PAS fault, so fault injection happens one layer up, in the
//! test platform's NS window translation.

/// Copy with data-abort recovery. The host build cannot fault.
///
/// # Safety
///
/// `dst` and `src` must be valid for `n` bytes and not overlap.
pub unsafe fn guarded_ns_copy(dst: *mut u8, src: *const u8, n: usize, _core: usize) -> bool {
    core::ptr::copy_nonoverlapping(src, dst, n);
    true
}

/// Stage-2 TLB invalidation by IPA.
pub fn tlbi_ipas2e1is(_ipa: u64) {}

/// Clean the data cache over a physical range.
pub fn clean_dcache_range(_addr: u64, _size: u64) {}

/// Instruction synchronization barrier.
pub fn isb() {}

/// EL2 physical timer control.
pub fn read_cnthp_ctl_el2() -> u64 {
    0
}

/// See [`read_cnthp_ctl_el2`].
pub fn write_cnthp_ctl_el2(_value: u64) {}

/// Silence the EL0 virtual and physical timers after a realm exit.
pub fn disable_el0_timers() {}

/// Maintenance interrupt state of the virtual GIC.
pub fn read_ich_misr_el2() -> u64 {
    0
}
