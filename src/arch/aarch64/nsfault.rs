/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! The per-core trap landing pad behind the guarded NS copy.
//!
//! Before touching NS memory a core records a recovery point. If the
//! access takes a data abort, the EL2 sync vector lands in
//! [`rmm_el2_sync_handler`], which unwinds straight back into the copy
//! primitive with a failure return. The slot is single use: it is armed
//! immediately before the copy and disarmed on either outcome, and one
//! copy may be in flight per core.

use {
    super::read_sysreg,
    crate::platform::MAX_CORES,
    core::{
        cell::UnsafeCell,
        sync::atomic::{AtomicBool, Ordering},
    },
};

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

/// Callee-saved register file captured by `ns_copy_set_point`:
/// x19..x28, x29, x30, sp.
#[repr(C, align(16))]
struct RecoveryPoint {
    regs: [u64; 14],
}

struct LandingPad {
    armed: AtomicBool,
    point: UnsafeCell<RecoveryPoint>,
}

// One slot per core; a core only ever touches its own slot.
unsafe impl Sync for LandingPad {}

impl LandingPad {
    const fn new() -> Self {
        Self {
            armed: AtomicBool::new(false),
            point: UnsafeCell::new(RecoveryPoint { regs: [0; 14] }),
        }
    }
}

static LANDING_PADS: [LandingPad; MAX_CORES] = {
    const PAD: LandingPad = LandingPad::new();
    [PAD; MAX_CORES]
};

extern "C" {
    fn ns_copy_set_point(point: *mut RecoveryPoint) -> u64;
    fn ns_copy_resume(point: *const RecoveryPoint) -> !;
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Copy `n` bytes with data-abort recovery. Returns `false` if the
/// access faulted; the destination may then be partially written.
///
/// # Safety
///
/// `dst` must be valid monitor memory for `n` bytes. `src` may be
/// anything; that is the point.
pub unsafe fn guarded_ns_copy(dst: *mut u8, src: *const u8, n: usize, core: usize) -> bool {
    let pad = &LANDING_PADS[core];
    debug_assert!(!pad.armed.load(Ordering::Relaxed));

    if ns_copy_set_point(pad.point.get()) != 0 {
        // Unwound here from the abort handler.
        return false;
    }
    pad.armed.store(true, Ordering::Relaxed);

    core::ptr::copy_nonoverlapping(src, dst, n);

    pad.armed.store(false, Ordering::Relaxed);
    true
}

/// EL2 same-level synchronous exception entry. Resumes an armed NS copy;
/// anything else is fatal.
#[no_mangle]
extern "C" fn rmm_el2_sync_handler() -> ! {
    let core = super::core_id();
    let pad = &LANDING_PADS[core];

    if pad.armed.swap(false, Ordering::Relaxed) {
        crate::info!(
            "NS access fault: esr {:#x} far {:#x}",
            read_sysreg!(esr_el2),
            read_sysreg!(far_el2)
        );
        // SAFETY: the slot was armed, so the recovery point was recorded
        // by the guarded copy currently on this core's stack.
        unsafe { ns_copy_resume(pad.point.get()) }
    }

    panic!(
        "unrecoverable EL2 exception: esr {:#x} far {:#x}",
        read_sysreg!(esr_el2),
        read_sysreg!(far_el2)
    );
}

/// Vector entries that must never fire.
#[no_mangle]
extern "C" fn rmm_unexpected_exception() -> ! {
    panic!("unexpected exception: esr {:#x}", read_sysreg!(esr_el2));
}
