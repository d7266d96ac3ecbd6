/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! Host-shared RMI parameter and run buffers.
//!
//! These layouts are ABI with the non-secure hypervisor; every field is
//! a 64-bit word and the structs carry no padding, which the size
//! asserts pin down. They are only ever moved across the PAS boundary
//! by the guarded copy in [`crate::nsmem`].

use {crate::realm::vgic::LR_COUNT, bitflags::bitflags, static_assertions::const_assert_eq};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Parameter block of REALM_CREATE.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct RealmParams {
    pub par_base: u64,
    pub par_size: u64,
    pub rtt_base: u64,
    /// Accepted and ignored; measurement is out of the monitor's scope.
    pub measurement_algo: u64,
    /// Bits [7:0]: requested IPA width. Bit 8: LPA2, refused.
    pub features_0: u64,
    pub rtt_level_start: i64,
    pub rtt_num_start: u32,
    /// Ignored: the monitor owns VMID assignment.
    pub vmid: u32,
}

const_assert_eq!(core::mem::size_of::<RealmParams>(), 56);

bitflags! {
    /// Flag word of REC_CREATE parameters.
    pub struct RecParamsFlags: u64 {
        const RUNNABLE = 1 << 0;
    }
}

/// Parameter block of REC_CREATE.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct RecParams {
    pub gprs: [u64; 8],
    pub pc: u64,
    pub flags: u64,
    pub aux: [u64; 16],
}

const_assert_eq!(core::mem::size_of::<RecParams>(), 208);

/// Host → realm half of the run buffer, read on every REC_ENTER.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct RecEntry {
    pub gprs: [u64; 7],
    pub is_emulated_mmio: u64,
    pub emulated_read_value: u64,
    pub dispose_response: u64,
    pub gicv3_lrs: [u64; LR_COUNT],
    pub gicv3_hcr: u64,
}

const_assert_eq!(core::mem::size_of::<RecEntry>(), 216);

/// Exit reasons reported through [`RecExit::reason`].
pub mod exit_reason {
    pub const SYNC: u64 = 0;
    pub const IRQ: u64 = 1;
    pub const FIQ: u64 = 2;
    pub const PSCI: u64 = 3;
    pub const DISPOSE: u64 = 4;
}

/// Realm → host half of the run buffer, written after every exit.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct RecExit {
    pub reason: u64,
    pub esr: u64,
    pub far: u64,
    pub hpfar: u64,
    pub emulated_write_value: u64,
    pub gprs: [u64; 7],
    pub dispose_base: u64,
    pub dispose_size: u64,
    pub gicv3_vmcr: u64,
    pub gicv3_misr: u64,
    pub cntv_ctl: u64,
    pub cntv_cval: u64,
    pub cntp_ctl: u64,
    pub cntp_cval: u64,
    pub gicv3_lrs: [u64; LR_COUNT],
    pub gicv3_hcr: u64,
}

const_assert_eq!(core::mem::size_of::<RecExit>(), 296);

impl RecExit {
    pub const fn zeroed() -> Self {
        Self {
            reason: 0,
            esr: 0,
            far: 0,
            hpfar: 0,
            emulated_write_value: 0,
            gprs: [0; 7],
            dispose_base: 0,
            dispose_size: 0,
            gicv3_vmcr: 0,
            gicv3_misr: 0,
            cntv_ctl: 0,
            cntv_cval: 0,
            cntp_ctl: 0,
            cntp_cval: 0,
            gicv3_lrs: [0; LR_COUNT],
            gicv3_hcr: 0,
        }
    }
}

/// Offset of the exit half inside the host's `rec_run` granule.
pub const REC_RUN_EXIT_OFFSET: u64 = core::mem::size_of::<RecEntry>() as u64;
