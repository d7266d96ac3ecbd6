/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! EL2 and EL1 register images composed at REC creation.
//!
//! These are values the world switch later writes into the hardware,
//! not live registers, so they are built with in-memory bitfields.

use tock_registers::{fields::FieldValue, register_bitfields};

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

register_bitfields! {
    u64,
    /// Hypervisor configuration as staged for realm execution.
    HCR_EL2 [
        /// Stage-2 forwarded write-back combining.
        FWB OFFSET(46) NUMBITS(1) [],
        /// EL1 is AArch64.
        RW OFFSET(31) NUMBITS(1) [],
        /// Trap SMC to EL2.
        TSC OFFSET(19) NUMBITS(1) [],
        /// Trap WFE.
        TWE OFFSET(14) NUMBITS(1) [],
        /// Trap WFI.
        TWI OFFSET(13) NUMBITS(1) [],
        /// Barrier shareability upgrade.
        BSU OFFSET(10) NUMBITS(2) [
            InnerShareable = 0b01
        ],
        /// Force broadcast of TLB maintenance.
        FB OFFSET(9) NUMBITS(1) [],
        /// Route SError to EL2.
        AMO OFFSET(5) NUMBITS(1) [],
        /// Route IRQ to EL2.
        IMO OFFSET(4) NUMBITS(1) [],
        /// Route FIQ to EL2.
        FMO OFFSET(3) NUMBITS(1) [],
        /// Stage-1 walks are subject to stage 2.
        PTW OFFSET(2) NUMBITS(1) [],
        /// Set/way cache ops trap.
        SWIO OFFSET(1) NUMBITS(1) [],
        /// Stage-2 translation enable.
        VM OFFSET(0) NUMBITS(1) []
    ]
}

register_bitfields! {
    u64,
    /// Stage-2 translation control as staged for realm execution.
    VTCR_EL2 [
        RES1 OFFSET(31) NUMBITS(1) [],
        /// Physical address size of the translation output.
        PS OFFSET(16) NUMBITS(3) [
            Bits32 = 0b000
        ],
        /// Granule size: 4 KiB.
        TG0 OFFSET(14) NUMBITS(2) [
            KiB4 = 0b00
        ],
        SH0 OFFSET(12) NUMBITS(2) [
            InnerShareable = 0b11
        ],
        ORGN0 OFFSET(10) NUMBITS(2) [
            WriteBackAllocate = 0b01
        ],
        IRGN0 OFFSET(8) NUMBITS(2) [
            WriteBackAllocate = 0b01
        ],
        /// Starting lookup level, 4 KiB granule encoding.
        SL0 OFFSET(6) NUMBITS(2) [],
        /// 64 minus the IPA width.
        T0SZ OFFSET(0) NUMBITS(6) []
    ]
}

/// SCTLR_EL1 image a realm vCPU boots with: alignment checking for SP,
/// WFI/WFE untrapped at EL0, exceptions context-synchronising.
const SCTLR_EL1_RESET: u64 = (1 << 3)  // SA
    | (1 << 4)   // SA0
    | (1 << 5)   // CP15BEN
    | (1 << 6)   // nAA
    | (1 << 16)  // nTWI
    | (1 << 18)  // nTWE
    | (1 << 22)  // EIS
    | (1 << 23); // SPAN

/// SPSR_EL2 image for first entry: EL1h, all of DAIF masked.
const SPSR_EL2_RESET: u64 = 0x3c5;

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// EL1 system control image for a fresh REC.
pub const fn sctlr_reset() -> u64 {
    SCTLR_EL1_RESET
}

/// Saved program status a fresh REC enters with.
pub const fn spsr_reset() -> u64 {
    SPSR_EL2_RESET
}

/// Hypervisor control image under which every realm runs: stage-2 on,
/// interrupts and SMC trapped to the monitor, EL1 in AArch64.
pub fn hcr_image() -> u64 {
    let image: FieldValue<u64, HCR_EL2::Register> = HCR_EL2::VM::SET
        + HCR_EL2::SWIO::SET
        + HCR_EL2::PTW::SET
        + HCR_EL2::FMO::SET
        + HCR_EL2::IMO::SET
        + HCR_EL2::AMO::SET
        + HCR_EL2::FB::SET
        + HCR_EL2::BSU::InnerShareable
        + HCR_EL2::TWI::SET
        + HCR_EL2::TWE::SET
        + HCR_EL2::TSC::SET
        + HCR_EL2::RW::SET
        + HCR_EL2::FWB::SET;
    image.value
}

/// Stage-2 control image for a realm with the given geometry.
pub fn vtcr_image(ipa_width: u64, rtt_level_start: u64) -> u64 {
    // SL0 encoding for the 4 KiB granule: 0b10 level 0, 0b01 level 1,
    // 0b00 level 2, 0b11 level 3 (FEAT_TTST).
    let sl0 = match rtt_level_start {
        0 => 0b10,
        1 => 0b01,
        2 => 0b00,
        _ => 0b11,
    };
    let image: FieldValue<u64, VTCR_EL2::Register> = VTCR_EL2::RES1::SET
        + VTCR_EL2::PS::Bits32
        + VTCR_EL2::TG0::KiB4
        + VTCR_EL2::SH0::InnerShareable
        + VTCR_EL2::ORGN0::WriteBackAllocate
        + VTCR_EL2::IRGN0::WriteBackAllocate
        + VTCR_EL2::SL0.val(sl0)
        + VTCR_EL2::T0SZ.val(64 - ipa_width);
    image.value
}

/// Stage-2 base register image: root table set, tagged with the VMID.
pub fn vttbr_image(rtt_base: u64, vmid: u64) -> u64 {
    rtt_base | (vmid << 48)
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hcr_traps_what_the_monitor_needs() {
        let hcr = hcr_image();
        assert_ne!(hcr & 1, 0, "stage 2 must be on");
        assert_ne!(hcr & (1 << 19), 0, "SMC must trap");
        assert_ne!(hcr & (1 << 31), 0, "EL1 must be AArch64");
        assert_ne!(hcr & (1 << 46), 0, "FWB expected");
    }

    #[test]
    fn vtcr_encodes_geometry() {
        let vtcr = vtcr_image(32, 1);
        assert_eq!(vtcr & 0x3f, 32); // T0SZ = 64 - 32
        assert_eq!((vtcr >> 6) & 0b11, 0b01); // SL0 for level 1
        assert_ne!(vtcr & (1 << 31), 0); // RES1

        assert_eq!((vtcr_image(30, 2) >> 6) & 0b11, 0b00);
    }

    #[test]
    fn vttbr_tags_with_vmid() {
        let v = vttbr_image(0x8_0000, 5);
        assert_eq!(v & 0xffff_ffff_ffff, 0x8_0000);
        assert_eq!(v >> 48, 5);
    }
}
