/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! Stage-2 translation table walking and editing.
//!
//! A realm's RTT is a tree of granules holding 512 descriptors each.
//! Handlers never touch raw descriptor bits: a walk yields a
//! [`WalkResult`] whose state projection collapses the architectural
//! encoding plus the monitor-private "destroyed" mark into the closed
//! [`RtteState`] set, and whose mutators each write exactly one of those
//! states with a single 64-bit store.

use {
    crate::{
        error::Error,
        granule::{is_level_aligned, GRANULE_SIZE},
        realm::rd::Rd,
    },
    tock_registers::{
        fields::FieldValue, interfaces::Readable, register_bitfields, LocalRegisterCopy,
    },
};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Level whose entries map 2 MiB blocks.
pub const RTT_BLOCK_LEVEL: usize = 2;

/// The deepest level; entries map 4 KiB pages.
pub const RTT_PAGE_LEVEL: usize = 3;

/// Descriptors per RTT granule.
pub const RTTES_PER_RTT: usize = GRANULE_SIZE / 8;

register_bitfields! {
    u64,
    /// Stage-2 descriptor as this monitor writes it: 48-bit OA, plus the
    /// private DESTROYED mark in an ignored bit.
    STAGE2_DESCRIPTOR [
        /// Monitor-private: this IPA range was mapped once and destroyed;
        /// further population is forbidden until DISPOSE.
        DESTROYED OFFSET(56) NUMBITS(1) [],

        /// Output address targets non-secure PAS.
        NS OFFSET(55) NUMBITS(1) [],

        /// Output address, bits [47:12].
        OA OFFSET(12) NUMBITS(36) [],

        /// Access flag.
        AF OFFSET(10) NUMBITS(1) [],

        /// Shareability.
        SH OFFSET(8) NUMBITS(2) [
            NonShareable = 0b00,
            OuterShareable = 0b10,
            InnerShareable = 0b11
        ],

        /// Stage-2 access permissions.
        S2AP OFFSET(6) NUMBITS(2) [
            None = 0b00,
            ReadOnly = 0b01,
            WriteOnly = 0b10,
            ReadWrite = 0b11
        ],

        /// Memory attributes (FWB encoding).
        MEMATTR OFFSET(2) NUMBITS(4) [],

        /// Descriptor type at non-leaf levels; the page tag at level 3.
        TYPE OFFSET(1) NUMBITS(1) [
            Block = 0,
            Table = 1
        ],

        VALID OFFSET(0) NUMBITS(1) []
    ]
}

/// Output address field as a raw mask.
pub const OA_MASK: u64 = 0x0000_ffff_ffff_f000;

/// Attribute bits the host is allowed to supply for an unprotected
/// mapping: MemAttr[5:2], S2AP[7:6], SH[9:8], plus the OA field.
const HOST_NS_MASK: u64 = OA_MASK | 0x3fc;

/// State of one RTT entry at a given level.
///
/// Discriminants are ABI: RTT_READ_ENTRY reports them numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum RtteState {
    /// Backed by a DATA granule but not yet valid.
    Assigned = 0,
    /// Formerly mapped; population forbidden until DISPOSE.
    Destroyed = 1,
    /// Points at a child RTT.
    Table = 2,
    /// Nothing behind this IPA range.
    Unassigned = 3,
    /// Backed and live.
    Valid = 4,
    /// Maps host-supplied non-secure memory.
    ValidNs = 5,
}

/// Outcome of a walk: the RTT granule reached, the slot within it and
/// the level it sits at. Only valid while the monitor lock is held.
pub struct WalkResult {
    /// Address of the RTT granule holding the entry.
    pub rtt_addr: u64,
    slot: *mut u64,
    /// Level the walk stopped at.
    pub level: usize,
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// How many address bits one RTT *granule* spans at `level`: a level-3
/// table covers 21 bits (2 MiB), a level-2 table 30 bits (1 GiB).
pub const fn level_width(level: usize) -> usize {
    12 + 9 * (4 - level)
}

/// Project a raw descriptor into the closed state set.
pub fn classify(desc: u64, level: usize) -> RtteState {
    let d = LocalRegisterCopy::<u64, STAGE2_DESCRIPTOR::Register>::new(desc);
    let out_addr = desc & OA_MASK;

    if d.is_set(STAGE2_DESCRIPTOR::VALID) {
        if out_addr == 0 {
            crate::warn!("valid descriptor without OA: {:#x} level {}", desc, level);
            return RtteState::Unassigned;
        }
        if d.is_set(STAGE2_DESCRIPTOR::TYPE) && level != RTT_PAGE_LEVEL {
            return RtteState::Table;
        }
        if level == RTT_BLOCK_LEVEL || level == RTT_PAGE_LEVEL {
            return if d.is_set(STAGE2_DESCRIPTOR::NS) {
                RtteState::ValidNs
            } else {
                RtteState::Valid
            };
        }
        crate::warn!("block descriptor above block level: {:#x} level {}", desc, level);
        RtteState::Unassigned
    } else {
        if out_addr != 0 {
            return RtteState::Assigned;
        }
        if d.is_set(STAGE2_DESCRIPTOR::DESTROYED) {
            RtteState::Destroyed
        } else {
            RtteState::Unassigned
        }
    }
}

impl WalkResult {
    /// Raw descriptor at the slot.
    pub fn raw(&self) -> u64 {
        // SAFETY: slot points into an RTT granule owned by the walked
        // realm; the monitor lock serialises all access.
        unsafe { self.slot.read_volatile() }
    }

    fn write(&mut self, desc: u64) {
        // SAFETY: as for raw(); a single 64-bit store keeps concurrent
        // hardware walks consistent.
        unsafe { self.slot.write_volatile(desc) }
    }

    /// State of the entry at the level the walk stopped at.
    pub fn state(&self) -> RtteState {
        classify(self.raw(), self.level)
    }

    /// Output address field.
    pub fn out_addr(&self) -> u64 {
        self.raw() & OA_MASK
    }

    /// Write a page or block entry for `out_addr`. Used on ASSIGNED
    /// creation (`valid == false`) and NS unmap teardown.
    pub fn set(&mut self, out_addr: u64, valid: bool) {
        let attrs: FieldValue<u64, STAGE2_DESCRIPTOR::Register> = STAGE2_DESCRIPTOR::AF::SET
            + STAGE2_DESCRIPTOR::SH::InnerShareable
            + STAGE2_DESCRIPTOR::S2AP::ReadWrite
            + STAGE2_DESCRIPTOR::MEMATTR.val(0b0110)
            + STAGE2_DESCRIPTOR::OA.val(out_addr >> 12)
            + STAGE2_DESCRIPTOR::TYPE.val((self.level == RTT_PAGE_LEVEL) as u64)
            + STAGE2_DESCRIPTOR::VALID.val(valid as u64);
        self.write(attrs.value);
    }

    /// Point this entry at a child RTT granule.
    pub fn set_table(&mut self, child_rtt: u64) {
        self.write((child_rtt & OA_MASK) | 0b11);
    }

    /// Flip only the valid bit, for MAP/UNMAP_PROTECTED.
    pub fn set_valid(&mut self, valid: bool) {
        let desc = self.raw();
        self.write(if valid { desc | 1 } else { desc & !1 });
    }

    /// Leave only the destroyed mark, for DATA_DESTROY.
    pub fn set_destroyed(&mut self) {
        self.write(STAGE2_DESCRIPTOR::DESTROYED::SET.value);
    }

    /// Build an unprotected mapping from a host-supplied template,
    /// keeping only the attribute bits the host may choose.
    pub fn set_ns(&mut self, ns_rtte: u64) {
        let desc = STAGE2_DESCRIPTOR::VALID::SET + STAGE2_DESCRIPTOR::NS::SET;
        self.write(desc.value | (ns_rtte & HOST_NS_MASK));
    }
}

/// Walk `rd`'s RTT towards `addr`, stopping at `target_level` or at the
/// first non-TABLE entry.
///
/// Callers must have bounded `addr` by the realm's IPA width and
/// `target_level` by `rtt_level_start..=3`; the root index is then
/// inside the starting table set by construction.
pub fn walk(rd: &Rd, addr: u64, target_level: usize) -> Result<WalkResult, Error> {
    let mut level = rd.rtt_level_start as usize;
    let root_index = addr >> level_width(level);
    debug_assert!(root_index < rd.rtt_num_start);
    let mut rtt_addr = rd.rtt_base + (root_index << 12);

    loop {
        let index = (addr >> level_width(level + 1)) as usize & (RTTES_PER_RTT - 1);
        let slot = (rtt_addr as *mut u64).wrapping_add(index);
        // SAFETY: rtt_addr is either the validated root set or the OA of
        // a TABLE descriptor, which only ever points at RTT granules.
        let rtte = unsafe { slot.read_volatile() };

        if (rtte & 0b11) != 0b11 || level == target_level {
            return Ok(WalkResult {
                rtt_addr,
                slot,
                level,
            });
        }

        let out_addr = rtte & OA_MASK;
        if out_addr == 0 {
            crate::warn!("TABLE descriptor without OA in rtt {:#x}", rtt_addr);
            return Err(Error::Internal);
        }
        rtt_addr = out_addr;
        level += 1;
    }
}

/// Collapse the child RTT behind a TABLE entry into a single entry.
///
/// All 512 children must agree on a state, with one tie-break:
/// UNASSIGNED and DESTROYED absorb into DESTROYED. Backed children must
/// additionally form one contiguous block-aligned run. On success the
/// parent takes the folded state; the child granule itself is untouched
/// (the caller demotes it).
pub fn fold(parent: &mut WalkResult) -> bool {
    debug_assert!(parent.state() == RtteState::Table);
    let child_rtt = parent.out_addr();
    let level = parent.level + 1;

    // SAFETY: child_rtt is the OA of a TABLE entry; see walk().
    let first = unsafe { (child_rtt as *const u64).read_volatile() };
    let mut folded_state = classify(first, level);

    let mut aligned = false;
    let mut folded_oa = 0;
    if level == RTT_PAGE_LEVEL {
        folded_oa = first & OA_MASK;
        aligned = is_level_aligned(folded_oa, RTT_BLOCK_LEVEL);
    }

    for i in 1..RTTES_PER_RTT {
        // SAFETY: within the child RTT granule.
        let rtte = unsafe { (child_rtt as *const u64).add(i).read_volatile() };
        let state = classify(rtte, level);
        if state != folded_state {
            match (folded_state, state) {
                (RtteState::Unassigned, RtteState::Destroyed) => {
                    folded_state = RtteState::Destroyed;
                }
                (RtteState::Destroyed, RtteState::Unassigned) => {}
                _ => {
                    crate::verbose!(
                        "not foldable: {:?} vs {:?} in rtt {:#x}",
                        folded_state,
                        state,
                        child_rtt
                    );
                    return false;
                }
            }
        }
        if aligned && rtte & OA_MASK != folded_oa + ((i as u64) << 12) {
            aligned = false;
        }
    }

    match folded_state {
        RtteState::Unassigned => parent.write(0),
        RtteState::Destroyed => parent.set_destroyed(),
        RtteState::Assigned | RtteState::Valid | RtteState::ValidNs if aligned => {
            // Block semantics: the first child's descriptor is the block
            // descriptor verbatim.
            parent.write(first);
        }
        _ => {
            crate::verbose!(
                "not foldable: {:?} unaligned in rtt {:#x}",
                folded_state,
                child_rtt
            );
            return false;
        }
    }
    true
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{realm::rd::RealmState, testbed::Arena},
    };

    fn test_rd(rtt_base: u64) -> Rd {
        Rd {
            par_base: 0,
            par_size: 1 << 30,
            rec_index: 0,
            rec_count: 0,
            rtt_base,
            rtt_num_start: 1,
            ipa_width: 30,
            vmid: 1,
            rtt_level_start: 1,
            state: RealmState::New,
        }
    }

    fn write_rtte(rtt: u64, index: usize, desc: u64) {
        unsafe { (rtt as *mut u64).add(index).write(desc) }
    }

    #[test]
    fn classify_covers_the_closed_set() {
        assert_eq!(classify(0, 3), RtteState::Unassigned);
        assert_eq!(classify(1 << 56, 3), RtteState::Destroyed);
        assert_eq!(classify(0x0000_0000_a000_0000, 3), RtteState::Assigned);
        assert_eq!(classify(0x0000_0000_a000_0000 | 0x7c3, 3), RtteState::Valid);
        assert_eq!(
            classify(0x0000_0000_a000_0000 | 0x7c3 | 1 << 55, 3),
            RtteState::ValidNs
        );
        assert_eq!(classify(0x0000_0000_a000_0000 | 0b11, 2), RtteState::Table);
        // The table encoding at page level is just a page.
        assert_eq!(classify(0x0000_0000_a000_0000 | 0b11, 3), RtteState::Valid);
    }

    #[test]
    fn walk_descends_tables_and_stops_early() {
        let arena = Arena::new(8);
        let root = arena.granule(0);
        let l2 = arena.granule(1);

        let rd = test_rd(root);
        // ipa 0: root slot 0 → l2 table; l2 slot 0 left UNASSIGNED.
        write_rtte(root, 0, (l2 & OA_MASK) | 0b11);

        let walked = walk(&rd, 0, RTT_PAGE_LEVEL).unwrap();
        // Stopped at level 2 on the UNASSIGNED entry.
        assert_eq!(walked.level, 2);
        assert_eq!(walked.rtt_addr, l2);
        assert_eq!(walked.state(), RtteState::Unassigned);

        let to_table = walk(&rd, 0, 1).unwrap();
        assert_eq!(to_table.level, 1);
        assert_eq!(to_table.state(), RtteState::Table);
    }

    #[test]
    fn mutators_round_trip_through_classify() {
        let arena = Arena::new(8);
        let root = arena.granule(0);
        let rd = test_rd(root);

        let mut w = walk(&rd, 0, 1).unwrap();
        w.set_table(arena.granule(1));
        let mut w = walk(&rd, 0, 2).unwrap();
        w.set_table(arena.granule(2));
        assert_eq!(walk(&rd, 0, 2).unwrap().state(), RtteState::Table);

        let mut w = walk(&rd, 0, RTT_PAGE_LEVEL).unwrap();
        assert_eq!(w.level, RTT_PAGE_LEVEL);
        w.set(arena.granule(3), false);
        assert_eq!(w.state(), RtteState::Assigned);
        assert_eq!(w.out_addr(), arena.granule(3));

        w.set_valid(true);
        assert_eq!(w.state(), RtteState::Valid);
        w.set_valid(false);
        assert_eq!(w.state(), RtteState::Assigned);

        w.set_destroyed();
        assert_eq!(w.state(), RtteState::Destroyed);

        w.set_ns(0xbeef_d000 | 0x3fc | 1 << 55);
        assert_eq!(w.state(), RtteState::ValidNs);
        assert_eq!(w.out_addr(), 0xbeef_d000);
    }

    #[test]
    fn ns_mutator_filters_host_bits() {
        let arena = Arena::new(8);
        let root = arena.granule(0);
        let rd = test_rd(root);

        let mut w = walk(&rd, 0, 1).unwrap();
        w.set_table(arena.granule(1));
        let mut w = walk(&rd, 0, 2).unwrap();
        w.set_table(arena.granule(2));

        let mut w = walk(&rd, 0, RTT_PAGE_LEVEL).unwrap();
        // Host tries to smuggle AF=0, destroyed mark and table bit.
        w.set_ns(0xffff_ffff_ffff_ffff);
        let desc = w.raw();
        assert_eq!(desc & (1 << 56), 0);
        assert_eq!(desc & 0b10, 0);
        assert_eq!(desc & OA_MASK, OA_MASK);
        assert_eq!(w.state(), RtteState::ValidNs);
    }

    #[test]
    fn fold_requires_agreement() {
        let arena = Arena::new(4);
        let root = arena.granule(0);
        let child = arena.granule(1);
        let rd = test_rd(root);

        write_rtte(root, 0, (child & OA_MASK) | 0b11);
        // Half destroyed, half unassigned: absorbs into DESTROYED.
        for i in 0..256 {
            write_rtte(child, i, 1 << 56);
        }

        let mut parent = walk(&rd, 0, 1).unwrap();
        assert!(fold(&mut parent));
        assert_eq!(walk(&rd, 0, 1).unwrap().state(), RtteState::Destroyed);
    }

    #[test]
    fn fold_rejects_mixed_backing() {
        let arena = Arena::new(4);
        let root = arena.granule(0);
        let child = arena.granule(1);
        let rd = test_rd(root);

        write_rtte(root, 0, (child & OA_MASK) | 0b11);
        write_rtte(child, 0, arena.granule(2)); // ASSIGNED
        // Slot 1..511 stay UNASSIGNED.

        let mut parent = walk(&rd, 0, 1).unwrap();
        assert!(!fold(&mut parent));
        assert_eq!(walk(&rd, 0, 1).unwrap().state(), RtteState::Table);
    }

    #[test]
    fn fold_of_contiguous_pages_forms_a_block() {
        let arena = Arena::new(1100);
        let root = arena.granule(0);
        let l2 = arena.granule(1);
        let l3 = arena.granule(2);
        let rd = test_rd(root);
        // A block-aligned data run needs 512 consecutive granules.
        let data_base = (arena.granule(3) + (1 << 21) - 1) & !((1 << 21) - 1);
        assert!(data_base + (512 << 12) <= arena.granule(0) + 1100 * 4096);

        write_rtte(root, 0, (l2 & OA_MASK) | 0b11);
        write_rtte(l2, 0, (l3 & OA_MASK) | 0b11);
        for i in 0..512 {
            write_rtte(l3, i, data_base + ((i as u64) << 12)); // ASSIGNED run
        }

        let mut parent = walk(&rd, 0, 2).unwrap();
        assert_eq!(parent.state(), RtteState::Table);
        assert!(fold(&mut parent));

        let folded = walk(&rd, 0, 2).unwrap();
        assert_eq!(folded.level, 2);
        assert_eq!(folded.state(), RtteState::Assigned);
        assert_eq!(folded.out_addr(), data_base);
    }

    #[test]
    fn fold_is_idempotent_once_folded() {
        let arena = Arena::new(4);
        let root = arena.granule(0);
        let child = arena.granule(1);
        let rd = test_rd(root);

        write_rtte(root, 0, (child & OA_MASK) | 0b11);
        let mut parent = walk(&rd, 0, 1).unwrap();
        assert!(fold(&mut parent));
        assert_eq!(walk(&rd, 0, 1).unwrap().state(), RtteState::Unassigned);
        // A second destroy attempt no longer sees a TABLE; nothing to fold.
        assert_ne!(walk(&rd, 0, 1).unwrap().state(), RtteState::Table);
    }
}
