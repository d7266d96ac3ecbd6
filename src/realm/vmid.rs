/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! VMID allocation.
//!
//! Stage-2 TLB tags are 8 bit on this platform; vmid 0 belongs to the
//! monitor itself. Allocation is round-robin so a freshly released tag
//! is not immediately reused while stale TLB entries may still carry it.

use bit_field::BitField;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// One more than the largest assignable VMID.
pub const VMID_LIMIT: usize = 256;

/// Round-robin bitmap allocator over VMIDs 1..=255.
pub struct VmidPool {
    used: [u64; VMID_LIMIT / 64],
    last: usize,
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl VmidPool {
    pub const fn new() -> Self {
        Self {
            // Bit 0 set: vmid 0 is never handed out.
            used: [1, 0, 0, 0],
            last: 0,
        }
    }

    /// Allocate the next free VMID, or `None` when all 255 are live.
    pub fn allocate(&mut self) -> Option<u16> {
        for _ in 0..VMID_LIMIT {
            self.last = (self.last + 1) % VMID_LIMIT;
            if self.last == 0 {
                continue;
            }
            if !self.used[self.last / 64].get_bit(self.last % 64) {
                self.used[self.last / 64].set_bit(self.last % 64, true);
                return Some(self.last as u16);
            }
        }
        None
    }

    /// Return a VMID to the pool.
    pub fn release(&mut self, vmid: u16) {
        debug_assert!(vmid != 0 && (vmid as usize) < VMID_LIMIT);
        self.used[vmid as usize / 64].set_bit(vmid as usize % 64, false);
    }
}

impl Default for VmidPool {
    fn default() -> Self {
        Self::new()
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
