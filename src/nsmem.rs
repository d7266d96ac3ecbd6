/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! Fault-safe access to non-secure memory.
//!
//! Host-supplied buffers live in NS PAS and nothing stops the host from
//! handing the monitor an address that is not actually non-secure, or
//! that is unmapped. A copy must therefore be able to take a data abort
//! mid-flight and surface it as an ordinary `false` instead of crashing
//! the monitor. The recovery slot is per core and single use: one copy
//! may be in flight per core at a time.
//!
//! The single-granule contract: a copy may not cross a granule boundary
//! on the NS side, so `offset-into-granule + length <= 4096`. Multi
//! granule transfers are split by the caller.

use {
    crate::{
        arch,
        granule::GRANULE_SIZE,
        platform::interface::Platform,
    },
    core::mem::{size_of, MaybeUninit},
};

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Copy `dst.len()` bytes from NS memory at `ns_src` into monitor-owned
/// `dst`. Returns `false` if the NS side has no valid alias or the access
/// faulted; `dst` may then be partially written.
pub fn read_ns(plat: &dyn Platform, dst: &mut [u8], ns_src: u64) -> bool {
    if !fits_in_granule(ns_src, dst.len()) {
        debug_assert!(false, "NS read crosses a granule boundary");
        return false;
    }
    let src = match plat.ns_window(ns_src) {
        Some(alias) => alias,
        None => return false,
    };
    // SAFETY: dst is an exclusive monitor-owned buffer; src is the
    // platform's NS alias and any fault there lands in the per-core
    // recovery slot.
    unsafe { arch::guarded_ns_copy(dst.as_mut_ptr(), src as *const u8, dst.len(), plat.core_id()) }
}

/// Copy `src` into NS memory at `ns_dst`. Returns `false` if the NS side
/// has no valid alias or the access faulted.
pub fn write_ns(plat: &dyn Platform, ns_dst: u64, src: &[u8]) -> bool {
    if !fits_in_granule(ns_dst, src.len()) {
        debug_assert!(false, "NS write crosses a granule boundary");
        return false;
    }
    let dst = match plat.ns_window(ns_dst) {
        Some(alias) => alias,
        None => return false,
    };
    // SAFETY: as in read_ns; a partial write into NS scratch is benign.
    unsafe { arch::guarded_ns_copy(dst as *mut u8, src.as_ptr(), src.len(), plat.core_id()) }
}

/// Read one host-ABI object out of NS memory.
///
/// `T` must be plain old data: `#[repr(C)]`, no padding, every bit
/// pattern valid. All RMI parameter blocks qualify.
pub fn read_ns_object<T>(plat: &dyn Platform, ns_src: u64) -> Option<T> {
    let mut obj = MaybeUninit::<T>::uninit();
    // SAFETY: the destination slice covers exactly the uninitialised
    // object; on success every byte has been written.
    let dst =
        unsafe { core::slice::from_raw_parts_mut(obj.as_mut_ptr() as *mut u8, size_of::<T>()) };
    if !read_ns(plat, dst, ns_src) {
        return None;
    }
    Some(unsafe { obj.assume_init() })
}

/// Write one host-ABI object into NS memory.
pub fn write_ns_object<T>(plat: &dyn Platform, ns_dst: u64, obj: &T) -> bool {
    // SAFETY: T is plain old data per the read_ns_object contract.
    let src =
        unsafe { core::slice::from_raw_parts(obj as *const T as *const u8, size_of::<T>()) };
    write_ns(plat, ns_dst, src)
}

fn fits_in_granule(ns_addr: u64, len: usize) -> bool {
    (ns_addr as usize & (GRANULE_SIZE - 1)) + len <= GRANULE_SIZE
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::testbed::{Page, TestPlatform},
    };

    #[test]
    fn round_trip_through_the_window() {
        let plat = TestPlatform::identity();
        let src = Page::filled(0xa5);
        let mut dst = [0u8; 64];

        assert!(read_ns(&plat, &mut dst, src.addr()));
        assert_eq!(dst, [0xa5u8; 64]);

        assert!(write_ns(&plat, src.addr() + 128, &[0x5a; 64]));
        assert_eq!(src.bytes()[128..192], [0x5au8; 64]);
    }

    #[test]
    fn granule_straddling_is_rejected() {
        let plat = TestPlatform::identity();
        let page = Page::filled(0);
        let mut dst = [0u8; 64];

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            read_ns(&plat, &mut dst, page.addr() + 4090)
        }));
        // Debug builds assert; release builds report failure.
        assert!(result.is_err() || !result.unwrap());
    }

    #[test]
    fn faulting_source_reports_false() {
        let mut plat = TestPlatform::identity();
        let page = Page::filled(0x11);
        let mut dst = [0xffu8; 16];
        plat.fault_at(page.addr());

        assert!(!read_ns(&plat, &mut dst, page.addr()));
        // Destination untouched: the fault fired before the copy.
        assert_eq!(dst, [0xffu8; 16]);
    }

    #[test]
    fn object_read_fails_on_fault() {
        let mut plat = TestPlatform::identity();
        let page = Page::filled(0);
        page.write_u64(0, 77);
        plat.fault_at(page.addr());

        assert_eq!(read_ns_object::<u64>(&plat, page.addr()), None);
        plat.clear_faults();
        assert_eq!(read_ns_object::<u64>(&plat, page.addr()), Some(77));
    }
}
