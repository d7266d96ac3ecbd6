/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! Host-side test fixture.
//!
//! An aligned arena stands in for delegable DRAM: its real addresses are
//! used as "physical" addresses, so handlers exercise the same raw
//! memory paths they use on the machine. The three platform seams are
//! replaced by doubles: a firmware mock that can refuse a transition, a
//! platform whose NS window can be told to fault, and a scripted realm
//! executor that replays canned exits.

use {
    crate::{
        granule::{level_size, GRANULE_SIZE},
        monitor::Rmm,
        platform::{interface, ExitClass},
        realm::{rd::Rd, rec::Rec},
        rmi::{fid, Reply},
        run::{RealmParams, RecExit, RecParams, REC_RUN_EXIT_OFFSET},
    },
    std::{
        alloc::{alloc_zeroed, dealloc, Layout},
        cell::{Cell, UnsafeCell},
        collections::{HashSet, VecDeque},
        sync::{
            atomic::{AtomicBool, Ordering},
            Mutex,
        },
    },
};

//--------------------------------------------------------------------------------------------------
// Memory fixtures
//--------------------------------------------------------------------------------------------------

/// A granule-aligned slab of zeroed memory posing as delegable DRAM.
pub struct Arena {
    ptr: *mut u8,
    layout: Layout,
    count: usize,
}

impl Arena {
    pub fn new(count: usize) -> Arena {
        let layout = Layout::from_size_align(count * GRANULE_SIZE, GRANULE_SIZE).unwrap();
        // SAFETY: layout is non-zero and well formed.
        let ptr = unsafe { alloc_zeroed(layout) };
        assert!(!ptr.is_null());
        Arena { ptr, layout, count }
    }

    pub fn base(&self) -> u64 {
        self.ptr as u64
    }

    pub fn granule(&self, index: usize) -> u64 {
        assert!(index < self.count);
        self.base() + (index * GRANULE_SIZE) as u64
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        // SAFETY: allocated with exactly this layout in new().
        unsafe { dealloc(self.ptr, self.layout) }
    }
}

#[repr(C, align(4096))]
struct PageBuf {
    bytes: [u8; GRANULE_SIZE],
}

/// One aligned page of host memory for NS copy tests.
pub struct Page {
    buf: Box<UnsafeCell<PageBuf>>,
}

impl Page {
    pub fn filled(fill: u8) -> Page {
        Page {
            buf: Box::new(UnsafeCell::new(PageBuf {
                bytes: [fill; GRANULE_SIZE],
            })),
        }
    }

    pub fn addr(&self) -> u64 {
        self.buf.get() as u64
    }

    pub fn bytes(&self) -> &[u8] {
        // SAFETY: tests never hold this borrow across a write.
        unsafe { &(*self.buf.get()).bytes }
    }

    pub fn write_u64(&self, offset: usize, value: u64) {
        assert!(offset + 8 <= GRANULE_SIZE);
        // SAFETY: in bounds of the page.
        unsafe { ((self.addr() + offset as u64) as *mut u64).write(value) }
    }
}

//--------------------------------------------------------------------------------------------------
// Seam doubles
//--------------------------------------------------------------------------------------------------

/// Firmware conduit double; records nothing, but can refuse one call.
pub struct MockFirmware {
    refuse: AtomicBool,
}

impl MockFirmware {
    pub fn new() -> Self {
        Self {
            refuse: AtomicBool::new(false),
        }
    }

    /// Make the next PAS transition fail with a firmware status.
    pub fn refuse_next(&self) {
        self.refuse.store(true, Ordering::Relaxed);
    }

    fn take_refusal(&self) -> u64 {
        u64::from(self.refuse.swap(false, Ordering::Relaxed))
    }
}

impl interface::SecureMonitor for MockFirmware {
    fn delegate(&self, _addr: u64) -> u64 {
        self.take_refusal()
    }

    fn undelegate(&self, _addr: u64) -> u64 {
        self.take_refusal()
    }

    fn psci_version(&self) -> u64 {
        0x0001_0000
    }

    fn psci_features(&self, _fid: u64) -> u64 {
        0
    }
}

/// Identity NS window with optional injected faults.
pub struct TestPlatform {
    faults: Mutex<HashSet<u64>>,
}

impl TestPlatform {
    pub fn identity() -> Self {
        Self {
            faults: Mutex::new(HashSet::new()),
        }
    }

    /// Accesses to the granule containing `addr` will fault.
    pub fn fault_at(&self, addr: u64) {
        self.faults
            .lock()
            .unwrap()
            .insert(addr & !(GRANULE_SIZE as u64 - 1));
    }

    pub fn clear_faults(&self) {
        self.faults.lock().unwrap().clear();
    }
}

impl interface::Platform for TestPlatform {
    fn core_id(&self) -> usize {
        0
    }

    fn ns_window(&self, addr: u64) -> Option<u64> {
        let granule = addr & !(GRANULE_SIZE as u64 - 1);
        if self.faults.lock().unwrap().contains(&granule) {
            None
        } else {
            Some(addr)
        }
    }

    fn pa_range(&self) -> u64 {
        48
    }
}

type Script = Box<dyn FnMut(&mut Rec) -> ExitClass + Send>;

/// Realm executor double: each entry pops and runs the next script.
/// With no script queued the "realm" immediately takes an IRQ exit.
pub struct ScriptedEntry {
    scripts: Mutex<VecDeque<Script>>,
}

impl ScriptedEntry {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push<F>(&self, script: F)
    where
        F: FnMut(&mut Rec) -> ExitClass + Send + 'static,
    {
        self.scripts.lock().unwrap().push_back(Box::new(script));
    }
}

impl interface::RealmEntry for ScriptedEntry {
    fn enter(&self, rec: &mut Rec) -> ExitClass {
        match self.scripts.lock().unwrap().pop_front() {
            Some(mut script) => script(rec),
            None => ExitClass::Irq,
        }
    }
}

//--------------------------------------------------------------------------------------------------
// The bed itself
//--------------------------------------------------------------------------------------------------

/// Granule count of the arena: 16 MiB, enough for a 2 MiB aligned
/// 512-granule data run plus table and object granules.
const ARENA_GRANULES: usize = 4096;

/// First granule index handed out by the helper bump allocator.
const BUMP_BASE: usize = 100;

/// First granule index used for host-side (undelegated) scratch.
const HOST_BUMP_BASE: usize = 2800;

pub struct TestBed {
    arena: Arena,
    pub smc: &'static MockFirmware,
    pub plat: &'static TestPlatform,
    pub entry: &'static ScriptedEntry,
    rmm: Rmm<'static>,
    bump: Cell<usize>,
    host_bump: Cell<usize>,
}

impl TestBed {
    pub fn new() -> TestBed {
        let arena = Arena::new(ARENA_GRANULES);
        let smc: &'static MockFirmware = Box::leak(Box::new(MockFirmware::new()));
        let plat: &'static TestPlatform = Box::leak(Box::new(TestPlatform::identity()));
        let entry: &'static ScriptedEntry = Box::leak(Box::new(ScriptedEntry::new()));
        let rmm = Rmm::new(arena.base(), smc, plat, entry);
        TestBed {
            arena,
            smc,
            plat,
            entry,
            rmm,
            bump: Cell::new(BUMP_BASE),
            host_bump: Cell::new(HOST_BUMP_BASE),
        }
    }

    pub fn rmm(&self) -> &Rmm<'static> {
        &self.rmm
    }

    pub fn handle(&self, fid: u64, args: [u64; 5]) -> Reply {
        self.rmm.handle(fid, args)
    }

    pub fn granule(&self, index: usize) -> u64 {
        self.arena.granule(index)
    }

    pub fn delegate(&self, addr: u64) -> Reply {
        self.handle(fid::GRANULE_DELEGATE, [addr, 0, 0, 0, 0])
    }

    pub fn undelegate(&self, addr: u64) -> Reply {
        self.handle(fid::GRANULE_UNDELEGATE, [addr, 0, 0, 0, 0])
    }

    /// Granule at `index`, delegated.
    pub fn delegated_granule(&self, index: usize) -> u64 {
        let addr = self.granule(index);
        assert!(self.delegate(addr).is_success());
        addr
    }

    fn bump_delegated(&self) -> u64 {
        let index = self.bump.get();
        self.bump.set(index + 1);
        self.delegated_granule(index)
    }

    /// A fresh host-side (undelegated) granule.
    pub fn host_granule(&self) -> u64 {
        let index = self.host_bump.get();
        self.host_bump.set(index + 1);
        self.granule(index)
    }

    /// Base of a 2 MiB aligned run of 512 granules, clear of every other
    /// fixture range.
    pub fn aligned_data_run(&self) -> u64 {
        const BLOCK: u64 = 1 << 21;
        let base = (self.granule(1024) + BLOCK - 1) & !(BLOCK - 1);
        assert!(base + BLOCK <= self.granule(HOST_BUMP_BASE));
        base
    }

    pub fn write_u64(&self, addr: u64, value: u64) {
        // SAFETY: tests only pass arena addresses.
        unsafe { (addr as *mut u64).write(value) }
    }

    pub fn read_u64(&self, addr: u64) -> u64 {
        // SAFETY: as write_u64.
        unsafe { (addr as *const u64).read() }
    }

    //----------------------------------------------------------------------------------------------
    // Realm construction
    //----------------------------------------------------------------------------------------------

    /// A 32-bit realm whose PAR is [0x1000_0000, 0x2000_0000).
    pub fn default_params(&self) -> RealmParams {
        RealmParams {
            par_base: 0x1000_0000,
            par_size: 0x1000_0000,
            rtt_base: 0,
            measurement_algo: 0,
            features_0: 32,
            rtt_level_start: 1,
            rtt_num_start: 1,
            vmid: 0,
        }
    }

    /// Write a parameter block into host scratch; returns its address.
    pub fn write_params(&self, params: &RealmParams) -> u64 {
        let addr = self.host_granule();
        // SAFETY: fresh host granule, plain-old-data store.
        unsafe { (addr as *mut RealmParams).write(*params) };
        addr
    }

    /// Attempt REALM_CREATE with the given parameters against freshly
    /// delegated rd/rtt granules.
    pub fn try_create_realm(&self, params: &RealmParams) -> Reply {
        let rtt = self.bump_delegated();
        let rd = self.bump_delegated();
        let mut params = *params;
        if params.rtt_base == 0 {
            params.rtt_base = rtt;
        }
        let params_ptr = self.write_params(&params);
        self.handle(fid::REALM_CREATE, [rd, params_ptr, 0, 0, 0])
    }

    /// Build a realm out of granules `base_index + 1` (root RTT) and
    /// `base_index + 2` (RD). Returns `(rd, rtt_base)`.
    pub fn create_realm_at(&self, base_index: usize) -> (u64, u64) {
        let rtt = self.delegated_granule(base_index + 1);
        let rd = self.delegated_granule(base_index + 2);
        let mut params = self.default_params();
        params.rtt_base = rtt;
        let params_ptr = self.write_params(&params);
        let reply = self.handle(fid::REALM_CREATE, [rd, params_ptr, 0, 0, 0]);
        assert!(reply.is_success(), "realm create status {}", reply.status());
        (rd, rtt)
    }

    pub fn create_default_realm(&self) -> (u64, u64) {
        self.create_realm_at(0)
    }

    /// Create the level-2 and level-3 tables covering `ipa`; returns
    /// their granule addresses.
    pub fn map_tables(&self, rd: u64, ipa: u64) -> (u64, u64) {
        let l2 = self.bump_delegated();
        let reply = self.handle(fid::RTT_CREATE, [l2, rd, ipa & !(level_size(1) - 1), 2, 0]);
        assert!(reply.is_success(), "level 2 rtt status {}", reply.status());

        let l3 = self.bump_delegated();
        let reply = self.handle(fid::RTT_CREATE, [l3, rd, ipa & !(level_size(2) - 1), 3, 0]);
        assert!(reply.is_success(), "level 3 rtt status {}", reply.status());
        (l2, l3)
    }

    //----------------------------------------------------------------------------------------------
    // REC construction and inspection
    //----------------------------------------------------------------------------------------------

    pub fn create_rec_with<F>(&self, rec: u64, rd: u64, mpidr: u64, tweak: F) -> Reply
    where
        F: FnOnce(&mut RecParams),
    {
        let mut params = RecParams {
            gprs: [0; 8],
            pc: 0x1000_0000,
            flags: 1,
            aux: [0; 16],
        };
        tweak(&mut params);
        let addr = self.host_granule();
        // SAFETY: fresh host granule, plain-old-data store.
        unsafe { (addr as *mut RecParams).write(params) };
        self.handle(fid::REC_CREATE, [rec, rd, mpidr, addr, 0])
    }

    pub fn create_rec(&self, rec: u64, rd: u64, mpidr: u64) -> Reply {
        self.create_rec_with(rec, rd, mpidr, |_| {})
    }

    /// GPRs, pc and runnability of a REC.
    pub fn rec_boot_state(&self, rec: u64) -> ([u64; 32], u64, bool) {
        // SAFETY: rec granules in tests always hold initialised RECs.
        let recp = unsafe { &*(rec as *const Rec) };
        (recp.gprs, recp.pc, recp.runnable)
    }

    pub fn set_rec_runnable(&self, rec: u64, runnable: bool) {
        // SAFETY: as rec_boot_state.
        unsafe { (*(rec as *mut Rec)).runnable = runnable };
    }

    pub fn rd_vmid(&self, rd: u64) -> u64 {
        // SAFETY: rd granules in tests always hold initialised RDs.
        unsafe { (*(rd as *const Rd)).vmid }
    }

    pub fn rd_rec_count(&self, rd: u64) -> u64 {
        // SAFETY: as rd_vmid.
        unsafe { (*(rd as *const Rd)).rec_count }
    }

    //----------------------------------------------------------------------------------------------
    // Run buffer plumbing
    //----------------------------------------------------------------------------------------------

    /// An activated realm with one runnable REC and a run granule.
    /// Returns `(rd, rec, run)`.
    pub fn bootable_realm(&self) -> (u64, u64, u64) {
        let (rd, rec, run) = self.bootable_realm_with_recs(1);
        (rd, rec, run)
    }

    /// As [`bootable_realm`], with `count` RECs; only REC 0 starts
    /// runnable. Returns `(rd, rec0, run)`.
    pub fn bootable_realm_with_recs(&self, count: usize) -> (u64, u64, u64) {
        let (rd, _) = self.create_default_realm();
        for i in 0..count {
            let rec = self.delegated_granule(6 + i);
            let reply = self.create_rec_with(rec, rd, i as u64, |p| {
                p.flags = u64::from(i == 0);
            });
            assert!(reply.is_success(), "rec create status {}", reply.status());
        }
        let reply = self.handle(fid::REALM_ACTIVATE, [rd, 0, 0, 0, 0]);
        assert!(reply.is_success());
        (rd, self.granule(6), self.granule(20))
    }

    /// Address of the `index`-th REC made by `bootable_realm_with_recs`.
    pub fn rec_of(&self, _rd: u64, index: usize) -> u64 {
        self.granule(6 + index)
    }

    /// The exit half of a run granule.
    pub fn read_exit(&self, run: u64) -> RecExit {
        // SAFETY: the handler wrote a whole RecExit there.
        unsafe { ((run + REC_RUN_EXIT_OFFSET) as *const RecExit).read() }
    }

    /// Flag the next entry as satisfying an emulated MMIO read.
    pub fn write_entry_mmio(&self, run: u64, read_value: u64) {
        // RecEntry layout: gprs[7], then is_emulated_mmio, then the value.
        self.write_u64(run + 56, 1);
        self.write_u64(run + 64, read_value);
    }
}
