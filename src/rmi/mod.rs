/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! The RMI dispatcher.
//!
//! The host invokes the monitor with a function id and up to five
//! argument words; every request is answered with an eight-word reply
//! vector headed by the `REQ_COMPLETE` marker. Unknown fids get the SMC
//! "unknown function" sentinel instead.

mod data;
mod enter;
mod granule;
mod psci;
mod realm;
mod rec;
mod rtt;

use crate::{error::Error, monitor::Rmm, rtt::RTT_PAGE_LEVEL};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// RMI function ids (SMC64, standard secure service).
pub mod fid {
    const SMC64_STD: u64 = 0xC400_0000;

    pub const VERSION: u64 = SMC64_STD | 0x150;
    pub const GRANULE_DELEGATE: u64 = SMC64_STD | 0x151;
    pub const GRANULE_UNDELEGATE: u64 = SMC64_STD | 0x152;
    pub const DATA_CREATE: u64 = SMC64_STD | 0x153;
    pub const DATA_CREATE_UNKNOWN: u64 = SMC64_STD | 0x154;
    pub const DATA_DESTROY: u64 = SMC64_STD | 0x155;
    pub const DATA_DISPOSE: u64 = SMC64_STD | 0x156;
    pub const REALM_ACTIVATE: u64 = SMC64_STD | 0x157;
    pub const REALM_CREATE: u64 = SMC64_STD | 0x158;
    pub const REALM_DESTROY: u64 = SMC64_STD | 0x159;
    pub const REC_CREATE: u64 = SMC64_STD | 0x15A;
    pub const REC_DESTROY: u64 = SMC64_STD | 0x15B;
    pub const REC_ENTER: u64 = SMC64_STD | 0x15C;
    pub const RTT_CREATE: u64 = SMC64_STD | 0x15D;
    pub const RTT_DESTROY: u64 = SMC64_STD | 0x15E;
    pub const RTT_MAP_UNPROTECTED: u64 = SMC64_STD | 0x15F;
    pub const RTT_MAP_PROTECTED: u64 = SMC64_STD | 0x160;
    pub const RTT_READ_ENTRY: u64 = SMC64_STD | 0x161;
    pub const RTT_UNMAP_UNPROTECTED: u64 = SMC64_STD | 0x162;
    pub const RTT_UNMAP_PROTECTED: u64 = SMC64_STD | 0x163;
    pub const PSCI_COMPLETE: u64 = SMC64_STD | 0x164;
    pub const FEATURES: u64 = SMC64_STD | 0x165;
    pub const DATA_CREATE_LEVEL: u64 = SMC64_STD | 0x168;
    pub const DATA_CREATE_UNKNOWN_LEVEL: u64 = SMC64_STD | 0x169;
    pub const DATA_DESTROY_LEVEL: u64 = SMC64_STD | 0x16A;
}

/// Reply marker the firmware routes back to the host.
pub const REQ_COMPLETE: u64 = 0xC400_01CF;

/// Sentinel for an unknown function id.
pub const SMC_UNK: u64 = -1i64 as u64;

/// ABI version reported by VERSION: `(major << 16) | minor`.
pub const ABI_VERSION: u64 = 0;

/// Extra result words a handler may return beyond the status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outputs(pub [u64; 3]);

impl Outputs {
    pub const NONE: Outputs = Outputs([0; 3]);
}

/// Result alias used by every handler.
pub type HandlerResult = Result<Outputs, Error>;

/// The eight-word reply vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply(pub [u64; 8]);

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl Reply {
    fn complete(result: HandlerResult) -> Reply {
        match result {
            Ok(Outputs(out)) => Reply([REQ_COMPLETE, 0, out[0], out[1], out[2], 0, 0, 0]),
            Err(e) => Reply([REQ_COMPLETE, e.code(), 0, 0, 0, 0, 0, 0]),
        }
    }

    fn version() -> Reply {
        Reply([REQ_COMPLETE, ABI_VERSION, 0, 0, 0, 0, 0, 0])
    }

    fn unknown() -> Reply {
        Reply([SMC_UNK, 0, 0, 0, 0, 0, 0, 0])
    }

    /// Status word of the reply.
    pub fn status(&self) -> u64 {
        self.0[1]
    }

    /// True iff the reply is a successful `REQ_COMPLETE`.
    pub fn is_success(&self) -> bool {
        self.0[0] == REQ_COMPLETE && self.status() == crate::error::RMI_SUCCESS
    }
}

impl Rmm<'_> {
    /// Decode and execute one RMI request.
    pub fn handle(&self, fid: u64, args: [u64; 5]) -> Reply {
        let result = match fid {
            fid::VERSION => return Reply::version(),
            fid::GRANULE_DELEGATE => self.granule_delegate(args[0]),
            fid::GRANULE_UNDELEGATE => self.granule_undelegate(args[0]),
            fid::DATA_CREATE => {
                self.data_create(args[0], args[1], args[2], Some(args[3]), RTT_PAGE_LEVEL as u64)
            }
            fid::DATA_CREATE_UNKNOWN => {
                self.data_create(args[0], args[1], args[2], None, RTT_PAGE_LEVEL as u64)
            }
            fid::DATA_CREATE_LEVEL => {
                self.data_create(args[0], args[1], args[2], Some(args[3]), args[4])
            }
            fid::DATA_CREATE_UNKNOWN_LEVEL => {
                self.data_create(args[0], args[1], args[2], None, args[3])
            }
            fid::DATA_DESTROY => self.data_destroy(args[0], args[1], RTT_PAGE_LEVEL as u64),
            fid::DATA_DESTROY_LEVEL => self.data_destroy(args[0], args[1], args[2]),
            fid::DATA_DISPOSE => self.data_dispose(args[0], args[1], args[2], args[3]),
            fid::REALM_ACTIVATE => self.realm_activate(args[0]),
            fid::REALM_CREATE => self.realm_create(args[0], args[1]),
            fid::REALM_DESTROY => self.realm_destroy(args[0]),
            fid::REC_CREATE => self.rec_create(args[0], args[1], args[2], args[3]),
            fid::REC_DESTROY => self.rec_destroy(args[0]),
            fid::REC_ENTER => self.rec_enter(args[0], args[1]),
            fid::RTT_CREATE => self.rtt_create(args[0], args[1], args[2], args[3]),
            fid::RTT_DESTROY => self.rtt_destroy(args[0], args[1], args[2], args[3]),
            fid::RTT_MAP_UNPROTECTED => self.rtt_map_unprotected(args[0], args[1], args[2], args[3]),
            fid::RTT_MAP_PROTECTED => self.rtt_map_protected(args[0], args[1], args[2]),
            fid::RTT_READ_ENTRY => self.rtt_read_entry(args[0], args[1], args[2]),
            fid::RTT_UNMAP_UNPROTECTED => {
                self.rtt_unmap_unprotected(args[0], args[1], args[2], args[3])
            }
            fid::RTT_UNMAP_PROTECTED => self.rtt_unmap_protected(args[0], args[1], args[2]),
            fid::PSCI_COMPLETE => self.psci_complete(args[0], args[1]),
            fid::FEATURES => Err(Error::NotSupported),
            _ => {
                crate::info!("unknown RMI fid {:#x}", fid);
                return Reply::unknown();
            }
        };
        Reply::complete(result)
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use {super::*, crate::testbed::TestBed};

    #[test]
    fn version_reports_the_abi() {
        let bed = TestBed::new();
        let reply = bed.rmm().handle(fid::VERSION, [0; 5]);
        assert_eq!(reply.0[0], REQ_COMPLETE);
        assert_eq!(reply.0[1], ABI_VERSION);
    }

    #[test]
    fn features_is_not_supported() {
        let bed = TestBed::new();
        let reply = bed.rmm().handle(fid::FEATURES, [0; 5]);
        assert_eq!(reply.status(), Error::NotSupported.code());
    }

    #[test]
    fn unknown_fid_is_smc_unk() {
        let bed = TestBed::new();
        let reply = bed.rmm().handle(0xC400_0FFF, [0; 5]);
        assert_eq!(reply.0[0], SMC_UNK);
    }
}
