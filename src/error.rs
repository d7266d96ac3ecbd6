/*
 * SPDX-License-Identifier: BlueOak-1.0.0
 */

//! RMI error codes.
//!
//! The numeric values are ABI: the host sees them in the first result word
//! of every `REQ_COMPLETE` reply. `SUCCESS` is represented by the `Ok`
//! branch of handler results, so the enum only carries the failure codes.

use snafu::Snafu;

/// Success code placed in the reply when a handler returns `Ok`.
pub const RMI_SUCCESS: u64 = 0;

/// Failure codes returned by RMI handlers.
#[derive(Debug, Snafu, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A granule operand had the wrong state, alignment or range, or an
    /// enumeration parameter was out of its domain.
    #[snafu(display("operand precondition failed"))]
    Input,
    /// Realm configuration was rejected, or a cross-PAS copy faulted.
    #[snafu(display("memory configuration or cross-PAS access failed"))]
    Memory,
    /// The operation would alias two physical address space classes.
    #[snafu(display("PAS aliasing"))]
    Alias,
    /// The target object is still referenced (live RECs, populated RTTs,
    /// a REC currently executing).
    #[snafu(display("object in use"))]
    InUse,
    /// The owning realm is in the wrong lifecycle state.
    #[snafu(display("wrong realm state"))]
    RealmState,
    /// A REC was used with a realm that does not own it.
    #[snafu(display("wrong owner"))]
    Owner,
    /// A REC is not in a state fit for the request.
    #[snafu(display("REC state invalid"))]
    Rec,
    /// The RTT walk terminated before the requested level.
    #[snafu(display("RTT walk terminated early"))]
    RttWalk,
    /// The walk reached the level but the entry state does not admit the
    /// requested mutation.
    #[snafu(display("RTT entry state invalid"))]
    RttEntry,
    /// The function is known but not provided.
    #[snafu(display("not supported"))]
    NotSupported,
    /// Resource exhaustion or a broken internal invariant.
    #[snafu(display("internal error"))]
    Internal,
}

impl Error {
    /// The wire code for this error.
    pub const fn code(self) -> u64 {
        match self {
            Error::Input => 1,
            Error::Memory => 2,
            Error::Alias => 3,
            Error::InUse => 4,
            Error::RealmState => 5,
            Error::Owner => 6,
            Error::Rec => 7,
            Error::RttWalk => 8,
            Error::RttEntry => 9,
            Error::NotSupported => 10,
            Error::Internal => 11,
        }
    }
}
