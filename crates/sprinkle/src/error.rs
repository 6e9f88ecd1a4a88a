//! Error types for the allocation engine.
//!
//! Every failure the engine can report is a variant of [`Error`]. Variants
//! fall into two classes:
//!
//! - **User-facing**: predictable outcomes of bad input or normal contention
//!   (unknown token, self-claim, closed windows, ...). They are returned to
//!   the caller with a descriptive message and never logged as errors.
//! - **System faults**: conditions unrelated to any client request, such as an
//!   allocation disappearing between the sweep scan and its extraction. See
//!   [`Error::is_user_facing`].

use crate::{Token, UserId};

/// A result type defaulting to the engine's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All possible errors that the engine can produce.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The requested amount cannot be split into the requested number of
    /// positive shares.
    #[error("cannot split {total} units into {count} shares of at least 1 unit each")]
    InvalidAmounts { total: u64, count: u64 },

    /// The room id was empty.
    #[error("room id must not be empty")]
    InvalidRoom,

    /// The string is not a well-formed claim token.
    #[error("malformed token: {input:?}")]
    MalformedToken { input: String },

    /// No vacant token was found within the retry budget. The caller should
    /// resubmit the whole creation request.
    #[error("failed to generate a unique token after {attempts} attempts, please retry")]
    GenerationExhausted { attempts: usize },

    /// The token does not resolve to a live allocation, or the allocation is
    /// past its visibility deadline.
    #[error("invalid token: {token}")]
    UnknownToken { token: Token },

    /// The claim window of the allocation has closed.
    #[error("claim window closed at {deadline}")]
    ClaimWindowClosed { deadline: u64 },

    /// The originator tried to claim a share of their own allocation.
    #[error("the originator cannot claim their own allocation")]
    SelfClaimForbidden,

    /// The claim came from a different room than the allocation.
    #[error("only members of the originating room can claim")]
    RoomMismatch,

    /// Every share has already been claimed.
    #[error("every share has already been claimed")]
    FullyClaimed,

    /// The claimant already holds a share of this allocation.
    #[error("user {claimant} has already claimed a share")]
    AlreadyClaimed { claimant: UserId },

    /// Only the originator may look up an allocation.
    #[error("only the originator can look up this allocation")]
    NotOriginator,

    /// The visibility window of the allocation has closed.
    #[error("lookup window closed at {deadline}")]
    LookupWindowClosed { deadline: u64 },

    /// No open share was found although the counters say one remains.
    #[error("no open share in {token} while {remaining_shares} shares remain")]
    NoShareAvailable { token: Token, remaining_shares: u64 },

    /// The allocation was gone (or replaced) by the time extraction ran.
    #[error("allocation {token} vanished before extraction")]
    AllocationVanished { token: Token },

    /// A storage backend failed.
    #[error("storage error: {context}")]
    Storage { context: String },
}

impl Error {
    /// Returns `true` for predictable outcomes that should be reported back
    /// to the caller as-is, and `false` for system faults.
    pub const fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            Self::NoShareAvailable { .. } | Self::AllocationVanished { .. } | Self::Storage { .. }
        )
    }
}
