//! The allocation aggregate: one spread event and its shares.
//!
//! An [`Allocation`] owns its [`Share`]s by value, in creation order. Shares
//! refer to nothing but their index, so there is no back-pointer to the owner.
//! All mutation goes through [`Allocation::claim_share`], which checks every
//! eligibility rule before touching state.

use crate::{
    ArchiveRecord, ClaimRecord, Deadlines, Error, Result, RoomId, Snapshot, Token, UserId,
};
use core::fmt::Write as _;

/// Position of a share within its allocation, starting at `0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ShareId(pub u32);

/// Claim state of a share. `Open -> Claimed` happens at most once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShareStatus {
    Open,
    Claimed { claimant: UserId, claimed_at: u64 },
}

/// One claimable portion of an allocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Share {
    id: ShareId,
    amount: u64,
    status: ShareStatus,
}

impl Share {
    pub const fn id(&self) -> ShareId {
        self.id
    }

    pub const fn amount(&self) -> u64 {
        self.amount
    }

    pub const fn status(&self) -> ShareStatus {
        self.status
    }

    pub const fn is_open(&self) -> bool {
        matches!(self.status, ShareStatus::Open)
    }

    pub const fn claimant(&self) -> Option<UserId> {
        match self.status {
            ShareStatus::Claimed { claimant, .. } => Some(claimant),
            ShareStatus::Open => None,
        }
    }

    fn summary(&self, out: &mut String) {
        // Writing into a `String` cannot fail.
        let _ = match self.status {
            ShareStatus::Open => write!(out, "amount: {} (unclaimed)", self.amount),
            ShareStatus::Claimed {
                claimant,
                claimed_at,
            } => write!(
                out,
                "amount: {} (id: {claimant}, at: {claimed_at})",
                self.amount
            ),
        };
    }
}

/// A fixed sum split into shares, claimable by members of one room.
///
/// Invariants, holding from construction on:
/// - the share amounts sum to `total_amount`;
/// - `remaining_amount` and `remaining_share_count` equal the totals minus
///   what the claimed shares account for;
/// - each claimant holds at most one share, and the originator holds none.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Allocation {
    token: Token,
    originator: UserId,
    room: RoomId,
    total_amount: u64,
    remaining_amount: u64,
    remaining_share_count: u64,
    deadlines: Deadlines,
    shares: Vec<Share>,
}

impl Allocation {
    /// Builds an allocation whose shares have the given `amounts`, in order.
    ///
    /// # Errors
    /// Returns [`Error::InvalidAmounts`] if `amounts` is empty, contains a
    /// zero, or overflows `u64` when summed.
    pub fn new(
        token: Token,
        originator: UserId,
        room: RoomId,
        amounts: &[u64],
        deadlines: Deadlines,
    ) -> Result<Self> {
        let count = amounts.len() as u64;
        let total = amounts
            .iter()
            .try_fold(0_u64, |acc, &amount| acc.checked_add(amount));
        match total {
            Some(total) if count > 0 && amounts.iter().all(|&a| a > 0) => Ok(Self::from_parts(
                token, originator, room, amounts, total, deadlines,
            )),
            _ => Err(Error::InvalidAmounts {
                total: total.unwrap_or(u64::MAX),
                count,
            }),
        }
    }

    /// Builds an allocation from amounts already known to be positive and to
    /// sum to `total`.
    pub(crate) fn from_parts(
        token: Token,
        originator: UserId,
        room: RoomId,
        amounts: &[u64],
        total: u64,
        deadlines: Deadlines,
    ) -> Self {
        debug_assert_eq!(amounts.iter().sum::<u64>(), total);
        let shares = amounts
            .iter()
            .zip(0_u32..)
            .map(|(&amount, index)| Share {
                id: ShareId(index),
                amount,
                status: ShareStatus::Open,
            })
            .collect();
        Self {
            token,
            originator,
            room,
            total_amount: total,
            remaining_amount: total,
            remaining_share_count: amounts.len() as u64,
            deadlines,
            shares,
        }
    }

    pub const fn token(&self) -> Token {
        self.token
    }

    pub const fn originator(&self) -> UserId {
        self.originator
    }

    pub const fn room(&self) -> &RoomId {
        &self.room
    }

    pub const fn total_amount(&self) -> u64 {
        self.total_amount
    }

    pub fn total_share_count(&self) -> u64 {
        self.shares.len() as u64
    }

    pub const fn remaining_amount(&self) -> u64 {
        self.remaining_amount
    }

    pub const fn remaining_share_count(&self) -> u64 {
        self.remaining_share_count
    }

    /// Amount handed out so far.
    pub const fn claimed_amount(&self) -> u64 {
        self.total_amount - self.remaining_amount
    }

    pub const fn created_at(&self) -> u64 {
        self.deadlines.created_at
    }

    pub const fn claim_deadline(&self) -> u64 {
        self.deadlines.claim_deadline
    }

    pub const fn visibility_deadline(&self) -> u64 {
        self.deadlines.visibility_deadline
    }

    pub fn shares(&self) -> &[Share] {
        &self.shares
    }

    /// Past the visibility deadline: no longer claimable or visible, and due
    /// for archival.
    pub const fn is_expired(&self, now: u64) -> bool {
        now > self.deadlines.visibility_deadline
    }

    /// Assigns the first open share to `claimant` and returns its amount.
    ///
    /// Rules are checked in a fixed order and the first violation is
    /// returned; on any error the allocation is left untouched.
    ///
    /// # Errors
    /// - [`Error::UnknownToken`] past the visibility deadline
    /// - [`Error::ClaimWindowClosed`] past the claim deadline
    /// - [`Error::SelfClaimForbidden`] if `claimant` is the originator
    /// - [`Error::RoomMismatch`] if `room` differs from the allocation's
    /// - [`Error::FullyClaimed`] if nothing remains
    /// - [`Error::AlreadyClaimed`] if `claimant` already holds a share
    /// - [`Error::NoShareAvailable`] if the counters and shares disagree
    pub fn claim_share(&mut self, claimant: UserId, room: &RoomId, now: u64) -> Result<u64> {
        if self.is_expired(now) {
            return Err(Error::UnknownToken { token: self.token });
        }
        if now > self.deadlines.claim_deadline {
            return Err(Error::ClaimWindowClosed {
                deadline: self.deadlines.claim_deadline,
            });
        }
        if claimant == self.originator {
            return Err(Error::SelfClaimForbidden);
        }
        if *room != self.room {
            return Err(Error::RoomMismatch);
        }
        if self.remaining_amount == 0 {
            return Err(Error::FullyClaimed);
        }
        if self.shares.iter().any(|s| s.claimant() == Some(claimant)) {
            return Err(Error::AlreadyClaimed { claimant });
        }

        let Some(share) = self.shares.iter_mut().find(|s| s.is_open()) else {
            return Err(Error::NoShareAvailable {
                token: self.token,
                remaining_shares: self.remaining_share_count,
            });
        };
        share.status = ShareStatus::Claimed {
            claimant,
            claimed_at: now,
        };
        self.remaining_amount -= share.amount;
        self.remaining_share_count -= 1;
        Ok(share.amount)
    }

    /// Read-only view for the originator.
    ///
    /// # Errors
    /// - [`Error::NotOriginator`] if `caller` did not create the allocation
    /// - [`Error::LookupWindowClosed`] past the visibility deadline
    pub fn snapshot(&self, caller: UserId, now: u64) -> Result<Snapshot> {
        if caller != self.originator {
            return Err(Error::NotOriginator);
        }
        if self.is_expired(now) {
            return Err(Error::LookupWindowClosed {
                deadline: self.deadlines.visibility_deadline,
            });
        }
        let claims = self
            .shares
            .iter()
            .filter_map(|share| {
                share.claimant().map(|claimant| ClaimRecord {
                    amount: share.amount,
                    claimant,
                })
            })
            .collect();
        Ok(Snapshot {
            created_at: self.deadlines.created_at,
            total_amount: self.total_amount,
            claimed_amount: self.claimed_amount(),
            claims,
        })
    }

    /// Flattens the allocation into a write-once archive record.
    pub fn archive(&self, archived_at: u64) -> ArchiveRecord {
        let mut share_summary = String::new();
        for (i, share) in self.shares.iter().enumerate() {
            if i > 0 {
                share_summary.push(',');
            }
            share.summary(&mut share_summary);
        }
        ArchiveRecord {
            token: self.token,
            originator: self.originator,
            room: self.room.clone(),
            total_amount: self.total_amount,
            total_share_count: self.total_share_count(),
            remaining_amount: self.remaining_amount,
            remaining_share_count: self.remaining_share_count,
            created_at: self.deadlines.created_at,
            archived_at,
            share_summary,
        }
    }
}
