use crate::UserId;

/// One claimed share, as shown to the originator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClaimRecord {
    pub amount: u64,
    pub claimant: UserId,
}

/// Read-only view of an allocation's progress.
///
/// Produced by [`crate::Engine::lookup`]; building one never mutates the
/// allocation or triggers archival.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    pub created_at: u64,
    pub total_amount: u64,
    /// `total_amount - remaining_amount`.
    pub claimed_amount: u64,
    /// Claimed shares in share creation order.
    pub claims: Vec<ClaimRecord>,
}
