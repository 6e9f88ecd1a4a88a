//! Relocation of expired allocations into the archive.
//!
//! Each candidate is extracted on its own: a failure is logged and recorded in
//! the [`SweepReport`], the allocation stays live for the next run, and the
//! batch carries on.

use crate::{ArchiveId, ArchiveStore, Error, LiveStore, Result, Token};

/// Outcome of one sweep run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SweepReport {
    /// Allocations past their visibility deadline when the run started.
    pub found: usize,
    pub succeeded: usize,
    /// Tokens whose extraction failed; they remain live.
    pub failed: Vec<Token>,
}

impl SweepReport {
    /// `true` when every candidate was archived.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub(crate) fn sweep<S, A>(live: &S, archive: &A, now: u64) -> SweepReport
where
    S: LiveStore,
    A: ArchiveStore,
{
    let candidates = live.expired(now);
    let mut report = SweepReport {
        found: candidates.len(),
        ..SweepReport::default()
    };
    if candidates.is_empty() {
        #[cfg(feature = "tracing")]
        tracing::debug!("no expired allocations to archive");
        return report;
    }

    #[cfg(feature = "tracing")]
    tracing::info!(live = live.len(), expired = report.found, "archiving expired allocations");

    for token in candidates {
        match extract(live, archive, &token, now) {
            Ok(_id) => {
                report.succeeded += 1;
                #[cfg(feature = "tracing")]
                tracing::debug!(%token, archive_id = %_id, "archived allocation");
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::error!(%token, error = %_e, "failed to archive allocation");
                report.failed.push(token);
            }
        }
    }

    #[cfg(feature = "tracing")]
    {
        if report.is_clean() {
            tracing::info!(archived = report.succeeded, "sweep finished");
        } else {
            tracing::warn!(
                archived = report.succeeded,
                failed = ?report.failed,
                "sweep finished with failures"
            );
        }
    }
    report
}

/// Writes the archive record and drops the live allocation as one step under
/// the allocation's lock.
fn extract<S, A>(live: &S, archive: &A, token: &Token, now: u64) -> Result<ArchiveId>
where
    S: LiveStore,
    A: ArchiveStore,
{
    let vanished = || Error::AllocationVanished { token: *token };
    live.extract_with(token, |allocation| {
        // The token may have been archived and reissued since the scan.
        if !allocation.is_expired(now) {
            return Err(vanished());
        }
        archive.append(allocation.archive(now))
    })
    .unwrap_or_else(|| Err(vanished()))
}
