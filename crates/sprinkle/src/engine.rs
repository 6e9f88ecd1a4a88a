//! The four operations exposed to the caller layer.
//!
//! [`Engine`] ties the token generator, the partitioner and the two stores
//! together. It is `Sync` whenever its parts are, so one instance is meant to
//! be shared (e.g. behind an `Arc`) by every request handler and the sweep
//! scheduler.
//!
//! Rule violations come back as user-facing [`Error`]s and are logged at
//! `debug`; system faults are logged at `error`.

use crate::{
    Allocation, ArchiveId, ArchiveRecord, ArchiveStore, Error, LiveStore, MemoryArchive,
    MemoryStore, Partitioner, Policy, RandSource, Result, RoomId, Snapshot, SweepReport,
    ThreadRandom, TimeSource, Token, TokenGenerator, UserId, WallClock, sweep::sweep,
};
#[cfg(feature = "tracing")]
use tracing::instrument;

/// The allocation/claim engine.
pub struct Engine<S, A, C, R> {
    live: S,
    archive: A,
    clock: C,
    tokens: TokenGenerator<R>,
    partitioner: Partitioner<R>,
    policy: Policy,
}

/// An engine backed by the in-memory stores.
pub type MemoryEngine<C = WallClock, R = ThreadRandom> = Engine<MemoryStore, MemoryArchive, C, R>;

impl MemoryEngine {
    /// In-memory engine on the wall clock and thread-local RNG.
    pub fn in_memory(policy: Policy) -> Self {
        Self::new(
            MemoryStore::new(),
            MemoryArchive::new(),
            WallClock,
            ThreadRandom,
            policy,
        )
    }
}

impl<S, A, C, R> Engine<S, A, C, R>
where
    S: LiveStore,
    A: ArchiveStore,
    C: TimeSource,
    R: RandSource + Clone,
{
    pub fn new(live: S, archive: A, clock: C, rng: R, policy: Policy) -> Self {
        let partitioner = match policy.dampening {
            Some(factor) => Partitioner::with_dampening(rng.clone(), factor),
            None => Partitioner::new(rng.clone()),
        };
        Self {
            live,
            archive,
            clock,
            tokens: TokenGenerator::with_max_attempts(rng, policy.max_token_attempts),
            partitioner,
            policy,
        }
    }
}

impl<S, A, C, R> Engine<S, A, C, R>
where
    S: LiveStore,
    A: ArchiveStore,
    C: TimeSource,
    R: RandSource,
{
    /// Splits `total_amount` into `total_share_count` random shares and
    /// publishes them under a fresh token.
    ///
    /// Deadlines are computed from the current time and the engine's
    /// [`Policy`].
    ///
    /// # Errors
    /// - [`Error::InvalidAmounts`] unless `0 < total_share_count <= total_amount`
    /// - [`Error::GenerationExhausted`] if no vacant token was found; the
    ///   caller may resubmit
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "debug",
            skip_all,
            fields(%originator, %room, total_amount, total_share_count)
        )
    )]
    pub fn create_allocation(
        &self,
        originator: UserId,
        room: &RoomId,
        total_amount: u64,
        total_share_count: u64,
    ) -> Result<Token> {
        let result = self
            .partitioner
            .partition(total_amount, total_share_count)
            .map(|shares| shares.collect::<Vec<u64>>())
            .and_then(|amounts| {
                let deadlines = self.policy.deadlines(self.clock.now_millis());
                self.tokens.generate(|token| {
                    let allocation = Allocation::from_parts(
                        token,
                        originator,
                        room.clone(),
                        &amounts,
                        total_amount,
                        deadlines,
                    );
                    self.live.insert_if_vacant(allocation)
                })
            });

        match &result {
            Ok(_token) => {
                #[cfg(feature = "tracing")]
                tracing::info!(token = %_token, total_amount, total_share_count, "allocation created");
            }
            Err(err) => note_rejection("create", err),
        }
        result
    }

    /// Claims the first open share of the allocation behind `token` and
    /// returns its amount.
    ///
    /// The whole check-and-claim runs under the allocation's lock, so
    /// concurrent claims against one allocation are serialized and never land
    /// on the same share.
    ///
    /// # Errors
    /// See [`Allocation::claim_share`]; additionally [`Error::UnknownToken`]
    /// if the token is not live.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(%token, %claimant, %room))
    )]
    pub fn claim(&self, token: &Token, claimant: UserId, room: &RoomId) -> Result<u64> {
        let result = self
            .live
            .update(token, |allocation| {
                allocation.claim_share(claimant, room, self.clock.now_millis())
            })
            .unwrap_or(Err(Error::UnknownToken { token: *token }));

        match &result {
            Ok(_amount) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(amount = _amount, "share claimed");
            }
            Err(err) => note_rejection("claim", err),
        }
        result
    }

    /// Returns the originator's view of the allocation behind `token`.
    ///
    /// Never mutates state and never archives.
    ///
    /// # Errors
    /// - [`Error::UnknownToken`] if the token is not live
    /// - [`Error::NotOriginator`] if `caller` did not create the allocation
    /// - [`Error::LookupWindowClosed`] past the visibility deadline
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip_all, fields(%token, %caller))
    )]
    pub fn lookup(&self, caller: UserId, token: &Token) -> Result<Snapshot> {
        let result = self
            .live
            .read(token, |allocation| {
                allocation.snapshot(caller, self.clock.now_millis())
            })
            .unwrap_or(Err(Error::UnknownToken { token: *token }));

        if let Err(err) = &result {
            note_rejection("lookup", err);
        }
        result
    }

    /// Moves every allocation past its visibility deadline into the archive.
    ///
    /// Per-allocation failures are logged and listed in the report; they
    /// never abort the run.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
    pub fn run_archival_sweep(&self) -> SweepReport {
        sweep(&self.live, &self.archive, self.clock.now_millis())
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn archived_count(&self) -> usize {
        self.archive.len()
    }

    pub fn archive_record(&self, id: ArchiveId) -> Option<ArchiveRecord> {
        self.archive.get(id)
    }

    pub const fn policy(&self) -> &Policy {
        &self.policy
    }

    pub const fn live(&self) -> &S {
        &self.live
    }

    pub const fn archive(&self) -> &A {
        &self.archive
    }

    pub const fn clock(&self) -> &C {
        &self.clock
    }
}

fn note_rejection(_operation: &'static str, _err: &Error) {
    #[cfg(feature = "tracing")]
    {
        if _err.is_user_facing() {
            tracing::debug!(operation = _operation, reason = %_err, "request rejected");
        } else {
            tracing::error!(operation = _operation, error = %_err, "system fault");
        }
    }
}
