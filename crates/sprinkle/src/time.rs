use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

/// A trait for time sources that return a wall-clock timestamp.
///
/// Deadlines are logical: they are stored as plain timestamps and compared
/// against this source when an operation runs. The unit is **milliseconds**
/// since the UNIX epoch.
///
/// # Example
///
/// ```
/// use sprinkle::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn now_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// assert_eq!(FixedTime.now_millis(), 1234);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since the UNIX epoch.
    fn now_millis(&self) -> u64;
}

/// The system wall clock.
///
/// A clock set before the UNIX epoch reads as `0`.
#[derive(Default, Clone, Copy, Debug)]
pub struct WallClock;

impl TimeSource for WallClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| {
                u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
            })
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying instant, so a test can hand one clone to
/// an engine and keep another to advance time.
#[derive(Default, Clone, Debug)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock reading `millis`.
    pub fn new(millis: u64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(millis)),
        }
    }

    /// Sets the current time.
    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::Release);
    }

    /// Moves the clock forward by `millis` and returns the new time.
    pub fn advance(&self, millis: u64) -> u64 {
        self.millis.fetch_add(millis, Ordering::AcqRel) + millis
    }
}

impl TimeSource for ManualClock {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::Acquire)
    }
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn now_millis(&self) -> u64 {
        (**self).now_millis()
    }
}
