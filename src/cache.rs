//! Time-bounded memoization used by every credential in the crate.
//!
//! [`ExpiringSupplier`] wraps a fallible producer and keeps the most recent successful
//! value for a fixed lifetime. Refreshes happen lazily on the calling thread; a failed
//! refresh leaves the slot untouched so the next call tries again. Concurrent callers that
//! observe an expired entry may each run the producer; the last write wins and readers
//! never see a partially written entry.

// self
use crate::_prelude::*;

/// Source of the current time.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current UTC instant.
	fn now(&self) -> OffsetDateTime;
}

/// Wall clock backed by [`OffsetDateTime::now_utc`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Manually advanced clock for deterministic expiry tests.
///
/// Clones share the same instant, so a clone handed to a credential can be advanced from
/// the test body.
#[derive(Clone, Debug)]
pub struct ManualClock(Arc<Mutex<OffsetDateTime>>);
impl ManualClock {
	/// Creates a clock frozen at `instant`.
	pub fn new(instant: OffsetDateTime) -> Self {
		Self(Arc::new(Mutex::new(instant)))
	}

	/// Moves the clock forward by `delta`.
	pub fn advance(&self, delta: Duration) {
		*self.0.lock() += delta;
	}

	/// Replaces the current instant.
	pub fn set(&self, instant: OffsetDateTime) {
		*self.0.lock() = instant;
	}
}
impl Default for ManualClock {
	fn default() -> Self {
		Self::new(OffsetDateTime::now_utc())
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.lock()
	}
}

type Producer<T, E> = Box<dyn Fn() -> Result<T, E> + Send + Sync>;

#[derive(Clone, Debug)]
struct Entry<T> {
	value: T,
	stored_at: OffsetDateTime,
}

/// Lazily computed value that is recomputed once its lifetime elapses.
pub struct ExpiringSupplier<T, E = Error> {
	producer: Producer<T, E>,
	ttl: Duration,
	clock: Arc<dyn Clock>,
	slot: RwLock<Option<Entry<T>>>,
}
impl<T, E> ExpiringSupplier<T, E>
where
	T: Clone,
{
	/// Wraps `producer`, caching each successful value for `ttl` against the system clock.
	pub fn new(ttl: Duration, producer: impl Fn() -> Result<T, E> + Send + Sync + 'static) -> Self {
		Self::with_clock(ttl, Arc::new(SystemClock), producer)
	}

	/// Same as [`ExpiringSupplier::new`] with an explicit clock.
	pub fn with_clock(
		ttl: Duration,
		clock: Arc<dyn Clock>,
		producer: impl Fn() -> Result<T, E> + Send + Sync + 'static,
	) -> Self {
		Self { producer: Box::new(producer), ttl, clock, slot: RwLock::new(None) }
	}

	/// Returns the cached value, recomputing it when absent or expired.
	pub fn get(&self) -> Result<T, E> {
		let now = self.clock.now();

		if let Some(entry) = self.slot.read().as_ref() {
			if now - entry.stored_at < self.ttl {
				return Ok(entry.value.clone());
			}
		}

		tracing::debug!(ttl = %self.ttl, "Cached value absent or expired; recomputing.");

		// The producer runs without holding the slot lock.
		let value = (self.producer)()?;
		// Lifetime starts once the value exists, not when the refresh began.
		let stored_at = self.clock.now();

		*self.slot.write() = Some(Entry { value: value.clone(), stored_at });

		Ok(value)
	}

	/// Drops the cached value so the next [`get`](Self::get) recomputes it.
	pub fn invalidate(&self) {
		self.slot.write().take();
	}

	/// Returns `true` when a value is cached and still within its lifetime.
	pub fn is_fresh(&self) -> bool {
		let now = self.clock.now();

		self.slot.read().as_ref().is_some_and(|entry| now - entry.stored_at < self.ttl)
	}

	/// Configured lifetime of each cached value.
	pub fn ttl(&self) -> Duration {
		self.ttl
	}
}
impl<T, E> Debug for ExpiringSupplier<T, E> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ExpiringSupplier")
			.field("ttl", &self.ttl)
			.field("cached", &self.slot.read().is_some())
			.finish()
	}
}
