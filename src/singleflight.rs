//! Keyed single-flight execution shared by both coordinators.
//!
//! [`Singleflight::run_exclusive`] guarantees that at most one execution
//! tagged with a given key is outstanding at any time: the first caller (the
//! leader) runs the operation, every concurrent caller attaches to the same
//! eventual result, and the outstanding marker is cleared once the execution
//! settles so the next call starts fresh. Waiters are woken in the order they
//! attached. The token-refresh protocol and the STS credential fetch are both
//! specializations of this primitive; neither re-implements the race.

// self
use crate::_prelude::*;

/// One outstanding (or settled) execution that concurrent callers share.
///
/// Ownership of the flight is shared by every caller that observed it;
/// the flight lives until it settles and all joiners have read the result.
#[derive(Debug)]
pub struct Flight<T, E>(Arc<AsyncOnceCell<Result<T, E>>>);
impl<T, E> Flight<T, E> {
	fn new() -> Self {
		Self(Arc::new(AsyncOnceCell::new()))
	}
}
impl<T, E> Flight<T, E>
where
	T: Clone,
	E: Clone,
{
	/// Suspends until the flight settles, then returns its shared outcome.
	pub async fn join(&self) -> Result<T, E> {
		self.0.wait().await.clone()
	}
}
impl<T, E> Clone for Flight<T, E> {
	fn clone(&self) -> Self {
		Self(Arc::clone(&self.0))
	}
}

/// Keyed single-flight coordinator.
///
/// One instance is shared per process (it lives inside the coordinator that
/// owns the protected operation); callers never mutate the flight map
/// directly.
#[derive(Debug)]
pub struct Singleflight<T, E> {
	flights: Mutex<HashMap<String, Flight<T, E>>>,
}
impl<T, E> Singleflight<T, E> {
	/// Returns the outstanding flight for `key`, if one exists.
	///
	/// This is the queueing hook: a caller that must not dispatch while an
	/// execution is in progress joins the returned flight instead.
	pub fn current(&self, key: &str) -> Option<Flight<T, E>> {
		self.flights.lock().get(key).cloned()
	}
}
impl<T, E> Singleflight<T, E>
where
	T: Clone,
	E: Clone,
{
	/// Runs `op` under single-flight semantics for `key`.
	///
	/// If no execution tagged `key` is outstanding, `op` runs and its settled
	/// result (success or failure) is published to every caller that attached
	/// in the meantime. If one is outstanding, this call joins it and `op` is
	/// never invoked. Cancellation is not supported: driving the leader's
	/// future to completion is what settles the flight for every joiner.
	pub async fn run_exclusive<F, Fut>(&self, key: &str, op: F) -> Result<T, E>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<T, E>>,
	{
		let (flight, leader) = {
			let mut flights = self.flights.lock();

			match flights.get(key) {
				Some(flight) => (flight.clone(), false),
				None => {
					let flight = Flight::new();

					flights.insert(key.to_owned(), flight.clone());

					(flight, true)
				},
			}
		};

		if !leader {
			return flight.join().await;
		}

		let outcome = op().await;
		let _ = flight.0.set(outcome.clone()).await;

		// Clear the marker only if it still points at this flight; a stale
		// removal must never evict a newer epoch's execution.
		let mut flights = self.flights.lock();

		if let Some(current) = flights.get(key)
			&& Arc::ptr_eq(&current.0, &flight.0)
		{
			flights.remove(key);
		}

		outcome
	}
}
impl<T, E> Default for Singleflight<T, E> {
	fn default() -> Self {
		Self { flights: Mutex::new(HashMap::new()) }
	}
}
