use std::{fmt, sync::Arc};

use parking_lot::Mutex;

/// An ordered set of listeners, identified by pointer.
///
/// Listeners are notified in insertion order. Adding the same [Arc] twice has no effect.
/// The set is snapshotted before each notification, so a listener may add or remove
/// listeners (including itself) from inside a callback; the change applies to the next notification.
pub struct ObserverSet<T: ?Sized> {
	observers: Mutex<Vec<Arc<T>>>,
}

impl<T: ?Sized> ObserverSet<T> {
	pub fn new() -> Self {
		Self {
			observers: Mutex::new(Vec::new()),
		}
	}

	/// Add a listener, returning false if it was already present.
	pub fn add(&self, observer: Arc<T>) -> bool {
		let mut observers = self.observers.lock();
		if observers.iter().any(|existing| Arc::ptr_eq(existing, &observer)) {
			return false;
		}

		observers.push(observer);
		true
	}

	/// Remove a listener, returning false if it wasn't present.
	pub fn remove(&self, observer: &Arc<T>) -> bool {
		let mut observers = self.observers.lock();
		let len = observers.len();
		observers.retain(|existing| !Arc::ptr_eq(existing, observer));
		observers.len() != len
	}

	pub fn len(&self) -> usize {
		self.observers.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.observers.lock().is_empty()
	}

	/// Call `f` for each listener, in insertion order.
	pub fn notify<F: FnMut(&T)>(&self, mut f: F) {
		// Don't hold the lock while calling out.
		let snapshot = self.observers.lock().clone();
		for observer in snapshot.iter() {
			f(observer);
		}
	}
}

impl<T: ?Sized> Default for ObserverSet<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: ?Sized> fmt::Debug for ObserverSet<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ObserverSet").field("len", &self.len()).finish()
	}
}

#[cfg(test)]
mod test {
	use super::*;

	trait Named: Send + Sync {
		fn name(&self) -> &str;
	}

	struct Listener(&'static str);

	impl Named for Listener {
		fn name(&self) -> &str {
			self.0
		}
	}

	#[test]
	fn insertion_order() {
		let set = ObserverSet::<dyn Named>::new();
		let a: Arc<dyn Named> = Arc::new(Listener("a"));
		let b: Arc<dyn Named> = Arc::new(Listener("b"));
		let c: Arc<dyn Named> = Arc::new(Listener("c"));

		assert!(set.add(b.clone()));
		assert!(set.add(a.clone()));
		assert!(set.add(c.clone()));

		let mut names = Vec::new();
		set.notify(|observer| names.push(observer.name().to_string()));
		assert_eq!(names, ["b", "a", "c"]);
	}

	#[test]
	fn identity() {
		let set = ObserverSet::<dyn Named>::new();
		let a: Arc<dyn Named> = Arc::new(Listener("same"));
		let b: Arc<dyn Named> = Arc::new(Listener("same"));

		assert!(set.add(a.clone()));
		assert!(!set.add(a.clone()));

		// Equal contents but a different allocation.
		assert!(set.add(b.clone()));
		assert_eq!(set.len(), 2);

		assert!(set.remove(&a));
		assert!(!set.remove(&a));
		assert_eq!(set.len(), 1);
	}

	#[test]
	fn remove_during_notify() {
		let set = Arc::new(ObserverSet::<dyn Named>::new());
		let a: Arc<dyn Named> = Arc::new(Listener("a"));
		let b: Arc<dyn Named> = Arc::new(Listener("b"));
		set.add(a.clone());
		set.add(b.clone());

		let mut seen = Vec::new();
		set.notify(|observer| {
			seen.push(observer.name().to_string());
			set.remove(&b);
		});

		// The snapshot still included b.
		assert_eq!(seen, ["a", "b"]);
		assert_eq!(set.len(), 1);
	}
}
