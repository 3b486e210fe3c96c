//! The singleton holder.
//!
//! [`SingletonHolder<T, F>`] pairs a [`Slot<T>`] with the factory that fills
//! it. The factory is fixed where the holder is defined, so callers only ever
//! ask for the instance:
//!
//! ```rust
//! use lazy_holder::SingletonHolder;
//!
//! struct Pool { size: usize }
//!
//! let pool = SingletonHolder::new(|| Ok::<_, std::io::Error>(Pool { size: 8 }));
//! assert_eq!(pool.get_instance().unwrap().size, 8);
//! ```
//!
//! A failed construction is never cached: the holder stays uninitialized and
//! the next [`get_instance`](SingletonHolder::get_instance) runs the factory
//! again.

use core::fmt;
use std::time::Duration;

use crate::error::HolderError;
use crate::slot::Slot;

/// Owns one lazily constructed, shared instance of `T`.
///
/// `F` is the factory, `Fn() -> Result<T, E>`. It is kept for the life of
/// the holder so a failed construction can be retried.
pub struct SingletonHolder<T, F> {
   slot: Slot<T>,
   factory: F,
}

impl<T, F> SingletonHolder<T, F> {
   /// Creates an uninitialized holder. Nothing is constructed until the
   /// first [`get_instance`](Self::get_instance).
   #[inline]
   #[must_use]
   pub const fn new(factory: F) -> Self {
      Self {
         slot: Slot::new(),
         factory,
      }
   }

   /// Creates a holder that already owns `instance`. `factory` is only used
   /// again after [`take`](Self::take).
   #[inline]
   #[must_use]
   pub const fn with_instance(instance: T, factory: F) -> Self {
      Self {
         slot: Slot::with_value(instance),
         factory,
      }
   }

   /// Whether the instance has been published. Never blocks.
   #[inline]
   pub fn is_initialized(&self) -> bool {
      self.slot.is_initialized()
   }

   /// The instance, if already constructed. Never blocks or constructs.
   #[inline]
   pub fn get(&self) -> Option<&T> {
      self.slot.get()
   }

   /// The factory this holder constructs with.
   #[inline]
   pub fn factory(&self) -> &F {
      &self.factory
   }

   /// Removes the instance, returning the holder to uninitialized.
   ///
   /// The next [`get_instance`](Self::get_instance) runs the factory again.
   #[inline]
   pub fn take(&mut self) -> Option<T> {
      self.slot.take()
   }

   /// Consumes the holder, returning the instance if it was constructed.
   #[inline]
   pub fn into_inner(self) -> Option<T> {
      self.slot.into_inner()
   }
}

impl<T, E, F> SingletonHolder<T, F>
where
   F: Fn() -> Result<T, E>,
{
   /// Returns the shared instance, constructing it on the first call.
   ///
   /// After the first success this is one atomic load. Callers that arrive
   /// while construction is running block until it finishes. If the factory
   /// fails, the caller that ran it gets [`HolderError::Construction`] and
   /// the holder stays uninitialized; a caller that was waiting on that
   /// attempt runs the factory itself.
   #[inline]
   pub fn get_instance(&self) -> Result<&T, HolderError<E>> {
      self
         .slot
         .get_or_try_init(&self.factory)
         .map_err(HolderError::Construction)
   }

   /// Like [`get_instance`](Self::get_instance), but waits at most `timeout`
   /// for another caller's construction to finish.
   ///
   /// Returns [`HolderError::Timeout`] if it is still running after that. A
   /// construction started by this call is never cut short.
   #[inline]
   pub fn get_instance_timeout(&self, timeout: Duration) -> Result<&T, HolderError<E>> {
      self.slot.get_or_try_init_timeout(timeout, &self.factory)
   }

   /// Returns the shared instance from async code.
   ///
   /// The factory itself is synchronous; only the wait for another caller's
   /// construction yields to the runtime.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub async fn get_instance_async(&self) -> Result<&T, HolderError<E>> {
      self
         .slot
         .get_or_try_init_async(|| async { (self.factory)() })
         .await
         .map_err(HolderError::Construction)
   }
}

impl<T: fmt::Debug, F> fmt::Debug for SingletonHolder<T, F> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("SingletonHolder")
         .field("instance", &self.slot)
         .finish_non_exhaustive()
   }
}
