//! The instance slot.
//!
//! [`Slot<T>`] is an empty-or-value cell that is filled at most once while
//! shared. Checking whether it is filled is a single `Acquire` load; filling
//! it goes through the init lock in [`state`](crate::state), re-checks under
//! the lock, and publishes with a `Release` store.
//!
//! [`SingletonHolder`](crate::SingletonHolder) and [`Lazy`](crate::Lazy) are
//! built on top of it. Use `Slot` directly when the factory is naturally
//! supplied at the call site instead of at definition.

#[cfg(feature = "tracing")]
use core::any::type_name;
use core::cell::UnsafeCell;
use core::convert::Infallible;
#[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
use core::future::Future;
use core::sync::atomic::Ordering;
use core::{fmt, mem};
use std::time::{Duration, Instant};

use crate::error::HolderError;
use crate::state::{InitGuard, InitState, TimedOut};

/// A thread-safe slot which is filled at most once while shared.
pub struct Slot<T> {
   value: UnsafeCell<mem::MaybeUninit<T>>,
   state: InitState,
}

impl<T> Slot<T> {
   /// Creates an empty slot.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         state: InitState::new(),
         value: UnsafeCell::new(mem::MaybeUninit::uninit()),
      }
   }

   /// Creates a slot that already holds `value`.
   #[inline]
   #[must_use]
   pub const fn with_value(value: T) -> Self {
      Self {
         state: InitState::done(),
         value: UnsafeCell::new(mem::MaybeUninit::new(value)),
      }
   }

   /// Whether a value has been published. Never blocks.
   #[inline]
   pub fn is_initialized(&self) -> bool {
      self.state.is_done(Ordering::Acquire)
   }

   /// Returns the value if it has been published.
   ///
   /// Returns `None` while empty or while a construction is in flight. Never
   /// blocks and never constructs.
   #[inline]
   pub fn get(&self) -> Option<&T> {
      if self.is_initialized() {
         // SAFETY: the Acquire load above observed DONE, so the write of the
         // value happened-before this read and no writer remains.
         Some(unsafe { self.get_unchecked() })
      } else {
         None
      }
   }

   /// Mutable access to the value, if present.
   #[inline]
   pub fn get_mut(&mut self) -> Option<&mut T> {
      if self.is_initialized() {
         // SAFETY: initialized, and `&mut self` rules out other readers.
         Some(unsafe { self.value.get_mut().assume_init_mut() })
      } else {
         None
      }
   }

   /// Returns the value without checking that it was published.
   ///
   /// # Safety
   ///
   /// The slot must be initialized, e.g. checked through
   /// [`is_initialized`](Self::is_initialized) on the same thread.
   #[inline]
   pub unsafe fn get_unchecked(&self) -> &T {
      debug_assert!(self.is_initialized(), "get_unchecked called on an empty Slot");
      // SAFETY: the caller guarantees the slot is initialized.
      unsafe { (*self.value.get()).assume_init_ref() }
   }

   /// Fills the slot with `value` without blocking.
   ///
   /// Fails with `Err(value)` if the slot is already filled or if another
   /// caller is constructing right now.
   #[inline]
   pub fn try_set(&self, value: T) -> Result<&T, T> {
      let Some(guard) = self.state.try_lock() else {
         return Err(value);
      };
      // SAFETY: holding the init lock gives exclusive write access.
      let stored = unsafe { (*self.value.get()).write(value) };
      guard.commit();
      Ok(stored)
   }

   /// Fills the slot with `value`, waiting out any in-flight construction.
   ///
   /// Returns `Err(value)` if the slot ended up filled by someone else.
   #[inline]
   pub fn set(&self, value: T) -> Result<(), T> {
      let mut pending = Some(value);
      self.get_or_init(|| {
         // `pending` is only emptied here, and this closure runs at most once.
         match pending.take() {
            Some(value) => value,
            None => unreachable!("initializer closure ran twice"),
         }
      });
      match pending {
         None => Ok(()),
         Some(value) => Err(value),
      }
   }

   /// Returns the value, constructing it with `f` if the slot is empty.
   ///
   /// Among concurrent callers exactly one runs `f`; the rest wait for it.
   /// If `f` panics the slot stays empty and a waiting caller takes over.
   #[inline]
   pub fn get_or_init<F>(&self, f: F) -> &T
   where
      F: FnOnce() -> T,
   {
      if let Some(value) = self.get() {
         return value;
      }
      match self.initialize(|| Ok::<T, Infallible>(f())) {
         Ok(()) => {}
         Err(never) => match never {},
      }
      // SAFETY: `initialize` returned Ok, so the slot is initialized.
      unsafe { self.get_unchecked() }
   }

   /// Returns the value, constructing it with the fallible `f` if empty.
   ///
   /// On `Err(e)` the slot stays empty, `e` goes to this caller only, and the
   /// next call tries again.
   pub fn get_or_try_init<F, E>(&self, f: F) -> Result<&T, E>
   where
      F: FnOnce() -> Result<T, E>,
   {
      if let Some(value) = self.get() {
         return Ok(value);
      }
      self.initialize(f)?;
      // SAFETY: `initialize` returned Ok, so the slot is initialized.
      Ok(unsafe { self.get_unchecked() })
   }

   /// Like [`get_or_try_init`](Self::get_or_try_init), but waits at most
   /// `timeout` for another caller's in-flight construction.
   ///
   /// The timeout only bounds waiting. Once this caller takes the init lock,
   /// `f` runs to completion.
   pub fn get_or_try_init_timeout<F, E>(&self, timeout: Duration, f: F) -> Result<&T, HolderError<E>>
   where
      F: FnOnce() -> Result<T, E>,
   {
      if let Some(value) = self.get() {
         return Ok(value);
      }
      let deadline = Instant::now().checked_add(timeout);
      match self.state.lock_until(deadline) {
         Ok(Some(guard)) => self.construct(guard, f).map_err(HolderError::Construction)?,
         Ok(None) => {}
         Err(TimedOut) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(
               instance = type_name::<T>(),
               ?timeout,
               "gave up waiting for in-flight construction"
            );
            return Err(HolderError::Timeout(timeout));
         }
      }
      // SAFETY: either we published the value or someone else had.
      Ok(unsafe { self.get_unchecked() })
   }

   /// Async version of [`get_or_init`](Self::get_or_init).
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   #[inline]
   pub async fn get_or_init_async<F, Fut>(&self, f: F) -> &T
   where
      F: FnOnce() -> Fut,
      Fut: Future<Output = T>,
   {
      if let Some(value) = self.get() {
         return value;
      }
      let init = self.initialize_async(move || async move { Ok::<T, Infallible>(f().await) });
      match init.await {
         Ok(()) => {}
         Err(never) => match never {},
      }
      // SAFETY: `initialize_async` returned Ok, so the slot is initialized.
      unsafe { self.get_unchecked() }
   }

   /// Async version of [`get_or_try_init`](Self::get_or_try_init).
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub async fn get_or_try_init_async<F, Fut, E>(&self, f: F) -> Result<&T, E>
   where
      F: FnOnce() -> Fut,
      Fut: Future<Output = Result<T, E>>,
   {
      if let Some(value) = self.get() {
         return Ok(value);
      }
      self.initialize_async(f).await?;
      // SAFETY: `initialize_async` returned Ok, so the slot is initialized.
      Ok(unsafe { self.get_unchecked() })
   }

   /// Empties the slot and returns the value it held.
   #[inline]
   pub fn take(&mut self) -> Option<T> {
      if self.state.set_uninit() {
         // SAFETY: the slot was initialized and is now marked empty, so the
         // value is moved out exactly once. `&mut self` excludes readers.
         Some(unsafe { self.value.get_mut().assume_init_read() })
      } else {
         None
      }
   }

   /// Consumes the slot, returning the value if present.
   #[inline]
   pub fn into_inner(mut self) -> Option<T> {
      self.take()
   }

   /// Slow path of the blocking accessors.
   #[cold]
   fn initialize<F, E>(&self, f: F) -> Result<(), E>
   where
      F: FnOnce() -> Result<T, E>,
   {
      // Second check: `lock` returns None if someone published while we
      // were getting here.
      let Some(guard) = self.state.lock() else {
         return Ok(());
      };
      self.construct(guard, f)
   }

   /// Runs the factory under the init lock and publishes its value.
   fn construct<F, E>(&self, guard: InitGuard<'_>, f: F) -> Result<(), E>
   where
      F: FnOnce() -> Result<T, E>,
   {
      #[cfg(feature = "tracing")]
      tracing::debug!(instance = type_name::<T>(), "constructing instance");

      // An error returns here and drops the guard, which resets the state
      // and wakes waiters.
      let value = f().inspect_err(|_| Self::log_failure())?;
      // SAFETY: the guard proves we hold the init lock.
      unsafe { (*self.value.get()).write(value) };
      guard.commit();

      #[cfg(feature = "tracing")]
      tracing::debug!(instance = type_name::<T>(), "instance published");
      Ok(())
   }

   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   #[cold]
   async fn initialize_async<F, Fut, E>(&self, f: F) -> Result<(), E>
   where
      F: FnOnce() -> Fut,
      Fut: Future<Output = Result<T, E>>,
   {
      let Some(guard) = self.state.lock_async().await else {
         return Ok(());
      };

      #[cfg(feature = "tracing")]
      tracing::debug!(instance = type_name::<T>(), "constructing instance");

      let value = f().await.inspect_err(|_| Self::log_failure())?;
      // SAFETY: the guard proves we hold the init lock.
      unsafe { (*self.value.get()).write(value) };
      guard.commit();

      #[cfg(feature = "tracing")]
      tracing::debug!(instance = type_name::<T>(), "instance published");
      Ok(())
   }

   #[inline]
   fn log_failure() {
      #[cfg(feature = "tracing")]
      tracing::warn!(
         instance = type_name::<T>(),
         "construction failed, slot left uninitialized"
      );
   }
}

// SAFETY: sharing the slot hands out `&T` to many threads (`T: Sync`) and
// lets any of them construct or drop the value (`T: Send`).
unsafe impl<T: Sync + Send> Sync for Slot<T> {}
// SAFETY: moving the slot moves the `T` it may hold.
unsafe impl<T: Send> Send for Slot<T> {}

impl<T> Default for Slot<T> {
   #[inline]
   fn default() -> Self {
      Self::new()
   }
}

impl<T> From<T> for Slot<T> {
   #[inline]
   fn from(value: T) -> Self {
      Self::with_value(value)
   }
}

impl<T: Clone> Clone for Slot<T> {
   /// Clones the published value, if any. An in-flight construction is not
   /// waited for; the clone is simply empty.
   fn clone(&self) -> Self {
      match self.get() {
         Some(value) => Self::with_value(value.clone()),
         None => Self::new(),
      }
   }
}

impl<T: fmt::Debug> fmt::Debug for Slot<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("Slot");
      match self.get() {
         Some(v) => d.field(v),
         None => d.field(&format_args!("<uninit>")),
      };
      d.finish()
   }
}

impl<T> Drop for Slot<T> {
   #[inline]
   fn drop(&mut self) {
      if self.is_initialized() {
         // SAFETY: initialized, and `&mut self` means nobody else can
         // observe the value again.
         unsafe { self.value.get_mut().assume_init_drop() };
      }
   }
}
