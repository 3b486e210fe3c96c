//! Initialization state shared by every holder type.
//!
//! The state is packed into a single `AtomicU8`:
//! - Bit 0: DONE - the slot holds a published value
//! - Bit 1: LOCKED - a caller is running the factory
//! - Bit 2: WAITING - at least one caller is parked on the state word
//! - Bits 3-7: EPOCH - bumped on every publish/reset so parked callers never
//!   miss a transition
//!
//! Readers only ever need an `Acquire` load of the DONE bit. Writers go
//! through [`InitGuard`], which publishes with a `Release` swap.

use core::mem;
use core::sync::atomic::{AtomicU8, Ordering};
#[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
use std::time::Duration;
use std::time::Instant;

use parking_lot_core::{ParkResult, DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

/// First and last sleep of the async timer backoff.
#[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
const ASYNC_BACKOFF_MIN: Duration = Duration::from_micros(50);
#[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
const ASYNC_BACKOFF_MAX: Duration = Duration::from_millis(10);

/// `block_in_place` panics outside a multi-thread runtime.
#[cfg(feature = "async-tokio-mt")]
fn can_block_in_place() -> bool {
   use tokio::runtime::{Handle, RuntimeFlavor};

   Handle::try_current().is_ok_and(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread)
}

/// Returned by [`InitState::lock_until`] when the deadline passes while
/// another caller still holds the init lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TimedOut;

/// Atomic state word of a slot.
#[repr(transparent)]
pub(crate) struct InitState(AtomicU8);

impl InitState {
   const DONE: u8 = 1;
   const LOCKED: u8 = 2;
   const WAITING: u8 = 4;
   const EPOCH_1: u8 = 8;
   const EPOCH_MASK: u8 = !(Self::DONE | Self::LOCKED | Self::WAITING);

   #[inline(always)]
   const fn next_epoch(current: u8) -> u8 {
      (current & Self::EPOCH_MASK).wrapping_add(Self::EPOCH_1) & Self::EPOCH_MASK
   }

   /// Uninitialized, unlocked, nobody waiting.
   #[inline]
   pub(crate) const fn new() -> Self {
      Self(AtomicU8::new(0))
   }

   /// Already initialized; used for eagerly constructed slots.
   #[inline]
   pub(crate) const fn done() -> Self {
      Self(AtomicU8::new(Self::DONE))
   }

   #[inline]
   fn key(&self) -> usize {
      self.0.as_ptr() as usize
   }

   #[inline]
   fn notify_all(&self) {
      // SAFETY: `key` is the address of our own state word, which is the
      // same key every parked caller used.
      unsafe {
         parking_lot_core::unpark_all(self.key(), DEFAULT_UNPARK_TOKEN);
      }
   }

   /// Parks the calling thread while the state still equals `expected`.
   ///
   /// Returns `false` only if `deadline` passed before a wake-up. Spurious
   /// wake-ups return `true`; callers re-check the state either way.
   #[inline]
   fn wait(&self, expected: u8, deadline: Option<Instant>) -> bool {
      #[cfg(feature = "tracing")]
      tracing::trace!(state = expected, "parking until in-flight construction finishes");

      // SAFETY: see `notify_all`. The validate closure runs under the
      // parking_lot bucket lock, so a concurrent `notify_all` cannot slip
      // between the check and the sleep.
      let result = unsafe {
         parking_lot_core::park(
            self.key(),
            || self.0.load(Ordering::Acquire) == expected,
            || {},
            |_, _| {},
            DEFAULT_PARK_TOKEN,
            deadline,
         )
      };
      !matches!(result, ParkResult::TimedOut)
   }

   /// Publishes DONE and wakes parked callers.
   ///
   /// Returns `true` if the state was not DONE before.
   #[inline]
   pub(crate) fn set_done(&self) -> bool {
      let current = self.0.load(Ordering::Relaxed);
      let next = Self::DONE | Self::next_epoch(current);

      // Release: the write of the value into the slot happens-before any
      // Acquire load that observes DONE.
      let prev = self.0.swap(next, Ordering::Release);
      if prev & Self::WAITING != 0 {
         self.notify_all();
      }
      prev & Self::DONE == 0
   }

   /// Clears DONE and LOCKED and wakes parked callers.
   ///
   /// Returns `true` if the state was DONE before.
   #[inline]
   pub(crate) fn set_uninit(&self) -> bool {
      let current = self.0.load(Ordering::Relaxed);
      let next = Self::next_epoch(current);

      let prev = self.0.swap(next, Ordering::Release);
      if prev & Self::WAITING != 0 {
         self.notify_all();
      }
      prev & Self::DONE != 0
   }

   /// Fast-path check. Pass `Ordering::Acquire` before touching the value.
   #[inline]
   pub(crate) fn is_done(&self, ordering: Ordering) -> bool {
      self.0.load(ordering) & Self::DONE != 0
   }

   /// One attempt at taking the init lock.
   ///
   /// - `Ok(None)`: already initialized.
   /// - `Ok(Some(guard))`: lock taken, the caller must construct.
   /// - `Err(state)`: someone else holds the lock; `state` is what to wait on.
   ///
   /// With `nowait` the WAITING bit is never set.
   #[inline]
   fn lock_step(&self, nowait: bool) -> Result<Option<InitGuard<'_>>, u8> {
      loop {
         // Acquire: on the DONE branch the caller reads the value next.
         let current = self.0.load(Ordering::Acquire);
         if current & Self::DONE != 0 {
            return Ok(None);
         }

         if current & Self::LOCKED == 0 {
            match self.0.compare_exchange_weak(
               current,
               current | Self::LOCKED,
               Ordering::Acquire,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Ok(Some(InitGuard::new(self))),
               Err(_) => {
                  core::hint::spin_loop();
                  continue;
               }
            }
         }

         if !nowait && current & Self::WAITING == 0 {
            let waiting = current | Self::WAITING;
            match self.0.compare_exchange_weak(
               current,
               waiting,
               Ordering::Relaxed,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Err(waiting),
               Err(_) => {
                  core::hint::spin_loop();
                  continue;
               }
            }
         }
         return Err(current);
      }
   }

   /// Takes the init lock, parking while another caller holds it.
   ///
   /// Returns `None` once the slot is initialized.
   #[inline]
   pub(crate) fn lock(&self) -> Option<InitGuard<'_>> {
      match self.lock_until(None) {
         Ok(guard) => guard,
         Err(TimedOut) => unreachable!("park without a deadline cannot time out"),
      }
   }

   /// Like [`lock`](Self::lock), but gives up once `deadline` passes.
   pub(crate) fn lock_until(&self, deadline: Option<Instant>) -> Result<Option<InitGuard<'_>>, TimedOut> {
      let mut observed = match self.lock_step(false) {
         Ok(guard) => return Ok(guard),
         Err(state) => state,
      };
      loop {
         if !self.wait(observed, deadline) {
            // One last look: the holder may have finished right at the deadline.
            return self.lock_step(true).map_err(|_| TimedOut);
         }
         match self.lock_step(false) {
            Ok(guard) => return Ok(guard),
            Err(state) => observed = state,
         }
      }
   }

   /// Takes the init lock from async code.
   ///
   /// Yields to the runtime while the lock is held. After that, a
   /// multi-thread runtime parks inside `block_in_place`; any other runtime
   /// polls the state on a timer with exponential backoff, since blocking
   /// there would stall the task that holds the lock.
   #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
   pub(crate) async fn lock_async(&self) -> Option<InitGuard<'_>> {
      for _ in 0..16 {
         match self.lock_step(false) {
            Ok(guard) => return guard,
            Err(state) => {
               for _ in 0..32 {
                  tokio::task::yield_now().await;
                  if self.0.load(Ordering::Relaxed) != state {
                     break;
                  }
               }
            }
         }
      }

      #[cfg(feature = "async-tokio-mt")]
      {
         if can_block_in_place() {
            return match self.lock_step(false) {
               Ok(guard) => guard,
               Err(state) => tokio::task::block_in_place(|| {
                  self.wait(state, None);
                  self.lock()
               }),
            };
         }
      }

      let mut backoff = ASYNC_BACKOFF_MIN;
      loop {
         match self.lock_step(true) {
            Ok(guard) => return guard,
            Err(_) => {
               #[cfg(feature = "tracing")]
               tracing::trace!(?backoff, "init lock held, backing off");
               tokio::time::sleep(backoff).await;
               backoff = (backoff * 2).min(ASYNC_BACKOFF_MAX);
            }
         }
      }
   }

   /// Takes the init lock only if nobody holds it and the slot is empty.
   #[inline]
   pub(crate) fn try_lock(&self) -> Option<InitGuard<'_>> {
      self.lock_step(true).ok().flatten()
   }
}

/// Proof that the caller holds the init lock.
///
/// [`commit`](Self::commit) publishes DONE. Dropping the guard instead (a
/// factory error or panic) resets the state to uninitialized and wakes
/// waiters so one of them can retry.
pub(crate) struct InitGuard<'a> {
   state: &'a InitState,
}

impl<'a> InitGuard<'a> {
   #[inline(always)]
   const fn new(state: &'a InitState) -> Self {
      Self { state }
   }

   /// Publishes DONE, consumes the guard and wakes waiters.
   #[inline(always)]
   pub(crate) fn commit(self) -> bool {
      let first = self.state.set_done();
      mem::forget(self);
      first
   }
}

impl Drop for InitGuard<'_> {
   #[inline(always)]
   fn drop(&mut self) {
      self.state.set_uninit();
   }
}
