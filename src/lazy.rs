//! Infallible lazy value.
//!
//! [`Lazy<T, F>`] is the holder for factories that cannot fail. It derefs
//! straight to the value, which makes it the natural choice for a `static`:
//!
//! ```rust
//! use lazy_holder::Lazy;
//!
//! static GREETING: Lazy<String> = Lazy::new(|| "hello".to_uppercase());
//!
//! assert_eq!(GREETING.as_str(), "HELLO");
//! ```

use core::fmt;
use core::ops::Deref;

use crate::slot::Slot;

/// A value constructed by `F` on first access.
///
/// If `F` panics, the panic reaches the caller that ran it and the value
/// stays unconstructed; the next access runs `F` again.
pub struct Lazy<T, F = fn() -> T> {
   slot: Slot<T>,
   init: F,
}

impl<T, F> Lazy<T, F> {
   /// Creates a lazy value that will be built by `init`.
   #[inline]
   #[must_use]
   pub const fn new(init: F) -> Self {
      Self {
         slot: Slot::new(),
         init,
      }
   }

   /// The value, if it was already constructed.
   #[inline]
   pub fn get(this: &Self) -> Option<&T> {
      this.slot.get()
   }
}

impl<T, F: Fn() -> T> Lazy<T, F> {
   /// Forces construction and returns the value.
   #[inline]
   pub fn force(this: &Self) -> &T {
      this.slot.get_or_init(|| (this.init)())
   }
}

impl<T, F: Fn() -> T> Deref for Lazy<T, F> {
   type Target = T;

   #[inline]
   fn deref(&self) -> &T {
      Lazy::force(self)
   }
}

impl<T: Default> Default for Lazy<T> {
   fn default() -> Self {
      Self::new(T::default)
   }
}

impl<T: fmt::Debug, F> fmt::Debug for Lazy<T, F> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_tuple("Lazy").field(&self.slot).finish()
   }
}
