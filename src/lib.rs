//! Thread-safe, lazily initialized singleton holders.
//!
//! The crate revolves around one operation: hand every caller the same
//! instance of a value, building it on first use and only on first use.
//!
//! - [`SingletonHolder<T, F>`]: owns a fallible factory and the instance it
//!   produces. [`get_instance`](SingletonHolder::get_instance) constructs on
//!   the first call and returns the published instance afterwards.
//! - [`Lazy<T, F>`]: the same for factories that cannot fail, with `Deref`.
//! - [`Slot<T>`]: the bare instance slot, for when the factory is supplied at
//!   each call site.
//!
//! All three use double-checked publication over a single atomic state word:
//! a lock-free `Acquire` load on the fast path, and on the slow path an init
//! lock, a re-check, construction, and a `Release` publish. Callers that race
//! the first construction park on the state word via `parking_lot_core`
//! until it finishes.
//!
//! # Failed construction
//!
//! A factory error goes to the caller that ran it, wrapped in
//! [`HolderError::Construction`]. Nothing is cached: the holder stays
//! uninitialized and the next call runs the factory again. Panics behave the
//! same way and never poison the holder.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//!
//! use lazy_holder::SingletonHolder;
//!
//! #[derive(Debug)]
//! struct Registry { name: &'static str }
//!
//! let holder = Arc::new(SingletonHolder::new(|| {
//!    Ok::<_, std::io::Error>(Registry { name: "main" })
//! }));
//!
//! let handles: Vec<_> = (0..4)
//!    .map(|_| {
//!       let holder = Arc::clone(&holder);
//!       thread::spawn(move || holder.get_instance().map(|r| r as *const Registry as usize).unwrap())
//!    })
//!    .collect();
//! let addrs: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
//! assert!(addrs.windows(2).all(|w| w[0] == w[1]));
//! assert_eq!(holder.get().unwrap().name, "main");
//! ```
//!
//! # Features
//!
//! - `async-tokio-mt` (default) / `async-tokio`: async accessors that yield
//!   to tokio while another task constructs.
//! - `tracing` (default): `tracing` events on construction, failure and
//!   timed-out waits.

/// Error type of the fallible accessors.
mod error;

/// Infallible lazy value.
mod lazy;

/// The singleton holder.
mod holder;

/// The instance slot.
mod slot;

/// Atomic init state and the init lock.
mod state;

pub use error::HolderError;
pub use holder::SingletonHolder;
pub use lazy::Lazy;
pub use slot::Slot;
