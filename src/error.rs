//! Errors returned by the holder accessors.

use std::time::Duration;

use thiserror::Error;

/// Why an accessor could not hand out the instance.
///
/// Neither variant leaves anything behind: the holder stays uninitialized
/// and the next call is free to try again.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HolderError<E> {
   /// The factory ran on this caller's attempt and failed.
   #[error("singleton construction failed")]
   Construction(#[source] E),

   /// Another caller's construction was still running when the wait limit
   /// passed.
   #[error("timed out after {0:?} waiting for in-flight construction")]
   Timeout(Duration),
}

impl<E> HolderError<E> {
   /// Returns the factory error, if this is a construction failure.
   pub fn into_construction(self) -> Option<E> {
      match self {
         Self::Construction(e) => Some(e),
         Self::Timeout(_) => None,
      }
   }

   /// `true` for [`HolderError::Timeout`].
   pub fn is_timeout(&self) -> bool {
      matches!(self, Self::Timeout(_))
   }
}
