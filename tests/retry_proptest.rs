use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lazy_holder::{HolderError, SingletonHolder};
use proptest::prelude::*;

proptest! {
   #[test]
   fn test_failures_are_never_cached(outcomes in proptest::collection::vec(any::<bool>(), 0..24)) {
      // `outcomes[n]` decides whether the n-th factory run succeeds; runs
      // past the end always succeed.
      let outcomes = Arc::new(outcomes);
      let runs = Arc::new(AtomicUsize::new(0));
      let holder = {
         let outcomes = Arc::clone(&outcomes);
         let runs = Arc::clone(&runs);
         SingletonHolder::new(move || {
            let run = runs.fetch_add(1, Ordering::SeqCst);
            if outcomes.get(run).copied().unwrap_or(true) {
               Ok(run)
            } else {
               Err(run)
            }
         })
      };

      let leading_failures = outcomes.iter().take_while(|ok| !**ok).count();

      for expected in 0..leading_failures {
         prop_assert_eq!(holder.get_instance(), Err(HolderError::Construction(expected)));
         prop_assert!(!holder.is_initialized());
      }

      let published: *const usize = holder.get_instance().unwrap();
      prop_assert_eq!(holder.get(), Some(&leading_failures));

      for _ in 0..outcomes.len() + 2 {
         let again: *const usize = holder.get_instance().unwrap();
         prop_assert_eq!(published, again);
      }
      prop_assert_eq!(runs.load(Ordering::SeqCst), leading_failures + 1);
   }
}
