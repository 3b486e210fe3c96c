use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use lazy_holder::Lazy;

static BUILDS: AtomicUsize = AtomicUsize::new(0);

static COUNTRY_CODES: Lazy<HashMap<&'static str, u16>> = Lazy::new(|| {
   BUILDS.fetch_add(1, Ordering::SeqCst);
   HashMap::from([("nl", 31), ("de", 49), ("fr", 33)])
});

#[test]
fn test_static_lazy_derefs_and_builds_once() {
   let threads: Vec<_> = (0..8)
      .map(|_| thread::spawn(|| COUNTRY_CODES.get("de").copied()))
      .collect();
   for handle in threads {
      assert_eq!(handle.join().unwrap(), Some(49));
   }
   assert_eq!(COUNTRY_CODES.len(), 3);
   assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
}

#[test]
fn test_get_does_not_force() {
   let lazy = Lazy::new(|| 5);
   assert_eq!(Lazy::get(&lazy), None);
   assert_eq!(*Lazy::force(&lazy), 5);
   assert_eq!(Lazy::get(&lazy), Some(&5));
}

#[test]
fn test_panic_leaves_lazy_unforced() {
   let attempts = Arc::new(AtomicUsize::new(0));
   let lazy = {
      let attempts = Arc::clone(&attempts);
      Lazy::new(move || {
         if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("first build fails");
         }
         String::from("second build")
      })
   };

   assert!(panic::catch_unwind(AssertUnwindSafe(|| lazy.len())).is_err());
   assert_eq!(Lazy::get(&lazy), None);
   assert_eq!(lazy.as_str(), "second build");
   assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn test_default_and_debug() {
   let lazy: Lazy<Vec<u8>> = Lazy::default();
   assert_eq!(format!("{lazy:?}"), "Lazy(Slot(<uninit>))");
   assert!(lazy.is_empty());
   assert_eq!(format!("{lazy:?}"), "Lazy(Slot([]))");
}
