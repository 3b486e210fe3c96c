use std::sync::atomic::{AtomicBool, Ordering};

use lazy_holder::{HolderError, SingletonHolder};

static BACKEND_UP: AtomicBool = AtomicBool::new(false);

fn connect() -> Result<String, &'static str> {
   println!("Attempting connection (backend up={})...", BACKEND_UP.load(Ordering::Relaxed));
   if BACKEND_UP.load(Ordering::Relaxed) {
      Ok("connection established".to_string())
   } else {
      Err("backend unreachable")
   }
}

fn main() {
   let connection = SingletonHolder::new(connect);

   // First attempt fails
   match connection.get_instance() {
      Ok(_) => panic!("Should have failed"),
      Err(HolderError::Construction(e)) => println!("Caught error: {e}"),
      Err(e) => panic!("Unexpected error: {e}"),
   }
   assert!(!connection.is_initialized()); // Still uninitialized

   // Second attempt succeeds
   BACKEND_UP.store(true, Ordering::Relaxed);
   match connection.get_instance() {
      Ok(c) => println!("Got: {c}"),
      Err(_) => panic!("Should have succeeded"),
   }
   assert!(connection.is_initialized());

   // Later failures of the backend no longer matter; the instance is published
   BACKEND_UP.store(false, Ordering::Relaxed);
   match connection.get_instance() {
      Ok(c) => println!("Got again: {c}"),
      Err(_) => panic!("Should have returned existing connection"),
   }
}
