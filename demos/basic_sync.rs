use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};

use lazy_holder::SingletonHolder;

static CONSTRUCTIONS: AtomicUsize = AtomicUsize::new(0);

struct Settings {
   region: String,
   max_connections: u32,
}

fn load_settings() -> Result<Settings, Infallible> {
   // This function runs only once
   CONSTRUCTIONS.fetch_add(1, Ordering::Relaxed);
   println!("Loading settings...");
   // Simulate work
   std::thread::sleep(std::time::Duration::from_millis(50));
   Ok(Settings {
      region: "eu-west".to_string(),
      max_connections: 64,
   })
}

static SETTINGS: SingletonHolder<Settings, fn() -> Result<Settings, Infallible>> =
   SingletonHolder::new(load_settings);

fn main() {
   let threads: Vec<_> = (0..5)
      .map(|i| {
         std::thread::spawn(move || {
            let settings = SETTINGS.get_instance().unwrap();
            println!("Thread {i}: region={} ({:p})", settings.region, settings);
         })
      })
      .collect();

   for t in threads {
      t.join().unwrap();
   }

   assert_eq!(CONSTRUCTIONS.load(Ordering::Relaxed), 1); // Factory ran only once
   let settings = SETTINGS.get_instance().unwrap();
   println!("Final settings: {} / {}", settings.region, settings.max_connections);
}
