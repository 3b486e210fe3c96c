use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lazy_holder::SingletonHolder;

static CONSTRUCTIONS: AtomicUsize = AtomicUsize::new(0);

#[tokio::main]
async fn main() {
   let client = Arc::new(SingletonHolder::new(|| {
      CONSTRUCTIONS.fetch_add(1, Ordering::Relaxed);
      println!("Building client...");
      std::thread::sleep(std::time::Duration::from_millis(50));
      Ok::<_, std::io::Error>(String::from("client#1"))
   }));

   let tasks: Vec<_> = (0..5)
      .map(|i| {
         let client = Arc::clone(&client);
         tokio::spawn(async move {
            match client.get_instance_async().await {
               Ok(c) => println!("Task {i} using {c}"),
               Err(e) => println!("Task {i} failed: {e}"),
            }
         })
      })
      .collect();

   for t in tasks {
      t.await.unwrap();
   }

   assert_eq!(client.get().map(String::as_str), Some("client#1"));
   assert_eq!(CONSTRUCTIONS.load(Ordering::Relaxed), 1); // Factory ran only once
}
