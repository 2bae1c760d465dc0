use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use suspend_cache::{CacheBuilder, Suspend};
use tokio::time::{sleep, Duration};

// A simulated slow service.
async fn fetch_profile(user: u32, load_count: Arc<AtomicUsize>) -> Result<String, String> {
  println!("--- Service: loading profile {user}...");
  load_count.fetch_add(1, Ordering::SeqCst);
  sleep(Duration::from_millis(300)).await;
  Ok(format!("profile-{user}"))
}

#[tokio::main]
async fn main() {
  let load_counter = Arc::new(AtomicUsize::new(0));

  let cache = CacheBuilder::new({
    let counter = load_counter.clone();
    move |user: u32, _signal| fetch_profile(user, counter.clone())
  })
  .use_weak_ref(false)
  .name("profiles")
  .build()
  .expect("Failed to build cache");

  // A non-blocking read suspends with the shared future.
  match cache.get(&42) {
    Suspend::Pending(_) => println!("Profile 42 is loading; a renderer would suspend here."),
    Suspend::Ready(profile) => println!("Already cached: {profile}"),
    Suspend::Failed(error) => println!("Failed: {error}"),
  }

  println!("\n--- Spawning 10 readers for the same key ---");
  let mut tasks = Vec::new();
  for i in 0..10 {
    let cache = cache.clone();
    tasks.push(tokio::spawn(async move {
      let profile = cache.fetch(&42).await.unwrap();
      println!("[Task {i}] Received {profile}");
    }));
  }
  for task in tasks {
    task.await.unwrap();
  }

  println!(
    "\nLoader ran {} time(s) for 10 readers.",
    load_counter.load(Ordering::SeqCst)
  );
  println!("Metrics: {:?}", cache.metrics());
}
