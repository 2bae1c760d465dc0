use std::time::Duration;
use suspend_cache::{ExternallyManagedCache, RecordStatus};

#[tokio::main]
async fn main() {
  // Prices pushed in by a feed rather than loaded on demand.
  let prices: ExternallyManagedCache<&'static str, &'static str, f64> = ExternallyManagedCache::builder()
    .build_externally_managed()
    .expect("Failed to build cache");

  let _subscription = prices.subscribe(&"ACME", |status: Option<RecordStatus>| {
    println!("ACME status: {status:?}");
  });

  let feed = {
    let prices = prices.clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(200)).await;
      prices.cache_value(101.25, &"ACME");
      prices.cache_error("market closed", &"INITECH");
    })
  };

  println!("Waiting for ACME...");
  println!("ACME = {}", prices.fetch(&"ACME").await.unwrap());
  feed.await.unwrap();
  println!("INITECH = {:?}", prices.fetch(&"INITECH").await);
}
