use std::ops::Bound;
use suspend_cache::{RangeCacheBuilder, Span};

#[derive(Debug)]
struct Message {
  seq: u64,
  text: String,
}

fn first_and_last(span: &Span<u64>) -> (u64, u64) {
  let start = match span.start {
    Bound::Included(s) => s,
    Bound::Excluded(s) => s + 1,
    Bound::Unbounded => 0,
  };
  let end = match span.end {
    Bound::Included(e) => e,
    Bound::Excluded(e) => e - 1,
    Bound::Unbounded => u64::MAX,
  };
  (start, end)
}

#[tokio::main]
async fn main() {
  // Messages of a channel, keyed by channel name and ordered by sequence.
  let cache = RangeCacheBuilder::new(
    |channel: String, gaps: Vec<Span<u64>>, _signal| async move {
      println!("--- Loading {channel} gaps {gaps:?}");
      let mut messages = Vec::new();
      for gap in &gaps {
        let (first, last) = first_and_last(gap);
        for seq in first..=last {
          messages.push(Message {
            seq,
            text: format!("{channel} #{seq}"),
          });
        }
      }
      Ok::<_, String>(messages)
    },
    |a: &u64, b: &u64| a.cmp(b),
    |message: &Message| message.seq,
  )
  .build()
  .expect("Failed to build range cache");

  let general = "general".to_string();
  let recent = cache.fetch(40, 49, &general).await.unwrap();
  println!("Loaded {} recent messages", recent.len());

  // Scrolling back only loads what is missing.
  let page = cache.fetch(30, 45, &general).await.unwrap();
  println!(
    "Page holds {}..={}",
    page.first().map(|m| m.seq).unwrap_or_default(),
    page.last().map(|m| m.seq).unwrap_or_default()
  );
  println!("Last message text: {:?}", page.last().map(|m| &m.text));
  println!("Loaded spans: {:?}", cache.loaded_spans(&general));
}
