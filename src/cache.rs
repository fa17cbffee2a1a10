use std::{
  hash::Hash,
  num::NonZeroUsize,
  sync::Mutex,
  time::{Duration, Instant},
};

use lru::LruCache;

struct Timed<T> {
  value: T,
  created: Instant,
}

/// An LRU cache whose entries expire `ttl` after insertion.
///
/// A capacity of zero turns the cache off: lookups always miss and
/// inserts are dropped.
pub struct TimedLruCache<K: Hash + Eq, V: Clone> {
  map: Option<Mutex<LruCache<K, Timed<V>>>>,
  ttl: Duration,
}

impl<K: Hash + Eq, V: Clone> TimedLruCache<K, V> {
  pub fn new(max_entries: usize, ttl: Duration) -> Self {
    let map = NonZeroUsize::new(max_entries)
      .map(|capacity| Mutex::new(LruCache::new(capacity)));
    Self { map, ttl }
  }

  pub fn get_cached(&self, key: &K) -> Option<V> {
    let mut map = self.map.as_ref()?.lock().ok()?;
    let entry = map.get(key)?;
    if entry.created.elapsed() > self.ttl {
      map.pop(key);
      return None;
    }
    Some(entry.value.clone())
  }

  pub fn insert(&self, key: K, value: V) -> Option<()> {
    let timed = Timed {
      value,
      created: Instant::now(),
    };
    self.map.as_ref()?.lock().ok()?.push(key, timed);
    Some(())
  }
}
