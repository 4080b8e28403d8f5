//! Round-robin load balancing strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::load_balancer::{backend::Backend, LoadBalancer};

/// Round-robin selector.
/// Stores a shared cursor to rotate through backends.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn starting_at(cursor: usize) -> Self {
        Self {
            counter: AtomicUsize::new(cursor),
        }
    }
}

impl LoadBalancer for RoundRobin {
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        if backends.is_empty() {
            return None;
        }

        // One cursor step per candidate, bounded to a single sweep. Skipped
        // backends consume their turn so the rest keep an even rotation.
        let len = backends.len();
        (0..len)
            .map(|_| &backends[self.counter.fetch_add(1, Ordering::Relaxed) % len])
            .find(|backend| backend.is_available())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::BreakerConfig;
    use std::collections::HashMap;
    use std::time::Duration;

    fn backends(addrs: &[&str], threshold: u32) -> Vec<Arc<Backend>> {
        let config = BreakerConfig {
            failure_threshold: threshold,
            cooldown: Duration::from_secs(60),
        };
        addrs
            .iter()
            .map(|a| Arc::new(Backend::parse(a, config).unwrap()))
            .collect()
    }

    #[test]
    fn test_round_robin() {
        let lb = RoundRobin::new();
        let pool = backends(&["http://127.0.0.1:8080", "http://127.0.0.1:8081"], 3);

        let picks: Vec<_> = (0..4)
            .map(|_| lb.next_server(&pool).unwrap().address().to_string())
            .collect();
        assert_eq!(
            picks,
            vec![
                "http://127.0.0.1:8080",
                "http://127.0.0.1:8081",
                "http://127.0.0.1:8080",
                "http://127.0.0.1:8081",
            ]
        );
    }

    #[test]
    fn skips_open_backends() {
        let lb = RoundRobin::new();
        let pool = backends(&["http://a:1", "http://b:2", "http://c:3"], 1);
        pool[1].record_failure();

        for _ in 0..30 {
            let picked = lb.next_server(&pool).unwrap();
            assert_ne!(picked.address(), "http://b:2");
        }
    }

    #[test]
    fn open_backend_share_is_spread_evenly() {
        let lb = RoundRobin::new();
        let pool = backends(&["http://a:1", "http://b:2", "http://c:3"], 1);
        pool[1].record_failure();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..300 {
            let picked = lb.next_server(&pool).unwrap();
            *counts.entry(picked.address().to_string()).or_insert(0) += 1;
        }

        assert_eq!(counts["http://a:1"], 150);
        assert_eq!(counts["http://c:3"], 150);
        assert!(!counts.contains_key("http://b:2"));
    }

    #[test]
    fn none_when_all_open() {
        let lb = RoundRobin::new();
        let pool = backends(&["http://a:1", "http://b:2"], 1);
        pool.iter().for_each(|b| b.record_failure());
        assert!(lb.next_server(&pool).is_none());
        assert!(lb.next_server(&[]).is_none());
    }

    #[test]
    fn wraps_around_at_cursor_limit() {
        let lb = RoundRobin::starting_at(usize::MAX);
        let pool = backends(&["http://a:1", "http://b:2"], 3);

        // usize::MAX is odd, so the last index before wrapping is 1.
        assert_eq!(lb.next_server(&pool).unwrap().address(), "http://b:2");
        assert_eq!(lb.next_server(&pool).unwrap().address(), "http://a:1");
        assert_eq!(lb.next_server(&pool).unwrap().address(), "http://b:2");
    }

    #[test]
    fn concurrent_callers_split_evenly() {
        let lb = Arc::new(RoundRobin::new());
        let pool = Arc::new(backends(&["http://a:1", "http://b:2", "http://c:3"], 3));

        let counts: HashMap<String, usize> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..6)
                .map(|_| {
                    let lb = lb.clone();
                    let pool = pool.clone();
                    s.spawn(move || {
                        (0..100)
                            .map(|_| lb.next_server(&pool).unwrap().address().to_string())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            let mut counts = HashMap::new();
            for handle in handles {
                for addr in handle.join().unwrap() {
                    *counts.entry(addr).or_insert(0) += 1;
                }
            }
            counts
        });

        assert_eq!(counts.values().sum::<usize>(), 600);
        for addr in ["http://a:1", "http://b:2", "http://c:3"] {
            assert_eq!(counts[addr], 200, "uneven split for {}", addr);
        }
    }
}
