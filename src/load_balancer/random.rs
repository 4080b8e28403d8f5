//! Random load balancing strategy.

use std::sync::Arc;

use rand::Rng;

use crate::load_balancer::{backend::Backend, LoadBalancer};

/// Uniform random selector.
///
/// Draws an independent index per attempt and gives up after as many draws
/// as there are backends. Sampling is not exhaustive, so it can miss the
/// only available backend in a mostly-open pool.
#[derive(Debug, Default)]
pub struct Random;

impl Random {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for Random {
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        if backends.is_empty() {
            return None;
        }

        let mut rng = rand::thread_rng();
        (0..backends.len())
            .map(|_| &backends[rng.gen_range(0..backends.len())])
            .find(|backend| backend.is_available())
            .cloned()
    }
}
