use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Sliding-window request limiter keyed by client.
///
/// Clients whose window has fully expired are dropped, at most once per
/// window, so rotating keys cannot grow the table without bound.
#[derive(Debug, Clone)]
pub struct ClientRateLimiter {
    state: Arc<Mutex<LimiterState>>,
    window: Duration,
    max_requests: usize,
}

#[derive(Debug)]
struct LimiterState {
    clients: HashMap<String, VecDeque<Instant>>,
    last_sweep: Option<Instant>,
}

impl ClientRateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(LimiterState {
                clients: HashMap::new(),
                last_sweep: None,
            })),
            window,
            max_requests,
        }
    }

    pub fn allow(&self, client: &str) -> bool {
        self.allow_at(client, Instant::now())
    }

    fn allow_at(&self, client: &str, now: Instant) -> bool {
        let mut state = self.state.lock();
        self.sweep_expired(&mut state, now);

        let hits = state.clients.entry(client.to_string()).or_default();
        expire_before(hits, now, self.window);

        if hits.len() >= self.max_requests {
            return false;
        }
        hits.push_back(now);
        true
    }

    fn sweep_expired(&self, state: &mut LimiterState, now: Instant) {
        let due = state
            .last_sweep
            .map_or(true, |last| now.saturating_duration_since(last) >= self.window);
        if !due {
            return;
        }

        let window = self.window;
        state.clients.retain(|_, hits| {
            expire_before(hits, now, window);
            !hits.is_empty()
        });
        state.last_sweep = Some(now);
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.state.lock().clients.len()
    }
}

fn expire_before(hits: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while hits
        .front()
        .is_some_and(|hit| now.saturating_duration_since(*hit) > window)
    {
        hits.pop_front();
    }
}
