use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::domain::proxy::{ProxyEndpoint, ProxyProtocol, ProxyStatus};

pub const BLOCK_THRESHOLD: u32 = 3;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProxyPoolError {
    #[error("No valid proxy found in configuration")]
    Empty,
}

/// Handle to one endpoint, returned by [`ProxyPool::acquire`] and handed back to
/// [`ProxyPool::report_outcome`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyLease {
    index: usize,
    endpoint: ProxyEndpoint,
}

impl ProxyLease {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn endpoint(&self) -> &ProxyEndpoint {
        &self.endpoint
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyHealth {
    pub endpoint: String,
    pub protocol: ProxyProtocol,
    pub status: ProxyStatus,
    pub success_count: u64,
    pub consecutive_failure_count: u32,
}

struct PoolState {
    endpoints: Vec<ProxyEndpoint>,
    cursor: usize,
}

pub struct ProxyPool {
    state: Mutex<PoolState>,
    block_threshold: u32,
}

impl ProxyPool {
    pub fn new(endpoints: Vec<ProxyEndpoint>) -> Self {
        ProxyPool {
            state: Mutex::new(PoolState {
                endpoints,
                cursor: 0,
            }),
            block_threshold: BLOCK_THRESHOLD,
        }
    }

    pub fn empty() -> Self {
        ProxyPool::new(vec![])
    }

    pub fn with_block_threshold(mut self, block_threshold: u32) -> Self {
        self.block_threshold = block_threshold.max(1);
        self
    }

    /// Parses `protocol://[user:pass@]host:port` entries separated by commas, semicolons or
    /// whitespace. Entries that do not parse are skipped with a warning.
    pub fn load_from_configuration(
        entries: &str,
        require_non_empty: bool,
    ) -> Result<Self, ProxyPoolError> {
        let endpoints: Vec<ProxyEndpoint> = entries
            .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| match ProxyEndpoint::parse(entry) {
                Ok(endpoint) => Some(endpoint),
                Err(e) => {
                    log::warn!("Dropping proxy entry from configuration: {}", e);
                    None
                }
            })
            .collect();

        if endpoints.is_empty() && require_non_empty {
            return Err(ProxyPoolError::Empty);
        }

        log::info!("Loaded proxy pool with {} endpoints", endpoints.len());
        Ok(ProxyPool::new(endpoints))
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Next active endpoint in round-robin order, or `None` when nothing is usable and the
    /// caller should fall back to a direct request.
    pub fn acquire(&self) -> Option<ProxyLease> {
        let mut state = self.lock();
        let len = state.endpoints.len();

        for _ in 0..len {
            let index = state.cursor;
            state.cursor = (state.cursor + 1) % len;

            let endpoint = &state.endpoints[index];
            if endpoint.is_active() {
                return Some(ProxyLease {
                    index,
                    endpoint: endpoint.clone(),
                });
            }
        }

        None
    }

    pub fn report_outcome(&self, lease: &ProxyLease, success: bool) {
        let mut state = self.lock();
        let Some(endpoint) = state.endpoints.get_mut(lease.index) else {
            log::error!("Outcome reported for unknown proxy index {}", lease.index);
            return;
        };

        if success {
            endpoint.success_count += 1;
            endpoint.consecutive_failure_count = 0;
            return;
        }

        endpoint.consecutive_failure_count += 1;
        if endpoint.is_active() && endpoint.consecutive_failure_count >= self.block_threshold {
            endpoint.status = ProxyStatus::Blocked;
            log::warn!(
                "Proxy {} blocked after {} consecutive failures",
                endpoint,
                endpoint.consecutive_failure_count
            );
        }
    }

    pub fn snapshot(&self) -> Vec<ProxyHealth> {
        self.lock()
            .endpoints
            .iter()
            .map(|e| ProxyHealth {
                endpoint: e.to_string(),
                protocol: e.protocol,
                status: e.status,
                success_count: e.success_count,
                consecutive_failure_count: e.consecutive_failure_count,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn active_count(&self) -> usize {
        self.lock()
            .endpoints
            .iter()
            .filter(|e| e.is_active())
            .count()
    }
}
