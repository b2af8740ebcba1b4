//! Synchronized fetch of the state/mapping pair
//!
//! Both resources are requested concurrently and accepted only together. If
//! either request fails, or either payload is empty, the whole pair is retried
//! after a fixed delay. The mapping table and the odds must come from the same
//! attempt, so a half-successful attempt is never handed on.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::client::FeedSource;
use super::error::FetchError;
use super::schema::{validate_consistency, SyncedPayload};

pub struct SynchronizedFetcher<S: FeedSource> {
    source: Arc<S>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl<S: FeedSource> SynchronizedFetcher<S> {
    pub fn new(source: Arc<S>, max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            source,
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    /// Fetch both payloads, retrying the pair up to `max_attempts` times
    pub async fn fetch_synchronized(&self) -> Result<SyncedPayload, FetchError> {
        let mut last_error: Option<FetchError> = None;

        for attempt in 1..=self.max_attempts {
            match self.attempt().await {
                Ok(payload) => {
                    if attempt > 1 {
                        debug!(attempt, "Synchronized fetch recovered");
                    }
                    return Ok(payload);
                }
                Err(e) => {
                    warn!(attempt, max_attempts = self.max_attempts, error = %e, "[RETRY] Synchronized fetch attempt failed");
                    last_error = Some(e);

                    if attempt < self.max_attempts {
                        sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(FetchError::Exhausted {
            attempts: self.max_attempts,
            last: Box::new(last_error.unwrap_or_else(|| {
                FetchError::Consistency("no fetch attempt was made".to_string())
            })),
        })
    }

    async fn attempt(&self) -> Result<SyncedPayload, FetchError> {
        let (state, mappings) = tokio::join!(self.source.fetch_state(), self.source.fetch_mappings());
        let (state, mappings) = (state?, mappings?);

        validate_consistency(&state, &mappings)?;

        Ok(SyncedPayload { state, mappings })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted feed source shared by fetcher and pipeline tests

    use super::*;
    use crate::feed::schema::{MappingsResponse, StateResponse};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};

    pub type Scripted<T> = Mutex<VecDeque<Result<T, FetchError>>>;

    /// Replays queued responses; an exhausted queue repeats `fallback_*`.
    #[derive(Default)]
    pub struct ScriptedSource {
        pub states: Scripted<StateResponse>,
        pub mappings: Scripted<MappingsResponse>,
        pub fallback_state: Mutex<Option<String>>,
        pub fallback_mappings: Mutex<Option<String>>,
        pub state_calls: AtomicU32,
        pub mapping_calls: AtomicU32,
    }

    impl ScriptedSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_state(&self, result: Result<&str, FetchError>) {
            self.states.lock().push_back(result.map(|odds| StateResponse {
                odds: odds.to_string(),
            }));
        }

        pub fn push_mappings(&self, result: Result<&str, FetchError>) {
            self.mappings.lock().push_back(result.map(|m| MappingsResponse {
                mappings: m.to_string(),
            }));
        }

        pub fn always(&self, odds: &str, mappings: &str) {
            *self.fallback_state.lock() = Some(odds.to_string());
            *self.fallback_mappings.lock() = Some(mappings.to_string());
        }
    }

    pub fn transport_error(endpoint: &'static str) -> FetchError {
        FetchError::transport(endpoint, "connection refused")
    }

    #[async_trait]
    impl FeedSource for ScriptedSource {
        async fn fetch_state(&self) -> Result<StateResponse, FetchError> {
            self.state_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(next) = self.states.lock().pop_front() {
                return next;
            }
            match self.fallback_state.lock().clone() {
                Some(odds) => Ok(StateResponse { odds }),
                None => Err(transport_error("/api/state")),
            }
        }

        async fn fetch_mappings(&self) -> Result<MappingsResponse, FetchError> {
            self.mapping_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(next) = self.mappings.lock().pop_front() {
                return next;
            }
            match self.fallback_mappings.lock().clone() {
                Some(mappings) => Ok(MappingsResponse { mappings }),
                None => Err(transport_error("/api/mappings")),
            }
        }
    }
}
