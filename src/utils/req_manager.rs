use reqwest::{Client, RequestBuilder, Response};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};

use crate::core::tts::{TTSError, TTSResult};

/// Counters for outbound backend calls
#[derive(Debug, Default)]
pub struct RequestMetrics {
    /// Total number of requests sent
    pub total_requests: AtomicU64,
    /// Requests that produced a response (any status)
    pub successful_requests: AtomicU64,
    /// Requests that failed at the transport level
    pub failed_requests: AtomicU64,
    /// Number of currently held guards
    pub active_requests: AtomicUsize,
    /// Peak concurrent guards observed
    pub peak_concurrent: AtomicUsize,
}

impl RequestMetrics {
    /// Get a formatted summary of metrics
    pub fn summary(&self) -> String {
        let total = self.total_requests.load(Ordering::Relaxed);
        let success = self.successful_requests.load(Ordering::Relaxed);
        let failed = self.failed_requests.load(Ordering::Relaxed);
        let active = self.active_requests.load(Ordering::Relaxed);
        let peak = self.peak_concurrent.load(Ordering::Relaxed);

        format!(
            "Requests - Total: {}, Success: {}, Failed: {}, Active: {}, Peak: {}",
            total, success, failed, active, peak
        )
    }
}

/// Shared HTTP client with a bound on concurrent backend calls.
///
/// Every network backend sends through one `ReqManager` so connection pooling
/// and the concurrency ceiling apply across backends.
///
/// # Example
/// ```rust,no_run
/// # async fn example() -> podcast_tts::TTSResult<()> {
/// use podcast_tts::utils::req_manager::ReqManager;
///
/// let manager = ReqManager::new(4)?;
/// let guard = manager.acquire().await?;
/// let response = guard.send(guard.client().get("https://api.example.com/health")).await;
/// println!("{} -> {:?}", manager.metrics().summary(), response.map(|r| r.status()));
/// # Ok(())
/// # }
/// ```
pub struct ReqManager {
    max_concurrent_requests: usize,
    client: Arc<Client>,
    semaphore: Arc<Semaphore>,
    metrics: Arc<RequestMetrics>,
}

/// Holds one concurrency slot until dropped.
pub struct ClientGuard<'a> {
    manager: &'a ReqManager,
    client: Arc<Client>,
    _permit: SemaphorePermit<'a>,
}

impl<'a> ClientGuard<'a> {
    /// Get the HTTP client for building requests
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send a built request, recording the outcome in the manager's metrics
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, reqwest::Error> {
        self.manager
            .metrics
            .total_requests
            .fetch_add(1, Ordering::Relaxed);
        let result = request.send().await;
        let counter = match &result {
            Ok(_) => &self.manager.metrics.successful_requests,
            Err(_) => &self.manager.metrics.failed_requests,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        result
    }
}

impl<'a> Drop for ClientGuard<'a> {
    fn drop(&mut self) {
        self.manager
            .metrics
            .active_requests
            .fetch_sub(1, Ordering::Relaxed);
    }
}

/// Configuration for the HTTP request manager
#[derive(Debug, Clone)]
pub struct ReqManagerConfig {
    /// Maximum number of concurrent requests
    pub max_concurrent_requests: usize,
    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Whole-request timeout applied to every backend call
    pub request_timeout: Duration,
}

impl Default for ReqManagerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 4,
            pool_max_idle_per_host: 16,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ReqManager {
    /// Create a manager with default timeouts and the given concurrency limit
    pub fn new(max_concurrent_requests: usize) -> TTSResult<Self> {
        Self::with_config(ReqManagerConfig {
            max_concurrent_requests,
            ..Default::default()
        })
    }

    pub fn with_config(config: ReqManagerConfig) -> TTSResult<Self> {
        if config.max_concurrent_requests == 0 {
            return Err(TTSError::InvalidConfiguration(
                "max_concurrent_requests must be greater than 0".to_string(),
            ));
        }
        if config.max_concurrent_requests > 1000 {
            return Err(TTSError::InvalidConfiguration(
                "max_concurrent_requests must not exceed 1000".to_string(),
            ));
        }
        if config.request_timeout.is_zero() {
            return Err(TTSError::InvalidConfiguration(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        let client = Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .tcp_nodelay(true)
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(concat!("podcast-tts/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TTSError::InternalError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            max_concurrent_requests: config.max_concurrent_requests,
            client: Arc::new(client),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_requests)),
            metrics: Arc::new(RequestMetrics::default()),
        })
    }

    /// Wait for a free slot and return a guard holding it.
    pub async fn acquire(&self) -> TTSResult<ClientGuard<'_>> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| TTSError::InternalError(format!("Request slots closed: {e}")))?;

        let active = self.metrics.active_requests.fetch_add(1, Ordering::Relaxed) + 1;
        self.metrics
            .peak_concurrent
            .fetch_max(active, Ordering::Relaxed);

        Ok(ClientGuard {
            manager: self,
            client: Arc::clone(&self.client),
            _permit: permit,
        })
    }

    pub fn available_count(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent_requests
    }

    pub fn active_requests(&self) -> usize {
        self.metrics.active_requests.load(Ordering::Relaxed)
    }

    pub fn metrics(&self) -> &RequestMetrics {
        &self.metrics
    }
}
