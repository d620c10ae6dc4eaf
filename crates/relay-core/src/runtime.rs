//! Runtime bridge: a per-handle tokio pool that blocking callers submit
//! async work to.
//!
//! Lifecycle is `Running` until [`RuntimeHandle::shutdown`] (or the last
//! reference is dropped), then terminal. Work submitted after shutdown, and
//! work still in flight when the pool stops, fails with
//! [`RelayError::RuntimeShutdown`].

use std::future::Future;
use std::sync::{Arc, Mutex};

use lending::{HttpConfigSource, JsonRpcClient, LendingService};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::config::SdkConfig;
use crate::error::RelayError;

pub struct RuntimeHandle {
    runtime: Mutex<Option<Runtime>>,
    worker_threads: u32,
    max_blocking_threads: u32,
    pub(crate) service: LendingService,
    pub(crate) config: SdkConfig,
    pub(crate) http: reqwest::Client,
}

impl RuntimeHandle {
    /// Spawn a pool with default settings. Zero sizes are raised to one.
    pub fn new(worker_threads: u32, max_blocking_threads: u32) -> Result<Self, RelayError> {
        Self::with_config(worker_threads, max_blocking_threads, String::new())
    }

    /// Spawn a pool configured from an [`SdkConfig`] JSON document.
    pub fn with_config(
        worker_threads: u32,
        max_blocking_threads: u32,
        config_json: String,
    ) -> Result<Self, RelayError> {
        let config = SdkConfig::from_json(&config_json)?;
        let http = config.http_client()?;
        let service = LendingService::new(
            Arc::new(JsonRpcClient::new(http.clone(), config.rpc_url.clone(), config.retry_policy())),
            Arc::new(HttpConfigSource::new(
                http.clone(),
                config.lending_config_url.clone(),
                config.retry_policy(),
            )),
            config.service_settings(),
        );
        Self::spawn(worker_threads, max_blocking_threads, config, http, service)
    }

    /// Spawn a pool around an already-built lending service.
    pub fn with_service(
        worker_threads: u32,
        max_blocking_threads: u32,
        config: SdkConfig,
        service: LendingService,
    ) -> Result<Self, RelayError> {
        let http = config.http_client()?;
        Self::spawn(worker_threads, max_blocking_threads, config, http, service)
    }

    fn spawn(
        worker_threads: u32,
        max_blocking_threads: u32,
        config: SdkConfig,
        http: reqwest::Client,
        service: LendingService,
    ) -> Result<Self, RelayError> {
        if worker_threads == 0 || max_blocking_threads == 0 {
            warn!(
                worker_threads,
                max_blocking_threads, "zero-sized runtime requested, using at least one thread each"
            );
        }
        let worker_threads = worker_threads.max(1);
        let max_blocking_threads = max_blocking_threads.max(1);

        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads as usize)
            .max_blocking_threads(max_blocking_threads as usize)
            .thread_name("relay-core-worker")
            .enable_all()
            .build()
            .map_err(|e| RelayError::Configuration(format!("failed to start runtime: {e}")))?;

        info!(worker_threads, max_blocking_threads, "runtime started");

        Ok(Self {
            runtime: Mutex::new(Some(runtime)),
            worker_threads,
            max_blocking_threads,
            service,
            config,
            http,
        })
    }

    pub fn worker_threads(&self) -> u32 {
        self.worker_threads
    }

    pub fn max_blocking_threads(&self) -> u32 {
        self.max_blocking_threads
    }

    pub fn is_running(&self) -> bool {
        self.runtime.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    /// Stop the pool, waiting up to the configured shutdown timeout for
    /// in-flight work. Idempotent. Must not be called from inside a task
    /// running on this handle.
    pub fn shutdown(&self) {
        let runtime = match self.runtime.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(runtime) = runtime {
            runtime.shutdown_timeout(self.config.shutdown_timeout());
            info!("runtime shut down");
        }
    }

    /// Run `task` on the pool and block the calling thread until it
    /// finishes. The pool lock is released before blocking, so calls from
    /// many threads proceed in parallel.
    pub(crate) fn block_on<T, F>(&self, task: F) -> Result<T, RelayError>
    where
        F: Future<Output = Result<T, RelayError>> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        {
            let slot = self.runtime.lock().map_err(|_| RelayError::RuntimeShutdown)?;
            let runtime = slot.as_ref().ok_or(RelayError::RuntimeShutdown)?;
            runtime.spawn(async move {
                // The caller may have gone away; nothing to report then.
                let _ = tx.send(task.await);
            });
        }
        // A task dropped by shutdown drops `tx` with it.
        rx.blocking_recv().map_err(|_| RelayError::RuntimeShutdown)?
    }
}

impl Drop for RuntimeHandle {
    fn drop(&mut self) {
        let slot = match self.runtime.get_mut() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(runtime) = slot.take() {
            runtime.shutdown_background();
        }
    }
}
