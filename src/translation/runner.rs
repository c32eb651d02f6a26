/*!
 * Background translation tasks.
 *
 * Every submitted request runs in its own tokio task. Runs that share a
 * (dataset, source language, target language) triple are serialized, so the
 * resume offset of one run is never read while another run of the same
 * triple is still writing.
 */

use futures::future::join_all;
use log::{debug, error, info};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::app_config::TranslationConfig;
use crate::database::Repository;
use crate::errors::TranslationError;
use crate::translation::adapter::TextTranslator;
use crate::translation::job::{
    status_message, translate_dataset, translate_dataset_with, RunOptions, RunSummary, TranslationRequest,
};

/// Identifies the runs that must not overlap
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RunKey {
    dataset: String,
    source_language: String,
    target_language: String,
}

impl RunKey {
    /// Key for a dataset and language pair
    pub fn new(dataset: &str, source_language: &str, target_language: &str) -> Self {
        Self {
            dataset: dataset.trim().to_string(),
            source_language: source_language.trim().to_string(),
            target_language: target_language.trim().to_string(),
        }
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} -> {})", self.dataset, self.source_language, self.target_language)
    }
}

/// Keyed async mutexes, one per run key
#[derive(Debug, Clone, Default)]
pub struct RunLocks {
    locks: Arc<Mutex<HashMap<RunKey, Arc<tokio::sync::Mutex<()>>>>>,
}

impl RunLocks {
    /// Create an empty lock table
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other holder of `key` remains
    pub async fn acquire(&self, key: RunKey) -> RunGuard {
        let lock = {
            let mut locks = self.locks.lock();
            locks.entry(key.clone()).or_default().clone()
        };
        let guard = lock.lock_owned().await;

        RunGuard {
            key,
            locks: self.clone(),
            guard: Some(guard),
        }
    }

    /// Whether `key` is currently held
    pub fn is_locked(&self, key: &RunKey) -> bool {
        self.locks
            .lock()
            .get(key)
            .map(|lock| lock.try_lock().is_err())
            .unwrap_or(false)
    }

    /// Number of keys with a holder or a waiter
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    /// Whether no key is held or awaited
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop the entry of `key` once nobody holds or awaits it
    fn release(&self, key: &RunKey) {
        let mut locks = self.locks.lock();
        // The table's own reference is the last one; waiters clone theirs under this lock
        if locks.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(key);
            debug!("Released lock entry for {}", key);
        }
    }
}

/// Exclusive hold on one run key, released on drop
#[derive(Debug)]
pub struct RunGuard {
    key: RunKey,
    locks: RunLocks,
    guard: Option<OwnedMutexGuard<()>>,
}

impl RunGuard {
    /// The held key
    pub fn key(&self) -> &RunKey {
        &self.key
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        // Unlock first so the guard's reference is gone before the count check
        self.guard.take();
        self.locks.release(&self.key);
    }
}

/// Where a task gets its translator from
#[derive(Clone)]
enum TranslatorSource {
    /// Built per run from the translator name
    Configured(Arc<TranslationConfig>),
    /// Shared by every run
    Fixed(Arc<dyn TextTranslator>),
}

/// Spawns translation runs as background tasks
#[derive(Clone)]
pub struct TaskRunner {
    repo: Repository,
    source: TranslatorSource,
    locks: RunLocks,
    options: RunOptions,
}

impl TaskRunner {
    /// Runner resolving providers from the translation configuration
    pub fn new(repo: Repository, config: TranslationConfig, options: RunOptions) -> Self {
        Self {
            repo,
            source: TranslatorSource::Configured(Arc::new(config)),
            locks: RunLocks::new(),
            options,
        }
    }

    /// Runner using one translator for every run
    pub fn with_translator(repo: Repository, translator: Arc<dyn TextTranslator>, options: RunOptions) -> Self {
        Self {
            repo,
            source: TranslatorSource::Fixed(translator),
            locks: RunLocks::new(),
            options,
        }
    }

    /// The lock table shared by this runner's tasks
    pub fn locks(&self) -> &RunLocks {
        &self.locks
    }

    /// Start a run in the background
    pub fn submit(&self, request: TranslationRequest) -> TaskHandle {
        let id = Uuid::new_v4();
        let repo = self.repo.clone();
        let source = self.source.clone();
        let locks = self.locks.clone();
        let options = self.options.clone();
        let task_request = request.clone();

        let join = tokio::spawn(async move {
            let key = task_request.run_key();
            debug!("Task {} waiting for {}", id, key);
            let _guard = locks.acquire(key).await;
            info!("Task {} started: {}", id, task_request.run_key());

            let result = match source {
                TranslatorSource::Configured(config) => {
                    translate_dataset(&repo, &config, &task_request, options).await
                }
                TranslatorSource::Fixed(translator) => {
                    translate_dataset_with(&repo, translator.as_ref(), &task_request, options).await
                }
            };

            if let Err(e) = &result {
                error!("Task {} failed: {}", id, e);
            }
            result
        });

        TaskHandle { id, request, join }
    }

    /// Start one run per request
    pub fn submit_all<I>(&self, requests: I) -> Vec<TaskHandle>
    where
        I: IntoIterator<Item = TranslationRequest>,
    {
        requests.into_iter().map(|request| self.submit(request)).collect()
    }
}

/// Handle to a submitted run
pub struct TaskHandle {
    id: Uuid,
    request: TranslationRequest,
    join: JoinHandle<Result<RunSummary, TranslationError>>,
}

impl TaskHandle {
    /// Task id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The submitted request
    pub fn request(&self) -> &TranslationRequest {
        &self.request
    }

    /// Wait for the run to finish
    pub async fn wait(self) -> Result<RunSummary, TranslationError> {
        match self.join.await {
            Ok(result) => result,
            Err(e) => Err(TranslationError::Task(e.to_string())),
        }
    }

    /// Wait for the run and describe its outcome
    pub async fn status_message(self) -> String {
        status_message(&self.wait().await)
    }
}

/// Wait for every handle, keeping submission order
pub async fn wait_all(handles: Vec<TaskHandle>) -> Vec<(TranslationRequest, Result<RunSummary, TranslationError>)> {
    join_all(handles.into_iter().map(|handle| async move {
        let request = handle.request.clone();
        (request, handle.wait().await)
    }))
    .await
}
