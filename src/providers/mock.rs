/*!
 * Mock translator implementations for testing.
 *
 * This module provides a scripted translator that simulates different behaviors:
 * - `MockTranslator::working()` - Always succeeds with a tagged translation
 * - `MockTranslator::failing(transient)` - Always fails with an error
 * - `MockTranslator::fail_after(n)` - Succeeds n times, then fails
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::translation::TextTranslator;

/// Behavior mode for the mock translator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with "[target] text"
    Working,
    /// Always fails; transient failures are 503s, permanent ones 400s
    Failing { transient: bool },
    /// Succeeds for the first `successes` calls, then fails transiently
    FailAfter { successes: usize },
    /// Returns an empty string
    Empty,
    /// Succeeds after sleeping
    Slow { delay_ms: u64 },
}

/// Scripted translator used by tests and benchmarks
#[derive(Debug, Clone)]
pub struct MockTranslator {
    /// Behavior mode
    behavior: MockBehavior,
    /// Number of calls made, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Texts received, shared between clones
    received: Arc<Mutex<Vec<String>>>,
}

impl MockTranslator {
    /// Create a new mock translator with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a working mock translator that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a failing mock translator
    pub fn failing(transient: bool) -> Self {
        Self::new(MockBehavior::Failing { transient })
    }

    /// Create a mock translator that fails once `successes` calls went through
    pub fn fail_after(successes: usize) -> Self {
        Self::new(MockBehavior::FailAfter { successes })
    }

    /// Create a mock translator that answers with empty text
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock translator that sleeps before answering
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Number of translate calls so far
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Texts passed to translate, in call order
    pub fn received_texts(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    /// The translation a working mock produces
    pub fn expected_translation(text: &str, target_language: &str) -> String {
        format!("[{}] {}", target_language, text)
    }
}

#[async_trait]
impl TextTranslator for MockTranslator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn translate(
        &self,
        text: &str,
        _source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.received.lock().push(text.to_string());

        match self.behavior {
            MockBehavior::Working => Ok(Self::expected_translation(text, target_language)),

            MockBehavior::Failing { transient: true } => Err(ProviderError::ApiError {
                message: "Simulated provider outage".to_string(),
                status_code: 503,
            }),

            MockBehavior::Failing { transient: false } => Err(ProviderError::ApiError {
                message: "Simulated invalid request".to_string(),
                status_code: 400,
            }),

            MockBehavior::FailAfter { successes } => {
                if count < successes {
                    Ok(Self::expected_translation(text, target_language))
                } else {
                    Err(ProviderError::ConnectionError(format!(
                        "Simulated connection loss (request #{})",
                        count + 1
                    )))
                }
            }

            MockBehavior::Empty => Ok(String::new()),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(Self::expected_translation(text, target_language))
            }
        }
    }
}
