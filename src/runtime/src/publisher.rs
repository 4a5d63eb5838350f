//! Registry publisher with bounded retry.

use std::sync::Arc;

use container_factory_core::error::{FactoryError, Result};

use crate::tool::ImageTool;

/// Total push attempts per image (one try plus two retries).
pub const PUSH_ATTEMPTS: u32 = 3;

/// Pushes built images through an [`ImageTool`].
#[derive(Clone)]
pub struct RegistryPublisher {
    tool: Arc<dyn ImageTool>,
    attempts: u32,
}

impl RegistryPublisher {
    pub fn new(tool: Arc<dyn ImageTool>) -> Self {
        Self::with_attempts(tool, PUSH_ATTEMPTS)
    }

    pub fn with_attempts(tool: Arc<dyn ImageTool>, attempts: u32) -> Self {
        Self {
            tool,
            attempts: attempts.max(1),
        }
    }

    /// Push `reference`, retrying immediately on failure.
    ///
    /// Returns [`FactoryError::PushFailed`] once every attempt has failed.
    pub async fn publish(&self, reference: &str) -> Result<()> {
        tracing::info!(image = reference, "Pushing image to registry");

        let mut last_error = None;
        for attempt in 1..=self.attempts {
            match self.tool.push(reference).await {
                Ok(()) => {
                    tracing::info!(image = reference, attempt, "Pushed image to registry");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        image = reference,
                        retries_remaining = self.attempts - attempt,
                        error = %e,
                        "Failed to push image to registry"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(FactoryError::PushFailed {
            image: reference.to_string(),
            attempts: self.attempts,
            message: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::BuildRequest;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Push fails a fixed number of times, then succeeds.
    struct FlakyPush {
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyPush {
        fn new(failures: u32) -> Arc<Self> {
            Arc::new(Self {
                failures,
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl ImageTool for FlakyPush {
        async fn build(&self, _request: &BuildRequest) -> Result<()> {
            Ok(())
        }

        async fn push(&self, reference: &str) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                Err(FactoryError::PushFailed {
                    image: reference.to_string(),
                    attempts: 1,
                    message: format!("exit status: {}", call),
                })
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_push_first_try() {
        let tool = FlakyPush::new(0);
        let publisher = RegistryPublisher::new(tool.clone());
        publisher.publish("registry.example.com/base:v1").await.unwrap();
        assert_eq!(tool.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_push_fails_twice_then_succeeds() {
        let tool = FlakyPush::new(2);
        let publisher = RegistryPublisher::new(tool.clone());
        publisher.publish("registry.example.com/base:v1").await.unwrap();
        assert_eq!(tool.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_push_always_fails() {
        let tool = FlakyPush::new(u32::MAX);
        let publisher = RegistryPublisher::new(tool.clone());
        let err = publisher
            .publish("registry.example.com/base:v1")
            .await
            .unwrap_err();

        assert_eq!(tool.calls.load(Ordering::SeqCst), 3);
        match err {
            FactoryError::PushFailed {
                image,
                attempts,
                message,
            } => {
                assert_eq!(image, "registry.example.com/base:v1");
                assert_eq!(attempts, 3);
                assert!(message.contains("exit status: 3"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_attempts_floor_is_one() {
        let tool = FlakyPush::new(u32::MAX);
        let publisher = RegistryPublisher::with_attempts(tool.clone(), 0);
        assert!(publisher.publish("x:y").await.is_err());
        assert_eq!(tool.calls.load(Ordering::SeqCst), 1);
    }
}
