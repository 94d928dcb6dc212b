use anyhow::Result;
use log::warn;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(3),
        }
    }
}

/// Runs a store read, retrying failed attempts after a fixed delay.
pub async fn retry_store_read<T, E, F, Fut>(
    policy: RetryPolicy,
    context: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
    E: Into<anyhow::Error>,
{
    let mut attempt = 1;
    loop {
        match operation().await.map_err(Into::into) {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= policy.max_attempts => {
                return Err(err.context(format!(
                    "{} failed after {} attempt{}",
                    context,
                    attempt,
                    if attempt == 1 { "" } else { "s" }
                )))
            }
            Err(err) => {
                warn!(
                    "Attempt {}/{} for {} failed: {}. Retrying in {}ms.",
                    attempt,
                    policy.max_attempts,
                    context,
                    err,
                    policy.delay.as_millis()
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}
