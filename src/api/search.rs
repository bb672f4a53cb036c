//! Debounced search-as-you-type
//!
//! Search inputs are published into a `tokio::sync::watch` channel as the
//! user types. [`SearchDebouncer`] yields a term only after it has stayed
//! unchanged for the quiet period, so intermediate keystrokes never reach the
//! server. Pair each yielded term with a fresh `CancellationToken` and cancel
//! the previous one to drop stale in-flight responses.

use std::time::Duration;
use tokio::sync::watch;

/// Default quiet period before a search term is considered settled
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Coalesces rapid search input into settled terms
pub struct SearchDebouncer {
    rx: watch::Receiver<String>,
    quiet: Duration,
    last_emitted: Option<String>,
}

impl SearchDebouncer {
    pub fn new(rx: watch::Receiver<String>, quiet: Duration) -> Self {
        Self {
            rx,
            quiet,
            last_emitted: None,
        }
    }

    /// Wait for the next settled search term.
    ///
    /// Terms equal to the previously yielded one are skipped. Returns `None`
    /// once the sender is dropped and nothing is pending.
    pub async fn next(&mut self) -> Option<String> {
        loop {
            if self.rx.changed().await.is_err() {
                return None;
            }

            loop {
                match tokio::time::timeout(self.quiet, self.rx.changed()).await {
                    Ok(Ok(())) => continue,
                    // Sender gone or quiet period elapsed: settle on the latest value.
                    Ok(Err(_)) | Err(_) => break,
                }
            }

            let term = self.rx.borrow_and_update().clone();
            if self.last_emitted.as_deref() == Some(term.as_str()) {
                continue;
            }

            tracing::debug!(term = %term, "Search term settled");
            self.last_emitted = Some(term.clone());
            return Some(term);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_only_settled_term_is_yielded() {
        let (tx, rx) = watch::channel(String::new());
        let mut debouncer = SearchDebouncer::new(rx, Duration::from_millis(300));

        let typing = tokio::spawn(async move {
            for term in ["B", "BR", "BRC", "BRCA"] {
                tx.send(term.to_string()).unwrap();
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
            tx.send("BRCA1".to_string()).unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
        });

        assert_eq!(debouncer.next().await.as_deref(), Some("BRCA"));
        assert_eq!(debouncer.next().await.as_deref(), Some("BRCA1"));
        typing.await.unwrap();
        assert_eq!(debouncer.next().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_term_not_yielded_twice() {
        let (tx, rx) = watch::channel(String::new());
        let mut debouncer = SearchDebouncer::new(rx, DEFAULT_QUIET_PERIOD);

        tx.send("EGFR".to_string()).unwrap();
        assert_eq!(debouncer.next().await.as_deref(), Some("EGFR"));

        tx.send("EGF".to_string()).unwrap();
        tx.send("EGFR".to_string()).unwrap();
        drop(tx);
        assert_eq!(debouncer.next().await, None);
    }
}
