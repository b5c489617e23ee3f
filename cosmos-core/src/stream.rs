//! Streaming response aggregation
//!
//! A [`StreamAggregator`] drains a [`TextStream`] in arrival order into a
//! growing buffer and reports the buffer to a [`StreamHandler`] after every
//! fragment. Streams are never retried or resumed. Consumption stops on the
//! first stream error, on cancellation, or when no fragment arrives within
//! the idle timeout; in each case the stream is dropped, which releases the
//! underlying connection.

use std::io::Write;
use std::time::Duration;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::model::TextStream;
use crate::{Error, Result};

/// Handler for processing stream progress
pub trait StreamHandler: Send {
    /// Called after each non-empty fragment with the fragment and the full buffer
    fn on_fragment(&mut self, fragment: &str, buffer: &str);

    /// Called when the stream ends normally
    fn on_complete(&mut self, _buffer: &str) {}
}

/// Handler that prints fragments to stdout as they arrive
pub struct PrintHandler {
    /// Whether to report fragment statistics on completion
    verbose: bool,
    fragments: usize,
}

impl PrintHandler {
    /// Create a new print handler
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            fragments: 0,
        }
    }
}

impl StreamHandler for PrintHandler {
    fn on_fragment(&mut self, fragment: &str, _buffer: &str) {
        self.fragments += 1;
        print!("{}", fragment);
        let _ = std::io::stdout().flush();
    }

    fn on_complete(&mut self, buffer: &str) {
        println!();
        if self.verbose {
            eprintln!("[{} fragments, {} chars]", self.fragments, buffer.chars().count());
        }
    }
}

/// Handler that discards progress
pub struct NullHandler;

impl StreamHandler for NullHandler {
    fn on_fragment(&mut self, _fragment: &str, _buffer: &str) {}
}

/// Accumulates streamed fragments into a buffer
#[derive(Debug)]
pub struct StreamAggregator {
    idle_timeout: Duration,
    buffer: String,
    fragments: usize,
}

impl StreamAggregator {
    /// Create an aggregator that gives up after `idle_timeout` of silence
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            buffer: String::new(),
            fragments: 0,
        }
    }

    /// Text received so far
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Number of non-empty fragments received so far
    pub fn fragments(&self) -> usize {
        self.fragments
    }

    /// Take the accumulated text
    pub fn into_buffer(self) -> String {
        self.buffer
    }

    /// Drain `stream`, calling `handler` after every fragment
    ///
    /// Returns `Error::Cancelled` when `cancel` fires and `Error::Timeout`
    /// when the stream goes quiet. Text received before the failure stays in
    /// [`buffer`](Self::buffer).
    pub async fn consume<H: StreamHandler + ?Sized>(
        &mut self,
        mut stream: TextStream,
        cancel: &CancellationToken,
        handler: &mut H,
    ) -> Result<()> {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(fragments = self.fragments, "Stream cancelled");
                    return Err(Error::Cancelled);
                }
                next = tokio::time::timeout(self.idle_timeout, stream.next()) => next,
            };

            match next {
                Err(_) => {
                    warn!(
                        fragments = self.fragments,
                        idle_timeout = ?self.idle_timeout,
                        "Stream went idle"
                    );
                    return Err(Error::Timeout(self.idle_timeout));
                }
                Ok(None) => break,
                Ok(Some(Err(e))) => {
                    warn!(fragments = self.fragments, error = %e, "Stream failed");
                    return Err(e);
                }
                Ok(Some(Ok(fragment))) => {
                    if fragment.is_empty() {
                        continue;
                    }
                    self.buffer.push_str(&fragment);
                    self.fragments += 1;
                    handler.on_fragment(&fragment, &self.buffer);
                }
            }
        }

        debug!(
            fragments = self.fragments,
            chars = self.buffer.len(),
            "Stream complete"
        );
        handler.on_complete(&self.buffer);
        Ok(())
    }
}

/// Drain a stream into a string without progress reporting
pub async fn collect(
    stream: TextStream,
    idle_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<String> {
    let mut aggregator = StreamAggregator::new(idle_timeout);
    aggregator.consume(stream, cancel, &mut NullHandler).await?;
    Ok(aggregator.into_buffer())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        snapshots: Vec<String>,
        completed: Option<String>,
    }

    impl StreamHandler for Recorder {
        fn on_fragment(&mut self, _fragment: &str, buffer: &str) {
            self.snapshots.push(buffer.to_string());
        }

        fn on_complete(&mut self, buffer: &str) {
            self.completed = Some(buffer.to_string());
        }
    }

    fn stream_of(items: Vec<Result<String>>) -> TextStream {
        futures::stream::iter(items).boxed()
    }

    #[tokio::test]
    async fn test_buffer_grows_in_arrival_order() {
        let mut agg = StreamAggregator::new(Duration::from_secs(5));
        let mut recorder = Recorder::default();
        let stream = stream_of(vec![
            Ok("Hel".to_string()),
            Ok(String::new()),
            Ok("lo ".to_string()),
            Ok("world".to_string()),
        ]);

        agg.consume(stream, &CancellationToken::new(), &mut recorder)
            .await
            .unwrap();

        assert_eq!(recorder.snapshots, vec!["Hel", "Hello ", "Hello world"]);
        assert_eq!(recorder.completed.as_deref(), Some("Hello world"));
        assert_eq!(agg.fragments(), 3);
    }

    #[tokio::test]
    async fn test_error_stops_consumption_and_keeps_partial() {
        let mut agg = StreamAggregator::new(Duration::from_secs(5));
        let mut recorder = Recorder::default();
        let stream = stream_of(vec![
            Ok("partial".to_string()),
            Err(Error::model("connection reset", true)),
            Ok("never seen".to_string()),
        ]);

        let err = agg
            .consume(stream, &CancellationToken::new(), &mut recorder)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Model { retryable: true, .. }));
        assert_eq!(agg.buffer(), "partial");
        assert!(recorder.completed.is_none());
    }

    #[tokio::test]
    async fn test_cancellation_releases_stalled_stream() {
        let mut agg = StreamAggregator::new(Duration::from_secs(60));
        let cancel = CancellationToken::new();
        let stream = futures::stream::iter(vec![Ok::<_, Error>("first".to_string())])
            .chain(futures::stream::pending())
            .boxed();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = agg
            .consume(stream, &cancel, &mut NullHandler)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(agg.buffer(), "first");
    }

    #[tokio::test]
    async fn test_already_cancelled_token() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let stream = stream_of(vec![Ok("x".to_string())]);
        let err = collect(stream, Duration::from_secs(1), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn test_idle_timeout() {
        let stream = futures::stream::pending::<Result<String>>().boxed();
        let err = collect(stream, Duration::from_millis(20), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test]
    async fn test_collect() {
        let stream = stream_of(vec![Ok("a".to_string()), Ok("b".to_string())]);
        let text = collect(stream, Duration::from_secs(1), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(text, "ab");
    }
}
