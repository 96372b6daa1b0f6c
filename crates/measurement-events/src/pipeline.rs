//! Reader and publisher wiring

use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::publisher::{EventPublisher, PublisherStats};
use crate::reader::{MeasurementReader, ReaderStats};

/// What a finished run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub lines: u64,
    pub samples: u64,
    pub ignored: u64,
    pub rejected: u64,
    pub records: u64,
}

impl PipelineSummary {
    fn from_parts(reader: ReaderStats, publisher: PublisherStats) -> Self {
        Self {
            lines: reader.lines,
            samples: publisher.samples,
            ignored: reader.ignored,
            rejected: reader.rejected,
            records: publisher.records,
        }
    }
}

/// Measurement pipeline: one reader task and one publisher task joined by
/// a bounded channel and a shared cancellation token.
pub struct Pipeline {
    config: PipelineConfig,
    cancel: CancellationToken,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_cancellation(config, CancellationToken::new())
    }

    pub fn with_cancellation(config: PipelineConfig, cancel: CancellationToken) -> Self {
        Self { config, cancel }
    }

    /// Token that stops the pipeline when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run both tasks to completion.
    ///
    /// Returns once both tasks have stopped. If either fails, the other is
    /// cancelled and the first error (reader before publisher) is returned.
    pub async fn run<R, W, E>(
        self,
        input: R,
        output: W,
        diagnostics: E,
    ) -> PipelineResult<PipelineSummary>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
        E: AsyncWrite + Unpin + Send + 'static,
    {
        self.config.validate()?;

        info!(
            keep_running = self.config.keep_running,
            no_headers = self.config.no_headers,
            channel_capacity = self.config.channel_capacity,
            "starting measurement pipeline"
        );

        let (tx, rx) = mpsc::channel(self.config.channel_capacity);

        let reader = MeasurementReader::new(
            input,
            self.config.read_chunk_size,
            diagnostics,
            self.config.stop_when_exhausted(),
            self.cancel.clone(),
        );
        let publisher = EventPublisher::new(output, self.config.no_headers, self.cancel.clone());

        let reader = tokio::spawn(reader.run(tx));
        let publisher = tokio::spawn(publisher.run(rx));

        let (reader, publisher) = tokio::join!(
            join_task("reader", reader, &self.cancel),
            join_task("publisher", publisher, &self.cancel),
        );

        let summary = PipelineSummary::from_parts(reader?, publisher?);
        info!(
            lines = summary.lines,
            samples = summary.samples,
            rejected = summary.rejected,
            records = summary.records,
            "measurement pipeline stopped"
        );
        Ok(summary)
    }
}

/// Await a task, cancelling the pipeline if it failed.
fn join_task<T: Send + 'static>(
    name: &'static str,
    handle: JoinHandle<PipelineResult<T>>,
    cancel: &CancellationToken,
) -> impl Future<Output = PipelineResult<T>> {
    let cancel = cancel.clone();
    async move {
        let result = handle.await.map_err(PipelineError::from).and_then(|r| r);
        if let Err(e) = &result {
            error!(task = name, error = %e, "pipeline task failed");
            cancel.cancel();
        }
        result
    }
}
