//! Publisher task: samples in, interval records out.

use std::fmt::Write as _;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::detector::{EventDetector, IntervalRecord, HEADER};
use crate::error::{PipelineError, PipelineResult};
use crate::sample::Sample;

/// Counters kept by the publisher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublisherStats {
    pub samples: u64,
    pub records: u64,
}

/// Drives an [`EventDetector`] from a sample channel and writes every
/// published record to `output` as `start,end,level`.
pub struct EventPublisher<W> {
    detector: EventDetector,
    output: W,
    no_headers: bool,
    cancel: CancellationToken,
    records: Vec<IntervalRecord>,
    text: String,
    stats: PublisherStats,
}

impl<W: AsyncWrite + Unpin> EventPublisher<W> {
    pub fn new(output: W, no_headers: bool, cancel: CancellationToken) -> Self {
        Self::with_detector(EventDetector::new(), output, no_headers, cancel)
    }

    /// Continue from an existing detector state.
    pub fn with_detector(
        detector: EventDetector,
        output: W,
        no_headers: bool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            detector,
            output,
            no_headers,
            cancel,
            records: Vec::new(),
            text: String::new(),
            stats: PublisherStats::default(),
        }
    }

    /// Run until the channel closes or the token is cancelled.
    ///
    /// Samples already in the channel are processed before cancellation is
    /// honoured. Any write failure on `output` is fatal.
    pub async fn run(
        mut self,
        mut input: mpsc::Receiver<Sample>,
    ) -> PipelineResult<PublisherStats> {
        if !self.no_headers {
            self.write(format!("{}\n", HEADER).as_bytes()).await?;
        }

        loop {
            let sample = tokio::select! {
                biased;
                sample = input.recv() => match sample {
                    Some(sample) => sample,
                    None => {
                        debug!("sample channel closed");
                        break;
                    }
                },
                _ = self.cancel.cancelled() => {
                    // Samples already handed off still count.
                    while let Ok(sample) = input.try_recv() {
                        self.handle(sample).await?;
                    }
                    debug!("publisher cancelled");
                    break;
                }
            };

            self.handle(sample).await?;
        }

        Ok(self.stats)
    }

    async fn handle(&mut self, sample: Sample) -> PipelineResult<()> {
        self.stats.samples += 1;
        self.detector.process(sample, &mut self.records);
        if self.records.is_empty() {
            return Ok(());
        }
        self.publish().await
    }

    async fn publish(&mut self) -> PipelineResult<()> {
        self.text.clear();
        for record in self.records.drain(..) {
            // Writing into a String cannot fail.
            let _ = writeln!(self.text, "{}", record);
            self.stats.records += 1;
        }

        let text = std::mem::take(&mut self.text);
        let written = self.write(text.as_bytes()).await;
        self.text = text;
        written
    }

    async fn write(&mut self, bytes: &[u8]) -> PipelineResult<()> {
        self.output
            .write_all(bytes)
            .await
            .map_err(PipelineError::Output)?;
        self.output.flush().await.map_err(PipelineError::Output)
    }
}
