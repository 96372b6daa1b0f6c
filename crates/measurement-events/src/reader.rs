//! Reader task: bytes in, samples out.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{LineError, PipelineError, PipelineResult};
use crate::sample::{parse_line, Sample};
use crate::scanner::LineScanner;

/// Counters kept by the reader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    pub lines: u64,
    pub samples: u64,
    pub ignored: u64,
    pub rejected: u64,
}

/// Reads `<time>,<level>` lines and forwards parsed samples downstream.
///
/// Rejected lines go to `diagnostics`, one line each. End-of-input either
/// ends the pipeline (cancelling the shared token) or, when
/// `stop_when_exhausted` is false, leaves the reader idle until the token
/// is cancelled from elsewhere.
pub struct MeasurementReader<R, E> {
    scanner: LineScanner<R>,
    diagnostics: E,
    stop_when_exhausted: bool,
    cancel: CancellationToken,
    stats: ReaderStats,
}

impl<R, E> MeasurementReader<R, E>
where
    R: AsyncRead + Unpin,
    E: AsyncWrite + Unpin,
{
    pub fn new(
        source: R,
        chunk_size: usize,
        diagnostics: E,
        stop_when_exhausted: bool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            scanner: LineScanner::with_chunk_size(source, chunk_size),
            diagnostics,
            stop_when_exhausted,
            cancel,
            stats: ReaderStats::default(),
        }
    }

    /// Run until end-of-input or cancellation.
    ///
    /// Returns an error only when the source fails. A failing diagnostic sink
    /// is logged and otherwise ignored.
    pub async fn run(mut self, output: mpsc::Sender<Sample>) -> PipelineResult<ReaderStats> {
        loop {
            let parsed = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("reader cancelled");
                    return Ok(self.stats);
                }
                line = self.scanner.next_line() => {
                    line.map_err(PipelineError::Input)?.map(parse_line)
                }
            };

            let Some(parsed) = parsed else {
                break;
            };
            self.stats.lines += 1;

            match parsed {
                Ok(sample) => {
                    if !forward(&self.cancel, &output, sample).await {
                        return Ok(self.stats);
                    }
                    self.stats.samples += 1;
                }
                Err(err) => self.reject(err).await,
            }
        }

        let remainder = self.scanner.remainder();
        if !remainder.is_empty() {
            debug!(bytes = remainder.len(), "dropping unterminated final line");
        }

        info!(
            lines = self.stats.lines,
            samples = self.stats.samples,
            "input exhausted"
        );

        if self.stop_when_exhausted {
            self.cancel.cancel();
        } else {
            // Hold the sender so the publisher keeps waiting.
            self.cancel.cancelled().await;
        }
        drop(output);

        Ok(self.stats)
    }

    async fn reject(&mut self, err: LineError) {
        if !err.is_reported() {
            self.stats.ignored += 1;
            return;
        }

        self.stats.rejected += 1;
        debug!(line = self.stats.lines, error = %err, "rejected input line");

        let message = format!("Received invalid input: {}\n", err);
        let written = match self.diagnostics.write_all(message.as_bytes()).await {
            Ok(()) => self.diagnostics.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            warn!(line = self.stats.lines, error = %e, "failed to write diagnostic");
        }
    }
}

/// Hand one sample downstream. Returns false once nobody is listening.
async fn forward(
    cancel: &CancellationToken,
    output: &mpsc::Sender<Sample>,
    sample: Sample,
) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = output.send(sample) => {
            if sent.is_err() {
                debug!("sample channel closed");
            }
            sent.is_ok()
        }
    }
}
