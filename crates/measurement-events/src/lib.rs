//! # measurement-events
//!
//! Turns a stream of timestamped level readings (`<time>,<level>` with
//! level in `[-2, 2]`) into interval events: one `start,end,level` record
//! per contiguous run during which the signal stayed at or beyond a
//! threshold on one side of zero.
//!
//! ## Architecture
//!
//! ```text
//!   bytes ──► MeasurementReader ──► mpsc<Sample> ──► EventPublisher ──► records
//!             (LineScanner +          (bounded,        (EventDetector +
//!              parse_line)             backpressure)     formatting)
//!                    │                                        │
//!                    └──────────── CancellationToken ─────────┘
//! ```
//!
//! Interval records are held back per threshold until the signal returns
//! to or crosses zero; the whole excursion is then published at once, the
//! `±1` threshold before the `±2` threshold. Intervals still open or
//! queued when the input ends are never published.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use measurement_events::{Pipeline, PipelineConfig};
//!
//! # async fn run() -> measurement_events::PipelineResult<()> {
//! let summary = Pipeline::new(PipelineConfig::default())
//!     .run(tokio::io::stdin(), tokio::io::stdout(), tokio::io::stderr())
//!     .await?;
//! println!("{} records", summary.records);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod detector;
pub mod error;
pub mod pipeline;
pub mod publisher;
pub mod reader;
pub mod sample;
pub mod scanner;
pub mod threshold;

pub use config::{LoggingConfig, PipelineConfig};
pub use detector::{EventDetector, IntervalRecord, OpenInterval, HEADER};
pub use error::{LineError, PipelineError, PipelineResult};
pub use pipeline::{Pipeline, PipelineSummary};
pub use publisher::{EventPublisher, PublisherStats};
pub use reader::{MeasurementReader, ReaderStats};
pub use sample::{parse_line, Level, Sample};
pub use scanner::LineScanner;
pub use threshold::Threshold;
