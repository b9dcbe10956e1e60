use std::sync::Arc;
use std::thread;
use std::time::Instant;

use serde::Serialize;

use crate::config::{PipelineConfig, Profile};
use crate::context::{PipelineContext, ShutdownHandle};
use crate::encoder::FrameEncoder;
use crate::error::{PipelineError, Result};
use crate::pacing::Pacer;
use crate::source::{FrameSource, PacketSink, Quantizer};
use crate::telemetry::{Telemetry, TelemetrySnapshot};

/// Why a pipeline run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    InputExhausted,
    Requested,
    SinkClosed,
    SourceFailed,
}

/// Counters for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    /// Frames read from the source.
    pub captured: u64,
    /// Frames dropped by frame-skip decimation.
    pub skipped: u64,
    /// Frames accepted into the queue.
    pub enqueued: u64,
    /// Frames the quantizer turned down.
    pub empty: u64,
    pub encoded: u64,
    /// Frames that failed to encode or deliver.
    pub failed: u64,
    pub overflowed: u64,
    pub delivered: u64,
    pub stop_reason: StopReason,
    pub elapsed_ms: u64,
    /// Statistics over every encoded frame.
    pub telemetry: TelemetrySnapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ProducerExit {
    #[default]
    Interrupted,
    Exhausted,
    Failed,
}

#[derive(Debug, Default)]
struct ProducerStats {
    captured: u64,
    skipped: u64,
    enqueued: u64,
    exit: ProducerExit,
}

#[derive(Debug, Default)]
struct ConsumerStats {
    empty: u64,
    encoded: u64,
    failed: u64,
    overflowed: u64,
    delivered: u64,
    sink_closed: bool,
}

/// Two-thread capture → encode → deliver pipeline over a bounded queue.
///
/// The producer pulls frames from a [`FrameSource`], keeps every Nth one and
/// blocks while the queue is full. The consumer quantizes, encodes, delivers
/// and paces each frame. Either side, or a [`ShutdownHandle`], can stop the
/// run; frames already queued at that point are still processed unless the
/// sink has closed.
pub struct Pipeline<F> {
    config: PipelineConfig,
    context: Arc<PipelineContext<F>>,
}

impl<F: Send + 'static> Pipeline<F> {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let context = Arc::new(PipelineContext::new(config.queue_capacity));
        Ok(Self { config, context })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Handle that stops this pipeline from any thread.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle::new(Arc::clone(&self.context))
    }

    /// Run until the source is exhausted, the sink closes, or shutdown is
    /// requested. Both worker threads are joined before this returns.
    pub fn run<S, Q, K>(self, source: S, quantizer: Q, sink: K) -> Result<PipelineReport>
    where
        S: FrameSource<Frame = F> + Send,
        Q: Quantizer<F> + Send,
        K: PacketSink + Send,
    {
        let started = Instant::now();
        let ctx = self.context.as_ref();
        let config = &self.config;

        tracing::info!(
            profile = ?config.profile,
            levels = ?config.levels,
            queue_capacity = config.queue_capacity,
            frame_skip = config.frame_skip,
            frame_budget_ms = config.frame_budget_ms,
            "pipeline starting"
        );

        let mut total = Telemetry::new();
        let (producer, consumer) = thread::scope(|scope| {
            let producer = thread::Builder::new()
                .name("gridlink-producer".to_string())
                .spawn_scoped(scope, || produce(ctx, config, source))?;
            let consumer = match thread::Builder::new()
                .name("gridlink-consumer".to_string())
                .spawn_scoped(scope, || consume(ctx, config, quantizer, sink, &mut total))
            {
                Ok(handle) => handle,
                Err(err) => {
                    ctx.shutdown();
                    return Err(PipelineError::Io(err));
                }
            };

            let producer = join_worker(producer.join(), ctx)?;
            let consumer = join_worker(consumer.join(), ctx)?;
            Ok::<_, PipelineError>((producer, consumer))
        })?;

        let stop_reason = if consumer.sink_closed {
            StopReason::SinkClosed
        } else {
            match producer.exit {
                ProducerExit::Exhausted => StopReason::InputExhausted,
                ProducerExit::Failed => StopReason::SourceFailed,
                ProducerExit::Interrupted => StopReason::Requested,
            }
        };

        let report = PipelineReport {
            captured: producer.captured,
            skipped: producer.skipped,
            enqueued: producer.enqueued,
            empty: consumer.empty,
            encoded: consumer.encoded,
            failed: consumer.failed,
            overflowed: consumer.overflowed,
            delivered: consumer.delivered,
            stop_reason,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            telemetry: total.snapshot(config.frames_per_second(), config.bandwidth_ceiling_kbps),
        };

        tracing::info!(
            captured = report.captured,
            encoded = report.encoded,
            delivered = report.delivered,
            failed = report.failed,
            overflowed = report.overflowed,
            stop_reason = ?report.stop_reason,
            "pipeline stopped"
        );
        Ok(report)
    }
}

fn join_worker<F, T>(joined: thread::Result<T>, ctx: &PipelineContext<F>) -> Result<T> {
    joined.map_err(|_| {
        ctx.shutdown();
        PipelineError::Worker
    })
}

fn produce<F, S>(ctx: &PipelineContext<F>, config: &PipelineConfig, mut source: S) -> ProducerStats
where
    S: FrameSource<Frame = F>,
{
    let mut stats = ProducerStats::default();
    let skip = u64::from(config.frame_skip.max(1));

    while ctx.is_running() {
        let frame = match source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::debug!(captured = stats.captured, "frame source exhausted");
                stats.exit = ProducerExit::Exhausted;
                break;
            }
            Err(err) => {
                tracing::error!(error = %err, "frame source failed, stopping pipeline");
                stats.exit = ProducerExit::Failed;
                break;
            }
        };

        let index = stats.captured;
        stats.captured += 1;
        if index % skip != 0 {
            stats.skipped += 1;
            continue;
        }

        if ctx.push_blocking(frame).is_err() {
            tracing::debug!("shutdown while waiting for queue space");
            break;
        }
        stats.enqueued += 1;
    }

    ctx.shutdown();
    stats
}

fn consume<F, Q, K>(
    ctx: &PipelineContext<F>,
    config: &PipelineConfig,
    mut quantizer: Q,
    mut sink: K,
    total: &mut Telemetry,
) -> ConsumerStats
where
    Q: Quantizer<F>,
    K: PacketSink,
{
    let mut stats = ConsumerStats::default();
    let mut encoder = FrameEncoder::new(config);
    let mut window = Telemetry::new();
    let pacer = Pacer::new(config.frame_budget());
    let fps = config.frames_per_second();
    let budget_warning = (config.profile == Profile::Fixed).then_some(config.rle_budget);

    loop {
        let Some(frame) = ctx.pop_timeout(config.pop_timeout()) else {
            if ctx.is_running() {
                continue;
            }
            break;
        };
        let started = Instant::now();

        // Every popped frame takes one budget slot, whether or not it is sent.
        let encoded = 'frame: {
            let quantized = match quantizer.quantize(frame) {
                Ok(Some(quantized)) => quantized,
                Ok(None) => {
                    stats.empty += 1;
                    tracing::trace!("quantizer skipped frame");
                    break 'frame None;
                }
                Err(err) => {
                    stats.failed += 1;
                    tracing::warn!(error = %err, "failed to quantize frame, skipping");
                    break 'frame None;
                }
            };
            match encoder.encode(&quantized) {
                Ok(encoded) => Some(encoded),
                Err(err) => {
                    stats.failed += 1;
                    tracing::warn!(error = %err, "failed to encode frame, skipping");
                    None
                }
            }
        };

        if let Some(encoded) = encoded {
            stats.encoded += 1;
            if encoded.overflow {
                stats.overflowed += 1;
                tracing::debug!(
                    sequence = encoded.sequence,
                    rle_bytes = encoded.rle_bytes,
                    "frame truncated to packet budget"
                );
            }

            match sink.deliver(&encoded) {
                Ok(()) => stats.delivered += 1,
                Err(PipelineError::SinkClosed) => {
                    tracing::info!(sequence = encoded.sequence, "sink closed, stopping pipeline");
                    stats.sink_closed = true;
                    ctx.shutdown();
                    break;
                }
                Err(err) => {
                    stats.failed += 1;
                    tracing::warn!(sequence = encoded.sequence, error = %err, "failed to deliver frame");
                }
            }

            let latency = started.elapsed();
            window.record(&encoded, latency);
            total.record(&encoded, latency);
            if config.telemetry_every > 0 && window.frames() >= config.telemetry_every {
                window
                    .snapshot(fps, config.bandwidth_ceiling_kbps)
                    .log(budget_warning);
                window.reset();
            }
        }

        pacer.pace(started);
    }

    stats
}
