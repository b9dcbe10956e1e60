use std::fs::File;
use std::io::{BufWriter, Write};

use gridlink_pipeline::{
    FrameSource, Pipeline, PipelineConfig, PipelineReport, Prequantized, Quantizer, StopReason,
    WriterSink,
};

use crate::cmd::grids::GridFileSource;
use crate::cmd::synthetic::{self, SyntheticFrame, SyntheticSource};
use crate::cmd::RunArgs;
use crate::exit::{io_error, pipeline_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS};
use crate::output::{print_report, OutputFormat};

const DEFAULT_WIDTH: usize = 120;
const DEFAULT_HEIGHT: usize = 80;

type Sink = WriterSink<Box<dyn Write + Send>>;

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let config = resolve_config(&args)?;

    let to_stdout = args.output.is_none() && matches!(format, OutputFormat::Raw);
    let writer: Box<dyn Write + Send> = match &args.output {
        Some(path) => {
            let file = File::create(path)
                .map_err(|err| io_error(&format!("failed creating {}", path.display()), err))?;
            Box::new(BufWriter::new(file))
        }
        None if to_stdout => Box::new(std::io::stdout()),
        None => Box::new(std::io::sink()),
    };
    let mut sink = WriterSink::new(writer);

    let report = match (&args.input, args.synthetic) {
        (Some(path), _) => {
            let width = args.width.unwrap_or(DEFAULT_WIDTH);
            let height = args.height.unwrap_or(DEFAULT_HEIGHT);
            let source = GridFileSource::open(path, width, height, config.run_format())?;
            execute(config, source, Prequantized, &mut sink)?
        }
        (None, Some(frames)) => {
            let width = args.width.unwrap_or(DEFAULT_WIDTH);
            let height = args.height.unwrap_or(DEFAULT_HEIGHT);
            let run_format = config.run_format();
            let quantizer = move |frame: SyntheticFrame| {
                Ok(Some(synthetic::quantize(frame, width, height, run_format)))
            };
            execute(config, SyntheticSource::new(frames), quantizer, &mut sink)?
        }
        (None, None) => return Err(CliError::usage("one of --input or --synthetic is required")),
    };

    sink.into_inner()
        .flush()
        .map_err(|err| io_error("flush failed", err))?;

    if to_stdout {
        tracing::info!(
            delivered = report.delivered,
            stop_reason = ?report.stop_reason,
            "pipeline finished"
        );
    } else {
        print_report(&report, format);
    }

    match report.stop_reason {
        StopReason::InputExhausted | StopReason::Requested => Ok(SUCCESS),
        StopReason::SinkClosed | StopReason::SourceFailed => Ok(FAILURE),
    }
}

fn resolve_config(args: &RunArgs) -> CliResult<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path).map_err(|err| {
            pipeline_error(&format!("failed loading {}", path.display()), err)
        })?,
        None => PipelineConfig::default(),
    };

    if let Some(profile) = args.profile {
        config.profile = profile.into();
    }
    if let Some(levels) = args.levels {
        config.levels = levels.into();
    }
    if let Some(capacity) = args.queue_capacity {
        config.queue_capacity = capacity;
    }
    if let Some(skip) = args.frame_skip {
        config.frame_skip = skip;
    }
    if let Some(budget_ms) = args.frame_budget_ms {
        config.frame_budget_ms = budget_ms;
    }
    if let Some(budget) = args.rle_budget {
        config.rle_budget = budget;
    }
    if let Some(ceiling) = args.bandwidth_ceiling_kbps {
        config.bandwidth_ceiling_kbps = ceiling;
    }
    if let Some(every) = args.telemetry_every {
        config.telemetry_every = every;
    }

    config
        .validate()
        .map_err(|err| pipeline_error("invalid pipeline config", err))?;
    Ok(config)
}

fn execute<S, Q>(
    config: PipelineConfig,
    source: S,
    quantizer: Q,
    sink: &mut Sink,
) -> CliResult<PipelineReport>
where
    S: FrameSource + Send,
    S::Frame: 'static,
    Q: Quantizer<S::Frame> + Send,
{
    let pipeline = Pipeline::<S::Frame>::new(config)
        .map_err(|err| pipeline_error("invalid pipeline config", err))?;

    let handle = pipeline.shutdown_handle();
    ctrlc::set_handler(move || {
        tracing::info!("interrupt received, stopping pipeline");
        handle.shutdown();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("failed to install signal handler: {err}")))?;

    pipeline
        .run(source, quantizer, sink)
        .map_err(|err| pipeline_error("pipeline failed", err))
}
