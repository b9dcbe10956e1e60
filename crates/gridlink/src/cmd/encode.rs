use std::fs::File;
use std::io::{BufWriter, Write};

use gridlink_packet::Detections;
use gridlink_pipeline::{FrameEncoder, PacketSink, PipelineConfig, QuantizedFrame, WriterSink};

use crate::cmd::grids::GridFileSource;
use crate::cmd::EncodeArgs;
use crate::exit::{io_error, pipeline_error, CliResult, SUCCESS};
use crate::output::{print_encoded, EncodedRow, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = PipelineConfig {
        profile: args.profile.into(),
        levels: args.levels.into(),
        rle_budget: args.budget,
        ..PipelineConfig::default()
    };
    config
        .validate()
        .map_err(|err| pipeline_error("invalid encode options", err))?;

    let mut source =
        GridFileSource::open(&args.grid, args.width, args.height, config.run_format())?;
    let mut encoder = FrameEncoder::new(&config).with_sequence(args.sequence);

    // Raw output with no file streams the packets themselves to stdout.
    let to_stdout = args.output.is_none() && matches!(format, OutputFormat::Raw);
    let mut sink = match &args.output {
        Some(path) => {
            let file = File::create(path)
                .map_err(|err| io_error(&format!("failed creating {}", path.display()), err))?;
            Some(WriterSink::new(Box::new(BufWriter::new(file)) as Box<dyn Write>))
        }
        None if to_stdout => Some(WriterSink::new(Box::new(std::io::stdout()) as Box<dyn Write>)),
        None => None,
    };

    let mut rows = Vec::new();
    while let Some(grid) = source
        .read_grid()
        .map_err(|err| io_error(&format!("failed reading {}", args.grid.display()), err))?
    {
        let frame = QuantizedFrame::new(grid, Detections::none());
        let encoded = encoder
            .encode(&frame)
            .map_err(|err| pipeline_error("encode failed", err))?;
        if encoded.overflow {
            tracing::warn!(
                sequence = encoded.sequence,
                rle_bytes = encoded.rle_bytes,
                "run data truncated to packet budget"
            );
        }
        if let Some(sink) = sink.as_mut() {
            sink.deliver(&encoded)
                .map_err(|err| pipeline_error("write failed", err))?;
        }
        rows.push(EncodedRow::from(&encoded));
    }

    if let Some(sink) = sink {
        sink.into_inner()
            .flush()
            .map_err(|err| io_error("flush failed", err))?;
    }
    tracing::info!(frames = rows.len(), "encode complete");

    if !to_stdout {
        print_encoded(&rows, format);
    }
    Ok(SUCCESS)
}
