use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

use gridlink_packet::{decode_message, decode_packet, DecodedFrame, PacketReader};

use crate::cmd::{DecodeArgs, ProfileArg};
use crate::exit::{io_error, packet_error, CliResult, SUCCESS};
use crate::output::{print_decoded, print_raw, DecodedRow, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let file = File::open(&args.packets)
        .map_err(|err| io_error(&format!("failed opening {}", args.packets.display()), err))?;
    let mut reader = PacketReader::new(BufReader::new(file));

    let mut grid_out = match &args.grid_out {
        Some(path) => Some(BufWriter::new(File::create(path).map_err(|err| {
            io_error(&format!("failed creating {}", path.display()), err)
        })?)),
        None => None,
    };

    let mut rows = Vec::new();
    let mut cells = Vec::new();
    while let Some(frame) = next_frame(&mut reader, args.profile)? {
        if let Some(out) = grid_out.as_mut() {
            out.write_all(frame.grid.cells())
                .map_err(|err| io_error("failed writing grid", err))?;
        } else if matches!(format, OutputFormat::Raw) {
            cells.extend_from_slice(frame.grid.cells());
        }
        rows.push(DecodedRow::from(&frame));
    }

    if let Some(mut out) = grid_out {
        out.flush()
            .map_err(|err| io_error("failed writing grid", err))?;
    }
    tracing::info!(frames = rows.len(), "decode complete");

    if matches!(format, OutputFormat::Raw) && args.grid_out.is_none() {
        print_raw(&cells);
    } else {
        print_decoded(&rows, format);
    }
    Ok(SUCCESS)
}

fn next_frame<R: std::io::Read>(
    reader: &mut PacketReader<R>,
    profile: ProfileArg,
) -> CliResult<Option<DecodedFrame>> {
    match profile {
        ProfileArg::Fixed => {
            let packet = reader
                .next_packet()
                .map_err(|err| packet_error("read failed", err))?;
            Ok(packet.map(|packet| decode_packet(&packet)))
        }
        ProfileArg::Variable => match reader
            .next_message()
            .map_err(|err| packet_error("read failed", err))?
        {
            Some(message) => decode_message(&message)
                .map(Some)
                .map_err(|err| packet_error("decode failed", err)),
            None => Ok(None),
        },
    }
}
