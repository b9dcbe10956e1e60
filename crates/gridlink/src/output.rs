use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use gridlink_packet::{DecodedFrame, ObjectRecord};
use gridlink_pipeline::{EncodedFrame, PipelineReport};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EncodedRow {
    pub sequence: u8,
    pub wire_bytes: usize,
    pub raw_bytes: usize,
    pub rle_bytes: usize,
    pub overflow: bool,
    pub entropy_coded: bool,
}

impl From<&EncodedFrame> for EncodedRow {
    fn from(frame: &EncodedFrame) -> Self {
        Self {
            sequence: frame.sequence,
            wire_bytes: frame.wire_size(),
            raw_bytes: frame.raw_size,
            rle_bytes: frame.rle_bytes,
            overflow: frame.overflow,
            entropy_coded: frame.entropy_coded,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ObjectRow {
    pub x: u8,
    pub y: u8,
    pub radius: u8,
}

#[derive(Debug, Serialize)]
pub struct DecodedRow {
    pub sequence: u8,
    pub width: usize,
    pub height: usize,
    pub flags: Vec<&'static str>,
    pub occupied: usize,
    pub objects: Vec<ObjectRow>,
}

impl From<&DecodedFrame> for DecodedRow {
    fn from(frame: &DecodedFrame) -> Self {
        Self {
            sequence: frame.sequence,
            width: frame.grid.width(),
            height: frame.grid.height(),
            flags: frame.flags.names(),
            occupied: frame.grid.occupied(),
            objects: frame.objects.iter().map(ObjectRow::from).collect(),
        }
    }
}

impl From<&ObjectRecord> for ObjectRow {
    fn from(record: &ObjectRecord) -> Self {
        Self {
            x: record.x,
            y: record.y,
            radius: record.radius,
        }
    }
}

pub fn print_encoded(rows: &[EncodedRow], format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => print_json(&rows),
        OutputFormat::Table => {
            let mut table = new_table(vec!["SEQ", "WIRE", "RAW", "RLE", "OVERFLOW", "ENTROPY"]);
            for row in rows {
                table.add_row(vec![
                    row.sequence.to_string(),
                    row.wire_bytes.to_string(),
                    row.raw_bytes.to_string(),
                    row.rle_bytes.to_string(),
                    yes_no(row.overflow).to_string(),
                    yes_no(row.entropy_coded).to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in rows {
                println!(
                    "seq={} wire={}B raw={}B rle={}B overflow={} entropy={}",
                    row.sequence,
                    row.wire_bytes,
                    row.raw_bytes,
                    row.rle_bytes,
                    row.overflow,
                    row.entropy_coded
                );
            }
        }
    }
}

pub fn print_decoded(rows: &[DecodedRow], format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => print_json(&rows),
        OutputFormat::Table => {
            let mut table = new_table(vec!["SEQ", "SIZE", "FLAGS", "OCCUPIED", "OBJECTS"]);
            for row in rows {
                table.add_row(vec![
                    row.sequence.to_string(),
                    format!("{}x{}", row.width, row.height),
                    row.flags.join(","),
                    row.occupied.to_string(),
                    objects_summary(&row.objects),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in rows {
                println!(
                    "seq={} size={}x{} flags=[{}] occupied={} objects=[{}]",
                    row.sequence,
                    row.width,
                    row.height,
                    row.flags.join(","),
                    row.occupied,
                    objects_summary(&row.objects)
                );
            }
        }
    }
}

pub fn print_report(report: &PipelineReport, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => print_json(report),
        OutputFormat::Table => {
            let t = &report.telemetry;
            let mut table = new_table(vec!["METRIC", "VALUE"]);
            for (name, value) in [
                ("captured", report.captured.to_string()),
                ("skipped", report.skipped.to_string()),
                ("enqueued", report.enqueued.to_string()),
                ("empty", report.empty.to_string()),
                ("encoded", report.encoded.to_string()),
                ("failed", report.failed.to_string()),
                ("overflowed", report.overflowed.to_string()),
                ("delivered", report.delivered.to_string()),
                ("stop_reason", format!("{:?}", report.stop_reason)),
                ("elapsed_ms", report.elapsed_ms.to_string()),
                ("avg_latency_ms", format!("{:.2}", t.avg_latency_ms)),
                ("avg_wire_bytes", format!("{:.1}", t.avg_wire_bytes)),
                ("max_rle_bytes", t.max_rle_bytes.to_string()),
                ("compression_pct", format!("{:.1}", t.compression_ratio_pct)),
                ("bandwidth_kbps", format!("{:.2}", t.bandwidth_kbps)),
                ("within_ceiling", yes_no(t.within_ceiling).to_string()),
            ] {
                table.add_row(vec![name.to_string(), value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "captured={} delivered={} failed={} overflowed={} stop={:?}",
                report.captured,
                report.delivered,
                report.failed,
                report.overflowed,
                report.stop_reason
            );
            println!(
                "avg_latency={:.2}ms avg_wire={:.1}B bandwidth={:.2}kbps within_ceiling={}",
                report.telemetry.avg_latency_ms,
                report.telemetry.avg_wire_bytes,
                report.telemetry.bandwidth_kbps,
                report.telemetry.within_ceiling
            );
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn objects_summary(objects: &[ObjectRow]) -> String {
    objects
        .iter()
        .map(|o| format!("({},{} r{})", o.x, o.y, o.radius))
        .collect::<Vec<_>>()
        .join(" ")
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
