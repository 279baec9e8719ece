//! Command implementations

use std::process::ExitCode;

use anyhow::{Context, Result};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapters::AppConfig;
use crate::app::{AppContainer, CutRequest};
use crate::cli::args::{CutArgs, ImportArgs, ProbeArgs};
use crate::domain::model::TimeRange;
use crate::engine::JobEventKind;
use crate::error::ParcaError;
use crate::ranges::{import_file, parse_range};

/// Execute the import command
pub fn import(args: ImportArgs) -> Result<ExitCode> {
    let result = import_file(&args.file)
        .with_context(|| format!("Failed to read range file {}", args.file.display()))?;

    if args.json {
        let errors: Vec<_> = result
            .errors
            .iter()
            .map(|e| {
                json!({
                    "line": e.line_number,
                    "text": e.error.line,
                    "reason": e.error.reason.to_string(),
                })
            })
            .collect();
        let body = json!({ "ranges": result.ranges, "errors": errors });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        for (position, range) in result.ranges.iter().enumerate() {
            println!("{:>3}  {}  ({})", position + 1, range, range.duration());
        }
        for error in &result.errors {
            eprintln!("line {}: {}", error.line_number, error.error);
        }
        eprintln!(
            "{} range(s) accepted, {} line(s) rejected",
            result.ranges.len(),
            result.errors.len()
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// Execute the probe command
pub async fn probe(args: ProbeArgs, config: AppConfig) -> Result<ExitCode> {
    let container = AppContainer::new(config);
    let duration = container.probe_port().probe_duration(&args.video).await?;

    if args.json {
        let body = json!({
            "path": args.video,
            "duration": duration,
            "seconds": duration.as_seconds(),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        println!("{}", duration);
    }
    Ok(ExitCode::SUCCESS)
}

/// Execute the cut command
pub async fn cut(args: CutArgs, mut config: AppConfig, cancel: CancellationToken) -> Result<ExitCode> {
    apply_overrides(&mut config, &args);
    config.validate()?;

    let ranges = collect_ranges(&args)?;
    let request = CutRequest {
        source: args.video.clone(),
        ranges,
        mode: args.mode,
        known_duration: args.duration,
    };

    let container = AppContainer::new(config);
    let interactor = container.batch_interactor(!args.dry_run)?;
    let prepared = interactor.prepare(&request).await?;

    if args.dry_run {
        let invocations = interactor.invocations(&prepared);
        if args.json {
            let planned: Vec<_> = prepared
                .plan
                .jobs
                .iter()
                .zip(&invocations)
                .map(|(job, invocation)| {
                    json!({
                        "index": job.index,
                        "range": job.range,
                        "output_path": job.output_path,
                        "command": invocation.to_shell_string(),
                    })
                })
                .collect();
            let body = json!({ "jobs": planned, "rejected": prepared.plan.rejected });
            println!("{}", serde_json::to_string_pretty(&body)?);
        } else {
            for invocation in &invocations {
                println!("{}", invocation);
            }
            for rejected in &prepared.plan.rejected {
                eprintln!(
                    "range #{} {} rejected: {}",
                    rejected.range_index, rejected.range, rejected.reason
                );
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut batch = interactor.start(prepared, cancel)?;
    while let Some(event) = batch.next_event().await {
        let percent = event.batch_fraction * 100.0;
        match &event.kind {
            JobEventKind::Started => {
                eprintln!("[{:02}] started ({:.0}% of batch done)", event.job_index, percent);
            }
            JobEventKind::Progress => {
                debug!(job = event.job_index, fraction = event.fraction_complete, batch = event.batch_fraction, "Progress");
            }
            JobEventKind::Succeeded { output_path } => {
                eprintln!("[{:02}] wrote {} ({:.0}% of batch done)", event.job_index, output_path.display(), percent);
            }
            JobEventKind::Failed { reason } => {
                eprintln!("[{:02}] failed: {}", event.job_index, reason);
            }
        }
    }

    let report = batch.finish().await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.render_text());
    }

    if report.all_succeeded() {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!(failed = report.failed(), "Some clips were not written");
        Ok(ExitCode::FAILURE)
    }
}

fn apply_overrides(config: &mut AppConfig, args: &CutArgs) {
    if let Some(dir) = &args.out_dir {
        config.batch.output_dir = dir.clone();
    }
    if let Some(codec) = &args.codec {
        config.encoding.video_codec = codec.clone();
    }
    if let Some(crf) = args.crf {
        config.encoding.crf = crf;
    }
    if let Some(preset) = &args.preset {
        config.encoding.preset = preset.clone();
    }
    if let Some(audio) = args.audio {
        config.encoding.audio = audio;
    }
    if let Some(bitrate) = &args.audio_bitrate {
        config.encoding.audio_bitrate = bitrate.clone();
    }
    if let Some(jobs) = args.jobs {
        config.batch.concurrency = jobs;
    }
}

/// Ranges from `--ranges` in file order, then every `--range` in argument order
fn collect_ranges(args: &CutArgs) -> Result<Vec<TimeRange>> {
    let mut ranges = Vec::new();

    if let Some(path) = &args.ranges {
        let result = import_file(path)
            .with_context(|| format!("Failed to read range file {}", path.display()))?;
        for error in &result.errors {
            warn!(line = error.line_number, error = %error.error, "Skipping bad range line");
        }
        info!(accepted = result.ranges.len(), rejected = result.errors.len(), "Imported ranges");
        ranges.extend(result.ranges);
    }

    for expr in &args.range {
        let range = parse_range(expr).map_err(|e| ParcaError::InvalidArgument {
            message: format!("--range {}", e),
        })?;
        ranges.push(range);
    }

    Ok(ranges)
}
