//! The `veristamp attest` command.

mod capture;
pub mod types;

pub use types::{CameraArg, ReportFormat, TransportArg};

use clap::Args;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use veristamp_core::{
    AttestationPipeline, AttestationReport, BatchSummary, CancelFlag, Config, DirectorySink,
    FileDiscovery, Location, OutputFormat, OutputWriter, PersistenceSink,
};

use capture::{status_line, CaptureRunner};

/// Arguments for the `attest` command.
#[derive(Args, Debug)]
pub struct AttestArgs {
    /// Image files or directories to attest
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Latitude of the capture location
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude of the capture location
    #[arg(long, allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Attestation service base URL
    #[arg(long, env = "VERISTAMP_BASE_URL")]
    pub base_url: Option<String>,

    /// How the image is uploaded
    #[arg(long, value_enum)]
    pub transport: Option<TransportArg>,

    /// Bearer token for the attestation service
    #[arg(long, env = "VERISTAMP_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Extra attempts after a network failure
    #[arg(long)]
    pub retries: Option<u32>,

    /// Where stamped images are saved
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Attest only; do not save stamped images
    #[arg(long)]
    pub no_save: bool,

    /// Report file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum)]
    pub format: Option<ReportFormat>,

    /// Pretty-print JSON reports
    #[arg(long)]
    pub pretty: bool,

    /// Number of captures in flight at once
    #[arg(short, long, default_value = "1")]
    pub parallel: usize,

    /// Device identifier sent with each request
    #[arg(long)]
    pub device_id: Option<String>,

    /// Camera the captures came from
    #[arg(long, value_enum)]
    pub camera_type: Option<CameraArg>,

    /// Attach camera details (resolution, camera type, flash) to requests
    #[arg(long)]
    pub camera_info: bool,
}

impl AttestArgs {
    /// Layer command-line flags over the loaded configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(base_url) = &self.base_url {
            config.attestation.base_url = base_url.clone();
        }
        if let Some(transport) = self.transport {
            config.attestation.transport = transport.into();
        }
        if let Some(api_key) = &self.api_key {
            config.attestation.api_key = Some(api_key.clone());
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.attestation.timeout_ms = timeout_ms;
        }
        if let Some(retries) = self.retries {
            config.attestation.retry_attempts = retries;
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.to_string_lossy().into_owned();
        }
        if let Some(format) = self.format {
            config.output.format = OutputFormat::from(format).to_string();
        }
        if self.pretty {
            config.output.pretty = true;
        }
        if let Some(device_id) = &self.device_id {
            config.device.device_id = Some(device_id.clone());
        }
        if let Some(camera_type) = self.camera_type {
            config.device.camera_type = camera_type.into();
        }
        if self.camera_info {
            config.device.attach_camera_info = true;
        }
    }

    /// The capture location, if either coordinate was given.
    pub fn location(&self) -> Option<Location> {
        match (self.lat, self.lon) {
            (None, None) => None,
            (latitude, longitude) => Some(Location {
                latitude,
                longitude,
            }),
        }
    }
}

/// Execute the attest command.
pub async fn execute(args: AttestArgs, mut config: Config) -> anyhow::Result<()> {
    args.apply_overrides(&mut config);
    config.validate()?;
    if args.parallel == 0 {
        anyhow::bail!("--parallel must be at least 1");
    }

    let files = FileDiscovery::new(&config.codec).discover_all(&args.inputs);
    if files.is_empty() {
        tracing::warn!("No supported image files found in {:?}", args.inputs);
        return Ok(());
    }
    tracing::info!(
        "Found {} image(s) to attest via {}",
        files.len(),
        config.attestation.endpoint()
    );

    let cancel = CancelFlag::new();
    watch_ctrl_c(cancel.clone());

    let sink = (!args.no_save).then(|| {
        Arc::new(DirectorySink::new(config.output_dir(), config.output.jpeg_quality))
            as Arc<dyn PersistenceSink>
    });
    let runner = Arc::new(CaptureRunner {
        pipeline: AttestationPipeline::new(&config),
        sink,
        file_prefix: config.output.file_prefix.clone(),
        retry_attempts: config.attestation.retry_attempts,
        retry_delay_ms: config.attestation.retry_delay_ms,
        cancel,
    });

    let format = OutputFormat::parse(&config.output.format).unwrap_or(OutputFormat::Json);
    let mut writer = OutputWriter::new(report_target(&args.output)?, format, config.output.pretty);

    let location = args.location();
    let permits = Arc::new(Semaphore::new(args.parallel));
    let mut tasks = JoinSet::new();
    for (index, file) in files.iter().enumerate() {
        let runner = Arc::clone(&runner);
        let permits = Arc::clone(&permits);
        let path = file.path.clone();
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            (index, runner.run(&path, location).await)
        });
    }

    let progress = create_spinner(files.len() as u64);
    let start = Instant::now();
    let mut summary = BatchSummary::default();
    let mut reports: Vec<(usize, AttestationReport)> = Vec::new();

    while let Some(joined) = tasks.join_next().await {
        let (index, report) = joined?;
        progress.println(format!(
            "{}: {}",
            report.file_path.display(),
            status_line(&report)
        ));
        progress.inc(1);
        summary.record(&report);

        if format.is_streaming() {
            writer.write_line(&report)?;
        } else {
            reports.push((index, report));
        }
    }
    progress.finish_and_clear();

    if !format.is_streaming() {
        reports.sort_by_key(|(index, _)| *index);
        let reports: Vec<AttestationReport> = reports.into_iter().map(|(_, r)| r).collect();
        writer.write_all(&reports)?;
    }
    writer.flush()?;
    if let Some(path) = &args.output {
        tracing::info!("Report written to {:?}", path);
    }

    print_summary(&summary, start.elapsed());

    if summary.failed_total() > 0 {
        anyhow::bail!(
            "{} of {} capture(s) failed",
            summary.failed_total(),
            summary.total()
        );
    }
    Ok(())
}

/// Set `cancel` on the first Ctrl-C. In-flight uploads finish; nothing new
/// is sent and nothing more is saved.
fn watch_ctrl_c(cancel: CancelFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping before the next upload");
            cancel.cancel();
        }
    });
}

fn report_target(output: &Option<PathBuf>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::stdout().lock()),
    })
}

fn create_spinner(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {pos}/{len} attesting {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn print_summary(summary: &BatchSummary, elapsed: Duration) {
    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Attested:     {:>8}", summary.attested);
    eprintln!("    Saved:        {:>8}", summary.saved);
    for (kind, count) in &summary.failed {
        eprintln!("    Failed ({kind}): {count}");
    }
    if summary.retries > 0 {
        eprintln!("    Retries:      {:>8}", summary.retries);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", summary.total());
    eprintln!("    Duration:     {:>7.1}s", elapsed.as_secs_f64());
    eprintln!("  ====================================");
}
