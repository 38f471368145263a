use std::{path::PathBuf, sync::Arc};

use amr_client::domain::{Gate, MeterRecord};
use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use target_operasi::{
    config::{AppConfig, OutputFormat, ThresholdSettings},
    engine::{Engine, CATALOG},
    observability,
    pipeline::{EnvelopeStream, Pipeline, Source},
    sinks::{CsvTableWriter, NdjsonTableWriter, OutputTarget, ScoringSink, TableWriter},
    sources::{MeterCsvFileSource, MeterNdjsonFileSource},
    transform,
};

#[derive(Parser, Debug)]
#[command(name = "target-operasi")]
#[command(about = "Rank AMR meter readings into P2TL inspection targets", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GateArg {
    #[value(name = "kl_terbalik")]
    KlTerbalik,
    #[value(name = "imp_gt_exp")]
    ImpGtExp,
    #[value(name = "v_lost_ada_arus")]
    VLostAdaArus,
}

impl From<GateArg> for Gate {
    fn from(arg: GateArg) -> Self {
        match arg {
            GateArg::KlTerbalik => Gate::KlTerbalik,
            GateArg::ImpGtExp => Gate::ImpGtExp,
            GateArg::VLostAdaArus => Gate::VLostAdaArus,
        }
    }
}

#[derive(clap::Args, Debug)]
struct ThresholdArgs {
    /// Minimum number of raised indicators
    #[arg(long)]
    min_indicators: Option<usize>,

    /// Minimum score
    #[arg(long)]
    min_score: Option<f64>,

    /// Number of ranked records to keep
    #[arg(long)]
    top_n: Option<usize>,

    /// Voltage-drop limit (V)
    #[arg(long)]
    v_drop_tm: Option<f64>,

    /// Overvoltage ceiling (V)
    #[arg(long)]
    v_max: Option<f64>,

    /// Current a phase must carry to count as loaded (A)
    #[arg(long)]
    i_min: Option<f64>,

    /// Power factor at or below which a loaded phase is flagged
    #[arg(long)]
    cos_phi_max: Option<f64>,

    /// Load current required before a low power factor counts (A)
    #[arg(long)]
    cos_phi_i_min: Option<f64>,

    /// Current below which a phase counts as lost (A)
    #[arg(long)]
    i_lost_floor: Option<f64>,

    /// Current required for a zero active-power phase to count as lost (A)
    #[arg(long)]
    i_lost_min: Option<f64>,

    /// Neutral current floor (A)
    #[arg(long)]
    i_n_min: Option<f64>,

    /// Overcurrent ceiling (A)
    #[arg(long)]
    i_max: Option<f64>,

    /// Active power below which a loaded phase counts as reversed (kW)
    #[arg(long, allow_negative_numbers = true)]
    p_reverse_max: Option<f64>,

    /// Current unbalance tolerance
    #[arg(long)]
    unbalance_tol: Option<f64>,

    /// Neutral-to-phase current ratio
    #[arg(long)]
    netral_vs_fasa: Option<f64>,

    /// Uniform indicator weight
    #[arg(long)]
    weight: Option<f64>,

    /// Turn on gated indicators
    #[arg(long, value_enum, value_delimiter = ',')]
    enable: Vec<GateArg>,

    /// Switch indicators off by column name
    #[arg(long, value_delimiter = ',')]
    disable: Vec<String>,
}

impl ThresholdArgs {
    fn apply(self, settings: &mut ThresholdSettings) {
        let overrides = [
            (self.min_score, &mut settings.min_score),
            (self.v_drop_tm, &mut settings.v_drop_tm),
            (self.v_max, &mut settings.v_max),
            (self.i_min, &mut settings.i_min),
            (self.cos_phi_max, &mut settings.cos_phi_max),
            (self.cos_phi_i_min, &mut settings.cos_phi_i_min),
            (self.i_lost_floor, &mut settings.i_lost_floor),
            (self.i_lost_min, &mut settings.i_lost_min),
            (self.i_n_min, &mut settings.i_n_min),
            (self.i_max, &mut settings.i_max),
            (self.p_reverse_max, &mut settings.p_reverse_max),
            (self.unbalance_tol, &mut settings.unbalance_tol),
            (self.netral_vs_fasa, &mut settings.netral_vs_fasa),
            (self.weight, &mut settings.weight),
        ];
        for (value, slot) in overrides {
            if let Some(v) = value {
                *slot = v;
            }
        }
        if let Some(n) = self.min_indicators {
            settings.min_indicators = n;
        }
        if let Some(n) = self.top_n {
            settings.top_n = n;
        }
        for gate in self.enable {
            settings.set_gate(gate.into(), true);
        }
        settings.disabled.extend(self.disable);
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Score a meter-reading export and write the ranked Target Operasi list
    Analyze {
        /// CSV, pipe-delimited .dat, or NDJSON (.ndjson / .jsonl) file
        input: PathBuf,

        /// TOML config file
        #[arg(short, long, env = "TO_CONFIG")]
        config: Option<PathBuf>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Field delimiter for delimited input
        #[arg(long)]
        delimiter: Option<char>,

        #[command(flatten)]
        thresholds: ThresholdArgs,
    },
    /// List the indicator catalog with its effective gates and weights
    Catalog {
        /// TOML config file
        #[arg(short, long, env = "TO_CONFIG")]
        config: Option<PathBuf>,
    },
}

enum MeterSource {
    Csv(MeterCsvFileSource),
    Ndjson(MeterNdjsonFileSource),
}

#[async_trait::async_trait]
impl Source<MeterRecord> for MeterSource {
    async fn stream(&self) -> EnvelopeStream<MeterRecord> {
        match self {
            Self::Csv(s) => s.stream().await,
            Self::Ndjson(s) => s.stream().await,
        }
    }
}

const SPREADSHEET_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];

fn select_source(input: PathBuf, delimiter: Option<char>, configured: char) -> Result<MeterSource> {
    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
        bail!(
            "{} is a spreadsheet workbook; export the sheet as CSV first",
            input.display()
        );
    }

    if ext == "ndjson" || ext == "jsonl" {
        return Ok(MeterSource::Ndjson(MeterNdjsonFileSource::new(input)));
    }

    let delimiter = delimiter.unwrap_or(if ext == "dat" { '|' } else { configured });
    if !delimiter.is_ascii() {
        bail!("delimiter must be a single ASCII character, got '{delimiter}'");
    }
    Ok(MeterSource::Csv(MeterCsvFileSource::new(input).with_delimiter(delimiter as u8)))
}

async fn analyze(
    input: PathBuf,
    config: Option<PathBuf>,
    output: Option<PathBuf>,
    format: Option<OutputFormat>,
    delimiter: Option<char>,
    thresholds: ThresholdArgs,
) -> Result<()> {
    let mut cfg = AppConfig::load(config.as_deref())?;
    thresholds.apply(&mut cfg.thresholds);
    let threshold_config = cfg.thresholds.build()?;

    let target = OutputTarget::from(output.or(cfg.output.path));
    let writer: Box<dyn TableWriter> = match format.unwrap_or(cfg.output.format) {
        OutputFormat::Csv => Box::new(CsvTableWriter::new(target)),
        OutputFormat::Ndjson => Box::new(NdjsonTableWriter::new(target)),
    };

    let pipeline: Pipeline<_, MeterRecord, _> = Pipeline {
        source: select_source(input, delimiter, cfg.input.delimiter)?,
        transforms: vec![Arc::new(transform::MeterRecordNormalization)],
        sink: ScoringSink::new(Engine::new(threshold_config), writer),
    };

    let report = pipeline.run().await?;
    let s = report.summary;
    eprintln!("records analysed:       {}", s.total_records);
    eprintln!("distinct IDPEL:         {}", s.distinct_ids);
    eprintln!("with any indicator:     {}", s.flagged_any);
    eprintln!("meeting TO criteria:    {}", s.passing);
    eprintln!("written:                {}", s.emitted);
    if report.rejected > 0 {
        eprintln!("rejected rows:          {}", report.rejected);
    }
    eprintln!("digest:                 {}", report.digest);

    Ok(())
}

fn catalog(config: Option<PathBuf>) -> Result<()> {
    let cfg = AppConfig::load(config.as_deref())?.thresholds.build()?;

    println!("{:<30} {:<16} {:<8} {:>6}  description", "indicator", "gate", "enabled", "weight");
    for rule in CATALOG.iter() {
        let gate = rule.indicator.gate().map_or("-", Gate::key);
        println!(
            "{:<30} {:<16} {:<8} {:>6}  {}",
            rule.indicator.column(),
            gate,
            cfg.is_enabled(rule.indicator),
            cfg.weight(rule.indicator),
            rule.description
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    match Cli::parse().command {
        Commands::Analyze {
            input,
            config,
            output,
            format,
            delimiter,
            thresholds,
        } => analyze(input, config, output, format, delimiter, thresholds).await,
        Commands::Catalog { config } => catalog(config),
    }
}
