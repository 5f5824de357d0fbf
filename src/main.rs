use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use aggregator::StatsAggregator;
use calendar::StatsCalendar;
use camera::{Coordinate, Viewport};
use store::{SessionFile, SessionSource};
use summary::SessionSummary;
use types::{Metric, ReportingScope, StatsSelection};

mod aggregator;
mod calendar;
mod camera;
mod config;
mod debug_log;
mod render;
mod store;
mod summary;
mod types;
mod utils;

#[derive(Parser)]
#[command(name = "snowstats")]
#[command(version)]
#[command(disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Session file to read (overrides the configured path)
    #[arg(long, global = true)]
    sessions: Option<PathBuf>,

    /// Output JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Pretend the current time is this RFC 3339 timestamp
    #[arg(long, global = true, value_parser = parse_now)]
    now: Option<DateTime<Utc>>,

    /// Use locale-aware thousands separators
    #[arg(long, global = true)]
    number_comma: bool,

    /// Locale for number formatting (en, de, fr, es, it, ja, ko, zh)
    #[arg(long, global = true)]
    locale: Option<String>,

    /// Number of decimal places for distances and speeds
    #[arg(long, global = true)]
    decimal_places: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chart series, totals and snow days for a scope
    Stats(StatsArgs),
    /// Snow-day heatmap for a scope (Season shows one month page)
    Heatmap(HeatmapArgs),
    /// List the month pages of the current season
    Season,
    /// Summary card for one session
    Summary(SummaryArgs),
    /// Camera centre and zoom that fit a route into a snapshot
    Fit(FitArgs),
    /// Manage configuration
    Config(ConfigArgs),
}

#[derive(Args)]
struct StatsArgs {
    #[arg(long, value_enum, default_value_t = ReportingScope::Week)]
    scope: ReportingScope,

    #[arg(long, value_enum, default_value_t = Metric::Duration)]
    metric: Metric,

    /// Season month page (0 = November)
    #[arg(long, default_value_t = 0)]
    page: usize,
}

#[derive(Args)]
struct HeatmapArgs {
    #[arg(long, value_enum, default_value_t = ReportingScope::Month)]
    scope: ReportingScope,

    /// Season month page (0 = November)
    #[arg(long, default_value_t = 0)]
    page: usize,
}

#[derive(Args)]
struct SummaryArgs {
    /// Session index, oldest first. Defaults to the latest session.
    #[arg(long)]
    index: Option<usize>,

    /// Average heart rate read from the health store, replacing the recorded one
    #[arg(long)]
    heart_rate: Option<f64>,

    /// Active energy (kcal) read from the health store, replacing the recorded one
    #[arg(long)]
    active_energy: Option<f64>,
}

#[derive(Args)]
struct FitArgs {
    /// JSON file with an array of [lat, lon] pairs
    #[arg(long)]
    route: PathBuf,

    #[arg(long, default_value_t = 1080.0)]
    width: f64,

    #[arg(long, default_value_t = 1080.0)]
    height: f64,

    #[arg(long, default_value_t = camera::DEFAULT_PADDING)]
    padding: f64,
}

#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    subcommand: ConfigSubcommands,
}

#[derive(Subcommand)]
enum ConfigSubcommands {
    /// Create default configuration file
    Init {
        #[arg(long, default_value_t = false)]
        overwrite: bool,
    },
    /// Show current configuration
    Show,
    /// Set configuration value
    Set {
        /// Configuration key (time-zone, week-start, sessions-path, number-comma, locale, decimal-places)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn parse_now(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 timestamp: {e}"))
}

/// Everything a command needs after config and CLI overrides are merged.
struct AppContext {
    config: config::Config,
    calendar: StatsCalendar,
    format_options: utils::NumberFormatOptions,
    sessions_path: Option<PathBuf>,
    json: bool,
    now: DateTime<Utc>,
}

impl AppContext {
    fn aggregator(&self) -> StatsAggregator {
        StatsAggregator::new(self.calendar)
    }

    fn load_sessions(&self) -> Result<SessionFile> {
        let path = match &self.sessions_path {
            Some(path) => path.clone(),
            None => self.config.sessions_path()?,
        };
        let file = SessionFile::load_or_empty(&path)?;
        debug_log::log(
            "STORE",
            "load",
            &format!(
                "{} sessions from {}",
                file.sessions().len(),
                file.path().display()
            ),
        );
        Ok(file)
    }

    fn print_json<T: serde::Serialize>(&self, value: &T) -> Result<()> {
        let json = simd_json::to_string_pretty(value)?;
        println!("{json}");
        Ok(())
    }
}

fn main() {
    debug_log::init();
    let cli = Cli::parse();

    // Load config file to get defaults
    let config = config::Config::load().unwrap_or(None).unwrap_or_default();

    // Create format options merging config defaults with CLI overrides
    let format_options = utils::NumberFormatOptions {
        use_comma: cli.number_comma || config.formatting.number_comma,
        locale: cli.locale.unwrap_or(config.formatting.locale.clone()),
        decimal_places: cli
            .decimal_places
            .unwrap_or(config.formatting.decimal_places),
    };

    let calendar = StatsCalendar::from_config(&config.calendar);
    debug_log::log(
        "CONFIG",
        "calendar",
        &format!("tz={} week_start={}", calendar.time_zone(), calendar.week_start()),
    );

    let ctx = AppContext {
        config,
        calendar,
        format_options,
        sessions_path: cli.sessions,
        json: cli.json,
        now: cli.now.unwrap_or_else(Utc::now),
    };

    let result = match cli.command {
        Commands::Stats(args) => run_stats(&ctx, args).context("Failed to compute stats"),
        Commands::Heatmap(args) => run_heatmap(&ctx, args).context("Failed to build heatmap"),
        Commands::Season => run_season(&ctx),
        Commands::Summary(args) => run_summary(&ctx, args).context("Failed to summarize session"),
        Commands::Fit(args) => run_fit(&ctx, args).context("Failed to fit camera"),
        Commands::Config(config_args) => handle_config_subcommand(config_args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run_stats(ctx: &AppContext, args: StatsArgs) -> Result<()> {
    let file = ctx.load_sessions()?;
    let selection = StatsSelection {
        scope: args.scope,
        metric: args.metric,
        season_page: args.page,
    };

    let report = {
        let _timer = debug_log::LogOnDrop::new("STATS", format!("{}/{}", args.scope, args.metric));
        ctx.aggregator().report(file.sessions(), &selection, ctx.now)
    };
    debug_log::recompute(&args.scope.to_string(), || {
        format!(
            "{} sessions, {} points, {} snow days",
            report.totals.session_count,
            report.series.len(),
            report.occurrence_days
        )
    });

    if ctx.json {
        return ctx.print_json(&report);
    }

    let today = ctx.calendar.local_date(ctx.now);
    print!(
        "{}",
        render::stats_report(&report, &ctx.calendar, today, &ctx.format_options)
    );
    Ok(())
}

fn run_heatmap(ctx: &AppContext, args: HeatmapArgs) -> Result<()> {
    let file = ctx.load_sessions()?;
    let selection = StatsSelection {
        scope: args.scope,
        metric: Metric::OccurrenceCount,
        season_page: args.page,
    };

    let heatmap = ctx
        .aggregator()
        .displayed_heatmap(file.sessions(), &selection, ctx.now);
    debug_log::recompute("heatmap", || {
        format!(
            "{} days, {} with activity",
            heatmap.days.len(),
            heatmap.occurrence_days()
        )
    });

    if ctx.json {
        return ctx.print_json(&heatmap.cells());
    }

    print!("{}", render::heatmap_grid(&heatmap.cells(), &ctx.calendar));
    println!(
        "Snow days: {}",
        utils::format_number(heatmap.occurrence_days() as u64, &ctx.format_options)
    );
    Ok(())
}

fn run_season(ctx: &AppContext) -> Result<()> {
    let months = ctx.aggregator().build_season_month_buckets(ctx.now);

    if ctx.json {
        return ctx.print_json(&months);
    }

    print!("{}", render::season_months(&months, &ctx.calendar));
    Ok(())
}

fn run_summary(ctx: &AppContext, args: SummaryArgs) -> Result<()> {
    let file = ctx.load_sessions()?;
    let session = match args.index {
        Some(index) => file.sessions().get(index).with_context(|| {
            format!(
                "No session at index {index} ({} sessions recorded)",
                file.sessions().len()
            )
        })?,
        None => file.latest().context("No sessions recorded yet")?,
    };

    let summary = SessionSummary::from_session(session).with_health(&types::HealthMetrics {
        avg_heart_rate_bpm: args.heart_rate,
        active_energy_kcal: args.active_energy,
    });

    if ctx.json {
        return ctx.print_json(&summary);
    }

    print!("{}", render::session_summary(&summary, &ctx.format_options));
    Ok(())
}

fn run_fit(ctx: &AppContext, args: FitArgs) -> Result<()> {
    let mut bytes = std::fs::read(&args.route)
        .with_context(|| format!("Failed to read route file {}", args.route.display()))?;
    let coords: Vec<Coordinate> = simd_json::serde::from_slice(&mut bytes)
        .with_context(|| format!("Failed to parse route file {}", args.route.display()))?;

    let viewport = Viewport {
        padding: args.padding,
        ..Viewport::new(args.width, args.height)
    };
    let fit = camera::fit_camera(&coords, &viewport);

    if ctx.json {
        return ctx.print_json(&fit);
    }

    match fit.center {
        Some(center) => println!(
            "Center: {:.6}, {:.6}  Zoom: {:.2}",
            center.lat, center.lon, fit.zoom
        ),
        None => println!("Empty route. Zoom: {:.2}", fit.zoom),
    }
    Ok(())
}

fn handle_config_subcommand(config_args: ConfigArgs) -> Result<()> {
    match config_args.subcommand {
        ConfigSubcommands::Init { overwrite } => {
            config::create_default_config(overwrite).context("Error creating config")
        }
        ConfigSubcommands::Show => config::show_config().context("Error showing config"),
        ConfigSubcommands::Set { key, value } => {
            config::set_config_value(&key, &value).context("Error setting config")
        }
    }
}
