//! Detour CLI
//!
//! CLI tool for checking navigations against a settings file, replaying
//! navigation traces and maintaining site lists.

mod replay;
mod store;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime, TimeZone};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use dt_compiler::{list_lines, parse_site_list, shadowed_entries, ListBuilder, ListKind};
use dt_core::settings::validate_settings;
use dt_core::snooze::{
    cleanup_expired_snooze, format_remaining, prune_site_snoozes, snooze_for, snooze_remaining, snooze_site, status,
    Status,
};
use dt_core::stats::{redirect_count, reset_stats, top_triggers, total_redirects};
use dt_core::{Clock, Engine, FixedClock, MemoryStore, Moment, NavigationEvent, SettingsStore, SystemClock};

use crate::replay::{parse_events, replay};
use crate::store::{read_settings, JsonFileStore};

#[derive(Parser)]
#[command(name = "dt-cli")]
#[command(about = "Detour redirect engine tools")]
struct Cli {
    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide a single navigation
    Check {
        /// Settings JSON file
        #[arg(short, long)]
        settings: PathBuf,

        /// URL being navigated to
        #[arg(short, long)]
        url: String,

        /// Tab id
        #[arg(short, long, default_value_t = 1)]
        tab: i32,

        /// Local time to decide at, as YYYY-MM-DDTHH:MM
        #[arg(long)]
        at: Option<String>,
    },

    /// Replay a JSON-lines navigation trace
    Replay {
        /// Settings JSON file
        #[arg(short, long)]
        settings: PathBuf,

        /// Trace file, one event per line
        #[arg(short, long)]
        events: PathBuf,

        /// Persist stats writes back to the settings file
        #[arg(short, long)]
        write: bool,

        /// Local time to replay at, as YYYY-MM-DDTHH:MM
        #[arg(long)]
        at: Option<String>,
    },

    /// Report problems in a settings file
    Validate {
        #[arg(short, long)]
        settings: PathBuf,
    },

    /// Normalize and dedupe a site list
    Normalize {
        /// trigger, whitelist or destination
        #[arg(short, long)]
        kind: String,

        /// Raw list, one site per line
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Existing list to extend; its duplicates are dropped
        #[arg(short, long)]
        base: Option<PathBuf>,
    },

    /// Show redirect status and stats
    Status {
        #[arg(short, long)]
        settings: PathBuf,
    },

    /// Clear expired snoozes in a settings file
    Cleanup {
        #[arg(short, long)]
        settings: PathBuf,
    },

    /// Snooze redirects globally or for one trigger
    Snooze {
        #[arg(short, long)]
        settings: PathBuf,

        #[arg(short, long, default_value_t = 30)]
        minutes: u32,

        /// Snooze only this trigger entry
        #[arg(long)]
        site: Option<String>,
    },

    /// Zero all redirect counters
    ResetStats {
        #[arg(short, long)]
        settings: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let result = match cli.command {
        Commands::Check { settings, url, tab, at } => cmd_check(&settings, &url, tab, at.as_deref()),
        Commands::Replay {
            settings,
            events,
            write,
            at,
        } => cmd_replay(&settings, &events, write, at.as_deref()),
        Commands::Validate { settings } => cmd_validate(&settings),
        Commands::Normalize {
            kind,
            input,
            output,
            base,
        } => cmd_normalize(&kind, &input, output.as_deref(), base.as_deref()),
        Commands::Status { settings } => cmd_status(&settings),
        Commands::Cleanup { settings } => cmd_cleanup(&settings),
        Commands::Snooze {
            settings,
            minutes,
            site,
        } => cmd_snooze(&settings, minutes, site.as_deref()),
        Commands::ResetStats { settings } => cmd_reset_stats(&settings),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) -> Result<(), String> {
    tracing_log::LogTracer::init().map_err(|e| format!("Failed to set log tracer: {}", e))?;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).map_err(|e| format!("Failed to set subscriber: {}", e))
}

/// `--at` as a moment in the local time zone, or the system clock.
fn moment_at(at: Option<&str>) -> Result<Moment, String> {
    let Some(raw) = at else {
        return Ok(SystemClock.now());
    };
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .map_err(|e| format!("Invalid time '{}' (expected YYYY-MM-DDTHH:MM): {}", raw, e))?;
    let local = Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| format!("'{}' does not exist in the local time zone", raw))?;
    Ok(Moment::from_datetime(&local))
}

fn format_timestamp(epoch_ms: i64) -> String {
    match Local.timestamp_millis_opt(epoch_ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        None => epoch_ms.to_string(),
    }
}

fn cmd_check(settings_path: &Path, url: &str, tab: i32, at: Option<&str>) -> Result<(), String> {
    let settings = read_settings(settings_path).map_err(|e| e.to_string())?;
    let now = moment_at(at)?;
    let event = NavigationEvent::main_frame(tab, url);

    let outcome = Engine::new().decide(&event, &settings, &now, &mut rand::thread_rng());

    let Some(redirect) = outcome.redirect() else {
        println!("{}", outcome);
        return Ok(());
    };
    println!("{}", outcome.label());
    println!("  Trigger:     {}", redirect.trigger);
    println!("  Destination: {}", redirect.destination_url);
    if redirect.delay_ms > 0 {
        println!("  Delay:       {}ms", redirect.delay_ms);
    }
    println!(
        "  Redirects:   {} so far",
        redirect_count(&settings.redirect_stats, &redirect.trigger)
    );

    Ok(())
}

fn cmd_replay(settings_path: &Path, events_path: &Path, write: bool, at: Option<&str>) -> Result<(), String> {
    let text = fs::read_to_string(events_path)
        .map_err(|e| format!("Failed to read '{}': {}", events_path.display(), e))?;
    let events = parse_events(&text)?;
    let clock = FixedClock::new(moment_at(at)?);
    let mut rng = rand::thread_rng();
    debug!("replaying {} events", events.len());

    let (report, stats) = if write {
        let store = JsonFileStore::new(settings_path);
        let report = replay(events, &store, &clock, &mut rng);
        (report, store.load().map_err(|e| e.to_string())?.redirect_stats)
    } else {
        let store = MemoryStore::new(read_settings(settings_path).map_err(|e| e.to_string())?);
        let report = replay(events, &store, &clock, &mut rng);
        (report, store.snapshot().redirect_stats)
    };

    for (event, outcome) in &report.decisions {
        println!("[tab {}] {} -> {}", event.tab_id, event.url, outcome);
    }
    println!();
    println!("Replayed {} events, {} redirected", report.decisions.len(), report.redirects());
    for (label, count) in &report.tally {
        println!("  {:<30} {}", label, count);
    }
    println!();
    println!("Redirect stats ({} total):", total_redirects(&stats));
    for (trigger, count) in top_triggers(&stats) {
        println!("  {:<30} {}", trigger, count);
    }
    if write {
        println!("Stats written to '{}'", settings_path.display());
    }

    Ok(())
}

fn cmd_validate(settings_path: &Path) -> Result<(), String> {
    let settings = read_settings(settings_path).map_err(|e| e.to_string())?;
    let issues = validate_settings(&settings);

    let lists = [("triggerSites", &settings.trigger_sites), ("whitelist", &settings.whitelist)];
    let mut shadowed = 0usize;
    for (name, entries) in lists {
        for (later, earlier) in shadowed_entries(entries) {
            println!("  note: {}: '{}' is covered by '{}'", name, entries[later], entries[earlier]);
            shadowed += 1;
        }
    }

    if issues.is_empty() {
        println!("Settings '{}' are valid", settings_path.display());
        println!("  Triggers:     {}", settings.trigger_sites.len());
        println!("  Destinations: {}", settings.destinations.len());
        println!("  Whitelist:    {}", settings.whitelist.len());
        println!("  Schedules:    {}", settings.schedules.len());
        if shadowed > 0 {
            println!("  Shadowed:     {}", shadowed);
        }
        return Ok(());
    }

    for issue in &issues {
        println!("  {}", issue);
    }
    Err(format!("{} issue(s) in '{}'", issues.len(), settings_path.display()))
}

fn cmd_normalize(kind: &str, input: &Path, output: Option<&Path>, base: Option<&Path>) -> Result<(), String> {
    let kind = ListKind::from_str(kind).ok_or_else(|| format!("Unknown list kind '{}'", kind))?;
    let text = fs::read_to_string(input).map_err(|e| format!("Failed to read '{}': {}", input.display(), e))?;

    let (mut builder, base_stats) = match base {
        Some(path) => {
            let existing = fs::read_to_string(path)
                .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
            let (builder, stats) = ListBuilder::from_existing(kind, &parse_site_list(&existing, kind));
            (builder, Some(stats))
        }
        None => (ListBuilder::new(kind), None),
    };

    let lines: Vec<&str> = list_lines(&text).collect();
    let added = builder.extend(lines.iter().copied());
    for rejected in builder.rejected() {
        eprintln!("  skipped: {}", rejected);
    }
    let rejected = builder.rejected().len();
    if builder.is_empty() {
        return Err(format!("No valid {} entries in '{}'", kind.storage_key(), input.display()));
    }
    let total = builder.len();
    let entries = builder.build();

    let mut rendered = entries.join("\n");
    rendered.push('\n');
    match output {
        Some(path) => {
            fs::write(path, &rendered).map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
            println!("Wrote {} {} entries to '{}'", total, kind.storage_key(), path.display());
            if let Some(stats) = base_stats {
                println!("  Base:       {} -> {} (dedupe removed {})", stats.before, stats.after, stats.deduped);
            }
            println!("  Lines:      {}", lines.len());
            println!("  Added:      {}", added);
            println!("  Duplicates: {}", lines.len() - added - rejected);
            println!("  Rejected:   {}", rejected);
        }
        None => print!("{}", rendered),
    }

    Ok(())
}

fn cmd_status(settings_path: &Path) -> Result<(), String> {
    let settings = read_settings(settings_path).map_err(|e| e.to_string())?;
    let now = SystemClock.now();

    match status(&settings, &now) {
        Status::Focus => println!("Status: focus mode (snoozes ignored)"),
        Status::ScheduleBlocked => println!("Status: active (snoozing blocked by schedule)"),
        Status::Snoozed { until } => {
            let remaining = snooze_remaining(&settings, &now).map(format_remaining).unwrap_or_default();
            println!("Status: snoozed for {} (until {})", remaining, format_timestamp(until));
        }
        Status::Active => println!("Status: active"),
    }

    let live_sites: Vec<_> = settings
        .snoozed_sites
        .iter()
        .filter(|(_, until)| now.epoch_ms < **until)
        .collect();
    if !live_sites.is_empty() {
        println!("Snoozed sites:");
        for (site, until) in live_sites {
            println!("  {:<30} until {}", site, format_timestamp(*until));
        }
    }

    println!("Redirects: {}", total_redirects(&settings.redirect_stats));
    for (trigger, count) in top_triggers(&settings.redirect_stats).into_iter().take(10) {
        println!("  {:<30} {}", trigger, count);
    }

    Ok(())
}

fn cmd_cleanup(settings_path: &Path) -> Result<(), String> {
    let store = JsonFileStore::new(settings_path);
    let settings = store.load().map_err(|e| e.to_string())?;
    let now = SystemClock.now();

    let mut patch = cleanup_expired_snooze(&settings, &now).unwrap_or_default();
    if let Some(pruned) = prune_site_snoozes(&settings, &now) {
        patch.merge(pruned);
    }

    if patch.is_empty() {
        println!("Nothing to clean up");
        return Ok(());
    }
    store.persist(&patch).map_err(|e| e.to_string())?;
    println!("Cleaned '{}'", store.path().display());
    if patch.snooze_until.is_some() {
        println!("  Cleared expired global snooze");
    }
    if let Some(sites) = &patch.snoozed_sites {
        println!("  Site snoozes: {} -> {}", settings.snoozed_sites.len(), sites.len());
    }

    Ok(())
}

fn cmd_snooze(settings_path: &Path, minutes: u32, site: Option<&str>) -> Result<(), String> {
    let store = JsonFileStore::new(settings_path);
    let settings = store.load().map_err(|e| e.to_string())?;
    let now = SystemClock.now();

    let patch = match site {
        Some(trigger) => snooze_site(&settings, trigger, &now, minutes),
        None => snooze_for(&now, minutes),
    };
    store.persist(&patch).map_err(|e| e.to_string())?;

    let until = format_timestamp(now.epoch_ms + i64::from(minutes) * 60_000);
    match site {
        Some(trigger) => println!("Snoozed '{}' until {}", trigger, until),
        None => println!("Snoozed all redirects until {}", until),
    }
    Ok(())
}

fn cmd_reset_stats(settings_path: &Path) -> Result<(), String> {
    let store = JsonFileStore::new(settings_path);
    let before = total_redirects(&store.load().map_err(|e| e.to_string())?.redirect_stats);
    store.persist(&reset_stats()).map_err(|e| e.to_string())?;
    println!("Reset {} recorded redirects", before);
    Ok(())
}
