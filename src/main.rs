use anyhow::Context;
use clap::Parser;
use country_tracker::config::toml_config::RemoteConfig;
use country_tracker::config::{CliConfig, Command, ReportFormat, SyncDirection, TrackerConfig};
use country_tracker::core::days::current_year;
use country_tracker::core::report::{render_csv, render_text};
use country_tracker::domain::model::{BackendKind, NewTrip, Served, TripUpdate};
use country_tracker::domain::ports::ConfigProvider;
use country_tracker::utils::error::{ErrorSeverity, TrackerError};
use country_tracker::utils::{logger, validation::Validate};
use country_tracker::{build_store, TripTracker};
use std::path::Path;

const DEFAULT_CONFIG_PATH: &str = "tracker-config.toml";

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::debug!("CLI config: {:?}", cli);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli.command, &config).await {
        let exit_code = match e.downcast_ref::<TrackerError>() {
            Some(err) => {
                tracing::error!(
                    "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
                    err,
                    err.category(),
                    err.severity()
                );
                eprintln!("❌ {}", err.user_friendly_message());
                eprintln!("💡 {}", err.recovery_suggestion());
                match err.severity() {
                    ErrorSeverity::Medium => 2,
                    ErrorSeverity::High => 1,
                    ErrorSeverity::Critical => 3,
                }
            }
            None => {
                tracing::error!("❌ Command failed: {:#}", e);
                eprintln!("❌ {:#}", e);
                1
            }
        };
        std::process::exit(exit_code);
    }
}

/// File config (when present), then CLI overrides, then validation.
fn load_config(cli: &CliConfig) -> country_tracker::Result<TrackerConfig> {
    let mut config = match &cli.config {
        Some(path) => TrackerConfig::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            TrackerConfig::from_file(DEFAULT_CONFIG_PATH)?
        }
        None => {
            tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_PATH);
            TrackerConfig::default()
        }
    };

    if let Some(data_dir) = &cli.data_dir {
        config.storage.data_dir = data_dir.clone();
    }
    if let Some(endpoint) = &cli.remote_endpoint {
        match config.remote.as_mut() {
            Some(remote) => remote.endpoint = endpoint.clone(),
            None => {
                config.remote = Some(RemoteConfig {
                    endpoint: endpoint.clone(),
                    timeout_seconds: None,
                    admin_password: None,
                })
            }
        }
    }
    if cli.no_remote {
        config.remote = None;
    }
    if cli.no_github {
        config.github = None;
    }
    if let Some(user) = &cli.user {
        config.defaults.user = user.clone();
    }

    config.validate()?;
    Ok(config)
}

fn note_source<T>(served: &Served<T>) {
    if served.is_degraded() {
        for failure in &served.failures {
            tracing::warn!("⚠️ {}", failure);
        }
        eprintln!("⚠️ Served by the {} store (fallback)", served.served_by);
    } else {
        tracing::debug!("Served by the {} store", served.served_by);
    }
}

/// `-` (or no path at all) writes to stdout.
fn write_output(
    output: Option<&str>,
    default_name: Option<String>,
    content: &str,
) -> anyhow::Result<()> {
    match output.map(str::to_string).or(default_name) {
        Some(path) if path != "-" => {
            std::fs::write(&path, content)
                .with_context(|| format!("failed to write {}", path))?;
            println!("📁 Saved to {}", path);
        }
        _ => print!("{}", content),
    }
    Ok(())
}

async fn run(command: Command, config: &TrackerConfig) -> anyhow::Result<()> {
    let store = build_store(config)?;
    let tracker = TripTracker::new(store, config.user()).with_thresholds(config.thresholds());

    match command {
        Command::Add {
            traveler,
            country,
            from,
            to,
            notes,
        } => {
            let served = tracker
                .add_trip(NewTrip {
                    traveler,
                    country,
                    departure_date: from,
                    arrival_date: to,
                    notes,
                })
                .await?;
            note_source(&served);
            let trip = served.value;
            println!(
                "✅ Added trip {}: {} in {} from {} to {} ({} days)",
                trip.id,
                trip.traveler,
                trip.country,
                trip.departure_date,
                trip.arrival_date,
                trip.total_days()
            );
        }
        Command::List { traveler } => {
            let served = tracker.trips(traveler).await?;
            note_source(&served);
            if served.value.is_empty() {
                println!("No trips recorded yet.");
            }
            for trip in &served.value {
                println!(
                    "{:<15} {:<9} {:<7} {} → {} {:>4} days{}{}",
                    trip.id,
                    trip.traveler.as_str(),
                    trip.country.as_str(),
                    trip.departure_date,
                    trip.arrival_date,
                    trip.total_days(),
                    trip.notes
                        .as_deref()
                        .map(|notes| format!("  {}", notes))
                        .unwrap_or_default(),
                    if trip.is_reversed() {
                        "  ⚠️ arrival before departure"
                    } else {
                        ""
                    }
                );
            }
        }
        Command::Update {
            id,
            traveler,
            country,
            from,
            to,
            notes,
        } => {
            let served = tracker
                .update_trip(
                    &id,
                    TripUpdate {
                        traveler,
                        country,
                        departure_date: from,
                        arrival_date: to,
                        notes,
                    },
                )
                .await?;
            note_source(&served);
            println!("✅ Updated trip {}", served.value.id);
        }
        Command::Delete { id } => {
            let served = tracker.delete_trip(&id).await?;
            note_source(&served);
            println!("🗑️ Deleted trip {}", served.value.id);
        }
        Command::Stats { traveler, year } => {
            let year = year.unwrap_or_else(current_year);
            let served = tracker.stats(traveler, year).await?;
            note_source(&served);
            let stats = served.value;

            println!("{} - {}", stats.traveler, stats.year);
            for (country, days) in stats.totals.iter() {
                match stats.thresholds.iter().find(|s| s.country == country) {
                    Some(status) if status.exceeded => println!(
                        "  {:<7} {:>4} days  ❗ over the {}-day limit by {}",
                        country.as_str(),
                        days,
                        status.limit,
                        status.used - i64::from(status.limit)
                    ),
                    Some(status) => println!(
                        "  {:<7} {:>4} days  ({} of {} remaining)",
                        country.as_str(),
                        days,
                        status.remaining,
                        status.limit
                    ),
                    None => println!("  {:<7} {:>4} days", country.as_str(), days),
                }
            }
            println!("  Total trips: {}", stats.trip_count);
        }
        Command::Years => {
            let served = tracker.available_years(current_year()).await?;
            note_source(&served);
            for year in served.value {
                println!("{}", year);
            }
        }
        Command::Report { format, output } => {
            let served = tracker.report().await?;
            note_source(&served);
            let today = chrono::Local::now().date_naive();
            let content = match format {
                ReportFormat::Text => render_text(&served.value, today),
                ReportFormat::Csv => render_csv(&served.value)?,
            };
            write_output(output.as_deref(), None, &content)?;
        }
        Command::Export { output } => {
            let served = tracker.export_json().await?;
            note_source(&served);
            let default_name = format!(
                "country-tracker-{}.json",
                chrono::Local::now().date_naive().format("%Y-%m-%d")
            );
            write_output(output.as_deref(), Some(default_name), &served.value)?;
        }
        Command::Import { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file))?;
            let served = tracker.import_json(&text).await?;
            note_source(&served);
            let report = served.value;
            println!("📥 Imported {} trips", report.trips.len());
            if report.defaulted_travelers > 0 {
                println!(
                    "   {} record(s) had no traveler and were assigned to {}",
                    report.defaulted_travelers,
                    country_tracker::Traveler::default()
                );
            }
            for skipped in &report.skipped {
                println!(
                    "   ⚠️ skipped record #{} ({}): {}",
                    skipped.index,
                    skipped.id.as_deref().unwrap_or("no id"),
                    skipped.reason
                );
            }
        }
        Command::Activity => {
            let served = tracker.activity().await?;
            note_source(&served);
            for entry in served.value {
                println!(
                    "{}  {:<8} {:<10} {}",
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.action,
                    entry.user,
                    entry.details
                );
            }
        }
        Command::Clear {
            admin_password,
            yes,
            keep_github,
        } => {
            if !yes {
                anyhow::bail!("refusing to clear all data without --yes");
            }
            let password = admin_password
                .as_deref()
                .or_else(|| config.admin_password());
            let keep: &[BackendKind] = if keep_github {
                &[BackendKind::Github]
            } else {
                &[]
            };
            let report = tracker.clear_all(password, keep).await?;
            for backend in &report.cleared {
                println!("🧹 Cleared the {} store", backend);
            }
            for backend in &report.kept {
                println!("📌 Kept the {} store", backend);
            }
            for failure in &report.failures {
                eprintln!("⚠️ Could not clear {}", failure);
            }
        }
        Command::Sync { direction } => {
            let served = match direction {
                SyncDirection::Push => tracker.push_to(BackendKind::Github).await?,
                SyncDirection::Pull => tracker.pull_from(BackendKind::Github).await?,
            };
            note_source(&served);
            match direction {
                SyncDirection::Push => println!("📤 Pushed {} trips to GitHub", served.value),
                SyncDirection::Pull => println!("📥 Pulled {} trips from GitHub", served.value),
            }
        }
    }

    Ok(())
}
