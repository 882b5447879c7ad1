//! mcpsync - keep MCP server definitions in sync across applications
//!
//! Usage:
//!   mcpsync status               # Applications and their sync state
//!   mcpsync list                 # Servers across applications
//!   mcpsync toggle fs --off      # Disable a server everywhere
//!   mcpsync watch                # Run the periodic refresh loop

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mcpsync_core::backup::BackupEntry;
use mcpsync_core::context::AppContext;
use mcpsync_core::registry::ServerView;
use mcpsync_core::service::{McpSyncService, Resolution};
use mcpsync_core::sync::{AppSyncResult, RefreshReport, SyncOutcome};
use mcpsync_core::types::{Application, McpServer, SyncStatus};

#[derive(Parser)]
#[command(name = "mcpsync")]
#[command(about = "Synchronize MCP server configuration across applications", long_about = None)]
struct Cli {
    /// Directory for settings and backups
    #[arg(long, global = true, env = "MCPSYNC_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every enabled application and its sync state
    Status,

    /// List servers across applications
    List {
        /// Only show servers of this application
        #[arg(long)]
        app: Option<String>,
    },

    /// Enable or disable a server
    Toggle(ToggleArgs),

    /// Write pending changes to disk
    Sync {
        /// Application to sync (all detected applications if omitted)
        app: Option<String>,
    },

    /// Re-read all application configs from disk
    Refresh,

    /// Resolve a conflict or error for one application
    Resolve {
        app: String,

        /// Drop in-memory changes and re-read the file
        #[arg(long, conflicts_with = "overwrite", required_unless_present = "overwrite")]
        discard: bool,

        /// Write in-memory state over the file
        #[arg(long)]
        overwrite: bool,
    },

    /// Show, add, edit or remove a server definition
    Server(ServerArgs),

    /// Manage config backups
    Backup(BackupArgs),

    /// Export servers of every detected application to a JSON bundle
    Export { path: PathBuf },

    /// Import servers from a JSON bundle
    Import { path: PathBuf },

    /// Show or change settings
    Settings(SettingsArgs),

    /// Run the periodic refresh until interrupted
    Watch,
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
    /// Only show issues (non-zero exit if problems)
    Quiet,
}

#[derive(Args)]
struct ToggleArgs {
    /// Server name
    server: String,

    /// Enable the server
    #[arg(long, conflicts_with = "off", required_unless_present = "off")]
    on: bool,

    /// Disable the server
    #[arg(long)]
    off: bool,

    /// Only this application (every application that has the server if omitted)
    #[arg(long)]
    app: Option<String>,
}

#[derive(Args)]
struct ServerArgs {
    #[command(subcommand)]
    command: ServerSubcommand,
}

#[derive(Subcommand)]
enum ServerSubcommand {
    /// Print one server's definition
    Show { app: String, name: String },

    /// Add a new server to an application
    Add(ServerSpec),

    /// Replace an existing server's definition
    Set(ServerSpec),

    /// Remove a server from an application
    #[command(alias = "rm")]
    Remove { app: String, name: String },
}

#[derive(Args)]
struct ServerSpec {
    app: String,
    name: String,

    /// Environment variable (KEY=VALUE)
    #[arg(long, value_name = "KEY=VALUE")]
    env: Vec<String>,

    /// Add the server disabled
    #[arg(long)]
    disabled: bool,

    /// Launch command and arguments (after --)
    #[arg(last = true, required = true)]
    command: Vec<String>,
}

#[derive(Args)]
struct BackupArgs {
    #[command(subcommand)]
    command: BackupSubcommand,
}

#[derive(Subcommand)]
enum BackupSubcommand {
    /// Back up every detected application now
    Create,

    /// List backups of one application
    List { app: String },

    /// Restore a backup over the live file
    Restore { app: String, seq: u64 },
}

#[derive(Args)]
struct SettingsArgs {
    #[command(subcommand)]
    command: SettingsSubcommand,
}

#[derive(Subcommand)]
enum SettingsSubcommand {
    /// Print current settings
    Show,

    /// Change settings
    Set {
        /// Periodic refresh interval in seconds (5-300)
        #[arg(long)]
        refresh_secs: Option<u64>,

        /// Backups kept per application
        #[arg(long)]
        retention: Option<usize>,

        /// Persist changes immediately
        #[arg(long)]
        auto_sync: Option<bool>,

        /// Manage this application
        #[arg(long, value_name = "APP")]
        enable: Vec<String>,

        /// Stop managing this application
        #[arg(long, value_name = "APP")]
        disable: Vec<String>,

        /// Config file location override (APP=PATH)
        #[arg(long = "path", value_name = "APP=PATH")]
        paths: Vec<String>,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mcpsync=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let ctx = AppContext::from_system(cli.state_dir).context("failed to resolve directories")?;
    let service = McpSyncService::open(ctx).context("failed to open mcpsync")?;

    let problems = run(&service, cli.command, cli.format)?;
    if problems && matches!(cli.format, OutputFormat::Quiet) {
        std::process::exit(1);
    }
    Ok(())
}

/// Run one command. Returns whether anything needs attention.
fn run(service: &McpSyncService, command: Commands, format: OutputFormat) -> Result<bool> {
    match command {
        Commands::Status => {
            let apps = service.get_applications();
            print_applications(&apps, format)?;
            Ok(apps.iter().any(|a| a.sync_status.needs_resolution()))
        }
        Commands::List { app } => {
            let views: Vec<ServerView> = service
                .get_servers()
                .into_iter()
                .filter(|v| app.as_deref().is_none_or(|app| v.application == app))
                .collect();
            print_servers(&views, format)?;
            Ok(false)
        }
        Commands::Toggle(args) => {
            let enabled = args.on && !args.off;
            let results = match &args.app {
                Some(app) => vec![service.toggle_server(&args.server, app, enabled)?],
                None => service.toggle_all(&args.server, enabled)?,
            };
            print_results(&results, format)
        }
        Commands::Sync { app } => {
            let results = match app {
                Some(app) => vec![service.sync_application(&app)],
                None => service.sync_all(),
            };
            print_results(&results, format)
        }
        Commands::Refresh => {
            let apps = service.refresh();
            print_applications(&apps, format)?;
            Ok(apps.iter().any(|a| a.sync_status.needs_resolution()))
        }
        Commands::Resolve {
            app,
            discard,
            overwrite: _,
        } => {
            let resolution = if discard {
                Resolution::Discard
            } else {
                Resolution::Overwrite
            };
            let result = service.resolve_conflict(&app, resolution)?;
            print_results(&[result], format)
        }
        Commands::Server(args) => run_server(service, args.command, format),
        Commands::Backup(args) => run_backup(service, args.command, format),
        Commands::Export { path } => {
            let bundle = service.export_config(&path)?;
            match format {
                OutputFormat::Table => println!(
                    "{} Exported {} application(s) to {}",
                    style("✓").green(),
                    bundle.applications.len(),
                    path.display()
                ),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&bundle)?),
                OutputFormat::Quiet => {}
            }
            Ok(false)
        }
        Commands::Import { path } => {
            let summary = service.import_config(&path)?;
            match format {
                OutputFormat::Table => {
                    println!(
                        "{} Imported {} server(s)",
                        style("✓").green(),
                        summary.imported
                    );
                    for skipped in &summary.skipped {
                        println!(
                            "  {} {}/{}: {}",
                            style("⚠").yellow(),
                            skipped.app,
                            skipped.server,
                            skipped.reason
                        );
                    }
                    print_results_table(&summary.results);
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
                OutputFormat::Quiet => print_results_quiet(&summary.results),
            }
            Ok(!summary.skipped.is_empty() || summary.results.iter().any(has_problem))
        }
        Commands::Settings(args) => run_settings(service, args.command, format),
        Commands::Watch => run_watch(service, format),
    }
}

fn run_server(
    service: &McpSyncService,
    command: ServerSubcommand,
    format: OutputFormat,
) -> Result<bool> {
    match command {
        ServerSubcommand::Show { app, name } => {
            let server = service.get_server_config(&name, &app)?;
            match format {
                OutputFormat::Table => print_server(&server),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&server)?),
                OutputFormat::Quiet => {}
            }
            Ok(false)
        }
        ServerSubcommand::Add(spec) => {
            let app = spec.app.clone();
            let result = service.create_server(&app, server_from_spec(spec)?)?;
            print_results(&[result], format)
        }
        ServerSubcommand::Set(spec) => {
            let app = spec.app.clone();
            let result = service.save_server_config(&app, server_from_spec(spec)?)?;
            print_results(&[result], format)
        }
        ServerSubcommand::Remove { app, name } => {
            let result = service.remove_server(&app, &name)?;
            print_results(&[result], format)
        }
    }
}

fn server_from_spec(spec: ServerSpec) -> Result<McpServer> {
    let mut command = spec.command.into_iter();
    let program = command
        .next()
        .ok_or_else(|| anyhow::anyhow!("Missing launch command (pass it after --)"))?;
    let mut server = McpServer::new(spec.name, program)
        .with_args(command)
        .with_enabled(!spec.disabled);
    for pair in &spec.env {
        let (key, value) = split_pair(pair, "KEY=VALUE")?;
        server = server.with_env(key, value);
    }
    Ok(server)
}

fn split_pair<'a>(pair: &'a str, shape: &str) -> Result<(&'a str, &'a str)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => anyhow::bail!("Invalid value '{}', expected {}", pair, shape),
    }
}

fn run_backup(
    service: &McpSyncService,
    command: BackupSubcommand,
    format: OutputFormat,
) -> Result<bool> {
    match command {
        BackupSubcommand::Create => {
            let entries = service.create_backup();
            print_backups(&entries, format)?;
            Ok(false)
        }
        BackupSubcommand::List { app } => {
            let entries = service.list_backups(&app)?;
            print_backups(&entries, format)?;
            Ok(false)
        }
        BackupSubcommand::Restore { app, seq } => {
            let application = service.restore_backup(&app, seq)?;
            match format {
                OutputFormat::Table => println!(
                    "{} Restored backup #{} of {} ({} servers)",
                    style("✓").green(),
                    seq,
                    application.name,
                    application.server_count
                ),
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&application)?)
                }
                OutputFormat::Quiet => {}
            }
            Ok(false)
        }
    }
}

fn run_settings(
    service: &McpSyncService,
    command: SettingsSubcommand,
    format: OutputFormat,
) -> Result<bool> {
    let settings = match command {
        SettingsSubcommand::Show => service.get_settings(),
        SettingsSubcommand::Set {
            refresh_secs,
            retention,
            auto_sync,
            enable,
            disable,
            paths,
        } => {
            let mut settings = service.get_settings();
            if let Some(secs) = refresh_secs {
                settings.refresh_interval_secs = secs;
            }
            if let Some(retention) = retention {
                settings.backup_retention = retention;
            }
            if let Some(auto_sync) = auto_sync {
                settings.auto_sync = auto_sync;
            }
            for app in &enable {
                settings.set_app_enabled(app, true);
            }
            for app in &disable {
                settings.set_app_enabled(app, false);
            }
            for pair in &paths {
                let (app, path) = split_pair(pair, "APP=PATH")?;
                settings
                    .path_overrides
                    .insert(app.to_string(), PathBuf::from(path));
            }
            service.save_settings(settings)?
        }
    };

    match format {
        OutputFormat::Table => {
            println!("Enabled apps:     {}", settings.enabled_apps.join(", "));
            println!("Refresh interval: {}s", settings.refresh_interval_secs);
            println!("Backup retention: {}", settings.backup_retention);
            println!("Auto sync:        {}", settings.auto_sync);
            for (app, path) in &settings.path_overrides {
                println!("Path override:    {} -> {}", app, path.display());
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&settings)?),
        OutputFormat::Quiet => {}
    }
    Ok(false)
}

fn run_watch(service: &McpSyncService, format: OutputFormat) -> Result<bool> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;

    runtime.block_on(async {
        let scheduler = service.scheduler();
        if matches!(format, OutputFormat::Table) {
            println!(
                "Watching {} application(s) every {}s (Ctrl+C to stop)",
                service.get_applications().len(),
                scheduler.interval().as_secs()
            );
        }
        let mut reports = scheduler.subscribe();
        let handle = scheduler.spawn();

        loop {
            tokio::select! {
                report = reports.recv() => match report {
                    Ok(report) => print_report(&report, format)?,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "dropped refresh reports");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
                signal = tokio::signal::ctrl_c() => {
                    signal.context("failed to listen for Ctrl+C")?;
                    break;
                }
            }
        }
        handle.shutdown().await;
        Ok::<_, anyhow::Error>(())
    })?;
    Ok(false)
}

fn print_report(report: &RefreshReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if report.is_quiet() {
                return Ok(());
            }
            println!("{}", style(report.at.format("%H:%M:%S")).dim());
            print_results_table(&report.synced);
            for app in &report.skipped {
                println!("  {} {} awaits resolution", style("!").yellow(), app);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(report)?),
        OutputFormat::Quiet => {
            print_results_quiet(&report.synced);
            for app in &report.skipped {
                println!("{}: awaits resolution", app);
            }
        }
    }
    Ok(())
}

fn print_applications(apps: &[Application], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!(
                "  {:<16} {:<10} {:<8} Config",
                "Application", "Status", "Servers"
            );
            println!("  {}", "-".repeat(70));
            for app in apps {
                let path = if app.detected {
                    app.config_path.display().to_string()
                } else {
                    format!("{} (not found)", app.config_path.display())
                };
                println!(
                    "  {:<16} {:<10} {:<8} {}",
                    app.name,
                    status_styled(app.sync_status),
                    app.server_count,
                    path
                );
                if let Some(error) = &app.last_error {
                    println!("    {}", style(error).red());
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(apps)?),
        OutputFormat::Quiet => {
            for app in apps.iter().filter(|a| a.sync_status.needs_resolution()) {
                println!(
                    "{}: {}{}",
                    app.name,
                    app.sync_status,
                    app.last_error
                        .as_deref()
                        .map(|e| format!(" ({e})"))
                        .unwrap_or_default()
                );
            }
        }
    }
    Ok(())
}

fn status_styled(status: SyncStatus) -> String {
    // Pad before styling so escape codes don't break alignment.
    let text = format!("{:<10}", status.as_str());
    match status {
        SyncStatus::Synced => style(text).green().to_string(),
        SyncStatus::Pending => style(text).yellow().to_string(),
        SyncStatus::Conflict | SyncStatus::Error => style(text).red().to_string(),
        SyncStatus::Unsynced => style(text).dim().to_string(),
    }
}

fn print_servers(views: &[ServerView], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if views.is_empty() {
                println!("No MCP servers found.");
                return Ok(());
            }
            println!("  {:<20} {:<16} {:<8} Command", "Server", "Application", "Enabled");
            println!("  {}", "-".repeat(70));
            for view in views {
                let enabled = if view.enabled {
                    style("✓  ").green()
                } else {
                    style("✗  ").dim()
                };
                let command = std::iter::once(view.server.command.as_str())
                    .chain(view.server.args.iter().map(String::as_str))
                    .collect::<Vec<_>>()
                    .join(" ");
                println!(
                    "  {:<20} {:<16} {:<8} {}",
                    view.server.name, view.application, enabled, command
                );
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(views)?),
        OutputFormat::Quiet => {}
    }
    Ok(())
}

fn print_server(server: &McpServer) {
    println!("Name:    {}", server.name);
    println!("Command: {}", server.command);
    if !server.args.is_empty() {
        println!("Args:    {}", server.args.join(" "));
    }
    for (key, value) in &server.env {
        println!("Env:     {}={}", key, value);
    }
    println!("Enabled: {}", server.enabled);
    for (key, value) in &server.extra {
        println!("{}: {}", style(key).dim(), value);
    }
}

fn print_backups(entries: &[BackupEntry], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if entries.is_empty() {
                println!("No backups.");
                return Ok(());
            }
            println!("  {:<16} {:<6} {:<24} Path", "Application", "#", "Taken");
            println!("  {}", "-".repeat(70));
            for entry in entries {
                println!(
                    "  {:<16} {:<6} {:<24} {}",
                    entry.app_name,
                    entry.seq,
                    entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    entry.path.display()
                );
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(entries)?),
        OutputFormat::Quiet => {}
    }
    Ok(())
}

fn has_problem(result: &AppSyncResult) -> bool {
    matches!(
        result.outcome,
        SyncOutcome::Conflict | SyncOutcome::Error { .. }
    )
}

fn print_results(results: &[AppSyncResult], format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Table => print_results_table(results),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(results)?),
        OutputFormat::Quiet => print_results_quiet(results),
    }
    Ok(results.iter().any(has_problem))
}

fn print_results_table(results: &[AppSyncResult]) {
    for result in results {
        match &result.outcome {
            SyncOutcome::Success => println!("  {} {}", style("✓").green(), result.app),
            SyncOutcome::Pending => {
                println!("  {} {} (pending, run 'mcpsync sync')", style("•").yellow(), result.app)
            }
            SyncOutcome::Superseded => {
                println!("  {} {} (superseded)", style("•").dim(), result.app)
            }
            SyncOutcome::Unchanged => {
                println!("  {} {} (already up to date)", style("•").dim(), result.app)
            }
            SyncOutcome::Conflict => println!(
                "  {} {} changed on disk; run 'mcpsync resolve {} --discard|--overwrite'",
                style("!").red(),
                result.app,
                result.app
            ),
            SyncOutcome::Error { message } => {
                println!("  {} {}: {}", style("✗").red(), result.app, message)
            }
        }
    }
}

fn print_results_quiet(results: &[AppSyncResult]) {
    for result in results {
        match &result.outcome {
            SyncOutcome::Conflict => println!("{}: conflict", result.app),
            SyncOutcome::Error { message } => println!("{}: error ({})", result.app, message),
            _ => {}
        }
    }
}
