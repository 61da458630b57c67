use crate::config::{UpdaterConfig, CONFIG_FILE};
use crate::errors::SyncError;
use crate::exceptions::{self, ExceptionStore};
use crate::instance;
use crate::progress::{ProgressCallback, SyncProgress, SyncStage};
use crate::prompt;
use crate::scripts;
use crate::server::ServerClient;
use crate::sync::{self, SyncPlan};
use crate::transfer;
use crate::update;
use anyhow::{bail, Result};
use crossterm::style::Stylize;
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, PartialEq, Eq)]
enum MenuChoice {
    All,
    Mods,
    Scripts,
    Exceptions,
    Check,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CliAction {
    Menu,
    Run(MenuChoice),
    Help,
    Version,
}

struct CliOptions {
    debug: bool,
    action: CliAction,
}

pub fn run() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("{err}");
            eprintln!();
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match options.action {
        CliAction::Help => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        CliAction::Version => {
            println!("modsync v{}", env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
        _ => {}
    }

    match run_action(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err, options.debug);
            ExitCode::FAILURE
        }
    }
}

fn parse_args(args: &[String]) -> Result<CliOptions> {
    let mut debug = false;
    let mut choice: Option<MenuChoice> = None;
    for arg in args {
        match arg.as_str() {
            "--help" | "-h" => {
                return Ok(CliOptions {
                    debug,
                    action: CliAction::Help,
                })
            }
            "--version" | "-V" => {
                return Ok(CliOptions {
                    debug,
                    action: CliAction::Version,
                })
            }
            "--debug" => debug = true,
            "all" => set_choice(&mut choice, MenuChoice::All)?,
            "mods" => set_choice(&mut choice, MenuChoice::Mods)?,
            "kubejs" => set_choice(&mut choice, MenuChoice::Scripts)?,
            "exceptions" => set_choice(&mut choice, MenuChoice::Exceptions)?,
            "check" => set_choice(&mut choice, MenuChoice::Check)?,
            other => bail!("Unknown argument: {other}"),
        }
    }
    let action = match choice {
        Some(choice) => CliAction::Run(choice),
        None => CliAction::Menu,
    };
    Ok(CliOptions { debug, action })
}

fn set_choice(slot: &mut Option<MenuChoice>, choice: MenuChoice) -> Result<()> {
    if slot.is_some() {
        bail!("Only one action at a time");
    }
    *slot = Some(choice);
    Ok(())
}

fn print_usage() {
    println!("modsync v{}", env!("CARGO_PKG_VERSION"));
    println!("Keeps this instance's mods and KubeJS scripts in sync with the pack server.");
    println!();
    println!("Usage: modsync [--debug] [action]");
    println!();
    println!("Actions:");
    println!("  all         Update mods, then replace the KubeJS scripts");
    println!("  mods        Sync the mods folder against the server list");
    println!("  kubejs      Replace the KubeJS scripts from the server archive");
    println!("  exceptions  Choose local-only mods to protect from deletion");
    println!("  check       Show what an update would change, without changing anything");
    println!();
    println!("With no action, modsync shows an interactive menu.");
    println!();
    println!("Options:");
    println!("  --debug     Verbose errors; skip the instance layout check");
    println!("  --version   Print the version and exit");
    println!("  --help      Show this help");
}

fn run_action(options: &CliOptions) -> Result<()> {
    let config = UpdaterConfig::load_or_create(Path::new(CONFIG_FILE))?;
    banner(&config);
    instance::ensure_instance_layout(&config, options.debug)?;

    let choice = match options.action {
        CliAction::Run(choice) => choice,
        _ => menu_choice()?,
    };

    let client = ServerClient::new(&config);
    transfer::prepare_scratch(&config.scratch_dir)?;

    match choice {
        MenuChoice::All => {
            update_mods(&client, &config)?;
            println!();
            update_scripts(&client, &config)
        }
        MenuChoice::Mods => update_mods(&client, &config),
        MenuChoice::Scripts => update_scripts(&client, &config),
        MenuChoice::Exceptions => manage_exceptions(&client, &config),
        MenuChoice::Check => check_mods(&client, &config),
    }
}

fn banner(config: &UpdaterConfig) {
    println!(
        "{} {}",
        "modsync".bold().cyan(),
        concat!("v", env!("CARGO_PKG_VERSION")).dim()
    );
    println!("{}", format!("server: {}", config.server_url).dim());
    if let Ok(Some(newer)) = update::check_remote_version(config, env!("CARGO_PKG_VERSION")) {
        println!(
            "{}",
            format!("The server recommends updater v{newer}; consider upgrading.").yellow()
        );
    }
    println!();
}

fn menu_choice() -> Result<MenuChoice> {
    let index = prompt::select(
        "What would you like to do?",
        &[
            "update all",
            "update mods",
            "update kubejs",
            "manage exceptions",
            "check mods",
        ],
    )?;
    Ok(match index {
        0 => MenuChoice::All,
        1 => MenuChoice::Mods,
        2 => MenuChoice::Scripts,
        3 => MenuChoice::Exceptions,
        _ => MenuChoice::Check,
    })
}

fn update_mods(client: &ServerClient, config: &UpdaterConfig) -> Result<()> {
    println!("{}", "Updating mods".bold());
    let store = ExceptionStore::new(&config.exceptions_file);
    let stored_exceptions = store.load()?;
    let progress = printer_callback();
    let plan = sync::build_plan(client, config, &stored_exceptions, true, Some(&progress))?;
    print_plan(&plan);

    let mut doomed = plan.outcome.stale.clone();
    let removable: BTreeSet<String> = plan
        .outcome
        .unneeded
        .difference(&plan.outcome.kept)
        .cloned()
        .collect();
    if !removable.is_empty()
        && prompt::confirm(
            &format!("Delete {} unneeded mod(s)?", removable.len()),
            true,
        )?
    {
        doomed.extend(removable);
    }
    if !doomed.is_empty() {
        sync::delete_files(&config.mods_dir, &doomed, Some(&progress))?;
    }

    if plan.outcome.to_download().is_empty() {
        println!("No missing mods, skipping download.");
    } else {
        let installed = sync::install(client, config, &plan, Some(&progress))?;
        println!("{}", format!("Installed {installed} mod(s).").green());
    }
    println!("{}", "All mods are up to date.".green());
    Ok(())
}

fn update_scripts(client: &ServerClient, config: &UpdaterConfig) -> Result<()> {
    println!("{}", "Updating KubeJS scripts".bold());
    let progress = printer_callback();
    let report = scripts::replace(
        client,
        &config.scripts_archive,
        &config.scripts_dir,
        &config.scratch_dir,
        Some(&progress),
    )?;
    println!(
        "{}",
        format!(
            "Installed {} script file(s) ({}).",
            report.files,
            format_bytes(report.bytes)
        )
        .green()
    );
    Ok(())
}

fn manage_exceptions(client: &ServerClient, config: &UpdaterConfig) -> Result<()> {
    let store = ExceptionStore::new(&config.exceptions_file);
    let current = store.load()?;
    let progress = printer_callback();
    let plan = sync::build_plan(client, config, &current, false, Some(&progress))?;

    let mut pool = plan.outcome.unneeded.clone();
    pool.extend(current.iter().cloned());
    if pool.is_empty() {
        println!("No local-only mods found; the exception list stays empty.");
        return Ok(());
    }

    let items: Vec<String> = pool.iter().cloned().collect();
    let selection = prompt::multi_select(
        "Mods to protect from automatic deletion:",
        &items,
        &current,
    )?;
    exceptions::validate_selection(&selection, &pool, &current)?;
    if selection == current {
        println!("Exception list unchanged.");
        return Ok(());
    }
    if prompt::confirm(&format!("Save {} exception(s)?", selection.len()), true)? {
        store.save(&selection)?;
        println!(
            "{}",
            format!("Exception list saved to {}.", store.path().display()).green()
        );
    } else {
        println!("Exception list unchanged.");
    }
    Ok(())
}

fn check_mods(client: &ServerClient, config: &UpdaterConfig) -> Result<()> {
    println!("{}", "Checking mods".bold());
    let store = ExceptionStore::new(&config.exceptions_file);
    let stored_exceptions = store.load()?;
    let progress = printer_callback();
    let plan = sync::build_plan(client, config, &stored_exceptions, true, Some(&progress))?;
    print_plan(&plan);

    if plan.outcome.is_converged() {
        println!("{}", "Everything matches the server manifest.".green());
    } else {
        let downloads = plan.outcome.to_download().len();
        let deletions = plan.outcome.to_delete().len();
        println!("{downloads} to download, {deletions} to delete. Run `modsync mods` to apply.");
    }
    Ok(())
}

fn print_plan(plan: &SyncPlan) {
    println!();
    println!(
        "Server lists {} mod(s); {} present locally.",
        plan.manifest.len(),
        plan.inventory.len()
    );
    if plan.manifest.is_empty() {
        println!(
            "{}",
            "The server list is empty; every local mod counts as unneeded.".yellow()
        );
    }
    if plan.outcome.missing.is_empty() {
        println!("Missing mods: none");
    } else {
        println!("Missing mods:");
        for name in &plan.outcome.missing {
            println!("- {name}");
        }
    }
    if plan.outcome.unneeded.is_empty() {
        println!("Unneeded mods: none");
    } else {
        println!("Unneeded mods:");
        for name in &plan.outcome.unneeded {
            if plan.outcome.kept.contains(name) {
                println!("- {name} {}", "(kept, exception)".dim());
            } else {
                println!("- {name}");
            }
        }
    }
    if !plan.outcome.stale.is_empty() {
        println!("{}", "Failed checksum check (will be replaced):".yellow());
        for name in &plan.outcome.stale {
            println!("- {name}");
        }
    }
    println!();
}

struct ProgressPrinter {
    last_stage: Option<SyncStage>,
    line_open: bool,
    last_line_len: usize,
    last_tick: Option<Instant>,
}

impl ProgressPrinter {
    fn new() -> Self {
        Self {
            last_stage: None,
            line_open: false,
            last_line_len: 0,
            last_tick: None,
        }
    }

    fn handle(&mut self, event: &SyncProgress) {
        if self.last_stage != Some(event.stage) {
            self.end_line();
            println!("{}", event.stage.label().bold());
            self.last_stage = Some(event.stage);
        }

        if let Some(done) = event.bytes_done {
            let finished = event.bytes_total == Some(done);
            if !finished && !self.tick_due() {
                return;
            }
            let amount = match event.bytes_total {
                Some(total) if total > 0 => format!("{}%", done * 100 / total),
                _ => format_bytes(done),
            };
            let name = event.detail.as_deref().unwrap_or("");
            self.rewrite(&format!("  {name}: {amount} downloaded"));
            return;
        }

        match event.stage {
            SyncStage::Delete | SyncStage::Promote => {
                if let Some(detail) = &event.detail {
                    self.end_line();
                    println!("  {detail}");
                }
            }
            SyncStage::Verify | SyncStage::CheckLocal | SyncStage::Extract => {
                let due = event.detail.is_none() || self.tick_due();
                if due && event.total > 0 {
                    let shown = event.current.min(event.total);
                    self.rewrite(&format!("  {shown} / {}", event.total));
                }
            }
            SyncStage::FetchManifest => {
                if let Some(detail) = &event.detail {
                    self.end_line();
                    println!("  {detail}");
                }
            }
            _ => {}
        }

        if event.total > 0 && event.current >= event.total {
            self.end_line();
        }
    }

    fn tick_due(&mut self) -> bool {
        let now = Instant::now();
        match self.last_tick {
            Some(last) if now.duration_since(last) < Duration::from_millis(100) => false,
            _ => {
                self.last_tick = Some(now);
                true
            }
        }
    }

    fn rewrite(&mut self, text: &str) {
        let width = text.chars().count();
        let pad = self.last_line_len.saturating_sub(width);
        print!("\r{text}{}", " ".repeat(pad));
        let _ = io::stdout().flush();
        self.last_line_len = width;
        self.line_open = true;
    }

    fn end_line(&mut self) {
        if self.line_open {
            println!();
            self.line_open = false;
            self.last_line_len = 0;
        }
    }
}

fn printer_callback() -> ProgressCallback {
    let printer = Arc::new(Mutex::new(ProgressPrinter::new()));
    Arc::new(move |event: SyncProgress| {
        if let Ok(mut printer) = printer.lock() {
            printer.handle(&event);
        }
    })
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

fn report_error(err: &anyhow::Error, debug: bool) {
    if debug {
        eprintln!("{err:?}");
        return;
    }
    if let Some(sync_err) = err.downcast_ref::<SyncError>() {
        match sync_err {
            SyncError::Cancelled => {
                println!("Cancelled; nothing else was changed.");
            }
            SyncError::ManifestUnavailable(reason) => {
                eprintln!("{} {reason}", "Could not reach the update server:".red());
                eprintln!("Check your connection and the server address in {CONFIG_FILE}.");
            }
            SyncError::ManifestMalformed(reason) => {
                eprintln!("{} {reason}", "The server sent an unusable mod list:".red());
                eprintln!("This is a server-side problem; tell the pack admin.");
            }
            SyncError::Download { name, reason } => {
                eprintln!("{} {name}: {reason}", "Download failed:".red());
            }
            SyncError::ChecksumMismatch(failures) => {
                eprintln!(
                    "{}",
                    "Some downloads failed verification; nothing was installed:".red()
                );
                for failure in failures {
                    eprintln!(
                        "- {} (expected {}, got {})",
                        failure.name,
                        short_digest(&failure.expected),
                        short_digest(&failure.actual)
                    );
                }
                eprintln!("Try again; if it keeps happening, tell the pack admin.");
            }
        }
        return;
    }
    if err.chain().any(|cause| cause.is::<io::Error>()) {
        eprintln!("{} {err:#}", "File system error:".red());
        return;
    }
    eprintln!("{} {err:#}", "Update failed:".red());
}

fn short_digest(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}
