use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use prj::cli::{CliArgs, Command};
use prj::config::Config;
use prj::git::Git2Client;
use prj::registry::{AddOutcome, Registry};
use prj::report::{StatusReporter, parse_all};
use prj::scan::{find_unexpected_checkouts, relative_display};
use prj::RepoIdentifier;
use std::fs;
use std::process::exit;
use std::time::Duration;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    if let Err(err) = run(CliArgs::parse()) {
        error!("{err:#}");
        exit(1);
    }
}

fn run(args: CliArgs) -> Result<()> {
    let config = Config::from_cli_and_file(&args)?;
    debug!(?config, "loaded configuration");

    match args.command {
        Command::Init => run_init(&config),
        Command::Add { repo } => run_add(&config, &repo),
        Command::Status => run_status(&config),
        Command::List => run_list(&config),
    }
}

fn run_init(config: &Config) -> Result<()> {
    fs::create_dir_all(&config.projects_dir).with_context(|| {
        format!("Failed to create projects directory {}", config.projects_dir.display())
    })?;

    let registry = Registry::new(config.registry_path());
    if registry.init()? {
        println!("Created .current-projects file at: {}", registry.path().display());
        println!("Add your repositories to this file, one per line");
    } else {
        println!("Project directory already initialized");
    }
    Ok(())
}

fn run_add(config: &Config, repo: &str) -> Result<()> {
    let registry = Registry::new(config.registry_path());
    match registry.add(repo)? {
        AddOutcome::Added => println!("Added {} to {}", repo.trim(), registry.path().display()),
        AddOutcome::AlreadyPresent => println!("Repository already exists in projects file"),
    }
    Ok(())
}

fn run_status(config: &Config) -> Result<()> {
    let identifiers = Registry::new(config.registry_path()).read()?;
    if identifiers.is_empty() {
        println!(
            "{}",
            "No repositories configured. Run 'prj add <repo>' to add one.".yellow()
        );
        return Ok(());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg} {pos}/{len}")
            .context("Invalid spinner template")?,
    );
    spinner.set_message("Checking projects...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let reporter = StatusReporter::new(Git2Client::new(config.fetch_timeout()), &config.projects_dir)
        .with_jobs(config.jobs)
        .with_progress(spinner);
    let lines = reporter.report(&identifiers);

    for (index, line) in lines.iter().enumerate() {
        println!("{:3} {}", index + 1, line);
    }

    let registered: Vec<RepoIdentifier> = identifiers
        .iter()
        .filter_map(|raw| RepoIdentifier::parse(raw).ok())
        .collect();
    match find_unexpected_checkouts(&config.projects_dir, &registered) {
        Ok(unexpected) if !unexpected.is_empty() => {
            println!();
            println!("{}", "Unexpected directories (not in registry):".yellow());
            for path in unexpected {
                println!("  {}", relative_display(&path, &config.projects_dir).dimmed());
            }
        }
        Ok(_) => {}
        Err(e) => debug!("cannot scan for unexpected directories: {e:#}"),
    }

    Ok(())
}

fn run_list(config: &Config) -> Result<()> {
    let identifiers = Registry::new(config.registry_path()).read()?;
    let ids = parse_all(&identifiers);

    for (index, id) in ids.iter().flatten().enumerate() {
        println!("{:3} {}", index + 1, id.display_name());
    }
    Ok(())
}
