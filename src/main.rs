use anyhow::{Context, Result};
use deckhand::cli::commands::{
    CleanCommand, OnetimeCommand, PipelineCommand, RenderCommand, TaskCommand, ValidateCommand,
};
use deckhand::cli::output::*;
use deckhand::cli::{Cli, Command};
use deckhand::{
    AppConfig, ConfigInventory, Deployer, FileRenderer, HttpControlPlane, Settings, TaskTracker,
    TemplateRenderer,
};
use indicatif::ProgressBar;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let result = match &cli.command {
        Command::Pipeline(cmd) => deploy_pipelines(cmd, &cli).await,
        Command::Onetime(cmd) => deploy_onetime(cmd, &cli).await,
        Command::Clean(cmd) => clean_pipelines(cmd, &cli).await,
        Command::Validate(cmd) => validate_config(cmd),
        Command::Render(cmd) => render_pipelines(cmd, &cli).await,
        Command::Task(cmd) => run_task(cmd, &cli).await,
    };

    if let Err(e) = result {
        println!("\n{} {}", CROSS, style("failed").red());
        error!("{:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn load_settings(cli: &Cli) -> Result<Arc<Settings>> {
    let mut settings =
        Settings::load(cli.settings.as_deref()).context("Failed to load settings")?;
    if let Some(gate_url) = &cli.gate_url {
        settings = settings.with_gate_url(gate_url.clone());
    }
    if let Some(dir) = &cli.templates {
        settings = settings.with_templates_dir(dir.clone());
    }
    Ok(Arc::new(settings))
}

fn load_config(path: &std::path::Path) -> Result<AppConfig> {
    let config = AppConfig::from_file(path).context("Failed to load app config")?;
    println!("{} Loaded app: {}", INFO, style(&config.app).bold());
    Ok(config)
}

fn client(settings: &Settings) -> Result<Arc<HttpControlPlane>> {
    let client = HttpControlPlane::new(&settings.gate_url)
        .and_then(|c| c.with_timeout(settings.http_timeout()))
        .with_context(|| format!("Failed to create control-plane client for {}", settings.gate_url))?;
    Ok(Arc::new(client))
}

fn renderer(settings: &Settings) -> Arc<dyn TemplateRenderer> {
    match &settings.templates_dir {
        Some(dir) => Arc::new(FileRenderer::with_root(dir.clone())),
        None => Arc::new(FileRenderer::builtin()),
    }
}

fn deployer(config: &AppConfig, settings: Arc<Settings>) -> Result<Deployer<HttpControlPlane>> {
    let mut deployer = Deployer::new(
        client(&settings)?,
        settings.clone(),
        renderer(&settings),
        Arc::new(ConfigInventory::from_config(config)),
    );
    deployer.add_event_handler(|event| println!("{}", format_deploy_event(&event)));
    Ok(deployer)
}

/// Spinner updated from tracker events while a task runs
fn attach_spinner(deployer: &mut Deployer<HttpControlPlane>) -> ProgressBar {
    let spinner = create_spinner("Waiting for task");
    let handle = spinner.clone();
    deployer.add_tracker_handler(move |event| {
        handle.set_message(format_tracker_event(&event));
    });
    spinner
}

async fn ensure_application(deployer: &mut Deployer<HttpControlPlane>, config: &AppConfig) -> Result<()> {
    let spinner = attach_spinner(deployer);
    let result = deployer.ensure_application(config).await;
    spinner.finish_and_clear();

    let task = result.context("Failed to create or update application")?;
    println!(
        "{} Application {} ready ({})",
        CHECK,
        style(&config.app).bold(),
        style(&task.id).dim()
    );
    Ok(())
}

async fn deploy_pipelines(cmd: &PipelineCommand, cli: &Cli) -> Result<()> {
    let config = load_config(&cmd.file)?;
    let mut deployer = deployer(&config, load_settings(cli)?)?;

    if cmd.ensure_app {
        ensure_application(&mut deployer, &config).await?;
    }

    println!();
    let report = deployer
        .deploy_standing(&config)
        .await
        .context("Failed to deploy pipelines")?;

    println!("\n{}", format_report(&report));
    println!(
        "\n{} {} pipelines {}",
        CHECK,
        style(&config.app).bold(),
        style("up to date").green()
    );
    Ok(())
}

async fn deploy_onetime(cmd: &OnetimeCommand, cli: &Cli) -> Result<()> {
    let config = load_config(&cmd.file)?;
    let mut deployer = deployer(&config, load_settings(cli)?)?;

    if cmd.ensure_app {
        ensure_application(&mut deployer, &config).await?;
    }

    println!();
    let report = deployer
        .deploy_onetime(&config, &cmd.env)
        .await
        .with_context(|| format!("Failed to deploy one-shot pipeline for {}", cmd.env))?;

    println!("\n{}", format_report(&report));
    Ok(())
}

async fn clean_pipelines(cmd: &CleanCommand, cli: &Cli) -> Result<()> {
    let config = load_config(&cmd.file)?;
    let deployer = deployer(&config, load_settings(cli)?)?;

    deployer
        .clean(&config)
        .await
        .context("Failed to clean pipelines")?;
    Ok(())
}

fn validate_config(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating app config...", INFO);

    match AppConfig::from_file(&cmd.file) {
        Ok(config) => {
            println!("{} App configuration is valid!", CHECK);
            println!("  App: {}", style(&config.app).bold());
            println!("  Kind: {}", style(config.kind).cyan());
            println!("  Environments: {}", style(config.pipeline.env.join(" → ")).cyan());
            println!(
                "  Regions: {}",
                style(config.declared_regions().into_iter().collect::<Vec<_>>().join(", ")).cyan()
            );

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    }
}

async fn render_pipelines(cmd: &RenderCommand, cli: &Cli) -> Result<()> {
    let config = load_config(&cmd.file)?;
    let settings = load_settings(cli)?;
    // Assembly is offline; nothing is sent to the control plane
    let deployer = deployer(&config, settings)?;

    let documents = match &cmd.onetime {
        Some(env) => vec![deployer.assemble_onetime(&config, env).await?],
        None => deployer
            .assemble_standing(&config)
            .await?
            .into_iter()
            .map(|p| p.document)
            .collect(),
    };

    for document in &documents {
        println!("\n{}", serde_json::to_string_pretty(&document.to_json()?)?);
    }
    Ok(())
}

async fn run_task(cmd: &TaskCommand, cli: &Cli) -> Result<()> {
    let mut settings = (*load_settings(cli)?).clone();
    if let Some(secs) = cmd.timeout {
        settings.default_task_timeout_secs = secs;
        settings.task_timeouts.clear();
    }
    let settings = Arc::new(settings);

    let contents = std::fs::read_to_string(&cmd.file)
        .with_context(|| format!("Failed to read job file: {}", cmd.file.display()))?;
    let job: serde_json::Value =
        serde_json::from_str(&contents).context("Job file is not valid JSON")?;

    let mut tracker = TaskTracker::new(client(&settings)?, settings.clone());
    let spinner = create_spinner("Submitting task");
    let handle = spinner.clone();
    tracker.add_event_handler(move |event| handle.set_message(format_tracker_event(&event)));

    let result = tracker.submit_and_wait(&job).await;
    spinner.finish_and_clear();
    let task = result.context("Task did not succeed")?;

    let elapsed = task
        .finished_at
        .and_then(|end| end.signed_duration_since(task.submitted_at).to_std().ok())
        .unwrap_or(Duration::ZERO);
    println!(
        "{} Task {} {} in {}",
        CHECK,
        style(&task.id).bold(),
        format_task_status(&task.status),
        format_duration(elapsed)
    );
    Ok(())
}
