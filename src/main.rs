//! testflow - Browser operation history tooling
//!
//! Inspects exported test results and generates WebdriverIO test scripts from them.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use testflow::actions::{DiagramAction, ResumeAction};
use testflow::app::cli::{Cli, Commands, ConfigAction, DiagramKind};
use testflow::app::config::Config;
use testflow::codegen::{screenshot_links, ScriptGenerator, ScriptSource, ScriptWriter, ServiceUrlResolver};
use testflow::coverage::CoverageCalculator;
use testflow::model::TestResultExport;
use testflow::repository::HttpRepository;
use testflow::ScreenHistory;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Parse CLI arguments first so we can use --verbose to set log level
    let cli = Cli::parse_args();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    // `config init` rewrites the file, so a broken existing one must not block it
    let config = match (&cli.command, &cli.config) {
        (Commands::Config { action: ConfigAction::Init { .. } }, _) => Config::default(),
        (_, Some(path)) => Config::load(path)?,
        (_, None) => Config::load_default()?,
    };

    match cli.command {
        Commands::History { input } => {
            run_history(&input, &config)?;
        }
        Commands::Coverage { input, include_tags } => {
            run_coverage(&input, include_tags, &config)?;
        }
        Commands::Diagram { input, kind } => {
            run_diagram(&input, kind, &config)?;
        }
        Commands::Generate {
            inputs,
            optimize,
            data_driven,
            max_generation,
            output,
        } => {
            let mut options = config.generation.options();
            options.optimize |= optimize;
            options.data_driven |= data_driven;
            if let Some(max) = max_generation {
                options.max_generation = max;
            }
            let generator = ScriptGenerator::new(options)
                .with_url_resolver(Arc::new(ServiceUrlResolver::new(config.service.base_url.clone())));
            run_generate(&inputs, &generator, output.unwrap_or_else(Cli::scripts_dir))?;
        }
        Commands::Resume { test_result_id } => {
            run_resume(&test_result_id, &config)?;
        }
        Commands::Config { action } => {
            run_config(action, cli.config, &config)?;
        }
    }

    Ok(())
}

/// Load an export and build its screen history
fn load_screen_history(input: &Path) -> anyhow::Result<(TestResultExport, ScreenHistory)> {
    let export = TestResultExport::load(input)?;
    let history = export.clone().into_history()?;
    let screens = ScreenHistory::build(history.steps(), &export.coverage_sources)?;
    info!(
        input = %input.display(),
        operations = history.len(),
        screens = screens.screens().len(),
        "loaded test result"
    );
    Ok((export, screens))
}

fn print_screen_history(screens: &ScreenHistory, config: &Config) {
    println!("Windows:");
    for handle in screens.windows().handles() {
        let label = screens.windows().label(handle).unwrap_or_default();
        let operations = screens.window_entries(handle).count();
        println!("  {} ({}): {} operations", label, handle, operations);
    }

    println!("\nScreens:");
    for node in screens.screens() {
        let label = screens.windows().label(&node.window_handle).unwrap_or_default();
        println!("  [{}] {} (from #{})", label, node.screen_def, node.first_sequence);
    }

    println!("\nTransitions:");
    for (source, target, sequence) in screens.edges() {
        println!("  #{}: {} -> {}", sequence, source, target);
    }

    let resolver = ServiceUrlResolver::new(config.service.base_url.clone());
    let links = screenshot_links(screens, &resolver);
    if !links.is_empty() {
        println!("\nScreenshots:");
        for (sequence, url) in links {
            println!("  #{}: {}", sequence, url);
        }
    }
}

fn run_history(input: &Path, config: &Config) -> anyhow::Result<()> {
    let (export, screens) = load_screen_history(input)?;
    println!("Test result: {} ({})\n", export.metadata.name, export.metadata.id);
    print_screen_history(&screens, config);
    Ok(())
}

fn run_coverage(input: &Path, include_tags: Vec<String>, config: &Config) -> anyhow::Result<()> {
    let (_, screens) = load_screen_history(input)?;
    let tags = if include_tags.is_empty() {
        config.coverage.include_tags.clone()
    } else {
        include_tags
    };

    let coverage = CoverageCalculator::with_include_tags(tags).compute(&screens);
    println!("{:<40} {:>8} {:>8} {:>7}", "Screen", "Covered", "Total", "%");
    for screen in coverage.values() {
        println!(
            "{:<40} {:>8} {:>8} {:>6.1}%",
            screen.screen_def,
            screen.covered,
            screen.total,
            screen.percentage * 100.0
        );
    }
    Ok(())
}

fn run_diagram(input: &Path, kind: DiagramKind, config: &Config) -> anyhow::Result<()> {
    let (_, screens) = load_screen_history(input)?;
    let action = DiagramAction::new(config.diagram.options());

    match kind {
        DiagramKind::Sequence => {
            let runtime = tokio::runtime::Runtime::new()?;
            let diagrams = runtime.block_on(action.build_sequence_diagrams(Arc::new(screens)))?;
            for window in diagrams {
                println!("%% {} ({})", window.label, window.window_handle);
                println!("{}", window.diagram.graph_text);
            }
        }
        DiagramKind::Transition => {
            let diagram = action.build_screen_transition_diagram(&screens, &[])?;
            println!("{}", diagram.graph_text);
        }
    }
    Ok(())
}

fn run_generate(inputs: &[PathBuf], generator: &ScriptGenerator, output: PathBuf) -> anyhow::Result<()> {
    let mut sources = Vec::with_capacity(inputs.len());
    for input in inputs {
        let export = TestResultExport::load(input)?;
        let name = if export.metadata.name.is_empty() {
            input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        } else {
            export.metadata.name.clone()
        };
        sources.push(ScriptSource::new(export.metadata.initial_url.clone(), export.test_steps).with_name(name));
    }

    let scripts = generator.generate(&sources)?;
    let bundle = ScriptWriter::new().write(&scripts)?;
    bundle.write_to(&output)?;

    println!("Generated {} files in {:?}", bundle.files.len(), output);
    println!("  Page objects: {}", scripts.page_objects.len());
    println!("  Test suites: {}", scripts.test_suites.len());
    if !scripts.test_data.is_empty() {
        println!("  Data sets: {}", scripts.test_data.len());
    }
    Ok(())
}

fn run_resume(test_result_id: &str, config: &Config) -> anyhow::Result<()> {
    let repository = HttpRepository::new(config.service.base_url.clone(), config.service.timeout())?;
    let runtime = tokio::runtime::Runtime::new()?;
    let session = runtime.block_on(ResumeAction::new(Arc::new(repository)).resume(test_result_id))?;

    println!(
        "Test result: {} ({}), {} operations\n",
        session.metadata.name,
        session.test_result_id(),
        session.history().len()
    );
    print_screen_history(session.screen_history(), config);
    Ok(())
}

fn run_config(action: ConfigAction, path: Option<PathBuf>, config: &Config) -> anyhow::Result<()> {
    let config_path = path.unwrap_or_else(Config::default_path);
    match action {
        ConfigAction::Show => {
            println!("Configuration ({:?}):\n", config_path);
            println!("{}", config.to_toml()?);
        }
        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                anyhow::bail!(
                    "Config already exists at {:?}. Use --force to overwrite.",
                    config_path
                );
            }

            let default_config = Config::default();
            default_config.save(&config_path)?;
            println!("Created config at {:?}", config_path);
            println!("\nConfig content:\n{}", default_config.to_toml()?);
        }
    }

    Ok(())
}
