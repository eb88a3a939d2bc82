use clap::{Parser, Subcommand};
use pagesmith::config::{self, SiteConfig};
use pagesmith::event::Reporter;
use pagesmith::output;
use pagesmith::paths::relative_slash_path;
use pagesmith::pipeline::{self, Pipeline};
use pagesmith::scan::{self, PathRules};
use std::path::PathBuf;

/// Shared flags for commands that depend on the build mode.
#[derive(clap::Args, Clone)]
struct ModeArgs {
    /// Development build: skip inlining and minification, rewrite /<source>/ paths
    #[arg(long)]
    dev: bool,
}

#[derive(Parser)]
#[command(name = "pagesmith")]
#[command(about = "Build pipeline for hand-written static sites")]
#[command(long_about = "\
Build pipeline for hand-written static sites

The source tree is copied into the output directory, then every HTML, CSS
and JS file is transformed in place. Attributes on ordinary elements drive
the build:

  <div include=\"/includes/footer\"></div>          splice in a fragment
  <link rel=\"stylesheet\" href=\"/a.css\" inline>     inline the stylesheet
  <script src=\"/a.js\" bundle=\"main\"></script>      concatenate into bundle-main.js
  <a href=\"www.example.com\">                        becomes http://www.example.com

Navigation links to the current page get class=\"active\"; links to its
parent sections get class=\"parent-active\". Finally about.html moves to
about/index.html.

Run 'pagesmith gen-config' to generate a documented pagesmith.toml.")]
#[command(version = env!("PAGESMITH_VERSION"))]
struct Cli {
    /// Config file (default: ./pagesmith.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Source directory (overrides the config file)
    #[arg(long, global = true)]
    source: Option<PathBuf>,

    /// Output directory (overrides the config file)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: stage → transform → bundle → materialize
    Build {
        #[command(flatten)]
        mode: ModeArgs,
        /// Write the build report as JSON to this file
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
    /// Validate config and list the files a build would process
    Check(ModeArgs),
    /// Print a stock pagesmith.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match &cli.command {
        Command::Build { mode, manifest } => {
            let site_config = load_site_config(&cli, mode)?;
            let output_dir = site_config.output.clone();

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_build_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let reporter = Reporter::new(tx, &output_dir);
            let result = Pipeline::new(site_config).run(&reporter);
            // Close the channel so the printer drains and exits.
            drop(reporter);
            printer.join().ok();
            let report = result?;

            output::print_build_summary(&report);
            if let Some(path) = manifest {
                let json = serde_json::to_string_pretty(&report)?;
                std::fs::write(path, json)?;
            }
        }
        Command::Check(mode) => {
            let site_config = load_site_config(&cli, mode)?;
            let rules = PathRules::from_config(&site_config)?;
            let files: Vec<String> = scan::scan(&site_config.source, &rules)?
                .iter()
                .map(|p| relative_slash_path(&site_config.source, p))
                .collect();
            let stages = pipeline::stage_names(&site_config)?;
            output::print_check_output(&site_config, &stages, &files);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Resolve the config file, then layer command-line overrides on top.
///
/// An explicit `--config` must exist; the default `pagesmith.toml` is optional.
fn load_site_config(cli: &Cli, mode: &ModeArgs) -> Result<SiteConfig, config::ConfigError> {
    let path = match &cli.config {
        Some(path) if !path.exists() => {
            return Err(config::ConfigError::Validation(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        Some(path) => path.clone(),
        None => PathBuf::from(config::CONFIG_FILENAME),
    };
    let file = config::load_raw_config(&path)?;

    let mut overrides = toml::Table::new();
    if let Some(source) = &cli.source {
        overrides.insert("source".into(), path_value(source));
    }
    if let Some(output) = &cli.output {
        overrides.insert("output".into(), path_value(output));
    }
    if mode.dev {
        overrides.insert("development".into(), toml::Value::Boolean(true));
    }

    let overlay = match file {
        Some(file) => config::merge_toml(file, toml::Value::Table(overrides)),
        None => toml::Value::Table(overrides),
    };
    config::resolve_config(Some(overlay))
}

fn path_value(path: &std::path::Path) -> toml::Value {
    toml::Value::String(path.to_string_lossy().into_owned())
}
