use clap::{Parser, Subcommand};
use content_desk::config::{self, EditorConfig};
use content_desk::deploy::BuildTrigger;
use content_desk::{listing, output, server};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn version_string() -> &'static str {
    if env!("CONTENT_DESK_ON_TAG") == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let describe = env!("CONTENT_DESK_GIT_DESCRIBE");
        if describe.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{describe}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "content-desk")]
#[command(about = "Local web front end for a static site's content folders")]
#[command(long_about = "\
Local web front end for a static site's content folders

Browse the content tree, view images, edit each folder's metadata documents,
upload images, and rebuild the site from a browser.

Per-folder layout:

  content/gallery/japan/
  ├── _index.md          # Section document (list page)
  ├── _index.md.bak      # Previous version, written on every save
  ├── index.md           # Leaf document (single page)
  ├── temple.jpg         # Images: jpg jpeg png gif webp bmp tiff
  └── temple-1.jpg       # Upload that collided with temple.jpg

Configuration comes from config.toml (see 'content-desk gen-config'), then the
PORT environment variable, then command-line flags.

Logging is controlled with RUST_LOG (default: info). Set
CONTENT_DESK_LOG_JSON=1 for JSON log lines.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (missing file means stock defaults)
    #[arg(long, default_value = "config.toml", global = true)]
    config: PathBuf,

    /// Content directory, overriding the config file
    #[arg(long, global = true)]
    content_root: Option<PathBuf>,

    /// Site project directory for builds, overriding the config file
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    /// Listen port, overriding the config file and PORT
    #[arg(long, global = true)]
    port: Option<u16>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the web front end (the default)
    Serve,
    /// Walk the content tree and print a folder inventory
    Check,
    /// Run the site build once and print the output tail
    Build,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_json = std::env::var("CONTENT_DESK_LOG_JSON").is_ok_and(|v| v == "1" || v == "true");
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Config file, then `PORT`, then flags.
fn resolve_config(cli: &Cli) -> Result<EditorConfig, config::ConfigError> {
    let mut config = config::load_config(&cli.config)?;
    config.apply_port_env(std::env::var("PORT").ok().as_deref());
    if let Some(root) = &cli.content_root {
        config.content_root = root.clone();
    }
    if let Some(project) = &cli.project_root {
        config.project_root = project.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::GenConfig) = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    init_tracing();
    let config = resolve_config(&cli)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => server::serve(config).await?,
        Command::Check => {
            let summaries = listing::walk(&config.content_root)?;
            output::print_check_output(&config.content_root, &summaries);
        }
        Command::Build => {
            let report = BuildTrigger::from_config(&config).run_build().await;
            output::print_build_report(&report);
            if !report.success {
                return Err("build failed".into());
            }
        }
        Command::GenConfig => print!("{}", config::stock_config_toml()),
    }

    Ok(())
}
