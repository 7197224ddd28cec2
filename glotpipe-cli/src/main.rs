use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use dialoguer::Confirm;
use glotpipe::extract::{BuiltinExtractor, Extractor, GenstringsTool};
use glotpipe::glotpress::TOKEN_ENV;
use glotpipe::metadata::DeliverUploader;
use glotpipe::process::SystemRunner;
use glotpipe::progress::DEFAULT_THRESHOLD;
use glotpipe::{GitCommitter, GlotPressClient, PipelineConfig, VariantKind, lanes};
use glotpipe_cli::{VariantArg, report};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "glotpipe", author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Configuration file (default: nearest glotpipe.toml above the project root)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Root of the app repository
    #[arg(short = 'C', long, global = true, default_value = ".")]
    project_root: PathBuf,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    commands: Commands,
}

/// Release lanes.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract the app strings, merge the manual files, and commit.
    Generate {
        /// Use a genstrings-compatible tool instead of the built-in scanner
        #[arg(long, value_name = "PROGRAM")]
        genstrings: Option<String>,
    },

    /// Upload the canonical strings file to GlotPress.
    Push {
        #[arg(long, env = TOKEN_ENV, hide_env_values = true)]
        token: Option<String>,
    },

    /// Download the app translations, redistribute the manual keys, then
    /// download the App Store metadata.
    Download {
        /// Only these GlotPress locale codes (repeatable)
        #[arg(short, long = "locale", value_name = "CODE")]
        locales: Vec<String>,

        /// Stop after the app strings
        #[arg(long)]
        skip_metadata: bool,

        #[arg(long, env = TOKEN_ENV, hide_env_values = true)]
        token: Option<String>,
    },

    /// Regenerate AppStoreStrings.po for a release.
    #[command(disable_version_flag = true)]
    UpdateAppstoreStrings {
        /// Release version, `x.y`
        #[arg(long)]
        version: String,

        #[arg(long, value_enum, default_value_t)]
        variant: VariantArg,
    },

    /// Download the localized App Store metadata and commit it.
    DownloadMetadata {
        #[arg(long, value_enum, default_value_t)]
        variant: VariantArg,
    },

    /// Upload the App Store metadata with deliver.
    UploadMetadata {
        #[arg(long, value_enum, default_value_t)]
        variant: VariantArg,

        /// Also upload the promo screenshots
        #[arg(long)]
        with_screenshots: bool,
    },

    /// Report locales translated below the threshold.
    CheckTranslations {
        /// Ask before continuing when a project has violations
        #[arg(short, long)]
        interactive: bool,

        #[arg(long, default_value_t = DEFAULT_THRESHOLD, value_parser = clap::value_parser!(u8).range(0..=100))]
        threshold: u8,

        #[arg(long, env = TOKEN_ENV, hide_env_values = true)]
        token: Option<String>,
    },

    /// Print a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let root = args
        .project_root
        .canonicalize()
        .with_context(|| format!("project root `{}` not found", args.project_root.display()))?;
    let (config, path) = PipelineConfig::load(&root, args.config.as_deref())
        .context("failed to load configuration")?;
    match path {
        Some(path) => debug!(path = %path.display(), "using config file"),
        None => debug!("using built-in configuration"),
    }
    Ok(config)
}

fn committer(root: &Path) -> Result<GitCommitter> {
    GitCommitter::discover(root).context("project root is not inside a git repository")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    match &args.commands {
        Commands::Completions { shell } => {
            let mut cmd = Args::command();
            clap_complete::generate(*shell, &mut cmd, "glotpipe", &mut io::stdout());
        }
        Commands::Generate { genstrings } => {
            let config = load_config(&args)?;
            let committer = committer(&config.project_root)?;
            let extractor: Box<dyn Extractor> = match genstrings {
                Some(program) => Box::new(GenstringsTool::new(program, SystemRunner)),
                None => Box::new(BuiltinExtractor),
            };
            let outcome = lanes::generate(&config, extractor.as_ref(), &committer)?;
            println!("{}", report::commit_line(&outcome));
        }
        Commands::Push { token } => {
            let config = load_config(&args)?;
            let committer = committer(&config.project_root)?;
            let client = GlotPressClient::new(token.clone());
            let outcome = lanes::push(&config, &client, &committer).await?;
            println!("{}", report::commit_line(&outcome));
        }
        Commands::Download {
            locales,
            skip_metadata,
            token,
        } => {
            let config = load_config(&args)?;
            let committer = committer(&config.project_root)?;
            let client = GlotPressClient::new(token.clone());
            let kinds = if *skip_metadata {
                Vec::new()
            } else {
                VariantKind::ALL.to_vec()
            };
            let download =
                lanes::download(&config, &client, &committer, &SystemRunner, locales, &kinds)
                    .await?;
            print!("{}", report::download_summary(&config.project_root, &download));
            for (kind, outcome) in kinds.iter().zip(&download.metadata) {
                println!("{}: {}", kind.display_name(), report::commit_line(outcome));
            }
        }
        Commands::UpdateAppstoreStrings { version, variant } => {
            let config = load_config(&args)?;
            let written = lanes::update_appstore_strings(&config, &variant.kinds(), version)?;
            print!("{}", report::path_list(&config.project_root, &written));
        }
        Commands::DownloadMetadata { variant } => {
            let config = load_config(&args)?;
            let committer = committer(&config.project_root)?;
            let outcomes =
                lanes::download_metadata(&config, &variant.kinds(), &SystemRunner, &committer)?;
            for (kind, outcome) in variant.kinds().iter().zip(&outcomes) {
                println!("{}: {}", kind.display_name(), report::commit_line(outcome));
            }
        }
        Commands::UploadMetadata {
            variant,
            with_screenshots,
        } => {
            let config = load_config(&args)?;
            let uploader = DeliverUploader::new(SystemRunner).current_dir(&config.project_root);
            lanes::upload_metadata(&config, &variant.kinds(), &uploader, *with_screenshots)?;
            info!("metadata uploaded");
        }
        Commands::CheckTranslations {
            interactive,
            threshold,
            token,
        } => {
            let config = load_config(&args)?;
            let client = GlotPressClient::new(token.clone());
            let projects = lanes::check_translations(&config, &client, *threshold).await?;
            for project in &projects {
                print!("{}", report::progress_summary(project, *threshold));
                if *interactive && !project.violations.is_empty() {
                    let proceed = Confirm::new()
                        .with_prompt("Do you want to continue?")
                        .default(false)
                        .interact()?;
                    if !proceed {
                        bail!("aborted: translations of {} are incomplete", project.project_url);
                    }
                }
            }
        }
    }

    Ok(())
}
