//! meshform CLI - Kuma service-mesh policies for Kubernetes

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

mod commands;
mod display;
mod error;
mod exit_codes;

use commands::ClusterArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "meshform")]
#[command(author = "meshform Contributors")]
#[command(version)]
#[command(about = "Kuma service-mesh policies as typed data sources, manifests and resources", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    cluster: ClusterArgs,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

/// Output format for state read from the cluster
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported policy kinds and their type names
    Kinds {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the spec schema of a kind
    Schema {
        /// Policy kind, plural or type name (e.g. MeshTimeout)
        kind: String,

        /// Print the full CustomResourceDefinition instead
        #[arg(long)]
        crd: bool,
    },

    /// Validate policy manifests offline
    Validate {
        /// Manifest files (multi-document YAML)
        #[arg(short = 'f', long = "file", required = true)]
        files: Vec<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Render a single policy as a YAML manifest
    Manifest {
        /// Policy kind
        kind: String,

        /// Object name
        name: String,

        /// Object namespace
        #[arg(short, long, default_value = "default")]
        namespace: String,

        /// YAML or JSON file holding the spec
        #[arg(short = 's', long = "spec")]
        spec: Option<PathBuf>,

        /// Labels (key=value)
        #[arg(short = 'l', long = "label")]
        labels: Vec<String>,

        /// Annotations (key=value)
        #[arg(long = "annotation")]
        annotations: Vec<String>,
    },

    /// Read a policy from the cluster
    Get {
        /// Policy kind
        kind: String,

        /// Object name
        name: String,

        /// Object namespace
        #[arg(short, long, default_value = "default")]
        namespace: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Create or update policies with server-side apply
    Apply {
        /// Manifest files (multi-document YAML)
        #[arg(short = 'f', long = "file", required = true)]
        files: Vec<PathBuf>,
    },

    /// Delete a policy from the cluster
    Delete {
        /// Policy kind
        kind: String,

        /// Object name
        name: String,

        /// Object namespace
        #[arg(short, long, default_value = "default")]
        namespace: String,
    },

    /// Import an existing policy, printing its resource state
    Import {
        /// Policy kind
        kind: String,

        /// Import identifier: namespace/name
        id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },
}

fn init_logging(debug: bool) {
    let default = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Kinds { json } => commands::kinds::run(json),

        Commands::Schema { kind, crd } => commands::schema::run(&kind, crd),

        Commands::Validate { files, json } => commands::validate::run(&files, json),

        Commands::Manifest {
            kind,
            name,
            namespace,
            spec,
            labels,
            annotations,
        } => commands::manifest::run(
            &kind,
            &name,
            &namespace,
            spec.as_deref(),
            &labels,
            &annotations,
        ),

        Commands::Get {
            kind,
            name,
            namespace,
            output,
        } => commands::get::run(&cli.cluster, &kind, &namespace, &name, output).await,

        Commands::Apply { files } => commands::apply::run(&cli.cluster, &files).await,

        Commands::Delete {
            kind,
            name,
            namespace,
        } => commands::delete::run(&cli.cluster, &kind, &namespace, &name).await,

        Commands::Import { kind, id, output } => {
            commands::import::run(&cli.cluster, &kind, &id, output).await
        }
    }
}
