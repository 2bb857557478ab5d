use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use metabake::depends::resolve_dependencies;
use metabake::{BaseConfig, EngineConfig, MetadataParser};

/// Evaluate BitBake-style recipe metadata
#[derive(Parser)]
#[command(name = "metabake", version, about)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse the base configuration and a recipe, then print its tasks in execution order
    Parse {
        recipe: PathBuf,

        /// Search path for configuration, classes and includes (defaults to $BBPATH)
        #[arg(long)]
        bbpath: Option<String>,

        /// Configuration files to parse before the recipe (default: conf/bitbake.conf)
        #[arg(long = "conf")]
        conf: Vec<PathBuf>,

        /// Print the expanded value of a variable after parsing
        #[arg(long = "var")]
        vars: Vec<String>,
    },

    /// Resolve a flag-guarded dependency list
    Deps {
        expr: String,

        /// Active flag
        #[arg(long = "flag")]
        flags: Vec<String>,

        /// Treat every positive guard as satisfied
        #[arg(long)]
        all_on: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Parse {
            recipe,
            bbpath,
            conf,
            vars,
        } => cmd_parse(&recipe, bbpath, conf, &vars),
        Commands::Deps {
            expr,
            flags,
            all_on,
        } => {
            let atoms = resolve_dependencies(&expr, flags, all_on)?;
            println!("{}", atoms.join(" "));
            Ok(())
        }
    }
}

fn cmd_parse(
    recipe: &Path,
    bbpath: Option<String>,
    conf: Vec<PathBuf>,
    vars: &[String],
) -> Result<()> {
    let mut config = EngineConfig::from_env()?;
    if let Some(bbpath) = bbpath {
        config = config.with_bbpath(bbpath);
    }
    let parser = MetadataParser::new(config);

    let conf = if conf.is_empty() {
        BaseConfig::default_files()
    } else {
        conf
    };
    let base = BaseConfig::parse(&parser, &conf)?;

    let recipe = recipe
        .canonicalize()
        .with_context(|| format!("recipe {} not found", recipe.display()))?;
    let (d, metadata) = base.parse_recipe(&parser, &recipe)?;

    if let Some(metadata) = metadata {
        for task in metadata.tasks.execution_order()? {
            let deps = metadata.tasks.deps(&task).unwrap_or_default();
            println!("{}: {}", task, deps.join(" "));
        }
        for handler in &metadata.handlers {
            println!("handler {}", handler);
        }
    }

    for var in vars {
        match d.get_var(var) {
            Some(raw) => println!("{}={}", var, d.expand(&raw)?),
            None => println!("{} is unset", var),
        }
    }

    Ok(())
}
