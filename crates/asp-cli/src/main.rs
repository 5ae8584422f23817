mod commands;
mod render;
mod reporter;
mod targets;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};

use commands::CommonPaths;
use reporter::CliReporter;

#[derive(Parser, Debug)]
#[command(name = "asp", version, about = "Package manager and composer for coding-agent harness spaces")]
struct Cli {
    /// Project directory (default: current directory).
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    /// Registry git working copy (default: the project directory).
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// Override ASP_HOME for this invocation.
    #[arg(long = "asp-home", global = true)]
    asp_home: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build and run a target, ref, or dev path through a harness.
    Run {
        target_or_ref_or_path: String,
        prompt: Option<String>,
        #[arg(long, default_value = asp_harness::DEFAULT_HARNESS_ID)]
        harness: String,
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        inherit_settings: bool,
        #[arg(long)]
        no_interactive: bool,
        #[arg(long)]
        no_warnings: bool,
        #[arg(long = "extra-args", num_args = 0.., allow_hyphen_values = true)]
        extra_args: Vec<String>,
    },
    /// Materialize and compose a target without invoking a harness.
    Build {
        target: Option<String>,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value = asp_harness::DEFAULT_HARNESS_ID)]
        harness: String,
        #[arg(long)]
        no_clean: bool,
        #[arg(long)]
        no_install: bool,
        #[arg(long)]
        no_lint: bool,
    },
    /// Resolve every target and persist the lock.
    Install {
        #[arg(long = "target")]
        targets: Vec<String>,
    },
    /// Print the resolved load order for one or all targets.
    Explain {
        target: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Run the lint engine over one or all targets. Always exits 0.
    Lint {
        target: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Add a space reference to a target's compose list.
    Add {
        space_ref: String,
        #[arg(long)]
        target: String,
        #[arg(long)]
        no_install: bool,
    },
    /// Remove every compose entry referencing a space from a target.
    Remove {
        space_id: String,
        #[arg(long)]
        target: String,
    },
    /// Re-resolve selectors and persist a fresh lock.
    Upgrade {
        space_id: Option<String>,
        #[arg(long)]
        target: Option<String>,
    },
    /// List registered harnesses and whether they were detected.
    Harnesses {
        #[arg(long)]
        json: bool,
    },
    /// Print environment and harness-detection diagnostics.
    Doctor {
        #[arg(long)]
        json: bool,
    },
    /// Registry operations.
    Repo {
        #[command(subcommand)]
        cmd: RepoCommands,
    },
    /// Print a space's on-disk path in the registry.
    Path { space_id: String },
    /// Generate shell completions.
    Completions { shell: clap_complete::Shell },
}

#[derive(Subcommand, Debug)]
enum RepoCommands {
    /// Initialize a registry working copy.
    Init,
    /// Show the registry's current commit/branch/clean state.
    Status,
    /// List `space/<id>/v<semver>` tags.
    Tags { space_id: Option<String> },
    /// Tag and push a space's current version.
    Publish {
        space_id: String,
        version: String,
        #[arg(long, default_value = "origin")]
        remote: String,
    },
    /// Sweep unreachable snapshots and harness cache entries.
    Gc {
        #[arg(long)]
        projects_root: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
        #[arg(long = "harness", default_values_t = ["claude".to_string(), "codex".to_string(), "pi".to_string()])]
        harnesses: Vec<String>,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let rt = tokio::runtime::Runtime::new().expect("failed to start async runtime");
    match rt.block_on(dispatch(cli)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<ExitCode> {
    let paths = CommonPaths::new(cli.project.clone(), cli.registry.clone(), cli.asp_home.clone())?;

    match cli.cmd {
        Commands::Run { target_or_ref_or_path, prompt, harness, dry_run, inherit_settings, no_interactive: _, no_warnings, extra_args } => {
            let code = commands::run(&paths, &target_or_ref_or_path, prompt, &harness, dry_run, extra_args, inherit_settings, no_warnings).await?;
            Ok(exit_code_from(code))
        }
        Commands::Build { target, output, harness, no_clean, no_install, no_lint } => {
            let target = target.unwrap_or_else(|| "default".to_string());
            commands::build_target(&paths, &target, &output, &harness, !no_clean, !no_install, !no_lint).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Install { targets } => {
            let target_names = if targets.is_empty() { None } else { Some(targets) };
            commands::install_all(&paths, target_names).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Explain { target, json } => {
            commands::explain(&paths, target.as_deref(), json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Lint { target, json } => {
            commands::lint(&paths, target.as_deref(), json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Add { space_ref, target, no_install } => {
            commands::add(&paths, &space_ref, &target)?;
            if !no_install {
                commands::install_all(&paths, Some(vec![target])).await?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Remove { space_id, target } => {
            commands::remove(&paths, &space_id, &target)?;
            commands::install_all(&paths, Some(vec![target])).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Upgrade { space_id, target } => {
            commands::upgrade(&paths, space_id.as_deref(), target.as_deref()).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Harnesses { json } => {
            commands::harnesses(json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Doctor { json } => {
            commands::doctor(&paths.home, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Repo { cmd } => {
            let mut reporter = CliReporter;
            match cmd {
                RepoCommands::Init => commands::repo::init(&paths.registry_dir)?,
                RepoCommands::Status => commands::repo::status(&paths.registry_dir)?,
                RepoCommands::Tags { space_id } => commands::repo::tags(&paths.registry_dir, space_id.as_deref())?,
                RepoCommands::Publish { space_id, version, remote } => commands::repo::publish(&paths.registry_dir, &space_id, &version, &remote, &mut reporter)?,
                RepoCommands::Gc { projects_root, dry_run, harnesses } => commands::repo::gc(&paths.home, projects_root.as_deref(), None, &harnesses, dry_run)?,
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Path { space_id } => {
            commands::path(&paths, &space_id)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Completions { shell } => {
            commands::completions(shell, &mut Cli::command());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_code_from(code: i32) -> ExitCode {
    if code == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(code.clamp(0, 255) as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_run_with_extra_args() {
        let cli = Cli::parse_from(["asp", "run", "default", "--harness", "codex", "--extra-args", "--foo", "bar"]);
        match cli.cmd {
            Commands::Run { harness, extra_args, .. } => {
                assert_eq!(harness, "codex");
                assert_eq!(extra_args, vec!["--foo".to_string(), "bar".to_string()]);
            }
            other => panic!("expected Run, got {other:?}"),
        }
    }

    #[test]
    fn cli_parses_build_requires_output() {
        let result = Cli::try_parse_from(["asp", "build", "default"]);
        assert!(result.is_err());
    }

    #[test]
    fn exit_code_from_maps_zero_to_success() {
        assert_eq!(exit_code_from(0), ExitCode::SUCCESS);
    }
}
