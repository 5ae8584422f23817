//! Install/build/run/gc orchestrator (C12): the one crate that knows how
//! `asp-closure`, `asp-store`, `asp-lock`, `asp-materialize`, `asp-harness`,
//! and `asp-lint` compose into the four user-facing operations. The CLI
//! crate is a thin collaborator on top of this one: it classifies raw
//! argv into calls here and renders the results, nothing more.

pub mod build;
pub mod cancel;
pub mod concurrency;
pub mod error;
pub mod gc;
pub mod install;
pub mod project;
pub mod run;

pub use build::{build, BuildInput, BuildOutcome};
pub use cancel::CancellationToken;
pub use concurrency::{default_concurrency, parallel_map};
pub use error::CoreError;
pub use gc::{discover_project_locks, gc, GcInput};
pub use install::{install, read_existing_lock, InstallInput};
pub use project::{project_lock_path, read_project_manifest, PROJECT_MANIFEST_FILE};
pub use run::{run_dev, run_global, run_project, RunContext, RunOutcome, GLOBAL_TARGET_NAME};

pub use asp_store::GcReport;
