//! `asp-lock.json`: document model, validation, env-hash computation,
//! update policy, and the advisory file lock guarding concurrent writers.

pub mod assemble;
pub mod envhash;
pub mod filelock;
pub mod model;
pub mod update;

pub use assemble::{assemble_target, locked_space_from_resolved};
pub use envhash::{compute_env_hash, compute_harness_env_hash, env_hash_from_locked_spaces};
pub use filelock::{acquire as acquire_lock, LockGuard, LockHolder, LockTimeoutError};
pub use model::{
    from_json_str, to_json_string, validate, HarnessEnv, LockDocument, LockValidationError,
    LockedDeps, LockedPlugin, LockedSpace, LockedTarget, RegistryRef, ResolvedFromLock,
    LOCKFILE_VERSION, RESOLVER_VERSION,
};
pub use update::{pinned_spaces_for_install, remove_space_refs, RemoveError};
