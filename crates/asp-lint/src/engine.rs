//! Runs every rule over a `LintContext` and returns one stably ordered
//! result. Never fails: an empty vec means a clean lint, not "nothing
//! ran".

use asp_types::Warning;

use crate::context::LintContext;
use crate::rules;

pub fn run(ctx: &LintContext) -> Vec<Warning> {
    let mut warnings = Vec::new();
    warnings.extend(rules::w101_lock_absent(ctx));
    warnings.extend(rules::w201_command_name_collisions(ctx));
    warnings.extend(rules::w202_reserved_name(ctx));
    warnings.extend(rules::w203_hook_path_traversal(ctx));
    warnings.extend(rules::w204_malformed_or_missing_hooks_config(ctx));
    warnings.extend(rules::w205_duplicate_plugin_name(ctx));
    warnings.extend(rules::w206_hook_script_not_executable(ctx));
    warnings.extend(rules::w207_component_dir_inside_plugin_dir(ctx));
    warnings.extend(rules::w301_harness_cannot_block_hooks(ctx));
    warnings.sort_by(|a, b| a.code.cmp(&b.code).then_with(|| a.message.cmp(&b.message)));
    warnings
}
