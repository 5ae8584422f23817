//! Shared rendering helpers so every command that can emit `--json`
//! prints the exact same document it would otherwise describe in text.

use asp_types::Warning;

pub fn print_warnings(warnings: &[Warning]) {
    if warnings.is_empty() {
        println!("no warnings");
        return;
    }
    for w in warnings {
        let subject = w.space_key.as_ref().map(|k| format!(" [{k}]")).unwrap_or_default();
        println!("{} {}{}: {}", w.code, severity_label(w.severity), subject, w.message);
    }
}

fn severity_label(severity: asp_types::Severity) -> &'static str {
    match severity {
        asp_types::Severity::Error => "error",
        asp_types::Severity::Warning => "warning",
        asp_types::Severity::Info => "info",
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
