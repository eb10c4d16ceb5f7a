use super::*;

pub(crate) fn print_human_report(report: &Report) {
    println!("Root: {}", report.root);
    println!("\nSummary:");
    println!("  - Changed files: {}", report.summary.changed_files);
    println!("  - Scanned files: {}", report.summary.scanned_files);
    println!("  - Flags discovered: {}", report.summary.flags_discovered);
    println!("  - Registered: {}", report.summary.registered_count);
    println!("  - Unregistered: {}", report.summary.unregistered_count);
    println!("  - Orphaned: {}", report.summary.orphaned_count);

    if !report.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &report.warnings {
            println!("  - {warning}");
        }
    }

    if report.unregistered_flags.is_empty() {
        println!("\nAll referenced feature flags are registered.");
    } else {
        println!("\nUnregistered flags ({}):", report.unregistered_flags.len());
        for item in &report.unregistered_flags {
            println!("  - {}", item.flag);
            for file in &item.files {
                println!("      {file}");
            }
        }
        println!("\nRegister these flags in the registry, or remove the references.");
    }

    if !report.orphaned_flags.is_empty() {
        println!("\nOrphaned flags ({}):", report.orphaned_flags.len());
        for flag in &report.orphaned_flags {
            println!("  - {flag}");
        }
        println!("\nThese flags stay registered but no reference to them remains outside the");
        println!("registry. If the removal is intentional, delete them from the registry too.");
        println!("Dynamic flag composition can evade this search, so this is a warning only.");
    }
}
