//! Human-readable output for the runner's subcommands.

use lightproxy_install::{BranchOutcome, InstallConfig, InstallReport, InstallStatus};

fn outcome_label(outcome: BranchOutcome) -> &'static str {
    match outcome {
        BranchOutcome::AlreadyInstalled => "already installed",
        BranchOutcome::Installed => "installed",
    }
}

fn flag_label(installed: bool) -> &'static str {
    if installed {
        "installed"
    } else {
        "missing"
    }
}

/// Print the outcome of `lightproxy-install install`.
pub fn install_report(report: &InstallReport, config: &InstallConfig) {
    if report.was_noop() {
        println!("Everything is already installed.");
    } else {
        println!("Install complete.");
    }
    println!("  Root CA:      {}", outcome_label(report.certificate));
    if config.platform.is_macos() {
        println!("  Proxy helper: {}", outcome_label(report.helper));
    }
    println!("  Certificates: {}", config.cert_dir_path.display());
}

/// Print the two flags for `lightproxy-install status`.
pub fn install_status(status: &InstallStatus, config: &InstallConfig) {
    println!("LightProxy Install Status");
    println!("  Platform:     {}", config.platform);
    println!(
        "  Root CA:      {} ({})",
        flag_label(status.cert_installed),
        config.cert_key_path.display()
    );
    if config.platform.is_macos() {
        println!(
            "  Proxy helper: {} ({})",
            flag_label(status.helper_installed),
            config.helper_dest_path.display()
        );
    }
}
