//! relbin-install - fetch and unpack the release binary for this host

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use relbin_cli::ui::{ConsoleReporter, format_error_chain};
use relbin_cli::{InstallCli, cmd, init_tracing};
use relbin_core::Reporter;
use relbin_schema::PlatformTarget;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = InstallCli::parse();
    let reporter = ConsoleReporter::new(cli.quiet);

    match try_main(&cli, &reporter).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            reporter.error(&format!("Installation failed: {}", format_error_chain(&e)));
            ExitCode::FAILURE
        }
    }
}

async fn try_main(cli: &InstallCli, reporter: &ConsoleReporter) -> Result<()> {
    // Resolve first so an unsupported host fails before anything touches disk
    let target = PlatformTarget::current()?;
    let root = cmd::install::install_root(cli)?;
    let options = cmd::install::options_from_cli(cli);

    cmd::install::install(&root, target, &options, reporter).await?;
    Ok(())
}
