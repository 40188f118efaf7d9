//! relbin-run - start the installed release binary
//!
//! Every argument is forwarded to the child untouched and the child's exit
//! code becomes ours.

use relbin_cli::cmd::run::{EXIT_CONFIG, launcher_root, run};
use relbin_cli::init_tracing;
use relbin_schema::PlatformTarget;

fn main() {
    init_tracing();

    let target = match PlatformTarget::current() {
        Ok(target) => target,
        Err(e) => {
            eprintln!("relbin-run: {e}");
            std::process::exit(EXIT_CONFIG);
        }
    };

    let args = std::env::args_os().skip(1).collect();
    std::process::exit(run(&launcher_root(), target, args));
}
