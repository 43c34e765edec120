use shim_core::logging;

mod cli;

use crate::cli::ShimCommand;

fn main() {
    // Initialize logging as early as possible.
    logging::init();

    let command = match ShimCommand::from_args(std::env::args_os().collect()) {
        Ok(c) => c,
        Err(e) => e.exit(),
    };
    match command.run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("claude-shim error: {:#}", err);
            std::process::exit(1);
        }
    }
}
