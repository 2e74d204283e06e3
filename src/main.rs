use clap::Parser;
use trashday::cli;
use trashday::utils::suggestion_for;
use tracing::Level;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let filter_level = if verbose { Level::DEBUG } else { Level::INFO };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(filter_level.into()))
        .with_writer(std::io::stderr)
        .with_target(true) // Show module path
        .with_level(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::time())
        .init();
}

fn main() {
    // Parse CLI early to check verbose flag before full initialization
    match cli::Cli::try_parse() {
        Ok(cli) => {
            init_logging(cli.verbose);

            tracing::debug!("Verbose mode enabled");
            tracing::debug!("Starting trashday v{}", env!("CARGO_PKG_VERSION"));

            if let Err(e) = cli::run(cli) {
                eprintln!("Error: {:#}", e);
                if let Some(suggestion) = suggestion_for(&e) {
                    eprintln!("Suggestion: {}", suggestion);
                }
                std::process::exit(1);
            }
        }
        Err(e) => {
            use clap::error::ErrorKind;

            match e.kind() {
                ErrorKind::DisplayVersion | ErrorKind::DisplayHelp => {
                    e.print().ok();
                    std::process::exit(0);
                }
                ErrorKind::InvalidSubcommand => {
                    let error_message = e.to_string();
                    let cmd = extract_command_from_error(&error_message);
                    eprintln!("error: unknown command: {}", cmd);
                    eprintln!("\nValid commands are: serve, ask, init, version, help");
                    std::process::exit(1);
                }
                _ => {
                    e.print().ok();
                    std::process::exit(2);
                }
            }
        }
    }
}

fn extract_command_from_error(error_msg: &str) -> &str {
    // "error: unrecognized subcommand 'foo'"
    error_msg
        .split('\'')
        .nth(1)
        .unwrap_or("unknown")
}
