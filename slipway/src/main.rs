use clap::Parser;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // clap exits with 2 on usage errors by default; every fatal condition here exits with 1.
    let cli = slipway::cli::Cli::try_parse().unwrap_or_else(|error| {
        let _ = error.print();
        std::process::exit(slipway::cli::parse_error_exit_code(&error));
    });

    if let Err(error) = cli.run() {
        const BOLD_RED: &str = "\x1b[1;31m";
        const BOLD: &str = "\x1b[1m";
        const RESET: &str = "\x1b[0m";
        eprintln!("{BOLD_RED}error{RESET}{BOLD}:{RESET} {error}");
        std::process::exit(1);
    }
}
