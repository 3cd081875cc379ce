use clap::Parser;
use tally::cli::commands::Cli;
use tally::cli::handlers;
use tally::tracing_setup::init_tracing;

fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
