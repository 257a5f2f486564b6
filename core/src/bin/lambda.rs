/// Lambda command line
///
/// Executes, parses and inspects lambda programs without a host application.
use lambda_core::cli;

fn main() {
    if let Err(e) = cli::run_cli() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
