use colored::*;

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        if e.is_refusal() {
            eprintln!("{}", e.to_string().yellow());
        } else {
            eprintln!("{} {}", "Error:".red(), e);
        }
        std::process::exit(1);
    }
}
