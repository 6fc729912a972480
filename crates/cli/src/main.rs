use std::process::ExitCode;

fn main() -> ExitCode {
    aimana_cli::run()
}
