use std::process::ExitCode;

fn main() -> ExitCode {
    match geobridge_cli::runner::main(std::env::args().collect()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
