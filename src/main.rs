use std::process::ExitCode;

fn main() -> ExitCode {
    match flagscan::run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("flagscan: {err:#}");
            ExitCode::FAILURE
        }
    }
}
