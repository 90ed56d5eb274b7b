use std::process::ExitCode;

fn main() -> ExitCode {
    csv_auditor_lib::app::run()
}
