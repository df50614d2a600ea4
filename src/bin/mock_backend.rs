//! Local backend for widget development.
//! Run with: cargo run --bin sidrex-mock-backend

use std::process::ExitCode;

use sidrex_widget::start_mock_backend;

fn main() -> ExitCode {
    start_mock_backend::run()
}
