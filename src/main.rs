//! `flowfield [settings.json]`: open the interactive viewer.

use std::process::ExitCode;

use flowfield::{logging, viewer, Settings};

fn main() -> ExitCode {
    let _logger = match logging::setup() {
        Ok(handle) => Some(handle),
        Err(err) => {
            eprintln!("logging disabled: {err}");
            None
        }
    };

    let settings = match std::env::args().nth(1) {
        Some(path) => match Settings::load(&path) {
            Ok(settings) => settings,
            Err(err) => {
                log::error!("{path}: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => Settings::default(),
    };

    match viewer::run(settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
