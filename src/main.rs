mod app;
mod config;
mod error;
mod rendering;
mod simulation;

use std::backtrace::Backtrace;
use std::process::ExitCode;

use config::{Config, USAGE};

/// Logs panics with a backtrace, then hands them to the previous hook so
/// they still reach stderr when logging is off.
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        log::error!("{info}\n{}", Backtrace::force_capture());
        previous(info);
    }));
}

fn main() -> ExitCode {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    install_panic_hook();

    let config = match Config::from_args(std::env::args().skip(1)) {
        Ok(config) => config.with_env(),
        Err(err) => {
            eprintln!("error: {err}\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    match app::run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    static REPORTED: AtomicBool = AtomicBool::new(false);

    #[test]
    fn panic_hook_keeps_previous_hook() {
        let default = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            REPORTED.store(true, Ordering::SeqCst);
            default(info);
        }));
        install_panic_hook();

        let result = std::panic::catch_unwind(|| panic!("boom"));

        // Back to the default hook
        let _ = std::panic::take_hook();
        assert!(result.is_err());
        assert!(REPORTED.load(Ordering::SeqCst));
    }
}
