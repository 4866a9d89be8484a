//! Logging setup: crate-scoped level filtering with a role-tagged format.

use colored::Colorize;
use env_logger::Builder;
use log::{Level, LevelFilter};
use std::io::Write;

/// Initialize the global logger. `verbose` raises this crate to debug;
/// dependency crates stay at warn regardless, so worker chatter never
/// drowns in third-party output.
pub fn setup_logging(verbose: bool) {
    let ours = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::from_default_env()
        .filter_level(LevelFilter::Warn)
        .filter_module(env!("CARGO_PKG_NAME"), ours)
        .format(|buf, record| {
            let tag = role_tag();
            match record.level() {
                Level::Error => {
                    writeln!(buf, "[{} {}] {}", tag.cyan(), "ERROR".red(), record.args())
                }
                Level::Warn => {
                    writeln!(buf, "[{} {}] {}", tag.cyan(), "WARN".yellow(), record.args())
                }
                _ => writeln!(buf, "[{}] {}", tag.cyan(), record.args()),
            }
        })
        .init();
}

/// Message origin: the crate name, plus the emitting thread when it carries a
/// role name. Worker threads are named for their rank, so a line from rank 3
/// reads `[parmatch/worker-3] ...`; coordinator output stays bare.
fn role_tag() -> String {
    let name = env!("CARGO_PKG_NAME");
    match std::thread::current().name() {
        Some(thread) if thread != "main" => format!("{name}/{thread}"),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::role_tag;

    #[test]
    fn role_tag_includes_worker_thread_name() {
        let tag = std::thread::Builder::new()
            .name("worker-7".into())
            .spawn(role_tag)
            .unwrap()
            .join()
            .unwrap();
        assert_eq!(tag, format!("{}/worker-7", env!("CARGO_PKG_NAME")));
    }

    #[test]
    fn role_tag_is_bare_crate_name_off_role_threads() {
        // Unnamed threads (and the main thread) get no role suffix.
        let tag = std::thread::spawn(role_tag).join().unwrap();
        assert_eq!(tag, env!("CARGO_PKG_NAME"));
    }
}
