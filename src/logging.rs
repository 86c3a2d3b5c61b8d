//! Tracing subscriber setup shared by the binaries.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CRATES: [&str; 5] = [
    "diagram_chat",
    "chat_protocol",
    "openrouter_api",
    "chat_proxy",
    "chat_client",
];

/// Default filter directives: crate logs at `info` (or `debug` when verbose), dependencies at
/// `warn`.
pub fn default_directives(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    std::iter::once("warn".to_string())
        .chain(CRATES.iter().map(|krate| format!("{krate}={level}")))
        .collect::<Vec<_>>()
        .join(",")
}

fn filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)))
}

/// Installs the global subscriber. With `log_file` set, events go to that file (appended)
/// instead of stderr so they do not interleave with an inline terminal view.
///
/// A subscriber installed earlier is left in place.
pub fn initialize_logging(verbose: bool, log_file: Option<&Path>) -> io::Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file: File = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
        }
        None => None,
    };
    let stderr_layer = file_layer
        .is_none()
        .then(|| tracing_subscriber::fmt::layer().with_writer(io::stderr));

    let _ = tracing_subscriber::registry()
        .with(filter(verbose))
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{default_directives, initialize_logging};

    #[test]
    fn verbose_raises_crate_levels() {
        assert!(default_directives(false).contains("diagram_chat=info"));
        assert!(default_directives(true).contains("chat_proxy=debug"));
        assert!(default_directives(true).starts_with("warn,"));
    }

    #[test]
    fn file_target_is_created() {
        let dir = std::env::temp_dir().join(format!("diagram-chat-log-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("chat.log");

        initialize_logging(false, Some(&path)).expect("logging init");
        assert!(path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
