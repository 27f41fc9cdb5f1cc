use env_logger::{Builder, Env};

const LOG_ENV: &str = "CHESS_LOG";
const DEFAULT_FILTER: &str = "warn";

fn builder() -> Builder {
    Builder::from_env(Env::new().filter_or(LOG_ENV, DEFAULT_FILTER))
}

/// Install the process logger. The filter comes from `CHESS_LOG`
/// (e.g. `CHESS_LOG=debug` or `CHESS_LOG=chess_tabulate::chess::parser=trace`).
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn init() {
    let _ = builder().format_timestamp_millis().try_init();
}
