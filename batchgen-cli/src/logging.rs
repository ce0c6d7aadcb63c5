use env_logger::Env;

/// Initialize stderr logging.
///
/// Defaults to `warn`, or `debug` with `--debug`; `RUST_LOG` overrides both.
pub fn init(debug: bool) {
    let level = if debug { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init(false);
        init(true);
    }
}
