use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;

/// Initialize the logging system with timestamp, level, and message formatting.
///
/// Logs are printed to stderr at `level`; `RUST_LOG` style filters in `filters` override it
/// per module (e.g. `"reqwest=warn"`).
/// Format: `[HH:MM:SS] [LEVEL] message`
pub fn init_logger(level: LevelFilter, filters: Option<&str>) {
    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] [{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(level);

    if let Some(filters) = filters {
        builder.parse_filters(filters);
    }

    // Repeated initialization is ignored.
    let _ = builder.try_init();
}
