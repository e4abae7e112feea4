use env_logger::{Builder, Target};
use log::{Level, LevelFilter, SetLoggerError};
use std::env;
use std::io::Write;

pub fn init_logging() -> Result<(), SetLoggerError> {
    let env = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let log_level = match env.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };

    let mut builder = Builder::from_default_env();

    // Customize format for better readability
    builder.format(|buf, record| {
        let timestamp = buf.timestamp();
        let target = record.target();
        let file = record.file().unwrap_or("unknown");
        let line = record.line().unwrap_or(0);

        match record.level() {
            Level::Info => {
                writeln!(buf, "{} [INFO] [{}]: {}", timestamp, target, record.args())
            }
            level => {
                writeln!(
                    buf,
                    "{} [{}] [{}:{}] {}: {}",
                    timestamp,
                    level,
                    file,
                    line,
                    target,
                    record.args()
                )
            }
        }
    });

    // The HTTP stack is chatty at info level
    builder.filter_module("reqwest", LevelFilter::Warn);
    builder.filter_module("hyper", LevelFilter::Warn);

    builder
        .filter_level(log_level)
        .target(Target::Stdout)
        .try_init()
}
