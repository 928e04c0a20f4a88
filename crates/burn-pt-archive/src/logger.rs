use log::{LevelFilter, SetLoggerError};
use log4rs::{
    Config,
    append::console::ConsoleAppender,
    config::{Appender, Root, runtime::ConfigErrors},
    encode::pattern::PatternEncoder,
};

/// Errors raised while installing the console logger.
#[derive(thiserror::Error, Debug)]
pub enum LoggerError {
    /// The logger configuration is invalid.
    #[error("Invalid logger configuration: {0}")]
    Config(#[from] ConfigErrors),

    /// A logger was already installed.
    #[error("Logger already set: {0}")]
    AlreadySet(#[from] SetLoggerError),
}

/// Installs a console logger at `level` and logs panics through it.
pub fn init_log(level: LevelFilter) -> Result<(), LoggerError> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("[{h({l})} - {f}:{L}] {m}{n}")))
        .build();
    let appender = Appender::builder().build("stdout", Box::new(stdout));

    log4rs::init_config(
        Config::builder()
            .appender(appender)
            .build(Root::builder().appender("stdout").build(level))?,
    )?;
    update_panic_hook();

    Ok(())
}

fn update_panic_hook() {
    let hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |info| {
        log::error!("PANIC => {info}");
        hook(info);
    }));
}
