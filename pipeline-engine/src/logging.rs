use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::rolling_file::policy::compound::roll::fixed_window::FixedWindowRoller;
use log4rs::append::rolling_file::policy::compound::trigger::size::SizeTrigger;
use log4rs::append::rolling_file::policy::compound::CompoundPolicy;
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Config;

/// Initialize logging for a binary: a console appender plus a size-rolled file appender. Built
/// programmatically here (rather than loaded from a file) so every binary carries the same
/// defaults without shipping a config file alongside it. Called exactly once, at the top of
/// `main`; library code never initializes logging itself.
pub fn init(log_file: &str) {
    let pattern = "{d(%Y-%m-%d %H:%M:%S)} {l} [{T}] {t} - {m}{n}";

    let console = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let roller = FixedWindowRoller::builder()
        .build(&format!("{log_file}.{{}}.gz"), 5)
        .expect("fixed window roller pattern is well-formed");
    let trigger = SizeTrigger::new(10 * 1024 * 1024);
    let policy = CompoundPolicy::new(Box::new(trigger), Box::new(roller));
    let file = RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build(log_file, Box::new(policy))
        .expect("log file path is writable");

    let config = Config::builder()
        .appender(Appender::builder().build("console", Box::new(console)))
        .appender(Appender::builder().build("file", Box::new(file)))
        .build(
            Root::builder()
                .appender("console")
                .appender("file")
                .build(LevelFilter::Info),
        )
        .expect("log4rs config is well-formed");

    if let Err(error) = log4rs::init_config(config) {
        eprintln!("Could not initialize logging: {error}");
    }
}
