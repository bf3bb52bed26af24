use chrono::offset::Local;
use colored::*;
use core::fmt::Arguments;
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Metadata, Record};

// Log lines go to stderr, stdout is left to command output (e.g. created
// record ids).
pub struct Logger;

impl Logger {
    fn tag(level: Level) -> ColoredString {
        let name = level.to_string();
        match level {
            Level::Error => name.red().bold(),
            Level::Warn => name.yellow().bold(),
            Level::Info => name.green().bold(),
            Level::Debug => name.cyan().bold(),
            Level::Trace => name.white().bold(),
        }
    }

    pub fn println(level: Level, args: &Arguments) {
        eprintln!(
            "{}{}{}{}{}{} {}",
            "[".blue().bold(),
            Self::tag(level),
            "]".blue().bold(),
            "[".blue().bold(),
            Local::now().format("%T").to_string().magenta(),
            "]".blue().bold(),
            args
        );
    }

    pub fn error(msg: &str) {
        Self::println(Level::Error, &format_args!("{}", msg));
    }

    pub fn level(verbose: bool) -> LevelFilter {
        if verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            Logger::println(record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

pub fn progress_bar(total: u64, prefix: &str) -> ProgressBar {
    let progress_bar = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{prefix:.bold.dim} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>7}/{len:7} ({eta})",
        )
        .progress_chars("#>-");
    progress_bar.set_style(style);
    progress_bar.set_prefix(prefix);
    progress_bar
}
