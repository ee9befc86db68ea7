use std::{fs::File, io::Write, path::Path};

use env_logger::{Builder, Target, WriteStyle, fmt::Formatter};
use log::Record;

use crate::{
    Error, Result,
    options::{LogFormat, SolverOptions},
};

/// How one record is rendered: `[millis ]LEVEL[ [target]] message`.
#[derive(Clone, Copy, Debug)]
struct LineStyle {
    format: LogFormat,
    timestamp: bool,
}

impl LineStyle {
    fn prefix(&self, record: &Record<'_>) -> String {
        let level = record.level().as_str();
        match self.format {
            LogFormat::Compact => format!("{level:<5}"),
            LogFormat::Pretty => format!("{level:<5} [{}]", record.target()),
        }
    }

    fn write(&self, buf: &mut Formatter, record: &Record<'_>) -> std::io::Result<()> {
        if self.timestamp {
            write!(buf, "{} ", buf.timestamp_millis())?;
        }
        writeln!(buf, "{} {}", self.prefix(record), record.args())
    }
}

fn log_target(path: Option<&Path>) -> Result<Target> {
    let Some(path) = path else {
        return Ok(Target::Stderr);
    };
    File::create(path)
        .map(|file| Target::Pipe(Box::new(file)))
        .map_err(|e| Error::other(format!("cannot create log file {}: {e}", path.display())))
}

/// Installs the global `env_logger` backend described by `options`.
pub fn init_logger(options: &SolverOptions) -> Result<()> {
    let style = LineStyle {
        format: options.log_format,
        timestamp: options.log_timestamp,
    };

    Builder::new()
        .filter_level(options.log_level.to_filter())
        .write_style(WriteStyle::Never)
        .target(log_target(options.log_output_path())?)
        .format(move |buf, record| style.write(buf, record))
        .try_init()
        .map_err(|e| Error::other(format!("logger already installed: {e}")))
}
