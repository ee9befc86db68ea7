use std::{env, path::Path};

use log::LevelFilter;
use vtsp_derive::{CliOptions, CliValue, KvDisplay};

use crate::{Error, Result, solve::DEFAULT_MAX_POINTS};

/// Runtime options for the `vtsp` driver and the reference kernels.
#[derive(Clone, Debug, CliOptions, KvDisplay)]
pub struct SolverOptions {
    /// Optional TSPLIB problem path. Empty means stdin.
    #[cli(long = "input")]
    pub input: String,
    /// Optional TSPLIB tour path. Empty means stdout.
    #[cli(long = "output")]
    pub output: String,
    /// Largest accepted point count.
    #[cli(long = "max-points")]
    pub max_points: usize,
    /// Extra mesh nodes allowed per input point during refinement.
    #[cli(long = "steiner-ratio")]
    pub steiner_ratio: f64,
    /// Split triangles larger than this while the node budget allows.
    #[cli(long = "max-triangle-area")]
    pub max_triangle_area: Option<f64>,
    /// Diffusion coefficient `k` of `-k Δu = f`.
    #[cli(long = "diffusion")]
    pub diffusion: f64,
    /// Uniform source term `f` of `-k Δu = f`.
    #[cli(long = "heat-source")]
    pub heat_source: f64,
    /// Value the tour nodes are pinned to.
    #[cli(long = "boundary-value")]
    pub boundary_value: f64,
    /// Relative residual at which conjugate gradient stops.
    #[cli(long = "cg-tolerance")]
    pub cg_tolerance: f64,
    /// Conjugate gradient iteration cap; 0 picks `10 * nodes + 100`.
    #[cli(long = "cg-max-iterations")]
    pub cg_max_iterations: usize,
    /// Path cost model between two mesh nodes.
    #[cli(
        long = "integral",
        parse_with = "IntegralKind::parse",
        value = "<segment|geodesic>"
    )]
    pub integral: IntegralKind,
    /// Weight of the field in the cost density `1 + w * u`.
    #[cli(long = "field-weight")]
    pub field_weight: f64,
    /// Directory for diagnostic PNG snapshots. Empty disables drawing.
    #[cli(long = "draw-dir")]
    pub draw_dir: String,
    /// Snapshot every n-th insertion.
    #[cli(long = "draw-every")]
    pub draw_every: usize,
    #[cli(long = "draw-width")]
    pub draw_width: u32,
    #[cli(long = "draw-height")]
    pub draw_height: u32,
    /// Structured logging level.
    #[cli(
        long = "log-level",
        parse_with = "LogLevel::parse",
        value = "<error|warn|info|debug|trace|off>"
    )]
    pub log_level: LogLevel,
    /// Logging output format.
    #[cli(
        long = "log-format",
        parse_with = "LogFormat::parse",
        value = "<compact|pretty>"
    )]
    pub log_format: LogFormat,
    /// Include timestamps in log lines.
    #[cli(long = "log-timestamp", flag)]
    pub log_timestamp: bool,
    /// Optional output file path for logs. Empty means stderr.
    #[cli(long = "log-output")]
    pub log_output: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, CliValue)]
#[cli_value(option = "log-level")]
pub enum LogLevel {
    Error,
    #[cli(alias = "warning")]
    Warn,
    Info,
    Debug,
    Trace,
    Off,
}

impl LogLevel {
    pub fn to_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
            Self::Off => LevelFilter::Off,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, CliValue)]
#[cli_value(option = "log-format")]
pub enum LogFormat {
    Compact,
    Pretty,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, CliValue)]
#[cli_value(option = "integral")]
pub enum IntegralKind {
    /// Straight segment between the two nodes.
    Segment,
    /// Shortest path along mesh edges.
    #[cli(alias = "mesh")]
    Geodesic,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            input: String::new(),
            output: String::new(),
            max_points: DEFAULT_MAX_POINTS,
            steiner_ratio: 0.5,
            max_triangle_area: None,
            diffusion: 1.0,
            heat_source: 1.0,
            boundary_value: 0.0,
            cg_tolerance: 1e-10,
            cg_max_iterations: 0,
            integral: IntegralKind::Segment,
            field_weight: 1.0,
            draw_dir: String::new(),
            draw_every: 1,
            draw_width: 800,
            draw_height: 800,
            log_level: LogLevel::Warn,
            log_format: LogFormat::Compact,
            log_timestamp: true,
            log_output: String::new(),
        }
    }
}

impl SolverOptions {
    pub fn from_args() -> Result<Self> {
        Self::parse_from_iter(env::args().skip(1))
    }

    fn parse_from_iter<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = Self::default();
        let mut args = args
            .into_iter()
            .map(|arg| arg.as_ref().to_owned())
            .peekable();

        while let Some(arg) = args.next() {
            let raw_name = match arg.as_str() {
                "--help" | "-h" => return Err(Error::invalid_input(Self::usage())),
                "--" => return Err(usage_error(format!("Invalid option name: {arg}"))),
                _ => arg
                    .strip_prefix("--")
                    .ok_or_else(|| usage_error(format!("Unexpected argument: {arg}")))?,
            };

            let (name, value) = Self::split_arg(raw_name, &mut args);
            if !options.apply_cli_option(&name, value)? {
                return Err(usage_error(format!("Unknown option: --{name}")));
            }
        }

        options.validate()?;
        Ok(options)
    }

    fn validate(&self) -> Result<()> {
        if self.max_points < 3 {
            return Err(Error::invalid_input("--max-points must be at least 3"));
        }
        if !self.steiner_ratio.is_finite() || self.steiner_ratio < 0.0 {
            return Err(Error::invalid_input(
                "--steiner-ratio must be a finite value >= 0",
            ));
        }
        if let Some(area) = self.max_triangle_area
            && !(area.is_finite() && area > 0.0)
        {
            return Err(Error::invalid_input("--max-triangle-area must be > 0"));
        }
        if !(self.diffusion.is_finite() && self.diffusion > 0.0) {
            return Err(Error::invalid_input("--diffusion must be > 0"));
        }
        if !self.heat_source.is_finite() || !self.boundary_value.is_finite() {
            return Err(Error::invalid_input(
                "--heat-source and --boundary-value must be finite",
            ));
        }
        if !(self.cg_tolerance.is_finite() && self.cg_tolerance > 0.0) {
            return Err(Error::invalid_input("--cg-tolerance must be > 0"));
        }
        if !self.field_weight.is_finite() || self.field_weight < 0.0 {
            return Err(Error::invalid_input("--field-weight must be >= 0"));
        }
        if self.draw_width == 0 || self.draw_height == 0 {
            return Err(Error::invalid_input(
                "--draw-width and --draw-height must be > 0",
            ));
        }
        Ok(())
    }

    pub fn usage() -> String {
        format!(
            concat!(
                "Usage:\n",
                "  vtsp [options] [--input problem.tsp]\n",
                "  vtsp [options] < problem.tsp\n\n",
                "Options:\n",
                "{}",
                "  --help\n",
                "\n",
                "Examples:\n",
                "  vtsp --input berlin52.tsp --output berlin52.tour\n",
                "  vtsp --log-level=info --integral=geodesic < berlin52.tsp\n",
                "  vtsp --max-triangle-area=50 --steiner-ratio=1 --input berlin52.tsp\n",
                "  vtsp --draw-dir=frames --draw-every=5 --input berlin52.tsp\n",
            ),
            Self::CLI_USAGE
        )
    }

    pub fn log_output_path(&self) -> Option<&Path> {
        optional_path(&self.log_output)
    }

    pub fn output_path(&self) -> Option<&Path> {
        optional_path(&self.output)
    }

    pub fn input_path(&self) -> Option<&Path> {
        optional_path(&self.input)
    }

    /// Drawing is enabled by naming a directory.
    pub fn draw_dir_path(&self) -> Option<&Path> {
        optional_path(&self.draw_dir)
    }
}

fn usage_error(message: String) -> Error {
    Error::invalid_input(format!("{message}\n\n{}", SolverOptions::usage()))
}

/// `""` and `"-"` select the standard stream.
fn optional_path(raw: &str) -> Option<&Path> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "-" {
        None
    } else {
        Some(Path::new(raw))
    }
}
