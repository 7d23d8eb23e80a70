//! Command line pieces shared by the epicwash binaries.

use clap::{Args, ValueEnum};

use crate::catalog::Delimiter;
use crate::sky::DEFAULT_MATCHING_RADIUS_ARCSEC;

/// Parse a matching radius in arcseconds, rejecting negative or non-finite values
pub fn parse_matching_radius(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid matching radius: {s}"))?;
    if !value.is_finite() || value < 0.0 {
        return Err("Matching radius must be a non-negative number of arcseconds".to_string());
    }
    Ok(value)
}

/// Field separator choices on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DelimiterArg {
    /// `|`, the DMC format
    Pipe,
    /// `,`
    Comma,
}

impl From<DelimiterArg> for Delimiter {
    fn from(arg: DelimiterArg) -> Self {
        match arg {
            DelimiterArg::Pipe => Delimiter::Pipe,
            DelimiterArg::Comma => Delimiter::Comma,
        }
    }
}

/// Matching tolerance argument
#[derive(Args, Debug, Clone)]
pub struct MatchingArgs {
    /// Cross-matching distance in arcsec
    #[arg(short = 'm', long, value_parser = parse_matching_radius, default_value_t = DEFAULT_MATCHING_RADIUS_ARCSEC)]
    pub matching_radius: f64,
}

/// Logging verbosity
#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    /// Log debug detail (index statistics, per-stage counts)
    #[arg(short, long)]
    pub verbose: bool,
}

impl LoggingArgs {
    /// Initialise env_logger at `info`, or `debug` with `--verbose`; `RUST_LOG` still wins.
    pub fn init(&self) {
        let level = if self.verbose { "debug" } else { "info" };
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
            .try_init();
    }
}
