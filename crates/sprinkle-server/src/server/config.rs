use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use sprinkle::{MAX_TOKEN_ATTEMPTS, Policy, Window};

/// Runtime configuration for the `sprinkle-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file is loaded first when present).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "sprinkle-server",
    version,
    about = "Hosts the spread-and-claim engine and archives expired allocations"
)]
pub struct CliArgs {
    /// How long after creation an allocation accepts claims.
    ///
    /// A number followed by a unit: `s`, `m`, `h`, `d`, `M` (30 days) or `y`
    /// (365 days), e.g. `10m`.
    ///
    /// Environment variable: `CLAIM_WINDOW`
    #[arg(long, env = "CLAIM_WINDOW", default_value = "10m")]
    pub claim_window: Window,

    /// How long after creation the originator can audit an allocation. Past
    /// it the allocation is archived by the next sweep.
    ///
    /// Same format as `CLAIM_WINDOW`.
    ///
    /// Environment variable: `VISIBILITY_WINDOW`
    #[arg(long, env = "VISIBILITY_WINDOW", default_value = "7d")]
    pub visibility_window: Window,

    /// Seconds between two archival sweeps.
    ///
    /// Environment variable: `SWEEP_INTERVAL_SECS`
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value_t = 60)]
    pub sweep_interval_secs: u64,

    /// Caps each random share draw at this fraction of what is still
    /// drawable, so early recipients cannot take almost everything. `0`
    /// disables the cap.
    ///
    /// Environment variable: `DAMPENING`
    #[arg(long, env = "DAMPENING", default_value_t = 0.7)]
    pub dampening: f64,

    /// Token candidates tried before allocation creation gives up.
    ///
    /// Environment variable: `MAX_TOKEN_ATTEMPTS`
    #[arg(long, env = "MAX_TOKEN_ATTEMPTS", default_value_t = MAX_TOKEN_ATTEMPTS)]
    pub max_token_attempts: usize,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub policy: Policy,
    pub sweep_interval: Duration,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.sweep_interval_secs == 0 {
            bail!("SWEEP_INTERVAL_SECS must be greater than 0");
        }

        if !(0.0..1.0).contains(&args.dampening) {
            bail!(
                "DAMPENING ({}) must be in [0, 1), use 0 to disable it",
                args.dampening
            );
        }

        if args.max_token_attempts == 0 {
            bail!("MAX_TOKEN_ATTEMPTS must be greater than 0");
        }

        let dampening = (args.dampening > 0.0).then_some(args.dampening);

        Ok(Self {
            policy: Policy {
                claim_window: args.claim_window,
                visibility_window: args.visibility_window,
                dampening,
                max_token_attempts: args.max_token_attempts,
            },
            sweep_interval: Duration::from_secs(args.sweep_interval_secs),
        })
    }
}
