use anyhow::{Context, bail};
use clap::{ArgAction, Parser};
use core::time::Duration;
use ordinal::{
    DEFAULT_CONFIRM_DEADLINE, DEFAULT_INCREMENT_STEP, DEFAULT_INDEX_PAD, DEFAULT_MAX_INDEX,
    DEFAULT_MIN_INDEX, DEFAULT_RECLAIM_KEYS, DEFAULT_REQUIRE_CONFIRM, EngineOptions,
    IncrementPolicy, PolicyDefaults, ReissuePolicy, SequenceConfigPatch, resolve,
};
use std::path::PathBuf;

/// Runtime configuration for the `ordinal-server` binary.
///
/// Every value can be given as a CLI flag or an environment variable (a
/// `.env` file in the working directory is loaded first). The `DEFAULT_*`
/// values fill in whatever a client leaves out when initializing a sequence;
/// they never change sequences that already exist.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "ordinal-server",
    version,
    about = "An HTTP service issuing formatted identifiers from named sequences"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:18652"))]
    pub server_addr: String,

    /// Directory holding one JSON record per sequence. When unset, sequences
    /// live in memory and are lost on exit.
    ///
    /// Environment variable: `DATA_DIR`
    #[arg(long, env = "DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// How long a request waits for a busy sequence before failing with 503.
    ///
    /// Environment variable: `LOCK_TIMEOUT_MS`
    #[arg(long, env = "LOCK_TIMEOUT_MS", default_value_t = 5_000)]
    pub lock_timeout_ms: u64,

    /// Upper bound on handling one request. Must exceed `LOCK_TIMEOUT_MS`.
    /// An allocation still in flight when it fires is abandoned unwritten.
    ///
    /// Environment variable: `REQUEST_TIMEOUT_MS`
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value_t = 10_000)]
    pub request_timeout_ms: u64,

    /// Period of the background sweep reaping expired reservations across
    /// all sequences. `0` disables it; expiry then only happens lazily on
    /// the next request touching a sequence.
    ///
    /// Environment variable: `SWEEP_INTERVAL_SECS`
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value_t = 60)]
    pub sweep_interval_secs: u64,

    /// Environment variable: `DEFAULT_RECLAIM_KEYS`
    #[arg(long, env = "DEFAULT_RECLAIM_KEYS", default_value_t = DEFAULT_RECLAIM_KEYS, action = ArgAction::Set)]
    pub default_reclaim_keys: bool,

    /// One of `FIFO`, `LIFO`, `Lowest-First`, `Highest-First`, `Random`.
    ///
    /// Environment variable: `DEFAULT_REISSUE_POLICY`
    #[arg(long, env = "DEFAULT_REISSUE_POLICY", default_value = "FIFO")]
    pub default_reissue_policy: String,

    /// Zero-pad template; identifiers are padded to its length.
    ///
    /// Environment variable: `DEFAULT_INDEX_PAD`
    #[arg(long, env = "DEFAULT_INDEX_PAD", default_value = DEFAULT_INDEX_PAD)]
    pub default_index_pad: String,

    /// Environment variable: `DEFAULT_MIN_INDEX`
    #[arg(long, env = "DEFAULT_MIN_INDEX", default_value_t = DEFAULT_MIN_INDEX, allow_negative_numbers = true)]
    pub default_min_index: i64,

    /// `0` means unbounded.
    ///
    /// Environment variable: `DEFAULT_MAX_INDEX`
    #[arg(long, env = "DEFAULT_MAX_INDEX", default_value_t = DEFAULT_MAX_INDEX)]
    pub default_max_index: i64,

    /// One of `Next`, `Next-Even`, `Next-Odd`, `Step`.
    ///
    /// Environment variable: `DEFAULT_INCREMENT_POLICY`
    #[arg(long, env = "DEFAULT_INCREMENT_POLICY", default_value = "Next")]
    pub default_increment_policy: String,

    /// Environment variable: `DEFAULT_INCREMENT_STEP`
    #[arg(long, env = "DEFAULT_INCREMENT_STEP", default_value_t = DEFAULT_INCREMENT_STEP)]
    pub default_increment_step: i64,

    /// Environment variable: `DEFAULT_REQUIRE_CONFIRM`
    #[arg(long, env = "DEFAULT_REQUIRE_CONFIRM", default_value_t = DEFAULT_REQUIRE_CONFIRM, action = ArgAction::Set)]
    pub default_require_confirm: bool,

    /// Seconds an unconfirmed reservation survives. Must be positive.
    ///
    /// Environment variable: `DEFAULT_CONFIRM_DEADLINE_SECS`
    #[arg(long, env = "DEFAULT_CONFIRM_DEADLINE_SECS", default_value_t = DEFAULT_CONFIRM_DEADLINE.as_secs())]
    pub default_confirm_deadline_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub data_dir: Option<PathBuf>,
    /// `None` when the background sweep is disabled.
    pub sweep_interval: Option<Duration>,
    pub request_timeout: Duration,
    pub engine: EngineOptions,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.lock_timeout_ms == 0 {
            bail!("LOCK_TIMEOUT_MS must be greater than 0");
        }
        if args.request_timeout_ms <= args.lock_timeout_ms {
            bail!(
                "REQUEST_TIMEOUT_MS ({}) must exceed LOCK_TIMEOUT_MS ({})",
                args.request_timeout_ms,
                args.lock_timeout_ms
            );
        }

        let defaults = PolicyDefaults {
            reclaim_keys: args.default_reclaim_keys,
            reissue_policy: args
                .default_reissue_policy
                .parse::<ReissuePolicy>()
                .context("invalid DEFAULT_REISSUE_POLICY")?,
            index_pad: args.default_index_pad,
            min_index: args.default_min_index,
            max_index: args.default_max_index,
            increment_policy: args
                .default_increment_policy
                .parse::<IncrementPolicy>()
                .context("invalid DEFAULT_INCREMENT_POLICY")?,
            increment_step: args.default_increment_step,
            require_confirm: args.default_require_confirm,
            confirm_deadline: Duration::from_secs(args.default_confirm_deadline_secs),
        };

        // An init request that supplies nothing must resolve.
        resolve(&SequenceConfigPatch::default(), &defaults)
            .context("DEFAULT_* values do not form a valid sequence config")?;

        Ok(Self {
            server_addr: args.server_addr,
            data_dir: args.data_dir,
            sweep_interval: (args.sweep_interval_secs > 0)
                .then(|| Duration::from_secs(args.sweep_interval_secs)),
            request_timeout: Duration::from_millis(args.request_timeout_ms),
            engine: EngineOptions {
                lock_timeout: Duration::from_millis(args.lock_timeout_ms),
                defaults,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> anyhow::Result<ServerConfig> {
        let argv = core::iter::once("ordinal-server").chain(extra.iter().copied());
        ServerConfig::try_from(CliArgs::try_parse_from(argv)?)
    }

    #[test]
    fn policy_defaults_are_overridable() {
        let config = parse(&[
            "--default-reissue-policy",
            "lowest-first",
            "--default-increment-policy",
            "Next-Odd",
            "--default-index-pad",
            "0000",
            "--default-min-index",
            "-10",
            "--default-reclaim-keys",
            "true",
            "--default-confirm-deadline-secs",
            "30",
            "--lock-timeout-ms",
            "250",
            "--sweep-interval-secs",
            "0",
        ])
        .unwrap();

        let defaults = &config.engine.defaults;
        assert_eq!(defaults.reissue_policy, ReissuePolicy::LowestFirst);
        assert_eq!(defaults.increment_policy, IncrementPolicy::NextOdd);
        assert_eq!(defaults.index_pad, "0000");
        assert_eq!(defaults.min_index, -10);
        assert!(defaults.reclaim_keys);
        assert_eq!(defaults.confirm_deadline, Duration::from_secs(30));
        assert_eq!(config.engine.lock_timeout, Duration::from_millis(250));
        assert_eq!(config.sweep_interval, None);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn rejects_unknown_default_policy() {
        let err = parse(&["--default-reissue-policy", "Oldest"]).unwrap_err();
        assert!(format!("{err:#}").contains("DEFAULT_REISSUE_POLICY"));
    }

    #[test]
    fn rejects_inconsistent_defaults() {
        assert!(parse(&["--default-min-index", "10", "--default-max-index", "5"]).is_err());
        assert!(parse(&["--default-index-pad", "abc"]).is_err());
        assert!(parse(&["--default-increment-policy", "Step", "--default-increment-step", "0"]).is_err());
        assert!(parse(&["--lock-timeout-ms", "0"]).is_err());
        assert!(parse(&["--default-confirm-deadline-secs", "0"]).is_err());
        assert!(parse(&["--request-timeout-ms", "5000"]).is_err());
        assert!(parse(&["--request-timeout-ms", "300", "--lock-timeout-ms", "200"]).is_ok());
    }
}
