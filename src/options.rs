use super::*;

#[derive(Clone, Debug, Default, Parser)]
pub struct Options {
    #[arg(
        short = 'c',
        long = "config",
        help = "Load configuration from <CONFIG>."
    )]
    pub config: Option<PathBuf>,

    #[arg(
        short = 'a',
        long = "algo",
        help = "Algorithm to use for mining (scrypt_cpu)."
    )]
    pub algo: Option<String>,

    #[arg(
        short = 't',
        long = "threads",
        help = "Number of worker <THREADS>. [default: all logical CPUs]"
    )]
    pub threads: Option<u8>,

    #[arg(
        short = 'd',
        long = "miningaddr",
        help = "Payment <ADDRESS> for mining rewards (repeatable)."
    )]
    pub mining_addrs: Vec<String>,

    #[arg(
        short = 'x',
        long = "xpub",
        help = "BIP32 <XPUB> (ignored if --miningaddr is set)."
    )]
    pub xpub: Option<String>,

    #[arg(long = "testnet", help = "Use testnet instead of mainnet.")]
    pub testnet: bool,

    #[arg(short = 'p', long = "pool", help = "Pool server <HOST[:PORT]>.")]
    pub pool: Option<String>,

    #[arg(
        short = 'o',
        long = "timeout",
        help = "Dial timeout in <SECONDS>. [default: 30]"
    )]
    pub timeout: Option<f64>,

    #[arg(
        short = 'z',
        long = "slowDownDuration",
        help = "Pause in <SECONDS> after an accepted block."
    )]
    pub slow_down_duration: Option<f64>,

    #[arg(
        long = "generate",
        value_name = "N",
        help = "Ask the pool to mint <N> blocks and exit (testnet only)."
    )]
    pub generate: Option<u32>,

    #[arg(long = "mineonce", help = "Exit after the first accepted block.")]
    pub mine_once: bool,

    #[arg(
        short = 's',
        long = "coinbaseScript",
        value_name = "LEFT:TEXT:RIGHT",
        help = "Custom coinbase script, at most 50 bytes total."
    )]
    pub coinbase_script: Option<String>,

    #[arg(
        long = "blockSiesta",
        help = "Pause in <SECONDS> between successive block heights."
    )]
    pub block_siesta: Option<f64>,

    #[arg(
        long = "retryMaxAttempts",
        help = "Submission retry attempts before giving up. [default: 5]"
    )]
    pub retry_max_attempts: Option<u32>,

    #[arg(
        long = "retryMaxBackoff",
        help = "Maximum submission backoff in seconds. [default: 30]"
    )]
    pub retry_max_backoff: Option<f64>,

    #[arg(short = 'v', long = "version", help = "Print version.")]
    pub version: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mining_addresses_are_repeatable() {
        let options =
            Options::try_parse_from(["gminer", "-d", "F8mUqy1c", "-d", "FLjpnbEh"]).unwrap();

        assert_eq!(options.mining_addrs, vec!["F8mUqy1c", "FLjpnbEh"]);
    }

    #[test]
    fn camel_case_long_flags_are_preserved() {
        let options = Options::try_parse_from([
            "gminer",
            "--slowDownDuration",
            "5",
            "--blockSiesta",
            "2.5",
            "--retryMaxAttempts",
            "7",
            "--retryMaxBackoff",
            "12.5",
            "--coinbaseScript",
            "5:gm:5",
        ])
        .unwrap();

        assert_eq!(options.slow_down_duration, Some(5.0));
        assert_eq!(options.block_siesta, Some(2.5));
        assert_eq!(options.retry_max_attempts, Some(7));
        assert_eq!(options.retry_max_backoff, Some(12.5));
        assert_eq!(options.coinbase_script.as_deref(), Some("5:gm:5"));
    }

    #[test]
    fn version_short_flag() {
        let options = Options::try_parse_from(["gminer", "-v"]).unwrap();
        assert!(options.version);
    }

    #[test]
    fn unknown_flags_are_rejected() {
        assert!(Options::try_parse_from(["gminer", "--gpu"]).is_err());
    }
}
