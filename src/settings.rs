use {super::*, options::Options};

/// Optional keys of the TOML config file. Keys mirror the long CLI
/// flags; explicit flags always win over the file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    algo: Option<String>,
    threads: Option<u8>,
    miningaddr: Option<Vec<String>>,
    xpub: Option<String>,
    testnet: Option<bool>,
    pool: Option<String>,
    timeout: Option<f64>,
    #[serde(rename = "slowDownDuration")]
    slow_down_duration: Option<f64>,
    generate: Option<u32>,
    mineonce: Option<bool>,
    #[serde(rename = "coinbaseScript")]
    coinbase_script: Option<String>,
    #[serde(rename = "blockSiesta")]
    block_siesta: Option<f64>,
    #[serde(rename = "retryMaxAttempts")]
    retry_max_attempts: Option<u32>,
    #[serde(rename = "retryMaxBackoff")]
    retry_max_backoff: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    algorithm: Algorithm,
    threads: u8,
    mining_addrs: Vec<String>,
    xpub: Option<String>,
    testnet: bool,
    pool: String,
    pool_timeout: Duration,
    slow_down_duration: Duration,
    generate: u32,
    mine_once: bool,
    coinbase_script: Option<CoinbaseScript>,
    block_siesta: Duration,
    max_retries: u32,
    max_backoff_seconds: f64,
}

impl Settings {
    pub fn load(options: Options) -> Result<Self> {
        let config = load_config_file(options.config.clone())?;

        let algo = options
            .algo
            .or(config.algo)
            .context("Algorithm (-a, --algo) is required but not provided")?;
        let algorithm = algo.parse::<Algorithm>()?;

        let available = available_cpus();
        let threads = options.threads.or(config.threads).unwrap_or(available);
        ensure!(threads >= 1, "threads must be at least 1");
        if threads > available {
            warn!("Threads should not exceed the recommended limit: {available}");
        }

        let mut mining_addrs = options.mining_addrs;
        if mining_addrs.is_empty() {
            mining_addrs = config.miningaddr.unwrap_or_default();
        }

        let testnet = options.testnet || config.testnet.unwrap_or(false);

        let mut xpub = options.xpub.or(config.xpub);
        if !mining_addrs.is_empty() {
            // Payout addresses take precedence; the pool ignores the
            // xpub anyway.
            xpub = None;
        } else if !testnet && xpub.is_none() {
            xpub = Some(prompt_xpub()?);
        }

        let pool = options
            .pool
            .or(config.pool)
            .context("Pool endpoint (-p, --pool) is required but not provided")?;
        let pool = normalize_endpoint(&pool)?;

        let pool_timeout = seconds(
            "timeout",
            options
                .timeout
                .or(config.timeout)
                .unwrap_or(DEFAULT_POOL_TIMEOUT_SECONDS),
        )?;

        let slow_down_duration = seconds(
            "slowDownDuration",
            options
                .slow_down_duration
                .or(config.slow_down_duration)
                .unwrap_or(0.0),
        )?;

        let block_siesta = seconds(
            "blockSiesta",
            options.block_siesta.or(config.block_siesta).unwrap_or(0.0),
        )?;

        let generate = options.generate.or(config.generate).unwrap_or(0);
        if generate > 0 && !testnet {
            warn!("--generate is testnet only and will be ignored");
        }

        let coinbase_script = options
            .coinbase_script
            .or(config.coinbase_script)
            .map(|raw| parse_coinbase_script(&raw))
            .transpose()?;

        let max_backoff_seconds = options
            .retry_max_backoff
            .or(config.retry_max_backoff)
            .unwrap_or(DEFAULT_MAX_BACKOFF_SECONDS);
        ensure!(
            max_backoff_seconds.is_finite() && max_backoff_seconds >= 0.0,
            "Invalid retryMaxBackoff: {max_backoff_seconds}. It cannot be negative."
        );

        Ok(Self {
            algorithm,
            threads,
            mining_addrs,
            xpub,
            testnet,
            pool,
            pool_timeout,
            slow_down_duration,
            generate,
            mine_once: options.mine_once || config.mineonce.unwrap_or(false),
            coinbase_script,
            block_siesta,
            max_retries: options
                .retry_max_attempts
                .or(config.retry_max_attempts)
                .unwrap_or(DEFAULT_MAX_RETRIES),
            max_backoff_seconds,
        })
    }

    pub fn candidate_request(&self) -> CandidateRequest {
        CandidateRequest {
            mining_addrs: self.mining_addrs.clone(),
            xpub: self.xpub.clone().unwrap_or_default(),
            coinbase_script: self.coinbase_script.clone(),
        }
    }

    pub fn print_summary(&self) {
        println!();
        println!("Configuration:");
        println!("  Algorithm: {}", self.algorithm);
        println!("  Threads: {}", self.threads);

        if self.mining_addrs.len() < 5 {
            println!(
                "  MiningAddrs ({}): {:?}",
                self.mining_addrs.len(),
                self.mining_addrs
            );
        } else {
            println!(
                "  MiningAddrs ({}): {:?} ...",
                self.mining_addrs.len(),
                &self.mining_addrs[..5]
            );
        }

        if let Some(cbs) = &self.coinbase_script {
            println!(
                "  CoinbaseScript: [{}:{}:{}]",
                cbs.bytes_left, cbs.text, cbs.bytes_right
            );
        }

        println!("  TestNet: {}", self.testnet);
        println!("  Pool: {}", self.pool);
        println!();
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn threads(&self) -> u8 {
        self.threads
    }

    pub fn testnet(&self) -> bool {
        self.testnet
    }

    pub fn pool(&self) -> &str {
        &self.pool
    }

    pub fn pool_timeout(&self) -> Duration {
        self.pool_timeout
    }

    pub fn slow_down_duration(&self) -> Duration {
        self.slow_down_duration
    }

    pub fn generate(&self) -> u32 {
        self.generate
    }

    pub fn mine_once(&self) -> bool {
        self.mine_once
    }

    pub fn block_siesta(&self) -> Duration {
        self.block_siesta
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn max_backoff_seconds(&self) -> f64 {
        self.max_backoff_seconds
    }
}

fn load_config_file(path: Option<PathBuf>) -> Result<ConfigFile> {
    let path = match path.or_else(default_config_path) {
        Some(path) => path,
        None => return Ok(ConfigFile::default()),
    };

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;

    toml::from_str(&raw).with_context(|| format!("failed to parse config at {}", path.display()))
}

/// A `gminer.conf` next to the executable is picked up automatically.
fn default_config_path() -> Option<PathBuf> {
    let path = env::current_exe()
        .ok()?
        .parent()?
        .join(DEFAULT_CONFIG_FILENAME);

    path.exists().then_some(path)
}

fn available_cpus() -> u8 {
    let mut system = System::new();
    system.refresh_cpu_all();
    system.cpus().len().clamp(1, usize::from(u8::MAX)) as u8
}

fn normalize_endpoint(endpoint: &str) -> Result<String> {
    let endpoint = endpoint.trim();
    ensure!(!endpoint.is_empty(), "Invalid pool endpoint: empty");

    match endpoint.rsplit_once(':') {
        Some((host, port)) => {
            ensure!(!host.is_empty(), "Invalid pool endpoint `{endpoint}`");
            port.parse::<u16>()
                .with_context(|| format!("Invalid pool endpoint port `{port}`"))?;
            Ok(endpoint.into())
        }
        None => Ok(format!("{endpoint}:{DEFAULT_POOL_PORT}")),
    }
}

fn parse_coinbase_script(input: &str) -> Result<CoinbaseScript> {
    let parts: Vec<&str> = input.split(':').collect();
    ensure!(
        parts.len() == 3,
        "invalid coinbase script, expected <left-bytes>:<text>:<right-bytes>"
    );

    let bytes_left = parse_boundary(parts[0]).context("invalid left bytes")?;
    let text = parts[1].to_string();
    let bytes_right = parse_boundary(parts[2]).context("invalid right bytes")?;

    let total = bytes_left + text.len() + bytes_right;
    ensure!(
        total <= MAX_COINBASE_SCRIPT_SIZE,
        "total coinbase script length {total} exceeds maximum allowed {MAX_COINBASE_SCRIPT_SIZE}"
    );

    Ok(CoinbaseScript {
        bytes_left: bytes_left as i64,
        bytes_right: bytes_right as i64,
        text,
    })
}

/// Durations arrive as fractional seconds; zero disables the feature,
/// negative values are a config error.
fn seconds(name: &str, value: f64) -> Result<Duration> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "Invalid {name}: {value}. It cannot be negative."
    );

    Ok(Duration::from_secs_f64(value))
}

fn parse_boundary(input: &str) -> Result<usize> {
    if input.is_empty() {
        Ok(DEFAULT_CBS_BOUNDARY_BYTES)
    } else {
        Ok(input.parse()?)
    }
}

fn prompt_xpub() -> Result<String> {
    let mut stdout = io::stdout();

    loop {
        print!("Enter your xpub key: ");
        stdout.flush()?;

        let mut xpub = String::new();
        let read = io::stdin()
            .read_line(&mut xpub)
            .context("failed to read xpub from stdin")?;
        ensure!(read > 0, "stdin closed while waiting for an xpub key");

        let xpub = xpub.trim();
        if xpub.is_empty() {
            println!("xpub key cannot be empty. Please enter a valid xpub.");
            continue;
        }

        return Ok(xpub.to_string());
    }
}
