use {
    algorithm::{Algorithm, MineOutcome},
    anyhow::{anyhow, bail, ensure, Context, Error},
    arguments::Arguments,
    bitcoin::{CompactTarget, Target},
    clap::{CommandFactory, Parser},
    client::Client,
    miner::Miner,
    nonce_range::NonceRange,
    primitive_types::U256,
    serde::{Deserialize, Serialize},
    serde_json::Value,
    settings::Settings,
    std::{
        collections::BTreeMap,
        env,
        fmt::{self, Display, Formatter},
        fs,
        io::{self, Write},
        path::PathBuf,
        process,
        str::FromStr,
        sync::{
            atomic::{AtomicU64, Ordering},
            Arc, Mutex,
        },
        time::{Duration, Instant},
    },
    stats::Stats,
    sysinfo::System,
    tokio::{
        runtime::Runtime,
        sync::mpsc,
        task,
        time::{interval, sleep, timeout},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
    tracing_appender::non_blocking,
    tracing_subscriber::EnvFilter,
    wire::{
        AckBlockSubmitted, CandidateBlock, CandidateRequest, CoinbaseScript, GenerateRequest,
        GenerateResponse, HealthCheckRequest, HealthCheckResponse, HealthStatus, Id, Message,
        RpcError, ValidBlock,
    },
    workers::{WorkerOutcome, WorkerPool},
};

pub mod algorithm;
pub mod arguments;
pub mod client;
pub mod difficulty;
pub mod miner;
pub mod nonce_range;
pub mod options;
pub mod settings;
mod signal;
pub mod stats;
pub mod wire;
pub mod workers;

pub const DEFAULT_POOL_PORT: u16 = 80;
pub const DEFAULT_CONFIG_FILENAME: &str = "gminer.conf";
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_MAX_BACKOFF_SECONDS: f64 = 30.0;
pub const DEFAULT_POOL_TIMEOUT_SECONDS: f64 = 30.0;

pub const MAX_COINBASE_SCRIPT_SIZE: usize = 50;
pub const DEFAULT_CBS_BOUNDARY_BYTES: usize = 5;

/// Hex length of the nonceless header prefix; the 4-byte little-endian
/// nonce is appended by the search kernel.
pub const NONCELESS_HEADER_HEX: usize = 152;

pub const TOTAL_NONCES: u32 = u32::MAX;
pub const START_NONCE: u32 = 0;

type Result<T = (), E = Error> = std::result::Result<T, E>;

pub fn main() {
    let (writer, _guard) = non_blocking(io::stderr());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(writer)
        .init();

    let arguments = match Arguments::try_parse() {
        Ok(arguments) => arguments,
        Err(err) => {
            let _ = err.print();
            process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    Runtime::new()
        .expect("Failed to create tokio runtime")
        .block_on(async {
            let cancel_token = signal::setup_signal_handler();

            match arguments.run(cancel_token).await {
                Err(err) => {
                    error!("error: {err:#}");
                    process::exit(1);
                }
                Ok(_) => {
                    process::exit(0);
                }
            }
        });
}
