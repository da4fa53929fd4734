use super::*;

mod scrypt_cpu;

pub use scrypt_cpu::NUM_ITERATIONS;

/// Proof-of-work search strategies. Only the scrypt CPU kernel is
/// implemented; other identifiers are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    ScryptCpu,
}

impl Algorithm {
    /// Searches `range` for a nonce whose hash beats the block's target.
    /// `Err` means the hash primitive itself failed, which is fatal and
    /// never conflated with `Cancelled` or `Exhausted`.
    pub fn mine(
        self,
        stats: &Stats,
        block: &CandidateBlock,
        range: NonceRange,
        tid: u8,
        cancel: &CancellationToken,
    ) -> Result<MineOutcome> {
        match self {
            Self::ScryptCpu => scrypt_cpu::mine(stats, block, range, tid, cancel),
        }
    }
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        match input.to_lowercase().as_str() {
            "scrypt_cpu" => Ok(Self::ScryptCpu),
            _ => bail!("unsupported algo `{input}`"),
        }
    }
}

impl Display for Algorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScryptCpu => write!(f, "scrypt_cpu"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MineOutcome {
    Found { hash: String, nonce: u32 },
    Exhausted,
    Cancelled,
}
