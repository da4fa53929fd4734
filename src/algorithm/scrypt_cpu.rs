use {super::*, scrypt::Params};

/// Nonces between stats updates and cancellation polls. A poll every
/// thousand scrypt invocations keeps pre-emption latency in the tens of
/// milliseconds without the atomics showing up in the profile.
pub const NUM_ITERATIONS: u32 = 1000;

const SCRYPT_LOG_N: u8 = 10;
const SCRYPT_R: u32 = 1;
const SCRYPT_P: u32 = 1;
const DIGEST_LEN: usize = 32;

pub(super) fn mine(
    stats: &Stats,
    block: &CandidateBlock,
    range: NonceRange,
    tid: u8,
    cancel: &CancellationToken,
) -> Result<MineOutcome> {
    let (_, target) = difficulty::calc_difficulty(&block.bits)?;

    ensure!(
        block.header.len() >= NONCELESS_HEADER_HEX,
        "t[{tid}] header is {} hex chars, expected at least {NONCELESS_HEADER_HEX}",
        block.header.len()
    );

    let prefix = hex::decode(&block.header[..NONCELESS_HEADER_HEX])
        .with_context(|| format!("t[{tid}] header prefix is not valid hex"))?;

    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, DIGEST_LEN)
        .map_err(|err| anyhow!("t[{tid}] invalid scrypt parameters: {err}"))?;

    let mut buffer = [0u8; 80];
    buffer[..NONCELESS_HEADER_HEX / 2].copy_from_slice(&prefix);

    let mut digest = [0u8; DIGEST_LEN];
    let mut iterations = 0;
    let mut nonce = range.min;

    loop {
        buffer[NONCELESS_HEADER_HEX / 2..].copy_from_slice(&nonce.to_le_bytes());

        // Password and salt are both the 80-byte candidate header.
        scrypt::scrypt(&buffer, &buffer, &params, &mut digest)
            .map_err(|err| anyhow!("t[{tid}] scrypt failed: {err}"))?;

        // The digest is little-endian; the target comparison is numeric
        // big-endian.
        digest.reverse();

        if Target::from_be_bytes(digest) < target {
            return Ok(MineOutcome::Found {
                hash: hex::encode(digest),
                nonce,
            });
        }

        iterations += 1;
        if iterations == NUM_ITERATIONS {
            stats.add_hashes(u64::from(NUM_ITERATIONS));
            stats.add_iteration();
            iterations = 0;

            if cancel.is_cancelled() {
                return Ok(MineOutcome::Cancelled);
            }
        }

        if nonce == range.max {
            break;
        }

        nonce += 1;
    }

    Ok(MineOutcome::Exhausted)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EASY_BITS: &str = "207fffff";
    const HARD_BITS: &str = "1935a7f1";

    fn candidate(bits: &str) -> CandidateBlock {
        CandidateBlock {
            height: 9999,
            bits: bits.into(),
            header: "00000020d7d2fc3301d304edfcffeafd0d41d0bd507d4622bc464fd92deddc94c9cfd9b8\
                     9c1b8cb9fc61ffbdaa88602b2fce770bc9fcdc296ba47f522b5d9d829b887833406d7167\
                     e2554219"
                .into(),
            ..Default::default()
        }
    }

    #[test]
    fn easy_target_finds_a_nonce_in_a_short_range() {
        let stats = Stats::new();
        let block = candidate(EASY_BITS);
        let range = NonceRange { min: 0, max: 999 };

        let outcome = Algorithm::ScryptCpu
            .mine(&stats, &block, range, 0, &CancellationToken::new())
            .unwrap();

        let MineOutcome::Found { hash, nonce } = outcome else {
            panic!("expected a winner against the regtest ceiling, got {outcome:?}");
        };

        assert!(nonce <= 999);

        let digest: [u8; 32] = hex::decode(&hash).unwrap().try_into().unwrap();
        let (_, target) = difficulty::calc_difficulty(EASY_BITS).unwrap();
        assert!(Target::from_be_bytes(digest) < target);
    }

    #[test]
    fn hard_target_exhausts_the_range_and_counts_every_batch() {
        let stats = Stats::new();
        let block = candidate(HARD_BITS);
        let range = NonceRange { min: 0, max: 9_999 };

        let outcome = Algorithm::ScryptCpu
            .mine(&stats, &block, range, 0, &CancellationToken::new())
            .unwrap();

        assert_eq!(outcome, MineOutcome::Exhausted);
        assert_eq!(stats.snapshot(), (10, 10_000));
    }

    #[test]
    fn cancellation_is_observed_at_the_batch_boundary() {
        let stats = Stats::new();
        let block = candidate(HARD_BITS);
        let range = NonceRange {
            min: 0,
            max: u32::MAX,
        };

        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = Algorithm::ScryptCpu
            .mine(&stats, &block, range, 0, &cancel)
            .unwrap();

        assert_eq!(outcome, MineOutcome::Cancelled);
        assert_eq!(stats.snapshot(), (1, 1000));
    }

    #[test]
    fn short_header_is_fatal() {
        let stats = Stats::new();
        let block = CandidateBlock {
            bits: EASY_BITS.into(),
            header: "00".repeat(10),
            ..Default::default()
        };

        let result = Algorithm::ScryptCpu.mine(
            &stats,
            &block,
            NonceRange { min: 0, max: 10 },
            0,
            &CancellationToken::new(),
        );

        assert!(result.is_err());
    }

    #[test]
    fn malformed_bits_are_fatal() {
        let stats = Stats::new();
        let mut block = candidate(EASY_BITS);
        block.bits = "not-hex!".into();

        let result = Algorithm::ScryptCpu.mine(
            &stats,
            &block,
            NonceRange { min: 0, max: 10 },
            0,
            &CancellationToken::new(),
        );

        assert!(result.is_err());
    }
}
