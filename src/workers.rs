use super::*;

/// Aggregate result of one job's worker fleet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    Found { hash: String, nonce: u32 },
    Exhausted,
    Cancelled,
}

/// Runs one blocking searcher per nonce range under a shared job token.
/// The first worker to find a winning nonce commits it and cancels the
/// token, so its siblings unwind at their next poll.
pub struct WorkerPool {
    algorithm: Algorithm,
    block: Arc<CandidateBlock>,
    ranges: BTreeMap<u8, NonceRange>,
    stats: Arc<Stats>,
}

impl WorkerPool {
    pub fn new(
        algorithm: Algorithm,
        block: CandidateBlock,
        ranges: BTreeMap<u8, NonceRange>,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            algorithm,
            block: Arc::new(block),
            ranges,
            stats,
        }
    }

    pub async fn run(&self, cancel: CancellationToken) -> Result<WorkerOutcome> {
        let winner: Arc<Mutex<Option<(String, u32)>>> = Arc::new(Mutex::new(None));
        let mut searchers = Vec::with_capacity(self.ranges.len());

        for (&tid, &range) in &self.ranges {
            let algorithm = self.algorithm;
            let block = self.block.clone();
            let stats = self.stats.clone();
            let cancel = cancel.clone();
            let winner = winner.clone();

            searchers.push(task::spawn_blocking(move || -> Result<MineOutcome> {
                debug!(
                    "b[{}] t[{tid}] nonce range ({}, {})",
                    block.height, range.min, range.max
                );

                let outcome = algorithm.mine(&stats, &block, range, tid, &cancel)?;

                if let MineOutcome::Found { hash, nonce } = &outcome {
                    let mut slot = winner.lock().unwrap();

                    // Two simultaneous winners are possible; only the
                    // first commits.
                    if slot.is_none() {
                        *slot = Some((hash.clone(), *nonce));

                        info!("b[{}] t[{tid}] nonce: {nonce}", block.height);
                        info!("b[{}] t[{tid}] solved hash: {hash}", block.height);

                        cancel.cancel();
                    }
                }

                debug!("b[{}] t[{tid}] completed", block.height);

                Ok(outcome)
            }));
        }

        let mut exhausted = true;

        for searcher in searchers {
            let outcome = match searcher.await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(err)) => {
                    cancel.cancel();
                    return Err(err);
                }
                Err(err) => {
                    cancel.cancel();
                    return Err(anyhow!("worker panicked: {err}"));
                }
            };

            if outcome != MineOutcome::Exhausted {
                exhausted = false;
            }
        }

        let winner = winner.lock().unwrap().take();

        Ok(match winner {
            Some((hash, nonce)) => WorkerOutcome::Found { hash, nonce },
            None if exhausted => WorkerOutcome::Exhausted,
            None => WorkerOutcome::Cancelled,
        })
    }
}
