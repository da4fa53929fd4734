use super::*;

/// Drives the mining session: consumes candidate blocks from the pool
/// transport, pre-empts the in-flight job when fresh work arrives, and
/// coordinates submission of winning nonces.
#[derive(Clone)]
pub struct Miner {
    algorithm: Algorithm,
    request: CandidateRequest,
    settings: Settings,
    stats: Arc<Stats>,
    accepted_blocks: Arc<AtomicU64>,
}

impl Miner {
    pub fn new(settings: Settings) -> Self {
        Self {
            algorithm: settings.algorithm(),
            request: settings.candidate_request(),
            stats: Arc::new(Stats::new()),
            accepted_blocks: Arc::new(AtomicU64::new(0)),
            settings,
        }
    }

    pub fn accepted_blocks(&self) -> u64 {
        self.accepted_blocks.load(Ordering::Relaxed)
    }

    /// Runs sessions until cancelled or mine-once is satisfied. A failed
    /// connect or dead session backs off in 3-second increments, capped
    /// at a minute.
    pub async fn run(&self, cancel: CancellationToken) -> Result {
        let mut retry_delay = Duration::ZERO;

        loop {
            match Client::connect(self.settings.pool(), self.settings.pool_timeout()).await {
                Ok(client) => {
                    retry_delay = Duration::ZERO;

                    match self.start(client, cancel.clone()).await {
                        Ok(()) => return Ok(()),
                        Err(err) => error!("session failed: {err:#}"),
                    }
                }
                Err(err) => error!(
                    "failed to establish connection to the pool server at {}: {err}",
                    self.settings.pool()
                ),
            }

            if cancel.is_cancelled() {
                return Ok(());
            }

            retry_delay = (retry_delay + Duration::from_secs(3)).min(Duration::from_secs(60));
            debug!("retrying in {retry_delay:?}");

            tokio::select! {
                _ = sleep(retry_delay) => {}
                _ = cancel.cancelled() => return Ok(()),
            }
        }
    }

    /// One session over an established transport. Returns `Ok` on
    /// cancellation or mine-once completion, `Err` if the subscription
    /// dies underneath us.
    async fn start(&self, client: Client, cancel: CancellationToken) -> Result {
        let (blocks_tx, mut blocks_rx) = mpsc::channel(1);

        let listener = {
            let client = client.clone();
            let request = self.request.clone();
            let cancel = cancel.clone();

            tokio::spawn(async move { client.listen(cancel, request, blocks_tx).await })
        };

        let mut job: Option<(CancellationToken, task::JoinHandle<()>)> = None;
        let mut previous_height: i64 = 0;

        let result = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("session cancelled");
                    break Ok(());
                }
                maybe = blocks_rx.recv() => match maybe {
                    Some(block) => {
                        info!("block received {}", block.height);

                        if self.settings.mine_once() && self.accepted_blocks() > 0 {
                            info!("mine-once satisfied, ignoring further candidates");
                            break Ok(());
                        }

                        // Pre-empt: at most one job in flight, and its
                        // workers must be gone before the next spawns.
                        if let Some((token, handle)) = job.take() {
                            token.cancel();
                            let _ = handle.await;
                        }

                        let siesta = self.settings.block_siesta();
                        if previous_height != 0
                            && block.height > previous_height
                            && siesta > Duration::ZERO
                        {
                            info!("block siesta for {siesta:?}");
                            tokio::select! {
                                _ = sleep(siesta) => {}
                                _ = cancel.cancelled() => break Ok(()),
                            }
                        }

                        previous_height = block.height;

                        let token = cancel.child_token();
                        let handle = {
                            let miner = self.clone();
                            let client = client.clone();
                            let token = token.clone();

                            tokio::spawn(async move {
                                miner.process_candidate(token, client, block).await;
                            })
                        };

                        job = Some((token, handle));
                    }
                    None => break Err(anyhow!("candidate subscription closed unexpectedly")),
                },
            }
        };

        if let Some((token, handle)) = job.take() {
            token.cancel();
            let _ = handle.await;
        }

        listener.abort();
        let _ = listener.await;

        result
    }

    /// One candidate job: fresh stats, a partitioned worker fleet, a
    /// progress ticker, and submission of the winning nonce, if any.
    async fn process_candidate(&self, cancel: CancellationToken, client: Client, block: CandidateBlock) {
        self.stats.reset();

        match difficulty::calc_difficulty(&block.bits) {
            Ok((digits, _)) => {
                info!("new block height: {}", block.height);
                info!(
                    "processing block: {} amount: {} txs: {}",
                    block.height, block.amount, block.transactions
                );
                info!("version: {}", block.version);
                info!("target difficulty: {}/{digits}", block.bits);
                info!("merkleroot: {}", block.merkleroot);
                info!("address: {}", block.address);
            }
            Err(err) => {
                error!("mining failed: {err:#}");
                process::exit(1);
            }
        }

        let ranges = nonce_range::partition(TOTAL_NONCES, START_NONCE, self.settings.threads());

        let ticker = {
            let stats = self.stats.clone();
            let cancel = cancel.clone();
            let height = block.height;

            tokio::spawn(async move {
                let started = Instant::now();
                let mut previous_total = 0;
                let mut ticker = interval(Duration::from_secs(1));

                // The first tick completes immediately.
                ticker.tick().await;

                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            stats.report_progress(height, started, TOTAL_NONCES, &mut previous_total);
                        }
                        _ = cancel.cancelled() => return,
                    }
                }
            })
        };

        let pool = WorkerPool::new(self.algorithm, block.clone(), ranges, self.stats.clone());
        let outcome = pool.run(cancel.clone()).await;

        ticker.abort();
        let _ = ticker.await;

        match outcome {
            Ok(WorkerOutcome::Found { nonce, .. }) => {
                self.submit(&cancel, &client, &block, nonce).await;
            }
            Ok(WorkerOutcome::Exhausted) => {
                info!("b[{}] nonce space exhausted without a winner", block.height);
            }
            Ok(WorkerOutcome::Cancelled) => {}
            Err(err) => {
                error!("mining failed: {err:#}");
                process::exit(1);
            }
        }
    }

    async fn submit(
        &self,
        cancel: &CancellationToken,
        client: &Client,
        block: &CandidateBlock,
        nonce: u32,
    ) {
        let result = client
            .submit(
                cancel,
                block,
                nonce,
                self.settings.max_retries(),
                self.settings.max_backoff_seconds(),
            )
            .await;

        match result {
            Ok(ack) => {
                info!("b[{}] block submitted", block.height);

                match ack.block_hash() {
                    Ok(blockhash) => info!("b[{}] blockhash: {blockhash}", block.height),
                    Err(err) => warn!("b[{}] malformed ack header: {err:#}", block.height),
                }

                self.accepted_blocks.fetch_add(1, Ordering::Relaxed);

                let slow_down = self.settings.slow_down_duration();
                if !self.settings.mine_once() && slow_down > Duration::ZERO {
                    info!("slow down mining for {slow_down:?}");
                    tokio::select! {
                        _ = sleep(slow_down) => {}
                        _ = cancel.cancelled() => {}
                    }
                }
            }
            Err(err) => {
                error!("b[{}] failed submitting block: {err}", block.height);
            }
        }
    }

    /// Testnet helper: asks the pool to mint `num_blocks` blocks and
    /// prints their ids. No mining occurs.
    pub async fn generate(&self, num_blocks: u32) -> Result {
        let client = Client::connect(self.settings.pool(), self.settings.pool_timeout())
            .await
            .with_context(|| {
                format!(
                    "failed to establish connection to the pool server at {}",
                    self.settings.pool()
                )
            })?;

        let response = client.generate(num_blocks).await?;

        println!("Generated blocks:");
        for (i, block) in response.blocks.iter().enumerate() {
            println!(" #{}:\t{}", i + 1, block);
        }

        Ok(())
    }
}
