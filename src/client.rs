use {
    super::*,
    error::{ClientError, IoSnafu, SerializationSnafu},
    snafu::ResultExt,
    tokio::{
        io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter},
        net::{
            tcp::{OwnedReadHalf, OwnedWriteHalf},
            TcpStream,
        },
    },
    wire::{
        METHOD_CANDIDATE_NOTIFY, METHOD_CANDIDATE_OPEN, METHOD_GENERATE, METHOD_HEALTH_CHECK,
        METHOD_SUBMIT_VALID_BLOCK,
    },
};

mod error;

pub type Result<T = (), E = ClientError> = std::result::Result<T, E>;

/// How long a submission waits before re-checking a pending subscription
/// reconnect.
const RETRY_PENDING_DELAY: Duration = Duration::from_secs(2);

/// Ceiling for the subscription reconnect backoff.
const LISTEN_MAX_BACKOFF_SECONDS: f64 = 30.0;

struct Inner {
    endpoint: String,
    id_counter: AtomicU64,
    /// Single-slot reconnect signal: `listen` nudges it at least once per
    /// reconnect episode, `submit` drains it opportunistically.
    retry_tx: mpsc::Sender<()>,
    retry_rx: tokio::sync::Mutex<mpsc::Receiver<()>>,
    /// At most one submission RPC in flight across all jobs.
    submit_lock: tokio::sync::Mutex<()>,
}

/// Pool transport: one long-lived candidate subscription plus unary
/// calls, all speaking newline-delimited JSON frames over plain TCP.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl Client {
    /// Establishes the transport and probes the pool's health endpoint.
    /// A probe that fails or misses `dial_timeout` is an error.
    pub async fn connect(endpoint: &str, dial_timeout: Duration) -> Result<Self> {
        let (retry_tx, retry_rx) = mpsc::channel(1);

        let client = Self {
            inner: Arc::new(Inner {
                endpoint: endpoint.into(),
                id_counter: AtomicU64::new(0),
                retry_tx,
                retry_rx: tokio::sync::Mutex::new(retry_rx),
                submit_lock: tokio::sync::Mutex::new(()),
            }),
        };

        let response = timeout(
            dial_timeout,
            client.call(METHOD_HEALTH_CHECK, HealthCheckRequest::default()),
        )
        .await;
        let response = ResultExt::context(response, error::TimeoutSnafu)??;

        let health: HealthCheckResponse =
            ResultExt::context(serde_json::from_value(response), SerializationSnafu)?;

        if health.status != HealthStatus::Serving {
            return Err(ClientError::NotServing {
                status: health.status,
            });
        }

        info!("pool transport initialized");

        Ok(client)
    }

    /// Forwards candidate blocks into `blocks` until cancelled,
    /// reconnecting the subscription with capped exponential backoff.
    /// Every reconnect episode nudges the retry-pending signal so
    /// submissions hold off while the stream is down.
    pub async fn listen(
        &self,
        cancel: CancellationToken,
        request: CandidateRequest,
        blocks: mpsc::Sender<CandidateBlock>,
    ) {
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                info!("candidate subscription stopped");
                return;
            }

            info!("opening candidate subscription (attempt {attempt})");

            let mut subscription = match self.open_subscription(&request).await {
                Ok(subscription) => {
                    attempt = 0;
                    subscription
                }
                Err(err) => {
                    warn!("failed to open candidate subscription: {err}");
                    self.signal_retry();

                    let delay = backoff_delay(attempt, LISTEN_MAX_BACKOFF_SECONDS);
                    attempt += 1;
                    warn!("retrying subscription in {delay:?}");

                    if !sleep_with_cancel(&cancel, delay).await {
                        return;
                    }

                    continue;
                }
            };

            info!("listening for candidate blocks");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("candidate subscription stopped");
                        return;
                    }
                    result = subscription.recv() => match result {
                        Ok(block) => {
                            info!("received candidate block at height {}", block.height);

                            if blocks.send(block).await.is_err() {
                                return;
                            }
                        }
                        Err(err) => {
                            warn!("candidate subscription error: {err}");
                            self.signal_retry();

                            let delay = backoff_delay(attempt, LISTEN_MAX_BACKOFF_SECONDS);
                            attempt += 1;
                            warn!("retrying subscription in {delay:?}");

                            if !sleep_with_cancel(&cancel, delay).await {
                                return;
                            }

                            break;
                        }
                    }
                }
            }
        }
    }

    /// Submits a winning nonce, serialized behind the transport's submit
    /// mutex, retrying with capped exponential backoff up to
    /// `max_retries` times. A pending reconnect signal delays the
    /// attempt instead of racing the dead connection.
    pub async fn submit(
        &self,
        cancel: &CancellationToken,
        block: &CandidateBlock,
        nonce: u32,
        max_retries: u32,
        max_backoff_seconds: f64,
    ) -> Result<AckBlockSubmitted> {
        let mut attempt: u32 = 0;

        info!("submitting nonce {nonce} for block {}", block.height);

        loop {
            if cancel.is_cancelled() {
                warn!("block submission halted by cancellation");
                return Err(ClientError::Cancelled);
            }

            if self.retry_pending().await {
                warn!("subscription is reconnecting, delaying nonce submission");

                if !sleep_with_cancel(cancel, RETRY_PENDING_DELAY).await {
                    return Err(ClientError::Cancelled);
                }

                continue;
            }

            let result = {
                let _guard = self.inner.submit_lock.lock().await;

                self.call(
                    METHOD_SUBMIT_VALID_BLOCK,
                    ValidBlock {
                        template: block.clone(),
                        nonce: i64::from(nonce),
                    },
                )
                .await
            };

            match result {
                Ok(value) => {
                    let ack = ResultExt::context(serde_json::from_value(value), SerializationSnafu)?;
                    info!("block {} submitted successfully with nonce {nonce}", block.height);
                    return Ok(ack);
                }
                Err(err) => {
                    attempt += 1;

                    if attempt > max_retries {
                        error!(
                            "failed to submit nonce for block {} after {attempt} attempts: {err}",
                            block.height
                        );
                        return Err(ClientError::RetriesExhausted { attempts: attempt });
                    }

                    let delay = backoff_delay(attempt, max_backoff_seconds);
                    warn!(
                        "retrying submission for block {} in {delay:?} (attempt {attempt}): {err}",
                        block.height
                    );

                    if !sleep_with_cancel(cancel, delay).await {
                        return Err(ClientError::Cancelled);
                    }
                }
            }
        }
    }

    /// Testnet helper: asks the pool to mint `num_blocks` blocks.
    pub async fn generate(&self, num_blocks: u32) -> Result<GenerateResponse> {
        let value = self
            .call(
                METHOD_GENERATE,
                GenerateRequest {
                    num_blocks: num_blocks as i32,
                },
            )
            .await?;

        ResultExt::context(serde_json::from_value(value), SerializationSnafu)
    }

    async fn open_subscription(&self, request: &CandidateRequest) -> Result<Subscription> {
        let stream = ResultExt::context(TcpStream::connect(&self.inner.endpoint).await, IoSnafu)?;

        let (reader, writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        let mut writer = BufWriter::new(writer);

        send(&mut writer, self.next_id(), METHOD_CANDIDATE_OPEN, request).await?;

        match receive(&mut reader).await? {
            Message::Response { error: None, .. } => Ok(Subscription {
                reader,
                _writer: writer,
            }),
            Message::Response {
                error: Some(error), ..
            } => Err(ClientError::Rpc {
                method: METHOD_CANDIDATE_OPEN.into(),
                error,
            }),
            _ => Err(ClientError::UnexpectedMessage {
                method: METHOD_CANDIDATE_OPEN.into(),
            }),
        }
    }

    /// One unary request/response exchange on a fresh connection.
    async fn call(&self, method: &str, params: impl Serialize) -> Result<Value> {
        let stream = ResultExt::context(TcpStream::connect(&self.inner.endpoint).await, IoSnafu)?;

        let (reader, writer) = stream.into_split();
        let mut reader = BufReader::new(reader);
        let mut writer = BufWriter::new(writer);

        send(&mut writer, self.next_id(), method, params).await?;

        match receive(&mut reader).await? {
            Message::Response {
                result: Some(result),
                error: None,
                ..
            } => Ok(result),
            Message::Response {
                error: Some(error), ..
            } => Err(ClientError::Rpc {
                method: method.into(),
                error,
            }),
            _ => Err(ClientError::UnexpectedMessage {
                method: method.into(),
            }),
        }
    }

    fn next_id(&self) -> Id {
        Id::Number(self.inner.id_counter.fetch_add(1, Ordering::Relaxed))
    }

    fn signal_retry(&self) {
        // Drop-if-full: the consumer only needs one nudge per episode.
        let _ = self.inner.retry_tx.try_send(());
    }

    async fn retry_pending(&self) -> bool {
        self.inner.retry_rx.lock().await.try_recv().is_ok()
    }
}

/// The server half of an open candidate stream. The write half is held
/// so the pool keeps the connection open.
struct Subscription {
    reader: BufReader<OwnedReadHalf>,
    _writer: BufWriter<OwnedWriteHalf>,
}

impl Subscription {
    async fn recv(&mut self) -> Result<CandidateBlock> {
        match receive(&mut self.reader).await? {
            Message::Notification { method, params } if method == METHOD_CANDIDATE_NOTIFY => {
                ResultExt::context(serde_json::from_value(params), SerializationSnafu)
            }
            Message::Notification { method, .. } => {
                Err(ClientError::UnexpectedNotification { method })
            }
            _ => Err(ClientError::UnexpectedMessage {
                method: METHOD_CANDIDATE_NOTIFY.into(),
            }),
        }
    }
}

async fn send(
    writer: &mut BufWriter<OwnedWriteHalf>,
    id: Id,
    method: &str,
    params: impl Serialize,
) -> Result {
    let message = Message::Request {
        id,
        method: method.into(),
        params: ResultExt::context(serde_json::to_value(params), SerializationSnafu)?,
    };

    let mut frame = ResultExt::context(serde_json::to_string(&message), SerializationSnafu)?;
    frame.push('\n');

    ResultExt::context(writer.write_all(frame.as_bytes()).await, IoSnafu)?;
    ResultExt::context(writer.flush().await, IoSnafu)?;

    Ok(())
}

async fn receive(reader: &mut BufReader<OwnedReadHalf>) -> Result<Message> {
    let mut line = String::new();

    if ResultExt::context(reader.read_line(&mut line).await, IoSnafu)? == 0 {
        return Err(ClientError::Disconnected);
    }

    ResultExt::context(serde_json::from_str(&line), SerializationSnafu)
}

fn backoff_delay(attempt: u32, cap_seconds: f64) -> Duration {
    Duration::from_secs_f64(cap_seconds.min(2f64.powf(f64::from(attempt))))
}

/// Returns false if the token fired before the delay elapsed.
async fn sleep_with_cancel(cancel: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        _ = sleep(delay) => true,
        _ = cancel.cancelled() => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_until_the_cap() {
        assert_eq!(backoff_delay(0, 30.0), Duration::from_secs(1));
        assert_eq!(backoff_delay(1, 30.0), Duration::from_secs(2));
        assert_eq!(backoff_delay(2, 30.0), Duration::from_secs(4));
        assert_eq!(backoff_delay(3, 30.0), Duration::from_secs(8));
        assert_eq!(backoff_delay(5, 30.0), Duration::from_secs(30));
        assert_eq!(backoff_delay(1000, 30.0), Duration::from_secs(30));
    }

    #[test]
    fn backoff_honors_a_custom_cap() {
        assert_eq!(backoff_delay(10, 7.5), Duration::from_secs_f64(7.5));
    }
}
