use {super::*, snafu::Snafu};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ClientError {
    #[snafu(display("connection timeout: {source}"))]
    Timeout { source: tokio::time::error::Elapsed },

    #[snafu(display("io error: {source}"))]
    Io { source: std::io::Error },

    #[snafu(display("serialization error: {source}"))]
    Serialization { source: serde_json::Error },

    #[snafu(display("{method} failed: {error}"))]
    Rpc { method: String, error: RpcError },

    #[snafu(display("pool health check reported {status:?}"))]
    NotServing { status: HealthStatus },

    #[snafu(display("connection closed by pool"))]
    Disconnected,

    #[snafu(display("unexpected reply to {method}"))]
    UnexpectedMessage { method: String },

    #[snafu(display("unexpected notification `{method}` on candidate subscription"))]
    UnexpectedNotification { method: String },

    #[snafu(display("cancelled"))]
    Cancelled,

    #[snafu(display("block submission failed after {attempts} attempts"))]
    RetriesExhausted { attempts: u32 },
}
