use {
    super::*,
    serde::de::{self, Deserializer},
    sha2::{Digest, Sha256},
};

pub const METHOD_CANDIDATE_OPEN: &str = "CandidateStream.Open";
pub const METHOD_CANDIDATE_NOTIFY: &str = "CandidateStream.Candidate";
pub const METHOD_SUBMIT_VALID_BLOCK: &str = "CandidateStream.SubmitValidBlock";
pub const METHOD_GENERATE: &str = "CandidateStream.Generate";
pub const METHOD_HEALTH_CHECK: &str = "Health.Check";

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Clone)]
#[serde(untagged)]
pub enum Id {
    Null,
    Number(u64),
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Message {
    Request {
        id: Id,
        method: String,
        params: Value,
    },
    Response {
        id: Id,
        result: Option<Value>,
        error: Option<RpcError>,
    },
    Notification {
        method: String,
        params: Value,
    },
}

/// Notifications may carry an explicit `id: null`; anything with a
/// `result` or `error` field is a response regardless of the rest.
impl<'de> Deserialize<'de> for Message {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;

        let is_response = value.get("result").is_some() || value.get("error").is_some();

        let is_notification = value.get("method").is_some()
            && (value.get("id").is_none() || value.get("id") == Some(&Value::Null));

        if is_response {
            #[derive(Deserialize)]
            struct Response {
                id: Id,
                result: Option<Value>,
                error: Option<RpcError>,
            }

            let response: Response = serde_json::from_value(value).map_err(de::Error::custom)?;

            Ok(Message::Response {
                id: response.id,
                result: response.result,
                error: response.error,
            })
        } else if is_notification {
            let method = value
                .get("method")
                .and_then(Value::as_str)
                .ok_or_else(|| de::Error::missing_field("method"))?
                .to_string();

            let params = value
                .get("params")
                .cloned()
                .ok_or_else(|| de::Error::missing_field("params"))?;

            Ok(Message::Notification { method, params })
        } else if value.get("method").is_some() {
            #[derive(Deserialize)]
            struct Request {
                id: Id,
                method: String,
                params: Value,
            }

            let request: Request = serde_json::from_value(value).map_err(de::Error::custom)?;

            Ok(Message::Request {
                id: request.id,
                method: request.method,
                params: request.params,
            })
        } else {
            Err(de::Error::custom("unknown message format"))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

impl Display for RpcError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CoinbaseScript {
    pub bytes_left: i64,
    pub bytes_right: i64,
    pub text: String,
}

/// Subscription parameters. `xpub` is ignored by the pool whenever
/// `mining_addrs` is non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CandidateRequest {
    #[serde(default)]
    pub mining_addrs: Vec<String>,
    #[serde(default)]
    pub xpub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coinbase_script: Option<CoinbaseScript>,
}

/// An immutable work unit pushed by the pool. `header` holds the
/// nonceless prefix (at least [`NONCELESS_HEADER_HEX`] hex chars);
/// `block` is the opaque serialized body, carried end-to-end so a
/// submission can round-trip it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CandidateBlock {
    pub height: i64,
    pub bits: String,
    pub header: String,
    #[serde(default)]
    pub version: i32,
    #[serde(default)]
    pub merkleroot: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub transactions: i64,
    #[serde(default)]
    pub block: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidBlock {
    pub template: CandidateBlock,
    pub nonce: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AckBlockSubmitted {
    pub header: String,
}

impl AckBlockSubmitted {
    /// Block id of the acknowledged header: double SHA-256 of the
    /// serialized header, reversed into display order.
    pub fn block_hash(&self) -> Result<String> {
        let header = hex::decode(&self.header).context("ack header is not valid hex")?;

        let mut digest: [u8; 32] = Sha256::digest(Sha256::digest(&header)).into();
        digest.reverse();

        Ok(hex::encode(digest))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateRequest {
    pub num_blocks: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GenerateResponse {
    #[serde(default)]
    pub blocks: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct HealthCheckRequest {}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HealthStatus {
    #[serde(rename = "SERVING")]
    Serving,
    #[serde(rename = "NOT_SERVING")]
    NotServing,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthCheckResponse {
    pub status: HealthStatus,
}

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[track_caller]
    fn case(s: &str, expected: Message) {
        let actual = serde_json::from_str::<Message>(s).unwrap();
        assert_eq!(actual, expected, "deserialize Message from str");

        let serialized = serde_json::to_string(&actual).unwrap();
        let lhs: Value = serde_json::from_str(s).unwrap();
        let rhs: Value = serde_json::from_str(&serialized).unwrap();
        assert_eq!(lhs, rhs, "JSON semantic equality");

        let round_trip = serde_json::from_str::<Message>(&serialized).unwrap();
        assert_eq!(round_trip, expected, "roundtrip");
    }

    #[test]
    fn request() {
        case(
            r#"{"id":1,"method":"Health.Check","params":{}}"#,
            Message::Request {
                id: Id::Number(1),
                method: METHOD_HEALTH_CHECK.into(),
                params: json!({}),
            },
        );
    }

    #[test]
    fn notification() {
        case(
            r#"{"method":"CandidateStream.Candidate","params":{}}"#,
            Message::Notification {
                method: METHOD_CANDIDATE_NOTIFY.into(),
                params: json!({}),
            },
        );

        let with_id_null = r#"{"method":"CandidateStream.Candidate","params":{},"id":null}"#;

        assert_eq!(
            serde_json::from_str::<Message>(with_id_null).unwrap(),
            Message::Notification {
                method: METHOD_CANDIDATE_NOTIFY.into(),
                params: json!({}),
            }
        );
    }

    #[test]
    fn response() {
        case(
            r#"{"id":8,"result":{"status":"SERVING"},"error":null}"#,
            Message::Response {
                id: Id::Number(8),
                result: Some(json!({"status": "SERVING"})),
                error: None,
            },
        );
    }

    #[test]
    fn error_response() {
        case(
            r#"{"id":10,"result":null,"error":{"code":13,"message":"stale template"}}"#,
            Message::Response {
                id: Id::Number(10),
                result: None,
                error: Some(RpcError {
                    code: 13,
                    message: "stale template".into(),
                }),
            },
        );
    }

    #[test]
    fn unknown_message_is_rejected() {
        assert!(serde_json::from_str::<Message>(r#"{"foo":1}"#).is_err());
    }

    #[test]
    fn candidate_block_roundtrip() {
        let block = CandidateBlock {
            height: 9999,
            bits: "1702c4e4".into(),
            header: "00".repeat(76),
            version: 536870912,
            merkleroot: "8f6c196b9336ac45aabfcf77e5c61fdd".into(),
            address: "F9xAqr1c".into(),
            amount: 99,
            transactions: 10,
            block: String::new(),
        };

        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(serde_json::from_value::<CandidateBlock>(value).unwrap(), block);
    }

    #[test]
    fn candidate_block_optional_fields_default() {
        let block: CandidateBlock = serde_json::from_value(json!({
            "height": 1,
            "bits": "207fffff",
            "header": "00".repeat(76),
        }))
        .unwrap();

        assert_eq!(block.version, 0);
        assert!(block.merkleroot.is_empty());
        assert!(block.block.is_empty());
    }

    #[test]
    fn health_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Serving).unwrap(),
            r#""SERVING""#
        );
        assert_eq!(
            serde_json::from_str::<HealthStatus>(r#""NOT_SERVING""#).unwrap(),
            HealthStatus::NotServing
        );
    }

    #[test]
    fn coinbase_script_is_omitted_when_absent() {
        let request = CandidateRequest {
            mining_addrs: vec!["F9xAqr1c".into()],
            xpub: String::new(),
            coinbase_script: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("coinbase_script").is_none());
    }

    #[test]
    fn ack_block_hash_matches_double_sha256() {
        // The Bitcoin genesis header and its well-known block hash.
        let ack = AckBlockSubmitted {
            header: "0100000000000000000000000000000000000000000000000000000000000000\
                     000000003ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa\
                     4b1e5e4a29ab5f49ffff001d1dac2b7c"
                .into(),
        };

        assert_eq!(
            ack.block_hash().unwrap(),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
    }

    #[test]
    fn ack_block_hash_rejects_bad_hex() {
        let ack = AckBlockSubmitted {
            header: "zz".into(),
        };

        assert!(ack.block_hash().is_err());
    }
}
