use {
    clap::Parser,
    gminer::{
        client::Client,
        miner::Miner,
        options::Options,
        settings::Settings,
        wire::{
            AckBlockSubmitted, CandidateBlock, CandidateRequest, GenerateResponse, Id, Message,
            RpcError, ValidBlock, METHOD_CANDIDATE_NOTIFY, METHOD_CANDIDATE_OPEN, METHOD_GENERATE,
            METHOD_HEALTH_CHECK, METHOD_SUBMIT_VALID_BLOCK,
        },
    },
    mock_pool::{MockPool, MockPoolConfig},
    serde_json::{json, Value},
    std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    tokio::{
        io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
        net::{tcp::OwnedWriteHalf, TcpListener, TcpStream},
        sync::{mpsc, Mutex, Notify},
        time::{sleep, timeout, Duration},
    },
    tokio_util::sync::CancellationToken,
};


pub(crate) const EASY_BITS: &str = "207fffff";
pub(crate) const HARD_BITS: &str = "1935a7f1";

pub(crate) fn candidate(height: i64, bits: &str) -> CandidateBlock {
    CandidateBlock {
        height,
        bits: bits.into(),
        header: "00".repeat(76),
        merkleroot: "8f6c196b9336ac45aabfcf77e5c61fdd".into(),
        address: "F8mUqy1cQzv6t1nMvFr5cUyJkF1c".into(),
        amount: 5_000_000_000,
        transactions: 1,
        ..Default::default()
    }
}

pub(crate) fn load_settings(args: &str) -> Settings {
    Settings::load(Options::try_parse_from(args.split_whitespace()).unwrap()).unwrap()
}
