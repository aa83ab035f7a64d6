//! Value engine for fuzzing harnesses.
//!
//! A [`Gen`] hands out bounded random values and logs every one of them, so
//! a failing run can be replayed value for value. Values come from a local
//! ChaCha8 stream, from a previous run's log, or from an external oracle.
//! Harnesses built on [`Harness`] drive objects under test through random
//! constructors and random method sequences.

pub mod config;
pub mod gen;
pub mod harness;
pub mod log;
pub mod make;
pub mod oracle;
pub mod scalar;
pub mod zmtp;

use std::path::PathBuf;

use ramfuzz_range::RangeError;

pub use config::RuntimeConfig;
pub use gen::{Gen, Mode, Region};
pub use harness::{make_object, spin_roulette, Ctor, Harness, Method, Submaker};
pub use log::{LogReader, LogRecord, LogWriter, SkipRange};
pub use make::{make_enum, make_function, Make, VoidBuffer};
pub use oracle::{Channel, LocalOracle, Request, Response, TcpChannel, Wide};
pub use scalar::Scalar;
pub use zmtp::ZmtpChannel;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Cannot open {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Log tag mismatch at offset {offset}: expected {expected}, found {found}")]
    TagMismatch { offset: u64, expected: u8, found: u8 },

    #[error("Input log exhausted at offset {offset}")]
    LogExhausted { offset: u64 },

    #[error("Oracle rejected request with status {status}")]
    Oracle { status: u8 },

    #[error("Range error: {0}")]
    Range(#[from] RangeError),
}
