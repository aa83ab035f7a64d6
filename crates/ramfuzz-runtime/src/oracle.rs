//! Request/reply protocol with an external value oracle.
//!
//! Messages are lists of byte parts. A value request has five parts: `[0]`,
//! the value id (`u64`), a widened type tag, the low bound and the high
//! bound. A termination notification has two: `[1]` and `[success]`. Every
//! request gets exactly one reply whose first part is a status byte; a value
//! reply carries the value as its second part. Numbers are little-endian.

use std::collections::HashMap;
use std::io::{BufReader, BufWriter, Read, Write};
use std::net::TcpStream;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::scalar::Scalar;
use crate::RuntimeError;

pub const OK_TERMINAL: u8 = 10;
pub const OK_VALUE: u8 = 11;
/// Every request has at least two parts.
pub const ERR_FEW_PARTS: u8 = 20;
/// A termination notification has exactly two parts.
pub const ERR_TERM_TAKES_2: u8 = 21;
/// A value request has exactly five well-formed parts.
pub const ERR_VALUE_TAKES_5: u8 = 22;
/// The same execution point last asked for a different value id.
pub const ERR_WRONG_VALUEID: u8 = 23;

/// Largest part a framed channel accepts.
pub(crate) const MAX_PART_LEN: usize = 1 << 20;

pub type Message = Vec<Vec<u8>>;

/// The oracle's numeric types. Narrower scalars widen to one of these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Wide {
    I64(i64),
    U64(u64),
    F64(f64),
}

impl Wide {
    pub fn tag(self) -> u8 {
        match self {
            Wide::I64(_) => 1,
            Wide::U64(_) => 2,
            Wide::F64(_) => 3,
        }
    }

    pub fn to_le_bytes(self) -> [u8; 8] {
        match self {
            Wide::I64(v) => v.to_le_bytes(),
            Wide::U64(v) => v.to_le_bytes(),
            Wide::F64(v) => v.to_le_bytes(),
        }
    }

    pub fn from_le_bytes(tag: u8, bytes: &[u8]) -> Option<Self> {
        match tag {
            1 => i64::read_le(bytes).map(Wide::I64),
            2 => u64::read_le(bytes).map(Wide::U64),
            3 => f64::read_le(bytes).map(Wide::F64),
            _ => None,
        }
    }

    /// Bit pattern, for keying execution paths.
    fn bits(self) -> u64 {
        u64::from_le_bytes(self.to_le_bytes())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Value { valueid: u64, lo: Wide, hi: Wide },
    Terminate { success: bool },
}

impl Request {
    pub fn encode(&self) -> Message {
        match *self {
            Request::Value { valueid, lo, hi } => vec![
                vec![0],
                valueid.to_le_bytes().to_vec(),
                vec![lo.tag()],
                lo.to_le_bytes().to_vec(),
                hi.to_le_bytes().to_vec(),
            ],
            Request::Terminate { success } => vec![vec![1], vec![u8::from(success)]],
        }
    }

    /// Parses a request, or returns the status rejecting it.
    pub fn decode(msg: &[Vec<u8>]) -> Result<Self, u8> {
        if msg.len() <= 1 {
            return Err(ERR_FEW_PARTS);
        }
        if msg[0].first().is_some_and(|&b| b != 0) {
            return match (msg.len(), msg[1].first()) {
                (2, Some(&b)) => Ok(Request::Terminate { success: b != 0 }),
                _ => Err(ERR_TERM_TAKES_2),
            };
        }
        if msg.len() != 5 {
            return Err(ERR_VALUE_TAKES_5);
        }
        let valueid = u64::read_le(&msg[1]).ok_or(ERR_VALUE_TAKES_5)?;
        let tag = match msg[2].as_slice() {
            [tag] => *tag,
            _ => return Err(ERR_VALUE_TAKES_5),
        };
        let lo = Wide::from_le_bytes(tag, &msg[3]).ok_or(ERR_VALUE_TAKES_5)?;
        let hi = Wide::from_le_bytes(tag, &msg[4]).ok_or(ERR_VALUE_TAKES_5)?;
        Ok(Request::Value { valueid, lo, hi })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Value(Wide),
    Terminal { success: bool },
    Rejected(u8),
}

impl Response {
    pub fn encode(&self) -> Message {
        match *self {
            Response::Value(v) => vec![vec![OK_VALUE], v.to_le_bytes().to_vec()],
            Response::Terminal { success } => vec![vec![OK_TERMINAL], vec![u8::from(success)]],
            Response::Rejected(status) => vec![vec![status]],
        }
    }

    /// Parses a reply to a request whose values carry `tag`.
    pub fn decode(msg: &[Vec<u8>], tag: u8) -> Result<Self, RuntimeError> {
        let status = match msg.first().map(Vec::as_slice) {
            Some([status]) => *status,
            _ => return Err(RuntimeError::Protocol("reply lacks a status".to_string())),
        };
        match status {
            OK_VALUE => msg
                .get(1)
                .filter(|_| msg.len() == 2)
                .and_then(|part| Wide::from_le_bytes(tag, part))
                .map(Response::Value)
                .ok_or_else(|| RuntimeError::Protocol("malformed value reply".to_string())),
            OK_TERMINAL => Ok(Response::Terminal {
                success: msg.get(1).and_then(|p| p.first()).is_some_and(|&b| b != 0),
            }),
            ERR_FEW_PARTS..=ERR_WRONG_VALUEID => Ok(Response::Rejected(status)),
            other => Err(RuntimeError::Protocol(format!("unknown status {other}"))),
        }
    }
}

/// A synchronous link to an oracle: one request, one reply, nothing in
/// flight otherwise.
pub trait Channel {
    /// Sends `request` and blocks for its reply.
    fn round_trip(&mut self, request: Message) -> Result<Message, RuntimeError>;
}

/// Asks the oracle for a value in `[lo, hi]`.
pub fn request_value(
    channel: &mut dyn Channel,
    valueid: u64,
    lo: Wide,
    hi: Wide,
) -> Result<Wide, RuntimeError> {
    let reply = channel.round_trip(Request::Value { valueid, lo, hi }.encode())?;
    match Response::decode(&reply, lo.tag())? {
        Response::Value(v) if v.tag() == lo.tag() => Ok(v),
        Response::Rejected(status) => Err(RuntimeError::Oracle { status }),
        other => Err(RuntimeError::Protocol(format!(
            "unexpected reply to value request: {other:?}"
        ))),
    }
}

/// Tells the oracle how the run ended.
pub fn notify_termination(channel: &mut dyn Channel, success: bool) -> Result<(), RuntimeError> {
    let reply = channel.round_trip(Request::Terminate { success }.encode())?;
    match Response::decode(&reply, 0)? {
        Response::Terminal { .. } => Ok(()),
        Response::Rejected(status) => Err(RuntimeError::Oracle { status }),
        other => Err(RuntimeError::Protocol(format!(
            "unexpected reply to termination: {other:?}"
        ))),
    }
}

// ── Framing ──────────────────────────────────────────────────────────

/// Writes a part count, then each part as a length and its bytes, all
/// lengths `u32`.
pub fn write_message(w: &mut impl Write, msg: &[Vec<u8>]) -> Result<(), RuntimeError> {
    let count = u32::try_from(msg.len())
        .map_err(|_| RuntimeError::Protocol("too many parts".to_string()))?;
    w.write_all(&count.to_le_bytes())?;
    for part in msg {
        let len = u32::try_from(part.len())
            .map_err(|_| RuntimeError::Protocol("part too long".to_string()))?;
        w.write_all(&len.to_le_bytes())?;
        w.write_all(part)?;
    }
    w.flush()?;
    Ok(())
}

/// Reads one framed message; None on a clean end of stream.
pub fn read_message(r: &mut impl Read) -> Result<Option<Message>, RuntimeError> {
    let mut word = [0u8; 4];
    match r.read_exact(&mut word) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let count = u32::from_le_bytes(word) as usize;
    let mut msg = Vec::with_capacity(count.min(8));
    for _ in 0..count {
        r.read_exact(&mut word)?;
        let len = u32::from_le_bytes(word) as usize;
        if len > MAX_PART_LEN {
            return Err(RuntimeError::Protocol(format!("part of {len} bytes")));
        }
        let mut part = vec![0u8; len];
        r.read_exact(&mut part)?;
        msg.push(part);
    }
    Ok(Some(msg))
}

/// Framed messages over TCP.
pub struct TcpChannel {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl TcpChannel {
    pub fn connect(addr: &str) -> Result<Self, RuntimeError> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| RuntimeError::Protocol(format!("cannot reach oracle at {addr}: {e}")))?;
        stream.set_nodelay(true)?;
        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
        })
    }
}

impl Channel for TcpChannel {
    fn round_trip(&mut self, request: Message) -> Result<Message, RuntimeError> {
        write_message(&mut self.writer, &request)?;
        read_message(&mut self.reader)?
            .ok_or_else(|| RuntimeError::Protocol("oracle closed the connection".to_string()))
    }
}

// ── Local oracle ─────────────────────────────────────────────────────

/// In-process oracle answering with uniform random values. Validates
/// requests the way an external oracle does, including the check that one
/// execution point always asks with the same value id.
pub struct LocalOracle {
    rng: ChaCha8Rng,
    /// Value id first requested after each prefix of answered values.
    valueids: HashMap<Vec<u64>, u64>,
    /// Values answered in the current run.
    path: Vec<u64>,
    outcomes: Vec<bool>,
}

impl LocalOracle {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            valueids: HashMap::new(),
            path: Vec::new(),
            outcomes: Vec::new(),
        }
    }

    /// Success flag of every finished run, in order.
    pub fn outcomes(&self) -> &[bool] {
        &self.outcomes
    }

    pub fn process(&mut self, msg: &[Vec<u8>]) -> Message {
        let response = match Request::decode(msg) {
            Err(status) => Response::Rejected(status),
            Ok(Request::Terminate { success }) => {
                self.outcomes.push(success);
                self.path.clear();
                Response::Terminal { success }
            }
            Ok(Request::Value { valueid, lo, hi }) => self.value(valueid, lo, hi),
        };
        if let Response::Rejected(status) = response {
            debug!(status, "rejected request");
        }
        response.encode()
    }

    fn value(&mut self, valueid: u64, lo: Wide, hi: Wide) -> Response {
        if self
            .valueids
            .get(&self.path)
            .is_some_and(|&seen| seen != valueid)
        {
            return Response::Rejected(ERR_WRONG_VALUEID);
        }
        let v = match (lo, hi) {
            (Wide::I64(l), Wide::I64(h)) if l <= h => Wide::I64(i64::sample(l, h, &mut self.rng)),
            (Wide::U64(l), Wide::U64(h)) if l <= h => Wide::U64(u64::sample(l, h, &mut self.rng)),
            (Wide::F64(l), Wide::F64(h)) if l <= h => Wide::F64(f64::sample(l, h, &mut self.rng)),
            _ => return Response::Rejected(ERR_VALUE_TAKES_5),
        };
        self.valueids.insert(self.path.clone(), valueid);
        self.path.push(v.bits());
        Response::Value(v)
    }
}

impl Channel for LocalOracle {
    fn round_trip(&mut self, request: Message) -> Result<Message, RuntimeError> {
        Ok(self.process(&request))
    }
}

/// Answers framed requests on `stream` until the client disconnects.
pub fn serve(stream: TcpStream, oracle: &mut LocalOracle) -> Result<(), RuntimeError> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream);
    while let Some(msg) = read_message(&mut reader)? {
        write_message(&mut writer, &oracle.process(&msg))?;
    }
    Ok(())
}
