//! ZeroMQ wire protocol (ZMTP 3.0, NULL security) for oracle links.
//!
//! [`ZmtpChannel`] is a REQ socket, so an oracle bound to a ZeroMQ REP
//! socket can answer it directly. [`serve_zmtp`] is the REP side, for
//! putting a [`LocalOracle`] behind the same transport. Each message travels
//! as an empty delimiter frame followed by its parts.

use std::io::{BufReader, BufWriter, Read, Write};
use std::net::TcpStream;

use tracing::debug;

use crate::oracle::{Channel, LocalOracle, Message, MAX_PART_LEN};
use crate::RuntimeError;

const GREETING_LEN: usize = 64;
const MECHANISM_NULL: &[u8] = b"NULL";

const FLAG_MORE: u8 = 0x01;
const FLAG_LONG: u8 = 0x02;
const FLAG_COMMAND: u8 = 0x04;

const READY: &[u8] = b"READY";
const SOCKET_TYPE: &[u8] = b"Socket-Type";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketType {
    Req,
    Rep,
}

impl SocketType {
    fn name(self) -> &'static [u8] {
        match self {
            SocketType::Req => b"REQ",
            SocketType::Rep => b"REP",
        }
    }

    fn peer(self) -> SocketType {
        match self {
            SocketType::Req => SocketType::Rep,
            SocketType::Rep => SocketType::Req,
        }
    }
}

fn protocol(msg: impl Into<String>) -> RuntimeError {
    RuntimeError::Protocol(msg.into())
}

// ── Handshake ────────────────────────────────────────────────────────

fn greeting() -> [u8; GREETING_LEN] {
    let mut g = [0u8; GREETING_LEN];
    g[0] = 0xFF;
    g[9] = 0x7F;
    g[10] = 3;
    g[12..12 + MECHANISM_NULL.len()].copy_from_slice(MECHANISM_NULL);
    g
}

fn check_greeting(g: &[u8; GREETING_LEN]) -> Result<(), RuntimeError> {
    if g[0] != 0xFF || g[9] != 0x7F {
        return Err(protocol("peer does not speak ZMTP"));
    }
    if g[10] < 3 {
        return Err(protocol(format!("peer speaks ZMTP {}.{}; 3.0 or later required", g[10], g[11])));
    }
    let mechanism = &g[12..32];
    let (name, padding) = mechanism.split_at(MECHANISM_NULL.len());
    if name != MECHANISM_NULL || padding.iter().any(|&b| b != 0) {
        return Err(protocol("peer requires a security mechanism other than NULL"));
    }
    Ok(())
}

fn ready_command(own: SocketType) -> Vec<u8> {
    let mut body = Vec::with_capacity(32);
    body.push(READY.len() as u8);
    body.extend_from_slice(READY);
    body.push(SOCKET_TYPE.len() as u8);
    body.extend_from_slice(SOCKET_TYPE);
    body.extend_from_slice(&(own.name().len() as u32).to_be_bytes());
    body.extend_from_slice(own.name());
    body
}

fn take(buf: &[u8], n: usize) -> Option<(&[u8], &[u8])> {
    (n <= buf.len()).then(|| buf.split_at(n))
}

/// The `Socket-Type` property of a READY command.
fn ready_socket_type(body: &[u8]) -> Result<Vec<u8>, RuntimeError> {
    let malformed = || protocol("malformed READY command");
    let (&name_len, rest) = body.split_first().ok_or_else(malformed)?;
    let (name, mut props) = take(rest, usize::from(name_len)).ok_or_else(malformed)?;
    if name != READY {
        return Err(protocol(format!(
            "expected READY, got {}",
            String::from_utf8_lossy(name)
        )));
    }
    while let Some((&key_len, rest)) = props.split_first() {
        let (key, rest) = take(rest, usize::from(key_len)).ok_or_else(malformed)?;
        let (len, rest) = take(rest, 4).ok_or_else(malformed)?;
        let len = u32::from_be_bytes([len[0], len[1], len[2], len[3]]) as usize;
        let (value, rest) = take(rest, len).ok_or_else(malformed)?;
        // Property names are case-insensitive.
        if key.eq_ignore_ascii_case(SOCKET_TYPE) {
            return Ok(value.to_vec());
        }
        props = rest;
    }
    Err(protocol("READY command lacks Socket-Type"))
}

/// Exchanges greetings and READY commands, checking that the peer is the
/// counterpart of `own`.
pub fn handshake(
    reader: &mut impl Read,
    writer: &mut impl Write,
    own: SocketType,
) -> Result<(), RuntimeError> {
    writer.write_all(&greeting())?;
    write_frame(writer, FLAG_COMMAND, &ready_command(own))?;
    writer.flush()?;

    let mut peer = [0u8; GREETING_LEN];
    reader.read_exact(&mut peer)?;
    check_greeting(&peer)?;
    let (flags, body) = read_frame(reader)?.ok_or_else(|| protocol("peer left during handshake"))?;
    if flags & FLAG_COMMAND == 0 {
        return Err(protocol("peer sent a message before READY"));
    }
    let socket_type = ready_socket_type(&body)?;
    if socket_type != own.peer().name() {
        return Err(protocol(format!(
            "peer is a {} socket; {} expected",
            String::from_utf8_lossy(&socket_type),
            String::from_utf8_lossy(own.peer().name())
        )));
    }
    debug!(?own, "ZMTP handshake done");
    Ok(())
}

// ── Frames ───────────────────────────────────────────────────────────

fn write_frame(w: &mut impl Write, flags: u8, body: &[u8]) -> Result<(), RuntimeError> {
    match u8::try_from(body.len()) {
        Ok(len) => w.write_all(&[flags, len])?,
        Err(_) => {
            w.write_all(&[flags | FLAG_LONG])?;
            w.write_all(&(body.len() as u64).to_be_bytes())?;
        }
    }
    w.write_all(body)?;
    Ok(())
}

/// Reads one frame; None on a clean end of stream.
fn read_frame(r: &mut impl Read) -> Result<Option<(u8, Vec<u8>)>, RuntimeError> {
    let mut flags = [0u8; 1];
    match r.read_exact(&mut flags) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let flags = flags[0];
    let len = if flags & FLAG_LONG != 0 {
        let mut size = [0u8; 8];
        r.read_exact(&mut size)?;
        u64::from_be_bytes(size)
    } else {
        let mut size = [0u8; 1];
        r.read_exact(&mut size)?;
        u64::from(size[0])
    };
    if len > MAX_PART_LEN as u64 {
        return Err(protocol(format!("frame of {len} bytes")));
    }
    let mut body = vec![0u8; len as usize];
    r.read_exact(&mut body)?;
    Ok(Some((flags, body)))
}

/// Writes the delimiter, then every part of `msg`.
pub fn write_zmtp_message(w: &mut impl Write, msg: &[Vec<u8>]) -> Result<(), RuntimeError> {
    write_frame(w, FLAG_MORE, &[])?;
    match msg.split_last() {
        Some((last, init)) => {
            for part in init {
                write_frame(w, FLAG_MORE, part)?;
            }
            write_frame(w, 0, last)?;
        }
        None => write_frame(w, 0, &[])?,
    }
    w.flush()?;
    Ok(())
}

/// Reads one message and strips its delimiter; None on a clean end of
/// stream. Commands between messages are skipped.
pub fn read_zmtp_message(r: &mut impl Read) -> Result<Option<Message>, RuntimeError> {
    let mut frames = Vec::new();
    loop {
        let Some((flags, body)) = read_frame(r)? else {
            if frames.is_empty() {
                return Ok(None);
            }
            return Err(protocol("stream ended inside a message"));
        };
        if flags & FLAG_COMMAND != 0 {
            if !frames.is_empty() {
                return Err(protocol("command inside a message"));
            }
            continue;
        }
        frames.push(body);
        if flags & FLAG_MORE == 0 {
            break;
        }
    }
    if !frames.first().is_some_and(Vec::is_empty) {
        return Err(protocol("message lacks the empty delimiter"));
    }
    Ok(Some(frames.split_off(1)))
}

// ── Sockets ──────────────────────────────────────────────────────────

/// REQ socket to an oracle listening on a ZeroMQ REP socket.
pub struct ZmtpChannel {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl ZmtpChannel {
    pub fn connect(addr: &str) -> Result<Self, RuntimeError> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| protocol(format!("cannot reach oracle at {addr}: {e}")))?;
        stream.set_nodelay(true)?;
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = BufWriter::new(stream);
        handshake(&mut reader, &mut writer, SocketType::Req)?;
        Ok(Self { reader, writer })
    }
}

impl Channel for ZmtpChannel {
    fn round_trip(&mut self, request: Message) -> Result<Message, RuntimeError> {
        write_zmtp_message(&mut self.writer, &request)?;
        read_zmtp_message(&mut self.reader)?
            .ok_or_else(|| protocol("oracle closed the connection"))
    }
}

/// Answers as a REP socket on `stream` until the client disconnects.
pub fn serve_zmtp(stream: TcpStream, oracle: &mut LocalOracle) -> Result<(), RuntimeError> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = BufWriter::new(stream);
    handshake(&mut reader, &mut writer, SocketType::Rep)?;
    while let Some(msg) = read_zmtp_message(&mut reader)? {
        write_zmtp_message(&mut writer, &oracle.process(&msg))?;
    }
    Ok(())
}
