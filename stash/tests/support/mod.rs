//! In-process RESP2 server holding hashes in memory.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use stash::{PoolConfig, StoreConfig};

type Buckets = HashMap<Vec<u8>, HashMap<Vec<u8>, Vec<u8>>>;

/// How the server answers `PING`.
#[derive(Debug, Clone, Copy)]
pub enum PingReply {
    Simple(&'static str),
    Bulk(&'static str),
    Error(&'static str),
}

struct Shared {
    buckets: Mutex<Buckets>,
    ping: Mutex<PingReply>,
}

pub struct FakeServer {
    addr: String,
    shared: Arc<Shared>,
}

impl FakeServer {
    /// Binds an ephemeral port and serves every accepted connection on its own thread.
    pub fn spawn() -> Self {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr").to_string();
        let shared = Arc::new(Shared {
            buckets: Mutex::new(HashMap::new()),
            ping: Mutex::new(PingReply::Simple("PONG")),
        });

        let accept_shared = shared.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let conn_shared = accept_shared.clone();
                thread::spawn(move || serve(stream, conn_shared));
            }
        });

        FakeServer { addr, shared }
    }

    pub fn addr(&self) -> String {
        self.addr.clone()
    }

    pub fn set_ping_reply(&self, reply: PingReply) {
        *self.shared.ping.lock().expect("ping lock") = reply;
    }

    /// Store configuration small enough to make pool counters predictable.
    pub fn config(&self) -> StoreConfig {
        StoreConfig {
            addr: self.addr(),
            pool: test_pool_config(),
        }
    }
}

pub fn test_pool_config() -> PoolConfig {
    PoolConfig {
        max_idle: 0,
        max_active: 4,
        connection_timeout: Duration::from_millis(500),
        ..PoolConfig::default()
    }
}

/// Returns an address nothing is listening on.
pub fn unreachable_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();
    drop(listener);
    addr
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn serve(stream: TcpStream, shared: Arc<Shared>) {
    let mut writer = stream.try_clone().expect("clone");
    let mut reader = BufReader::new(stream);
    while let Ok(Some(args)) = read_command(&mut reader) {
        dispatch(&args, &shared, &mut writer);
    }
}

fn dispatch(args: &[Vec<u8>], shared: &Shared, stream: &mut TcpStream) {
    let name = args[0].to_ascii_uppercase();
    match (name.as_slice(), args.len()) {
        (b"PING", 1) => match *shared.ping.lock().expect("ping lock") {
            PingReply::Simple(text) => write_simple(stream, text),
            PingReply::Bulk(text) => write_bulk(stream, Some(text.as_bytes())),
            PingReply::Error(text) => write_error(stream, text),
        },
        (b"HGET", 3) => {
            let buckets = shared.buckets.lock().expect("buckets lock");
            let value = buckets.get(&args[1]).and_then(|fields| fields.get(&args[2]));
            write_bulk(stream, value.map(Vec::as_slice));
        }
        (b"HSET", 4) => {
            let mut buckets = shared.buckets.lock().expect("buckets lock");
            let fields = buckets.entry(args[1].clone()).or_default();
            let created = fields.insert(args[2].clone(), args[3].clone()).is_none();
            write_integer(stream, created as i64);
        }
        (b"HDEL", 3) => {
            let mut buckets = shared.buckets.lock().expect("buckets lock");
            let removed = buckets
                .get_mut(&args[1])
                .and_then(|fields| fields.remove(&args[2]))
                .is_some();
            write_integer(stream, removed as i64);
        }
        _ => write_error(stream, "ERR unknown command"),
    }
}

fn read_command(reader: &mut BufReader<TcpStream>) -> std::io::Result<Option<Vec<Vec<u8>>>> {
    let mut line = Vec::new();
    if read_line(reader, &mut line)?.is_none() {
        return Ok(None);
    }
    if line.first() != Some(&b'*') {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "expected array"));
    }
    let count = parse_usize(&line[1..])?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        read_line(reader, &mut line)?
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof"))?;
        if line.first() != Some(&b'$') {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "expected bulk"));
        }
        let len = parse_usize(&line[1..])?;
        let mut data = vec![0u8; len];
        reader.read_exact(&mut data)?;
        let mut crlf = [0u8; 2];
        reader.read_exact(&mut crlf)?;
        if crlf != [b'\r', b'\n'] {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "missing crlf"));
        }
        args.push(data);
    }
    if args.is_empty() {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "empty command"));
    }
    Ok(Some(args))
}

fn read_line(reader: &mut BufReader<TcpStream>, buf: &mut Vec<u8>) -> std::io::Result<Option<()>> {
    buf.clear();
    let bytes = reader.read_until(b'\n', buf)?;
    if bytes == 0 {
        return Ok(None);
    }
    if buf.len() < 2 || buf[buf.len() - 2] != b'\r' {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "invalid line"));
    }
    buf.truncate(buf.len() - 2);
    Ok(Some(()))
}

fn parse_usize(data: &[u8]) -> std::io::Result<usize> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidData, "length"))
}

fn write_simple(stream: &mut TcpStream, msg: &str) {
    let _ = write!(stream, "+{}\r\n", msg);
    let _ = stream.flush();
}

fn write_error(stream: &mut TcpStream, msg: &str) {
    let _ = write!(stream, "-{}\r\n", msg);
    let _ = stream.flush();
}

fn write_bulk(stream: &mut TcpStream, data: Option<&[u8]>) {
    match data {
        Some(data) => {
            let _ = write!(stream, "${}\r\n", data.len());
            let _ = stream.write_all(data);
            let _ = stream.write_all(b"\r\n");
        }
        None => {
            let _ = stream.write_all(b"$-1\r\n");
        }
    }
    let _ = stream.flush();
}

fn write_integer(stream: &mut TcpStream, value: i64) {
    let _ = write!(stream, ":{}\r\n", value);
    let _ = stream.flush();
}
