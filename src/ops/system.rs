//! System primitives: deferred execution, search-path persistence, UDP
//! datagrams and small process helpers.

use std::fs;
use std::net::UdpSocket;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

use crate::atom::{format_atom, Atom, Real};
use crate::env::Env;
use crate::error::{Error, ErrorKind};
use crate::eval::Evaluator;
use crate::ops::args_node;
use crate::scheduler;

static START: Lazy<Instant> = Lazy::new(Instant::now);

/// Anchors the `clock` origin to interpreter startup.
pub fn init_clock() {
    Lazy::force(&START);
}

fn home_dir() -> PathBuf {
    std::env::var("HOME").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("."))
}

fn musilrc_path() -> PathBuf {
    home_dir().join(".musilrc")
}

/// The search path every root environment starts with.
pub fn default_search_path() -> String {
    home_dir().join(".musil").display().to_string()
}

/// `(schedule thunk ms)` — applies a snapshot of the thunk in a snapshot of
/// the current environment after roughly `ms` milliseconds, on a background
/// task; returns nil immediately.
pub fn schedule(args: &[Atom], env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    args[0].as_lambda()?;
    let delay = args[1].scalar_value()?;
    if delay < 0.0 {
        return Err(Error::msg(
            "[schedule] delay must be non-negative",
            &args_node(args),
        ));
    }
    scheduler::spawn(&args[0], env, delay as u64);
    Ok(Atom::nil())
}

/// `(sleep ms)` — blocks the calling task.
pub fn sleep(args: &[Atom], _env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    let delay = args[0].scalar_value()? as i64;
    if delay > 0 {
        thread::sleep(Duration::from_millis(delay as u64));
    }
    Ok(Atom::nil())
}

/// `(clock)` — milliseconds elapsed since interpreter startup.
pub fn clock(_args: &[Atom], _env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    Ok(Atom::scalar(START.elapsed().as_millis() as Real))
}

/// `(getvar name)` — an environment variable, empty string when unset.
pub fn getvar(args: &[Atom], _env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    let name = args[0].as_string()?;
    match std::env::var(&*name) {
        Ok(value) => Ok(Atom::string(value)),
        Err(_) => Ok(Atom::string("")),
    }
}

/// `(addpaths)` — the current search paths as a list of strings;
/// `(addpaths p…)` — appends without duplication, returns the new count.
pub fn addpaths(args: &[Atom], env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    if args.is_empty() {
        return Ok(Atom::list(
            env.paths().iter().map(Atom::string).collect(),
        ));
    }
    for arg in args {
        env.add_path(&arg.as_string()?);
    }
    Ok(Atom::scalar(env.paths().len() as Real))
}

/// `(clearpaths)` — empties the search path list.
pub fn clearpaths(_args: &[Atom], env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    Ok(Atom::scalar(env.clear_paths() as Real))
}

/// `(savepaths)` — persists the search paths to `~/.musilrc`, one per line.
pub fn savepaths(_args: &[Atom], env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    let path = musilrc_path();
    let mut text = String::new();
    for p in env.paths() {
        text.push_str(&p);
        text.push('\n');
    }
    fs::write(&path, text).map_err(|_| {
        Error::with_node(
            ErrorKind::Io("cannot write on".into()),
            Atom::string(path.display().to_string()),
        )
    })?;
    Ok(Atom::scalar(env.paths().len() as Real))
}

/// `(loadpaths)` — merges `~/.musilrc` into the search paths. Lines are
/// trimmed; blank lines and `#` comments are skipped; duplicates are
/// dropped.
pub fn loadpaths(_args: &[Atom], env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    if let Ok(text) = fs::read_to_string(musilrc_path()) {
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            env.add_path(line);
        }
    }
    Ok(Atom::scalar(env.paths().len() as Real))
}

/// Pads an OSC payload to a 4-byte boundary and appends the `,` type-tag
/// terminator (itself padded to 4 bytes).
fn osc_encode(msg: &[u8]) -> Vec<u8> {
    let pad = match msg.len() % 4 {
        0 => 4,
        r => 4 - r,
    };
    let mut out = Vec::with_capacity(msg.len() + pad + 4);
    out.extend_from_slice(msg);
    out.resize(msg.len() + pad, 0);
    out.push(b',');
    out.extend_from_slice(&[0, 0, 0]);
    out
}

/// `(udpsend host port payload [osc?])` — sends one datagram with the
/// payload's display form; returns 1 on success, 0 on any socket failure.
pub fn udpsend(args: &[Atom], _env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    let host = args[0].as_string()?;
    let port = args[1].scalar_value()? as u16;
    let is_osc = if args.len() == 4 {
        args[3].scalar_value()? != 0.0
    } else {
        false
    };

    let Ok(socket) = UdpSocket::bind("0.0.0.0:0") else {
        return Ok(Atom::scalar(0.0));
    };
    let payload = format_atom(&args[2], false);
    let data = if is_osc {
        osc_encode(payload.as_bytes())
    } else {
        payload.into_bytes()
    };
    match socket.send_to(&data, (&*host, port)) {
        Ok(_) => Ok(Atom::scalar(1.0)),
        Err(_) => Ok(Atom::scalar(0.0)),
    }
}

/// `(udprecv host port)` — binds, receives one datagram (up to 4096 bytes)
/// and returns it as a string; 0 on any socket failure.
pub fn udprecv(args: &[Atom], _env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    let host = args[0].as_string()?;
    let port = args[1].scalar_value()? as u16;

    let Ok(socket) = UdpSocket::bind((&*host, port)) else {
        return Ok(Atom::scalar(0.0));
    };
    let mut buf = [0u8; 4096];
    match socket.recv_from(&mut buf) {
        Ok((received, _)) => {
            let end =
                buf[..received].iter().position(|&b| b == 0).unwrap_or(received);
            Ok(Atom::string(String::from_utf8_lossy(&buf[..end])))
        }
        Err(_) => Ok(Atom::scalar(0.0)),
    }
}
