//! Reading, printing and loading.
//!
//! `print` writes display forms (strings unquoted); `save` writes readable
//! forms that re-read to structurally equal atoms.

use std::fs;
use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::{self, Command};

use crate::atom::{format_atom, Atom, Real};
use crate::env::Env;
use crate::error::{Error, ErrorKind};
use crate::eval::Evaluator;
use crate::ops::args_node;
use crate::reader::{Reader, Source};

/// `(print x…)` — writes display forms to stdout, no separators, no
/// newline; returns the empty string.
pub fn print(args: &[Atom], _env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    let mut out = io::stdout().lock();
    for arg in args {
        let _ = write!(out, "{}", format_atom(arg, false));
    }
    let _ = out.flush();
    Ok(Atom::string(""))
}

/// `(save path x…)` — writes readable forms to a file.
pub fn save(args: &[Atom], _env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    let path = args[0].as_string()?;
    let mut file = File::create(&*path).map_err(|_| {
        Error::with_node(
            ErrorKind::Io("[save] cannot create output file".into()),
            args_node(args),
        )
    })?;
    for arg in &args[1..] {
        write!(file, "{}", format_atom(arg, true)).map_err(|_| {
            Error::with_node(
                ErrorKind::Io("[save] cannot write output file".into()),
                args_node(args),
            )
        })?;
    }
    Ok(Atom::string(""))
}

/// `(read)` — one form from stdin; `(read path)` — every form in the file,
/// as a list.
pub fn read(args: &[Atom], _env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    if !args.is_empty() {
        let path = args[0].as_string()?;
        let text = fs::read_to_string(&*path).map_err(|_| {
            Error::with_node(
                ErrorKind::Io("[read] cannot open input file".into()),
                args_node(args),
            )
        })?;
        let forms = Reader::read_str(&text, Source::File(PathBuf::from(&*path)))?;
        return Ok(Atom::list(forms));
    }

    // Accumulate stdin lines until one complete form parses.
    let stdin = io::stdin();
    let mut buffer = String::new();
    loop {
        let mut line = String::new();
        let bytes = stdin.lock().read_line(&mut line).map_err(|e| {
            Error::new(ErrorKind::Io(format!("[read] {}", e)))
        })?;
        if bytes == 0 {
            return Ok(Atom::nil());
        }
        buffer.push_str(&line);
        let mut reader = Reader::new(&buffer, Source::REPL);
        match reader.read_form() {
            Ok(Some(form)) => return Ok(form),
            Ok(None) => continue,
            Err(err) => match &err.kind {
                ErrorKind::Syntax(msg) if msg.starts_with("unexpected EOF") => {
                    continue;
                }
                _ => return Err(err),
            },
        }
    }
}

/// Reads and evaluates every top-level form of a file. Per-form errors are
/// reported as `[path:line] message` on stderr and loading continues; the
/// value of the last successful form is returned.
pub fn load_path(
    path: &str,
    env: &Env,
    evaluator: &Evaluator,
) -> Result<Atom, Error> {
    let text = fs::read_to_string(path).map_err(|_| {
        Error::with_node(
            ErrorKind::Io("cannot open input file".into()),
            Atom::string(path),
        )
    })?;

    let mut reader = Reader::new(&text, Source::File(PathBuf::from(path)));
    let mut result = Atom::nil();
    loop {
        let line = reader.next_form_line();
        match reader.read_form() {
            Ok(None) => break,
            Ok(Some(form)) => match evaluator.eval(&form, env) {
                Ok(value) => result = value,
                Err(err) => eprintln!("[{}:{}] {}", path, line, err),
            },
            Err(err) => eprintln!("[{}:{}] {}", path, line, err),
        }
    }
    Ok(result)
}

/// `(load path)` — see `load_path`.
pub fn load(args: &[Atom], env: &Env, ev: &Evaluator) -> Result<Atom, Error> {
    let path = args[0].as_string()?;
    load_path(&path, env, ev)
}

/// `(exec cmd)` — runs a shell command; returns its exit code.
pub fn exec(args: &[Atom], _env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    let cmd = args[0].as_string()?;
    let status = Command::new("sh").arg("-c").arg(&*cmd).status().map_err(|e| {
        Error::with_node(
            ErrorKind::Io(format!("[exec] {}", e)),
            args_node(args),
        )
    })?;
    Ok(Atom::scalar(status.code().unwrap_or(-1) as Real))
}

/// `(exit)` — terminates the interpreter.
pub fn exit(_args: &[Atom], _env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    println!();
    process::exit(0);
}
