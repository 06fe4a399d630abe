//! The `str` primitive: subcommand dispatch on a leading symbol.

use regex::Regex;

use crate::atom::{Atom, Real};
use crate::env::Env;
use crate::error::Error;
use crate::eval::Evaluator;
use crate::interner;
use crate::ops::{args_node, check_args, index_arg};

fn replace_all(subject: &str, from: &str, to: &str) -> String {
    // An empty needle would never advance.
    if from.is_empty() {
        return subject.to_string();
    }
    let mut out = subject.to_string();
    let mut idx = 0;
    while let Some(next) = out[idx..].find(from).map(|p| p + idx) {
        out.replace_range(next..next + from.len(), to);
        idx = next + to.len();
    }
    out
}

/// `(str cmd …)` where cmd is one of:
/// `length s` — byte length as a scalar;
/// `find s sub` — byte position of the first occurrence, or -1;
/// `range s i n` — substring of up to n bytes starting at i;
/// `replace s from to` — replaces every occurrence;
/// `split s sep` — list of fields split on a single-character separator;
/// `regex s pattern` — list of the match and its capture groups, empty
/// list when the pattern does not occur.
pub fn string(args: &[Atom], _env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    let cmd = interner::sym_to_str(args[0].as_symbol()?);
    match cmd.as_str() {
        "length" => {
            let s = args[1].as_string()?;
            Ok(Atom::scalar(s.len() as Real))
        }
        "find" => {
            check_args(args, 3)?;
            let s = args[1].as_string()?;
            let sub = args[2].as_string()?;
            match s.find(&*sub) {
                Some(pos) => Ok(Atom::scalar(pos as Real)),
                None => Ok(Atom::scalar(-1.0)),
            }
        }
        "range" => {
            check_args(args, 4)?;
            let s = args[1].as_string()?;
            let start = index_arg(&args[2])?;
            let len = index_arg(&args[3])?;
            if start < 0 || len < 0 || start as usize > s.len() {
                return Err(Error::msg("[str range] invalid index", &args_node(args)));
            }
            let start = start as usize;
            let end = (start + len as usize).min(s.len());
            match s.get(start..end) {
                Some(sub) => Ok(Atom::string(sub)),
                None => Err(Error::msg("[str range] invalid index", &args_node(args))),
            }
        }
        "replace" => {
            check_args(args, 4)?;
            let s = args[1].as_string()?;
            let from = args[2].as_string()?;
            let to = args[3].as_string()?;
            Ok(Atom::string(replace_all(&s, &from, &to)))
        }
        "split" => {
            check_args(args, 3)?;
            let s = args[1].as_string()?;
            let sep = args[2].as_string()?;
            let Some(sep) = sep.chars().next() else {
                return Err(Error::msg("[str split] empty separator", &args_node(args)));
            };
            let mut fields: Vec<&str> = s.split(sep).collect();
            // A trailing separator (or empty input) yields no trailing
            // empty field.
            if s.is_empty() || s.ends_with(sep) {
                fields.pop();
            }
            Ok(Atom::list(fields.into_iter().map(Atom::string).collect()))
        }
        "regex" => {
            check_args(args, 3)?;
            let s = args[1].as_string()?;
            let pattern = args[2].as_string()?;
            let re = Regex::new(&pattern).map_err(|_| {
                Error::msg("[str regex] invalid pattern", &args_node(args))
            })?;
            match re.captures(&s) {
                Some(caps) => Ok(Atom::list(
                    caps.iter()
                        .map(|m| Atom::string(m.map_or("", |m| m.as_str())))
                        .collect(),
                )),
                None => Ok(Atom::nil()),
            }
        }
        _ => Ok(Atom::nil()),
    }
}
