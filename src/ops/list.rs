//! List primitives. Lists are shared by reference: `lset`, `lappend` and
//! `lreplace` mutate their argument in place.

use rand::seq::SliceRandom;

use crate::atom::{Atom, Real};
use crate::env::Env;
use crate::error::Error;
use crate::eval::Evaluator;
use crate::ops::{args_node, index_arg};

/// `(list x…)` — a new list of the arguments in order.
pub fn list(args: &[Atom], _env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    Ok(Atom::list(args.to_vec()))
}

/// `(lindex l i)` — element at index; nil for the empty list.
pub fn lindex(args: &[Atom], _env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    let items = args[0].list_items()?;
    let index = index_arg(&args[1])?;
    if items.is_empty() {
        return Ok(Atom::nil());
    }
    if index < 0 || index as usize >= items.len() {
        return Err(Error::msg("[lindex] invalid index", &args_node(args)));
    }
    Ok(items[index as usize].clone())
}

/// `(lset l i x)` — replaces the element at index in place; returns the list.
pub fn lset(args: &[Atom], _env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    let list = args[0].as_list()?;
    let value = args[1].clone();
    let index = index_arg(&args[2])?;
    let mut items = list.lock().unwrap();
    if items.is_empty() {
        return Ok(Atom::nil());
    }
    if index < 0 || index as usize >= items.len() {
        return Err(Error::msg("[lset] invalid index", &args_node(args)));
    }
    items[index as usize] = value;
    drop(items);
    Ok(args[0].clone())
}

/// `(llength l)` — element count as a scalar.
pub fn llength(args: &[Atom], _env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    let items = args[0].list_items()?;
    Ok(Atom::scalar(items.len() as Real))
}

/// `(lappend l x…)` — appends in place; returns the list.
pub fn lappend(args: &[Atom], _env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    let list = args[0].as_list()?;
    list.lock().unwrap().extend(args[1..].iter().cloned());
    Ok(args[0].clone())
}

/// `(lrange l start len [stride])` — a new list with the selected elements;
/// the range is clamped to the list.
pub fn lrange(args: &[Atom], _env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    let items = args[0].list_items()?;
    let mut start = index_arg(&args[1])?;
    let len = index_arg(&args[2])?;
    let mut end = start + len;
    let stride = if args.len() == 4 { index_arg(&args[3])? } else { 1 };
    if stride < 1 {
        return Err(Error::msg("[lrange] invalid stride", &args_node(args)));
    }
    if start < 0 {
        start = 0;
    }
    if end > items.len() as i64 {
        end = items.len() as i64;
    }
    let mut out = Vec::new();
    let mut j = start;
    while j < end {
        out.push(items[j as usize].clone());
        j += stride;
    }
    Ok(Atom::list(out))
}

/// `(lreplace l repl start len [stride])` — overwrites a strided range of
/// `l` with consecutive elements of `repl`, in place; returns `repl`.
/// Out-of-range requests return nil without touching the list.
pub fn lreplace(args: &[Atom], _env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    let list = args[0].as_list()?;
    let repl = args[1].list_items()?;
    let start = index_arg(&args[2])?;
    let len = index_arg(&args[3])?;
    let stride = if args.len() == 5 { index_arg(&args[4])? } else { 1 };

    let mut items = list.lock().unwrap();
    if start < 0
        || len < 0
        || stride < 1
        || start + len > items.len() as i64
        || len / stride > repl.len() as i64
    {
        return Ok(Atom::nil());
    }

    let mut p = 0usize;
    let mut j = start;
    while j < start + len {
        let Some(value) = repl.get(p) else {
            return Err(Error::msg("[lreplace] invalid index", &args_node(args)));
        };
        items[j as usize] = value.clone();
        p += 1;
        j += stride;
    }
    drop(items);
    Ok(args[1].clone())
}

/// `(lshuffle l)` — a new list with the elements uniformly shuffled.
pub fn lshuffle(args: &[Atom], _env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    let mut items = args[0].list_items()?;
    items.shuffle(&mut rand::thread_rng());
    Ok(Atom::list(items))
}
