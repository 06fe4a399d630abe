//! Primitive operator registry.
//!
//! Primitives are ordinary `Op` bindings seeded into the root environment,
//! so `info vars` lists them and user code can shadow a name without
//! hijacking special-form dispatch (the evaluator recognizes forms by the
//! resolved op's payload).

pub mod array;
pub mod io;
pub mod list;
pub mod string;
pub mod system;

use std::sync::Arc;

use regex::Regex;

use crate::atom::{atom_eq, Atom, Form, NativeFn, OpDef, OpKind};
use crate::env::Env;
use crate::error::Error;
use crate::eval::Evaluator;
use crate::interner;

pub fn add_op(name: &'static str, kind: OpKind, minargs: i32, env: &Env) {
    let op = Atom::Op(Arc::new(OpDef { name, minargs, kind }));
    env.define(interner::intern_sym(name), op);
}

fn add_form(name: &'static str, form: Form, minargs: i32, env: &Env) {
    add_op(name, OpKind::Form(form), minargs, env);
}

fn add_native(name: &'static str, f: NativeFn, minargs: i32, env: &Env) {
    add_op(name, OpKind::Native(f), minargs, env);
}

pub fn install_core(env: &Env) {
    // Special forms validate their own combination (-1).
    add_form("quote", Form::Quote, -1, env);
    add_form("def", Form::Def, -1, env);
    add_form("=", Form::Set, -1, env);
    add_form("lambda", Form::Lambda, -1, env);
    add_form("macro", Form::Macro, -1, env);
    add_form("if", Form::If, -1, env);
    add_form("while", Form::While, -1, env);
    add_form("begin", Form::Begin, -1, env);
    add_form("eval", Form::Eval, 1, env);
    add_form("apply", Form::Apply, 2, env);

    add_native("info", info, 1, env);

    add_native("list", list::list, 0, env);
    add_native("lappend", list::lappend, 1, env);
    add_native("lreplace", list::lreplace, 4, env);
    add_native("lrange", list::lrange, 3, env);
    add_native("lindex", list::lindex, 2, env);
    add_native("lset", list::lset, 3, env);
    add_native("llength", list::llength, 1, env);
    add_native("lshuffle", list::lshuffle, 1, env);

    add_native("array", array::array, 0, env);
    add_native("array2list", array::array2list, 1, env);
    add_native("==", eq, 2, env);
    add_native("+", array::add, 2, env);
    add_native("-", array::sub, 2, env);
    add_native("*", array::mul, 2, env);
    add_native("/", array::div, 2, env);
    add_native("<", array::less, 2, env);
    add_native("<=", array::lesseq, 2, env);
    add_native(">", array::greater, 2, env);
    add_native(">=", array::greatereq, 2, env);
    add_native("min", array::min, 1, env);
    add_native("max", array::max, 1, env);
    add_native("sum", array::sum, 1, env);
    add_native("size", array::size, 1, env);
    add_native("sin", array::sin, 1, env);
    add_native("cos", array::cos, 1, env);
    add_native("tan", array::tan, 1, env);
    add_native("asin", array::asin, 1, env);
    add_native("acos", array::acos, 1, env);
    add_native("atan", array::atan, 1, env);
    add_native("sinh", array::sinh, 1, env);
    add_native("cosh", array::cosh, 1, env);
    add_native("tanh", array::tanh, 1, env);
    add_native("log", array::log, 1, env);
    add_native("log10", array::log10, 1, env);
    add_native("sqrt", array::sqrt, 1, env);
    add_native("exp", array::exp, 1, env);
    add_native("abs", array::abs, 1, env);
    add_native("neg", array::neg, 1, env);
    add_native("floor", array::floor, 1, env);
    add_native("slice", array::slice, 3, env);
    add_native("assign", array::assign, 4, env);

    add_native("print", io::print, 1, env);
    add_native("save", io::save, 2, env);
    add_native("read", io::read, 0, env);
    add_native("str", string::string, 2, env);
    add_native("load", io::load, 1, env);
    add_native("exec", io::exec, 1, env);
    add_native("exit", io::exit, 0, env);
}

pub fn install_system(env: &Env) {
    add_native("schedule", system::schedule, 2, env);
    add_native("sleep", system::sleep, 1, env);
    add_native("clock", system::clock, 0, env);
    add_native("getvar", system::getvar, 1, env);
    add_native("addpaths", system::addpaths, 0, env);
    add_native("loadpaths", system::loadpaths, 0, env);
    add_native("savepaths", system::savepaths, 0, env);
    add_native("clearpaths", system::clearpaths, 0, env);
    add_native("udpsend", system::udpsend, 3, env);
    add_native("udprecv", system::udprecv, 2, env);
}

/// The args list, used as the offending node in primitive errors.
pub(crate) fn args_node(args: &[Atom]) -> Atom {
    Atom::list(args.to_vec())
}

/// `(== a b)` — structural equality as a 0/1 scalar.
pub fn eq(args: &[Atom], _env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    Ok(Atom::scalar(if atom_eq(&args[0], &args[1]) { 1.0 } else { 0.0 }))
}

/// `(info vars [pattern])` — bound symbols across all frames, optionally
/// filtered by a full-match regex.
/// `(info exists s…)` — 0/1 array of binding existence.
/// `(info typeof x…)` — list of kind names.
pub fn info(args: &[Atom], env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    let cmd = interner::sym_to_str(args[0].as_symbol()?);
    match cmd.as_str() {
        "vars" => {
            let pattern = if args.len() > 1 {
                args[1].as_string()?.to_string()
            } else {
                ".*".to_string()
            };
            // Anchored: the whole symbol name must match.
            let re = Regex::new(&format!("^(?:{})$", pattern))
                .map_err(|_| Error::msg("[info] invalid pattern", &args_node(args)))?;
            let mut out = Vec::new();
            for sym in env.vars() {
                if re.is_match(&interner::sym_to_str(sym)) {
                    out.push(Atom::Symbol(sym));
                }
            }
            Ok(Atom::list(out))
        }
        "exists" => {
            let mut flags = Vec::with_capacity(args.len() - 1);
            for arg in &args[1..] {
                let sym = arg.as_symbol()?;
                flags.push(if env.lookup(sym).is_ok() { 1.0 } else { 0.0 });
            }
            Ok(Atom::array(flags))
        }
        "typeof" => Ok(Atom::list(
            args[1..].iter().map(|arg| Atom::symbol(arg.kind_name())).collect(),
        )),
        _ => Err(Error::msg("[info] invalid request", &args[0])),
    }
}

pub(crate) fn check_args(
    args: &[Atom],
    required: usize,
) -> Result<(), Error> {
    if args.len() < required {
        return Err(Error::with_node(
            crate::error::ErrorKind::Arity { required, got: args.len() },
            args_node(args),
        ));
    }
    Ok(())
}

/// Converts a scalar argument to an index-sized integer.
pub(crate) fn index_arg(arg: &Atom) -> Result<i64, Error> {
    Ok(arg.scalar_value()? as i64)
}
