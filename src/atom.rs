use std::fmt;
use std::sync::{Arc, Mutex};

use itertools::Itertools;

use crate::env::{Env, SnapshotMap};
use crate::error::{Error, ErrorKind};
use crate::eval::Evaluator;
use crate::interner::{self, SymId};

pub type Real = f64;

pub type NativeFn = fn(&[Atom], &Env, &Evaluator) -> Result<Atom, Error>;

/// Special forms recognized by the evaluator. Dispatch goes through the
/// resolved op's payload, never through the symbol in head position, so
/// rebinding a builtin name cannot hijack a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    Quote,
    Def,
    Set,
    Lambda,
    Macro,
    If,
    While,
    Begin,
    Eval,
    Apply,
}

#[derive(Clone, Copy, PartialEq)]
pub enum OpKind {
    Form(Form),
    Native(NativeFn),
}

pub struct OpDef {
    pub name: &'static str,
    /// Minimum argument count checked before the native call; -1 means the
    /// op validates its own combination (special forms).
    pub minargs: i32,
    pub kind: OpKind,
}

/// A user-defined callable: parameter names, body forms and the captured
/// lexical environment.
pub struct Closure {
    pub params: Vec<SymId>,
    pub body: Vec<Atom>,
    pub env: Env,
}

//===----------------------------------------------------------------------===//
// Atom
//===----------------------------------------------------------------------===//

/// The universal tagged value. Lists and arrays are shared by reference and
/// mutable in place; everything else is immutable behind its handle.
#[derive(Clone)]
pub enum Atom {
    List(Arc<Mutex<Vec<Atom>>>),
    Symbol(SymId),
    Str(Arc<str>),
    Array(Arc<Mutex<Vec<Real>>>),
    Lambda(Arc<Closure>),
    Macro(Arc<Closure>),
    Op(Arc<OpDef>),
}

impl Atom {
    pub fn nil() -> Atom {
        Atom::List(Arc::new(Mutex::new(Vec::new())))
    }

    pub fn list(items: Vec<Atom>) -> Atom {
        Atom::List(Arc::new(Mutex::new(items)))
    }

    pub fn scalar(value: Real) -> Atom {
        Atom::Array(Arc::new(Mutex::new(vec![value])))
    }

    pub fn array(values: Vec<Real>) -> Atom {
        Atom::Array(Arc::new(Mutex::new(values)))
    }

    pub fn string(text: impl AsRef<str>) -> Atom {
        Atom::Str(Arc::from(text.as_ref()))
    }

    pub fn symbol(name: &str) -> Atom {
        Atom::Symbol(interner::intern_sym(name))
    }

    /// The empty list is the canonical nil value.
    pub fn is_nil(&self) -> bool {
        match self {
            Atom::List(items) => items.lock().unwrap().is_empty(),
            _ => false,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Atom::List(_) => "list",
            Atom::Symbol(_) => "symbol",
            Atom::Str(_) => "string",
            Atom::Array(_) => "array",
            Atom::Lambda(_) => "lambda",
            Atom::Macro(_) => "macro",
            Atom::Op(_) => "op",
        }
    }

    fn type_error(&self, expected: &'static str) -> Error {
        Error::with_node(
            ErrorKind::Type { expected, got: self.kind_name() },
            self.clone(),
        )
    }

    pub fn as_list(&self) -> Result<Arc<Mutex<Vec<Atom>>>, Error> {
        match self {
            Atom::List(items) => Ok(items.clone()),
            _ => Err(self.type_error("list")),
        }
    }

    /// Clones the current elements out of a list.
    pub fn list_items(&self) -> Result<Vec<Atom>, Error> {
        Ok(self.as_list()?.lock().unwrap().clone())
    }

    pub fn as_array(&self) -> Result<Arc<Mutex<Vec<Real>>>, Error> {
        match self {
            Atom::Array(values) => Ok(values.clone()),
            _ => Err(self.type_error("array")),
        }
    }

    /// Clones the numeric buffer out of an array.
    pub fn array_values(&self) -> Result<Vec<Real>, Error> {
        Ok(self.as_array()?.lock().unwrap().clone())
    }

    /// First element of an array; primitives that read `array[0]` reject
    /// empty arrays.
    pub fn scalar_value(&self) -> Result<Real, Error> {
        let values = self.as_array()?;
        let values = values.lock().unwrap();
        values.first().copied().ok_or_else(|| Error::msg("empty array", self))
    }

    pub fn as_string(&self) -> Result<Arc<str>, Error> {
        match self {
            Atom::Str(text) => Ok(text.clone()),
            _ => Err(self.type_error("string")),
        }
    }

    pub fn as_symbol(&self) -> Result<SymId, Error> {
        match self {
            Atom::Symbol(sym) => Ok(*sym),
            _ => Err(self.type_error("symbol")),
        }
    }

    pub fn as_lambda(&self) -> Result<Arc<Closure>, Error> {
        match self {
            Atom::Lambda(closure) => Ok(closure.clone()),
            _ => Err(self.type_error("lambda")),
        }
    }
}

//===----------------------------------------------------------------------===//
// Equality
//===----------------------------------------------------------------------===//

/// Structural equality. Kinds never compare equal across variants; arrays
/// compare within a 1e-6 elementwise tolerance; closures compare params and
/// body but not the captured environment; ops compare by identity.
pub fn atom_eq(a: &Atom, b: &Atom) -> bool {
    match (a.is_nil(), b.is_nil()) {
        (true, true) => return true,
        (true, false) | (false, true) => return false,
        _ => {}
    }
    match (a, b) {
        (Atom::List(xs), Atom::List(ys)) => {
            if Arc::ptr_eq(xs, ys) {
                return true;
            }
            let xs = xs.lock().unwrap().clone();
            let ys = ys.lock().unwrap().clone();
            xs.len() == ys.len()
                && xs.iter().zip(ys.iter()).all(|(x, y)| atom_eq(x, y))
        }
        (Atom::Symbol(x), Atom::Symbol(y)) => x == y,
        (Atom::Str(x), Atom::Str(y)) => x == y,
        (Atom::Array(xs), Atom::Array(ys)) => {
            let xs = xs.lock().unwrap();
            let ys = ys.lock().unwrap();
            xs.len() == ys.len()
                && xs.iter().zip(ys.iter()).all(|(x, y)| (x - y).abs() < 1e-6)
        }
        (Atom::Lambda(x), Atom::Lambda(y)) | (Atom::Macro(x), Atom::Macro(y)) => {
            x.params == y.params
                && x.body.len() == y.body.len()
                && x.body.iter().zip(y.body.iter()).all(|(f, g)| atom_eq(f, g))
        }
        (Atom::Op(x), Atom::Op(y)) => x.kind == y.kind,
        _ => false,
    }
}

//===----------------------------------------------------------------------===//
// Cloning
//===----------------------------------------------------------------------===//

impl Atom {
    /// Deep copy used by `quote`: lists and arrays get fresh buffers so list
    /// mutation cannot leak back into program source. Strings and ops are
    /// immutable and stay shared; closures copy params and body but share
    /// the captured environment.
    pub fn deep_clone(&self) -> Atom {
        match self {
            Atom::List(items) => {
                let items = items.lock().unwrap();
                Atom::list(items.iter().map(Atom::deep_clone).collect())
            }
            Atom::Array(values) => Atom::array(values.lock().unwrap().clone()),
            Atom::Symbol(_) | Atom::Str(_) | Atom::Op(_) => self.clone(),
            Atom::Lambda(c) => Atom::Lambda(Arc::new(Closure {
                params: c.params.clone(),
                body: c.body.iter().map(Atom::deep_clone).collect(),
                env: c.env.clone(),
            })),
            Atom::Macro(c) => Atom::Macro(Arc::new(Closure {
                params: c.params.clone(),
                body: c.body.iter().map(Atom::deep_clone).collect(),
                env: c.env.clone(),
            })),
        }
    }

    /// Isolation copy used by the scheduler: like `deep_clone` but captured
    /// environments are cloned too, memoized by frame identity so that
    /// self-referential closures terminate and the whole snapshot forms one
    /// independent graph.
    pub fn snapshot(&self, seen: &mut SnapshotMap) -> Atom {
        match self {
            Atom::List(items) => {
                let items = items.lock().unwrap().clone();
                Atom::list(items.iter().map(|x| x.snapshot(seen)).collect())
            }
            Atom::Array(values) => Atom::array(values.lock().unwrap().clone()),
            Atom::Symbol(_) | Atom::Str(_) | Atom::Op(_) => self.clone(),
            Atom::Lambda(c) => Atom::Lambda(Arc::new(Closure {
                params: c.params.clone(),
                body: c.body.iter().map(|x| x.snapshot(seen)).collect(),
                env: c.env.snapshot(seen),
            })),
            Atom::Macro(c) => Atom::Macro(Arc::new(Closure {
                params: c.params.clone(),
                body: c.body.iter().map(|x| x.snapshot(seen)).collect(),
                env: c.env.snapshot(seen),
            })),
        }
    }
}

//===----------------------------------------------------------------------===//
// Printing
//===----------------------------------------------------------------------===//

fn escape_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(ch),
        }
    }
    out
}

/// Renders an atom. In `write` mode the output is read-compatible: strings
/// are quoted and escaped, ops print as their registered name.
pub fn format_atom(atom: &Atom, write: bool) -> String {
    match atom {
        Atom::List(items) => {
            let items = items.lock().unwrap().clone();
            format!("({})", items.iter().map(|x| format_atom(x, write)).join(" "))
        }
        Atom::Symbol(sym) => interner::sym_to_str(*sym),
        Atom::Str(text) => {
            if write {
                format!("\"{}\"", escape_string(text))
            } else {
                text.to_string()
            }
        }
        Atom::Array(values) => {
            let values = values.lock().unwrap();
            format!("[{}]", values.iter().map(|v| v.to_string()).join(" "))
        }
        Atom::Lambda(c) | Atom::Macro(c) => {
            let head =
                if matches!(atom, Atom::Lambda(_)) { "lambda" } else { "macro" };
            let params =
                c.params.iter().map(|p| interner::sym_to_str(*p)).join(" ");
            let body = c.body.iter().map(|f| format_atom(f, write)).join(" ");
            format!("({} ({}) ({}))", head, params, body)
        }
        Atom::Op(op) => {
            if write {
                op.name.to_string()
            } else {
                format!("#<op {}>", op.name)
            }
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format_atom(self, false))
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", format_atom(self, true))
    }
}
