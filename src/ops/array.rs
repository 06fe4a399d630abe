//! Numeric array primitives: construction, slicing, broadcasting
//! arithmetic, chained comparisons, reductions and elementwise maps.
//!
//! Broadcasting rule: a length-1 operand broadcasts to the other operand's
//! length; equal lengths combine elementwise; any other combination is an
//! error.

use crate::atom::{Atom, Real};
use crate::env::Env;
use crate::error::Error;
use crate::eval::Evaluator;
use crate::ops::{args_node, index_arg};

fn flatten_into(
    items: &[Atom],
    out: &mut Vec<Real>,
    container: &Atom,
) -> Result<(), Error> {
    for item in items {
        match item {
            Atom::List(_) => flatten_into(&item.list_items()?, out, container)?,
            Atom::Array(values) => {
                out.extend(values.lock().unwrap().iter().copied());
            }
            _ => return Err(Error::msg("numeric or list expected", container)),
        }
    }
    Ok(())
}

/// `(array x…)` — flattens numbers and (nested) lists of numbers into one
/// array.
pub fn array(args: &[Atom], _env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    let mut out = Vec::new();
    flatten_into(args, &mut out, &args_node(args))?;
    Ok(Atom::array(out))
}

/// `(array2list a)` — scalars of the array as a list; a length-1 array
/// collapses to its single scalar.
pub fn array2list(
    args: &[Atom],
    _env: &Env,
    _ev: &Evaluator,
) -> Result<Atom, Error> {
    let values = args[0].array_values()?;
    let mut items: Vec<Atom> = values.iter().map(|&v| Atom::scalar(v)).collect();
    if items.len() == 1 {
        return Ok(items.swap_remove(0));
    }
    Ok(Atom::list(items))
}

/// `(slice a start len [stride])` — a new array with the selected elements;
/// the count is clamped to what the source can provide.
pub fn slice(args: &[Atom], _env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    let input = args[0].array_values()?;
    let start = index_arg(&args[1])?;
    let len = index_arg(&args[2])?;
    let stride = if args.len() == 4 { index_arg(&args[3])? } else { 1 };
    if start < 0 || len < 1 || stride < 1 {
        return Err(Error::msg("[slice] invalid indexing", &args_node(args)));
    }
    let mut out = Vec::new();
    let mut j = start as usize;
    while j < input.len() && (out.len() as i64) < len {
        out.push(input[j]);
        j += stride as usize;
    }
    Ok(Atom::array(out))
}

/// `(assign dst src start len [stride])` — writes `src` over a strided
/// range of `dst`, in place; returns a copy of the updated array.
pub fn assign(args: &[Atom], _env: &Env, _ev: &Evaluator) -> Result<Atom, Error> {
    let dst = args[0].as_array()?;
    let src = args[1].array_values()?;
    let start = index_arg(&args[2])?;
    let len = index_arg(&args[3])?;
    let stride = if args.len() == 5 { index_arg(&args[4])? } else { 1 };
    if start < 0 || len < 1 || stride < 1 {
        return Err(Error::msg("[assign] invalid indexing", &args_node(args)));
    }

    let mut values = dst.lock().unwrap();
    let mut count = 0usize;
    let mut j = start as usize;
    while j < values.len() && (count as i64) < len {
        j += stride as usize;
        count += 1;
    }
    if src.len() != count {
        return Err(Error::msg(
            "[assign] incompatible array sizes",
            &args_node(args),
        ));
    }
    let mut j = start as usize;
    for &value in &src {
        values[j] = value;
        j += stride as usize;
    }
    Ok(Atom::array(values.clone()))
}

fn broadcast_binop(
    args: &[Atom],
    name: &str,
    f: fn(Real, Real) -> Real,
) -> Result<Atom, Error> {
    let mut res = args[0].array_values()?;
    for arg in &args[1..] {
        let other = arg.array_values()?;
        if other.len() == 1 {
            let s = other[0];
            for x in res.iter_mut() {
                *x = f(*x, s);
            }
        } else if res.len() == 1 {
            let s = res[0];
            res = other.iter().map(|&y| f(s, y)).collect();
        } else if res.len() == other.len() {
            for (x, &y) in res.iter_mut().zip(other.iter()) {
                *x = f(*x, y);
            }
        } else {
            return Err(Error::msg(
                format!(
                    "[{}] incompatible array sizes ({} vs {})",
                    name,
                    res.len(),
                    other.len()
                ),
                &args_node(args),
            ));
        }
    }
    Ok(Atom::array(res))
}

macro_rules! arith_op {
    ($name:ident, $sym:literal, $f:expr) => {
        pub fn $name(
            args: &[Atom],
            _env: &Env,
            _ev: &Evaluator,
        ) -> Result<Atom, Error> {
            broadcast_binop(args, $sym, $f)
        }
    };
}

arith_op!(add, "+", |a, b| a + b);
arith_op!(sub, "-", |a, b| a - b);
arith_op!(mul, "*", |a, b| a * b);
arith_op!(div, "/", |a, b| a / b);

/// Chained comparison: each adjacent pair produces a 0/1 array; the chain
/// short-circuits as soon as one pairwise result is all-false, and the last
/// computed result is returned.
fn compare_chain(
    args: &[Atom],
    name: &str,
    f: fn(Real, Real) -> bool,
) -> Result<Atom, Error> {
    let mut res: Vec<Real> = Vec::new();
    for pair in args.windows(2) {
        let a = pair[0].array_values()?;
        let b = pair[1].array_values()?;
        res = if b.len() == 1 {
            let s = b[0];
            a.iter().map(|&x| if f(x, s) { 1.0 } else { 0.0 }).collect()
        } else if a.len() == 1 {
            let s = a[0];
            b.iter().map(|&y| if f(s, y) { 1.0 } else { 0.0 }).collect()
        } else if a.len() == b.len() {
            a.iter()
                .zip(b.iter())
                .map(|(&x, &y)| if f(x, y) { 1.0 } else { 0.0 })
                .collect()
        } else {
            return Err(Error::msg(
                format!(
                    "[{}] incompatible array sizes ({} vs {})",
                    name,
                    a.len(),
                    b.len()
                ),
                &args_node(args),
            ));
        };
        if res.iter().all(|&v| v == 0.0) {
            break;
        }
    }
    Ok(Atom::array(res))
}

macro_rules! cmp_op {
    ($name:ident, $sym:literal, $f:expr) => {
        pub fn $name(
            args: &[Atom],
            _env: &Env,
            _ev: &Evaluator,
        ) -> Result<Atom, Error> {
            compare_chain(args, $sym, $f)
        }
    };
}

cmp_op!(less, "<", |a, b| a < b);
cmp_op!(lesseq, "<=", |a, b| a <= b);
cmp_op!(greater, ">", |a, b| a > b);
cmp_op!(greatereq, ">=", |a, b| a >= b);

macro_rules! reduce_op {
    ($name:ident, $f:expr) => {
        /// Variadic reduction: one result element per argument array.
        pub fn $name(
            args: &[Atom],
            _env: &Env,
            _ev: &Evaluator,
        ) -> Result<Atom, Error> {
            let mut out = Vec::with_capacity(args.len());
            for arg in args {
                let values = arg.array_values()?;
                out.push($f(&values, arg)?);
            }
            Ok(Atom::array(out))
        }
    };
}

reduce_op!(min, |v: &[Real], arg: &Atom| v
    .iter()
    .copied()
    .reduce(Real::min)
    .ok_or_else(|| Error::msg("[min] empty array", arg)));
reduce_op!(max, |v: &[Real], arg: &Atom| v
    .iter()
    .copied()
    .reduce(Real::max)
    .ok_or_else(|| Error::msg("[max] empty array", arg)));
reduce_op!(sum, |v: &[Real], _arg: &Atom| Ok::<Real, Error>(v.iter().sum()));
reduce_op!(size, |v: &[Real], _arg: &Atom| Ok::<Real, Error>(v.len() as Real));

fn map_elementwise(args: &[Atom], f: fn(Real) -> Real) -> Result<Atom, Error> {
    let mut results = Vec::with_capacity(args.len());
    for arg in args {
        let values = arg.array_values()?;
        results.push(Atom::array(values.into_iter().map(f).collect()));
    }
    if results.len() == 1 {
        return Ok(results.swap_remove(0));
    }
    Ok(Atom::list(results))
}

macro_rules! elementwise_op {
    ($name:ident, $f:expr) => {
        /// Elementwise map; a single argument yields an array, several
        /// arguments yield a list of arrays.
        pub fn $name(
            args: &[Atom],
            _env: &Env,
            _ev: &Evaluator,
        ) -> Result<Atom, Error> {
            map_elementwise(args, $f)
        }
    };
}

elementwise_op!(sin, Real::sin);
elementwise_op!(cos, Real::cos);
elementwise_op!(tan, Real::tan);
elementwise_op!(asin, Real::asin);
elementwise_op!(acos, Real::acos);
elementwise_op!(atan, Real::atan);
elementwise_op!(sinh, Real::sinh);
elementwise_op!(cosh, Real::cosh);
elementwise_op!(tanh, Real::tanh);
elementwise_op!(log, Real::ln);
elementwise_op!(log10, Real::log10);
elementwise_op!(sqrt, Real::sqrt);
elementwise_op!(exp, Real::exp);
elementwise_op!(abs, Real::abs);
elementwise_op!(neg, |x| -x);
elementwise_op!(floor, Real::floor);
