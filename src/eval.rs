use std::cell::RefCell;
use std::sync::Arc;

use crate::atom::{Atom, Closure, Form, OpKind};
use crate::env::Env;
use crate::error::{Error, ErrorKind};

/// Forms retained in the evaluation trace; deeper frames are not recorded.
const TRACE_LIMIT: usize = 64;

/// Result of executing a single trampoline step.
enum Step {
    /// The evaluator produced a value.
    Value(Atom),
    /// The evaluator wants to continue by tail-calling into the given form
    /// in the given environment. Closures, `if`, `while` conditions aside,
    /// `begin`, `eval` and `apply` all continue here instead of recursing,
    /// so deep tail recursion in user code cannot overflow the host stack.
    Tail { form: Atom, env: Env },
}

/// A trampoline interpreter. Evaluation never relies on the Rust call stack
/// for tail position: the loop accumulates the next form to evaluate and
/// iterates until a value is produced.
pub struct Evaluator {
    /// Stack of forms currently under evaluation, for error dumps.
    trace: RefCell<Vec<Atom>>,
}

/// Pushes a form on the evaluation trace and pops it on every exit path.
struct TraceGuard<'a> {
    evaluator: &'a Evaluator,
    tracked: bool,
}

impl<'a> TraceGuard<'a> {
    fn push(evaluator: &'a Evaluator, form: Atom) -> Self {
        let mut trace = evaluator.trace.borrow_mut();
        let tracked = trace.len() < TRACE_LIMIT;
        if tracked {
            trace.push(form);
        }
        TraceGuard { evaluator, tracked }
    }
}

impl Drop for TraceGuard<'_> {
    fn drop(&mut self) {
        if self.tracked {
            self.evaluator.trace.borrow_mut().pop();
        }
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self { trace: RefCell::new(Vec::new()) }
    }

    pub fn eval(&self, form: &Atom, env: &Env) -> Result<Atom, Error> {
        let _guard = TraceGuard::push(self, form.clone());
        let mut current_form = form.clone();
        let mut current_env = env.clone();

        loop {
            match self.eval_step(&current_form, &current_env) {
                Ok(Step::Value(value)) => return Ok(value),
                Ok(Step::Tail { form, env }) => {
                    current_form = form;
                    current_env = env;
                }
                Err(mut err) => {
                    if err.trace.is_empty() {
                        err.trace = self.trace.borrow().clone();
                    }
                    return Err(err);
                }
            }
        }
    }

    fn eval_step(&self, form: &Atom, env: &Env) -> Result<Step, Error> {
        if form.is_nil() {
            return Ok(Step::Value(Atom::nil()));
        }
        match form {
            Atom::Symbol(sym) => Ok(Step::Value(env.lookup(*sym)?)),
            Atom::List(_) => self.eval_list(form, env),
            other => Ok(Step::Value(other.clone())),
        }
    }

    fn eval_list(&self, form: &Atom, env: &Env) -> Result<Step, Error> {
        let items = form.list_items()?;
        let func = self.eval(&items[0], env)?;

        // Special forms are recognized by the resolved op's payload, never
        // by the symbol in head position.
        if let Atom::Op(op) = &func {
            if let OpKind::Form(kind) = op.kind {
                return self.eval_form(kind, form, &items, env);
            }
        }

        let is_macro = matches!(&func, Atom::Macro(_));
        let mut args = Vec::with_capacity(items.len() - 1);
        for item in &items[1..] {
            args.push(if is_macro {
                item.clone()
            } else {
                self.eval(item, env)?
            });
        }

        match &func {
            Atom::Lambda(closure) => {
                self.apply_closure(closure, false, args, form)
            }
            Atom::Macro(closure) => self.apply_closure(closure, true, args, form),
            Atom::Op(op) => {
                let OpKind::Native(native) = op.kind else {
                    // All forms were dispatched above.
                    return Err(Error::msg("function expected", form));
                };
                if op.minargs >= 0 && args.len() < op.minargs as usize {
                    return Err(Error::with_node(
                        ErrorKind::Arity {
                            required: op.minargs as usize,
                            got: args.len(),
                        },
                        Atom::list(args),
                    ));
                }
                Ok(Step::Value(native(&args, env, self)?))
            }
            _ => Err(Error::msg("function expected", form)),
        }
    }

    fn eval_form(
        &self,
        kind: Form,
        form: &Atom,
        items: &[Atom],
        env: &Env,
    ) -> Result<Step, Error> {
        match kind {
            Form::Quote => {
                self.check_form_len(form, items, 2)?;
                Ok(Step::Value(items[1].deep_clone()))
            }
            Form::Def => {
                self.check_form_len(form, items, 3)?;
                let sym = items[1].as_symbol()?;
                let value = self.eval(&items[2], env)?;
                env.define(sym, value.clone());
                Ok(Step::Value(value))
            }
            Form::Set => {
                self.check_form_len(form, items, 3)?;
                let sym = items[1].as_symbol()?;
                let value = self.eval(&items[2], env)?;
                env.set(sym, value.clone())?;
                Ok(Step::Value(value))
            }
            Form::Lambda | Form::Macro => {
                self.check_form_len(form, items, 3)?;
                let mut params = Vec::new();
                for param in items[1].list_items()? {
                    params.push(param.as_symbol()?);
                }
                let closure = Arc::new(Closure {
                    params,
                    body: items[2..].to_vec(),
                    env: env.clone(),
                });
                Ok(Step::Value(if kind == Form::Macro {
                    Atom::Macro(closure)
                } else {
                    Atom::Lambda(closure)
                }))
            }
            Form::If => {
                self.check_form_len(form, items, 3)?;
                let condition = self.eval(&items[1], env)?;
                if condition.scalar_value()? != 0.0 {
                    Ok(Step::Tail { form: items[2].clone(), env: env.clone() })
                } else if items.len() == 4 {
                    Ok(Step::Tail { form: items[3].clone(), env: env.clone() })
                } else {
                    Ok(Step::Value(Atom::nil()))
                }
            }
            Form::While => {
                self.check_form_len(form, items, 3)?;
                let mut result = Atom::nil();
                loop {
                    let condition = self.eval(&items[1], env)?;
                    if condition.scalar_value()? == 0.0 {
                        return Ok(Step::Value(result));
                    }
                    result = self.eval(&items[2], env)?;
                }
            }
            Form::Begin => {
                self.check_form_len(form, items, 2)?;
                for item in &items[1..items.len() - 1] {
                    self.eval(item, env)?;
                }
                Ok(Step::Tail {
                    form: items[items.len() - 1].clone(),
                    env: env.clone(),
                })
            }
            Form::Eval => {
                let args = self.collect_args(&items[1..], env)?;
                if args.is_empty() {
                    return Err(Error::with_node(
                        ErrorKind::Arity { required: 1, got: 0 },
                        Atom::list(args),
                    ));
                }
                Ok(Step::Tail { form: args[0].clone(), env: env.clone() })
            }
            Form::Apply => {
                let args = self.collect_args(&items[1..], env)?;
                if args.len() < 2 {
                    return Err(Error::with_node(
                        ErrorKind::Arity { required: 2, got: args.len() },
                        Atom::list(args),
                    ));
                }
                let mut combination = vec![args[0].clone()];
                combination.extend(args[1].list_items()?);
                Ok(Step::Tail {
                    form: Atom::list(combination),
                    env: env.clone(),
                })
            }
        }
    }

    /// Applies a user-defined callable. Arguments arrive already evaluated
    /// for lambdas and raw for macros; everything else is shared, including
    /// currying on under-application.
    fn apply_closure(
        &self,
        closure: &Arc<Closure>,
        is_macro: bool,
        args: Vec<Atom>,
        call_form: &Atom,
    ) -> Result<Step, Error> {
        if args.len() > closure.params.len() {
            return Err(Error::msg(
                "[lambda/macro] too many arguments",
                call_form,
            ));
        }

        // Fresh frame whose parent is the captured environment.
        let frame = Env::child(&closure.env);
        for (param, arg) in closure.params.iter().zip(args.iter()) {
            frame.define(*param, arg.clone());
        }

        if args.len() < closure.params.len() {
            // Under-application: curry by capturing the partially extended
            // frame, keeping the remaining parameters.
            let rest = Arc::new(Closure {
                params: closure.params[args.len()..].to_vec(),
                body: closure.body.clone(),
                env: frame,
            });
            return Ok(Step::Value(if is_macro {
                Atom::Macro(rest)
            } else {
                Atom::Lambda(rest)
            }));
        }

        let Some((last, init)) = closure.body.split_last() else {
            return Ok(Step::Value(Atom::nil()));
        };
        // Macro bodies are expanded (evaluated once) and the expansion is
        // evaluated again in the macro's frame; the final expansion in tail
        // position.
        for item in init {
            if is_macro {
                let expansion = self.eval(item, &frame)?;
                self.eval(&expansion, &frame)?;
            } else {
                self.eval(item, &frame)?;
            }
        }
        let tail_form =
            if is_macro { self.eval(last, &frame)? } else { last.clone() };
        Ok(Step::Tail { form: tail_form, env: frame })
    }

    fn collect_args(
        &self,
        items: &[Atom],
        env: &Env,
    ) -> Result<Vec<Atom>, Error> {
        items.iter().map(|item| self.eval(item, env)).collect()
    }

    /// Special forms validate the whole combination length.
    fn check_form_len(
        &self,
        form: &Atom,
        items: &[Atom],
        required: usize,
    ) -> Result<(), Error> {
        if items.len() < required {
            return Err(Error::with_node(
                ErrorKind::Arity { required, got: items.len() },
                form.clone(),
            ));
        }
        Ok(())
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}
