use musil::atom::{atom_eq, Atom};
use musil::error::Error;
use musil::interner;
use musil::reader::Source;
use musil::runtime::Runtime;

fn eval(runtime: &Runtime, form: &str) -> Atom {
    runtime
        .rep(form, Source::REPL)
        .unwrap_or_else(|err| panic!("failed to eval `{}`: {}", form, err))
}

fn eval_err(runtime: &Runtime, form: &str) -> Error {
    match runtime.rep(form, Source::REPL) {
        Ok(value) => panic!("expected `{}` to fail, got {}", form, value),
        Err(err) => err,
    }
}

fn assert_scalar(value: &Atom, expected: f64) {
    assert!(
        atom_eq(value, &Atom::scalar(expected)),
        "expected [{}], got {}",
        expected,
        value
    );
}

fn assert_symbol(value: &Atom, expected: &str) {
    match value {
        Atom::Symbol(sym) => assert_eq!(interner::sym_to_str(*sym), expected),
        other => panic!("expected symbol {}, got {}", expected, other),
    }
}

#[test]
fn definition_and_use() {
    let runtime = Runtime::new();
    let result = eval(&runtime, "(def x 10) (+ x 5)");
    assert_scalar(&result, 15.0);
}

#[test]
fn def_returns_the_value() {
    let runtime = Runtime::new();
    assert_scalar(&eval(&runtime, "(def x 42)"), 42.0);
}

#[test]
fn lambda_captures_lexically() {
    let runtime = Runtime::new();
    let result = eval(
        &runtime,
        "
        (def make-adder (lambda (n) (lambda (x) (+ x n))))
        (def add3 (make-adder 3))
        (add3 4)
        ",
    );
    assert_scalar(&result, 7.0);
}

#[test]
fn closure_survives_after_defining_call_returns() {
    let runtime = Runtime::new();
    eval(
        &runtime,
        "
        (def counter-value 0)
        (def make-bound (lambda (v) (lambda () v)))
        (def snapshot (make-bound 99))
        ",
    );
    assert_scalar(&eval(&runtime, "(snapshot)"), 99.0);
}

#[test]
fn deep_tail_recursion_does_not_overflow() {
    let runtime = Runtime::new();
    let result = eval(
        &runtime,
        "
        (def loop (lambda (n)
                   (if (> n 0) (loop (- n 1)) (quote done))))
        (loop 100000)
        ",
    );
    assert_symbol(&result, "done");
}

#[test]
fn macro_receives_unevaluated_arguments() {
    let runtime = Runtime::new();
    let result = eval(
        &runtime,
        "
        (def unless (macro (c body) (list (quote if) c (quote ()) body)))
        (unless 0 (quote yes))
        ",
    );
    assert_symbol(&result, "yes");
}

#[test]
fn macro_expansion_is_reevaluated() {
    let runtime = Runtime::new();
    // The expansion (+ 1 2) must be evaluated, not returned as data.
    let result = eval(
        &runtime,
        "
        (def three (macro () (list (quote +) 1 2)))
        (three)
        ",
    );
    assert_scalar(&result, 3.0);
}

#[test]
fn currying_on_under_application() {
    let runtime = Runtime::new();
    eval(&runtime, "(def add (lambda (a b) (+ a b)))");
    assert_scalar(&eval(&runtime, "((add 1) 2)"), 3.0);
    assert_scalar(&eval(&runtime, "(add 1 2)"), 3.0);
    assert_scalar(&eval(&runtime, "(== ((add 1) 2) (add 1 2))"), 1.0);
}

#[test]
fn curried_callable_remembers_bound_arguments() {
    let runtime = Runtime::new();
    let result = eval(
        &runtime,
        "
        (def add3 (lambda (a b c) (+ a b c)))
        (def add-1-2 ((add3 1) 2))
        (add-1-2 10)
        ",
    );
    assert_scalar(&result, 13.0);
}

#[test]
fn too_many_arguments_is_an_error() {
    let runtime = Runtime::new();
    eval(&runtime, "(def id (lambda (x) x))");
    let err = eval_err(&runtime, "(id 1 2)");
    assert!(err.to_string().contains("too many arguments"));
}

#[test]
fn unbound_identifier_is_an_error() {
    let runtime = Runtime::new();
    let err = eval_err(&runtime, "does-not-exist");
    assert!(err.to_string().contains("unbound identifier"));
}

#[test]
fn set_updates_the_enclosing_binding() {
    let runtime = Runtime::new();
    let result = eval(
        &runtime,
        "
        (def x 1)
        (def bump (lambda () (= x (+ x 1))))
        (bump)
        (bump)
        x
        ",
    );
    assert_scalar(&result, 3.0);
}

#[test]
fn set_of_unbound_symbol_is_an_error() {
    let runtime = Runtime::new();
    let err = eval_err(&runtime, "(= ghost 1)");
    assert!(err.to_string().contains("unbound identifier"));
}

#[test]
fn if_condition_must_be_an_array() {
    let runtime = Runtime::new();
    let err = eval_err(&runtime, "(if \"yes\" 1 2)");
    assert!(err.to_string().contains("invalid type"));
}

#[test]
fn if_without_else_returns_nil() {
    let runtime = Runtime::new();
    assert!(eval(&runtime, "(if 0 1)").is_nil());
    assert_scalar(&eval(&runtime, "(if 1 5)"), 5.0);
}

#[test]
fn while_returns_last_body_value_or_nil() {
    let runtime = Runtime::new();
    let result = eval(
        &runtime,
        "
        (def i 0)
        (while (< i 5) (= i (+ i 1)))
        ",
    );
    assert_scalar(&result, 5.0);
    assert!(eval(&runtime, "(while 0 1)").is_nil());
}

#[test]
fn begin_evaluates_in_order_and_returns_last() {
    let runtime = Runtime::new();
    let result = eval(
        &runtime,
        "
        (def x 0)
        (begin (= x 10) (+ x 1))
        ",
    );
    assert_scalar(&result, 11.0);
    assert_scalar(&eval(&runtime, "x"), 10.0);
}

#[test]
fn eval_of_quote_is_identity() {
    let runtime = Runtime::new();
    assert_scalar(&eval(&runtime, "(eval (quote (+ 1 2)))"), 3.0);
    assert_scalar(&eval(&runtime, "(== (eval (quote 7)) 7)"), 1.0);
    assert_scalar(&eval(&runtime, "(== (eval (quote \"s\")) \"s\")"), 1.0);
}

#[test]
fn apply_builds_a_combination() {
    let runtime = Runtime::new();
    eval(&runtime, "(def add (lambda (a b) (+ a b)))");
    assert_scalar(&eval(&runtime, "(apply add (list 3 4))"), 7.0);
    assert_scalar(&eval(&runtime, "(== (apply add (list 3 4)) (add 3 4))"), 1.0);
}

#[test]
fn structural_equality_over_quoted_lists() {
    let runtime = Runtime::new();
    assert_scalar(&eval(&runtime, "(== (quote (1 2 3)) (quote (1 2 3)))"), 1.0);
    assert_scalar(&eval(&runtime, "(== (quote (1 2 3)) (quote (1 2 4)))"), 0.0);
    assert_scalar(&eval(&runtime, "(== (quote a) (quote a))"), 1.0);
    assert_scalar(&eval(&runtime, "(== (quote a) \"a\")"), 0.0);
}

#[test]
fn quote_returns_a_deep_copy() {
    let runtime = Runtime::new();
    let result = eval(
        &runtime,
        "
        (def a (quote (1 2 3)))
        (def b (quote (1 2 3)))
        (lset a 0 99)
        b
        ",
    );
    assert_scalar(&eval(&runtime, "(== b (quote (1 2 3)))"), 1.0);
    assert_scalar(&result.list_items().unwrap()[0].clone(), 1.0);
}

#[test]
fn special_forms_dispatch_by_identity_not_name() {
    let runtime = Runtime::new();
    // Aliasing a form keeps it working as a form.
    let result = eval(
        &runtime,
        "
        (def my-if if)
        (my-if 1 (quote then) (quote else))
        ",
    );
    assert_symbol(&result, "then");
}

#[test]
fn non_callable_head_is_an_error() {
    let runtime = Runtime::new();
    let err = eval_err(&runtime, "(\"not-a-function\" 1)");
    assert!(err.to_string().contains("function expected"));
}

#[test]
fn errors_carry_a_stack_trace() {
    let runtime = Runtime::new();
    // argument evaluation nests, so the failing form sits several frames
    // deep (a pure tail chain would not grow the trace)
    let err = eval_err(
        &runtime,
        "
        (def inner (lambda () (+ 1 missing-symbol)))
        (def outer (lambda () (+ 1 (inner))))
        (outer)
        ",
    );
    let text = err.to_string();
    assert!(text.contains("unbound identifier"));
    assert!(text.contains("[--- stack trace ---]"));
}

#[test]
fn info_reflects_the_environment() {
    let runtime = Runtime::new();
    eval(&runtime, "(def alpha 1) (def beta 2)");
    // vars with a pattern: full-match filtering
    let vars = eval(&runtime, "(info (quote vars) \"al.*\")");
    let items = vars.list_items().unwrap();
    assert_eq!(items.len(), 1);
    assert_symbol(&items[0], "alpha");

    let exists = eval(&runtime, "(info (quote exists) (quote alpha) (quote nope))");
    assert!(atom_eq(&exists, &Atom::array(vec![1.0, 0.0])));

    let kinds = eval(
        &runtime,
        "(info (quote typeof) 1 \"s\" (quote sym) (list) (lambda (x) x))",
    );
    let kinds = kinds.list_items().unwrap();
    assert_symbol(&kinds[0], "array");
    assert_symbol(&kinds[1], "string");
    assert_symbol(&kinds[2], "symbol");
    assert_symbol(&kinds[3], "list");
    assert_symbol(&kinds[4], "lambda");
}

#[test]
fn info_unknown_subcommand_is_an_error() {
    let runtime = Runtime::new();
    let err = eval_err(&runtime, "(info (quote bogus))");
    assert!(err.to_string().contains("[info] invalid request"));
}

#[test]
fn insufficient_arguments_for_ops() {
    let runtime = Runtime::new();
    let err = eval_err(&runtime, "(+ 1)");
    assert!(err.to_string().contains("insufficient number of arguments"));
    let err = eval_err(&runtime, "(def x)");
    assert!(err.to_string().contains("insufficient number of arguments"));
}
