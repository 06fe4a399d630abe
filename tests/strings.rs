use musil::atom::{atom_eq, Atom};
use musil::error::Error;
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

fn assert_string(value: &Atom, expected: &str) {
    match value {
        Atom::Str(text) => assert_eq!(&**text, expected),
        other => panic!("expected string {:?}, got {}", expected, other),
    }
}

#[test]
fn length_counts_bytes() {
    let runtime = Runtime::new();
    assert_scalar(&eval(&runtime, "(str (quote length) \"hello\")"), 5.0);
    assert_scalar(&eval(&runtime, "(str (quote length) \"\")"), 0.0);
    // escapes decode at read time
    assert_scalar(&eval(&runtime, "(str (quote length) \"a\\nb\")"), 3.0);
}

#[test]
fn find_returns_position_or_minus_one() {
    let runtime = Runtime::new();
    assert_scalar(&eval(&runtime, "(str (quote find) \"banana\" \"nan\")"), 2.0);
    assert_scalar(&eval(&runtime, "(str (quote find) \"banana\" \"xyz\")"), -1.0);
}

#[test]
fn range_takes_a_substring() {
    let runtime = Runtime::new();
    assert_string(&eval(&runtime, "(str (quote range) \"abcdef\" 1 3)"), "bcd");
    // length clamps to the end of the string
    assert_string(&eval(&runtime, "(str (quote range) \"abc\" 1 10)"), "bc");
    let err = eval_err(&runtime, "(str (quote range) \"abc\" 7 1)");
    assert!(err.to_string().contains("invalid index"));
}

#[test]
fn replace_substitutes_every_occurrence() {
    let runtime = Runtime::new();
    assert_string(
        &eval(&runtime, "(str (quote replace) \"a-b-c\" \"-\" \"+\")"),
        "a+b+c",
    );
    assert_string(
        &eval(&runtime, "(str (quote replace) \"aaa\" \"aa\" \"b\")"),
        "ba",
    );
    // an empty needle leaves the subject unchanged
    assert_string(
        &eval(&runtime, "(str (quote replace) \"abc\" \"\" \"x\")"),
        "abc",
    );
}

#[test]
fn split_on_a_single_character() {
    let runtime = Runtime::new();
    eval(&runtime, "(def parts (str (quote split) \"a,b,c\" \",\"))");
    assert_scalar(&eval(&runtime, "(llength parts)"), 3.0);
    assert_string(&eval(&runtime, "(lindex parts 1)"), "b");
    // a trailing separator yields no trailing empty field
    assert_scalar(
        &eval(&runtime, "(llength (str (quote split) \"a,b,\" \",\"))"),
        2.0,
    );
    // interior empty fields survive
    assert_scalar(
        &eval(&runtime, "(llength (str (quote split) \"a,,b\" \",\"))"),
        3.0,
    );
    assert_scalar(
        &eval(&runtime, "(llength (str (quote split) \"\" \",\"))"),
        0.0,
    );
}

#[test]
fn regex_returns_match_and_groups() {
    let runtime = Runtime::new();
    eval(
        &runtime,
        "(def m (str (quote regex) \"note-42\" \"([a-z]+)-([0-9]+)\"))",
    );
    assert_scalar(&eval(&runtime, "(llength m)"), 3.0);
    assert_string(&eval(&runtime, "(lindex m 0)"), "note-42");
    assert_string(&eval(&runtime, "(lindex m 1)"), "note");
    assert_string(&eval(&runtime, "(lindex m 2)"), "42");
    // no match: empty list
    assert!(eval(&runtime, "(str (quote regex) \"abc\" \"[0-9]+\")").is_nil());
}

#[test]
fn regex_rejects_bad_patterns() {
    let runtime = Runtime::new();
    let err = eval_err(&runtime, "(str (quote regex) \"abc\" \"(\")");
    assert!(err.to_string().contains("invalid pattern"));
}

#[test]
fn unknown_subcommand_yields_nil() {
    let runtime = Runtime::new();
    assert!(eval(&runtime, "(str (quote bogus) \"x\")").is_nil());
}

#[test]
fn subcommands_validate_their_arity() {
    let runtime = Runtime::new();
    let err = eval_err(&runtime, "(str (quote find) \"abc\")");
    assert!(err.to_string().contains("insufficient number of arguments"));
}
