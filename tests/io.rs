use std::fs;
use std::path::PathBuf;

use musil::atom::{atom_eq, Atom};
use musil::reader::Source;
use musil::runtime::Runtime;

fn eval(runtime: &Runtime, form: &str) -> Atom {
    runtime
        .rep(form, Source::REPL)
        .unwrap_or_else(|err| panic!("failed to eval `{}`: {}", form, err))
}

fn assert_scalar(value: &Atom, expected: f64) {
    assert!(
        atom_eq(value, &Atom::scalar(expected)),
        "expected [{}], got {}",
        expected,
        value
    );
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("musil-{}-{}", std::process::id(), name))
}

#[test]
fn save_then_load_round_trips_forms() {
    let runtime = Runtime::new();
    let path = temp_path("save-load.musil");
    let path_str = path.display().to_string();

    eval(
        &runtime,
        &format!("(save \"{}\" (quote (def answer (+ 40 2))))", path_str),
    );
    eval(&runtime, &format!("(load \"{}\")", path_str));
    assert_scalar(&eval(&runtime, "answer"), 42.0);

    fs::remove_file(&path).ok();
}

#[test]
fn save_writes_readable_strings() {
    let runtime = Runtime::new();
    let path = temp_path("save-str.musil");
    let path_str = path.display().to_string();

    eval(&runtime, &format!("(save \"{}\" \"x\\ny\")", path_str));
    let written = fs::read_to_string(&path).unwrap();
    assert_eq!(written, "\"x\\ny\"");

    // and it reads back as the same string
    eval(&runtime, &format!("(def forms (read \"{}\"))", path_str));
    assert_scalar(&eval(&runtime, "(== (lindex forms 0) \"x\\ny\")"), 1.0);

    fs::remove_file(&path).ok();
}

#[test]
fn read_returns_every_form_in_the_file() {
    let runtime = Runtime::new();
    let path = temp_path("read-forms.musil");
    fs::write(&path, "(+ 1 2) 7 (quote x)").unwrap();

    eval(
        &runtime,
        &format!("(def forms (read \"{}\"))", path.display()),
    );
    assert_scalar(&eval(&runtime, "(llength forms)"), 3.0);
    // forms are data, not evaluated
    assert_scalar(&eval(&runtime, "(llength (lindex forms 0))"), 3.0);
    assert_scalar(&eval(&runtime, "(== (lindex forms 1) 7)"), 1.0);

    fs::remove_file(&path).ok();
}

#[test]
fn load_swallows_per_form_errors_and_continues() {
    let runtime = Runtime::new();
    let path = temp_path("load-errors.musil");
    fs::write(
        &path,
        "(def before 1)\n(this-is-unbound)\n(def after 2)\n",
    )
    .unwrap();

    let result = runtime.load_file(&path.display().to_string()).unwrap();
    // the failing middle form was reported and skipped
    assert_scalar(&eval(&runtime, "before"), 1.0);
    assert_scalar(&eval(&runtime, "after"), 2.0);
    assert_scalar(&result, 2.0);

    fs::remove_file(&path).ok();
}

#[test]
fn load_of_missing_file_is_an_error() {
    let runtime = Runtime::new();
    let err = runtime.load_file("/nonexistent/musil-script.musil").unwrap_err();
    assert!(err.to_string().contains("cannot open input file"));
}

#[test]
fn print_returns_the_empty_string() {
    let runtime = Runtime::new();
    let result = eval(&runtime, "(print (quote tick))");
    match result {
        Atom::Str(text) => assert_eq!(&*text, ""),
        other => panic!("expected empty string, got {}", other),
    }
}

#[test]
fn exec_returns_the_exit_code() {
    let runtime = Runtime::new();
    assert_scalar(&eval(&runtime, "(exec \"true\")"), 0.0);
    assert_scalar(&eval(&runtime, "(exec \"exit 3\")"), 3.0);
}

#[test]
fn udpsend_delivers_a_datagram() {
    use std::net::UdpSocket;
    use std::time::Duration;

    let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
    receiver
        .set_read_timeout(Some(Duration::from_secs(3)))
        .unwrap();
    let port = receiver.local_addr().unwrap().port();

    let runtime = Runtime::new();
    assert_scalar(
        &eval(&runtime, &format!("(udpsend \"127.0.0.1\" {} \"hello\")", port)),
        1.0,
    );
    let mut buf = [0u8; 64];
    let (received, _) = receiver.recv_from(&mut buf).unwrap();
    assert_eq!(&buf[..received], b"hello");

    // OSC framing: payload padded to 4 bytes plus the type-tag terminator
    assert_scalar(
        &eval(
            &runtime,
            &format!("(udpsend \"127.0.0.1\" {} \"hello\" 1)", port),
        ),
        1.0,
    );
    let (received, _) = receiver.recv_from(&mut buf).unwrap();
    assert_eq!(&buf[..received], b"hello\0\0\0,\0\0\0");
}

#[test]
fn paths_can_be_listed_added_and_cleared() {
    let runtime = Runtime::new();
    // the default search path is present
    assert_scalar(&eval(&runtime, "(llength (addpaths))"), 1.0);
    assert_scalar(&eval(&runtime, "(addpaths \"/tmp/a\" \"/tmp/b\")"), 3.0);
    // duplicates are dropped
    assert_scalar(&eval(&runtime, "(addpaths \"/tmp/a\")"), 3.0);
    assert_scalar(&eval(&runtime, "(clearpaths)"), 0.0);
    assert_scalar(&eval(&runtime, "(llength (addpaths))"), 0.0);
}
