use crate::atom::Atom;
use crate::env::Env;
use crate::error::Error;
use crate::eval::Evaluator;
use crate::ops;
use crate::reader::{Reader, Source};

/// One interpreter instance: the root environment seeded with every
/// primitive op, and the evaluator that runs forms against it.
pub struct Runtime {
    evaluator: Evaluator,
    env: Env,
}

impl Runtime {
    pub fn new() -> Self {
        let env = Env::root();
        ops::install_core(&env);
        ops::install_system(&env);
        env.add_path(&ops::system::default_search_path());
        ops::system::init_clock();
        Runtime { evaluator: Evaluator::new(), env }
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Reads every top-level form in `input` and evaluates them in order,
    /// returning the last value (nil for empty input).
    pub fn rep(&self, input: &str, file: Source) -> Result<Atom, Error> {
        let forms = Reader::read_str(input, file)?;
        let mut result = Atom::nil();
        for form in forms {
            result = self.evaluator.eval(&form, &self.env)?;
        }
        Ok(result)
    }

    /// Loads a script file; per-form errors are printed and swallowed, an
    /// unreadable file is an error.
    pub fn load_file(&self, path: &str) -> Result<Atom, Error> {
        ops::io::load_path(path, &self.env, &self.evaluator)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
