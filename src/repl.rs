//! Interactive REPL.
//!
//! Features:
//! - Colored output for values and errors
//! - Command history with persistence
//! - Multi-line input detection

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::reader::{Reader, Source};
use crate::runtime::Runtime;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const HISTORY_FILE: &str = ".musil-history";

pub struct REPL {
    pub runtime: Runtime,
}

impl REPL {
    pub fn new(runtime: Runtime) -> Self {
        REPL { runtime }
    }

    /// Checks if input appears to be incomplete (unclosed parens, brackets
    /// or string), so the REPL can keep reading lines.
    fn is_incomplete(&self, input: &str) -> bool {
        let mut paren_depth = 0i32;
        let mut bracket_depth = 0i32;
        let mut in_string = false;
        let mut in_comment = false;
        let mut escape_next = false;

        for c in input.chars() {
            if escape_next {
                escape_next = false;
                continue;
            }
            if in_comment {
                if c == '\n' {
                    in_comment = false;
                }
                continue;
            }

            match c {
                '\\' if in_string => escape_next = true,
                '"' => in_string = !in_string,
                ';' if !in_string => in_comment = true,
                '(' if !in_string => paren_depth += 1,
                ')' if !in_string => paren_depth -= 1,
                '[' if !in_string => bracket_depth += 1,
                ']' if !in_string => bracket_depth -= 1,
                _ => {}
            }
        }

        paren_depth > 0 || bracket_depth > 0 || in_string
    }

    fn print_welcome(&self) {
        println!(
            "{}",
            format!("[musil, version {}]", VERSION).bold().blue()
        );
        println!("music scripting language\n");
    }

    /// Evaluates every form in the input, printing each result.
    fn eval_and_print(&self, input: &str) {
        let forms = match Reader::read_str(input, Source::REPL) {
            Ok(forms) => forms,
            Err(err) => {
                eprintln!("{} {}", "error:".red().bold(), err);
                return;
            }
        };
        for form in forms {
            match self.runtime.evaluator().eval(&form, self.runtime.env()) {
                Ok(value) => {
                    println!("{}", self.colorize_output(&value.to_string()));
                }
                Err(err) => {
                    eprintln!("{} {}", "error:".red().bold(), err);
                }
            }
        }
    }

    pub fn run(&self) {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(err) => {
                eprintln!("{} {:?}", "error:".red().bold(), err);
                return;
            }
        };
        if rl.load_history(HISTORY_FILE).is_err() {}

        self.print_welcome();

        let mut input_buffer = String::new();

        'repl_loop: loop {
            let prompt = if input_buffer.is_empty() {
                ">> ".to_string()
            } else {
                format!("{} ", "..".dimmed())
            };

            match rl.readline(&prompt) {
                Ok(line) => {
                    if !input_buffer.is_empty() {
                        input_buffer.push('\n');
                    }
                    input_buffer.push_str(&line);

                    if self.is_incomplete(&input_buffer) {
                        continue 'repl_loop;
                    }

                    if let Err(err) = rl.add_history_entry(input_buffer.as_str())
                    {
                        eprintln!("{}: {:?}", "History error".red(), err);
                    }
                    if let Err(err) = rl.save_history(HISTORY_FILE) {
                        eprintln!("{}: {:?}", "Save history error".red(), err);
                    }

                    if !input_buffer.trim().is_empty() {
                        self.eval_and_print(&input_buffer);
                    }
                    input_buffer.clear();
                }
                Err(ReadlineError::Interrupted) => {
                    if !input_buffer.is_empty() {
                        println!("{}", "Input cancelled".dimmed());
                        input_buffer.clear();
                    }
                    continue 'repl_loop;
                }
                Err(ReadlineError::Eof) => break 'repl_loop,
                Err(err) => {
                    eprintln!("{} {:?}", "error:".red().bold(), err);
                    break 'repl_loop;
                }
            }
        }
    }

    /// Colorizes REPL output based on the printed shape of the value.
    fn colorize_output(&self, output: &str) -> String {
        if output == "()" {
            return output.dimmed().to_string();
        }
        if output.starts_with("#<") {
            return output.magenta().to_string();
        }
        if output.starts_with('[') {
            return output.blue().to_string();
        }
        if output.starts_with("(lambda") || output.starts_with("(macro") {
            return output.cyan().to_string();
        }
        output.to_string()
    }
}
