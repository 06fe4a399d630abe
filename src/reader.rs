use logos::Logos;
use std::{fmt, path};

use crate::atom::{Atom, Real};
use crate::error::{Error, ErrorKind};

pub type Span = logos::Span;

//===----------------------------------------------------------------------===//
// Utils
//===----------------------------------------------------------------------===//

/// Unescapes a string literal body. Handles `\n \t \r \" \\ \0`; unknown
/// escape sequences keep the backslash and the character.
fn unescape_string(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('"') => result.push('"'),
                Some('\\') => result.push('\\'),
                Some('0') => result.push('\0'),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(ch);
        }
    }

    result
}

//===----------------------------------------------------------------------===//
// Source
//===----------------------------------------------------------------------===//

#[derive(Debug, PartialEq, Clone)]
pub enum Source {
    File(path::PathBuf),
    REPL,
}

impl Source {
    pub fn display(&self) -> String {
        match self {
            Source::File(path) => path.display().to_string(),
            Source::REPL => "REPL".to_string(),
        }
    }
}

//===----------------------------------------------------------------------===//
// Token
//
// Uses the logos crate for tokenization: flat byte-class rules, no
// hand-rolled state machine.
//===----------------------------------------------------------------------===//

#[derive(Logos, Debug, PartialEq, Clone)]
pub enum Token {
    // Whitespace is ignored; line numbers are derived from spans later.
    #[regex(r"[ \t\r\n]+", logos::skip)]
    // Line comments: from ; to end-of-line.
    #[regex(r";[^\n]*", logos::skip)]
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    // Quote sugar: 'X reads as (quote X).
    #[token("'")]
    Quote,

    // String: accept any escaped char inside the quotes.
    #[regex(r#""([^"\\]|\\.)*""#,
      callback = |lex| {
        let slice = lex.slice();
        unescape_string(&slice[1..slice.len() - 1])
      })]
    Str(String),

    // A " that runs to EOF without a closing quote.
    #[regex(r#""([^"\\]|\\.)*"#, priority = 0)]
    UnterminatedStr,

    // Everything else between delimiters is a word; the reader classifies a
    // word as number or symbol by attempting a numeric parse, like the
    // original stream-based tokenizer.
    #[regex(r#"[^ \t\r\n()\[\];'"]+"#,
      callback = |lex| lex.slice().to_owned())]
    Word(String),
}

#[derive(Debug, Clone)]
struct SpannedToken {
    token: Token,
    span: Span,
}

//===----------------------------------------------------------------------===//
// Reader
//===----------------------------------------------------------------------===//

/// Converts source text into atoms, one top-level form per `read_form`
/// call; `Ok(None)` signals clean end of input.
#[derive(Debug)]
pub struct Reader {
    tokens: Vec<SpannedToken>,
    source: String,
    position: usize,
    file: Source,
}

impl Reader {
    pub fn new(source: &str, file: Source) -> Self {
        let mut lexer = Token::lexer(source);
        let mut tokens = Vec::new();

        while let Some(token) = lexer.next() {
            if let Ok(token) = token {
                tokens.push(SpannedToken { token, span: lexer.span() });
            }
        }

        Reader { tokens, source: source.to_string(), position: 0, file }
    }

    /// Reads every top-level form from `source`.
    pub fn read_str(source: &str, file: Source) -> Result<Vec<Atom>, Error> {
        let mut reader = Reader::new(source, file);
        let mut forms = Vec::new();
        while let Some(form) = reader.read_form()? {
            forms.push(form);
        }
        Ok(forms)
    }

    pub fn file(&self) -> &Source {
        &self.file
    }

    /// Line of a byte offset; lines advance on `\n` only.
    fn line_of(&self, byte: usize) -> usize {
        let byte = byte.min(self.source.len());
        self.source[..byte].matches('\n').count() + 1
    }

    /// Line of the next unread token, for load-time error prefixes.
    pub fn next_form_line(&self) -> usize {
        match self.tokens.get(self.position) {
            Some(st) => self.line_of(st.span.start),
            None => self.line_of(self.source.len()),
        }
    }

    fn next_token(&mut self) -> Option<SpannedToken> {
        let token = self.tokens.get(self.position).cloned()?;
        self.position += 1;
        Some(token)
    }

    pub fn read_form(&mut self) -> Result<Option<Atom>, Error> {
        let Some(st) = self.next_token() else {
            return Ok(None);
        };
        match st.token {
            Token::LParen => self.read_list().map(Some),
            Token::LBracket => self.read_array().map(Some),
            Token::RParen => {
                Err(Error::new(ErrorKind::Syntax("unexpected ')'".into())))
            }
            Token::RBracket => {
                Err(Error::new(ErrorKind::Syntax("unexpected ']'".into())))
            }
            Token::Quote => match self.read_form()? {
                Some(quoted) => {
                    Ok(Some(Atom::list(vec![Atom::symbol("quote"), quoted])))
                }
                None => Err(Error::new(ErrorKind::Syntax(
                    "unexpected EOF after quote".into(),
                ))),
            },
            Token::Str(text) => Ok(Some(Atom::string(text))),
            Token::UnterminatedStr => Err(Error::new(ErrorKind::Lexical(
                "unterminated string literal".into(),
            ))),
            Token::Word(word) => Ok(Some(classify_word(&word))),
        }
    }

    fn read_list(&mut self) -> Result<Atom, Error> {
        let mut items = Vec::new();
        loop {
            match self.tokens.get(self.position).map(|st| st.token.clone()) {
                None => {
                    return Err(Error::with_node(
                        ErrorKind::Syntax("unexpected EOF while reading list".into()),
                        Atom::list(items),
                    ));
                }
                Some(Token::RParen) => {
                    self.position += 1;
                    return Ok(Atom::list(items));
                }
                Some(_) => match self.read_form()? {
                    Some(form) => items.push(form),
                    None => unreachable!("peeked token exists"),
                },
            }
        }
    }

    /// `[n …]` — a numeric array literal, as produced by write-mode printing.
    fn read_array(&mut self) -> Result<Atom, Error> {
        let mut values: Vec<Real> = Vec::new();
        loop {
            match self.tokens.get(self.position).map(|st| st.token.clone()) {
                None => {
                    return Err(Error::with_node(
                        ErrorKind::Syntax(
                            "unexpected EOF while reading array".into(),
                        ),
                        Atom::array(values),
                    ));
                }
                Some(Token::RBracket) => {
                    self.position += 1;
                    return Ok(Atom::array(values));
                }
                Some(Token::Word(word)) => match word.parse::<Real>() {
                    Ok(value) => {
                        self.position += 1;
                        values.push(value);
                    }
                    Err(_) => {
                        return Err(Error::with_node(
                            ErrorKind::Syntax("invalid array literal".into()),
                            Atom::symbol(&word),
                        ));
                    }
                },
                Some(_) => {
                    return Err(Error::with_node(
                        ErrorKind::Syntax("invalid array literal".into()),
                        Atom::array(values),
                    ));
                }
            }
        }
    }
}

/// A word that parses as a real number is a numeric literal (length-1
/// array); everything else is a symbol.
fn classify_word(word: &str) -> Atom {
    match word.parse::<Real>() {
        Ok(value) => Atom::scalar(value),
        Err(_) => Atom::symbol(word),
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Quote => write!(f, "'"),
            Token::Str(s) => write!(f, "{}", s),
            Token::UnterminatedStr => write!(f, "\""),
            Token::Word(w) => write!(f, "{}", w),
        }
    }
}
