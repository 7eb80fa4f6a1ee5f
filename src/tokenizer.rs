use log::{debug, trace};
use std::fmt::{self, Display, Formatter};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Establish,
    As,
    End,
    Calculate,
    With,
    And,
    Store,
    In,
    Transmit,
    To,
    Console,
    Secure,
    Otherwise,
    If,
    Is,
    Greater,
    Than,
    Then,
    Else,
    Integer,
    String,
    Add,
    Subtract,
    Allocate,
    Memory,
    For,
    Deallocate,
    Lock,
    Resistant,
    Execution,
    Initialize,
    Server,
    On,
    Port,
    Listen,
    Request,
    Respond,
}

impl Keyword {
    pub fn from_word(word: &[u8]) -> Option<Keyword> {
        let keyword = match word {
            b"ESTABLISH" => Keyword::Establish,
            b"AS" => Keyword::As,
            b"END" => Keyword::End,
            b"CALCULATE" => Keyword::Calculate,
            b"WITH" => Keyword::With,
            b"AND" => Keyword::And,
            b"STORE" => Keyword::Store,
            b"IN" => Keyword::In,
            b"TRANSMIT" => Keyword::Transmit,
            b"TO" => Keyword::To,
            b"CONSOLE" => Keyword::Console,
            b"SECURE" => Keyword::Secure,
            b"OTHERWISE" => Keyword::Otherwise,
            b"IF" => Keyword::If,
            b"IS" => Keyword::Is,
            b"GREATER" => Keyword::Greater,
            b"THAN" => Keyword::Than,
            b"THEN" => Keyword::Then,
            b"ELSE" => Keyword::Else,
            b"INTEGER" => Keyword::Integer,
            b"STRING" => Keyword::String,
            b"ADD" => Keyword::Add,
            b"SUBTRACT" => Keyword::Subtract,
            b"ALLOCATE" => Keyword::Allocate,
            b"MEMORY" => Keyword::Memory,
            b"FOR" => Keyword::For,
            b"DEALLOCATE" => Keyword::Deallocate,
            b"LOCK" => Keyword::Lock,
            b"RESISTANT" => Keyword::Resistant,
            b"EXECUTION" => Keyword::Execution,
            b"INITIALIZE" => Keyword::Initialize,
            b"SERVER" => Keyword::Server,
            b"ON" => Keyword::On,
            b"PORT" => Keyword::Port,
            b"LISTEN" => Keyword::Listen,
            b"REQUEST" => Keyword::Request,
            b"RESPOND" => Keyword::Respond,
            _ => return None,
        };
        Some(keyword)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Establish => "ESTABLISH",
            Keyword::As => "AS",
            Keyword::End => "END",
            Keyword::Calculate => "CALCULATE",
            Keyword::With => "WITH",
            Keyword::And => "AND",
            Keyword::Store => "STORE",
            Keyword::In => "IN",
            Keyword::Transmit => "TRANSMIT",
            Keyword::To => "TO",
            Keyword::Console => "CONSOLE",
            Keyword::Secure => "SECURE",
            Keyword::Otherwise => "OTHERWISE",
            Keyword::If => "IF",
            Keyword::Is => "IS",
            Keyword::Greater => "GREATER",
            Keyword::Than => "THAN",
            Keyword::Then => "THEN",
            Keyword::Else => "ELSE",
            Keyword::Integer => "INTEGER",
            Keyword::String => "STRING",
            Keyword::Add => "ADD",
            Keyword::Subtract => "SUBTRACT",
            Keyword::Allocate => "ALLOCATE",
            Keyword::Memory => "MEMORY",
            Keyword::For => "FOR",
            Keyword::Deallocate => "DEALLOCATE",
            Keyword::Lock => "LOCK",
            Keyword::Resistant => "RESISTANT",
            Keyword::Execution => "EXECUTION",
            Keyword::Initialize => "INITIALIZE",
            Keyword::Server => "SERVER",
            Keyword::On => "ON",
            Keyword::Port => "PORT",
            Keyword::Listen => "LISTEN",
            Keyword::Request => "REQUEST",
            Keyword::Respond => "RESPOND",
        }
    }

    /// Keywords that can open a statement. Each such statement closes with exactly one `END`.
    pub fn opens_statement(&self) -> bool {
        matches!(
            self,
            Keyword::Secure
                | Keyword::Establish
                | Keyword::Transmit
                | Keyword::Calculate
                | Keyword::Allocate
                | Keyword::Deallocate
                | Keyword::Initialize
                | Keyword::Listen
                | Keyword::Respond
        )
    }
}

impl Display for Keyword {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Keyword(Keyword),
    Identifier(String),
    Integer(i64),
    String(String),
}

impl Token {
    /// The keyword this token spells. A string literal whose text is a
    /// keyword counts, since the grammar compares token text.
    pub fn as_keyword(&self) -> Option<Keyword> {
        match self {
            Token::Keyword(k) => Some(*k),
            Token::String(s) => Keyword::from_word(s.as_bytes()),
            Token::Identifier(_) | Token::Integer(_) => None,
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(k) => write!(f, "{}", k),
            Token::Identifier(name) => write!(f, "{}", name),
            Token::Integer(n) => write!(f, "{}", n),
            Token::String(s) => write!(f, "{}", s),
        }
    }
}

enum Lexeme {
    Token(Token),
    NewLine,
    Skip,
    EOF,
}

pub fn tokenize(bytes: &[u8]) -> Result<Vec<Token>> {
    let source = String::from_utf8_lossy(bytes);
    let mut cursor = 0;
    let mut line_number = 1;
    let mut tokens = Vec::new();

    loop {
        match next_token(&source[cursor..]) {
            Ok((_, Lexeme::EOF)) => {
                debug!("tokenized {} tokens over {} lines", tokens.len(), line_number);
                return Ok(tokens);
            }
            Ok((bytes_read, Lexeme::NewLine)) => {
                cursor += bytes_read;
                line_number += 1;
            }
            Ok((bytes_read, Lexeme::Skip)) => {
                cursor += bytes_read;
            }
            Ok((bytes_read, Lexeme::Token(token))) => {
                cursor += bytes_read;
                tokens.push(token);
            }
            Err(err) => {
                debug!("{} on line {}", err, line_number);
                return Err(err);
            }
        }
    }
}

// Byte offset of the first char failing `pred`, or the end of `text`.
fn scan_while(text: &str, pred: impl Fn(char) -> bool) -> usize {
    text.char_indices()
        .find(|&(_, c)| !pred(c))
        .map_or(text.len(), |(i, _)| i)
}

fn next_token(text: &str) -> Result<(usize, Lexeme)> {
    let Some(first) = text.chars().next() else {
        return Ok((0, Lexeme::EOF));
    };

    match first {
        '\n' => return Ok((1, Lexeme::NewLine)),
        c if c.is_whitespace() => return Ok((c.len_utf8(), Lexeme::Skip)),
        // Comment runs up to, but not including, the newline so line counting stays right.
        '#' => return Ok((scan_while(text, |c| c != '\n'), Lexeme::Skip)),
        _ => {}
    }

    if first.is_alphabetic() {
        let end_byte = scan_while(text, |c| c.is_alphanumeric() || c == '_');
        let word = &text[..end_byte];
        let token = match Keyword::from_word(word.as_bytes()) {
            Some(keyword) => Token::Keyword(keyword),
            None => Token::Identifier(word.to_string()),
        };

        return Ok((end_byte, Lexeme::Token(token)));
    }

    if first.is_ascii_digit() {
        let end_byte = scan_while(text, |c| c.is_ascii_digit());
        return Ok((end_byte, Lexeme::Token(Token::Integer(text[..end_byte].parse()?))));
    }

    if first == '"' {
        let body = &text[1..];
        let end_byte = body.find('"').unwrap_or(body.len());
        let contents = body[..end_byte].to_string();

        // An unterminated string swallows the rest of the input.
        let bytes_read = (end_byte + 2).min(text.len());
        return Ok((bytes_read, Lexeme::Token(Token::String(contents))));
    }

    trace!("discarding unrecognized character {:?}", first);
    Ok((first.len_utf8(), Lexeme::Skip))
}
