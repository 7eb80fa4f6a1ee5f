use crate::{
    error::{parser_error, Result},
    tokenizer::{Keyword, Token},
};
use log::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Allocate,
    Deallocate,
    Secure {
        body: Vec<Stmt>,
        otherwise: Vec<Stmt>,
    },
    Establish {
        name: String,
        kind: DeclaredKind,
        value: Operand,
        resistant: bool,
    },
    Transmit {
        target: Operand,
    },
    Calculate {
        op: CalcOp,
        left: Operand,
        right: Operand,
        dest: String,
    },
    InitializeServer {
        port: Operand,
    },
    ListenRequest {
        store: String,
    },
    Respond {
        message: Operand,
    },
}

impl Stmt {
    /// The keyword that opens this statement.
    pub fn keyword(&self) -> Keyword {
        match self {
            Stmt::Allocate => Keyword::Allocate,
            Stmt::Deallocate => Keyword::Deallocate,
            Stmt::Secure { .. } => Keyword::Secure,
            Stmt::Establish { .. } => Keyword::Establish,
            Stmt::Transmit { .. } => Keyword::Transmit,
            Stmt::Calculate { .. } => Keyword::Calculate,
            Stmt::InitializeServer { .. } => Keyword::Initialize,
            Stmt::ListenRequest { .. } => Keyword::Listen,
            Stmt::Respond { .. } => Keyword::Respond,
        }
    }
}

/// A single-token argument. Whether a `Name` refers to a variable is only
/// known once the program runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Integer(i64),
    String(String),
    Name(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredKind {
    Integer,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcOp {
    Add,
    Subtract,
}

impl CalcOp {
    pub fn verb(&self) -> &'static str {
        match self {
            CalcOp::Add => "add",
            CalcOp::Subtract => "subtract",
        }
    }
}

pub fn parse(tokens: &[Token]) -> Result<Vec<Stmt>> {
    let mut consumed = 0;
    let mut program = Vec::new();

    while consumed < tokens.len() {
        let (stmt, stmt_consumed) = parse_statement(&tokens[consumed..])?;
        program.push(stmt);
        consumed += stmt_consumed;
    }

    debug!("parsed {} top-level statements", program.len());
    Ok(program)
}

fn parse_statement(tokens: &[Token]) -> Result<(Stmt, usize)> {
    let Some(token) = tokens.first() else {
        return parser_error("Unexpected EOF");
    };

    match token.as_keyword() {
        Some(Keyword::Secure) => parse_secure(tokens),
        Some(Keyword::Establish) => parse_establish(tokens),
        Some(Keyword::Transmit) => parse_transmit(tokens),
        Some(Keyword::Calculate) => parse_calculate(tokens),
        Some(Keyword::Allocate) => parse_allocate(tokens),
        Some(Keyword::Deallocate) => parse_deallocate(tokens),
        Some(Keyword::Initialize) => parse_initialize_server(tokens),
        Some(Keyword::Listen) => parse_listen_request(tokens),
        Some(Keyword::Respond) => parse_respond(tokens),
        _ => parser_error(format!("Unknown statement: {}", token)),
    }
}

// Consume one keyword, returning the new cursor position.
fn expect(tokens: &[Token], consumed: usize, keyword: Keyword) -> Result<usize> {
    match tokens.get(consumed) {
        Some(token) if token.as_keyword() == Some(keyword) => Ok(consumed + 1),
        Some(token) => parser_error(format!("Expected {} got {}", keyword, token)),
        None => parser_error("Unexpected EOF"),
    }
}

fn expect_all(tokens: &[Token], mut consumed: usize, keywords: &[Keyword]) -> Result<usize> {
    for keyword in keywords {
        consumed = expect(tokens, consumed, *keyword)?;
    }
    Ok(consumed)
}

fn peek_keyword(tokens: &[Token], consumed: usize, keyword: Keyword) -> bool {
    tokens
        .get(consumed)
        .is_some_and(|token| token.as_keyword() == Some(keyword))
}

fn operand(tokens: &[Token], consumed: usize) -> Result<(Operand, usize)> {
    let operand = match tokens.get(consumed) {
        Some(Token::Integer(n)) => Operand::Integer(*n),
        Some(Token::String(s)) => Operand::String(s.clone()),
        Some(Token::Identifier(name)) => Operand::Name(name.clone()),
        Some(Token::Keyword(k)) => Operand::Name(k.as_str().to_string()),
        None => return parser_error("Unexpected EOF"),
    };
    Ok((operand, consumed + 1))
}

fn identifier(tokens: &[Token], consumed: usize) -> Result<(String, usize)> {
    match tokens.get(consumed) {
        Some(Token::Identifier(name)) => Ok((name.clone(), consumed + 1)),
        Some(token) => parser_error(format!("Expected identifier got {}", token)),
        None => parser_error("Unexpected EOF"),
    }
}

fn parse_allocate(tokens: &[Token]) -> Result<(Stmt, usize)> {
    let consumed = expect_all(
        tokens,
        0,
        &[
            Keyword::Allocate,
            Keyword::Memory,
            Keyword::For,
            Keyword::Execution,
            Keyword::End,
        ],
    )?;
    Ok((Stmt::Allocate, consumed))
}

fn parse_deallocate(tokens: &[Token]) -> Result<(Stmt, usize)> {
    let consumed = expect_all(tokens, 0, &[Keyword::Deallocate, Keyword::Memory, Keyword::End])?;
    Ok((Stmt::Deallocate, consumed))
}

fn parse_secure(tokens: &[Token]) -> Result<(Stmt, usize)> {
    let mut consumed = expect(tokens, 0, Keyword::Secure)?;

    let mut body = Vec::new();
    while consumed < tokens.len() && !peek_keyword(tokens, consumed, Keyword::Otherwise) {
        let (stmt, stmt_consumed) = parse_statement(&tokens[consumed..])?;
        body.push(stmt);
        consumed += stmt_consumed;
    }
    consumed = expect(tokens, consumed, Keyword::Otherwise)?;

    let mut otherwise = Vec::new();
    while consumed < tokens.len() && !peek_keyword(tokens, consumed, Keyword::End) {
        let (stmt, stmt_consumed) = parse_statement(&tokens[consumed..])?;
        otherwise.push(stmt);
        consumed += stmt_consumed;
    }
    consumed = expect(tokens, consumed, Keyword::End)?;

    Ok((Stmt::Secure { body, otherwise }, consumed))
}

fn parse_establish(tokens: &[Token]) -> Result<(Stmt, usize)> {
    let mut consumed = expect(tokens, 0, Keyword::Establish)?;

    let resistant = peek_keyword(tokens, consumed, Keyword::Resistant);
    if resistant {
        consumed += 1;
    }

    let kind = match tokens.get(consumed) {
        Some(token) => match token.as_keyword() {
            Some(Keyword::Integer) => DeclaredKind::Integer,
            Some(Keyword::String) => DeclaredKind::String,
            _ => return parser_error(format!("Expected INTEGER or STRING got {}", token)),
        },
        None => return parser_error("Unexpected EOF"),
    };
    consumed += 1;

    let (name, name_consumed) = identifier(tokens, consumed)?;
    consumed = expect(tokens, name_consumed, Keyword::As)?;

    let (value, value_consumed) = operand(tokens, consumed)?;
    consumed = expect(tokens, value_consumed, Keyword::End)?;

    Ok((
        Stmt::Establish {
            name,
            kind,
            value,
            resistant,
        },
        consumed,
    ))
}

fn parse_transmit(tokens: &[Token]) -> Result<(Stmt, usize)> {
    let consumed = expect(tokens, 0, Keyword::Transmit)?;
    let (target, consumed) = operand(tokens, consumed)?;
    let consumed = expect_all(tokens, consumed, &[Keyword::To, Keyword::Console, Keyword::End])?;
    Ok((Stmt::Transmit { target }, consumed))
}

fn parse_calculate(tokens: &[Token]) -> Result<(Stmt, usize)> {
    let mut consumed = expect(tokens, 0, Keyword::Calculate)?;

    let op = match tokens.get(consumed) {
        Some(token) => match token.as_keyword() {
            Some(Keyword::Add) => CalcOp::Add,
            Some(Keyword::Subtract) => CalcOp::Subtract,
            _ => return parser_error(format!("Expected ADD or SUBTRACT got {}", token)),
        },
        None => return parser_error("Unexpected EOF"),
    };
    consumed = expect(tokens, consumed + 1, Keyword::With)?;

    let (left, left_consumed) = operand(tokens, consumed)?;
    consumed = expect(tokens, left_consumed, Keyword::And)?;

    let (right, right_consumed) = operand(tokens, consumed)?;
    consumed = expect_all(tokens, right_consumed, &[Keyword::Store, Keyword::In])?;

    let (dest, dest_consumed) = identifier(tokens, consumed)?;
    consumed = expect(tokens, dest_consumed, Keyword::End)?;

    Ok((
        Stmt::Calculate {
            op,
            left,
            right,
            dest,
        },
        consumed,
    ))
}

fn parse_initialize_server(tokens: &[Token]) -> Result<(Stmt, usize)> {
    let consumed = expect_all(
        tokens,
        0,
        &[
            Keyword::Initialize,
            Keyword::Server,
            Keyword::On,
            Keyword::Port,
        ],
    )?;
    let (port, consumed) = operand(tokens, consumed)?;
    let consumed = expect(tokens, consumed, Keyword::End)?;
    Ok((Stmt::InitializeServer { port }, consumed))
}

fn parse_listen_request(tokens: &[Token]) -> Result<(Stmt, usize)> {
    let consumed = expect_all(
        tokens,
        0,
        &[
            Keyword::Listen,
            Keyword::For,
            Keyword::Request,
            Keyword::Store,
            Keyword::In,
        ],
    )?;
    let (store, consumed) = identifier(tokens, consumed)?;
    let consumed = expect(tokens, consumed, Keyword::End)?;
    Ok((Stmt::ListenRequest { store }, consumed))
}

fn parse_respond(tokens: &[Token]) -> Result<(Stmt, usize)> {
    let consumed = expect_all(tokens, 0, &[Keyword::Respond, Keyword::With])?;
    let (message, consumed) = operand(tokens, consumed)?;
    let consumed = expect(tokens, consumed, Keyword::End)?;
    Ok((Stmt::Respond { message }, consumed))
}
