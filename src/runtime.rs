use crate::environment::Environment;
use crate::error::{network_error, Error, Result};
use crate::parser::{parse, CalcOp, Operand, Stmt};
use crate::server::Server;
use crate::tokenizer::tokenize;
use log::{debug, warn};
use std::{
    fmt::{self, Debug, Display, Formatter},
    io::Write,
};

#[derive(Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Str(String),
}

impl Value {
    /// The value a literal denotes, without any variable lookup. A bare word
    /// denotes its own name.
    pub fn from_literal(operand: &Operand) -> Value {
        match operand {
            Operand::Integer(n) => Value::Int(*n),
            Operand::String(s) | Operand::Name(s) => Value::Str(s.clone()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Str(_) => "string",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Value::Str(s) = self {
            write!(f, "\"{}\"", s)
        } else {
            write!(f, "{}", self)
        }
    }
}

pub fn calculate(op: CalcOp, left: &Value, right: &Value) -> Result<Value> {
    let overflow = || Error::Overflow { op: op.verb() };

    match (op, left, right) {
        (CalcOp::Add, Value::Int(a), Value::Int(b)) => {
            a.checked_add(*b).map(Value::Int).ok_or_else(overflow)
        }
        (CalcOp::Add, Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        (CalcOp::Subtract, Value::Int(a), Value::Int(b)) => {
            a.checked_sub(*b).map(Value::Int).ok_or_else(overflow)
        }
        _ => Err(Error::OperandType {
            op: op.verb(),
            left: left.kind(),
            right: right.kind(),
        }),
    }
}

/// Owns all state of a single run. Console output goes to `out`.
pub struct Interpreter<W: Write> {
    env: Environment,
    server: Server,
    out: W,
}

impl<W: Write> Interpreter<W> {
    pub fn new(out: W) -> Self {
        Self {
            env: Environment::new(),
            server: Server::new(),
            out,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn server(&self) -> &Server {
        &self.server
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn run(&mut self, program: &[Stmt]) -> Result<()> {
        for stmt in program {
            self.execute(stmt)?;
        }
        Ok(())
    }

    pub fn execute(&mut self, stmt: &Stmt) -> Result<()> {
        debug!("execute {}", stmt.keyword());

        match stmt {
            Stmt::Allocate => {
                self.env.allocate();
                Ok(())
            }
            Stmt::Deallocate => {
                self.env.deallocate();
                Ok(())
            }
            Stmt::Secure { body, otherwise } => match self.run(body) {
                Ok(()) => Ok(()),
                Err(err) => {
                    warn!("secure block recovered from: {}", err);
                    self.run(otherwise)
                }
            },
            Stmt::Establish {
                name,
                value,
                resistant,
                ..
            } => {
                self.env.ensure_allocated()?;
                self.env
                    .define(name, Value::from_literal(value), *resistant)
            }
            Stmt::Transmit { target } => {
                self.env.ensure_allocated()?;
                let value = self.env.resolve(target);
                writeln!(self.out, "{}", value)?;
                Ok(())
            }
            Stmt::Calculate {
                op,
                left,
                right,
                dest,
            } => {
                self.env.ensure_allocated()?;
                self.env.ensure_writable(dest)?;
                let left = self.env.resolve(left);
                let right = self.env.resolve(right);
                let result = calculate(*op, &left, &right)?;
                self.env.insert(dest.clone(), result);
                Ok(())
            }
            Stmt::InitializeServer { port } => {
                let port = match self.env.resolve(port) {
                    Value::Int(n) => match u16::try_from(n) {
                        Ok(port) => port,
                        Err(_) => return network_error(format!("Invalid port {}", n)),
                    },
                    other => return network_error(format!("Invalid port {:?}", other)),
                };
                let addr = self.server.bind(port)?;
                writeln!(self.out, "SERVER INITIALIZED ON PORT {}", addr.port())?;
                Ok(())
            }
            Stmt::ListenRequest { store } => {
                self.env.ensure_allocated()?;
                let (request, peer) = self.server.accept()?;
                self.env.insert(store.clone(), Value::Str(request));
                writeln!(self.out, "REQUEST RECEIVED FROM {}", peer)?;
                Ok(())
            }
            // Respond is not gated by the memory guard.
            Stmt::Respond { message } => {
                let message = self.env.resolve(message).to_string();
                self.server.respond(&message)
            }
        }
    }
}

/// Tokenize, parse and run `source` against an existing interpreter.
pub fn interpret<W: Write>(source: &[u8], interpreter: &mut Interpreter<W>) -> Result<()> {
    let tokens = tokenize(source)?;
    let program = parse(&tokens)?;
    interpreter.run(&program)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_str(source: &str) -> (Interpreter<Vec<u8>>, Result<()>) {
        let mut interpreter = Interpreter::new(Vec::new());
        let result = interpret(source.as_bytes(), &mut interpreter);
        (interpreter, result)
    }

    fn output(interpreter: &Interpreter<Vec<u8>>) -> String {
        String::from_utf8_lossy(interpreter.output()).into_owned()
    }

    const SCENARIO_A: &str = r#"
        ALLOCATE MEMORY FOR EXECUTION END
        ESTABLISH RESISTANT INTEGER x AS 10 END
        ESTABLISH INTEGER y AS 20 END
        CALCULATE ADD WITH x AND y STORE IN z END
        TRANSMIT z TO CONSOLE END
    "#;

    #[test]
    fn test_scenario_sum() -> Result<()> {
        let (interpreter, result) = run_str(SCENARIO_A);
        result?;
        assert_eq!(output(&interpreter), "30\n");
        assert_eq!(interpreter.environment().get("z"), Some(&Value::Int(30)));
        Ok(())
    }

    #[test]
    fn test_scenario_resistant_caught() -> Result<()> {
        let source = format!(
            r#"{}
            SECURE
                ESTABLISH INTEGER x AS 50 END
            OTHERWISE
                TRANSMIT "FAILED" TO CONSOLE END
            END"#,
            SCENARIO_A
        );
        let (interpreter, result) = run_str(&source);
        result?;
        assert_eq!(output(&interpreter), "30\nFAILED\n");
        assert_eq!(interpreter.environment().get("x"), Some(&Value::Int(10)));
        Ok(())
    }

    #[test]
    fn test_scenario_undefined_name_is_echoed() -> Result<()> {
        let (interpreter, result) = run_str(
            "ALLOCATE MEMORY FOR EXECUTION END
             TRANSMIT foo TO CONSOLE END",
        );
        result?;
        assert_eq!(output(&interpreter), "foo\n");
        Ok(())
    }

    #[test]
    fn test_guard_applies_to_data_operations() {
        let programs = [
            "ESTABLISH INTEGER x AS 1 END",
            "TRANSMIT 1 TO CONSOLE END",
            "CALCULATE ADD WITH 1 AND 2 STORE IN x END",
            "LISTEN FOR REQUEST STORE IN req END",
            "ALLOCATE MEMORY FOR EXECUTION END DEALLOCATE MEMORY END TRANSMIT 1 TO CONSOLE END",
        ];

        for program in programs {
            let (interpreter, result) = run_str(program);
            assert!(
                matches!(result, Err(Error::Guard)),
                "{} should fail the memory guard, got {:?}",
                program,
                result
            );
            assert_eq!(output(&interpreter), "");
        }
    }

    #[test]
    fn test_guard_is_checked_before_resistance() {
        let (_, result) = run_str(
            "ALLOCATE MEMORY FOR EXECUTION END
             ESTABLISH RESISTANT INTEGER x AS 1 END
             DEALLOCATE MEMORY END
             ESTABLISH INTEGER x AS 2 END",
        );
        assert!(matches!(result, Err(Error::Guard)));
    }

    #[test]
    fn test_lock_survives_reallocation() {
        let (interpreter, result) = run_str(
            "ALLOCATE MEMORY FOR EXECUTION END
             ESTABLISH RESISTANT INTEGER x AS 1 END
             DEALLOCATE MEMORY END
             ALLOCATE MEMORY FOR EXECUTION END
             CALCULATE ADD WITH 1 AND 1 STORE IN x END",
        );
        assert!(matches!(result, Err(Error::Resistance { name }) if name == "x"));
        assert!(interpreter.environment().is_empty());
        assert!(interpreter.environment().is_locked("x"));
    }

    #[test]
    fn test_deallocate_clears_variables() -> Result<()> {
        let (interpreter, result) = run_str(
            "ALLOCATE MEMORY FOR EXECUTION END
             ESTABLISH INTEGER a AS 1 END
             ESTABLISH STRING b AS \"two\" END
             DEALLOCATE MEMORY END
             ALLOCATE MEMORY FOR EXECUTION END
             TRANSMIT a TO CONSOLE END",
        );
        result?;
        assert_eq!(output(&interpreter), "a\n");
        assert!(interpreter.environment().is_empty());
        Ok(())
    }

    #[test]
    fn test_establish_stores_bare_word_as_text() -> Result<()> {
        let (interpreter, result) = run_str(
            "ALLOCATE MEMORY FOR EXECUTION END
             ESTABLISH INTEGER a AS 5 END
             ESTABLISH INTEGER b AS a END",
        );
        result?;
        assert_eq!(
            interpreter.environment().get("b"),
            Some(&Value::Str("a".to_string()))
        );
        Ok(())
    }

    #[test]
    fn test_calculate() -> Result<()> {
        assert_eq!(
            calculate(CalcOp::Add, &Value::Int(2), &Value::Int(3))?,
            Value::Int(5)
        );
        assert_eq!(
            calculate(CalcOp::Subtract, &Value::Int(2), &Value::Int(3))?,
            Value::Int(-1)
        );
        assert_eq!(
            calculate(
                CalcOp::Add,
                &Value::Str("foo".to_string()),
                &Value::Str("bar".to_string())
            )?,
            Value::Str("foobar".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_calculate_type_errors() {
        let text = Value::Str("a".to_string());

        let err = calculate(CalcOp::Add, &Value::Int(1), &text).unwrap_err();
        assert_eq!(err.to_string(), "TYPE ERROR: cannot add integer and string");

        let err = calculate(CalcOp::Subtract, &text, &text).unwrap_err();
        assert_eq!(
            err.to_string(),
            "TYPE ERROR: cannot subtract string and string"
        );
    }

    #[test]
    fn test_calculate_overflow() {
        let err = calculate(CalcOp::Add, &Value::Int(i64::MAX), &Value::Int(1)).unwrap_err();
        assert!(matches!(err, Error::Overflow { op: "add" }));
    }

    #[test]
    fn test_calculate_with_unbound_name_concatenates() -> Result<()> {
        let (interpreter, result) = run_str(
            "ALLOCATE MEMORY FOR EXECUTION END
             ESTABLISH STRING greeting AS \"hello \" END
             CALCULATE ADD WITH greeting AND world STORE IN message END
             TRANSMIT message TO CONSOLE END",
        );
        result?;
        assert_eq!(output(&interpreter), "hello world\n");
        Ok(())
    }

    #[test]
    fn test_string_literal_spelling_a_name_reads_the_variable() -> Result<()> {
        let (interpreter, result) = run_str(
            r#"ALLOCATE MEMORY FOR EXECUTION END
            ESTABLISH STRING x AS "hi" END
            ESTABLISH INTEGER n AS 4 END
            TRANSMIT "x" TO CONSOLE END
            CALCULATE ADD WITH "n" AND 1 STORE IN m END
            TRANSMIT m TO CONSOLE END
            TRANSMIT "y" TO CONSOLE END"#,
        );
        result?;
        assert_eq!(output(&interpreter), "hi\n5\ny\n");
        Ok(())
    }

    #[test]
    fn test_accented_names_are_distinct_variables() -> Result<()> {
        let (interpreter, result) = run_str(
            r#"ALLOCATE MEMORY FOR EXECUTION END
            ESTABLISH RESISTANT STRING café AS "locked" END
            ESTABLISH STRING cafè AS "free" END
            TRANSMIT café TO CONSOLE END
            TRANSMIT cafè TO CONSOLE END"#,
        );
        result?;
        assert_eq!(output(&interpreter), "locked\nfree\n");
        assert!(interpreter.environment().is_locked("café"));
        assert!(!interpreter.environment().is_locked("cafè"));
        Ok(())
    }

    #[test]
    fn test_secure_skips_otherwise_on_success() -> Result<()> {
        let (interpreter, result) = run_str(
            r#"ALLOCATE MEMORY FOR EXECUTION END
            SECURE
                TRANSMIT "body" TO CONSOLE END
            OTHERWISE
                TRANSMIT "otherwise" TO CONSOLE END
            END"#,
        );
        result?;
        assert_eq!(output(&interpreter), "body\n");
        Ok(())
    }

    #[test]
    fn test_secure_abandons_rest_of_body() -> Result<()> {
        let (interpreter, result) = run_str(
            r#"SECURE
                ALLOCATE MEMORY FOR EXECUTION END
                TRANSMIT "one" TO CONSOLE END
                CALCULATE SUBTRACT WITH "a" AND 1 STORE IN x END
                TRANSMIT "two" TO CONSOLE END
            OTHERWISE
                TRANSMIT "recovered" TO CONSOLE END
            END"#,
        );
        result?;
        assert_eq!(output(&interpreter), "one\nrecovered\n");
        // Mutations before the failure are kept
        assert!(interpreter.environment().is_allocated());
        Ok(())
    }

    #[test]
    fn test_secure_otherwise_failure_propagates() {
        let (interpreter, result) = run_str(
            r#"SECURE
                TRANSMIT "never" TO CONSOLE END
            OTHERWISE
                ESTABLISH INTEGER x AS 1 END
            END
            ALLOCATE MEMORY FOR EXECUTION END
            TRANSMIT "unreached" TO CONSOLE END"#,
        );
        assert!(matches!(result, Err(Error::Guard)));
        assert_eq!(output(&interpreter), "");
        assert!(!interpreter.environment().is_allocated());
    }

    #[test]
    fn test_nested_secure_failure_is_caught_by_outer() -> Result<()> {
        let (interpreter, result) = run_str(
            r#"ALLOCATE MEMORY FOR EXECUTION END
            SECURE
                SECURE
                    RESPOND WITH "nobody" END
                OTHERWISE
                    TRANSMIT "inner" TO CONSOLE END
                    CALCULATE ADD WITH 1 AND "x" STORE IN y END
                END
                TRANSMIT "skipped" TO CONSOLE END
            OTHERWISE
                TRANSMIT "outer" TO CONSOLE END
            END"#,
        );
        result?;
        assert_eq!(output(&interpreter), "inner\nouter\n");
        Ok(())
    }

    #[test]
    fn test_network_errors_without_server() {
        let (_, result) = run_str(
            "ALLOCATE MEMORY FOR EXECUTION END
             LISTEN FOR REQUEST STORE IN req END",
        );
        assert_eq!(
            result.unwrap_err().to_string(),
            "SERVER ERROR: Server not initialized."
        );

        // Respond ignores the memory guard and fails on the missing connection instead
        let (_, result) = run_str("RESPOND WITH \"pong\" END");
        assert_eq!(
            result.unwrap_err().to_string(),
            "SERVER ERROR: No active request to respond to."
        );
    }

    #[test]
    fn test_invalid_port() {
        let (_, result) = run_str("INITIALIZE SERVER ON PORT 70000 END");
        assert!(matches!(result, Err(Error::Network { .. })));

        let (_, result) = run_str("INITIALIZE SERVER ON PORT \"http\" END");
        assert_eq!(
            result.unwrap_err().to_string(),
            "SERVER ERROR: Invalid port \"http\""
        );
    }

    #[test]
    fn test_parse_errors_abort_before_execution() {
        let (interpreter, result) = run_str(
            r#"ALLOCATE MEMORY FOR EXECUTION END
            TRANSMIT "hello" TO CONSOLE END
            SECURE TRANSMIT oops OTHERWISE END"#,
        );
        assert!(matches!(result, Err(Error::Parser { .. })));
        assert_eq!(output(&interpreter), "");
        assert!(!interpreter.environment().is_allocated());
    }

    #[test]
    fn test_value_display() {
        assert_eq!(format!("{}", Value::Int(-42)), "-42");
        assert_eq!(format!("{}", Value::Str("hello".to_string())), "hello");
        assert_eq!(format!("{:?}", Value::Str("hello".to_string())), "\"hello\"");
        assert_eq!(format!("{:?}", Value::Int(7)), "7");
    }
}
