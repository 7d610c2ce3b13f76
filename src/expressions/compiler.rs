//! Arithmetic expression compiler.
//!
//! Config values such as `"1.5 * %level% + 2"` are compiled once into a small
//! tree and evaluated many times with different variable bindings. Variables
//! are matched literally against the names handed to the compiler (the
//! placeholder tokens, in encounter order) and bound by position.
//!
//! Supported syntax: numbers (`2`, `0.5`, `1e-3`), `+ - * / % ^`, unary
//! `-`/`+`, parentheses, the constants `pi` and `e`, and the functions
//! `abs floor ceil round sqrt min max`.

use crate::error::{ExpressionError, ExpressionResult};

/// Compiles expression source into an evaluable tree.
pub trait ExpressionCompiler: Send + Sync {
    /// Compile `expression`, treating each entry of `variables` as a free
    /// variable bound by position at evaluation time.
    fn compile(&self, expression: &str, variables: &[String]) -> ExpressionResult<CompiledExpression>;
}

/// The built-in arithmetic compiler.
#[derive(Clone, Copy, Debug, Default)]
pub struct ArithmeticCompiler;

impl ExpressionCompiler for ArithmeticCompiler {
    fn compile(&self, expression: &str, variables: &[String]) -> ExpressionResult<CompiledExpression> {
        let tokens = tokenize(expression, variables)?;
        let mut parser = Parser {
            expression,
            tokens,
            index: 0,
        };

        let root = parser.parse_expression()?;
        if let Some((position, _)) = parser.tokens.get(parser.index) {
            return Err(parser.error(*position, "unexpected trailing input"));
        }

        Ok(CompiledExpression {
            source: expression.to_string(),
            root,
            variables: variables.len(),
        })
    }
}

/// A compiled expression, ready to evaluate.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledExpression {
    source: String,
    root: Node,
    variables: usize,
}

impl CompiledExpression {
    /// Evaluate with one value per variable, in the order the compiler was given.
    pub fn evaluate(&self, values: &[f64]) -> ExpressionResult<f64> {
        if values.len() != self.variables {
            return Err(ExpressionError::VariableCount {
                expected: self.variables,
                found: values.len(),
            });
        }
        Ok(self.root.eval(values))
    }

    /// The source this was compiled from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of variables this expression binds.
    #[must_use]
    pub fn variable_count(&self) -> usize {
        self.variables
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Function {
    Abs,
    Floor,
    Ceil,
    Round,
    Sqrt,
    Min,
    Max,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        match name {
            "abs" => Some(Function::Abs),
            "floor" => Some(Function::Floor),
            "ceil" => Some(Function::Ceil),
            "round" => Some(Function::Round),
            "sqrt" => Some(Function::Sqrt),
            "min" => Some(Function::Min),
            "max" => Some(Function::Max),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Function::Abs => "abs",
            Function::Floor => "floor",
            Function::Ceil => "ceil",
            Function::Round => "round",
            Function::Sqrt => "sqrt",
            Function::Min => "min",
            Function::Max => "max",
        }
    }

    fn check_arity(self, found: usize) -> ExpressionResult<()> {
        let (ok, expected) = match self {
            Function::Min | Function::Max => (found >= 1, "at least 1"),
            _ => (found == 1, "exactly 1"),
        };
        if ok {
            Ok(())
        } else {
            Err(ExpressionError::Arity {
                function: self.name().to_string(),
                expected,
                found,
            })
        }
    }

    fn apply(self, args: &[f64]) -> f64 {
        let first = args.first().copied().unwrap_or(f64::NAN);
        match self {
            Function::Abs => first.abs(),
            Function::Floor => first.floor(),
            Function::Ceil => first.ceil(),
            Function::Round => first.round(),
            Function::Sqrt => first.sqrt(),
            Function::Min => args.iter().copied().fold(f64::INFINITY, f64::min),
            Function::Max => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Node {
    Constant(f64),
    Variable(usize),
    Negate(Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    Call(Function, Vec<Node>),
}

impl Node {
    fn eval(&self, values: &[f64]) -> f64 {
        match self {
            Node::Constant(value) => *value,
            Node::Variable(index) => values.get(*index).copied().unwrap_or(f64::NAN),
            Node::Negate(inner) => -inner.eval(values),
            Node::Binary(op, lhs, rhs) => {
                let (a, b) = (lhs.eval(values), rhs.eval(values));
                match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div => a / b,
                    BinaryOp::Rem => a % b,
                    BinaryOp::Pow => a.powf(b),
                }
            }
            Node::Call(function, args) => {
                let args: Vec<f64> = args.iter().map(|arg| arg.eval(values)).collect();
                function.apply(&args)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Variable(usize),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
    Comma,
}

fn tokenize(expression: &str, variables: &[String]) -> ExpressionResult<Vec<(usize, Token)>> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < expression.len() {
        let rest = &expression[pos..];
        let Some(c) = rest.chars().next() else {
            break;
        };

        if c.is_whitespace() {
            pos += c.len_utf8();
            continue;
        }

        // Variables first: placeholder names contain operator characters.
        let variable = variables
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty() && rest.starts_with(name.as_str()))
            .max_by_key(|(_, name)| name.len());
        if let Some((index, name)) = variable {
            tokens.push((pos, Token::Variable(index)));
            pos += name.len();
            continue;
        }

        if c.is_ascii_digit() || c == '.' {
            let mantissa = rest
                .find(|ch: char| !(ch.is_ascii_digit() || ch == '.'))
                .unwrap_or(rest.len());
            let len = mantissa + exponent_len(&rest[mantissa..]);
            let literal = &rest[..len];
            let value = literal.parse::<f64>().map_err(|_| ExpressionError::Parse {
                expression: expression.to_string(),
                position: pos,
                message: format!("invalid number '{literal}'"),
            })?;
            tokens.push((pos, Token::Number(value)));
            pos += len;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let len = rest
                .find(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
                .unwrap_or(rest.len());
            tokens.push((pos, Token::Ident(rest[..len].to_lowercase())));
            pos += len;
            continue;
        }

        let token = match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '^' => Token::Caret,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            other => {
                return Err(ExpressionError::Parse {
                    expression: expression.to_string(),
                    position: pos,
                    message: format!("unexpected character '{other}'"),
                })
            }
        };
        tokens.push((pos, token));
        pos += c.len_utf8();
    }

    Ok(tokens)
}

/// Length of an `e`/`E` exponent suffix (`e3`, `E-2`) at the start of `rest`, or 0.
fn exponent_len(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    if !matches!(bytes.first(), Some(b'e' | b'E')) {
        return 0;
    }
    let sign = usize::from(matches!(bytes.get(1), Some(b'+' | b'-')));
    let digits = bytes[1 + sign..].iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        0
    } else {
        1 + sign + digits
    }
}

struct Parser<'a> {
    expression: &'a str,
    tokens: Vec<(usize, Token)>,
    index: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index).map(|(_, token)| token)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.index)
            .map_or(self.expression.len(), |(position, _)| *position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).map(|(_, token)| token.clone());
        self.index += 1;
        token
    }

    fn error(&self, position: usize, message: &str) -> ExpressionError {
        ExpressionError::Parse {
            expression: self.expression.to_string(),
            position,
            message: message.to_string(),
        }
    }

    fn expect(&mut self, expected: &Token, message: &str) -> ExpressionResult<()> {
        if self.peek() == Some(expected) {
            self.index += 1;
            Ok(())
        } else {
            Err(self.error(self.position(), message))
        }
    }

    // expression := term (('+' | '-') term)*
    fn parse_expression(&mut self) -> ExpressionResult<Node> {
        let mut node = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(node),
            };
            self.index += 1;
            let rhs = self.parse_term()?;
            node = Node::Binary(op, Box::new(node), Box::new(rhs));
        }
    }

    // term := unary (('*' | '/' | '%') unary)*
    fn parse_term(&mut self) -> ExpressionResult<Node> {
        let mut node = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => return Ok(node),
            };
            self.index += 1;
            let rhs = self.parse_unary()?;
            node = Node::Binary(op, Box::new(node), Box::new(rhs));
        }
    }

    // unary := ('-' | '+') unary | power
    fn parse_unary(&mut self) -> ExpressionResult<Node> {
        match self.peek() {
            Some(Token::Minus) => {
                self.index += 1;
                Ok(Node::Negate(Box::new(self.parse_unary()?)))
            }
            Some(Token::Plus) => {
                self.index += 1;
                self.parse_unary()
            }
            _ => self.parse_power(),
        }
    }

    // power := primary ('^' unary)?   (right associative)
    fn parse_power(&mut self) -> ExpressionResult<Node> {
        let base = self.parse_primary()?;
        if self.peek() == Some(&Token::Caret) {
            self.index += 1;
            let exponent = self.parse_unary()?;
            return Ok(Node::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> ExpressionResult<Node> {
        let position = self.position();
        match self.advance() {
            Some(Token::Number(value)) => Ok(Node::Constant(value)),
            Some(Token::Variable(index)) => Ok(Node::Variable(index)),
            Some(Token::LParen) => {
                let inner = self.parse_expression()?;
                self.expect(&Token::RParen, "expected ')'")?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.index += 1;
                    return self.parse_call(&name);
                }
                match name.as_str() {
                    "pi" => Ok(Node::Constant(std::f64::consts::PI)),
                    "e" => Ok(Node::Constant(std::f64::consts::E)),
                    _ => Err(self.error(position, &format!("unknown identifier '{name}'"))),
                }
            }
            Some(_) => Err(self.error(position, "expected a value")),
            None => Err(self.error(position, "unexpected end of expression")),
        }
    }

    fn parse_call(&mut self, name: &str) -> ExpressionResult<Node> {
        let function = Function::lookup(name).ok_or_else(|| ExpressionError::UnknownFunction {
            expression: self.expression.to_string(),
            name: name.to_string(),
        })?;

        let mut args = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if self.peek() == Some(&Token::Comma) {
                    self.index += 1;
                } else {
                    break;
                }
            }
        }
        self.expect(&Token::RParen, "expected ')' after function arguments")?;

        function.check_arity(args.len())?;
        Ok(Node::Call(function, args))
    }
}
