use std::fmt::Display;

use thiserror::Error;

use crate::ast::{Expression, InfixOperator, PrefixOperator, Program, Statement};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Equals,      // == !=
    LessGreater, // < >
    Sum,         // + -
    Product,     // * /
    Prefix,      // -x !x
    Call,        // f(x)
    Index,       // xs[0]
}

fn precedence_of(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::Eq | TokenKind::NotEq => Precedence::Equals,
        TokenKind::Lt | TokenKind::Gt => Precedence::LessGreater,
        TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
        TokenKind::Slash | TokenKind::Asterisk => Precedence::Product,
        TokenKind::Lparen => Precedence::Call,
        TokenKind::Lbracket => Precedence::Index,
        _ => Precedence::Lowest,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expected next token to be {expected}, got {got} instead")]
    UnexpectedToken {
        expected: TokenKind,
        got: TokenKind,
    },
    #[error("could not parse {literal:?} as int")]
    BadIntegerLiteral { literal: String },
    #[error("no prefix parse function for {kind} found")]
    NoPrefixParseFn { kind: TokenKind },
}

#[derive(Debug)]
pub struct ParseErrors(pub Vec<ParseError>);

impl std::error::Error for ParseErrors {}

impl Display for ParseErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "parser errors:")?;
        for error in &self.0 {
            writeln!(f, "\t{}", error)?;
        }
        Ok(())
    }
}

/// Parse a source string into a [`Program`], failing if any error was
/// recorded along the way.
pub fn parse(source: &str) -> Result<Program, ParseErrors> {
    let mut parser = Parser::new(Lexer::new(source));
    let program = parser.parse_program();
    if parser.errors.is_empty() {
        Ok(program)
    } else {
        Err(ParseErrors(parser.errors))
    }
}

type PrefixFn = fn(&mut Parser) -> Option<Expression>;
type InfixFn = fn(&mut Parser, Expression) -> Option<Expression>;

// Prefix parselets produce an expression from the current token; infix
// parselets fold an already-parsed left operand with the current token.
fn prefix_fn(kind: TokenKind) -> Option<PrefixFn> {
    match kind {
        TokenKind::Ident => Some(Parser::parse_identifier),
        TokenKind::Int => Some(Parser::parse_integer),
        TokenKind::String => Some(Parser::parse_string),
        TokenKind::True | TokenKind::False => Some(Parser::parse_boolean),
        TokenKind::Bang | TokenKind::Minus => Some(Parser::parse_prefix_expression),
        TokenKind::Lparen => Some(Parser::parse_grouped_expression),
        TokenKind::Function => Some(Parser::parse_function_literal),
        TokenKind::Lbracket => Some(Parser::parse_array_literal),
        TokenKind::Lbrace => Some(Parser::parse_hash_literal),
        _ => None,
    }
}

fn infix_fn(kind: TokenKind) -> Option<InfixFn> {
    match kind {
        TokenKind::Plus
        | TokenKind::Minus
        | TokenKind::Slash
        | TokenKind::Asterisk
        | TokenKind::Eq
        | TokenKind::NotEq
        | TokenKind::Lt
        | TokenKind::Gt => Some(Parser::parse_infix_expression),
        TokenKind::Lparen => Some(Parser::parse_call_expression),
        TokenKind::Lbracket => Some(Parser::parse_index_expression),
        _ => None,
    }
}

pub struct Parser {
    lexer: Lexer,
    cur_token: Token,
    peek_token: Token,
    errors: Vec<ParseError>,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Self {
        let mut parser = Self {
            lexer,
            cur_token: Token::new(TokenKind::Eof, ""),
            peek_token: Token::new(TokenKind::Eof, ""),
            errors: Vec::new(),
        };
        // Prime cur_token and peek_token.
        parser.next_token();
        parser.next_token();
        parser
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    fn next_token(&mut self) {
        let next = self.lexer.next_token();
        self.cur_token = std::mem::replace(&mut self.peek_token, next);
    }

    fn peek_precedence(&self) -> Precedence {
        precedence_of(self.peek_token.kind)
    }

    fn cur_precedence(&self) -> Precedence {
        precedence_of(self.cur_token.kind)
    }

    fn expect_peek(&mut self, kind: TokenKind) -> bool {
        if self.peek_token.kind == kind {
            self.next_token();
            true
        } else {
            self.errors.push(ParseError::UnexpectedToken {
                expected: kind,
                got: self.peek_token.kind,
            });
            false
        }
    }

    pub fn parse_program(&mut self) -> Program {
        let mut statements = Vec::new();

        while self.cur_token.kind != TokenKind::Eof {
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
            self.next_token();
        }

        Program(statements)
    }

    fn parse_statement(&mut self) -> Option<Statement> {
        match self.cur_token.kind {
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::If => self.parse_if_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> Option<Statement> {
        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }

        let name = self.cur_token.literal.clone();

        if !self.expect_peek(TokenKind::Assign) {
            return None;
        }

        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;

        if self.peek_token.kind == TokenKind::Semicolon {
            self.next_token();
        }

        Some(Statement::Let { name, value })
    }

    fn parse_return_statement(&mut self) -> Option<Statement> {
        self.next_token();

        let value = self.parse_expression(Precedence::Lowest)?;

        if self.peek_token.kind == TokenKind::Semicolon {
            self.next_token();
        }

        Some(Statement::Return(value))
    }

    fn parse_if_statement(&mut self) -> Option<Statement> {
        if !self.expect_peek(TokenKind::Lparen) {
            return None;
        }

        self.next_token();
        let condition = self.parse_expression(Precedence::Lowest)?;

        if !self.expect_peek(TokenKind::Rparen) {
            return None;
        }
        if !self.expect_peek(TokenKind::Lbrace) {
            return None;
        }

        let consequence = Box::new(self.parse_block_statement());

        let mut alternative = None;
        if self.peek_token.kind == TokenKind::Else {
            self.next_token();

            if !self.expect_peek(TokenKind::Lbrace) {
                return None;
            }

            alternative = Some(Box::new(self.parse_block_statement()));
        }

        Some(Statement::If {
            condition,
            consequence,
            alternative,
        })
    }

    fn parse_expression_statement(&mut self) -> Option<Statement> {
        let expression = self.parse_expression(Precedence::Lowest)?;

        // Semicolons are optional after expression statements.
        if self.peek_token.kind == TokenKind::Semicolon {
            self.next_token();
        }

        Some(Statement::Expression(expression))
    }

    fn parse_block_statement(&mut self) -> Statement {
        let mut statements = Vec::new();

        self.next_token();

        while self.cur_token.kind != TokenKind::Rbrace && self.cur_token.kind != TokenKind::Eof {
            if let Some(statement) = self.parse_statement() {
                statements.push(statement);
            }
            self.next_token();
        }

        Statement::Block(statements)
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Option<Expression> {
        let Some(prefix) = prefix_fn(self.cur_token.kind) else {
            self.errors.push(ParseError::NoPrefixParseFn {
                kind: self.cur_token.kind,
            });
            return None;
        };

        let mut left = prefix(self)?;

        while self.peek_token.kind != TokenKind::Semicolon && precedence < self.peek_precedence() {
            // Unreachable while every token with a non-Lowest precedence has
            // an infix parselet.
            let Some(infix) = infix_fn(self.peek_token.kind) else {
                self.errors.push(ParseError::NoPrefixParseFn {
                    kind: self.cur_token.kind,
                });
                return None;
            };

            self.next_token();
            left = infix(self, left)?;
        }

        Some(left)
    }

    fn parse_identifier(&mut self) -> Option<Expression> {
        Some(Expression::Identifier(self.cur_token.literal.clone()))
    }

    fn parse_integer(&mut self) -> Option<Expression> {
        match self.cur_token.literal.parse::<i64>() {
            Ok(value) => Some(Expression::Integer(value)),
            Err(_) => {
                self.errors.push(ParseError::BadIntegerLiteral {
                    literal: self.cur_token.literal.clone(),
                });
                None
            }
        }
    }

    fn parse_string(&mut self) -> Option<Expression> {
        Some(Expression::Str(self.cur_token.literal.clone()))
    }

    fn parse_boolean(&mut self) -> Option<Expression> {
        Some(Expression::Boolean(self.cur_token.kind == TokenKind::True))
    }

    fn parse_prefix_expression(&mut self) -> Option<Expression> {
        let operator = match self.cur_token.kind {
            TokenKind::Bang => PrefixOperator::Bang,
            TokenKind::Minus => PrefixOperator::Minus,
            _ => unreachable!("prefix parselet registered for {}", self.cur_token.kind),
        };

        self.next_token();
        let right = self.parse_expression(Precedence::Prefix)?;

        Some(Expression::Prefix(operator, Box::new(right)))
    }

    fn parse_grouped_expression(&mut self) -> Option<Expression> {
        self.next_token();

        let expression = self.parse_expression(Precedence::Lowest)?;

        if !self.expect_peek(TokenKind::Rparen) {
            return None;
        }

        Some(expression)
    }

    fn parse_function_literal(&mut self) -> Option<Expression> {
        if !self.expect_peek(TokenKind::Lparen) {
            return None;
        }

        let parameters = self.parse_function_parameters()?;

        if !self.expect_peek(TokenKind::Lbrace) {
            return None;
        }

        let body = Box::new(self.parse_block_statement());

        Some(Expression::Function { parameters, body })
    }

    fn parse_function_parameters(&mut self) -> Option<Vec<String>> {
        let mut parameters = Vec::new();

        if self.peek_token.kind == TokenKind::Rparen {
            self.next_token();
            return Some(parameters);
        }

        self.next_token();
        parameters.push(self.cur_token.literal.clone());

        while self.peek_token.kind == TokenKind::Comma {
            self.next_token();
            self.next_token();
            parameters.push(self.cur_token.literal.clone());
        }

        if !self.expect_peek(TokenKind::Rparen) {
            return None;
        }

        Some(parameters)
    }

    fn parse_array_literal(&mut self) -> Option<Expression> {
        let elements = self.parse_expression_list(TokenKind::Rbracket)?;
        Some(Expression::Array(elements))
    }

    fn parse_hash_literal(&mut self) -> Option<Expression> {
        let mut pairs = Vec::new();

        while self.peek_token.kind != TokenKind::Rbrace {
            self.next_token();
            let key = self.parse_expression(Precedence::Lowest)?;

            if !self.expect_peek(TokenKind::Colon) {
                return None;
            }

            self.next_token();
            let value = self.parse_expression(Precedence::Lowest)?;

            pairs.push((key, value));

            if self.peek_token.kind != TokenKind::Rbrace && !self.expect_peek(TokenKind::Comma) {
                return None;
            }
        }

        if !self.expect_peek(TokenKind::Rbrace) {
            return None;
        }

        Some(Expression::Hash(pairs))
    }

    fn parse_infix_expression(&mut self, left: Expression) -> Option<Expression> {
        let operator = match self.cur_token.kind {
            TokenKind::Plus => InfixOperator::Plus,
            TokenKind::Minus => InfixOperator::Minus,
            TokenKind::Asterisk => InfixOperator::Asterisk,
            TokenKind::Slash => InfixOperator::Slash,
            TokenKind::Eq => InfixOperator::Eq,
            TokenKind::NotEq => InfixOperator::NotEq,
            TokenKind::Lt => InfixOperator::Lt,
            TokenKind::Gt => InfixOperator::Gt,
            _ => unreachable!("infix parselet registered for {}", self.cur_token.kind),
        };

        let precedence = self.cur_precedence();
        self.next_token();
        let right = self.parse_expression(precedence)?;

        Some(Expression::Infix(Box::new(left), operator, Box::new(right)))
    }

    fn parse_call_expression(&mut self, function: Expression) -> Option<Expression> {
        let arguments = self.parse_expression_list(TokenKind::Rparen)?;
        Some(Expression::Call {
            function: Box::new(function),
            arguments,
        })
    }

    fn parse_index_expression(&mut self, left: Expression) -> Option<Expression> {
        self.next_token();
        let index = self.parse_expression(Precedence::Lowest)?;

        if !self.expect_peek(TokenKind::Rbracket) {
            return None;
        }

        Some(Expression::Index {
            left: Box::new(left),
            index: Box::new(index),
        })
    }

    // Comma-separated expressions up to the closing delimiter; shared by
    // array literals and call argument lists.
    fn parse_expression_list(&mut self, end: TokenKind) -> Option<Vec<Expression>> {
        let mut list = Vec::new();

        if self.peek_token.kind == end {
            self.next_token();
            return Some(list);
        }

        self.next_token();
        list.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek_token.kind == TokenKind::Comma {
            self.next_token();
            self.next_token();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }

        if !self.expect_peek(end) {
            return None;
        }

        Some(list)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse_valid(source: &str) -> Program {
        parse(source).expect("program should parse without errors")
    }

    fn parse_errors(source: &str) -> Vec<String> {
        match parse(source) {
            Ok(program) => panic!("expected errors, parsed {}", program),
            Err(ParseErrors(errors)) => errors.iter().map(|e| e.to_string()).collect(),
        }
    }

    #[test]
    fn test_let_statements() {
        let program = parse_valid("let x = 5; let y = true; let foobar = y;");
        assert_eq!(
            program.0,
            vec![
                Statement::Let {
                    name: "x".to_string(),
                    value: Expression::Integer(5),
                },
                Statement::Let {
                    name: "y".to_string(),
                    value: Expression::Boolean(true),
                },
                Statement::Let {
                    name: "foobar".to_string(),
                    value: Expression::Identifier("y".to_string()),
                },
            ]
        );
    }

    #[test]
    fn test_return_statements() {
        let program = parse_valid("return 5; return x + y;");
        assert_eq!(program.0.len(), 2);
        assert_eq!(program.0[0], Statement::Return(Expression::Integer(5)));
        assert_eq!(program.to_string(), "return5;return(x + y);");
    }

    #[test]
    fn test_operator_precedence() {
        let cases = [
            ("-a * b", "((-a) * b)"),
            ("!-a", "(!(-a))"),
            ("a + b + c", "((a + b) + c)"),
            ("a + b - c", "((a + b) - c)"),
            ("a * b * c", "((a * b) * c)"),
            ("a * b / c", "((a * b) / c)"),
            ("a + b / c", "(a + (b / c))"),
            ("a + b * c + d / e - f", "(((a + (b * c)) + (d / e)) - f)"),
            ("5 > 4 == 3 < 4", "((5 > 4) == (3 < 4))"),
            ("5 < 4 != 3 > 4", "((5 < 4) != (3 > 4))"),
            (
                "3 + 4 * 5 == 3 * 1 + 4 * 5",
                "((3 + (4 * 5)) == ((3 * 1) + (4 * 5)))",
            ),
            ("true == true", "(true == true)"),
            ("(5 + 5) * 2", "((5 + 5) * 2)"),
            ("-(5 + 5)", "(-(5 + 5))"),
            ("!(true == true)", "(!(true == true))"),
            ("a + add(b * c) + d", "((a + add((b * c))) + d)"),
            (
                "add(a, b, 1, 2 * 3, 4 + 5, add(6, 7 * 8))",
                "add(a, b, 1, (2 * 3), (4 + 5), add(6, (7 * 8)))",
            ),
            ("a * [1, 2, 3, 4][b * c] * d", "((a * ([1, 2, 3, 4][(b * c)])) * d)"),
            (
                "add(a * b[2], b[1], 2 * [1, 2][1])",
                "add((a * (b[2])), (b[1]), (2 * ([1, 2][1])))",
            ),
        ];

        for (source, expected) in cases {
            let program = parse_valid(source);
            assert_eq!(program.to_string(), expected, "source: {}", source);
        }
    }

    #[test]
    fn test_if_else_statement() {
        let program = parse_valid("if (x < y) { x } else { y }");
        let Statement::If {
            condition,
            consequence,
            alternative,
        } = &program.0[0]
        else {
            panic!("expected if statement, got {:?}", program.0[0]);
        };

        assert_eq!(condition.to_string(), "(x < y)");
        assert_eq!(
            **consequence,
            Statement::Block(vec![Statement::Expression(Expression::Identifier(
                "x".to_string()
            ))])
        );
        assert_eq!(
            *alternative.as_deref().expect("alternative should be parsed"),
            Statement::Block(vec![Statement::Expression(Expression::Identifier(
                "y".to_string()
            ))])
        );
    }

    #[test]
    fn test_function_literal() {
        let program = parse_valid("fn(x, y) { x + y; }");
        let Statement::Expression(Expression::Function { parameters, body }) = &program.0[0] else {
            panic!("expected function literal, got {:?}", program.0[0]);
        };
        assert_eq!(parameters, &["x", "y"]);
        assert_eq!(body.to_string(), "(x + y)");
    }

    #[test]
    fn test_function_parameter_lists() {
        let cases: [(&str, &[&str]); 3] =
            [("fn() {}", &[]), ("fn(x) {}", &["x"]), ("fn(x, y, z) {}", &["x", "y", "z"])];

        for (source, expected) in cases {
            let program = parse_valid(source);
            let Statement::Expression(Expression::Function { parameters, .. }) = &program.0[0]
            else {
                panic!("expected function literal for {}", source);
            };
            assert_eq!(parameters, expected);
        }
    }

    #[test]
    fn test_call_expression() {
        let program = parse_valid("add(1, 2 * 3, 4 + 5);");
        let Statement::Expression(Expression::Call {
            function,
            arguments,
        }) = &program.0[0]
        else {
            panic!("expected call expression, got {:?}", program.0[0]);
        };
        assert_eq!(function.to_string(), "add");
        assert_eq!(arguments.len(), 3);
        assert_eq!(arguments[1].to_string(), "(2 * 3)");
    }

    #[test]
    fn test_array_literal() {
        let program = parse_valid("[1, 2 * 2, 3 + 3]");
        let Statement::Expression(Expression::Array(elements)) = &program.0[0] else {
            panic!("expected array literal, got {:?}", program.0[0]);
        };
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[2].to_string(), "(3 + 3)");
    }

    #[test]
    fn test_empty_array_literal() {
        let program = parse_valid("[]");
        assert_eq!(
            program.0[0],
            Statement::Expression(Expression::Array(Vec::new()))
        );
    }

    #[test]
    fn test_hash_literal_preserves_source_order() {
        let program = parse_valid(r#"{"one": 1, "two": 2, "three": 3}"#);
        let Statement::Expression(Expression::Hash(pairs)) = &program.0[0] else {
            panic!("expected hash literal, got {:?}", program.0[0]);
        };
        let keys: Vec<String> = pairs.iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, ["one", "two", "three"]);
    }

    #[test]
    fn test_empty_hash_literal() {
        let program = parse_valid("{}");
        assert_eq!(
            program.0[0],
            Statement::Expression(Expression::Hash(Vec::new()))
        );
    }

    #[test]
    fn test_hash_literal_with_expressions() {
        let program = parse_valid(r#"{1: 0 + 1, true: 10 - 8}"#);
        let Statement::Expression(Expression::Hash(pairs)) = &program.0[0] else {
            panic!("expected hash literal, got {:?}", program.0[0]);
        };
        assert_eq!(pairs[0].1.to_string(), "(0 + 1)");
        assert_eq!(pairs[1].0, Expression::Boolean(true));
    }

    #[test]
    fn test_let_error_messages() {
        let errors = parse_errors("let x 5;");
        assert_eq!(errors[0], "expected next token to be =, got INT instead");

        let errors = parse_errors("let = 5;");
        assert_eq!(errors[0], "expected next token to be IDENT, got = instead");
    }

    #[test]
    fn test_integer_overflow_error() {
        let errors = parse_errors("9999999999999999999999");
        assert_eq!(
            errors[0],
            "could not parse \"9999999999999999999999\" as int"
        );
    }

    #[test]
    fn test_no_prefix_parse_fn_error() {
        let errors = parse_errors("+ 5");
        assert_eq!(errors[0], "no prefix parse function for + found");
    }

    #[test]
    fn test_missing_bracket_error() {
        let errors = parse_errors("[1, 2;");
        assert_eq!(errors[0], "expected next token to be ], got ; instead");
    }

    #[test]
    fn test_reparse_printed_program() {
        // The printer drops grouping parentheses in favor of explicit ones
        // around every infix/prefix/index node, so a printed program parses
        // back to the same tree.
        let source = "let x = add(1, 2 * 3);return x > 1;let y = [1, 2, x][0];{1: 2, true: 3};";
        let program = parse_valid(source);
        let reparsed = parse_valid(&program.to_string());
        assert_eq!(program, reparsed);
    }
}
