//! Negative parser tests - tests for malformed input that should be rejected
//!
//! These tests verify that the lexer and parser reject invalid syntax with
//! the right error and location.

use fancyfly::ast::Span;
use fancyfly::lexer::{LexError, Lexer};
use fancyfly::parser::{ParseError, Parser};

/// Parse input and expect failure
fn parse_fails(input: &str) -> ParseError {
    let tokens = Lexer::new(input).tokenize().expect("lexer should succeed");
    match Parser::new(tokens).parse_module() {
        Ok(_) => panic!("expected parse error for: {}", input),
        Err(e) => e,
    }
}

fn should_fail(input: &str) {
    let tokens = Lexer::new(input).tokenize().expect("lexer should succeed");
    let result = Parser::new(tokens).parse_module();
    assert!(result.is_err(), "expected parse error for: {}", input);
}

fn lex_fails(input: &str) -> LexError {
    match Lexer::new(input).tokenize() {
        Ok(tokens) => panic!("expected lex error for {:?}, got {:?}", input, tokens),
        Err(e) => e,
    }
}

// ============================================================================
// Malformed expressions
// ============================================================================

mod expressions {
    use super::*;

    #[test]
    fn missing_operand() {
        let err = parse_fails("x = 1 +");
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
    }

    #[test]
    fn unclosed_paren_reaches_end_of_file() {
        let err = parse_fails("f(1, 2");
        assert!(matches!(
            err,
            ParseError::UnexpectedToken { .. } | ParseError::UnexpectedEof { .. }
        ));
    }

    #[test]
    fn double_operator() {
        should_fail("x = 1 * * 2");
    }

    #[test]
    fn two_expressions_on_one_line() {
        let err = parse_fails("x y");
        assert_eq!(err.span(), &Span::new(2, 3));
    }
}

// ============================================================================
// Malformed statements
// ============================================================================

mod statements {
    use super::*;

    #[test]
    fn assignment_to_call() {
        let err = parse_fails("f(x) = 1");
        assert_eq!(
            err,
            ParseError::InvalidTarget {
                what: "call",
                span: Span::new(0, 4),
            }
        );
    }

    #[test]
    fn assignment_to_constant() {
        assert!(matches!(parse_fails("1 = x"), ParseError::InvalidTarget { what: "constant", .. }));
    }

    #[test]
    fn def_without_colon() {
        should_fail("def f(a)\n    return a\n");
    }

    #[test]
    fn def_without_body() {
        let err = parse_fails("def f(a):\n");
        assert!(matches!(
            err,
            ParseError::UnexpectedToken { .. } | ParseError::UnexpectedEof { .. }
        ));
    }

    #[test]
    fn else_without_if() {
        should_fail("else:\n    x = 1\n");
    }

    #[test]
    fn unexpected_indent() {
        should_fail("x = 1\n    y = 2\n");
    }
}

// ============================================================================
// Lexer errors
// ============================================================================

mod lexing {
    use super::*;

    #[test]
    fn unterminated_string() {
        assert!(matches!(lex_fails("x = 'abc"), LexError::UnterminatedString(_)));
    }

    #[test]
    fn unknown_character() {
        assert!(matches!(lex_fails("x = 1 $ 2"), LexError::UnexpectedChar('$', _)));
    }

    #[test]
    fn inconsistent_dedent() {
        let err = lex_fails("if a:\n        x = 1\n    y = 2\n");
        assert!(matches!(err, LexError::InconsistentDedent(_)));
    }
}
