//! Parser unit tests - structure of the host syntax tree for accepted input

use fancyfly::ast::*;
use fancyfly::lexer::Lexer;
use fancyfly::parser::Parser;

fn parse(input: &str) -> Module {
    let tokens = Lexer::new(input).tokenize().expect("lexer should succeed");
    Parser::new(tokens)
        .parse_module()
        .expect("parser should succeed")
}

fn single_expr(input: &str) -> ExprKind {
    let module = parse(input);
    assert_eq!(module.body.len(), 1, "expected one statement in {:?}", input);
    match &module.body[0].node {
        StmtKind::Expr(e) => e.node.clone(),
        other => panic!("expected expression statement, got {:?}", other),
    }
}

fn name(n: &str) -> ExprKind {
    ExprKind::Name(n.to_string())
}

// ============================================================================
// Expressions
// ============================================================================

mod expressions {
    use super::*;

    #[test]
    fn call_with_arguments() {
        let ExprKind::Call { func, args } = single_expr("f(a, 1, \"s\")") else {
            panic!("expected call");
        };
        assert_eq!(func.node, name("f"));
        let args: Vec<ExprKind> = args.into_iter().map(|a| a.node).collect();
        assert_eq!(
            args,
            vec![
                name("a"),
                ExprKind::Constant(Literal::Int(1)),
                ExprKind::Constant(Literal::Str("s".into())),
            ]
        );
    }

    #[test]
    fn curried_call() {
        let ExprKind::Call { func, args } = single_expr("f(1)(2)") else {
            panic!("expected call");
        };
        assert_eq!(args.len(), 1);
        assert!(matches!(func.node, ExprKind::Call { .. }));
    }

    #[test]
    fn subtraction_is_left_associative() {
        let ExprKind::BinOp { left, op, right } = single_expr("a - b - c") else {
            panic!("expected binop");
        };
        assert_eq!(op, Operator::Sub);
        assert_eq!(right.node, name("c"));
        assert!(matches!(left.node, ExprKind::BinOp { op: Operator::Sub, .. }));
    }

    #[test]
    fn comparison_binds_looser_than_arithmetic() {
        let ExprKind::Compare {
            left,
            ops,
            comparators,
        } = single_expr("n - 1 == 0")
        else {
            panic!("expected comparison");
        };
        assert_eq!(ops, vec![CmpOp::Eq]);
        assert!(matches!(left.node, ExprKind::BinOp { .. }));
        assert_eq!(comparators[0].node, ExprKind::Constant(Literal::Int(0)));
    }

    #[test]
    fn chained_comparison_is_kept_whole() {
        let ExprKind::Compare { ops, .. } = single_expr("a < b <= c") else {
            panic!("expected comparison");
        };
        assert_eq!(ops, vec![CmpOp::Lt, CmpOp::LtE]);
    }

    #[test]
    fn boolean_operators() {
        let ExprKind::BoolOp { op, values } = single_expr("a or b and not c") else {
            panic!("expected boolean operation");
        };
        assert_eq!(op, BoolOp::Or);
        assert_eq!(values.len(), 2);
        assert!(matches!(values[1].node, ExprKind::BoolOp { op: BoolOp::And, .. }));
    }

    #[test]
    fn literals() {
        assert_eq!(single_expr("True"), ExprKind::Constant(Literal::Bool(true)));
        assert_eq!(single_expr("None"), ExprKind::Constant(Literal::None));
        assert_eq!(single_expr("'a\\tb'"), ExprKind::Constant(Literal::Str("a\tb".into())));
        assert_eq!(single_expr("-42"), ExprKind::Constant(Literal::Int(-42)));
    }

    #[test]
    fn parenthesized_and_tuples() {
        assert!(matches!(single_expr("(a + b) * c"), ExprKind::BinOp { op: Operator::Mult, .. }));
        assert!(matches!(single_expr("(a, b)"), ExprKind::Tuple(items) if items.len() == 2));
        assert!(matches!(single_expr("[1, 2, 3]"), ExprKind::List(items) if items.len() == 3));
    }

    #[test]
    fn lambda_expression() {
        let ExprKind::Lambda { params, body } = single_expr("lambda x, y: x + y") else {
            panic!("expected lambda");
        };
        let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y"]);
        assert!(matches!(body.node, ExprKind::BinOp { .. }));
    }

    #[test]
    fn call_arguments_may_span_lines() {
        let ExprKind::Call { args, .. } = single_expr("f(a,\n  b,\n  c)\n") else {
            panic!("expected call");
        };
        assert_eq!(args.len(), 3);
    }
}

// ============================================================================
// Statements
// ============================================================================

mod statements {
    use super::*;

    #[test]
    fn function_definition() {
        let module = parse("def add(a, b):\n    c = a + b\n    return c\n");
        let StmtKind::FunctionDef { name, params, body } = &module.body[0].node else {
            panic!("expected function definition");
        };
        assert_eq!(name, "add");
        assert_eq!(params.len(), 2);
        assert_eq!(body.len(), 2);
        assert!(matches!(body[1].node, StmtKind::Return(Some(_))));
    }

    #[test]
    fn default_parameter_is_parsed() {
        let module = parse("def f(a, b=1):\n    return a\n");
        let StmtKind::FunctionDef { params, .. } = &module.body[0].node else {
            panic!("expected function definition");
        };
        assert!(params[0].default.is_none());
        assert!(params[1].default.is_some());
    }

    #[test]
    fn if_else() {
        let module = parse("if n == 0:\n    return 1\nelse:\n    return n\n");
        let StmtKind::If { body, orelse, .. } = &module.body[0].node else {
            panic!("expected if");
        };
        assert_eq!(body.len(), 1);
        assert_eq!(orelse.len(), 1);
    }

    #[test]
    fn one_line_suites() {
        let module = parse("if a: x = 1\nelse: x = 2\n");
        let StmtKind::If { body, orelse, .. } = &module.body[0].node else {
            panic!("expected if");
        };
        assert!(matches!(body[0].node, StmtKind::Assign { .. }));
        assert!(matches!(orelse[0].node, StmtKind::Assign { .. }));
    }

    #[test]
    fn nested_blocks_dedent_to_outer_level() {
        let src = "\
def f(a):
    if a:
        b = 1
    else:
        b = 2
    return b
x = f(1)
";
        let module = parse(src);
        assert_eq!(module.body.len(), 2);
        let StmtKind::FunctionDef { body, .. } = &module.body[0].node else {
            panic!("expected function definition");
        };
        assert_eq!(body.len(), 2);
    }

    #[test]
    fn chained_assignment_targets() {
        let module = parse("a = b = 1");
        let StmtKind::Assign { targets, .. } = &module.body[0].node else {
            panic!("expected assignment");
        };
        assert_eq!(targets.len(), 2);
    }

    #[test]
    fn augmented_assignment_and_loops() {
        let module = parse("x += 1\nwhile x:\n    pass\nfor i in xs:\n    break\n");
        assert!(matches!(module.body[0].node, StmtKind::AugAssign { op: Operator::Add, .. }));
        assert!(matches!(module.body[1].node, StmtKind::While { .. }));
        assert!(matches!(module.body[2].node, StmtKind::For { .. }));
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let module = parse("# header\n\nx = 1  # trailing\n\n\n# done\n");
        assert_eq!(module.body.len(), 1);
    }

    #[test]
    fn empty_module() {
        assert!(parse("").body.is_empty());
        assert!(parse("\n\n# nothing\n").body.is_empty());
    }
}
