//! Stage-level tests through the public compiler API.
use hawk::{
    compiler::{self, lexer, parser, symbol, typemap, AstKind},
    DiagnosticList, Vm,
};

fn run(source: &str) -> i32 {
    let bytecode = compiler::compile("test.hawk", source).expect("compile failed");
    Vm::new().execute(&bytecode).expect("execution failed")
}

#[test]
fn test_nested_let_followed_by_more_vars() {
    // The speculative nested-let descent commits, then the var loop
    // continues with the next binding.
    assert_eq!(run("let a = let b = 1 do b c = 2 do a + c"), 3);
}

#[test]
fn test_speculative_let_restores_cursor() {
    // `b` is a plain reference, not a nested let; the failed
    // attempt must rewind before the atom is consumed.
    assert_eq!(run("let a = 4 b = a do b"), 4);
}

#[test]
fn test_binary_continuation_restores_cursor() {
    // No operator follows `a`, so the continuation attempt restores
    // and the lone atom stands.
    assert_eq!(run("let a = 9 do a"), 9);
}

#[test]
fn test_ast_dump_lists_structure() {
    let source = "let a = 5 do a";
    let mut diagnostics = DiagnosticList::new("test.hawk", source);
    let tokens = lexer::tokenize(source, &mut diagnostics);
    let ast = parser::parse(tokens, &mut diagnostics).unwrap();

    let dump = ast.dump();
    assert!(dump.contains("Let"));
    assert!(dump.contains("Var"));
    assert!(dump.contains("Identifier a"));
    assert!(dump.contains("IntLiteral 5"));
    assert!(dump.contains("Do"));
    assert!(dump.contains("VarRef a"));
}

#[test]
fn test_symtab_dump_lists_scopes() {
    let source = "let a = 5 b = let c = 1 do c do b";
    let mut diagnostics = DiagnosticList::new("test.hawk", source);
    let tokens = lexer::tokenize(source, &mut diagnostics);
    let ast = parser::parse(tokens, &mut diagnostics).unwrap();
    let table = symbol::resolve(&ast, &mut diagnostics);

    let dump = table.dump();
    assert!(dump.contains("let_0"));
    assert!(dump.contains("let_1"));
    assert!(dump.contains("  a"));
    assert!(dump.contains("  c"));
}

#[test]
fn test_tymap_dump_lists_roots() {
    let source = "let a = 5 b = a do b";
    let mut diagnostics = DiagnosticList::new("test.hawk", source);
    let tokens = lexer::tokenize(source, &mut diagnostics);
    let ast = parser::parse(tokens, &mut diagnostics).unwrap();
    let mut table = symbol::resolve(&ast, &mut diagnostics);
    let map = typemap::infer(&ast, &mut table, &mut diagnostics);

    let dump = map.dump();
    assert!(dump.contains("a: int"));
    assert!(dump.contains("b: int"));
    assert!(dump.contains("Branch"));
}

#[test]
fn test_keywords_are_plain_identifiers() {
    let source = "let a = 5 do a";
    let mut diagnostics = DiagnosticList::new("test.hawk", source);
    let tokens = lexer::tokenize(source, &mut diagnostics);

    // `let` and `do` are identifier tokens matched by text at parse
    // time, not a dedicated kind.
    assert!(tokens[0].is_ident("let"));
    assert!(tokens[4].is_ident("do"));
    assert_eq!(tokens[0].kind, tokens[1].kind);
}

#[test]
fn test_pretty_print_round_trips_tokens() {
    // Tokenizing the pretty-printed tree reproduces the original
    // token sequence modulo whitespace.
    let source = "let a = 5\n  b = let c = 10 do c + a\ndo b * 2";
    let mut diagnostics = DiagnosticList::new("test.hawk", source);
    let original = lexer::tokenize(source, &mut diagnostics);
    let ast = parser::parse(original.clone(), &mut diagnostics).unwrap();

    let pretty = ast.pretty();
    let mut rescan_diagnostics = DiagnosticList::new("pretty.hawk", &pretty);
    let rescanned = lexer::tokenize(&pretty, &mut rescan_diagnostics);

    assert_eq!(original.len(), rescanned.len());
    for (before, after) in original.iter().zip(&rescanned) {
        assert_eq!(before.kind, after.kind);
        assert_eq!(before.data, after.data);
    }
}

#[test]
fn test_parse_matches_grammar_shapes() {
    let source = "let a = 1 b = a + 2 do b";
    let mut diagnostics = DiagnosticList::new("test.hawk", source);
    let tokens = lexer::tokenize(source, &mut diagnostics);
    let ast = parser::parse(tokens, &mut diagnostics).unwrap();

    let root = ast.root().unwrap();
    assert_eq!(ast.kind(root), AstKind::Let);

    // Zero or more `Var` children followed by exactly one `Do`.
    let children = ast.children(root);
    let (last, vars) = children.split_last().unwrap();
    assert_eq!(ast.kind(*last), AstKind::Do);
    for &var in vars {
        assert_eq!(ast.kind(var), AstKind::Var);
        assert_eq!(ast.children(var).len(), 2);
        assert_eq!(ast.kind(ast.children(var)[0]), AstKind::Identifier);
    }
}
