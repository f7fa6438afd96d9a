use verdant::testing::grammars;
use verdant::{GlrConfig, ParseOptions, Parser, StackPruningStrategy};

fn ambiguous_parser(config: GlrConfig) -> Parser {
    let mut parser = Parser::with_config(config);
    parser.set_language(grammars::ambiguous()).unwrap();
    parser
}

#[test]
fn test_ambiguous_input_forks_and_merges() {
    let mut parser = ambiguous_parser(GlrConfig::default());
    let tree = parser.parse("1+2+3+4", None, &ParseOptions::default()).unwrap();
    assert!(!tree.has_error());
    let stats = parser.last_stats();
    assert!(stats.forks > 0, "{stats:?}");
    assert!(stats.merges > 0, "{stats:?}");
    assert!(stats.max_heads > 1);
    assert_eq!(stats.recoveries, 0);
}

#[test]
fn test_first_listed_action_wins_ties() {
    let mut parser = ambiguous_parser(GlrConfig::default());
    let tree = parser.parse("1+2+3", None, &ParseOptions::default()).unwrap();
    assert_eq!(
        tree.to_sexp(),
        "(expression (expression (number)) \
         (expression (expression (number)) (expression (number))))"
    );
}

#[test]
fn test_choice_is_deterministic() {
    let text = "1 + 2 + 3 + 4 + 5 + 6";
    let mut parser = ambiguous_parser(GlrConfig::default());
    let first = parser.parse(text, None, &ParseOptions::default()).unwrap();
    for _ in 0..5 {
        let again = parser.parse(text, None, &ParseOptions::default()).unwrap();
        assert_eq!(again.to_sexp(), first.to_sexp());
    }
}

#[test]
fn test_pruning_keeps_a_valid_parse() {
    let config = GlrConfig {
        max_stacks: 2,
        pruning_beam_width: 2,
        pruning_strategy: StackPruningStrategy::PreferProgress,
        ..GlrConfig::default()
    };
    let mut parser = ambiguous_parser(config);
    let text = "1+2+3+4+5+6+7+8";
    let tree = parser.parse(text, None, &ParseOptions::default()).unwrap();
    assert!(!tree.has_error());
    assert_eq!(tree.len() as usize, text.len());
    assert!(parser.last_stats().pruned > 0);
}

#[test]
fn test_unambiguous_grammar_never_forks() {
    let mut parser = Parser::new();
    parser.set_language(grammars::toy()).unwrap();
    parser
        .parse("fn a(x, y) { x * (y + 1); x - y / 2 }", None, &ParseOptions::default())
        .unwrap();
    let stats = parser.last_stats();
    assert_eq!(stats.forks, 0);
    assert_eq!(stats.max_heads, 1);
}

#[test]
fn test_precedence_shapes_tree() {
    let mut parser = Parser::new();
    parser.set_language(grammars::toy()).unwrap();
    let tree = parser
        .parse("fn f() { 1 - 2 - 3 * 4 }", None, &ParseOptions::default())
        .unwrap();
    assert_eq!(
        tree.to_sexp(),
        "(source_file (function_definition name: (identifier) parameters: (parameter_list) \
         body: (block (binary_expression \
         left: (binary_expression left: (number) right: (number)) \
         right: (binary_expression left: (number) right: (number))))))"
    );
}
