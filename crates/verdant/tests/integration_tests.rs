use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use verdant::language::{LanguageBuilder, Rule};
use verdant::lexer::{CharSet, Pattern};
use verdant::testing::grammars;
use verdant::{CancelReason, Node, ParseError, ParseOptions, Parser, Tree, TreeCursor};

/// Route engine logs to the test harness; set `RUST_LOG=verdant=debug` to see them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn parse_toy(text: &str) -> Tree {
    init_tracing();
    let mut parser = Parser::new();
    parser.set_language(grammars::toy()).unwrap();
    parser.parse(text, None, &ParseOptions::default()).unwrap()
}

fn preorder(cursor: &mut TreeCursor<'_>, out: &mut Vec<String>) {
    let node = cursor.node();
    match cursor.current_field_name() {
        Some(field) => out.push(format!("{field}:{}", node.kind())),
        None => out.push(node.kind().to_owned()),
    }
    if cursor.goto_first_child() {
        loop {
            preorder(cursor, out);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
        cursor.goto_parent();
    }
}

fn count_nodes(node: Node<'_>) -> usize {
    1 + node.children().into_iter().map(count_nodes).sum::<usize>()
}

#[test]
fn test_language_from_builder_end_to_end() {
    init_tracing();
    let language = LanguageBuilder::new("lists")
        .token("item", Pattern::repeat1(Pattern::chars(CharSet::new([('a', 'z')]))))
        .extra("_space", Pattern::repeat1(Pattern::chars(CharSet::whitespace())))
        .rule(
            "list",
            Rule::seq([
                Rule::lit("["),
                Rule::optional(Rule::seq([
                    Rule::field("head", Rule::sym("item")),
                    Rule::repeat(Rule::seq([Rule::lit(","), Rule::field("tail", Rule::sym("item"))])),
                ])),
                Rule::lit("]"),
            ]),
        )
        .load()
        .unwrap();
    assert_eq!(language.name(), "lists");
    assert!(language.field_id_for_name("head").is_some());

    let mut parser = Parser::new();
    parser.set_language(language).unwrap();
    let tree = parser.parse("[ a, bc ,d ]", None, &ParseOptions::default()).unwrap();
    assert!(!tree.has_error());
    assert_eq!(tree.to_sexp(), "(list head: (item) tail: (item) tail: (item))");
    let tail = tree.root_node().child_by_field_name("tail").unwrap();
    assert_eq!(tail.utf8_text(b"[ a, bc ,d ]"), Some("bc"));
}

#[test]
fn test_cursor_visits_every_visible_node() {
    let tree = parse_toy("fn f(a) { a * (2 + a) }");
    let mut visited = Vec::new();
    preorder(&mut tree.walk(), &mut visited);
    assert_eq!(visited.len(), count_nodes(tree.root_node()));
    assert_eq!(
        &visited[..6],
        ["source_file", "function_definition", "fn", "name:identifier", "parameters:parameter_list", "("]
    );
    assert!(visited.contains(&"right:parenthesized_expression".to_owned()));
}

#[test]
fn test_node_navigation() {
    let text = "fn f() { 1; 2 }";
    let tree = parse_toy(text);
    let function = tree.root_node().named_child(0).unwrap();
    let body = function.child_by_field_name("body").unwrap();
    assert_eq!(body.kind(), "block");
    assert_eq!(body.utf8_text(text.as_bytes()), Some("{ 1; 2 }"));
    let statement = body.named_child(0).unwrap();
    assert_eq!(statement.kind(), "statement");
    assert_eq!((statement.start_byte(), statement.end_byte()), (9, 11));
    assert!(body.named_child(2).is_none());
    assert!(function.child_by_field_name("missing").is_none());
}

#[test]
fn test_cancel_flag_shared_across_threads() {
    let flag = Arc::new(AtomicBool::new(false));
    let options = ParseOptions {
        cancel_flag: Some(Arc::clone(&flag)),
        ..ParseOptions::default()
    };
    let handle = std::thread::spawn({
        let flag = Arc::clone(&flag);
        move || flag.store(true, std::sync::atomic::Ordering::Relaxed)
    });
    handle.join().unwrap();

    let mut parser = Parser::new();
    parser.set_language(grammars::toy()).unwrap();
    assert_eq!(
        parser.parse("fn a() {}", None, &options).err(),
        Some(ParseError::Cancelled {
            reason: CancelReason::Flag
        })
    );
}

#[test]
fn test_tree_debug_output() {
    let tree = parse_toy("fn f() {}");
    assert_eq!(
        format!("{tree:?}"),
        "{Tree toy (source_file (function_definition name: (identifier) parameters: (parameter_list) body: (block)))}"
    );
}

#[cfg(feature = "serialize")]
#[test]
fn test_descriptor_json_round_trip() {
    use verdant::Language;
    use verdant::language::LanguageDescriptor;

    let descriptor = LanguageBuilder::new("words")
        .token("word", Pattern::identifier())
        .extra("_space", Pattern::repeat1(Pattern::chars(CharSet::whitespace())))
        .rule("text", Rule::repeat(Rule::sym("word")))
        .build()
        .unwrap();
    let json = descriptor.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["name"], "words");
    assert!(value["symbols"].as_array().is_some_and(|symbols| !symbols.is_empty()));
    let loaded = Language::load(LanguageDescriptor::from_json(&json).unwrap()).unwrap();

    let mut parser = Parser::new();
    parser.set_language(loaded).unwrap();
    let tree = parser.parse("hello there", None, &ParseOptions::default()).unwrap();
    assert_eq!(tree.to_sexp(), "(text (word) (word))");
}
