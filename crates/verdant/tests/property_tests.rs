//! Property-based tests over generated toy programs and random edits.

#![cfg(test)]

use proptest::prelude::*;
use verdant::testing::{GeneratorConfig, SourceGenerator, grammars};
use verdant::{InputEdit, ParseOptions, Parser, Tree};

fn toy_parser() -> Parser {
    let mut parser = Parser::new();
    parser.set_language(grammars::toy()).unwrap();
    parser
}

fn generator(seed: u64) -> SourceGenerator {
    SourceGenerator::new(GeneratorConfig {
        seed: Some(seed),
        ..GeneratorConfig::default()
    })
}

/// Leaves tile the text exactly.
fn assert_covers(tree: &Tree, text: &str) -> Result<(), TestCaseError> {
    let mut rebuilt = String::with_capacity(text.len());
    let mut end = 0;
    for leaf in tree.leaves() {
        prop_assert_eq!(leaf.start_byte(), end);
        end = leaf.end_byte();
        rebuilt.push_str(leaf.utf8_text(text.as_bytes()).unwrap_or(""));
    }
    prop_assert_eq!(rebuilt.as_str(), text);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn generated_programs_parse_without_errors(seed in any::<u64>()) {
        let text = generator(seed).source_file();
        let tree = toy_parser().parse(&text, None, &ParseOptions::default()).unwrap();
        prop_assert!(!tree.has_error(), "{}\n{}", text, tree.to_sexp());
        assert_covers(&tree, &text)?;
    }

    #[test]
    fn arbitrary_text_always_produces_a_covering_tree(text in "[a-z0-9(){};,+*/ \n-]{0,64}") {
        let tree = toy_parser().parse(&text, None, &ParseOptions::default()).unwrap();
        prop_assert_eq!(tree.root_node().kind(), "source_file");
        prop_assert_eq!(tree.len() as usize, text.len());
        assert_covers(&tree, &text)?;
    }

    #[test]
    fn parsing_is_idempotent(seed in any::<u64>(), mutations in 0usize..4) {
        let mut generator = generator(seed);
        let source = generator.source_file();
        let text = generator.mutate(&source, mutations);
        let mut parser = toy_parser();
        let first = parser.parse(&text, None, &ParseOptions::default()).unwrap();
        let second = parser.parse(&text, None, &ParseOptions::default()).unwrap();
        prop_assert_eq!(first.to_sexp(), second.to_sexp());
        prop_assert!(first.structurally_eq(&second));
    }

    #[test]
    fn incremental_reparse_matches_fresh_parse(seed in any::<u64>()) {
        let mut generator = generator(seed);
        let text = generator.source_file();
        let mut parser = toy_parser();
        let options = ParseOptions::default();
        let old = parser.parse(&text, None, &options).unwrap();

        let edit = generator.edit(&text);
        let new_text = edit.apply(&text);
        let input_edit = InputEdit::for_replacement(text.as_bytes(), edit.range, edit.text.as_bytes());
        let edited = old.edit(&input_edit).unwrap();
        prop_assert_eq!(edited.len() as usize, new_text.len());

        let incremental = parser.parse(&new_text, Some(&edited), &options).unwrap();
        let fresh = toy_parser().parse(&new_text, None, &options).unwrap();
        assert_covers(&incremental, &new_text)?;
        prop_assert_eq!(incremental.has_error(), fresh.has_error());
        prop_assert!(
            incremental.structurally_eq(&fresh),
            "{}\n{}\n{}",
            new_text,
            incremental.to_sexp(),
            fresh.to_sexp()
        );
    }
}
