#![no_main]
use libfuzzer_sys::fuzz_target;
use verdant::testing::grammars;
use verdant::{ParseOptions, Parser};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let options = ParseOptions {
        max_operations: Some(200_000),
        ..ParseOptions::default()
    };
    for language in [grammars::toy(), grammars::ambiguous(), grammars::labels()] {
        let mut parser = Parser::new();
        parser.set_language(language).unwrap();
        let Ok(tree) = parser.parse(text, None, &options) else {
            continue;
        };
        assert_eq!(tree.len() as usize, text.len());
        let mut end = 0;
        for leaf in tree.leaves() {
            assert_eq!(leaf.start_byte(), end);
            end = leaf.end_byte();
        }
        assert_eq!(end as usize, text.len());
    }
});
