#![no_main]
use libfuzzer_sys::fuzz_target;
use verdant::testing::grammars;
use verdant::{InputEdit, ParseOptions, Parser, TextRange};

fn floor_boundary(text: &str, mut index: usize) -> usize {
    index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fuzz_target!(|input: (&str, u16, u16, &str)| {
    let (text, start, len, replacement) = input;
    let start = floor_boundary(text, usize::from(start));
    let end = floor_boundary(text, start + usize::from(len));

    let mut parser = Parser::new();
    parser.set_language(grammars::toy()).unwrap();
    let options = ParseOptions::default();
    let Ok(old) = parser.parse(text, None, &options) else {
        return;
    };

    let mut new_text = text.to_owned();
    new_text.replace_range(start..end, replacement);
    let (Ok(start32), Ok(end32)) = (u32::try_from(start), u32::try_from(end)) else {
        return;
    };
    let edit = InputEdit::for_replacement(
        text.as_bytes(),
        TextRange::new(start32, end32),
        replacement.as_bytes(),
    );
    let edited = old.edit(&edit).unwrap();
    let incremental = parser.parse(&new_text, Some(&edited), &options).unwrap();
    let fresh = parser.parse(&new_text, None, &options).unwrap();

    assert_eq!(incremental.len(), fresh.len());
    assert_eq!(incremental.has_error(), fresh.has_error());
    if !fresh.has_error() {
        assert!(incremental.structurally_eq(&fresh));
    }
});
