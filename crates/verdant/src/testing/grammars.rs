//! Small grammars used by tests, benchmarks and documentation.
//!
//! These construct their tables at call time and panic if the grammar does
//! not compile, which only happens when the builder itself is broken.

use crate::language::{Language, LanguageBuilder, Rule, Symbol, SymbolSet};
use crate::lexer::{CharSet, ExternalScanner, Pattern, ScanCursor};
use std::sync::Arc;

/// A tiny function language.
///
/// ```text
/// fn add(a, b) { a + b }
/// fn main() { add(1, 2); }   // calls are not part of the language
/// ```
///
/// Binary operators are left associative, `*` and `/` bind tighter than
/// `+` and `-`. Line comments and whitespace are extras.
#[must_use]
pub fn toy() -> Language {
    let expression = || Rule::sym("_expression");
    let operation = |level, operators: [&str; 2]| {
        Rule::prec_left(
            level,
            Rule::seq([
                Rule::field("left", expression()),
                Rule::field(
                    "operator",
                    Rule::choice(operators.map(Rule::lit)),
                ),
                Rule::field("right", expression()),
            ]),
        )
    };

    LanguageBuilder::new("toy")
        .token("identifier", Pattern::identifier())
        .token("number", Pattern::repeat1(Pattern::chars(CharSet::digits())))
        .extra(
            "comment",
            Pattern::seq([
                Pattern::literal("//"),
                Pattern::repeat(Pattern::chars(CharSet::single('\n').negate())),
            ]),
        )
        .extra(
            "_whitespace",
            Pattern::repeat1(Pattern::chars(CharSet::whitespace())),
        )
        .word("identifier")
        .rule("source_file", Rule::repeat(Rule::sym("function_definition")))
        .rule(
            "function_definition",
            Rule::seq([
                Rule::lit("fn"),
                Rule::field("name", Rule::sym("identifier")),
                Rule::field("parameters", Rule::sym("parameter_list")),
                Rule::field("body", Rule::sym("block")),
            ]),
        )
        .rule(
            "parameter_list",
            Rule::seq([
                Rule::lit("("),
                Rule::optional(Rule::seq([
                    Rule::sym("identifier"),
                    Rule::repeat(Rule::seq([Rule::lit(","), Rule::sym("identifier")])),
                ])),
                Rule::lit(")"),
            ]),
        )
        .rule(
            "block",
            Rule::seq([
                Rule::lit("{"),
                Rule::repeat(Rule::sym("statement")),
                Rule::optional(expression()),
                Rule::lit("}"),
            ]),
        )
        .rule("statement", Rule::seq([expression(), Rule::lit(";")]))
        .rule(
            "_expression",
            Rule::choice([
                Rule::sym("binary_expression"),
                Rule::sym("number"),
                Rule::sym("identifier"),
                Rule::sym("parenthesized_expression"),
            ]),
        )
        .rule(
            "parenthesized_expression",
            Rule::seq([Rule::lit("("), expression(), Rule::lit(")")]),
        )
        .rule(
            "binary_expression",
            Rule::choice([operation(1, ["+", "-"]), operation(2, ["*", "/"])]),
        )
        .load()
        .expect("toy grammar compiles")
}

/// `expression -> expression "+" expression | number`, with the conflict
/// left unresolved so every parse of a chain of additions forks.
#[must_use]
pub fn ambiguous() -> Language {
    LanguageBuilder::new("ambiguous")
        .token("number", Pattern::repeat1(Pattern::chars(CharSet::digits())))
        .extra(
            "_whitespace",
            Pattern::repeat1(Pattern::chars(CharSet::whitespace())),
        )
        .rule(
            "expression",
            Rule::choice([
                Rule::seq([
                    Rule::sym("expression"),
                    Rule::lit("+"),
                    Rule::sym("expression"),
                ]),
                Rule::sym("number"),
            ]),
        )
        .load()
        .expect("ambiguous grammar compiles")
}

/// Tagged sections whose closing tag must repeat the opening label:
///
/// ```text
/// <intro> some words <note> more </note> </intro>
/// ```
///
/// Tags come from an external scanner that keeps the open labels as its
/// state, so a closing tag only lexes when it matches.
#[must_use]
pub fn labels() -> Language {
    let descriptor = LanguageBuilder::new("labels")
        .token("word", Pattern::identifier())
        .extra(
            "_whitespace",
            Pattern::repeat1(Pattern::chars(CharSet::whitespace())),
        )
        .external("open_tag")
        .external("close_tag")
        .external("_error_sentinel")
        .rule("document", Rule::repeat(Rule::sym("section")))
        .rule(
            "section",
            Rule::seq([
                Rule::sym("open_tag"),
                Rule::repeat(Rule::sym("_item")),
                Rule::sym("close_tag"),
            ]),
        )
        .rule(
            "_item",
            Rule::choice([Rule::sym("word"), Rule::sym("section")]),
        )
        .build()
        .expect("labels grammar compiles");

    let symbol = |name| {
        descriptor
            .symbol_named(name)
            .expect("external token is declared")
    };
    let kinds = TagKinds {
        open: symbol("open_tag"),
        close: symbol("close_tag"),
        sentinel: symbol("_error_sentinel"),
    };
    Language::load_with_scanner(
        descriptor,
        Arc::new(move || Box::new(LabelScanner::new(kinds)) as Box<dyn ExternalScanner>),
    )
    .expect("labels grammar loads")
}

#[derive(Debug, Clone, Copy)]
struct TagKinds {
    open: Symbol,
    close: Symbol,
    sentinel: Symbol,
}

/// Scanner for [`labels`]: a stack of open labels.
#[derive(Debug)]
struct LabelScanner {
    kinds: TagKinds,
    open: Vec<String>,
}

impl LabelScanner {
    const fn new(kinds: TagKinds) -> Self {
        Self {
            kinds,
            open: Vec::new(),
        }
    }
}

impl ExternalScanner for LabelScanner {
    fn scan(&mut self, cursor: &mut ScanCursor<'_, '_>, valid: &SymbolSet) -> Option<Symbol> {
        // The sentinel is only valid while recovering.
        if valid.contains(self.kinds.sentinel) || cursor.lookahead() != Some('<') {
            return None;
        }
        cursor.advance();
        let closing = cursor.lookahead() == Some('/');
        if closing {
            cursor.advance();
        }
        let mut label = String::new();
        while let Some(c) = cursor.lookahead().filter(|c| c.is_alphanumeric() || *c == '_') {
            label.push(c);
            cursor.advance();
        }
        if label.is_empty() || cursor.lookahead() != Some('>') {
            return None;
        }
        cursor.advance();
        cursor.mark_end();

        if closing {
            if !valid.contains(self.kinds.close) || self.open.last() != Some(&label) {
                return None;
            }
            self.open.pop();
            Some(self.kinds.close)
        } else {
            if !valid.contains(self.kinds.open) {
                return None;
            }
            self.open.push(label);
            Some(self.kinds.open)
        }
    }

    fn serialize(&self, buf: &mut Vec<u8>) {
        for (index, label) in self.open.iter().enumerate() {
            if index > 0 {
                buf.push(0);
            }
            buf.extend_from_slice(label.as_bytes());
        }
    }

    fn deserialize(&mut self, state: &[u8]) {
        self.open.clear();
        if state.is_empty() {
            return;
        }
        self.open.extend(
            state
                .split(|byte| *byte == 0)
                .map(|label| String::from_utf8_lossy(label).into_owned()),
        );
    }
}
