//! Tree and language rendering
//!
//! Renders parse trees as Graphviz or JSON and summarizes the tables of a
//! loaded language.

use serde_json::{Value, json};
use std::fmt::{self, Write};
use verdant::language::{FieldId, Symbol, SymbolType};
use verdant::{Language, Node, Tree};

/// Generate a DOT/Graphviz representation of a tree
///
/// Named nodes are ellipses, anonymous tokens are boxes. Errors are red and
/// missing tokens are dashed. Leaves carry their text when `source` is given.
#[must_use]
pub fn generate_dot(tree: &Tree, source: Option<&[u8]>) -> String {
    let mut output = String::new();
    // Writing to a String cannot fail.
    let _ = write_dot(&mut output, tree, source);
    output
}

fn write_dot(output: &mut String, tree: &Tree, source: Option<&[u8]>) -> fmt::Result {
    writeln!(output, "digraph Tree {{")?;
    writeln!(output, "  node [fontname=\"monospace\"];")?;
    let mut next_id = 0usize;
    write_dot_node(output, tree.root_node(), source, &mut next_id)?;
    writeln!(output, "}}")
}

fn write_dot_node(output: &mut String, node: Node<'_>, source: Option<&[u8]>, next_id: &mut usize) -> fmt::Result {
    let id = *next_id;
    *next_id += 1;

    let mut label = escape(node.kind());
    let children = node.children();
    if children.is_empty() && node.is_named() {
        if let Some(text) = source.and_then(|source| node.utf8_text(source)) {
            write!(label, "\\n{}", escape(text))?;
        }
    }
    let shape = if node.is_named() { "ellipse" } else { "box" };
    write!(output, "  n{id} [label=\"{label}\", shape={shape}")?;
    if node.is_error() {
        write!(output, ", color=red, fontcolor=red")?;
    } else if node.is_missing() {
        write!(output, ", style=dashed")?;
    } else if node.is_extra() {
        write!(output, ", color=gray, fontcolor=gray")?;
    }
    writeln!(output, "];")?;

    for child in children {
        let child_id = *next_id;
        write_dot_node(output, child, source, next_id)?;
        match child.field_name() {
            Some(field) => writeln!(output, "  n{id} -> n{child_id} [label=\"{field}\"];")?,
            None => writeln!(output, "  n{id} -> n{child_id};")?,
        }
    }
    Ok(())
}

fn escape(text: &str) -> String {
    text.chars()
        .flat_map(|c| match c {
            '"' => vec!['\\', '"'],
            '\\' => vec!['\\', '\\'],
            '\n' => vec!['\\', 'n'],
            c => vec![c],
        })
        .collect()
}

/// JSON form of a tree: nested objects with kind, byte range and flags.
#[must_use]
pub fn tree_json(tree: &Tree) -> Value {
    node_json(tree.root_node())
}

fn node_json(node: Node<'_>) -> Value {
    let mut value = json!({
        "kind": node.kind(),
        "named": node.is_named(),
        "start_byte": node.start_byte(),
        "end_byte": node.end_byte(),
        "start_point": [node.start_point().row, node.start_point().column],
        "end_point": [node.end_point().row, node.end_point().column],
    });
    if let Some(field) = node.field_name() {
        value["field"] = json!(field);
    }
    if node.is_missing() {
        value["missing"] = json!(true);
    }
    if node.is_extra() {
        value["extra"] = json!(true);
    }
    let children = node.children();
    if !children.is_empty() {
        value["children"] = Value::Array(children.into_iter().map(node_json).collect());
    }
    value
}

fn symbol_type_name(symbol_type: SymbolType) -> &'static str {
    match symbol_type {
        SymbolType::Regular => "regular",
        SymbolType::Anonymous => "anonymous",
        SymbolType::Hidden => "hidden",
        SymbolType::Auxiliary => "auxiliary",
    }
}

fn symbols(language: &Language) -> impl Iterator<Item = (Symbol, &str, SymbolType)> {
    (0..language.symbol_count()).filter_map(move |index| {
        let symbol = Symbol::new(u16::try_from(index).ok()?);
        Some((symbol, language.symbol_name(symbol)?, language.symbol_type(symbol)?))
    })
}

fn fields(language: &Language) -> impl Iterator<Item = (FieldId, &str)> {
    (1..=language.field_count()).filter_map(move |index| {
        let field = FieldId::new(u16::try_from(index).ok()?)?;
        Some((field, language.field_name_for_id(field)?))
    })
}

fn symbol_flags(language: &Language, symbol: Symbol) -> String {
    let mut flags = Vec::new();
    if language.is_terminal(symbol) {
        flags.push("terminal");
    }
    if language.is_extra(symbol) {
        flags.push("extra");
    }
    if language.is_keyword(symbol) {
        flags.push("keyword");
    }
    if language.is_external(symbol) {
        flags.push("external");
    }
    if language.word_token() == Some(symbol) {
        flags.push("word");
    }
    flags.join(",")
}

/// Text table of a language's symbols and fields.
#[must_use]
pub fn describe_language(language: &Language) -> String {
    let mut output = String::new();
    let _ = write_description(&mut output, language);
    output
}

fn write_description(output: &mut String, language: &Language) -> fmt::Result {
    writeln!(output, "language {} (version {})", language.name(), language.version())?;
    writeln!(
        output,
        "{} symbols, {} terminals, {} fields, {} states",
        language.symbol_count(),
        language.terminal_count(),
        language.field_count(),
        language.state_count()
    )?;
    writeln!(output)?;
    writeln!(output, "symbols:")?;
    for (symbol, name, symbol_type) in symbols(language) {
        writeln!(
            output,
            "  {:>4}  {:<28} {:<10} {}",
            symbol.id(),
            format!("{name:?}"),
            symbol_type_name(symbol_type),
            symbol_flags(language, symbol)
        )?;
    }
    writeln!(output)?;
    writeln!(output, "fields:")?;
    for (field, name) in fields(language) {
        writeln!(output, "  {:>4}  {name}", field.get())?;
    }
    Ok(())
}

/// JSON form of [`describe_language`].
#[must_use]
pub fn describe_language_json(language: &Language) -> Value {
    json!({
        "name": language.name(),
        "version": language.version(),
        "states": language.state_count(),
        "start_symbol": language.start_symbol().id(),
        "symbols": symbols(language)
            .map(|(symbol, name, symbol_type)| json!({
                "id": symbol.id(),
                "name": name,
                "type": symbol_type_name(symbol_type),
                "flags": symbol_flags(language, symbol),
            }))
            .collect::<Vec<_>>(),
        "fields": fields(language)
            .map(|(field, name)| json!({ "id": field.get(), "name": name }))
            .collect::<Vec<_>>(),
    })
}
