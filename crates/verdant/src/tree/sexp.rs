//! S-expression rendering of named nodes.

use crate::tree::Node;

/// Append the s-expression of `node` to `out`. Anonymous tokens are left
/// out unless they are missing.
pub(crate) fn write_node(node: Node<'_>, out: &mut String) {
    if node.is_missing() {
        out.push_str("(MISSING ");
        if node.is_named() {
            out.push_str(node.kind());
        } else {
            out.push('"');
            out.push_str(node.kind());
            out.push('"');
        }
        out.push(')');
        return;
    }
    out.push('(');
    out.push_str(node.kind());
    for child in node.children() {
        if !child.is_named() && !child.is_missing() {
            continue;
        }
        out.push(' ');
        if let Some(field) = child.field_name() {
            out.push_str(field);
            out.push_str(": ");
        }
        write_node(child, out);
    }
    out.push(')');
}

#[cfg(test)]
mod tests {
    use crate::Parser;
    use crate::testing::grammars;

    fn sexp(text: &str) -> String {
        let mut parser = Parser::new();
        parser.set_language(grammars::toy()).unwrap();
        parser
            .parse(text, None, &Default::default())
            .unwrap()
            .to_sexp()
    }

    #[test]
    fn test_fields_and_anonymous_tokens() {
        assert_eq!(
            sexp("fn f(a) { a * 2 }"),
            "(source_file (function_definition name: (identifier) \
             parameters: (parameter_list (identifier)) \
             body: (block (binary_expression left: (identifier) right: (number)))))"
        );
    }

    #[test]
    fn test_empty_source() {
        assert_eq!(sexp(""), "(source_file)");
        assert_eq!(sexp("  // nothing\n"), "(source_file (comment))");
    }

    #[test]
    fn test_missing_anonymous_token() {
        assert_eq!(
            sexp("fn f( {}"),
            "(source_file (function_definition name: (identifier) \
             parameters: (parameter_list (MISSING \")\")) body: (block)))"
        );
    }
}
