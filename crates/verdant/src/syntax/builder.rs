//! Node construction for the parser.
//!
//! [`TreeBuilder`] turns lexed tokens, reductions and recovery decisions into
//! green nodes with the right flags and error costs.

use crate::language::{Language, StateId, Symbol, SymbolType};
use crate::lexer::LexedToken;
use crate::syntax::green::LeafSpec;
use crate::syntax::{GreenNode, Length, NodeFlags};
use std::sync::Arc;

/// Production id of nodes that no grammar production built: recovery roots.
pub(crate) const NO_PRODUCTION: u16 = u16::MAX;

/// Cost of a zero-width missing leaf.
pub const ERROR_COST_PER_MISSING_TREE: u32 = 110;
/// Fixed cost of every `ERROR` node.
pub const ERROR_COST_PER_RECOVERY: u32 = 500;
/// Cost of each subtree or token wrapped in an `ERROR` node.
pub const ERROR_COST_PER_SKIPPED_TREE: u32 = 100;
/// Cost of each byte wrapped in an `ERROR` node.
pub const ERROR_COST_PER_SKIPPED_CHAR: u32 = 1;
/// Cost of each line break wrapped in an `ERROR` node.
pub const ERROR_COST_PER_SKIPPED_LINE: u32 = 30;

/// Builds green nodes for one language.
#[derive(Debug, Clone)]
pub(crate) struct TreeBuilder {
    language: Language,
}

impl TreeBuilder {
    pub(crate) const fn new(language: Language) -> Self {
        Self { language }
    }

    fn symbol_flags(&self, symbol: Symbol) -> NodeFlags {
        match self.language.symbol_type(symbol) {
            Some(SymbolType::Regular) => NodeFlags::NAMED | NodeFlags::VISIBLE,
            Some(SymbolType::Anonymous) => NodeFlags::VISIBLE,
            Some(SymbolType::Hidden) => NodeFlags::NAMED,
            Some(SymbolType::Auxiliary) | None => NodeFlags::empty(),
        }
    }

    /// Leaf for a lexed token pushed from `parse_state`. Extras are flagged
    /// from the grammar; lexer error tokens are hidden error leaves.
    pub(crate) fn leaf(&self, token: &LexedToken, parse_state: StateId) -> Arc<GreenNode> {
        let flags = if token.symbol.is_error() {
            NodeFlags::HAS_ERROR
        } else if self.language.is_extra(token.symbol) {
            self.symbol_flags(token.symbol) | NodeFlags::EXTRA
        } else {
            self.symbol_flags(token.symbol)
        };
        GreenNode::leaf(LeafSpec {
            symbol: token.symbol,
            size: token.size,
            flags,
            parse_state,
            lookahead_bytes: token.lookahead_bytes,
            error_cost: 0,
            external_state: token.external_state.clone(),
        })
    }

    /// Zero-width leaf standing in for a token the input lacks.
    pub(crate) fn missing_leaf(
        &self,
        symbol: Symbol,
        parse_state: StateId,
        lookahead_bytes: u32,
    ) -> Arc<GreenNode> {
        GreenNode::leaf(LeafSpec {
            symbol,
            size: Length::zero(),
            flags: self.symbol_flags(symbol) | NodeFlags::MISSING | NodeFlags::HAS_ERROR,
            parse_state,
            lookahead_bytes,
            error_cost: ERROR_COST_PER_MISSING_TREE,
            external_state: None,
        })
    }

    /// Node for a reduction of `production` over `children`.
    pub(crate) fn reduce(
        &self,
        symbol: Symbol,
        production: u16,
        parse_state: StateId,
        children: Vec<Arc<GreenNode>>,
        fragile: bool,
        lookahead_bytes: u32,
    ) -> Arc<GreenNode> {
        let mut flags = self.symbol_flags(symbol);
        if fragile {
            flags |= NodeFlags::FRAGILE;
        }
        GreenNode::branch(
            symbol,
            flags,
            production,
            parse_state,
            children,
            0,
            lookahead_bytes,
        )
    }

    /// Extra `ERROR` node wrapping skipped tokens and popped subtrees.
    pub(crate) fn error_node(
        &self,
        parse_state: StateId,
        children: Vec<Arc<GreenNode>>,
    ) -> Arc<GreenNode> {
        let skipped_trees = children.iter().filter(|child| !child.is_extra()).count();
        let size = children
            .iter()
            .fold(Length::zero(), |size, child| size + child.size());
        let cost = ERROR_COST_PER_RECOVERY
            .saturating_add(
                ERROR_COST_PER_SKIPPED_TREE
                    .saturating_mul(u32::try_from(skipped_trees).unwrap_or(u32::MAX)),
            )
            .saturating_add(ERROR_COST_PER_SKIPPED_CHAR.saturating_mul(size.bytes))
            .saturating_add(ERROR_COST_PER_SKIPPED_LINE.saturating_mul(size.extent.row));
        GreenNode::branch(
            Symbol::ERROR,
            NodeFlags::NAMED | NodeFlags::VISIBLE | NodeFlags::EXTRA | NodeFlags::HAS_ERROR,
            NO_PRODUCTION,
            parse_state,
            children,
            cost,
            0,
        )
    }

    /// Start-symbol root produced when recovery gives up: the surviving
    /// stack contents followed by whatever input was left.
    pub(crate) fn recovery_root(&self, children: Vec<Arc<GreenNode>>) -> Arc<GreenNode> {
        let symbol = self.language.start_symbol();
        GreenNode::branch(
            symbol,
            self.symbol_flags(symbol) | NodeFlags::HAS_ERROR,
            NO_PRODUCTION,
            0,
            children,
            0,
            0,
        )
    }

    /// Move extras that surround the accepted start symbol into the root.
    pub(crate) fn splice_root(
        &self,
        leading: Vec<Arc<GreenNode>>,
        root: &Arc<GreenNode>,
        trailing: Vec<Arc<GreenNode>>,
    ) -> Arc<GreenNode> {
        if leading.is_empty() && trailing.is_empty() {
            return Arc::clone(root);
        }
        let mut children = leading;
        children.extend(root.children().iter().cloned());
        children.extend(trailing);
        let own = root.flags() & (NodeFlags::NAMED | NodeFlags::VISIBLE | NodeFlags::FRAGILE);
        GreenNode::branch(
            root.symbol(),
            own,
            root.production_id(),
            root.parse_state(),
            children,
            0,
            root.lookahead_bytes(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{LanguageBuilder, Rule};
    use crate::lexer::{CharSet, Pattern};

    fn language() -> Language {
        LanguageBuilder::new("pairs")
            .token("number", Pattern::repeat1(Pattern::chars(CharSet::digits())))
            .extra("_space", Pattern::repeat1(Pattern::literal(" ")))
            .rule("pair", Rule::seq([Rule::sym("number"), Rule::lit(","), Rule::sym("number")]))
            .load()
            .unwrap()
    }

    fn token(language: &Language, name: &str, named: bool, text: &str) -> LexedToken {
        LexedToken {
            symbol: language.symbol_for_name(name, named).unwrap_or(Symbol::ERROR),
            start: Length::zero(),
            size: Length::of(text.as_bytes()),
            lookahead_bytes: 1,
            external_state: None,
        }
    }

    #[test]
    fn test_leaf_flags_follow_symbol_type() {
        let language = language();
        let builder = TreeBuilder::new(language.clone());
        let number = builder.leaf(&token(&language, "number", true, "12"), 0);
        assert!(number.is_named() && number.is_visible() && !number.is_extra());

        let comma = builder.leaf(&token(&language, ",", false, ","), 1);
        assert!(!comma.is_named() && comma.is_visible());
        assert_eq!(comma.parse_state(), 1);

        let space = LexedToken {
            symbol: Symbol::new(2),
            ..token(&language, "number", true, " ")
        };
        assert!(builder.leaf(&space, 0).is_extra());

        let unknown = LexedToken {
            symbol: Symbol::ERROR,
            ..token(&language, "number", true, "$")
        };
        let unknown = builder.leaf(&unknown, 0);
        assert!(unknown.has_error() && !unknown.is_visible());
    }

    #[test]
    fn test_error_node_cost() {
        let language = language();
        let builder = TreeBuilder::new(language.clone());
        let children = vec![
            builder.leaf(&token(&language, "number", true, "12"), 0),
            builder.leaf(&token(&language, ",", false, ","), 0),
        ];
        let error = builder.error_node(0, children);
        assert_eq!(error.symbol(), Symbol::ERROR);
        assert!(error.is_extra() && error.has_error() && error.is_visible());
        assert_eq!(error.error_cost(), 500 + 2 * 100 + 3);
    }

    #[test]
    fn test_missing_leaf() {
        let language = language();
        let builder = TreeBuilder::new(language.clone());
        let number = language.symbol_for_name("number", true).unwrap();
        let missing = builder.missing_leaf(number, 3, 1);
        assert!(missing.is_missing() && missing.has_error() && missing.is_named());
        assert!(missing.size().is_zero());
        assert_eq!(missing.error_cost(), ERROR_COST_PER_MISSING_TREE);
    }

    #[test]
    fn test_splice_root_keeps_production() {
        let language = language();
        let builder = TreeBuilder::new(language.clone());
        let pair = language.symbol_for_name("pair", true).unwrap();
        let root = builder.reduce(
            pair,
            0,
            0,
            vec![
                builder.leaf(&token(&language, "number", true, "1"), 0),
                builder.leaf(&token(&language, ",", false, ","), 1),
                builder.leaf(&token(&language, "number", true, "2"), 2),
            ],
            false,
            1,
        );
        let space = LexedToken {
            symbol: Symbol::new(2),
            ..token(&language, "number", true, "  ")
        };
        let spliced = builder.splice_root(vec![builder.leaf(&space, 0)], &root, Vec::new());
        assert_eq!(spliced.child_count(), 4);
        assert_eq!(spliced.size().bytes, 5);
        assert_eq!(spliced.production_id(), 0);
        assert!(Arc::ptr_eq(&builder.splice_root(Vec::new(), &root, Vec::new()), &root));
    }
}
