use cw_core::Language;

/// Per-language tree-sitter node-kind sets driving context paths and comment
/// absorption.
pub struct LanguageProfile {
    hierarchy: &'static [(&'static str, &'static str)],
    name_kinds: &'static [&'static str],
    comment_kinds: &'static [&'static str],
}

impl LanguageProfile {
    /// Profile for a language, or `None` when it has no AST grammar.
    pub fn for_language(language: Language) -> Option<&'static Self> {
        match language {
            Language::TypeScript | Language::JavaScript => Some(&TYPESCRIPT),
            Language::Python => Some(&PYTHON),
            Language::Go => Some(&GO),
            Language::Java => Some(&JAVA),
            Language::Rust => Some(&RUST),
            _ => None,
        }
    }

    /// Breadcrumb prefix (e.g. `"function "`) when the node kind is in the
    /// hierarchy set, else `None`.
    pub fn hierarchy_prefix(&self, kind: &str) -> Option<&'static str> {
        self.hierarchy
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, prefix)| *prefix)
    }

    /// Whether a child node kind can supply the name of a hierarchy node.
    pub fn is_name_kind(&self, kind: &str) -> bool {
        self.name_kinds.contains(&kind)
    }

    pub fn is_comment(&self, kind: &str) -> bool {
        self.comment_kinds.contains(&kind)
    }
}

static TYPESCRIPT: LanguageProfile = LanguageProfile {
    hierarchy: &[
        ("class_declaration", "class "),
        ("abstract_class_declaration", "class "),
        ("interface_declaration", "interface "),
        ("function_declaration", "function "),
        ("generator_function_declaration", "function "),
        ("method_definition", "method "),
        ("enum_declaration", "enum "),
        ("internal_module", "module "),
    ],
    name_kinds: &["identifier", "type_identifier", "property_identifier"],
    comment_kinds: &["comment"],
};

static PYTHON: LanguageProfile = LanguageProfile {
    hierarchy: &[
        ("function_definition", "function "),
        ("class_definition", "class "),
    ],
    name_kinds: &["identifier"],
    comment_kinds: &["comment"],
};

static GO: LanguageProfile = LanguageProfile {
    hierarchy: &[
        ("function_declaration", "function "),
        ("method_declaration", "method "),
        ("type_spec", "type "),
    ],
    name_kinds: &["identifier", "type_identifier", "field_identifier"],
    comment_kinds: &["comment"],
};

static JAVA: LanguageProfile = LanguageProfile {
    hierarchy: &[
        ("class_declaration", "class "),
        ("interface_declaration", "interface "),
        ("enum_declaration", "enum "),
        ("record_declaration", "record "),
        ("method_declaration", "method "),
        ("constructor_declaration", "method "),
    ],
    name_kinds: &["identifier"],
    comment_kinds: &["line_comment", "block_comment"],
};

static RUST: LanguageProfile = LanguageProfile {
    hierarchy: &[
        ("function_item", "fn "),
        ("struct_item", "struct "),
        ("enum_item", "enum "),
        ("trait_item", "trait "),
        ("impl_item", "impl "),
        ("mod_item", "module "),
    ],
    name_kinds: &["identifier", "type_identifier"],
    comment_kinds: &["line_comment", "block_comment"],
};
