use std::cell::RefCell;
use std::collections::HashMap;

use cw_core::Language;
use tree_sitter::{Language as TSLanguage, Parser, Tree};

use crate::error::SplitterError;

thread_local! {
    /// Parsers are cheap to keep but not Sync; one cache per worker thread,
    /// keyed by grammar.
    static PARSERS: RefCell<HashMap<&'static str, Parser>> = RefCell::new(HashMap::new());
}

/// Maps languages to tree-sitter grammars and hands out cached parsers.
pub struct ParserRegistry;

impl ParserRegistry {
    /// Get the tree-sitter grammar for a given Language and file extension.
    /// The extension matters because TypeScript has both regular and TSX
    /// grammars; JavaScript parses with the TSX grammar.
    pub fn grammar_for(language: Language, ext: &str) -> Option<(&'static str, TSLanguage)> {
        match language {
            Language::Python => Some(("python", tree_sitter_python::LANGUAGE.into())),
            Language::TypeScript => {
                if ext == "tsx" {
                    Some(("tsx", tree_sitter_typescript::LANGUAGE_TSX.into()))
                } else {
                    Some(("typescript", tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()))
                }
            }
            Language::JavaScript => Some(("tsx", tree_sitter_typescript::LANGUAGE_TSX.into())),
            Language::Rust => Some(("rust", tree_sitter_rust::LANGUAGE.into())),
            Language::Go => Some(("go", tree_sitter_go::LANGUAGE.into())),
            Language::Java => Some(("java", tree_sitter_java::LANGUAGE.into())),
            _ => None,
        }
    }

    /// Parse a source file with the thread-local parser for its grammar.
    pub fn parse(language: Language, ext: &str, path: &str, source: &str) -> Result<Tree, SplitterError> {
        let (key, grammar) =
            Self::grammar_for(language, ext).ok_or_else(|| SplitterError::UnsupportedLanguage {
                language: language.tag().to_string(),
            })?;

        PARSERS.with(|cache| {
            let mut cache = cache.borrow_mut();
            if !cache.contains_key(key) {
                let mut parser = Parser::new();
                parser
                    .set_language(&grammar)
                    .map_err(|e| SplitterError::ParseFailed {
                        path: path.to_string(),
                        reason: format!("failed to set language: {e}"),
                    })?;
                cache.insert(key, parser);
            }
            let parser = cache.get_mut(key).unwrap();
            parser.parse(source, None).ok_or_else(|| SplitterError::ParseFailed {
                path: path.to_string(),
                reason: "tree-sitter returned no tree".to_string(),
            })
        })
    }
}
