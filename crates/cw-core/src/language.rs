use serde::{Deserialize, Serialize};

/// Language tag derived from the extension whitelist.
///
/// Only a subset is AST-chunked (`has_ast_grammar`); the rest is indexed as
/// plain text. Extensions outside the whitelist are filtered out by the
/// scanner before any file I/O happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    TypeScript,
    JavaScript,
    Markdown,
    Python,
    Go,
    Rust,
    Java,
    Kotlin,
    Swift,
    Cpp,
    C,
    Shell,
    PowerShell,
    Sql,
    Yaml,
    Json,
    Toml,
    Xml,
    Html,
    Css,
    Scss,
    Sass,
    Less,
    Vue,
    Svelte,
    Ruby,
    Php,
    Dart,
    Lua,
    R,
}

impl Language {
    /// Map a file extension (without the dot) to a Language.
    /// Returns `None` for anything outside the whitelist.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "ts" | "tsx" => Some(Self::TypeScript),
            "js" | "jsx" | "mjs" | "cjs" => Some(Self::JavaScript),
            "md" => Some(Self::Markdown),
            "py" => Some(Self::Python),
            "go" => Some(Self::Go),
            "rs" => Some(Self::Rust),
            "java" => Some(Self::Java),
            "kt" => Some(Self::Kotlin),
            "swift" => Some(Self::Swift),
            "cpp" | "cc" | "cxx" | "hpp" | "h" => Some(Self::Cpp),
            "c" => Some(Self::C),
            "sh" | "bash" | "zsh" | "fish" => Some(Self::Shell),
            "ps1" => Some(Self::PowerShell),
            "sql" => Some(Self::Sql),
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            "xml" => Some(Self::Xml),
            "html" => Some(Self::Html),
            "css" => Some(Self::Css),
            "scss" => Some(Self::Scss),
            "sass" => Some(Self::Sass),
            "less" => Some(Self::Less),
            "vue" => Some(Self::Vue),
            "svelte" => Some(Self::Svelte),
            "rb" => Some(Self::Ruby),
            "php" => Some(Self::Php),
            "dart" => Some(Self::Dart),
            "lua" => Some(Self::Lua),
            "r" => Some(Self::R),
            _ => None,
        }
    }

    /// Stable lowercase tag stored in the `files.language` column.
    pub fn tag(self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::JavaScript => "javascript",
            Self::Markdown => "markdown",
            Self::Python => "python",
            Self::Go => "go",
            Self::Rust => "rust",
            Self::Java => "java",
            Self::Kotlin => "kotlin",
            Self::Swift => "swift",
            Self::Cpp => "cpp",
            Self::C => "c",
            Self::Shell => "shell",
            Self::PowerShell => "powershell",
            Self::Sql => "sql",
            Self::Yaml => "yaml",
            Self::Json => "json",
            Self::Toml => "toml",
            Self::Xml => "xml",
            Self::Html => "html",
            Self::Css => "css",
            Self::Scss => "scss",
            Self::Sass => "sass",
            Self::Less => "less",
            Self::Vue => "vue",
            Self::Svelte => "svelte",
            Self::Ruby => "ruby",
            Self::Php => "php",
            Self::Dart => "dart",
            Self::Lua => "lua",
            Self::R => "r",
        }
    }

    /// Inverse of `tag()`, used when rehydrating rows.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "typescript" => Some(Self::TypeScript),
            "javascript" => Some(Self::JavaScript),
            "markdown" => Some(Self::Markdown),
            "python" => Some(Self::Python),
            "go" => Some(Self::Go),
            "rust" => Some(Self::Rust),
            "java" => Some(Self::Java),
            "kotlin" => Some(Self::Kotlin),
            "swift" => Some(Self::Swift),
            "cpp" => Some(Self::Cpp),
            "c" => Some(Self::C),
            "shell" => Some(Self::Shell),
            "powershell" => Some(Self::PowerShell),
            "sql" => Some(Self::Sql),
            "yaml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            "xml" => Some(Self::Xml),
            "html" => Some(Self::Html),
            "css" => Some(Self::Css),
            "scss" => Some(Self::Scss),
            "sass" => Some(Self::Sass),
            "less" => Some(Self::Less),
            "vue" => Some(Self::Vue),
            "svelte" => Some(Self::Svelte),
            "ruby" => Some(Self::Ruby),
            "php" => Some(Self::Php),
            "dart" => Some(Self::Dart),
            "lua" => Some(Self::Lua),
            "r" => Some(Self::R),
            _ => None,
        }
    }

    /// Languages with a tree-sitter grammar wired into the splitter.
    pub fn has_ast_grammar(self) -> bool {
        matches!(
            self,
            Self::TypeScript | Self::JavaScript | Self::Python | Self::Go | Self::Rust | Self::Java
        )
    }

    /// Languages that fall back to the plain-text line chunker when AST
    /// chunking yields nothing.
    pub fn plain_text_fallback(self) -> bool {
        matches!(
            self,
            Self::Python | Self::Go | Self::Rust | Self::Java | Self::Markdown | Self::Json
        )
    }
}
