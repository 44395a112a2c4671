/// Offset domain reported by an AST for the same source text.
///
/// tree-sitter reports byte offsets, but the stored chunk boundaries must be
/// UTF-16 code units (stable across retrieval), so the adapter carries
/// conversion maps either way. The utf16 branch is reachable only through
/// synthetic endpoints today; it exists so a parser that reports 16-bit
/// character offsets can be dropped in without touching the splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexDomain {
    /// Offsets are UTF-16 code units.
    Utf16,
    /// Offsets are UTF-8 bytes.
    Utf8,
    /// Neither length matched; the splitter falls back to plain text.
    Unknown,
}

/// Unifies AST offsets with the source text and answers O(1)
/// non-whitespace-size queries via a prefix-sum array.
pub struct SourceAdapter<'a> {
    source: &'a str,
    domain: IndexDomain,
    /// byte offset → UTF-16 unit index of the containing char (rounds down).
    /// Length `byte_len + 1`.
    byte_to_char: Vec<u32>,
    /// UTF-16 unit index → byte offset of the containing char (rounds down).
    /// Length `utf16_len + 1`.
    char_to_byte: Vec<u32>,
    /// `nws_prefix[i]` = non-whitespace chars fully inside units `[0, i)`.
    nws_prefix: Vec<u32>,
}

impl<'a> SourceAdapter<'a> {
    /// Build an adapter, detecting the index domain from the AST root's end
    /// index: a match against the UTF-16 length wins over the byte length
    /// (they coincide for pure-ASCII sources, where the domains are
    /// interchangeable anyway).
    pub fn new(source: &'a str, ast_root_end_index: usize) -> Self {
        let (byte_to_char, char_to_byte, nws_prefix) = build_maps(source);
        let utf16_len = char_to_byte.len() - 1;
        let byte_len = source.len();

        let domain = if ast_root_end_index == utf16_len {
            IndexDomain::Utf16
        } else if ast_root_end_index == byte_len {
            IndexDomain::Utf8
        } else {
            IndexDomain::Unknown
        };

        Self {
            source,
            domain,
            byte_to_char,
            char_to_byte,
            nws_prefix,
        }
    }

    /// Build an adapter pinned to the byte domain (plain-text fallback path).
    pub fn for_bytes(source: &'a str) -> Self {
        Self::new(source, source.len())
    }

    pub fn domain(&self) -> IndexDomain {
        self.domain
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    /// Length of the source in the native (AST) domain.
    pub fn native_len(&self) -> usize {
        match self.domain {
            IndexDomain::Utf16 => self.char_len(),
            IndexDomain::Utf8 | IndexDomain::Unknown => self.source.len(),
        }
    }

    pub fn char_len(&self) -> usize {
        self.char_to_byte.len() - 1
    }

    pub fn byte_len(&self) -> usize {
        self.source.len()
    }

    /// Convert a native offset to UTF-16 units, clamping and rounding down to
    /// a character boundary.
    pub fn to_char(&self, native: usize) -> u32 {
        match self.domain {
            IndexDomain::Utf16 => native.min(self.char_len()) as u32,
            IndexDomain::Utf8 | IndexDomain::Unknown => {
                self.byte_to_char[native.min(self.source.len())]
            }
        }
    }

    /// Convert a native offset to a byte offset on a valid char boundary.
    pub fn to_byte(&self, native: usize) -> u32 {
        match self.domain {
            IndexDomain::Utf16 => self.char_to_byte[native.min(self.char_len())],
            IndexDomain::Utf8 | IndexDomain::Unknown => {
                let b = native.min(self.source.len());
                // Round interior bytes down to the start of their char.
                self.char_to_byte[self.byte_to_char[b] as usize]
            }
        }
    }

    /// Slice the source by native offsets.
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        let s = self.to_byte(start) as usize;
        let e = self.to_byte(end) as usize;
        if s >= e {
            return "";
        }
        &self.source[s..e]
    }

    /// Non-whitespace char count in `[start, end)` (native offsets).
    pub fn nws(&self, start: usize, end: usize) -> u32 {
        let s = self.to_char(start) as usize;
        let e = self.to_char(end) as usize;
        if s >= e {
            return 0;
        }
        self.nws_prefix[e] - self.nws_prefix[s]
    }

    pub fn total_nws(&self) -> u32 {
        *self.nws_prefix.last().unwrap_or(&0)
    }
}

/// One pass over the chars builds all three maps. A 4-byte UTF-8 sequence
/// encodes a supplementary-plane codepoint that occupies two UTF-16 units;
/// both units map back to the char's first byte, and interior bytes map to
/// the char's first unit.
fn build_maps(source: &str) -> (Vec<u32>, Vec<u32>, Vec<u32>) {
    let mut byte_to_char = Vec::with_capacity(source.len() + 1);
    let mut char_to_byte = Vec::new();
    let mut nws_prefix = Vec::new();
    nws_prefix.push(0u32);

    let mut units = 0u32;
    let mut nws = 0u32;
    let mut byte_pos = 0u32;

    for ch in source.chars() {
        let blen = ch.len_utf8();
        let ulen = ch.len_utf16();

        for _ in 0..blen {
            byte_to_char.push(units);
        }
        for _ in 0..ulen {
            char_to_byte.push(byte_pos);
        }

        let contributes = !matches!(ch, ' ' | '\t' | '\n' | '\r');
        if ulen == 2 {
            // Prefix entry for the mid-surrogate position: the char is not
            // yet fully inside the range.
            nws_prefix.push(nws);
        }
        if contributes {
            nws += 1;
        }
        nws_prefix.push(nws);

        units += ulen as u32;
        byte_pos += blen as u32;
    }

    byte_to_char.push(units);
    char_to_byte.push(byte_pos);

    (byte_to_char, char_to_byte, nws_prefix)
}
