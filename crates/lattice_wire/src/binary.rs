//! The dictionary-coded binary form of a [`Document`].
//!
//! ```text
//! header     [0x4C] [version] [flags] [theme id]
//! classes    [count varint] { [index u16 BE] | [0xFF] [len varint] [utf-8] }*
//! node       [indent u8] [local class varint] [tag] [payload]
//!            [overrides LEB128]? [action word]? [0xFE]
//! stream     {node}* [0xFF]
//! directives [count varint] { [name literal] [word list] }*      (flags bit 1)
//! views      [count varint] { [name literal] [stream] }*         (flags bit 0)
//! ```
//!
//! The upper six bits of the flags byte are opaque application feature flags.
//! A word is a 2-byte dictionary index, or `0xFF` followed by a
//! length-prefixed literal when the dictionary does not know it.

use lattice_props::{PrimeProduct, PropertyError};
use lattice_topology::{
    Binding, Content, Document, GridLayout, Node, Tree, TreeBuilder, Variable, assign_slots,
    theme_id, theme_name,
};

use crate::dictionary::{Dictionary, Table};
use crate::varint::{VarintError, read_leb128, read_varint, write_leb128, write_varint};

pub const FORMAT_ID: u8 = 0x4C;
pub const FORMAT_VERSION: u8 = 1;

const FLAG_VIEWS: u8 = 0x01;
const FLAG_DIRECTIVES: u8 = 0x02;
const FEATURE_SHIFT: u8 = 2;
pub const FEATURE_FLAGS_MASK: u8 = 0x3F;

const ESCAPE: u8 = 0xFF;
const NODE_END: u8 = 0xFE;
const STREAM_END: u8 = 0xFF;
pub const MAX_INDENT: usize = 0xFD;

const TAG_NONE: u8 = 0;
const TAG_WORDS: u8 = 1;
const TAG_TEXTURE: u8 = 2;
const TAG_FIELDS: u8 = 3;
const TAG_GRID: u8 = 4;
const TAG_BOUND: u8 = 5;
const TAG_KIND_MASK: u8 = 0x0F;
const TAG_RESERVED_MASK: u8 = 0x30;
const TAG_OVERRIDES: u8 = 0x40;
const TAG_ACTION: u8 = 0x80;

const SPACE_BEFORE: u8 = 0x01;
const SPACE_AFTER: u8 = 0x02;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("input truncated at byte {offset}: needed {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("malformed payload at byte {offset}: {reason}")]
    BadFormat { offset: usize, reason: String },
    #[error("unsupported format version {found}, expected {expected}")]
    UnsupportedVersion { found: u8, expected: u8 },
    #[error("unknown content tag {tag:#04x} at byte {offset}")]
    UnknownTag { tag: u8, offset: usize },
    #[error("word index {index} at byte {offset} is not in the dictionary")]
    UnknownWordIndex { index: u16, offset: usize },
    #[error("class path index {index} at byte {offset} is not in the dictionary")]
    UnknownClassIndex { index: u16, offset: usize },
    #[error("local class {index} at byte {offset} is outside the class table")]
    BadLocalClass { index: u16, offset: usize },
    #[error("invalid UTF-8 in literal at byte {offset}")]
    InvalidUtf8 { offset: usize },
    #[error("expected node end at byte {offset}, found {found:#04x}")]
    MissingNodeEnd { offset: usize, found: u8 },
    #[error("{remaining} unexpected bytes after the payload at byte {offset}")]
    TrailingBytes { offset: usize, remaining: usize },
    #[error("{what} of {value} does not fit the format")]
    ValueTooLarge { what: &'static str, value: usize },
    #[error(transparent)]
    Property(#[from] PropertyError),
}

impl WireError {
    pub fn is_truncated(&self) -> bool {
        matches!(self, WireError::Truncated { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Six application bits stored in the header.
    pub feature_flags: u8,
    /// Theme id used when the document has no `theme` directive.
    pub default_theme: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    pub document: Document,
    pub feature_flags: u8,
    pub theme_id: u8,
}

pub fn encode(document: &Document, dictionary: &Dictionary) -> Result<Vec<u8>, WireError> {
    encode_with(document, dictionary, &EncodeOptions::default())
}

pub fn encode_with(
    document: &Document,
    dictionary: &Dictionary,
    options: &EncodeOptions,
) -> Result<Vec<u8>, WireError> {
    let mut encoder = Encoder {
        out: Vec::new(),
        dictionary,
        classes: Vec::new(),
    };

    let mut flags = (options.feature_flags & FEATURE_FLAGS_MASK) << FEATURE_SHIFT;
    if !document.directives.is_empty() {
        flags |= FLAG_DIRECTIVES;
    }
    if !document.views.is_empty() {
        flags |= FLAG_VIEWS;
    }
    let theme = document
        .directive("theme")
        .map(|name| theme_id(name).unwrap_or_default())
        .unwrap_or(options.default_theme);
    encoder.out.extend([FORMAT_ID, FORMAT_VERSION, flags, theme]);

    let trees = std::iter::once(&document.tree).chain(document.views.values());
    encoder.write_class_table(trees)?;
    encoder.write_stream(&document.tree)?;

    if flags & FLAG_DIRECTIVES != 0 {
        encoder.count(document.directives.len(), "directive count")?;
        for (name, value) in &document.directives {
            encoder.literal(name)?;
            encoder.words(value)?;
        }
    }
    if flags & FLAG_VIEWS != 0 {
        encoder.count(document.views.len(), "view count")?;
        for (name, view) in &document.views {
            encoder.literal(name)?;
            encoder.write_stream(view)?;
        }
    }

    log::debug!(
        "encoded {} nodes into {} bytes",
        document.node_count(),
        encoder.out.len()
    );
    Ok(encoder.out)
}

pub fn decode(bytes: &[u8], dictionary: &Dictionary) -> Result<Document, WireError> {
    decode_with(bytes, dictionary).map(|decoded| decoded.document)
}

pub fn decode_with(bytes: &[u8], dictionary: &Dictionary) -> Result<DecodedPayload, WireError> {
    let mut reader = Reader {
        bytes,
        offset: 0,
        dictionary,
        classes: Vec::new(),
    };

    let format = reader.u8()?;
    if format != FORMAT_ID {
        return Err(WireError::BadFormat {
            offset: 0,
            reason: format!("format byte {format:#04x}"),
        });
    }
    let version = reader.u8()?;
    if version != FORMAT_VERSION {
        return Err(WireError::UnsupportedVersion {
            found: version,
            expected: FORMAT_VERSION,
        });
    }
    let flags = reader.u8()?;
    let theme = reader.u8()?;

    reader.read_class_table()?;
    let mut document = Document {
        tree: reader.read_stream()?,
        ..Default::default()
    };

    if flags & FLAG_DIRECTIVES != 0 {
        for _ in 0..reader.varint()? {
            let name = reader.literal()?;
            let value = reader.words()?;
            document.directives.insert(name, value.join(" "));
        }
    } else if let Some(name) = theme_name(theme).filter(|_| theme != 0) {
        document.directives.insert("theme".into(), name.into());
    }
    if flags & FLAG_VIEWS != 0 {
        for _ in 0..reader.varint()? {
            let name = reader.literal()?;
            let view = reader.read_stream()?;
            document.views.insert(name, view);
        }
    }

    if reader.offset < bytes.len() {
        return Err(WireError::TrailingBytes {
            offset: reader.offset,
            remaining: bytes.len() - reader.offset,
        });
    }

    Ok(DecodedPayload {
        document,
        feature_flags: flags >> FEATURE_SHIFT,
        theme_id: theme,
    })
}

struct Encoder<'a> {
    out: Vec<u8>,
    dictionary: &'a Dictionary,
    classes: Vec<String>,
}

impl Encoder<'_> {
    fn count(&mut self, value: usize, what: &'static str) -> Result<(), WireError> {
        write_varint(&mut self.out, value).ok_or(WireError::ValueTooLarge { what, value })
    }

    fn literal(&mut self, text: &str) -> Result<(), WireError> {
        self.count(text.len(), "literal length")?;
        self.out.extend_from_slice(text.as_bytes());
        Ok(())
    }

    fn indexed(&mut self, table: &Table, value: &str) -> Result<(), WireError> {
        match table.index_of(value) {
            Some(index) => self.out.extend(index.to_be_bytes()),
            None => {
                self.out.push(ESCAPE);
                self.literal(value)?;
            }
        }
        Ok(())
    }

    fn word(&mut self, word: &str) -> Result<(), WireError> {
        let dictionary = self.dictionary;
        self.indexed(dictionary.words(), word)
    }

    fn words(&mut self, text: &str) -> Result<(), WireError> {
        let words: Vec<&str> = text.split_whitespace().collect();
        self.count(words.len(), "word count")?;
        for word in words {
            self.word(word)?;
        }
        Ok(())
    }

    /// Words plus a byte recording whether `text` began or ended with space.
    fn spaced_words(&mut self, text: &str) -> Result<(), WireError> {
        let mut spacing = 0;
        if text.starts_with(char::is_whitespace) {
            spacing |= SPACE_BEFORE;
        }
        if text.ends_with(char::is_whitespace) {
            spacing |= SPACE_AFTER;
        }
        self.out.push(spacing);
        self.words(text)
    }

    fn write_class_table<'t>(
        &mut self,
        trees: impl Iterator<Item = &'t Tree>,
    ) -> Result<(), WireError> {
        let mut classes: Vec<String> = Vec::new();
        for tree in trees {
            for (_, node) in tree.walk() {
                if !classes.contains(&node.class_path) {
                    classes.push(node.class_path.clone());
                }
            }
        }
        self.count(classes.len(), "class count")?;
        let dictionary = self.dictionary;
        for class_path in &classes {
            self.indexed(dictionary.class_paths(), class_path)?;
        }
        self.classes = classes;
        Ok(())
    }

    fn write_stream(&mut self, tree: &Tree) -> Result<(), WireError> {
        for (_, node) in tree.walk() {
            self.write_node(node)?;
        }
        self.out.push(STREAM_END);
        Ok(())
    }

    fn write_node(&mut self, node: &Node) -> Result<(), WireError> {
        if node.depth > MAX_INDENT {
            return Err(WireError::ValueTooLarge {
                what: "nesting depth",
                value: node.depth,
            });
        }
        self.out.push(node.depth as u8);
        let local = self
            .classes
            .iter()
            .position(|c| *c == node.class_path)
            .unwrap_or_default();
        self.count(local, "class count")?;

        let mut tag = match &node.content {
            Content::None => TAG_NONE,
            Content::Text(_) => TAG_WORDS,
            Content::Texture => TAG_TEXTURE,
            Content::Fields(_) => TAG_FIELDS,
            Content::Grid(_) => TAG_GRID,
            Content::Bound(_) => TAG_BOUND,
        };
        if !node.overrides.is_empty() {
            tag |= TAG_OVERRIDES;
        }
        if node.action.is_some() {
            tag |= TAG_ACTION;
        }
        self.out.push(tag);

        match &node.content {
            Content::None | Content::Texture => {}
            Content::Text(text) => self.words(text)?,
            Content::Fields(fields) => {
                self.count(fields.len(), "field count")?;
                for field in fields {
                    self.words(field)?;
                }
            }
            Content::Grid(grid) => {
                for weights in [&grid.columns, &grid.rows] {
                    self.count(weights.len(), "grid track count")?;
                    self.out.extend_from_slice(weights);
                }
            }
            Content::Bound(variables) => self.write_bound(variables)?,
        }

        if !node.overrides.is_empty() {
            write_leb128(&mut self.out, lattice_props::encode(&node.overrides).get());
        }
        if let Some(action) = &node.action {
            self.word(action)?;
        }
        self.out.push(NODE_END);
        Ok(())
    }

    /// Each variable is its binding and the literal before it; the text after
    /// the last sigil closes the list. Suffixes of earlier variables fold into
    /// the next prefix, which renders the same.
    fn write_bound(&mut self, variables: &[Variable]) -> Result<(), WireError> {
        self.count(variables.len(), "variable count")?;
        let mut carried = String::new();
        for variable in variables {
            self.out.push(match variable.binding {
                Binding::Owner => 0,
                Binding::User => 1,
                Binding::Computed => 2,
            });
            carried.push_str(&variable.prefix);
            self.spaced_words(&carried)?;
            carried = variable.suffix.clone();
        }
        self.spaced_words(&carried)
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
    dictionary: &'a Dictionary,
    classes: Vec<String>,
}

impl<'a> Reader<'a> {
    fn available(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8], WireError> {
        if self.available() < needed {
            return Err(WireError::Truncated {
                offset: self.offset,
                needed,
                available: self.available(),
            });
        }
        let slice = &self.bytes[self.offset..self.offset + needed];
        self.offset += needed;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    fn peek(&self) -> Result<u8, WireError> {
        self.bytes
            .get(self.offset)
            .copied()
            .ok_or(WireError::Truncated {
                offset: self.offset,
                needed: 1,
                available: 0,
            })
    }

    fn varint_error(&self, error: VarintError) -> WireError {
        match error {
            VarintError::Truncated { needed } => WireError::Truncated {
                offset: self.offset,
                needed,
                available: self.available(),
            },
            VarintError::Overflow => WireError::BadFormat {
                offset: self.offset,
                reason: "integer overflow".into(),
            },
        }
    }

    fn varint(&mut self) -> Result<u16, WireError> {
        let (value, len) =
            read_varint(&self.bytes[self.offset..]).map_err(|e| self.varint_error(e))?;
        self.offset += len;
        Ok(value)
    }

    fn leb128(&mut self) -> Result<u128, WireError> {
        let (value, len) =
            read_leb128(&self.bytes[self.offset..]).map_err(|e| self.varint_error(e))?;
        self.offset += len;
        Ok(value)
    }

    fn literal(&mut self) -> Result<String, WireError> {
        let len = self.varint()? as usize;
        let start = self.offset;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| WireError::InvalidUtf8 { offset: start })
    }

    /// An escaped literal or a 2-byte index into `table`.
    fn indexed(
        &mut self,
        table: &'a Table,
        unknown: fn(u16, usize) -> WireError,
    ) -> Result<String, WireError> {
        if self.peek()? == ESCAPE {
            self.offset += 1;
            return self.literal();
        }
        let start = self.offset;
        let raw = self.take(2)?;
        let index = u16::from_be_bytes([raw[0], raw[1]]);
        table
            .value_at(index)
            .map(str::to_string)
            .ok_or(unknown(index, start))
    }

    fn word(&mut self) -> Result<String, WireError> {
        let dictionary = self.dictionary;
        self.indexed(dictionary.words(), |index, offset| {
            WireError::UnknownWordIndex { index, offset }
        })
    }

    fn words(&mut self) -> Result<Vec<String>, WireError> {
        let count = self.varint()?;
        (0..count).map(|_| self.word()).collect()
    }

    fn spaced_words(&mut self) -> Result<String, WireError> {
        let spacing_offset = self.offset;
        let spacing = self.u8()?;
        if spacing & !(SPACE_BEFORE | SPACE_AFTER) != 0 {
            return Err(WireError::BadFormat {
                offset: spacing_offset,
                reason: format!("spacing byte {spacing:#04x}"),
            });
        }
        let words = self.words()?;
        if words.is_empty() {
            return Ok(if spacing == 0 { String::new() } else { " ".into() });
        }
        let mut text = String::new();
        if spacing & SPACE_BEFORE != 0 {
            text.push(' ');
        }
        text.push_str(&words.join(" "));
        if spacing & SPACE_AFTER != 0 {
            text.push(' ');
        }
        Ok(text)
    }

    fn read_class_table(&mut self) -> Result<(), WireError> {
        let dictionary = self.dictionary;
        let count = self.varint()?;
        for _ in 0..count {
            let class_path = self.indexed(dictionary.class_paths(), |index, offset| {
                WireError::UnknownClassIndex { index, offset }
            })?;
            self.classes.push(class_path);
        }
        Ok(())
    }

    fn read_stream(&mut self) -> Result<Tree, WireError> {
        let mut builder = TreeBuilder::new();
        loop {
            let offset = self.offset;
            let indent = self.u8()?;
            if indent == STREAM_END {
                break;
            }
            if indent as usize > MAX_INDENT {
                return Err(WireError::BadFormat {
                    offset,
                    reason: format!("indent byte {indent:#04x}"),
                });
            }
            let node = self.read_node()?;
            let (_, jumped) = builder.push(indent as usize, node);
            if jumped {
                return Err(WireError::BadFormat {
                    offset,
                    reason: format!("indent {indent} skips a level"),
                });
            }
        }
        let mut tree = builder.finish();
        assign_slots(&mut tree);
        Ok(tree)
    }

    fn read_node(&mut self) -> Result<Node, WireError> {
        let class_offset = self.offset;
        let local = self.varint()?;
        let class_path = self
            .classes
            .get(local as usize)
            .cloned()
            .ok_or(WireError::BadLocalClass {
                index: local,
                offset: class_offset,
            })?;
        let mut node = Node::new(class_path);

        let tag_offset = self.offset;
        let tag = self.u8()?;
        if tag & TAG_RESERVED_MASK != 0 {
            return Err(WireError::UnknownTag {
                tag,
                offset: tag_offset,
            });
        }
        node.content = match tag & TAG_KIND_MASK {
            TAG_NONE => Content::None,
            TAG_WORDS => Content::Text(self.words()?.join(" ")),
            TAG_TEXTURE => Content::Texture,
            TAG_FIELDS => {
                let count = self.varint()?;
                let fields = (0..count)
                    .map(|_| self.words().map(|w| w.join(" ")))
                    .collect::<Result<Vec<_>, _>>()?;
                Content::Fields(fields)
            }
            TAG_GRID => {
                let columns_len = self.varint()? as usize;
                let columns = self.take(columns_len)?.to_vec();
                let rows_len = self.varint()? as usize;
                let rows = self.take(rows_len)?.to_vec();
                Content::Grid(GridLayout { columns, rows })
            }
            TAG_BOUND => Content::Bound(self.read_bound()?),
            _ => {
                return Err(WireError::UnknownTag {
                    tag,
                    offset: tag_offset,
                });
            }
        };

        if tag & TAG_OVERRIDES != 0 {
            node.overrides = lattice_props::decode(PrimeProduct(self.leb128()?))?;
        }
        if tag & TAG_ACTION != 0 {
            node.action = Some(self.word()?);
        }

        let end_offset = self.offset;
        let end = self.u8()?;
        if end != NODE_END {
            return Err(WireError::MissingNodeEnd {
                offset: end_offset,
                found: end,
            });
        }
        Ok(node)
    }

    fn read_bound(&mut self) -> Result<Vec<Variable>, WireError> {
        let count = self.varint()?;
        let mut variables: Vec<Variable> = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let binding_offset = self.offset;
            let binding = match self.u8()? {
                0 => Binding::Owner,
                1 => Binding::User,
                2 => Binding::Computed,
                other => {
                    return Err(WireError::BadFormat {
                        offset: binding_offset,
                        reason: format!("binding byte {other:#04x}"),
                    });
                }
            };
            variables.push(Variable::new(binding, self.spaced_words()?));
        }
        let suffix = self.spaced_words()?;
        match variables.last_mut() {
            Some(last) => last.suffix = suffix,
            None => {
                return Err(WireError::BadFormat {
                    offset: self.offset,
                    reason: "bound text without variables".into(),
                });
            }
        }
        Ok(variables)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use lattice_topology::parse;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        /// Whatever spacing a text line is written with, the decoded
        /// document equals the parsed one.
        #[test]
        fn prop_text_lines_roundtrip(content in "[a-z:$ouc;~ \t]{1,40}") {
            let document = parse(&format!("text|{content}")).document;
            let dictionary = Dictionary::new();
            let bytes = encode(&document, &dictionary).unwrap();
            prop_assert_eq!(decode(&bytes, &dictionary).unwrap(), document);
        }
    }
}
