//! Character set registry.
//!
//! Maps Firebird charset ids and names to text encodings. The registry is an
//! explicit value built once and shared by `Arc`; it is never mutated after
//! construction.

use std::sync::{Arc, OnceLock};

use encoding_rs::Encoding;

use crate::error::{Error, Result};
use crate::protocol::constants::{CS_DYNAMIC, CS_NONE, CS_OCTETS};

/// How a charset turns bytes into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Codec {
    /// Byte-for-byte mapping onto U+0000..=U+00FF, untyped (NONE, OCTETS).
    Transparent,
    /// ISO-8859-1: the same byte-for-byte mapping, as a real text charset.
    Latin1,
    /// Strict 7-bit ASCII.
    Ascii,
    /// Delegates to `encoding_rs` by label.
    Label(&'static str),
    /// Single-byte ISO charset whose label `encoding_rs` aliases to a
    /// Windows code page. Bytes 0x80..=0x9F are C1 controls.
    IsoLabel(&'static str),
    /// GB2312 through the GBK encoder, limited to EUC-CN byte pairs.
    Gb2312,
}

fn is_c1(byte: u8) -> bool {
    (0x80..=0x9F).contains(&byte)
}

/// Whether GBK output stays inside the GB2312 (EUC-CN) code space.
fn is_euc_cn(bytes: &[u8]) -> bool {
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] < 0x80 {
            i += 1;
            continue;
        }
        match bytes.get(i + 1) {
            Some(&trail) if (0xA1..=0xF7).contains(&bytes[i]) && (0xA1..=0xFE).contains(&trail) => {
                i += 2
            }
            _ => return false,
        }
    }
    true
}

/// A database character set.
#[derive(Debug)]
pub struct Charset {
    id: u8,
    name: &'static str,
    bytes_per_character: u8,
    codec: Codec,
    encoding: OnceLock<Option<&'static Encoding>>,
}

impl Charset {
    fn new(id: u8, name: &'static str, bytes_per_character: u8, codec: Codec) -> Self {
        Self {
            id,
            name,
            bytes_per_character,
            codec,
            encoding: OnceLock::new(),
        }
    }

    /// Charset id as reported in field subtypes.
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Firebird charset name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Maximum number of bytes one character occupies.
    pub fn bytes_per_character(&self) -> u8 {
        self.bytes_per_character
    }

    /// Whether bytes pass through untouched (NONE and OCTETS).
    pub fn is_transparent(&self) -> bool {
        self.codec == Codec::Transparent
    }

    /// Whether this is the OCTETS (binary) charset.
    pub fn is_octets(&self) -> bool {
        self.id == CS_OCTETS
    }

    fn encoding(&self, label: &'static str) -> Result<&'static Encoding> {
        self.encoding
            .get_or_init(|| Encoding::for_label(label.as_bytes()))
            .ok_or_else(|| {
                Error::configuration(format!(
                    "Charset {} uses unsupported encoding '{}'",
                    self.name, label
                ))
            })
    }

    fn unrepresentable(&self) -> Error {
        Error::type_conversion(format!(
            "Text cannot be represented in charset {}",
            self.name
        ))
    }

    /// Decode bytes into text.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        match self.codec {
            Codec::Transparent | Codec::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
            Codec::Ascii => {
                if let Some(&b) = bytes.iter().find(|b| !b.is_ascii()) {
                    return Err(Error::type_conversion(format!(
                        "Byte 0x{:02X} is not valid in charset {}",
                        b, self.name
                    )));
                }
                Ok(bytes.iter().map(|&b| b as char).collect())
            }
            Codec::Label(label) => {
                let (text, _) = self
                    .encoding(label)?
                    .decode_without_bom_handling(bytes);
                Ok(text.into_owned())
            }
            Codec::Gb2312 => {
                let (text, _) = self
                    .encoding("gbk")?
                    .decode_without_bom_handling(bytes);
                Ok(text.into_owned())
            }
            Codec::IsoLabel(label) => {
                // Single-byte: one decoded char per input byte.
                let (text, _) = self
                    .encoding(label)?
                    .decode_without_bom_handling(bytes);
                Ok(text
                    .chars()
                    .zip(bytes)
                    .map(|(c, &b)| if is_c1(b) { b as char } else { c })
                    .collect())
            }
        }
    }

    /// Encode text into bytes.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        match self.codec {
            Codec::Transparent | Codec::Latin1 | Codec::Ascii => {
                let limit = if self.codec == Codec::Ascii { 0x7F } else { 0xFF };
                text.chars()
                    .map(|c| {
                        u8::try_from(c as u32)
                            .ok()
                            .filter(|&b| b <= limit)
                            .ok_or_else(|| {
                                Error::type_conversion(format!(
                                    "Character {:?} cannot be stored in charset {}",
                                    c, self.name
                                ))
                            })
                    })
                    .collect()
            }
            Codec::Label(label) => {
                let (bytes, _, had_errors) = self.encoding(label)?.encode(text);
                if had_errors {
                    return Err(self.unrepresentable());
                }
                Ok(bytes.into_owned())
            }
            Codec::Gb2312 => {
                let (bytes, _, had_errors) = self.encoding("gbk")?.encode(text);
                if had_errors || !is_euc_cn(&bytes) {
                    return Err(self.unrepresentable());
                }
                Ok(bytes.into_owned())
            }
            Codec::IsoLabel(label) => {
                let encoding = self.encoding(label)?;
                let mut out = Vec::with_capacity(text.len());
                let mut scratch = [0u8; 4];
                for c in text.chars() {
                    if let Ok(b) = u8::try_from(c as u32) {
                        if is_c1(b) {
                            out.push(b);
                            continue;
                        }
                    }
                    let (bytes, _, had_errors) = encoding.encode(c.encode_utf8(&mut scratch));
                    // The Windows code page fills the C1 range with extra
                    // characters the ISO charset does not have.
                    if had_errors || bytes.iter().copied().any(is_c1) {
                        return Err(self.unrepresentable());
                    }
                    out.extend_from_slice(&bytes);
                }
                Ok(out)
            }
        }
    }
}

impl PartialEq for Charset {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Fold a charset name for comparison: fullwidth forms become ASCII, then
/// everything is lowercased.
fn fold_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            '\u{3000}' => ' ',
            _ => c,
        })
        .flat_map(char::to_lowercase)
        .collect()
}

/// Registry of supported charsets, in id order.
#[derive(Debug)]
pub struct CharsetRegistry {
    charsets: Vec<Arc<Charset>>,
}

impl CharsetRegistry {
    /// Build the fixed charset table.
    pub fn new() -> Self {
        use Codec::{Ascii, Gb2312, IsoLabel, Label, Latin1, Transparent};

        let table: &[(u8, &'static str, u8, Codec)] = &[
            (CS_NONE, "NONE", 1, Transparent),
            (CS_OCTETS, "OCTETS", 1, Transparent),
            (2, "ASCII", 1, Ascii),
            (3, "UNICODE_FSS", 3, Label("utf-8")),
            (4, "UTF8", 4, Label("utf-8")),
            (5, "SJIS_0208", 2, Label("shift_jis")),
            (6, "EUCJ_0208", 2, Label("euc-jp")),
            (9, "DOS737", 1, Label("ibm737")),
            (10, "DOS437", 1, Label("ibm437")),
            (11, "DOS850", 1, Label("ibm850")),
            (12, "DOS865", 1, Label("ibm865")),
            (13, "DOS860", 1, Label("ibm860")),
            (14, "DOS863", 1, Label("ibm863")),
            (15, "DOS775", 1, Label("ibm775")),
            (16, "DOS858", 1, Label("ibm858")),
            (17, "DOS862", 1, Label("ibm862")),
            (18, "DOS864", 1, Label("ibm864")),
            (21, "ISO8859_1", 1, Latin1),
            (22, "ISO8859_2", 1, Label("iso-8859-2")),
            (23, "ISO8859_3", 1, Label("iso-8859-3")),
            (34, "ISO8859_4", 1, Label("iso-8859-4")),
            (35, "ISO8859_5", 1, Label("iso-8859-5")),
            (36, "ISO8859_6", 1, Label("iso-8859-6")),
            (37, "ISO8859_7", 1, Label("iso-8859-7")),
            (38, "ISO8859_8", 1, Label("iso-8859-8")),
            (39, "ISO8859_9", 1, IsoLabel("windows-1254")),
            (40, "ISO8859_13", 1, Label("iso-8859-13")),
            (44, "KSC_5601", 2, Label("euc-kr")),
            (45, "DOS852", 1, Label("ibm852")),
            (46, "DOS857", 1, Label("ibm857")),
            (47, "DOS861", 1, Label("ibm861")),
            (48, "DOS866", 1, Label("ibm866")),
            (49, "DOS869", 1, Label("ibm869")),
            (50, "CYRL", 1, Label("windows-1251")),
            (51, "WIN1250", 1, Label("windows-1250")),
            (52, "WIN1251", 1, Label("windows-1251")),
            (53, "WIN1252", 1, Label("windows-1252")),
            (54, "WIN1253", 1, Label("windows-1253")),
            (55, "WIN1254", 1, Label("windows-1254")),
            (56, "BIG_5", 2, Label("big5")),
            (57, "GB_2312", 2, Gb2312),
            (58, "WIN1255", 1, Label("windows-1255")),
            (59, "WIN1256", 1, Label("windows-1256")),
            (60, "WIN1257", 1, Label("windows-1257")),
            (63, "KOI8R", 1, Label("koi8-r")),
            (64, "KOI8U", 1, Label("koi8-u")),
            (65, "WIN1258", 1, Label("windows-1258")),
            (66, "TIS620", 1, IsoLabel("windows-874")),
            (67, "GBK", 2, Label("gbk")),
            (68, "CP943C", 2, Label("shift_jis")),
            (69, "GB18030", 4, Label("gb18030")),
        ];

        Self {
            charsets: table
                .iter()
                .map(|&(id, name, bpc, codec)| Arc::new(Charset::new(id, name, bpc, codec)))
                .collect(),
        }
    }

    /// Look up a charset by numeric id.
    pub fn resolve_id(&self, id: u8) -> Option<Arc<Charset>> {
        self.charsets.iter().find(|cs| cs.id == id).cloned()
    }

    /// Look up a charset by name (case- and width-insensitive).
    pub fn resolve_name(&self, name: &str) -> Option<Arc<Charset>> {
        let folded = fold_name(name.trim());
        self.charsets
            .iter()
            .find(|cs| fold_name(cs.name) == folded)
            .cloned()
    }

    /// Iterate over all charsets in table order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Charset>> {
        self.charsets.iter()
    }
}

impl Default for CharsetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry paired with the attachment's connection charset.
///
/// Field-level lookups of `CS_DYNAMIC` or unknown ids fall back to the
/// connection charset.
#[derive(Debug, Clone)]
pub struct CharsetContext {
    registry: Arc<CharsetRegistry>,
    default: Arc<Charset>,
}

impl CharsetContext {
    /// Bind a registry to the named connection charset.
    pub fn new(registry: Arc<CharsetRegistry>, name: &str) -> Result<Self> {
        let default = registry
            .resolve_name(name)
            .ok_or_else(|| Error::configuration(format!("Unknown charset '{}'", name)))?;
        Ok(Self { registry, default })
    }

    /// The shared registry.
    pub fn registry(&self) -> &Arc<CharsetRegistry> {
        &self.registry
    }

    /// The connection charset.
    pub fn default_charset(&self) -> &Arc<Charset> {
        &self.default
    }

    /// Resolve a field charset id.
    pub fn resolve(&self, id: u8) -> Arc<Charset> {
        if id == CS_DYNAMIC {
            return Arc::clone(&self.default);
        }
        self.registry
            .resolve_id(id)
            .unwrap_or_else(|| Arc::clone(&self.default))
    }
}

impl Default for CharsetContext {
    fn default() -> Self {
        let registry = Arc::new(CharsetRegistry::new());
        let default = registry
            .resolve_id(CS_NONE)
            .unwrap_or_else(|| Arc::new(Charset::new(CS_NONE, "NONE", 1, Codec::Transparent)));
        Self { registry, default }
    }
}
