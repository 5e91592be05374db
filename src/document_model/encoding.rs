use std::fmt;

const BOM_UTF8: &[u8] = &[0xEF, 0xBB, 0xBF];
const BOM_UTF16_LE: &[u8] = &[0xFF, 0xFE];
const BOM_UTF16_BE: &[u8] = &[0xFE, 0xFF];
const BOM_UTF32_LE: &[u8] = &[0xFF, 0xFE, 0x00, 0x00];
const BOM_UTF32_BE: &[u8] = &[0x00, 0x00, 0xFE, 0xFF];

/// Byte encodings a document can be loaded from or saved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Sniff a BOM, then fall back to UTF-8 and the default encoding.
    Auto,
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
    Latin1,
    Ascii,
}

impl Encoding {
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Auto => "auto",
            Encoding::Utf8 => "utf-8",
            Encoding::Utf8Bom => "utf-8-bom",
            Encoding::Utf16Le => "utf-16le",
            Encoding::Utf16Be => "utf-16be",
            Encoding::Utf32Le => "utf-32le",
            Encoding::Utf32Be => "utf-32be",
            Encoding::Latin1 => "latin1",
            Encoding::Ascii => "ascii",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace('_', "-");
        let encoding = match normalized.as_str() {
            "auto" | "auto-detect" => Encoding::Auto,
            "utf-8" | "utf8" => Encoding::Utf8,
            "utf-8-bom" | "utf8-bom" => Encoding::Utf8Bom,
            "utf-16le" | "utf-16" | "utf16le" | "utf16" => Encoding::Utf16Le,
            "utf-16be" | "utf16be" => Encoding::Utf16Be,
            "utf-32le" | "utf-32" | "utf32le" | "utf32" => Encoding::Utf32Le,
            "utf-32be" | "utf32be" => Encoding::Utf32Be,
            "latin1" | "latin-1" | "iso-8859-1" | "iso8859-1" => Encoding::Latin1,
            "ascii" | "us-ascii" => Encoding::Ascii,
            _ => return None,
        };
        Some(encoding)
    }

    /// Byte order mark written in front of saved text.
    pub fn bom(&self) -> &'static [u8] {
        match self {
            Encoding::Utf8Bom => BOM_UTF8,
            Encoding::Utf16Le => BOM_UTF16_LE,
            Encoding::Utf16Be => BOM_UTF16_BE,
            Encoding::Utf32Le => BOM_UTF32_LE,
            Encoding::Utf32Be => BOM_UTF32_BE,
            _ => &[],
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Detect an encoding from a leading byte order mark.
///
/// UTF-32LE is checked before UTF-16LE because its BOM starts with the
/// UTF-16LE one.
pub fn sniff_bom(bytes: &[u8]) -> Option<Encoding> {
    if bytes.starts_with(BOM_UTF32_LE) {
        Some(Encoding::Utf32Le)
    } else if bytes.starts_with(BOM_UTF32_BE) {
        Some(Encoding::Utf32Be)
    } else if bytes.starts_with(BOM_UTF8) {
        Some(Encoding::Utf8Bom)
    } else if bytes.starts_with(BOM_UTF16_LE) {
        Some(Encoding::Utf16Le)
    } else if bytes.starts_with(BOM_UTF16_BE) {
        Some(Encoding::Utf16Be)
    } else {
        None
    }
}

/// Ordered, de-duplicated list of encodings to try when loading `bytes`.
pub fn candidates(bytes: &[u8], requested: Encoding, default: Encoding) -> Vec<Encoding> {
    let mut chain = Vec::with_capacity(4);
    if let Some(sniffed) = sniff_bom(bytes) {
        chain.push(sniffed);
    }
    for encoding in [requested, Encoding::Utf8, default] {
        if encoding != Encoding::Auto && !chain.contains(&encoding) {
            chain.push(encoding);
        }
    }
    chain
}

/// Decode `bytes` as `encoding`, stripping a matching BOM.
///
/// Returns `None` when the bytes are not valid in that encoding.
pub fn decode(bytes: &[u8], encoding: Encoding) -> Option<String> {
    let body = bytes.strip_prefix(encoding.bom()).unwrap_or(bytes);
    match encoding {
        Encoding::Auto => None,
        Encoding::Utf8 | Encoding::Utf8Bom => std::str::from_utf8(body).ok().map(str::to_owned),
        Encoding::Utf16Le => decode_utf16(body, u16::from_le_bytes),
        Encoding::Utf16Be => decode_utf16(body, u16::from_be_bytes),
        Encoding::Utf32Le => decode_utf32(body, u32::from_le_bytes),
        Encoding::Utf32Be => decode_utf32(body, u32::from_be_bytes),
        Encoding::Latin1 => Some(body.iter().map(|&b| char::from(b)).collect()),
        Encoding::Ascii => body
            .is_ascii()
            .then(|| body.iter().map(|&b| char::from(b)).collect()),
    }
}

fn decode_utf16(body: &[u8], unit: fn([u8; 2]) -> u16) -> Option<String> {
    if body.len() % 2 != 0 {
        return None;
    }
    let units = body.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    char::decode_utf16(units).collect::<Result<String, _>>().ok()
}

fn decode_utf32(body: &[u8], unit: fn([u8; 4]) -> u32) -> Option<String> {
    if body.len() % 4 != 0 {
        return None;
    }
    body.chunks_exact(4)
        .map(|quad| char::from_u32(unit([quad[0], quad[1], quad[2], quad[3]])))
        .collect()
}

/// Encode `text` as `encoding`, including its BOM.
///
/// Returns `None` when a character cannot be represented.
pub fn encode(text: &str, encoding: Encoding) -> Option<Vec<u8>> {
    let mut out = encoding.bom().to_vec();
    match encoding {
        Encoding::Auto | Encoding::Utf8 | Encoding::Utf8Bom => {
            out.extend_from_slice(text.as_bytes())
        }
        Encoding::Utf16Le => text.encode_utf16().for_each(|u| out.extend(u.to_le_bytes())),
        Encoding::Utf16Be => text.encode_utf16().for_each(|u| out.extend(u.to_be_bytes())),
        Encoding::Utf32Le => text.chars().for_each(|c| out.extend((c as u32).to_le_bytes())),
        Encoding::Utf32Be => text.chars().for_each(|c| out.extend((c as u32).to_be_bytes())),
        Encoding::Latin1 => {
            for c in text.chars() {
                out.push(u8::try_from(u32::from(c)).ok()?);
            }
        }
        Encoding::Ascii => {
            if !text.is_ascii() {
                return None;
            }
            out.extend_from_slice(text.as_bytes());
        }
    }
    Some(out)
}
