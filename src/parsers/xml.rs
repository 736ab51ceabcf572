//! XML plumbing shared by the voucher and master parsers.
//!
//! The source emits XML with control characters, invalid numeric character
//! references and bare ampersands, so everything goes through [`sanitize_xml`]
//! before it reaches quick-xml. Parsing is streaming: [`SubtreeReader`] walks
//! the event stream and materialises one target element subtree at a time,
//! never the whole document.

use chrono::{Local, NaiveDate};
use quick_xml::events::Event;
use quick_xml::Reader;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// Errors from the XML layer. Anything else (odd values, missing tags)
/// degrades to defaults instead of failing the stream.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    Xml(String),

    #[error("truncated XML document")]
    Truncated,
}

/// Remove the junk the source is known to emit before handing text to the
/// XML parser: NULs and other control characters, numeric character
/// references to control characters, and unescaped ampersands.
pub fn sanitize_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c == '&' {
            let rest = &input[i + 1..];
            if let Some(semi) = rest.find(';').filter(|&n| n <= 10) {
                let entity = &rest[..semi];
                if let Some(code) = char_ref_value(entity) {
                    // Drop references to control characters, keep the rest.
                    if code < 0x20 && code != 0x9 && code != 0xA && code != 0xD {
                        for _ in 0..=semi {
                            chars.next();
                        }
                        continue;
                    }
                    out.push('&');
                    continue;
                }
                if matches!(entity, "amp" | "lt" | "gt" | "apos" | "quot") {
                    out.push('&');
                    continue;
                }
            }
            out.push_str("&amp;");
        } else if c == '\t' || c == '\n' || c == '\r' || (c as u32) >= 0x20 {
            match c as u32 {
                0xD800..=0xDFFF | 0xFFFE | 0xFFFF => {}
                _ => out.push(c),
            }
        }
    }

    out
}

fn char_ref_value(entity: &str) -> Option<u32> {
    let digits = entity.strip_prefix('#')?;
    if let Some(hex) = digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        digits.parse().ok()
    }
}

/// An owned XML element subtree.
#[derive(Debug, Clone, Default)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    /// Attribute value, trimmed; `None` when absent or empty.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// This element's own text, trimmed; `None` when empty.
    pub fn own_text(&self) -> Option<&str> {
        let t = self.text.trim();
        (!t.is_empty()).then_some(t)
    }

    /// Text of a direct child, trimmed; `None` when absent or empty.
    pub fn child_text(&self, tag: &str) -> Option<&str> {
        self.children
            .iter()
            .find(|c| c.name == tag)
            .and_then(|c| c.own_text())
    }

    /// First descendant with the given tag, depth-first.
    pub fn find(&self, tag: &str) -> Option<&Element> {
        for child in &self.children {
            if child.name == tag {
                return Some(child);
            }
            if let Some(found) = child.find(tag) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants with the given tag, in document order.
    pub fn find_all<'a>(&'a self, tag: &str, out: &mut Vec<&'a Element>) {
        for child in &self.children {
            if child.name == tag {
                out.push(child);
            }
            child.find_all(tag, out);
        }
    }

    /// Convenience wrapper over [`find_all`] returning a fresh vector.
    pub fn descendants(&self, tag: &str) -> Vec<&Element> {
        let mut out = Vec::new();
        self.find_all(tag, &mut out);
        out
    }
}

/// Streams element subtrees whose tag matches one of `targets` out of a
/// sanitized document, one at a time.
pub struct SubtreeReader<'a> {
    reader: Reader<&'a [u8]>,
    targets: &'a [&'a str],
}

impl<'a> SubtreeReader<'a> {
    /// `xml` must already be sanitized.
    pub fn new(xml: &'a str, targets: &'a [&'a str]) -> Self {
        SubtreeReader {
            reader: Reader::from_str(xml),
            targets,
        }
    }

    /// Next matching subtree, or `None` at end of document.
    pub fn next_subtree(&mut self) -> Result<Option<Element>, ParseError> {
        // Stack of open elements inside the subtree being collected.
        let mut stack: Vec<Element> = Vec::new();

        loop {
            match self.reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if stack.is_empty() && !self.targets.contains(&name.as_str()) {
                        continue;
                    }
                    let mut el = Element {
                        name,
                        ..Default::default()
                    };
                    for attr in e.attributes().flatten() {
                        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                        let val = String::from_utf8_lossy(&attr.value).into_owned();
                        el.attrs.push((key, val));
                    }
                    stack.push(el);
                }
                Ok(Event::Empty(ref e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if stack.is_empty() && !self.targets.contains(&name.as_str()) {
                        continue;
                    }
                    let mut el = Element {
                        name,
                        ..Default::default()
                    };
                    for attr in e.attributes().flatten() {
                        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                        let val = String::from_utf8_lossy(&attr.value).into_owned();
                        el.attrs.push((key, val));
                    }
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(el),
                        None => return Ok(Some(el)),
                    }
                }
                Ok(Event::Text(ref e)) => {
                    if let Some(top) = stack.last_mut() {
                        let text = e.unescape().map_err(|e| ParseError::Xml(e.to_string()))?;
                        top.text.push_str(&text);
                    }
                }
                Ok(Event::CData(ref e)) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&String::from_utf8_lossy(e));
                    }
                }
                Ok(Event::End(_)) => {
                    if let Some(done) = stack.pop() {
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(done),
                            None => return Ok(Some(done)),
                        }
                    }
                }
                Ok(Event::Eof) => {
                    if stack.is_empty() {
                        return Ok(None);
                    }
                    return Err(ParseError::Truncated);
                }
                Err(e) => return Err(ParseError::Xml(e.to_string())),
                Ok(_) => {}
            }
        }
    }
}

/// Parse a source amount string into a `Decimal`.
///
/// Handles thousands separators, `(x)` and `(-)x` negation, currency symbols
/// and `Dr`/`Cr` suffixes (`Cr` negates). Unparsable values become 0.
pub fn parse_amount(s: Option<&str>) -> Decimal {
    let Some(raw) = s else {
        return Decimal::ZERO;
    };
    let mut s = raw.trim().to_string();
    if s.is_empty() {
        return Decimal::ZERO;
    }

    let mut negative = false;

    if let Some(rest) = s.strip_prefix("(-)") {
        negative = true;
        s = rest.to_string();
    } else if s.starts_with('(') && s.ends_with(')') {
        negative = true;
        s = s[1..s.len() - 1].to_string();
    }

    let trimmed = s.trim();
    if let Some(rest) = trimmed.strip_suffix("Dr") {
        s = rest.to_string();
    } else if let Some(rest) = trimmed.strip_suffix("Cr") {
        negative = !negative;
        s = rest.to_string();
    }

    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, ',' | '₹' | '$' | '€' | '£' | '¥') && !c.is_whitespace())
        .collect();

    match Decimal::from_str(&cleaned) {
        Ok(v) => {
            if negative {
                -v
            } else {
                v
            }
        }
        Err(_) => Decimal::ZERO,
    }
}

const DATE_FORMATS: &[&str] = &["%Y%m%d", "%Y-%m-%d", "%d-%b-%Y", "%d/%m/%Y", "%d-%m-%Y"];

/// Parse a source date in any of its known formats.
pub fn parse_date(s: Option<&str>) -> Option<NaiveDate> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Like [`parse_date`], substituting today when the value is absent or
/// unparseable. Voucher dates must never be null downstream.
pub fn parse_date_or_today(s: Option<&str>) -> NaiveDate {
    parse_date(s).unwrap_or_else(|| Local::now().date_naive())
}

/// Yes/No style booleans.
pub fn parse_bool(s: Option<&str>) -> bool {
    matches!(
        s.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("yes" | "y" | "true" | "1")
    )
}

/// ALTERID values sometimes arrive with embedded spaces ("1 234").
pub fn parse_alter_id(s: Option<&str>) -> Option<i64> {
    let cleaned: String = s?
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect();
    cleaned.parse().ok()
}

pub fn parse_credit_days(s: Option<&str>) -> Option<i32> {
    let t = s?.trim();
    // "30 Days" style suffixes appear in some exports.
    let digits: String = t
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '-' || *c == '+')
        .collect();
    digits.parse().ok()
}

/// Split a billed-quantity string like "2 Nos" into quantity and unit.
pub fn parse_qty_uom(s: &str) -> (Option<Decimal>, Option<String>) {
    let s = s.trim();
    if s.is_empty() {
        return (None, None);
    }
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
        .unwrap_or(s.len());
    let qty = Decimal::from_str(&s[..split]).ok();
    let unit = s[split..]
        .split('/')
        .next()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string);
    (qty, unit)
}

/// Take the numeric part of a rate string like "35000 / Nos".
pub fn parse_rate(s: &str) -> Option<Decimal> {
    let head = s.split('/').next()?.trim().replace(',', "");
    if head.is_empty() {
        return None;
    }
    Decimal::from_str(&head).ok()
}
