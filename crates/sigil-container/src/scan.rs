//! Markup scanning.
//!
//! Two strategies locate elements such as `<metadata>`:
//!
//! 1. A structural tokenizer that understands comments, CDATA sections,
//!    processing instructions, declarations and quoted attribute values.
//!    Text content is entity-decoded and CDATA is unwrapped.
//! 2. A regex scan, used when the tokenizer finds nothing or rejects the
//!    markup. CDATA markers are unwrapped the same way.
//!
//! JSON inside element text is located with string-aware brace matching
//! that yields only the outermost balanced objects.

use std::sync::OnceLock;

use regex::Regex;

/// Elements the container format reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Metadata,
    Desc,
}

impl Tag {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::Desc => "desc",
        }
    }

    fn regex(&self) -> Option<&'static Regex> {
        static METADATA: OnceLock<Option<Regex>> = OnceLock::new();
        static DESC: OnceLock<Option<Regex>> = OnceLock::new();
        let cell = match self {
            Self::Metadata => &METADATA,
            Self::Desc => &DESC,
        };
        cell.get_or_init(|| {
            let name = self.name();
            Regex::new(&format!(r"(?is)<{name}\b([^>]*)>(.*?)</{name}\s*>")).ok()
        })
        .as_ref()
    }
}

/// An element found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub id: Option<String>,
    /// Byte offset of the opening `<`.
    pub start: usize,
    /// Byte offset just past the closing tag.
    pub end: usize,
    /// Decoded text content.
    pub text: String,
}

#[derive(Debug)]
struct Malformed(String);

/// All `tag` elements, structurally if possible, else by regex.
pub fn elements(doc: &str, tag: Tag) -> Vec<Element> {
    match structural_elements(doc, tag.name()) {
        Ok(found) if !found.is_empty() => found,
        Ok(_) => regex_elements(doc, tag),
        Err(Malformed(reason)) => {
            tracing::debug!(%reason, tag = tag.name(), "structural scan failed, using text fallback");
            regex_elements(doc, tag)
        }
    }
}

/// Non-blank `tag` elements, those with id `preferred` first.
pub fn candidates(doc: &str, tag: Tag, preferred: Option<&str>) -> Vec<Element> {
    let mut found: Vec<Element> = elements(doc, tag)
        .into_iter()
        .filter(|e| !e.text.trim().is_empty())
        .collect();
    if let Some(id) = preferred {
        found.sort_by_key(|e| e.id.as_deref() != Some(id));
    }
    found
}

/// Byte span of the first `tag` element with the given id.
pub fn element_span(doc: &str, tag: Tag, id: &str) -> Option<(usize, usize)> {
    elements(doc, tag)
        .into_iter()
        .find(|e| e.id.as_deref() == Some(id))
        .map(|e| (e.start, e.end))
}

fn find_from(doc: &str, from: usize, pat: &str) -> Option<usize> {
    doc.get(from..)?.find(pat).map(|n| from + n)
}

fn local_name(qualified: &str) -> &str {
    qualified.rsplit(':').next().unwrap_or(qualified)
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b':' | b'.') || b >= 0x80
}

struct StartTag {
    name: String,
    id: Option<String>,
    self_closing: bool,
}

fn structural_elements(doc: &str, name: &str) -> Result<Vec<Element>, Malformed> {
    let mut out = Vec::new();
    let mut open: Option<Element> = None;
    let mut nested = 0usize;
    let mut i = 0;

    while i < doc.len() {
        let rest = &doc[i..];
        if !rest.starts_with('<') {
            let end = rest.find('<').map_or(doc.len(), |n| i + n);
            if let Some(el) = open.as_mut() {
                el.text.push_str(&decode_entities(&doc[i..end]));
            }
            i = end;
        } else if rest.starts_with("<!--") {
            let close = find_from(doc, i + 4, "-->")
                .ok_or_else(|| Malformed("unterminated comment".into()))?;
            i = close + 3;
        } else if rest.starts_with("<![CDATA[") {
            let body = i + 9;
            let close = find_from(doc, body, "]]>")
                .ok_or_else(|| Malformed("unterminated CDATA section".into()))?;
            if let Some(el) = open.as_mut() {
                el.text.push_str(&doc[body..close]);
            }
            i = close + 3;
        } else if rest.starts_with("<?") {
            let close = find_from(doc, i + 2, "?>")
                .ok_or_else(|| Malformed("unterminated processing instruction".into()))?;
            i = close + 2;
        } else if rest.starts_with("<!") {
            i = declaration_end(doc, i + 2)? + 1;
        } else if rest.starts_with("</") {
            let close = find_from(doc, i + 2, ">")
                .ok_or_else(|| Malformed("unterminated end tag".into()))?;
            let tag = doc[i + 2..close].trim();
            if local_name(tag).eq_ignore_ascii_case(name) {
                if nested > 0 {
                    nested -= 1;
                } else if let Some(mut el) = open.take() {
                    el.end = close + 1;
                    out.push(el);
                }
            }
            i = close + 1;
        } else {
            let (tag, close) = start_tag(doc, i)?;
            if local_name(&tag.name).eq_ignore_ascii_case(name) {
                if open.is_some() {
                    if !tag.self_closing {
                        nested += 1;
                    }
                } else {
                    let el = Element {
                        id: tag.id,
                        start: i,
                        end: close + 1,
                        text: String::new(),
                    };
                    if tag.self_closing {
                        out.push(el);
                    } else {
                        open = Some(el);
                    }
                }
            }
            i = close + 1;
        }
    }

    if open.is_some() {
        return Err(Malformed(format!("unclosed <{name}> element")));
    }
    Ok(out)
}

/// End of a `<!DOCTYPE ...>`-style declaration, skipping quoted strings
/// and an internal subset in brackets.
fn declaration_end(doc: &str, from: usize) -> Result<usize, Malformed> {
    let bytes = doc.as_bytes();
    let mut quote: Option<u8> = None;
    let mut brackets = 0usize;
    for (j, &b) in bytes.iter().enumerate().skip(from) {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'[') => brackets += 1,
            (None, b']') => brackets = brackets.saturating_sub(1),
            (None, b'>') if brackets == 0 => return Ok(j),
            _ => {}
        }
    }
    Err(Malformed("unterminated declaration".into()))
}

fn start_tag(doc: &str, at: usize) -> Result<(StartTag, usize), Malformed> {
    let bytes = doc.as_bytes();
    let len = bytes.len();
    let mut j = at + 1;
    while j < len && is_name_byte(bytes[j]) {
        j += 1;
    }
    if j == at + 1 {
        return Err(Malformed(format!("invalid tag at byte {at}")));
    }
    let name = doc[at + 1..j].to_string();
    let mut id = None;

    loop {
        while j < len && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j >= len {
            return Err(Malformed(format!("unterminated <{name}> tag")));
        }
        match bytes[j] {
            b'>' => {
                let tag = StartTag {
                    name,
                    id,
                    self_closing: false,
                };
                return Ok((tag, j));
            }
            b'/' if bytes.get(j + 1) == Some(&b'>') => {
                let tag = StartTag {
                    name,
                    id,
                    self_closing: true,
                };
                return Ok((tag, j + 1));
            }
            _ => {}
        }

        let attr_start = j;
        while j < len && is_name_byte(bytes[j]) {
            j += 1;
        }
        if j == attr_start {
            return Err(Malformed(format!("invalid attribute in <{name}>")));
        }
        let attr = &doc[attr_start..j];
        while j < len && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if bytes.get(j) != Some(&b'=') {
            continue;
        }
        j += 1;
        while j < len && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        let value = match bytes.get(j) {
            Some(&(q @ (b'"' | b'\''))) => {
                let value_end = bytes[j + 1..]
                    .iter()
                    .position(|&b| b == q)
                    .map(|n| j + 1 + n)
                    .ok_or_else(|| Malformed(format!("unterminated attribute in <{name}>")))?;
                let value = decode_entities(&doc[j + 1..value_end]);
                j = value_end + 1;
                value
            }
            Some(_) => {
                let value_start = j;
                while j < len && !bytes[j].is_ascii_whitespace() && bytes[j] != b'>' {
                    j += 1;
                }
                doc[value_start..j].to_string()
            }
            None => return Err(Malformed(format!("unterminated <{name}> tag"))),
        };
        if attr.eq_ignore_ascii_case("id") {
            id = Some(value);
        }
    }
}

fn regex_elements(doc: &str, tag: Tag) -> Vec<Element> {
    static ID_ATTR: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = tag.regex() else {
        return Vec::new();
    };
    let id_re = ID_ATTR
        .get_or_init(|| Regex::new(r#"(?i)\bid\s*=\s*["']([^"']*)["']"#).ok())
        .as_ref();

    re.captures_iter(doc)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let attrs = caps.get(1).map_or("", |m| m.as_str());
            let id = id_re
                .and_then(|r| r.captures(attrs))
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string());
            Some(Element {
                id,
                start: whole.start(),
                end: whole.end(),
                text: unwrap_text(caps.get(2).map_or("", |m| m.as_str())),
            })
        })
        .collect()
}

/// Decode raw element content: CDATA sections verbatim, the rest with
/// entities resolved. An unterminated CDATA section runs to the end.
fn unwrap_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(open) = rest.find("<![CDATA[") {
        out.push_str(&decode_entities(&rest[..open]));
        let body = &rest[open + 9..];
        match body.find("]]>") {
            Some(close) => {
                out.push_str(&body[..close]);
                rest = &body[close + 3..];
            }
            None => {
                out.push_str(body);
                rest = "";
            }
        }
    }
    out.push_str(&decode_entities(rest));
    out
}

/// Resolve the predefined XML entities and numeric character references.
/// Anything unrecognized is kept literally.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| entity(&tail[1..semi]).map(|c| (semi, c)));
        match decoded {
            Some((semi, c)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = if let Some(hex) = name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}

/// Outermost balanced `{...}` spans of `text`, in order. Quotes are only
/// tracked inside an object, so prose apostrophes around it are harmless.
///
/// One pass with a stack of open braces. Braces left open at the end of
/// input are dropped, and the balanced spans nested inside them still count.
pub fn outermost_json_objects(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut opens: Vec<usize> = Vec::new();
    let mut closed: Vec<(usize, usize)> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for (j, &b) in bytes.iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' if !opens.is_empty() => in_string = true,
            b'{' => opens.push(j),
            b'}' => {
                if let Some(open) = opens.pop() {
                    closed.push((open, j));
                }
            }
            _ => {}
        }
    }

    // Spans nest or are disjoint, so sorting by start puts each outer span
    // before everything it contains.
    closed.sort_unstable();
    let mut out = Vec::new();
    let mut covered_to = None;
    for (open, close) in closed {
        if covered_to.is_some_and(|end| open < end) {
            continue;
        }
        out.push(&text[open..=close]);
        covered_to = Some(close);
    }
    out
}
