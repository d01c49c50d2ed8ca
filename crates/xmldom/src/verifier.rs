//! Name and character-data legality checks
//!
//! Pure functions. Every check returns `Ok(())` or the `IllegalName` /
//! `IllegalData` error that the caller surfaces unchanged.

use crate::error::{DomError, Result};

fn illegal_name(name: &str, construct: &'static str, reason: impl Into<String>) -> DomError {
    DomError::IllegalName {
        name: name.to_string(),
        construct,
        reason: reason.into(),
    }
}

fn illegal_data(data: &str, construct: &'static str, reason: impl Into<String>) -> DomError {
    DomError::IllegalData {
        data: data.to_string(),
        construct,
        reason: reason.into(),
    }
}

/// XML 1.0 (5th edition) `Char`
#[inline]
pub fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\u{9}' | '\u{A}' | '\u{D}'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// XML 1.0 (5th edition) `NameStartChar`, colon excluded
#[inline]
pub fn is_name_start_char(c: char) -> bool {
    matches!(c,
        'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

/// XML 1.0 (5th edition) `NameChar`, colon excluded
#[inline]
pub fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9'
            | '\u{B7}'
            | '\u{300}'..='\u{36F}'
            | '\u{203F}'..='\u{2040}')
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

fn check_name(name: &str, construct: &'static str, allow_colon: bool) -> Result<()> {
    let mut chars = name.chars();
    let first = chars
        .next()
        .ok_or_else(|| illegal_name(name, construct, "XML names cannot be empty"))?;

    if !(is_name_start_char(first) || (allow_colon && first == ':')) {
        return Err(illegal_name(
            name,
            construct,
            format!("XML names cannot begin with the character \"{}\"", first),
        ));
    }

    for c in chars {
        if c == ':' && !allow_colon {
            return Err(illegal_name(name, construct, "names cannot contain colons"));
        }
        if !(is_name_char(c) || c == ':') {
            return Err(illegal_name(
                name,
                construct,
                format!("XML names cannot contain the character \"{}\"", c),
            ));
        }
    }

    Ok(())
}

/// A full XML name (colons allowed)
pub fn check_xml_name(name: &str, construct: &'static str) -> Result<()> {
    check_name(name, construct, true)
}

pub fn check_element_name(name: &str) -> Result<()> {
    check_name(name, "element", false)
}

pub fn check_attribute_name(name: &str) -> Result<()> {
    check_name(name, "attribute", false)?;
    if name == "xmlns" {
        return Err(illegal_name(
            name,
            "attribute",
            "An attribute name may not be \"xmlns\"; declare namespaces on the element instead",
        ));
    }
    Ok(())
}

/// The empty prefix is legal (default namespace)
pub fn check_namespace_prefix(prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Ok(());
    }
    if prefix
        .get(..3)
        .is_some_and(|head| head.eq_ignore_ascii_case("xml"))
    {
        return Err(illegal_name(
            prefix,
            "namespace prefix",
            "Namespace prefixes cannot begin with \"xml\" in any combination of case",
        ));
    }
    check_name(prefix, "namespace prefix", false)
}

pub fn check_namespace_uri(uri: &str) -> Result<()> {
    let Some(first) = uri.chars().next() else {
        return Ok(());
    };
    if first.is_ascii_digit() || first == '$' || first == '-' {
        return Err(illegal_name(
            uri,
            "namespace URI",
            format!("Namespace URIs cannot begin with \"{}\"", first),
        ));
    }
    if let Some(c) = uri.chars().find(|&c| !is_xml_char(c) || is_whitespace(c)) {
        return Err(illegal_name(
            uri,
            "namespace URI",
            format!("Namespace URIs cannot contain the character {:?}", c),
        ));
    }
    Ok(())
}

pub fn check_character_data(text: &str, construct: &'static str) -> Result<()> {
    if let Some(c) = text.chars().find(|&c| !is_xml_char(c)) {
        return Err(illegal_data(
            text,
            construct,
            format!("0x{:X} is not a legal XML character", c as u32),
        ));
    }
    Ok(())
}

pub fn check_cdata_section(text: &str) -> Result<()> {
    check_character_data(text, "CDATA section")?;
    if text.contains("]]>") {
        return Err(illegal_data(
            text,
            "CDATA section",
            "CDATA cannot contain the CDATA end delimiter \"]]>\"",
        ));
    }
    Ok(())
}

pub fn check_comment_data(text: &str) -> Result<()> {
    check_character_data(text, "comment")?;
    if text.contains("--") {
        return Err(illegal_data(text, "comment", "Comment data cannot contain \"--\""));
    }
    if text.ends_with('-') {
        return Err(illegal_data(text, "comment", "Comment data cannot end with a hyphen"));
    }
    Ok(())
}

pub fn check_pi_target(target: &str) -> Result<()> {
    check_name(target, "processing instruction", false)?;
    if target.eq_ignore_ascii_case("xml") {
        return Err(illegal_name(
            target,
            "processing instruction",
            "Processing instructions cannot have a target of \"xml\" in any combination of case; \
             the XML declaration is written by the outputter",
        ));
    }
    Ok(())
}

pub fn check_pi_data(data: &str) -> Result<()> {
    check_character_data(data, "processing instruction")?;
    if data.contains("?>") {
        return Err(illegal_data(
            data,
            "processing instruction",
            "Processing instruction data cannot contain \"?>\"",
        ));
    }
    Ok(())
}

pub fn check_public_id(public_id: &str) -> Result<()> {
    let legal = |c: char| {
        c.is_ascii_alphanumeric()
            || matches!(c, ' ' | '\r' | '\n' | '-' | '\'' | '(' | ')' | '+' | ',' | '.' | '/'
                | ':' | '=' | '?' | ';' | '!' | '*' | '#' | '@' | '$' | '_' | '%')
    };
    if let Some(c) = public_id.chars().find(|&c| !legal(c)) {
        return Err(illegal_data(
            public_id,
            "public ID",
            format!("{:?} is not a legal character in public IDs", c),
        ));
    }
    Ok(())
}

pub fn check_system_id(system_id: &str) -> Result<()> {
    check_character_data(system_id, "system ID")?;
    if system_id.contains('\'') && system_id.contains('"') {
        return Err(illegal_data(
            system_id,
            "system ID",
            "System IDs cannot contain both single and double quotes",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_names() {
        assert!(check_element_name("root").is_ok());
        assert!(check_element_name("_a-b.c9").is_ok());
        assert!(check_element_name("héllo").is_ok());
        assert!(check_element_name("").is_err());
        assert!(check_element_name("9lives").is_err());
        assert!(check_element_name("a:b").is_err());
        assert!(check_element_name("a b").is_err());
    }

    #[test]
    fn test_attribute_names() {
        assert!(check_attribute_name("id").is_ok());
        assert!(matches!(
            check_attribute_name("xmlns"),
            Err(DomError::IllegalName { .. })
        ));
    }

    #[test]
    fn test_xml_name_allows_colon() {
        assert!(check_xml_name("a:b", "entity").is_ok());
    }

    #[test]
    fn test_character_data() {
        assert!(check_character_data("plain\ttext\n", "text").is_ok());
        assert!(matches!(
            check_character_data("bell\u{7}", "text"),
            Err(DomError::IllegalData { .. })
        ));
        assert!(check_character_data("\u{FFFE}", "text").is_err());
    }

    #[test]
    fn test_comment_rules() {
        assert!(check_comment_data(" fine ").is_ok());
        assert!(check_comment_data("a--b").is_err());
        assert!(check_comment_data("trailing-").is_err());
    }

    #[test]
    fn test_cdata_and_pi() {
        assert!(check_cdata_section("x < y").is_ok());
        assert!(check_cdata_section("x ]]> y").is_err());
        assert!(check_pi_target("xml-stylesheet").is_ok());
        assert!(check_pi_target("XmL").is_err());
        assert!(check_pi_data("a?>b").is_err());
    }

    #[test]
    fn test_ids() {
        assert!(check_public_id("-//W3C//DTD XHTML 1.0 Strict//EN").is_ok());
        assert!(check_public_id("bad<id").is_err());
        assert!(check_system_id("it's").is_ok());
        assert!(check_system_id("it's \"quoted\"").is_err());
    }

    #[test]
    fn test_namespace_uri() {
        assert!(check_namespace_uri("urn:example").is_ok());
        assert!(check_namespace_uri("1urn").is_err());
        assert!(check_namespace_uri("has space").is_err());
    }
}
