//! Feeds quick-xml events into a [`Dispatcher`].
use crate::error::DigestError;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{LocalName, ResolveResult};
use quick_xml::reader::NsReader;
use std::io::BufRead;
use xmldigest_core::{Attribute, Attributes, DispatchError, Dispatcher};

/// Tokenizer options.
#[derive(Debug, Clone, Copy)]
pub struct ReaderOptions {
    /// Resolve prefixes to namespace URIs; otherwise names are reported as written.
    pub namespace_aware: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            namespace_aware: true,
        }
    }
}

/// Reads a whole document from `source` and dispatches its events.
///
/// The dispatcher is aborted on any failure, so open rule scopes never outlive
/// the parse.
pub fn drive<R: BufRead>(
    source: R,
    dispatcher: &mut Dispatcher,
    options: ReaderOptions,
) -> Result<(), DigestError> {
    let mut reader = NsReader::from_reader(source);
    reader.config_mut().trim_text(false);

    let result = run(&mut reader, dispatcher, options);
    if let Err(e) = &result {
        log::debug!("Parse failed: {}", e);
        dispatcher.abort();
    }
    result.map_err(|e| e.at(reader.error_position()))
}

fn run<R: BufRead>(
    reader: &mut NsReader<R>,
    dispatcher: &mut Dispatcher,
    options: ReaderOptions,
) -> Result<(), DigestError> {
    let mut buf = Vec::new();
    let mut open: Vec<(String, String)> = Vec::new();

    dispatcher.start_document()?;
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let (namespace, name) = start_element(reader, dispatcher, &e, options)?;
                open.push((namespace, name));
            }
            Event::Empty(e) => {
                let (namespace, name) = start_element(reader, dispatcher, &e, options)?;
                dispatcher.end_element(&namespace, &name)?;
            }
            Event::End(_) => {
                let (namespace, name) = open
                    .pop()
                    .ok_or_else(|| DispatchError::Internal("end tag without an open element".to_string()))?;
                dispatcher.end_element(&namespace, &name)?;
            }
            Event::Text(e) => {
                let text = reader.decoder().decode(&e).map_err(quick_xml::Error::from)?;
                dispatcher.characters(&text)?;
            }
            Event::CData(e) => {
                let text = reader.decoder().decode(&e).map_err(quick_xml::Error::from)?;
                dispatcher.characters(&text)?;
            }
            Event::GeneralRef(e) => {
                let entity = reader.decoder().decode(&e).map_err(quick_xml::Error::from)?;
                let text = resolve_reference(&entity)?;
                dispatcher.characters(&text)?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions and doctypes carry no content.
            _ => {}
        }
        buf.clear();
    }
    dispatcher.end_document()?;
    Ok(())
}

fn start_element<R: BufRead>(
    reader: &NsReader<R>,
    dispatcher: &mut Dispatcher,
    e: &BytesStart<'_>,
    options: ReaderOptions,
) -> Result<(String, String), DigestError> {
    let mut attrs = Attributes::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = attr.key.as_ref();
        let qname = std::str::from_utf8(key)?.to_string();
        let value = attr.decode_and_unescape_value(reader.decoder())?.into_owned();

        if options.namespace_aware {
            if key == b"xmlns" {
                dispatcher.start_prefix_mapping("", &value);
                continue;
            }
            if let Some(prefix) = key.strip_prefix(b"xmlns:") {
                dispatcher.start_prefix_mapping(std::str::from_utf8(prefix)?, &value);
                continue;
            }
            let (namespace, local_name) =
                resolve(reader.resolver().resolve_attribute(attr.key), &qname)?;
            attrs.push(Attribute {
                namespace,
                local_name,
                qname,
                value,
            });
        } else {
            attrs.push(Attribute {
                namespace: String::new(),
                local_name: qname.clone(),
                qname,
                value,
            });
        }
    }

    let raw = std::str::from_utf8(e.name().as_ref())?.to_string();
    let (namespace, name) = if options.namespace_aware {
        resolve(reader.resolver().resolve_element(e.name()), &raw)?
    } else {
        (String::new(), raw)
    };
    dispatcher.start_element(&namespace, &name, &attrs)?;
    Ok((namespace, name))
}

fn resolve(
    (ns, local): (ResolveResult<'_>, LocalName<'_>),
    raw: &str,
) -> Result<(String, String), DigestError> {
    let local = std::str::from_utf8(local.as_ref())?.to_string();
    match ns {
        ResolveResult::Bound(uri) => Ok((std::str::from_utf8(uri.as_ref())?.to_string(), local)),
        ResolveResult::Unbound => Ok((String::new(), local)),
        ResolveResult::Unknown(_) => Err(DigestError::UnknownPrefix(raw.to_string())),
    }
}

/// Expands `&name;` references that appear between text runs.
fn resolve_reference(entity: &str) -> Result<String, DigestError> {
    if let Some(reference) = entity.strip_prefix('#') {
        let code = match reference.strip_prefix('x').or_else(|| reference.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => reference.parse::<u32>().ok(),
        };
        return code
            .and_then(char::from_u32)
            .map(String::from)
            .ok_or_else(|| DigestError::UnknownEntity(entity.to_string()));
    }
    resolve_predefined_entity(entity)
        .map(str::to_string)
        .ok_or_else(|| DigestError::UnknownEntity(entity.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_and_predefined_references() {
        assert_eq!(resolve_reference("amp").unwrap(), "&");
        assert_eq!(resolve_reference("#65").unwrap(), "A");
        assert_eq!(resolve_reference("#x263A").unwrap(), "\u{263A}");
        assert!(matches!(
            resolve_reference("nbsp"),
            Err(DigestError::UnknownEntity(e)) if e == "nbsp"
        ));
        assert!(resolve_reference("#xZZ").is_err());
    }
}
