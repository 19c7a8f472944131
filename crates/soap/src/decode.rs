//! Decoding of SOAP response documents into [`Value`] trees.
//!
//! Elements are keyed by local name; namespace prefixes are dropped.
//! Repeated sibling elements fold into a `Value::List`. Elements with
//! `nil="true"`, or with neither children nor text, decode as `Value::Null`.
//! Attributes are otherwise ignored.

use crate::{Error, Value};
use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};

struct Frame {
    name: String,
    fields: IndexMap<String, Value>,
    text: String,
    nil: bool,
}

impl Frame {
    fn open(start: &BytesStart) -> Result<Self, Error> {
        Ok(Self {
            name: local_name(start)?,
            fields: IndexMap::new(),
            text: String::new(),
            nil: is_nil(start)?,
        })
    }

    fn close(self) -> (String, Value) {
        let value = if self.nil {
            Value::Null
        } else if !self.fields.is_empty() {
            Value::Map(self.fields)
        } else if !self.text.trim().is_empty() {
            Value::Text(self.text)
        } else {
            Value::Null
        };
        (self.name, value)
    }
}

/// Decode a complete XML document. The result is a single-entry map
/// keyed by the document element's local name.
pub fn document(xml: &str) -> Result<Value, Error> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut stack: Vec<Frame> = vec![Frame {
        name: String::new(),
        fields: IndexMap::new(),
        text: String::new(),
        nil: false,
    }];

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(Frame::open(&start)?),
            Event::Empty(start) => {
                let (name, _) = Frame::open(&start)?.close();
                insert(top(&mut stack)?, name, Value::Null);
            }
            Event::Text(text) => {
                let text = text.unescape()?;
                top(&mut stack)?.text.push_str(&text);
            }
            Event::CData(cdata) => {
                let text = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                top(&mut stack)?.text.push_str(&text);
            }
            Event::End(_) => {
                let (name, value) = match stack.pop() {
                    Some(frame) if !stack.is_empty() => frame.close(),
                    _ => return Err(Error::Malformed("unbalanced closing element".to_string())),
                };
                insert(top(&mut stack)?, name, value);
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => {}
        }
    }

    let root = match stack.pop() {
        Some(root) if stack.is_empty() => root,
        _ => return Err(Error::Malformed("document ended within an element".to_string())),
    };

    if root.fields.is_empty() {
        return Err(Error::Malformed("document has no root element".to_string()));
    }
    Ok(Value::Map(root.fields))
}

/// A SOAP Fault carried within an envelope Body.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    pub code: String,
    pub message: String,
}

impl Fault {
    /// Faults raised because the server couldn't bind the request message
    /// to the operation's contract. These indicate a request of the wrong
    /// shape, rather than a failure of the operation itself.
    /// Plain `Client`/`Sender` faults (an invalid token, say) are not rejections.
    pub fn is_rejection(&self) -> bool {
        let code = self.code.rsplit(':').next().unwrap_or_default();
        code == "DeserializationFailed"
            || self.message.contains("DeserializationFailed")
            || self.message.contains("formatter threw an exception")
    }
}

/// Body is the decoded content of a SOAP envelope Body.
#[derive(Debug, PartialEq)]
pub enum Body {
    /// The first element of the Body, keyed by its local name.
    Response(Value),
    Fault(Fault),
}

/// Decode a SOAP envelope and return its Body content.
pub fn envelope(xml: &str) -> Result<Body, Error> {
    let doc = document(xml)?;

    let Some(body) = doc.at("Envelope/Body").and_then(Value::as_map) else {
        return Err(Error::Malformed("response is not a SOAP envelope".to_string()));
    };

    if let Some(fault) = body.get("Fault") {
        // SOAP 1.1 uses faultcode/faultstring, and 1.2 uses Code/Value and Reason/Text.
        // A 1.2 Subcode is more specific than its Code.
        let code = fault
            .at("faultcode")
            .or_else(|| fault.at("Code/Subcode/Value"))
            .or_else(|| fault.at("Code/Value"))
            .and_then(Value::as_text)
            .unwrap_or_default();
        let message = fault
            .at("faultstring")
            .or_else(|| fault.at("Reason/Text"))
            .and_then(Value::as_text)
            .unwrap_or_default();

        return Ok(Body::Fault(Fault { code, message }));
    }

    match body.iter().next() {
        Some((name, value)) => {
            let mut response = IndexMap::new();
            response.insert(name.clone(), value.clone());
            Ok(Body::Response(Value::Map(response)))
        }
        None => Err(Error::Malformed("SOAP Body is empty".to_string())),
    }
}

fn top(stack: &mut [Frame]) -> Result<&mut Frame, Error> {
    stack
        .last_mut()
        .ok_or_else(|| Error::Malformed("unbalanced document".to_string()))
}

fn insert(frame: &mut Frame, name: String, value: Value) {
    match frame.fields.get_mut(&name) {
        Some(Value::List(items)) => items.push(value),
        Some(existing) => {
            let first = std::mem::take(existing);
            *existing = Value::List(vec![first, value]);
        }
        None => {
            frame.fields.insert(name, value);
        }
    }
}

fn local_name(start: &BytesStart) -> Result<String, Error> {
    let name = start.local_name();
    Ok(std::str::from_utf8(name.as_ref())
        .map_err(|err| Error::Malformed(format!("element name is not UTF-8: {err}")))?
        .to_string())
}

fn is_nil(start: &BytesStart) -> Result<bool, Error> {
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.local_name().as_ref() == b"nil" {
            return Ok(attr.unescape_value()?.trim() == "true");
        }
    }
    Ok(false)
}
