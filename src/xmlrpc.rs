//! Minimal XML-RPC codec
//!
//! Encodes `methodCall` documents and decodes `methodResponse` documents,
//! which is all the subtitle service needs.

use std::collections::BTreeMap;

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::RpcError;

/// An XML-RPC value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Bool(bool),
    Double(f64),
    String(String),
    DateTime(String),
    Base64(String),
    Array(Vec<Value>),
    Struct(BTreeMap<String, Value>),
    Nil,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Struct(members) => Some(members),
            _ => None,
        }
    }

    /// Member `key` of a struct value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_struct().and_then(|members| members.get(key))
    }

    /// Scalar rendered as text, the way loosely typed servers expect it read
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::String(s) | Value::DateTime(s) | Value::Base64(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::Double(d) => Some(format!("{:.1}", d)),
            Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(members: BTreeMap<String, Value>) -> Self {
        Value::Struct(members)
    }
}

/// Build the `methodCall` document for `method(params...)`
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?><methodCall><methodName>");
    out.push_str(&escape(method));
    out.push_str("</methodName><params>");
    for param in params {
        out.push_str("<param>");
        write_value(&mut out, param);
        out.push_str("</param>");
    }
    out.push_str("</params></methodCall>");
    out
}

fn write_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Int(i) => out.push_str(&format!("<int>{}</int>", i)),
        Value::Bool(b) => out.push_str(&format!("<boolean>{}</boolean>", u8::from(*b))),
        Value::Double(d) => out.push_str(&format!("<double>{}</double>", d)),
        Value::String(s) => {
            out.push_str("<string>");
            out.push_str(&escape(s.as_str()));
            out.push_str("</string>");
        }
        Value::DateTime(s) => {
            out.push_str("<dateTime.iso8601>");
            out.push_str(&escape(s.as_str()));
            out.push_str("</dateTime.iso8601>");
        }
        Value::Base64(s) => {
            out.push_str("<base64>");
            out.push_str(&escape(s.as_str()));
            out.push_str("</base64>");
        }
        Value::Array(values) => {
            out.push_str("<array><data>");
            for v in values {
                write_value(out, v);
            }
            out.push_str("</data></array>");
        }
        Value::Struct(members) => {
            out.push_str("<struct>");
            for (name, v) in members {
                out.push_str("<member><name>");
                out.push_str(&escape(name.as_str()));
                out.push_str("</name>");
                write_value(out, v);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
        Value::Nil => out.push_str("<nil/>"),
    }
    out.push_str("</value>");
}

/// Decode a `methodResponse` document into its single return value
///
/// A `<fault>` response becomes [`RpcError::Fault`].
pub fn parse_response(xml: &str) -> Result<Value, RpcError> {
    let mut parser = ResponseParser { reader: Reader::from_str(xml) };
    parser.expect_start(b"methodResponse")?;
    match parser.next_tag()? {
        Tag::Start(name) if name == "params" => {
            parser.expect_start(b"param")?;
            parser.expect_start(b"value")?;
            let value = parser.parse_value()?;
            parser.expect_end(b"param")?;
            parser.expect_end(b"params")?;
            Ok(value)
        }
        Tag::Start(name) if name == "fault" => {
            parser.expect_start(b"value")?;
            let fault = parser.parse_value()?;
            let code = match fault.get("faultCode") {
                Some(Value::Int(code)) => *code,
                _ => 0,
            };
            let message = fault
                .get("faultString")
                .and_then(Value::to_text)
                .unwrap_or_else(|| "unknown fault".to_string());
            Err(RpcError::Fault { code, message })
        }
        other => Err(malformed(format!("expected <params> or <fault>, found {}", other))),
    }
}

fn malformed(message: String) -> RpcError {
    RpcError::MalformedResponse(message)
}

/// Structural event, with whitespace and prolog stripped
#[derive(Debug)]
enum Tag {
    Start(String),
    Empty(String),
    End(String),
    Text(String),
    Eof,
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tag::Start(name) => write!(f, "<{}>", name),
            Tag::Empty(name) => write!(f, "<{}/>", name),
            Tag::End(name) => write!(f, "</{}>", name),
            Tag::Text(_) => write!(f, "text"),
            Tag::Eof => write!(f, "end of document"),
        }
    }
}

struct ResponseParser<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> ResponseParser<'a> {
    /// Next event, keeping text verbatim (untyped values need it)
    fn next_raw(&mut self) -> Result<Tag, RpcError> {
        loop {
            let tag = match self.reader.read_event()? {
                Event::Start(e) => Tag::Start(String::from_utf8_lossy(e.name().as_ref()).into_owned()),
                Event::Empty(e) => Tag::Empty(String::from_utf8_lossy(e.name().as_ref()).into_owned()),
                Event::End(e) => Tag::End(String::from_utf8_lossy(e.name().as_ref()).into_owned()),
                Event::Text(t) => Tag::Text(t.unescape()?.into_owned()),
                Event::CData(c) => Tag::Text(String::from_utf8_lossy(&c).into_owned()),
                Event::Eof => Tag::Eof,
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => continue,
            };
            return Ok(tag);
        }
    }

    /// Next event, skipping whitespace-only text
    fn next_tag(&mut self) -> Result<Tag, RpcError> {
        loop {
            match self.next_raw()? {
                Tag::Text(text) if text.trim().is_empty() => continue,
                tag => return Ok(tag),
            }
        }
    }

    fn expect_start(&mut self, name: &[u8]) -> Result<(), RpcError> {
        match self.next_tag()? {
            Tag::Start(found) if found.as_bytes() == name => Ok(()),
            other => Err(malformed(format!("expected <{}>, found {}", String::from_utf8_lossy(name), other))),
        }
    }

    fn expect_end(&mut self, name: &[u8]) -> Result<(), RpcError> {
        match self.next_tag()? {
            Tag::End(found) if found.as_bytes() == name => Ok(()),
            other => Err(malformed(format!("expected </{}>, found {}", String::from_utf8_lossy(name), other))),
        }
    }

    /// Text content up to the closing tag `name`
    fn read_text(&mut self, name: &str) -> Result<String, RpcError> {
        let mut text = String::new();
        loop {
            match self.next_raw()? {
                Tag::Text(chunk) => text.push_str(&chunk),
                Tag::End(found) if found == name => return Ok(text),
                other => return Err(malformed(format!("unexpected {} inside <{}>", other, name))),
            }
        }
    }

    /// Parse the content of a `<value>` whose start tag was consumed, up to
    /// and including `</value>`
    fn parse_value(&mut self) -> Result<Value, RpcError> {
        let mut untyped = String::new();
        loop {
            match self.next_raw()? {
                Tag::Text(chunk) => untyped.push_str(&chunk),
                Tag::End(name) if name == "value" => return Ok(Value::String(untyped)),
                Tag::Empty(name) => {
                    let value = match name.as_str() {
                        "nil" => Value::Nil,
                        "string" => Value::String(String::new()),
                        "struct" => Value::Struct(BTreeMap::new()),
                        "array" => Value::Array(Vec::new()),
                        other => return Err(malformed(format!("unexpected empty <{}/>", other))),
                    };
                    self.expect_end(b"value")?;
                    return Ok(value);
                }
                Tag::Start(name) => {
                    let value = self.parse_typed(&name)?;
                    self.expect_end(b"value")?;
                    return Ok(value);
                }
                other => return Err(malformed(format!("unexpected {} inside <value>", other))),
            }
        }
    }

    fn parse_typed(&mut self, name: &str) -> Result<Value, RpcError> {
        match name {
            "string" => Ok(Value::String(self.read_text(name)?)),
            "int" | "i4" | "i8" => {
                let text = self.read_text(name)?;
                text.trim()
                    .parse()
                    .map(Value::Int)
                    .map_err(|_| malformed(format!("invalid integer '{}'", text)))
            }
            "boolean" => match self.read_text(name)?.trim() {
                "1" => Ok(Value::Bool(true)),
                "0" => Ok(Value::Bool(false)),
                other => Err(malformed(format!("invalid boolean '{}'", other))),
            },
            "double" => {
                let text = self.read_text(name)?;
                text.trim()
                    .parse()
                    .map(Value::Double)
                    .map_err(|_| malformed(format!("invalid double '{}'", text)))
            }
            "dateTime.iso8601" => Ok(Value::DateTime(self.read_text(name)?)),
            "base64" => Ok(Value::Base64(self.read_text(name)?.trim().to_string())),
            "struct" => self.parse_struct(),
            "array" => self.parse_array(),
            other => Err(malformed(format!("unknown value type <{}>", other))),
        }
    }

    fn parse_struct(&mut self) -> Result<Value, RpcError> {
        let mut members = BTreeMap::new();
        loop {
            match self.next_tag()? {
                Tag::Start(name) if name == "member" => {
                    self.expect_start(b"name")?;
                    let key = self.read_text("name")?;
                    self.expect_start(b"value")?;
                    let value = self.parse_value()?;
                    self.expect_end(b"member")?;
                    members.insert(key, value);
                }
                Tag::End(name) if name == "struct" => return Ok(Value::Struct(members)),
                other => return Err(malformed(format!("unexpected {} inside <struct>", other))),
            }
        }
    }

    fn parse_array(&mut self) -> Result<Value, RpcError> {
        let mut values = Vec::new();
        match self.next_tag()? {
            Tag::Start(name) if name == "data" => loop {
                match self.next_tag()? {
                    Tag::Start(name) if name == "value" => values.push(self.parse_value()?),
                    Tag::End(name) if name == "data" => break,
                    other => return Err(malformed(format!("unexpected {} inside <data>", other))),
                }
            },
            Tag::Empty(name) if name == "data" => {}
            other => return Err(malformed(format!("expected <data>, found {}", other))),
        }
        self.expect_end(b"array")?;
        Ok(Value::Array(values))
    }
}
