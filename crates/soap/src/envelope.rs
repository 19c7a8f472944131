//! Request payloads, their validation against service metadata, and
//! rendering of SOAP request envelopes.

use crate::wsdl::{Operation, ServiceMetadata, SoapVersion};
use crate::Error;
use quick_xml::escape::escape;
use std::fmt::Write;

const SOAP11_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
const SOAP12_ENVELOPE_NS: &str = "http://www.w3.org/2003/05/soap-envelope";
const TOKEN_NS: &str = "Token";

/// Argument is the value of one operation argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// A simple value, rendered as element text.
    Scalar(String),
    /// A complex value: an ordered set of simple members.
    Struct(Vec<(String, String)>),
}

/// Payload is the ordered set of named arguments of one operation call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Payload(pub Vec<(String, Argument)>);

impl Payload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scalar(mut self, name: &str, value: impl ToString) -> Self {
        self.0
            .push((name.to_string(), Argument::Scalar(value.to_string())));
        self
    }

    pub fn wrapped<'a>(
        mut self,
        name: &str,
        members: impl IntoIterator<Item = (&'a str, String)>,
    ) -> Self {
        let members = members
            .into_iter()
            .map(|(member, value)| (member.to_string(), value))
            .collect();
        self.0.push((name.to_string(), Argument::Struct(members)));
        self
    }

    /// Argument names, for logging.
    pub fn shape(&self) -> String {
        self.0
            .iter()
            .map(|(name, arg)| match arg {
                Argument::Scalar(_) => name.clone(),
                Argument::Struct(members) => format!(
                    "{name}{{{}}}",
                    members
                        .iter()
                        .map(|(member, _)| member.as_str())
                        .collect::<Vec<_>>()
                        .join(",")
                ),
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Verify that `payload` fits the declared parameters of `operation`.
/// Operations and complex types without declarations accept any payload.
pub fn check(
    metadata: &ServiceMetadata,
    operation: &Operation,
    payload: &Payload,
) -> Result<(), Error> {
    let Some(parameters) = &operation.parameters else {
        return Ok(());
    };
    let reject = |detail: String| {
        Err(Error::Rejected {
            operation: operation.name.clone(),
            detail,
        })
    };

    for (name, arg) in &payload.0 {
        let Some(parameter) = parameters.iter().find(|p| &p.name == name) else {
            return reject(format!("unknown argument {name:?}"));
        };
        let members = parameter
            .type_name
            .as_deref()
            .and_then(|type_name| metadata.members(type_name));

        match (arg, members) {
            (Argument::Scalar(_), Some(_)) => {
                return reject(format!("argument {name:?} requires a complex value"));
            }
            (Argument::Struct(_), None) if is_builtin(parameter.type_name.as_deref()) => {
                return reject(format!("argument {name:?} requires a simple value"));
            }
            (Argument::Struct(fields), Some(members)) => {
                for (field, _) in fields {
                    if !members.iter().any(|m| &m.name == field) {
                        return reject(format!("argument {name:?} has no member {field:?}"));
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Render the request envelope of an `operation` call with `payload`,
/// carrying `token` as the authentication header.
pub fn render(
    metadata: &ServiceMetadata,
    operation: &Operation,
    payload: &Payload,
    token: &str,
) -> String {
    let envelope_ns = match metadata.version {
        SoapVersion::Soap11 => SOAP11_ENVELOPE_NS,
        SoapVersion::Soap12 => SOAP12_ENVELOPE_NS,
    };
    let mut w = String::new();

    // Writes to a String are infallible.
    let _ = write!(
        w,
        r#"<?xml version="1.0" encoding="utf-8"?><soap:Envelope xmlns:soap="{envelope_ns}">"#
    );
    let _ = write!(
        w,
        r#"<soap:Header><Token xmlns="{TOKEN_NS}">{}</Token></soap:Header>"#,
        escape(token)
    );
    let _ = write!(
        w,
        r#"<soap:Body><tns:{op} xmlns:tns="{ns}">"#,
        op = operation.name,
        ns = escape(&operation.namespace),
    );

    for (name, arg) in &payload.0 {
        match arg {
            Argument::Scalar(value) => {
                let _ = write!(w, "<tns:{name}>{}</tns:{name}>", escape(value));
            }
            Argument::Struct(members) => {
                let member_ns = member_namespace(metadata, operation, name)
                    .unwrap_or(operation.namespace.as_str());
                let _ = write!(w, r#"<tns:{name} xmlns:d="{}">"#, escape(member_ns));
                for (member, value) in members {
                    let _ = write!(w, "<d:{member}>{}</d:{member}>", escape(value));
                }
                let _ = write!(w, "</tns:{name}>");
            }
        }
    }

    let _ = write!(w, "</tns:{}></soap:Body></soap:Envelope>", operation.name);
    w
}

// Namespace of the complex type of argument `name`, which qualifies its members.
fn member_namespace<'m>(
    metadata: &'m ServiceMetadata,
    operation: &Operation,
    name: &str,
) -> Option<&'m str> {
    let type_name = operation
        .parameters
        .as_ref()?
        .iter()
        .find(|p| p.name == name)?
        .type_name
        .as_deref()?;

    metadata
        .types
        .get(type_name)
        .map(|ty| ty.namespace.as_str())
}

// Builtin XML Schema simple types which are commonly used as operation parameters.
fn is_builtin(type_name: Option<&str>) -> bool {
    matches!(
        type_name,
        Some(
            "string"
                | "int"
                | "long"
                | "short"
                | "decimal"
                | "double"
                | "float"
                | "boolean"
                | "dateTime"
                | "date"
                | "base64Binary"
        )
    )
}
