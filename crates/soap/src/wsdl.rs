//! Service metadata extracted from WSDL and XML Schema documents.
//!
//! Only what's needed to address and shape document/literal calls is kept:
//! the SOAP address and version, each operation's action and top-level
//! parameters, and named complex types with their members.

use crate::Error;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

const WSDL_NS: &[u8] = b"http://schemas.xmlsoap.org/wsdl/";
const XSD_NS: &[u8] = b"http://www.w3.org/2001/XMLSchema";
const SOAP11_NS: &[u8] = b"http://schemas.xmlsoap.org/wsdl/soap/";
const SOAP12_NS: &[u8] = b"http://schemas.xmlsoap.org/wsdl/soap12/";

// Bound on the number of documents fetched while following imports.
const MAX_DOCUMENTS: usize = 16;
// Bound on complex type inheritance chains.
const MAX_BASE_DEPTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoapVersion {
    Soap11,
    Soap12,
}

/// A declared element of an operation message or complex type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    /// Local name of the declared type, if any.
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub name: String,
    /// Namespace of the operation's request element.
    pub namespace: String,
    pub action: Option<String>,
    /// Top-level parameters of the request element,
    /// or None if the request element wasn't declared.
    pub parameters: Option<Vec<Parameter>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexType {
    pub namespace: String,
    pub base: Option<String>,
    pub members: Vec<Parameter>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceMetadata {
    pub target_namespace: String,
    pub address: url::Url,
    pub version: SoapVersion,
    pub operations: BTreeMap<String, Operation>,
    pub types: HashMap<String, ComplexType>,
}

impl ServiceMetadata {
    /// Fetch the WSDL at `wsdl_url`, and all WSDL and schema documents it
    /// transitively imports, and build ServiceMetadata.
    #[tracing::instrument(skip(http), err(level = tracing::Level::WARN))]
    pub async fn fetch(http: &reqwest::Client, wsdl_url: &url::Url) -> Result<Self, Error> {
        let mut builder = Builder::default();
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([wsdl_url.clone()]);

        while let Some(url) = queue.pop_front() {
            if !visited.insert(url.clone()) {
                continue;
            }
            if visited.len() > MAX_DOCUMENTS {
                return Err(Error::Metadata(format!(
                    "{wsdl_url} imports more than {MAX_DOCUMENTS} documents"
                )));
            }

            let response = http.get(url.clone()).send().await?;
            let status = response.status();
            let body = response.text().await?;

            if !status.is_success() {
                return Err(Error::Status {
                    status: status.as_u16(),
                    body,
                });
            }
            tracing::debug!(%url, bytes = body.len(), "fetched service description");

            for location in builder.parse(&body)? {
                queue.push_back(url.join(&location)?);
            }
        }

        builder.finish()
    }

    /// Build ServiceMetadata from a single self-contained WSDL document.
    pub fn parse(wsdl: &str) -> Result<Self, Error> {
        let mut builder = Builder::default();
        builder.parse(wsdl)?;
        builder.finish()
    }

    /// Members of the named complex type, including those of its base types.
    /// Returns None if the type is unknown.
    pub fn members(&self, type_name: &str) -> Option<Vec<&Parameter>> {
        let mut ty = self.types.get(type_name)?;
        let mut chain = vec![ty];

        while let Some(base) = &ty.base {
            match self.types.get(base) {
                Some(next) if chain.len() < MAX_BASE_DEPTH => {
                    chain.push(next);
                    ty = next;
                }
                _ => break,
            }
        }
        // Base type members precede those of derived types.
        Some(chain.iter().rev().flat_map(|ty| ty.members.iter()).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Ns {
    Wsdl,
    Xsd,
    Soap(SoapVersion),
    Other,
}

#[derive(Debug)]
enum OwnerKind {
    Element { type_ref: Option<String> },
    Type { base: Option<String> },
}

// Owner is a top-level schema element or complex type whose members are being collected.
#[derive(Debug)]
struct Owner {
    kind: OwnerKind,
    name: String,
    depth: usize,
    members: Vec<Parameter>,
}

#[derive(Debug, Default)]
struct ElementDecl {
    namespace: String,
    type_ref: Option<String>,
    members: Vec<Parameter>,
}

#[derive(Default)]
struct Builder {
    target_namespace: Option<String>,
    addresses: Vec<(SoapVersion, String)>,
    actions: HashMap<String, String>,
    operations: BTreeSet<String>,
    elements: HashMap<String, ElementDecl>,
    types: HashMap<String, ComplexType>,

    // Parse state of the current document.
    stack: Vec<(Ns, String)>,
    schema_ns: Option<String>,
    owner: Option<Owner>,
    binding_operation: Option<String>,
}

impl Builder {
    // Parse a document, returning the locations of the documents it imports.
    fn parse(&mut self, xml: &str) -> Result<Vec<String>, Error> {
        let mut reader = quick_xml::NsReader::from_str(xml);
        let mut imports = Vec::new();

        self.stack.clear();
        self.schema_ns = None;
        self.owner = None;
        self.binding_operation = None;

        loop {
            match reader.read_resolved_event()? {
                (ns, Event::Start(start)) => {
                    self.open(resolve(ns), &start, &mut imports)?;
                }
                (ns, Event::Empty(start)) => {
                    self.open(resolve(ns), &start, &mut imports)?;
                    self.close();
                }
                (_, Event::End(_)) => self.close(),
                (_, Event::Eof) => break,
                _ => {}
            }
        }
        Ok(imports)
    }

    fn open(
        &mut self,
        ns: Ns,
        start: &BytesStart,
        imports: &mut Vec<String>,
    ) -> Result<(), Error> {
        let name = std::str::from_utf8(start.local_name().as_ref())
            .map_err(|err| Error::Malformed(format!("element name is not UTF-8: {err}")))?
            .to_string();
        let depth = self.stack.len();
        let parent = self.stack.last().map(|(ns, name)| (*ns, name.as_str()));

        match (ns, name.as_str(), parent) {
            (Ns::Wsdl, "definitions", _) => {
                if let Some(target) = attr(start, b"targetNamespace")? {
                    self.target_namespace.get_or_insert(target);
                }
            }
            (Ns::Wsdl, "import", _) => imports.extend(attr(start, b"location")?),
            (Ns::Xsd, "import" | "include", _) => {
                imports.extend(attr(start, b"schemaLocation")?)
            }
            (Ns::Xsd, "schema", _) => {
                self.schema_ns = Some(attr(start, b"targetNamespace")?.unwrap_or_default());
            }
            (Ns::Xsd, "element", Some((Ns::Xsd, "schema"))) => {
                if let Some(element) = attr(start, b"name")? {
                    self.owner = Some(Owner {
                        kind: OwnerKind::Element {
                            type_ref: attr(start, b"type")?.map(local),
                        },
                        name: element,
                        depth,
                        members: Vec::new(),
                    });
                }
            }
            (Ns::Xsd, "complexType", Some((Ns::Xsd, "schema"))) => {
                if let Some(ty) = attr(start, b"name")? {
                    self.owner = Some(Owner {
                        kind: OwnerKind::Type { base: None },
                        name: ty,
                        depth,
                        members: Vec::new(),
                    });
                }
            }
            (Ns::Xsd, "extension", _) => {
                if let Some(Owner {
                    kind: OwnerKind::Type { base },
                    ..
                }) = &mut self.owner
                {
                    *base = attr(start, b"base")?.map(local);
                }
            }
            (Ns::Xsd, "element", Some((Ns::Xsd, "sequence" | "all" | "choice"))) => {
                let member = match attr(start, b"name")? {
                    Some(member) => Some(member),
                    None => attr(start, b"ref")?.map(local),
                };
                if let (Some(owner), Some(member)) = (&mut self.owner, member) {
                    // Skip members of anonymous types nested within members.
                    if depth <= owner.depth + 4 {
                        owner.members.push(Parameter {
                            name: member,
                            type_name: attr(start, b"type")?.map(local),
                        });
                    }
                }
            }
            (Ns::Wsdl, "operation", Some((Ns::Wsdl, "binding"))) => {
                let operation = attr(start, b"name")?;
                self.operations.extend(operation.clone());
                self.binding_operation = operation;
            }
            (Ns::Wsdl, "operation", Some((Ns::Wsdl, "portType"))) => {
                self.operations.extend(attr(start, b"name")?);
            }
            (Ns::Soap(_), "operation", _) => {
                if let (Some(operation), Some(action)) =
                    (&self.binding_operation, attr(start, b"soapAction")?)
                {
                    self.actions.entry(operation.clone()).or_insert(action);
                }
            }
            (Ns::Soap(version), "address", Some((Ns::Wsdl, "port"))) => {
                if let Some(location) = attr(start, b"location")? {
                    self.addresses.push((version, location));
                }
            }
            _ => {}
        }

        self.stack.push((ns, name));
        Ok(())
    }

    fn close(&mut self) {
        let Some((ns, name)) = self.stack.pop() else {
            return;
        };
        let depth = self.stack.len();

        match (ns, name.as_str()) {
            (Ns::Xsd, "schema") => self.schema_ns = None,
            (Ns::Wsdl, "operation") => self.binding_operation = None,
            (Ns::Xsd, "element" | "complexType") => {
                if !matches!(&self.owner, Some(owner) if owner.depth == depth) {
                    return;
                }
                let Some(Owner {
                    kind,
                    name,
                    members,
                    ..
                }) = self.owner.take()
                else {
                    return;
                };
                let namespace = self.schema_ns.clone().unwrap_or_default();

                match kind {
                    OwnerKind::Element { type_ref } => {
                        self.elements.insert(
                            name,
                            ElementDecl {
                                namespace,
                                type_ref,
                                members,
                            },
                        );
                    }
                    OwnerKind::Type { base } => {
                        self.types.insert(
                            name,
                            ComplexType {
                                namespace,
                                base,
                                members,
                            },
                        );
                    }
                }
            }
            _ => {}
        }
    }

    fn finish(self) -> Result<ServiceMetadata, Error> {
        let Builder {
            target_namespace,
            addresses,
            mut actions,
            operations,
            mut elements,
            types,
            ..
        } = self;

        let target_namespace = target_namespace
            .ok_or_else(|| Error::Metadata("document is not a WSDL definition".to_string()))?;

        // Prefer a SOAP 1.1 port where both are offered.
        let (version, address) = addresses
            .iter()
            .find(|(version, _)| *version == SoapVersion::Soap11)
            .or_else(|| addresses.first())
            .cloned()
            .ok_or_else(|| Error::Metadata("WSDL declares no SOAP port address".to_string()))?;
        let address = url::Url::parse(&address)?;

        let mut metadata = ServiceMetadata {
            target_namespace,
            address,
            version,
            operations: BTreeMap::new(),
            types,
        };

        for name in operations {
            let (namespace, parameters) = match elements.remove(&name) {
                Some(ElementDecl {
                    namespace,
                    type_ref: Some(type_ref),
                    ..
                }) => {
                    let parameters = metadata
                        .members(&type_ref)
                        .map(|members| members.into_iter().cloned().collect());
                    (namespace, parameters)
                }
                Some(ElementDecl {
                    namespace, members, ..
                }) => (namespace, Some(members)),
                None => (metadata.target_namespace.clone(), None),
            };

            let operation = Operation {
                action: actions.remove(&name),
                name: name.clone(),
                namespace,
                parameters,
            };
            metadata.operations.insert(name, operation);
        }

        Ok(metadata)
    }
}

fn resolve(ns: ResolveResult) -> Ns {
    match ns {
        ResolveResult::Bound(Namespace(WSDL_NS)) => Ns::Wsdl,
        ResolveResult::Bound(Namespace(XSD_NS)) => Ns::Xsd,
        ResolveResult::Bound(Namespace(SOAP11_NS)) => Ns::Soap(SoapVersion::Soap11),
        ResolveResult::Bound(Namespace(SOAP12_NS)) => Ns::Soap(SoapVersion::Soap12),
        _ => Ns::Other,
    }
}

fn attr(start: &BytesStart, key: &[u8]) -> Result<Option<String>, Error> {
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.local_name().as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

// Local part of a qualified name, like "q1:protocoloIntegracaoCarga".
fn local(qname: String) -> String {
    match qname.rsplit_once(':') {
        Some((_, local)) => local.to_string(),
        None => qname,
    }
}
