//! A minimal document/literal SOAP client, bound dynamically from WSDL.
//!
//! An [`Endpoint`] is built once from a service description and then used
//! to call any of its operations with a [`Payload`] of arguments. Responses
//! are decoded into [`Value`] trees without reference to the service schema.

pub mod decode;
pub mod envelope;
pub mod value;
pub mod wsdl;

pub use envelope::{Argument, Payload};
pub use value::{Path, Step, Value};
pub use wsdl::{ServiceMetadata, SoapVersion};

/// Error of a SOAP call or of binding to a service description.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),
    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to parse XML")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed document: {0}")]
    Malformed(String),
    #[error("invalid URL")]
    InvalidUrl(#[from] url::ParseError),
    #[error("invalid service description: {0}")]
    Metadata(String),
    #[error("service has no operation {0:?}")]
    UnknownOperation(String),
    /// The request didn't fit the shape the service declares for the operation.
    #[error("{operation} rejected the request: {detail}")]
    Rejected { operation: String, detail: String },
    #[error("SOAP fault {code}: {message}")]
    Fault { code: String, message: String },
}

/// Endpoint is a service bound from its WSDL, ready to be called.
#[derive(Debug, Clone)]
pub struct Endpoint {
    http: reqwest::Client,
    metadata: ServiceMetadata,
}

impl Endpoint {
    /// Fetch and parse the service description at `wsdl_url`.
    pub async fn connect(http: reqwest::Client, wsdl_url: &str) -> Result<Self, Error> {
        let wsdl_url = url::Url::parse(wsdl_url)?;
        let metadata = ServiceMetadata::fetch(&http, &wsdl_url).await?;

        tracing::info!(
            %wsdl_url,
            address = %metadata.address,
            operations = metadata.operations.len(),
            "bound SOAP service"
        );
        Ok(Self { http, metadata })
    }

    /// Call `operation` with `payload`, passing `token` in the SOAP header.
    /// Returns the response element, keyed by its name
    /// (for example `{"BuscarCargaResponse": {...}}`).
    #[tracing::instrument(
        skip(self, payload, token),
        fields(address = %self.metadata.address, shape = %payload.shape()),
        err(level = tracing::Level::DEBUG),
    )]
    pub async fn call(
        &self,
        operation: &str,
        payload: &Payload,
        token: &str,
    ) -> Result<Value, Error> {
        let Some(op) = self.metadata.operations.get(operation) else {
            return Err(Error::UnknownOperation(operation.to_string()));
        };
        envelope::check(&self.metadata, op, payload)?;

        let body = envelope::render(&self.metadata, op, payload, token);
        let action = op.action.clone().unwrap_or_default();

        let builder = self.http.post(self.metadata.address.clone());
        let builder = match self.metadata.version {
            SoapVersion::Soap11 => builder
                .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=utf-8")
                .header("SOAPAction", format!("\"{action}\"")),
            SoapVersion::Soap12 => builder.header(
                reqwest::header::CONTENT_TYPE,
                format!("application/soap+xml; charset=utf-8; action=\"{action}\""),
            ),
        };

        let response = builder.body(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        // Faults are returned with error statuses, so decode regardless of status.
        match decode::envelope(&text) {
            Ok(decode::Body::Response(value)) => Ok(value),
            Ok(decode::Body::Fault(fault)) if fault.is_rejection() => Err(Error::Rejected {
                operation: operation.to_string(),
                detail: format!("{}: {}", fault.code, fault.message),
            }),
            Ok(decode::Body::Fault(decode::Fault { code, message })) => {
                Err(Error::Fault { code, message })
            }
            Err(_) if !status.is_success() => Err(Error::Status {
                status: status.as_u16(),
                body: text,
            }),
            Err(err) => Err(err),
        }
    }
}
