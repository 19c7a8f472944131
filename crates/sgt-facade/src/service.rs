use crate::cache::EndpointCache;
use crate::operations::OperationRequest;
use soap::{Payload, Step, Value};
use std::sync::Arc;

// Upper bound on the payload shapes tried for a single call.
pub const MAX_SHAPES: usize = 3;

/// Binding is a handle to a remote service, able to call its operations.
#[async_trait::async_trait]
pub trait Binding: Send + Sync {
    async fn call(
        &self,
        operation: &str,
        payload: &Payload,
        token: &str,
    ) -> Result<Value, soap::Error>;
}

/// Transport builds Bindings from service description URLs.
/// Binding is expensive: it fetches and parses remote metadata.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn bind(&self, wsdl_url: &str) -> Result<Arc<dyn Binding>, soap::Error>;
}

/// SoapTransport binds services over HTTP using their WSDL.
#[derive(Debug, Clone)]
pub struct SoapTransport {
    http: reqwest::Client,
}

impl SoapTransport {
    /// Build a SoapTransport whose requests time out after `timeout`.
    pub fn new(timeout: std::time::Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl Transport for SoapTransport {
    async fn bind(&self, wsdl_url: &str) -> Result<Arc<dyn Binding>, soap::Error> {
        let endpoint = soap::Endpoint::connect(self.http.clone(), wsdl_url).await?;
        Ok(Arc::new(endpoint))
    }
}

#[async_trait::async_trait]
impl Binding for soap::Endpoint {
    async fn call(
        &self,
        operation: &str,
        payload: &Payload,
        token: &str,
    ) -> Result<Value, soap::Error> {
        soap::Endpoint::call(self, operation, payload, token).await
    }
}

/// Outcome of a remote call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The call succeeded and returned data.
    Found(T),
    /// The call succeeded but returned no data.
    Empty,
    /// The call failed, for the given reason.
    Failed(String),
}

/// ServiceClient invokes SGT operations against caller-selected endpoints.
pub struct ServiceClient {
    transport: Arc<dyn Transport>,
    cache: EndpointCache,
}

impl ServiceClient {
    pub fn new(transport: Arc<dyn Transport>, cache_capacity: usize) -> Self {
        Self {
            transport,
            cache: EndpointCache::new(cache_capacity),
        }
    }

    pub fn cache(&self) -> &EndpointCache {
        &self.cache
    }

    /// Return the Binding of `wsdl_url`, binding it if it's not cached.
    pub async fn get_client(&self, wsdl_url: &str) -> Result<Arc<dyn Binding>, soap::Error> {
        self.cache.get_or_bind(wsdl_url, self.transport.as_ref()).await
    }

    /// Bind `wsdl_url` and invoke `request` against it.
    pub async fn call<R: OperationRequest>(
        &self,
        wsdl_url: &str,
        request: &R,
        token: &str,
    ) -> Outcome<Value> {
        match self.get_client(wsdl_url).await {
            Ok(binding) => self.invoke(binding.as_ref(), request, token).await,
            Err(err) => {
                let reason = format!("{:#}", anyhow::Error::new(err));
                tracing::warn!(wsdl_url, %reason, "failed to bind service");
                Outcome::Failed(reason)
            }
        }
    }

    /// Invoke `request` using `binding`, passing `token` as its authentication.
    ///
    /// Payload shapes are tried in order. A shape the service rejects as
    /// structurally invalid moves on to the next one; any other error fails
    /// the call. On success, the response's status envelope determines the
    /// Outcome.
    #[tracing::instrument(skip(self, binding, token), fields(operation = R::OPERATION))]
    pub async fn invoke<R: OperationRequest>(
        &self,
        binding: &dyn Binding,
        request: &R,
        token: &str,
    ) -> Outcome<Value> {
        let mut rejections = Vec::new();

        for build in R::SHAPES.iter().take(MAX_SHAPES) {
            let payload = build(request);

            match binding.call(R::OPERATION, &payload, token).await {
                Ok(response) => return classify(R::OPERATION, response),
                Err(soap::Error::Rejected { detail, .. }) => {
                    tracing::debug!(shape = %payload.shape(), %detail, "payload shape rejected");
                    rejections.push(format!("{}: {detail}", payload.shape()));
                }
                Err(err) => {
                    let reason = format!("{:#}", anyhow::Error::new(err));
                    tracing::warn!(%reason, "SOAP call failed");
                    return Outcome::Failed(reason);
                }
            }
        }

        let reason = format!(
            "{} rejected every payload shape ({})",
            R::OPERATION,
            rejections.join("; ")
        );
        tracing::warn!(%reason, "SOAP call failed");
        Outcome::Failed(reason)
    }
}

/// Classify an operation response by its status envelope,
/// `{CodigoMensagem, Mensagem, Objeto}`, which is found under
/// `{Operation}Response/{Operation}Result`.
pub fn classify(operation: &str, response: Value) -> Outcome<Value> {
    let response_key = Step::Key(format!("{operation}Response"));
    let result_key = Step::Key(format!("{operation}Result"));

    let envelope = response
        .at(&[response_key.clone(), result_key][..])
        .or_else(|| response.at(&[response_key][..]))
        .unwrap_or(&response);

    let code = match envelope.at("CodigoMensagem").map(Value::as_i64) {
        Some(Ok(Some(code))) => code,
        _ => return Outcome::Failed(format!("{operation} response has no status code")),
    };
    let message = envelope
        .at("Mensagem")
        .and_then(Value::as_text)
        .unwrap_or_default();

    if code != 0 {
        tracing::warn!(operation, code, %message, "SGT returned an error status");
        return Outcome::Failed(format!("{code} - {message}"));
    }

    match envelope.at("Objeto") {
        Some(objeto) if !objeto.is_empty() => Outcome::Found(objeto.clone()),
        _ => {
            tracing::info!(operation, %message, "SGT returned no data");
            Outcome::Empty
        }
    }
}
