//! GraphQL API
//!
//! Every query reads the target service and its token from the request
//! headers, which [`graphql_handler`] copies into the request data.
mod invoices;
mod loads;

use crate::service::ServiceClient;
use async_graphql::{EmptyMutation, EmptySubscription, ErrorExtensions, Schema};
use axum::http::HeaderMap;
use std::sync::Arc;

// This type represents the complete graphql schema.
pub type GraphQLSchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

pub const TARGET_WSDL_HEADER: &str = "x-target-wsdl";
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

// Read-only queries, composed from the modules here.
#[derive(Debug, Default, async_graphql::MergedObject)]
pub struct QueryRoot(loads::LoadsQuery, invoices::InvoicesQuery);

pub fn create_schema(client: Arc<ServiceClient>) -> GraphQLSchema {
    Schema::build(QueryRoot::default(), EmptyMutation, EmptySubscription)
        .data(client)
        .finish()
}

/// Returns the GraphQL SDL (Schema Definition Language) as a string.
pub fn schema_sdl() -> String {
    Schema::build(QueryRoot::default(), EmptyMutation, EmptySubscription)
        .finish()
        .sdl()
}

/// TargetHeaders are the caller-supplied headers selecting the SGT service
/// to call, and the token to call it with.
#[derive(Debug, Clone, Default)]
pub struct TargetHeaders {
    pub wsdl_url: Option<String>,
    pub token: Option<String>,
}

/// Target is a validated pair of TargetHeaders.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub wsdl_url: String,
    pub token: String,
}

#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    #[error("missing required header X-Target-WSDL")]
    MissingTargetWsdl,
    #[error("missing required header X-Auth-Token")]
    MissingAuthToken,
}

impl TargetHeaders {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(|value| value.trim().to_string())
        };
        Self {
            wsdl_url: read(TARGET_WSDL_HEADER),
            token: read(AUTH_TOKEN_HEADER),
        }
    }

    /// Require that both headers are present and non-blank.
    pub fn require(&self) -> Result<Target, HeaderError> {
        let present = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        let wsdl_url = present(&self.wsdl_url).ok_or(HeaderError::MissingTargetWsdl)?;
        let token = present(&self.token).ok_or(HeaderError::MissingAuthToken)?;

        Ok(Target { wsdl_url, token })
    }
}

// A plain function rather than `From`, which async-graphql already implements
// for every `Display` error.
fn bad_request(err: HeaderError) -> async_graphql::Error {
    let mut gql = async_graphql::Error::new(err.to_string()).extend_with(|_, ext| {
        ext.set("code", "BAD_REQUEST");
        ext.set("status", 400);
    });
    gql.source = Some(Arc::new(err));
    gql
}

// Target of the current request, or an error if its headers are incomplete.
fn target(ctx: &async_graphql::Context<'_>) -> async_graphql::Result<Target> {
    match ctx.data_opt::<TargetHeaders>() {
        Some(headers) => headers.require(),
        None => Err(HeaderError::MissingTargetWsdl),
    }
    .map_err(bad_request)
}

pub(crate) async fn graphql_handler(
    schema: axum::Extension<GraphQLSchema>,
    headers: HeaderMap,
    req: axum::extract::Json<async_graphql::Request>,
) -> axum::Json<async_graphql::Response> {
    let request = req.0.data(TargetHeaders::from_headers(&headers));

    let response = schema.execute(request).await;
    axum::Json(response)
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::service::testing::{response, FakeTransport};
    use serde_json::json;

    pub const WSDL_URL: &str = "http://sgt.example.com/SGT.WebService/Cargas.svc?wsdl";

    pub fn headers() -> TargetHeaders {
        TargetHeaders {
            wsdl_url: Some(WSDL_URL.to_string()),
            token: Some("s3cret".to_string()),
        }
    }

    pub async fn execute(
        transport: &FakeTransport,
        headers: TargetHeaders,
        query: &str,
    ) -> serde_json::Value {
        let client = Arc::new(ServiceClient::new(Arc::new(transport.clone()), 10));
        let schema = create_schema(client);

        let response = schema
            .execute(async_graphql::Request::new(query).data(headers))
            .await;
        serde_json::to_value(&response).unwrap()
    }

    #[test]
    fn test_header_validation() {
        let mut map = HeaderMap::new();
        map.insert("X-Target-WSDL", " http://sgt/x.svc?wsdl ".parse().unwrap());
        map.insert("x-auth-token", "tok".parse().unwrap());

        assert_eq!(
            TargetHeaders::from_headers(&map).require().unwrap(),
            Target {
                wsdl_url: "http://sgt/x.svc?wsdl".to_string(),
                token: "tok".to_string(),
            }
        );

        let blank_token = TargetHeaders {
            wsdl_url: Some("http://sgt/x.svc?wsdl".to_string()),
            token: Some("  ".to_string()),
        };
        assert!(matches!(
            blank_token.require(),
            Err(HeaderError::MissingAuthToken)
        ));
        assert!(matches!(
            TargetHeaders::default().require(),
            Err(HeaderError::MissingTargetWsdl)
        ));
    }

    #[tokio::test]
    async fn test_missing_headers_are_bad_requests() {
        let transport = FakeTransport::responding(json!({}));

        for headers in [
            TargetHeaders::default(),
            TargetHeaders {
                token: None,
                ..headers()
            },
        ] {
            let result = execute(
                &transport,
                headers,
                r#"{ buscarCarga(protocolo: "1") { numeroCarga } }"#,
            )
            .await;

            assert_eq!(result["data"], json!({"buscarCarga": null}));
            assert_eq!(
                result["errors"][0]["extensions"],
                json!({"code": "BAD_REQUEST", "status": 400})
            );
            assert_eq!(result["errors"][0]["path"], json!(["buscarCarga"]));
        }
        // No remote call was attempted.
        assert!(transport.binds().is_empty());
    }

    #[tokio::test]
    async fn test_sibling_fields_are_independent() {
        let transport = FakeTransport::new(|operation, _| match operation {
            "BuscarCarga" => Err(soap::Error::Fault {
                code: "s:Server".to_string(),
                message: "Erro interno".to_string(),
            }),
            _ => Ok(response(
                operation,
                0,
                json!({"Itens": {"NotaFiscal": {"Chave": "K1", "ValorTotal": "10.5"}}}),
            )
            .into()),
        });

        let result = execute(
            &transport,
            headers(),
            r#"{
                buscarCarga(protocolo: "1") { numeroCarga }
                buscarNotasFiscais(protocolo: "1") { protocolo chave valorTotal }
            }"#,
        )
        .await;

        insta::assert_json_snapshot!(result, @r###"
        {
          "data": {
            "buscarCarga": null,
            "buscarNotasFiscais": [
              {
                "protocolo": "1",
                "chave": "K1",
                "valorTotal": 10.5
              }
            ]
          }
        }
        "###);
        // Both fields share one binding of the service.
        assert_eq!(transport.binds(), vec![WSDL_URL.to_string()]);
    }

    #[test]
    fn test_schema_sdl() {
        let sdl = schema_sdl();

        for (field, returns) in [
            ("buscarCarga(", "): Carregamento"),
            ("buscarCargaPorCodigosIntegracao(", "): Carregamento"),
            ("buscarNotasFiscais(", "): [DadosNotaFiscal!]"),
            ("buscarNotaFiscal(", "): NotaFiscalDetalhe"),
        ] {
            assert!(
                sdl.lines()
                    .map(str::trim)
                    .any(|line| line.starts_with(field) && line.ends_with(returns)),
                "missing {field}{returns} in:\n{sdl}"
            );
        }
        assert!(sdl.contains("metroCubico: Float"));
        assert!(sdl.contains("tipoVeiculo: String!"));
    }
}
