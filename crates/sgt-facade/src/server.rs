use crate::graphql::{self, AUTH_TOKEN_HEADER, TARGET_WSDL_HEADER};
use crate::service::ServiceClient;
use anyhow::Context;
use axum::routing::{get, post};
use std::sync::Arc;

/// Build the facade's router. An empty `allow_origin` allows any origin.
pub fn build_router(
    client: Arc<ServiceClient>,
    allow_origin: &[String],
) -> anyhow::Result<axum::Router<()>> {
    let allow_origin = if allow_origin.is_empty() {
        tower_http::cors::AllowOrigin::any()
    } else {
        let origins = allow_origin
            .iter()
            .map(|o| o.parse())
            .collect::<Result<Vec<_>, _>>()
            .context("failed to parse allowed origins")?;
        tower_http::cors::AllowOrigin::list(origins)
    };

    let allow_headers = [
        axum::http::header::CONTENT_TYPE,
        axum::http::header::ACCEPT,
        axum::http::HeaderName::from_static(TARGET_WSDL_HEADER),
        axum::http::HeaderName::from_static(AUTH_TOKEN_HEADER),
    ];

    let cors = tower_http::cors::CorsLayer::new()
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_origin(allow_origin)
        .allow_headers(allow_headers);

    let schema = graphql::create_schema(client);

    let router = axum::Router::new()
        .route("/", get(status))
        .route("/graphql", post(graphql::graphql_handler))
        .route("/graphql/sdl", get(sdl))
        .layer(axum::Extension(schema))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .on_failure(tower_http::trace::DefaultOnFailure::new().level(tracing::Level::INFO)),
        )
        .layer(cors);

    Ok(router)
}

async fn status() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "online",
        "message": "SGT GraphQL facade",
        "endpoints": {
            "graphql": "POST /graphql",
            "sdl": "GET /graphql/sdl",
        },
        "headers": ["X-Target-WSDL", "X-Auth-Token"],
    }))
}

async fn sdl() -> String {
    graphql::schema_sdl()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::service::testing::{response, FakeTransport};
    use axum::{
        body::Body,
        http::{self, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn router(transport: &FakeTransport) -> axum::Router {
        let client = Arc::new(ServiceClient::new(Arc::new(transport.clone()), 10));
        build_router(client, &[]).unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn graphql_request(query: &str, headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/graphql")
            .header(http::header::CONTENT_TYPE, "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder
            .body(Body::from(json!({ "query": query }).to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_headers_reach_resolvers() {
        let transport = FakeTransport::new(|operation, _| {
            Ok(response(operation, 0, json!({"CargaIntegracao": {"NumeroCarga": "77"}})).into())
        });

        let resp = router(&transport)
            .oneshot(graphql_request(
                r#"{ buscarCarga(protocolo: "1") { numeroCarga } }"#,
                &[
                    ("X-Target-WSDL", "http://sgt/Cargas.svc?wsdl"),
                    ("X-Auth-Token", "tok"),
                ],
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp).await,
            json!({"data": {"buscarCarga": {"numeroCarga": "77"}}})
        );
        assert_eq!(transport.binds(), vec!["http://sgt/Cargas.svc?wsdl"]);
        assert_eq!(transport.calls()[0].2, "tok");
    }

    #[tokio::test]
    async fn test_missing_token_is_a_bad_request() {
        let transport = FakeTransport::responding(json!({}));

        let resp = router(&transport)
            .oneshot(graphql_request(
                r#"{ buscarCarga(protocolo: "1") { numeroCarga } }"#,
                &[("X-Target-WSDL", "http://sgt/Cargas.svc?wsdl")],
            ))
            .await
            .unwrap();

        let json = body_json(resp).await;
        assert_eq!(
            json["errors"][0]["message"],
            "missing required header X-Auth-Token"
        );
        assert_eq!(json["errors"][0]["extensions"]["code"], "BAD_REQUEST");
        assert!(transport.binds().is_empty());
    }

    #[tokio::test]
    async fn test_status_and_sdl_routes() {
        let transport = FakeTransport::responding(json!({}));

        let resp = router(&transport)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "online");

        let resp = router(&transport)
            .oneshot(Request::get("/graphql/sdl").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(String::from_utf8_lossy(&body).contains("type Carregamento"));
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_target_headers() {
        let transport = FakeTransport::responding(json!({}));

        let resp = router(&transport)
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/graphql")
                    .header(http::header::ORIGIN, "https://app.example.com")
                    .header(http::header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .header(
                        http::header::ACCESS_CONTROL_REQUEST_HEADERS,
                        "x-target-wsdl,x-auth-token",
                    )
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let headers = resp.headers();
        assert_eq!(headers[http::header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let allowed = headers[http::header::ACCESS_CONTROL_ALLOW_HEADERS]
            .to_str()
            .unwrap();
        assert!(allowed.contains("x-target-wsdl"));
        assert!(allowed.contains("x-auth-token"));
    }

    #[test]
    fn test_invalid_origins_are_errors() {
        let transport = FakeTransport::responding(json!({}));
        let client = Arc::new(ServiceClient::new(Arc::new(transport), 10));
        assert!(build_router(client, &["bad\norigin".to_string()]).is_err());
    }
}
