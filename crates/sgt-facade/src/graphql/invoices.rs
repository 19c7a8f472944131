use super::target;
use crate::models::{DadosNotaFiscal, NotaFiscalDetalhe};
use crate::normalize;
use crate::operations::{BuscarNotaFiscalPorChave, BuscarNotasFiscais};
use crate::service::{Outcome, ServiceClient};
use async_graphql::Context;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct InvoicesQuery;

#[async_graphql::Object]
impl InvoicesQuery {
    /// List a page of the invoices of a load.
    /// Returns an empty list if the load has no invoices,
    /// and null if they couldn't be fetched.
    pub async fn buscar_notas_fiscais(
        &self,
        ctx: &Context<'_>,
        protocolo: String,
        #[graphql(default = 0)] inicio: i32,
        #[graphql(default = 50)] limite: i32,
    ) -> async_graphql::Result<Option<Vec<DadosNotaFiscal>>> {
        let target = target(ctx)?;
        let client = ctx.data::<Arc<ServiceClient>>()?;

        let request = BuscarNotasFiscais {
            protocolo,
            inicio,
            limite,
        };
        let outcome = client
            .call(&target.wsdl_url, &request, &target.token)
            .await;

        let objeto = match outcome {
            Outcome::Found(objeto) => objeto,
            Outcome::Empty => return Ok(Some(Vec::new())),
            Outcome::Failed(reason) => {
                tracing::warn!(protocolo = %request.protocolo, %reason, "invoice listing failed");
                return Ok(None);
            }
        };

        match normalize::notas_fiscais(Some(&objeto), &request.protocolo) {
            Ok(notas) => Ok(Some(notas)),
            Err(err) => {
                tracing::error!(protocolo = %request.protocolo, error = %err, "failed to normalize invoices");
                Ok(None)
            }
        }
    }

    /// Fetch an invoice, including its XML document, by its access key.
    /// Returns null if the invoice doesn't exist or couldn't be fetched.
    pub async fn buscar_nota_fiscal(
        &self,
        ctx: &Context<'_>,
        chave: String,
    ) -> async_graphql::Result<Option<NotaFiscalDetalhe>> {
        let target = target(ctx)?;
        let client = ctx.data::<Arc<ServiceClient>>()?;

        let request = BuscarNotaFiscalPorChave { chave };
        let outcome = client
            .call(&target.wsdl_url, &request, &target.token)
            .await;

        let detalhe = match outcome {
            Outcome::Found(objeto) => normalize::nota_fiscal_detalhe(Some(&objeto)),
            Outcome::Empty => Ok(None),
            Outcome::Failed(reason) => {
                tracing::warn!(chave = %request.chave, %reason, "invoice lookup failed");
                return Ok(None);
            }
        };

        Ok(detalhe.unwrap_or_else(|err| {
            tracing::error!(chave = %request.chave, error = %err, "failed to normalize invoice");
            None
        }))
    }
}

#[cfg(test)]
mod test {
    use super::super::test::{execute, headers};
    use crate::service::testing::{response, FakeTransport};
    use serde_json::json;

    #[tokio::test]
    async fn test_empty_listing_differs_from_failure() {
        let empty = FakeTransport::responding(response("BuscarNotasFiscais", 0, json!(null)));
        let failed = FakeTransport::responding(response("BuscarNotasFiscais", 500, json!(null)));
        let query = r#"{ buscarNotasFiscais(protocolo: "42") { chave } }"#;

        assert_eq!(
            execute(&empty, headers(), query).await,
            json!({"data": {"buscarNotasFiscais": []}})
        );
        assert_eq!(
            execute(&failed, headers(), query).await,
            json!({"data": {"buscarNotasFiscais": null}})
        );
    }

    #[tokio::test]
    async fn test_listing_pages_are_forwarded() {
        let transport = FakeTransport::new(|operation, _| {
            Ok(response(
                operation,
                0,
                json!({"Itens": {"NotaFiscal": [{"Chave": "K1"}, {"Chave": "K2"}]}}),
            )
            .into())
        });

        let result = execute(
            &transport,
            headers(),
            r#"{ buscarNotasFiscais(protocolo: "42", inicio: 10, limite: 2) { protocolo chave } }"#,
        )
        .await;

        assert_eq!(
            result,
            json!({"data": {"buscarNotasFiscais": [
                {"protocolo": "42", "chave": "K1"},
                {"protocolo": "42", "chave": "K2"},
            ]}})
        );

        let calls = transport.calls();
        assert_eq!(calls[0].0, "BuscarNotasFiscais");
        assert_eq!(
            calls[0].1,
            soap::Payload::new()
                .scalar("protocolo", "42")
                .scalar("inicio", 10)
                .scalar("limite", 2)
        );
    }

    #[tokio::test]
    async fn test_invoice_detail() {
        let transport = FakeTransport::new(|operation, _| {
            Ok(response(
                operation,
                0,
                json!({"NotaFiscal": {
                    "Chave": "3524",
                    "Numero": "5501",
                    "Emitente": {"CPFCNPJ": "11", "RazaoSocial": "Origem LTDA"},
                    "XML": "<nfeProc versao=\"4.00\"/>",
                }}),
            )
            .into())
        });

        let result = execute(
            &transport,
            headers(),
            r#"{ buscarNotaFiscal(chave: "3524") { chave numero nomeEmitente xml } }"#,
        )
        .await;

        insta::assert_json_snapshot!(result, @r###"
        {
          "data": {
            "buscarNotaFiscal": {
              "chave": "3524",
              "numero": "5501",
              "nomeEmitente": "Origem LTDA",
              "xml": "<nfeProc versao=\"4.00\"/>"
            }
          }
        }
        "###);

        let missing = FakeTransport::responding(response("BuscarNotaFiscalPorChave", 0, json!({})));
        assert_eq!(
            execute(&missing, headers(), r#"{ buscarNotaFiscal(chave: "x") { chave } }"#).await,
            json!({"data": {"buscarNotaFiscal": null}})
        );
    }
}
