use super::target;
use crate::models::Carregamento;
use crate::normalize;
use crate::operations::{BuscarCarga, BuscarCargaPorCodigosIntegracao, OperationRequest};
use crate::service::{Outcome, ServiceClient};
use async_graphql::Context;
use soap::Value;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct LoadsQuery;

#[async_graphql::Object]
impl LoadsQuery {
    /// Look up a load by its integration protocol.
    /// Returns null if the load doesn't exist or couldn't be fetched.
    pub async fn buscar_carga(
        &self,
        ctx: &Context<'_>,
        protocolo: String,
    ) -> async_graphql::Result<Option<Carregamento>> {
        let request = BuscarCarga { protocolo };
        fetch(ctx, &request).await
    }

    /// Look up a load by the integration code of its branch and its load number.
    /// Returns null if the load doesn't exist or couldn't be fetched.
    pub async fn buscar_carga_por_codigos_integracao(
        &self,
        ctx: &Context<'_>,
        codigo_filial: String,
        numero_carga: String,
    ) -> async_graphql::Result<Option<Carregamento>> {
        let request = BuscarCargaPorCodigosIntegracao {
            codigo_filial,
            numero_carga,
        };
        fetch(ctx, &request).await
    }
}

async fn fetch<R: OperationRequest>(
    ctx: &Context<'_>,
    request: &R,
) -> async_graphql::Result<Option<Carregamento>> {
    let target = target(ctx)?;
    let client = ctx.data::<Arc<ServiceClient>>()?;

    let outcome = client
        .call(&target.wsdl_url, request, &target.token)
        .await;

    Ok(fold(R::OPERATION, outcome))
}

// Fold the load records of an outcome, collapsing failures to None.
fn fold(operation: &str, outcome: Outcome<Value>) -> Option<Carregamento> {
    let objeto = match outcome {
        Outcome::Found(objeto) => objeto,
        Outcome::Empty => return None,
        Outcome::Failed(reason) => {
            tracing::warn!(operation, %reason, "load lookup failed");
            return None;
        }
    };

    match normalize::carregamento(&normalize::cargas(&objeto)) {
        Ok(carga) => carga,
        Err(err) => {
            tracing::error!(operation, error = %err, "failed to normalize load records");
            None
        }
    }
}
