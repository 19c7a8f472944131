//! Typed requests of the SGT operations used by the facade.
//!
//! SGT deployments don't agree on how operation arguments are wrapped or
//! cased, so each request offers an ordered list of payload shapes. The
//! service client tries them in order until one is accepted.

use soap::Payload;

/// OperationRequest is a typed request of one remote operation.
pub trait OperationRequest: std::fmt::Debug + Sync + 'static {
    /// Name of the remote operation.
    const OPERATION: &'static str;
    /// Builders of candidate payloads, most likely shape first.
    const SHAPES: &'static [fn(&Self) -> Payload];
}

/// Look up a load by its integration protocol.
#[derive(Debug, Clone, PartialEq)]
pub struct BuscarCarga {
    pub protocolo: String,
}

impl BuscarCarga {
    fn wrapped(&self) -> Payload {
        Payload::new().wrapped(
            "protocolo",
            [("protocoloIntegracaoCarga", self.protocolo.clone())],
        )
    }

    fn wrapped_pascal(&self) -> Payload {
        Payload::new().wrapped(
            "protocolo",
            [("ProtocoloIntegracaoCarga", self.protocolo.clone())],
        )
    }

    fn flat(&self) -> Payload {
        Payload::new().scalar("protocolo", &self.protocolo)
    }
}

impl OperationRequest for BuscarCarga {
    const OPERATION: &'static str = "BuscarCarga";
    const SHAPES: &'static [fn(&Self) -> Payload] =
        &[Self::wrapped, Self::wrapped_pascal, Self::flat];
}

/// Look up a load by branch integration code and load number.
#[derive(Debug, Clone, PartialEq)]
pub struct BuscarCargaPorCodigosIntegracao {
    pub codigo_filial: String,
    pub numero_carga: String,
}

impl BuscarCargaPorCodigosIntegracao {
    fn wrapped(&self) -> Payload {
        Payload::new().wrapped(
            "codigosIntegracao",
            [
                ("CodigoIntegracaoFilial", self.codigo_filial.clone()),
                ("NumeroCarga", self.numero_carga.clone()),
            ],
        )
    }

    fn wrapped_camel(&self) -> Payload {
        Payload::new().wrapped(
            "codigosIntegracao",
            [
                ("codigoIntegracaoFilial", self.codigo_filial.clone()),
                ("numeroCarga", self.numero_carga.clone()),
            ],
        )
    }

    fn flat(&self) -> Payload {
        Payload::new()
            .scalar("codigoIntegracaoFilial", &self.codigo_filial)
            .scalar("numeroCarga", &self.numero_carga)
    }
}

impl OperationRequest for BuscarCargaPorCodigosIntegracao {
    const OPERATION: &'static str = "BuscarCargaPorCodigosIntegracao";
    const SHAPES: &'static [fn(&Self) -> Payload] =
        &[Self::wrapped, Self::wrapped_camel, Self::flat];
}

/// List a page of the invoices of a load protocol.
#[derive(Debug, Clone, PartialEq)]
pub struct BuscarNotasFiscais {
    pub protocolo: String,
    pub inicio: i32,
    pub limite: i32,
}

impl BuscarNotasFiscais {
    fn flat(&self) -> Payload {
        Payload::new()
            .scalar("protocolo", &self.protocolo)
            .scalar("inicio", self.inicio)
            .scalar("limite", self.limite)
    }

    fn wrapped(&self) -> Payload {
        Payload::new()
            .wrapped(
                "protocolo",
                [("protocoloIntegracaoCarga", self.protocolo.clone())],
            )
            .scalar("inicio", self.inicio)
            .scalar("limite", self.limite)
    }
}

impl OperationRequest for BuscarNotasFiscais {
    const OPERATION: &'static str = "BuscarNotasFiscais";
    const SHAPES: &'static [fn(&Self) -> Payload] = &[Self::flat, Self::wrapped];
}

/// Fetch one invoice, including its document, by access key.
#[derive(Debug, Clone, PartialEq)]
pub struct BuscarNotaFiscalPorChave {
    pub chave: String,
}

impl BuscarNotaFiscalPorChave {
    fn flat(&self) -> Payload {
        Payload::new().scalar("chave", &self.chave)
    }

    fn flat_acesso(&self) -> Payload {
        Payload::new().scalar("chaveAcesso", &self.chave)
    }
}

impl OperationRequest for BuscarNotaFiscalPorChave {
    const OPERATION: &'static str = "BuscarNotaFiscalPorChave";
    const SHAPES: &'static [fn(&Self) -> Payload] = &[Self::flat, Self::flat_acesso];
}

#[cfg(test)]
mod test {
    use super::*;

    fn shapes<R: OperationRequest>(request: &R) -> Vec<String> {
        R::SHAPES
            .iter()
            .map(|build| build(request).shape())
            .collect()
    }

    #[test]
    fn test_shapes_are_ordered_most_likely_first() {
        insta::assert_debug_snapshot!(shapes(&BuscarCarga { protocolo: "6482243".to_string() }), @r###"
        [
            "protocolo{protocoloIntegracaoCarga}",
            "protocolo{ProtocoloIntegracaoCarga}",
            "protocolo",
        ]
        "###);

        insta::assert_debug_snapshot!(shapes(&BuscarCargaPorCodigosIntegracao {
            codigo_filial: "01".to_string(),
            numero_carga: "123".to_string(),
        }), @r###"
        [
            "codigosIntegracao{CodigoIntegracaoFilial,NumeroCarga}",
            "codigosIntegracao{codigoIntegracaoFilial,numeroCarga}",
            "codigoIntegracaoFilial,numeroCarga",
        ]
        "###);

        insta::assert_debug_snapshot!(shapes(&BuscarNotasFiscais {
            protocolo: "42".to_string(),
            inicio: 0,
            limite: 50,
        }), @r###"
        [
            "protocolo,inicio,limite",
            "protocolo{protocoloIntegracaoCarga},inicio,limite",
        ]
        "###);
    }

    #[test]
    fn test_payload_values() {
        let request = BuscarNotasFiscais {
            protocolo: "42".to_string(),
            inicio: 10,
            limite: 5,
        };
        assert_eq!(
            (BuscarNotasFiscais::SHAPES[0])(&request),
            Payload::new()
                .scalar("protocolo", "42")
                .scalar("inicio", 10)
                .scalar("limite", 5)
        );

        let request = BuscarNotaFiscalPorChave {
            chave: "3519".to_string(),
        };
        assert_eq!(
            (BuscarNotaFiscalPorChave::SHAPES[1])(&request),
            Payload::new().scalar("chaveAcesso", "3519")
        );
    }
}
