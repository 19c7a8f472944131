//! The load and invoice graph returned by the facade.
//!
//! Wire values are frequently absent, so most fields are optional.

use serde::Serialize;

/// A load (carga): one vehicle trip carrying one or more orders.
#[derive(Debug, Clone, PartialEq, Serialize, async_graphql::SimpleObject)]
#[serde(rename_all = "camelCase")]
pub struct Carregamento {
    /// Load number assigned by the shipper.
    pub numero_carga: Option<String>,
    /// Integration code of the branch which owns the load.
    pub filial: Option<String>,
    /// Integration protocol of the load.
    pub protocolo_carga: Option<String>,
    /// CPF of the first driver.
    pub cpf_motorista: Option<String>,
    /// Name of the first driver.
    pub nome_motorista: Option<String>,
    pub modelo_veicular: Option<String>,
    pub placa_veiculo: Option<String>,
    pub tipo_operacao: Option<String>,
    /// Vehicle type, or empty if unknown.
    pub tipo_veiculo: String,
    /// CNPJ of the carrier.
    pub transportador: Option<String>,
    /// Orders of the load, in wire order.
    pub pedidos: Vec<Pedido>,
}

/// An order (pedido) carried by a load.
#[derive(Debug, Clone, PartialEq, Serialize, async_graphql::SimpleObject)]
#[serde(rename_all = "camelCase")]
pub struct Pedido {
    pub cod_filial: Option<String>,
    pub numero_pedido_embarcador: Option<String>,
    pub protocolo_pedido: Option<String>,
    pub codigo_rota: Option<String>,
    /// Loading start date, or empty if unknown.
    pub data_inicio_carregamento: String,
    /// Expected delivery date, or empty if unknown.
    pub data_previsao_entrega: String,
    pub observacao: Option<String>,
    /// Position of this order in the delivery route.
    pub ordem_entrega: Option<i32>,
    /// Gross weight, in kilograms.
    pub peso_bruto: Option<f64>,
    pub tipo_carga: Option<String>,
    pub tipo_operacao: Option<String>,
    pub tipo_pedido: String,
    pub vendedor: Option<String>,
    /// Shipper of the order.
    pub expedidor: Participante,
    /// Receiver of the order.
    pub recebedor: Participante,
    pub itens_pedido: Vec<ItemPedido>,
}

/// A party of an order: its shipper or its receiver.
#[derive(Debug, Clone, PartialEq, Default, Serialize, async_graphql::SimpleObject)]
#[serde(rename_all = "camelCase")]
pub struct Participante {
    pub bairro: Option<String>,
    pub cep: Option<String>,
    pub cidade: Option<String>,
    /// CNPJ, or CPF of individuals.
    pub cnpj: Option<String>,
    /// Trade name.
    pub descricao: Option<String>,
    pub endereco: Option<String>,
    /// State abbreviation.
    pub estado: Option<String>,
    /// IBGE code of the city.
    pub ibge: Option<String>,
    /// State registration.
    pub ie: Option<String>,
    pub logradouro: Option<String>,
    pub numero: Option<String>,
    pub razao_social: Option<String>,
}

/// A line item of an order.
#[derive(Debug, Clone, PartialEq, Serialize, async_graphql::SimpleObject)]
#[serde(rename_all = "camelCase")]
pub struct ItemPedido {
    pub codigo_grupo_produto: Option<String>,
    pub codigo_produto: Option<String>,
    pub descricao_grupo_produto: Option<String>,
    pub descricao_produto: Option<String>,
    /// Volume, in cubic meters.
    pub metro_cubico: Option<f64>,
    pub peso_unitario: Option<f64>,
    pub quantidade: Option<f64>,
    pub valor_unitario: Option<f64>,
}

/// Summary of an invoice (nota fiscal) of a load.
#[derive(Debug, Clone, PartialEq, Serialize, async_graphql::SimpleObject)]
#[serde(rename_all = "camelCase")]
pub struct DadosNotaFiscal {
    /// Load protocol the invoice was listed under.
    pub protocolo: String,
    /// Access key of the invoice.
    pub chave: Option<String>,
    pub numero: Option<String>,
    pub serie: Option<String>,
    pub data_emissao: Option<String>,
    pub valor_total: Option<f64>,
    pub peso_bruto: Option<f64>,
    pub cnpj_emitente: Option<String>,
    pub nome_emitente: Option<String>,
    pub cnpj_destinatario: Option<String>,
    pub nome_destinatario: Option<String>,
}

/// An invoice, including its XML document.
#[derive(Debug, Clone, PartialEq, Serialize, async_graphql::SimpleObject)]
#[serde(rename_all = "camelCase")]
pub struct NotaFiscalDetalhe {
    /// Access key of the invoice.
    pub chave: Option<String>,
    pub numero: Option<String>,
    pub serie: Option<String>,
    pub data_emissao: Option<String>,
    pub valor_total: Option<f64>,
    pub peso_bruto: Option<f64>,
    pub cnpj_emitente: Option<String>,
    pub nome_emitente: Option<String>,
    pub cnpj_destinatario: Option<String>,
    pub nome_destinatario: Option<String>,
    /// The invoice document, as XML text.
    pub xml: Option<String>,
}
