//! Folding of SGT wire records into the facade's graph.
//!
//! SGT returns loads as flat rows: one `CargaIntegracao` record per order,
//! each repeating the load's header fields. [`carregamento`] folds a batch
//! of such rows into a single [`Carregamento`] holding one [`Pedido`] per row.

use crate::models::{
    Carregamento, DadosNotaFiscal, ItemPedido, NotaFiscalDetalhe, Participante, Pedido,
};
use soap::value::NotANumber;
use soap::Value;
use std::borrow::Borrow;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("expected {expected} record #{index}, but found {found}")]
    UnexpectedShape {
        expected: &'static str,
        index: usize,
        found: &'static str,
    },
    #[error("invalid number at {field:?}")]
    InvalidNumber {
        field: &'static str,
        #[source]
        source: NotANumber,
    },
}

/// Records of the loads within an operation's `Objeto`.
pub fn cargas(objeto: &Value) -> Vec<&Value> {
    objeto.items("CargaIntegracao")
}

/// Fold a batch of load records into their Carregamento.
/// Header fields are taken from the first record. An empty batch has no load.
pub fn carregamento<V: Borrow<Value>>(records: &[V]) -> Result<Option<Carregamento>, Error> {
    let records: Vec<&Value> = records.iter().map(Borrow::borrow).collect();

    let Some(first) = records.first() else {
        return Ok(None);
    };
    let first = record("load", 0, first)?;

    let pedidos = records
        .iter()
        .enumerate()
        .map(|(index, r)| pedido(record("load", index, r)?))
        .collect::<Result<Vec<_>, _>>()?;

    let motorista = first
        .at("Motoristas")
        .and_then(|m| m.items("Motorista").into_iter().next());

    Ok(Some(Carregamento {
        numero_carga: text(first, "NumeroCarga"),
        filial: text(first, "Filial/CodigoIntegracao"),
        protocolo_carga: text(first, "ProtocoloCarga"),
        cpf_motorista: motorista.and_then(|m| text(m, "CPF")),
        nome_motorista: motorista.and_then(|m| text(m, "Nome")),
        modelo_veicular: text(first, "ModeloVeicular/CodigoIntegracao"),
        placa_veiculo: text(first, "Veiculo/Placa"),
        tipo_operacao: text(first, "TipoOperacao/CodigoIntegracao"),
        tipo_veiculo: text(first, "Veiculo/TipoVeiculo").unwrap_or_default(),
        transportador: text(first, "TransportadoraEmitente/CNPJ"),
        pedidos,
    }))
}

fn pedido(r: &Value) -> Result<Pedido, Error> {
    let itens_pedido = r
        .at("Produtos")
        .map(|produtos| produtos.items("Produto"))
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, item)| item_pedido(record("product", index, item)?))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Pedido {
        cod_filial: text(r, "Filial/CodigoIntegracao"),
        numero_pedido_embarcador: text(r, "NumeroPedidoEmbarcador"),
        protocolo_pedido: text(r, "ProtocoloPedido"),
        codigo_rota: text(r, "CodigoIntegracaoRota"),
        data_inicio_carregamento: text(r, "DataInicioCarregamento").unwrap_or_default(),
        data_previsao_entrega: text(r, "DataPrevisaoEntrega").unwrap_or_default(),
        observacao: text(r, "Observacao"),
        ordem_entrega: int(r, "OrdemEntrega")?,
        peso_bruto: float(r, "PesoBruto")?,
        tipo_carga: text(r, "TipoCargaEmbarcador/CodigoIntegracao"),
        tipo_operacao: text(r, "TipoOperacao/CodigoIntegracao"),
        tipo_pedido: text(r, "TipoPedido").unwrap_or_default(),
        vendedor: text(r, "Vendedor"),
        expedidor: participante(r.at("Remetente")),
        recebedor: participante(r.at("Destinatario")),
        itens_pedido,
    })
}

fn participante(p: Option<&Value>) -> Participante {
    let Some(p) = p else {
        return Participante::default();
    };
    let logradouro = text(p, "Endereco/Logradouro");

    Participante {
        bairro: text(p, "Endereco/Bairro"),
        cep: text(p, "Endereco/CEP"),
        cidade: text(p, "Endereco/Cidade/Descricao"),
        cnpj: text(p, "CPFCNPJ"),
        descricao: text(p, "NomeFantasia"),
        endereco: logradouro.clone(),
        estado: text(p, "Endereco/Cidade/SiglaUF"),
        ibge: text(p, "Endereco/Cidade/IBGE"),
        ie: text(p, "RGIE"),
        logradouro,
        numero: text(p, "Endereco/Numero"),
        razao_social: text(p, "RazaoSocial"),
    }
}

fn item_pedido(item: &Value) -> Result<ItemPedido, Error> {
    Ok(ItemPedido {
        codigo_grupo_produto: text(item, "CodigoGrupoProduto"),
        codigo_produto: text(item, "CodigoProduto"),
        descricao_grupo_produto: text(item, "DescricaoGrupoProduto"),
        descricao_produto: text(item, "DescricaoProduto"),
        // Sic: the wire field is misspelled.
        metro_cubico: float(item, "MetroCubito")?,
        peso_unitario: float(item, "PesoUnitario")?,
        quantidade: float(item, "Quantidade")?,
        valor_unitario: float(item, "ValorUnitario")?,
    })
}

/// Map the invoices within an operation's `Objeto`, listed under `protocolo`.
/// Absent invoices are an empty list.
pub fn notas_fiscais(
    objeto: Option<&Value>,
    protocolo: &str,
) -> Result<Vec<DadosNotaFiscal>, Error> {
    notas(objeto)
        .into_iter()
        .enumerate()
        .map(|(index, nota)| {
            let nota = record("invoice", index, nota)?;
            Ok(DadosNotaFiscal {
                protocolo: protocolo.to_string(),
                chave: text(nota, "Chave"),
                numero: text(nota, "Numero"),
                serie: text(nota, "Serie"),
                data_emissao: text(nota, "DataEmissao"),
                valor_total: float(nota, "ValorTotal")?,
                peso_bruto: float(nota, "PesoBruto")?,
                cnpj_emitente: text(nota, "Emitente/CPFCNPJ"),
                nome_emitente: text(nota, "Emitente/RazaoSocial"),
                cnpj_destinatario: text(nota, "Destinatario/CPFCNPJ"),
                nome_destinatario: text(nota, "Destinatario/RazaoSocial"),
            })
        })
        .collect()
}

/// Map the first invoice within an operation's `Objeto`, with its document.
pub fn nota_fiscal_detalhe(objeto: Option<&Value>) -> Result<Option<NotaFiscalDetalhe>, Error> {
    let Some(nota) = notas(objeto).into_iter().next() else {
        return Ok(None);
    };
    let nota = record("invoice", 0, nota)?;

    Ok(Some(NotaFiscalDetalhe {
        chave: text(nota, "Chave"),
        numero: text(nota, "Numero"),
        serie: text(nota, "Serie"),
        data_emissao: text(nota, "DataEmissao"),
        valor_total: float(nota, "ValorTotal")?,
        peso_bruto: float(nota, "PesoBruto")?,
        cnpj_emitente: text(nota, "Emitente/CPFCNPJ"),
        nome_emitente: text(nota, "Emitente/RazaoSocial"),
        cnpj_destinatario: text(nota, "Destinatario/CPFCNPJ"),
        nome_destinatario: text(nota, "Destinatario/RazaoSocial"),
        xml: text(nota, "XML"),
    }))
}

// Invoices are wrapped twice, as `Itens/NotaFiscal`, though some
// operations return `NotaFiscal` records without the outer wrapper.
fn notas(objeto: Option<&Value>) -> Vec<&Value> {
    let Some(objeto) = objeto else {
        return Vec::new();
    };
    match objeto.as_map().and_then(|fields| fields.get("Itens")) {
        Some(itens) => itens.items("NotaFiscal"),
        None => objeto.items("NotaFiscal"),
    }
}

fn record<'v>(expected: &'static str, index: usize, value: &'v Value) -> Result<&'v Value, Error> {
    let found = match value {
        Value::Map(_) => return Ok(value),
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Int(_) | Value::Float(_) => "a number",
        Value::Text(_) => "text",
        Value::List(_) => "a list",
    };
    Err(Error::UnexpectedShape {
        expected,
        index,
        found,
    })
}

fn text(v: &Value, path: &str) -> Option<String> {
    v.at(path).and_then(Value::as_text)
}

fn float(v: &Value, field: &'static str) -> Result<Option<f64>, Error> {
    match v.at(field) {
        Some(value) => value
            .as_f64()
            .map_err(|source| Error::InvalidNumber { field, source }),
        None => Ok(None),
    }
}

fn int(v: &Value, field: &'static str) -> Result<Option<i32>, Error> {
    let Some(value) = v.at(field) else {
        return Ok(None);
    };
    let Some(n) = value
        .as_i64()
        .map_err(|source| Error::InvalidNumber { field, source })?
    else {
        return Ok(None);
    };

    i32::try_from(n).map(Some).map_err(|_| Error::InvalidNumber {
        field,
        source: NotANumber {
            text: n.to_string(),
            expected: "32-bit integer",
        },
    })
}
