use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============ Enumerations ============

/// Insurance branch (ramo) of a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ramo {
    #[serde(rename = "Automóvel")]
    Automovel,
    #[serde(rename = "Vida")]
    Vida,
    #[serde(rename = "Residencial")]
    Residencial,
    #[serde(rename = "Empresarial")]
    Empresarial,
    #[serde(rename = "Outros")]
    Outros,
}

/// Nature of the loss reported in a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NaturezaSinistro {
    #[serde(rename = "Colisão")]
    Colisao,
    #[serde(rename = "Roubo/Furto")]
    RouboFurto,
    #[serde(rename = "Incêndio")]
    Incendio,
    #[serde(rename = "Alagamento")]
    Alagamento,
    #[serde(rename = "Danos a Terceiros")]
    DanosTerceiros,
}

/// Claim progression: Aberto → Em Análise → Aguardando Peças → Liquidado | Negado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusAndamento {
    #[serde(rename = "Aberto")]
    Aberto,
    #[serde(rename = "Em Análise")]
    EmAnalise,
    #[serde(rename = "Aguardando Peças")]
    AguardandoPecas,
    #[serde(rename = "Liquidado")]
    Liquidado,
    #[serde(rename = "Negado")]
    Negado,
}

impl StatusAndamento {
    /// Whether the claim reached a terminal state.
    pub fn is_closed(self) -> bool {
        matches!(self, StatusAndamento::Liquidado | StatusAndamento::Negado)
    }
}

/// Natural person (PF) or legal entity (PJ).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TipoPessoa {
    Fisica,
    Juridica,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusSeguro {
    Ativo,
    Vencido,
    Cancelado,
}

/// Reason of a financial movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotivoProducao {
    #[serde(rename = "Seguro Novo")]
    SeguroNovo,
    #[serde(rename = "Renovação")]
    Renovacao,
    #[serde(rename = "Endosso")]
    Endosso,
    #[serde(rename = "Cancelamento")]
    Cancelamento,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusParcela {
    Pendente,
    Pago,
    Atrasado,
}

// ============ Entities ============

/// A client of the brokerage (person or company).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cliente {
    /// Unique identifier within the dataset.
    pub id: String,
    /// Full name or legal name.
    pub nome: String,
    /// CPF or CNPJ document number, as exported.
    pub cpf_cnpj: String,
    pub email: String,
    pub telefone: String,
    pub tipo: TipoPessoa,
}

/// An insurance policy. `codseguro` is the legacy primary key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seguro {
    pub codseguro: String,
    /// Foreign key to `Cliente::id` (not enforced).
    pub cliente_id: String,
    /// Opaque insurer reference.
    pub seguradora_id: String,
    /// Opaque producer (broker agent) reference.
    pub produtor_id: String,
    pub ramo: Ramo,
    pub numero_apolice: String,
    pub vigencia_inicio: DateTime<Utc>,
    pub vigencia_fim: DateTime<Utc>,
    /// Insured item description (vehicle, address, ...).
    pub item_segurado: String,
    /// Total premium, never negative.
    pub valor_premio_total: f64,
    pub status: StatusSeguro,
}

/// A status change in a claim's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Andamento {
    pub id: String,
    pub data: DateTime<Utc>,
    pub descricao: String,
    pub status: StatusAndamento,
}

/// A third party involved in a claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Terceiro {
    pub id: String,
    pub nome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub veiculo: Option<String>,
    pub contato: String,
}

/// Claim header (CABSINISTRO).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CabSinistro {
    pub id: String,
    /// Foreign key to `Seguro::codseguro` (not enforced).
    pub codseguro: String,
    pub data_ocorrencia: DateTime<Utc>,
    pub data_aviso: DateTime<Utc>,
    pub natureza: NaturezaSinistro,
    pub resumo: String,
    pub status_atual: StatusAndamento,
    /// Ordered status-change events.
    pub andamentos: Vec<Andamento>,
    pub terceiros: Vec<Terceiro>,
}

/// One installment of a production record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parcela {
    pub id: String,
    /// 1-indexed, never above `total_parcelas`.
    pub numero_parcela: u32,
    pub total_parcelas: u32,
    pub valor: f64,
    pub vencimento: DateTime<Utc>,
    pub status: StatusParcela,
}

/// Financial movement header (FINANCEIRO).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CabProducao {
    pub id: String,
    /// Foreign key to `Seguro::codseguro` (not enforced).
    pub codseguro: String,
    pub motivo: MotivoProducao,
    pub data_emissao: DateTime<Utc>,
    pub premio_liquido: f64,
    pub comissao_estimada: f64,
    pub parcelas: Vec<Parcela>,
}

// ============ Dataset ============

/// Full in-memory dataset handed to the rendering layer.
///
/// Built once per sync cycle and replaced wholesale on the next one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub clientes: Vec<Cliente>,
    pub seguros: Vec<Seguro>,
    pub sinistros: Vec<CabSinistro>,
    pub producao: Vec<CabProducao>,
    pub loaded: bool,
    /// Source label shown by the rendering layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl Dataset {
    pub fn client(&self, id: &str) -> Option<&Cliente> {
        self.clientes.iter().find(|c| c.id == id)
    }

    pub fn policy(&self, codseguro: &str) -> Option<&Seguro> {
        self.seguros.iter().find(|s| s.codseguro == codseguro)
    }

    /// Name of the client holding `seguro`, if the reference resolves.
    pub fn client_name_for(&self, seguro: &Seguro) -> Option<&str> {
        self.client(&seguro.cliente_id).map(|c| c.nome.as_str())
    }

    /// Total number of records across the four collections.
    pub fn record_count(&self) -> usize {
        self.clientes.len() + self.seguros.len() + self.sinistros.len() + self.producao.len()
    }
}
