//! Field mapping from raw legacy rows to the internal schema.
//!
//! Every mapper is total: absent lists map to empty vectors, malformed
//! records map to default-filled records, and no record is ever dropped.
//! Raw rows use legacy column names and several historical variants per
//! field; the first non-empty alias wins.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::models::*;
use crate::rules;
use crate::sync_models::RawSyncPayload;

/// Prefix of identities derived from record content.
pub const DERIVED_ID_PREFIX: &str = "gen-";

// ============ Field aliases ============

const CLIENT_ID: &[&str] = &["CODIGO", "CODCLIENTE", "COD_CLIENTE", "ID", "id"];
const CLIENT_NAME: &[&str] = &["NOME", "RAZAO_SOCIAL", "NOME_CLIENTE", "nome"];
const CLIENT_DOCUMENT: &[&str] = &["CGC_CPF", "CPF_CNPJ", "CPF", "CNPJ"];
const CLIENT_EMAIL: &[&str] = &["EMAIL", "E_MAIL"];
const CLIENT_PHONE: &[&str] = &["TELEFONE", "FONE", "CELULAR"];
const CLIENT_TYPE: &[&str] = &["TIPO", "TIPO_PESSOA", "PESSOA"];

const POLICY_ID: &[&str] = &["CODSEGURO", "COD_SEGURO", "CODIGO", "ID"];
const POLICY_CLIENT: &[&str] = &["CODCLIENTE", "COD_CLIENTE", "CLIENTE"];
const POLICY_INSURER: &[&str] = &["CODSEGURADORA", "SEGURADORA", "CIA"];
const POLICY_PRODUCER: &[&str] = &["CODPRODUTOR", "PRODUTOR"];
const POLICY_BRANCH: &[&str] = &["RAMO", "CODRAMO"];
const POLICY_NUMBER: &[&str] = &["APOLICE", "NUMERO_APOLICE", "NUM_APOLICE"];
const POLICY_START: &[&str] = &["VIGENCIA_INICIO", "INICIO_VIGENCIA", "DT_INICIO"];
const POLICY_END: &[&str] = &["VIGENCIA_FIM", "FIM_VIGENCIA", "DT_FIM"];
const POLICY_ITEM: &[&str] = &["ITEM_SEGURADO", "ITEM", "DESCRICAO"];
const POLICY_PREMIUM: &[&str] = &["PREMIO_TOTAL", "VALOR_PREMIO", "PREMIO"];
const POLICY_STATUS: &[&str] = &["STATUS", "SITUACAO"];

const CLAIM_ID: &[&str] = &["CODSINISTRO", "COD_SINISTRO", "CODIGO", "ID"];
const CLAIM_POLICY: &[&str] = &["CODSEGURO", "COD_SEGURO"];
const CLAIM_OCCURRED: &[&str] = &["DATA_OCORRENCIA", "DT_OCORRENCIA"];
const CLAIM_NOTIFIED: &[&str] = &["DATA_AVISO", "DT_AVISO"];
const CLAIM_NATURE: &[&str] = &["NATUREZA", "CAUSA"];
const CLAIM_SUMMARY: &[&str] = &["RESUMO", "HISTORICO", "DESCRICAO", "OBS"];
const CLAIM_STATUS: &[&str] = &["STATUS", "SITUACAO"];
const CLAIM_EVENTS: &[&str] = &["ANDAMENTOS", "andamentos"];
const CLAIM_THIRD_PARTIES: &[&str] = &["TERCEIROS", "terceiros"];

const PRODUCTION_ID: &[&str] = &["CODPRODUCAO", "CODFINANCEIRO", "CODIGO", "ID"];
const PRODUCTION_POLICY: &[&str] = &["CODSEGURO", "COD_SEGURO"];
const PRODUCTION_REASON: &[&str] = &["MOTIVO", "TIPO_MOVIMENTO", "TIPO"];
const PRODUCTION_ISSUED: &[&str] = &["DATA_EMISSAO", "DT_EMISSAO", "EMISSAO"];
const PRODUCTION_NET_PREMIUM: &[&str] = &["PREMIO_LIQUIDO", "PREMIO_LIQ", "PREMIO"];
const PRODUCTION_COMMISSION: &[&str] = &["COMISSAO", "VALOR_COMISSAO", "COMISSAO_ESTIMADA"];
const PRODUCTION_INSTALLMENTS: &[&str] = &["PARCELAS", "parcelas"];

const NESTED_ID: &[&str] = &["ID", "CODIGO", "id"];
const EVENT_DATE: &[&str] = &["DATA", "DATA_ANDAMENTO", "data"];
const EVENT_DESCRIPTION: &[&str] = &["DESCRICAO", "HISTORICO", "descricao"];
const EVENT_STATUS: &[&str] = &["STATUS", "SITUACAO", "status"];
const THIRD_PARTY_NAME: &[&str] = &["NOME", "nome"];
const THIRD_PARTY_VEHICLE: &[&str] = &["VEICULO", "veiculo"];
const THIRD_PARTY_CONTACT: &[&str] = &["CONTATO", "TELEFONE", "contato"];
const INSTALLMENT_NUMBER: &[&str] = &["NUMERO", "NUM_PARCELA", "PARCELA", "numeroParcela"];
const INSTALLMENT_TOTAL: &[&str] = &["TOTAL", "TOTAL_PARCELAS", "QTD_PARCELAS", "totalParcelas"];
const INSTALLMENT_AMOUNT: &[&str] = &["VALOR", "VALOR_PARCELA", "valor"];
const INSTALLMENT_DUE: &[&str] = &["VENCIMENTO", "DT_VENCIMENTO", "vencimento"];
const INSTALLMENT_STATUS: &[&str] = &["STATUS", "SITUACAO", "status"];

// ============ Context ============

/// Whether nested sub-collections are read from the source rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NestedCollections {
    /// Emit empty event, third-party and installment lists.
    #[default]
    Skip,
    /// Map `ANDAMENTOS`, `TERCEIROS` and `PARCELAS` arrays when present.
    FromRecord,
}

/// Inputs shared by one mapping pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappingContext {
    /// Substituted for every absent or unparseable timestamp.
    pub now: DateTime<Utc>,
    pub nested: NestedCollections,
}

impl Default for MappingContext {
    fn default() -> Self {
        Self::at(Utc::now())
    }
}

impl MappingContext {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            nested: NestedCollections::Skip,
        }
    }

    pub fn with_nested(mut self, nested: NestedCollections) -> Self {
        self.nested = nested;
        self
    }
}

// ============ Entity mappers ============

pub fn map_clients(raw: Option<&[Value]>) -> Vec<Cliente> {
    map_clients_with(raw, &MappingContext::default())
}

pub fn map_clients_with(raw: Option<&[Value]>, _ctx: &MappingContext) -> Vec<Cliente> {
    let mut ids = Identities::default();
    raw.unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(position, record)| map_client(record, ids.assign(record, CLIENT_ID, position)))
        .collect()
}

fn map_client(record: &Value, id: String) -> Cliente {
    Cliente {
        id,
        nome: text(record, CLIENT_NAME),
        cpf_cnpj: text(record, CLIENT_DOCUMENT),
        email: text(record, CLIENT_EMAIL),
        telefone: text(record, CLIENT_PHONE),
        tipo: rules::PERSON_TYPE.resolve(field_text(record, CLIENT_TYPE).as_deref()),
    }
}

pub fn map_policies(raw: Option<&[Value]>) -> Vec<Seguro> {
    map_policies_with(raw, &MappingContext::default())
}

pub fn map_policies_with(raw: Option<&[Value]>, ctx: &MappingContext) -> Vec<Seguro> {
    let mut ids = Identities::default();
    raw.unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(position, record)| {
            map_policy(record, ids.assign(record, POLICY_ID, position), ctx)
        })
        .collect()
}

fn map_policy(record: &Value, codseguro: String, ctx: &MappingContext) -> Seguro {
    Seguro {
        codseguro,
        cliente_id: text(record, POLICY_CLIENT),
        seguradora_id: text(record, POLICY_INSURER),
        produtor_id: text(record, POLICY_PRODUCER),
        ramo: rules::BRANCH.resolve(field_text(record, POLICY_BRANCH).as_deref()),
        numero_apolice: text(record, POLICY_NUMBER),
        vigencia_inicio: timestamp(record, POLICY_START, ctx),
        vigencia_fim: timestamp(record, POLICY_END, ctx),
        item_segurado: text(record, POLICY_ITEM),
        valor_premio_total: amount(record, POLICY_PREMIUM),
        status: rules::POLICY_STATUS.resolve(field_text(record, POLICY_STATUS).as_deref()),
    }
}

pub fn map_claims(raw: Option<&[Value]>) -> Vec<CabSinistro> {
    map_claims_with(raw, &MappingContext::default())
}

pub fn map_claims_with(raw: Option<&[Value]>, ctx: &MappingContext) -> Vec<CabSinistro> {
    let mut ids = Identities::default();
    raw.unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(position, record)| map_claim(record, ids.assign(record, CLAIM_ID, position), ctx))
        .collect()
}

fn map_claim(record: &Value, id: String, ctx: &MappingContext) -> CabSinistro {
    CabSinistro {
        id,
        codseguro: text(record, CLAIM_POLICY),
        data_ocorrencia: timestamp(record, CLAIM_OCCURRED, ctx),
        data_aviso: timestamp(record, CLAIM_NOTIFIED, ctx),
        natureza: rules::LOSS_NATURE.resolve(field_text(record, CLAIM_NATURE).as_deref()),
        resumo: text(record, CLAIM_SUMMARY),
        status_atual: rules::CLAIM_STATUS.resolve(field_text(record, CLAIM_STATUS).as_deref()),
        andamentos: map_claim_events(record, ctx),
        terceiros: map_third_parties(record, ctx),
    }
}

pub fn map_production(raw: Option<&[Value]>) -> Vec<CabProducao> {
    map_production_with(raw, &MappingContext::default())
}

pub fn map_production_with(raw: Option<&[Value]>, ctx: &MappingContext) -> Vec<CabProducao> {
    let mut ids = Identities::default();
    raw.unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(position, record)| {
            map_production_record(record, ids.assign(record, PRODUCTION_ID, position), ctx)
        })
        .collect()
}

fn map_production_record(record: &Value, id: String, ctx: &MappingContext) -> CabProducao {
    CabProducao {
        id,
        codseguro: text(record, PRODUCTION_POLICY),
        motivo: rules::MOVEMENT_REASON.resolve(field_text(record, PRODUCTION_REASON).as_deref()),
        data_emissao: timestamp(record, PRODUCTION_ISSUED, ctx),
        premio_liquido: amount(record, PRODUCTION_NET_PREMIUM),
        comissao_estimada: amount(record, PRODUCTION_COMMISSION),
        parcelas: map_installments(record, ctx),
    }
}

/// Map all four collections of a payload. The source label is left to the caller.
pub fn map_dataset(payload: &RawSyncPayload, ctx: &MappingContext) -> Dataset {
    let dataset = Dataset {
        clientes: map_clients_with(payload.clientes.as_deref(), ctx),
        seguros: map_policies_with(payload.seguros.as_deref(), ctx),
        sinistros: map_claims_with(payload.sinistros.as_deref(), ctx),
        producao: map_production_with(payload.producao.as_deref(), ctx),
        loaded: true,
        filename: None,
    };

    tracing::debug!(
        "Mapped {} clientes, {} seguros, {} sinistros, {} producao",
        dataset.clientes.len(),
        dataset.seguros.len(),
        dataset.sinistros.len(),
        dataset.producao.len()
    );

    dataset
}

// ============ Nested collections ============

/// Status history of a claim row.
pub fn map_claim_events(record: &Value, ctx: &MappingContext) -> Vec<Andamento> {
    let mut ids = Identities::default();
    nested_rows(record, CLAIM_EVENTS, ctx)
        .iter()
        .enumerate()
        .map(|(position, row)| Andamento {
            id: ids.assign(row, NESTED_ID, position),
            data: timestamp(row, EVENT_DATE, ctx),
            descricao: text(row, EVENT_DESCRIPTION),
            status: rules::CLAIM_STATUS.resolve(field_text(row, EVENT_STATUS).as_deref()),
        })
        .collect()
}

/// Third parties involved in a claim row.
pub fn map_third_parties(record: &Value, ctx: &MappingContext) -> Vec<Terceiro> {
    let mut ids = Identities::default();
    nested_rows(record, CLAIM_THIRD_PARTIES, ctx)
        .iter()
        .enumerate()
        .map(|(position, row)| Terceiro {
            id: ids.assign(row, NESTED_ID, position),
            nome: text(row, THIRD_PARTY_NAME),
            veiculo: field_text(row, THIRD_PARTY_VEHICLE),
            contato: text(row, THIRD_PARTY_CONTACT),
        })
        .collect()
}

/// Installment schedule of a production row.
///
/// Numbering is clamped so that `1 <= numero_parcela <= total_parcelas`;
/// a missing number falls back to the row position.
pub fn map_installments(record: &Value, ctx: &MappingContext) -> Vec<Parcela> {
    let rows = nested_rows(record, PRODUCTION_INSTALLMENTS, ctx);
    let row_count = u32::try_from(rows.len()).unwrap_or(u32::MAX);
    let mut ids = Identities::default();

    rows.iter()
        .enumerate()
        .zip(1u32..)
        .map(|((index, row), position)| {
            let numero = count(row, INSTALLMENT_NUMBER).unwrap_or(position).max(1);
            let total = count(row, INSTALLMENT_TOTAL)
                .unwrap_or(row_count)
                .max(numero);
            Parcela {
                id: ids.assign(row, NESTED_ID, index),
                numero_parcela: numero,
                total_parcelas: total,
                valor: amount(row, INSTALLMENT_AMOUNT),
                vencimento: timestamp(row, INSTALLMENT_DUE, ctx),
                status: rules::INSTALLMENT_STATUS
                    .resolve(field_text(row, INSTALLMENT_STATUS).as_deref()),
            }
        })
        .collect()
}

fn nested_rows<'a>(record: &'a Value, aliases: &[&str], ctx: &MappingContext) -> &'a [Value] {
    if ctx.nested == NestedCollections::Skip {
        return &[];
    }
    aliases
        .iter()
        .find_map(|alias| record.get(*alias).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or_default()
}

// ============ Field helpers ============

/// First non-empty alias rendered as trimmed text. Numbers and booleans
/// are accepted since exports are not consistent about column types.
pub fn field_text(record: &Value, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|alias| match record.get(*alias)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn text(record: &Value, aliases: &[&str]) -> String {
    field_text(record, aliases).unwrap_or_default()
}

/// Identities handed out over one list of rows. A derived identity that
/// repeats within the list is re-derived with the row position mixed in.
#[derive(Default)]
struct Identities {
    derived: HashSet<String>,
}

impl Identities {
    fn assign(&mut self, record: &Value, aliases: &[&str], position: usize) -> String {
        if let Some(key) = field_text(record, aliases) {
            return key;
        }

        let mut id = derive_identity(record);
        if self.derived.contains(&id) {
            tracing::debug!("Duplicate keyless row at position {}", position);
            id = derive_identity_at(record, position);
        }
        self.derived.insert(id.clone());
        id
    }
}

fn amount(record: &Value, aliases: &[&str]) -> f64 {
    aliases
        .iter()
        .find_map(|alias| match record.get(*alias)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) if !s.trim().is_empty() => Some(parse_amount_text(s)),
            _ => None,
        })
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(0.0)
}

fn count(record: &Value, aliases: &[&str]) -> Option<u32> {
    field_text(record, aliases)?.parse::<u32>().ok()
}

fn timestamp(record: &Value, aliases: &[&str], ctx: &MappingContext) -> DateTime<Utc> {
    field_text(record, aliases)
        .and_then(|raw| parse_timestamp(&raw))
        .unwrap_or(ctx.now)
}

fn thousands_grouped() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{1,3}(\.\d{3})+$").expect("valid thousands regex"))
}

/// Parse a monetary amount exported as text.
///
/// - `R$` and whitespace are ignored
/// - with a comma, the comma is the decimal separator and dots group thousands
///   (`"1.500,50"` and `"1500,50"` are both 1500.5), unless a dot follows the
///   last comma (`"1,500.50"`), in which case commas group thousands
/// - without a comma, dot-grouped thousands (`"1.500"`) are read as grouping,
///   anything else uses the dot as decimal separator (`"1500.50"`)
///
/// Empty, unparseable, negative or non-finite input yields 0.0.
pub fn parse_amount_text(raw: &str) -> f64 {
    let cleaned: String = raw
        .trim()
        .trim_start_matches("R$")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let canonical = match (cleaned.rfind(','), cleaned.rfind('.')) {
        // "1,500.50": the later separator is the decimal one
        (Some(comma), Some(dot)) if dot > comma => cleaned.replace(',', ""),
        (Some(_), _) => cleaned.replace('.', "").replace(',', "."),
        (None, _) if thousands_grouped().is_match(&cleaned) => cleaned.replace('.', ""),
        _ => cleaned,
    };

    canonical
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
        .unwrap_or(0.0)
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    // mdb-export default
    "%m/%d/%y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Parse an exported timestamp. Naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|naive| naive.and_utc())
        })
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })?;

    // "%Y" happily reads "24" as year 24
    (1900..=2200).contains(&parsed.year()).then_some(parsed)
}

// ============ Identity ============

/// Stable identity for a record that carries no key: `gen-` followed by the
/// first 16 hex chars of SHA-256 over the record's canonical JSON.
pub fn derive_identity(record: &Value) -> String {
    let mut canonical = String::new();
    write_canonical(record, &mut canonical);
    digest_identity(&canonical)
}

/// Like [`derive_identity`], salted with the row position. Used for rows
/// whose content repeats an earlier keyless row of the same list.
pub fn derive_identity_at(record: &Value, position: usize) -> String {
    let mut canonical = String::new();
    write_canonical(record, &mut canonical);
    canonical.push('#');
    canonical.push_str(&position.to_string());
    digest_identity(&canonical)
}

fn digest_identity(canonical: &str) -> String {
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{}{}", DERIVED_ID_PREFIX, &hex::encode(digest)[..16])
}

pub fn is_derived_identity(id: &str) -> bool {
    id.starts_with(DERIVED_ID_PREFIX)
}

/// Number of top-level records in `dataset` whose identity was derived.
pub fn derived_identity_count(dataset: &Dataset) -> usize {
    let clients = dataset.clientes.iter().map(|c| c.id.as_str());
    let policies = dataset.seguros.iter().map(|s| s.codseguro.as_str());
    let claims = dataset.sinistros.iter().map(|s| s.id.as_str());
    let production = dataset.producao.iter().map(|p| p.id.as_str());

    clients
        .chain(policies)
        .chain(claims)
        .chain(production)
        .filter(|id| is_derived_identity(id))
        .count()
}

/// JSON with object keys sorted, independent of the map's iteration order.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ctx() -> MappingContext {
        MappingContext::at(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_absent_and_empty_lists() {
        assert!(map_clients(None).is_empty());
        assert!(map_clients(Some(&[])).is_empty());
        assert!(map_policies(None).is_empty());
        assert!(map_policies(Some(&[])).is_empty());
        assert!(map_claims(None).is_empty());
        assert!(map_claims(Some(&[])).is_empty());
        assert!(map_production(None).is_empty());
        assert!(map_production(Some(&[])).is_empty());
    }

    #[test]
    fn test_map_client_fields() {
        let raw = vec![json!({
            "CODIGO": "42",
            "NOME": "Tech Solutions Ltda",
            "CGC_CPF": "12.345.678/0001-90",
            "EMAIL": "contato@techsol.com",
            "FONE": "(11) 3030-3030",
            "TIPO": "Pessoa Juridica"
        })];

        let clientes = map_clients(Some(&raw));
        assert_eq!(clientes.len(), 1);
        let c = &clientes[0];
        assert_eq!(c.id, "42");
        assert_eq!(c.nome, "Tech Solutions Ltda");
        assert_eq!(c.cpf_cnpj, "12.345.678/0001-90");
        assert_eq!(c.telefone, "(11) 3030-3030");
        assert_eq!(c.tipo, TipoPessoa::Juridica);
    }

    #[test]
    fn test_client_alternate_key_and_numeric_key() {
        let raw = vec![json!({"CODCLIENTE": "7"}), json!({"CODIGO": 8, "TIPO": "PF"})];

        let clientes = map_clients(Some(&raw));
        assert_eq!(clientes[0].id, "7");
        assert_eq!(clientes[0].tipo, TipoPessoa::Fisica);
        assert_eq!(clientes[1].id, "8");
        assert_eq!(clientes[1].tipo, TipoPessoa::Fisica);
    }

    #[test]
    fn test_blank_primary_key_falls_through_to_alternate() {
        let raw = vec![json!({"CODIGO": "  ", "CODCLIENTE": "9"})];
        assert_eq!(map_clients(Some(&raw))[0].id, "9");
    }

    #[test]
    fn test_missing_key_gets_stable_derived_identity() {
        let raw = vec![json!({"NOME": "Sem Código", "EMAIL": "x@y.com"})];

        let first = map_clients(Some(&raw));
        let second = map_clients(Some(&raw));
        assert!(is_derived_identity(&first[0].id));
        assert_eq!(first[0].id, second[0].id);
        assert_eq!(first[0].id.len(), DERIVED_ID_PREFIX.len() + 16);
    }

    #[test]
    fn test_identical_keyless_rows_get_distinct_identities() {
        let raw = vec![json!(null), json!({"NOME": "A"}), json!(null), json!(null)];

        let first = map_clients(Some(&raw));
        let ids: HashSet<&str> = first.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), 4);
        assert!(first.iter().all(|c| is_derived_identity(&c.id)));
        // The first occurrence keeps the plain content identity
        assert_eq!(first[0].id, derive_identity(&json!(null)));
        assert_eq!(first[2].id, derive_identity_at(&json!(null), 2));

        let second = map_clients(Some(&raw));
        assert_eq!(first, second);

        let policies = map_policies_with(Some(&raw), &ctx());
        let codes: HashSet<&str> = policies.iter().map(|s| s.codseguro.as_str()).collect();
        assert_eq!(codes.len(), 4);
    }

    #[test]
    fn test_duplicate_keyless_installments_are_distinct() {
        let raw = vec![json!({
            "CODPRODUCAO": "PROD-1",
            "PARCELAS": [{"VALOR": "100"}, {"VALOR": "100"}]
        })];
        let ctx = ctx().with_nested(NestedCollections::FromRecord);

        let parcelas = &map_production_with(Some(&raw), &ctx)[0].parcelas;
        assert_ne!(parcelas[0].id, parcelas[1].id);
    }

    #[test]
    fn test_derived_identity_ignores_key_order() {
        let a = json!({"NOME": "A", "EMAIL": "a@a.com"});
        let b: Value = serde_json::from_str(r#"{"EMAIL": "a@a.com", "NOME": "A"}"#).unwrap();
        assert_eq!(derive_identity(&a), derive_identity(&b));
        assert_ne!(derive_identity(&a), derive_identity(&json!({"NOME": "B"})));
    }

    #[test]
    fn test_malformed_records_are_not_dropped() {
        let raw = vec![json!("not an object"), json!(null), json!({"CODIGO": "1"})];

        let clientes = map_clients(Some(&raw));
        assert_eq!(clientes.len(), 3);
        assert_eq!(clientes[0].nome, "");
        assert!(is_derived_identity(&clientes[0].id));
        assert_eq!(clientes[2].id, "1");
    }

    #[test]
    fn test_map_policy_fields_and_defaults() {
        let raw = vec![
            json!({
                "CODSEGURO": "1001",
                "CODCLIENTE": "1",
                "SEGURADORA": "PORTO",
                "PRODUTOR": "CORRETOR1",
                "RAMO": "AUTOMOVEL",
                "APOLICE": "001.234.567",
                "VIGENCIA_INICIO": "2024-01-10",
                "VIGENCIA_FIM": "01/10/25 00:00:00",
                "ITEM_SEGURADO": "Chevrolet Onix 2022",
                "PREMIO_TOTAL": "2.500,00",
                "STATUS": "C"
            }),
            json!({"CODSEGURO": "1002"}),
        ];

        let seguros = map_policies_with(Some(&raw), &ctx());
        let s = &seguros[0];
        assert_eq!(s.codseguro, "1001");
        assert_eq!(s.cliente_id, "1");
        assert_eq!(s.seguradora_id, "PORTO");
        assert_eq!(s.ramo, Ramo::Automovel);
        assert_eq!(
            s.vigencia_inicio,
            Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap()
        );
        assert_eq!(
            s.vigencia_fim,
            Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap()
        );
        assert_eq!(s.valor_premio_total, 2500.0);
        assert_eq!(s.status, StatusSeguro::Cancelado);

        let d = &seguros[1];
        assert_eq!(d.cliente_id, "");
        assert_eq!(d.ramo, Ramo::Outros);
        assert_eq!(d.vigencia_inicio, ctx().now);
        assert_eq!(d.valor_premio_total, 0.0);
        assert_eq!(d.status, StatusSeguro::Ativo);
    }

    #[test]
    fn test_map_claim_skips_nested_by_default() {
        let raw = vec![json!({
            "CODSINISTRO": "SIN-9",
            "CODSEGURO": "1001",
            "NATUREZA": "Roubo",
            "STATUS": "Em Análise",
            "ANDAMENTOS": [{"DATA": "2024-05-01", "DESCRICAO": "Aviso", "STATUS": "Aberto"}],
            "TERCEIROS": [{"NOME": "Roberto"}]
        })];

        let sinistros = map_claims_with(Some(&raw), &ctx());
        let s = &sinistros[0];
        assert_eq!(s.id, "SIN-9");
        assert_eq!(s.natureza, NaturezaSinistro::RouboFurto);
        assert_eq!(s.status_atual, StatusAndamento::EmAnalise);
        assert!(s.andamentos.is_empty());
        assert!(s.terceiros.is_empty());
    }

    #[test]
    fn test_map_claim_nested_from_record() {
        let raw = vec![json!({
            "CODSINISTRO": "SIN-9",
            "ANDAMENTOS": [
                {"ID": "A1", "DATA": "2024-05-01", "DESCRICAO": "Aviso", "STATUS": "Aberto"},
                {"ID": "A2", "DATA": "2024-05-03", "DESCRICAO": "Vistoria", "STATUS": "Em Análise"}
            ],
            "TERCEIROS": [{"NOME": "Roberto Alves", "VEICULO": "Fiat Uno", "CONTATO": "9999-9999"},
                          {"NOME": "Pedestre", "VEICULO": ""}]
        })];
        let ctx = ctx().with_nested(NestedCollections::FromRecord);

        let s = &map_claims_with(Some(&raw), &ctx)[0];
        assert_eq!(s.andamentos.len(), 2);
        assert_eq!(s.andamentos[1].status, StatusAndamento::EmAnalise);
        assert_eq!(s.terceiros.len(), 2);
        assert_eq!(s.terceiros[0].veiculo.as_deref(), Some("Fiat Uno"));
        assert_eq!(s.terceiros[1].veiculo, None);
        assert!(is_derived_identity(&s.terceiros[1].id));
    }

    #[test]
    fn test_map_production_installments_are_clamped() {
        let raw = vec![json!({
            "CODPRODUCAO": "PROD-1",
            "CODSEGURO": "1001",
            "MOTIVO": "Renovação",
            "PREMIO_LIQUIDO": 2200.0,
            "COMISSAO": "440,00",
            "PARCELAS": [
                {"NUMERO": "0", "TOTAL": "4", "VALOR": "625,00", "STATUS": "Pago"},
                {"NUMERO": "5", "TOTAL": "4", "VALOR": "625,00"},
                {"VALOR": "625,00"}
            ]
        })];
        let ctx = ctx().with_nested(NestedCollections::FromRecord);

        let p = &map_production_with(Some(&raw), &ctx)[0];
        assert_eq!(p.motivo, MotivoProducao::Renovacao);
        assert_eq!(p.premio_liquido, 2200.0);
        assert_eq!(p.comissao_estimada, 440.0);

        let parcelas = &p.parcelas;
        assert_eq!(parcelas.len(), 3);
        assert_eq!((parcelas[0].numero_parcela, parcelas[0].total_parcelas), (1, 4));
        assert_eq!(parcelas[0].status, StatusParcela::Pago);
        assert_eq!((parcelas[1].numero_parcela, parcelas[1].total_parcelas), (5, 5));
        assert_eq!((parcelas[2].numero_parcela, parcelas[2].total_parcelas), (3, 3));
        assert_eq!(parcelas[2].status, StatusParcela::Pendente);
        for parcela in parcelas {
            assert!(parcela.numero_parcela >= 1);
            assert!(parcela.numero_parcela <= parcela.total_parcelas);
        }
    }

    #[test]
    fn test_map_production_skips_installments_by_default() {
        let raw = vec![json!({"CODPRODUCAO": "PROD-1", "PARCELAS": [{"VALOR": "1"}]})];
        assert!(map_production(Some(&raw))[0].parcelas.is_empty());
    }

    #[test]
    fn test_parse_amount_text_rules() {
        assert_eq!(parse_amount_text("1500,50"), 1500.5);
        assert_eq!(parse_amount_text("1.500,50"), 1500.5);
        assert_eq!(parse_amount_text("1500.50"), 1500.5);
        assert_eq!(parse_amount_text("1.500"), 1500.0);
        assert_eq!(parse_amount_text("12.345.678"), 12345678.0);
        assert_eq!(parse_amount_text("R$ 2.500,00"), 2500.0);
        assert_eq!(parse_amount_text(""), 0.0);
        assert_eq!(parse_amount_text("abc"), 0.0);
        assert_eq!(parse_amount_text("-10"), 0.0);
        assert_eq!(parse_amount_text("NaN"), 0.0);
    }

    #[test]
    fn test_parse_amount_text_us_grouping() {
        assert_eq!(parse_amount_text("1,500.50"), 1500.5);
        assert_eq!(parse_amount_text("R$ 12,345,678.90"), 12345678.9);
        assert_eq!(parse_amount_text("1,500"), 1.5);
    }

    #[test]
    fn test_amount_field_absent_or_empty() {
        assert_eq!(amount(&json!({}), POLICY_PREMIUM), 0.0);
        assert_eq!(amount(&json!({"PREMIO_TOTAL": ""}), POLICY_PREMIUM), 0.0);
        assert_eq!(amount(&json!({"PREMIO_TOTAL": null}), POLICY_PREMIUM), 0.0);
        assert_eq!(amount(&json!({"PREMIO_TOTAL": -3.0}), POLICY_PREMIUM), 0.0);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-05T00:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T00:00:00.000Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05 00:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05"), Some(expected));
        assert_eq!(parse_timestamp("05/03/2024"), Some(expected));
        assert_eq!(parse_timestamp("03/05/24 00:00:00"), Some(expected));
        assert_eq!(parse_timestamp("05/03/24"), None);
        assert_eq!(parse_timestamp("ontem"), None);
    }

    #[test]
    fn test_mapping_is_idempotent() {
        let raw = vec![json!({"NOME": "Ana", "PREMIO": "10,5", "DT_INICIO": "bad"})];
        let ctx = ctx();
        assert_eq!(
            map_policies_with(Some(&raw), &ctx),
            map_policies_with(Some(&raw), &ctx)
        );
    }

    #[test]
    fn test_derived_identity_count() {
        let payload = RawSyncPayload {
            clientes: Some(vec![json!({"CODIGO": "1"}), json!({"NOME": "x"})]),
            seguros: Some(vec![json!({})]),
            ..Default::default()
        };

        let dataset = map_dataset(&payload, &ctx());
        assert!(dataset.loaded);
        assert_eq!(derived_identity_count(&dataset), 2);
    }
}
