//! Table-driven translation of legacy status/type codes.
//!
//! Each legacy heuristic is a [`CodeTable`]: an ordered list of
//! `(matcher, value)` rules plus an exhaustive default. Codes are
//! normalised (trimmed, upper-cased, accents folded) before matching, and
//! the first matching rule wins.

use crate::models::{
    MotivoProducao, NaturezaSinistro, Ramo, StatusAndamento, StatusParcela, StatusSeguro,
    TipoPessoa,
};

/// How a rule matches a normalised code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeMatch {
    /// Whole code equals the sentinel.
    Exact(&'static str),
    /// Code contains the marker anywhere.
    Contains(&'static str),
}

impl CodeMatch {
    fn matches(&self, normalized: &str) -> bool {
        match self {
            CodeMatch::Exact(sentinel) => normalized == *sentinel,
            CodeMatch::Contains(marker) => normalized.contains(marker),
        }
    }
}

/// Ordered rules with a default for everything else (including absent codes).
#[derive(Debug)]
pub struct CodeTable<T: 'static> {
    pub name: &'static str,
    pub rules: &'static [(CodeMatch, T)],
    pub default: T,
}

impl<T: Copy> CodeTable<T> {
    /// Resolve a raw code. `None` resolves to the default.
    pub fn resolve(&self, raw: Option<&str>) -> T {
        let Some(raw) = raw else {
            return self.default;
        };
        let normalized = normalize_code(raw);
        self.rules
            .iter()
            .find(|(matcher, _)| matcher.matches(&normalized))
            .map(|(_, value)| *value)
            .unwrap_or(self.default)
    }
}

/// Trim, upper-case and fold Portuguese accents so "Análise" and "ANALISE" match.
pub fn normalize_code(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'ç' | 'Ç' => 'C',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

/// "Juridica" when the type code carries the `J` marker ("PJ", "Pessoa Juridica").
pub const PERSON_TYPE: CodeTable<TipoPessoa> = CodeTable {
    name: "person_type",
    rules: &[(CodeMatch::Contains("J"), TipoPessoa::Juridica)],
    default: TipoPessoa::Fisica,
};

/// Only the `C` sentinel is recognised. Expired policies are not derived
/// from the export, so `Vencido` never comes out of this table.
pub const POLICY_STATUS: CodeTable<StatusSeguro> = CodeTable {
    name: "policy_status",
    rules: &[(CodeMatch::Exact("C"), StatusSeguro::Cancelado)],
    default: StatusSeguro::Ativo,
};

pub const BRANCH: CodeTable<Ramo> = CodeTable {
    name: "branch",
    rules: &[
        (CodeMatch::Contains("AUTO"), Ramo::Automovel),
        (CodeMatch::Contains("VIDA"), Ramo::Vida),
        (CodeMatch::Contains("RESID"), Ramo::Residencial),
        (CodeMatch::Contains("EMPRES"), Ramo::Empresarial),
    ],
    default: Ramo::Outros,
};

pub const LOSS_NATURE: CodeTable<NaturezaSinistro> = CodeTable {
    name: "loss_nature",
    rules: &[
        (CodeMatch::Contains("COLIS"), NaturezaSinistro::Colisao),
        (CodeMatch::Contains("ROUBO"), NaturezaSinistro::RouboFurto),
        (CodeMatch::Contains("FURTO"), NaturezaSinistro::RouboFurto),
        (CodeMatch::Contains("INCEND"), NaturezaSinistro::Incendio),
        (CodeMatch::Contains("ALAG"), NaturezaSinistro::Alagamento),
        (CodeMatch::Contains("ENCHENT"), NaturezaSinistro::Alagamento),
        (CodeMatch::Contains("TERCEIR"), NaturezaSinistro::DanosTerceiros),
    ],
    default: NaturezaSinistro::Colisao,
};

pub const CLAIM_STATUS: CodeTable<StatusAndamento> = CodeTable {
    name: "claim_status",
    rules: &[
        (CodeMatch::Contains("ANALISE"), StatusAndamento::EmAnalise),
        (CodeMatch::Contains("PECA"), StatusAndamento::AguardandoPecas),
        (CodeMatch::Contains("LIQUID"), StatusAndamento::Liquidado),
        (CodeMatch::Contains("INDENIZ"), StatusAndamento::Liquidado),
        (CodeMatch::Contains("NEGAD"), StatusAndamento::Negado),
        (CodeMatch::Contains("RECUS"), StatusAndamento::Negado),
    ],
    default: StatusAndamento::Aberto,
};

pub const MOVEMENT_REASON: CodeTable<MotivoProducao> = CodeTable {
    name: "movement_reason",
    rules: &[
        (CodeMatch::Contains("RENOV"), MotivoProducao::Renovacao),
        (CodeMatch::Contains("ENDOS"), MotivoProducao::Endosso),
        (CodeMatch::Contains("CANCEL"), MotivoProducao::Cancelamento),
    ],
    default: MotivoProducao::SeguroNovo,
};

pub const INSTALLMENT_STATUS: CodeTable<StatusParcela> = CodeTable {
    name: "installment_status",
    rules: &[
        (CodeMatch::Contains("PAG"), StatusParcela::Pago),
        (CodeMatch::Contains("ATRAS"), StatusParcela::Atrasado),
    ],
    default: StatusParcela::Pendente,
};
