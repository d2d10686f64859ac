use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

use crate::models::{Dataset, StatusSeguro};

/// Headline figures of the dashboard screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_clientes: usize,
    pub apolices_ativas: usize,
    /// Claims not yet Liquidado or Negado.
    pub sinistros_abertos: usize,
    /// Sum of total premium over active policies.
    pub premio_ativo_total: f64,
    pub producao_mensal: Vec<MonthlyProduction>,
    pub referencias_orfas: OrphanReferences,
}

/// Production aggregated by issue month (`YYYY-MM`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyProduction {
    pub mes: String,
    pub premio_liquido: f64,
    pub comissao_estimada: f64,
}

/// Foreign references that do not resolve inside the dataset.
/// Reported only; such records are still rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanReferences {
    pub seguros_sem_cliente: usize,
    pub sinistros_sem_seguro: usize,
    pub producao_sem_seguro: usize,
}

impl DashboardStats {
    pub fn from_dataset(data: &Dataset) -> Self {
        let ativos = data
            .seguros
            .iter()
            .filter(|s| s.status == StatusSeguro::Ativo);

        let mut monthly: BTreeMap<String, (f64, f64)> = BTreeMap::new();
        for producao in &data.producao {
            let entry = monthly
                .entry(producao.data_emissao.format("%Y-%m").to_string())
                .or_default();
            entry.0 += producao.premio_liquido;
            entry.1 += producao.comissao_estimada;
        }

        Self {
            total_clientes: data.clientes.len(),
            apolices_ativas: ativos.clone().count(),
            sinistros_abertos: data
                .sinistros
                .iter()
                .filter(|s| !s.status_atual.is_closed())
                .count(),
            premio_ativo_total: ativos.map(|s| s.valor_premio_total).sum(),
            producao_mensal: monthly
                .into_iter()
                .map(|(mes, (premio_liquido, comissao_estimada))| MonthlyProduction {
                    mes,
                    premio_liquido,
                    comissao_estimada,
                })
                .collect(),
            referencias_orfas: OrphanReferences::of(data),
        }
    }
}

impl OrphanReferences {
    pub fn of(data: &Dataset) -> Self {
        let clientes: HashSet<&str> = data.clientes.iter().map(|c| c.id.as_str()).collect();
        let seguros: HashSet<&str> = data.seguros.iter().map(|s| s.codseguro.as_str()).collect();

        Self {
            seguros_sem_cliente: data
                .seguros
                .iter()
                .filter(|s| !clientes.contains(s.cliente_id.as_str()))
                .count(),
            sinistros_sem_seguro: data
                .sinistros
                .iter()
                .filter(|s| !seguros.contains(s.codseguro.as_str()))
                .count(),
            producao_sem_seguro: data
                .producao
                .iter()
                .filter(|p| !seguros.contains(p.codseguro.as_str()))
                .count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_stats_for_demo_data() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        let stats = DashboardStats::from_dataset(&fallback::generate_at(now));

        assert_eq!(stats.total_clientes, 5);
        assert_eq!(stats.apolices_ativas, 4);
        // SIN-002 is Liquidado
        assert_eq!(stats.sinistros_abertos, 1);
        assert_eq!(stats.premio_ativo_total, 2500.0 + 12000.0 + 1500.0 + 5500.0);
        assert!(stats.referencias_orfas.is_empty());

        // PROD-001 issued 100 days earlier, PROD-002 20 days earlier
        assert_eq!(stats.producao_mensal.len(), 2);
        assert_eq!(stats.producao_mensal[0].mes, "2024-03");
        assert_eq!(stats.producao_mensal[0].premio_liquido, 2200.0);
        assert_eq!(stats.producao_mensal[1].mes, "2024-05");
        assert_eq!(stats.producao_mensal[1].comissao_estimada, 1500.0);
    }

    #[test]
    fn test_orphans_are_counted() {
        let mut data = fallback::generate();
        data.seguros[0].cliente_id = "999".to_string();
        data.sinistros[0].codseguro = "missing".to_string();

        let orphans = OrphanReferences::of(&data);
        assert_eq!(orphans.seguros_sem_cliente, 1);
        assert_eq!(orphans.sinistros_sem_seguro, 1);
        assert_eq!(orphans.producao_sem_seguro, 0);
        assert!(data.client_name_for(&data.seguros[0]).is_none());
        assert_eq!(data.client_name_for(&data.seguros[1]), Some("Maria Oliveira"));
    }

    #[test]
    fn test_empty_dataset() {
        let stats = DashboardStats::from_dataset(&Dataset::default());
        assert_eq!(stats.total_clientes, 0);
        assert_eq!(stats.premio_ativo_total, 0.0);
        assert!(stats.producao_mensal.is_empty());
    }
}
