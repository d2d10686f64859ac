//! Canned demonstration dataset.
//!
//! Used as the recovery path when a sync fails and directly by callers
//! that want demo content. All dates are offsets from the supplied clock,
//! and every foreign reference resolves inside the generated set.

use chrono::{DateTime, Duration, Utc};

use crate::models::*;

/// Label of a dataset produced by [`generate`] when used standalone.
pub const DEMO_LABEL: &str = "Dados de Demonstração";

/// Demo dataset relative to the current time.
pub fn generate() -> Dataset {
    generate_at(Utc::now())
}

/// Demo dataset relative to `now`. Identical output for identical `now`.
pub fn generate_at(now: DateTime<Utc>) -> Dataset {
    let ago = |days: i64| now - Duration::days(days);
    let ahead = |days: i64| now + Duration::days(days);

    let clientes = vec![
        cliente(
            "1",
            "João Silva",
            "123.456.789-00",
            "joao@email.com",
            "(11) 99999-9999",
            TipoPessoa::Fisica,
        ),
        cliente(
            "2",
            "Maria Oliveira",
            "987.654.321-00",
            "maria@empresa.com",
            "(21) 98888-8888",
            TipoPessoa::Juridica,
        ),
        cliente(
            "3",
            "Carlos Souza",
            "456.789.123-00",
            "carlos@email.com",
            "(31) 97777-7777",
            TipoPessoa::Fisica,
        ),
        cliente(
            "4",
            "Tech Solutions Ltda",
            "12.345.678/0001-90",
            "contato@techsol.com",
            "(11) 3030-3030",
            TipoPessoa::Juridica,
        ),
        cliente(
            "5",
            "Ana Pereira",
            "321.654.987-00",
            "ana@email.com",
            "(41) 96666-6666",
            TipoPessoa::Fisica,
        ),
    ];

    let seguros = vec![
        Seguro {
            codseguro: "1001".to_string(),
            cliente_id: "1".to_string(),
            seguradora_id: "PORTO".to_string(),
            produtor_id: "CORRETOR1".to_string(),
            ramo: Ramo::Automovel,
            numero_apolice: "001.234.567".to_string(),
            vigencia_inicio: ago(100),
            vigencia_fim: ahead(265),
            item_segurado: "Chevrolet Onix 2022 Placa ABC-1234".to_string(),
            valor_premio_total: 2500.00,
            status: StatusSeguro::Ativo,
        },
        Seguro {
            codseguro: "1002".to_string(),
            cliente_id: "2".to_string(),
            seguradora_id: "AZUL".to_string(),
            produtor_id: "CORRETOR1".to_string(),
            ramo: Ramo::Empresarial,
            numero_apolice: "002.888.999".to_string(),
            vigencia_inicio: ago(20),
            vigencia_fim: ahead(345),
            item_segurado: "Escritório Central - Av. Paulista".to_string(),
            valor_premio_total: 12000.00,
            status: StatusSeguro::Ativo,
        },
        Seguro {
            codseguro: "1003".to_string(),
            cliente_id: "3".to_string(),
            seguradora_id: "TOKIO".to_string(),
            produtor_id: "CORRETOR2".to_string(),
            ramo: Ramo::Vida,
            numero_apolice: "003.555.444".to_string(),
            vigencia_inicio: ago(400),
            vigencia_fim: ago(35),
            item_segurado: "Vida Individual - Capital 500k".to_string(),
            valor_premio_total: 800.00,
            status: StatusSeguro::Vencido,
        },
        Seguro {
            codseguro: "1004".to_string(),
            cliente_id: "4".to_string(),
            seguradora_id: "ALLIANZ".to_string(),
            produtor_id: "CORRETOR1".to_string(),
            ramo: Ramo::Residencial,
            numero_apolice: "004.111.222".to_string(),
            vigencia_inicio: ago(10),
            vigencia_fim: ahead(355),
            item_segurado: "Apartamento Jardins".to_string(),
            valor_premio_total: 1500.00,
            status: StatusSeguro::Ativo,
        },
        Seguro {
            codseguro: "1005".to_string(),
            cliente_id: "5".to_string(),
            seguradora_id: "PORTO".to_string(),
            produtor_id: "CORRETOR2".to_string(),
            ramo: Ramo::Automovel,
            numero_apolice: "005.333.777".to_string(),
            vigencia_inicio: ago(150),
            vigencia_fim: ahead(215),
            item_segurado: "Jeep Compass 2023".to_string(),
            valor_premio_total: 5500.00,
            status: StatusSeguro::Ativo,
        },
    ];

    let sinistros = vec![
        CabSinistro {
            id: "SIN-001".to_string(),
            codseguro: "1001".to_string(),
            data_ocorrencia: ago(15),
            data_aviso: ago(14),
            natureza: NaturezaSinistro::Colisao,
            resumo: "Batida traseira no semáforo".to_string(),
            status_atual: StatusAndamento::AguardandoPecas,
            andamentos: vec![
                andamento("A1", ago(14), "Aviso de Sinistro", StatusAndamento::Aberto),
                andamento("A2", ago(10), "Vistoria Realizada", StatusAndamento::EmAnalise),
                andamento(
                    "A3",
                    ago(2),
                    "Peças Solicitadas à Fábrica",
                    StatusAndamento::AguardandoPecas,
                ),
            ],
            terceiros: vec![Terceiro {
                id: "T1".to_string(),
                nome: "Roberto Alves".to_string(),
                veiculo: Some("Fiat Uno".to_string()),
                contato: "9999-9999".to_string(),
            }],
        },
        CabSinistro {
            id: "SIN-002".to_string(),
            codseguro: "1005".to_string(),
            data_ocorrencia: ago(60),
            data_aviso: ago(59),
            natureza: NaturezaSinistro::RouboFurto,
            resumo: "Furto qualificado em estacionamento".to_string(),
            status_atual: StatusAndamento::Liquidado,
            andamentos: vec![
                andamento("B1", ago(59), "Abertura", StatusAndamento::Aberto),
                andamento("B2", ago(40), "Indenização Paga", StatusAndamento::Liquidado),
            ],
            terceiros: vec![],
        },
    ];

    let producao = vec![
        CabProducao {
            id: "PROD-001".to_string(),
            codseguro: "1001".to_string(),
            motivo: MotivoProducao::SeguroNovo,
            data_emissao: ago(100),
            premio_liquido: 2200.00,
            comissao_estimada: 440.00,
            parcelas: vec![
                parcela("P1", 1, 4, 625.00, ago(70), StatusParcela::Pago),
                parcela("P2", 2, 4, 625.00, ago(40), StatusParcela::Pago),
                parcela("P3", 3, 4, 625.00, ago(10), StatusParcela::Pago),
                parcela("P4", 4, 4, 625.00, ahead(20), StatusParcela::Pendente),
            ],
        },
        CabProducao {
            id: "PROD-002".to_string(),
            codseguro: "1002".to_string(),
            motivo: MotivoProducao::Renovacao,
            data_emissao: ago(20),
            premio_liquido: 10000.00,
            comissao_estimada: 1500.00,
            parcelas: vec![parcela(
                "P5",
                1,
                1,
                12000.00,
                ahead(10),
                StatusParcela::Pendente,
            )],
        },
    ];

    Dataset {
        clientes,
        seguros,
        sinistros,
        producao,
        loaded: true,
        filename: Some(DEMO_LABEL.to_string()),
    }
}

fn cliente(
    id: &str,
    nome: &str,
    cpf_cnpj: &str,
    email: &str,
    telefone: &str,
    tipo: TipoPessoa,
) -> Cliente {
    Cliente {
        id: id.to_string(),
        nome: nome.to_string(),
        cpf_cnpj: cpf_cnpj.to_string(),
        email: email.to_string(),
        telefone: telefone.to_string(),
        tipo,
    }
}

fn andamento(
    id: &str,
    data: DateTime<Utc>,
    descricao: &str,
    status: StatusAndamento,
) -> Andamento {
    Andamento {
        id: id.to_string(),
        data,
        descricao: descricao.to_string(),
        status,
    }
}

fn parcela(
    id: &str,
    numero_parcela: u32,
    total_parcelas: u32,
    valor: f64,
    vencimento: DateTime<Utc>,
    status: StatusParcela,
) -> Parcela {
    Parcela {
        id: id.to_string(),
        numero_parcela,
        total_parcelas,
        valor,
        vencimento,
        status,
    }
}
