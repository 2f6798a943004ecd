// src/services/revision_gate.rs
//
// Quantas revisões um pedido pode receber. O crédito estruturado do
// snapshot manda; snapshots antigos caem no texto das features e pedidos
// sem snapshot caem na lista de planos conhecidos.

use crate::models::order::{Order, PlanSnapshot};

/// Planos legados (sem snapshot) e seus créditos.
const LEGACY_PLAN_CREDITS: &[(&str, i32)] = &[("jasmim", 2), ("ipê", 1), ("ipe", 1)];

pub fn max_revisions(order: &Order) -> i32 {
    match &order.plan_snapshot {
        Some(snapshot) => snapshot_credits(snapshot),
        None => legacy_credits(&order.plan_name),
    }
}

fn snapshot_credits(snapshot: &PlanSnapshot) -> i32 {
    if let Some(credits) = snapshot.revision_credits {
        return credits.max(0);
    }

    credits_from_features(&snapshot.features)
}

/// Créditos que o texto das features promete: nenhum sem menção a revisão,
/// 2 com "2 rodadas", 1 nos demais casos.
pub fn credits_from_features(features: &[String]) -> i32 {
    let text = features.join("\n").to_lowercase();
    if !text.contains("revis") {
        0
    } else if text.contains("2 rodadas") {
        2
    } else {
        1
    }
}

/// Um crédito explícito não pode desmentir o texto exibido ao cliente.
/// Texto genérico de revisão aceita qualquer quantidade a partir de 1.
pub fn credits_match_features(features: &[String], credits: i32) -> bool {
    match credits_from_features(features) {
        1 => credits >= 1,
        promised => credits == promised,
    }
}

fn legacy_credits(plan_name: &str) -> i32 {
    let name = plan_name.to_lowercase();
    LEGACY_PLAN_CREDITS
        .iter()
        .find(|(plan, _)| name.contains(plan))
        .map(|(_, credits)| *credits)
        .unwrap_or(0)
}

/// `submitted` conta todas as revisões do pedido, resolvidas ou não.
pub fn can_request_revision(order: &Order, submitted: i64) -> bool {
    submitted < i64::from(max_revisions(order))
}

pub fn revisions_remaining(order: &Order, submitted: i64) -> i32 {
    let remaining = i64::from(max_revisions(order)) - submitted;
    remaining.clamp(0, i64::from(i32::MAX)) as i32
}
