//! Plain-text rendering of rounds and loading schemes.

use std::fmt::Write;

use blast_core::classify::BlastRole;
use blast_core::explosives::{ExplosiveAmount, ExplosiveKind, LoadingScheme};
use blast_core::round::LoadingFactorStatus;
use blast_core::Round;

const RULE: &str = "═══════════════════════════════════════";

fn status_icon(status: LoadingFactorStatus) -> &'static str {
    match status {
        LoadingFactorStatus::NearTarget => "[OK]",
        LoadingFactorStatus::AboveTarget => "[HIGH]",
        LoadingFactorStatus::BelowTarget => "[LOW]",
    }
}

fn amount_line(out: &mut String, label: &str, amount: &ExplosiveAmount) {
    let count = match amount.cartridges {
        Some(c) => format!("{:>7.1} cart.", c),
        None => "     bulk   ".to_string(),
    };
    let _ = writeln!(
        out,
        "  {:<10} {}  {:>8.2} kg  {:>8.2} kg eq",
        label, count, amount.real_kg, amount.equivalent_kg
    );
}

/// Full report for one round.
pub fn round_report(round: &Round, show_sequence: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "  ROUND {}", round.id);
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out);
    let _ = writeln!(out, "Contract: {}", round.metadata.contract);
    let _ = writeln!(out, "Site:     {}", round.metadata.site);
    if !round.metadata.notes.is_empty() {
        let _ = writeln!(out, "Notes:    {}", round.metadata.notes);
    }
    let _ = writeln!(out, "Created:  {}", round.created.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(out);
    let _ = writeln!(out, "Input:");
    let _ = writeln!(
        out,
        "  Section:  {:.2} x {:.2} m, advance {:.2} m",
        round.section.width_m, round.section.height_m, round.section.length_m
    );
    let _ = writeln!(out, "  Diameter: {:.0} mm", round.diameter_mm);
    let _ = writeln!(out, "  Model:    {} ({} rock)", round.burden_model, round.rock_class);
    let _ = writeln!(out, "  Burden:   {:.3} m", round.burden_m);
    let _ = writeln!(out, "  Spacing:  {:.3} m", round.spacing_m);
    let _ = writeln!(out);
    let _ = writeln!(out, "Geometry:");
    let _ = writeln!(out, "  Area   = {:.2} m²", round.area_m2);
    let _ = writeln!(out, "  Volume = {:.2} m³ (bulked)", round.volume_m3);
    let _ = writeln!(out);
    let _ = writeln!(out, "Holes: {}", round.hole_count());
    for role in BlastRole::ALL {
        let count = round.role_counts.get(&role).copied().unwrap_or(0);
        let _ = writeln!(out, "  {:<12} {:>4}", role.display_name(), count);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Explosives:");
    for kind in ExplosiveKind::ALL {
        amount_line(&mut out, kind.display_name(), round.totals.amount(kind));
    }
    let _ = writeln!(
        out,
        "  Total      {:.2} kg real, {:.2} kg eq",
        round.totals.total_real_kg(),
        round.totals.total_equivalent_kg
    );

    if show_sequence {
        let _ = writeln!(out);
        let _ = writeln!(out, "Firing sequence:");
        let _ = writeln!(out, "  {:>4}  {:<12} {:>7} {:>7} {:>8}", "#", "Role", "x (m)", "y (m)", "t (ms)");
        for s in &round.sequence {
            let _ = writeln!(
                out,
                "  {:>4}  {:<12} {:>7.2} {:>7.2} {:>8}",
                s.order,
                s.hole.role.display_name(),
                s.hole.x,
                s.hole.y,
                s.delay_ms
            );
        }
    }

    let a = &round.assessment;
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(
        out,
        "  POWDER FACTOR: {:.3} kg eq/m³ {} (target {:.2}, Δ {:+.3})",
        round.loading_factor(),
        status_icon(a.status),
        a.target_kg_eq_per_m3,
        a.delta
    );
    let _ = writeln!(out, "  {}", a.status.description());
    let _ = writeln!(out, "{}", RULE);
    out
}

/// One summary line per round, for listings.
pub fn round_summary(round: &Round) -> String {
    format!(
        "{}  {}  {:<16} {:<16} {:>4} holes  {:.3} kg eq/m³",
        round.id,
        round.created.format("%Y-%m-%d"),
        round.metadata.contract,
        round.metadata.site,
        round.hole_count(),
        round.loading_factor()
    )
}

/// Table of charges per role.
pub fn scheme_table(scheme: &LoadingScheme) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:<12} {:>10} {:>10} {:>10}",
        "Role", "Emulsion", "Booster", "ANFO (kg)"
    );
    for role in BlastRole::ALL {
        let c = scheme.charge(role);
        let _ = writeln!(
            out,
            "  {:<12} {:>10.2} {:>10.2} {:>10.2}",
            role.display_name(),
            c.emulsion_cartridges,
            c.booster_cartridges,
            c.anfo_kg
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use blast_core::geometry::{BurdenModel, RockClass, Section};
    use blast_core::round::RoundMetadata;
    use blast_core::{compute_round, DesignConfig, RoundInput};

    fn sample_round() -> Round {
        let input = RoundInput {
            section: Section::new(5.2, 6.1, 3.5),
            burden_model: BurdenModel::Manual,
            rock_class: RockClass::Hard,
            diameter_mm: 45.0,
            burden_m: Some(0.6),
            spacing_m: Some(0.8),
            metadata: RoundMetadata::new("CT-2031", "Norte").with_notes("first round"),
        };
        compute_round(&input, &LoadingScheme::default(), &DesignConfig::default()).unwrap()
    }

    #[test]
    fn test_report_contents() {
        let round = sample_round();
        let text = round_report(&round, false);
        assert!(text.contains("CT-2031"));
        assert!(text.contains("first round"));
        assert!(text.contains("Holes: 84"));
        assert!(text.contains("POWDER FACTOR"));
        assert!(text.contains("ANFO"));
        assert!(text.contains("bulk"));
        assert!(!text.contains("Firing sequence"));

        let with_seq = round_report(&round, true);
        assert!(with_seq.contains("Firing sequence"));
    }

    #[test]
    fn test_summary_and_scheme() {
        let round = sample_round();
        assert!(round_summary(&round).contains("84 holes"));

        let table = scheme_table(&LoadingScheme::default());
        assert!(table.contains("Cut column"));
        assert_eq!(table.lines().count(), 1 + BlastRole::ALL.len());
    }
}
