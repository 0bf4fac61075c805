use crate::{
    expr::{Atom, Operand, Operator},
    restrictions::PlanFlags,
    restrictions::tests::{analyze_indexed, no_options, simple_schema},
    schema::{IndexCandidate, IndexLocality},
};

fn atoms() -> Vec<Atom> {
    vec![
        Atom::eq("pk", Operand::int(1)),
        Atom::in_list("ck1", vec![Operand::int(3), Operand::int(2)]),
        Atom::slice("ck2", Operator::Lt, Operand::int(10)),
        Atom::eq("val", Operand::int(5)),
    ]
}

fn candidates() -> Vec<IndexCandidate> {
    vec![
        IndexCandidate::new("g_val", "val", IndexLocality::Global),
        IndexCandidate::new("l_val", "val", IndexLocality::Local),
    ]
}

#[test]
fn repeated_analysis_is_identical() {
    let schema = simple_schema();
    let first = analyze_indexed(&schema, atoms(), candidates(), PlanFlags::default())
        .expect("first analysis");
    let second = analyze_indexed(&schema, atoms(), candidates(), PlanFlags::default())
        .expect("second analysis");

    assert_eq!(first.is_key_range(), second.is_key_range());
    assert_eq!(first.need_filtering(), second.need_filtering());
    assert_eq!(first.chosen_index(), second.chosen_index());
    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(
        first.partition_key_ranges(&no_options()).expect("ranges"),
        second.partition_key_ranges(&no_options()).expect("ranges"),
    );
    assert_eq!(
        first.clustering_bounds(&no_options()).expect("bounds"),
        second.clustering_bounds(&no_options()).expect("bounds"),
    );
}

#[test]
fn candidate_order_does_not_change_the_choice() {
    let schema = simple_schema();
    let forward = analyze_indexed(&schema, atoms(), candidates(), PlanFlags::default())
        .expect("forward");
    let mut reversed_candidates = candidates();
    reversed_candidates.reverse();
    let reversed = analyze_indexed(&schema, atoms(), reversed_candidates, PlanFlags::default())
        .expect("reversed");

    let name = |r: &crate::restrictions::StatementRestrictions| {
        r.chosen_index().map(|chosen| chosen.candidate.name.clone())
    };
    assert_eq!(name(&forward), name(&reversed));
    assert_eq!(name(&forward), Some("l_val".to_string()));
}
