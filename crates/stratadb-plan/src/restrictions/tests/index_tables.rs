use crate::{
    error::RangeError,
    expr::{Atom, Operand, Operator},
    ranges::ClusteringRange,
    restrictions::PlanFlags,
    restrictions::tests::{analyze_indexed, no_options, simple_schema},
    schema::{IndexCandidate, IndexLocality},
    token::Token,
    value::Value,
};
use std::ops::Bound;

fn local_val() -> IndexCandidate {
    IndexCandidate::new("local_val", "val", IndexLocality::Local)
}

fn global_val() -> IndexCandidate {
    IndexCandidate::new("global_val", "val", IndexLocality::Global)
}

#[test]
fn local_index_wins_over_global_on_equal_score() {
    let schema = simple_schema();
    let restrictions = analyze_indexed(
        &schema,
        vec![
            Atom::eq("pk", Operand::int(1)),
            Atom::eq("val", Operand::int(5)),
        ],
        vec![global_val(), local_val()],
        PlanFlags::default(),
    )
    .expect("analysis");

    let chosen = restrictions.chosen_index().expect("index");
    assert_eq!(chosen.candidate.name, "local_val");
    assert_eq!(chosen.driving, Atom::eq("val", Operand::int(5)));
}

#[test]
fn local_index_ranges_fold_the_clustering_prefix_behind_the_indexed_value() {
    let schema = simple_schema();
    let mut restrictions = analyze_indexed(
        &schema,
        vec![
            Atom::eq("pk", Operand::int(1)),
            Atom::eq("ck1", Operand::int(7)),
            Atom::eq("val", Operand::int(5)),
        ],
        vec![local_val()],
        PlanFlags::default(),
    )
    .expect("analysis");

    restrictions.prepare_indexed_local().expect("prepare");
    // Preparation is idempotent for the same locality.
    restrictions.prepare_indexed_local().expect("prepare again");

    let ranges = restrictions
        .local_index_clustering_ranges(&no_options())
        .expect("ranges");
    assert_eq!(
        ranges,
        vec![ClusteringRange::whole_prefix(vec![
            Value::Int(5),
            Value::Int(7),
        ])]
    );
}

#[test]
fn accessor_before_preparation_is_an_internal_error() {
    let schema = simple_schema();
    let restrictions = analyze_indexed(
        &schema,
        vec![Atom::eq("val", Operand::int(5))],
        vec![global_val()],
        PlanFlags::default(),
    )
    .expect("analysis");

    let err = restrictions
        .global_index_clustering_ranges(&no_options(), Token(1))
        .unwrap_err();
    assert!(matches!(err, RangeError::Internal(_)));
}

#[test]
fn wrong_locality_preparation_is_an_internal_error() {
    let schema = simple_schema();
    let mut restrictions = analyze_indexed(
        &schema,
        vec![Atom::eq("val", Operand::int(5))],
        vec![global_val()],
        PlanFlags::default(),
    )
    .expect("analysis");

    assert!(restrictions.prepare_indexed_local().is_err());
    restrictions.prepare_indexed_global().expect("prepare");
    assert!(restrictions.prepare_indexed_local().is_err());
}

#[test]
fn global_ranges_project_back_onto_base_clustering_bounds() {
    let schema = simple_schema();
    let mut restrictions = analyze_indexed(
        &schema,
        vec![
            Atom::eq("pk", Operand::int(1)),
            Atom::eq("ck1", Operand::int(5)),
            Atom::slice("ck2", Operator::Gt, Operand::int(10)),
            Atom::eq("val", Operand::int(3)),
        ],
        vec![global_val()],
        PlanFlags::default(),
    )
    .expect("analysis");

    restrictions.prepare_indexed_global().expect("prepare");

    let token = Token(4242);
    let ranges = restrictions
        .global_index_clustering_ranges(&no_options(), token)
        .expect("index ranges");
    assert_eq!(
        ranges,
        vec![ClusteringRange::new(
            Bound::Excluded(vec![
                Value::Int(4242),
                Value::Int(1),
                Value::Int(5),
                Value::Int(10),
            ]),
            Bound::Included(vec![Value::Int(4242), Value::Int(1), Value::Int(5)]),
        )]
    );

    // Stripping (token, pk) recovers the direct clustering bounds.
    let projected: Vec<_> = ranges
        .iter()
        .map(|range| range.strip_prefix(2))
        .collect();
    let direct = restrictions
        .clustering_bounds(&no_options())
        .expect("direct bounds");
    assert_eq!(projected, direct);
}

#[test]
fn global_ranges_stop_at_the_token_when_the_partition_key_is_open() {
    let schema = simple_schema();
    let mut restrictions = analyze_indexed(
        &schema,
        vec![Atom::eq("val", Operand::int(3))],
        vec![global_val()],
        PlanFlags::default(),
    )
    .expect("analysis");

    restrictions.prepare_indexed_global().expect("prepare");

    let ranges = restrictions
        .global_index_clustering_ranges(&no_options(), Token(9))
        .expect("ranges");
    assert_eq!(
        ranges,
        vec![ClusteringRange::whole_prefix(vec![Value::Int(9)])]
    );
}

#[test]
fn token_restricted_statements_use_the_token_accessor() {
    let schema = simple_schema();
    let mut restrictions = analyze_indexed(
        &schema,
        vec![
            Atom::token(Operator::Gt, Operand::int(100)),
            Atom::eq("val", Operand::int(3)),
        ],
        vec![global_val()],
        PlanFlags::allow_filtering(),
    )
    .expect("analysis");

    restrictions.prepare_indexed_global().expect("prepare");

    let err = restrictions
        .global_index_clustering_ranges(&no_options(), Token(1))
        .unwrap_err();
    assert!(matches!(err, RangeError::Internal(_)));

    let ranges = restrictions
        .global_index_token_clustering_ranges(&no_options())
        .expect("token ranges");
    assert_eq!(
        ranges,
        vec![ClusteringRange::new(
            Bound::Excluded(vec![Value::Int(100)]),
            Bound::Unbounded,
        )]
    );
}

#[test]
fn null_driving_value_yields_no_index_ranges() {
    let schema = simple_schema();
    let mut restrictions = analyze_indexed(
        &schema,
        vec![
            Atom::eq("pk", Operand::int(1)),
            Atom::eq("val", Operand::Marker(0)),
        ],
        vec![local_val()],
        PlanFlags::default(),
    )
    .expect("analysis");

    restrictions.prepare_indexed_local().expect("prepare");

    let options = crate::eval::QueryOptions::new(vec![Value::Null]);
    let ranges = restrictions
        .local_index_clustering_ranges(&options)
        .expect("ranges");
    assert!(ranges.is_empty());
}
