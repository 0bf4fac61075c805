use crate::{
    eval::QueryOptions,
    expr::{Atom, Operand, Operator},
    ranges::{ClusteringRange, PartitionRange},
    restrictions::PlanFlags,
    restrictions::tests::{analyze, no_options, simple_schema, wide_schema},
    token::token_of,
    value::Value,
};
use std::ops::Bound;

#[test]
fn point_prefix_plus_slice_scenario() {
    // pk = 1 AND ck1 = 5 AND ck2 > 10
    let schema = simple_schema();
    let restrictions = analyze(
        &schema,
        vec![
            Atom::eq("pk", Operand::int(1)),
            Atom::eq("ck1", Operand::int(5)),
            Atom::slice("ck2", Operator::Gt, Operand::int(10)),
        ],
        PlanFlags::default(),
    )
    .expect("analysis");

    assert!(!restrictions.is_key_range());
    assert!(!restrictions.need_filtering());
    assert!(!restrictions.clustering_is_all_eq());

    let partitions = restrictions
        .partition_key_ranges(&no_options())
        .expect("partitions");
    assert_eq!(
        partitions,
        vec![PartitionRange::SingleKey {
            key: vec![Value::Int(1)],
            token: token_of(&[Value::Int(1)]),
        }]
    );

    let bounds = restrictions
        .clustering_bounds(&no_options())
        .expect("bounds");
    assert_eq!(
        bounds,
        vec![ClusteringRange::new(
            Bound::Excluded(vec![Value::Int(5), Value::Int(10)]),
            Bound::Included(vec![Value::Int(5)]),
        )]
    );
}

#[test]
fn eq_then_slice_then_nothing_is_valid_without_filtering() {
    let schema = wide_schema();
    let restrictions = analyze(
        &schema,
        vec![
            Atom::eq("p1", Operand::int(1)),
            Atom::eq("p2", Operand::int(2)),
            Atom::eq("c1", Operand::int(5)),
            Atom::slice("c2", Operator::Lte, Operand::int(7)),
        ],
        PlanFlags::default(),
    )
    .expect("analysis");

    assert!(!restrictions.need_filtering());
    assert!(restrictions.has_unrestricted_clustering_columns());
}

#[test]
fn in_values_expand_into_sorted_prefix_ranges() {
    let schema = simple_schema();
    let restrictions = analyze(
        &schema,
        vec![
            Atom::eq("pk", Operand::int(1)),
            Atom::in_list("ck1", vec![Operand::int(2), Operand::int(1)]),
            Atom::eq("ck2", Operand::int(5)),
        ],
        PlanFlags::default(),
    )
    .expect("analysis");

    assert!(restrictions.clustering_key_restrictions_has_in());

    let bounds = restrictions
        .clustering_bounds(&no_options())
        .expect("bounds");
    assert_eq!(
        bounds,
        vec![
            ClusteringRange::whole_prefix(vec![Value::Int(1), Value::Int(5)]),
            ClusteringRange::whole_prefix(vec![Value::Int(2), Value::Int(5)]),
        ]
    );
}

#[test]
fn two_sided_slice_forms_one_interval() {
    let schema = simple_schema();
    let restrictions = analyze(
        &schema,
        vec![
            Atom::eq("pk", Operand::int(1)),
            Atom::slice("ck1", Operator::Gte, Operand::int(1)),
            Atom::slice("ck1", Operator::Lt, Operand::int(9)),
        ],
        PlanFlags::default(),
    )
    .expect("analysis");

    let bounds = restrictions
        .clustering_bounds(&no_options())
        .expect("bounds");
    assert_eq!(
        bounds,
        vec![ClusteringRange::new(
            Bound::Included(vec![Value::Int(1)]),
            Bound::Excluded(vec![Value::Int(9)]),
        )]
    );
}

#[test]
fn inverted_slice_yields_no_ranges() {
    let schema = simple_schema();
    let restrictions = analyze(
        &schema,
        vec![
            Atom::eq("pk", Operand::int(1)),
            Atom::slice("ck1", Operator::Gt, Operand::int(9)),
            Atom::slice("ck1", Operator::Lt, Operand::int(3)),
        ],
        PlanFlags::default(),
    )
    .expect("analysis");

    let bounds = restrictions
        .clustering_bounds(&no_options())
        .expect("bounds");
    assert!(bounds.is_empty());
}

#[test]
fn all_eq_prefix_is_one_whole_prefix_range() {
    let schema = simple_schema();
    let restrictions = analyze(
        &schema,
        vec![
            Atom::eq("pk", Operand::int(1)),
            Atom::eq("ck1", Operand::int(5)),
            Atom::eq("ck2", Operand::int(6)),
        ],
        PlanFlags::default(),
    )
    .expect("analysis");

    assert!(restrictions.clustering_is_all_eq());
    assert!(!restrictions.has_unrestricted_clustering_columns());

    let bounds = restrictions
        .clustering_bounds(&no_options())
        .expect("bounds");
    assert_eq!(
        bounds,
        vec![ClusteringRange::whole_prefix(vec![
            Value::Int(5),
            Value::Int(6),
        ])]
    );
}

#[test]
fn multi_column_slice_translates_to_one_interval() {
    let schema = wide_schema();
    let restrictions = analyze(
        &schema,
        vec![
            Atom::eq("p1", Operand::int(1)),
            Atom::eq("p2", Operand::int(2)),
            Atom::multi(
                vec!["c1", "c2"],
                Operator::Gt,
                Operand::Tuple(vec![Operand::int(1), Operand::int(2)]),
            ),
            Atom::multi(
                vec!["c1"],
                Operator::Lte,
                Operand::Tuple(vec![Operand::int(8)]),
            ),
        ],
        PlanFlags::default(),
    )
    .expect("analysis");

    let bounds = restrictions
        .clustering_bounds(&no_options())
        .expect("bounds");
    assert_eq!(
        bounds,
        vec![ClusteringRange::new(
            Bound::Excluded(vec![Value::Int(1), Value::Int(2)]),
            Bound::Included(vec![Value::Int(8)]),
        )]
    );
}

#[test]
fn multi_column_in_expands_per_tuple() {
    let schema = wide_schema();
    let restrictions = analyze(
        &schema,
        vec![
            Atom::eq("p1", Operand::int(1)),
            Atom::eq("p2", Operand::int(2)),
            Atom::multi(
                vec!["c1", "c2"],
                Operator::In,
                Operand::List(vec![
                    Operand::Tuple(vec![Operand::int(5), Operand::int(6)]),
                    Operand::Tuple(vec![Operand::int(1), Operand::int(2)]),
                ]),
            ),
        ],
        PlanFlags::default(),
    )
    .expect("analysis");

    let bounds = restrictions
        .clustering_bounds(&no_options())
        .expect("bounds");
    assert_eq!(
        bounds,
        vec![
            ClusteringRange::whole_prefix(vec![Value::Int(1), Value::Int(2)]),
            ClusteringRange::whole_prefix(vec![Value::Int(5), Value::Int(6)]),
        ]
    );
}

#[test]
fn null_clustering_equality_yields_no_ranges_and_sets_the_flag() {
    let schema = simple_schema();
    let restrictions = analyze(
        &schema,
        vec![
            Atom::eq("pk", Operand::int(1)),
            Atom::eq("ck1", Operand::Marker(0)),
        ],
        PlanFlags::default(),
    )
    .expect("analysis");

    let options = QueryOptions::new(vec![Value::Null]);
    assert!(restrictions
        .range_or_slice_eq_null(&options)
        .expect("flag"));
    let bounds = restrictions.clustering_bounds(&options).expect("bounds");
    assert!(bounds.is_empty());
}

#[test]
fn gap_with_allow_filtering_still_translates_the_usable_prefix() {
    let schema = wide_schema();
    let restrictions = analyze(
        &schema,
        vec![
            Atom::eq("p1", Operand::int(1)),
            Atom::eq("p2", Operand::int(2)),
            Atom::eq("c1", Operand::int(5)),
            Atom::eq("c3", Operand::int(9)),
        ],
        PlanFlags::allow_filtering(),
    )
    .expect("analysis");

    assert!(restrictions.need_filtering());

    // c3 sits past the gap; only c1 narrows the range.
    let bounds = restrictions
        .clustering_bounds(&no_options())
        .expect("bounds");
    assert_eq!(
        bounds,
        vec![ClusteringRange::whole_prefix(vec![Value::Int(5)])]
    );
}
