use super::*;

fn two_variables() -> Vec<Variable> {
    vec![Variable::new("A", "GeneA"), Variable::new("B", "GeneB")]
}

#[test]
fn default_snapshot_is_empty_on_default_layout() {
    let snapshot = ModelSnapshot::default();
    assert_eq!(snapshot.layout_id().as_str(), DEFAULT_LAYOUT);
    assert!(snapshot.variables().is_empty());
    assert!(snapshot.regulations().is_empty());
    assert!(snapshot.layout().is_empty());
    assert_eq!(snapshot.counters(), IdCounters::default());
}

#[test]
fn create_substitutes_only_supplied_fields() {
    let snapshot = ModelSnapshot::create(ModelOverrides {
        variables: Some(two_variables()),
        counters: Some(IdCounters {
            dynamic: 3,
            ..IdCounters::default()
        }),
        ..ModelOverrides::default()
    });

    assert_eq!(snapshot.variables().len(), 2);
    assert!(snapshot.regulations().is_empty());
    assert_eq!(snapshot.counters().dynamic, 3);
    assert_eq!(snapshot.counters().statics, 0);
}

#[test]
fn with_copy_shares_untouched_collections() {
    let original = ModelSnapshot::create(ModelOverrides {
        variables: Some(two_variables()),
        ..ModelOverrides::default()
    });
    let regulation = Regulation::new(
        "A".into(),
        "B".into(),
        false,
        shared::domain::Monotonicity::Dual,
    );

    let next = original.with_regulations(vec![regulation]);

    assert!(next.shares_variables_with(&original));
    assert!(next.shares_layout_with(&original));
    assert!(!next.shares_regulations_with(&original));
    assert!(original.regulations().is_empty(), "original must be untouched");
    assert_eq!(next.regulations().len(), 1);
}

#[test]
fn lookups_find_by_key() {
    let snapshot = ModelSnapshot::create(ModelOverrides {
        variables: Some(two_variables()),
        regulations: Some(vec![Regulation::new(
            "A".into(),
            "B".into(),
            true,
            shared::domain::Monotonicity::Activation,
        )]),
        ..ModelOverrides::default()
    });

    assert!(snapshot.has_variable(&"A".into()));
    assert!(!snapshot.has_variable(&"C".into()));
    assert!(snapshot.regulation(&"A".into(), &"B".into()).is_some());
    assert!(snapshot.regulation(&"B".into(), &"A".into()).is_none());
    assert_eq!(snapshot.regulators_of(&"B".into()).len(), 1);
    assert!(snapshot.regulators_of(&"A".into()).is_empty());
}
