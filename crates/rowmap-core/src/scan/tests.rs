use crate::{
    error::{ErrorClass, MapError, SchemaError},
    obs::{MetricsEvent, MetricsSink, ScanKind, ScanTraceEvent, ScanTraceSink},
    registry::Registry,
    row::{IterRows, MemoryRowsError},
    scan::{ScanState, materialize},
    test_support::{Address, Deed, Employee, Holder, Home, Person, User, mapper, row, rows},
    traits::Entity,
    value::Value,
};
use rowmap_derive::Entity;
use std::{io, sync::Mutex};

///
/// Team
/// optional one-to-many towards `User`
///

#[derive(Clone, Debug, Default, Entity, PartialEq)]
#[mapper(name = "team")]
struct Team {
    #[mapper(primary_key = "team_id")]
    team_id: i64,
    #[mapper(relation)]
    members: Option<Vec<User>>,
}

///
/// Account
/// carries a field with no column
///

#[derive(Clone, Debug, Default, Entity, PartialEq)]
#[mapper(name = "account")]
struct Account {
    #[mapper(primary_key = "account_id")]
    account_id: i64,
    #[mapper(column = "name")]
    name: String,
    #[mapper(column = "tags")]
    tags: Vec<String>,
    note: String,
    #[mapper(relation)]
    owners: Vec<User>,
}

fn address_row(address_id: i64, street: &str, user: Option<(i64, &str)>) -> crate::row::Row {
    let (user_id, name) = match user {
        Some((id, name)) => (Value::Int(id), Value::from(name)),
        None => (Value::Null, Value::Null),
    };

    row([
        ("address_id", Value::Int(address_id)),
        ("street", Value::from(street)),
        ("user_id", user_id),
        ("name", name),
    ])
}

//
// map_one
//

#[test]
fn empty_result_is_no_rows_and_leaves_dest() {
    let mut dest = User::new(9, "keep");

    let err = mapper().map_one(rows([]), &mut dest).unwrap_err();

    assert!(err.is_no_rows());
    assert_eq!(err.to_string(), "no rows found");
    assert_eq!(dest, User::new(9, "keep"));
}

#[test]
fn single_row_maps_every_column() {
    let mut dest = User::default();

    mapper()
        .map_one(
            rows([row([("user_id", Value::Int(1)), ("name", Value::from("alice"))])]),
            &mut dest,
        )
        .unwrap();

    assert_eq!(dest, User::new(1, "alice"));
}

#[test]
fn map_one_writes_over_the_existing_destination() {
    let mut dest = Account {
        account_id: 0,
        name: "kept".to_string(),
        tags: vec!["old".to_string()],
        note: "untouched".to_string(),
        owners: vec![User::new(9, "prior")],
    };

    mapper()
        .map_one(
            rows([row([
                ("account_id", Value::Int(1)),
                ("name", Value::Null),
                ("tags", Value::from("new")),
                ("user_id", Value::Int(2)),
            ])]),
            &mut dest,
        )
        .unwrap();

    assert_eq!(dest.account_id, 1);
    assert_eq!(dest.name, "kept");
    assert_eq!(dest.tags, ["old", "new"]);
    assert_eq!(dest.note, "untouched");
    assert_eq!(dest.owners, [User::new(9, "prior"), User::new(2, "")]);
}

#[test]
fn one_starts_from_default() {
    let account: Account = mapper()
        .one(rows([row([
            ("account_id", Value::Int(1)),
            ("user_id", Value::Null),
        ])]))
        .unwrap();

    assert_eq!(
        account,
        Account {
            account_id: 1,
            ..Account::default()
        }
    );
}

#[test]
fn null_column_keeps_default() {
    let user: User = mapper()
        .one(rows([row([("user_id", Value::Int(1)), ("name", Value::Null)])]))
        .unwrap();

    assert_eq!(user, User::new(1, ""));
}

#[test]
fn unmapped_columns_are_ignored() {
    let user: User = mapper()
        .one(rows([row([
            ("user_id", Value::Int(1)),
            ("name", Value::from("bob")),
            ("ignored", Value::Bool(true)),
        ])]))
        .unwrap();

    assert_eq!(user, User::new(1, "bob"));
}

#[test]
fn one_to_many_accumulates_without_duplicates() {
    let address: Address = mapper()
        .one(rows([
            address_row(1, "Main", Some((1, "a"))),
            address_row(1, "Main", Some((2, "b"))),
            address_row(1, "Main", Some((1, "a"))),
        ]))
        .unwrap();

    assert_eq!(address.address_id, 1);
    assert_eq!(address.street, "Main");
    assert_eq!(address.owners, [User::new(1, "a"), User::new(2, "b")]);
}

#[test]
fn one_to_one_with_two_children_is_too_many_rows() {
    let mut dest = Deed::default();

    let err = mapper()
        .map_one(
            rows([
                row([("address_id", Value::Int(1)), ("user_id", Value::Int(1))]),
                row([("address_id", Value::Int(1)), ("user_id", Value::Int(2))]),
            ]),
            &mut dest,
        )
        .unwrap_err();

    assert!(matches!(err, MapError::TooManyRows { entity: "user" }));
    assert_eq!(err.to_string(), "too many rows for entity(name=user)");
    assert_eq!(dest, Deed::default());
}

#[test]
fn one_to_one_repeated_child_is_merged() {
    let deed: Deed = mapper()
        .one(rows([
            row([("address_id", Value::Int(1)), ("user_id", Value::Int(5))]),
            row([("address_id", Value::Int(1)), ("user_id", Value::Int(5))]),
        ]))
        .unwrap();

    assert_eq!(deed.owner.map(|u| u.user_id), Some(5));
}

#[test]
fn two_distinct_roots_in_map_one_is_too_many_rows() {
    let err = mapper()
        .one::<User, _>(rows([
            row([("user_id", Value::Int(1))]),
            row([("user_id", Value::Int(2))]),
        ]))
        .unwrap_err();

    assert!(matches!(err, MapError::TooManyRows { entity: "user" }));
    assert_eq!(err.class(), ErrorClass::Cardinality);
}

#[test]
fn null_related_key_leaves_relation_empty() {
    let address: Address = mapper()
        .one(rows([address_row(3, "Side", None)]))
        .unwrap();

    assert!(address.owners.is_empty());

    let team: Team = mapper()
        .one(rows([row([
            ("team_id", Value::Int(1)),
            ("user_id", Value::Null),
        ])]))
        .unwrap();
    assert_eq!(team.members, None);
}

#[test]
fn optional_collection_allocates_on_first_child() {
    let team: Team = mapper()
        .one(rows([
            row([("team_id", Value::Int(1)), ("user_id", Value::Int(4))]),
            row([("team_id", Value::Int(1)), ("user_id", Value::Int(5))]),
        ]))
        .unwrap();

    let ids: Vec<_> = team
        .members
        .unwrap_or_default()
        .into_iter()
        .map(|u| u.user_id)
        .collect();
    assert_eq!(ids, [4, 5]);
}

#[test]
fn null_root_key_is_skipped() {
    let users: Vec<User> = mapper()
        .many(rows([
            row([("user_id", Value::Null)]),
            row([("user_id", Value::Int(2))]),
        ]))
        .unwrap();

    assert_eq!(users, [User::new(2, "")]);
}

//
// map_many
//

#[test]
fn map_many_keeps_first_seen_order_and_dedups() {
    let mut dest = vec![User::new(99, "stale")];

    mapper()
        .map_many(
            rows([
                row([("user_id", Value::Int(2)), ("name", Value::from("b"))]),
                row([("user_id", Value::Int(1)), ("name", Value::from("a"))]),
                row([("user_id", Value::Int(2)), ("name", Value::from("ignored"))]),
            ]),
            &mut dest,
        )
        .unwrap();

    assert_eq!(dest, [User::new(2, "b"), User::new(1, "a")]);
}

#[test]
fn map_many_on_empty_source_is_empty() {
    let mut dest = vec![User::new(1, "stale")];

    mapper().map_many(rows([]), &mut dest).unwrap();

    assert!(dest.is_empty());
}

#[test]
fn map_many_nests_children_per_root() {
    let addresses: Vec<Address> = mapper()
        .many(rows([
            address_row(1, "Main", Some((1, "a"))),
            address_row(2, "Side", Some((1, "a"))),
            address_row(1, "Main", Some((2, "b"))),
        ]))
        .unwrap();

    assert_eq!(addresses.len(), 2);
    assert_eq!(addresses[0].owners, [User::new(1, "a"), User::new(2, "b")]);
    assert_eq!(addresses[1].owners, [User::new(1, "a")]);
}

#[test]
fn signed_and_unsigned_keys_identify_the_same_entity() {
    let users: Vec<User> = mapper()
        .many(rows([
            row([("user_id", Value::Int(7))]),
            row([("user_id", Value::Uint(7))]),
        ]))
        .unwrap();

    assert_eq!(users.len(), 1);
}

#[test]
fn mutually_referential_graph_terminates() {
    let people: Vec<Person> = mapper()
        .many(rows([
            row([("person_id", Value::Int(1)), ("home_id", Value::Int(10))]),
            row([("person_id", Value::Int(2)), ("home_id", Value::Int(10))]),
        ]))
        .unwrap();

    assert_eq!(people.len(), 2);

    let home = people[0].home.as_deref().unwrap();
    assert_eq!(home.home_id, 10);
    let residents: Vec<_> = home.residents.iter().map(|p| p.person_id).collect();
    assert_eq!(residents, [1, 2]);

    // the root is revisited on its own path with columns only
    assert!(home.residents[0].home.is_none());
}

#[test]
fn home_roots_see_all_residents() {
    let homes: Vec<Home> = mapper()
        .many(rows([
            row([("person_id", Value::Int(1)), ("home_id", Value::Int(10))]),
            row([("person_id", Value::Int(2)), ("home_id", Value::Int(10))]),
        ]))
        .unwrap();

    assert_eq!(homes.len(), 1);
    assert_eq!(homes[0].residents.len(), 2);
}

//
// descriptor memo
//

#[test]
fn descriptors_are_fetched_once_per_type_and_scan() {
    let registry = Registry::new();
    let mut state = ScanState::new(&registry, false);

    let mut root = None;
    for user_id in 1..=4 {
        let row = address_row(1, "Main", Some((user_id, "u")));
        let found = materialize::<Address>(&mut state, &row).unwrap().unwrap();
        root.get_or_insert(found.node);
    }
    assert_eq!(state.descriptors.misses(), 2);

    let node = root.unwrap();
    let address = state.assembler().assemble::<Address>(node).unwrap();

    assert_eq!(address.owners.len(), 4);
    assert_eq!(state.descriptors.misses(), 2);
}

//
// errors
//

#[test]
fn missing_key_column_is_reported() {
    let err = mapper()
        .one::<User, _>(rows([row([("name", Value::from("x"))])]))
        .unwrap_err();

    assert!(matches!(
        err,
        MapError::MissingKeyColumn {
            entity: "user",
            column: "user_id",
        }
    ));
    assert_eq!(
        err.to_string(),
        "no key field found in values for entity(name=user): missing column 'user_id'"
    );
}

#[test]
fn missing_related_key_column_is_reported() {
    let err = mapper()
        .one::<Address, _>(rows([row([("address_id", Value::Int(1))])]))
        .unwrap_err();

    assert!(matches!(
        err,
        MapError::MissingKeyColumn {
            entity: "user",
            ..
        }
    ));
}

#[test]
fn coercion_failure_names_entity_and_column() {
    let err = mapper()
        .one::<User, _>(rows([row([
            ("user_id", Value::Int(1)),
            ("name", Value::Int(5)),
        ])]))
        .unwrap_err();

    assert!(matches!(
        err,
        MapError::Coercion {
            entity: "user",
            column: "name",
            ..
        }
    ));
    assert_eq!(err.class(), ErrorClass::Coercion);
}

#[test]
fn unkeyable_key_is_a_coercion_error() {
    let err = mapper()
        .one::<User, _>(rows([row([("user_id", Value::opaque(1_u8))])]))
        .unwrap_err();

    assert!(matches!(
        err,
        MapError::Coercion {
            column: "user_id",
            ..
        }
    ));
}

#[test]
fn schema_error_surfaces_before_rows_are_read() {
    let mut source = rows([row([("holder_id", Value::Int(1))])]);

    let err = mapper().one::<Holder, _>(&mut source).unwrap_err();

    assert!(matches!(err, MapError::Schema(SchemaError::Relation { .. })));
    assert_eq!(source.remaining(), 1);
    assert!(source.is_closed());
}

#[test]
fn direct_self_relation_fails_the_scan() {
    let err = mapper()
        .one::<Employee, _>(rows([row([("employee_id", Value::Int(1))])]))
        .unwrap_err();

    assert!(matches!(
        err,
        MapError::Schema(SchemaError::SelfRelation {
            entity: "employee",
            field: "manager",
        })
    ));
    assert_eq!(err.class(), ErrorClass::Schema);
}

#[test]
fn upstream_error_passes_through_and_closes_source() {
    let mut source = rows([
        row([("user_id", Value::Int(1))]),
        row([("user_id", Value::Int(2))]),
    ])
    .fail_at(1);

    let err = mapper().many::<User, _>(&mut source).unwrap_err();

    assert_eq!(
        err.upstream_ref::<MemoryRowsError>(),
        Some(&MemoryRowsError::Injected { index: 1 })
    );
    assert_eq!(err.to_string(), "injected failure at row 1");
    assert!(source.is_closed());
}

#[test]
fn source_is_closed_after_success() {
    let mut source = rows([row([("user_id", Value::Int(1))])]);

    mapper().one::<User, _>(&mut source).unwrap();

    assert!(source.is_closed());
}

#[test]
fn iterator_source_errors_are_passed_through() {
    let source = IterRows::new(
        vec![
            Ok(row([("user_id", Value::Int(1))])),
            Err(io::Error::other("cursor lost")),
        ]
        .into_iter(),
    );

    let err = mapper().many::<User, _>(source).unwrap_err();

    assert_eq!(err.class(), ErrorClass::Upstream);
    assert_eq!(
        err.upstream_ref::<io::Error>().map(ToString::to_string),
        Some("cursor lost".to_string())
    );
}

//
// observability
//

struct RecordingMetrics(Mutex<Vec<MetricsEvent>>);

impl RecordingMetrics {
    fn leak() -> &'static Self {
        Box::leak(Box::new(Self(Mutex::new(Vec::new()))))
    }

    fn events(&self) -> Vec<MetricsEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl MetricsSink for RecordingMetrics {
    fn record(&self, event: MetricsEvent) {
        self.0.lock().unwrap().push(event);
    }
}

struct RecordingTrace(Mutex<Vec<ScanTraceEvent>>);

impl RecordingTrace {
    fn leak() -> &'static Self {
        Box::leak(Box::new(Self(Mutex::new(Vec::new()))))
    }

    fn events(&self) -> Vec<ScanTraceEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl ScanTraceSink for RecordingTrace {
    fn on_event(&self, event: ScanTraceEvent) {
        self.0.lock().unwrap().push(event);
    }
}

#[test]
fn metrics_sink_sees_the_whole_scan() {
    let sink = RecordingMetrics::leak();
    let mapper = mapper().metrics_sink(sink);

    let _: Vec<User> = mapper
        .many(rows([
            row([("user_id", Value::Int(1))]),
            row([("user_id", Value::Int(1))]),
        ]))
        .unwrap();

    assert_eq!(
        sink.events(),
        [
            MetricsEvent::ScanStart {
                kind: ScanKind::Many,
                entity_path: User::PATH,
            },
            MetricsEvent::DescriptorAnalyzed {
                entity_path: User::PATH,
            },
            MetricsEvent::EntityMaterialized {
                entity_path: User::PATH,
                created: true,
            },
            MetricsEvent::EntityMaterialized {
                entity_path: User::PATH,
                created: false,
            },
            MetricsEvent::RowsScanned {
                entity_path: User::PATH,
                rows_scanned: 2,
            },
            MetricsEvent::ScanFinish {
                kind: ScanKind::Many,
                entity_path: User::PATH,
                roots: 1,
            },
        ]
    );
}

#[test]
fn metrics_sink_sees_classified_errors() {
    let sink = RecordingMetrics::leak();

    let _ = mapper().metrics_sink(sink).one::<User, _>(rows([]));

    assert!(sink.events().contains(&MetricsEvent::ScanError {
        entity_path: User::PATH,
        class: ErrorClass::NotFound,
    }));
}

#[test]
fn trace_sink_sees_start_and_finish() {
    let sink = RecordingTrace::leak();

    let _: User = mapper()
        .trace_sink(sink)
        .one(rows([row([("user_id", Value::Int(1))])]))
        .unwrap();

    assert_eq!(
        sink.events(),
        [
            ScanTraceEvent::Start {
                kind: ScanKind::One,
                entity_path: User::PATH,
            },
            ScanTraceEvent::Finish {
                kind: ScanKind::One,
                entity_path: User::PATH,
                rows: 1,
                roots: 1,
            },
        ]
    );
}

#[test]
fn trace_sink_sees_errors() {
    let sink = RecordingTrace::leak();

    let _ = mapper().trace_sink(sink).one::<Deed, _>(rows([
        row([("address_id", Value::Int(1)), ("user_id", Value::Int(1))]),
        row([("address_id", Value::Int(1)), ("user_id", Value::Int(2))]),
    ]));

    assert_eq!(
        sink.events().last(),
        Some(&ScanTraceEvent::Error {
            kind: ScanKind::One,
            entity_path: Deed::PATH,
            rows: 2,
            class: ErrorClass::Cardinality,
        })
    );
}

#[test]
fn debug_mapper_maps_identically() {
    let user: User = mapper()
        .debug()
        .one(rows([row([("user_id", Value::Int(3))])]))
        .unwrap();

    assert_eq!(user, User::new(3, ""));
}
