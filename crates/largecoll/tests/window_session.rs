use largecoll::prelude::*;
use largecoll::{
    AssociationKind, IdentityErrorKind, IdentitySource, MappingErrorKind, MetadataSource,
    QueryError, QueryErrorKind, QueryExecutor,
};

struct Shop {
    session: Session,
    order: ObjectId,
    empty_order: ObjectId,
    neighbour_order: ObjectId,
}

fn register_shop(session: &mut Session) {
    session.register_entity(
        EntityMetadata::builder("Shop::Order")
            .identifiers(&["tenantId", "localId"])
            .association(
                AssociationDescriptor::inverse("Shop::Order", "items", "Shop::LineItem", "order")
                    .expect("items mapping"),
            )
            .association(
                AssociationDescriptor::inverse(
                    "Shop::Order",
                    "shipments",
                    "Shop::Shipment",
                    "order",
                )
                .expect("shipments mapping"),
            )
            .build()
            .expect("order metadata"),
    );
    session.register_entity(
        EntityMetadata::builder("Shop::LineItem")
            .identifier("id")
            .association(
                AssociationDescriptor::many_to_one("Shop::LineItem", "order", "Shop::Order", Some("items"))
                    .expect("order mapping"),
            )
            .build()
            .expect("line item metadata"),
    );
    session.register_entity(
        EntityMetadata::builder("Shop::Shipment")
            .identifiers(&["carrier", "trackingNo"])
            .association(
                AssociationDescriptor::many_to_one(
                    "Shop::Shipment",
                    "order",
                    "Shop::Order",
                    Some("shipments"),
                )
                .expect("shipment order mapping"),
            )
            .build()
            .expect("shipment metadata"),
    );
}

/// Order (7, 42) holds 12 line items, order (7, 43) holds 2 and order
/// (8, 1) holds none.
fn shop() -> Shop {
    let mut session = Session::new();
    register_shop(&mut session);
    session.validate_metadata().expect("consistent metadata");

    let order = session
        .persist("Shop::Order", vec![7_i64.into(), 42_i64.into()], vec![])
        .expect("persist order");
    let neighbour_order = session
        .persist("Shop::Order", vec![7_i64.into(), 43_i64.into()], vec![])
        .expect("persist neighbour order");
    let empty_order = session
        .persist("Shop::Order", vec![8_i64.into(), 1_i64.into()], vec![])
        .expect("persist empty order");

    for n in 1..=14_i64 {
        let item = session
            .persist(
                "Shop::LineItem",
                vec![(n * 100).into()],
                vec![("sku", format!("SKU-{n}").into())],
            )
            .expect("persist line item");
        let owner = if n <= 12 { order } else { neighbour_order };
        session.link(owner, "items", item).expect("link item");
    }

    Shop {
        session,
        order,
        empty_order,
        neighbour_order,
    }
}

fn skus(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .map(|row| row.get_named::<String>("sku").expect("sku column"))
        .collect()
}

#[test]
fn count_binds_composite_owner_identity_in_declared_order() {
    let shop = shop();
    let items = shop.session.collection(shop.order, "items").expect("collection");
    let window = AssociationWindow::new();

    let query = window.count_query(&items).expect("count query");
    let bindings: Vec<(usize, Value)> = query
        .parameters()
        .map(|(pos, value)| (pos, value.clone()))
        .collect();
    assert_eq!(
        bindings,
        vec![(1, Value::BigInt(7)), (2, Value::BigInt(42))]
    );
    assert!(query.text().ends_with("WHERE o.tenantId = ?1 AND o.localId = ?2"));

    assert_eq!(window.count(&items).expect("count"), 12);
}

#[test]
fn count_of_empty_collection_is_zero() {
    let shop = shop();
    let window = AssociationWindow::new();

    let empty = shop.session.collection(shop.empty_order, "items").expect("collection");
    assert_eq!(window.count(&empty).expect("count"), 0);

    let neighbour = shop
        .session
        .collection(shop.neighbour_order, "items")
        .expect("collection");
    assert_eq!(window.count(&neighbour).expect("count"), 2);
}

#[test]
fn slice_returns_bounded_window_in_store_order() {
    let shop = shop();
    let items = shop.session.collection(shop.order, "items").expect("collection");
    let window = AssociationWindow::new();

    let query = window.slice(&items, 5, 0).expect("slice");
    assert_eq!(query.first_result(), Some(0));
    assert_eq!(query.max_results(), Some(5));

    let first = shop.session.execute(&query).expect("execute slice");
    assert_eq!(
        skus(&first),
        vec!["SKU-1", "SKU-2", "SKU-3", "SKU-4", "SKU-5"]
    );

    let second = window.fetch_slice(&items, 5, 5).expect("second page");
    assert_eq!(
        skus(&second),
        vec!["SKU-6", "SKU-7", "SKU-8", "SKU-9", "SKU-10"]
    );

    let tail = window.fetch_slice(&items, 5, 10).expect("last page");
    assert_eq!(skus(&tail), vec!["SKU-11", "SKU-12"]);

    assert!(window.fetch_slice(&items, 5, 50).expect("past end").is_empty());
    assert!(window.fetch_slice(&items, 0, 0).expect("zero limit").is_empty());
}

#[test]
fn slice_rows_carry_target_identifier_first() {
    let shop = shop();
    let items = shop.session.collection(shop.order, "items").expect("collection");

    let rows = AssociationWindow::new()
        .fetch_slice(&items, 1, 0)
        .expect("slice");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].column_names(), &["id".to_string(), "sku".to_string()]);
    assert_eq!(rows[0].get_named::<i64>("id").expect("id"), 100);
}

#[test]
fn slice_is_idempotent() {
    let shop = shop();
    let items = shop.session.collection(shop.order, "items").expect("collection");
    let window = AssociationWindow::new();

    let a = window.slice(&items, 10, 3).expect("first slice");
    let b = window.slice(&items, 10, 3).expect("second slice");
    assert_eq!(a, b);
    assert_eq!(a.text(), b.text());
    assert_eq!(a.parameter_values(), b.parameter_values());
}

#[test]
fn composite_target_key_cannot_be_counted() {
    let shop = shop();
    let shipments = shop
        .session
        .collection(shop.order, "shipments")
        .expect("collection");

    let err = AssociationWindow::new().count(&shipments).unwrap_err();
    assert_eq!(err.mapping_kind(), Some(MappingErrorKind::UnsupportedKeyShape));
    assert_eq!(shop.session.executed_queries(), 0);

    // Slicing does not depend on the target key shape.
    let rows = AssociationWindow::new()
        .fetch_slice(&shipments, 10, 0)
        .expect("slice shipments");
    assert!(rows.is_empty());
}

#[test]
fn unidirectional_collection_counts_but_does_not_slice() {
    let mut session = Session::new();
    session.register_entity(
        EntityMetadata::builder("Auth::User")
            .identifier("id")
            .association(
                AssociationDescriptor::unidirectional("Auth::User", "groups", "Auth::Group")
                    .expect("groups mapping"),
            )
            .build()
            .expect("user metadata"),
    );
    session.register_entity(
        EntityMetadata::builder("Auth::Group")
            .identifier("id")
            .build()
            .expect("group metadata"),
    );

    let user = session
        .persist("Auth::User", vec![1_i64.into()], vec![])
        .expect("persist user");
    for id in 1..=3_i64 {
        let group = session
            .persist("Auth::Group", vec![id.into()], vec![])
            .expect("persist group");
        session.link(user, "groups", group).expect("link group");
    }

    let groups = session.collection(user, "groups").expect("collection");
    let window = AssociationWindow::new();

    let err = window.slice(&groups, 5, 0).unwrap_err();
    assert_eq!(err.mapping_kind(), Some(MappingErrorKind::UnsupportedDirection));
    assert!(err.is_mapping_error());
    assert_eq!(session.executed_queries(), 0);

    assert_eq!(window.count(&groups).expect("count"), 3);
}

#[test]
fn many_to_many_owning_side_slices_through_inversed_by() {
    let mut session = Session::new();
    session.register_entity(
        EntityMetadata::builder("Shop::Product")
            .identifier("sku")
            .association(
                AssociationDescriptor::owning("Shop::Product", "tags", "Shop::Tag", Some("products"))
                    .expect("tags mapping"),
            )
            .build()
            .expect("product metadata"),
    );
    session.register_entity(
        EntityMetadata::builder("Shop::Tag")
            .identifier("id")
            .association(
                AssociationDescriptor::inverse("Shop::Tag", "products", "Shop::Product", "tags")
                    .expect("products mapping")
                    .with_kind(AssociationKind::ManyToMany),
            )
            .build()
            .expect("tag metadata"),
    );
    session.validate_metadata().expect("consistent metadata");

    let lamp = session
        .persist("Shop::Product", vec!["LAMP".into()], vec![])
        .expect("persist lamp");
    let desk = session
        .persist("Shop::Product", vec!["DESK".into()], vec![])
        .expect("persist desk");
    let mut tags = Vec::new();
    for (id, label) in [(1_i64, "home"), (2, "light"), (3, "office")] {
        tags.push(
            session
                .persist("Shop::Tag", vec![id.into()], vec![("label", label.into())])
                .expect("persist tag"),
        );
    }
    session.link(lamp, "tags", tags[0]).expect("link");
    session.link(lamp, "tags", tags[1]).expect("link");
    session.link(desk, "tags", tags[0]).expect("link");
    session.link(desk, "tags", tags[2]).expect("link");

    let lamp_tags = session.collection(lamp, "tags").expect("collection");
    let window = AssociationWindow::new();

    let query = window.slice(&lamp_tags, 10, 0).expect("slice");
    assert_eq!(
        query.text(),
        "SELECT r FROM Shop::Tag r INNER JOIN r.products o WHERE o.sku = ?1"
    );

    let labels: Vec<String> = session
        .execute(&query)
        .expect("execute")
        .iter()
        .map(|row| row.get_named::<String>("label").expect("label"))
        .collect();
    assert_eq!(labels, vec!["home", "light"]);
    assert_eq!(window.count(&lamp_tags).expect("count"), 2);

    // The inverse side sees the same links from the other end.
    let home_products = session.collection(tags[0], "products").expect("collection");
    assert_eq!(window.count(&home_products).expect("count"), 2);
}

#[test]
fn identity_is_fetched_fresh_on_every_call() {
    let mut session = Session::new();
    register_shop(&mut session);

    let order = session.add("Shop::Order", vec![]).expect("add order");
    for id in 1..=3_i64 {
        let item = session
            .persist("Shop::LineItem", vec![id.into()], vec![])
            .expect("persist item");
        session.link(order, "items", item).expect("link item");
    }

    session
        .assign_identifier(order, vec![7_i64.into(), 99_i64.into()])
        .expect("assign identifier");
    let window = AssociationWindow::new();
    {
        let items = session.collection(order, "items").expect("collection");
        let query = window.slice(&items, 10, 0).expect("slice");
        assert_eq!(query.parameter_values(), vec![Value::BigInt(7), Value::BigInt(99)]);
        assert_eq!(window.count(&items).expect("count"), 3);
    }

    session
        .assign_identifier(order, vec![7_i64.into(), 100_i64.into()])
        .expect("reassign identifier");
    let items = session.collection(order, "items").expect("collection");
    let query = window.slice(&items, 10, 0).expect("slice");
    assert_eq!(query.parameter(2), Some(&Value::BigInt(100)));
    assert_eq!(window.count(&items).expect("count"), 3);
}

#[test]
fn unmanaged_owner_is_rejected() {
    let shop = shop();
    let mapping = shop
        .session
        .metadata("Shop::Order")
        .expect("metadata")
        .association("items")
        .cloned()
        .expect("items mapping");
    let stray = PersistentCollection::new(&shop.session, ObjectId::new(10_000), mapping);

    let err = AssociationWindow::new().count(&stray).unwrap_err();
    assert_eq!(err.identity_kind(), Some(IdentityErrorKind::Unmanaged));
    assert_eq!(shop.session.executed_queries(), 0);
}

/// Delegates lookups to a session but fails every execution.
struct Unreachable<'a> {
    session: &'a Session,
}

impl MetadataSource for Unreachable<'_> {
    fn metadata(&self, entity_name: &str) -> Result<EntityMetadata> {
        self.session.metadata(entity_name)
    }
}

impl IdentitySource for Unreachable<'_> {
    fn identifier(&self, object: ObjectId) -> Result<Vec<Value>> {
        self.session.identifier(object)
    }
}

impl QueryExecutor for Unreachable<'_> {
    fn execute_scalar(&self, query: &BoundQuery) -> Result<Value> {
        Err(Error::Query(
            QueryError::new(QueryErrorKind::Connection, "server closed the connection")
                .with_query(query.text()),
        ))
    }

    fn execute(&self, query: &BoundQuery) -> Result<Vec<Row>> {
        Err(Error::Query(
            QueryError::new(QueryErrorKind::Database, "relation is locked")
                .with_query(query.text()),
        ))
    }
}

#[test]
fn executor_failures_pass_through_verbatim() {
    let shop = shop();
    let unreachable = Unreachable {
        session: &shop.session,
    };
    let mapping = shop
        .session
        .collection(shop.order, "items")
        .expect("collection")
        .mapping()
        .clone();
    let items = PersistentCollection::new(&unreachable, shop.order, mapping);
    let window = AssociationWindow::new();

    match window.count(&items).unwrap_err() {
        Error::Query(err) => {
            assert_eq!(err.kind, QueryErrorKind::Connection);
            assert_eq!(err.message, "server closed the connection");
            assert!(err.query.expect("query text").starts_with("SELECT COUNT(r.id)"));
        }
        other => panic!("expected query error, got {other}"),
    }

    match window.fetch_slice(&items, 5, 0).unwrap_err() {
        Error::Query(err) => {
            assert_eq!(err.kind, QueryErrorKind::Database);
            assert_eq!(err.message, "relation is locked");
        }
        other => panic!("expected query error, got {other}"),
    }
}

#[test]
fn concurrent_counts_share_one_session() {
    let shop = shop();
    let window = AssociationWindow::new();
    let owners = [
        (shop.order, 12),
        (shop.neighbour_order, 2),
        (shop.empty_order, 0),
    ];

    std::thread::scope(|scope| {
        for (owner, expected) in owners {
            let session = &shop.session;
            let window = &window;
            scope.spawn(move || {
                let items = session.collection(owner, "items").expect("collection");
                for _ in 0..10 {
                    assert_eq!(window.count(&items).expect("count"), expected);
                }
            });
        }
    });

    assert_eq!(shop.session.executed_queries(), 30);
}

#[test]
fn relinked_item_is_counted_only_by_its_new_order() {
    let mut shop = shop();
    let moved = shop
        .session
        .find("Shop::LineItem", &[1200_i64.into()])
        .expect("item 1200 is managed");
    shop.session
        .link(shop.empty_order, "items", moved)
        .expect("relink item");

    let window = AssociationWindow::new();
    let count = |owner| {
        let items = shop.session.collection(owner, "items").expect("collection");
        window.count(&items).expect("count")
    };
    assert_eq!(count(shop.order), 11);
    assert_eq!(count(shop.empty_order), 1);
    assert_eq!(count(shop.neighbour_order), 2);

    let items = shop.session.collection(shop.empty_order, "items").expect("collection");
    let page = window.fetch_slice(&items, 5, 0).expect("slice");
    assert_eq!(skus(&page), vec!["SKU-12".to_string()]);
}
