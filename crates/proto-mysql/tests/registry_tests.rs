//! End-to-end mapping through the registry against an in-memory connection.

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use common::MemoryConnection;
use proto_mysql::{
    Config, DynamicRecord, FieldKind, MapKey, MapperError, MappingConfig, MessageDescriptor,
    MultiQuery, Predicate, Record, Registry, SqlValue, TableOptions, TypeMap, Value,
};

fn item_type() -> Arc<MessageDescriptor> {
    MessageDescriptor::builder("shop.Item")
        .field("sku", FieldKind::String)
        .field("qty", FieldKind::Int32)
        .build()
        .unwrap()
}

fn order_type(item: &Arc<MessageDescriptor>) -> Arc<MessageDescriptor> {
    MessageDescriptor::builder("shop.Order")
        .field("id", FieldKind::Uint64)
        .field("name", FieldKind::String)
        .field("tags", FieldKind::List(Box::new(FieldKind::String)))
        .field("items", FieldKind::List(Box::new(FieldKind::Message(Arc::clone(item)))))
        .field(
            "attrs",
            FieldKind::Map(Box::new(FieldKind::String), Box::new(FieldKind::Int64)),
        )
        .field("payload", FieldKind::Bytes)
        .field("total", FieldKind::Double)
        .field("paid", FieldKind::Bool)
        .field("placed", FieldKind::Timestamp)
        .build()
        .unwrap()
}

fn order_options() -> TableOptions {
    TableOptions::new()
        .with_primary_key(["id"])
        .with_auto_increment("id")
}

struct Shop {
    conn: Arc<MemoryConnection>,
    registry: Registry,
    item: Arc<MessageDescriptor>,
    order: Arc<MessageDescriptor>,
}

fn shop() -> Shop {
    let conn = MemoryConnection::new();
    let registry = Registry::with_defaults(conn.clone());
    let item = item_type();
    let order = order_type(&item);
    registry
        .register(item.clone(), TableOptions::new().with_primary_key(["sku"]))
        .unwrap();
    registry.register(order.clone(), order_options()).unwrap();
    registry.sync_all().unwrap();
    Shop {
        conn,
        registry,
        item,
        order,
    }
}

fn field_value<'a>(record: &'a DynamicRecord, name: &str) -> &'a Value {
    record
        .get_by_name(name)
        .unwrap_or_else(|| panic!("field {} is unset", name))
}

#[test]
fn test_ddl_declares_primary_key_and_auto_increment() {
    let conn = MemoryConnection::new();
    let registry = Registry::with_defaults(conn);
    let user = MessageDescriptor::builder("app.User")
        .field("id", FieldKind::Uint64)
        .field("name", FieldKind::String)
        .field("tags", FieldKind::List(Box::new(FieldKind::String)))
        .build()
        .unwrap();
    registry.register(user, order_options()).unwrap();

    let sql = registry.create_table_sql("app.User").unwrap();
    assert!(sql.contains("PRIMARY KEY (id)"));
    assert!(sql.contains("id bigint unsigned NOT NULL AUTO_INCREMENT"));
    assert!(sql.contains("tags MEDIUMBLOB"));
}

#[test]
fn test_string_with_special_characters_round_trips() {
    let shop = shop();
    let original = "foo\nbar\"baz";
    let record = DynamicRecord::new(shop.order.clone())
        .with("name", original)
        .unwrap();
    shop.registry.save(&record).unwrap();

    let mut found = DynamicRecord::new(shop.order.clone());
    shop.registry.find_one(&mut found, SqlValue::from(1u64)).unwrap();
    assert_eq!(field_value(&found, "name").as_str(), Some(original));
    assert_eq!(field_value(&found, "id"), &Value::Uint64(1));
}

#[test]
fn test_every_field_kind_round_trips() {
    let shop = shop();
    let placed = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap();
    let widget = DynamicRecord::new(shop.item.clone())
        .with("sku", "w-1")
        .unwrap()
        .with("qty", 3)
        .unwrap();
    let mut attrs = BTreeMap::new();
    attrs.insert(MapKey::from("weight"), Value::Int64(-40));
    attrs.insert(MapKey::from("priority"), Value::Int64(7));
    let payload: Vec<u8> = vec![0, b'\'', b'"', b'\\', b'\n', b'\r', 0x1a, 255];

    let record = DynamicRecord::new(shop.order.clone())
        .with("id", 42u64)
        .unwrap()
        .with("name", "o'reilly\\backslash")
        .unwrap()
        .with("tags", vec![Value::from("a"), Value::from("b,c")])
        .unwrap()
        .with("items", vec![Value::Message(widget.clone())])
        .unwrap()
        .with("attrs", attrs.clone())
        .unwrap()
        .with("payload", payload.clone())
        .unwrap()
        .with("total", 12.5f64)
        .unwrap()
        .with("paid", true)
        .unwrap()
        .with("placed", placed)
        .unwrap();
    assert_eq!(shop.registry.insert(&record).unwrap(), 1);

    let mut found = DynamicRecord::new(shop.order.clone());
    shop.registry.find_one(&mut found, SqlValue::from(42u64)).unwrap();
    assert_eq!(field_value(&found, "name").as_str(), Some("o'reilly\\backslash"));
    assert_eq!(
        field_value(&found, "tags"),
        &Value::List(vec![Value::from("a"), Value::from("b,c")])
    );
    assert_eq!(field_value(&found, "attrs"), &Value::Map(attrs));
    assert_eq!(field_value(&found, "payload"), &Value::Bytes(payload));
    assert_eq!(field_value(&found, "total"), &Value::Double(12.5));
    assert_eq!(field_value(&found, "paid"), &Value::Bool(true));
    assert_eq!(field_value(&found, "placed"), &Value::Timestamp(placed));

    let items = field_value(&found, "items").as_list().unwrap();
    assert_eq!(items.len(), 1);
    let item = items[0].as_message().unwrap();
    assert_eq!(field_value(item, "sku").as_str(), Some("w-1"));
    assert_eq!(field_value(item, "qty"), &Value::Int32(3));
}

#[test]
fn test_binary_columns_are_stored_escaped() {
    let shop = shop();
    let record = DynamicRecord::new(shop.order.clone())
        .with("id", 7u64)
        .unwrap()
        .with("payload", vec![b'a', 0, b'\\'])
        .unwrap();
    shop.registry.insert(&record).unwrap();

    let stored = shop.conn.raw_value("shop_Order", "id", "7", "payload").unwrap();
    assert_eq!(stored, b"a\\0\\\\".to_vec());
}

#[test]
fn test_batch_insert_splits_at_limit() {
    let conn = MemoryConnection::new();
    let registry = Registry::with_defaults(conn.clone());
    let event = MessageDescriptor::builder("bench.Event")
        .field("id", FieldKind::Uint64)
        .field("label", FieldKind::String)
        .build()
        .unwrap();
    registry
        .register(event.clone(), TableOptions::new().with_primary_key(["id"]))
        .unwrap();
    registry.sync_schema("bench.Event").unwrap();
    conn.clear_log();

    let records: Vec<DynamicRecord> = (1..=1500u64)
        .map(|id| {
            DynamicRecord::new(event.clone())
                .with("id", id)
                .unwrap()
                .with("label", format!("event-{}", id))
                .unwrap()
        })
        .collect();
    assert_eq!(registry.batch_insert(&records).unwrap(), 1500);

    let statements = conn.statements("INSERT INTO");
    assert_eq!(statements.len(), 2);
    assert_eq!(statements[0].value_rows(), 1000);
    assert_eq!(statements[0].args, 2000);
    assert_eq!(statements[1].value_rows(), 500);
    assert_eq!(conn.row_count("bench_Event"), 1500);
}

#[test]
fn test_batch_limit_comes_from_mapping_config() {
    let conn = MemoryConnection::new();
    let mapping = MappingConfig {
        batch_insert_max: 2,
        ..MappingConfig::default()
    };
    let registry = Registry::new(conn.clone(), Arc::new(TypeMap::mysql_default()), mapping);
    let item = item_type();
    registry
        .register(item.clone(), TableOptions::new().with_primary_key(["sku"]))
        .unwrap();
    registry.sync_all().unwrap();

    let records: Vec<DynamicRecord> = ["a", "b", "c", "d", "e"]
        .iter()
        .map(|sku| DynamicRecord::new(item.clone()).with("sku", *sku).unwrap())
        .collect();
    registry.batch_insert(&records).unwrap();
    let sizes: Vec<usize> = conn
        .statements("INSERT INTO")
        .iter()
        .map(|s| s.value_rows())
        .collect();
    assert_eq!(sizes, vec![2, 2, 1]);
}

#[test]
fn test_batch_with_foreign_record_writes_nothing() {
    let conn = MemoryConnection::new();
    let mapping = MappingConfig {
        batch_insert_max: 2,
        ..MappingConfig::default()
    };
    let registry = Registry::new(conn.clone(), Arc::new(TypeMap::mysql_default()), mapping);
    let item = item_type();
    let order = order_type(&item);
    registry
        .register(item.clone(), TableOptions::new().with_primary_key(["sku"]))
        .unwrap();
    registry.register(order.clone(), order_options()).unwrap();
    registry.sync_all().unwrap();
    conn.clear_log();

    let mut records: Vec<DynamicRecord> = ["a", "b"]
        .iter()
        .map(|sku| DynamicRecord::new(item.clone()).with("sku", *sku).unwrap())
        .collect();
    records.push(DynamicRecord::new(order).with("id", 1u64).unwrap());

    let err = registry.batch_insert(&records).unwrap_err();
    assert!(err.is_config_error());
    assert!(conn.statements("INSERT INTO").is_empty());
    assert_eq!(conn.row_count("shop_Item"), 0);
}

#[test]
fn test_batch_with_unencodable_value_writes_nothing() {
    let shop = shop();
    shop.conn.clear_log();
    let records = vec![
        DynamicRecord::new(shop.order.clone()).with("id", 1u64).unwrap(),
        DynamicRecord::new(shop.order.clone())
            .with("id", 2u64)
            .unwrap()
            .with("total", f64::NAN)
            .unwrap(),
    ];
    let err = shop.registry.batch_insert(&records).unwrap_err();
    assert!(matches!(err, MapperError::Codec { .. }));
    assert!(shop.conn.statements("INSERT INTO").is_empty());
}

#[test]
fn test_empty_batch_is_rejected() {
    let shop = shop();
    let records: Vec<DynamicRecord> = Vec::new();
    let err = shop.registry.batch_insert(&records).unwrap_err();
    assert!(matches!(err, MapperError::EmptyBatch(_)));
}

#[test]
fn test_find_all_with_two_repeated_fields_fails_before_query() {
    let shop = shop();
    let listing = MessageDescriptor::builder("shop.Listing")
        .field("orders", FieldKind::List(Box::new(FieldKind::Message(shop.order.clone()))))
        .field("notes", FieldKind::List(Box::new(FieldKind::String)))
        .build()
        .unwrap();
    shop.conn.clear_log();

    let mut dest = DynamicRecord::new(listing);
    let err = shop.registry.find_all(&mut dest).unwrap_err();
    assert!(matches!(err, MapperError::MultipleContainerFields { .. }));
    assert!(err.is_config_error());
    assert!(shop.conn.executed().is_empty());
}

#[test]
fn test_find_all_without_repeated_field_fails() {
    let shop = shop();
    let mut dest = DynamicRecord::new(shop.item.clone());
    let err = shop.registry.find_all(&mut dest).unwrap_err();
    assert!(matches!(err, MapperError::NoContainerField(_)));
}

#[test]
fn test_find_all_fills_container() {
    let shop = shop();
    for (sku, qty) in [("a", 1), ("b", 2), ("c", 2)] {
        let item = DynamicRecord::new(shop.item.clone())
            .with("sku", sku)
            .unwrap()
            .with("qty", qty)
            .unwrap();
        shop.registry.insert(&item).unwrap();
    }
    let listing = MessageDescriptor::builder("shop.Inventory")
        .field("items", FieldKind::List(Box::new(FieldKind::Message(shop.item.clone()))))
        .build()
        .unwrap();

    let mut dest = DynamicRecord::new(listing.clone());
    assert_eq!(shop.registry.find_all(&mut dest).unwrap(), 3);
    assert_eq!(field_value(&dest, "items").as_list().unwrap().len(), 3);

    let mut dest = DynamicRecord::new(listing.clone());
    let count = shop
        .registry
        .find_all_by_field(&mut dest, "qty", SqlValue::from(2))
        .unwrap();
    assert_eq!(count, 2);

    let mut dest = DynamicRecord::new(listing);
    let predicate = Predicate::eq("sku", "a").unwrap();
    assert_eq!(shop.registry.find_all_where(&mut dest, &predicate).unwrap(), 1);
    let items = field_value(&dest, "items").as_list().unwrap();
    assert_eq!(field_value(items[0].as_message().unwrap(), "qty"), &Value::Int32(1));
}

#[test]
fn test_find_all_keeps_rows_decoded_before_failure() {
    let shop = shop();
    let good = DynamicRecord::new(shop.item.clone())
        .with("sku", "a")
        .unwrap()
        .with("qty", 1)
        .unwrap();
    shop.registry.insert(&good).unwrap();

    // A second mapping of the same table that writes text into `qty`.
    let loose = Registry::with_defaults(shop.conn.clone());
    let loose_item = MessageDescriptor::builder("loose.Item")
        .field("sku", FieldKind::String)
        .field("qty", FieldKind::String)
        .build()
        .unwrap();
    loose
        .register(loose_item.clone(), TableOptions::new().with_table_name("shop_Item"))
        .unwrap();
    let bad = DynamicRecord::new(loose_item)
        .with("sku", "b")
        .unwrap()
        .with("qty", "many")
        .unwrap();
    loose.insert(&bad).unwrap();

    let listing = MessageDescriptor::builder("shop.Inventory")
        .field("items", FieldKind::List(Box::new(FieldKind::Message(shop.item.clone()))))
        .build()
        .unwrap();
    let mut dest = DynamicRecord::new(listing);
    assert!(shop.registry.find_all(&mut dest).is_err());
    assert_eq!(field_value(&dest, "items").as_list().unwrap().len(), 1);
}

#[test]
fn test_find_one_not_found_and_multiple_found() {
    let shop = shop();
    let mut dest = DynamicRecord::new(shop.order.clone());
    let err = shop
        .registry
        .find_one(&mut dest, SqlValue::from(99u64))
        .unwrap_err();
    assert!(matches!(err, MapperError::NotFound(_)));

    for _ in 0..2 {
        let record = DynamicRecord::new(shop.order.clone())
            .with("name", "twin")
            .unwrap();
        shop.registry.save(&record).unwrap();
    }
    let err = shop
        .registry
        .find_one_by_field(&mut dest, "name", SqlValue::from("twin"))
        .unwrap_err();
    assert!(matches!(err, MapperError::MultipleFound(_)));
}

#[test]
fn test_find_one_where() {
    let shop = shop();
    for (sku, qty) in [("a", 1), ("b", 2), ("c", 2)] {
        let item = DynamicRecord::new(shop.item.clone())
            .with("sku", sku)
            .unwrap()
            .with("qty", qty)
            .unwrap();
        shop.registry.insert(&item).unwrap();
    }

    let mut found = DynamicRecord::new(shop.item.clone());
    let predicate = Predicate::eq("sku", "b").unwrap();
    shop.registry.find_one_where(&mut found, &predicate).unwrap();
    assert_eq!(field_value(&found, "qty"), &Value::Int32(2));
    let select = shop.conn.statements("SELECT");
    assert!(select
        .last()
        .unwrap()
        .sql
        .ends_with("FROM shop_Item WHERE sku = ?"));

    let err = shop
        .registry
        .find_one_where(&mut found, &Predicate::eq("sku", "zz").unwrap())
        .unwrap_err();
    assert!(matches!(err, MapperError::NotFound(_)));

    let err = shop
        .registry
        .find_one_where(&mut found, &Predicate::eq("qty", 2).unwrap())
        .unwrap_err();
    assert!(matches!(err, MapperError::MultipleFound(_)));
}

#[test]
fn test_find_multi_fills_each_destination() {
    let shop = shop();
    let item = DynamicRecord::new(shop.item.clone())
        .with("sku", "m")
        .unwrap()
        .with("qty", 4)
        .unwrap();
    shop.registry.insert(&item).unwrap();
    let order = DynamicRecord::new(shop.order.clone())
        .with("id", 3u64)
        .unwrap()
        .with("name", "both")
        .unwrap();
    shop.registry.insert(&order).unwrap();
    shop.conn.clear_log();

    let mut found_item = DynamicRecord::new(shop.item.clone());
    let mut found_order = DynamicRecord::new(shop.order.clone());
    shop.registry
        .find_multi(&mut [
            MultiQuery::new(&mut found_item, Predicate::eq("sku", "m").unwrap()),
            MultiQuery::new(&mut found_order, Predicate::eq("id", 3u64).unwrap()),
        ])
        .unwrap();
    assert_eq!(found_item, item);
    assert_eq!(field_value(&found_order, "name").as_str(), Some("both"));
    assert_eq!(shop.conn.statements("SELECT").len(), 2);
}

#[test]
fn test_find_multi_reports_missing_row() {
    let shop = shop();
    let item = DynamicRecord::new(shop.item.clone()).with("sku", "m").unwrap();
    shop.registry.insert(&item).unwrap();

    let mut found_item = DynamicRecord::new(shop.item.clone());
    let mut found_order = DynamicRecord::new(shop.order.clone());
    let err = shop
        .registry
        .find_multi(&mut [
            MultiQuery::new(&mut found_item, Predicate::eq("sku", "m").unwrap()),
            MultiQuery::new(&mut found_order, Predicate::eq("id", 9999u64).unwrap()),
        ])
        .unwrap_err();
    assert!(matches!(err, MapperError::NotFound(ref table) if table == "shop_Order"));
    assert_eq!(found_item, item);
    assert!(found_order.is_empty());
}

#[test]
fn test_find_multi_rejects_empty_and_unregistered() {
    let shop = shop();
    let err = shop.registry.find_multi(&mut []).unwrap_err();
    assert!(err.is_config_error());

    let stray = MessageDescriptor::builder("other.Thing")
        .field("id", FieldKind::Uint64)
        .build()
        .unwrap();
    let mut found_item = DynamicRecord::new(shop.item.clone());
    let mut found_stray = DynamicRecord::new(stray);
    shop.conn.clear_log();
    let err = shop
        .registry
        .find_multi(&mut [
            MultiQuery::new(&mut found_item, Predicate::default()),
            MultiQuery::new(&mut found_stray, Predicate::default()),
        ])
        .unwrap_err();
    assert!(matches!(err, MapperError::TableNotRegistered(_)));
    assert!(shop.conn.executed().is_empty());
}

#[test]
fn test_zero_values_read_back_as_unset() {
    let shop = shop();
    let record = DynamicRecord::new(shop.order.clone())
        .with("id", 8u64)
        .unwrap()
        .with("total", 0.0f64)
        .unwrap()
        .with("paid", false)
        .unwrap()
        .with("name", "")
        .unwrap();
    shop.registry.insert(&record).unwrap();

    let mut found = DynamicRecord::new(shop.order.clone());
    shop.registry.find_one(&mut found, SqlValue::from(8u64)).unwrap();
    assert_eq!(found, record);
    assert!(!found.has_by_name("total"));
    assert!(!found.has_by_name("paid"));
}

#[test]
fn test_update_and_delete_by_primary_key() {
    let shop = shop();
    let record = DynamicRecord::new(shop.order.clone())
        .with("id", 5u64)
        .unwrap()
        .with("name", "draft")
        .unwrap();
    shop.registry.insert(&record).unwrap();

    let changed = DynamicRecord::new(shop.order.clone())
        .with("id", 5u64)
        .unwrap()
        .with("name", "final")
        .unwrap()
        .with("paid", true)
        .unwrap();
    assert_eq!(shop.registry.update(&changed).unwrap(), 1);

    let mut found = DynamicRecord::new(shop.order.clone());
    shop.registry.find_one(&mut found, SqlValue::from(5u64)).unwrap();
    assert_eq!(field_value(&found, "name").as_str(), Some("final"));
    assert_eq!(field_value(&found, "paid"), &Value::Bool(true));

    assert_eq!(shop.registry.delete(&changed).unwrap(), 1);
    let err = shop
        .registry
        .find_one(&mut found, SqlValue::from(5u64))
        .unwrap_err();
    assert!(matches!(err, MapperError::NotFound(_)));
}

#[test]
fn test_update_with_only_key_set_is_rejected() {
    let shop = shop();
    let record = DynamicRecord::new(shop.order.clone()).with("id", 5u64).unwrap();
    let err = shop.registry.update(&record).unwrap_err();
    assert!(matches!(err, MapperError::NothingToUpdate(_)));
}

#[test]
fn test_upsert_and_insert_or_keep() {
    let shop = shop();
    let first = DynamicRecord::new(shop.item.clone())
        .with("sku", "k")
        .unwrap()
        .with("qty", 1)
        .unwrap();
    shop.registry.upsert(&first).unwrap();

    let second = DynamicRecord::new(shop.item.clone())
        .with("sku", "k")
        .unwrap()
        .with("qty", 9)
        .unwrap();
    shop.registry.upsert(&second).unwrap();
    assert_eq!(shop.conn.row_count("shop_Item"), 1);

    let mut found = DynamicRecord::new(shop.item.clone());
    shop.registry.find_one(&mut found, SqlValue::from("k")).unwrap();
    assert_eq!(field_value(&found, "qty"), &Value::Int32(9));

    let third = DynamicRecord::new(shop.item.clone())
        .with("sku", "k")
        .unwrap()
        .with("qty", 100)
        .unwrap();
    shop.registry.insert_or_keep(&third).unwrap();
    shop.registry.find_one(&mut found, SqlValue::from("k")).unwrap();
    assert_eq!(field_value(&found, "qty"), &Value::Int32(9));
}

#[test]
fn test_plain_insert_of_duplicate_key_reports_execution_error() {
    let shop = shop();
    let item = DynamicRecord::new(shop.item.clone()).with("sku", "dup").unwrap();
    shop.registry.insert(&item).unwrap();
    let err = shop.registry.insert(&item).unwrap_err();
    match err {
        MapperError::Execution { table, sql, .. } => {
            assert_eq!(table, "shop_Item");
            assert!(sql.starts_with("INSERT INTO shop_Item"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_where_operations_and_truncate() {
    let shop = shop();
    for (sku, qty) in [("a", 1), ("b", 1), ("c", 2)] {
        let item = DynamicRecord::new(shop.item.clone())
            .with("sku", sku)
            .unwrap()
            .with("qty", qty)
            .unwrap();
        shop.registry.insert(&item).unwrap();
    }

    let patch = DynamicRecord::new(shop.item.clone()).with("qty", 5).unwrap();
    let ones = Predicate::eq("qty", 1).unwrap();
    assert_eq!(shop.registry.update_where(&patch, &ones).unwrap(), 2);

    let fives = Predicate::eq("qty", 5).unwrap();
    assert_eq!(shop.registry.delete_where("shop.Item", &fives).unwrap(), 2);
    assert_eq!(shop.conn.row_count("shop_Item"), 1);

    let err = shop
        .registry
        .delete_where("shop.Item", &Predicate::default())
        .unwrap_err();
    assert!(err.is_config_error());

    shop.registry.truncate("shop.Item").unwrap();
    assert_eq!(shop.conn.row_count("shop_Item"), 0);
}

#[test]
fn test_record_of_unregistered_type_is_rejected() {
    let shop = shop();
    let stray = MessageDescriptor::builder("other.Thing")
        .field("id", FieldKind::Uint64)
        .build()
        .unwrap();
    let record = DynamicRecord::new(stray);
    let err = shop.registry.save(&record).unwrap_err();
    assert!(matches!(err, MapperError::TableNotRegistered(_)));
}

#[test]
fn test_registry_from_config_applies_overrides() {
    let config = Config::from_yaml(
        r#"
database:
  host: localhost
  user: app
  database: shop
mapping:
  batch_insert_max: 250
  type_overrides:
    string: LONGTEXT
"#,
    )
    .unwrap();
    let registry = Registry::from_config(MemoryConnection::new(), &config).unwrap();
    registry
        .register(item_type(), TableOptions::new().with_primary_key(["sku"]))
        .unwrap();
    let table = registry.table("shop.Item").unwrap();
    assert_eq!(table.batch_insert_max(), 250);
    assert!(table.create_table_sql().contains("sku LONGTEXT"));
}

#[test]
fn test_concurrent_saves_and_reads() {
    let shop = shop();
    std::thread::scope(|scope| {
        for worker in 0..8u64 {
            let registry = &shop.registry;
            let item = shop.item.clone();
            scope.spawn(move || {
                for n in 0..25u64 {
                    let sku = format!("w{}-{}", worker, n);
                    let record = DynamicRecord::new(item.clone())
                        .with("sku", sku.as_str())
                        .unwrap()
                        .with("qty", (worker * 100 + n + 1) as i32)
                        .unwrap();
                    registry.save(&record).unwrap();

                    let mut found = DynamicRecord::new(item.clone());
                    registry
                        .find_one(&mut found, SqlValue::from(sku.as_str()))
                        .unwrap();
                    assert_eq!(
                        found.get_by_name("qty"),
                        Some(&Value::Int32((worker * 100 + n + 1) as i32))
                    );
                }
            });
        }
    });
    assert_eq!(shop.conn.row_count("shop_Item"), 200);
}

#[test]
fn test_registration_while_reading() {
    let shop = shop();
    std::thread::scope(|scope| {
        let registry = &shop.registry;
        let item = shop.item.clone();
        scope.spawn(move || {
            for _ in 0..50 {
                registry
                    .register(item.clone(), TableOptions::new().with_primary_key(["sku"]))
                    .unwrap();
            }
        });
        for _ in 0..4 {
            scope.spawn(move || {
                for _ in 0..200 {
                    let table = registry.table("shop.Item").unwrap();
                    assert_eq!(table.name(), "shop_Item");
                    assert!(registry.table("shop.Order").is_ok());
                }
            });
        }
    });
}

#[test]
fn test_records_expose_their_type_name() {
    let shop = shop();
    let record = DynamicRecord::new(shop.order.clone());
    assert_eq!(record.type_name(), "shop.Order");
    assert_eq!(shop.registry.tables().len(), 2);
}
