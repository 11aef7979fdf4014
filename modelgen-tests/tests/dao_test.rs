//! Generated code compiled and run against rdbi
//!
//! `build.rs` writes the fixture's entity / DTO / DAO / helper modules into
//! `OUT_DIR/generated` with `module_root = "crate"`; they are included below,
//! so every `cargo test` type-checks them. The database tests run the
//! generated DAOs against a MySQL testcontainer and need Docker:
//! `cargo test -p modelgen-tests -- --ignored`.

use chrono::{NaiveDate, NaiveDateTime};
use rdbi::{MySqlPool, Query, Value};
use serde_json::json;
use serial_test::serial;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::mysql::Mysql;

// Include generated code from build.rs
// Allow dead_code since not all generated methods are used in tests
#[allow(dead_code)]
mod entity {
    include!(concat!(env!("OUT_DIR"), "/generated/entity/mod.rs"));
}
#[allow(dead_code)]
mod dto {
    include!(concat!(env!("OUT_DIR"), "/generated/dto/mod.rs"));
}
#[allow(dead_code)]
mod dao {
    include!(concat!(env!("OUT_DIR"), "/generated/dao/mod.rs"));
}
#[allow(dead_code)]
mod helper {
    include!(concat!(env!("OUT_DIR"), "/generated/helper/mod.rs"));
}

use dao::{TArtifactDao, TUserDeviceDao};
use dto::{TArtifactPatch, TArtifactQuery, TUserDevicePatch};
use entity::{TArtifact, TArtifactSortBy, TUserDevice};
use helper::{Page, SortDirection};

const FIXTURE: &str = include_str!("../fixtures/schema.sql");

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .unwrap()
        .and_hms_opt(hour, 30, 0)
        .unwrap()
}

fn artifact(session_id: &str, version: i32, created_at: NaiveDateTime) -> TArtifact {
    TArtifact {
        id: 0,
        session_id: session_id.to_string(),
        version,
        title: format!("{} v{}", session_id, version),
        payload: Some(json!({ "step": version })),
        is_public: false,
        created_at,
    }
}

// ============ Generated code without a database ============

#[test]
fn test_query_conditions_and_bind_order() {
    let query = TArtifactQuery {
        session_id: Some("s1".into()),
        title_fuzzy: Some("draft".into()),
        ..Default::default()
    };
    assert_eq!(query.where_clause(), "`session_id` = ? AND `title` LIKE ?");

    let bound = query.bind_to(rdbi::DynamicQuery::new("SELECT 1"));
    assert_eq!(
        bound.params(),
        &[Value::String("s1".into()), Value::String("%draft%".into())]
    );

    assert_eq!(TArtifactQuery::default().where_clause(), "1 = 1");

    let nothing = TArtifactQuery {
        session_id_list: Some(Vec::new()),
        ..Default::default()
    };
    assert_eq!(nothing.where_clause(), "1 = 0");
}

#[test]
fn test_patch_only_sets_present_fields() {
    let patch = TArtifactPatch::default();
    assert!(patch.is_empty());
    assert_eq!(patch.set_clause(), "");

    let patch = TArtifactPatch {
        title: Some("renamed".into()),
        is_public: Some(true),
        ..Default::default()
    };
    assert!(!patch.is_empty());
    assert_eq!(patch.set_clause(), "`title` = ?, `is_public` = ?");
    assert_eq!(
        patch.bind_to(rdbi::DynamicQuery::new("UPDATE")).params().len(),
        2
    );

    // a keyword column keeps its SQL name
    let patch = TUserDevicePatch {
        r#type: Some(2),
        ..Default::default()
    };
    assert_eq!(patch.set_clause(), "`type` = ?");
}

#[test]
fn test_sort_and_page_helpers() {
    assert_eq!(TArtifactSortBy::CreatedAt.as_sql(), "`created_at`");
    assert_eq!(SortDirection::Desc.as_sql(), "DESC");
    assert_eq!(SortDirection::default(), SortDirection::Asc);

    let page: Page<TArtifact> = Page::new(Vec::new(), 21, 2, 10);
    assert_eq!(page.total_pages(), 3);
    assert!(page.has_next());
    assert_eq!(helper::normalize_page(0, 0), (1, 1));
    assert_eq!(helper::page_offset(3, 20), 40);
}

#[test]
fn test_entity_constants_and_json() {
    assert_eq!(TArtifact::TABLE_NAME, "t_artifact");
    assert_eq!(TUserDevice::COLUMNS.len(), 5);

    let row = artifact("s1", 1, at(1, 9));
    let text = helper::to_json(&row).unwrap();
    let back: TArtifact = helper::from_json(&text).unwrap();
    assert_eq!(back, row);
}

// ============ Generated DAOs against MySQL ============

async fn start_mysql() -> anyhow::Result<(ContainerAsync<Mysql>, MySqlPool)> {
    let container = Mysql::default().start().await?;
    let port = container.get_host_port_ipv4(3306).await?;
    let pool = MySqlPool::new(&format!("mysql://root@127.0.0.1:{}/test", port))?;

    for statement in modelgen::parser::split_statements(FIXTURE) {
        Query::new(&statement).execute(&pool).await?;
    }

    Ok((container, pool))
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_upsert_overwrites_nulls_but_selective_update_does_not() -> anyhow::Result<()> {
    let (_container, pool) = start_mysql().await?;

    let original = artifact("s1", 1, at(1, 9));
    let id = TArtifactDao::insert(&pool, &original).await?;
    assert!(id > 0);

    // selective: fields left as None are not touched
    let patch = TArtifactPatch {
        title: Some("renamed".into()),
        ..Default::default()
    };
    assert_eq!(TArtifactDao::update_by_id_selective(&pool, id, &patch).await?, 1);
    assert_eq!(
        TArtifactDao::update_by_id_selective(&pool, id, &TArtifactPatch::default()).await?,
        0
    );

    let row = TArtifactDao::find_by_id(&pool, id).await?.unwrap();
    assert_eq!(row.title, "renamed");
    assert_eq!(row.payload, Some(json!({ "step": 1 })));

    // upsert on the same unique key: every column is overwritten, NULLs included
    let replacement = TArtifact {
        title: "final".into(),
        payload: None,
        ..original.clone()
    };
    TArtifactDao::upsert(&pool, &replacement).await?;

    let row = TArtifactDao::find_by_session_id_and_version(&pool, "s1", 1)
        .await?
        .unwrap();
    assert_eq!(row.id, id);
    assert_eq!(row.title, "final");
    assert_eq!(row.payload, None);
    assert_eq!(
        TArtifactDao::select_count(&pool, &TArtifactQuery::default()).await?,
        1
    );

    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_batch_upsert_ordering_and_index_writes() -> anyhow::Result<()> {
    let (_container, pool) = start_mysql().await?;

    let rows = vec![
        artifact("s1", 1, at(1, 9)),
        artifact("s1", 2, at(1, 9)),
        artifact("s2", 1, at(2, 9)),
    ];
    assert_eq!(TArtifactDao::insert_batch(&pool, &rows).await?, 3);

    let changed = TArtifact {
        title: "batch".into(),
        payload: None,
        ..rows[0].clone()
    };
    let added = artifact("s3", 1, at(2, 9));
    TArtifactDao::upsert_batch(&pool, &[changed, added]).await?;
    assert_eq!(
        TArtifactDao::select_count(&pool, &TArtifactQuery::default()).await?,
        4
    );
    let row = TArtifactDao::find_by_session_id_and_version(&pool, "s1", 1)
        .await?
        .unwrap();
    assert_eq!(row.title, "batch");
    assert_eq!(row.payload, None);

    let s1 = TArtifactQuery {
        session_id: Some("s1".into()),
        ..Default::default()
    };
    let listed = TArtifactDao::select_list(
        &pool,
        &s1,
        Some((TArtifactSortBy::Version, SortDirection::Desc)),
    )
    .await?;
    let versions: Vec<i32> = listed.iter().map(|r| r.version).collect();
    assert_eq!(versions, vec![2, 1]);

    let page = TArtifactDao::select_page(
        &pool,
        &TArtifactQuery::default(),
        2,
        3,
        Some((TArtifactSortBy::SessionId, SortDirection::Asc)),
    )
    .await?;
    assert_eq!(page.total, 4);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].session_id, "s3");

    // secondary index: every matching row
    let publish = TArtifactPatch {
        is_public: Some(true),
        ..Default::default()
    };
    assert_eq!(
        TArtifactDao::update_by_created_at_selective(&pool, at(1, 9), &publish).await?,
        2
    );
    let day_one = TArtifactDao::find_by_created_at(&pool, at(1, 9)).await?;
    assert!(day_one.iter().all(|r| r.is_public));

    assert_eq!(TArtifactDao::delete_by_created_at(&pool, at(2, 9)).await?, 2);
    assert_eq!(
        TArtifactDao::select_count(&pool, &TArtifactQuery::default()).await?,
        2
    );

    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires docker"]
async fn test_composite_key_and_keyword_column() -> anyhow::Result<()> {
    let (_container, pool) = start_mysql().await?;

    let device = TUserDevice {
        user_id: 7,
        device_type: "phone".into(),
        r#type: Some(3),
        last_seen: None,
        note: None,
    };
    TUserDeviceDao::insert(&pool, &device).await?;

    let patch = TUserDevicePatch {
        note: Some("primary".into()),
        ..Default::default()
    };
    assert_eq!(
        TUserDeviceDao::update_by_user_id_and_device_type_selective(&pool, 7, "phone", &patch)
            .await?,
        1
    );

    let found = TUserDeviceDao::find_by_user_id_and_device_type(&pool, 7, "phone")
        .await?
        .unwrap();
    assert_eq!(found.r#type, Some(3));
    assert_eq!(found.note.as_deref(), Some("primary"));

    let phones = TUserDeviceDao::find_by_device_type_list(&pool, &["phone".to_string()]).await?;
    assert_eq!(phones.len(), 1);
    assert_eq!(
        TUserDeviceDao::delete_by_user_id_and_device_type(&pool, 7, "phone").await?,
        1
    );

    Ok(())
}
