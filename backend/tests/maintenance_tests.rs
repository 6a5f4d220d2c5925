//! Activity log, fallback file and backup tests

mod common;

use common::{TestContext, ADMIN_ID};

#[tokio::test]
async fn test_activity_entries_newest_first() {
    let ctx = TestContext::new().await;
    ctx.activity.log(Some(ADMIN_ID), "first").await;
    ctx.activity.log(None, "second").await;

    let entries = ctx.activity.list_recent(2).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].description, "second");
    assert_eq!(entries[0].operator_id, None);
    assert_eq!(entries[1].description, "first");
}

#[tokio::test]
async fn test_activity_falls_back_to_file_when_database_is_gone() {
    let ctx = TestContext::new().await;
    ctx.store.pool().close().await;

    // Never errors, even with the database closed
    ctx.activity.log(Some(ADMIN_ID), "Sale ticket #9 for 10.00").await;

    let contents = tokio::fs::read_to_string(&ctx.config.activity.fallback_path)
        .await
        .unwrap();
    let line = contents.lines().last().unwrap();
    let fields: Vec<&str> = line.split('\t').collect();
    assert_eq!(fields.len(), 3);
    assert_eq!(fields[1], "1");
    assert_eq!(fields[2], "Sale ticket #9 for 10.00");
}

#[tokio::test]
async fn test_fallback_entry_stays_on_one_line() {
    let ctx = TestContext::new().await;
    ctx.store.pool().close().await;

    ctx.activity
        .log(Some(ADMIN_ID), "Cancelled ticket #2: reason\n2024-01-01\t1\tforged")
        .await;

    let contents = tokio::fs::read_to_string(&ctx.config.activity.fallback_path)
        .await
        .unwrap();
    assert_eq!(contents.lines().count(), 1);
    let fields: Vec<&str> = contents.trim_end().split('\t').collect();
    assert_eq!(fields.len(), 3);
    assert_eq!(fields[2], "Cancelled ticket #2: reason\\n2024-01-01\\t1\\tforged");
}

#[tokio::test]
async fn test_backup_writes_openable_copy() {
    let ctx = TestContext::new().await;
    ctx.product("RIB", "Rib", "1500", "2").await;

    let backup_dir = ctx.dir.path().join("backups");
    let path = ctx.store.backup_to(&backup_dir).await.unwrap();
    assert!(path.exists());
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("butcher_backup_"));
    assert!(name.ends_with(".db"));

    let mut config = ctx.config.database.clone();
    config.path = path.to_string_lossy().into_owned();
    let copy = butcher_backend::Store::connect(&config).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE code = 'RIB'")
        .fetch_one(copy.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}
