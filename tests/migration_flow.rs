use std::fs;
use std::path::Path;

use catalog_migrate::config::MigrationConfig;
use catalog_migrate::migrate::{migrate_all, migrate_products_from_file};
use catalog_migrate::model::{CATEGORIES, CATEGORY_TREE, CATEGORY_TREE_ID, PRODUCTS, VENDORS};
use catalog_migrate::resolver::ResolutionPolicy;
use catalog_migrate::{MemoryStore, MigrationError};
use serde_json::{json, Value};

const CATEGORIES_CSV: &str = "\
CATEGORY_CODE,CATEGORY_NAME
01,Hardware
0101,Hand Tools
010101,Hammers
01010101,Claw Hammers
02,Garden
0301,Lost Child
99,
";

const VENDORS_CSV: &str = "\
VENDOR_ID,VENDOR_NAME,CREATE_DATE,LAST_MODIFIED_DATE
034,Acme,1/15/2021,3/2/2022
7,Globex,12/1/2020,4/31/2022
9,Initech,13/1/2020,1/1/2021
";

const PRODUCTS_CSV: &str = "\
SKU,MANUFACTURER_PART_NO,PRODUCT_NAME,VENDOR,DESCRIPTION,ACTIVE_STATUS,DISCONTINUED,CREATED_DATE,LAST_MODIFIED_DATE,COLOR,CATEGORY_CODE
H-1,AC-100,Claw Hammer,34,16oz,Yes,No,20230115,20230231,Red,01010101
H-2,,Ball Peen,555,12oz,no,yes,20220101,20220102,,010101
H-3,,Orphan Rake,,Steel,yes,no,20220101,20220102,,0201
H-4,,Mystery,7,,yes,no,20220101,20220102,,
";

struct Fixture {
    _dir: tempfile::TempDir,
    cfg: MigrationConfig,
}

fn write(dir: &Path, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let cfg = MigrationConfig {
        categories_file: write(dir.path(), "categories.csv", CATEGORIES_CSV),
        vendors_file: write(dir.path(), "vendors.csv", VENDORS_CSV),
        products_file: write(dir.path(), "products.csv", PRODUCTS_CSV),
        missing_vendor_report: dir.path().join("reports").join("missing_vendors.csv"),
        batch_size: 2,
        ..Default::default()
    };
    Fixture { _dir: dir, cfg }
}

fn snapshot(store: &MemoryStore) -> Vec<Vec<Value>> {
    [CATEGORIES, CATEGORY_TREE, VENDORS, PRODUCTS]
        .iter()
        .map(|c| store.documents(c))
        .collect()
}

#[tokio::test]
async fn full_run_migrates_all_three_record_types() {
    let fx = fixture();
    let store = MemoryStore::new();
    let report = migrate_all(&store, &fx.cfg).await.unwrap();

    // categories: every code lands flat, the tree keeps only reachable codes
    assert_eq!(store.documents(CATEGORIES).len(), 7);
    assert_eq!(report.categories.orphans, vec!["0301".to_string()]);
    assert_eq!(report.categories.roots, 3);
    let tree = store.get(CATEGORY_TREE, CATEGORY_TREE_ID).unwrap();
    let deepest = &tree["children"][0]["children"][0]["children"][0]["children"][0];
    assert_eq!(deepest["id"], "01010101");
    assert_eq!(deepest["name"], "Claw Hammers");
    assert_eq!(tree["children"][1]["children"], json!([]));

    // vendors: bad month is a row skip, April 31st rolls into May
    assert_eq!(report.vendors.written(), 2);
    assert_eq!(report.vendors.skips.other_errors, 1);
    assert_eq!(store.get(VENDORS, "7").unwrap()["updatedAt"], "2022-05-01");
    assert!(store.get(VENDORS, "9").is_none());

    // products
    let hammer = store.get(PRODUCTS, "H-1").unwrap();
    assert_eq!(hammer["vendor"], json!({"_id": "034", "name": "Acme"}));
    assert_eq!(
        hammer["category"],
        json!({"_id": "01010101", "name": "Claw Hammers"})
    );
    assert_eq!(hammer["updatedAt"], "2023-03-03");
    assert_eq!(hammer["active"], true);

    let ball_peen = store.get(PRODUCTS, "H-2").unwrap();
    assert_eq!(ball_peen["vendor"], Value::Null);
    assert_eq!(ball_peen["discontinued"], true);

    assert!(store.get(PRODUCTS, "H-3").is_none());
    assert!(store.get(PRODUCTS, "H-4").is_none());
    let skips = &report.products.summary.skips;
    assert_eq!(skips.total, 2);
    assert_eq!(skips.missing_category, 2);
    assert_eq!(skips.missing_both, 1);
    assert_eq!(skips.missing_vendor, 2);
    // the second batch resolves to nothing and is never submitted
    assert_eq!(store.bulk_sizes(PRODUCTS), vec![2]);

    let report_text = fs::read_to_string(&fx.cfg.missing_vendor_report).unwrap();
    let lines: Vec<&str> = report_text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("H-2,,Ball Peen,555,"));
    assert!(lines[2].starts_with("H-3,,Orphan Rake,<NO VENDOR>,"));
    assert_eq!(report.products.missing_vendor_rows, 2);
}

#[tokio::test]
async fn rerun_overwrites_without_duplicates() {
    let fx = fixture();
    let store = MemoryStore::new();
    migrate_all(&store, &fx.cfg).await.unwrap();
    let first = snapshot(&store);

    let second = migrate_all(&store, &fx.cfg).await.unwrap();
    assert_eq!(snapshot(&store), first);
    assert_eq!(second.products.summary.inserted, 0);
    assert_eq!(second.products.summary.updated, 2);
    assert_eq!(second.vendors.inserted, 0);
}

#[tokio::test]
async fn products_before_references_is_fatal() {
    let fx = fixture();
    let store = MemoryStore::new();
    let err = migrate_products_from_file(&store, &fx.cfg)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MigrationError>(),
        Some(MigrationError::EmptyPrerequisite(_))
    ));
    assert!(store.documents(PRODUCTS).is_empty());
    assert!(!fx.cfg.missing_vendor_report.exists());
}

#[tokio::test]
async fn missing_header_column_is_fatal() {
    let fx = fixture();
    fs::write(&fx.cfg.vendors_file, "VENDOR_ID,VENDOR_NAME\n1,Acme\n").unwrap();
    let store = MemoryStore::new();
    let err = migrate_all(&store, &fx.cfg).await.unwrap_err();
    match err.downcast_ref::<MigrationError>() {
        Some(MigrationError::MissingColumns { missing, .. }) => {
            assert_eq!(missing, &["CREATE_DATE", "LAST_MODIFIED_DATE"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(store.documents(VENDORS).is_empty());
}

const UNRESOLVED_PRODUCTS_CSV: &str = "\
SKU,MANUFACTURER_PART_NO,PRODUCT_NAME,VENDOR,DESCRIPTION,ACTIVE_STATUS,DISCONTINUED,CREATED_DATE,LAST_MODIFIED_DATE,COLOR,CATEGORY_CODE
BOTH,,x,999,,yes,no,20220101,20220102,,77
BLANKBOTH,,x,,,yes,no,20220101,20220102,,77
VONLY,,x,999,,yes,no,20220101,20220102,,01
OK,,x,034,,yes,no,20220101,20220102,,01
";

fn missing_vendor_skus(fx: &Fixture) -> Vec<String> {
    let text = fs::read_to_string(&fx.cfg.missing_vendor_report).unwrap();
    text.lines()
        .skip(1)
        .map(|l| l.split(',').next().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn every_unresolved_vendor_is_listed_in_lenient_mode() {
    let fx = fixture();
    fs::write(&fx.cfg.products_file, UNRESOLVED_PRODUCTS_CSV).unwrap();
    let store = MemoryStore::new();
    let report = migrate_all(&store, &fx.cfg).await.unwrap();

    assert_eq!(missing_vendor_skus(&fx), vec!["BOTH", "BLANKBOTH", "VONLY"]);
    let text = fs::read_to_string(&fx.cfg.missing_vendor_report).unwrap();
    assert!(text.contains("BLANKBOTH,,x,<NO VENDOR>,"));
    assert_eq!(report.products.missing_vendor_rows, 3);
    assert!(store.get(PRODUCTS, "VONLY").is_some());
    assert!(store.get(PRODUCTS, "BOTH").is_none());
}

#[tokio::test]
async fn strict_mode_still_lists_vendor_misses() {
    let mut fx = fixture();
    fs::write(&fx.cfg.products_file, UNRESOLVED_PRODUCTS_CSV).unwrap();
    fx.cfg.resolution = ResolutionPolicy::Strict;
    let store = MemoryStore::new();
    let report = migrate_all(&store, &fx.cfg).await.unwrap();

    assert_eq!(missing_vendor_skus(&fx), vec!["BOTH", "BLANKBOTH", "VONLY"]);
    assert!(store.get(PRODUCTS, "VONLY").is_none());
    assert!(store.get(PRODUCTS, "OK").is_some());
    let skips = &report.products.summary.skips;
    assert_eq!(skips.total, 3);
    assert_eq!(skips.missing_vendor, 3);
    assert_eq!(skips.missing_category, 2);
}
