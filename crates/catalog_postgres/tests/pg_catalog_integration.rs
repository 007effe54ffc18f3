//! Catalog service over a real Postgres store.
//!
//! Requires a reachable PostgreSQL database; the schema is applied on
//! connect. Run with:
//! DATABASE_URL="postgresql:///catalog" cargo test -p catalog_postgres --test pg_catalog_integration -- --ignored --nocapture

use catalog_core::taxonomy::{CpuFilter, CpuPatch, CpuSortKey, RangeFilter};
use catalog_core::{
    CallerContext, CatalogConfig, CatalogError, CatalogService, Color, ComponentAttributes,
    ComponentCompatibility, CreateRequest, EntityQuery, NewVariant, SortDirection, SortKey,
    UpdateRequest,
};
use catalog_postgres::{connect, DatabaseConfig, DatabaseManager};
use serde_json::json;
use uuid::Uuid;

fn admin() -> CallerContext {
    CallerContext::privileged("integration").with_source_ip("127.0.0.1")
}

async fn setup() -> (DatabaseManager, CatalogService) {
    let (manager, service) = connect(DatabaseConfig::default(), CatalogConfig::fixed())
        .await
        .expect("connect to DATABASE_URL");
    manager.run_migrations().await.expect("apply schema");
    (manager, service)
}

/// Suffix keeping names and color codes of concurrent runs apart.
fn tag() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

async fn create_cpu(service: &CatalogService, name: &str, cores: i32) -> Uuid {
    let request: CreateRequest<ComponentAttributes> = serde_json::from_value(json!({
        "name": name,
        "manufacturer": "AMD",
        "release": "2022-09-27",
        "cpu": {
            "series": "Ryzen 7",
            "microarchitecture": "Zen 4",
            "coreFamily": null,
            "socket": "AM5",
            "coreTotal": cores,
            "performanceAmount": cores,
            "efficiencyAmount": null,
            "threadAmount": cores * 2,
            "performanceCoreClock": "4.5",
            "performanceBoostClock": "5.4",
            "efficiencyCoreClock": null,
            "efficiencyBoostClock": null,
            "l2Cache": 8,
            "l3Cache": 32,
            "tdp": 105,
            "lithography": 5,
            "includesCooler": false,
            "integratedGraphics": null,
            "simultaneousMultithreading": true,
            "eccSupport": null,
            "maxSupportedMemory": 128
        }
    }))
    .expect("cpu payload");
    service.create(&admin(), request).await.expect("create cpu")
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database"]
async fn schema_is_complete_after_migration() {
    let (manager, _service) = setup().await;
    let present = manager.verify_schema().await.unwrap();
    assert_eq!(present, catalog_postgres::schema::TABLES.len() as i64);
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database"]
async fn kind_filter_and_kind_sort_run_in_sql() {
    let (_manager, service) = setup().await;
    let tag = tag();
    let small = create_cpu(&service, &format!("Ryzen 5 {tag}"), 6).await;
    let large = create_cpu(&service, &format!("Ryzen 9 {tag}"), 16).await;

    let query = EntityQuery::<ComponentAttributes>::new()
        .names([format!("Ryzen 5 {tag}"), format!("Ryzen 9 {tag}")])
        .filter(CpuFilter {
            core_total: Some(RangeFilter::at_least(6)),
            ..Default::default()
        })
        .order_by(
            SortKey::Kind(catalog_core::taxonomy::ComponentSortKey::Cpu(CpuSortKey::CoreTotal)),
            SortDirection::Desc,
        );
    let ids: Vec<Uuid> = service
        .query_typed(&admin(), query.clone())
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.id)
        .collect();
    assert_eq!(ids, vec![large, small]);

    let page = service
        .query_typed(&admin(), query.paged(2, 1))
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, small);

    let hits = service
        .query_typed(&admin(), EntityQuery::<ComponentAttributes>::new().search(&format!("zen {tag}")))
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);

    for id in [small, large] {
        service.delete::<ComponentAttributes>(&admin(), id).await.unwrap();
    }
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database"]
async fn update_clears_with_sentinel_and_checks_version() {
    let (_manager, service) = setup().await;
    let id = create_cpu(&service, &format!("Ryzen 7 {}", tag()), 8).await;

    let changes = service
        .update(
            &admin(),
            id,
            UpdateRequest::<ComponentAttributes>::with_patch(CpuPatch {
                l3_cache: Some(0),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
    assert_eq!(changes.fields(), vec!["l3Cache"]);

    let stale = UpdateRequest::<ComponentAttributes>::default().expecting(1);
    let err = service.update(&admin(), id, stale).await.unwrap_err();
    assert!(matches!(
        err,
        CatalogError::ConflictNotApplied {
            expected: 1,
            actual: 2
        }
    ));

    service.delete::<ComponentAttributes>(&admin(), id).await.unwrap();
    assert!(service
        .get::<ComponentAttributes>(&admin(), id)
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database"]
async fn color_delete_cascades_in_one_transaction() {
    let (_manager, service) = setup().await;
    let tag = tag();
    let cpu = create_cpu(&service, &format!("Ryzen 7 {tag}"), 8).await;
    let code = format!("BLK-{tag}");
    service
        .create_color(
            &admin(),
            Color {
                code: code.clone(),
                name: format!("Black {tag}"),
                note: None,
            },
        )
        .await
        .unwrap();
    let variant = service
        .create_variant(&admin(), NewVariant::new(cpu).colors([code.clone()]))
        .await
        .unwrap();
    service
        .add_component_color(&admin(), cpu, &code, None)
        .await
        .unwrap();

    let found = service
        .search_variants(&admin(), &format!("ryzen black {tag}"))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);

    let cascade = service.delete_color(&admin(), &code).await.unwrap();
    assert_eq!(cascade.removed_variants, vec![variant]);
    assert_eq!(cascade.removed_component_colors, 1);
    assert!(service.get_variant(&admin(), variant).await.is_err());

    service.delete::<ComponentAttributes>(&admin(), cpu).await.unwrap();
}

#[tokio::test]
#[ignore = "Requires a PostgreSQL database"]
async fn entity_delete_drops_edges() {
    let (_manager, service) = setup().await;
    let tag = tag();
    let a = create_cpu(&service, &format!("Ryzen 5 {tag}"), 6).await;
    let b = create_cpu(&service, &format!("Ryzen 9 {tag}"), 16).await;
    service
        .add_compatibility(
            &admin(),
            ComponentCompatibility {
                component_id: a,
                compatible_component_id: b,
            },
        )
        .await
        .unwrap();
    let err = service
        .add_compatibility(
            &admin(),
            ComponentCompatibility {
                component_id: a,
                compatible_component_id: b,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::ValidationFailed(_)));

    service.delete::<ComponentAttributes>(&admin(), b).await.unwrap();
    assert!(service.compatibilities(a).await.unwrap().is_empty());
    service.delete::<ComponentAttributes>(&admin(), a).await.unwrap();
}
