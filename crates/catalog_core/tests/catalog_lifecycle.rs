//! Component and sub-component lifecycle through `CatalogService`.
//!
//! Covers kind dispatch on create, field-level updates with the sentinel
//! clear convention, optimistic locking, queries and redaction.

mod common;

use catalog_core::taxonomy::{
    ComponentFilter, ComponentKind, ComponentPatch, CpuFilter, CpuPatch, CpuSortKey, GpuPatch,
    RangeFilter,
};
use catalog_core::{
    CatalogError, ComponentAttributes, CreateRequest, EntityQuery, QueryRequest, SortDirection,
    SortKey, SubComponentAttributes, UpdateRequest,
};
use common::{admin, guest, Harness};
use serde_json::json;

// ── Create ─────────────────────────────────────────────────────

#[tokio::test]
async fn create_from_wire_payload_dispatches_to_kind() {
    let h = Harness::new();
    let request: CreateRequest<ComponentAttributes> = serde_json::from_value(json!({
        "name": "Ryzen 5 7600",
        "manufacturer": "AMD",
        "release": "2023-01-10",
        "cpu": serde_json::to_value(common::cpu()).unwrap(),
    }))
    .unwrap();
    let id = h.service.create(&admin(), request).await.unwrap();

    let view = h.service.get::<ComponentAttributes>(&guest(), id).await.unwrap();
    assert_eq!(view.kind, ComponentKind::Cpu);
    assert_eq!(view.name, "Ryzen 5 7600");
    assert!(matches!(view.attributes, ComponentAttributes::Cpu(_)));
}

#[tokio::test]
async fn create_without_attribute_object_is_unknown_kind() {
    let h = Harness::new();
    let request: CreateRequest<ComponentAttributes> =
        serde_json::from_value(json!({ "name": "Mystery", "manufacturer": "Acme" })).unwrap();
    let err = h.service.create(&admin(), request).await.unwrap_err();
    assert!(matches!(err, CatalogError::UnknownKind(_)));
}

#[tokio::test]
async fn create_with_two_attribute_objects_is_unknown_kind() {
    let h = Harness::new();
    let request: CreateRequest<ComponentAttributes> = serde_json::from_value(json!({
        "name": "Chimera",
        "manufacturer": "Acme",
        "cpu": serde_json::to_value(common::cpu()).unwrap(),
        "gpu": serde_json::to_value(common::gpu()).unwrap(),
    }))
    .unwrap();
    let err = h.service.create(&admin(), request).await.unwrap_err();
    assert!(matches!(err, CatalogError::UnknownKind(_)));
}

#[tokio::test]
async fn create_rejects_empty_name() {
    let h = Harness::new();
    let err = h
        .service
        .create_typed(
            &admin(),
            catalog_core::NewEntity::new("  ", "AMD"),
            ComponentAttributes::Cpu(common::cpu()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::ValidationFailed(_)));
}

// ── Update ─────────────────────────────────────────────────────

#[tokio::test]
async fn cpu_zero_core_total_is_kept_and_zero_performance_amount_clears() {
    let h = Harness::new();
    let id = h.cpu("Ryzen 7 7700X").await;

    let request = UpdateRequest::<ComponentAttributes>::with_patch(CpuPatch {
        core_total: Some(0),
        performance_amount: Some(0),
        ..Default::default()
    });
    let changes = h.service.update(&admin(), id, request).await.unwrap();
    assert_eq!(
        changes.to_string(),
        "Updated Fields: coreTotal (previously 8), performanceAmount (previously 8)"
    );

    let view = h.service.get::<ComponentAttributes>(&admin(), id).await.unwrap();
    let ComponentAttributes::Cpu(cpu) = view.attributes else {
        panic!("expected a cpu");
    };
    assert_eq!(cpu.core_total, 0);
    assert_eq!(cpu.performance_amount, None);
}

#[tokio::test]
async fn update_records_only_changed_fields() {
    let h = Harness::new();
    let id = h.cpu("Ryzen 7 7700X").await;

    let request: UpdateRequest<ComponentAttributes> = serde_json::from_value(json!({
        "name": "Ryzen 7 7700X",
        "note": "tray version",
        "cpu": { "tdp": 105, "socket": "AM5", "l3Cache": 64 }
    }))
    .unwrap();
    let changes = h.service.update(&admin(), id, request).await.unwrap();
    assert_eq!(changes.fields(), vec!["note", "l3Cache"]);
    assert_eq!(changes.previous("note"), Some("null"));
    assert_eq!(changes.previous("l3Cache"), Some("32"));
}

#[tokio::test]
async fn empty_update_still_bumps_version() {
    let h = Harness::new();
    let id = h.cpu("Ryzen 7 7700X").await;
    let changes = h
        .service
        .update(&admin(), id, UpdateRequest::<ComponentAttributes>::default())
        .await
        .unwrap();
    assert_eq!(changes.to_string(), "No Fields Changed");

    let view = h.service.get::<ComponentAttributes>(&admin(), id).await.unwrap();
    let admin_fields = view.admin.unwrap();
    assert_eq!(admin_fields.version, 2);
    assert!(admin_fields.last_edited_at >= admin_fields.created_at);
}

#[tokio::test]
async fn patch_for_another_kind_is_rejected_and_nothing_changes() {
    let h = Harness::new();
    let id = h.cpu("Ryzen 7 7700X").await;

    let mut request = UpdateRequest::<ComponentAttributes>::with_patch(ComponentPatch::Gpu(GpuPatch {
        memory: Some(24),
        ..Default::default()
    }));
    request.name = Some("Renamed".into());
    let err = h.service.update(&admin(), id, request).await.unwrap_err();
    assert!(matches!(err, CatalogError::ValidationFailed(_)));

    let view = h.service.get::<ComponentAttributes>(&admin(), id).await.unwrap();
    assert_eq!(view.name, "Ryzen 7 7700X");
    assert_eq!(view.admin.unwrap().version, 1);
}

#[tokio::test]
async fn unknown_field_inside_kind_object_fails_to_parse() {
    let parsed: Result<UpdateRequest<ComponentAttributes>, _> =
        serde_json::from_value(json!({ "cpu": { "chipset": "Z790" } }));
    assert!(parsed.is_err());
}

#[tokio::test]
async fn stale_expected_version_is_a_conflict() {
    let h = Harness::new();
    let id = h.cpu("Ryzen 7 7700X").await;
    h.service
        .update(&admin(), id, UpdateRequest::<ComponentAttributes>::default())
        .await
        .unwrap();

    let stale = UpdateRequest::<ComponentAttributes> {
        name: Some("Lost write".into()),
        ..Default::default()
    }
    .expecting(1);
    let err = h.service.update(&admin(), id, stale).await.unwrap_err();
    assert!(matches!(
        err,
        CatalogError::ConflictNotApplied {
            expected: 1,
            actual: 2
        }
    ));
}

#[tokio::test]
async fn update_of_missing_entity_is_not_found() {
    let h = Harness::new();
    let err = h
        .service
        .update(
            &admin(),
            uuid::Uuid::new_v4(),
            UpdateRequest::<SubComponentAttributes>::default(),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

// ── Query ──────────────────────────────────────────────────────

#[tokio::test]
async fn kind_filter_isolates_kind() {
    let h = Harness::new();
    h.cpu("Ryzen 7 7700X").await;
    h.gpu("RTX 4070").await;

    let request: QueryRequest<ComponentAttributes> =
        serde_json::from_value(json!({ "filter": { "gpu": {} } })).unwrap();
    let views = h.service.query(&guest(), request).await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].kind, ComponentKind::Gpu);

    let everything = h
        .service
        .query(&guest(), QueryRequest::<ComponentAttributes>::default())
        .await
        .unwrap();
    assert_eq!(everything.len(), 2);
}

#[tokio::test]
async fn kind_sort_requires_matching_kind_filter() {
    let h = Harness::new();
    let request: QueryRequest<ComponentAttributes> =
        serde_json::from_value(json!({ "orderBy": "coreTotal" })).unwrap();
    let err = h.service.query(&guest(), request).await.unwrap_err();
    assert!(matches!(err, CatalogError::InvalidQuery(_)));

    let request: QueryRequest<ComponentAttributes> = serde_json::from_value(json!({
        "orderBy": "coreTotal",
        "filter": { "gpu": {} }
    }))
    .unwrap();
    let err = h.service.query(&guest(), request).await.unwrap_err();
    assert!(matches!(err, CatalogError::InvalidQuery(_)));
}

#[tokio::test]
async fn range_filter_and_kind_sort() {
    let h = Harness::new();
    for (name, cores) in [("Eight", 8), ("Sixteen", 16), ("Six", 6)] {
        let id = h.cpu(name).await;
        h.service
            .update(
                &admin(),
                id,
                UpdateRequest::<ComponentAttributes>::with_patch(CpuPatch {
                    core_total: Some(cores),
                    ..Default::default()
                }),
            )
            .await
            .unwrap();
    }

    let query = EntityQuery::<ComponentAttributes>::new()
        .filter(CpuFilter {
            core_total: Some(RangeFilter::at_least(8)),
            ..Default::default()
        })
        .order_by(SortKey::Kind(CpuSortKey::CoreTotal.into()), SortDirection::Desc);
    let views = h.service.query_typed(&guest(), query).await.unwrap();
    let names: Vec<_> = views.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["Sixteen", "Eight"]);
}

#[tokio::test]
async fn free_text_matches_every_token_across_fields() {
    let h = Harness::new();
    h.cpu("Ryzen 7 7700X").await;
    h.gpu("RTX 4070").await;

    let query = EntityQuery::<ComponentAttributes>::new().search("amd zen");
    let views = h.service.query_typed(&guest(), query).await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].name, "Ryzen 7 7700X");

    let query = EntityQuery::<ComponentAttributes>::new().search("amd gddr6x");
    assert!(h.service.query_typed(&guest(), query).await.unwrap().is_empty());
}

#[tokio::test]
async fn filter_narrows_and_base_filter_conjoins() {
    let h = Harness::new();
    h.cpu("Ryzen 7 7700X").await;
    h.cpu("Ryzen 9 7950X").await;

    let query = EntityQuery::<ComponentAttributes>::new()
        .names(["Ryzen 9 7950X"])
        .filter(ComponentFilter::of_kind(ComponentKind::Cpu));
    let views = h.service.query_typed(&guest(), query).await.unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].name, "Ryzen 9 7950X");
}

#[tokio::test]
async fn oversized_page_is_invalid() {
    let h = Harness::new();
    let query = EntityQuery::<ComponentAttributes>::new().paged(1, 10_000);
    let err = h.service.query_typed(&guest(), query).await.unwrap_err();
    assert!(matches!(err, CatalogError::InvalidQuery(_)));
}

// ── Projection ─────────────────────────────────────────────────

#[tokio::test]
async fn public_views_are_redacted() {
    let h = Harness::new();
    let id = h.cpu("Ryzen 7 7700X").await;
    h.service
        .update(
            &admin(),
            id,
            UpdateRequest::<ComponentAttributes> {
                note: Some("internal".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let public = serde_json::to_value(
        h.service
            .get::<ComponentAttributes>(&guest(), id)
            .await
            .unwrap(),
    )
    .unwrap();
    for key in ["note", "createdAt", "lastEditedAt", "version"] {
        assert!(public.get(key).is_none(), "{key} leaked to a public caller");
    }
    assert_eq!(public["coreTotal"], json!(8));
    assert!(public.get("chipset").is_none());

    let private = serde_json::to_value(
        h.service
            .get::<ComponentAttributes>(&admin(), id)
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(private["note"], json!("internal"));
    assert_eq!(private["version"], json!(2));
}

#[tokio::test]
async fn empty_note_clears() {
    let h = Harness::new();
    let id = h
        .service
        .create_typed(
            &admin(),
            catalog_core::NewEntity::new("LAN", "Intel").with_note("check driver"),
            SubComponentAttributes::OnboardEthernet(
                catalog_core::taxonomy::OnboardEthernetFields {
                    speed: 2500,
                    controller: None,
                },
            ),
        )
        .await
        .unwrap();
    let changes = h
        .service
        .update(
            &admin(),
            id,
            UpdateRequest::<SubComponentAttributes> {
                note: Some(String::new()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(changes.previous("note"), Some("check driver"));
    let view = h
        .service
        .get::<SubComponentAttributes>(&admin(), id)
        .await
        .unwrap();
    assert_eq!(view.admin.unwrap().note, None);
}

// ── Delete ─────────────────────────────────────────────────────

#[tokio::test]
async fn delete_then_get_is_not_found() {
    let h = Harness::new();
    let id = h.gpu("RTX 4070").await;
    h.service.delete::<ComponentAttributes>(&admin(), id).await.unwrap();
    assert!(h
        .service
        .get::<ComponentAttributes>(&admin(), id)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(h
        .service
        .delete::<ComponentAttributes>(&admin(), id)
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn guest_cannot_delete() {
    let h = Harness::new();
    let id = h.gpu("RTX 4070").await;
    let err = h
        .service
        .delete::<ComponentAttributes>(&guest(), id)
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Forbidden(_)));
}
