//! Paging determinism: walking every page yields the unpaged ordering,
//! and repeating a query yields the same page.

mod common;

use catalog_core::taxonomy::{PortFields, SubComponentAttributes};
use catalog_core::{
    BaseSortKey, CatalogConfig, CatalogService, EntityQuery, NewEntity, SortDirection, SortKey,
};
use common::{admin, guest};
use proptest::prelude::*;
use uuid::Uuid;

fn arb_names() -> impl Strategy<Value = Vec<String>> {
    // A small alphabet forces ties, which only the id tie-break resolves.
    prop::collection::vec("[a-c]{1,2}", 0..24)
}

fn arb_direction() -> impl Strategy<Value = SortDirection> {
    prop_oneof![Just(SortDirection::Asc), Just(SortDirection::Desc)]
}

async fn seed(names: &[String]) -> CatalogService {
    let service = CatalogService::in_memory(CatalogConfig::fixed());
    for name in names {
        service
            .create_typed(
                &admin(),
                NewEntity::new(name.clone(), "Acme"),
                SubComponentAttributes::Port(PortFields {
                    port_type: "USB-A".into(),
                    standard: None,
                    speed: None,
                }),
            )
            .await
            .unwrap();
    }
    service
}

async fn ids(service: &CatalogService, query: EntityQuery<SubComponentAttributes>) -> Vec<Uuid> {
    service
        .query_typed(&guest(), query)
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.id)
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn pages_partition_the_full_ordering(
        names in arb_names(),
        page_length in 1u32..7,
        direction in arb_direction(),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let service = seed(&names).await;
            let ordered = || {
                EntityQuery::<SubComponentAttributes>::new()
                    .order_by(SortKey::Base(BaseSortKey::Name), direction)
            };

            let full = ids(&service, ordered()).await;
            prop_assert_eq!(full.len(), names.len());

            let mut walked = Vec::new();
            let mut page = 1;
            loop {
                let chunk = ids(&service, ordered().paged(page, page_length)).await;
                prop_assert!(chunk.len() <= page_length as usize);
                if chunk.is_empty() {
                    break;
                }
                walked.extend(chunk);
                page += 1;
            }
            prop_assert_eq!(&walked, &full);

            let again = ids(&service, ordered().paged(1, page_length)).await;
            let first: Vec<Uuid> = full.iter().take(page_length as usize).copied().collect();
            prop_assert_eq!(again, first);
            Ok(())
        })?;
    }
}
