//! Shared fixtures for the catalog_core integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use catalog_core::sinks::{RecordingAuditSink, RecordingEventPublisher};
use catalog_core::taxonomy::{
    CpuFields, GpuFields, OnboardEthernetFields, PortFields, SubComponentAttributes,
};
use catalog_core::{
    CallerContext, CatalogConfig, CatalogService, ComponentAttributes, MemoryStore, NewEntity,
};
use rust_decimal::Decimal;
use uuid::Uuid;

pub struct Harness {
    pub service: CatalogService,
    pub audit: Arc<RecordingAuditSink>,
    pub events: Arc<RecordingEventPublisher>,
}

impl Harness {
    pub fn new() -> Self {
        let audit = Arc::new(RecordingAuditSink::new());
        let events = Arc::new(RecordingEventPublisher::new());
        let service = CatalogService::new(
            Arc::new(MemoryStore::new()),
            audit.clone(),
            events.clone(),
            CatalogConfig::fixed(),
        );
        Self {
            service,
            audit,
            events,
        }
    }

    pub async fn cpu(&self, name: &str) -> Uuid {
        self.service
            .create_typed(&admin(), NewEntity::new(name, "AMD"), ComponentAttributes::Cpu(cpu()))
            .await
            .unwrap()
    }

    pub async fn gpu(&self, name: &str) -> Uuid {
        self.service
            .create_typed(&admin(), NewEntity::new(name, "NVIDIA"), ComponentAttributes::Gpu(gpu()))
            .await
            .unwrap()
    }

    pub async fn ethernet(&self, name: &str) -> Uuid {
        self.service
            .create_typed(
                &admin(),
                NewEntity::new(name, "Realtek"),
                SubComponentAttributes::OnboardEthernet(OnboardEthernetFields {
                    speed: 1000,
                    controller: Some("RTL8111H".into()),
                }),
            )
            .await
            .unwrap()
    }

    pub async fn port(&self, name: &str, port_type: &str) -> Uuid {
        self.service
            .create_typed(
                &admin(),
                NewEntity::new(name, "Generic"),
                SubComponentAttributes::Port(PortFields {
                    port_type: port_type.into(),
                    standard: None,
                    speed: None,
                }),
            )
            .await
            .unwrap()
    }
}

pub fn admin() -> CallerContext {
    CallerContext::privileged("admin").with_source_ip("127.0.0.1")
}

pub fn guest() -> CallerContext {
    CallerContext::public("guest")
}

pub fn cpu() -> CpuFields {
    CpuFields {
        series: "Ryzen 7".into(),
        microarchitecture: Some("Zen 4".into()),
        core_family: Some("Raphael".into()),
        socket: "AM5".into(),
        core_total: 8,
        performance_amount: Some(8),
        efficiency_amount: None,
        thread_amount: 16,
        performance_core_clock: Some(Decimal::new(45, 1)),
        performance_boost_clock: Some(Decimal::new(54, 1)),
        efficiency_core_clock: None,
        efficiency_boost_clock: None,
        l2_cache: Some(8),
        l3_cache: Some(32),
        tdp: 105,
        lithography: Some(5),
        includes_cooler: false,
        integrated_graphics: Some("Radeon Graphics".into()),
        simultaneous_multithreading: true,
        ecc_support: None,
        max_supported_memory: Some(128),
    }
}

pub fn gpu() -> GpuFields {
    GpuFields {
        chipset: "GeForce RTX 4070".into(),
        memory: 12,
        memory_type: Some("GDDR6X".into()),
        core_base_clock: Some(Decimal::new(1920, 0)),
        core_boost_clock: Some(Decimal::new(2475, 0)),
        effective_memory_clock: Some(21000),
        memory_bus: Some(192),
        interface: "PCIe x16".into(),
        length: Some(244),
        slot_width: Some(2),
        tdp: Some(200),
        hdmi_outputs: Some(1),
        display_port_outputs: Some(3),
        frame_sync: Some("G-Sync".into()),
        cooling: Some("2 Fans".into()),
        sli_crossfire: Some(false),
    }
}
