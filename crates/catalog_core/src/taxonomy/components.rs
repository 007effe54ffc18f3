//! The ten component kinds.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::Dimensions;

kind_fields! {
    /// Computer chassis.
    CaseFields, CasePatch, CaseFilter, CaseSortKey {
        form_factor(FormFactor): String => "formFactor", search;
        case_type(CaseType): Option<String> => "caseType", search;
        side_panel(SidePanel): Option<String> => "sidePanel", search;
        has_power_supply(HasPowerSupply): bool => "hasPowerSupply";
        power_supply_wattage(PowerSupplyWattage): Option<i32> => "powerSupplyWattage";
        internal_35_bays(Internal35Bays): Option<i32> => "internal35Bays";
        internal_25_bays(Internal25Bays): Option<i32> => "internal25Bays";
        expansion_slots(ExpansionSlots): i32 => "expansionSlots";
        max_gpu_length(MaxGpuLength): Option<i32> => "maxGpuLength";
        max_cooler_height(MaxCoolerHeight): Option<i32> => "maxCoolerHeight";
        front_usb_ports(FrontUsbPorts): Option<i32> => "frontUsbPorts";
        has_usb_type_c(HasUsbTypeC): Option<bool> => "hasUsbTypeC";
        dimensions(Dimensions): Dimensions => "dimensions";
        weight(Weight): Option<Decimal> => "weight";
        volume(Volume): Option<Decimal> => "volume";
    }
}

kind_fields! {
    CaseFanFields, CaseFanPatch, CaseFanFilter, CaseFanSortKey {
        size(Size): i32 => "size";
        quantity(Quantity): i32 => "quantity";
        min_rpm(MinRpm): Option<i32> => "minRpm";
        max_rpm(MaxRpm): Option<i32> => "maxRpm";
        airflow(Airflow): Option<Decimal> => "airflow";
        noise_level(NoiseLevel): Option<Decimal> => "noiseLevel";
        static_pressure(StaticPressure): Option<Decimal> => "staticPressure";
        connector(Connector): Option<String> => "connector", search;
        controller(Controller): Option<String> => "controller", search;
        led(Led): Option<String> => "led", search;
        pwm(Pwm): bool => "pwm";
    }
}

kind_fields! {
    /// CPU air or liquid cooler.
    CoolerFields, CoolerPatch, CoolerFilter, CoolerSortKey {
        cooler_type(CoolerType): String => "coolerType", search;
        min_rpm(MinRpm): Option<i32> => "minRpm";
        max_rpm(MaxRpm): Option<i32> => "maxRpm";
        noise_level(NoiseLevel): Option<Decimal> => "noiseLevel";
        height(Height): Option<i32> => "height";
        radiator_size(RadiatorSize): Option<i32> => "radiatorSize";
        fan_size(FanSize): Option<i32> => "fanSize";
        fan_quantity(FanQuantity): Option<i32> => "fanQuantity";
        water_cooled(WaterCooled): bool => "waterCooled";
        fanless(Fanless): bool => "fanless";
        max_tdp(MaxTdp): Option<i32> => "maxTdp";
        led(Led): Option<String> => "led", search;
    }
}

kind_fields! {
    /// Processor. `coreTotal` keeps zero as a literal value; the per-cluster
    /// core counts treat zero as "not applicable".
    CpuFields, CpuPatch, CpuFilter, CpuSortKey {
        series(Series): String => "series", search;
        microarchitecture(Microarchitecture): Option<String> => "microarchitecture", search;
        core_family(CoreFamily): Option<String> => "coreFamily", search;
        socket(Socket): String => "socket", search;
        core_total(CoreTotal): i32 => "coreTotal";
        performance_amount(PerformanceAmount): Option<i32> => "performanceAmount";
        efficiency_amount(EfficiencyAmount): Option<i32> => "efficiencyAmount";
        thread_amount(ThreadAmount): i32 => "threadAmount";
        performance_core_clock(PerformanceCoreClock): Option<Decimal> => "performanceCoreClock";
        performance_boost_clock(PerformanceBoostClock): Option<Decimal> => "performanceBoostClock";
        efficiency_core_clock(EfficiencyCoreClock): Option<Decimal> => "efficiencyCoreClock";
        efficiency_boost_clock(EfficiencyBoostClock): Option<Decimal> => "efficiencyBoostClock";
        l2_cache(L2Cache): Option<i32> => "l2Cache";
        l3_cache(L3Cache): Option<i32> => "l3Cache";
        tdp(Tdp): i32 => "tdp";
        lithography(Lithography): Option<i32> => "lithography";
        includes_cooler(IncludesCooler): bool => "includesCooler";
        integrated_graphics(IntegratedGraphics): Option<String> => "integratedGraphics", search;
        simultaneous_multithreading(SimultaneousMultithreading): bool => "simultaneousMultithreading";
        ecc_support(EccSupport): Option<bool> => "eccSupport";
        max_supported_memory(MaxSupportedMemory): Option<i32> => "maxSupportedMemory";
    }
}

kind_fields! {
    /// Discrete graphics card.
    GpuFields, GpuPatch, GpuFilter, GpuSortKey {
        chipset(Chipset): String => "chipset", search;
        memory(Memory): i32 => "memory";
        memory_type(MemoryType): Option<String> => "memoryType", search;
        core_base_clock(CoreBaseClock): Option<Decimal> => "coreBaseClock";
        core_boost_clock(CoreBoostClock): Option<Decimal> => "coreBoostClock";
        effective_memory_clock(EffectiveMemoryClock): Option<i32> => "effectiveMemoryClock";
        memory_bus(MemoryBus): Option<i32> => "memoryBus";
        interface(Interface): String => "interface", search;
        length(Length): Option<i32> => "length";
        slot_width(SlotWidth): Option<i32> => "slotWidth";
        tdp(Tdp): Option<i32> => "tdp";
        hdmi_outputs(HdmiOutputs): Option<i32> => "hdmiOutputs";
        display_port_outputs(DisplayPortOutputs): Option<i32> => "displayPortOutputs";
        frame_sync(FrameSync): Option<String> => "frameSync", search;
        cooling(Cooling): Option<String> => "cooling";
        sli_crossfire(SliCrossfire): Option<bool> => "sliCrossfire";
    }
}

kind_fields! {
    /// Memory kit.
    MemoryFields, MemoryPatch, MemoryFilter, MemorySortKey {
        speed(Speed): i32 => "speed";
        memory_type(MemoryType): String => "memoryType", search;
        form_factor(FormFactor): String => "formFactor", search;
        modules(Modules): i32 => "modules";
        module_size(ModuleSize): i32 => "moduleSize";
        cas_latency(CasLatency): Option<Decimal> => "casLatency";
        timings(Timings): Option<String> => "timings", search;
        voltage(Voltage): Option<Decimal> => "voltage";
        ecc(Ecc): bool => "ecc";
        registered(Registered): bool => "registered";
        heat_spreader(HeatSpreader): bool => "heatSpreader";
    }
}

kind_fields! {
    MonitorFields, MonitorPatch, MonitorFilter, MonitorSortKey {
        screen_size(ScreenSize): Decimal => "screenSize";
        horizontal_resolution(HorizontalResolution): i32 => "horizontalResolution";
        vertical_resolution(VerticalResolution): i32 => "verticalResolution";
        aspect_ratio(AspectRatio): String => "aspectRatio", search;
        panel_type(PanelType): String => "panelType", search;
        response_time(ResponseTime): Option<Decimal> => "responseTime";
        refresh_rate(RefreshRate): i32 => "refreshRate";
        viewing_angle(ViewingAngle): Option<String> => "viewingAngle";
        brightness(Brightness): Option<i32> => "brightness";
        frame_sync(FrameSync): Option<String> => "frameSync", search;
        hdr(Hdr): Option<String> => "hdr", search;
        curved(Curved): bool => "curved";
        built_in_speakers(BuiltInSpeakers): bool => "builtInSpeakers";
    }
}

kind_fields! {
    MotherboardFields, MotherboardPatch, MotherboardFilter, MotherboardSortKey {
        socket(Socket): String => "socket", search;
        form_factor(FormFactor): String => "formFactor", search;
        chipset(Chipset): String => "chipset", search;
        memory_type(MemoryType): String => "memoryType", search;
        memory_max(MemoryMax): Option<i32> => "memoryMax";
        memory_slots(MemorySlots): i32 => "memorySlots";
        memory_speed_max(MemorySpeedMax): Option<i32> => "memorySpeedMax";
        sata_ports(SataPorts): Option<i32> => "sataPorts";
        wireless_networking(WirelessNetworking): Option<String> => "wirelessNetworking", search;
        ecc_support(EccSupport): Option<bool> => "eccSupport";
        raid_support(RaidSupport): Option<bool> => "raidSupport";
        onboard_video(OnboardVideo): bool => "onboardVideo";
        back_connect(BackConnect): bool => "backConnect";
    }
}

kind_fields! {
    PowerSupplyFields, PowerSupplyPatch, PowerSupplyFilter, PowerSupplySortKey {
        wattage(Wattage): i32 => "wattage";
        form_factor(FormFactor): String => "formFactor", search;
        efficiency_rating(EfficiencyRating): Option<String> => "efficiencyRating", search;
        modular(Modular): String => "modular", search;
        length(Length): Option<i32> => "length";
        fanless(Fanless): bool => "fanless";
        eps_8_pin_connectors(Eps8PinConnectors): Option<i32> => "eps8PinConnectors";
        pcie_16_pin_connectors(Pcie16PinConnectors): Option<i32> => "pcie16PinConnectors";
        pcie_8_pin_connectors(Pcie8PinConnectors): Option<i32> => "pcie8PinConnectors";
        sata_connectors(SataConnectors): Option<i32> => "sataConnectors";
        molex_4_pin_connectors(Molex4PinConnectors): Option<i32> => "molex4PinConnectors";
    }
}

kind_fields! {
    StorageFields, StoragePatch, StorageFilter, StorageSortKey {
        storage_type(StorageType): String => "storageType", search;
        capacity(Capacity): i32 => "capacity";
        form_factor(FormFactor): String => "formFactor", search;
        interface(Interface): String => "interface", search;
        cache(Cache): Option<i32> => "cache";
        rpm(Rpm): Option<i32> => "rpm";
        nvme(Nvme): bool => "nvme";
        sequential_read(SequentialRead): Option<i32> => "sequentialRead";
        sequential_write(SequentialWrite): Option<i32> => "sequentialWrite";
        endurance_tbw(EnduranceTbw): Option<i32> => "enduranceTbw";
        warranty_end(WarrantyEnd): Option<NaiveDate> => "warrantyEnd";
    }
}

taxonomy_family! {
    family: "component",
    kind: ComponentKind,
    attributes: ComponentAttributes,
    create_sets: ComponentCreateSets,
    patch: ComponentPatch,
    patch_sets: ComponentPatchSets,
    filter: ComponentFilter,
    sort_key: ComponentSortKey,
    kinds: {
        Case(case) => "case": CaseFields, CasePatch, CaseFilter, CaseSortKey;
        CaseFan(case_fan) => "caseFan": CaseFanFields, CaseFanPatch, CaseFanFilter, CaseFanSortKey;
        Cooler(cooler) => "cooler": CoolerFields, CoolerPatch, CoolerFilter, CoolerSortKey;
        Cpu(cpu) => "cpu": CpuFields, CpuPatch, CpuFilter, CpuSortKey;
        Gpu(gpu) => "gpu": GpuFields, GpuPatch, GpuFilter, GpuSortKey;
        Memory(memory) => "memory": MemoryFields, MemoryPatch, MemoryFilter, MemorySortKey;
        Monitor(monitor) => "monitor": MonitorFields, MonitorPatch, MonitorFilter, MonitorSortKey;
        Motherboard(motherboard) => "motherboard": MotherboardFields, MotherboardPatch, MotherboardFilter, MotherboardSortKey;
        PowerSupply(power_supply) => "powerSupply": PowerSupplyFields, PowerSupplyPatch, PowerSupplyFilter, PowerSupplySortKey;
        Storage(storage) => "storage": StorageFields, StoragePatch, StorageFilter, StorageSortKey;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::ChangeSummary;
    use crate::error::CatalogError;
    use crate::taxonomy::{RangeFilter, Taxonomy};
    use serde_json::json;

    fn sample_cpu() -> CpuFields {
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
            ecc_support: Some(true),
            max_supported_memory: Some(128),
        }
    }

    #[test]
    fn cpu_patch_zero_clears_nullable_but_not_required() {
        let mut cpu = sample_cpu();
        let mut changes = ChangeSummary::new();
        let patch = CpuPatch {
            core_total: Some(0),
            performance_amount: Some(0),
            ..Default::default()
        };
        cpu.apply_patch(patch, &mut changes);
        assert_eq!(cpu.core_total, 0);
        assert_eq!(cpu.performance_amount, None);
        assert_eq!(
            changes.to_string(),
            "Updated Fields: coreTotal (previously 8), performanceAmount (previously 8)"
        );
    }

    #[test]
    fn patch_with_same_values_records_nothing() {
        let mut cpu = sample_cpu();
        let mut changes = ChangeSummary::new();
        let patch = CpuPatch {
            socket: Some("AM5".into()),
            tdp: Some(105),
            ..Default::default()
        };
        cpu.apply_patch(patch, &mut changes);
        assert!(changes.is_empty());
    }

    #[test]
    fn patch_rejects_foreign_kind_untouched() {
        let mut attrs = ComponentAttributes::Cpu(sample_cpu());
        let before = attrs.clone();
        let mut changes = ChangeSummary::new();
        let patch = ComponentPatch::Gpu(GpuPatch {
            memory: Some(16),
            ..Default::default()
        });
        let err = attrs.apply_patch(patch, &mut changes).unwrap_err();
        assert!(matches!(err, CatalogError::ValidationFailed(_)));
        assert_eq!(attrs, before);
        assert!(changes.is_empty());
    }

    #[test]
    fn unknown_key_inside_kind_object_is_rejected() {
        let value = json!({ "cpu": { "memory": 16 } });
        let parsed: Result<ComponentPatchSets, _> = serde_json::from_value(value);
        assert!(parsed.is_err());
    }

    #[test]
    fn create_sets_require_exactly_one_object() {
        let none = ComponentCreateSets::default();
        assert!(matches!(
            none.into_attributes(None),
            Err(CatalogError::UnknownKind(_))
        ));

        let sets = ComponentCreateSets {
            cpu: Some(sample_cpu()),
            ..Default::default()
        };
        assert_eq!(sets.populated_kinds(), vec![ComponentKind::Cpu]);
        let attrs = sets.clone().into_attributes(Some(ComponentKind::Cpu)).unwrap();
        assert_eq!(attrs.kind(), ComponentKind::Cpu);

        let mismatch = sets.into_attributes(Some(ComponentKind::Gpu));
        assert!(matches!(mismatch, Err(CatalogError::UnknownKind(_))));
    }

    #[test]
    fn filter_on_other_kind_never_matches() {
        let attrs = ComponentAttributes::Cpu(sample_cpu());
        let gpu_filter = ComponentFilter::of_kind(ComponentKind::Gpu);
        assert!(!attrs.matches(&gpu_filter));
        assert!(attrs.matches(&ComponentFilter::of_kind(ComponentKind::Cpu)));
    }

    #[test]
    fn cpu_filter_conjoins_constraints() {
        let attrs = ComponentAttributes::Cpu(sample_cpu());
        let filter = ComponentFilter::Cpu(CpuFilter {
            core_total: Some(RangeFilter::between(6, 12)),
            socket: Some(vec!["AM5".into(), "AM4".into()]),
            includes_cooler: Some(false),
            ..Default::default()
        });
        assert!(attrs.matches(&filter));

        let filter = ComponentFilter::Cpu(CpuFilter {
            core_total: Some(RangeFilter::between(6, 12)),
            includes_cooler: Some(true),
            ..Default::default()
        });
        assert!(!attrs.matches(&filter));
    }

    #[test]
    fn search_text_lists_declared_fields_only() {
        let cpu = sample_cpu();
        let text = cpu.search_text();
        assert!(text.contains(&"AM5"));
        assert!(text.contains(&"Zen 4"));
        assert!(!text.iter().any(|t| t.contains("105")));
    }

    #[test]
    fn attributes_serialize_without_tag() {
        let attrs = ComponentAttributes::Cpu(sample_cpu());
        let value = attrs.to_json().unwrap();
        assert_eq!(value["coreTotal"], json!(8));
        assert_eq!(value["efficiencyAmount"], serde_json::Value::Null);
        assert!(value.get("cpu").is_none());

        let back = ComponentAttributes::from_json(ComponentKind::Cpu, value).unwrap();
        assert_eq!(back, attrs);
    }

    #[test]
    fn kind_tags_parse() {
        assert_eq!(ComponentKind::parse("powerSupply"), Some(ComponentKind::PowerSupply));
        assert_eq!(ComponentKind::parse("PowerSupply"), None);
        assert_eq!(ComponentKind::Cpu.to_string(), "cpu");
    }

    #[test]
    fn sort_key_parse_is_kind_scoped() {
        assert!(ComponentSortKey::parse(ComponentKind::Cpu, "coreTotal").is_some());
        assert!(ComponentSortKey::parse(ComponentKind::Gpu, "coreTotal").is_none());
    }

    #[test]
    fn case_dimensions_patch_replaces_whole_value() {
        let mut case = CaseFields {
            form_factor: "ATX".into(),
            case_type: Some("Mid Tower".into()),
            side_panel: None,
            has_power_supply: false,
            power_supply_wattage: None,
            internal_35_bays: Some(2),
            internal_25_bays: Some(2),
            expansion_slots: 7,
            max_gpu_length: Some(360),
            max_cooler_height: Some(170),
            front_usb_ports: Some(2),
            has_usb_type_c: Some(true),
            dimensions: Dimensions::new(230, 466, 453),
            weight: None,
            volume: None,
        };
        let mut changes = ChangeSummary::new();
        case.apply_patch(
            CasePatch {
                dimensions: Some(Dimensions::new(230, 470, 453)),
                case_type: Some(String::new()),
                ..Default::default()
            },
            &mut changes,
        );
        assert_eq!(case.dimensions.height_mm, 470);
        assert_eq!(case.case_type, None);
        assert_eq!(changes.previous("caseType"), Some("Mid Tower"));
        assert_eq!(changes.previous("dimensions"), Some("230 x 466 x 453 mm"));
    }
}
