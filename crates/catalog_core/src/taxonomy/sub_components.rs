//! The six sub-component kinds. Sub-components are parts a component is
//! built from (a motherboard's M.2 slots, a CPU's integrated graphics).

use rust_decimal::Decimal;

kind_fields! {
    CoolerSocketFields, CoolerSocketPatch, CoolerSocketFilter, CoolerSocketSortKey {
        socket(Socket): String => "socket", search;
    }
}

kind_fields! {
    IntegratedGraphicsFields, IntegratedGraphicsPatch, IntegratedGraphicsFilter, IntegratedGraphicsSortKey {
        model(Model): String => "model", search;
        base_clock(BaseClock): Option<i32> => "baseClock";
        boost_clock(BoostClock): Option<i32> => "boostClock";
        shader_units(ShaderUnits): Option<i32> => "shaderUnits";
        direct_x(DirectX): Option<String> => "directX", search;
    }
}

kind_fields! {
    M2SlotFields, M2SlotPatch, M2SlotFilter, M2SlotSortKey {
        size(Size): String => "size", search;
        key_type(KeyType): String => "keyType", search;
        interface(Interface): String => "interface", search;
        supports_sata(SupportsSata): bool => "supportsSata";
    }
}

kind_fields! {
    OnboardEthernetFields, OnboardEthernetPatch, OnboardEthernetFilter, OnboardEthernetSortKey {
        speed(Speed): i32 => "speed";
        controller(Controller): Option<String> => "controller", search;
    }
}

kind_fields! {
    PcieSlotFields, PcieSlotPatch, PcieSlotFilter, PcieSlotSortKey {
        generation(Generation): String => "gen", search;
        lanes(Lanes): i32 => "lanes";
        physical_size(PhysicalSize): Option<i32> => "physicalSize";
        is_reinforced(IsReinforced): bool => "isReinforced";
    }
}

kind_fields! {
    /// External or internal connector (USB, audio, video outputs).
    PortFields, PortPatch, PortFilter, PortSortKey {
        port_type(PortType): String => "portType", search;
        standard(Standard): Option<String> => "standard", search;
        speed(Speed): Option<Decimal> => "speed";
    }
}

taxonomy_family! {
    family: "subComponent",
    kind: SubComponentKind,
    attributes: SubComponentAttributes,
    create_sets: SubComponentCreateSets,
    patch: SubComponentPatch,
    patch_sets: SubComponentPatchSets,
    filter: SubComponentFilter,
    sort_key: SubComponentSortKey,
    kinds: {
        CoolerSocket(cooler_socket) => "coolerSocket": CoolerSocketFields, CoolerSocketPatch, CoolerSocketFilter, CoolerSocketSortKey;
        IntegratedGraphics(integrated_graphics) => "integratedGraphics": IntegratedGraphicsFields, IntegratedGraphicsPatch, IntegratedGraphicsFilter, IntegratedGraphicsSortKey;
        M2Slot(m2_slot) => "m2Slot": M2SlotFields, M2SlotPatch, M2SlotFilter, M2SlotSortKey;
        OnboardEthernet(onboard_ethernet) => "onboardEthernet": OnboardEthernetFields, OnboardEthernetPatch, OnboardEthernetFilter, OnboardEthernetSortKey;
        PcieSlot(pcie_slot) => "pcieSlot": PcieSlotFields, PcieSlotPatch, PcieSlotFilter, PcieSlotSortKey;
        Port(port) => "port": PortFields, PortPatch, PortFilter, PortSortKey;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::ChangeSummary;
    use crate::taxonomy::Taxonomy;
    use serde_json::json;

    #[test]
    fn port_speed_zero_clears() {
        let mut attrs = SubComponentAttributes::Port(PortFields {
            port_type: "USB Type-C".into(),
            standard: Some("USB 3.2 Gen 2".into()),
            speed: Some(Decimal::new(10, 0)),
        });
        let mut changes = ChangeSummary::new();
        attrs
            .apply_patch(
                SubComponentPatch::Port(PortPatch {
                    speed: Some(Decimal::ZERO),
                    ..Default::default()
                }),
                &mut changes,
            )
            .unwrap();
        let SubComponentAttributes::Port(port) = &attrs else {
            panic!("kind changed");
        };
        assert_eq!(port.speed, None);
        assert_eq!(changes.previous("speed"), Some("10"));
    }

    #[test]
    fn create_sets_decode_by_tag() {
        let value = json!({
            "pcieSlot": { "gen": "5.0", "lanes": 16, "isReinforced": true }
        });
        let sets: SubComponentCreateSets = serde_json::from_value(value).unwrap();
        let attrs = sets.into_attributes(None).unwrap();
        assert_eq!(attrs.kind(), SubComponentKind::PcieSlot);
        let SubComponentAttributes::PcieSlot(slot) = attrs else {
            panic!("wrong kind");
        };
        assert_eq!(slot.physical_size, None);
        assert_eq!(slot.lanes, 16);
    }

    #[test]
    fn missing_required_field_fails_to_decode() {
        let value = json!({ "m2Slot": { "size": "2280" } });
        let parsed: Result<SubComponentCreateSets, _> = serde_json::from_value(value);
        assert!(parsed.is_err());
    }

    #[test]
    fn family_name() {
        assert_eq!(SubComponentAttributes::FAMILY, "subComponent");
        assert_eq!(SubComponentKind::ALL.len(), 6);
    }
}
