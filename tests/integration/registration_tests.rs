//! Startup binding: validation, description and protocol hash.

use propwire::rpc::codec::DataType;
use propwire::rpc::descriptor::EndpointKind;
use propwire::rpc::table::DEFAULT_CAPACITY;
use propwire::rpc::{Access, Accessors, Encoding, Outcome, Registry, Request};
use propwire::{BusConfig, Error, RegistryError};

use crate::mock_device::{MockDevice, bind, ids};

#[test]
fn startup_aborts_on_duplicate_id() {
    let mut reg = Registry::<MockDevice, DEFAULT_CAPACITY>::new(BusConfig::default()).unwrap();
    reg.read_only("system.vbus", |d: &MockDevice| d.vbus).unwrap();
    let err = reg
        .register(
            1,
            "system.vbus_copy",
            Access::ReadOnly,
            4,
            Accessors::new().getter(|d: &MockDevice| d.vbus),
        )
        .unwrap_err();
    assert_eq!(err, RegistryError::DuplicateId(1));
}

#[test]
fn startup_aborts_on_missing_accessor() {
    let mut reg = Registry::<MockDevice, DEFAULT_CAPACITY>::new(BusConfig::default()).unwrap();
    let err = reg
        .register(
            1,
            "encoder.bandwidth",
            Access::ReadWrite,
            4,
            Accessors::new().getter(|d: &MockDevice| d.bandwidth),
        )
        .unwrap_err();
    assert_eq!(err, RegistryError::MissingSetter(1));
    assert!(reg.is_empty());
}

#[test]
fn registry_errors_convert_for_startup() {
    let mut reg = Registry::<MockDevice, DEFAULT_CAPACITY>::new(BusConfig::default()).unwrap();
    let err: Error = reg
        .read_only("not a name", |d: &MockDevice| d.vbus)
        .unwrap_err()
        .into();
    assert!(matches!(err, Error::Registry(RegistryError::InvalidName(_))));
}

#[test]
fn describe_reports_every_binding() {
    let table = bind(BusConfig::default());
    let infos = table.describe();
    assert_eq!(infos.len(), 6);

    let ids: Vec<u16> = infos.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);

    let setpoint = &infos[0];
    assert_eq!(setpoint.name.as_str(), "controller.setpoint");
    assert_eq!(setpoint.access, Some(Access::WriteOnly));
    assert_eq!(setpoint.dtype, DataType::U32);

    let mv = &infos[usize::from(ids::MOVE_TO) - 1];
    assert_eq!(mv.name.as_str(), "motor.move_to");
    assert_eq!(mv.kind, EndpointKind::Function);
    assert_eq!(mv.access, None);
    assert_eq!(mv.dtype, DataType::Bool);
    assert_eq!(mv.args.as_slice(), &[DataType::F32, DataType::U8]);
}

#[test]
fn description_serializes_to_json() {
    let table = bind(BusConfig::default());
    let json = serde_json::to_string(&table.describe()).unwrap();
    assert!(json.contains("\"motor.calibrate\""));
    assert!(json.contains("\"encoder.bandwidth\""));
}

#[test]
fn protocol_hash_is_reproducible() {
    let a = bind(BusConfig::default());
    let b = bind(BusConfig::default());
    assert_eq!(a.protocol_hash(), b.protocol_hash());
    assert_ne!(a.protocol_hash(), 0);
}

#[test]
fn lookup_by_name_matches_lookup_by_id() {
    let table = bind(BusConfig::default());
    for d in table.iter() {
        let by_name = table.resolve_name(d.name()).unwrap();
        assert_eq!(by_name.id(), d.id());
        assert_eq!(table.resolve(d.id()).unwrap().name(), d.name());
    }
    assert!(table.resolve_name("motor.missing").is_none());
}

#[test]
fn enum_endpoint_is_a_plain_u8_on_the_wire() {
    let mut reg = Registry::<MockDevice, DEFAULT_CAPACITY>::new(BusConfig::default()).unwrap();
    let mode = reg
        .enumeration(
            "controller.mode",
            Access::ReadWrite,
            &["idle", "position", "velocity"],
            Accessors::new()
                .getter(|d: &MockDevice| u8::try_from(d.setpoint).unwrap_or(u8::MAX))
                .setter(|d: &mut MockDevice, v: u8| d.setpoint = u32::from(v)),
        )
        .unwrap();
    reg.annotate(mode, "Control mode", None).unwrap();
    let table = reg.seal().unwrap();
    let mut dev = MockDevice::new();

    assert_eq!(table.handle(&mut dev, &Request::write(mode, &[2])), Outcome::Write);
    assert_eq!(dev.setpoint, 2);
    assert_eq!(table.handle(&mut dev, &Request::read(mode)).payload(), &[2]);

    let info = &table.describe()[0];
    assert_eq!(info.dtype, DataType::U8);
    assert_eq!(info.summary.as_deref(), Some("Control mode"));
    assert!(matches!(&info.encoding, Encoding::Enum(o) if o[1].as_str() == "position"));

    let json = serde_json::to_string(&table.describe()).unwrap();
    assert!(json.contains("\"velocity\""));
    assert!(json.contains("\"Control mode\""));
}

#[test]
fn bitmask_flags_are_part_of_the_protocol_hash() {
    let build = |flags: &[&str]| {
        let mut reg = Registry::<MockDevice, DEFAULT_CAPACITY>::new(BusConfig::default()).unwrap();
        reg.bitmask(
            "system.errors",
            Access::ReadOnly,
            flags,
            Accessors::new().getter(|_: &MockDevice| 0b101u8),
        )
        .unwrap();
        reg.seal().unwrap().protocol_hash()
    };
    let a = build(&["overcurrent", "undervoltage"]);
    assert_eq!(a, build(&["overcurrent", "undervoltage"]));
    assert_ne!(a, build(&["overcurrent", "overtemp"]));
}
