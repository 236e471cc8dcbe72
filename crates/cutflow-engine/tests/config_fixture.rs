use std::path::PathBuf;

use cutflow_core::errors::AnaError;
use cutflow_core::event::MetSlot;
use cutflow_engine::config::{load_cut_table, CutTable};
use cutflow_engine::cuts::PhiObject;
use cutflow_engine::serde::from_yaml_slice;

fn fixture_path(relative: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join(relative)
}

#[test]
fn shipped_table_matches_defaults() {
    let table = load_cut_table(fixture_path("configs/anaz.yaml")).expect("load");
    assert_eq!(table, CutTable::default());
    assert_eq!(
        table.config_hash().expect("hash"),
        CutTable::default().config_hash().expect("hash")
    );
}

#[test]
fn partial_tables_fill_in_defaults() {
    let table: CutTable = from_yaml_slice(
        b"leading_jet:\n  pt_min: 150.0\nabnormal_events:\n  - { run: 5, event: 100 }\n",
    )
    .expect("parse");
    assert_eq!(table.leading_jet.pt_min, 150.0);
    assert_eq!(table.leading_jet.eta_max, 2.4);
    assert_eq!(table.abnormal_events.len(), 1);
    assert_eq!(table.delta_phi.second, PhiObject::Met(MetSlot::PfType1));
    assert_ne!(
        table.config_hash().expect("hash"),
        CutTable::default().config_hash().expect("hash")
    );
}

#[test]
fn yaml_roundtrip_is_stable() {
    let mut table = CutTable::default();
    table.noise_filters = CutTable::standard_noise_filters();
    table.muon_veto = Some(Default::default());
    let yaml = table.to_yaml_string().expect("serialize");
    let reparsed: CutTable = from_yaml_slice(yaml.as_bytes()).expect("reparse");
    assert_eq!(reparsed, table);
}

#[test]
fn invalid_table_files_are_configuration_errors() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let path = temp.path().join("bad.yaml");
    std::fs::write(&path, "ladder:\n  met: [250.0]\n  jet: [250.0, 300.0]\n").expect("write");
    let err = load_cut_table(&path).expect_err("ladder mismatch");
    assert!(matches!(err, AnaError::Config(ref info) if info.code == "ladder_shape"));

    std::fs::write(&path, "leading_jet: [1, 2]\n").expect("write");
    let err = load_cut_table(&path).expect_err("bad shape");
    assert!(matches!(err, AnaError::Config(ref info) if info.code == "yaml_deserialize"));

    let err = load_cut_table(temp.path().join("missing.yaml")).expect_err("missing");
    assert!(matches!(err, AnaError::Io(_)));
}
