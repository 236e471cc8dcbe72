use cutflow_core::bounded::Bounded;
use cutflow_core::errors::AnaError;
use cutflow_core::event::{DataOrigin, EventRecord, Jet, MAX_JETS};

fn jet(pt: f64) -> Jet {
    Jet {
        pt,
        eta: 0.0,
        phi: 0.0,
        energy: pt,
        chf: 0.5,
        nhf: 0.2,
        cemf: 0.1,
        nemf: 0.2,
        loose_id: true,
    }
}

#[test]
fn push_respects_capacity() {
    let mut small: Bounded<u32, 2> = Bounded::new();
    small.push(1).expect("first");
    small.push(2).expect("second");
    let err = small.push(3).expect_err("full");
    assert!(matches!(err, AnaError::Source(ref info) if info.code == "collection_overflow"));
    assert_eq!(small.count(), 2);
    assert_eq!(small.as_slice(), &[1, 2]);
}

#[test]
fn from_vec_rejects_overflow() {
    let items: Vec<Jet> = (0..=MAX_JETS).map(|i| jet(i as f64)).collect();
    assert!(Bounded::<Jet, MAX_JETS>::from_vec(items).is_err());
}

#[test]
fn explicit_count_must_match_items() {
    let ok: Bounded<u8, 4> = serde_json::from_str(r#"{"count":2,"items":[1,0]}"#).expect("valid");
    assert_eq!(ok.count(), 2);

    let mismatch = serde_json::from_str::<Bounded<u8, 4>>(r#"{"count":3,"items":[1,0]}"#);
    assert!(mismatch.is_err());

    let overflow = serde_json::from_str::<Bounded<u8, 2>>(r#"{"items":[1,0,1]}"#);
    assert!(overflow.is_err());
}

#[test]
fn serialized_form_carries_count() {
    let collection: Bounded<u8, 4> = Bounded::from_vec(vec![7, 8]).expect("fits");
    let value = serde_json::to_value(&collection).expect("serialize");
    assert_eq!(value["count"], 2);
    assert_eq!(value["items"], serde_json::json!([7, 8]));
}

#[test]
fn leading_jet_selects_maximum_pt() {
    let mut record = EventRecord::new(1, 1, DataOrigin::Data);
    record.jets = Bounded::from_vec(vec![jet(80.0), jet(140.0), jet(95.0)]).expect("fits");
    assert_eq!(record.leading_jet().map(|j| j.pt), Some(140.0));
    assert_eq!(record.subleading_jet().map(|j| j.pt), Some(95.0));
}

#[test]
fn minimal_record_parses_with_defaults() {
    let record: EventRecord = serde_json::from_str(
        r#"{"id":{"run":5,"event":100},"origin":"simulation"}"#,
    )
    .expect("parse");
    assert_eq!(record.id.lumi, 0);
    assert!(record.jets.is_empty());
    assert!(record.origin.is_simulation());
    assert!(record.leading_jet().is_none());
}
