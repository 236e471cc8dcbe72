mod common;

use cutflow_core::event::{DataOrigin, EventRecord};
use cutflow_engine::manager::Manager;
use cutflow_engine::runlog::RunLog;
use cutflow_engine::stage::{Stage, StageKind};
use proptest::prelude::*;

use common::{memory_source, record, BitCut, Recorder};

fn records(events: &[u64]) -> Vec<EventRecord> {
    events
        .iter()
        .map(|&event| record(1, event, DataOrigin::Simulation))
        .collect()
}

proptest! {
    #[test]
    fn survivors_are_monotone_and_rejected_events_stay_hidden(
        events in proptest::collection::vec(0u64..256, 0..60),
        layout in proptest::collection::vec(proptest::option::of(0u32..8), 1..8),
    ) {
        let mut manager = Manager::new(RunLog::discard());
        // Some(bit) is a cut on that bit, None a recorder
        let mut recorders = Vec::new();
        for (idx, slot) in layout.iter().enumerate() {
            match slot {
                Some(bit) => manager.add(Stage::cut(BitCut::new(*bit))).expect("add cut"),
                None => {
                    let recorder = Recorder::new(&format!("rec_{idx}"));
                    recorders.push((idx, recorder.seen.clone()));
                    manager.add(Stage::histogrammer(recorder)).expect("add recorder");
                }
            }
        }

        let mut source = memory_source(DataOrigin::Simulation, records(&events));
        let report = manager.run(&mut source).expect("run");
        let population = report.population();
        prop_assert_eq!(population[0], events.len() as u64);

        for (idx, row) in report.rows.iter().enumerate() {
            let before = population[idx];
            let after = population[idx + 1];
            match row.kind {
                StageKind::Cut => prop_assert!(after <= before),
                StageKind::Histogrammer => prop_assert_eq!(after, before),
            }
        }

        for (idx, seen) in recorders {
            let earlier_bits: Vec<u32> = layout[..idx].iter().flatten().copied().collect();
            let seen = seen.lock().expect("lock");
            for id in seen.iter() {
                prop_assert!(earlier_bits.iter().all(|bit| BitCut::passes(*bit, id.event)));
            }
            let expected = events
                .iter()
                .filter(|event| earlier_bits.iter().all(|bit| BitCut::passes(*bit, **event)))
                .count();
            prop_assert_eq!(seen.len(), expected);
        }
    }
}
