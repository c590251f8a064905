//! Property tests over random advance/back sequences.
//!
//! A reference model tracks what the stage index must be; the wizard
//! has to agree after every operation, and payload accumulation must be
//! monotonic regardless of the path taken.

use proptest::prelude::*;

use playroom::stage::{StageId, StagePayload};
use playroom::wizard::WizardError;

mod common;
use common::*;

fn payload_for(index: usize) -> StagePayload {
    match index {
        0 => child_ana(),
        1 => avatar_default(),
        2 => expression_calm(),
        _ => notes_done(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn stage_index_tracks_the_reference_model(ops in proptest::collection::vec(any::<bool>(), 1..40)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (mut wizard, store, _sink) = standard_wizard();
            let terminal = wizard.plan().len() - 1;
            let mut model = 0usize;
            let mut deepest = 0usize;

            for &forward in &ops {
                if forward {
                    if model < terminal {
                        wizard.advance(payload_for(model)).await.unwrap();
                        model += 1;
                        deepest = deepest.max(model);
                    } else {
                        // The terminal stage only accepts finish.
                        let err = wizard.advance(payload_for(model)).await.unwrap_err();
                        assert!(matches!(err, WizardError::TerminalStage));
                    }
                } else if model > 0 {
                    wizard.back().unwrap();
                    model -= 1;
                } else {
                    let err = wizard.back().unwrap_err();
                    assert!(matches!(err, WizardError::AtFirstStage));
                }

                assert_eq!(wizard.draft().current_stage(), model);
                // The index never leaves the plan.
                assert!(wizard.draft().current_stage() <= terminal);
            }

            // Monotonic accumulation: every stage ever completed still
            // holds its payload, whatever back-navigation happened.
            for index in 0..deepest {
                let stage = wizard.plan().stage_at(index).unwrap();
                assert_eq!(wizard.draft().payload(stage), Some(&payload_for(index)));
            }

            // The session row is created at most once, on the first
            // successful save.
            let expected_creates = u64::from(deepest > 0);
            assert_eq!(store.create_calls(), expected_creates);
            assert_eq!(wizard.session_id().is_some(), deepest > 0);
        });
    }

    #[test]
    fn back_never_touches_the_store(backs in 1usize..10) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (mut wizard, store, _sink) = standard_wizard();
            wizard.advance(child_ana()).await.unwrap();
            wizard.advance(avatar_default()).await.unwrap();
            let writes = store.create_calls() + store.update_calls();

            for _ in 0..backs {
                // Outcome depends on position; store traffic must not.
                let _ = wizard.back();
            }
            assert_eq!(store.create_calls() + store.update_calls(), writes);
            assert_eq!(wizard.draft().payload(StageId::Child), Some(&child_ana()));
        });
    }
}
