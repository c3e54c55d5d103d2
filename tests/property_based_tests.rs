//! Property-based tests for moot
//!
//! **WHITE-BOX TEST**: uses `llm::CredentialPool`, `engine::StageEngine` and
//! `store::CaseCounts` directly.
//!
//! Properties:
//! - `rotate_key` never hands out a key already retired for the current model
//! - a model that was rotated away from is never current again before `reset()`
//! - `reset()` yields a pool equal to a freshly built one
//! - resuming a case with N accepted stages makes exactly 8 - N calls and
//!   keeps the N stored statements
//! - report groupings always add up to the total
//!
//! ## Configuration
//!
//! - `PROPTEST_CASES`: number of cases per property (default: 64)
//! - `PROPTEST_MAX_SHRINK_ITERS`: max shrinking iterations (default: 1000)
//!
//! ```bash
//! PROPTEST_CASES=256 cargo test --test property_based_tests
//! ```

use chrono::Utc;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::sync::Arc;

use moot::config::{Config, Credentials};
use moot::llm::CredentialPool;
use moot::llm::test_support::ScriptedBackend;
use moot::store::{CaseCounts, CaseId, CaseRecord, MemoryCaseStore, NewCase};
use moot::types::{CaseStatus, SectionCode};
use moot::MootRuntime;

const DEFAULT_PROPTEST_CASES: u32 = 64;
const DEFAULT_MAX_SHRINK_ITERS: u32 = 1000;

fn proptest_config(max_cases: Option<u32>) -> ProptestConfig {
    let env_cases = env::var("PROPTEST_CASES")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(DEFAULT_PROPTEST_CASES);

    let env_shrink_iters = env::var("PROPTEST_MAX_SHRINK_ITERS")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(DEFAULT_MAX_SHRINK_ITERS);

    let cases = match max_cases {
        Some(max) => env_cases.min(max),
        None => env_cases,
    };

    ProptestConfig {
        cases,
        max_shrink_iters: env_shrink_iters,
        max_shrink_time: 30000,
        ..ProptestConfig::default()
    }
}

#[derive(Debug, Clone, Copy)]
enum PoolOp {
    RotateKey,
    RotateModel,
}

fn pool_op() -> impl Strategy<Value = PoolOp> {
    prop_oneof![3 => Just(PoolOp::RotateKey), 1 => Just(PoolOp::RotateModel)]
}

fn names(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}{i}")).collect()
}

fn current(pool: &CredentialPool) -> Option<(String, String)> {
    pool.current()
        .ok()
        .map(|c| (c.model, c.key.expose().to_string()))
}

proptest! {
    #![proptest_config(proptest_config(None))]

    #[test]
    fn prop_rotation_is_monotonic(
        model_count in 1usize..4,
        key_count in 1usize..5,
        ops in prop::collection::vec(pool_op(), 0..40),
    ) {
        let models = names("model-", model_count);
        let keys = names("key-", key_count);
        let mut pool = CredentialPool::new(models.clone(), keys).unwrap();

        let mut retired_keys: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut left_models: BTreeSet<String> = BTreeSet::new();

        for op in ops {
            let Some((model, key)) = current(&pool) else {
                break;
            };
            let result = match op {
                PoolOp::RotateKey => pool.rotate_key().map(|_| ()),
                PoolOp::RotateModel => pool.rotate_model().map(|_| ()),
            };

            if matches!(op, PoolOp::RotateKey) {
                retired_keys.entry(model.clone()).or_default().insert(key);
            }
            if result.is_err() {
                prop_assert!(pool.is_exhausted());
                prop_assert!(current(&pool).is_none());
                break;
            }

            let (now_model, now_key) = current(&pool).unwrap();
            if now_model != model {
                left_models.insert(model);
            }
            prop_assert!(!left_models.contains(&now_model));
            let retired = retired_keys.get(&now_model);
            prop_assert!(retired.is_none_or(|set| !set.contains(&now_key)));
        }

        prop_assert!(pool.rotation_count() <= (model_count * (key_count + 1)) as u64);
    }

    #[test]
    fn prop_reset_restores_fresh_state(
        model_count in 1usize..4,
        key_count in 1usize..5,
        ops in prop::collection::vec(pool_op(), 0..20),
    ) {
        let models = names("model-", model_count);
        let keys = names("key-", key_count);
        let fresh = CredentialPool::new(models.clone(), keys.clone()).unwrap();
        let mut pool = fresh.clone();

        for op in ops {
            let _ = match op {
                PoolOp::RotateKey => pool.rotate_key().map(|_| ()),
                PoolOp::RotateModel => pool.rotate_model().map(|_| ()),
            };
        }
        pool.reset();

        prop_assert_eq!(&pool, &fresh);
        prop_assert_eq!(current(&pool), current(&fresh));
        prop_assert_eq!(pool.usable_models(), models);
    }

    #[test]
    fn prop_report_groupings_sum_to_total(
        rows in prop::collection::vec((0usize..4, 0usize..3), 0..30),
    ) {
        let statuses = [CaseStatus::DetailsOnly, CaseStatus::InProgress, CaseStatus::Resolved];
        let records: Vec<CaseRecord> = rows
            .iter()
            .map(|&(section, status)| {
                let mut record = NewCase {
                    cnr: "CNR".to_string(),
                    title: "T".to_string(),
                    details: "D".to_string(),
                    section: SectionCode::new(format!("{}", 300 + section)),
                }
                .into_record(CaseId::generate(), Utc::now());
                record.status = statuses[status];
                record
            })
            .collect();

        let counts = CaseCounts::from_records(&records);
        prop_assert_eq!(counts.total, records.len());
        prop_assert_eq!(counts.by_section.iter().map(|r| r.count).sum::<usize>(), counts.total);
        prop_assert_eq!(counts.by_status.iter().map(|r| r.count).sum::<usize>(), counts.total);
        prop_assert_eq!(
            counts.by_section_status.iter().map(|r| r.count).sum::<usize>(),
            counts.total
        );
        prop_assert!(counts.by_section.windows(2).all(|w| w[0].count >= w[1].count));
    }
}

const STATEMENT: &str =
    "The documentary evidence contradicts the complainant's account entirely. I rest my case here.";

proptest! {
    #![proptest_config(proptest_config(Some(16)))]

    #[test]
    fn prop_resume_never_regenerates(done in 0usize..=8) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let backend = Arc::new(ScriptedBackend::always(STATEMENT));
        let store = Arc::new(MemoryCaseStore::new());
        let config = Config::builder().no_pauses().build().unwrap();
        let runtime = MootRuntime::with_parts(
            config,
            backend.clone(),
            store.clone(),
            Credentials {
                models: vec!["m".to_string()],
                keys: vec!["k".to_string()],
            },
        )
        .unwrap();

        let mut case = NewCase {
            cnr: "CNR".to_string(),
            title: "State v. Resume".to_string(),
            details: "Alleged criminal breach of trust.".to_string(),
            section: SectionCode::new("406"),
        }
        .into_record(CaseId::generate(), Utc::now());
        // Stage order alternates plaintiff, defendant
        let plaintiff: Vec<String> = (0..done.div_ceil(2)).map(|i| format!("P{i} {STATEMENT}")).collect();
        let defendant: Vec<String> = (0..done / 2).map(|i| format!("D{i} {STATEMENT}")).collect();
        case.plaintiff_arguments = plaintiff.clone();
        case.defendant_arguments = defendant.clone();
        case.status = if done == 0 { CaseStatus::DetailsOnly } else { CaseStatus::InProgress };
        store.seed(case.clone()).unwrap();

        rt.block_on(runtime.stage_engine().advance(&mut case)).unwrap();

        prop_assert_eq!(backend.call_count(), 8 - done);
        prop_assert_eq!(&case.plaintiff_arguments[..plaintiff.len()], &plaintiff[..]);
        prop_assert_eq!(&case.defendant_arguments[..defendant.len()], &defendant[..]);
        prop_assert_eq!(case.status, CaseStatus::Resolved);
    }
}
