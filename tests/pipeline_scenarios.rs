//! End-to-end pipeline scenarios against a scripted backend
//!
//! **WHITE-BOX TEST**: drives `MootRuntime::with_parts` with the scripted
//! backend from `moot-llm` (feature `test-utils`) and a JSON case store in a
//! temporary state directory. No network access.
//!
//! Covered:
//! - resolved cases always hold four statements per side, in stage order
//! - resuming a case never regenerates stored statements
//! - a daily-quota failure rotates the model exactly once
//! - two resolved cases out of three trigger exactly one new case
//! - pool exhaustion stops the run and keeps every checkpoint
//! - verdicts are stored once per model and never duplicated

use camino::Utf8PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use moot::config::{Config, Credentials};
use moot::engine::prompts::CLOSING_SIGN_OFF;
use moot::llm::test_support::ScriptedBackend;
use moot::llm::{LlmError, lock_pool};
use moot::store::{
    CaseStore, CaseUpdate, JsonCaseStore, JsonVerdictStore, NewCase, VerdictStore,
};
use moot::types::{CaseStatus, SectionCode};
use moot::{HaltReason, MootRuntime, VerdictRequest};

const CASE_JSON: &str = r#"Here is the case:
{"cnr": "DLCT010012342024", "title": "State v. Ramesh Kumar", "details": "The accused is alleged to have sold the same plot of land to two buyers in 2021, accepting full payment from both."}"#;

fn statement() -> String {
    format!(
        "The evidence on record establishes every ingredient of the offence beyond reasonable doubt. {CLOSING_SIGN_OFF}."
    )
}

/// Answers case-content prompts with JSON and everything else with a statement.
fn courtroom() -> ScriptedBackend {
    let text = statement();
    ScriptedBackend::with_responder(move |inv| {
        if inv.prompt_text().contains("Reply with a single JSON object") {
            Ok(CASE_JSON.to_string())
        } else {
            Ok(text.clone())
        }
    })
}

struct Fixture {
    _dir: TempDir,
    state_dir: Utf8PathBuf,
    store: Arc<JsonCaseStore>,
    backend: Arc<ScriptedBackend>,
    runtime: MootRuntime,
}

fn fixture(backend: ScriptedBackend, models: &[&str], keys: &[&str], target: usize) -> Fixture {
    let dir = TempDir::new().unwrap();
    let state_dir = Utf8PathBuf::from_path_buf(dir.path().join("state")).unwrap();
    let config = Config::builder()
        .state_dir(state_dir.clone())
        .models(models.iter().copied())
        .no_pauses()
        .target_resolved(target)
        .case_retries(1)
        .build()
        .unwrap();
    let store = Arc::new(JsonCaseStore::open(&state_dir).unwrap());
    let backend = Arc::new(backend);
    let credentials = Credentials {
        models: models.iter().map(ToString::to_string).collect(),
        keys: keys.iter().map(ToString::to_string).collect(),
    };
    let runtime =
        MootRuntime::with_parts(config, backend.clone(), store.clone(), credentials).unwrap();
    Fixture {
        _dir: dir,
        state_dir,
        store,
        backend,
        runtime,
    }
}

fn new_case(section: &str) -> NewCase {
    NewCase {
        cnr: "MHMB020000012023".to_string(),
        title: "State v. Seeded".to_string(),
        details: "The accused allegedly forged a rent agreement.".to_string(),
        section: SectionCode::new(section),
    }
}

fn sections(codes: &[&str]) -> Vec<SectionCode> {
    codes.iter().copied().map(SectionCode::new).collect()
}

#[tokio::test]
async fn test_resolved_cases_hold_four_statements_per_side() {
    let f = fixture(courtroom(), &["model-a"], &["k1", "k2"], 2);

    let summary = f
        .runtime
        .driver()
        .run(&sections(&["302", "420"]), None)
        .await
        .unwrap();

    assert_eq!(summary.halt_reason, HaltReason::AllSectionsProcessed);
    assert_eq!(summary.cases_created(), 4);

    // Re-read from disk: checkpoints are durable, not just in memory
    let reopened = JsonCaseStore::open(&f.state_dir).unwrap();
    let cases = reopened.all().unwrap();
    assert_eq!(cases.len(), 4);
    for case in &cases {
        assert_eq!(case.status, CaseStatus::Resolved);
        assert_eq!(case.plaintiff_arguments.len(), 4);
        assert_eq!(case.defendant_arguments.len(), 4);
        assert!(case.plaintiff_arguments[3].contains(CLOSING_SIGN_OFF));
    }
    // 1 case-content call + 8 stage calls per case
    assert_eq!(f.backend.call_count(), 4 * 9);
}

#[tokio::test]
async fn test_resume_after_plaintiff_opening_skips_it() {
    let f = fixture(courtroom(), &["model-a"], &["k1"], 1);
    let opening = "The prosecution will prove the accused forged the agreement.".to_string();
    let id = f.store.insert(new_case("467")).unwrap();
    f.store
        .update_fields(
            &id,
            CaseUpdate::progress(std::slice::from_ref(&opening), &[], CaseStatus::InProgress),
        )
        .unwrap();

    let report = f
        .runtime
        .scheduler()
        .run_section(&SectionCode::new("467"))
        .await
        .unwrap();

    assert_eq!(report.resumed, 1);
    assert_eq!(report.created, 0);
    let calls = f.backend.calls();
    assert_eq!(calls.len(), 7);
    assert!(calls[0].prompt.contains("opening statement for the Defendant"));
    assert!(
        !calls
            .iter()
            .any(|c| c.prompt.contains("opening statement for the Plaintiff"))
    );

    let stored = f.store.find_by_id(&id).unwrap().unwrap();
    assert_eq!(stored.plaintiff_arguments[0], opening);
    assert_eq!(stored.plaintiff_arguments.len(), 4);
    assert_eq!(stored.status, CaseStatus::Resolved);
}

#[tokio::test]
async fn test_daily_quota_rotates_model_once() {
    let backend = courtroom();
    backend.push_err(LlmError::DailyQuota("tokens per day (TPD): limit 500000".into()));
    let f = fixture(backend, &["model-a", "model-b"], &["k1", "k2"], 1);
    f.store.insert(new_case("506")).unwrap();

    f.runtime
        .scheduler()
        .run_section(&SectionCode::new("506"))
        .await
        .unwrap();

    let calls = f.backend.calls();
    assert_eq!(calls[0].model, "model-a");
    assert_eq!(calls[1].model, "model-b");
    assert_eq!(calls[1].prompt, calls[0].prompt);
    assert!(calls[1..].iter().all(|c| c.model == "model-b"));

    let stats = lock_pool(f.runtime.pool()).stats();
    assert_eq!(stats.rotation_count, 1);
    assert_eq!(stats.models_remaining, 1);
}

#[tokio::test]
async fn test_two_resolved_of_three_creates_one_case() {
    let f = fixture(courtroom(), &["model-a"], &["k1"], 3);
    let done = vec![statement(); 4];
    for _ in 0..2 {
        let id = f.store.insert(new_case("302")).unwrap();
        f.store
            .update_fields(&id, CaseUpdate::progress(&done, &done, CaseStatus::Resolved))
            .unwrap();
    }

    let report = f
        .runtime
        .scheduler()
        .run_section(&SectionCode::new("302"))
        .await
        .unwrap();

    assert_eq!(report.created, 1);
    assert_eq!(report.resolved_after, 3);
    let content_calls = f
        .backend
        .calls()
        .iter()
        .filter(|c| c.prompt.contains("Reply with a single JSON object"))
        .count();
    assert_eq!(content_calls, 1);
}

#[tokio::test]
async fn test_pool_exhaustion_halts_run_and_keeps_checkpoints() {
    let text = statement();
    // Two stages succeed, then every key is refused
    let backend = ScriptedBackend::with_responder(|_| Err(LlmError::ProviderAuth("401".into())));
    backend.push_ok(text.clone());
    backend.push_ok(text);
    let f = fixture(backend, &["model-a"], &["k1", "k2"], 1);
    let id = f.store.insert(new_case("379")).unwrap();
    f.store.insert(new_case("411")).unwrap();

    let summary = f
        .runtime
        .driver()
        .run(&sections(&["379", "411"]), None)
        .await
        .unwrap();

    assert!(summary.pool_exhausted());
    assert!(matches!(
        summary.halt_reason,
        HaltReason::PoolExhausted { models: 1, .. }
    ));
    // The run stopped inside the first section
    assert!(summary.sections.is_empty());

    let stored = f.store.find_by_id(&id).unwrap().unwrap();
    assert_eq!(stored.plaintiff_arguments.len(), 1);
    assert_eq!(stored.defendant_arguments.len(), 1);
    assert_eq!(stored.status, CaseStatus::InProgress);

    let untouched = f
        .store
        .find_by_section(&SectionCode::new("411"))
        .unwrap();
    assert_eq!(untouched[0].status, CaseStatus::DetailsOnly);
}

#[tokio::test]
async fn test_verdicts_once_per_model() {
    let f = fixture(courtroom(), &["model-a", "model-b"], &["k1"], 1);
    f.runtime
        .driver()
        .run(&sections(&["302"]), None)
        .await
        .unwrap();

    let verdicts = Arc::new(JsonVerdictStore::open(&f.state_dir).unwrap());
    let generator = f.runtime.verdict_generator(verdicts.clone());

    let first = generator.run(&VerdictRequest::default()).await.unwrap();
    assert_eq!(first.cases, 1);
    assert_eq!(first.generated, 2);

    let second = generator.run(&VerdictRequest::default()).await.unwrap();
    assert_eq!(second.cases, 0);
    assert_eq!(second.generated, 0);

    let stored = verdicts.all_verdicts().unwrap();
    let mut models: Vec<&str> = stored.iter().map(|v| v.model_name.as_str()).collect();
    models.sort_unstable();
    assert_eq!(models, ["model-a", "model-b"]);

    let case = &f.store.all().unwrap()[0];
    assert!(case.verdict_generated);
}
