//! End-to-end tests: documents on disk run through the default adapters.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tapestry::{
    AppError, CaseStatus, Engine, EngineError, Handler, MethodTable, SeedContext, ServiceRegistry,
    TokioHarness,
};
use tapestry_application::suite::SuiteError;
use tempfile::{TempDir, tempdir};

fn write_json(dir: &Path, name: &str, value: &Value) {
    let path = dir.join(name);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
}

fn first_arg(args: Vec<Value>) -> Value {
    args.into_iter().next().unwrap_or(Value::Null)
}

/// Adds `b: 2` to its input object.
fn enrich() -> Handler {
    Handler::direct(|args| async move {
        let mut value = first_arg(args);
        value["b"] = json!(2);
        Ok(value)
    })
}

fn engine_in(dir: &TempDir, handler: Handler) -> Engine {
    Engine::builder()
        .base_dir(dir.path())
        .module("./src/app", handler)
        .build()
        .expect("engine")
}

#[tokio::test]
async fn test_scenario_a_returned_value_passes() {
    let dir = tempdir().expect("Failed to create temp directory");
    write_json(
        dir.path(),
        "spec/app.json",
        &json!({
            "module": "./src/app",
            "tests": [{
                "name": "adds b",
                "input": {"value": {"a": 1}},
                "expectedOutput": {
                    "value": {"a": 1, "b": 2},
                    "asserts": [{"compareKey": "b", "operator": "equal"}]
                }
            }]
        }),
    );

    let report = engine_in(&dir, enrich())
        .run_document("./spec/app.json", SeedContext::unit())
        .await
        .unwrap();

    assert_eq!(report.name, "unit");
    assert!(report.all_passed(), "{report:?}");
    assert_eq!(report.case("adds b").unwrap().assertions, 1);
}

#[tokio::test]
async fn test_scenario_b_match_names_failing_key() {
    let dir = tempdir().unwrap();
    write_json(dir.path(), "expected/greeting.json", &json!({"msg": "^hello"}));
    let document = json!({
        "module": "./src/app",
        "tests": [
            {
                "name": "greets",
                "input": {"value": {"msg": "hello world"}},
                "expectedOutput": {
                    "file": "./expected/greeting.json",
                    "asserts": [{"compareKey": "msg", "operator": "match"}]
                }
            },
            {
                "name": "says bye",
                "input": {"value": {"msg": "bye"}},
                "expectedOutput": {
                    "file": "./expected/greeting.json",
                    "asserts": [{"compareKey": "msg", "operator": "match"}]
                }
            }
        ]
    });

    let report = engine_in(&dir, enrich())
        .run_document(document, SeedContext::unit())
        .await
        .unwrap();

    assert_eq!(report.case("greets").unwrap().status, CaseStatus::Passed);
    let failed = report.case("says bye").unwrap();
    assert_eq!(failed.status, CaseStatus::Failed);
    assert_eq!(failed.failed_phase.as_deref(), Some("assert"));
    assert_eq!(failed.failed_keys, vec!["msg"]);
    assert!(failed.message.as_deref().unwrap().contains("[msg]"));
}

#[tokio::test]
async fn test_scenario_c_omitted_keys_are_ignored() {
    let dir = tempdir().unwrap();
    let handler = Handler::direct(|_| async { Ok(json!({"meta": {"timestamp": 9, "v": 2}})) });
    let document = json!({
        "module": "./src/app",
        "tests": [{
            "name": "ignores timestamp",
            "expectedOutput": {
                "value": {"meta": {"timestamp": 1, "v": 2}},
                "asserts": [{"compareKey": "meta", "operator": "deepEqual", "omitKeys": ["meta.timestamp"]}]
            }
        }]
    });

    let report = engine_in(&dir, handler)
        .run_document(document, SeedContext::unit())
        .await
        .unwrap();
    assert!(report.all_passed(), "{report:?}");
}

#[tokio::test]
async fn test_scenario_d_require_runs_before_invocation() {
    let dir = tempdir().unwrap();
    write_json(dir.path(), "fixtures/data.json", &json!({"id": 7}));
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let handler = Handler::direct(move |_| {
        let counted = Arc::clone(&counted);
        async move {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        }
    });
    let document = json!({
        "module": "./src/app",
        "tests": [
            {
                "name": "fixture present",
                "setupCalls": [{"taskType": "require", "requirePath": "./fixtures/data.json", "contextKey": "seed"}]
            },
            {
                "name": "fixture missing",
                "setupCalls": [{"taskType": "require", "requirePath": "./fixtures/none.json", "contextKey": "seed"}]
            }
        ]
    });

    let report = engine_in(&dir, handler)
        .run_document(document, SeedContext::default())
        .await
        .unwrap();

    assert_eq!(report.name, "integration");
    assert_eq!(report.case("fixture present").unwrap().status, CaseStatus::Passed);
    let missing = report.case("fixture missing").unwrap();
    assert_eq!(missing.failed_phase.as_deref(), Some("setup"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_scenario_e_stub_replies_in_order_and_restores() {
    let dir = tempdir().unwrap();
    write_json(dir.path(), "replies/second.json", &json!("from file"));

    let services = ServiceRegistry::new();
    services.register(
        "./services/db",
        "Db",
        MethodTable::new().with_method("methodA", |_| async { Ok(json!("real")) }),
    );
    let app_services = services.clone();
    let handler = Handler::direct(move |_| {
        let services = app_services.clone();
        async move {
            let first = services.call("./services/db", "Db", "methodA", vec![]).await?;
            let second = services.call("services/db", "Db", "methodA", vec![]).await?;
            Ok(json!({"first": first, "second": second}))
        }
    });
    let engine = Engine::builder()
        .base_dir(dir.path())
        .services(services.clone())
        .module("./src/app", handler)
        .build()
        .unwrap();

    let document = json!({
        "module": "./src/app",
        "tests": [{
            "name": "two calls",
            "serviceStubs": [{
                "taskType": "stub",
                "requirePath": "./services/db",
                "className": "Db",
                "methods": [{"name": "methodA", "calls": [
                    {"value": "one", "stubMethod": "resolves"},
                    {"file": "./replies/second.json", "stubMethod": "returns"}
                ]}]
            }],
            "expectedOutput": {
                "value": {"first": "one", "second": "from file"},
                "asserts": [
                    {"compareKey": "first", "operator": "strictEqual"},
                    {"compareKey": "second", "operator": "strictEqual"}
                ]
            }
        }]
    });

    let report = engine.run_document(document, SeedContext::unit()).await.unwrap();
    assert!(report.all_passed(), "{report:?}");

    let restored = engine
        .services()
        .call("./services/db", "Db", "methodA", vec![])
        .await
        .unwrap();
    assert_eq!(restored, json!("real"));
    assert!(!services.is_stubbed("./services/db", "Db"));
}

#[tokio::test]
async fn test_expected_error_properties_are_asserted() {
    let dir = tempdir().unwrap();
    let handler = Handler::direct(|_| async {
        Err(AppError::new("not allowed")
            .with_name("ForbiddenError")
            .with_field("statusCode", json!(403)))
    });
    let document = json!({
        "module": "./src/app",
        "tests": [
            {
                "name": "forbidden",
                "expectedError": {
                    "value": {"name": "ForbiddenError", "statusCode": 403, "message": "^not"},
                    "asserts": [
                        {"compareKey": "name", "operator": "equal"},
                        {"compareKey": "statusCode", "operator": "equal"},
                        {"compareKey": "message", "operator": "match"}
                    ]
                }
            },
            {"name": "unexpected"}
        ]
    });

    let report = engine_in(&dir, handler)
        .run_document(document, SeedContext::unit())
        .await
        .unwrap();

    let forbidden = report.case("forbidden").unwrap();
    assert_eq!(forbidden.status, CaseStatus::Passed, "{forbidden:?}");
    assert_eq!(forbidden.assertions, 3);
    let unexpected = report.case("unexpected").unwrap();
    assert_eq!(unexpected.status, CaseStatus::Failed);
    assert_eq!(unexpected.failed_phase.as_deref(), Some("invoke"));
}

#[tokio::test]
async fn test_invalid_document_registers_nothing() {
    let dir = tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let handler = Handler::direct(move |_| {
        let counted = Arc::clone(&counted);
        async move {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        }
    });
    let document = json!({
        "module": "./src/app",
        "tests": [
            {"name": "valid"},
            {"name": "bad operator", "expectedOutput": {"value": 1, "asserts": [{"compareKey": "a", "operator": "near"}]}},
            {"input": {"value": 1}}
        ]
    });

    let engine = engine_in(&dir, handler);
    let mut harness = TokioHarness::new();
    let err = engine
        .make_tests(document, SeedContext::unit(), &mut harness)
        .await
        .unwrap_err();

    let EngineError::Suite(SuiteError::InvalidFormat(violations)) = &err else {
        panic!("expected a schema failure, got {err:?}");
    };
    assert!(violations.len() >= 2, "{violations:?}");
    let message = err.to_string();
    assert!(message.contains("/tests/1/expectedOutput/asserts/0/operator"), "{message}");
    assert!(message.contains("/tests/2"), "{message}");
    assert!(harness.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_document_and_module() {
    let dir = tempdir().unwrap();
    let engine = engine_in(&dir, enrich());

    let missing = engine
        .run_document("./spec/none.json", SeedContext::unit())
        .await
        .unwrap_err();
    assert!(matches!(missing, EngineError::Suite(SuiteError::MissingDocument(_))));

    let unknown = engine
        .run_document(json!({"module": "./src/other", "tests": []}), SeedContext::unit())
        .await
        .unwrap_err();
    assert!(matches!(unknown, EngineError::Suite(SuiteError::Module(_))));
}

#[tokio::test]
async fn test_yaml_document_with_callback_handler() {
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("spec")).unwrap();
    std::fs::write(
        dir.path().join("spec/legacy.yaml"),
        "module: ./src/legacy\n\
         moduleKey: handler\n\
         tests:\n\
         \x20 - name: spread arguments\n\
         \x20   input:\n\
         \x20     value: [2, 3]\n\
         \x20     spread: true\n\
         \x20   expectedOutput:\n\
         \x20     value: {sum: 5}\n\
         \x20     asserts:\n\
         \x20       - compareKey: sum\n\
         \x20         operator: equal\n",
    )
    .unwrap();

    let engine = Engine::builder()
        .base_dir(dir.path())
        .callback_style()
        .export(
            "./src/legacy",
            "handler",
            Handler::callback(|args, callback| {
                let sum: i64 = args.iter().filter_map(Value::as_i64).sum();
                callback.ok(json!({"sum": sum}));
            }),
        )
        .build()
        .unwrap();

    let seed = SeedContext {
        name_of_test_suite: Some("legacy".to_string()),
        ..SeedContext::unit()
    };
    let report = engine.run_document("./spec/legacy.yaml", seed).await.unwrap();
    assert_eq!(report.name, "legacy");
    assert!(report.all_passed(), "{report:?}");
}
