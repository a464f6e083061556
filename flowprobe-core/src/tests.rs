use crate::*;
use flowprobe_context::{keys, StepStatus};
use flowprobe_logger::{Logger, MemorySink, Severity};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn memory_logger() -> (Logger, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    (Logger::with_sink(sink.clone()), sink)
}

#[tokio::test]
async fn test_named_steps_run_in_order() {
    let (logger, sink) = memory_logger();
    let context = FlowBuilder::new()
        .logger(logger)
        .named_step("first", "First", |ctx| async move {
            ctx.lock().await.set_variable("k", "v");
            StepResult::success("first done")
        })
        .named_step("second", "Second", |ctx| async move {
            let value = ctx.lock().await.get_variable("k").cloned();
            StepResult::success(format!("saw {}", value.unwrap_or_default()))
        })
        .execute()
        .await
        .unwrap();

    assert!(context.ok);
    assert_eq!(context.step_logs.len(), 2);
    assert_eq!(
        sink.messages(Severity::Success),
        vec!["first done".to_string(), "saw v".to_string()]
    );
    assert_eq!(sink.count(Severity::Step), 2);
}

#[tokio::test]
async fn test_fatal_failure_stops_the_run() {
    let (logger, sink) = memory_logger();
    let calls = Arc::new(AtomicUsize::new(0));
    let later = calls.clone();

    let context = FlowBuilder::new()
        .logger(logger)
        .named_step("register", "Register", |_ctx| async move {
            StepResult::Failure(FlowError::UnexpectedStatus {
                endpoint: "/register".into(),
                status: 400,
                body: "{}".into(),
            })
        })
        .named_step("verify", "Verify", move |_ctx| async move {
            later.fetch_add(1, Ordering::SeqCst);
            StepResult::success("verified")
        })
        .execute()
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!context.ok);
    assert_eq!(context.halted_at.as_deref(), Some("register"));
    assert_eq!(context.step_logs.len(), 1);
    assert_eq!(sink.count(Severity::Error), 1);
}

#[tokio::test]
async fn test_warnings_and_soft_failures_continue() {
    let (logger, sink) = memory_logger();
    let context = FlowBuilder::new()
        .logger(logger)
        .named_step("create", "Create", |_ctx| async move {
            StepResult::Warning(FlowError::SchemaMismatch {
                status: 400,
                body: "bad".into(),
                hint: None,
            })
        })
        .named_step("soft", "Soft", |_ctx| async move {
            StepResult::Failure(FlowError::StatusMismatch {
                resource: "product 1".into(),
                expected: "pending".into(),
                actual: "active".into(),
            })
        })
        .named_step("audit", "Audit", |_ctx| async move {
            StepResult::success("audited")
        })
        .execute()
        .await
        .unwrap();

    assert!(context.halted_at.is_none());
    assert_eq!(context.count_status(StepStatus::Warning), 1);
    assert_eq!(context.count_status(StepStatus::Failed), 1);
    assert_eq!(sink.messages(Severity::Success), vec!["audited".to_string()]);
}

#[tokio::test]
async fn test_missing_capture_is_fatal() {
    let (logger, sink) = memory_logger();
    let context = FlowBuilder::new()
        .logger(logger)
        .named_step("login", "Login", |ctx| async move {
            match ctx.lock().await.require_variable(keys::PASSWORD) {
                Ok(_) => StepResult::success("logged in"),
                Err(missing) => StepResult::Failure(missing.into()),
            }
        })
        .named_step("after", "After", |_ctx| async move {
            StepResult::success("unreachable")
        })
        .execute()
        .await
        .unwrap();

    assert_eq!(context.halted_at.as_deref(), Some("login"));
    assert_eq!(sink.count(Severity::Success), 0);
    assert!(sink.messages(Severity::Error)[0].contains(keys::PASSWORD));
}

#[tokio::test]
async fn test_step_timeout_halts_a_hard_step() {
    let (logger, sink) = memory_logger();
    let context = FlowBuilder::new()
        .logger(logger)
        .step_timeout(Duration::from_millis(20))
        .named_step("slow", "Slow", |_ctx| async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StepResult::success("too late")
        })
        .execute()
        .await
        .unwrap();

    assert_eq!(context.step_logs[0].status, StepStatus::Timeout);
    assert_eq!(context.halted_at.as_deref(), Some("slow"));
    assert_eq!(
        sink.messages(Severity::Error),
        vec!["step 'slow' timed out after 20ms".to_string()]
    );
}

#[tokio::test]
async fn test_soft_step_timeout_warns_and_continues() {
    let (logger, sink) = memory_logger();
    let context = FlowBuilder::new()
        .logger(logger)
        .step_timeout(Duration::from_millis(20))
        .soft_step("create", "Create", |_ctx| async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StepResult::success("too late")
        })
        .soft_step("audit", "Audit", |_ctx| async move {
            StepResult::success("audited")
        })
        .execute()
        .await
        .unwrap();

    assert!(context.halted_at.is_none());
    assert_eq!(context.step_logs[0].status, StepStatus::Warning);
    assert_eq!(sink.count(Severity::Error), 0);
    assert_eq!(
        sink.messages(Severity::Warning),
        vec!["step 'create' timed out after 20ms".to_string()]
    );
    assert_eq!(sink.messages(Severity::Success), vec!["audited".to_string()]);
}

#[tokio::test]
async fn test_quiet_step_reports_success_at_debug() {
    let (logger, sink) = memory_logger();
    FlowBuilder::new()
        .logger(logger)
        .quiet_step("otp", "Resolve OTP", |_ctx| async move {
            StepResult::success("Found OTP: 123456")
        })
        .execute()
        .await
        .unwrap();

    assert_eq!(sink.count(Severity::Success), 0);
    assert_eq!(sink.count(Severity::Debug), 1);
}

#[test]
fn test_fatality_table() {
    assert!(FlowError::connection("x", "refused").is_fatal());
    assert!(FlowError::StepTimeout {
        step: "verify".into(),
        limit_ms: 10
    }
    .is_fatal());
    assert!(FlowError::NotFoundInStore {
        what: "user".into(),
        key: "a@b".into(),
        phase: "after registration".into()
    }
    .is_fatal());
    assert!(!FlowError::StatusMismatch {
        resource: "r".into(),
        expected: "pending".into(),
        actual: "active".into()
    }
    .is_fatal());
}
