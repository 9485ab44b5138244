use recover_patterns::core::batch::{self, MAX_NUMBER};
use recover_patterns::core::unwind;
use recover_patterns::{run_batch, BatchMode, RecoverError};

#[test]
fn test_unwind_payload_123_at_depth_three() {
    // Idiomatic escape
    assert_eq!(unwind::search(3, 123), Some(123));

    // Real unwind with a typed payload
    let result = unwind::recover_as::<i64, _>(|| unwind::unwind_from_depth_three(123_i64));
    assert_eq!(result.unwrap(), Some(123));
}

#[test]
fn test_unwind_mismatched_payload() {
    let strict = unwind::recover_as::<i64, _>(|| unwind::unwind_from_depth_three("123"));
    assert!(matches!(strict, Err(RecoverError::PayloadMismatch { .. })));

    let lenient: i64 = unwind::recover_as_or_default(|| unwind::unwind_from_depth_three("123"));
    assert_eq!(lenient, 0);
}

#[test]
fn test_unwind_other_panics_are_mismatches_too() {
    // A plain panic in the chain is not mistaken for a result
    let strict = unwind::recover_as::<i64, _>(|| {
        let v: Vec<i64> = Vec::new();
        std::hint::black_box(v[3]);
    });
    assert!(matches!(strict, Err(RecoverError::PayloadMismatch { .. })));
}

#[test]
fn test_batch_fourth_step_fails_with_53() {
    let inputs = [1, 2, 3, 53];

    for mode in [BatchMode::Checked, BatchMode::Panicking, BatchMode::Lenient] {
        let report = run_batch(mode, &inputs);
        assert_eq!(report.error.as_deref(), Some("bad number: 53"), "mode {}", mode);
        assert_eq!(report.steps_run, 4, "mode {}", mode);
    }

    let err = batch::run_steps_panicking(&inputs).unwrap_err();
    assert_eq!(err.to_string(), "bad number: 53");
}

#[test]
fn test_batch_all_steps_succeed() {
    let inputs = [1, 2, 3, MAX_NUMBER];

    assert!(batch::run_steps(&inputs).is_ok());
    assert!(batch::run_steps_panicking(&inputs).is_ok());
    assert!(batch::run_steps_lenient(&inputs).is_ok());
    assert!(run_batch(BatchMode::Panicking, &inputs).succeeded());
}

#[test]
fn test_batch_report_as_json() {
    let report = run_batch(BatchMode::Panicking, &[1, 2, 3, 53]);
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["mode"], "panicking");
    assert_eq!(json["steps_run"], 4);
    assert_eq!(json["error"], "bad number: 53");
    assert_eq!(json["inputs"], serde_json::json!([1, 2, 3, 53]));
}

#[test]
fn test_guard_inside_blocking_context() {
    // The panicking batch works the same from a blocking thread of a runtime
    let report = tokio_test::block_on(async {
        tokio::task::spawn_blocking(|| run_batch(BatchMode::Panicking, &[7, 99]))
            .await
            .unwrap()
    });
    assert_eq!(report.error.as_deref(), Some("bad number: 99"));
}
