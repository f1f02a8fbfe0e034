use dropzone::models::{UploadRecord, UploadStatus};
use dropzone::random::{RandomSource, ScriptedRandom, SeededRandom};
use dropzone::share::LinkBuilder;
use dropzone::simulator::{AttemptPlan, SimulationTuning, Simulator, Step};
use std::sync::Arc;
use std::time::Duration;

fn pending(id: &str) -> UploadRecord {
    UploadRecord {
        id: id.to_string(),
        name: "report.pdf".to_string(),
        size: 10 * 1024 * 1024,
        mime_type: "application/pdf".to_string(),
        status: UploadStatus::Pending,
        progress: 0.0,
        upload_speed: 0.0,
        share_link: String::new(),
        thumbnail_ref: None,
        uploaded_at: chrono::Utc::now().to_rfc3339(),
    }
}

fn simulator(random: Arc<dyn RandomSource>) -> Simulator {
    Simulator::new(SimulationTuning::default(), random, LinkBuilder::new("dropzone.pro"))
}

// run one attempt to its end, checking invariants along the way
fn run_attempt(sim: &Simulator, record: &UploadRecord) -> (UploadRecord, usize) {
    let (mut current, plan) = sim.begin(record);
    assert_eq!(current.status, UploadStatus::Uploading);
    assert_eq!(current.progress, 0.0);

    let mut elapsed = Duration::ZERO;
    for steps in 1..10_000 {
        elapsed += sim.next_delay();
        let step = sim.step(&current, elapsed, &plan);
        let next = step.record().clone();
        match step {
            Step::Progress(_) => {
                assert_eq!(next.status, UploadStatus::Uploading);
                assert!(next.progress >= current.progress, "progress went backwards");
                assert!(next.progress < 100.0);
                assert!(next.share_link.is_empty());
                assert!(next.upload_speed >= 1.2 && next.upload_speed < 4.2);
            }
            Step::Completed(_) | Step::Failed(_) => return (next, steps),
        }
        current = next;
    }
    panic!("attempt never finished");
}

#[test]
fn test_begin_enters_uploading() {
    let sim = simulator(Arc::new(ScriptedRandom::constant(0.9)));
    let mut record = pending("file-1");
    record.progress = 37.0;

    let (started, plan) = sim.begin(&record);
    assert_eq!(started.status, UploadStatus::Uploading);
    assert_eq!(started.progress, 0.0);
    assert_eq!(started.upload_speed, 0.0);
    assert_eq!(plan.abort_after, None);
}

#[test]
fn test_attempt_completes_with_share_link() {
    let sim = simulator(Arc::new(ScriptedRandom::constant(0.9)));
    let (done, steps) = run_attempt(&sim, &pending("file-abc"));

    assert_eq!(done.status, UploadStatus::Completed);
    assert_eq!(done.progress, 100.0);
    assert_eq!(done.upload_speed, 0.0);
    assert_eq!(done.share_link, "https://dropzone.pro/file/file-abc");
    // 0.9 * 15 = 13.5 per step
    assert_eq!(steps, 8);
}

#[test]
fn test_seeded_attempts_hold_invariants() {
    for seed in 0..50 {
        let sim = simulator(Arc::new(SeededRandom::from_seed(seed)));
        let (done, _) = run_attempt(&sim, &pending("file-x"));

        match done.status {
            UploadStatus::Completed => {
                assert_eq!(done.progress, 100.0);
                assert!(!done.share_link.is_empty());
            }
            UploadStatus::Error => {
                assert_eq!(done.progress, 0.0);
                assert!(done.share_link.is_empty());
            }
            other => panic!("unexpected terminal status {}", other),
        }
        assert_eq!(done.upload_speed, 0.0);
    }
}

#[test]
fn test_same_seed_same_run() {
    let record = pending("file-1");
    let a = run_attempt(&simulator(Arc::new(SeededRandom::from_seed(7))), &record);
    let b = run_attempt(&simulator(Arc::new(SeededRandom::from_seed(7))), &record);
    assert_eq!(a, b);
}

#[test]
fn test_doomed_attempt_fails_at_abort_point() {
    let sim = simulator(Arc::new(ScriptedRandom::constant(0.5)));
    let started = pending("file-1").start_attempt().advance(40.0, 2.0);
    let plan = AttemptPlan {
        abort_after: Some(Duration::from_millis(500)),
    };

    match sim.step(&started, Duration::from_millis(499), &plan) {
        Step::Progress(r) => assert!(r.progress > 40.0),
        other => panic!("failed too early: {:?}", other),
    }

    let failed = sim.step(&started, Duration::from_millis(500), &plan);
    assert!(failed.is_terminal());
    let failed = failed.record();
    assert_eq!(failed.status, UploadStatus::Error);
    assert_eq!(failed.progress, 0.0);
    assert_eq!(failed.upload_speed, 0.0);
}

#[test]
fn test_low_draw_dooms_the_attempt() {
    // 0.0 < 5% failure chance, abort point at 0ms
    let sim = simulator(Arc::new(ScriptedRandom::constant(0.0)));
    let (done, steps) = run_attempt(&sim, &pending("file-1"));
    assert_eq!(done.status, UploadStatus::Error);
    assert_eq!(steps, 1);
}

#[test]
fn test_failure_rate_zero_never_fails() {
    let tuning = SimulationTuning {
        failure_rate: 0.0,
        ..SimulationTuning::default()
    };
    let sim = Simulator::new(
        tuning,
        Arc::new(ScriptedRandom::constant(0.0)),
        LinkBuilder::new("dropzone.pro"),
    );
    let (_, plan) = sim.begin(&pending("file-1"));
    assert_eq!(plan.abort_after, None);
}

#[test]
fn test_step_ignores_records_not_uploading() {
    let sim = simulator(Arc::new(ScriptedRandom::constant(0.9)));
    let done = pending("file-1").complete("https://dropzone.pro/file/file-1".to_string());
    let plan = AttemptPlan { abort_after: None };

    assert_eq!(sim.step(&done, Duration::from_secs(1), &plan), Step::Progress(done.clone()));
}

#[test]
fn test_delay_within_bounds() {
    let sim = simulator(Arc::new(SeededRandom::from_seed(3)));
    for _ in 0..200 {
        let delay = sim.next_delay();
        assert!(delay >= Duration::from_millis(100));
        assert!(delay < Duration::from_millis(300));
    }
    assert_eq!(sim.tuning().max_increment, 15.0);
}
