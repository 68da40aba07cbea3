// tests/chaining.rs

//! End-to-end scenarios: successor chaining and the Work/Job nesting level.

mod common;

use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use jobflow::{
    CreationTask, Job, JobContext, Result as JfResult, Successor, Unit, Work,
};

use common::{counting_successor, settle};

type TestResult = Result<(), Box<dyn Error>>;

fn shared_log() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

fn appender(log: &Arc<Mutex<Vec<String>>>, entry: &str) -> CreationTask {
    let log = Arc::clone(log);
    let entry = entry.to_string();
    CreationTask::new().with_callback(move || {
        log.lock().unwrap().push(entry.clone());
        Ok(())
    })
}

#[tokio::test]
async fn job_successor_job_runs_strictly_after() -> TestResult {
    let log = shared_log();

    let job_b = Job::new("B", JobContext::empty());
    job_b.attach_task("t3", appender(&log, "t3"));

    let job_a = Job::new("A", JobContext::empty());
    job_a.attach_task("t1", appender(&log, "t1"));
    job_a.attach_task("t2", appender(&log, "t2"));
    job_a.set_next(Successor::next(job_b));

    job_a.run().finished().await?;
    settle().await;

    let entries = log.lock().unwrap().clone();
    assert_eq!(entries.len(), 3);
    // t1/t2 order is unspecified, but both precede t3.
    assert_eq!(entries[2], "t3");
    assert!(entries[..2].contains(&"t1".to_string()));
    assert!(entries[..2].contains(&"t2".to_string()));
    Ok(())
}

#[tokio::test]
async fn work_contains_jobs_with_identical_semantics() -> TestResult {
    let log = shared_log();

    let job_one = Job::new("one", JobContext::empty());
    job_one.attach_task("t1", appender(&log, "one/t1"));
    job_one.attach_task("t2", appender(&log, "one/t2"));

    let job_two = Job::new("two", JobContext::empty());
    job_two.attach_task("t1", appender(&log, "two/t1"));

    let work = Work::new("work", JobContext::empty());
    work.attach_flow(job_one);
    work.attach_flow(job_two);
    let fired = Arc::new(AtomicUsize::new(0));
    work.set_next(counting_successor(Arc::clone(&fired)));

    let summary = work.run().finished().await?;
    assert!(summary.is_clean());
    assert_eq!(summary.completed, 2, "the work counts jobs, not tasks");
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert_eq!(log.lock().unwrap().len(), 3);
    Ok(())
}

#[tokio::test]
async fn detaching_a_job_from_a_work_returns_it() -> TestResult {
    let work = Work::new("work", JobContext::empty());
    work.attach_flow(Job::new("one", JobContext::empty()));
    work.attach_flow(Job::new("two", JobContext::empty()));
    assert_eq!(work.len(), 2);

    let removed = work.detach("one").expect("job must be returned");
    assert_eq!(removed.id(), "one");
    assert_eq!(work.len(), 1);
    assert!(work.detach("one").is_none());
    Ok(())
}

/// Unit that records the context value it was handed.
struct ContextProbe {
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Unit for ContextProbe {
    async fn run(&self, ctx: &JobContext) -> JfResult<()> {
        let value = ctx.get::<String>().cloned().unwrap_or_default();
        self.seen.lock().unwrap().push(value);
        Ok(())
    }
}

#[tokio::test]
async fn every_task_sees_the_same_context() -> TestResult {
    let seen = shared_log();
    let job = Job::new("job", JobContext::new("shared-value".to_string()));
    job.attach_task("p1", ContextProbe { seen: Arc::clone(&seen) });
    job.attach_task("p2", ContextProbe { seen: Arc::clone(&seen) });

    job.run().finished().await?;
    assert_eq!(*seen.lock().unwrap(), vec!["shared-value", "shared-value"]);
    Ok(())
}

#[tokio::test]
async fn a_work_propagates_its_context_to_its_jobs() -> TestResult {
    let seen = shared_log();

    // The job carries its own context, but attachment to a work means the
    // work's context flows down, as it always has.
    let job = Job::new("job", JobContext::new("job-context".to_string()));
    job.attach_task("probe", ContextProbe { seen: Arc::clone(&seen) });

    let work = Work::new("work", JobContext::new("work-context".to_string()));
    work.attach_flow(job);

    work.run().finished().await?;
    assert_eq!(*seen.lock().unwrap(), vec!["work-context"]);
    Ok(())
}
