//! # CLI Command Implementations
//!
//! Each command has a `run_*` function that drives the chain and returns a
//! serializable report, and a `cmd_*` wrapper that prints it.

use serde::Serialize;
use std::time::Duration;
use stepchain_core::{GateSnapshot, PausedPromise, Promise, StepchainError, log_value};
use thiserror::Error;
use tokio::sync::mpsc;

// =============================================================================
// ERRORS
// =============================================================================

/// Failures surfaced by the demo commands.
#[derive(Debug, Error)]
pub enum DemoFault {
    /// A chain settled as a failure.
    #[error("Chain rejected: {0}")]
    Rejected(String),

    /// A controller or configuration error from the core.
    #[error(transparent)]
    Stepchain(#[from] StepchainError),
}

fn print_json<T: Serialize>(report: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(report).unwrap_or_default()
    );
}

// =============================================================================
// EAGER COMMAND
// =============================================================================

/// Outcome of the eager demo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EagerReport {
    /// Seed value.
    pub value: i64,
    /// `(value + 1) * 7`.
    pub answer: i64,
}

/// Resolve `value` through `+1` then `*7`.
pub async fn run_eager(value: i64) -> Result<EagerReport, DemoFault> {
    let answer = Promise::<i64, DemoFault>::resolve(value)
        .then(|v| v.saturating_add(1))
        .then(log_value("incremented"))
        .then(|v| v.saturating_mul(7))
        .settle()
        .await?;
    Ok(EagerReport { value, answer })
}

/// Print the eager demo.
pub async fn cmd_eager(value: i64, json_mode: bool) -> Result<(), DemoFault> {
    let report = run_eager(value).await?;

    if json_mode {
        print_json(&report);
        return Ok(());
    }

    println!("Eager Chain");
    println!("===========");
    println!("resolve({}) -> +1 -> *7", report.value);
    println!("Answer: {}", report.answer);
    Ok(())
}

// =============================================================================
// RECOVER COMMAND
// =============================================================================

/// Outcome of the recovery demo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoverReport {
    /// Message carried by the rejection.
    pub message: String,
    /// Value produced by `catch`.
    pub recovered: String,
    /// Stages skipped because the chain was failing.
    pub skipped: usize,
}

/// Reject with `message`, skip a `then`, recover with `catch`.
pub async fn run_recover(message: String) -> Result<RecoverReport, DemoFault> {
    let (tx, mut rx) = mpsc::unbounded_channel::<()>();

    let recovered = Promise::<String, DemoFault>::reject(DemoFault::Rejected(message.clone()))
        .then(move |v| {
            let _ = tx.send(());
            v
        })
        .catch(|e| format!("We recovered from the error: {e}"))
        .then(log_value("recovered"))
        .settle()
        .await?;

    // The sender is dropped with the skipped callback, so this never waits.
    let skipped = usize::from(rx.recv().await.is_none());
    Ok(RecoverReport {
        message,
        recovered,
        skipped,
    })
}

/// Print the recovery demo.
pub async fn cmd_recover(message: String, json_mode: bool) -> Result<(), DemoFault> {
    let report = run_recover(message).await?;

    if json_mode {
        print_json(&report);
        return Ok(());
    }

    println!("Recovered Chain");
    println!("===============");
    println!("Rejected with: {}", report.message);
    println!("Skipped:       {} stage(s)", report.skipped);
    println!("Finally:       {}", report.recovered);
    Ok(())
}

// =============================================================================
// STEPPED COMMAND
// =============================================================================

/// One stage observed while stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    /// 1-based stage index.
    pub stage: usize,
    /// Value the stage received.
    pub input: i64,
}

/// Outcome of the stepped demo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SteppedReport {
    /// Seed value.
    pub value: i64,
    /// Stages in the order they ran.
    pub stages: Vec<StageRecord>,
    /// Final value.
    pub answer: i64,
    /// Gate counters after the chain settled.
    pub gate: GateSnapshot,
}

/// Build a paused chain of incrementing stages that report what they see.
fn reporting_chain(
    value: i64,
    stages: usize,
    delta: i64,
) -> (
    PausedPromise<i64, DemoFault>,
    mpsc::UnboundedReceiver<StageRecord>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let mut chain = PausedPromise::<i64, DemoFault>::paused(value);
    for stage in 1..=stages {
        let tx = tx.clone();
        chain = chain.then(move |input| {
            let _ = tx.send(StageRecord { stage, input });
            input.saturating_add(delta)
        });
    }
    (chain, rx)
}

/// Step a paused chain one stage at a time, waiting `interval` between steps.
pub async fn run_stepped(
    value: i64,
    stages: usize,
    interval: Duration,
) -> Result<SteppedReport, DemoFault> {
    let (chain, mut rx) = reporting_chain(value, stages, 1);
    let gate = chain.gate();
    let mut records = Vec::with_capacity(stages);

    for _ in 0..stages {
        gate.step()?;
        let Some(record) = rx.recv().await else {
            break;
        };
        tracing::info!(stage = record.stage, input = record.input, "stage ran");
        records.push(record);

        if !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
    }

    let answer = chain.settle().await?;
    Ok(SteppedReport {
        value,
        stages: records,
        answer,
        gate: gate.snapshot(),
    })
}

/// Print the stepped demo.
pub async fn cmd_stepped(
    value: i64,
    stages: usize,
    interval: Duration,
    json_mode: bool,
) -> Result<(), DemoFault> {
    let report = run_stepped(value, stages, interval).await?;

    if json_mode {
        print_json(&report);
        return Ok(());
    }

    println!("Stepped Chain");
    println!("=============");
    for record in &report.stages {
        println!("Step {:>3}: stage received {}", record.stage, record.input);
    }
    println!();
    println!("Answer:   {}", report.answer);
    print_gate(&report.gate);
    Ok(())
}

fn print_gate(gate: &GateSnapshot) {
    println!("Issued:   {}", gate.issued);
    println!("Consumed: {}", gate.consumed);
    println!("Pending:  {}", gate.enlisted);
}

// =============================================================================
// ALLOCATE COMMAND
// =============================================================================

/// Outcome of the allocation demo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocateReport {
    /// Stages attached to the chain.
    pub stages: usize,
    /// Authorizations requested.
    pub requested: usize,
    /// Why the request was refused, if it was.
    pub rejected: Option<String>,
    /// Authorizations issued afterwards to finish the chain.
    pub topped_up: usize,
    /// Final value.
    pub answer: i64,
    /// Gate counters after the chain settled.
    pub gate: GateSnapshot,
}

/// Request `count` authorizations on a chain of `stages`, then finish it.
pub async fn run_allocate(stages: usize, count: usize) -> Result<AllocateReport, DemoFault> {
    let (chain, _rx) = reporting_chain(0, stages, 1);
    let gate = chain.gate();

    let rejected = match gate.allocate(count) {
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(requested = count, stages, "allocation refused: {}", e);
            Some(e.to_string())
        }
    };

    let topped_up = gate.remaining();
    gate.allocate(topped_up)?;

    let answer = chain.settle().await?;
    Ok(AllocateReport {
        stages,
        requested: count,
        rejected,
        topped_up,
        answer,
        gate: gate.snapshot(),
    })
}

/// Print the allocation demo.
pub async fn cmd_allocate(stages: usize, count: usize, json_mode: bool) -> Result<(), DemoFault> {
    let report = run_allocate(stages, count).await?;

    if json_mode {
        print_json(&report);
        return Ok(());
    }

    println!("Allocated Chain");
    println!("===============");
    println!("Stages:    {}", report.stages);
    println!("Requested: {}", report.requested);
    match &report.rejected {
        Some(reason) => println!("Refused:   {}", reason),
        None => println!("Granted:   {}", report.requested),
    }
    println!("Topped up: {}", report.topped_up);
    println!();
    println!("Answer:   {}", report.answer);
    print_gate(&report.gate);
    Ok(())
}

// =============================================================================
// RESUME COMMAND
// =============================================================================

/// Outcome of the resume demo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumeReport {
    /// Seed value.
    pub value: i64,
    /// Steps issued by hand before resuming.
    pub manual_steps: usize,
    /// Every stage, manual or resumed, in the order it ran.
    pub stages: Vec<StageRecord>,
    /// Final value.
    pub answer: i64,
    /// Gate counters after the chain settled.
    pub gate: GateSnapshot,
}

/// Step a decrementing chain `manual_steps` times, then resume it.
pub async fn run_resume(
    value: i64,
    stages: usize,
    manual_steps: usize,
) -> Result<ResumeReport, DemoFault> {
    let (chain, mut rx) = reporting_chain(value, stages, -1);
    let gate = chain.gate();

    let manual_steps = manual_steps.min(stages);
    chain.allocate(manual_steps)?;

    let answer = chain.resume().settle().await?;

    let mut records = Vec::with_capacity(stages);
    while let Ok(record) = rx.try_recv() {
        records.push(record);
    }
    Ok(ResumeReport {
        value,
        manual_steps,
        stages: records,
        answer,
        gate: gate.snapshot(),
    })
}

/// Print the resume demo.
pub async fn cmd_resume(
    value: i64,
    stages: usize,
    manual_steps: usize,
    json_mode: bool,
) -> Result<(), DemoFault> {
    let report = run_resume(value, stages, manual_steps).await?;

    if json_mode {
        print_json(&report);
        return Ok(());
    }

    println!("Resumed Chain");
    println!("=============");
    println!("Manual steps: {}", report.manual_steps);
    for record in &report.stages {
        println!("Stage {:>3}: received {}", record.stage, record.input);
    }
    println!();
    println!("Answer:   {}", report.answer);
    print_gate(&report.gate);
    Ok(())
}
