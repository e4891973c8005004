//! Polling delete example
//!
//! Simulates deleting a host that is still referenced by running jobs: the
//! API answers `409 Conflict` a few times before accepting the delete.
//!
//! Run with: RUST_LOG=debug cargo run --example poll_delete

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use aap_retry::{JobStatus, OperationResponse, RetryPolicy, RetrySettings, operation_fn};
use aap_retry::job::wait_for_job_completion;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("=== aap-retry polling examples ===\n");

    // Example 1: delete that conflicts twice, then succeeds
    println!("1. Delete host - conflict until running jobs finish:");
    let attempts = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&attempts);
    let mut policy = RetryPolicy::builder("delete host web01")
        .operation(operation_fn(move || {
            let seen = Arc::clone(&seen);
            async move {
                let attempt = seen.fetch_add(1, Ordering::SeqCst) + 1;
                println!("   Attempt {attempt}");
                if attempt < 3 {
                    OperationResponse::new(409)
                        .with_body(r#"{"error": "host in use by running jobs"}"#)
                } else {
                    OperationResponse::new(204)
                }
            }
        }))
        .settings(&RetrySettings {
            timeout_secs: 20,
            initial_delay_secs: 0,
            poll_interval_secs: 1,
            ..RetrySettings::default()
        })
        .context(CancellationToken::new())
        .build()?;

    let outcome = policy.execute().await?;
    println!("   Result: {} after {} attempts\n", outcome.state, attempts.load(Ordering::SeqCst));

    // Example 2: a request the API rejects outright
    println!("2. Update host - validation failure is not retried:");
    let mut policy = RetryPolicy::builder("update host web01")
        .operation(operation_fn(|| async {
            OperationResponse::new(400).with_body(r#"{"variables": ["Invalid YAML"]}"#)
        }))
        .initial_delay_secs(0)
        .context(CancellationToken::new())
        .build()?;

    match policy.execute().await {
        Ok(outcome) => println!("   Unexpected success: {}", outcome.state),
        Err(err) => {
            println!("   Error: {err}");
            if let Some(outcome) = err.outcome() {
                println!("   Body: {}\n", String::from_utf8_lossy(&outcome.body));
            }
        }
    }

    // Example 3: wait for a launched job to finish
    println!("3. Job launch - wait for a final state:");
    let polls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&polls);
    let builder = RetryPolicy::builder("wait for job 42")
        .timeout_secs(30)
        .initial_delay_secs(0)
        .poll_interval_secs(1)
        .context(CancellationToken::new());

    let completion = wait_for_job_completion(builder, move || {
        let poll = seen.fetch_add(1, Ordering::SeqCst) + 1;
        let status = if poll < 3 { "running" } else { "successful" };
        println!("   Poll {poll}: {status}");
        let body = format!(r#"{{"id": 42, "status": "{status}"}}"#);
        async move { OperationResponse::new(200).with_body(body) }
    })
    .await?;

    println!(
        "   Job finished: {:?} (successful: {})",
        completion.status,
        completion.status == JobStatus::Successful
    );

    println!("\n=== All examples completed ===");
    Ok(())
}
