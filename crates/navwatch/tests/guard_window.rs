//! Sliding-window behaviour of the brute-force guard against a real store.

mod common;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use navwatch::{BlockDecision, BruteForceGuard, LoginPolicy, ManualClock};

const ORIGIN: &str = "203.0.113.5";
const AGENT: &str = "Mozilla/5.0 (test)";

fn start() -> DateTime<Utc> {
    DateTime::from_timestamp(1_760_000_000, 0).unwrap()
}

async fn guard_with_clock() -> anyhow::Result<(tempfile::TempDir, Arc<ManualClock>, BruteForceGuard)> {
    let (dir, store) = common::temp_store().await?;
    let clock = Arc::new(ManualClock::new(start()));
    let guard = BruteForceGuard::with_clock(store, LoginPolicy::default(), clock.clone());
    Ok((dir, clock, guard))
}

/// Record one failure from `origin` at each minute offset.
async fn fail_at(guard: &BruteForceGuard, clock: &ManualClock, origin: &str, minutes: &[i64]) {
    for minute in minutes {
        clock.set(start() + Duration::minutes(*minute));
        guard.record_attempt(origin, "admin", false, AGENT).await.unwrap();
    }
}

#[tokio::test]
async fn test_five_failures_block_until_first_ages_out() -> anyhow::Result<()> {
    let (_dir, clock, guard) = guard_with_clock().await?;
    fail_at(&guard, &clock, ORIGIN, &[0, 1, 2, 3, 4]).await;

    clock.set(start() + Duration::minutes(5));
    assert!(guard.is_blocked(ORIGIN).await?);
    assert_eq!(guard.failed_attempt_count(ORIGIN, 15).await?, 5);

    // At minute 16 the failure from minute 0 is outside the window.
    clock.set(start() + Duration::minutes(16));
    assert!(!guard.is_blocked(ORIGIN).await?);
    assert!(guard.failed_attempt_count(ORIGIN, 15).await? < 5);
    Ok(())
}

#[tokio::test]
async fn test_four_failures_do_not_block() -> anyhow::Result<()> {
    let (_dir, clock, guard) = guard_with_clock().await?;
    fail_at(&guard, &clock, ORIGIN, &[0, 1, 2, 3]).await;

    clock.set(start() + Duration::minutes(4));
    assert!(!guard.is_blocked(ORIGIN).await?);
    assert_eq!(guard.remaining_attempts(ORIGIN).await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_remaining_minutes_count_down_to_zero() -> anyhow::Result<()> {
    let (_dir, clock, guard) = guard_with_clock().await?;
    fail_at(&guard, &clock, ORIGIN, &[0, 1, 2, 3, 4]).await;

    let mut previous = i64::MAX;
    for (minute, expected) in [(5, 14), (10, 9), (18, 1), (19, 0), (25, 0)] {
        clock.set(start() + Duration::minutes(minute));
        let remaining = guard.remaining_block_minutes(ORIGIN).await?;
        assert_eq!(remaining, expected, "minute {minute}");
        assert!(remaining <= previous);
        previous = remaining;
    }

    // Partial minutes round up.
    clock.set(start() + Duration::minutes(18) + Duration::seconds(30));
    assert_eq!(guard.remaining_block_minutes(ORIGIN).await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_no_failures_means_nothing_remaining() -> anyhow::Result<()> {
    let (_dir, _clock, guard) = guard_with_clock().await?;
    assert_eq!(guard.remaining_block_minutes(ORIGIN).await?, 0);
    assert_eq!(guard.failed_attempt_count(ORIGIN, 15).await?, 0);
    assert_eq!(guard.remaining_attempts(ORIGIN).await?, 5);
    assert!(!guard.is_blocked(ORIGIN).await?);
    Ok(())
}

#[tokio::test]
async fn test_success_does_not_clear_failures() -> anyhow::Result<()> {
    let (_dir, clock, guard) = guard_with_clock().await?;
    fail_at(&guard, &clock, ORIGIN, &[0, 1, 2]).await;

    clock.set(start() + Duration::minutes(3));
    guard.record_attempt(ORIGIN, "admin", true, AGENT).await?;
    assert_eq!(guard.failed_attempt_count(ORIGIN, 15).await?, 3);

    fail_at(&guard, &clock, ORIGIN, &[4, 5]).await;
    clock.set(start() + Duration::minutes(6));
    assert!(guard.is_blocked(ORIGIN).await?);
    Ok(())
}

#[tokio::test]
async fn test_successes_never_block() -> anyhow::Result<()> {
    let (_dir, clock, guard) = guard_with_clock().await?;
    for minute in 0..10 {
        clock.set(start() + Duration::minutes(minute));
        guard.record_attempt(ORIGIN, "admin", true, AGENT).await?;
    }

    assert!(!guard.is_blocked(ORIGIN).await?);
    assert_eq!(guard.remaining_block_minutes(ORIGIN).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_origins_are_compared_exactly() -> anyhow::Result<()> {
    let (_dir, clock, guard) = guard_with_clock().await?;
    fail_at(&guard, &clock, ORIGIN, &[0, 1, 2, 3, 4]).await;

    clock.set(start() + Duration::minutes(5));
    assert!(guard.is_blocked(ORIGIN).await?);
    assert!(!guard.is_blocked("203.0.113.50").await?);
    assert!(!guard.is_blocked("203.0.113").await?);
    Ok(())
}

#[tokio::test]
async fn test_decision_matches_individual_queries() -> anyhow::Result<()> {
    let (_dir, clock, guard) = guard_with_clock().await?;
    fail_at(&guard, &clock, ORIGIN, &[0, 2, 4, 6, 8, 9]).await;

    clock.set(start() + Duration::minutes(10));
    let decision = guard.decision(ORIGIN).await?;
    assert_eq!(
        decision,
        BlockDecision { blocked: true, remaining_minutes: 14, failure_count: 6 }
    );
    assert_eq!(guard.evaluate(ORIGIN).await, decision);
    assert_eq!(guard.remaining_attempts(ORIGIN).await?, 0);

    clock.set(start() + Duration::minutes(30));
    let decision = guard.decision(ORIGIN).await?;
    assert_eq!(decision, BlockDecision { blocked: false, remaining_minutes: 0, failure_count: 0 });
    Ok(())
}

#[tokio::test]
async fn test_custom_policy() -> anyhow::Result<()> {
    let (_dir, store) = common::temp_store().await?;
    let clock = Arc::new(ManualClock::new(start()));
    let policy = LoginPolicy { window_minutes: 5, max_failures: 2 };
    let guard = BruteForceGuard::with_clock(store, policy, clock.clone());

    fail_at(&guard, &clock, ORIGIN, &[0, 1]).await;
    assert!(guard.is_blocked(ORIGIN).await?);
    assert_eq!(guard.remaining_block_minutes(ORIGIN).await?, 5);

    clock.set(start() + Duration::minutes(6));
    assert!(!guard.is_blocked(ORIGIN).await?);
    Ok(())
}

#[tokio::test]
async fn test_attempt_fields_are_stored() -> anyhow::Result<()> {
    let (dir, store) = common::temp_store().await?;
    let clock = Arc::new(ManualClock::new(start()));
    let guard = BruteForceGuard::with_clock(store, LoginPolicy::default(), clock.clone());

    guard.record_attempt(ORIGIN, "ghost", false, AGENT).await?;
    clock.advance(Duration::seconds(1));
    guard.record_attempt(ORIGIN, "admin", true, "curl/8.5").await?;

    let attempts = common::stored_attempts(&dir, ORIGIN).await?;
    assert_eq!(attempts.len(), 2);
    assert_eq!(attempts[0].principal, "admin");
    assert!(attempts[0].succeeded);
    assert_eq!(attempts[0].agent, "curl/8.5");
    assert_eq!(attempts[1].principal, "ghost");
    assert!(!attempts[1].succeeded);
    assert_eq!(attempts[1].observed_at, start());
    Ok(())
}
