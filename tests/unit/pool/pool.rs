use dpi::PhysicalSize;
use rand::Rng;

use super::*;
use crate::engine::error::SurfaceError;
use crate::test_support::{FakeDomain, init_tracing};

type FakePool = SurfacePool<FakeDomain, FakeDomain>;

fn fake_pool(size: PhysicalSize<u32>, capacity: usize) -> (FakePool, FakeDomain, FakeDomain) {
    init_tracing();
    let producer = FakeDomain::new();
    let consumer = FakeDomain::new();
    let pool = SurfacePool::new(
        producer.clone(),
        consumer.clone(),
        SurfacePoolInit::new(size).with_capacity(capacity),
    )
    .unwrap();
    (pool, producer, consumer)
}

fn cycle(pool: &mut FakePool) -> SurfaceHandle {
    let handle = pool.acquire().unwrap();
    pool.release(handle).unwrap();
    handle
}

fn ids(pool: &FakePool) -> Vec<u32> {
    pool.surface_ids().into_iter().map(SurfaceId::get).collect()
}

#[test]
fn maximal_contention_grows_to_capacity_then_forces_waits() {
    let (mut pool, producer, _consumer) = fake_pool(PhysicalSize::new(64, 64), MAX_QUEUE_LEN);

    let mut cursors = Vec::new();
    for _ in 0..30 {
        cursors.push(pool.cursor());
        cycle(&mut pool);
    }

    let stats = pool.stats();
    assert_eq!(stats.surfaces_created, 16);
    assert_eq!(stats.forced_waits, 14);
    assert_eq!(stats.markers_issued, 30);
    assert_eq!(pool.len(), MAX_QUEUE_LEN);

    let mut expected_order: Vec<u32> = (2..=16).collect();
    expected_order.push(1);
    assert_eq!(ids(&pool), expected_order);

    // Growth: acquire n inserts at n - 2 (first acquire at 0), then the cursor wraps 15 -> 0 -> ...
    let mut expected_cursors = vec![0, 0];
    expected_cursors.extend(1..=15);
    expected_cursors.extend(0..=12);
    assert_eq!(cursors, expected_cursors);
    assert_eq!(pool.cursor(), 13);

    // One staging copy and one map per forced wait, all on the producer side.
    assert_eq!(producer.log().copies, 14);
    assert_eq!(producer.log().maps, 14);
}

#[test]
fn growth_inserts_at_cursor_not_at_tail() {
    let (mut pool, producer, _consumer) = fake_pool(PhysicalSize::new(32, 32), MAX_QUEUE_LEN);

    cycle(&mut pool); // [S1]
    producer.retire_all();
    cycle(&mut pool); // S1 reused
    cycle(&mut pool); // S1 busy: [S2, S1], cursor -> 1
    assert_eq!(ids(&pool), vec![2, 1]);
    assert_eq!(pool.cursor(), 1);

    // S1 still pending, so S3 lands at index 1, ahead of S1.
    let handle = cycle(&mut pool);
    assert_eq!(handle.id().get(), 3);
    assert_eq!(ids(&pool), vec![2, 3, 1]);
    assert_eq!(pool.cursor(), 2);

    // Retire everything: the cursor surface is reused without growth.
    producer.retire_all();
    let handle = cycle(&mut pool);
    assert_eq!(handle.id().get(), 1);
    assert_eq!(pool.len(), 3);
    assert_eq!(pool.cursor(), 0);
}

#[test]
fn idle_surface_is_reused_without_growth() {
    let (mut pool, producer, _consumer) = fake_pool(PhysicalSize::new(8, 8), MAX_QUEUE_LEN);

    for _ in 0..10 {
        let handle = pool.acquire().unwrap();
        assert_eq!(handle.id().get(), 1);
        pool.release(handle).unwrap();
        producer.retire_all();
    }

    assert_eq!(pool.len(), 1);
    assert_eq!(pool.stats().surfaces_created, 1);
    assert_eq!(pool.stats().forced_waits, 0);
    // Exactly one poll per acquire after the first.
    assert_eq!(producer.log().polls, 9);
}

#[test]
fn length_never_shrinks_nor_exceeds_capacity() {
    let mut rng = rand::thread_rng();
    for capacity in [1, 3, MAX_QUEUE_LEN] {
        let (mut pool, producer, _consumer) = fake_pool(PhysicalSize::new(20, 10), capacity);
        let mut last_len = 0;
        for _ in 0..100 {
            cycle(&mut pool);
            if rng.gen_bool(0.3) {
                producer.retire_all();
            }
            assert!(pool.len() >= last_len);
            assert!(pool.len() <= capacity);
            assert!(pool.cursor() < pool.len());
            last_len = pool.len();
        }
    }
}

#[test]
fn acquire_never_returns_a_provably_busy_surface() {
    let mut rng = rand::thread_rng();
    let (mut pool, producer, _consumer) = fake_pool(PhysicalSize::new(16, 16), 4);

    for _ in 0..500 {
        let forced_before = pool.stats().forced_waits;
        let handle = pool.acquire().unwrap();
        let forced = pool.stats().forced_waits > forced_before;

        // Anything other than a fresh surface or a forced wait must have polled ready.
        if !forced {
            let target = pool.marker(&handle).unwrap().target;
            assert!(producer.log().retired >= target);
        }
        assert_eq!(pool.state(&handle), Some(SurfaceState::WriteInFlight));

        pool.release(handle).unwrap();
        assert_eq!(pool.state(&handle), Some(SurfaceState::ConsumerInFlight));

        if rng.gen_bool(0.4) {
            let submitted = producer.log().submitted;
            producer.retire_through(rng.gen_range(0..=submitted));
        }
    }
}

#[test]
fn forced_wait_copies_a_clamped_region() {
    let (mut pool, producer, consumer) = fake_pool(PhysicalSize::new(100, 4), 1);

    cycle(&mut pool);
    cycle(&mut pool);
    assert_eq!(pool.stats().forced_waits, 1);
    // The fake asserts the copy region fits both the texture and the staging resource.
    assert_eq!(producer.log().copies, 1);
    assert_eq!(consumer.log().copies, 0);
}

#[test]
fn allocation_failure_rolls_back_and_leaves_pool_unchanged() {
    let (mut pool, producer, consumer) = fake_pool(PhysicalSize::new(8, 8), MAX_QUEUE_LEN);
    cycle(&mut pool);
    let cursor = pool.cursor();

    for op in ["create_texture", "share_handle", "create_staging", "create_marker"] {
        producer.fail(op);
        assert!(matches!(pool.acquire(), Err(SurfaceError::Allocation(_))));
        producer.recover(op);
    }
    consumer.fail("open_shared");
    assert!(matches!(pool.acquire(), Err(SurfaceError::Allocation(_))));
    consumer.recover("open_shared");

    assert_eq!(pool.len(), 1);
    assert_eq!(pool.cursor(), cursor);
    assert_eq!(pool.stats().surfaces_created, 1);
    // Only S1's resources survive: texture, staging, marker / texture, staging.
    assert_eq!(producer.log().live.len(), 3);
    assert_eq!(consumer.log().live.len(), 2);

    // Ids are not burned by failed creations.
    let handle = pool.acquire().unwrap();
    assert_eq!(handle.id().get(), 2);
}

#[test]
fn poll_error_counts_as_busy() {
    let (mut pool, producer, _consumer) = fake_pool(PhysicalSize::new(8, 8), MAX_QUEUE_LEN);
    cycle(&mut pool);
    producer.retire_all();
    producer.fail("poll_marker");

    let handle = cycle(&mut pool);
    assert_eq!(handle.id().get(), 2);
    assert_eq!(pool.stats().marker_failures, 1);
    assert_eq!(pool.len(), 2);
}

#[test]
fn unarmed_surface_needs_a_forced_wait() {
    let (mut pool, producer, _consumer) = fake_pool(PhysicalSize::new(8, 8), 1);
    producer.fail("issue_marker");
    let first = cycle(&mut pool);
    assert_eq!(pool.stats().marker_failures, 1);
    assert_eq!(pool.stats().markers_issued, 0);
    assert_eq!(pool.state(&first), Some(SurfaceState::ConsumerInFlight));

    // Nothing to poll, so even a fully retired producer cannot prove it idle.
    producer.retire_all();
    let again = pool.acquire().unwrap();
    assert_eq!(again, first);
    assert_eq!(pool.stats().forced_waits, 1);
    assert_eq!(producer.log().polls, 0);
}

#[test]
fn failed_forced_wait_is_reported_and_keeps_surface_busy() {
    let (mut pool, producer, _consumer) = fake_pool(PhysicalSize::new(8, 8), 1);
    let handle = cycle(&mut pool);

    producer.fail("map_staging");
    assert!(matches!(pool.acquire(), Err(SurfaceError::Mapping(_))));
    assert_eq!(pool.stats().forced_waits, 0);
    assert_eq!(pool.state(&handle), Some(SurfaceState::ConsumerInFlight));

    producer.recover("map_staging");
    assert_eq!(pool.acquire().unwrap(), handle);
    assert_eq!(pool.stats().forced_waits, 1);
}

#[test]
fn consumer_wait_maps_consumer_staging() {
    let (mut pool, producer, consumer) = fake_pool(PhysicalSize::new(8, 8), MAX_QUEUE_LEN);
    let handle = pool.acquire().unwrap();
    pool.wait_on_consumer_domain(&handle).unwrap();
    assert_eq!(consumer.log().maps, 1);
    assert_eq!(producer.log().maps, 0);

    consumer.fail("copy_to_staging");
    assert!(matches!(
        pool.wait_on_consumer_domain(&handle),
        Err(SurfaceError::Mapping(_))
    ));
}

#[test]
fn release_rejects_handles_not_at_cursor() {
    let (mut pool, _producer, _consumer) = fake_pool(PhysicalSize::new(8, 8), MAX_QUEUE_LEN);
    let first = cycle(&mut pool);
    assert!(matches!(
        pool.release(first),
        Err(SurfaceError::StaleHandle(id)) if id == first.id()
    ));

    let second = pool.acquire().unwrap();
    assert_ne!(second, first);
    assert!(pool.release(first).is_err());
    pool.release(second).unwrap();
}

#[test]
fn unreleased_surface_is_handed_out_again() {
    let (mut pool, _producer, _consumer) = fake_pool(PhysicalSize::new(8, 8), MAX_QUEUE_LEN);
    let first = pool.acquire().unwrap();
    let second = pool.acquire().unwrap();
    assert_eq!(first, second);
    assert_eq!(pool.len(), 1);
}

#[test]
fn epoch_counts_markers() {
    let (mut pool, producer, _consumer) = fake_pool(PhysicalSize::new(8, 8), MAX_QUEUE_LEN);
    for _ in 0..3 {
        cycle(&mut pool);
        producer.retire_all();
    }
    assert_eq!(pool.queue[0].epoch, 3);
}

#[test]
fn teardown_destroys_everything_once() {
    let (mut pool, producer, consumer) = fake_pool(PhysicalSize::new(8, 8), 5);
    for _ in 0..7 {
        cycle(&mut pool);
    }
    let _in_flight = pool.acquire().unwrap();

    pool.destroy();
    pool.destroy();
    assert!(pool.is_destroyed());
    assert!(pool.is_empty());
    for domain in [&producer, &consumer] {
        let log = domain.log();
        assert!(log.live.is_empty());
        assert_eq!(log.created, log.destroyed);
    }
    assert!(matches!(pool.acquire(), Err(SurfaceError::Destroyed)));

    drop(pool);
    assert_eq!(producer.log().destroyed, 5 * 3);
    assert_eq!(consumer.log().destroyed, 5 * 2);
}

#[test]
fn drop_tears_down() {
    let (mut pool, producer, consumer) = fake_pool(PhysicalSize::new(8, 8), MAX_QUEUE_LEN);
    cycle(&mut pool);
    cycle(&mut pool);
    drop(pool);
    assert!(producer.log().live.is_empty());
    assert!(consumer.log().live.is_empty());
    assert_eq!(producer.log().destroyed, 6);
}

#[test]
fn init_is_validated() {
    let cases = [
        SurfacePoolInit::new(PhysicalSize::new(0, 8)),
        SurfacePoolInit::new(PhysicalSize::new(8, 0)),
        SurfacePoolInit::new(PhysicalSize::new(8, 8)).with_capacity(0),
        SurfacePoolInit::new(PhysicalSize::new(8, 8)).with_capacity(MAX_QUEUE_LEN + 1),
    ];
    for init in cases {
        let result = SurfacePool::new(FakeDomain::new(), FakeDomain::new(), init);
        assert!(matches!(result, Err(SurfaceError::Config(_))));
    }

    let pool = SurfacePool::new(
        FakeDomain::new(),
        FakeDomain::new(),
        SurfacePoolInit::new(PhysicalSize::new(3, 40)),
    )
    .unwrap();
    assert_eq!(pool.capacity(), MAX_QUEUE_LEN);
    assert_eq!(pool.staging_size, PhysicalSize::new(3, 16));
    assert!(pool.is_empty());
}
