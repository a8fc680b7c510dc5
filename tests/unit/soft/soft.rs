use std::time::Duration;

use super::*;
use crate::engine::pool::{SurfacePool, SurfacePoolInit};
use crate::test_support::init_tracing;

fn slow() -> Arc<JitterFn> {
    Arc::new(|| Duration::from_millis(2))
}

fn pattern(size: PhysicalSize<u32>, seed: u8) -> Vec<u8> {
    (0..byte_len(size))
        .map(|i| (i as u8).wrapping_mul(7).wrapping_add(seed))
        .collect()
}

#[test]
fn commands_run_in_issue_order() {
    let device = SoftDevice::new();
    let domain = device.create_domain_with_jitter("ordered", slow()).unwrap();
    let size = PhysicalSize::new(3, 2);
    let texture = domain.create_texture(size).unwrap();

    domain.write_pixels(&texture, pattern(size, 1)).unwrap();
    domain.write_pixels(&texture, pattern(size, 2)).unwrap();
    let first = domain.read_pixels(&texture).unwrap();
    domain.write_pixels(&texture, pattern(size, 3)).unwrap();
    let second = domain.read_pixels(&texture).unwrap();

    assert_eq!(first.recv().unwrap(), pattern(size, 2));
    assert_eq!(second.recv().unwrap(), pattern(size, 3));
}

#[test]
fn map_blocks_until_prior_copy_has_landed() {
    let device = SoftDevice::new();
    let domain = device.create_domain_with_jitter("mapped", slow()).unwrap();
    let size = PhysicalSize::new(4, 4);
    let texture = domain.create_texture(size).unwrap();
    let region = PhysicalSize::new(2, 2);
    let staging = domain.create_staging(region).unwrap();

    domain.write_pixels(&texture, pattern(size, 9)).unwrap();
    domain.copy_to_staging(&texture, &staging, region).unwrap();
    domain.map_staging(&staging).unwrap();

    let source = pattern(size, 9);
    let row = 2 * BYTES_PER_PIXEL;
    let stride = 4 * BYTES_PER_PIXEL;
    let mut expected = source[..row].to_vec();
    expected.extend_from_slice(&source[stride..stride + row]);
    assert_eq!(*lock(&staging.pixels), expected);
}

#[test]
fn copy_region_must_fit() {
    let domain = SoftDevice::new().create_domain("fit").unwrap();
    let texture = domain.create_texture(PhysicalSize::new(4, 4)).unwrap();
    let staging = domain.create_staging(PhysicalSize::new(2, 2)).unwrap();
    let err = domain
        .copy_to_staging(&texture, &staging, PhysicalSize::new(3, 2))
        .unwrap_err();
    assert!(matches!(err, SurfaceError::Mapping(_)));
}

#[test]
fn markers_retire_after_prior_work() {
    let domain = SoftDevice::new()
        .create_domain_with_jitter("markers", slow())
        .unwrap();
    let mut marker = domain.create_marker().unwrap();
    assert_eq!(domain.poll_marker(&mut marker).unwrap(), MarkerStatus::Ready);

    domain.issue_marker(&mut marker).unwrap();
    let first = marker.target();
    domain.issue_marker(&mut marker).unwrap();
    assert!(marker.target() > first);

    domain.inner.timeline.finish().unwrap();
    assert_eq!(domain.poll_marker(&mut marker).unwrap(), MarkerStatus::Ready);
}

#[test]
fn shared_textures_alias_the_same_pixels() {
    let device = SoftDevice::new();
    let producer = device.create_domain("a").unwrap();
    let consumer = device.create_domain("b").unwrap();
    let size = PhysicalSize::new(2, 2);

    let texture = producer.create_texture(size).unwrap();
    let handle = producer.share_handle(&texture).unwrap();
    let opened = consumer.open_shared(handle, size).unwrap();
    assert!(Arc::ptr_eq(&texture.pixels, &opened.pixels));

    consumer.write_pixels(&opened, pattern(size, 4)).unwrap();
    let staging = consumer.create_staging(size).unwrap();
    consumer.map_staging(&staging).unwrap();
    assert_eq!(producer.read_pixels(&texture).unwrap().recv().unwrap(), pattern(size, 4));

    assert!(matches!(
        consumer.open_shared(handle, PhysicalSize::new(4, 4)),
        Err(SurfaceError::Allocation(_))
    ));
    assert!(matches!(
        consumer.open_shared(ShareHandle(u64::MAX), size),
        Err(SurfaceError::Allocation(_))
    ));

    producer.destroy_texture(texture).unwrap();
    assert!(consumer.open_shared(handle, size).is_err());
}

#[test]
fn write_length_is_checked() {
    let domain = SoftDevice::new().create_domain("len").unwrap();
    let texture = domain.create_texture(PhysicalSize::new(2, 2)).unwrap();
    let err = domain.write_pixels(&texture, vec![0; 3]).unwrap_err();
    assert!(matches!(err, SurfaceError::Conversion(_)));
}

#[test]
fn pool_teardown_balances_counters() {
    init_tracing();
    let device = SoftDevice::new();
    let producer = device.create_domain("producer").unwrap();
    let consumer = device.create_domain("consumer").unwrap();
    let mut pool = SurfacePool::new(
        producer.clone(),
        consumer.clone(),
        SurfacePoolInit::new(PhysicalSize::new(40, 30)).with_capacity(3),
    )
    .unwrap();

    for _ in 0..6 {
        let handle = pool.acquire().unwrap();
        pool.release(handle).unwrap();
    }
    assert!(producer.counters().live() > 0);
    drop(pool);

    for domain in [&producer, &consumer] {
        let counts = domain.counters();
        assert!(counts.created > 0);
        assert_eq!(counts.live(), 0);
    }
}

#[test]
fn copy_into_aliased_storage_is_rejected() {
    let device = SoftDevice::new();
    let producer = device.create_domain("alias-a").unwrap();
    let consumer = device.create_domain("alias-b").unwrap();
    let size = PhysicalSize::new(4, 4);
    let region = PhysicalSize::new(2, 2);

    let texture = producer.create_texture(size).unwrap();
    let err = producer
        .copy_to_staging(&texture, &texture.clone(), region)
        .unwrap_err();
    assert!(matches!(err, SurfaceError::Mapping(_)));

    let handle = producer.share_handle(&texture).unwrap();
    let opened = consumer.open_shared(handle, size).unwrap();
    assert!(consumer.copy_to_staging(&opened, &texture, region).is_err());

    // Nothing was queued, so the worker is still responsive.
    let staging = producer.create_staging(region).unwrap();
    producer.copy_to_staging(&texture, &staging, region).unwrap();
    producer.map_staging(&staging).unwrap();
}

#[test]
fn teardown_keeps_storage_alive_for_pending_reads() {
    init_tracing();
    let device = SoftDevice::new();
    let producer = device.create_domain_with_jitter("producer", slow()).unwrap();
    let consumer = device.create_domain("consumer").unwrap();
    let size = PhysicalSize::new(8, 8);
    let mut pool = SurfacePool::new(
        producer.clone(),
        consumer.clone(),
        SurfacePoolInit::new(size),
    )
    .unwrap();

    let handle = pool.acquire().unwrap();
    let target = pool.consumer_texture(&handle).unwrap();
    consumer.write_pixels(target, pattern(size, 5)).unwrap();
    pool.wait_on_consumer_domain(&handle).unwrap();

    // Queue several reads so the last one is still pending when the pool goes away.
    let texture = pool.producer_texture(&handle).unwrap();
    let reads: Vec<_> = (0..4)
        .map(|_| producer.read_pixels(texture).unwrap())
        .collect();
    pool.release(handle).unwrap();
    drop(pool);
    assert_eq!(producer.counters().live(), 0);

    for read in reads {
        assert_eq!(read.recv().unwrap(), pattern(size, 5));
    }
}
