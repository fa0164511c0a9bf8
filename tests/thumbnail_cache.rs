mod common;

use asset_browser::{AssetDirectory, ThumbnailCache, ThumbnailCacheConfig, ThumbnailError};
use std::fs;
use std::sync::Arc;
use std::thread;
use uuid::Uuid;

use common::{write_fixture_tree, write_png};

#[test]
fn second_get_does_not_touch_the_original() {
    let tmp = tempfile::tempdir().unwrap();
    let original = tmp.path().join("wide.png");
    write_png(&original, 64, 16);

    let cache = ThumbnailCache::new(ThumbnailCacheConfig::new(tmp.path().join("cache")));
    let id = Uuid::new_v4();

    let first = cache.get(id, &original, 32).unwrap();
    assert!(cache.is_cached_on_disk(id, 32));

    // Without the original, only the cache can answer
    fs::remove_file(&original).unwrap();
    let second = cache.get(id, &original, 32).unwrap();

    assert_eq!(first.dimensions(), second.dimensions());
    assert_eq!(first.dimensions(), (32, 8));
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn disk_tier_survives_a_new_cache_instance() {
    let tmp = tempfile::tempdir().unwrap();
    let original = tmp.path().join("tall.png");
    write_png(&original, 10, 50);
    let cache_dir = tmp.path().join("cache");
    let id = Uuid::new_v4();

    let first = ThumbnailCache::new(ThumbnailCacheConfig::new(&cache_dir));
    let expected = first.get(id, &original, 25).unwrap();
    drop(first);

    fs::remove_file(&original).unwrap();

    let second = ThumbnailCache::new(ThumbnailCacheConfig::new(&cache_dir));
    assert!(second.is_empty());
    let restored = second.get(id, &original, 25).unwrap();
    assert_eq!(restored.dimensions(), (5, 25));
    assert_eq!(*restored, *expected);
    assert_eq!(second.len(), 1);
}

#[test]
fn sizes_are_cached_separately() {
    let tmp = tempfile::tempdir().unwrap();
    let original = tmp.path().join("square.png");
    write_png(&original, 40, 40);

    let cache = ThumbnailCache::new(ThumbnailCacheConfig::new(tmp.path().join("cache")));
    let id = Uuid::new_v4();

    assert_eq!(cache.get(id, &original, 10).unwrap().dimensions(), (10, 10));
    assert_eq!(cache.get(id, &original, 20).unwrap().dimensions(), (20, 20));
    assert!(cache.is_cached_on_disk(id, 10));
    assert!(cache.is_cached_on_disk(id, 20));
    assert_eq!(cache.len(), 2);
}

#[test]
fn undecodable_original_is_an_error_not_a_panic() {
    let tmp = tempfile::tempdir().unwrap();
    let broken = tmp.path().join("broken.png");
    fs::write(&broken, b"\x89PNG but not really").unwrap();

    let cache = ThumbnailCache::new(ThumbnailCacheConfig::new(tmp.path().join("cache")));
    let id = Uuid::new_v4();

    let err = cache.get(id, &broken, 16).unwrap_err();
    assert!(matches!(err, ThumbnailError::Decode { .. }));
    assert!(!cache.is_cached_on_disk(id, 16));

    let err = cache.get(id, &tmp.path().join("missing.png"), 16).unwrap_err();
    assert!(matches!(err, ThumbnailError::Io { .. }));
}

#[test]
fn memory_budget_evicts_but_disk_keeps_everything() {
    let tmp = tempfile::tempdir().unwrap();
    let original = tmp.path().join("a.png");
    write_png(&original, 16, 16);

    // Room for exactly one 16x16 RGBA thumbnail
    let config =
        ThumbnailCacheConfig::new(tmp.path().join("cache")).with_memory_budget(16 * 16 * 4);
    let cache = ThumbnailCache::new(config);

    let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
    for id in &ids {
        cache.get(*id, &original, 16).unwrap();
    }

    assert_eq!(cache.len(), 1);
    assert!(cache.memory_usage() <= 16 * 16 * 4);
    assert!(ids.iter().all(|id| cache.is_cached_on_disk(*id, 16)));
}

#[test]
fn concurrent_gets_for_the_same_key() {
    let tmp = tempfile::tempdir().unwrap();
    let original = tmp.path().join("a.png");
    write_png(&original, 48, 24);

    let cache = Arc::new(ThumbnailCache::new(ThumbnailCacheConfig::new(tmp.path().join("cache"))));
    let id = Uuid::new_v4();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let original = original.clone();
            thread::spawn(move || cache.get(id, &original, 12).unwrap().dimensions())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), (12, 6));
    }
    assert_eq!(cache.len(), 1);
}

#[test]
fn thumbnails_for_a_loaded_tree() {
    let tmp = tempfile::tempdir().unwrap();
    let swords = write_fixture_tree(&tmp.path().join("assets"));

    let tree = AssetDirectory::load(&swords).unwrap();
    let cache = ThumbnailCache::new(ThumbnailCacheConfig::new(tmp.path().join("cache")));

    for (id, asset) in tree.assets() {
        let thumb = cache.get(*id, asset.path(), 8).unwrap();
        let (w, h) = thumb.dimensions();
        assert_eq!(w.max(h), 8);
    }

    cache.clear().unwrap();
    assert!(cache.is_empty());
    assert!(!tmp.path().join("cache").exists());
}
