use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use shelter_photos::uploader::PayloadFetcher;
use shelter_photos::{
    MemoryStore, PhotoConfig, PhotoHandle, PhotoPayload, PhotoService, SyncError, SyncResult,
};

struct StubFetcher;

#[async_trait]
impl PayloadFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> SyncResult<Bytes> {
        if url.contains("offline") {
            return Err(SyncError::Fetch { url: url.to_string(), reason: "timed out".to_string() });
        }
        Ok(Bytes::from_static(b"\xff\xd8\xff\xe0"))
    }
}

async fn service(paths: Vec<&str>) -> (Arc<MemoryStore>, PhotoService) {
    let config = PhotoConfig::default();
    let store = Arc::new(MemoryStore::new(&config.store).with_objects(paths).await);
    let service = PhotoService::connect(store.clone(), Arc::new(StubFetcher), &config).await;
    (store, service)
}

fn inline() -> PhotoPayload {
    PhotoPayload::inline_jpeg(&[0xff, 0xd8, 0xff])
}

#[tokio::test]
async fn new_uploads_continue_the_sequence() {
    let (store, service) = service(vec!["Luna/luna1.jpg", "Luna/luna2.jpg", "Luna/luna3.jpg"]).await;

    let report = service
        .upload_photos("Luna", &[inline(), inline(), inline()])
        .await
        .unwrap();

    assert!(report.success);
    let tails: Vec<&str> = report.urls.iter().map(|u| u.rsplit('/').next().unwrap()).collect();
    assert_eq!(tails, vec!["luna4.jpg", "luna5.jpg", "luna6.jpg"]);
    assert_eq!(store.paths().await.len(), 6);
}

#[tokio::test]
async fn partial_batch_reports_failure_and_skips_a_number() {
    let (store, service) = service(vec!["Luna/luna1.jpg"]).await;
    let payloads = vec![
        inline(),
        PhotoPayload::parse("https://offline.example.org/cat.jpg").unwrap(),
        PhotoPayload::parse("https://example.org/cat.jpg").unwrap(),
    ];

    let report = service.upload_photos("Luna", &payloads).await.unwrap();

    assert!(!report.success);
    assert_eq!(report.urls.len(), 2);
    assert!(report.urls[0].ends_with("/Luna/luna2.jpg"));
    assert!(report.urls[1].ends_with("/Luna/luna4.jpg"));
    assert!(!store.contains("Luna/luna3.jpg").await);
}

#[tokio::test]
async fn exact_folder_is_preferred() {
    let (_, service) = service(vec!["Luna/luna1.jpg", "Luna Vieja/luna_vieja1.jpg"]).await;

    let photos = service.resolve_all_photos("Luna").await;
    assert_eq!(photos.len(), 1);
    assert!(photos[0].contains("/Luna/luna1.jpg?t="));
}

#[tokio::test]
async fn root_listing_failure_yields_placeholder() {
    let (store, service) = service(vec!["Luna/sofa.jpg"]).await;
    store.fail_listing("").await;

    let main = service.resolve_main_photo("Luna").await.unwrap();
    assert_eq!(main, PhotoConfig::default().locator.fallback_url);
}

#[tokio::test(start_paused = true)]
async fn deleted_photo_is_gone_after_reconcile() {
    let (store, service) = service(vec!["Luna/luna1.jpg", "Luna/luna2.jpg"]).await;
    let photos = service.resolve_all_photos("Luna").await;
    let doomed = PhotoHandle::new(photos[1].clone());

    let result = service.delete_and_reconcile(doomed.url(), "Luna").await.unwrap();

    assert!(result.outcome.deleted_from_store());
    let remaining = result.photos.unwrap();
    assert_eq!(remaining.len(), 1);
    assert!(!remaining.contains(&doomed));
    assert!(!store.contains("Luna/luna2.jpg").await);
}

#[tokio::test(start_paused = true)]
async fn deleting_the_last_photo_reconciles_to_empty() {
    let (store, service) = service(vec!["Tom/tom1.jpg"]).await;
    let url = service.resolve_main_photo("Tom").await.unwrap();

    let calls_before = store.calls();
    let result = service.delete_and_reconcile(&url, "Tom").await.unwrap();

    assert!(result.photos.unwrap().is_empty());
    assert!(store.calls() > calls_before);
}

#[tokio::test]
async fn repeated_lookups_bust_caches() {
    let (_, service) = service(vec!["Luna/luna1.jpg", "Luna/luna2.jpg"]).await;

    let first = service.resolve_all_photos("Luna").await;
    let second = service.resolve_all_photos("Luna").await;

    assert_ne!(first, second);
    let strip = |urls: &[String]| -> Vec<String> {
        urls.iter().map(|u| PhotoHandle::new(u.clone()).without_generation()).collect()
    };
    assert_eq!(strip(&first[..]), strip(&second[..]));
}

#[tokio::test]
async fn missing_identity_never_reaches_the_store() {
    let (store, service) = service(vec!["Luna/luna1.jpg"]).await;
    let calls_after_connect = store.calls();

    let upload = service.upload_photos("", &[inline()]).await;
    let delete = service.delete_photo("https://x/Luna/luna1.jpg", "   ").await;

    assert!(upload.unwrap_err().is_identity());
    assert!(delete.unwrap_err().is_identity());
    assert_eq!(store.calls(), calls_after_connect);
}

#[tokio::test]
async fn unknown_photo_is_still_removed_from_view() {
    let (_, service) = service(vec!["Luna/luna1.jpg"]).await;

    let removable = service
        .delete_photo("https://images.unsplash.com/photo-1514888286974.jpg", "Luna")
        .await
        .unwrap();
    assert!(removable);
}

#[tokio::test(start_paused = true)]
async fn manager_sees_fresh_upload() {
    let (store, service) = service(vec![]).await;
    service.upload_photos("Mía", &[inline()]).await.unwrap();
    // hide the upload from the whole first lookup pass: two root listings, three probed folders
    store.stall_listings(5).await;

    let set = service.open_manager("Mía").await.unwrap();
    assert_eq!(set.len(), 1);
    assert!(set.urls()[0].contains("/mia1.jpg?t="));
    assert!(service.status().is_ready());
}

#[tokio::test]
async fn upload_joins_the_folder_photos_are_read_from() {
    let (_, service) = service(vec!["Luna/luna_blanca1.jpg", "Luna/luna_blanca2.jpg"]).await;

    let report = service.upload_photos("Luna Blanca", &[inline()]).await.unwrap();
    assert!(report.urls[0].ends_with("/Luna/luna_blanca3.jpg"));

    let photos = service.resolve_all_photos("Luna Blanca").await;
    assert_eq!(photos.len(), 3);
}

#[tokio::test]
async fn deleting_the_placeholder_keeps_it_for_everyone() {
    let (store, service) = service(vec!["default/placeholder.jpg"]).await;
    let shown = service.resolve_all_photos("Tom").await;
    assert!(shown[0].contains("/default/placeholder.jpg?t="));

    assert!(service.delete_photo(&shown[0], "Tom").await.unwrap());
    assert!(store.contains("default/placeholder.jpg").await);
    assert!(service.resolve_main_photo("Nina").await.unwrap().contains("/default/placeholder.jpg?t="));
}
