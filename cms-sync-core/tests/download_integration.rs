use mockall::predicate::eq;

use cms_sync_core::contract::{
    AlbumInfo, AlbumPage, ItemDescriptor, ListPage, MediaItem, MediaPage, MockDriveApi,
    MockPhotosApi,
};
use cms_sync_core::download::{
    fetch_album, fetch_content, list_albums, list_items, FetchStrategy, MAX_PAGES,
};
use cms_sync_core::error::SyncError;

fn item(id: &str, hint: &str) -> ItemDescriptor {
    ItemDescriptor {
        id: id.into(),
        name: id.into(),
        content_type_hint: hint.into(),
    }
}

#[tokio::test]
async fn test_list_items_follows_pages_and_drops_folders() {
    let mut drive = MockDriveApi::new();
    drive
        .expect_list_page()
        .with(eq("root"), eq(None::<String>))
        .times(1)
        .returning(|_, _| {
            Ok(ListPage {
                items: vec![
                    item("a", "text/plain"),
                    item("sub", "application/vnd.google-apps.folder"),
                ],
                next_page_token: Some("p2".into()),
            })
        });
    drive
        .expect_list_page()
        .with(eq("root"), eq(Some("p2".to_string())))
        .times(1)
        .returning(|_, _| {
            Ok(ListPage {
                items: vec![item("b", "application/vnd.google-apps.document")],
                next_page_token: None,
            })
        });

    let items = list_items(&drive, "root").await.unwrap();
    let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[tokio::test]
async fn test_list_items_stops_at_page_cap() {
    let mut drive = MockDriveApi::new();
    drive
        .expect_list_page()
        .times(MAX_PAGES)
        .returning(|_, _| {
            Ok(ListPage {
                items: vec![item("x", "text/plain")],
                next_page_token: Some("again".into()),
            })
        });

    let items = list_items(&drive, "loop").await.unwrap();
    assert_eq!(items.len(), MAX_PAGES);
}

#[tokio::test]
async fn test_list_items_propagates_upstream_error() {
    let mut drive = MockDriveApi::new();
    drive.expect_list_page().returning(|_, _| {
        Err(SyncError::Upstream {
            status: 403,
            body: "forbidden".into(),
        })
    });

    let err = list_items(&drive, "root").await.unwrap_err();
    assert!(err.is_upstream());
}

#[tokio::test]
async fn test_fetch_content_decodes_lossily() {
    let mut drive = MockDriveApi::new();
    drive
        .expect_fetch_raw()
        .returning(|_| Ok(vec![b'h', b'i', 0xff]));

    let text = fetch_content(&drive, "bin", "application/octet-stream")
        .await
        .unwrap();
    assert!(text.starts_with("hi"));
    assert!(text.contains('\u{fffd}'));
}

#[test]
fn test_fetch_strategy_for_hint() {
    assert_eq!(
        FetchStrategy::for_hint("application/vnd.google-apps.document"),
        FetchStrategy::Export
    );
    assert_eq!(FetchStrategy::for_hint("text/plain"), FetchStrategy::Raw);
    assert_eq!(FetchStrategy::for_hint(""), FetchStrategy::Raw);
}

#[tokio::test]
async fn test_list_albums_collects_pages() {
    let mut photos = MockPhotosApi::new();
    photos
        .expect_list_albums_page()
        .with(eq(None::<String>))
        .returning(|_| {
            Ok(AlbumPage {
                albums: vec![AlbumInfo {
                    id: "a1".into(),
                    title: "One".into(),
                }],
                next_page_token: Some("next".into()),
            })
        });
    photos
        .expect_list_albums_page()
        .with(eq(Some("next".to_string())))
        .returning(|_| {
            Ok(AlbumPage {
                albums: vec![AlbumInfo {
                    id: "a2".into(),
                    title: "Two".into(),
                }],
                next_page_token: None,
            })
        });

    let albums = list_albums(&photos).await.unwrap();
    assert_eq!(albums.len(), 2);
    assert_eq!(albums[1].id, "a2");
}

#[tokio::test]
async fn test_fetch_album_uses_first_media_description() {
    let mut photos = MockPhotosApi::new();
    photos.expect_get_album().returning(|id| {
        Ok(AlbumInfo {
            id: id.to_string(),
            title: "Hero".into(),
        })
    });
    photos
        .expect_search_media_page()
        .with(eq("alb"), eq(None::<String>))
        .returning(|_, _| {
            Ok(MediaPage {
                media_items: vec![MediaItem {
                    id: "m1".into(),
                    base_url: "https://img/a".into(),
                    mime_type: "image/png".into(),
                    description: "Assistant: Bo\nDescription: Rooftop shoot".into(),
                }],
                next_page_token: Some("more".into()),
            })
        });
    photos
        .expect_search_media_page()
        .with(eq("alb"), eq(Some("more".to_string())))
        .returning(|_, _| {
            Ok(MediaPage {
                media_items: vec![MediaItem {
                    id: "m2".into(),
                    base_url: "https://img/b".into(),
                    mime_type: "image/png".into(),
                    description: String::new(),
                }],
                next_page_token: None,
            })
        });

    let album = fetch_album(&photos, "alb").await.unwrap();
    assert_eq!(album.title, "Hero");
    assert_eq!(album.series, "");
    assert_eq!(
        album.images,
        vec!["https://img/a=w1920-h1080", "https://img/b=w1920-h1080"]
    );
    assert_eq!(album.assistant, "Bo");
    assert_eq!(album.description, "Rooftop shoot");
}

#[tokio::test]
async fn test_fetch_album_failure_propagates() {
    let mut photos = MockPhotosApi::new();
    photos
        .expect_get_album()
        .returning(|_| Err(SyncError::Transport("connection reset".into())));
    photos.expect_search_media_page().never();

    let err = fetch_album(&photos, "alb").await.unwrap_err();
    assert!(matches!(err, SyncError::Transport(_)));
}
