//! Integration tests for the library over real HTTP and SQLite.
//!
//! Feeds are served by a wiremock server and fetched with `ReqwestClient`;
//! playback state lives in a file-backed database so it can outlive a library.

use std::path::PathBuf;
use std::sync::Arc;

use podsync::config::Config;
use podsync::feed::{ReqwestClient, TransportError};
use podsync::playback::PlaybackEvent;
use podsync::storage::{Database, StateStore};
use podsync::{FetchError, Library};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SHOW_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
  <channel>
    <title>Night Shift &amp; Friends</title>
    <itunes:author>Radio Collective</itunes:author>
    <description><![CDATA[<p>Late night <b>talk</b>.</p>]]></description>
    <itunes:image href="https://cdn.example/cover.jpg"/>
    <item>
      <title>Pilot</title>
      <guid>night-1</guid>
      <pubDate>Mon, 01 Jan 2024 22:00:00 +0000</pubDate>
      <itunes:duration>45:00</itunes:duration>
      <enclosure url="https://cdn.example/night-1.mp3" type="audio/mpeg" length="43200000"/>
    </item>
    <item>
      <title>Second Night</title>
      <guid>night-2</guid>
      <pubDate>Mon, 08 Jan 2024 22:00:00 +0000</pubDate>
      <itunes:duration>1:02:03</itunes:duration>
      <enclosure url="https://cdn.example/night-2.mp3" type="audio/mpeg" length="60000000"/>
    </item>
    <item>
      <title>Trailer without audio</title>
      <guid>night-0</guid>
    </item>
  </channel>
</rss>"#;

const NEWS_FEED: &str = r#"<rss version="2.0"><channel><title>Morning News</title>
<item><title>Headlines</title><guid>news-1</guid>
<pubDate>2024-01-05T06:00:00Z</pubDate>
<enclosure url="https://cdn.example/news-1.m4a" type="audio/x-m4a"/></item>
</channel></rss>"#;

struct TempDb {
    dir: PathBuf,
}

impl TempDb {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("podsync_it_{}_{}", name, std::process::id()));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).unwrap();
        Self { dir }
    }

    fn path(&self) -> String {
        self.dir.join("state.db").to_str().unwrap().to_string()
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.dir).ok();
    }
}

async fn library_at(db_path: &str) -> Library<ReqwestClient, Database> {
    let http = ReqwestClient::new(&Config::default()).unwrap();
    let db = Database::open(db_path).await.unwrap();
    Library::new(http, db).with_concurrency(2)
}

async fn serve(server: &MockServer, route: &str, status: u16, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_parses_and_caches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/night.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SHOW_FEED))
        .expect(1)
        .mount(&server)
        .await;
    let url = format!("{}/night.xml", server.uri());
    let library = library_at(":memory:").await;

    let podcast = library.fetch_podcast(&url, false).await.unwrap();
    let cached = library.fetch_podcast(&url, false).await.unwrap();

    assert!(Arc::ptr_eq(&podcast, &cached));
    assert_eq!(podcast.title, "Night Shift & Friends");
    assert_eq!(podcast.description, "Late night talk.");
    assert_eq!(podcast.author.as_deref(), Some("Radio Collective"));
    assert_eq!(podcast.image_url.as_deref(), Some("https://cdn.example/cover.jpg"));

    let ids: Vec<&str> = podcast.episodes.iter().map(|e| e.id()).collect();
    assert_eq!(ids, vec!["night-2", "night-1"]);
    assert_eq!(podcast.episodes[0].duration, 3723);
    assert_eq!(podcast.episodes[1].duration, 2700);
    assert_eq!(podcast.episodes[0].file_size, 60_000_000);
}

#[tokio::test]
async fn test_playback_state_persists_across_libraries() {
    let server = MockServer::start().await;
    serve(&server, "/night.xml", 200, SHOW_FEED).await;
    let url = format!("{}/night.xml", server.uri());
    let db = TempDb::new("persist");

    {
        let library = library_at(&db.path()).await;
        library.subscribe(&url).await.unwrap();
        library
            .handle_playback_event(PlaybackEvent::Progress {
                episode_id: "night-2".into(),
                position: 120,
            })
            .await
            .unwrap();
        library
            .handle_playback_event(PlaybackEvent::Completed {
                episode_id: "night-1".into(),
            })
            .await
            .unwrap();

        let cached = library.cached(&url).await.unwrap();
        assert_eq!(cached.episode("night-2").unwrap().playback_position, 120);
        assert!(cached.episode("night-1").unwrap().is_played);
    }

    let library = library_at(&db.path()).await;
    assert_eq!(library.subscriptions().await.unwrap(), vec![url.clone()]);

    let podcast = library.fetch_podcast(&url, false).await.unwrap();
    let second = podcast.episode("night-2").unwrap();
    assert_eq!(second.playback_position, 120);
    assert!(!second.is_played);
    assert!(podcast.episode("night-1").unwrap().is_played);
    assert_eq!(library.resume_position("night-2").await.unwrap(), 120);
}

#[tokio::test]
async fn test_refresh_reports_each_feed() {
    let server = MockServer::start().await;
    serve(&server, "/night.xml", 200, SHOW_FEED).await;
    serve(&server, "/broken.xml", 500, "").await;
    serve(&server, "/news.xml", 200, NEWS_FEED).await;
    let library = library_at(":memory:").await;

    let urls: Vec<String> = ["/night.xml", "/broken.xml", "/news.xml"]
        .iter()
        .map(|p| format!("{}{}", server.uri(), p))
        .collect();
    for url in &urls {
        library.store().add_subscription(url).await.unwrap();
    }

    let results = library.fetch_subscribed(false).await.unwrap();
    assert_eq!(results.len(), 3);
    assert!(results[0].result.is_ok());
    assert!(matches!(
        results[1].result,
        Err(FetchError::Transport(TransportError::Status(500)))
    ));
    assert_eq!(results[2].result.as_ref().unwrap().title, "Morning News");

    let episodes = library.get_all_episodes(false).await.unwrap();
    let ids: Vec<&str> = episodes.iter().map(|(e, _)| e.id()).collect();
    assert_eq!(ids, vec!["night-2", "news-1", "night-1"]);
    assert_eq!(episodes[1].1.title, "Morning News");
}

#[tokio::test]
async fn test_failed_subscribe_is_not_recorded() {
    let server = MockServer::start().await;
    serve(&server, "/missing.xml", 404, "").await;
    serve(&server, "/page.html", 200, "<html><body>Hello</body></html>").await;
    let library = library_at(":memory:").await;

    let missing = library
        .subscribe(&format!("{}/missing.xml", server.uri()))
        .await;
    let page = library.subscribe(&format!("{}/page.html", server.uri())).await;

    assert!(matches!(
        missing,
        Err(FetchError::Transport(TransportError::Status(404)))
    ));
    assert!(matches!(page, Err(FetchError::Malformed(_))));
    assert!(library.subscriptions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    let library = library_at(":memory:").await;
    let result = library
        .fetch_podcast("http://127.0.0.1:1/feed.xml", false)
        .await;
    assert!(matches!(result, Err(FetchError::Transport(_))));
}
