//! End-to-end tests for the per-connection player

mod common;

use common::{TestClient, TestServer, SONG_BLUE_IN_GREEN, SONG_CIEL, SONG_FREDDIE, SONG_SO_WHAT};
use std::collections::HashSet;

const KIND_OF_BLUE: [&str; 3] = [SONG_SO_WHAT, SONG_FREDDIE, SONG_BLUE_IN_GREEN];

#[tokio::test]
async fn test_single_song_playlist() {
    let server = TestServer::spawn().await;
    let mut client = TestClient::connect(server.addr).await;

    assert_eq!(client.create("alice", "secret1", "free").await, "CREATE_SUCCESS");
    assert_eq!(client.login("alice", "secret1").await, "LOGIN_SUCCESS");
    client.prepare_playlist("Drive", &[SONG_CIEL]).await;

    assert_eq!(
        client.command("PLAYER_PLAY").await,
        "PLAYING 1/1 Ciel - Gims [mode=SEQUENTIAL]"
    );
    assert_eq!(
        client.command("PLAYER_NEXT").await,
        "UNCHANGED PLAYING 1/1 Ciel - Gims [mode=SEQUENTIAL]"
    );
}

#[tokio::test]
async fn test_sequential_stops_at_the_ends() {
    let server = TestServer::spawn().await;
    let mut client = TestClient::authenticated(server.addr).await;
    client.prepare_playlist("Blue", &KIND_OF_BLUE).await;

    assert!(client.command("PLAYER_PLAY").await.starts_with("PLAYING 1/3 So What"));
    assert!(client.command("PLAYER_NEXT").await.starts_with("PLAYING 2/3"));
    assert!(client.command("PLAYER_NEXT").await.starts_with("PLAYING 3/3"));
    assert!(client
        .command("PLAYER_NEXT")
        .await
        .starts_with("UNCHANGED PLAYING 3/3 Blue in Green"));

    assert!(client.command("PLAYER_PREV").await.starts_with("PLAYING 2/3"));
    assert!(client.command("PLAYER_PREVIOUS").await.starts_with("PLAYING 1/3"));
    assert!(client.command("PLAYER_PREV").await.starts_with("UNCHANGED PLAYING 1/3"));
}

#[tokio::test]
async fn test_repeat_wraps_around() {
    let server = TestServer::spawn().await;
    let mut client = TestClient::authenticated(server.addr).await;
    client.prepare_playlist("Blue", &KIND_OF_BLUE).await;

    assert_eq!(
        client.command("SET_PLAYBACK_MODE repeat").await,
        "SUCCESS Playback mode set to REPEAT"
    );
    for expected in ["1/3", "2/3", "3/3", "1/3"] {
        let status = client.command("PLAYER_NEXT").await;
        assert!(status.starts_with(&format!("STOPPED {}", expected)), "{}", status);
        assert!(status.ends_with("[mode=REPEAT]"), "{}", status);
    }
    assert!(client.command("PLAYER_PREV").await.starts_with("STOPPED 3/3"));
}

#[tokio::test]
async fn test_free_account_falls_back_from_shuffle() {
    let server = TestServer::spawn().await;
    let mut client = TestClient::authenticated(server.addr).await;

    let response = client.command("SET_PLAYBACK_MODE SHUFFLE").await;
    assert_eq!(
        response,
        "MODE_FALLBACK SHUFFLE is not available for this account; using SEQUENTIAL"
    );

    client.create_playlist("Blue").await;
    client.add_song("Blue", SONG_SO_WHAT).await;
    let response = client.command("LOAD_PLAYLIST Blue shuffle").await;
    assert!(
        response.starts_with("SUCCESS Loaded Blue with 1 song(s) [mode=SEQUENTIAL] MODE_FALLBACK"),
        "{}",
        response
    );

    let response = client.command("SET_PLAYBACK_MODE backwards").await;
    assert!(response.starts_with("MODE_FALLBACK Unknown playback mode"), "{}", response);
}

#[tokio::test]
async fn test_premium_shuffle_visits_every_track() {
    let server = TestServer::spawn().await;
    let mut client = TestClient::authenticated_premium(server.addr).await;
    client.create_playlist("Blue").await;
    for title in KIND_OF_BLUE {
        client.add_song("Blue", title).await;
    }

    let response = client.command("LOAD_PLAYLIST Blue SHUFFLE").await;
    assert_eq!(response, "SUCCESS Loaded Blue with 3 song(s) [mode=SHUFFLE]");

    let mut seen = HashSet::new();
    for _ in 0..3 {
        let status = client.command("PLAYER_NEXT").await;
        assert!(status.starts_with("STOPPED "), "{}", status);
        assert!(status.ends_with("[mode=SHUFFLE]"), "{}", status);
        seen.insert(status);
    }
    assert_eq!(seen.len(), 3);
}

#[tokio::test]
async fn test_pause_resume_stop_and_exit() {
    let server = TestServer::spawn().await;
    let mut client = TestClient::authenticated(server.addr).await;
    client.prepare_playlist("Blue", &KIND_OF_BLUE).await;

    assert!(client.command("PLAYER_PAUSE").await.starts_with("UNCHANGED STOPPED 0/3"));
    assert!(client.command("PLAYER_PLAY").await.starts_with("PLAYING 1/3"));
    assert!(client.command("PLAYER_PAUSE").await.starts_with("PAUSED 1/3"));
    assert!(client.command("PLAYER_PAUSE").await.starts_with("UNCHANGED PAUSED 1/3"));
    assert!(client.command("PLAYER_PLAY").await.starts_with("PLAYING 1/3"));
    assert!(client.command("PLAYER_NEXT").await.starts_with("PLAYING 2/3"));
    // Stop keeps the position
    assert!(client.command("PLAYER_STOP").await.starts_with("STOPPED 2/3"));
    assert!(client.command("PLAYER_STATUS").await.starts_with("STOPPED 2/3 Freddie Freeloader"));

    assert_eq!(client.command("PLAYER_EXIT").await, "STOPPED 0/0");
    assert_eq!(client.command("PLAYER_STATUS").await, "STOPPED 0/0");
    assert_eq!(client.command("PLAYER_PLAY").await, "UNCHANGED STOPPED 0/0");
}

#[tokio::test]
async fn test_players_are_per_connection() {
    let server = TestServer::spawn().await;
    let mut first = TestClient::authenticated(server.addr).await;
    first.prepare_playlist("Blue", &KIND_OF_BLUE).await;
    first.command("PLAYER_PLAY").await;

    let mut second = TestClient::authenticated(server.addr).await;
    assert_eq!(second.command("PLAYER_STATUS").await, "STOPPED 0/0");
    assert!(second.load_playlist("Blue").await.starts_with("SUCCESS"));
    assert!(second.command("PLAYER_STATUS").await.starts_with("STOPPED 0/3"));

    assert!(first.command("PLAYER_STATUS").await.starts_with("PLAYING 1/3"));
}

#[tokio::test]
async fn test_empty_playlist_ignores_player_commands() {
    let server = TestServer::spawn().await;
    let mut client = TestClient::authenticated(server.addr).await;
    client.prepare_playlist("Empty", &[]).await;

    assert_eq!(
        client.command("PLAYER_PLAY").await,
        "UNCHANGED STOPPED 0/0 [mode=SEQUENTIAL]"
    );
    assert_eq!(
        client.command("PLAYER_NEXT").await,
        "UNCHANGED STOPPED 0/0 [mode=SEQUENTIAL]"
    );
}
