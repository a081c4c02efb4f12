//! Line protocol client for end-to-end tests
//!
//! Wraps a TCP connection and provides helpers for the common command
//! sequences. When the wire format changes, update only this file.

#![allow(dead_code)]

use super::constants::*;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    /// Opens an unauthenticated connection
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr)
            .await
            .expect("Failed to connect to test server");
        let (reader, writer) = stream.into_split();
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Opens a connection logged in as the free test user
    pub async fn authenticated(addr: SocketAddr) -> Self {
        Self::logged_in(addr, TEST_USER, TEST_PASS).await
    }

    /// Opens a connection logged in as the premium test user
    pub async fn authenticated_premium(addr: SocketAddr) -> Self {
        Self::logged_in(addr, PREMIUM_USER, PREMIUM_PASS).await
    }

    pub async fn logged_in(addr: SocketAddr, username: &str, password: &str) -> Self {
        let mut client = Self::connect(addr).await;
        let response = client.login(username, password).await;
        assert_eq!(response, "LOGIN_SUCCESS", "Login of {} failed", username);
        client
    }

    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .expect("Failed to write command");
    }

    /// Reads one line, `None` once the server closed the connection
    pub async fn try_read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        let read = tokio::time::timeout(
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
            self.reader.read_line(&mut line),
        )
        .await
        .expect("Timed out waiting for the server")
        .expect("Failed to read from server");
        if read == 0 {
            None
        } else {
            Some(line.trim_end_matches(['\r', '\n']).to_string())
        }
    }

    pub async fn read_line(&mut self) -> String {
        self.try_read_line()
            .await
            .expect("Server closed the connection")
    }

    /// Sends a command expecting a single line reply
    pub async fn command(&mut self, line: &str) -> String {
        self.send(line).await;
        self.read_line().await
    }

    /// Sends a command expecting rows terminated by END
    pub async fn rows(&mut self, line: &str) -> Vec<String> {
        self.send(line).await;
        let mut rows = vec![];
        loop {
            let row = self.read_line().await;
            if row == "END" {
                return rows;
            }
            rows.push(row);
        }
    }

    // ========================================================================
    // Authentication
    // ========================================================================

    pub async fn create(&mut self, username: &str, password: &str, account_type: &str) -> String {
        self.command(&format!("CREATE {} {} {}", username, password, account_type))
            .await
    }

    pub async fn login(&mut self, username: &str, password: &str) -> String {
        self.command(&format!("LOGIN {} {}", username, password)).await
    }

    pub async fn logout(&mut self) -> String {
        self.command("LOGOUT").await
    }

    // ========================================================================
    // Playlists
    // ========================================================================

    pub async fn create_playlist(&mut self, name: &str) -> String {
        self.command(&format!("CREATE_PLAYLIST \"{}\"", name)).await
    }

    pub async fn add_song(&mut self, playlist: &str, title: &str) -> String {
        self.command(&format!("ADD_SONG_TO_PLAYLIST \"{}\" \"{}\"", playlist, title))
            .await
    }

    pub async fn remove_song(&mut self, playlist: &str, title: &str) -> String {
        self.command(&format!(
            "REMOVE_SONG_FROM_PLAYLIST \"{}\" \"{}\"",
            playlist, title
        ))
        .await
    }

    pub async fn load_playlist(&mut self, name: &str) -> String {
        self.command(&format!("LOAD_PLAYLIST \"{}\"", name)).await
    }

    /// Creates a playlist holding `titles` and loads it
    pub async fn prepare_playlist(&mut self, name: &str, titles: &[&str]) {
        assert_eq!(self.create_playlist(name).await, "PLAYLIST_CREATED");
        for title in titles {
            let response = self.add_song(name, title).await;
            assert!(response.starts_with("SUCCESS"), "{}", response);
        }
        let response = self.load_playlist(name).await;
        assert!(response.starts_with("SUCCESS"), "{}", response);
    }
}
