#![allow(dead_code)]

use std::io::Cursor;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use pyro_db::Database;
use pyroprint_lib::app::SharedState;
use pyroprint_lib::config::AppConfig;
use pyroprint_lib::server::router::create_router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub state: SharedState,
    _dir: TempDir,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }
}

/// Config for tests: no throttling and a generous render timeout.
pub fn test_config() -> AppConfig {
    AppConfig {
        throttle: Duration::ZERO,
        render_timeout: Duration::from_secs(300),
        ..AppConfig::default()
    }
}

pub fn spawn_app(config: AppConfig) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_in_memory().unwrap();
    let state = SharedState::new(db, config, dir.path().to_path_buf());
    TestApp {
        router: create_router(state.clone()),
        state,
        _dir: dir,
    }
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post(&self, uri: &str) -> TestResponse {
        self.send(Request::post(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn command(&self, user_id: i64, token: &str) -> TestResponse {
        self.post(&format!("/api/sessions/{user_id}/commands/{token}"))
            .await
    }

    pub async fn upload(&self, user_id: i64, bytes: Vec<u8>, content_type: &str) -> TestResponse {
        self.send(
            Request::post(format!("/api/sessions/{user_id}/image"))
                .header("content-type", content_type)
                .body(Body::from(bytes))
                .unwrap(),
        )
        .await
    }
}

/// PNG-encoded RGB gradient.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let v = ((x * 255) / width.max(1)) as u8;
        Rgb([v, ((y * 255) / height.max(1)) as u8, 255 - v])
    });
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

pub fn le_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

pub fn le_i32(bytes: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}
