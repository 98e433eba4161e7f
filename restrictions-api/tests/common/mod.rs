#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::redirect::Policy;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Notify;

use restrictions_api::config::{Config, DEFAULT_TEST_CONFIG};
use restrictions_api::server::serve;

pub const INSIDE_SUBNET: &str = "192.168.122.4";

static SEED_COUNTER: AtomicUsize = AtomicUsize::new(0);

// 1 Home
// ├── 2 Team
// └── 3 Internal (hidden)
//     └── 4 Handbook
// 5 Legacy (redirected)
// 6 Blog (blog index)
pub fn site_seed() -> Value {
    json!({
        "pages": [
            {"id": 1, "title": "Home", "slug": "home", "permalink": "https://example.com/"},
            {"id": 2, "parent": 1, "title": "Team", "slug": "team", "permalink": "https://example.com/team/"},
            {"id": 3, "parent": 1, "title": "Internal", "slug": "internal", "permalink": "https://example.com/internal/"},
            {"id": 4, "parent": 3, "title": "Handbook", "slug": "handbook", "permalink": "https://example.com/internal/handbook/"},
            {"id": 5, "title": "Legacy", "slug": "legacy", "permalink": "https://example.com/legacy/"},
            {"id": 6, "title": "Blog", "slug": "blog", "permalink": "https://example.com/blog/"}
        ],
        "flags": {
            "3": {"hide_page": "yes"},
            "5": {"redirect_page": "yes", "hide_page": ""}
        },
        "menus": {
            "main": [
                {"id": 10, "url": "https://example.com/team/", "title": "Team"},
                {"id": 11, "url": "https://example.com/internal/", "title": "Internal"},
                {"id": 12, "url": "https://example.com/internal/handbook/", "title": "Handbook", "menu_parent": 11},
                {"id": 13, "url": "https://status.example.org/", "title": "Status", "menu_parent": 11},
                {"id": 14, "url": "https://example.com/blog", "title": "Blog"}
            ]
        },
        "comments": [
            {"id": 100, "page_id": 2, "author": "ana", "content": "Welcome!"},
            {"id": 101, "page_id": 3, "author": "bo", "content": "Internal only"}
        ],
        "sticky": [3, 2],
        "blog_page": 6
    })
}

pub fn write_seed(seed: &Value) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "restrictions-site-{}-{}.json",
        std::process::id(),
        SEED_COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    std::fs::write(&path, seed.to_string()).expect("failed to write site seed");
    path
}

pub fn site_config() -> Config {
    let mut config = DEFAULT_TEST_CONFIG.clone();
    config.site_path = Some(write_seed(&site_seed()));
    config
}

pub struct ServerHandle {
    pub addr: SocketAddr,
    admin_token: String,
    client: reqwest::Client,
    shutdown: Arc<Notify>,
}

impl ServerHandle {
    pub async fn for_config(config: Config) -> ServerHandle {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let notify = Arc::new(Notify::new());
        let shutdown = notify.clone();
        let admin_token = config.admin_token.clone();

        tokio::spawn(async move {
            serve(config, listener, async move { notify.notified().await }).await
        });

        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .build()
            .unwrap();
        ServerHandle {
            addr,
            admin_token,
            client,
            shutdown,
        }
    }

    pub async fn for_site() -> ServerHandle {
        Self::for_config(site_config()).await
    }

    /// Visitor request from outside the subnet.
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("http://{:?}{}", self.addr, path))
            .send()
            .await
            .expect("failed to send request")
    }

    /// Visitor request relayed by the local proxy for an address inside the
    /// subnet.
    pub async fn get_from(&self, path: &str, forwarded_for: &str) -> reqwest::Response {
        self.client
            .get(format!("http://{:?}{}", self.addr, path))
            .header("X-Forwarded-For", forwarded_for)
            .send()
            .await
            .expect("failed to send request")
    }

    pub async fn get_logged_in(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("http://{:?}{}", self.addr, path))
            .header("X-Logged-In", "1")
            .send()
            .await
            .expect("failed to send request")
    }

    pub async fn admin_get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("http://{:?}{}", self.addr, path))
            .header(AUTHORIZATION, format!("Bearer {}", self.admin_token))
            .send()
            .await
            .expect("failed to send request")
    }

    pub async fn admin_post<T: Into<reqwest::Body>>(&self, path: &str, body: T) -> reqwest::Response {
        self.client
            .post(format!("http://{:?}{}", self.addr, path))
            .header(AUTHORIZATION, format!("Bearer {}", self.admin_token))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .expect("failed to send request")
    }

    pub async fn post_without_token<T: Into<reqwest::Body>>(
        &self,
        path: &str,
        body: T,
    ) -> reqwest::Response {
        self.client
            .post(format!("http://{:?}{}", self.addr, path))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .expect("failed to send request")
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown.notify_one()
    }
}

pub fn ids(value: &Value) -> Vec<u64> {
    value
        .as_array()
        .expect("expected a JSON array")
        .iter()
        .map(|entry| match entry {
            Value::Number(id) => id.as_u64().unwrap(),
            other => other["id"].as_u64().unwrap(),
        })
        .collect()
}
