//! Test utilities for the store adapters.
//!
//! [`serve`] runs an axum router on an ephemeral local port so the HTTP
//! adapters can be pointed at it through their `base_url`.

use axum::Router;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use url::Url;

/// Serve `app` on `127.0.0.1:0` and return the bound address.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub listener address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server");
    });
    addr
}

/// `http://{addr}/{path}`
pub fn base_url(addr: SocketAddr, path: &str) -> Url {
    Url::parse(&format!("http://{addr}/{path}")).expect("stub base url")
}

/// Requests seen by a stub, shared with its handler through axum state.
#[derive(Debug)]
pub struct Recorder<T>(Arc<Mutex<Vec<T>>>);

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self(Arc::default())
    }
}

impl<T: Clone> Recorder<T> {
    pub fn record(&self, request: T) {
        self.0.lock().expect("recorder lock").push(request);
    }

    pub fn requests(&self) -> Vec<T> {
        self.0.lock().expect("recorder lock").clone()
    }
}
