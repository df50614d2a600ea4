//! Shared harness: a mock backend on an ephemeral port.

#![allow(dead_code)]

use std::sync::Arc;

use sidrex_widget::mock_backend::{self, MockConfig, MockState};
use sidrex_widget::{ApiClient, ApiConfig};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub struct Backend {
    pub state: Arc<MockState>,
    pub base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Backend {
    pub async fn start(config: MockConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = MockState::new(config);
        let (tx, rx) = oneshot::channel::<()>();
        let _server = tokio::spawn(mock_backend::serve(listener, Arc::clone(&state), async {
            let _ = rx.await;
        }));
        Self {
            state,
            base_url: format!("http://{addr}/api"),
            shutdown: Some(tx),
        }
    }

    pub async fn default() -> Self {
        Self::start(MockConfig::default()).await
    }

    pub fn client(&self) -> ApiClient {
        ApiClient::new(ApiConfig::default().with_base_url(self.base_url.clone())).unwrap()
    }
}

impl Drop for Backend {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
