//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Duration;

use grpc_bootstrap::hello::v1::{HelloRequest, TestServiceClient};
use grpc_bootstrap::lifecycle::{EventSink, LifecycleEvent};
use tonic::transport::Channel;

/// Sink that keeps every event for later assertions.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.events().iter().map(LifecycleEvent::kind).collect()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }
}

impl EventSink for RecordingSink {
    fn log_event(&self, event: &LifecycleEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// A port that was free a moment ago.
pub fn free_port() -> u16 {
    let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    probe.local_addr().unwrap().port()
}

pub async fn client(addr: SocketAddr) -> TestServiceClient<Channel> {
    TestServiceClient::connect(format!("http://127.0.0.1:{}", addr.port()))
        .await
        .unwrap()
}

/// Connect, retrying while the server is still coming up.
pub async fn client_with_retry(port: u16) -> TestServiceClient<Channel> {
    for _ in 0..50 {
        if let Ok(client) = TestServiceClient::connect(format!("http://127.0.0.1:{port}")).await {
            return client;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server on port {port} never came up");
}

pub async fn say(client: &mut TestServiceClient<Channel>, message: &str) -> Result<String, tonic::Status> {
    let response = client
        .hello(HelloRequest {
            message: message.to_string(),
        })
        .await?;
    Ok(response.into_inner().response)
}
