//! `hello.v1` service implementation.

use tonic::{Request, Response, Status};

use crate::observability::metrics::record_echo_request;

/// Generated protobuf messages and service stubs.
pub mod pb {
    tonic::include_proto!("hello.v1");
}

pub use pb::test_service_client::TestServiceClient;
pub use pb::test_service_server::{TestService, TestServiceServer};
pub use pb::{HelloRequest, HelloResponse};

/// Encoded `FileDescriptorSet` for `hello/v1/hello.proto`, served through
/// reflection.
pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("hello_descriptor");

/// Echoes every message back to the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct HelloService;

impl HelloService {
    /// Wrap into the tonic server type accepted by the lifecycle manager.
    pub fn into_server(self) -> TestServiceServer<Self> {
        TestServiceServer::new(self)
    }
}

#[tonic::async_trait]
impl TestService for HelloService {
    async fn hello(
        &self,
        request: Request<HelloRequest>,
    ) -> Result<Response<HelloResponse>, Status> {
        let message = request.into_inner().message;
        tracing::info!(bytes = message.len(), "Hello");
        record_echo_request();

        Ok(Response::new(HelloResponse { response: message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[tokio::test]
    async fn test_hello_echoes_message() {
        let response = HelloService
            .hello(Request::new(HelloRequest {
                message: "hi".into(),
            }))
            .await
            .unwrap();
        assert_eq!(response.into_inner().response, "hi");
    }

    #[test]
    fn test_descriptor_set_names_service() {
        let set = prost_types::FileDescriptorSet::decode(FILE_DESCRIPTOR_SET).unwrap();
        let services: Vec<_> = set
            .file
            .iter()
            .filter(|file| file.package() == "hello.v1")
            .flat_map(|file| file.service.iter().map(|service| service.name().to_string()))
            .collect();
        assert_eq!(services, vec!["TestService"]);
    }
}
