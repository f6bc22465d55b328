use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::config::ApiConfig;
use crate::error::ClientError;
use crate::model::{
    Chat, ChatCreated, ChatSummary, FileHandle, IngestReceipt, SendReply, SendRequest,
};

pub type Result<T> = std::result::Result<T, ClientError>;

/// The backend's HTTP surface.
///
/// One request/response round-trip per call and no retries: creating a chat,
/// sending a message and ingesting a file are not idempotent on the server.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn create_chat(&self) -> Result<ChatCreated>;

    async fn get_chat(&self, chat_id: i64) -> Result<Chat>;

    async fn list_chats(&self) -> Result<Vec<ChatSummary>>;

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<SendReply>;

    async fn upload_file(&self, file: &FileHandle, chat_id: i64) -> Result<IngestReceipt>;
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    api: ApiConfig,
}

impl HttpBackend {
    pub fn new(api: ApiConfig) -> Self {
        Self {
            client: Client::new(),
            api,
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Server { status, body });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn logged<T>(op: &'static str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        tracing::debug!(op, error = %e, "backend call failed");
    }
    result
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn create_chat(&self) -> Result<ChatCreated> {
        let url = self.api.url("/chat/new");
        tracing::debug!(%url, "creating chat");

        let result: Result<ChatCreated> = async {
            let response = self.client.post(&url).send().await?;
            Self::decode(response).await
        }
        .await;
        logged("create_chat", result)
    }

    async fn get_chat(&self, chat_id: i64) -> Result<Chat> {
        let url = self.api.url(&format!("/chat/{}", chat_id));
        tracing::debug!(%url, chat_id, "fetching chat history");

        let result: Result<Chat> = async {
            let response = self.client.get(&url).send().await?;
            Self::decode(response).await
        }
        .await;
        logged("get_chat", result)
    }

    async fn list_chats(&self) -> Result<Vec<ChatSummary>> {
        let url = self.api.url("/chats");
        tracing::debug!(%url, "listing chats");

        let result: Result<Vec<ChatSummary>> = async {
            let response = self.client.get(&url).send().await?;
            Self::decode(response).await
        }
        .await;
        logged("list_chats", result)
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> Result<SendReply> {
        let url = self.api.url("/message");
        tracing::debug!(%url, chat_id, len = text.len(), "sending message");

        let request = SendRequest {
            chat_id,
            input: text,
        };

        let result: Result<SendReply> = async {
            let response = self.client.post(&url).json(&request).send().await?;
            Self::decode(response).await
        }
        .await;
        logged("send_message", result)
    }

    async fn upload_file(&self, file: &FileHandle, chat_id: i64) -> Result<IngestReceipt> {
        let url = self.api.url("/ingest");
        tracing::debug!(%url, chat_id, file = %file.name, "uploading file");

        let result: Result<IngestReceipt> = async {
            let bytes = tokio::fs::read(&file.path)
                .await
                .map_err(|source| ClientError::File {
                    path: file.path.clone(),
                    source,
                })?;

            let part = Part::bytes(bytes).file_name(file.name.clone());
            let form = Form::new().part("file", part);

            let response = self
                .client
                .post(&url)
                .query(&[("chat_id", chat_id)])
                .multipart(form)
                .send()
                .await?;
            Self::decode(response).await
        }
        .await;
        logged("upload_file", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MessageId, Sender};
    use axum::extract::{Multipart, Path, Query};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use crate::session::{Completion, Outcome, Session};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    async fn serve(router: Router) -> HttpBackend {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        HttpBackend::new(ApiConfig {
            base_url: format!("http://{}", addr),
            ..ApiConfig::default()
        })
    }

    fn stub_backend() -> Router {
        Router::new()
            .route("/chat/new", post(|| async { Json(json!({"chat_id": 3})) }))
            .route(
                "/chat/:id",
                get(|Path(id): Path<i64>| async move {
                    Json(json!({
                        "chat_id": id,
                        "messages": [
                            {"message_id": 10, "sender": "user", "content": "hello"},
                            {"message_id": 11, "sender": "assistant", "content": "hi there"}
                        ]
                    }))
                }),
            )
            .route(
                "/chats",
                get(|| async {
                    Json(json!([
                        {"id": 3, "messages": []},
                        {"id": 1, "messages": [{"content": "first", "sender": "user"}]}
                    ]))
                }),
            )
            .route(
                "/message",
                post(|Json(body): Json<Value>| async move {
                    Json(json!({
                        "chat_id": body["chat_id"],
                        "message_id": 42,
                        "response": format!("echo: {}", body["input"].as_str().unwrap_or(""))
                    }))
                }),
            )
            .route(
                "/ingest",
                post(
                    |Query(params): Query<HashMap<String, String>>, mut multipart: Multipart| async move {
                        let mut field_name = String::new();
                        let mut file_name = String::new();
                        let mut size = 0;
                        while let Some(field) = multipart.next_field().await.unwrap() {
                            field_name = field.name().unwrap_or_default().to_string();
                            file_name = field.file_name().unwrap_or_default().to_string();
                            size = field.bytes().await.unwrap().len();
                        }
                        Json(json!({
                            "success": true,
                            "chat_id": params.get("chat_id"),
                            "field": field_name,
                            "file_name": file_name,
                            "size": size
                        }))
                    },
                ),
            )
    }

    #[tokio::test]
    async fn test_create_chat() {
        let backend = serve(stub_backend()).await;
        let created = backend.create_chat().await.unwrap();
        assert_eq!(created.chat_id, 3);
    }

    #[tokio::test]
    async fn test_get_chat() {
        let backend = serve(stub_backend()).await;
        let chat = backend.get_chat(7).await.unwrap();
        assert_eq!(chat.id, 7);
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[1].id, MessageId::Committed(11));
        assert_eq!(chat.messages[1].sender, Sender::Assistant);
    }

    #[tokio::test]
    async fn test_list_chats() {
        let backend = serve(stub_backend()).await;
        let chats = backend.list_chats().await.unwrap();
        assert_eq!(chats.iter().map(|c| c.id).collect::<Vec<_>>(), vec![3, 1]);
        assert_eq!(chats[1].preview(), "first");
    }

    #[tokio::test]
    async fn test_send_message_posts_chat_id_and_input() {
        let backend = serve(stub_backend()).await;
        let reply = backend.send_message(7, "hello").await.unwrap();
        assert_eq!(reply.chat_id, Some(7));
        assert_eq!(reply.message_id, 42);
        assert_eq!(reply.response, "echo: hello");
    }

    #[tokio::test]
    async fn test_upload_file_sends_multipart_field() {
        let backend = serve(stub_backend()).await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "some notes").unwrap();
        let file = FileHandle::from_path(&path).unwrap();

        let receipt = backend.upload_file(&file, 5).await.unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.extra["chat_id"], json!("5"));
        assert_eq!(receipt.extra["field"], json!("file"));
        assert_eq!(receipt.extra["file_name"], json!("notes.txt"));
        assert_eq!(receipt.extra["size"], json!(10));
    }

    #[tokio::test]
    async fn test_upload_missing_file_makes_no_request() {
        let backend = serve(Router::new()).await;
        let file = FileHandle {
            path: "/definitely/not/here.txt".into(),
            name: "here.txt".to_string(),
        };
        let err = backend.upload_file(&file, 1).await.unwrap_err();
        assert!(matches!(err, ClientError::File { .. }));
    }

    #[tokio::test]
    async fn test_error_status_is_server_error() {
        let router = Router::new().route(
            "/chat/:id",
            get(|| async { (StatusCode::NOT_FOUND, "Chat not found") }),
        );
        let backend = serve(router).await;
        match backend.get_chat(99).await {
            Err(ClientError::Server { status, body }) => {
                assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
                assert_eq!(body, "Chat not found");
            }
            other => panic!("expected server error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() {
        let router = Router::new().route("/chats", get(|| async { "not json" }));
        let backend = serve(router).await;
        let err = backend.list_chats().await.unwrap_err();
        assert!(matches!(err, ClientError::Parse(_)));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = HttpBackend::new(ApiConfig {
            base_url: format!("http://{}", addr),
            ..ApiConfig::default()
        });
        let err = backend.create_chat().await.unwrap_err();
        assert!(matches!(err, ClientError::Network(_)));
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_call_is_warned_once() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let router = Router::new().route(
            "/chat/:id",
            get(|| async { (StatusCode::NOT_FOUND, "Chat not found") }),
        );
        let backend = serve(router).await;
        let mut session = Session::open(99);
        let ticket = session.ticket();
        let result = backend.get_chat(99).await;
        session.apply(Completion {
            ticket,
            outcome: Outcome::History(result),
        });

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.matches("WARN").count(), 1, "{}", output);
        assert!(output.contains("could not load chat history"));
    }
}
