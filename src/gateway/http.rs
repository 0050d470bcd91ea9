//! HTTP gateway for the TrackNest REST backend.
//!
//! Requires the `http` feature. Uses reqwest.
//!
//! ## Routes
//!
//! - `GET {base}/{collection}` - list
//! - `GET {base}/{collection}/search?field=..&query=..` - search
//! - `POST {base}/{collection}` - create (body = record JSON)
//! - `PUT {base}/{collection}/{id}` - update, unless overridden with
//!   [`HttpGateway::with_update_path`]
//! - `DELETE {base}/{collection}/{id}` - delete
//!
//! Every request carries `Authorization: Bearer <token>` from the session.
//!
//! The backend's `users` collection has no search route, and accounts are
//! edited through `PUT /users/{username}/password`:
//!
//! ```ignore
//! let gateway = HttpGateway::new(base, session).with_update_path("users", "{id}/password");
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use tracknest::{HttpGateway, Session};
//!
//! let session = Session::from_token(token)?;
//! let gateway = HttpGateway::new("http://localhost:8080/api", session);
//! let entries: Vec<Entry> = gateway.list("entries").await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::{GatewayError, RemoteSyncGateway};
use crate::session::Session;
use crate::Record;

/// `RemoteSyncGateway` over the REST backend.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    session: Session,
    /// Per-collection update routes, relative to the collection, with an
    /// `{id}` placeholder.
    update_paths: HashMap<String, String>,
}

impl HttpGateway {
    /// Create a gateway rooted at `base_url` (e.g. `"http://localhost:8080/api"`).
    pub fn new(base_url: impl Into<String>, session: Session) -> Self {
        Self::with_client(Client::new(), base_url, session)
    }

    /// Create a gateway that reuses an existing client.
    pub fn with_client(client: Client, base_url: impl Into<String>, session: Session) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            session,
            update_paths: HashMap::new(),
        }
    }

    /// Send updates of `collection` to `{base}/{collection}/{template}`,
    /// where `{id}` in `template` is replaced by the record id.
    pub fn with_update_path(mut self, collection: impl Into<String>, template: impl Into<String>) -> Self {
        self.update_paths.insert(collection.into(), template.into());
        self
    }

    /// Get the session whose credential is attached to every request.
    pub fn session(&self) -> &Session {
        &self.session
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}", self.base_url, collection)
    }

    fn record_url(&self, collection: &str, id: &impl ToString) -> String {
        format!("{}/{}/{}", self.base_url, collection, id.to_string())
    }

    fn update_url(&self, collection: &str, id: &impl ToString) -> String {
        match self.update_paths.get(collection) {
            Some(template) => format!(
                "{}/{}",
                self.collection_url(collection),
                template.replace("{id}", &id.to_string())
            ),
            None => self.record_url(collection, id),
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(reqwest::header::AUTHORIZATION, self.session.bearer())
    }

    async fn send(
        &self,
        request: RequestBuilder,
        collection: &str,
        id: Option<String>,
    ) -> Result<Response, GatewayError> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        tracing::warn!(collection, status = status.as_u16(), "remote store rejected request");
        Err(map_status(status, collection, id, message))
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

fn map_status(
    status: StatusCode,
    collection: &str,
    id: Option<String>,
    message: String,
) -> GatewayError {
    match status {
        StatusCode::NOT_FOUND => GatewayError::NotFound {
            collection: collection.to_string(),
            id: id.unwrap_or_default(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayError::Unauthorized(message),
        StatusCode::CONFLICT => GatewayError::Conflict {
            collection: collection.to_string(),
            id: id.unwrap_or_default(),
        },
        other => GatewayError::Status {
            code: other.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl<R: Record> RemoteSyncGateway<R> for HttpGateway {
    async fn list(&self, collection: &str) -> Result<Vec<R>, GatewayError> {
        let request = self.client.get(self.collection_url(collection));
        let response = self.send(request, collection, None).await?;
        Self::json(response).await
    }

    async fn search(
        &self,
        collection: &str,
        field: &str,
        term: &str,
    ) -> Result<Vec<R>, GatewayError> {
        let request = self
            .client
            .get(format!("{}/search", self.collection_url(collection)))
            .query(&[("field", field), ("query", term)]);
        let response = self.send(request, collection, None).await?;
        Self::json(response).await
    }

    async fn create(&self, collection: &str, record: &R) -> Result<R, GatewayError> {
        let request = self.client.post(self.collection_url(collection)).json(record);
        let response = self.send(request, collection, None).await?;
        Self::json(response).await
    }

    async fn update(&self, collection: &str, id: &R::Id, record: &R) -> Result<R, GatewayError> {
        let request = self.client.put(self.update_url(collection, id)).json(record);
        let response = self
            .send(request, collection, Some(id.to_string()))
            .await?;
        Self::json(response).await
    }

    async fn delete(&self, collection: &str, id: &R::Id) -> Result<(), GatewayError> {
        let request = self.client.delete(self.record_url(collection, id));
        self.send(request, collection, Some(id.to_string())).await?;
        Ok(())
    }
}
