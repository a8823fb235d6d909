//! HTTP binding of the gateway traits against the repository REST API.

use async_trait::async_trait;
use reqwest::header::{ETAG, IF_MATCH, LOCATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::debug;

use weblounge_common::user::format_date;
use weblounge_common::xml;
use weblounge_common::{codec, PageDocument, ResourceVersion, User};
use weblounge_editor::{
    FileDocument, FileGateway, FileKey, GatewayError, PageGateway, PageKey, PageQuery,
    PublishWindow,
};

use crate::config::ClientConfig;
use crate::endpoints::{query_params, Endpoints};

/// Repository gateway speaking HTTP
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    endpoints: Endpoints,
}

impl HttpGateway {
    pub fn new(config: &ClientConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(transport)?;
        Ok(Self {
            client,
            endpoints: config.endpoints(),
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "repository response");

        if status.is_success() {
            Ok(response)
        } else {
            Err(classify(status))
        }
    }

    async fn fetch_document(&self, request: RequestBuilder) -> Result<PageDocument, GatewayError> {
        let response = self.send(request).await?;
        let etag = etag_of(&response);
        let body = response.text().await.map_err(transport)?;

        let mut page = codec::decode_page(&body)?.ok_or(GatewayError::NotFound)?;
        page.etag = etag;
        Ok(page)
    }

    async fn fetch_listing(&self, request: RequestBuilder) -> Result<Vec<PageDocument>, GatewayError> {
        let response = self.send(request).await?;
        let body = response.text().await.map_err(transport)?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(codec::decode_pages(&body)?)
    }
}

/// Map a non-success status onto the gateway error kinds
pub fn classify(status: StatusCode) -> GatewayError {
    match status {
        StatusCode::NOT_FOUND => GatewayError::NotFound,
        StatusCode::PRECONDITION_FAILED => GatewayError::PreconditionFailed,
        StatusCode::FORBIDDEN | StatusCode::LOCKED => GatewayError::Locked { owner: None },
        StatusCode::UNAUTHORIZED => GatewayError::Unauthorized,
        other => GatewayError::Status(other.as_u16()),
    }
}

fn transport(err: reqwest::Error) -> GatewayError {
    GatewayError::Transport(err.to_string())
}

fn etag_of(response: &Response) -> Option<String> {
    response
        .headers()
        .get(ETAG)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Resource id from the last segment of a `Location` header
fn created_id(response: &Response) -> Result<String, GatewayError> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|location| location.trim_end_matches('/').rsplit('/').next())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| GatewayError::Transport("created resource without location".into()))
}

fn with_if_match(request: RequestBuilder, if_match: Option<&str>) -> RequestBuilder {
    match if_match {
        Some(etag) => request.header(IF_MATCH, etag),
        None => request,
    }
}

#[async_trait]
impl PageGateway for HttpGateway {
    async fn fetch_page(
        &self,
        key: &PageKey,
        version: ResourceVersion,
    ) -> Result<PageDocument, GatewayError> {
        let version = version.index().to_string();
        let request = match key {
            PageKey::Id(id) => self
                .client
                .get(self.endpoints.page(id))
                .query(&[("version", version)]),
            PageKey::Path(path) => self.client.get(self.endpoints.pages()).query(&[
                ("details", "true".to_string()),
                ("path", path.clone()),
                ("version", version),
            ]),
        };
        self.fetch_document(request).await
    }

    async fn search_pages(&self, query: &PageQuery) -> Result<Vec<PageDocument>, GatewayError> {
        let request = if query.pending {
            self.client
                .get(self.endpoints.pending_pages())
                .query(&[("limit", "0")])
        } else {
            self.client
                .get(format!("{}/", self.endpoints.pages()))
                .query(&query_params(query))
        };
        self.fetch_listing(request).await
    }

    async fn referrers(&self, id: &str) -> Result<Vec<PageDocument>, GatewayError> {
        let request = self.client.get(self.endpoints.page_referrers(id));
        self.fetch_listing(request).await
    }

    async fn create_page(
        &self,
        path: &str,
        content: Option<&PageDocument>,
    ) -> Result<PageDocument, GatewayError> {
        let mut form = vec![("path", path.to_string())];
        if let Some(page) = content {
            form.push(("content", codec::encode_page(page)?));
        }
        let response = self
            .send(
                self.client
                    .post(format!("{}/", self.endpoints.pages()))
                    .form(&form),
            )
            .await?;
        let id = created_id(&response)?;
        debug!(%id, %path, "page created");

        self.fetch_page(&PageKey::Id(id), ResourceVersion::Work).await
    }

    async fn update_page(
        &self,
        id: &str,
        page: &PageDocument,
        if_match: Option<&str>,
    ) -> Result<Option<String>, GatewayError> {
        let content = codec::encode_page(page)?;
        let request = self
            .client
            .put(self.endpoints.page(id))
            .form(&[("content", content)]);
        let response = self.send(with_if_match(request, if_match)).await?;
        Ok(etag_of(&response))
    }

    async fn delete_page(&self, id: &str) -> Result<(), GatewayError> {
        self.send(self.client.delete(self.endpoints.page(id))).await?;
        Ok(())
    }

    async fn lock_page(
        &self,
        id: &str,
        user: &User,
        if_match: Option<&str>,
    ) -> Result<(), GatewayError> {
        let request = self
            .client
            .put(self.endpoints.page_lock(id))
            .form(&[("user", user.id.as_str())]);
        self.send(with_if_match(request, if_match)).await?;
        Ok(())
    }

    async fn unlock_page(&self, id: &str) -> Result<(), GatewayError> {
        self.send(self.client.delete(self.endpoints.page_lock(id)))
            .await?;
        Ok(())
    }

    async fn publish_page(
        &self,
        id: &str,
        window: &PublishWindow,
        if_match: Option<&str>,
    ) -> Result<(), GatewayError> {
        let mut form = Vec::new();
        if let Some(start) = &window.start {
            form.push(("startdate", format_date(start)));
        }
        if let Some(end) = &window.end {
            form.push(("enddate", format_date(end)));
        }
        let request = self
            .client
            .put(self.endpoints.page_publish(id))
            .form(&form);
        self.send(with_if_match(request, if_match)).await?;
        Ok(())
    }

    async fn unpublish_page(&self, id: &str) -> Result<(), GatewayError> {
        self.send(self.client.delete(self.endpoints.page_publish(id)))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl FileGateway for HttpGateway {
    async fn fetch_file(&self, key: &FileKey) -> Result<FileDocument, GatewayError> {
        let (request, fallback_id) = match key {
            FileKey::Id(id) => (self.client.get(self.endpoints.file(id)), Some(id.clone())),
            FileKey::Path(path) => (
                self.client
                    .get(self.endpoints.files())
                    .query(&[("path", path.as_str())]),
                None,
            ),
            FileKey::Content { id, language } => (
                self.client.get(self.endpoints.file_content(id, language)),
                Some(id.clone()),
            ),
        };

        let response = self.send(request).await?;
        let etag = etag_of(&response);
        let body = response.text().await.map_err(transport)?;

        // Content bodies are not XML; the id and path come from the key then
        let root = match key {
            FileKey::Content { .. } => None,
            _ => Some(xml::parse(&body)?),
        };
        let element = root.as_ref().map(|r| r.find("file").unwrap_or(r));
        let id = element
            .and_then(|e| e.attr("id"))
            .map(str::to_string)
            .or(fallback_id)
            .ok_or_else(|| GatewayError::Transport("file without id".into()))?;
        let path = element
            .and_then(|e| e.attr("path"))
            .map(str::to_string)
            .or_else(|| match key {
                FileKey::Path(path) => Some(path.clone()),
                _ => None,
            });

        Ok(FileDocument {
            id,
            path,
            etag,
            body,
        })
    }

    async fn update_file(
        &self,
        id: &str,
        language: Option<&str>,
        file: &FileDocument,
        if_match: Option<&str>,
    ) -> Result<Option<String>, GatewayError> {
        let request = match language {
            Some(language) => self
                .client
                .put(self.endpoints.file_content(id, language))
                .body(file.body.clone()),
            None => self
                .client
                .put(self.endpoints.file(id))
                .form(&[("content", file.body.as_str())]),
        };
        let response = self.send(with_if_match(request, if_match)).await?;
        Ok(etag_of(&response))
    }

    async fn create_file(&self, path: Option<&str>, body: &str) -> Result<FileDocument, GatewayError> {
        let mut form = vec![("content", body.to_string())];
        if let Some(path) = path {
            form.push(("path", path.to_string()));
        }
        let response = self
            .send(
                self.client
                    .post(format!("{}/", self.endpoints.files()))
                    .form(&form),
            )
            .await?;
        let id = created_id(&response)?;
        debug!(%id, "file created");

        self.fetch_file(&FileKey::Id(id)).await
    }

    async fn delete_file(&self, id: &str) -> Result<(), GatewayError> {
        self.send(self.client.delete(self.endpoints.file(id))).await?;
        Ok(())
    }
}
