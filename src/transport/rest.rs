//! HTTP transport over `reqwest`.
//!
//! Resource paths follow `/<namespace>/<plural>/<id>`. Link URLs handed to
//! [`Transport::get`] may be absolute or relative to the configured host.

use super::{QueryParams, StatusCategory, Transport, TransportResponse};
use crate::entity::identity_key;
use crate::error::{MapperError, Result};
use crate::schema::EntitySchema;
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Connection settings for a [`RestTransport`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RestOptions {
    pub hostname: String,
    pub namespace: Option<String>,
    pub secure: bool,
    pub port: Option<u16>,
    pub timeout_secs: Option<u64>,
}

impl RestOptions {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            ..Self::default()
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Reads options from a registry options value. `null` means defaults.
    pub fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value.clone()).map_err(|e| MapperError::InvalidOptions {
            kind: "RestTransport".to_string(),
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct RestTransport {
    http: reqwest::Client,
    options: RestOptions,
}

impl RestTransport {
    pub fn new(options: RestOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = options.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            http: builder.build()?,
            options,
        })
    }

    pub fn options(&self) -> &RestOptions {
        &self.options
    }

    /// `/<namespace>/<plural>`.
    pub fn collection_path(&self, schema: &EntitySchema) -> String {
        match self.options.namespace.as_deref().map(|ns| ns.trim_matches('/')) {
            Some(ns) if !ns.is_empty() => format!("/{ns}/{}", schema.plural_key()),
            _ => format!("/{}", schema.plural_key()),
        }
    }

    /// `/<namespace>/<plural>/<id>`.
    pub fn single_path(&self, schema: &EntitySchema, id: &Value) -> String {
        let id = identity_key(id).unwrap_or_default();
        format!("{}/{id}", self.collection_path(schema))
    }

    fn base_url(&self) -> Result<Url> {
        let scheme = if self.options.secure { "https" } else { "http" };
        let host = self.options.hostname.trim_end_matches('/');
        let base = match self.options.port {
            Some(port) => format!("{scheme}://{host}:{port}/"),
            None => format!("{scheme}://{host}/"),
        };
        Ok(Url::parse(&base)?)
    }

    /// Resolves `url` against the host and appends `params` to its query.
    pub fn resolve_url(&self, url: &str, params: &QueryParams) -> Result<Url> {
        let mut resolved = match Url::parse(url) {
            Ok(absolute) => absolute,
            Err(url::ParseError::RelativeUrlWithoutBase) => self.base_url()?.join(url)?,
            Err(e) => return Err(e.into()),
        };
        if !params.is_empty() {
            let mut pairs = resolved.query_pairs_mut();
            for (key, value) in params {
                pairs.append_pair(key, value);
            }
        }
        Ok(resolved)
    }

    async fn request(
        &self,
        method: Method,
        url: &str,
        params: &QueryParams,
        body: Option<&Value>,
    ) -> Result<TransportResponse> {
        let url = self.resolve_url(url, params)?;
        debug!(%method, %url, "Sending request");

        let mut request = self.http.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        let response = TransportResponse::status(status, body);
        if response.status != StatusCategory::Success {
            warn!(%method, %url, status, "Request did not succeed");
        }
        Ok(response)
    }
}

#[async_trait]
impl Transport for RestTransport {
    async fn find(&self, schema: &EntitySchema, id: &Value) -> Result<TransportResponse> {
        let path = self.single_path(schema, id);
        self.request(Method::GET, &path, &QueryParams::new(), None)
            .await
    }

    async fn find_many(
        &self,
        schema: &EntitySchema,
        params: &QueryParams,
    ) -> Result<TransportResponse> {
        let path = self.collection_path(schema);
        self.request(Method::GET, &path, params, None).await
    }

    async fn create(&self, schema: &EntitySchema, body: &Value) -> Result<TransportResponse> {
        let path = self.collection_path(schema);
        self.request(Method::POST, &path, &QueryParams::new(), Some(body))
            .await
    }

    async fn update(
        &self,
        schema: &EntitySchema,
        id: &Value,
        body: &Value,
    ) -> Result<TransportResponse> {
        let path = self.single_path(schema, id);
        self.request(Method::PUT, &path, &QueryParams::new(), Some(body))
            .await
    }

    async fn delete(&self, schema: &EntitySchema, id: &Value) -> Result<TransportResponse> {
        let path = self.single_path(schema, id);
        self.request(Method::DELETE, &path, &QueryParams::new(), None)
            .await
    }

    async fn get(&self, url: &str) -> Result<TransportResponse> {
        self.request(Method::GET, url, &QueryParams::new(), None)
            .await
    }
}
