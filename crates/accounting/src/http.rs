//! HTTP client for the accounting API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::{AccountingService, DocumentFilter, Person, ProductFilter};
use crate::config::AccountingConfig;
use crate::error::{AccountingError, Result};
use crate::invoice::{CollectionPayload, InvoicePayload};

/// Accounting API client authenticated with the configured API key.
#[derive(Clone)]
pub struct HttpAccountingClient {
    client: Client,
    base_url: String,
    api_key: String,
    pos_token: String,
}

impl HttpAccountingClient {
    pub fn new(config: &AccountingConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            pos_token: config.pos_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .header("Authorization", &self.api_key)
            .send()
            .await?;
        read(response).await
    }
}

async fn read<T: DeserializeOwned>(response: Response) -> Result<T> {
    match response.status() {
        status if status.is_success() => response
            .json::<T>()
            .await
            .map_err(|e| AccountingError::Decode(e.to_string())),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AccountingError::Unauthorized),
        status => {
            let message = response.text().await.unwrap_or_default();
            Err(AccountingError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl AccountingService for HttpAccountingClient {
    #[tracing::instrument(skip(self, invoice), fields(documento = %invoice.documento))]
    async fn create_invoice(&self, invoice: &InvoicePayload) -> Result<Value> {
        let request = self.client.post(self.url("documento/")).json(invoice);
        let created: Value = self.send(request).await?;
        tracing::debug!(response = %created, "invoice created");
        Ok(created)
    }

    #[tracing::instrument(skip(self, collection))]
    async fn register_collection(
        &self,
        document_id: &str,
        collection: &CollectionPayload,
    ) -> Result<Value> {
        let path = format!("documento/{document_id}/cobro/");
        let request = self.client.post(self.url(&path)).json(collection);
        self.send(request).await
    }

    #[tracing::instrument(skip(self))]
    async fn find_persons(&self, query: &str) -> Result<Vec<Person>> {
        let query = query.trim();
        let key = if query.chars().all(|c| c.is_ascii_digit()) {
            "identificacion"
        } else {
            "filtro"
        };
        let request = self
            .client
            .get(self.url("persona/"))
            .query(&[(key, query)]);
        self.send(request).await
    }

    #[tracing::instrument(skip(self, person), fields(ruc = %person.ruc))]
    async fn create_person(&self, person: &Person) -> Result<Person> {
        person.validate()?;
        let request = self
            .client
            .post(self.url("persona/"))
            .query(&[("pos", self.pos_token.as_str())])
            .json(person);
        self.send(request).await
    }

    #[tracing::instrument(skip(self))]
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Value>> {
        let request = self
            .client
            .get(self.url("producto/"))
            .query(&filter.params());
        self.send(request).await
    }

    #[tracing::instrument(skip(self))]
    async fn list_documents(&self, filter: &DocumentFilter) -> Result<Vec<Value>> {
        let request = self
            .client
            .get(self.url("documento/"))
            .query(&filter.params());
        self.send(request).await
    }
}
