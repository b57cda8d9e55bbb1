//! Generic typed resource API.
//!
//! Every resource kind is a payload type plus a base URI; [`ResourceApi`]
//! provides the same create/read/update/delete surface for all of them.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::type_name;
use std::marker::PhantomData;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Error, Result};
use crate::sdk::api_client::{encode_component, with_query, ApiClient};
use crate::sdk::types::{Deletion, Mutation};

/// A portal resource payload.
pub trait Resource: Serialize + DeserializeOwned + Send + Sync {
    /// Server-assigned id; only populated in responses.
    fn id(&self) -> Option<String>;

    /// Resource name, as matched by the server's `name` filter.
    fn name(&self) -> &str;
}

/// Schemaless resource: any JSON object with optional `id` and `name` fields.
impl Resource for Value {
    fn id(&self) -> Option<String> {
        match self.get("id")? {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn name(&self) -> &str {
        self.get("name").and_then(Value::as_str).unwrap_or_default()
    }
}

fn marshal<T: Resource>(resource: &T) -> Result<String> {
    serde_json::to_string(resource).map_err(|source| Error::MarshalFailed {
        resource: type_name::<T>(),
        source,
    })
}

fn unmarshal<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|source| Error::UnmarshalFailed {
        resource: type_name::<T>(),
        source,
    })
}

/// Typed CRUD facade over one resource collection.
#[derive(Debug, Clone)]
pub struct ResourceApi<T> {
    client: ApiClient,
    base_uri: String,
    provision: bool,
    /// Set by `with_cancellation`; otherwise each call takes a child of the
    /// client's current root token.
    cancel: Option<CancellationToken>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Resource> ResourceApi<T> {
    /// Build a facade; `provision` is ANDed with the client's global switch.
    pub fn new(client: ApiClient, base_uri: String, provision: bool) -> Self {
        Self {
            client,
            base_uri: base_uri.trim_end_matches('/').to_string(),
            provision,
            cancel: None,
            _marker: PhantomData,
        }
    }

    /// Scope provisioning waits to `token` instead of the client's root token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn cancel_token(&self) -> CancellationToken {
        match &self.cancel {
            Some(token) => token.clone(),
            None => self.client.cancellation_token().child_token(),
        }
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    fn item_uri(&self, id: &str) -> String {
        format!("{}/{}", self.base_uri, encode_component(id))
    }

    /// Create a resource and decode the echoed representation.
    ///
    /// The outer error means the write was not accepted. Once it was, the
    /// decode result lives in `body` and the provisioning report alongside
    /// it, so an undecodable response never hides a provisioning outcome.
    pub async fn create(&self, resource: &T) -> Result<Mutation<Result<T>>> {
        let body = marshal(resource)?;
        let created = self
            .client
            .create(&self.base_uri, body, self.provision, &self.cancel_token())
            .await?;
        Ok(created.map_body(|body| unmarshal(&body)))
    }

    pub async fn delete(&self, id: &str) -> Result<Deletion> {
        self.client
            .delete(&self.item_uri(id), self.provision, &self.cancel_token())
            .await
    }

    /// Replace the resource at `id`; the response body is returned undecoded
    /// since some kinds answer updates with an empty body.
    pub async fn update(&self, id: &str, resource: &T) -> Result<Mutation<String>> {
        let body = marshal(resource)?;
        self.client
            .update(&self.item_uri(id), body, self.provision, &self.cancel_token())
            .await
    }

    /// Raw list body; the list envelope differs between kinds.
    pub async fn get_all(&self) -> Result<String> {
        Ok(self.client.get(&self.base_uri).await?.body)
    }

    /// Fetch one resource, including ones already marked for deletion.
    pub async fn get_by_id(&self, id: &str) -> Result<T> {
        let uri = with_query(&self.item_uri(id), "includeMarkedForDeletion", "true");
        let fetched = self.client.get(&uri).await?;
        unmarshal(&fetched.body)
    }

    /// Resolve a name to exactly one resource.
    ///
    /// The server applies the name filter and its list is taken as is; any
    /// count other than one is an error.
    pub async fn get_by_name(&self, name: &str) -> Result<T> {
        if name.is_empty() {
            return Err(Error::InvalidArgument(
                "resource name must not be empty".to_string(),
            ));
        }

        let uri = with_query(&with_query(&self.base_uri, "name", name), "paginated", "false");
        let fetched = self.client.get(&uri).await?;
        let mut matches: Vec<T> = unmarshal(&fetched.body)?;
        debug!("{} resources named '{}' under {}", matches.len(), name, self.base_uri);

        match matches.len() {
            1 => Ok(matches.remove(0)),
            count => Err(Error::AmbiguousOrMissingResource {
                name: name.to_string(),
                count,
            }),
        }
    }
}
