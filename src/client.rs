//! Client façade
//!
//! Ties the catalog, URL builder, transport, list walker, fetch pipeline
//! and materializer together behind one cheaply clonable handle.

use crate::config::ClientConfig;
use crate::document::{Document, MediaType};
use crate::error::{Error, Result};
use crate::fetch::{
    FetchPipeline, FetchStream, Fetched, ListEntry, ListWalker, PageFormat, ReferenceCache,
};
use crate::materialize::{materialize, render_xml, Object, Reference};
use crate::model::Resource;
use crate::query::{Filter, UrlBuilder};
use crate::schema::{Catalog, ResourceDescriptor};
use crate::transport::{HttpTransport, Response, Transport};
use futures::stream::{self, Stream, TryStreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Handle on a Jazz server
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    catalog: Arc<Catalog>,
    config: Arc<ClientConfig>,
}

impl Client {
    /// Connect to the configured server over HTTP using the builtin catalog.
    pub fn new(config: ClientConfig, password: &str) -> Result<Self> {
        let transport = HttpTransport::new(&config, password)?;
        Ok(Self::with_transport(
            Arc::new(transport),
            Catalog::builtin(),
            config,
        ))
    }

    pub fn with_transport(
        transport: Arc<dyn Transport>,
        catalog: Arc<Catalog>,
        config: ClientConfig,
    ) -> Self {
        Self {
            transport,
            catalog,
            config: Arc::new(config),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// A handle on the same server that works in the given global
    /// configuration (sent as `Configuration-Context`), or in none.
    pub fn with_configuration_context(&self, configuration: Option<String>) -> Self {
        let config = ClientConfig {
            configuration_context: configuration,
            ..(*self.config).clone()
        };
        Self {
            transport: self.transport.clone(),
            catalog: self.catalog.clone(),
            config: Arc::new(config),
        }
    }

    pub(crate) fn configuration(&self) -> Option<&str> {
        self.config.configuration_context.as_deref()
    }

    pub fn urls(&self) -> UrlBuilder<'_> {
        UrlBuilder::new(&self.catalog, &self.config.report_path)
    }

    /// Fetch and materialize one item.
    pub async fn get(&self, ty: &str, id: &str) -> Result<Object> {
        let descriptor = self.catalog.lookup(ty)?;
        let url = self.urls().get_url(descriptor, id)?;

        let response = self
            .transport
            .get(&url, MediaType::Xml, self.configuration())
            .await?;
        if response.status != 200 {
            return Err(status_error(&response));
        }

        match &response.document {
            Document::Xml(root) => {
                let element = root
                    .child(&descriptor.list_tag)
                    .ok_or_else(|| Error::EmptyResponse(id.to_string()))?;
                materialize(&self.catalog, descriptor, element)
            }
            Document::Json(value) => {
                let node = match value.get(descriptor.list_tag.as_str()) {
                    Some(serde_json::Value::Array(items)) => items.first(),
                    other => other,
                }
                .filter(|node| !node.is_null())
                .ok_or_else(|| Error::EmptyResponse(id.to_string()))?;
                materialize(&self.catalog, descriptor, node)
            }
            Document::Text(_) => Err(Error::Parse(format!(
                "expected a document for \"{id}\", got plain text"
            ))),
            Document::Empty => Err(Error::EmptyResponse(id.to_string())),
        }
    }

    /// Ids of all items of a type matching the filter, streamed page by page.
    pub fn list_ids(
        &self,
        ty: &str,
        filter: &Filter,
    ) -> Result<impl Stream<Item = Result<String>> + Send + 'static> {
        let descriptor = self.catalog.lookup(ty)?;
        // the server pages by `size`; a shorter page is the last one
        let url = format!(
            "{}&size={}",
            self.urls().list_url(descriptor, filter)?,
            self.config.page_size
        );
        Ok(self.list_walker(descriptor).walk(url))
    }

    /// Load all items matching the filter through the worker pipeline.
    /// Objects arrive in completion order.
    pub fn list_stream(
        &self,
        ty: &str,
        filter: &Filter,
        cancel: CancellationToken,
    ) -> Result<FetchStream<Object>> {
        let descriptor = self.catalog.lookup(ty)?;
        let ids = self.list_ids(ty, filter)?;
        Ok(self.pipeline(cancel).spawn(ids, self.fetcher(descriptor)))
    }

    /// Load all items matching the filter. On failure the result holds the
    /// items loaded so far along with the first error.
    pub async fn list(&self, ty: &str, filter: &Filter) -> Fetched<Object> {
        match self.list_stream(ty, filter, CancellationToken::new()) {
            Ok(stream) => stream.collect().await,
            Err(error) => failed(error),
        }
    }

    /// Load items by id through the worker pipeline.
    pub async fn get_many<I, S>(&self, ty: &str, ids: I) -> Fetched<Object>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let descriptor = match self.catalog.lookup(ty) {
            Ok(descriptor) => descriptor,
            Err(error) => return failed(error),
        };
        let ids: Vec<Result<String>> = ids.into_iter().map(|id| Ok(id.into())).collect();
        self.pipeline(CancellationToken::new())
            .fetch_all(stream::iter(ids), self.fetcher(descriptor))
            .await
    }

    /// The single item matching the filter.
    pub async fn get_filter(&self, ty: &str, filter: &Filter) -> Result<Object> {
        let ids: Vec<String> = self.list_ids(ty, filter)?.try_collect().await?;
        match ids.as_slice() {
            [id] => self.get(ty, id).await,
            _ => Err(Error::NotUnique(ids.len())),
        }
    }

    /// Load a referenced object (once per reference).
    pub async fn resolve(&self, reference: &Reference) -> Result<Arc<Object>> {
        reference.resolve(self).await
    }

    /// Load every reference held by the object, in field order. References
    /// to the same item share one request.
    pub async fn resolve_all(&self, object: &Object) -> Result<Vec<Arc<Object>>> {
        let cache = ReferenceCache::new();
        let loads = object
            .references()
            .into_iter()
            .map(|reference| reference.resolve_with(self, &cache));
        futures::future::try_join_all(loads).await
    }

    /// Overwrite a resource with the XML rendering of `object`.
    pub async fn save(&self, url: &str, object: &Object) -> Result<()> {
        let body = render_xml(&self.catalog, object)?;
        tracing::debug!("Saving {} {} to {}", object.type_name(), object.item_id(), url);

        let status = self
            .transport
            .put(
                url,
                MediaType::Xml.as_str(),
                body.into_bytes(),
                self.configuration(),
            )
            .await?;
        if status >= 300 {
            return Err(Error::Status {
                status,
                message: format!("failed to save {} {}", object.type_name(), object.item_id()),
            });
        }
        Ok(())
    }

    /// Entries of a JSON feed, following its next links.
    pub fn walk_feed(&self, url: &str) -> impl Stream<Item = Result<ListEntry>> + Send + 'static {
        self.feed_walker()
            .with_configuration(self.config.configuration_context.clone())
            .walk_entries(url.to_string())
    }

    /// Walker over JSON feeds that sends no configuration context.
    pub(crate) fn feed_walker(&self) -> ListWalker {
        ListWalker::new(self.transport.clone(), PageFormat::Feed)
    }

    /// Fetch one item as a typed resource.
    pub async fn get_as<T: Resource>(&self, id: &str) -> Result<T> {
        self.get(T::TYPE_NAME, id).await?.decode()
    }

    /// Load all items matching the filter as typed resources.
    pub async fn list_as<T: Resource>(&self, filter: &Filter) -> Fetched<T> {
        let ids = match self.list_ids(T::TYPE_NAME, filter) {
            Ok(ids) => ids,
            Err(error) => return failed(error),
        };
        let client = self.clone();
        self.pipeline(CancellationToken::new())
            .fetch_all(ids, move |id| {
                let client = client.clone();
                async move { client.get_as::<T>(&id).await }
            })
            .await
    }

    fn list_walker(&self, descriptor: &ResourceDescriptor) -> ListWalker {
        ListWalker::new(
            self.transport.clone(),
            PageFormat::Xml {
                list_tag: descriptor.list_tag.clone(),
            },
        )
        .with_page_size(self.config.page_size)
        .with_configuration(self.config.configuration_context.clone())
    }

    pub(crate) fn pipeline(&self, cancel: CancellationToken) -> FetchPipeline {
        FetchPipeline::new(self.config.effective_workers()).with_cancellation(cancel)
    }

    fn fetcher(
        &self,
        descriptor: &ResourceDescriptor,
    ) -> impl Fn(String) -> futures::future::BoxFuture<'static, Result<Object>> + Send + Sync + 'static
    {
        let client = self.clone();
        let ty = descriptor.name.clone();
        move |id| {
            let client = client.clone();
            let ty = ty.clone();
            Box::pin(async move { client.get(&ty, &id).await })
        }
    }
}

pub(crate) fn status_error(response: &Response) -> Error {
    Error::Status {
        status: response.status,
        message: response
            .document
            .error_message()
            .unwrap_or_else(|| "unknown error".to_string()),
    }
}

pub(crate) fn failed<T>(error: Error) -> Fetched<T> {
    Fetched {
        items: Vec::new(),
        error: Some(error),
    }
}
