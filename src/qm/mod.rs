//! Quality management (QM application)
//!
//! Projects are listed by the integration service's project feed and
//! addressed by their alias. Resources of a project are listed through a
//! feed of resource URLs, loaded as XML and decoded into [`QmResource`]
//! structs.

mod cache;
mod model;

pub use cache::QmCache;
pub use model::{
    QmCategory, QmField, QmResource, QmTestCase, QmTestEnvironment, QmTestExecutionResult,
    QmTestPlan, QmTestScript,
};

use crate::client::{status_error, Client};
use crate::document::{Document, MediaType};
use crate::error::{Error, Result};
use crate::fetch::Fetched;
use futures::stream::{self, TryStreamExt};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

/// Root of the QM integration service
pub const INTEGRATION_SERVICE: &str =
    "qm/service/com.ibm.rqm.integration.service.IIntegrationService";

/// Prefix of the ids given to resources created by this client
pub const NEW_ID_PREFIX: &str = "jc_";

/// A QM project area
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QmProject {
    pub title: String,
    pub alias: String,
}

impl QmProject {
    pub fn new(title: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            alias: alias.into(),
        }
    }

    /// Feed URL listing the resources of a type.
    pub fn list_url(&self, resource_id: &str, filter: &QmFilter) -> String {
        format!(
            "{INTEGRATION_SERVICE}/resources/{}/{resource_id}{}",
            self.alias,
            filter.query(resource_id)
        )
    }

    /// URL of a single resource. Absolute URLs and service paths are used
    /// as they are; numeric ids are web ids.
    pub fn get_url(&self, resource_id: &str, id: &str) -> String {
        if id.starts_with("http://") || id.starts_with("https://") || id.starts_with("qm/service/")
        {
            return id.to_string();
        }

        let id = if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
            format!("urn:com.ibm.rqm:{resource_id}:{id}")
        } else {
            id.to_string()
        };
        format!("{INTEGRATION_SERVICE}/resources/{}/{resource_id}/{id}", self.alias)
    }
}

/// Filter of QM listings: field paths matched against values, joined with
/// `and`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QmFilter {
    terms: BTreeMap<String, String>,
}

impl QmFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match `path` (e.g. `testplan/@href`) against `value`.
    pub fn with(mut self, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.terms.insert(path.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    fn query(&self, resource_id: &str) -> String {
        if self.terms.is_empty() {
            return String::new();
        }
        let terms: Vec<String> = self
            .terms
            .iter()
            .map(|(path, value)| format!("{path}='{}'", urlencoding::encode(value)))
            .collect();
        format!(
            "?fields=feed/entry/content/{resource_id}[{}]",
            terms.join(" and ")
        )
    }
}

impl Client {
    /// Projects of the QM application the user can access.
    pub async fn qm_projects(&self) -> Result<Vec<QmProject>> {
        // the project feed is not versioned and rejects a configuration context
        self.feed_walker()
            .walk_entries(format!("{INTEGRATION_SERVICE}/projects"))
            .map_ok(|entry| QmProject {
                title: entry.title,
                alias: entry.alias,
            })
            .try_collect()
            .await
    }

    /// The QM project with the given title.
    pub async fn qm_project(&self, title: &str) -> Result<QmProject> {
        self.qm_projects()
            .await?
            .into_iter()
            .find(|project| project.title == title)
            .ok_or_else(|| Error::Missing(format!("QM project \"{title}\"")))
    }

    /// A new id issued by the server.
    pub async fn qm_new_uuid(&self) -> Result<String> {
        let url = format!("{INTEGRATION_SERVICE}/UUID/new");
        let response = self.transport().get(&url, MediaType::Text, None).await?;
        if response.status != 200 {
            return Err(status_error(&response));
        }
        match response.document {
            Document::Text(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            _ => Err(Error::EmptyResponse(url)),
        }
    }

    /// Load one resource by id or URL.
    pub async fn qm_get<T: QmResource>(&self, project: &QmProject, id: &str) -> Result<T> {
        let url = project.get_url(T::RESOURCE_ID, id);
        let response = self
            .transport()
            .get(&url, MediaType::Xml, self.configuration())
            .await?;
        if response.status != 200 {
            return Err(status_error(&response));
        }
        match &response.document {
            Document::Xml(root) => T::from_xml(root),
            Document::Empty => Err(Error::EmptyResponse(id.to_string())),
            _ => Err(Error::Parse(format!(
                "expected an XML {} document",
                T::RESOURCE_ID
            ))),
        }
    }

    /// Load all resources of a type matching the filter through the
    /// worker pipeline.
    pub async fn qm_list<T: QmResource>(&self, project: &QmProject, filter: &QmFilter) -> Fetched<T> {
        let url = project.list_url(T::RESOURCE_ID, filter);
        let urls = self.walk_feed(&url).map_ok(|entry| entry.id);
        let client = self.clone();
        let project = project.clone();
        self.pipeline(CancellationToken::new())
            .fetch_all(urls, move |url| {
                let client = client.clone();
                let project = project.clone();
                async move { client.qm_get::<T>(&project, &url).await }
            })
            .await
    }

    /// Load resources by id or URL through the worker pipeline.
    pub async fn qm_get_many<T, I, S>(&self, project: &QmProject, ids: I) -> Fetched<T>
    where
        T: QmResource,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<Result<String>> = ids.into_iter().map(|id| Ok(id.into())).collect();
        let client = self.clone();
        let project = project.clone();
        self.pipeline(CancellationToken::new())
            .fetch_all(stream::iter(ids), move |id| {
                let client = client.clone();
                let project = project.clone();
                async move { client.qm_get::<T>(&project, &id).await }
            })
            .await
    }

    /// The single resource matching the filter.
    pub async fn qm_get_filter<T: QmResource>(
        &self,
        project: &QmProject,
        filter: &QmFilter,
    ) -> Result<T> {
        let url = project.list_url(T::RESOURCE_ID, filter);
        let urls: Vec<String> = self
            .walk_feed(&url)
            .map_ok(|entry| entry.id)
            .try_collect()
            .await?;
        match urls.as_slice() {
            [url] => self.qm_get(project, url).await,
            _ => Err(Error::NotUnique(urls.len())),
        }
    }

    /// Create or update a resource and return it as stored by the server.
    /// A resource without URL gets one from a server issued id first.
    pub async fn qm_save<T: QmResource>(&self, project: &QmProject, mut resource: T) -> Result<T> {
        if resource.href().is_empty() {
            let uuid = self.qm_new_uuid().await?;
            let id = format!("{NEW_ID_PREFIX}{uuid}");
            resource.set_href(project.get_url(T::RESOURCE_ID, &id));
        }
        let href = resource.href().to_string();
        let body = model::render(&resource)?;
        tracing::debug!("Saving {} to {}", T::RESOURCE_ID, href);

        let status = self
            .transport()
            .put(
                &href,
                MediaType::Xml.as_str(),
                body.into_bytes(),
                self.configuration(),
            )
            .await?;
        if status >= 300 {
            return Err(Error::Status {
                status,
                message: format!("failed to save {} {}", T::RESOURCE_ID, href),
            });
        }
        self.qm_get(project, &href).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> QmProject {
        QmProject::new("Demo Project", "Demo%20Project")
    }

    #[test]
    fn test_get_url() {
        let project = project();
        assert_eq!(
            project.get_url("testcase", "42"),
            format!("{INTEGRATION_SERVICE}/resources/Demo%20Project/testcase/urn:com.ibm.rqm:testcase:42")
        );
        assert_eq!(
            project.get_url("testcase", "jc_1234"),
            format!("{INTEGRATION_SERVICE}/resources/Demo%20Project/testcase/jc_1234")
        );
        let href = "https://jazz.example.com/qm/service/x/testcase/1";
        assert_eq!(project.get_url("testcase", href), href);
    }

    #[test]
    fn test_list_url_with_filter() {
        let filter = QmFilter::new().with("testplan/@href", "https://q/plan 1");
        assert_eq!(
            project().list_url("executionresult", &filter),
            format!(
                "{INTEGRATION_SERVICE}/resources/Demo%20Project/executionresult\
                 ?fields=feed/entry/content/executionresult[testplan/@href='https%3A%2F%2Fq%2Fplan%201']"
            )
        );
        assert!(!project().list_url("testcase", &QmFilter::new()).contains('?'));
    }
}
