//! Global configuration management (GC application)
//!
//! Global configurations are listed as RDF. Selecting one by title gives
//! the URL that other requests carry as `Configuration-Context`.

use crate::client::{status_error, Client};
use crate::document::{Document, MediaType, XmlElement};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

const CONFIGURATIONS_PATH: &str = "gc/configuration";
const QUERY_PATH: &str = "gc/oslc-query/configurations";

/// A global configuration of the server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfiguration {
    pub title: String,
    pub url: String,
}

impl GlobalConfiguration {
    /// Every `rdf:Description` carrying a `dcterms:title`.
    pub fn from_rdf(root: &XmlElement) -> Vec<Self> {
        root.descendants("Description")
            .into_iter()
            .filter_map(|description| {
                let title = description.child("title")?;
                Some(GlobalConfiguration {
                    title: title.text().to_string(),
                    url: description.attr("about").unwrap_or_default().to_string(),
                })
            })
            .collect()
    }
}

impl Client {
    /// All global configurations visible to the user.
    pub async fn global_configs(&self) -> Result<Vec<GlobalConfiguration>> {
        let root = self.get_rdf(CONFIGURATIONS_PATH).await?;
        Ok(root
            .as_ref()
            .map(GlobalConfiguration::from_rdf)
            .unwrap_or_default())
    }

    /// The global configuration with the given title.
    pub async fn global_config(&self, title: &str) -> Result<GlobalConfiguration> {
        if title.contains('"') {
            return Err(Error::Filter(format!(
                "configuration title {title:?} contains a double quote"
            )));
        }
        let query = format!("dcterms:title=\"{title}\"");
        let url = format!("{QUERY_PATH}?oslc.where={}", urlencoding::encode(&query));

        self.get_rdf(&url)
            .await?
            .as_ref()
            .and_then(|root| GlobalConfiguration::from_rdf(root).into_iter().next())
            .ok_or_else(|| Error::Missing(format!("global configuration \"{title}\"")))
    }

    /// A handle working in the global configuration with the given title.
    pub async fn in_global_config(&self, title: &str) -> Result<Client> {
        let configuration = self.global_config(title).await?;
        tracing::debug!("Using global configuration {} ({})", configuration.title, configuration.url);
        Ok(self.with_configuration_context(Some(configuration.url)))
    }

    async fn get_rdf(&self, url: &str) -> Result<Option<XmlElement>> {
        let response = self
            .transport()
            .get(url, MediaType::RdfXml, self.configuration())
            .await?;
        if response.status != 200 {
            return Err(status_error(&response));
        }
        match response.document {
            Document::Xml(root) => Ok(Some(root)),
            Document::Empty => Ok(None),
            _ => Err(Error::Parse("expected an RDF document".to_string())),
        }
    }
}
