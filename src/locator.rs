//! Maps work item identifiers to request URLs

use url::Url;

use crate::config::EndpointConfig;
use crate::error::{Error, Result};

/// Builds request URLs from a fixed base endpoint plus the identifier as a query parameter
#[derive(Clone, Debug)]
pub struct Locator {
    base: Url,
    identifier_param: String,
}

impl Locator {
    /// Create a locator for the configured endpoint
    ///
    /// The fixed parameters are baked into the base URL once, so every request
    /// carries them in the same order before the identifier.
    pub fn new(endpoint: &EndpointConfig) -> Result<Self> {
        let mut base = Url::parse(&endpoint.base_url).map_err(|e| {
            Error::config(
                format!("invalid base URL '{}': {}", endpoint.base_url, e),
                "base_url",
            )
        })?;
        if base.cannot_be_a_base() {
            return Err(Error::config(
                format!("base URL '{}' cannot carry query parameters", endpoint.base_url),
                "base_url",
            ));
        }
        if !endpoint.fixed_params.is_empty() {
            let mut pairs = base.query_pairs_mut();
            for (key, value) in &endpoint.fixed_params {
                pairs.append_pair(key, value);
            }
        }
        Ok(Self {
            base,
            identifier_param: endpoint.identifier_param.clone(),
        })
    }

    /// Build the request URL for one identifier
    ///
    /// ```
    /// use commons_dl::config::EndpointConfig;
    /// use commons_dl::locator::Locator;
    ///
    /// let locator = Locator::new(&EndpointConfig::default()).unwrap();
    /// let url = locator.locate("Cat sleeping.jpg").unwrap();
    /// assert_eq!(
    ///     url.as_str(),
    ///     "https://commons.wikimedia.org/w/index.php?title=Special%3AFilePath&file=Cat+sleeping.jpg"
    /// );
    /// ```
    pub fn locate(&self, identifier: &str) -> Result<Url> {
        if identifier.trim().is_empty() {
            return Err(Error::Locator {
                identifier: identifier.to_string(),
                reason: "identifier is empty".to_string(),
            });
        }
        if let Some(c) = identifier.chars().find(|c| c.is_control()) {
            return Err(Error::Locator {
                identifier: identifier.to_string(),
                reason: format!("identifier contains control character {:?}", c),
            });
        }

        let mut url = self.base.clone();
        url.query_pairs_mut()
            .append_pair(&self.identifier_param, identifier);
        Ok(url)
    }
}
