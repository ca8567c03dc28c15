//! Import of alias exports from other forwarding tools
//!
//! An export is an HTML page listing aliases and their destinations in two
//! parallel runs of marked elements: every element with class
//! [`ALIAS_CLASS`] holds an alias local part, every element with class
//! [`DESTINATION_CLASS`] holds a destination label. The i-th alias forwards
//! to the i-th label.
//!
//! Labels are resolved against the [`EndpointCatalog`]; the resulting batch
//! is handed to [`AliasEngine::add_aliases`](crate::AliasEngine::add_aliases).

use crate::catalog::{EndpointCatalog, EndpointId};
use crate::engine::AliasDraft;
use crate::error::{Error, Result};
use scraper::{Html, Selector};

/// Class marking alias local parts
pub const ALIAS_CLASS: &str = "alias-email";

/// Class marking destination labels
pub const DESTINATION_CLASS: &str = "summary-domain-name";

/// One alias/label pair read from an export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPair {
    /// Alias local part
    pub alias: String,
    /// Destination label as written in the export
    pub label: String,
    /// Catalog endpoint the label resolved to
    pub endpoint: Option<EndpointId>,
}

/// Read alias/label pairs from an export document
///
/// Fails when the two runs have different lengths, since positional pairing
/// would then attach aliases to the wrong destinations.
pub fn parse_export(document: &str, catalog: &EndpointCatalog) -> Result<Vec<ImportPair>> {
    let document = Html::parse_document(document);
    let aliases = texts_with_class(&document, ALIAS_CLASS)?;
    let labels = texts_with_class(&document, DESTINATION_CLASS)?;

    if aliases.len() != labels.len() {
        return Err(Error::invalid_input(format!(
            "Export lists {} aliases but {} destinations",
            aliases.len(),
            labels.len()
        )));
    }

    tracing::debug!("Export contains {} alias(es)", aliases.len());

    Ok(aliases
        .into_iter()
        .zip(labels)
        .map(|(alias, label)| {
            let endpoint = catalog.resolve_label(&label);
            ImportPair {
                alias,
                label,
                endpoint,
            }
        })
        .collect())
}

/// Trimmed text of every element carrying `class`, in document order
fn texts_with_class(document: &Html, class: &str) -> Result<Vec<String>> {
    let selector = Selector::parse(&format!(".{class}"))
        .map_err(|e| Error::invalid_input(format!("Bad selector for class {class}: {e:?}")))?;

    Ok(document
        .select(&selector)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .collect())
}

/// Turn resolved pairs into an add-batch
///
/// Every unresolved label is reported in one error; nothing is returned
/// unless all pairs resolved.
pub fn build_batch(pairs: &[ImportPair]) -> Result<Vec<AliasDraft>> {
    let unresolved: Vec<String> = pairs
        .iter()
        .filter(|pair| pair.endpoint.is_none())
        .map(|pair| format!("{} -> {:?}", pair.alias, pair.label))
        .collect();

    if !unresolved.is_empty() {
        return Err(Error::unknown_endpoint(format!(
            "No endpoint matches: {}",
            unresolved.join(", ")
        )));
    }

    Ok(pairs
        .iter()
        .filter_map(|pair| {
            pair.endpoint
                .map(|endpoint| AliasDraft::new(pair.alias.clone(), endpoint))
        })
        .collect())
}
