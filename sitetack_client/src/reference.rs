// src/reference.rs

use crate::client::PredictionService;
use crate::models::ReferenceOption;
use log::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Ptms,
    Organisms,
    Labels,
}

impl ReferenceKind {
    pub fn endpoint(&self) -> &'static str {
        match self {
            ReferenceKind::Ptms => "/ptms",
            ReferenceKind::Organisms => "/organisms",
            ReferenceKind::Labels => "/labels",
        }
    }
}

/// The options behind one dropdown, fetched once and then only looked up.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceCatalog {
    pub kind: ReferenceKind,
    options: Vec<(String, ReferenceOption)>,
    selected: Option<String>,
}

impl ReferenceCatalog {
    pub fn new(kind: ReferenceKind, options: Vec<(String, ReferenceOption)>) -> Self {
        let selected = options.first().map(|(key, _)| key.clone());
        Self { kind, options, selected }
    }

    /// Fetches the catalog. A failed fetch is logged and leaves the catalog empty.
    pub fn load(service: &dyn PredictionService, kind: ReferenceKind) -> Self {
        match service.reference(kind) {
            Ok(options) => {
                debug!("Loaded {} options from {}", options.len(), kind.endpoint());
                Self::new(kind, options)
            }
            Err(e) => {
                error!("Error fetching data from {}: {}", kind.endpoint(), e);
                Self::new(kind, Vec::new())
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn options(&self) -> &[(String, ReferenceOption)] {
        &self.options
    }

    pub fn get(&self, key: &str) -> Option<&ReferenceOption> {
        self.options.iter().find(|(k, _)| k == key).map(|(_, option)| option)
    }

    /// Changes the selection. Unknown keys leave the selection unchanged.
    pub fn select(&mut self, key: &str) -> Option<&str> {
        if self.get(key).is_some() {
            self.selected = Some(key.to_string());
        } else {
            error!("Unknown option '{}' for {}", key, self.kind.endpoint());
        }
        self.description()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Description of the current selection.
    pub fn description(&self) -> Option<&str> {
        self.selected
            .as_deref()
            .and_then(|key| self.get(key))
            .map(|option| option.description.as_str())
    }
}
