// src/session.rs

use crate::client::PredictionService;
use crate::error::SubmitError;
use crate::export::DownloadShelf;
use crate::form::SubmissionForm;
use crate::models::PredictionResponse;
use crate::reference::{ReferenceCatalog, ReferenceKind};
use crate::render::{display_results_with_highlighting, Marker};
use tracing::{debug, error, info, warn};

/// What the results region currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultsPanel {
    Empty,
    Results(String),
    Alert(String),
}

/// Identifies one submission. Later submissions get larger tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Applied,
    Failed(String),
    /// A newer submission was issued before this one resolved; nothing changed.
    Superseded,
}

/// Parses the slider text. Anything that is not a number becomes NaN.
pub fn parse_threshold(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(f64::NAN)
}

/// State of one interactive session: the current result and everything derived from it.
pub struct Session {
    model: Option<PredictionResponse>,
    threshold_label: String,
    threshold: f64,
    threshold_visible: bool,
    marker: Marker,
    panel: ResultsPanel,
    downloads: DownloadShelf,
    latest_token: u64,
    ptms: ReferenceCatalog,
    organisms: ReferenceCatalog,
    labels: ReferenceCatalog,
}

impl Session {
    pub fn new(threshold: f64, marker: Marker) -> Self {
        Self {
            model: None,
            threshold_label: threshold.to_string(),
            threshold,
            threshold_visible: false,
            marker,
            panel: ResultsPanel::Empty,
            downloads: DownloadShelf::default(),
            latest_token: 0,
            ptms: ReferenceCatalog::new(ReferenceKind::Ptms, Vec::new()),
            organisms: ReferenceCatalog::new(ReferenceKind::Organisms, Vec::new()),
            labels: ReferenceCatalog::new(ReferenceKind::Labels, Vec::new()),
        }
    }

    /// Fetches the three dropdown catalogs once. Failures leave the affected catalog empty.
    pub fn load_reference_data(&mut self, service: &dyn PredictionService) {
        self.ptms = ReferenceCatalog::load(service, ReferenceKind::Ptms);
        self.organisms = ReferenceCatalog::load(service, ReferenceKind::Organisms);
        self.labels = ReferenceCatalog::load(service, ReferenceKind::Labels);
    }

    pub fn catalog(&self, kind: ReferenceKind) -> &ReferenceCatalog {
        match kind {
            ReferenceKind::Ptms => &self.ptms,
            ReferenceKind::Organisms => &self.organisms,
            ReferenceKind::Labels => &self.labels,
        }
    }

    /// A form prefilled with the current dropdown selections.
    pub fn form(&self) -> SubmissionForm {
        SubmissionForm::new(
            self.ptms.selected().unwrap_or_default(),
            self.organisms.selected().unwrap_or_default(),
            self.labels.selected().unwrap_or_default(),
        )
    }

    pub fn begin_submission(&mut self) -> RequestToken {
        self.latest_token += 1;
        RequestToken(self.latest_token)
    }

    /// Applies a resolved submission unless a newer one has been issued since.
    pub fn complete_submission(
        &mut self,
        token: RequestToken,
        result: Result<PredictionResponse, SubmitError>,
    ) -> SubmissionOutcome {
        if token.0 < self.latest_token {
            debug!(
                "Discarding submission {} resolved after newer submission {}",
                token.0, self.latest_token
            );
            return SubmissionOutcome::Superseded;
        }

        match result {
            Ok(model) => {
                info!(
                    "Received {} sequences with {} scored sites",
                    model.sequence_predictions.len(),
                    model.site_count()
                );
                model.warn_on_inconsistencies();
                self.install(model);
                SubmissionOutcome::Applied
            }
            Err(e) => {
                error!("Error: {}", e);
                let message = e.alert_message();
                self.panel = ResultsPanel::Alert(message.clone());
                SubmissionOutcome::Failed(message)
            }
        }
    }

    /// Sends the form and applies the result.
    pub fn submit(
        &mut self,
        service: &dyn PredictionService,
        form: &SubmissionForm,
    ) -> SubmissionOutcome {
        let missing = form.missing_fields();
        if !missing.is_empty() {
            warn!("Submitting with empty fields: {}", missing.join(", "));
        }
        let token = self.begin_submission();
        let result = service.submit(&form.to_request());
        self.complete_submission(token, result)
    }

    /// Installs a result: shows the threshold control, renders it and regenerates both downloads.
    pub fn install(&mut self, model: PredictionResponse) {
        self.threshold_visible = true;
        self.panel = ResultsPanel::Results(display_results_with_highlighting(
            &model,
            self.threshold,
            self.marker,
        ));
        if let Err(e) = self.downloads.offer_all(&model) {
            error!("Failed to build downloads: {}", e);
        }
        self.model = Some(model);
    }

    /// Moves the threshold. Re-renders only when a result is present; downloads are untouched.
    pub fn set_threshold(&mut self, raw: &str) {
        self.threshold_label = raw.to_string();
        self.threshold = parse_threshold(raw);
        if let Some(model) = &self.model {
            self.panel = ResultsPanel::Results(display_results_with_highlighting(
                model,
                self.threshold,
                self.marker,
            ));
        }
    }

    pub fn model(&self) -> Option<&PredictionResponse> {
        self.model.as_ref()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn threshold_label(&self) -> &str {
        &self.threshold_label
    }

    pub fn threshold_visible(&self) -> bool {
        self.threshold_visible
    }

    pub fn panel(&self) -> &ResultsPanel {
        &self.panel
    }

    pub fn downloads(&self) -> &DownloadShelf {
        &self.downloads
    }
}
