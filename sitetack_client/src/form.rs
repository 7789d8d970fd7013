// src/form.rs

use crate::models::SubmitRequest;
use std::fs;
use std::io;
use std::path::Path;

/// Sample record offered by "load example". Inserted verbatim, never parsed.
pub const EXAMPLE_RECORD: &str = ">RNase_1
KESRAKKFQRQHMDSDSSPSSSSTYCNQMMRRRNMTQGRCKPVNTFVHEPLVDVQNVCFQ
QEKVTCKNGQGNCYKSNSSMHITDCRLTNGSRYPNCAYRTSPKERHIIVACEGSPYVPVH
FDASVEDST";

/// The four input fields, as raw strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionForm {
    pub ptm: String,
    pub label: String,
    pub organism: String,
    pub text: String,
}

impl SubmissionForm {
    pub fn new(ptm: &str, organism: &str, label: &str) -> Self {
        Self {
            ptm: ptm.to_string(),
            label: label.to_string(),
            organism: organism.to_string(),
            text: String::new(),
        }
    }

    /// Replaces the sequence text with the sample record.
    pub fn load_example(&mut self) {
        self.text = EXAMPLE_RECORD.to_string();
    }

    /// Replaces the sequence text with a file's contents, unmodified.
    pub fn load_text_file(&mut self, path: &Path) -> io::Result<()> {
        self.text = fs::read_to_string(path)?;
        Ok(())
    }

    /// Names of the fields left empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("ptm", &self.ptm),
            ("label", &self.label),
            ("organism", &self.organism),
            ("text", &self.text),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect()
    }

    pub fn to_request(&self) -> SubmitRequest {
        SubmitRequest {
            ptm: self.ptm.clone(),
            label: self.label.clone(),
            organism: self.organism.clone(),
            text: self.text.clone(),
        }
    }
}
