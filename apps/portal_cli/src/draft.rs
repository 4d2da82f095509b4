//! Draft answer files: a JSON object of form answers, attachment paths and optional host facts.
//!
//! ```json
//! {
//!   "answers": { "userType": "student", "fullName": "Asha Kumari", "termsAccept": true },
//!   "attachments": ["evidence/notice.pdf"],
//!   "environment": { "userAgent": "Mozilla/5.0 ...", "timezone": "Asia/Kolkata" }
//! }
//! ```

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, bail, Context, Result};
use client_core::{
    files::Attachment, FileRejection, HostEnvironment, Settings, WizardController,
};
use serde::Deserialize;
use shared::domain::{FieldId, FieldKind, FieldValue, FileDescriptor, Step};
use tracing::{debug, warn};

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Draft {
    pub answers: BTreeMap<String, FieldValue>,
    pub attachments: Vec<PathBuf>,
    pub environment: Option<HostEnvironment>,
}

/// Reads a draft. Relative attachment paths are taken relative to the draft file.
pub async fn load_draft(path: &Path) -> Result<Draft> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read draft {}", path.display()))?;
    let mut draft: Draft = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse draft {}", path.display()))?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    for attachment in &mut draft.attachments {
        if attachment.is_relative() {
            *attachment = base.join(&*attachment);
        }
    }
    Ok(draft)
}

/// Feeds every answer to the wizard in form order, so a category is chosen before its
/// sub-category.
pub fn apply_answers(wizard: &mut WizardController, draft: &Draft) -> Result<()> {
    if let Some(unknown) = draft
        .answers
        .keys()
        .find(|key| FieldId::from_wire_name(key).is_none())
    {
        bail!("unknown field '{unknown}' in draft");
    }

    for field in FieldId::ALL.iter().copied() {
        let Some(value) = draft.answers.get(field.wire_name()) else {
            continue;
        };
        let applied = match (field.kind(), value) {
            (FieldKind::Flag, FieldValue::Flag(on)) => wizard.set_flag(field, *on),
            (FieldKind::Choice, FieldValue::Text(choice)) => wizard.select(field, choice),
            (FieldKind::Text, FieldValue::Text(text)) => wizard.set_text(field, text.as_str()),
            (kind, _) => bail!("draft field '{field}' must be a {kind:?} value"),
        };
        applied.with_context(|| format!("draft field '{field}'"))?;
    }
    Ok(())
}

pub async fn read_attachment(path: &Path) -> Result<Attachment> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("failed to stat attachment {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("attachment path {} has no file name", path.display()))?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    debug!(%name, mime = %mime, size = metadata.len(), "attachment candidate");
    Ok(Attachment::from_path(
        FileDescriptor::new(name, metadata.len(), mime.essence_str()),
        path,
    ))
}

/// Builds a wizard from a draft and walks it to the review step.
///
/// Rejected attachments are returned rather than failing the draft.
pub async fn prepare_wizard(
    settings: Arc<Settings>,
    draft: &Draft,
) -> Result<(WizardController, Vec<FileRejection>)> {
    let mut wizard = WizardController::new(settings);
    apply_answers(&mut wizard, draft)?;

    let mut candidates = Vec::with_capacity(draft.attachments.len());
    for path in &draft.attachments {
        candidates.push(read_attachment(path).await?);
    }
    let rejected = wizard.handle_files(candidates);
    for rejection in &rejected {
        warn!(%rejection, "attachment skipped");
    }

    while wizard.current_step() != Step::Review {
        let step = wizard.current_step();
        wizard
            .advance()
            .with_context(|| format!("draft does not pass {step}"))?;
    }
    Ok((wizard, rejected))
}

#[cfg(test)]
#[path = "tests/draft_tests.rs"]
mod tests;
