//! Edit session.
//! Closed -> Open(one position) -> Closed. While open, the form holds the
//! staged name, number and photo; nothing reaches the store until the app
//! commits the form (see `App::commit_edit`).

use std::path::Path;

use crate::error::ValidationError;
use crate::model::{Chart, Member};
use crate::photo::{self, StagedPhoto};
use crate::positions;
use crate::render::PhotoView;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum EditSession {
    #[default]
    Closed,
    Open(EditForm),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditForm {
    pub position_id: String,
    pub name: String,
    pub member_number: String,
    /// Photo picked locally, not yet uploaded.
    pub staged_photo: Option<StagedPhoto>,
    pub preview: PhotoView,
}

impl EditSession {
    /// Opens the form preloaded from the chart entry, with no staged photo.
    pub fn open(&mut self, position_id: &str, chart: &Chart) -> Result<&mut EditForm, ValidationError> {
        if positions::lookup(position_id).is_none() {
            return Err(ValidationError::UnknownPosition(position_id.to_string()));
        }
        let entry = chart.get(position_id).cloned().unwrap_or_default();
        tracing::debug!(position_id, "edit opened");

        *self = EditSession::Open(EditForm {
            position_id: position_id.to_string(),
            name: entry.name,
            member_number: entry.member_number,
            staged_photo: None,
            preview: entry.photo.map(PhotoView::Image).unwrap_or(PhotoView::Placeholder),
        });
        self.form_mut()
    }

    /// Drops the form and any staged photo.
    pub fn close(&mut self) {
        if let EditSession::Open(form) = self {
            tracing::debug!(position_id = %form.position_id, "edit closed");
        }
        *self = EditSession::Closed;
    }

    pub fn is_open(&self) -> bool {
        matches!(self, EditSession::Open(_))
    }

    pub fn form(&self) -> Option<&EditForm> {
        match self {
            EditSession::Open(form) => Some(form),
            EditSession::Closed => None,
        }
    }

    pub fn form_mut(&mut self) -> Result<&mut EditForm, ValidationError> {
        match self {
            EditSession::Open(form) => Ok(form),
            EditSession::Closed => Err(ValidationError::NotEditing),
        }
    }
}

impl EditForm {
    /// Stages a local image. On rejection the staged photo and preview are
    /// left as they were.
    pub fn stage_photo(&mut self, path: &Path, max_bytes: u64) -> Result<(), ValidationError> {
        let staged = photo::stage_from_file(path, max_bytes)?;
        self.preview = PhotoView::Image(staged.data_url.clone());
        self.staged_photo = Some(staged);
        Ok(())
    }

    /// Clears the file selection; the preview goes back to the stored photo.
    pub fn clear_photo(&mut self, chart: &Chart) {
        self.staged_photo = None;
        self.preview = chart
            .get(&self.position_id)
            .and_then(|e| e.photo.clone())
            .map(PhotoView::Image)
            .unwrap_or(PhotoView::Placeholder);
    }

    /// Fills name and number from a roster member.
    pub fn select_member(&mut self, members: &[Member], number: &str) -> Result<(), ValidationError> {
        let member = members
            .iter()
            .find(|m| m.number == number)
            .ok_or_else(|| ValidationError::UnknownMember(number.to_string()))?;
        self.name = member.name.clone();
        self.member_number = member.number.clone();
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Entry;

    fn chart_with_photo() -> Chart {
        let mut chart = Chart::vacant();
        chart.set(
            "presidente-nacional",
            Entry {
                name: "ANA".into(),
                member_number: "010".into(),
                photo: Some("data:image/png;base64,AAAA".into()),
            },
        );
        chart
    }

    #[test]
    fn test_open_preloads_entry() {
        let chart = chart_with_photo();
        let mut session = EditSession::default();
        let form = session.open("presidente-nacional", &chart).unwrap();
        assert_eq!(form.name, "ANA");
        assert_eq!(form.member_number, "010");
        assert_eq!(form.staged_photo, None);
        assert_eq!(form.preview, PhotoView::Image("data:image/png;base64,AAAA".into()));
        assert!(session.is_open());
    }

    #[test]
    fn test_open_vacant_and_unknown() {
        let chart = Chart::vacant();
        let mut session = EditSession::default();
        let form = session.open("segundo-secretario", &chart).unwrap();
        assert_eq!(form.name, "");
        assert_eq!(form.preview, PhotoView::Placeholder);

        // Department roles are editable even though the chart has no entry yet.
        assert!(session.open("diretor-financeiro", &chart).is_ok());

        let err = session.open("tesoureiro", &chart).unwrap_err();
        assert_eq!(err, ValidationError::UnknownPosition("tesoureiro".into()));
    }

    #[test]
    fn test_rejected_photo_keeps_previous_stage() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("ok.png");
        std::fs::write(&good, [1u8, 2, 3]).unwrap();
        let text = dir.path().join("doc.pdf");
        std::fs::write(&text, b"%PDF").unwrap();
        let big = dir.path().join("big.png");
        std::fs::write(&big, vec![0u8; 64]).unwrap();

        let chart = Chart::vacant();
        let mut session = EditSession::default();
        let form = session.open("primeiro-secretario", &chart).unwrap();

        form.stage_photo(&good, 32).unwrap();
        let staged = form.staged_photo.clone();
        let preview = form.preview.clone();
        assert!(staged.is_some());

        assert!(form.stage_photo(&text, 32).is_err());
        assert!(form.stage_photo(&big, 32).is_err());
        assert_eq!(form.staged_photo, staged);
        assert_eq!(form.preview, preview);
    }

    #[test]
    fn test_rejected_photo_on_empty_stage() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("notes.txt");
        std::fs::write(&text, b"x").unwrap();

        let chart = Chart::vacant();
        let mut session = EditSession::default();
        let form = session.open("primeiro-secretario", &chart).unwrap();
        assert!(matches!(form.stage_photo(&text, 1024), Err(ValidationError::NotAnImage { .. })));
        assert_eq!(form.staged_photo, None);
        assert_eq!(form.preview, PhotoView::Placeholder);
    }

    #[test]
    fn test_clear_photo_restores_stored_preview() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("nova.jpg");
        std::fs::write(&good, [9u8; 4]).unwrap();

        let chart = chart_with_photo();
        let mut session = EditSession::default();
        let form = session.open("presidente-nacional", &chart).unwrap();
        form.stage_photo(&good, 1024).unwrap();
        assert!(matches!(&form.preview, PhotoView::Image(src) if src.starts_with("data:image/jpeg")));

        form.clear_photo(&chart);
        assert_eq!(form.staged_photo, None);
        assert_eq!(form.preview, PhotoView::Image("data:image/png;base64,AAAA".into()));
    }

    #[test]
    fn test_select_member() {
        let members = vec![Member::new("001", "GERALDINA FRANCISCO"), Member::new("002", "UMBELINO CLEMENTE")];
        let chart = Chart::vacant();
        let mut session = EditSession::default();
        let form = session.open("presidente-fiscal", &chart).unwrap();

        form.select_member(&members, "002").unwrap();
        assert_eq!(form.name, "UMBELINO CLEMENTE");
        assert_eq!(form.member_number, "002");
        assert_eq!(
            form.select_member(&members, "999").unwrap_err(),
            ValidationError::UnknownMember("999".into())
        );
        assert_eq!(form.name, "UMBELINO CLEMENTE");
    }

    #[test]
    fn test_validate_blank_name() {
        let chart = Chart::vacant();
        let mut session = EditSession::default();
        let form = session.open("presidente-fiscal", &chart).unwrap();
        form.name = "   ".into();
        assert_eq!(form.validate(), Err(ValidationError::MissingName));
    }

    #[test]
    fn test_close_discards_form() {
        let chart = chart_with_photo();
        let mut session = EditSession::default();
        session.open("presidente-nacional", &chart).unwrap().name = "OUTRA".into();
        session.close();
        assert_eq!(session, EditSession::Closed);
        assert_eq!(session.form_mut().unwrap_err(), ValidationError::NotEditing);
    }
}
