//! Application state and handlers.
//! All mutable state lives in `AppState` and is passed to each handler by
//! `&mut`. Read failures never escape a handler: they become fallback data
//! plus an error banner, and the view is re-rendered either way. A chart reply
//! that succeeds without data only logs a warning.

use std::sync::Arc;

use crate::config::Config;
use crate::edit::EditSession;
use crate::error::{CommitError, StoreError};
use crate::model::{self, Chart, ChartSnapshot, Entry, Member};
use crate::render::{self, ChartView};
use crate::status::{StatusBoard, StatusKind};
use crate::store::RemoteStore;

pub struct AppState {
    pub chart: Chart,
    pub members: Vec<Member>,
    pub session: EditSession,
    pub status: StatusBoard,
    pub show_departments: bool,
    /// Last rendered view; refreshed after every load and commit.
    pub view: ChartView,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let chart = Chart::vacant();
        let view = render::render(&chart, false);
        Self {
            chart,
            members: Vec::new(),
            session: EditSession::Closed,
            status: StatusBoard::new(config.status_duration()),
            show_departments: false,
            view,
        }
    }

    pub fn render(&mut self) {
        self.view = render::render(&self.chart, self.show_departments);
    }

    pub fn set_departments(&mut self, show: bool) {
        self.show_departments = show;
        self.render();
    }
}

pub struct App {
    store: Arc<dyn RemoteStore>,
    max_photo_bytes: u64,
}

impl App {
    pub fn new(store: Arc<dyn RemoteStore>, config: &Config) -> Self {
        Self {
            store,
            max_photo_bytes: config.max_photo_bytes,
        }
    }

    pub fn max_photo_bytes(&self) -> u64 {
        self.max_photo_bytes
    }

    /// Loads the roster, falling back to the built-in list on failure.
    pub async fn load_members(&self, state: &mut AppState) -> bool {
        let result = self.store.fetch_members().await;
        apply_members(state, result)
    }

    /// Loads the chart, falling back to all-vacant on failure, then renders.
    pub async fn load_chart(&self, state: &mut AppState) -> bool {
        let result = self.store.fetch_chart().await;
        let ok = apply_chart(state, result);
        state.render();
        ok
    }

    /// Fetches roster and chart concurrently, then applies both.
    pub async fn sync(&self, state: &mut AppState) -> bool {
        state.status.show("Sincronizando dados com o servidor...", StatusKind::Warning);

        let (members, chart) = tokio::join!(self.store.fetch_members(), self.store.fetch_chart());
        let members_ok = apply_members(state, members);
        let chart_ok = apply_chart(state, chart);
        state.render();

        if members_ok && chart_ok {
            state.status.show("Dados sincronizados com sucesso!", StatusKind::Success);
        }
        members_ok && chart_ok
    }

    /// Commits the open edit. Any error leaves the session open.
    pub async fn commit_edit(&self, state: &mut AppState) -> Result<(), CommitError> {
        let form = state.session.form_mut()?.clone();
        form.validate()?;
        let position_id = form.position_id.as_str();

        if let Some(staged) = &form.staged_photo {
            match self.store.upload_photo(position_id, staged.base64_payload()).await {
                Ok(_) => state.status.show("Foto enviada para o servidor", StatusKind::Success),
                Err(e) => {
                    tracing::error!(position_id, error = %e, "photo upload failed");
                    state.status.show("Erro ao enviar foto para o servidor", StatusKind::Error);
                    return Err(CommitError::Upload(e));
                }
            }
        }

        if let Err(e) = self
            .store
            .update_position(position_id, &form.name, &form.member_number)
            .await
        {
            tracing::error!(position_id, error = %e, "position update failed");
            state.status.show("Erro ao atualizar cargo no servidor", StatusKind::Error);
            return Err(CommitError::Update(e));
        }

        let previous_photo = state.chart.get(position_id).and_then(|e| e.photo.clone());
        state.chart.set(
            position_id,
            Entry {
                name: form.name.clone(),
                member_number: form.member_number.clone(),
                photo: form.staged_photo.as_ref().map(|p| p.data_url.clone()).or(previous_photo),
            },
        );

        self.load_chart(state).await;

        state.status.show("Cargo atualizado com sucesso!", StatusKind::Success);
        state.session.close();
        Ok(())
    }
}

fn apply_members(state: &mut AppState, result: Result<Vec<Member>, StoreError>) -> bool {
    match result {
        Ok(members) => {
            state.members = members;
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to load members, using built-in list");
            state.members = model::fallback_members();
            state.status.show("Erro ao carregar membros do servidor", StatusKind::Error);
            false
        }
    }
}

fn apply_chart(state: &mut AppState, result: Result<ChartSnapshot, StoreError>) -> bool {
    match result {
        Ok(snapshot) => {
            state.chart = Chart::from_snapshot(snapshot);
            true
        }
        Err(e @ StoreError::Incomplete { .. }) => {
            // The service answered; it just had nothing to show.
            tracing::warn!(error = %e, "chart reply has no data, showing all positions vacant");
            state.chart = Chart::vacant();
            false
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to load chart, showing all positions vacant");
            state.chart = Chart::vacant();
            state.status.show("Erro ao carregar organograma do servidor", StatusKind::Error);
            false
        }
    }
}
