//! Session workflow: upload, command, preview and final delivery.
//!
//! State changes for a session run under its lock (load, apply, save). The lock
//! is released before any decode or render, which run on the blocking pool
//! under the configured timeout.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use pyro_pipeline::command::{available_tokens, caption, final_caption};
use pyro_pipeline::{Command, CommandError, FinalRender, ParameterState, SheetSize};
use serde::Serialize;
use tracing::{debug, info};

use crate::app::SharedState;
use crate::config::AppConfig;

use super::ServiceError;

const ACCEPTED_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/bmp"];
const ACCEPTED_EXTENSIONS: [&str; 4] = [".png", ".jpg", ".jpeg", ".bmp"];
const PREVIEW_CONTENT_TYPE: &str = "image/jpeg";

/// What a client sees after an interaction.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub caption: String,
    pub commands: Vec<String>,
    pub state: ParameterState,
    pub has_image: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<&'static str>,
}

impl SessionView {
    fn new(state: ParameterState, preview: Option<Vec<u8>>) -> Self {
        Self {
            caption: caption(&state),
            commands: available_tokens(&state),
            has_image: state.has_image(),
            preview: preview.as_deref().map(|b| BASE64.encode(b)),
            content_type: preview.map(|_| PREVIEW_CONTENT_TYPE),
            state,
        }
    }
}

/// A final file ready for delivery.
#[derive(Debug)]
pub struct FinalDelivery {
    pub render: FinalRender,
    pub caption: String,
}

/// Whether an upload looks like a supported image, judged by its declared
/// content type or its file name.
pub fn is_supported_upload(content_type: Option<&str>, filename: Option<&str>) -> bool {
    let by_type = content_type
        .map(|t| {
            let t = t.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
            ACCEPTED_TYPES.contains(&t.as_str())
        })
        .unwrap_or(false);
    let by_name = filename
        .map(|n| {
            let n = n.to_ascii_lowercase();
            ACCEPTED_EXTENSIONS.iter().any(|ext| n.ends_with(ext))
        })
        .unwrap_or(false);
    by_type || by_name
}

pub struct SessionService {
    state: SharedState,
}

impl SessionService {
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    async fn config(&self) -> AppConfig {
        self.state.config().await.clone()
    }

    fn throttle(&self, user_id: i64) -> Result<(), ServiceError> {
        if self.state.throttle().check(user_id) {
            Ok(())
        } else {
            Err(ServiceError::Throttled)
        }
    }

    /// Run CPU-heavy pipeline work off the async runtime, bounded by `limit`.
    async fn run_blocking<T, F>(limit: Duration, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce() -> pyro_pipeline::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        match tokio::time::timeout(limit, tokio::task::spawn_blocking(f)).await {
            Ok(joined) => Ok(joined??),
            Err(_) => Err(ServiceError::Timeout(limit)),
        }
    }

    async fn preview_for(
        cfg: &AppConfig,
        state: &ParameterState,
    ) -> Result<Option<Vec<u8>>, ServiceError> {
        let Some(source) = state.source_image.clone() else {
            return Ok(None);
        };
        let params = state.clone();
        let opts = cfg.preview_options();
        let bytes = Self::run_blocking(cfg.render_timeout, move || {
            let img = pyro_pipeline::decode(&source)?;
            pyro_pipeline::render_preview(&img, &params, &opts)
        })
        .await?;
        Ok(Some(bytes))
    }

    /// Store a new source image and return its preview.
    pub async fn upload(
        &self,
        user_id: i64,
        bytes: Vec<u8>,
        content_type: Option<&str>,
        filename: Option<&str>,
    ) -> Result<SessionView, ServiceError> {
        if bytes.is_empty() {
            return Err(CommandError::MissingImage.into());
        }
        if !is_supported_upload(content_type, filename) {
            return Err(ServiceError::BadRequest(
                "unsupported upload, send a PNG, JPEG or BMP image".into(),
            ));
        }
        self.throttle(user_id)?;
        let cfg = self.config().await;

        // Reject undecodable files before they replace a good source.
        let candidate = bytes.clone();
        Self::run_blocking(cfg.render_timeout, move || {
            pyro_pipeline::decode(&candidate).map(|_| ())
        })
        .await?;

        let state = {
            let _guard = self.state.locks().lock(user_id).await;
            let store = self.state.store();
            let mut state = store.load(user_id)?;
            let size = bytes.len();
            state.apply(Command::NewUpload(bytes))?;
            if let Some(source) = state.source_image.as_deref() {
                store.update_source_image(user_id, source)?;
            }
            info!(user_id, bytes = size, "Stored new source image");
            state
        };

        let preview = Self::preview_for(&cfg, &state).await?;
        Ok(SessionView::new(state, preview))
    }

    /// Apply a control token and return the refreshed view.
    pub async fn command(&self, user_id: i64, token: &str) -> Result<SessionView, ServiceError> {
        let cmd: Command = token.parse()?;
        self.throttle(user_id)?;
        let cfg = self.config().await;

        let (state, outcome) = {
            let _guard = self.state.locks().lock(user_id).await;
            let store = self.state.store();
            let mut state = store.load(user_id)?;

            let is_reset = matches!(cmd, Command::Reset);
            let format_only = matches!(cmd, Command::CycleOutputFormat);
            let counts = cmd.is_setting_change();
            let label = cmd.to_string();

            let outcome = state.apply(cmd)?;
            if format_only {
                store.update_output_format(user_id, state.output_format)?;
            } else {
                store.save(user_id, &state)?;
            }
            if counts && (!is_reset || outcome.rerender) {
                self.state.db().record_setting_change(user_id)?;
            }
            debug!(user_id, command = %label, rerender = outcome.rerender, "Applied command");
            (state, outcome)
        };

        let preview = if outcome.rerender {
            Self::preview_for(&cfg, &state).await?
        } else {
            None
        };
        Ok(SessionView::new(state, preview))
    }

    /// Current state without rendering.
    pub fn snapshot(&self, user_id: i64) -> Result<SessionView, ServiceError> {
        let state = self.state.store().load(user_id)?;
        Ok(SessionView::new(state, None))
    }

    /// Raw preview JPEG for the current state.
    pub async fn preview(&self, user_id: i64) -> Result<Vec<u8>, ServiceError> {
        let state = self.state.store().load(user_id)?;
        let cfg = self.config().await;
        Self::preview_for(&cfg, &state)
            .await?
            .ok_or(ServiceError::Command(CommandError::MissingImage))
    }

    /// Render and count the final file for `sheet`.
    pub async fn final_render(
        &self,
        user_id: i64,
        sheet: SheetSize,
    ) -> Result<FinalDelivery, ServiceError> {
        let state = self.state.store().load(user_id)?;
        let Some(source) = state.source_image.clone() else {
            return Err(CommandError::MissingImage.into());
        };
        self.throttle(user_id)?;
        let cfg = self.config().await;

        let params = state.clone();
        let opts = cfg.final_options();
        let render = Self::run_blocking(cfg.render_timeout, move || {
            let img = pyro_pipeline::decode(&source)?;
            pyro_pipeline::render_final(&img, &params, sheet, &opts)
        })
        .await?;

        self.state.db().record_output(user_id)?;
        let caption = final_caption(&state, sheet);
        info!(user_id, filename = %render.filename, "Delivered final output");
        Ok(FinalDelivery { render, caption })
    }

    pub fn stats(&self, user_id: i64) -> Result<pyro_db::UserStats, ServiceError> {
        Ok(self.state.db().get_user_stats(user_id)?)
    }
}
