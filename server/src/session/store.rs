//! Persistence port for session state.

use pyro_db::{Database, DbError};
use pyro_pipeline::{OutputFormat, ParameterState};

/// Where per-session [`ParameterState`] lives between requests.
pub trait StateStore: Send + Sync {
    /// Load a session's state, creating the default record on first access.
    fn load(&self, user_id: i64) -> Result<ParameterState, DbError>;

    /// Persist the parameters. The source image only changes through
    /// [`StateStore::update_source_image`].
    fn save(&self, user_id: i64, state: &ParameterState) -> Result<(), DbError>;

    fn update_output_format(&self, user_id: i64, format: OutputFormat) -> Result<(), DbError>;

    fn update_source_image(&self, user_id: i64, bytes: &[u8]) -> Result<(), DbError>;
}

impl StateStore for Database {
    fn load(&self, user_id: i64) -> Result<ParameterState, DbError> {
        self.load_state(user_id)
    }

    fn save(&self, user_id: i64, state: &ParameterState) -> Result<(), DbError> {
        self.save_state(user_id, state)
    }

    fn update_output_format(&self, user_id: i64, format: OutputFormat) -> Result<(), DbError> {
        Database::update_output_format(self, user_id, format)
    }

    fn update_source_image(&self, user_id: i64, bytes: &[u8]) -> Result<(), DbError> {
        Database::update_source_image(self, user_id, bytes)
    }
}
