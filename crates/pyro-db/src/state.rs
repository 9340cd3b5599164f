//! Per-user parameter state (`user_state` table).
//!
//! Enumerated fields are stored as their short codes (`fs`, `300`, `bmp`, ...).
//! Rows written by older versions or edited by hand are repaired on load:
//! numerics are clamped into bounds and unknown codes fall back to defaults.

use pyro_pipeline::params::{Denoise, DitherMode, Dpi, OutputFormat, ParameterState};
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, warn};

use crate::{Database, DbError};

struct StateRow {
    brightness: f64,
    contrast: f64,
    gamma: f64,
    sharpness: f64,
    invert: i64,
    dither: String,
    dpi: i64,
    denoise_size: i64,
    blur_radius: f64,
    last_image_bytes: Option<Vec<u8>>,
    out_format: Option<String>,
}

impl StateRow {
    fn into_state(self, user_id: i64) -> ParameterState {
        let defaults = ParameterState::default();

        let dither = self.dither.parse::<DitherMode>().unwrap_or_else(|e| {
            warn!(user_id, error = %e, "Stored dither mode unknown, using default");
            defaults.dither
        });
        let dpi = u32::try_from(self.dpi)
            .ok()
            .and_then(|v| Dpi::try_from(v).ok())
            .unwrap_or_else(|| {
                warn!(user_id, dpi = self.dpi, "Stored DPI unknown, using default");
                defaults.dpi
            });
        let denoise = u32::try_from(self.denoise_size)
            .ok()
            .and_then(|v| Denoise::try_from(v).ok())
            .unwrap_or_else(|| {
                warn!(user_id, denoise = self.denoise_size, "Stored denoise size unknown, using default");
                defaults.denoise
            });
        let output_format = match self.out_format.as_deref() {
            None | Some("") => defaults.output_format,
            Some(code) => code.parse::<OutputFormat>().unwrap_or_else(|e| {
                warn!(user_id, error = %e, "Stored output format unknown, using default");
                defaults.output_format
            }),
        };

        let mut state = ParameterState {
            brightness: self.brightness as f32,
            contrast: self.contrast as f32,
            gamma: self.gamma as f32,
            sharpness: self.sharpness as f32,
            invert: self.invert != 0,
            denoise,
            blur_radius: self.blur_radius as f32,
            dither,
            dpi,
            output_format,
            source_image: self.last_image_bytes.filter(|b| !b.is_empty()),
        };
        if state.clamp_in_place() {
            warn!(user_id, "Stored parameters out of range, clamped");
        }
        state
    }
}

fn ensure_user(conn: &Connection, user_id: i64) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO user_state (user_id) VALUES (?1) ON CONFLICT(user_id) DO NOTHING",
        [user_id],
    )?;
    Ok(())
}

impl Database {
    /// Create the default row for `user_id` if it does not exist yet.
    pub fn ensure_user_state(&self, user_id: i64) -> Result<(), DbError> {
        self.with_conn(|conn| ensure_user(conn, user_id))
    }

    /// Load a user's state, creating the default row on first access.
    pub fn load_state(&self, user_id: i64) -> Result<ParameterState, DbError> {
        let row = self.with_conn(|conn| {
            ensure_user(conn, user_id)?;
            let mut stmt = conn.prepare(
                "SELECT brightness, contrast, gamma, sharpness, invert, dither, dpi,
                        denoise_size, blur_radius, last_image_bytes, out_format
                 FROM user_state WHERE user_id = ?1",
            )?;
            let row = stmt
                .query_row([user_id], |row| {
                    Ok(StateRow {
                        brightness: row.get(0)?,
                        contrast: row.get(1)?,
                        gamma: row.get(2)?,
                        sharpness: row.get(3)?,
                        invert: row.get(4)?,
                        dither: row.get(5)?,
                        dpi: row.get(6)?,
                        denoise_size: row.get(7)?,
                        blur_radius: row.get(8)?,
                        last_image_bytes: row.get(9)?,
                        out_format: row.get(10)?,
                    })
                })
                .optional()?;
            row.ok_or_else(|| DbError::InvalidData(format!("user_state row missing for {user_id}")))
        })?;
        Ok(row.into_state(user_id))
    }

    /// Persist every parameter of `state`. The source image is left untouched;
    /// it is written only through [`Database::update_source_image`].
    pub fn save_state(&self, user_id: i64, state: &ParameterState) -> Result<(), DbError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_state (user_id, brightness, contrast, gamma, sharpness, invert,
                                         dither, dpi, denoise_size, blur_radius, out_format)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                 ON CONFLICT(user_id) DO UPDATE SET
                    brightness = ?2, contrast = ?3, gamma = ?4, sharpness = ?5, invert = ?6,
                    dither = ?7, dpi = ?8, denoise_size = ?9, blur_radius = ?10,
                    out_format = ?11",
                rusqlite::params![
                    user_id,
                    f64::from(state.brightness),
                    f64::from(state.contrast),
                    f64::from(state.gamma),
                    f64::from(state.sharpness),
                    state.invert,
                    state.dither.code(),
                    state.dpi.value(),
                    state.denoise.size(),
                    f64::from(state.blur_radius),
                    state.output_format.code(),
                ],
            )?;
            debug!(user_id, "Saved user state");
            Ok(())
        })
    }

    /// Write only the output format.
    pub fn update_output_format(&self, user_id: i64, format: OutputFormat) -> Result<(), DbError> {
        self.with_conn(|conn| {
            ensure_user(conn, user_id)?;
            conn.execute(
                "UPDATE user_state SET out_format = ?1 WHERE user_id = ?2",
                rusqlite::params![format.code(), user_id],
            )?;
            Ok(())
        })
    }

    /// Write only the uploaded source image.
    pub fn update_source_image(&self, user_id: i64, bytes: &[u8]) -> Result<(), DbError> {
        self.with_conn(|conn| {
            ensure_user(conn, user_id)?;
            conn.execute(
                "UPDATE user_state SET last_image_bytes = ?1 WHERE user_id = ?2",
                rusqlite::params![bytes, user_id],
            )?;
            debug!(user_id, bytes = bytes.len(), "Stored source image");
            Ok(())
        })
    }
}
