//! Setting value validation.

/// Validate a setting value. Returns `Ok(())` if valid, or an error message.
pub fn validate_setting(key: &str, value: &str) -> Result<(), String> {
    match key {
        "SERVER_PORT" => validate_int_range(value, 1, 65535)?,
        "MAX_PREVIEW_WIDTH" => validate_int_range(value, 64, 8192)?,
        "PREVIEW_QUALITY" | "FINAL_JPEG_QUALITY" => validate_int_range(value, 1, 100)?,
        "RENDER_TIMEOUT_SECS" => validate_int_range(value, 1, 600)?,
        "THROTTLE_MS" => validate_int_range(value, 0, 60_000)?,
        "MAX_UPLOAD_MB" => validate_int_range(value, 1, 200)?,
        "FILENAME_PREFIX" => {
            if value.is_empty() || value.len() > 32 {
                return Err("prefix must be 1-32 characters".into());
            }
            if !value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                return Err("prefix may only contain letters, digits, '-' and '_'".into());
            }
        }
        _ => {}
    }
    Ok(())
}

fn validate_int_range(value: &str, min: i64, max: i64) -> Result<(), String> {
    let v: i64 = value.parse().map_err(|_| "must be an integer")?;
    if !(min..=max).contains(&v) {
        return Err(format!("must be between {min} and {max}"));
    }
    Ok(())
}
