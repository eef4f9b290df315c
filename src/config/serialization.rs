//! Config serialization to TOML
//!
//! Single source of truth for config file format.

use super::Config;

impl Config {
    /// Generate the config file contents, preserving current values
    pub fn to_toml(&self) -> String {
        format!(
            r#"# hatdraw configuration

# HTTP server bind address
bind_addr = "{bind}"

# Display driver: terminal, headless
display = "{display}"

# Messages buffered per web client before it is disconnected as too slow
subscriber_buffer = {subscriber_buffer}

# Canvas size in pixels (8 to 40 each side)
[canvas]
width = {width}
height = {height}

# Logging configuration (RUST_LOG env var overrides)
[logging]
level = "{log_level}"
# File logging (in addition to the display buffer or stdout)
file_enabled = {log_file_enabled}
file_dir = "{log_file_dir}"
file_rotation = "{log_file_rotation}"  # hourly, daily, never
file_prefix = "{log_file_prefix}"
"#,
            bind = self.bind_addr,
            display = self.display.as_str(),
            subscriber_buffer = self.subscriber_buffer,
            width = self.canvas_width,
            height = self.canvas_height,
            log_level = self.logging.level,
            log_file_enabled = self.logging.file_enabled,
            log_file_dir = self.logging.file_dir.display(),
            log_file_rotation = self.logging.file_rotation,
            log_file_prefix = self.logging.file_prefix,
        )
    }
}
