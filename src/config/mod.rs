//! Configuration management.
//!
//! Configuration is stored in TOML format and loaded once at startup. The
//! search order is:
//! 1. `./furhat-dialogue.toml` (project-local)
//! 2. `~/.config/furhat-dialogue/config.toml` (XDG config)
//!
//! API keys are read from the environment. [`load_dotenv`] fills it from a
//! `.env` file first, without overriding variables that are already set.
//!
//! # Example Configuration
//!
//! ```toml
//! [robot]
//! host = "192.168.1.20"
//! voice_name = "Matthew"
//! character_name = "James"
//!
//! [session]
//! idle_timeout_secs = 60
//! greeting = "Hello! [Smile] I am ready to chat."
//!
//! [model]
//! provider = "gemini"
//! model = "gemini-flash-latest"
//! api_key_env = "GOOGLE_API_KEY"
//!
//! [logging]
//! level = "info"
//! file = true
//!
//! [gestures]
//! smile = "BigSmile"
//! nod = "Nod"
//! concern = "ExpressSad"
//! wink = "Wink"
//! neutral = "ExpressNeutral"
//! ```

mod file;
mod types;

pub use file::{
    from_path, from_str, load, load_dotenv, load_dotenv_from, search_paths, xdg_config_dir,
};
pub use types::{AppConfig, RobotConfig, SessionConfig};
