//! Configuration management for TitleSwipe

pub mod preferences;

pub use preferences::{
    PreferenceKey, PreferenceSource, PreferenceStore, Preferences, PreferencesError,
};
