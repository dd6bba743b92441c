mod settings;

pub use settings::{
    GameSettings, LLMSettings, LoggingConfig, SearchSettings, ServerSettings, Settings,
    StorageSettings,
};
