pub mod defaults;
pub mod paths;
pub mod service;
pub mod settings;
pub mod validation;

pub use paths::AppPaths;
pub use service::ConfigService;
pub use settings::{
    AssemblerConfig, CollaboratorConfig, CredibilityTable, EngineConfig, FusionConfig,
    KeywordConfig, MemoryBackend, MemoryConfig, QueryAugmentation, RetrievalConfig,
    ScoringConfig, ServerConfig,
};
pub use validation::validate_config;
