pub mod contract;
pub mod decode;
pub mod diagram;
pub mod domain;
pub mod gateway;
pub mod ingestion;
pub mod memory_store;
pub mod ports;
pub mod quiz;
pub mod review;
pub mod session;

pub use contract::{Content, ContractLimits, GenerateContentRequest, Part};
pub use domain::{
    AnalysisResult, ChatMessage, ChatRole, DetectedType, Flashcard, HistoryItem, ImageAsset,
    OutputMode, ProgrammingLanguage, QuizQuestion, SavedFlashcard, SecondaryInfo, Theme,
};
pub use gateway::AiGateway;
pub use memory_store::InMemoryKeyValueStore;
pub use ports::{ContentGenerationService, KeyValueStore, PortError, PortResult};
pub use session::SessionStore;
