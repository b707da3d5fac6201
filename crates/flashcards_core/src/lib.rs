pub mod content;
pub mod domain;
pub mod generation;
pub mod memory;
pub mod ports;
pub mod review;

pub use domain::{
    AuthSession, ContentSource, EventLogEntry, EventType, Flashcard, FlashcardPage,
    FlashcardProposal, FlashcardState, FlashcardUpdate, GenerationSession, NewFlashcard,
    NewGeneration, User, UserCredentials,
};
pub use generation::{GenerationError, GenerationWorkflow};
pub use memory::InMemoryStore;
pub use ports::{
    DatabaseService, FlashcardGenerationService, PortError, PortResult, RecordStore,
    ReviewTransaction,
};
pub use review::{
    CandidateActionInput, CandidateActionsRequest, CandidateActionsResult, CandidateReviewService,
    CounterPolicy, ErrorKind, FieldIssue, ReviewError,
};
