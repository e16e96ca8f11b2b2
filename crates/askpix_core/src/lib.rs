pub mod controller;
pub mod crop;
pub mod domain;
pub mod flows;
pub mod memory;
pub mod ports;
pub mod prompts;
pub mod scanner;
pub mod schema;
pub mod tools;

pub use controller::{ControllerError, ScanController, Selection};
pub use crop::{CropRect, ImageSize, PixelRect};
pub use domain::{
    ChartData, ChartPoint, DataUri, Language, NewSavedSolution, Question, QuestionContent,
    SavedSolution, SolutionResult, Subject,
};
pub use flows::{FlowError, FlowResult, Flows, SolveImageInput, SolveTextInput};
pub use memory::MemorySolutionRepository;
pub use ports::{
    CameraDevice, CameraStream, CapturedFrame, GenerativeModel, ImageCropper, PortError,
    PortResult, SolutionRepository, SolverClient, Tool, VideoSearchService,
};
pub use prompts::PromptTemplates;
pub use scanner::{ScanEvent, ScanMode, ScanState, TransitionError};
