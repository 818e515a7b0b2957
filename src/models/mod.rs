pub mod job;
pub mod llm;
pub mod notification;
pub mod trend;
pub mod user_preferences;

pub use job::{JobRun, JobStatus, WorkerRunSummary};
pub use llm::{
    AnalysisSource, ChatRequest, ChatResponse, ChatRole, ChatTurn, ComposedAnalysis,
    StructuredAnalysis, TrendAnalysisResponse,
};
pub use notification::{
    CreateNotification, IconHint, ManualNotificationRequest, Notification, NotificationCategory,
    NotificationQuery,
};
pub use trend::{ChangeEvent, ChangeSignal, Direction, NoSignalReason, TimeSeries, TrendPoint};
pub use user_preferences::{Frequency, UpdateUserPreference, UserPreference};
