//! 业务逻辑服务层

mod cutover;

pub use cutover::CutoverOrchestrator;
