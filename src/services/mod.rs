//! 業務能力層（Services）
//!
//! 「何ができるか」を表す層。流れの編成はディスパッチャ側が行う。

pub mod authenticator;
pub mod job_coordinator;
pub mod pattern_discovery;

pub use authenticator::Authenticator;
pub use job_coordinator::JobCoordinator;
pub use pattern_discovery::PatternDiscovery;
