//! データモデル
//!
//! ポータルから抽出するパターンと、非同期ジョブの永続レコードを定義する。

pub mod job;
pub mod pattern;

pub use job::{EnqueuedWork, Job, JobStatus, PollReport, GENERIC_FAILURE_MESSAGE};
pub use pattern::Pattern;
