//! 外部資源クライアント
//!
//! 永続ストアとキューをトレイトで抽象化する。本番実装は
//! DynamoDB / SQS、テストではインメモリ実装に差し替える。

pub mod job_store;
pub mod work_queue;

pub use job_store::{DynamoJobStore, JobStore, MemoryJobStore};
pub use work_queue::{MemoryWorkQueue, SqsWorkQueue, WorkQueue};
